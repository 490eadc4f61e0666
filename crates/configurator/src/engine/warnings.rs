use super::domain::{Catalog, SelectedSet};

/// Warnings for selected components without a price and mandatory categories left empty.
///
/// Category coverage is judged by the selected components' category tags.
pub fn generate_warnings(
    selected: &SelectedSet,
    catalog: &Catalog,
    mandatory_categories: &[String],
) -> Vec<String> {
    let components: Vec<_> = selected
        .iter()
        .filter_map(|id| catalog.get(id.as_str()))
        .collect();

    let mut warnings: Vec<String> = components
        .iter()
        .filter(|component| component.price.is_none())
        .map(|component| format!("price information missing for {}", component.name))
        .collect();

    for category in mandatory_categories {
        let covered = components
            .iter()
            .any(|component| &component.category == category);
        if !covered {
            warnings.push(format!("no component selected for mandatory category '{category}'"));
        }
    }

    warnings
}
