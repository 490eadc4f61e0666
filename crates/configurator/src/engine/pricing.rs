use serde::{Deserialize, Serialize};

use super::domain::{Catalog, ComponentId, SelectedSet};

/// Priced line of the evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLine {
    pub component_id: ComponentId,
    pub component_name: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    pub total: f64,
    pub breakdown: Vec<PriceLine>,
}

/// Numeric figures derived from the selection; the inputs to arithmetic constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationMetrics {
    pub total_price: f64,
    pub expected_failure_cost: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturability: Option<f64>,
}

/// Sum listed prices of the selected components.
///
/// Ids missing from the catalog are skipped. Components without a listed price add nothing to
/// the total and get no breakdown line; the warning pass reports them instead.
pub fn aggregate_price(selected: &SelectedSet, catalog: &Catalog) -> PriceSummary {
    let breakdown: Vec<PriceLine> = selected
        .iter()
        .filter_map(|id| catalog.get(id.as_str()))
        .filter_map(|component| {
            component.price.map(|price| PriceLine {
                component_id: component.id.clone(),
                component_name: component.name.clone(),
                price,
            })
        })
        .collect();

    let total = breakdown.iter().map(|line| line.price).sum();

    PriceSummary { total, breakdown }
}

pub fn derive_metrics(selected: &SelectedSet, catalog: &Catalog, total_price: f64) -> ConfigurationMetrics {
    let components: Vec<_> = selected
        .iter()
        .filter_map(|id| catalog.get(id.as_str()))
        .collect();

    let expected_failure_cost = components
        .iter()
        .filter_map(|component| match (component.failure_rate, component.failure_cost) {
            (Some(rate), Some(cost)) => Some(rate * cost),
            _ => None,
        })
        .sum();

    let scores: Vec<f64> = components
        .iter()
        .filter_map(|component| component.manufacturability)
        .collect();
    let manufacturability = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    };

    ConfigurationMetrics {
        total_price,
        expected_failure_cost,
        manufacturability,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::domain::Component;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            Component::new("motor-ac", "AC induction motor", "motor")
                .with_price(800_000.0)
                .with_failure(0.02, 500_000.0)
                .with_manufacturability(0.9),
            Component::new("door-auto", "Automatic door", "door")
                .with_failure(0.05, 300_000.0)
                .with_manufacturability(0.7),
            Component::new("control-plc", "PLC control", "control"),
        ])
    }

    #[test]
    fn unknown_price_adds_nothing_to_total_or_breakdown() {
        let selected: SelectedSet = ["motor-ac", "door-auto"].into_iter().collect();

        let summary = aggregate_price(&selected, &catalog());

        assert_eq!(summary.total, 800_000.0);
        assert_eq!(summary.breakdown.len(), 1);
        assert_eq!(summary.breakdown[0].component_id.as_str(), "motor-ac");
    }

    #[test]
    fn unresolvable_ids_are_skipped() {
        let selected: SelectedSet = ["motor-ac", "ghost"].into_iter().collect();

        let summary = aggregate_price(&selected, &catalog());

        assert_eq!(summary.breakdown.len(), 1);
        assert_eq!(summary.total, 800_000.0);
    }

    #[test]
    fn metrics_combine_failure_exposure_and_manufacturability() {
        let selected: SelectedSet = ["motor-ac", "door-auto", "control-plc"].into_iter().collect();

        let metrics = derive_metrics(&selected, &catalog(), 800_000.0);

        assert!((metrics.expected_failure_cost - 25_000.0).abs() < 1e-6);
        let manufacturability = metrics.manufacturability.expect("two scored components");
        assert!((manufacturability - 0.8).abs() < 1e-9);
    }

    #[test]
    fn manufacturability_is_absent_without_scores() {
        let selected: SelectedSet = ["control-plc"].into_iter().collect();

        let metrics = derive_metrics(&selected, &catalog(), 0.0);

        assert_eq!(metrics.expected_failure_cost, 0.0);
        assert_eq!(metrics.manufacturability, None);
    }
}
