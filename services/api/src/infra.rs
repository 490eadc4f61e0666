use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use configurator::engine::ConfigurationTreeNode;
use configurator::error::AppError;
use configurator::{ProductDefinition, ProductId, ProductSource, SourceError};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Products loaded once at startup; read-only afterwards.
#[derive(Default, Clone)]
pub(crate) struct InMemoryProductSource {
    products: Arc<HashMap<ProductId, ProductDefinition>>,
}

impl InMemoryProductSource {
    pub(crate) fn from_products(products: impl IntoIterator<Item = ProductDefinition>) -> Self {
        let products = products
            .into_iter()
            .map(|product| (product.id.clone(), product))
            .collect();
        Self {
            products: Arc::new(products),
        }
    }

    pub(crate) fn product_ids(&self) -> Vec<&ProductId> {
        let mut ids: Vec<&ProductId> = self.products.keys().collect();
        ids.sort();
        ids
    }
}

impl ProductSource for InMemoryProductSource {
    fn fetch(&self, id: &ProductId) -> Result<Option<ProductDefinition>, SourceError> {
        Ok(self.products.get(id).cloned())
    }
}

pub(crate) fn load_product(path: &Path) -> Result<ProductDefinition, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(ProductDefinition::from_json(&raw)?)
}

pub(crate) fn load_tree(path: &Path) -> Result<ConfigurationTreeNode, AppError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
