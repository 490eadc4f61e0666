use std::sync::Arc;

use crate::engine::{
    ConfigurationTreeNode, DiagnosticBundle, EngineConfig, EvaluationEngine, EvaluationResult,
};
use crate::product::{ProductDefinition, ProductId};

/// Read-only supplier of product definitions (catalog, constraints, cases, initial tree).
pub trait ProductSource: Send + Sync {
    fn fetch(&self, id: &ProductId) -> Result<Option<ProductDefinition>, SourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("product source unavailable: {0}")]
    Unavailable(String),
}

/// Service composing a product source with the evaluation engine.
pub struct ConfigurationService<S> {
    source: Arc<S>,
    engine: Arc<EvaluationEngine>,
}

impl<S> ConfigurationService<S>
where
    S: ProductSource + 'static,
{
    pub fn new(source: Arc<S>, config: EngineConfig) -> Self {
        Self::with_engine(source, EvaluationEngine::new(config))
    }

    pub fn with_engine(source: Arc<S>, engine: EvaluationEngine) -> Self {
        Self {
            source,
            engine: Arc::new(engine),
        }
    }

    pub fn engine(&self) -> &EvaluationEngine {
        &self.engine
    }

    fn product(&self, id: &ProductId) -> Result<ProductDefinition, ConfigurationServiceError> {
        self.source
            .fetch(id)?
            .ok_or_else(|| ConfigurationServiceError::UnknownProduct(id.clone()))
    }

    /// Evaluate `tree`, or the product's initial tree when none is given.
    pub async fn evaluate(
        &self,
        id: &ProductId,
        tree: Option<ConfigurationTreeNode>,
    ) -> Result<EvaluationResult, ConfigurationServiceError> {
        let product = self.product(id)?;
        let tree = tree.unwrap_or_else(|| product.initial_tree.clone());
        Ok(self.engine.evaluate(&product.input(&tree)).await)
    }

    pub fn expressions(
        &self,
        id: &ProductId,
        tree: Option<ConfigurationTreeNode>,
    ) -> Result<DiagnosticBundle, ConfigurationServiceError> {
        let product = self.product(id)?;
        let tree = tree.unwrap_or_else(|| product.initial_tree.clone());
        Ok(self.engine.render(&product.input(&tree)))
    }
}

/// Error raised by the configuration service.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationServiceError {
    #[error("unknown product '{0}'")]
    UnknownProduct(ProductId),
    #[error(transparent)]
    Source(#[from] SourceError),
}
