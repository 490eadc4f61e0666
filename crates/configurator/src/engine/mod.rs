//! Configuration evaluation engine.
//!
//! Every call is stateless: the engine reads a snapshot of the tree and the product data, and
//! builds a fresh [`EvaluationResult`]. The only suspension point is an optional delegated
//! decision procedure behind [`EvaluationStrategy`].

pub mod arithmetic;
mod config;
pub mod domain;
pub mod logical;
pub mod pricing;
pub mod render;
pub mod risk;
pub mod selection;
pub mod solver;
pub mod warnings;

#[cfg(test)]
mod tests;

pub use arithmetic::{
    evaluate_arithmetic, parse_expression, ArithmeticDiagnostic, ArithmeticExpression,
    ArithmeticOutcome, ArithmeticReport, Comparison, ExpressionError, Metric,
};
pub use config::EngineConfig;
pub use domain::{
    ArithmeticConstraint, CaseKind, Catalog, Component, ComponentId, ConfigurationTreeNode,
    Constraint, ConstraintKind, ConstraintPredicate, ConstraintRule, FormulaError, LogicalFormula,
    LogicalOperator, PastCase, SelectedSet, SelectionPoint, Severity,
};
pub use logical::{ConstraintViolation, DelegatedStrategy, DirectStrategy, EvaluationStrategy};
pub use pricing::{ConfigurationMetrics, PriceLine};
pub use render::{DiagnosticBundle, SelectedComponentView};
pub use risk::NEUTRAL_RISK_SCORE;
pub use solver::{
    DecisionProcedure, DecisionProcedureHandle, SatResult, SolverBackend, SolverConfig,
    SolverError, Term, TruthTableProcedure,
};

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

/// Borrowed snapshot of everything a single evaluation reads.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationInput<'a> {
    pub tree: &'a ConfigurationTreeNode,
    pub catalog: &'a Catalog,
    pub constraints: &'a [Constraint],
    pub arithmetic: &'a [ArithmeticConstraint],
    pub past_cases: &'a [PastCase],
}

impl<'a> EvaluationInput<'a> {
    pub fn new(tree: &'a ConfigurationTreeNode, catalog: &'a Catalog) -> Self {
        Self {
            tree,
            catalog,
            constraints: &[],
            arithmetic: &[],
            past_cases: &[],
        }
    }

    pub fn with_constraints(mut self, constraints: &'a [Constraint]) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_arithmetic(mut self, arithmetic: &'a [ArithmeticConstraint]) -> Self {
        self.arithmetic = arithmetic;
        self
    }

    pub fn with_past_cases(mut self, past_cases: &'a [PastCase]) -> Self {
        self.past_cases = past_cases;
        self
    }
}

/// Outcome of one evaluation. Owned by the caller once returned.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationResult {
    pub total_price: f64,
    pub price_breakdown: Vec<PriceLine>,
    pub constraint_violations: Vec<ConstraintViolation>,
    pub risk_score: f64,
    pub related_cases: Vec<PastCase>,
    pub warnings: Vec<String>,
    pub metrics: ConfigurationMetrics,
    /// Present only when arithmetic constraints were supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arithmetic: Option<ArithmeticReport>,
}

/// Composes selection, pricing, constraint checks, risk and warnings into one result.
#[derive(Clone)]
pub struct EvaluationEngine {
    config: EngineConfig,
    strategy: Arc<dyn EvaluationStrategy>,
}

impl EvaluationEngine {
    /// Builds the strategy from `config.solver`: direct evaluation when no backend is
    /// configured, otherwise delegation with direct fallback.
    pub fn new(config: EngineConfig) -> Self {
        let strategy: Arc<dyn EvaluationStrategy> = match config.solver.backend {
            SolverBackend::None => Arc::new(DirectStrategy),
            _ => {
                let handle = DecisionProcedureHandle::from_config(&config.solver);
                Arc::new(DelegatedStrategy::new(Arc::new(handle)))
            }
        };
        Self::with_strategy(config, strategy)
    }

    pub fn with_strategy(config: EngineConfig, strategy: Arc<dyn EvaluationStrategy>) -> Self {
        Self { config, strategy }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub async fn evaluate(&self, input: &EvaluationInput<'_>) -> EvaluationResult {
        let selected = selection::collect_selected(input.tree);
        let price = pricing::aggregate_price(&selected, input.catalog);
        let metrics = pricing::derive_metrics(&selected, input.catalog, price.total);

        let constraint_violations = self
            .strategy
            .violations(&selected, input.constraints)
            .await;

        let arithmetic = (!input.arithmetic.is_empty())
            .then(|| arithmetic::evaluate_arithmetic(input.arithmetic, &metrics));

        let risk = risk::assess_risk(&selected, input.past_cases);
        let warnings = warnings::generate_warnings(
            &selected,
            input.catalog,
            &self.config.mandatory_categories,
        );

        debug!(
            strategy = self.strategy.name(),
            selected = selected.len(),
            violations = constraint_violations.len(),
            risk_score = risk.score,
            "configuration evaluated"
        );

        EvaluationResult {
            total_price: price.total,
            price_breakdown: price.breakdown,
            constraint_violations,
            risk_score: risk.score,
            related_cases: risk.related_cases,
            warnings,
            metrics,
            arithmetic,
        }
    }

    /// Diagnostic view of the same input. Independent of [`Self::evaluate`].
    pub fn render(&self, input: &EvaluationInput<'_>) -> DiagnosticBundle {
        let selected = selection::collect_selected(input.tree);
        let price = pricing::aggregate_price(&selected, input.catalog);
        let metrics = pricing::derive_metrics(&selected, input.catalog, price.total);
        render::render_diagnostics(
            &selected,
            input.catalog,
            input.constraints,
            input.arithmetic,
            &metrics,
        )
    }
}

impl Default for EvaluationEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
