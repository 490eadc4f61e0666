use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::engine::{
    ArithmeticConstraint, CaseKind, Catalog, Component, ComponentId, ConfigurationTreeNode,
    Constraint, ConstraintKind, DecisionProcedure, EngineConfig, EvaluationEngine, LogicalFormula,
    LogicalOperator, PastCase, SatResult, Severity, SolverError, Term,
};

pub(super) fn catalog() -> Catalog {
    Catalog::new(vec![
        Component::new("eng-1", "V8 engine", "engine")
            .with_price(250_000.0)
            .with_failure(0.1, 250_000.0)
            .with_manufacturability(0.8),
        Component::new("eng-2", "Hybrid engine", "engine").with_price(310_000.0),
        Component::new("trans-1", "Automatic transmission", "transmission")
            .with_price(80_000.0)
            .with_manufacturability(0.6),
        Component::new("trans-2", "Manual transmission", "transmission").with_price(60_000.0),
        Component::new("sound-1", "Premium sound", "audio"),
        Component::new("tow-1", "Tow package", "accessory").with_price(12_000.0),
    ])
}

/// Root node with one child per selected id.
pub(super) fn tree(selected: &[&str]) -> ConfigurationTreeNode {
    selected.iter().enumerate().fold(
        ConfigurationTreeNode::new("root", "vehicle"),
        |root, (position, id)| {
            root.with_child(
                ConfigurationTreeNode::new(format!("node-{position}"), format!("point-{position}"))
                    .selecting(*id),
            )
        },
    )
}

pub(super) fn ids(values: &[&str]) -> Vec<ComponentId> {
    values.iter().map(|id| ComponentId::from(*id)).collect()
}

pub(super) fn formula_constraint(
    id: &str,
    operator: LogicalOperator,
    operands: &[&str],
) -> Constraint {
    Constraint::with_formula(
        id,
        ConstraintKind::Incompatibility,
        id,
        format!("{id} violated"),
        ids(operands),
        LogicalFormula::new(operator, ids(operands)).expect("valid formula"),
        Severity::Error,
    )
}

pub(super) fn constraints() -> Vec<Constraint> {
    vec![
        formula_constraint("tow-needs-v8", LogicalOperator::Implies, &["tow-1", "eng-1"]),
        formula_constraint("hybrid-manual", LogicalOperator::Not, &["eng-2", "trans-2"]),
        formula_constraint("one-engine", LogicalOperator::Xor, &["eng-1", "eng-2"]),
    ]
}

pub(super) fn budget() -> Vec<ArithmeticConstraint> {
    vec![
        ArithmeticConstraint {
            id: "budget".to_string(),
            name: "Budget".to_string(),
            expression: "total_price <= 300000".to_string(),
            description: None,
        },
        ArithmeticConstraint {
            id: "warranty".to_string(),
            name: "Warranty exposure".to_string(),
            expression: "expected_failure_cost < 100000".to_string(),
            description: Some("expected failure cost stays under the warranty reserve".to_string()),
        },
    ]
}

pub(super) fn past_case(id: &str, related: &[&str], risk_score: Option<f64>) -> PastCase {
    PastCase {
        id: id.to_string(),
        title: id.to_string(),
        description: format!("{id} description"),
        related_component_ids: ids(related),
        kind: CaseKind::Issue,
        risk_score,
        date: None,
    }
}

pub(super) fn engine() -> EvaluationEngine {
    EvaluationEngine::new(EngineConfig::default())
}

/// Procedure that always errors, counting how often it was asked.
#[derive(Default)]
pub(super) struct FailingProcedure {
    pub(super) calls: AtomicUsize,
}

#[async_trait]
impl DecisionProcedure for FailingProcedure {
    fn name(&self) -> &str {
        "failing"
    }

    async fn check(&self, _assertions: &[Term]) -> Result<SatResult, SolverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SolverError::ExecutionFailed("solver crashed".to_string()))
    }
}

/// Procedure that answers every question with a fixed result.
pub(super) struct FixedProcedure(pub(super) SatResult);

#[async_trait]
impl DecisionProcedure for FixedProcedure {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn check(&self, _assertions: &[Term]) -> Result<SatResult, SolverError> {
        Ok(self.0)
    }
}

pub(super) fn shared<P: DecisionProcedure + 'static>(procedure: P) -> Arc<dyn DecisionProcedure> {
    Arc::new(procedure)
}
