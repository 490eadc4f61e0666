use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use super::domain::{Constraint, ConstraintRule, LogicalFormula, LogicalOperator, SelectedSet};
use super::solver::{DecisionProcedure, DecisionProcedureHandle, SatResult, SolverError, Term};

/// A constraint that failed its check, carrying the constraint's description as the message.
#[derive(Debug, Clone, Serialize)]
pub struct ConstraintViolation {
    pub constraint: Constraint,
    pub message: String,
}

impl ConstraintViolation {
    fn of(constraint: &Constraint) -> Self {
        Self {
            constraint: constraint.clone(),
            message: constraint.description.clone(),
        }
    }
}

/// Interpret a formula directly against the selected set.
pub fn formula_holds(formula: &LogicalFormula, selected: &SelectedSet) -> bool {
    let values: Vec<bool> = formula
        .consulted_operands()
        .iter()
        .map(|id| selected.contains(id.as_str()))
        .collect();

    match formula.operator() {
        LogicalOperator::And => values.iter().all(|value| *value),
        LogicalOperator::Or => values.iter().any(|value| *value),
        LogicalOperator::Not => !values.iter().all(|value| *value),
        LogicalOperator::Implies => !values[0] || values[1],
        LogicalOperator::Xor => values[0] != values[1],
    }
}

/// The same formula as a decision-procedure assertion.
pub fn formula_term(formula: &LogicalFormula) -> Term {
    let mut vars: Vec<Term> = formula
        .consulted_operands()
        .iter()
        .map(|id| Term::var(id.as_str()))
        .collect();

    match formula.operator() {
        LogicalOperator::And => Term::And(vars),
        LogicalOperator::Or => Term::Or(vars),
        LogicalOperator::Not => Term::not(Term::And(vars)),
        LogicalOperator::Implies => {
            let consequent = vars.remove(1);
            Term::implies(vars.remove(0), consequent)
        }
        LogicalOperator::Xor => {
            let right = vars.remove(1);
            Term::xor(vars.remove(0), right)
        }
    }
}

/// Assertions pinning every operand to its selection state, followed by the formula itself.
pub fn formula_assertions(formula: &LogicalFormula, selected: &SelectedSet) -> Vec<Term> {
    let mut assertions: Vec<Term> = Vec::new();
    let mut pinned: Vec<&str> = Vec::new();
    for id in formula.operands() {
        if pinned.contains(&id.as_str()) {
            continue;
        }
        pinned.push(id.as_str());
        let var = Term::var(id.as_str());
        assertions.push(if selected.contains(id.as_str()) {
            var
        } else {
            Term::not(var)
        });
    }
    assertions.push(formula_term(formula));
    assertions
}

fn predicate_violation(constraint: &Constraint, selected: &SelectedSet) -> Option<ConstraintViolation> {
    match &constraint.rule {
        ConstraintRule::Predicate { predicate } if !predicate.is_satisfied(selected) => {
            Some(ConstraintViolation::of(constraint))
        }
        _ => None,
    }
}

/// One way of deciding which constraints the selection violates.
///
/// Every implementation honours the activation rule and must report the same violations for the
/// same input.
#[async_trait]
pub trait EvaluationStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn violations(
        &self,
        selected: &SelectedSet,
        constraints: &[Constraint],
    ) -> Vec<ConstraintViolation>;
}

/// Local boolean interpretation.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectStrategy;

impl DirectStrategy {
    pub fn evaluate(&self, selected: &SelectedSet, constraints: &[Constraint]) -> Vec<ConstraintViolation> {
        constraints
            .iter()
            .filter(|constraint| constraint.is_active(selected))
            .filter_map(|constraint| match &constraint.rule {
                ConstraintRule::Formula { formula } => {
                    (!formula_holds(formula, selected)).then(|| ConstraintViolation::of(constraint))
                }
                ConstraintRule::Predicate { .. } => predicate_violation(constraint, selected),
            })
            .collect()
    }
}

#[async_trait]
impl EvaluationStrategy for DirectStrategy {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn violations(
        &self,
        selected: &SelectedSet,
        constraints: &[Constraint],
    ) -> Vec<ConstraintViolation> {
        self.evaluate(selected, constraints)
    }
}

/// Delegates formula checks to a decision procedure, falling back to [`DirectStrategy`] for the
/// whole call when the procedure is unavailable or fails.
#[derive(Debug, Clone)]
pub struct DelegatedStrategy {
    handle: Arc<DecisionProcedureHandle>,
}

impl DelegatedStrategy {
    pub fn new(handle: Arc<DecisionProcedureHandle>) -> Self {
        Self { handle }
    }

    async fn delegate(
        &self,
        procedure: &dyn DecisionProcedure,
        selected: &SelectedSet,
        constraints: &[Constraint],
    ) -> Result<Vec<ConstraintViolation>, SolverError> {
        let mut violations = Vec::new();

        for constraint in constraints {
            if !constraint.is_active(selected) {
                continue;
            }

            match &constraint.rule {
                ConstraintRule::Formula { formula } => {
                    let assertions = formula_assertions(formula, selected);
                    match procedure.check(&assertions).await? {
                        SatResult::Sat => {}
                        SatResult::Unsat => violations.push(ConstraintViolation::of(constraint)),
                        SatResult::Unknown => {
                            return Err(SolverError::UnexpectedOutput(format!(
                                "unknown result for constraint {}",
                                constraint.id
                            )))
                        }
                    }
                }
                ConstraintRule::Predicate { .. } => {
                    violations.extend(predicate_violation(constraint, selected));
                }
            }
        }

        Ok(violations)
    }
}

#[async_trait]
impl EvaluationStrategy for DelegatedStrategy {
    fn name(&self) -> &'static str {
        "delegated"
    }

    async fn violations(
        &self,
        selected: &SelectedSet,
        constraints: &[Constraint],
    ) -> Vec<ConstraintViolation> {
        let Some(procedure) = self.handle.get() else {
            return DirectStrategy.evaluate(selected, constraints);
        };

        match self.delegate(procedure.as_ref(), selected, constraints).await {
            Ok(violations) => violations,
            Err(err) => {
                warn!(
                    procedure = procedure.name(),
                    error = %err,
                    "decision procedure failed; using direct evaluation"
                );
                DirectStrategy.evaluate(selected, constraints)
            }
        }
    }
}
