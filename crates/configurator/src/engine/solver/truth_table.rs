use async_trait::async_trait;

use super::{DecisionProcedure, SatResult, SolverError, Term};

const DEFAULT_VARIABLE_LIMIT: usize = 20;

/// In-process procedure that enumerates every assignment of the free variables.
///
/// Exponential in the number of distinct variables, so it refuses inputs above its limit.
#[derive(Debug, Clone)]
pub struct TruthTableProcedure {
    variable_limit: usize,
}

impl TruthTableProcedure {
    pub fn with_limit(variable_limit: usize) -> Self {
        Self {
            variable_limit: variable_limit.min(63),
        }
    }
}

impl Default for TruthTableProcedure {
    fn default() -> Self {
        Self::with_limit(DEFAULT_VARIABLE_LIMIT)
    }
}

#[async_trait]
impl DecisionProcedure for TruthTableProcedure {
    fn name(&self) -> &str {
        "truth-table"
    }

    async fn check(&self, assertions: &[Term]) -> Result<SatResult, SolverError> {
        let mut vars = Vec::new();
        for assertion in assertions {
            assertion.collect_vars(&mut vars);
        }

        if vars.len() > self.variable_limit {
            return Err(SolverError::TooManyVariables {
                found: vars.len(),
                limit: self.variable_limit,
            });
        }

        for mask in 0u64..(1u64 << vars.len()) {
            let assignment = |name: &str| {
                vars.iter()
                    .position(|var| *var == name)
                    .map(|bit| mask & (1 << bit) != 0)
                    .unwrap_or(false)
            };
            if assertions.iter().all(|assertion| assertion.eval(&assignment)) {
                return Ok(SatResult::Sat);
            }
        }

        Ok(SatResult::Unsat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn pinned_variables_decide_the_formula() {
        let procedure = TruthTableProcedure::default();
        let assertions = vec![
            Term::var("a"),
            Term::not(Term::var("b")),
            Term::implies(Term::var("a"), Term::var("b")),
        ];

        let result = procedure.check(&assertions).await.expect("check runs");

        assert_eq!(result, SatResult::Unsat);
    }

    #[tokio::test]
    async fn free_variables_are_searched() {
        let procedure = TruthTableProcedure::default();
        let assertions = vec![Term::xor(Term::var("a"), Term::var("b")), Term::var("b")];

        let result = procedure.check(&assertions).await.expect("check runs");

        assert_eq!(result, SatResult::Sat);
    }

    #[tokio::test]
    async fn empty_assertion_set_is_satisfiable() {
        let result = TruthTableProcedure::default()
            .check(&[])
            .await
            .expect("check runs");
        assert_eq!(result, SatResult::Sat);
    }

    #[tokio::test]
    async fn refuses_inputs_over_the_limit() {
        let procedure = TruthTableProcedure::with_limit(2);
        let assertions = vec![Term::Or(vec![Term::var("a"), Term::var("b"), Term::var("c")])];

        let err = procedure.check(&assertions).await.unwrap_err();

        assert!(matches!(
            err,
            SolverError::TooManyVariables { found: 3, limit: 2 }
        ));
    }
}
