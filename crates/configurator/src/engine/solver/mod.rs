//! External decision procedures used as an optional, behavior-equivalent alternative to direct
//! constraint evaluation.
//!
//! A procedure receives a complete list of boolean assertions per call and answers whether they
//! are jointly satisfiable. Nothing is retained between calls, so every check is isolated.

mod smtlib;
mod truth_table;

pub use smtlib::{render_script, render_term, symbol, SmtLibProcess};
pub use truth_table::TruthTableProcedure;

use std::fmt;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Boolean assertion language shared by every procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Var(String),
    Const(bool),
    Not(Box<Term>),
    And(Vec<Term>),
    Or(Vec<Term>),
    Implies(Box<Term>, Box<Term>),
    Xor(Box<Term>, Box<Term>),
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(name.into())
    }

    pub fn not(term: Term) -> Self {
        Term::Not(Box::new(term))
    }

    pub fn implies(antecedent: Term, consequent: Term) -> Self {
        Term::Implies(Box::new(antecedent), Box::new(consequent))
    }

    pub fn xor(left: Term, right: Term) -> Self {
        Term::Xor(Box::new(left), Box::new(right))
    }

    /// Evaluate under an assignment. Unassigned variables read as `false`.
    pub fn eval(&self, assignment: &dyn Fn(&str) -> bool) -> bool {
        match self {
            Term::Var(name) => assignment(name.as_str()),
            Term::Const(value) => *value,
            Term::Not(inner) => !inner.eval(assignment),
            Term::And(terms) => terms.iter().all(|term| term.eval(assignment)),
            Term::Or(terms) => terms.iter().any(|term| term.eval(assignment)),
            Term::Implies(antecedent, consequent) => {
                !antecedent.eval(assignment) || consequent.eval(assignment)
            }
            Term::Xor(left, right) => left.eval(assignment) != right.eval(assignment),
        }
    }

    pub(crate) fn collect_vars<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Term::Var(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name.as_str());
                }
            }
            Term::Const(_) => {}
            Term::Not(inner) => inner.collect_vars(out),
            Term::And(terms) | Term::Or(terms) => {
                for term in terms {
                    term.collect_vars(out);
                }
            }
            Term::Implies(left, right) | Term::Xor(left, right) => {
                left.collect_vars(out);
                right.collect_vars(out);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown,
}

#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("decision procedure not found: {0}")]
    NotFound(String),
    #[error("decision procedure failed: {0}")]
    ExecutionFailed(String),
    #[error("decision procedure timed out after {0} seconds")]
    Timeout(u64),
    #[error("unexpected decision procedure output: {0}")]
    UnexpectedOutput(String),
    #[error("{found} variables exceed the enumeration limit of {limit}")]
    TooManyVariables { found: usize, limit: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Satisfiability checker treated as a black box.
#[async_trait]
pub trait DecisionProcedure: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self, assertions: &[Term]) -> Result<SatResult, SolverError>;
}

/// Which procedure the process should wire in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverBackend {
    None,
    Builtin,
    SmtLib,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolverConfig {
    pub backend: SolverBackend,
    pub command: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: SolverBackend::None,
            command: "z3".to_string(),
            args: vec!["-in".to_string()],
            timeout_secs: 5,
        }
    }
}

type Initializer = Box<dyn Fn() -> Result<Arc<dyn DecisionProcedure>, SolverError> + Send + Sync>;

enum HandleState {
    Unavailable,
    Ready(Arc<dyn DecisionProcedure>),
    Lazy {
        init: Initializer,
        cell: OnceLock<Option<Arc<dyn DecisionProcedure>>>,
    },
}

/// Injectable access to a decision procedure, with an explicit unavailable state.
///
/// The lazy state runs its initializer on first use only and remembers the outcome, including
/// failure, for the lifetime of the handle.
pub struct DecisionProcedureHandle {
    state: HandleState,
}

impl DecisionProcedureHandle {
    pub fn unavailable() -> Self {
        Self {
            state: HandleState::Unavailable,
        }
    }

    pub fn ready(procedure: Arc<dyn DecisionProcedure>) -> Self {
        Self {
            state: HandleState::Ready(procedure),
        }
    }

    pub fn lazy(
        init: impl Fn() -> Result<Arc<dyn DecisionProcedure>, SolverError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: HandleState::Lazy {
                init: Box::new(init),
                cell: OnceLock::new(),
            },
        }
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        match config.backend {
            SolverBackend::None => Self::unavailable(),
            SolverBackend::Builtin => Self::ready(Arc::new(TruthTableProcedure::default())),
            SolverBackend::SmtLib => {
                let config = config.clone();
                Self::lazy(move || {
                    let process = SmtLibProcess::locate(
                        &config.command,
                        config.args.clone(),
                        config.timeout_secs,
                    )?;
                    Ok(Arc::new(process) as Arc<dyn DecisionProcedure>)
                })
            }
        }
    }

    pub fn get(&self) -> Option<Arc<dyn DecisionProcedure>> {
        match &self.state {
            HandleState::Unavailable => None,
            HandleState::Ready(procedure) => Some(procedure.clone()),
            HandleState::Lazy { init, cell } => cell
                .get_or_init(|| match init() {
                    Ok(procedure) => {
                        info!(procedure = procedure.name(), "decision procedure initialized");
                        Some(procedure)
                    }
                    Err(err) => {
                        info!(error = %err, "decision procedure unavailable");
                        None
                    }
                })
                .clone(),
        }
    }
}

impl fmt::Debug for DecisionProcedureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            HandleState::Unavailable => "unavailable",
            HandleState::Ready(_) => "ready",
            HandleState::Lazy { cell, .. } => match cell.get() {
                None => "uninitialized",
                Some(Some(_)) => "ready",
                Some(None) => "unavailable",
            },
        };
        f.debug_struct("DecisionProcedureHandle")
            .field("state", &state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn term_eval_follows_boolean_semantics() {
        let selected = |name: &str| name == "a";
        assert!(Term::implies(Term::var("b"), Term::var("a")).eval(&selected));
        assert!(!Term::implies(Term::var("a"), Term::var("b")).eval(&selected));
        assert!(Term::xor(Term::var("a"), Term::var("b")).eval(&selected));
        assert!(!Term::And(vec![Term::var("a"), Term::var("b")]).eval(&selected));
        assert!(Term::Or(vec![Term::var("a"), Term::var("b")]).eval(&selected));
        assert!(Term::not(Term::Const(false)).eval(&selected));
    }

    #[test]
    fn lazy_handle_initializes_once_and_caches_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = DecisionProcedureHandle::lazy(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(SolverError::NotFound("z3".to_string()))
        });

        assert!(handle.get().is_none());
        assert!(handle.get().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(format!("{handle:?}").contains("unavailable"));
    }

    #[test]
    fn builtin_backend_is_ready_immediately() {
        let config = SolverConfig {
            backend: SolverBackend::Builtin,
            ..SolverConfig::default()
        };
        let handle = DecisionProcedureHandle::from_config(&config);
        let procedure = handle.get().expect("builtin procedure available");
        assert_eq!(procedure.name(), "truth-table");
    }

    #[test]
    fn missing_smtlib_executable_leaves_handle_unavailable() {
        let config = SolverConfig {
            backend: SolverBackend::SmtLib,
            command: "definitely-not-a-solver-binary".to_string(),
            ..SolverConfig::default()
        };
        let handle = DecisionProcedureHandle::from_config(&config);
        assert!(handle.get().is_none());
    }
}
