use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::common::*;
use crate::engine::solver::SmtLibProcess;
use crate::engine::{
    Constraint, ConstraintKind, ConstraintPredicate, DecisionProcedureHandle, DelegatedStrategy,
    DirectStrategy, EngineConfig, EvaluationEngine, EvaluationInput, EvaluationStrategy,
    SatResult, SelectedSet, Severity, SolverBackend, SolverConfig, TruthTableProcedure,
};

fn violation_ids(violations: &[crate::engine::ConstraintViolation]) -> Vec<String> {
    violations
        .iter()
        .map(|violation| violation.constraint.id.clone())
        .collect()
}

fn delegated(handle: DecisionProcedureHandle) -> DelegatedStrategy {
    DelegatedStrategy::new(Arc::new(handle))
}

#[tokio::test]
async fn truth_table_delegation_matches_direct_evaluation() {
    let constraints = constraints();
    let strategy = delegated(DecisionProcedureHandle::ready(shared(
        TruthTableProcedure::default(),
    )));

    for selection in [
        vec!["tow-1"],
        vec!["tow-1", "eng-1"],
        vec!["eng-1", "eng-2"],
        vec!["eng-2", "trans-2"],
        vec![],
    ] {
        let selected: SelectedSet = selection.iter().copied().collect();
        let direct = DirectStrategy.evaluate(&selected, &constraints);
        let delegated = strategy.violations(&selected, &constraints).await;
        assert_eq!(
            violation_ids(&direct),
            violation_ids(&delegated),
            "selection {selection:?}"
        );
    }
}

#[tokio::test]
async fn failing_procedure_falls_back_to_direct() {
    let constraints = constraints();
    let procedure = Arc::new(FailingProcedure::default());
    let strategy = delegated(DecisionProcedureHandle::ready(procedure.clone()));
    let selected: SelectedSet = ["tow-1", "eng-2"].into_iter().collect();

    let violations = strategy.violations(&selected, &constraints).await;

    assert_eq!(violation_ids(&violations), vec!["tow-needs-v8"]);
    assert_eq!(procedure.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_answers_fall_back_to_direct() {
    let constraints = constraints();
    let strategy = delegated(DecisionProcedureHandle::ready(shared(FixedProcedure(
        SatResult::Unknown,
    ))));
    let selected: SelectedSet = ["tow-1"].into_iter().collect();

    let violations = strategy.violations(&selected, &constraints).await;

    assert_eq!(violation_ids(&violations), vec!["tow-needs-v8"]);
}

#[tokio::test]
async fn unavailable_handle_uses_direct_evaluation() {
    let constraints = constraints();
    let strategy = delegated(DecisionProcedureHandle::unavailable());
    let selected: SelectedSet = ["eng-2", "trans-2"].into_iter().collect();

    let violations = strategy.violations(&selected, &constraints).await;

    assert_eq!(violation_ids(&violations), vec!["hybrid-manual"]);
}

#[tokio::test]
async fn predicate_constraints_follow_the_activation_rule() {
    let predicate = Constraint::with_predicate(
        "no-sound-with-tow",
        ConstraintKind::Recommended,
        "Sound and tow",
        "premium sound is not offered with the tow package",
        ids(&["sound-1"]),
        ConstraintPredicate::new(|selected| !selected.contains("tow-1")),
        Severity::Warning,
    );
    let constraints = vec![predicate];
    let strategy = delegated(DecisionProcedureHandle::ready(shared(
        TruthTableProcedure::default(),
    )));

    let inactive: SelectedSet = ["tow-1"].into_iter().collect();
    assert!(strategy.violations(&inactive, &constraints).await.is_empty());

    let active: SelectedSet = ["tow-1", "sound-1"].into_iter().collect();
    let violations = strategy.violations(&active, &constraints).await;
    assert_eq!(violation_ids(&violations), vec!["no-sound-with-tow"]);
    assert_eq!(
        violations[0].message,
        "premium sound is not offered with the tow package"
    );
}

#[tokio::test]
async fn engine_wires_builtin_backend_from_config() {
    let config = EngineConfig {
        solver: SolverConfig {
            backend: SolverBackend::Builtin,
            ..SolverConfig::default()
        },
        ..EngineConfig::default()
    };
    let engine = EvaluationEngine::new(config);
    assert_eq!(engine.strategy_name(), "delegated");
    assert_eq!(EvaluationEngine::default().strategy_name(), "direct");

    let catalog = catalog();
    let constraints = constraints();
    let tree = tree(&["tow-1", "eng-2", "trans-1"]);
    let result = engine
        .evaluate(&EvaluationInput::new(&tree, &catalog).with_constraints(&constraints))
        .await;

    assert_eq!(violation_ids(&result.constraint_violations), vec!["tow-needs-v8"]);
}

fn process_handle(command: &str, args: &[&str], timeout_secs: u64) -> DecisionProcedureHandle {
    let process = SmtLibProcess::locate(
        command,
        args.iter().map(|arg| arg.to_string()).collect(),
        timeout_secs,
    )
    .expect("stub executable on PATH");
    DecisionProcedureHandle::ready(shared(process))
}

#[cfg(unix)]
#[tokio::test]
async fn solver_timeout_falls_back_to_direct() {
    let constraints = constraints();
    let strategy = delegated(process_handle("sh", &["-c", "sleep 5"], 1));
    let selected: SelectedSet = ["tow-1", "eng-2"].into_iter().collect();

    let started = Instant::now();
    let violations = strategy.violations(&selected, &constraints).await;

    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(
        violation_ids(&violations),
        violation_ids(&DirectStrategy.evaluate(&selected, &constraints))
    );
    assert_eq!(violation_ids(&violations), vec!["tow-needs-v8"]);
}

#[cfg(unix)]
#[tokio::test]
async fn non_smtlib_output_falls_back_to_direct() {
    let constraints = constraints();
    let strategy = delegated(process_handle("cat", &[], 5));
    let selected: SelectedSet = ["eng-2", "trans-2"].into_iter().collect();

    let violations = strategy.violations(&selected, &constraints).await;

    assert_eq!(
        violation_ids(&violations),
        violation_ids(&DirectStrategy.evaluate(&selected, &constraints))
    );
    assert_eq!(violation_ids(&violations), vec!["hybrid-manual"]);
}
