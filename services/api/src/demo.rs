use clap::Args;
use std::sync::Arc;

use configurator::engine::{
    ArithmeticConstraint, CaseKind, Catalog, Component, ComponentId, ConfigurationTreeNode,
    Constraint, ConstraintKind, ConstraintPredicate, DiagnosticBundle, EvaluationResult,
    LogicalFormula, LogicalOperator, PastCase, SelectionPoint, Severity, SolverBackend,
};
use configurator::error::AppError;
use configurator::{ConfigurationService, EngineConfig, ProductDefinition, ProductId};

use crate::infra::InMemoryProductSource;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Re-select a node before evaluating, as NODE_ID=COMPONENT_ID (repeatable)
    #[arg(long = "select", value_name = "NODE_ID=COMPONENT_ID")]
    pub(crate) selections: Vec<String>,
    /// Check constraints through the built-in decision procedure instead of direct evaluation
    #[arg(long)]
    pub(crate) builtin_solver: bool,
    /// Also print the diagnostic program listing
    #[arg(long)]
    pub(crate) show_program: bool,
}

fn component(
    id: &str,
    name: &str,
    category: &str,
    price: f64,
    manufacturability: f64,
    failure: (f64, f64),
) -> Component {
    Component::new(id, name, category)
        .with_price(price)
        .with_manufacturability(manufacturability)
        .with_failure(failure.0, failure.1)
}

fn point(id: &str, name: &str, catalog: &Catalog, category: &str) -> SelectionPoint {
    SelectionPoint {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        available_component_ids: catalog
            .iter()
            .filter(|component| component.category == category)
            .map(|component| component.id.clone())
            .collect(),
    }
}

fn formula_rule(
    id: &str,
    kind: ConstraintKind,
    name: &str,
    description: &str,
    operator: LogicalOperator,
    operands: [&str; 2],
    severity: Severity,
) -> Constraint {
    let [left, right] = operands;
    Constraint::with_formula(
        id,
        kind,
        name,
        description,
        vec![ComponentId::from(left), ComponentId::from(right)],
        LogicalFormula::binary(operator, left, right),
        severity,
    )
}

fn case(id: &str, title: &str, related: &[&str], kind: CaseKind, risk: f64, date: &str) -> PastCase {
    PastCase {
        id: id.to_string(),
        title: title.to_string(),
        description: title.to_string(),
        related_component_ids: related.iter().map(|id| ComponentId::from(*id)).collect(),
        kind,
        risk_score: Some(risk),
        date: Some(date.to_string()),
    }
}

/// Passenger elevator used by `demo` and by `serve` when no catalog file is given.
pub(crate) fn elevator_product() -> ProductDefinition {
    let components = Catalog::new(vec![
        component("motor-ac", "AC induction motor", "motor", 800_000.0, 0.9, (0.02, 500_000.0)),
        component("motor-dc", "DC motor", "motor", 1_000_000.0, 0.8, (0.03, 600_000.0)),
        component("motor-gearless", "Gearless motor", "motor", 2_000_000.0, 0.7, (0.01, 800_000.0)),
        component("door-single-auto", "Single automatic door", "door", 400_000.0, 0.9, (0.04, 200_000.0)),
        component("door-double-auto", "Double automatic door", "door", 600_000.0, 0.8, (0.05, 300_000.0)),
        component("door-manual", "Manual door", "door", 150_000.0, 1.0, (0.08, 100_000.0)),
        component("control-relay", "Relay control", "control", 300_000.0, 1.0, (0.1, 400_000.0)),
        component("control-plc", "PLC control", "control", 800_000.0, 0.8, (0.03, 500_000.0)),
        component("control-iot", "IoT integrated control", "control", 1_500_000.0, 0.6, (0.02, 700_000.0)),
        component("safety-basic", "Basic safety gear", "safety", 200_000.0, 1.0, (0.05, 1_000_000.0)),
        component("safety-standard", "Standard safety gear", "safety", 500_000.0, 0.9, (0.02, 1_500_000.0)),
        component("safety-advanced", "Advanced safety gear", "safety", 1_000_000.0, 0.7, (0.01, 2_000_000.0)),
        component("speed-low", "Low speed (45 m/min)", "speed", 0.0, 1.0, (0.01, 100_000.0)),
        component("speed-medium", "Medium speed (105 m/min)", "speed", 300_000.0, 0.8, (0.02, 200_000.0)),
        component("speed-high", "High speed (210 m/min)", "speed", 800_000.0, 0.6, (0.03, 400_000.0)),
    ]);

    let selection_points = vec![
        point("sp-motor", "Motor", &components, "motor"),
        point("sp-door", "Door system", &components, "door"),
        point("sp-control", "Control system", &components, "control"),
        point("sp-safety", "Safety gear", &components, "safety"),
        point("sp-speed", "Speed class", &components, "speed"),
    ];

    let constraints = vec![
        formula_rule(
            "ec-1",
            ConstraintKind::Required,
            "High speed needs advanced safety",
            "high-speed elevators must carry the advanced safety gear",
            LogicalOperator::Implies,
            ["speed-high", "safety-advanced"],
            Severity::Error,
        ),
        formula_rule(
            "ec-2",
            ConstraintKind::Recommended,
            "IoT control prefers gearless motor",
            "IoT integrated control is recommended with the gearless motor",
            LogicalOperator::Implies,
            ["control-iot", "motor-gearless"],
            Severity::Warning,
        ),
        formula_rule(
            "ec-3",
            ConstraintKind::Incompatibility,
            "Manual door excludes relay control",
            "manual doors cannot be combined with relay control",
            LogicalOperator::Not,
            ["door-manual", "control-relay"],
            Severity::Error,
        ),
        formula_rule(
            "ec-4",
            ConstraintKind::Required,
            "Basic safety only at low speed",
            "basic safety gear is only allowed on low-speed elevators",
            LogicalOperator::Implies,
            ["safety-basic", "speed-low"],
            Severity::Error,
        ),
        formula_rule(
            "ec-5",
            ConstraintKind::Incompatibility,
            "Medium speed needs standard safety or better",
            "medium and high speed elevators need standard safety gear or better",
            LogicalOperator::Not,
            ["speed-medium", "safety-basic"],
            Severity::Error,
        ),
        Constraint::with_predicate(
            "ec-6",
            ConstraintKind::Recommended,
            "Double door needs a motor upgrade",
            "double automatic doors are recommended with a DC or gearless motor",
            vec![ComponentId::from("door-double-auto")],
            ConstraintPredicate::new(|selected| {
                selected.contains("motor-dc") || selected.contains("motor-gearless")
            }),
            Severity::Info,
        ),
    ];

    let arithmetic_constraints = vec![
        ArithmeticConstraint {
            id: "eac-1".to_string(),
            name: "Total cost ceiling".to_string(),
            expression: "total_price <= 5000000".to_string(),
            description: Some("the elevator system costs at most 5,000,000".to_string()),
        },
        ArithmeticConstraint {
            id: "eac-2".to_string(),
            name: "Expected failure cost ceiling".to_string(),
            expression: "expected_failure_cost <= 100000".to_string(),
            description: Some("expected failure cost stays at or below 100,000".to_string()),
        },
    ];

    let past_cases = vec![
        case("epc-1", "Relay control wear-out failures", &["control-relay"], CaseKind::Issue, 8.0, "2023-06"),
        case("epc-2", "Manual door left open", &["door-manual"], CaseKind::Warning, 7.0, "2023-09"),
        case("epc-3", "Predictive maintenance with IoT control", &["control-iot", "motor-gearless"], CaseKind::Success, 2.0, "2024-02"),
        case("epc-4", "Insufficient safety at high speed", &["speed-high", "safety-standard"], CaseKind::Issue, 9.0, "2023-04"),
        case("epc-5", "DC motor brush replacement cost", &["motor-dc"], CaseKind::Warning, 5.0, "2023-11"),
    ];

    let initial_tree = ConfigurationTreeNode::new("root", "sp-motor")
        .selecting("motor-ac")
        .with_child(ConfigurationTreeNode::new("door-node", "sp-door").selecting("door-single-auto"))
        .with_child(ConfigurationTreeNode::new("control-node", "sp-control").selecting("control-plc"))
        .with_child(ConfigurationTreeNode::new("safety-node", "sp-safety").selecting("safety-standard"))
        .with_child(ConfigurationTreeNode::new("speed-node", "sp-speed").selecting("speed-medium"));

    ProductDefinition {
        id: ProductId("elevator".to_string()),
        name: "Passenger elevator".to_string(),
        components,
        selection_points,
        constraints,
        arithmetic_constraints,
        past_cases,
        initial_tree,
    }
}

/// Categories every elevator configuration must cover.
pub(crate) fn elevator_mandatory_categories() -> Vec<String> {
    vec!["motor".to_string(), "door".to_string()]
}

/// Apply `NODE_ID=COMPONENT_ID` selections, refusing components the node's point does not offer.
fn apply_selections(
    product: &ProductDefinition,
    selections: &[String],
) -> Result<ConfigurationTreeNode, String> {
    let mut tree = product.initial_tree.clone();
    for raw in selections {
        let (node_id, component_id) = raw
            .split_once('=')
            .ok_or_else(|| format!("'{raw}' is not NODE_ID=COMPONENT_ID"))?;
        let point_id = find_point_id(&tree, node_id)
            .ok_or_else(|| format!("no node named '{node_id}'"))?;
        let offered = product
            .selection_point(&point_id)
            .is_some_and(|point| point.offers(component_id));
        if !offered {
            return Err(format!("'{component_id}' is not offered at node '{node_id}'"));
        }
        tree = tree
            .with_selection(node_id, component_id)
            .ok_or_else(|| format!("no node named '{node_id}'"))?;
    }
    Ok(tree)
}

fn find_point_id(node: &ConfigurationTreeNode, node_id: &str) -> Option<String> {
    if node.id == node_id {
        return Some(node.selection_point_id.clone());
    }
    node.children
        .iter()
        .find_map(|child| find_point_id(child, node_id))
}

fn render_result(product: &ProductDefinition, result: &EvaluationResult) {
    println!("Price: {:.0}", result.total_price);
    for line in &result.price_breakdown {
        println!("  - {} ({}): {:.0}", line.component_name, line.component_id, line.price);
    }
    println!(
        "Expected failure cost: {:.0} | manufacturability {}",
        result.metrics.expected_failure_cost,
        result
            .metrics
            .manufacturability
            .map(|score| format!("{score:.2}"))
            .unwrap_or_else(|| "n/a".to_string())
    );

    if result.constraint_violations.is_empty() {
        println!("Constraint violations: none");
    } else {
        println!("Constraint violations:");
        for violation in &result.constraint_violations {
            println!(
                "  - [{:?}] {}: {}",
                violation.constraint.severity, violation.constraint.name, violation.message
            );
        }
    }

    if let Some(report) = &result.arithmetic {
        println!("Arithmetic constraints:");
        for outcome in &report.outcomes {
            println!(
                "  - {} ({}): {} (observed {:.0})",
                outcome.constraint.name,
                outcome.expression,
                if outcome.satisfied { "ok" } else { "VIOLATED" },
                outcome.observed
            );
        }
        for note in &report.diagnostics {
            println!("  - {} skipped: {}", note.constraint_id, note.reason);
        }
    }

    println!(
        "Risk score: {:.1} from {} related case(s) of {}",
        result.risk_score,
        result.related_cases.len(),
        product.past_cases.len()
    );
    for case in &result.related_cases {
        println!("  - {} ({:?})", case.title, case.kind);
    }

    if !result.warnings.is_empty() {
        println!("Warnings:");
        for warning in &result.warnings {
            println!("  - {warning}");
        }
    }
}

fn render_bundle(bundle: &DiagnosticBundle, show_program: bool) {
    println!("Rules:");
    for line in &bundle.logical_constraints {
        println!("  {line}");
    }
    for line in &bundle.arithmetic_constraints {
        println!("  {line}");
    }
    if show_program {
        println!("\nDiagnostic program:\n{}", bundle.diagnostic_program);
    }
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        selections,
        builtin_solver,
        show_program,
    } = args;

    let product = elevator_product();
    let tree = apply_selections(&product, &selections).map_err(AppError::Selection)?;

    let mut config = EngineConfig {
        mandatory_categories: elevator_mandatory_categories(),
        ..EngineConfig::default()
    };
    if builtin_solver {
        config.solver.backend = SolverBackend::Builtin;
    }

    let product_id = product.id.clone();
    let service = ConfigurationService::new(
        Arc::new(InMemoryProductSource::from_products([product.clone()])),
        config,
    );

    println!(
        "{} configuration demo ({} strategy)",
        product.name,
        service.engine().strategy_name()
    );
    let result = service.evaluate(&product_id, Some(tree.clone())).await?;
    render_result(&product, &result);

    let bundle = service.expressions(&product_id, Some(tree))?;
    println!();
    render_bundle(&bundle, show_program);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use configurator::EvaluationEngine;

    #[tokio::test]
    async fn initial_elevator_configuration_is_clean() {
        let product = elevator_product();
        let engine = EvaluationEngine::new(EngineConfig {
            mandatory_categories: elevator_mandatory_categories(),
            ..EngineConfig::default()
        });

        let result = engine
            .evaluate(&product.input(&product.initial_tree))
            .await;

        assert_eq!(result.total_price, 2_800_000.0);
        assert!(result.constraint_violations.is_empty());
        assert!(result.warnings.is_empty());
        assert_eq!(result.risk_score, 5.0);
        let report = result.arithmetic.expect("arithmetic constraints supplied");
        assert_eq!(report.violations().count(), 0);
    }

    #[tokio::test]
    async fn selections_drive_rule_violations() {
        let product = elevator_product();
        let tree = apply_selections(
            &product,
            &[
                "speed-node=speed-high".to_string(),
                "door-node=door-double-auto".to_string(),
            ],
        )
        .expect("offered components");

        let result = EvaluationEngine::default()
            .evaluate(&product.input(&tree))
            .await;

        let fired: Vec<&str> = result
            .constraint_violations
            .iter()
            .map(|violation| violation.constraint.id.as_str())
            .collect();
        assert_eq!(fired, vec!["ec-1", "ec-6"]);
        assert_eq!(result.risk_score, 9.0);
    }

    #[test]
    fn ineligible_selection_is_rejected() {
        let product = elevator_product();
        let err = apply_selections(&product, &["door-node=motor-dc".to_string()])
            .expect_err("motor is not a door");
        assert!(err.contains("not offered"));
        assert!(apply_selections(&product, &["nowhere".to_string()]).is_err());
    }

    #[tokio::test]
    async fn rejected_selection_fails_the_demo() {
        let args = DemoArgs {
            selections: vec!["door-node=motor-dc".to_string()],
            builtin_solver: false,
            show_program: false,
        };

        let err = run_demo(args).await.expect_err("selection not offered");

        assert!(matches!(err, AppError::Selection(reason) if reason.contains("motor-dc")));
    }
}
