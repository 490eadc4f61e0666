//! Read-only textual views of a configuration's constraints, for display and debugging.

use serde::Serialize;

use super::arithmetic::{parse_expression, Comparison};
use super::domain::{
    ArithmeticConstraint, Catalog, ComponentId, Constraint, LogicalFormula, LogicalOperator,
    SelectedSet,
};
use super::logical::formula_term;
use super::pricing::ConfigurationMetrics;
use super::solver::{render_term, symbol, Term};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedComponentView {
    pub id: ComponentId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiagnosticBundle {
    pub selected_components: Vec<SelectedComponentView>,
    pub logical_constraints: Vec<String>,
    pub arithmetic_constraints: Vec<String>,
    pub diagnostic_program: String,
}

pub fn render_formula(formula: &LogicalFormula) -> String {
    let operands: Vec<&str> = formula
        .consulted_operands()
        .iter()
        .map(ComponentId::as_str)
        .collect();

    match formula.operator() {
        LogicalOperator::And => operands.join(" AND "),
        LogicalOperator::Or => operands.join(" OR "),
        LogicalOperator::Not => format!("NOT ({})", operands.join(" AND ")),
        LogicalOperator::Implies => format!("{} IMPLIES {}", operands[0], operands[1]),
        LogicalOperator::Xor => format!("{} XOR {}", operands[0], operands[1]),
    }
}

/// Exact SMT-LIB decimal for a finite value. `Display` for `f64` is the shortest round-trip form
/// and never uses exponent notation.
fn real_literal(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    let mut digits = value.abs().to_string();
    if !digits.contains('.') {
        digits.push_str(".0");
    }
    if value.is_sign_negative() && value != 0.0 {
        Some(format!("(- {digits})"))
    } else {
        Some(digits)
    }
}

fn assign_metric(lines: &mut Vec<String>, label: &str, value: f64) {
    match real_literal(value) {
        Some(literal) => lines.push(format!("(assert (= {label} {literal}))")),
        None => lines.push(format!("; {label} skipped: value {value} is not finite")),
    }
}

/// Replace variables for unselected components with `false`, keeping the program closed over
/// the declared variables.
fn pin_unselected(term: Term, selected: &SelectedSet) -> Term {
    match term {
        Term::Var(name) if !selected.contains(&name) => Term::Const(false),
        Term::Not(inner) => Term::not(pin_unselected(*inner, selected)),
        Term::And(terms) => Term::And(
            terms
                .into_iter()
                .map(|term| pin_unselected(term, selected))
                .collect(),
        ),
        Term::Or(terms) => Term::Or(
            terms
                .into_iter()
                .map(|term| pin_unselected(term, selected))
                .collect(),
        ),
        Term::Implies(left, right) => Term::implies(
            pin_unselected(*left, selected),
            pin_unselected(*right, selected),
        ),
        Term::Xor(left, right) => Term::xor(
            pin_unselected(*left, selected),
            pin_unselected(*right, selected),
        ),
        other => other,
    }
}

fn diagnostic_program(
    selected: &SelectedSet,
    constraints: &[Constraint],
    arithmetic: &[ArithmeticConstraint],
    metrics: &ConfigurationMetrics,
) -> String {
    let mut lines = Vec::new();

    for id in selected.iter() {
        let name = symbol(id.as_str());
        lines.push(format!("(declare-const {name} Bool)"));
        lines.push(format!("(assert {name})"));
    }

    lines.push("(declare-const total_price Real)".to_string());
    lines.push("(declare-const expected_failure_cost Real)".to_string());
    assign_metric(&mut lines, "total_price", metrics.total_price);
    assign_metric(&mut lines, "expected_failure_cost", metrics.expected_failure_cost);

    for constraint in constraints {
        if let Some(formula) = constraint.rule.formula() {
            let term = pin_unselected(formula_term(formula), selected);
            lines.push(format!("; {}", constraint.id));
            lines.push(format!("(assert {})", render_term(&term)));
        }
    }

    for constraint in arithmetic {
        match parse_expression(&constraint.expression) {
            Ok(expression) => {
                let operator = match expression.comparison {
                    Comparison::Equal => "=",
                    other => other.symbol(),
                };
                match real_literal(expression.threshold) {
                    Some(threshold) => {
                        lines.push(format!("; {}", constraint.id));
                        lines.push(format!(
                            "(assert ({operator} {} {threshold}))",
                            expression.metric.label()
                        ));
                    }
                    None => lines.push(format!(
                        "; {} skipped: threshold {} is not finite",
                        constraint.id, expression.threshold
                    )),
                }
            }
            Err(err) => lines.push(format!("; {} skipped: {err}", constraint.id)),
        }
    }

    lines.push("(check-sat)".to_string());
    lines.join("\n")
}

/// Build the diagnostic bundle. Pure: never feeds back into evaluation.
pub fn render_diagnostics(
    selected: &SelectedSet,
    catalog: &Catalog,
    constraints: &[Constraint],
    arithmetic: &[ArithmeticConstraint],
    metrics: &ConfigurationMetrics,
) -> DiagnosticBundle {
    let selected_components = selected
        .iter()
        .filter_map(|id| catalog.get(id.as_str()))
        .map(|component| SelectedComponentView {
            id: component.id.clone(),
            name: component.name.clone(),
        })
        .collect();

    let logical_constraints = constraints
        .iter()
        .filter_map(|constraint| {
            constraint
                .rule
                .formula()
                .map(|formula| format!("[{}] {}", constraint.id, render_formula(formula)))
        })
        .collect();

    let arithmetic_constraints = vec![
        format!("total_price = {}", metrics.total_price),
        format!("expected_failure_cost = {}", metrics.expected_failure_cost),
    ];

    DiagnosticBundle {
        selected_components,
        logical_constraints,
        arithmetic_constraints,
        diagnostic_program: diagnostic_program(selected, constraints, arithmetic, metrics),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formula(operator: LogicalOperator, operands: &[&str]) -> LogicalFormula {
        LogicalFormula::new(operator, operands.iter().map(|id| ComponentId::from(*id)).collect())
            .expect("valid formula")
    }

    #[test]
    fn formulas_use_fixed_templates() {
        assert_eq!(
            render_formula(&formula(LogicalOperator::Implies, &["a", "b"])),
            "a IMPLIES b"
        );
        assert_eq!(
            render_formula(&formula(LogicalOperator::Not, &["a", "b", "c"])),
            "NOT (a AND b AND c)"
        );
        assert_eq!(
            render_formula(&formula(LogicalOperator::Xor, &["a", "b", "c"])),
            "a XOR b"
        );
        assert_eq!(render_formula(&formula(LogicalOperator::Or, &["a", "b"])), "a OR b");
        assert_eq!(render_formula(&formula(LogicalOperator::And, &["a", "b"])), "a AND b");
    }

    #[test]
    fn real_literals_are_smtlib_decimals() {
        assert_eq!(real_literal(330_000.0).as_deref(), Some("330000.0"));
        assert_eq!(real_literal(0.25).as_deref(), Some("0.25"));
        assert_eq!(real_literal(-12.5).as_deref(), Some("(- 12.5)"));
        assert_eq!(real_literal(-0.0).as_deref(), Some("0.0"));
    }

    #[test]
    fn real_literals_keep_every_digit() {
        assert_eq!(real_literal(0.0000001).as_deref(), Some("0.0000001"));
        assert_eq!(real_literal(1e21).as_deref(), Some("1000000000000000000000.0"));
        assert_eq!(real_literal(0.1234567891).as_deref(), Some("0.1234567891"));
    }

    #[test]
    fn non_finite_values_have_no_literal() {
        assert_eq!(real_literal(f64::INFINITY), None);
        assert_eq!(real_literal(f64::NAN), None);
    }

    #[test]
    fn unselected_operands_become_false() {
        let selected: SelectedSet = ["a"].into_iter().collect();
        let term = pin_unselected(
            Term::implies(Term::var("a"), Term::var("b")),
            &selected,
        );
        assert_eq!(term, Term::implies(Term::var("a"), Term::Const(false)));
    }
}
