use std::fmt;

use serde::Serialize;
use tracing::warn;

use super::domain::ArithmeticConstraint;
use super::pricing::ConfigurationMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TotalPrice,
    ExpectedFailureCost,
}

impl Metric {
    pub fn label(&self) -> &'static str {
        match self {
            Metric::TotalPrice => "total_price",
            Metric::ExpectedFailureCost => "expected_failure_cost",
        }
    }

    pub fn value(&self, metrics: &ConfigurationMetrics) -> f64 {
        match self {
            Metric::TotalPrice => metrics.total_price,
            Metric::ExpectedFailureCost => metrics.expected_failure_cost,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Comparison {
    #[serde(rename = "<=")]
    AtMost,
    #[serde(rename = "<")]
    Below,
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = ">")]
    Above,
    #[serde(rename = "==")]
    Equal,
}

impl Comparison {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::AtMost => "<=",
            Comparison::Below => "<",
            Comparison::AtLeast => ">=",
            Comparison::Above => ">",
            Comparison::Equal => "==",
        }
    }

    pub fn holds(&self, left: f64, right: f64) -> bool {
        match self {
            Comparison::AtMost => left <= right,
            Comparison::Below => left < right,
            Comparison::AtLeast => left >= right,
            Comparison::Above => left > right,
            Comparison::Equal => left == right,
        }
    }
}

/// A successfully parsed `<metric> <op> <number>` expression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArithmeticExpression {
    pub metric: Metric,
    pub comparison: Comparison,
    pub threshold: f64,
}

impl fmt::Display for ArithmeticExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.metric.label(),
            self.comparison.symbol(),
            self.threshold
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExpressionError {
    #[error("expected metric 'total_price' or 'expected_failure_cost'")]
    UnknownMetric,
    #[error("expected one of <=, <, >=, >, ==, =")]
    MissingOperator,
    #[error("'{0}' is not a number")]
    InvalidNumber(String),
}

const COMPARISONS: [(&str, Comparison); 6] = [
    ("<=", Comparison::AtMost),
    (">=", Comparison::AtLeast),
    ("==", Comparison::Equal),
    ("<", Comparison::Below),
    (">", Comparison::Above),
    ("=", Comparison::Equal),
];

pub fn parse_expression(expression: &str) -> Result<ArithmeticExpression, ExpressionError> {
    let trimmed = expression.trim();

    let (metric, rest) = [Metric::TotalPrice, Metric::ExpectedFailureCost]
        .into_iter()
        .find_map(|metric| {
            trimmed
                .strip_prefix(metric.label())
                .map(|rest| (metric, rest.trim_start()))
        })
        .ok_or(ExpressionError::UnknownMetric)?;

    let (comparison, rest) = COMPARISONS
        .iter()
        .find_map(|(symbol, comparison)| {
            rest.strip_prefix(*symbol)
                .map(|rest| (*comparison, rest.trim()))
        })
        .ok_or(ExpressionError::MissingOperator)?;

    let numeric = rest.starts_with(|c: char| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'));
    let threshold = rest
        .parse::<f64>()
        .ok()
        .filter(|value| numeric && value.is_finite())
        .ok_or_else(|| ExpressionError::InvalidNumber(rest.to_string()))?;

    Ok(ArithmeticExpression {
        metric,
        comparison,
        threshold,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct ArithmeticOutcome {
    pub constraint: ArithmeticConstraint,
    pub expression: ArithmeticExpression,
    pub observed: f64,
    pub satisfied: bool,
}

/// Note attached to an expression that could not be parsed and was left out of the outcomes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArithmeticDiagnostic {
    pub constraint_id: String,
    pub expression: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ArithmeticReport {
    pub outcomes: Vec<ArithmeticOutcome>,
    pub diagnostics: Vec<ArithmeticDiagnostic>,
}

impl ArithmeticReport {
    pub fn violations(&self) -> impl Iterator<Item = &ArithmeticOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.satisfied)
    }
}

pub fn evaluate_arithmetic(
    constraints: &[ArithmeticConstraint],
    metrics: &ConfigurationMetrics,
) -> ArithmeticReport {
    let mut report = ArithmeticReport::default();

    for constraint in constraints {
        match parse_expression(&constraint.expression) {
            Ok(expression) => {
                let observed = expression.metric.value(metrics);
                report.outcomes.push(ArithmeticOutcome {
                    constraint: constraint.clone(),
                    expression,
                    observed,
                    satisfied: expression.comparison.holds(observed, expression.threshold),
                });
            }
            Err(err) => {
                warn!(
                    constraint = %constraint.id,
                    expression = %constraint.expression,
                    error = %err,
                    "skipping malformed arithmetic constraint"
                );
                report.diagnostics.push(ArithmeticDiagnostic {
                    constraint_id: constraint.id.clone(),
                    expression: constraint.expression.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    report
}
