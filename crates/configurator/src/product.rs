use std::fmt;

use serde::{Deserialize, Serialize};

use crate::engine::{
    ArithmeticConstraint, Catalog, ConfigurationTreeNode, Constraint, EvaluationInput, PastCase,
    SelectionPoint,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the engine needs to evaluate configurations of one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDefinition {
    pub id: ProductId,
    pub name: String,
    pub components: Catalog,
    #[serde(default)]
    pub selection_points: Vec<SelectionPoint>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub arithmetic_constraints: Vec<ArithmeticConstraint>,
    #[serde(default)]
    pub past_cases: Vec<PastCase>,
    pub initial_tree: ConfigurationTreeNode,
}

impl ProductDefinition {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn selection_point(&self, id: &str) -> Option<&SelectionPoint> {
        self.selection_points.iter().find(|point| point.id == id)
    }

    /// Full engine input for `tree`, including the arithmetic constraints.
    pub fn input<'a>(&'a self, tree: &'a ConfigurationTreeNode) -> EvaluationInput<'a> {
        EvaluationInput::new(tree, &self.components)
            .with_constraints(&self.constraints)
            .with_arithmetic(&self.arithmetic_constraints)
            .with_past_cases(&self.past_cases)
    }
}
