use std::borrow::Borrow;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Stable identifier of a catalog component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub String);

impl ComponentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ComponentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ComponentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ComponentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A selectable part. Absent `price` means "unknown", never zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Score in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturability: Option<f64>,
    /// Probability in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_cost: Option<f64>,
}

impl Component {
    pub fn new(id: impl Into<ComponentId>, name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: category.into(),
            price: None,
            description: None,
            manufacturability: None,
            failure_rate: None,
            failure_cost: None,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_failure(mut self, rate: f64, cost: f64) -> Self {
        self.failure_rate = Some(rate);
        self.failure_cost = Some(cost);
        self
    }

    pub fn with_manufacturability(mut self, score: f64) -> Self {
        self.manufacturability = Some(score);
        self
    }
}

/// Component catalog keyed by id. Preserves declaration order for iteration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Component>", into = "Vec<Component>")]
pub struct Catalog {
    components: Vec<Component>,
    index: HashMap<ComponentId, usize>,
}

impl Catalog {
    pub fn new(components: Vec<Component>) -> Self {
        let mut catalog = Self::default();
        for component in components {
            catalog.insert(component);
        }
        catalog
    }

    /// Later inserts with an existing id replace the earlier component.
    pub fn insert(&mut self, component: Component) {
        match self.index.get(&component.id) {
            Some(&position) => self.components[position] = component,
            None => {
                self.index
                    .insert(component.id.clone(), self.components.len());
                self.components.push(component);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Component> {
        self.index.get(id).map(|&position| &self.components[position])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.iter()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl From<Vec<Component>> for Catalog {
    fn from(components: Vec<Component>) -> Self {
        Self::new(components)
    }
}

impl From<Catalog> for Vec<Component> {
    fn from(catalog: Catalog) -> Self {
        catalog.components
    }
}

/// Decision slot offering an ordered list of eligible components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionPoint {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub available_component_ids: Vec<ComponentId>,
}

impl SelectionPoint {
    pub fn offers(&self, component_id: &str) -> bool {
        self.available_component_ids
            .iter()
            .any(|candidate| candidate.as_str() == component_id)
    }
}

/// One node of the configuration tree. The engine only ever reads trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationTreeNode {
    pub id: String,
    pub selection_point_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_component_id: Option<ComponentId>,
    #[serde(default)]
    pub children: Vec<ConfigurationTreeNode>,
}

impl ConfigurationTreeNode {
    pub fn new(id: impl Into<String>, selection_point_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            selection_point_id: selection_point_id.into(),
            selected_component_id: None,
            children: Vec::new(),
        }
    }

    pub fn selecting(mut self, component_id: impl Into<ComponentId>) -> Self {
        self.selected_component_id = Some(component_id.into());
        self
    }

    pub fn with_child(mut self, child: ConfigurationTreeNode) -> Self {
        self.children.push(child);
        self
    }

    /// Returns a copy of the tree with `node_id`'s selection replaced, or `None` when no node
    /// carries that id. Callers are responsible for checking eligibility via
    /// [`SelectionPoint::offers`] first.
    pub fn with_selection(&self, node_id: &str, component_id: impl Into<ComponentId>) -> Option<Self> {
        let mut updated = self.clone();
        let target = updated.find_mut(node_id)?;
        target.selected_component_id = Some(component_id.into());
        Some(updated)
    }

    fn find_mut(&mut self, node_id: &str) -> Option<&mut ConfigurationTreeNode> {
        if self.id == node_id {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_mut(node_id))
    }

    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(ConfigurationTreeNode::node_count)
            .sum::<usize>()
    }
}

/// Set of component ids chosen anywhere in a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectedSet(BTreeSet<ComponentId>);

impl SelectedSet {
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn insert(&mut self, id: ComponentId) -> bool {
        self.0.insert(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentId> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<I: Into<ComponentId>> FromIterator<I> for SelectedSet {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Informational classification; does not change evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Incompatibility,
    Required,
    Recommended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalOperator {
    And,
    Or,
    /// Joint exclusion: violated only when every operand is selected.
    Not,
    /// Consults the first two operands only.
    Implies,
    /// Consults the first two operands only.
    Xor,
}

impl LogicalOperator {
    pub fn label(&self) -> &'static str {
        match self {
            LogicalOperator::And => "and",
            LogicalOperator::Or => "or",
            LogicalOperator::Not => "not",
            LogicalOperator::Implies => "implies",
            LogicalOperator::Xor => "xor",
        }
    }

    fn minimum_operands(&self) -> usize {
        match self {
            LogicalOperator::Implies | LogicalOperator::Xor => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormulaError {
    #[error("'{operator}' requires at least {required} operand(s), found {found}")]
    TooFewOperands {
        operator: &'static str,
        required: usize,
        found: usize,
    },
}

#[derive(Deserialize)]
struct RawFormula {
    operator: LogicalOperator,
    operands: Vec<ComponentId>,
}

/// Declarative (operator, operands) formula over "is this component selected" propositions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFormula")]
pub struct LogicalFormula {
    operator: LogicalOperator,
    operands: Vec<ComponentId>,
}

impl LogicalFormula {
    pub fn new(operator: LogicalOperator, operands: Vec<ComponentId>) -> Result<Self, FormulaError> {
        let required = operator.minimum_operands();
        if operands.len() < required {
            return Err(FormulaError::TooFewOperands {
                operator: operator.label(),
                required,
                found: operands.len(),
            });
        }
        Ok(Self { operator, operands })
    }

    /// Two-operand formula, valid for every operator.
    pub fn binary(
        operator: LogicalOperator,
        left: impl Into<ComponentId>,
        right: impl Into<ComponentId>,
    ) -> Self {
        Self {
            operator,
            operands: vec![left.into(), right.into()],
        }
    }

    pub fn operator(&self) -> LogicalOperator {
        self.operator
    }

    pub fn operands(&self) -> &[ComponentId] {
        &self.operands
    }

    /// Operands the operator actually consults.
    pub fn consulted_operands(&self) -> &[ComponentId] {
        match self.operator {
            LogicalOperator::Implies | LogicalOperator::Xor => &self.operands[..2],
            _ => &self.operands,
        }
    }
}

impl TryFrom<RawFormula> for LogicalFormula {
    type Error = FormulaError;

    fn try_from(raw: RawFormula) -> Result<Self, Self::Error> {
        Self::new(raw.operator, raw.operands)
    }
}

/// Opaque check over the selected set, for rules that cannot be stated as a formula.
#[derive(Clone)]
pub struct ConstraintPredicate(Arc<dyn Fn(&SelectedSet) -> bool + Send + Sync>);

impl ConstraintPredicate {
    pub fn new(check: impl Fn(&SelectedSet) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(check))
    }

    pub fn is_satisfied(&self, selected: &SelectedSet) -> bool {
        (self.0)(selected)
    }
}

impl fmt::Debug for ConstraintPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConstraintPredicate(..)")
    }
}

/// Exactly one way of deciding a constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintRule {
    Formula { formula: LogicalFormula },
    /// Code-only variant: serializes as a bare marker and is never deserialized.
    #[serde(skip_deserializing)]
    Predicate {
        #[serde(skip_serializing)]
        predicate: ConstraintPredicate,
    },
}

impl ConstraintRule {
    pub fn formula(&self) -> Option<&LogicalFormula> {
        match self {
            ConstraintRule::Formula { formula } => Some(formula),
            ConstraintRule::Predicate { .. } => None,
        }
    }
}

/// Compatibility rule scoped to a set of relevant components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub id: String,
    pub kind: ConstraintKind,
    pub name: String,
    pub description: String,
    pub component_ids: Vec<ComponentId>,
    pub rule: ConstraintRule,
    pub severity: Severity,
}

impl Constraint {
    pub fn with_formula(
        id: impl Into<String>,
        kind: ConstraintKind,
        name: impl Into<String>,
        description: impl Into<String>,
        component_ids: Vec<ComponentId>,
        formula: LogicalFormula,
        severity: Severity,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            description: description.into(),
            component_ids,
            rule: ConstraintRule::Formula { formula },
            severity,
        }
    }

    pub fn with_predicate(
        id: impl Into<String>,
        kind: ConstraintKind,
        name: impl Into<String>,
        description: impl Into<String>,
        component_ids: Vec<ComponentId>,
        predicate: ConstraintPredicate,
        severity: Severity,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            description: description.into(),
            component_ids,
            rule: ConstraintRule::Predicate { predicate },
            severity,
        }
    }

    /// A constraint applies only when it touches at least one selected component.
    pub fn is_active(&self, selected: &SelectedSet) -> bool {
        self.component_ids
            .iter()
            .any(|id| selected.contains(id.as_str()))
    }
}

/// Numeric predicate of the form `<metric> <op> <number>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArithmeticConstraint {
    pub id: String,
    pub name: String,
    pub expression: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseKind {
    Success,
    Issue,
    Warning,
}

/// Historical record tied to a combination of components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PastCase {
    pub id: String,
    pub title: String,
    pub description: String,
    pub related_component_ids: Vec<ComponentId>,
    #[serde(rename = "type")]
    pub kind: CaseKind,
    /// Intended range 1-10.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}
