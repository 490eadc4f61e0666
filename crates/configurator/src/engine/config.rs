use super::solver::SolverConfig;

/// Knobs the orchestrator reads on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Category tags that must be covered by at least one selected component.
    pub mandatory_categories: Vec<String>,
    pub solver: SolverConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mandatory_categories: vec!["engine".to_string(), "transmission".to_string()],
            solver: SolverConfig::default(),
        }
    }
}
