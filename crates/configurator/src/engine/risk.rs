use serde::Serialize;

use super::domain::{PastCase, SelectedSet};

/// Score used when no related case carries a risk score: the midpoint of the 1-10 scale.
pub const NEUTRAL_RISK_SCORE: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub score: f64,
    pub related_cases: Vec<PastCase>,
}

/// A case is related when its component list is non-empty and fully selected.
pub fn is_related(case: &PastCase, selected: &SelectedSet) -> bool {
    !case.related_component_ids.is_empty()
        && case
            .related_component_ids
            .iter()
            .all(|id| selected.contains(id.as_str()))
}

/// Mean risk score of the related cases, rounded half away from zero to one decimal.
pub fn assess_risk(selected: &SelectedSet, past_cases: &[PastCase]) -> RiskAssessment {
    let related_cases: Vec<PastCase> = past_cases
        .iter()
        .filter(|case| is_related(case, selected))
        .cloned()
        .collect();

    let scores: Vec<f64> = related_cases
        .iter()
        .filter_map(|case| case.risk_score)
        .collect();

    let score = if scores.is_empty() {
        NEUTRAL_RISK_SCORE
    } else {
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        (mean * 10.0).round() / 10.0
    };

    RiskAssessment {
        score,
        related_cases,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::domain::{CaseKind, ComponentId};

    fn case(id: &str, related: &[&str], risk_score: Option<f64>) -> PastCase {
        PastCase {
            id: id.to_string(),
            title: id.to_string(),
            description: String::new(),
            related_component_ids: related.iter().map(|id| ComponentId::from(*id)).collect(),
            kind: CaseKind::Issue,
            risk_score,
            date: None,
        }
    }

    fn selection(ids: &[&str]) -> SelectedSet {
        ids.iter().copied().collect()
    }

    #[test]
    fn only_fully_matching_cases_count() {
        let cases = vec![
            case("match", &["control-relay"], Some(8.0)),
            case("partial", &["control-iot", "motor-gearless"], Some(2.0)),
        ];

        let assessment = assess_risk(&selection(&["control-relay", "control-iot"]), &cases);

        assert_eq!(assessment.score, 8.0);
        assert_eq!(assessment.related_cases.len(), 1);
        assert_eq!(assessment.related_cases[0].id, "match");
    }

    #[test]
    fn empty_related_list_never_matches() {
        let cases = vec![case("empty", &[], Some(9.0))];

        let assessment = assess_risk(&selection(&["anything"]), &cases);

        assert!(assessment.related_cases.is_empty());
        assert_eq!(assessment.score, NEUTRAL_RISK_SCORE);
    }

    #[test]
    fn unscored_cases_are_returned_but_do_not_move_the_score() {
        let cases = vec![case("unscored", &["a"], None)];

        let assessment = assess_risk(&selection(&["a"]), &cases);

        assert_eq!(assessment.related_cases.len(), 1);
        assert_eq!(assessment.score, NEUTRAL_RISK_SCORE);
    }

    #[test]
    fn mean_is_rounded_to_one_decimal() {
        let cases = vec![
            case("one", &["a"], Some(7.0)),
            case("two", &["a"], Some(2.0)),
            case("three", &["a"], Some(9.0)),
        ];

        let assessment = assess_risk(&selection(&["a"]), &cases);

        assert_eq!(assessment.score, 6.0);

        let cases = vec![
            case("one", &["a"], Some(1.0)),
            case("two", &["a"], Some(2.0)),
            case("three", &["a"], Some(2.0)),
        ];
        assert_eq!(assess_risk(&selection(&["a"]), &cases).score, 1.7);
    }
}
