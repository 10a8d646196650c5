//! Quality scorer: composite 0-100 score from completeness plus fixed
//! alignment bonuses.
//!
//! The three bonus pairs and their point values are carried over verbatim
//! from the product's current rules and must not be extended by analogy;
//! treat them as opaque constants pending product review.

use crate::params::{Dimension, ParameterSet};
use serde::Serialize;

/// A fixed bonus for one aligned value pair.
#[derive(Debug, Clone, Copy)]
pub struct BonusRule {
    pub name: &'static str,
    pub left: (Dimension, &'static str),
    pub right: (Dimension, &'static str),
    pub points: f32,
}

pub const BONUS_RULES: [BonusRule; 3] = [
    BonusRule {
        name: "critical-urgency-unlimited-resources",
        left: (Dimension::Urgency, "critical"),
        right: (Dimension::Resources, "unlimited"),
        points: 5.0,
    },
    BonusRule {
        name: "expert-complexity-enterprise-scale",
        left: (Dimension::Complexity, "expert"),
        right: (Dimension::Scale, "enterprise"),
        points: 4.0,
    },
    BonusRule {
        name: "low-urgency-simple-complexity",
        left: (Dimension::Urgency, "low"),
        right: (Dimension::Complexity, "simple"),
        points: 3.0,
    },
];

/// A bonus rule that fired for a given parameter set.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BonusAward {
    pub rule: &'static str,
    pub points: f32,
}

/// Derived score with its breakdown; never stored authoritatively.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    /// Composite integer score, always within [0, 100].
    pub composite: u8,
    /// Required dimensions carrying a value, out of 7.
    pub populated: usize,
    /// Completeness share of the score before bonuses, 0.0-100.0.
    pub completeness: f32,
    pub bonuses: Vec<BonusAward>,
}

/// Compute the composite score.
///
/// completeness = populated / 7 * 100, plus each fired bonus, clamped to
/// [0, 100] and rounded to the nearest integer. An empty set scores 0; a
/// fully populated set with no bonus pairs scores exactly 100 (the clamp is
/// load-bearing: bonuses must not push past 100).
pub fn score(params: &ParameterSet) -> ScoreResult {
    let populated = params.populated_count();
    let completeness = populated as f32 / Dimension::ALL.len() as f32 * 100.0;

    let mut bonuses = Vec::new();
    for rule in BONUS_RULES {
        let left_hit = params.get(rule.left.0) == Some(rule.left.1);
        let right_hit = params.get(rule.right.0) == Some(rule.right.1);
        if left_hit && right_hit {
            bonuses.push(BonusAward {
                rule: rule.name,
                points: rule.points,
            });
        }
    }

    let total: f32 = completeness + bonuses.iter().map(|b| b.points).sum::<f32>();
    let composite = total.clamp(0.0, 100.0).round() as u8;

    ScoreResult {
        composite,
        populated,
        completeness,
        bonuses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(pairs: &[(Dimension, &str)]) -> ParameterSet {
        let mut params = ParameterSet::default();
        for (dim, value) in pairs {
            params.set(*dim, *value);
        }
        params
    }

    #[test]
    fn empty_set_scores_zero() {
        let result = score(&ParameterSet::default());
        assert_eq!(result.composite, 0);
        assert!(result.bonuses.is_empty());
    }

    #[test]
    fn three_of_seven_rounds_to_43() {
        let params = set(&[
            (Dimension::Domain, "technology"),
            (Dimension::Scale, "team"),
            (Dimension::Output, "text"),
        ]);
        assert_eq!(score(&params).composite, 43);
    }

    #[test]
    fn full_set_without_bonus_pairs_is_exactly_100() {
        let params = set(&[
            (Dimension::Domain, "technology"),
            (Dimension::Scale, "team"),
            (Dimension::Urgency, "medium"),
            (Dimension::Complexity, "moderate"),
            (Dimension::Resources, "moderate"),
            (Dimension::Application, "generation"),
            (Dimension::Output, "text"),
        ]);
        let result = score(&params);
        assert_eq!(result.composite, 100);
        assert!(result.bonuses.is_empty());
    }

    #[test]
    fn bonuses_cannot_push_past_100() {
        let params = set(&[
            (Dimension::Domain, "technology"),
            (Dimension::Scale, "enterprise"),
            (Dimension::Urgency, "critical"),
            (Dimension::Complexity, "expert"),
            (Dimension::Resources, "unlimited"),
            (Dimension::Application, "generation"),
            (Dimension::Output, "report"),
        ]);
        let result = score(&params);
        assert_eq!(result.bonuses.len(), 2);
        assert_eq!(result.composite, 100);
    }

    #[test]
    fn each_bonus_pair_fires_alone() {
        let critical = set(&[
            (Dimension::Urgency, "critical"),
            (Dimension::Resources, "unlimited"),
        ]);
        let awarded = score(&critical);
        assert_eq!(
            awarded.bonuses,
            vec![BonusAward {
                rule: "critical-urgency-unlimited-resources",
                points: 5.0
            }]
        );
        // 2/7 * 100 = 28.57, +5 => 33.57 => 34
        assert_eq!(awarded.composite, 34);

        let calm = set(&[
            (Dimension::Urgency, "low"),
            (Dimension::Complexity, "simple"),
        ]);
        assert_eq!(score(&calm).bonuses[0].points, 3.0);

        let heavy = set(&[
            (Dimension::Complexity, "expert"),
            (Dimension::Scale, "enterprise"),
        ]);
        assert_eq!(score(&heavy).bonuses[0].points, 4.0);
    }

    #[test]
    fn score_is_always_in_range() {
        // Sweep every populated-count with and without bonuses.
        let values: [(Dimension, &str); 7] = [
            (Dimension::Domain, "technology"),
            (Dimension::Scale, "enterprise"),
            (Dimension::Urgency, "critical"),
            (Dimension::Complexity, "expert"),
            (Dimension::Resources, "unlimited"),
            (Dimension::Application, "analysis"),
            (Dimension::Output, "code"),
        ];
        for n in 0..=7 {
            let params = set(&values[..n]);
            let composite = score(&params).composite;
            assert!(composite <= 100, "n={n} gave {composite}");
        }
    }
}
