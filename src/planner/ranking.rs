//! Deduplication and risk ranking of raw rule matches

use crate::config::GuidelineRule;
use crate::domain::patient::Exposure;
use crate::domain::plan::FollowUpRecommendation;
use crate::matching::RuleMatch;
use std::collections::HashMap;
use uuid::Uuid;

/// Collapse raw matches to one recommendation per rule id.
///
/// First match wins, in the order produced by the matching engine (exposure order, then
/// catalog order). Later matches for the same rule only extend `triggered_by`; they never
/// change frequency or risk.
pub fn deduplicate(matches: &[RuleMatch<'_>]) -> Vec<FollowUpRecommendation> {
    let mut recommendations: Vec<FollowUpRecommendation> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for m in matches {
        let existing = positions.get(m.rule.id.as_str()).copied();
        match existing {
            Some(position) => {
                let triggers = &mut recommendations[position].triggered_by;
                if !triggers.contains(&m.exposure.id) {
                    triggers.push(m.exposure.id.clone());
                }
                tracing::debug!(
                    "Rule '{}' already recommended; exposure '{}' recorded as extra trigger",
                    m.rule.id,
                    m.exposure.id
                );
            }
            None => {
                positions.insert(m.rule.id.as_str(), recommendations.len());
                recommendations.push(recommend(m.rule, m.exposure));
            }
        }
    }

    recommendations
}

/// Order by risk level, highest first. The sort is stable: equal risk keeps dedup order.
pub fn rank(recommendations: &mut [FollowUpRecommendation]) {
    recommendations.sort_by(|a, b| b.risk_level.score().cmp(&a.risk_level.score()));
}

/// Copy a rule's content into a fresh recommendation
fn recommend(rule: &GuidelineRule, exposure: &Exposure) -> FollowUpRecommendation {
    FollowUpRecommendation {
        id: Uuid::new_v4().to_string(),
        rule_id: rule.id.clone(),
        late_effect: rule.late_effect_category.clone(),
        risk_level: rule.risk_level,
        test: rule.test_modality.clone(),
        frequency: rule.interval.clone(),
        start_criteria: rule.start_time_condition.clone(),
        clinician_text: rule.recommendation_clinician.clone(),
        patient_text: rule.recommendation_patient.clone(),
        source: rule.citation(),
        evidence: rule.evidence_strength,
        triggered_by: vec![exposure.id.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::rule;
    use crate::config::Criterion;
    use crate::domain::patient::ExposureType;
    use crate::domain::plan::RiskLevel;

    fn rule_match<'a>(rule: &'a GuidelineRule, exposure: &'a Exposure, index: usize) -> RuleMatch<'a> {
        RuleMatch { rule, exposure, exposure_index: index }
    }

    #[test]
    fn test_first_match_wins() {
        let hearing = rule(
            "hearing",
            ExposureType::Chemotherapy,
            RiskLevel::Moderate,
            Criterion::name_contains_any(["platino"]),
        );
        let cis = Exposure::new("e1", ExposureType::Chemotherapy, "Cisplatino");
        let carbo = Exposure::new("e2", ExposureType::Chemotherapy, "Carboplatino");

        let recs = deduplicate(&[rule_match(&hearing, &cis, 0), rule_match(&hearing, &carbo, 1)]);

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].rule_id, "hearing");
        assert_eq!(recs[0].triggered_by, vec!["e1".to_string(), "e2".to_string()]);
        assert_eq!(recs[0].frequency, "Yearly");
        assert_eq!(recs[0].source, "PanCare_2024 - Section hearing");
    }

    #[test]
    fn test_rank_is_stable_within_risk_level() {
        let any = || Criterion::name_contains_any(["x"]);
        let low = rule("low", ExposureType::Surgery, RiskLevel::Low, any());
        let mod_a = rule("mod-a", ExposureType::Surgery, RiskLevel::Moderate, any());
        let high = rule("high", ExposureType::Surgery, RiskLevel::High, any());
        let mod_b = rule("mod-b", ExposureType::Surgery, RiskLevel::Moderate, any());
        let exposure = Exposure::new("e", ExposureType::Surgery, "x");

        let mut recs = deduplicate(&[
            rule_match(&low, &exposure, 0),
            rule_match(&mod_a, &exposure, 0),
            rule_match(&high, &exposure, 0),
            rule_match(&mod_b, &exposure, 0),
        ]);
        rank(&mut recs);

        let order: Vec<&str> = recs.iter().map(|r| r.rule_id.as_str()).collect();
        assert_eq!(order, vec!["high", "mod-a", "mod-b", "low"]);
    }

    #[test]
    fn test_recommendation_ids_are_unique() {
        let a = rule("a", ExposureType::Surgery, RiskLevel::High, Criterion::name_contains_any(["x"]));
        let b = rule("b", ExposureType::Surgery, RiskLevel::High, Criterion::name_contains_any(["x"]));
        let exposure = Exposure::new("e", ExposureType::Surgery, "x");

        let recs = deduplicate(&[rule_match(&a, &exposure, 0), rule_match(&b, &exposure, 0)]);
        assert_ne!(recs[0].id, recs[1].id);
    }
}
