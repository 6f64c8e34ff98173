//! Deterministic program recommendation.

use execadvisor_shared::ProgramTier;

use crate::patterns::RecommendationRules;
use crate::state::UserProfile;

/// Map a profile to a program tier.
///
/// Precedence is EMBA, then IEMBA, then EMBA X:
/// - EMBA when experience and leadership both meet their thresholds
/// - IEMBA when only experience does
/// - EMBA X when the interests name one of the digital/innovation topics
pub fn recommend(profile: &UserProfile, rules: &RecommendationRules) -> Option<ProgramTier> {
    let experienced = profile
        .experience_years
        .is_some_and(|y| y >= rules.min_experience_years);
    let leads = profile
        .leadership_years
        .is_some_and(|y| y >= rules.min_leadership_years);

    if experienced && leads {
        return Some(ProgramTier::Emba);
    }
    if experienced {
        return Some(ProgramTier::Iemba);
    }

    let interest = profile.interest.as_deref()?.to_lowercase();
    rules
        .emba_x_interests
        .iter()
        .any(|kw| interest.contains(kw.as_str()))
        .then_some(ProgramTier::EmbaX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(exp: Option<u32>, lead: Option<u32>, interest: Option<&str>) -> UserProfile {
        UserProfile {
            experience_years: exp,
            leadership_years: lead,
            interest: interest.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn emba_needs_experience_and_leadership() {
        let rules = RecommendationRules::default();
        assert_eq!(
            recommend(&profile(Some(5), Some(2), None), &rules),
            Some(ProgramTier::Emba)
        );
        assert_eq!(
            recommend(&profile(Some(12), Some(6), Some("digital transformation")), &rules),
            Some(ProgramTier::Emba)
        );
    }

    #[test]
    fn iemba_when_leadership_is_short() {
        let rules = RecommendationRules::default();
        assert_eq!(
            recommend(&profile(Some(5), Some(1), None), &rules),
            Some(ProgramTier::Iemba)
        );
        assert_eq!(
            recommend(&profile(Some(8), None, Some("innovation")), &rules),
            Some(ProgramTier::Iemba)
        );
    }

    #[test]
    fn emba_x_from_interest() {
        let rules = RecommendationRules::default();
        assert_eq!(
            recommend(&profile(Some(3), Some(3), Some("strategy, innovation")), &rules),
            Some(ProgramTier::EmbaX)
        );
        assert_eq!(
            recommend(&profile(None, None, Some("Digitalisierung")), &rules),
            Some(ProgramTier::EmbaX)
        );
    }

    #[test]
    fn rule_table() {
        let rules = RecommendationRules::default();
        let cases = [
            (Some(6), Some(3), None, Some(ProgramTier::Emba)),
            (Some(6), Some(0), None, Some(ProgramTier::Iemba)),
            (Some(1), None, Some("digital"), Some(ProgramTier::EmbaX)),
            (Some(1), None, None, None),
            (None, None, Some("technologie"), Some(ProgramTier::EmbaX)),
            (None, None, Some("technology"), Some(ProgramTier::EmbaX)),
        ];
        for (exp, lead, interest, expected) in cases {
            assert_eq!(
                recommend(&profile(exp, lead, interest), &rules),
                expected,
                "experience={exp:?} leadership={lead:?} interest={interest:?}"
            );
        }
    }

    #[test]
    fn nothing_matches() {
        let rules = RecommendationRules::default();
        assert_eq!(recommend(&profile(None, None, None), &rules), None);
        assert_eq!(
            recommend(&profile(Some(4), Some(4), Some("strategy")), &rules),
            None
        );
    }

    #[test]
    fn thresholds_are_swappable() {
        let rules = RecommendationRules {
            min_experience_years: 10,
            ..Default::default()
        };
        assert_eq!(
            recommend(&profile(Some(8), Some(3), None), &rules),
            None
        );
    }
}
