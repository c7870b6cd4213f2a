use crate::settings::CorrectionSettings;

/// Result of reconciling an oracle score against measured distraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub score: u8,
    pub comment: String,
    pub overridden: bool,
}

/// Ceiling for the accepted score given the chunk's recent distraction:
/// `100 - recent`, plus the tolerance bonus unless the chunk was fully
/// distracted, never above 100.
pub fn max_allowed_score(recent_distraction_ratio: u8, tolerance_bonus: u8) -> u8 {
    let recent = recent_distraction_ratio.min(100) as u16;
    let mut max_allowed = 100 - recent;
    if recent < 100 {
        max_allowed += tolerance_bonus as u16;
    }
    max_allowed.min(100) as u8
}

/// The oracle is never allowed to be kinder than the measurements. When it
/// is, the score is clamped and its comment replaced with the stern one.
pub fn apply_correction(
    oracle_score: u8,
    oracle_comment: String,
    recent_distraction_ratio: u8,
    settings: &CorrectionSettings,
) -> Correction {
    let max_allowed = max_allowed_score(recent_distraction_ratio, settings.tolerance_bonus);
    if oracle_score > max_allowed {
        Correction {
            score: max_allowed,
            comment: settings.forced_comment.clone(),
            overridden: true,
        }
    } else {
        Correction {
            score: oracle_score,
            comment: oracle_comment,
            overridden: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CorrectionSettings {
        CorrectionSettings::default()
    }

    #[test]
    fn ceiling_includes_tolerance_bonus() {
        assert_eq!(max_allowed_score(0, 10), 100);
        assert_eq!(max_allowed_score(5, 10), 100);
        assert_eq!(max_allowed_score(90, 10), 20);
        assert_eq!(max_allowed_score(99, 10), 11);
        assert_eq!(max_allowed_score(100, 10), 0);
    }

    #[test]
    fn optimistic_score_is_clamped_with_stern_comment() {
        let corrected = apply_correction(90, "Great job!".into(), 90, &settings());
        assert_eq!(corrected.score, 20);
        assert!(corrected.overridden);
        assert_eq!(corrected.comment, settings().forced_comment);
    }

    #[test]
    fn honest_score_passes_through() {
        let corrected = apply_correction(40, "Could be better.".into(), 60, &settings());
        assert_eq!(
            corrected,
            Correction {
                score: 40,
                comment: "Could be better.".into(),
                overridden: false,
            }
        );
    }

    #[test]
    fn accepted_score_never_exceeds_bound() {
        for recent in 0..=100u8 {
            for oracle in 0..=100u8 {
                let accepted = apply_correction(oracle, String::new(), recent, &settings()).score;
                let bonus = if recent < 100 { 10 } else { 0 };
                let bound = (100 - recent as i32 + bonus).min(100);
                assert!(accepted as i32 <= bound, "oracle={oracle} recent={recent}");
                assert!(accepted <= oracle);
            }
        }
    }
}
