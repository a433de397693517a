//! Onboarding step machine: which verification the user is on.

use serde::{Deserialize, Serialize};

/// The steps of the onboarding wizard.
///
/// Progresses linearly: Pan → Face → Phone → Summary. No skipping, no going
/// back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Pan,
    Face,
    Phone,
    Summary,
}

impl Step {
    /// 1-based position in the wizard.
    pub fn number(&self) -> u8 {
        match self {
            Self::Pan => 1,
            Self::Face => 2,
            Self::Phone => 3,
            Self::Summary => 4,
        }
    }

    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: Step) -> bool {
        use Step::*;
        matches!(
            (self, target),
            (Pan, Face) | (Face, Phone) | (Phone, Summary)
        )
    }

    /// Whether this step is terminal (all verifications done).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Summary)
    }

    /// Get the next step in the linear progression, if any.
    pub fn next(&self) -> Option<Step> {
        use Step::*;
        match self {
            Pan => Some(Face),
            Face => Some(Phone),
            Phone => Some(Summary),
            Summary => None,
        }
    }
}

impl Default for Step {
    fn default() -> Self {
        Self::Pan
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pan => "pan",
            Self::Face => "face",
            Self::Phone => "phone",
            Self::Summary => "summary",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        use Step::*;
        for (from, to) in [(Pan, Face), (Face, Phone), (Phone, Summary)] {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
    }

    #[test]
    fn invalid_transitions() {
        use Step::*;
        // Skip steps
        assert!(!Pan.can_transition_to(Phone));
        assert!(!Pan.can_transition_to(Summary));
        assert!(!Face.can_transition_to(Summary));
        // Go backward
        assert!(!Face.can_transition_to(Pan));
        assert!(!Summary.can_transition_to(Pan));
        // Self-transition
        assert!(!Phone.can_transition_to(Phone));
    }

    #[test]
    fn next_walks_all_steps_in_order() {
        let mut current = Step::default();
        let mut seen = vec![current.number()];
        while let Some(next) = current.next() {
            assert!(current.can_transition_to(next));
            current = next;
            seen.push(current.number());
        }
        assert_eq!(seen, vec![1, 2, 3, 4]);
        assert!(current.is_terminal());
    }

    #[test]
    fn display_matches_serde() {
        for step in [Step::Pan, Step::Face, Step::Phone, Step::Summary] {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(format!("\"{step}\""), json, "Display and serde should match for {step:?}");
        }
    }
}
