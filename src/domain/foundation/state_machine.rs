//! State machine trait for status enums.

use super::ValidationError;

/// Trait for status enums that represent state machines.
///
/// Implementors list their legal edges; `transition_to` validates against them.
///
/// ```ignore
/// let next = SubscriptionStatus::Pending.transition_to(SubscriptionStatus::Active)?;
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs transition with validation, returning error if invalid.
    fn transition_to(&self, target: Self) -> Result<Self, ValidationError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(ValidationError::invalid_format(
                "state_transition",
                format!("Cannot transition from {:?} to {:?}", self, target),
            ))
        }
    }

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Light {
        Off,
        On,
        Broken,
    }

    impl StateMachine for Light {
        fn can_transition_to(&self, target: &Self) -> bool {
            use Light::*;
            matches!((self, target), (Off, On) | (On, Off) | (On, Broken))
        }

        fn valid_transitions(&self) -> Vec<Self> {
            use Light::*;
            match self {
                Off => vec![On],
                On => vec![Off, Broken],
                Broken => vec![],
            }
        }
    }

    #[test]
    fn transition_to_succeeds_for_valid_edge() {
        assert_eq!(Light::Off.transition_to(Light::On), Ok(Light::On));
    }

    #[test]
    fn transition_to_fails_for_missing_edge() {
        assert!(Light::Off.transition_to(Light::Broken).is_err());
    }

    #[test]
    fn is_terminal_only_without_outgoing_edges() {
        assert!(Light::Broken.is_terminal());
        assert!(!Light::On.is_terminal());
    }
}
