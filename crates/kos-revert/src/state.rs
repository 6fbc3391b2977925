//! Revert lifecycle states.

/// State of a single revert attempt.
///
/// ```text
/// Pending -> Eligible -> Compensating -> Done
///        \-> Rejected              \-> Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RevertState {
    /// The action has not been checked yet.
    Pending,

    /// Eligibility checks passed.
    Eligible,

    /// Eligibility checks failed; nothing was changed.
    Rejected,

    /// Compensating calls are in flight.
    Compensating,

    /// Compensation, inverse record and annotation all succeeded.
    Done,

    /// A step failed after checks passed.
    Failed,
}

impl RevertState {
    /// Returns true if no further transition is expected.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Done | Self::Failed)
    }

    /// Returns a string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Eligible => "eligible",
            Self::Rejected => "rejected",
            Self::Compensating => "compensating",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns true if `next` is a legal successor of this state.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Eligible | Self::Rejected)
                | (Self::Eligible, Self::Compensating)
                | (Self::Compensating, Self::Done | Self::Failed)
        )
    }
}

impl std::fmt::Display for RevertState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!RevertState::Pending.is_terminal());
        assert!(!RevertState::Compensating.is_terminal());
        assert!(RevertState::Rejected.is_terminal());
        assert!(RevertState::Done.is_terminal());
        assert!(RevertState::Failed.is_terminal());
    }

    #[test]
    fn test_transitions() {
        assert!(RevertState::Pending.can_transition_to(RevertState::Rejected));
        assert!(RevertState::Eligible.can_transition_to(RevertState::Compensating));
        assert!(!RevertState::Pending.can_transition_to(RevertState::Compensating));
        assert!(!RevertState::Done.can_transition_to(RevertState::Pending));
        assert!(!RevertState::Rejected.can_transition_to(RevertState::Compensating));
    }

    #[test]
    fn test_display() {
        assert_eq!(RevertState::Compensating.to_string(), "compensating");
    }
}
