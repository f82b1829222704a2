use thiserror::Error;

/// Errors raised while turning a range specification into targets.
///
/// Both variants are fatal to the call and are reported before any probe is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    /// The specification is malformed or internally inconsistent.
    #[error("invalid range '{input}': {reason}")]
    InvalidRange { input: String, reason: String },

    /// The specification expands to more addresses than the configured cap.
    #[error("range of {requested} addresses exceeds the limit of {cap}")]
    RangeTooLarge { requested: u128, cap: usize },
}

impl RangeError {
    pub fn invalid(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
