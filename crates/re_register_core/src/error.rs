#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegisterError {
    #[error(
        "The update of the register {volume} with the dict {patch} is not possible. No strategy available"
    )]
    NoStrategy { volume: String, patch: String },

    #[error(
        "The update of the register {volume} with the dict {patch} is not possible. Diff between previous and next aren't 1 or 2"
    )]
    NeighbourGap { volume: String, patch: String },

    #[error(
        "Current Lemma previous: \"{current}\" != previous lemma name \"{actual}\" != new lemma value previous \"{proposed}\""
    )]
    PreviousMismatch {
        current: String,
        actual: String,
        proposed: String,
    },

    #[error(
        "Current Lemma next: \"{current}\" != next lemma name \"{actual}\" != new lemma value next \"{proposed}\""
    )]
    NextMismatch {
        current: String,
        actual: String,
        proposed: String,
    },

    #[error("Error init RegisterLemma. {reason} in {lemma}")]
    InvalidLemma { lemma: String, reason: String },
}

impl RegisterError {
    pub(crate) fn invalid_lemma(lemma: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidLemma {
            lemma: lemma.into(),
            reason: reason.into(),
        }
    }
}
