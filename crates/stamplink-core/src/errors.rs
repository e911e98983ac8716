use thiserror::Error;

/// Model validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// `maxStamps` must be at least one.
    #[error("maxStamps must be greater than zero")]
    ZeroMaxStamps,
    /// A checkpoint at zero stamps can never be reached by an increment.
    #[error("checkpoint stamp count must be greater than zero")]
    ZeroCheckpoint,
    /// Two checkpoints share the same stamp count.
    #[error("duplicate checkpoint at {0} stamps")]
    DuplicateCheckpoint(u32),
    /// A checkpoint lies beyond the card.
    #[error("checkpoint at {stamp_count} stamps exceeds maxStamps {max_stamps}")]
    CheckpointBeyondMax {
        /// Offending checkpoint stamp count.
        stamp_count: u32,
        /// Configured maximum.
        max_stamps: u32,
    },
    /// A checkpoint has no reward text.
    #[error("checkpoint at {0} stamps has an empty reward")]
    EmptyReward(u32),
    /// A snapshot reports more stamps than its card holds.
    #[error("stamp count {stamps} exceeds maxStamps {max_stamps}")]
    StampsBeyondMax {
        /// Reported stamps.
        stamps: u32,
        /// Reported maximum.
        max_stamps: u32,
    },
    /// Identifier validation failed.
    #[error("invalid identifier: {0}")]
    Identifier(#[from] stamplink_canonical::ValidationError),
}
