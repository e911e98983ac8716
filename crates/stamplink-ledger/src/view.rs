//! Derived views of a member's card against the checkpoint configuration.

use serde::Serialize;
use stamplink_core::{Checkpoint, CheckpointConfig, Member};

/// Where a member stands on their card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Stamps collected.
    pub stamps: u32,
    /// Card capacity.
    pub max_stamps: u32,
    /// Stamps left before the card is full.
    pub remaining: u32,
    /// Rewards already unlocked, ascending.
    pub earned: Vec<Checkpoint>,
    /// Next reward and how many stamps it still needs.
    pub next: Option<(Checkpoint, u32)>,
}

/// Checkpoints the member has reached, ascending by stamp count.
///
/// Checkpoints above the member's own capacity are ignored.
pub fn earned_rewards(member: &Member, config: &CheckpointConfig) -> Vec<Checkpoint> {
    let mut earned: Vec<Checkpoint> = config
        .checkpoints
        .iter()
        .filter(|cp| cp.stamp_count <= member.stamps && cp.stamp_count <= member.max_stamps)
        .cloned()
        .collect();
    earned.sort_by_key(|cp| cp.stamp_count);
    earned
}

/// Builds the progress view for `member`.
pub fn progress(member: &Member, config: &CheckpointConfig) -> Progress {
    let next = config
        .next_checkpoint(member.stamps)
        .filter(|cp| cp.stamp_count <= member.max_stamps)
        .map(|cp| (cp.clone(), cp.stamp_count - member.stamps));

    Progress {
        stamps: member.stamps,
        max_stamps: member.max_stamps,
        remaining: member.remaining(),
        earned: earned_rewards(member, config),
        next,
    }
}
