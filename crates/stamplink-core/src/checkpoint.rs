//! Reward checkpoints along a stamp card.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::errors::ModelError;

/// Card capacity used when neither the ledger nor a scanned code supplies one.
pub const DEFAULT_MAX_STAMPS: u32 = 10;

/// A stamp threshold and the reward unlocked when it is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Stamp count at which the reward unlocks.
    pub stamp_count: u32,
    /// Reward description.
    pub reward: String,
}

/// Card capacity plus the ordered set of reward checkpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointConfig {
    /// Card capacity.
    pub max_stamps: u32,
    /// Checkpoints, ascending by stamp count once normalized.
    pub checkpoints: Vec<Checkpoint>,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        let checkpoint = |stamp_count, reward: &str| Checkpoint {
            stamp_count,
            reward: reward.to_string(),
        };
        Self {
            max_stamps: DEFAULT_MAX_STAMPS,
            checkpoints: vec![
                checkpoint(3, "Free Lychee Tea"),
                checkpoint(5, "diskon 15% off game"),
                checkpoint(7, "Free french fries"),
                checkpoint(10, "Free all day pass"),
            ],
        }
    }
}

impl CheckpointConfig {
    /// Validates the configuration.
    ///
    /// Rejects a zero capacity, zero or duplicate stamp counts, checkpoints
    /// beyond the capacity, and blank rewards.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.max_stamps == 0 {
            return Err(ModelError::ZeroMaxStamps);
        }

        let mut seen = BTreeSet::new();
        for checkpoint in &self.checkpoints {
            if checkpoint.stamp_count == 0 {
                return Err(ModelError::ZeroCheckpoint);
            }
            if checkpoint.stamp_count > self.max_stamps {
                return Err(ModelError::CheckpointBeyondMax {
                    stamp_count: checkpoint.stamp_count,
                    max_stamps: self.max_stamps,
                });
            }
            if checkpoint.reward.trim().is_empty() {
                return Err(ModelError::EmptyReward(checkpoint.stamp_count));
            }
            if !seen.insert(checkpoint.stamp_count) {
                return Err(ModelError::DuplicateCheckpoint(checkpoint.stamp_count));
            }
        }
        Ok(())
    }

    /// Returns a copy with checkpoints sorted ascending and rewards trimmed.
    pub fn normalized(&self) -> Self {
        let mut checkpoints: Vec<Checkpoint> = self
            .checkpoints
            .iter()
            .map(|cp| Checkpoint {
                stamp_count: cp.stamp_count,
                reward: cp.reward.trim().to_string(),
            })
            .collect();
        checkpoints.sort_by_key(|cp| cp.stamp_count);
        Self {
            max_stamps: self.max_stamps,
            checkpoints,
        }
    }

    /// Reward unlocked at exactly `stamp_count`, if any.
    pub fn reward_at(&self, stamp_count: u32) -> Option<&str> {
        self.checkpoints
            .iter()
            .find(|cp| cp.stamp_count == stamp_count)
            .map(|cp| cp.reward.as_str())
    }

    /// Returns true if `stamp_count` is a checkpoint.
    pub fn is_checkpoint(&self, stamp_count: u32) -> bool {
        self.reward_at(stamp_count).is_some()
    }

    /// First checkpoint strictly above `stamps`.
    pub fn next_checkpoint(&self, stamps: u32) -> Option<&Checkpoint> {
        self.checkpoints
            .iter()
            .filter(|cp| cp.stamp_count > stamps)
            .min_by_key(|cp| cp.stamp_count)
    }
}
