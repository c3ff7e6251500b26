use crate::{ChainSpec, Epoch};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use tree_hash_derive::TreeHash;

/// Specifies a fork of the beacon chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct Fork {
    pub previous_version: u64,
    pub current_version: u64,
    pub epoch: Epoch,
}

impl Fork {
    /// Initializes the `Fork` from the genesis parameters in the `spec`.
    pub fn genesis(spec: &ChainSpec) -> Self {
        Self {
            previous_version: spec.genesis_fork_version,
            current_version: spec.genesis_fork_version,
            epoch: spec.genesis_epoch,
        }
    }

    /// Returns the fork version of the given `epoch`.
    pub fn get_fork_version(&self, epoch: Epoch) -> u64 {
        if epoch < self.epoch {
            self.previous_version
        } else {
            self.current_version
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChainSpec;

    #[test]
    fn version_switches_at_fork_epoch() {
        let fork = Fork {
            previous_version: 0,
            current_version: 1,
            epoch: Epoch::new(10),
        };
        assert_eq!(fork.get_fork_version(Epoch::new(9)), 0);
        assert_eq!(fork.get_fork_version(Epoch::new(10)), 1);
        assert_eq!(fork.get_fork_version(Epoch::new(11)), 1);
    }

    #[test]
    fn genesis_versions_match() {
        let spec = ChainSpec::foundation();
        let fork = Fork::genesis(&spec);
        assert_eq!(fork.previous_version, fork.current_version);
    }
}
