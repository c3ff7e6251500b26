use std::collections::{HashMap, HashSet};
use types::*;

/// Maps a shard to the root its committee converged on this epoch.
pub type WinningRootHashSet = HashMap<u64, WinningRoot>;

/// The crosslink data root with the most attesting balance behind it for one
/// committee, together with the balances crosslink rewards need.
#[derive(Clone)]
pub struct WinningRoot {
    pub crosslink_data_root: Hash256,
    pub attesting_validator_indices: Vec<usize>,
    pub total_attesting_balance: u64,
    pub total_committee_balance: u64,
}

impl WinningRoot {
    /// A root wins over another by attesting balance; equal balances break
    /// by the lexicographically greater root.
    pub fn is_better_than(&self, other: &WinningRoot) -> bool {
        (
            self.total_attesting_balance,
            self.crosslink_data_root,
        ) > (
            other.total_attesting_balance,
            other.crosslink_data_root,
        )
    }
}

/// Elects the winning crosslink root for `committee`: the candidate root
/// whose attesters hold the most effective balance.
///
/// Returns `None` when no attestation for the committee's shard exists.
pub fn winning_root(
    state: &BeaconState,
    committee: &CrosslinkCommittee,
    spec: &ChainSpec,
) -> Result<Option<WinningRoot>, BeaconStateError> {
    let committee_members: HashSet<usize> = committee.committee.iter().cloned().collect();
    let total_committee_balance = state.get_total_balance(&committee.committee)?;

    let mut candidates: HashMap<Hash256, HashSet<usize>> = HashMap::new();
    for a in state
        .previous_epoch_attestations
        .iter()
        .chain(state.current_epoch_attestations.iter())
    {
        if a.data.shard != committee.shard {
            continue;
        }
        let participants =
            state.get_attestation_participants(&a.data, &a.aggregation_bitfield, spec)?;
        let entry = candidates.entry(a.data.crosslink_data_root).or_default();
        entry.extend(
            participants
                .into_iter()
                .filter(|index| committee_members.contains(index)),
        );
    }

    let mut winner: Option<WinningRoot> = None;
    for (root, attesters) in candidates {
        let mut attesting_validator_indices: Vec<usize> = attesters.into_iter().collect();
        attesting_validator_indices.sort_unstable();
        let candidate = WinningRoot {
            crosslink_data_root: root,
            total_attesting_balance: state.get_total_balance(&attesting_validator_indices)?,
            attesting_validator_indices,
            total_committee_balance,
        };
        match &winner {
            Some(current) if !candidate.is_better_than(current) => {}
            _ => winner = Some(candidate),
        }
    }

    Ok(winner)
}
