use super::winning_root::WinningRootHashSet;
use types::*;

/// Sets the boolean `var` on `self` to be true if it is true on `other`.
/// Otherwise leaves `self` as is.
macro_rules! set_self_if_other_is_true {
    ($self_: ident, $other: ident, $var: ident) => {
        if $other.$var {
            $self_.$var = true;
        }
    };
}

/// The information required to reward a block producer for including an
/// attestation in a block.
#[derive(Clone, Copy)]
pub struct InclusionInfo {
    /// The earliest slot a validator had an attestation included in the
    /// previous epoch.
    pub slot: Slot,
    /// The distance between the attestation slot and the slot that
    /// attestation was included in a block.
    pub distance: Slot,
    /// The index of the proposer at the slot where the attestation was
    /// included.
    pub proposer_index: usize,
}

impl Default for InclusionInfo {
    fn default() -> Self {
        Self {
            slot: Slot::max_value(),
            distance: Slot::max_value(),
            proposer_index: 0,
        }
    }
}

impl InclusionInfo {
    /// Replaces `self` with `other` if `other` was included earlier.
    pub fn update(&mut self, other: &Self) {
        if other.slot < self.slot {
            *self = *other;
        }
    }
}

/// The total balance of the crosslink committee and of the members that
/// attested for the winning root.
#[derive(Default, Clone, Copy)]
pub struct WinningRootInfo {
    pub total_committee_balance: u64,
    pub total_attesting_balance: u64,
}

/// Information required to reward some validator during the current and
/// previous epoch.
#[derive(Default, Clone)]
pub struct AttesterStatus {
    pub is_active_in_current_epoch: bool,
    pub is_active_in_previous_epoch: bool,

    pub is_current_epoch_attester: bool,
    pub is_current_epoch_boundary_attester: bool,
    pub is_previous_epoch_attester: bool,
    pub is_previous_epoch_boundary_attester: bool,
    pub is_previous_epoch_head_attester: bool,

    pub inclusion_info: InclusionInfo,
    pub winning_root_info: Option<WinningRootInfo>,
}

impl AttesterStatus {
    /// Accepts some `other` `AttesterStatus` and lifts its true flags onto
    /// `self`. Never clears a flag.
    pub fn update(&mut self, other: &Self) {
        set_self_if_other_is_true!(self, other, is_current_epoch_attester);
        set_self_if_other_is_true!(self, other, is_current_epoch_boundary_attester);
        set_self_if_other_is_true!(self, other, is_previous_epoch_attester);
        set_self_if_other_is_true!(self, other, is_previous_epoch_boundary_attester);
        set_self_if_other_is_true!(self, other, is_previous_epoch_head_attester);

        self.inclusion_info.update(&other.inclusion_info);
    }
}

/// The total effective balances for the validator sets epoch accounting
/// cares about.
#[derive(Default, Clone)]
pub struct TotalBalances {
    pub current_epoch: u64,
    pub previous_epoch: u64,
    pub current_epoch_attesters: u64,
    pub current_epoch_boundary_attesters: u64,
    pub previous_epoch_attesters: u64,
    pub previous_epoch_boundary_attesters: u64,
    pub previous_epoch_head_attesters: u64,
}

/// One status per validator, plus the set totals.
pub struct ValidatorStatuses {
    pub statuses: Vec<AttesterStatus>,
    pub total_balances: TotalBalances,
}

impl ValidatorStatuses {
    /// Initializes the active-set flags and the active-balance totals.
    pub fn new(state: &BeaconState, spec: &ChainSpec) -> Self {
        let current_epoch = state.current_epoch(spec);
        let previous_epoch = state.previous_epoch(spec);

        let mut statuses = Vec::with_capacity(state.validator_registry.len());
        let mut total_balances = TotalBalances::default();

        for validator in &state.validator_registry {
            let mut status = AttesterStatus::default();
            if validator.is_active_at(current_epoch) {
                status.is_active_in_current_epoch = true;
                total_balances.current_epoch += validator.effective_balance;
            }
            if validator.is_active_at(previous_epoch) {
                status.is_active_in_previous_epoch = true;
                total_balances.previous_epoch += validator.effective_balance;
            }
            statuses.push(status);
        }

        Self {
            statuses,
            total_balances,
        }
    }

    /// Walks the state's pending attestations and raises the participation
    /// flags they prove, then derives the attester-set balance totals.
    pub fn process_attestations(
        &mut self,
        state: &BeaconState,
        spec: &ChainSpec,
    ) -> Result<(), BeaconStateError> {
        let current_epoch = state.current_epoch(spec);
        let previous_epoch = state.previous_epoch(spec);

        for a in state
            .previous_epoch_attestations
            .iter()
            .chain(state.current_epoch_attestations.iter())
        {
            let participants =
                state.get_attestation_participants(&a.data, &a.aggregation_bitfield, spec)?;
            let attestation_epoch = a.data.slot.epoch(spec.slots_per_epoch);

            let mut status = AttesterStatus::default();

            if attestation_epoch == current_epoch {
                status.is_current_epoch_attester = true;
                if target_matches_epoch_boundary(state, &a.data, current_epoch, spec) {
                    status.is_current_epoch_boundary_attester = true;
                }
            } else if attestation_epoch == previous_epoch {
                status.is_previous_epoch_attester = true;

                status.inclusion_info = InclusionInfo {
                    slot: a.inclusion_slot,
                    distance: Slot::from(
                        a.inclusion_slot.as_u64().saturating_sub(a.data.slot.as_u64()),
                    ),
                    proposer_index: state.get_beacon_proposer_index(a.inclusion_slot, spec)?,
                };

                if target_matches_epoch_boundary(state, &a.data, previous_epoch, spec) {
                    status.is_previous_epoch_boundary_attester = true;
                }
                if let Ok(head_root) = state.get_block_root(a.data.slot, spec) {
                    if a.data.beacon_block_root == *head_root {
                        status.is_previous_epoch_head_attester = true;
                    }
                }
            }

            for &participant in &participants {
                self.statuses[participant].update(&status);
            }
        }

        // Totals are over distinct validators, so they are derived from the
        // merged statuses rather than accumulated per attestation.
        for (validator, status) in state.validator_registry.iter().zip(self.statuses.iter()) {
            let balance = validator.effective_balance;
            if status.is_current_epoch_attester {
                self.total_balances.current_epoch_attesters += balance;
            }
            if status.is_current_epoch_boundary_attester {
                self.total_balances.current_epoch_boundary_attesters += balance;
            }
            if status.is_previous_epoch_attester {
                self.total_balances.previous_epoch_attesters += balance;
            }
            if status.is_previous_epoch_boundary_attester {
                self.total_balances.previous_epoch_boundary_attesters += balance;
            }
            if status.is_previous_epoch_head_attester {
                self.total_balances.previous_epoch_head_attesters += balance;
            }
        }

        Ok(())
    }

    /// Records, for every member of a committee that produced a winning
    /// root, the committee and attesting balances used by crosslink rewards.
    pub fn process_winning_roots(&mut self, winning_roots: &WinningRootHashSet) {
        for winning_root in winning_roots.values() {
            for &index in &winning_root.attesting_validator_indices {
                self.statuses[index].winning_root_info = Some(WinningRootInfo {
                    total_committee_balance: winning_root.total_committee_balance,
                    total_attesting_balance: winning_root.total_attesting_balance,
                });
            }
        }
    }
}

/// True if the attestation's target is the block root the state has for the
/// first slot of `epoch`.
fn target_matches_epoch_boundary(
    state: &BeaconState,
    data: &AttestationData,
    epoch: Epoch,
    spec: &ChainSpec,
) -> bool {
    state
        .get_block_root(epoch.start_slot(spec.slots_per_epoch), spec)
        .map_or(false, |root| data.target.root == *root)
}
