use self::apply_rewards::apply_rewards;
use self::errors::EpochProcessingError as Error;
use self::process_slashings::process_slashings;
use self::registry_updates::process_registry_updates;
use self::validator_statuses::ValidatorStatuses;
use self::winning_root::{winning_root, WinningRootHashSet};

use types::*;

pub mod apply_rewards;
pub mod errors;
pub mod process_slashings;
pub mod registry_updates;
pub mod validator_statuses;
pub mod winning_root;

/// Performs per-epoch processing on some BeaconState.
///
/// Mutates the given `BeaconState`, returning early if an error is
/// encountered. If an error is returned, the state is "half-processed" and
/// must be discarded.
pub fn per_epoch_processing(state: &mut BeaconState, spec: &ChainSpec) -> Result<(), Error> {
    // Assign the validators into sets based on their participation.
    let mut validator_statuses = ValidatorStatuses::new(state, spec);
    validator_statuses.process_attestations(state, spec)?;

    // Justification and finalization.
    update_justification_and_finalization(state, &validator_statuses.total_balances, spec)?;

    // Crosslinks.
    let winning_roots = process_crosslinks(state, spec)?;
    validator_statuses.process_winning_roots(&winning_roots);

    // Rewards and penalties.
    apply_rewards(state, &validator_statuses, spec)?;

    // Validator registry: activations, ejections.
    process_registry_updates(state, spec);

    // Deferred slashing penalties.
    process_slashings(
        state,
        validator_statuses.total_balances.current_epoch,
        spec,
    );

    // ETH1 voting period rotation.
    maybe_reset_eth1_period(state, spec);

    // Final updates.
    finish_epoch_update(state, spec);

    Ok(())
}

/// Updates the justification bitfield and the justified/finalized
/// checkpoints from the epoch's boundary-attestation tallies.
pub fn update_justification_and_finalization(
    state: &mut BeaconState,
    total_balances: &self::validator_statuses::TotalBalances,
    spec: &ChainSpec,
) -> Result<(), Error> {
    let previous_epoch = state.previous_epoch(spec);
    let current_epoch = state.current_epoch(spec);
    if current_epoch == spec.genesis_epoch {
        return Ok(());
    }

    let old_previous_justified = state.previous_justified_checkpoint;
    let old_current_justified = state.current_justified_checkpoint;

    let mut new_justified = state.current_justified_checkpoint;
    let mut new_finalized = state.finalized_checkpoint;

    // Rotate the justification bitfield up one epoch to make room for the
    // current epoch.
    state.justification_bitfield <<= 1;

    if total_balances.previous_epoch_boundary_attesters * 3 >= total_balances.previous_epoch * 2 {
        new_justified = Checkpoint {
            epoch: previous_epoch,
            root: *state.get_block_root(previous_epoch.start_slot(spec.slots_per_epoch), spec)?,
        };
        state.justification_bitfield |= 2;
    }
    if total_balances.current_epoch_boundary_attesters * 3 >= total_balances.current_epoch * 2 {
        new_justified = Checkpoint {
            epoch: current_epoch,
            root: *state.get_block_root(current_epoch.start_slot(spec.slots_per_epoch), spec)?,
        };
        state.justification_bitfield |= 1;
    }

    let bitfield = state.justification_bitfield;

    // The 2nd/3rd/4th most recent epochs are all justified, the 2nd using
    // the 4th as source.
    if (bitfield >> 1) % 8 == 0b111 && old_previous_justified.epoch == current_epoch - 3 {
        new_finalized = old_previous_justified;
    }
    // The 2nd/3rd most recent epochs are both justified, the 2nd using the
    // 3rd as source.
    if (bitfield >> 1) % 4 == 0b11 && old_previous_justified.epoch == current_epoch - 2 {
        new_finalized = old_previous_justified;
    }
    // The 1st/2nd/3rd most recent epochs are all justified, the 1st using
    // the 3rd as source.
    if bitfield % 8 == 0b111 && old_current_justified.epoch == current_epoch - 2 {
        new_finalized = old_current_justified;
    }
    // The 1st/2nd most recent epochs are both justified, the 1st using the
    // 2nd as source.
    if bitfield % 4 == 0b11 && old_current_justified.epoch == current_epoch - 1 {
        new_finalized = old_current_justified;
    }

    state.previous_justified_checkpoint = state.current_justified_checkpoint;
    state.current_justified_checkpoint = new_justified;
    state.finalized_checkpoint = new_finalized;

    Ok(())
}

/// Elects winning roots per committee over the previous and current epoch
/// and installs crosslinks that reached a supermajority.
pub fn process_crosslinks(
    state: &mut BeaconState,
    spec: &ChainSpec,
) -> Result<WinningRootHashSet, Error> {
    let mut winning_roots = WinningRootHashSet::new();

    let slots: Vec<Slot> = state
        .previous_epoch(spec)
        .slot_iter(spec.slots_per_epoch)
        .chain(state.current_epoch(spec).slot_iter(spec.slots_per_epoch))
        .collect();

    for slot in slots {
        let committees = match state.get_crosslink_committees_at_slot(slot, spec) {
            Ok(committees) => committees,
            // Slots before genesis have no committees.
            Err(BeaconStateError::InsufficientValidators) => continue,
            Err(e) => return Err(e.into()),
        };

        for committee in committees {
            if let Some(winner) = winning_root(state, &committee, spec)? {
                if winner.total_attesting_balance * 3 >= winner.total_committee_balance * 2 {
                    state.latest_crosslinks[committee.shard as usize] = Crosslink {
                        epoch: slot.epoch(spec.slots_per_epoch),
                        crosslink_data_root: winner.crosslink_data_root,
                    };
                }
                winning_roots.insert(committee.shard, winner);
            }
        }
    }

    Ok(winning_roots)
}

/// Rotates the ETH1 voting queue if the voting period just ended, installing
/// the majority vote if one exists.
pub fn maybe_reset_eth1_period(state: &mut BeaconState, spec: &ChainSpec) {
    let next_epoch = state.next_epoch(spec);
    let voting_period = spec.epochs_per_eth1_voting_period;

    if next_epoch % voting_period == 0 {
        for eth1_data_vote in &state.eth1_data_votes {
            if eth1_data_vote.vote_count * 2 > voting_period * spec.slots_per_epoch {
                state.latest_eth1_data = eth1_data_vote.eth1_data.clone();
            }
        }
        state.eth1_data_votes = vec![];
    }
}

/// Finishes up an epoch update: ring rotations, effective balance
/// adjustment and the pending-attestation hand-over.
pub fn finish_epoch_update(state: &mut BeaconState, spec: &ChainSpec) {
    let current_epoch = state.current_epoch(spec);
    let next_epoch = state.next_epoch(spec);

    let current_mix = *state.get_randao_mix(current_epoch, spec);
    state.set_randao_mix(next_epoch, current_mix, spec);

    let slashed_balance = state.get_slashed_balance(current_epoch, spec);
    state.set_slashed_balance(next_epoch, slashed_balance, spec);

    let registry = &mut state.validator_registry;
    let balances = &state.validator_balances;
    for (validator, &balance) in registry.iter_mut().zip(balances.iter()) {
        validator.effective_balance = std::cmp::min(
            balance - balance % spec.effective_balance_increment,
            spec.max_deposit_amount,
        );
    }

    state.previous_epoch_attestations =
        std::mem::replace(&mut state.current_epoch_attestations, vec![]);
}
