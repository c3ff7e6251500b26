use super::errors::EpochProcessingError as Error;
use super::validator_statuses::{AttesterStatus, TotalBalances, ValidatorStatuses};
use integer_sqrt::IntegerSquareRoot;
use types::*;

/// Tracks the changes to a validator's balance; applied in one shot so a
/// validator's penalties never observe its same-epoch rewards.
#[derive(Default, Clone)]
pub struct Delta {
    rewards: u64,
    penalties: u64,
}

impl Delta {
    pub fn reward(&mut self, reward: u64) {
        self.rewards += reward;
    }

    pub fn penalize(&mut self, penalty: u64) {
        self.penalties += penalty;
    }
}

/// Applies attester, proposer and crosslink rewards and penalties.
pub fn apply_rewards(
    state: &mut BeaconState,
    validator_statuses: &ValidatorStatuses,
    spec: &ChainSpec,
) -> Result<(), Error> {
    // No rewards can be computed until attestations from a full previous
    // epoch exist.
    if state.current_epoch(spec) == spec.genesis_epoch {
        return Ok(());
    }

    if validator_statuses.statuses.len() != state.validator_balances.len()
        || validator_statuses.statuses.len() != state.validator_registry.len()
    {
        return Err(Error::ValidatorStatusesInconsistent);
    }

    let mut deltas = vec![Delta::default(); state.validator_balances.len()];

    get_attestation_deltas(&mut deltas, state, validator_statuses, spec);
    get_crosslink_deltas(&mut deltas, state, validator_statuses, spec);
    get_proposer_deltas(&mut deltas, state, validator_statuses, spec);

    for (index, delta) in deltas.iter().enumerate() {
        state.validator_balances[index] += delta.rewards;
        state.validator_balances[index] =
            state.validator_balances[index].saturating_sub(delta.penalties);
    }

    Ok(())
}

/// Rewards the proposers who were first to include each attester's vote.
fn get_proposer_deltas(
    deltas: &mut Vec<Delta>,
    state: &BeaconState,
    validator_statuses: &ValidatorStatuses,
    spec: &ChainSpec,
) {
    let total_balances = &validator_statuses.total_balances;

    for (index, status) in validator_statuses.statuses.iter().enumerate() {
        if status.is_previous_epoch_attester {
            let base_reward = get_base_reward(state, index, total_balances.previous_epoch, spec);
            let proposer_index = status.inclusion_info.proposer_index;
            if proposer_index < deltas.len() {
                deltas[proposer_index]
                    .reward(base_reward / spec.attestation_inclusion_reward_quotient);
            }
        }
    }
}

/// Applies FFG and inclusion-distance rewards for the previous epoch.
fn get_attestation_deltas(
    deltas: &mut Vec<Delta>,
    state: &BeaconState,
    validator_statuses: &ValidatorStatuses,
    spec: &ChainSpec,
) {
    let total_balances = &validator_statuses.total_balances;
    let finality_delay = state
        .current_epoch(spec)
        .as_u64()
        .saturating_sub(state.finalized_checkpoint.epoch.as_u64());

    for (index, status) in validator_statuses.statuses.iter().enumerate() {
        if !status.is_active_in_previous_epoch {
            continue;
        }

        let base_reward = get_base_reward(state, index, total_balances.previous_epoch, spec);
        let delta = attestation_delta(
            status,
            total_balances,
            base_reward,
            state.get_effective_balance(index).unwrap_or(0),
            finality_delay,
            spec,
        );
        deltas[index].reward(delta.rewards);
        deltas[index].penalize(delta.penalties);
    }
}

/// The delta for a single validator: the chain finalizing normally rewards
/// participation proportionally to the participating balance; a chain that
/// has not finalized for more than four epochs leaks the balance of every
/// validator that is not attesting correctly.
fn attestation_delta(
    status: &AttesterStatus,
    total_balances: &TotalBalances,
    base_reward: u64,
    effective_balance: u64,
    finality_delay: u64,
    spec: &ChainSpec,
) -> Delta {
    let mut delta = Delta::default();
    let total = total_balances.previous_epoch.max(1);

    if finality_delay <= 4 {
        // Expected FFG source.
        if status.is_previous_epoch_attester {
            delta.reward(
                base_reward * total_balances.previous_epoch_attesters / total,
            );
        } else {
            delta.penalize(base_reward);
        }
        // Expected FFG target.
        if status.is_previous_epoch_boundary_attester {
            delta.reward(
                base_reward * total_balances.previous_epoch_boundary_attesters / total,
            );
        } else {
            delta.penalize(base_reward);
        }
        // Expected head.
        if status.is_previous_epoch_head_attester {
            delta.reward(
                base_reward * total_balances.previous_epoch_head_attesters / total,
            );
        } else {
            delta.penalize(base_reward);
        }
    } else {
        let inactivity_penalty = base_reward
            + effective_balance * finality_delay / spec.inactivity_penalty_quotient / 2;

        if !status.is_previous_epoch_attester {
            delta.penalize(inactivity_penalty);
        }
        if !status.is_previous_epoch_boundary_attester {
            delta.penalize(inactivity_penalty);
        }
        if !status.is_previous_epoch_head_attester {
            delta.penalize(base_reward);
        }
    }

    // Prompt inclusion, whichever regime.
    if status.is_previous_epoch_attester {
        let distance = status.inclusion_info.distance.as_u64().max(1);
        delta.reward(base_reward * spec.min_attestation_inclusion_delay / distance);
    }

    delta
}

/// Rewards committee members that attested to their committee's winning
/// crosslink root, penalizes the members that did not.
fn get_crosslink_deltas(
    deltas: &mut Vec<Delta>,
    state: &BeaconState,
    validator_statuses: &ValidatorStatuses,
    spec: &ChainSpec,
) {
    let total_balances = &validator_statuses.total_balances;

    for (index, status) in validator_statuses.statuses.iter().enumerate() {
        if !status.is_active_in_previous_epoch {
            continue;
        }

        let base_reward = get_base_reward(state, index, total_balances.previous_epoch, spec);
        match &status.winning_root_info {
            Some(info) => {
                let total = info.total_committee_balance.max(1);
                deltas[index].reward(base_reward * info.total_attesting_balance / total);
            }
            None => deltas[index].penalize(base_reward),
        }
    }
}

/// The per-validator reward unit, scaled by the square root of the total
/// active balance.
fn get_base_reward(
    state: &BeaconState,
    index: usize,
    previous_total_balance: u64,
    spec: &ChainSpec,
) -> u64 {
    if previous_total_balance == 0 {
        return 0;
    }
    let adjusted_quotient = previous_total_balance.integer_sqrt() / spec.base_reward_quotient;
    state.get_effective_balance(index).unwrap_or(0) / adjusted_quotient.max(1) / 5
}
