use crate::{Address, Epoch, Fork, Hash256, Slot};
use bls::Signature;
use parking_lot::RwLock;
use std::sync::Arc;

const GWEI: u64 = 1_000_000_000;

/// A signature domain, disjoint per signed message kind.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Domain {
    Deposit,
    Attestation,
    Proposal,
    Exit,
    Randao,
}

/// Holds all the "constants" for a beacon chain.
///
/// Read-only during normal operation; tests may swap the process-wide
/// snapshot via `override_beacon_config`.
#[derive(PartialEq, Debug, Clone)]
pub struct ChainSpec {
    /*
     * Misc
     */
    pub shard_count: u64,
    pub target_committee_size: u64,
    pub max_balance_churn_quotient: u64,
    pub shuffle_round_count: u8,

    /*
     * Deposit contract
     */
    pub deposit_contract_address: Address,
    pub deposit_contract_tree_depth: u64,
    pub deposits_for_chain_start: u64,
    pub eth1_follow_distance: u64,

    /*
     * Gwei values
     */
    pub min_deposit_amount: u64,
    pub max_deposit_amount: u64,
    pub effective_balance_increment: u64,
    pub ejection_balance: u64,

    /*
     * Initial values
     */
    pub genesis_fork_version: u64,
    pub genesis_slot: Slot,
    pub genesis_epoch: Epoch,
    pub far_future_epoch: Epoch,
    pub zero_hash: Hash256,
    pub empty_signature: Signature,
    pub bls_withdrawal_prefix_byte: u8,

    /*
     * Time parameters
     */
    pub seconds_per_slot: u64,
    pub min_attestation_inclusion_delay: u64,
    pub slots_per_epoch: u64,
    pub min_seed_lookahead: Epoch,
    pub activation_exit_delay: u64,
    pub epochs_per_eth1_voting_period: u64,
    pub min_validator_withdrawability_delay: Epoch,

    /*
     * State list lengths
     */
    pub slots_per_historical_root: usize,
    pub latest_randao_mixes_length: usize,
    pub latest_slashed_exit_length: usize,

    /*
     * Reward and penalty quotients
     */
    pub base_reward_quotient: u64,
    pub whistleblower_reward_quotient: u64,
    pub attestation_inclusion_reward_quotient: u64,
    pub inactivity_penalty_quotient: u64,
    pub min_penalty_quotient: u64,

    /*
     * Max operations per block
     */
    pub max_proposer_slashings: u64,
    pub max_attester_slashings: u64,
    pub max_attestations: u64,
    pub max_deposits: u64,
    pub max_voluntary_exits: u64,

    /*
     * Signature domains
     *
     * Private so that a domain can only be read via `get_domain`, which
     * mixes in the fork version.
     */
    domain_deposit: u64,
    domain_attestation: u64,
    domain_proposal: u64,
    domain_exit: u64,
    domain_randao: u64,
}

impl ChainSpec {
    /// Returns the number of committees in one epoch.
    pub fn get_epoch_committee_count(&self, active_validator_count: usize) -> u64 {
        std::cmp::max(
            1,
            std::cmp::min(
                self.shard_count / self.slots_per_epoch,
                active_validator_count as u64 / self.slots_per_epoch / self.target_committee_size,
            ),
        ) * self.slots_per_epoch
    }

    /// Gets the domain number that represents the fork meta and signature
    /// domain.
    pub fn get_domain(&self, epoch: Epoch, domain: Domain, fork: &Fork) -> u64 {
        let domain_constant = match domain {
            Domain::Deposit => self.domain_deposit,
            Domain::Attestation => self.domain_attestation,
            Domain::Proposal => self.domain_proposal,
            Domain::Exit => self.domain_exit,
            Domain::Randao => self.domain_randao,
        };

        let fork_version = fork.get_fork_version(epoch);
        fork_version * u64::pow(2, 32) + domain_constant
    }

    /// Returns a `ChainSpec` compatible with the mainnet specification.
    pub fn foundation() -> Self {
        let genesis_slot = Slot::new(0);
        let slots_per_epoch = 64;
        let genesis_epoch = genesis_slot.epoch(slots_per_epoch);

        Self {
            /*
             * Misc
             */
            shard_count: 1_024,
            target_committee_size: 128,
            max_balance_churn_quotient: 32,
            shuffle_round_count: 90,

            /*
             * Deposit contract
             */
            deposit_contract_address: Address::zero(),
            deposit_contract_tree_depth: 32,
            deposits_for_chain_start: 16_384,
            eth1_follow_distance: 1_024,

            /*
             * Gwei values
             */
            min_deposit_amount: u64::pow(2, 0) * GWEI,
            max_deposit_amount: u64::pow(2, 5) * GWEI,
            effective_balance_increment: u64::pow(2, 0) * GWEI,
            ejection_balance: u64::pow(2, 4) * GWEI,

            /*
             * Initial values
             */
            genesis_fork_version: 0,
            genesis_slot,
            genesis_epoch,
            far_future_epoch: Epoch::new(u64::max_value()),
            zero_hash: Hash256::zero(),
            empty_signature: Signature::empty_signature(),
            bls_withdrawal_prefix_byte: 0,

            /*
             * Time parameters
             */
            seconds_per_slot: 6,
            min_attestation_inclusion_delay: 4,
            slots_per_epoch,
            min_seed_lookahead: Epoch::new(1),
            activation_exit_delay: 4,
            epochs_per_eth1_voting_period: 16,
            min_validator_withdrawability_delay: Epoch::new(256),

            /*
             * State list lengths
             */
            slots_per_historical_root: 8_192,
            latest_randao_mixes_length: 8_192,
            latest_slashed_exit_length: 8_192,

            /*
             * Reward and penalty quotients
             */
            base_reward_quotient: 32,
            whistleblower_reward_quotient: 512,
            attestation_inclusion_reward_quotient: 8,
            inactivity_penalty_quotient: 16_777_216,
            min_penalty_quotient: 32,

            /*
             * Max operations per block
             */
            max_proposer_slashings: 16,
            max_attester_slashings: 1,
            max_attestations: 128,
            max_deposits: 16,
            max_voluntary_exits: 16,

            /*
             * Signature domains
             */
            domain_deposit: 0,
            domain_attestation: 1,
            domain_proposal: 2,
            domain_exit: 3,
            domain_randao: 4,
        }
    }

    /// Returns a `ChainSpec` suitable for a small local testnet: eight
    /// validators, one-validator committees, short follow distance.
    pub fn few_validators() -> Self {
        let genesis_slot = Slot::new(0);
        let slots_per_epoch = 8;
        let genesis_epoch = genesis_slot.epoch(slots_per_epoch);

        Self {
            shard_count: 8,
            target_committee_size: 1,
            deposits_for_chain_start: 8,
            eth1_follow_distance: 16,
            genesis_slot,
            genesis_epoch,
            slots_per_epoch,
            ..ChainSpec::foundation()
        }
    }
}

lazy_static::lazy_static! {
    static ref BEACON_CONFIG: RwLock<Arc<ChainSpec>> =
        RwLock::new(Arc::new(ChainSpec::foundation()));
}

/// The process-wide parameter snapshot.
pub fn beacon_config() -> Arc<ChainSpec> {
    BEACON_CONFIG.read().clone()
}

/// Replaces the whole process-wide snapshot atomically.
///
/// Intended for tests and for the launcher before any component starts;
/// components hold `&ChainSpec` references and never observe a mid-run swap.
pub fn override_beacon_config(spec: ChainSpec) {
    *BEACON_CONFIG.write() = Arc::new(spec);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foundation_spec_can_be_constructed() {
        let _ = ChainSpec::foundation();
    }

    #[test]
    fn domains_differ_per_kind() {
        let spec = ChainSpec::foundation();
        let fork = Fork::genesis(&spec);
        let epoch = Epoch::new(0);

        let domains = [
            spec.get_domain(epoch, Domain::Deposit, &fork),
            spec.get_domain(epoch, Domain::Attestation, &fork),
            spec.get_domain(epoch, Domain::Proposal, &fork),
            spec.get_domain(epoch, Domain::Exit, &fork),
            spec.get_domain(epoch, Domain::Randao, &fork),
        ];
        for (i, a) in domains.iter().enumerate() {
            for b in &domains[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
