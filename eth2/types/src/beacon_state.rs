use crate::*;
use eth2_hashing::hash;
use int_to_bytes::{int_to_bytes32, int_to_bytes8};
use serde_derive::{Deserialize, Serialize};
use ssz_derive::{Decode, Encode};
use swap_or_not_shuffle::shuffle_list;
use tree_hash::TreeHash;
use tree_hash_derive::TreeHash;

#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    EpochOutOfBounds,
    SlotOutOfBounds,
    ShardOutOfBounds,
    UnknownValidator,
    UnableToShuffle,
    InsufficientValidators,
    NoCommitteeForShard,
    BadBitfieldLength { committee_len: usize, bitfield_len: usize },
}

/// A committee attesting to one shard at one slot.
#[derive(Debug, PartialEq, Clone)]
pub struct CrosslinkCommittee {
    pub shard: Shard,
    pub committee: Committee,
}

/// The state of the `BeaconChain` at some slot.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize, Encode, Decode, TreeHash)]
pub struct BeaconState {
    // Misc
    pub slot: Slot,
    pub genesis_time: u64,
    pub fork: Fork,

    // Validator registry
    pub validator_registry: Vec<Validator>,
    pub validator_balances: Vec<u64>,

    // Randomness and committees
    pub latest_randao_mixes: Vec<Hash256>,

    // Finality
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,
    pub justification_bitfield: u64,

    // Recent state
    pub latest_crosslinks: Vec<Crosslink>,
    pub latest_block_roots: Vec<Hash256>,
    pub latest_state_roots: Vec<Hash256>,
    pub latest_slashed_balances: Vec<u64>,
    pub latest_block_header: BeaconBlockHeader,

    pub previous_epoch_attestations: Vec<PendingAttestation>,
    pub current_epoch_attestations: Vec<PendingAttestation>,

    // Ethereum 1.0 chain data
    pub latest_eth1_data: Eth1Data,
    pub eth1_data_votes: Vec<Eth1DataVote>,
    pub deposit_index: u64,
}

impl BeaconState {
    /// Produce the first state of the Beacon Chain, with an empty registry.
    ///
    /// Deposits are applied by the genesis transition, not here.
    pub fn genesis(genesis_time: u64, latest_eth1_data: Eth1Data, spec: &ChainSpec) -> Self {
        BeaconState {
            slot: spec.genesis_slot,
            genesis_time,
            fork: Fork::genesis(spec),

            validator_registry: vec![],
            validator_balances: vec![],

            latest_randao_mixes: vec![spec.zero_hash; spec.latest_randao_mixes_length],

            previous_justified_checkpoint: Checkpoint::default(),
            current_justified_checkpoint: Checkpoint::default(),
            finalized_checkpoint: Checkpoint::default(),
            justification_bitfield: 0,

            latest_crosslinks: vec![Crosslink::default(); spec.shard_count as usize],
            latest_block_roots: vec![spec.zero_hash; spec.slots_per_historical_root],
            latest_state_roots: vec![spec.zero_hash; spec.slots_per_historical_root],
            latest_slashed_balances: vec![0; spec.latest_slashed_exit_length],
            latest_block_header: BeaconBlock::empty(spec).temporary_block_header(spec),

            previous_epoch_attestations: vec![],
            current_epoch_attestations: vec![],

            latest_eth1_data,
            eth1_data_votes: vec![],
            deposit_index: 0,
        }
    }

    /// Returns the `tree_hash_root` of the state.
    pub fn canonical_root(&self) -> Hash256 {
        Hash256::from_slice(&self.tree_hash_root()[..])
    }

    /// The epoch corresponding to `self.slot`.
    pub fn current_epoch(&self, spec: &ChainSpec) -> Epoch {
        self.slot.epoch(spec.slots_per_epoch)
    }

    /// The epoch prior to `self.current_epoch()`, saturating at genesis.
    pub fn previous_epoch(&self, spec: &ChainSpec) -> Epoch {
        let current = self.current_epoch(spec);
        if current > spec.genesis_epoch {
            current - 1
        } else {
            current
        }
    }

    /// The epoch following `self.current_epoch()`.
    pub fn next_epoch(&self, spec: &ChainSpec) -> Epoch {
        self.current_epoch(spec) + 1
    }

    /// The indices of the validators active in the given epoch, ascending.
    pub fn get_active_validator_indices(&self, epoch: Epoch) -> Vec<usize> {
        self.validator_registry
            .iter()
            .enumerate()
            .filter(|(_, validator)| validator.is_active_at(epoch))
            .map(|(i, _)| i)
            .collect()
    }

    /// Reads the block root ring for `slot`.
    ///
    /// Only roots strictly older than `self.slot` and within the ring length
    /// are known.
    pub fn get_block_root(&self, slot: Slot, spec: &ChainSpec) -> Result<&Hash256, Error> {
        self.check_root_lookup_bounds(slot, spec)?;
        Ok(&self.latest_block_roots[slot.as_usize() % spec.slots_per_historical_root])
    }

    pub fn set_block_root(
        &mut self,
        slot: Slot,
        root: Hash256,
        spec: &ChainSpec,
    ) -> Result<(), Error> {
        self.check_root_store_bounds(slot, spec)?;
        self.latest_block_roots[slot.as_usize() % spec.slots_per_historical_root] = root;
        Ok(())
    }

    /// Reads the state root ring for `slot`.
    pub fn get_state_root(&self, slot: Slot, spec: &ChainSpec) -> Result<&Hash256, Error> {
        self.check_root_lookup_bounds(slot, spec)?;
        Ok(&self.latest_state_roots[slot.as_usize() % spec.slots_per_historical_root])
    }

    pub fn set_state_root(
        &mut self,
        slot: Slot,
        root: Hash256,
        spec: &ChainSpec,
    ) -> Result<(), Error> {
        self.check_root_store_bounds(slot, spec)?;
        self.latest_state_roots[slot.as_usize() % spec.slots_per_historical_root] = root;
        Ok(())
    }

    fn check_root_lookup_bounds(&self, slot: Slot, spec: &ChainSpec) -> Result<(), Error> {
        if slot < self.slot && self.slot <= slot + spec.slots_per_historical_root as u64 {
            Ok(())
        } else {
            Err(Error::SlotOutOfBounds)
        }
    }

    fn check_root_store_bounds(&self, slot: Slot, spec: &ChainSpec) -> Result<(), Error> {
        if slot < self.slot + spec.slots_per_historical_root as u64 {
            Ok(())
        } else {
            Err(Error::SlotOutOfBounds)
        }
    }

    /// Reads the randao mix of the given epoch from the bounded ring.
    pub fn get_randao_mix(&self, epoch: Epoch, spec: &ChainSpec) -> &Hash256 {
        &self.latest_randao_mixes[epoch.as_usize() % spec.latest_randao_mixes_length]
    }

    /// XORs `contribution` into the randao mix of the given epoch.
    pub fn update_randao_mix(&mut self, epoch: Epoch, contribution: Hash256, spec: &ChainSpec) {
        let index = epoch.as_usize() % spec.latest_randao_mixes_length;
        let current = self.latest_randao_mixes[index];
        self.latest_randao_mixes[index] = current ^ contribution;
    }

    pub fn set_randao_mix(&mut self, epoch: Epoch, mix: Hash256, spec: &ChainSpec) {
        self.latest_randao_mixes[epoch.as_usize() % spec.latest_randao_mixes_length] = mix;
    }

    /// Generates the committee seed for `epoch` from the randao history.
    pub fn generate_seed(&self, epoch: Epoch, spec: &ChainSpec) -> Hash256 {
        let mix = *self.get_randao_mix(epoch - spec.min_seed_lookahead, spec);
        let mut preimage = mix.as_bytes().to_vec();
        preimage.append(&mut int_to_bytes32(epoch.as_u64()));
        Hash256::from_slice(&hash(&preimage))
    }

    /// The committees attesting at `slot`, in committee order.
    ///
    /// The shuffled active-validator list is cut into
    /// `committees_per_slot` contiguous segments; ties inside a segment are
    /// broken by ascending shuffled position.
    pub fn get_crosslink_committees_at_slot(
        &self,
        slot: Slot,
        spec: &ChainSpec,
    ) -> Result<Vec<CrosslinkCommittee>, Error> {
        let epoch = slot.epoch(spec.slots_per_epoch);
        let active = self.get_active_validator_indices(epoch);
        if active.is_empty() {
            return Err(Error::InsufficientValidators);
        }

        let seed = self.generate_seed(epoch, spec);
        let shuffled = shuffle_list(
            active,
            spec.shuffle_round_count,
            &seed[..],
            false,
        )
        .ok_or(Error::UnableToShuffle)?;

        let committees_per_epoch = spec.get_epoch_committee_count(shuffled.len());
        let committees_per_slot = committees_per_epoch / spec.slots_per_epoch;
        let slot_offset = slot.as_u64() % spec.slots_per_epoch;

        let committee_size = shuffled.len() as u64 / committees_per_epoch;
        if committee_size == 0 {
            return Err(Error::InsufficientValidators);
        }

        let mut committees = Vec::with_capacity(committees_per_slot as usize);
        for k in 0..committees_per_slot {
            let committee_index = slot_offset * committees_per_slot + k;
            let start = (committee_index * committee_size) as usize;
            // The final committee of the epoch absorbs the remainder.
            let end = if committee_index == committees_per_epoch - 1 {
                shuffled.len()
            } else {
                start + committee_size as usize
            };
            committees.push(CrosslinkCommittee {
                shard: committee_index % spec.shard_count,
                committee: shuffled[start..end].to_vec(),
            });
        }

        Ok(committees)
    }

    /// Selects the block proposer for `slot` from the slot's first
    /// committee: a deterministic draw seeded by the slot, re-drawn while
    /// the candidate's effective balance fails the acceptance threshold.
    pub fn get_beacon_proposer_index(&self, slot: Slot, spec: &ChainSpec) -> Result<usize, Error> {
        let committees = self.get_crosslink_committees_at_slot(slot, spec)?;
        let committee = &committees
            .first()
            .ok_or(Error::InsufficientValidators)?
            .committee;
        if committee.is_empty() {
            return Err(Error::InsufficientValidators);
        }

        let epoch = slot.epoch(spec.slots_per_epoch);
        let mut preimage = self.generate_seed(epoch, spec).as_bytes().to_vec();
        preimage.append(&mut int_to_bytes8(slot.as_u64()));
        let seed = hash(&preimage);

        let mut i = 0;
        loop {
            let candidate = committee[i % committee.len()];
            let mut round_preimage = seed.clone();
            round_preimage.append(&mut int_to_bytes8((i / 32) as u64));
            let random_byte = hash(&round_preimage)[i % 32] as u64;

            let effective_balance = self.validator_registry[candidate].effective_balance;
            if effective_balance * 255 >= spec.max_deposit_amount * random_byte {
                return Ok(candidate);
            }
            i += 1;
        }
    }

    /// The validator indices voting in `bitfield` over the committee for
    /// `(data.slot, data.shard)`, ascending.
    pub fn get_attestation_participants(
        &self,
        data: &AttestationData,
        bitfield: &Bitfield,
        spec: &ChainSpec,
    ) -> Result<Vec<usize>, Error> {
        let committees = self.get_crosslink_committees_at_slot(data.slot, spec)?;
        let committee = committees
            .into_iter()
            .find(|c| c.shard == data.shard)
            .ok_or(Error::NoCommitteeForShard)?
            .committee;

        if bitfield.len() != (committee.len() + 7) / 8 * 8 {
            return Err(Error::BadBitfieldLength {
                committee_len: committee.len(),
                bitfield_len: bitfield.len(),
            });
        }

        let mut participants: Vec<usize> = committee
            .iter()
            .enumerate()
            .filter(|(i, _)| bitfield.get(*i))
            .map(|(_, validator_index)| *validator_index)
            .collect();
        participants.sort_unstable();
        Ok(participants)
    }

    /// Searches the current epoch's committees for the duty of a validator.
    pub fn get_attestation_duties(
        &self,
        validator_index: usize,
        spec: &ChainSpec,
    ) -> Result<Option<AttestationDuty>, Error> {
        let epoch = self.current_epoch(spec);
        for slot in epoch.slot_iter(spec.slots_per_epoch) {
            for c in self.get_crosslink_committees_at_slot(slot, spec)? {
                if let Some(committee_index) =
                    c.committee.iter().position(|&i| i == validator_index)
                {
                    return Ok(Some(AttestationDuty {
                        slot,
                        shard: c.shard,
                        committee_index,
                        committee_len: c.committee.len(),
                    }));
                }
            }
        }
        Ok(None)
    }

    /// Looks a validator up by public key. Registry order is insertion
    /// order, so the first match is the only match.
    pub fn get_validator_index(&self, pubkey: &PublicKey) -> Option<usize> {
        self.validator_registry
            .iter()
            .position(|v| &v.pubkey == pubkey)
    }

    /// The effective balance tracked on the registry entry.
    pub fn get_effective_balance(&self, validator_index: usize) -> Result<u64, Error> {
        self.validator_registry
            .get(validator_index)
            .map(|v| v.effective_balance)
            .ok_or(Error::UnknownValidator)
    }

    /// Sum of effective balances over `validator_indices`.
    pub fn get_total_balance(&self, validator_indices: &[usize]) -> Result<u64, Error> {
        validator_indices.iter().try_fold(0u64, |acc, &i| {
            self.get_effective_balance(i).map(|b| acc + b)
        })
    }

    /// Reads the slashed-balance ring at `epoch`.
    pub fn get_slashed_balance(&self, epoch: Epoch, spec: &ChainSpec) -> u64 {
        self.latest_slashed_balances[epoch.as_usize() % spec.latest_slashed_exit_length]
    }

    pub fn set_slashed_balance(&mut self, epoch: Epoch, balance: u64, spec: &ChainSpec) {
        self.latest_slashed_balances[epoch.as_usize() % spec.latest_slashed_exit_length] = balance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestingBeaconStateBuilder;

    #[test]
    fn committees_partition_the_active_set() {
        let spec = ChainSpec::few_validators();
        let builder = TestingBeaconStateBuilder::from_default_keypairs(16, &spec);
        let (state, _) = builder.build();

        let mut seen = std::collections::HashSet::new();
        let epoch = state.current_epoch(&spec);
        for slot in epoch.slot_iter(spec.slots_per_epoch) {
            for c in state.get_crosslink_committees_at_slot(slot, &spec).unwrap() {
                for index in c.committee {
                    assert!(seen.insert(index), "validator assigned twice");
                }
            }
        }
        assert_eq!(seen.len(), 16);
    }

    #[test]
    fn proposer_is_committee_member() {
        let spec = ChainSpec::few_validators();
        let builder = TestingBeaconStateBuilder::from_default_keypairs(16, &spec);
        let (state, _) = builder.build();

        let slot = Slot::new(1);
        let proposer = state.get_beacon_proposer_index(slot, &spec).unwrap();
        let committees = state.get_crosslink_committees_at_slot(slot, &spec).unwrap();
        assert!(committees[0].committee.contains(&proposer));
    }

    #[test]
    fn block_root_lookup_bounds() {
        let spec = ChainSpec::few_validators();
        let builder = TestingBeaconStateBuilder::from_default_keypairs(8, &spec);
        let (mut state, _) = builder.build();
        state.slot = Slot::new(10);

        assert!(state.get_block_root(Slot::new(9), &spec).is_ok());
        // The current slot's root is not yet known.
        assert_eq!(
            state.get_block_root(Slot::new(10), &spec),
            Err(Error::SlotOutOfBounds)
        );
    }

    #[test]
    fn ssz_round_trip_preserves_the_root() {
        use ssz::{Decode, Encode};

        let spec = ChainSpec::few_validators();
        let (state, _) = TestingBeaconStateBuilder::from_default_keypairs(8, &spec).build();

        let bytes = state.as_ssz_bytes();
        let decoded = BeaconState::from_ssz_bytes(&bytes).unwrap();
        assert_eq!(state, decoded);
        assert_eq!(state.canonical_root(), decoded.canonical_root());
    }

    #[test]
    fn attestation_duty_round_trips_through_committees() {
        let spec = ChainSpec::few_validators();
        let builder = TestingBeaconStateBuilder::from_default_keypairs(16, &spec);
        let (state, _) = builder.build();

        let duty = state.get_attestation_duties(3, &spec).unwrap().unwrap();
        let committees = state
            .get_crosslink_committees_at_slot(duty.slot, &spec)
            .unwrap();
        let committee = committees
            .iter()
            .find(|c| c.shard == duty.shard)
            .expect("duty names a real committee");
        assert_eq!(committee.committee[duty.committee_index], 3);
    }
}
