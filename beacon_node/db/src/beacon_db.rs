use crate::columns::*;
use crate::{Error, Store};
use parking_lot::{Mutex, RwLock};
use ssz::{Decode, Encode};
use ssz_derive::{Decode, Encode};
use types::{BeaconBlock, BeaconState, Deposit, Hash256, Slot};

const CHAIN_HEAD_KEY: &[u8] = b"chain_head";
const HEAD_STATE_KEY: &[u8] = b"head_state";
const JUSTIFIED_BLOCK_KEY: &[u8] = b"justified_block";
const JUSTIFIED_STATE_KEY: &[u8] = b"justified_state";
const FINALIZED_BLOCK_KEY: &[u8] = b"finalized_block";
const FINALIZED_STATE_KEY: &[u8] = b"finalized_state";

/// A deposit paired with the ETH1 block it was logged in, which drives the
/// follow-distance window.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct DepositContainer {
    pub deposit: Deposit,
    pub block_number: u64,
}

/// The typed store the node reads and writes through.
///
/// All writes are serialized by a single writer lock; reads go straight to
/// the backing store and may proceed concurrently. Values are SSZ; block
/// keys are roots, slot and deposit keys are big-endian integers.
pub struct BeaconDB<S: Store> {
    store: S,
    write_lock: Mutex<()>,
    /// The pending set is a mirror of the not-yet-included tail of the
    /// deposit log; it is rebuilt from the log on startup and so lives in
    /// memory, keyed by merkle tree index.
    pending_deposits: RwLock<Vec<DepositContainer>>,
}

impl<S: Store> BeaconDB<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
            pending_deposits: RwLock::new(vec![]),
        }
    }

    fn get<T: Decode>(&self, column: &str, key: &[u8]) -> Result<Option<T>, Error> {
        match self.store.get_bytes(column, key)? {
            Some(bytes) => Ok(Some(T::from_ssz_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put<T: Encode>(&self, column: &str, key: &[u8], value: &T) -> Result<(), Error> {
        let _guard = self.write_lock.lock();
        self.store.put_bytes(column, key, &value.as_ssz_bytes())
    }

    /*
     * Blocks
     */

    pub fn save_block(&self, block: &BeaconBlock) -> Result<Hash256, Error> {
        let root = block.canonical_root();
        self.put(BLOCKS, root.as_bytes(), block)?;
        Ok(root)
    }

    pub fn get_block(&self, root: &Hash256) -> Result<Option<BeaconBlock>, Error> {
        self.get(BLOCKS, root.as_bytes())
    }

    pub fn has_block(&self, root: &Hash256) -> Result<bool, Error> {
        self.store.key_exists(BLOCKS, root.as_bytes())
    }

    /*
     * States
     */

    pub fn save_state(&self, state: &BeaconState) -> Result<(), Error> {
        self.put(STATES, &state.slot.as_u64().to_be_bytes(), state)
    }

    pub fn get_state(&self, slot: Slot) -> Result<Option<BeaconState>, Error> {
        self.get(STATES, &slot.as_u64().to_be_bytes())
    }

    /// Persists the post-state of the block at `block_root`. Historical
    /// states are copy-on-write: never mutated after this.
    pub fn save_historical_state(
        &self,
        state: &BeaconState,
        block_root: Hash256,
    ) -> Result<(), Error> {
        self.put(HISTORICAL_STATES, block_root.as_bytes(), state)
    }

    pub fn get_historical_state(&self, block_root: &Hash256) -> Result<Option<BeaconState>, Error> {
        self.get(HISTORICAL_STATES, block_root.as_bytes())
    }

    /*
     * Chain pointers
     */

    /// Makes `block` the canonical head with `state` as its post-state.
    ///
    /// Both writes commit under one hold of the writer lock, so any reader
    /// that observes the new head also observes its post-state.
    pub fn update_chain_head(&self, block: &BeaconBlock, state: &BeaconState) -> Result<(), Error> {
        let _guard = self.write_lock.lock();
        self.store
            .put_bytes(CHAIN, CHAIN_HEAD_KEY, &block.as_ssz_bytes())?;
        self.store
            .put_bytes(CHAIN, HEAD_STATE_KEY, &state.as_ssz_bytes())
    }

    pub fn chain_head(&self) -> Result<Option<BeaconBlock>, Error> {
        self.get(CHAIN, CHAIN_HEAD_KEY)
    }

    pub fn head_state(&self) -> Result<Option<BeaconState>, Error> {
        self.get(CHAIN, HEAD_STATE_KEY)
    }

    pub fn save_justified_block(&self, block: &BeaconBlock) -> Result<(), Error> {
        self.put(CHAIN, JUSTIFIED_BLOCK_KEY, block)
    }

    pub fn get_justified_block(&self) -> Result<Option<BeaconBlock>, Error> {
        self.get(CHAIN, JUSTIFIED_BLOCK_KEY)
    }

    pub fn save_justified_state(&self, state: &BeaconState) -> Result<(), Error> {
        self.put(CHAIN, JUSTIFIED_STATE_KEY, state)
    }

    pub fn get_justified_state(&self) -> Result<Option<BeaconState>, Error> {
        self.get(CHAIN, JUSTIFIED_STATE_KEY)
    }

    pub fn save_finalized_block(&self, block: &BeaconBlock) -> Result<(), Error> {
        self.put(CHAIN, FINALIZED_BLOCK_KEY, block)
    }

    pub fn get_finalized_block(&self) -> Result<Option<BeaconBlock>, Error> {
        self.get(CHAIN, FINALIZED_BLOCK_KEY)
    }

    pub fn save_finalized_state(&self, state: &BeaconState) -> Result<(), Error> {
        self.put(CHAIN, FINALIZED_STATE_KEY, state)
    }

    pub fn get_finalized_state(&self) -> Result<Option<BeaconState>, Error> {
        self.get(CHAIN, FINALIZED_STATE_KEY)
    }

    /*
     * Deposits
     */

    /// Appends a deposit to the by-index log.
    pub fn insert_deposit(&self, deposit: &Deposit, block_number: u64) -> Result<(), Error> {
        let container = DepositContainer {
            deposit: deposit.clone(),
            block_number,
        };
        self.put(DEPOSITS, &deposit.index.to_be_bytes(), &container)
    }

    pub fn get_deposit(&self, index: u64) -> Result<Option<DepositContainer>, Error> {
        self.get(DEPOSITS, &index.to_be_bytes())
    }

    /// Adds a deposit to the pending (not-yet-included) set.
    pub fn insert_pending_deposit(&self, deposit: &Deposit, block_number: u64) {
        let mut pending = self.pending_deposits.write();
        if pending.iter().any(|c| c.deposit.index == deposit.index) {
            return;
        }
        pending.push(DepositContainer {
            deposit: deposit.clone(),
            block_number,
        });
    }

    /// Drops a deposit from the pending set once a finalized block includes
    /// it. Idempotent.
    pub fn remove_pending_deposit(&self, index: u64) {
        self.pending_deposits
            .write()
            .retain(|c| c.deposit.index != index);
    }

    /// The pending deposits logged in an ETH1 block `<= before_block` (when
    /// given), with merkle index `>= from_index`, ascending by index, at
    /// most `max`.
    pub fn pending_deposits(
        &self,
        before_block: Option<u64>,
        from_index: u64,
        max: usize,
    ) -> Vec<Deposit> {
        let mut containers: Vec<DepositContainer> = self
            .pending_deposits
            .read()
            .iter()
            .filter(|c| before_block.map_or(true, |b| c.block_number <= b))
            .filter(|c| c.deposit.index >= from_index)
            .cloned()
            .collect();
        containers.sort_by_key(|c| c.deposit.index);
        containers
            .into_iter()
            .take(max)
            .map(|c| c.deposit)
            .collect()
    }
}
