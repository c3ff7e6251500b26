//! The node's view of the ETH1 chain: the observer interface the deposit
//! follower implements, the chain-start latch, and a mock observer for
//! tests.
//!
//! The follower itself (log filtering, reorg handling) lives outside this
//! crate; everything here consumes its observations.

mod chain_start;
mod disabled;
mod mock;

pub use chain_start::{ChainStartLatch, ChainStartWatcher};
pub use disabled::DisabledEth1Observer;
pub use mock::MockEth1Observer;

use types::Hash256;

/// What the node needs to know about the ETH1 chain and its deposit
/// contract.
pub trait Eth1Observer: Send + Sync {
    /// `Some(genesis_time)` once the deposit contract has logged the
    /// chain-start threshold.
    fn chain_start_log(&self) -> Option<u64>;

    /// The highest ETH1 block the follower has seen, if any.
    fn latest_block_number(&self) -> Option<u64>;

    /// The height of a known block hash.
    fn block_number_by_hash(&self, hash: &Hash256) -> Option<u64>;

    /// The block hash at a height inside the followed range.
    fn block_hash_by_number(&self, number: u64) -> Option<Hash256>;

    /// The current root of the deposit accumulator.
    fn deposit_root(&self) -> Hash256;
}
