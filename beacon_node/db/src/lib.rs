//! Storage for the beacon chain: a column-oriented key/value `Store` trait
//! with in-memory and leveldb backends, and the typed `BeaconDB` layer the
//! node reads and writes through.

mod beacon_db;
mod disk_store;
mod memory_store;

pub use beacon_db::{BeaconDB, DepositContainer};
pub use disk_store::DiskStore;
pub use memory_store::MemoryStore;

use ssz::DecodeError;

/// Bucket names, used as key prefixes.
pub mod columns {
    pub const BLOCKS: &str = "blocks";
    pub const STATES: &str = "states";
    pub const HISTORICAL_STATES: &str = "historical_states";
    pub const DEPOSITS: &str = "deposits";
    pub const CHAIN: &str = "chain";
}

#[derive(Debug, PartialEq)]
pub enum Error {
    /// A stored value failed to decode; the database is corrupt.
    Corrupt(DecodeError),
    /// The backing store failed.
    Backend(String),
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Error::Corrupt(e)
    }
}

/// An object capable of storing and retrieving objects implementing
/// `StoreItem`.
///
/// A `Store` is fundamentally a key-value store, where keys are prefixed
/// with a "column" qualifying the type being stored.
pub trait Store: Sync + Send + Sized + 'static {
    /// Retrieve some bytes in `column` with `key`.
    fn get_bytes(&self, column: &str, key: &[u8]) -> Result<Option<Vec<u8>>, Error>;

    /// Store some `value` in `column`, indexed with `key`.
    fn put_bytes(&self, column: &str, key: &[u8], value: &[u8]) -> Result<(), Error>;

    /// Return `true` if `key` exists in `column`.
    fn key_exists(&self, column: &str, key: &[u8]) -> Result<bool, Error>;

    /// Removes `key` from `column`.
    fn key_delete(&self, column: &str, key: &[u8]) -> Result<(), Error>;
}

pub(crate) fn get_key_for_col(column: &str, key: &[u8]) -> Vec<u8> {
    let mut result = column.as_bytes().to_vec();
    result.extend_from_slice(key);
    result
}
