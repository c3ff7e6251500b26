use super::{get_key_for_col, Error, Store};
use db_key::Key;
use leveldb::database::kv::KV;
use leveldb::database::Database;
use leveldb::error::Error as LevelDBError;
use leveldb::options::{Options, ReadOptions, WriteOptions};
use std::path::Path;

/// A leveldb-backed store.
pub struct DiskStore {
    db: Database<BytesKey>,
}

impl DiskStore {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let mut options = Options::new();
        options.create_if_missing = true;

        let db = Database::open(path, options)?;

        Ok(Self { db })
    }

    fn read_options(&self) -> ReadOptions<BytesKey> {
        ReadOptions::new()
    }

    fn write_options(&self) -> WriteOptions {
        WriteOptions::new()
    }
}

pub struct BytesKey {
    key: Vec<u8>,
}

impl Key for BytesKey {
    fn from_u8(key: &[u8]) -> Self {
        Self { key: key.to_vec() }
    }

    fn as_slice<T, F: Fn(&[u8]) -> T>(&self, f: F) -> T {
        f(self.key.as_slice())
    }
}

impl Store for DiskStore {
    fn get_bytes(&self, column: &str, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let key = BytesKey::from_u8(&get_key_for_col(column, key));
        self.db
            .get(self.read_options(), key)
            .map_err(Into::into)
    }

    fn put_bytes(&self, column: &str, key: &[u8], value: &[u8]) -> Result<(), Error> {
        let key = BytesKey::from_u8(&get_key_for_col(column, key));
        self.db
            .put(self.write_options(), key, value)
            .map_err(Into::into)
    }

    fn key_exists(&self, column: &str, key: &[u8]) -> Result<bool, Error> {
        self.get_bytes(column, key).map(|opt| opt.is_some())
    }

    fn key_delete(&self, column: &str, key: &[u8]) -> Result<(), Error> {
        let key = BytesKey::from_u8(&get_key_for_col(column, key));
        self.db
            .delete(self.write_options(), key)
            .map_err(Into::into)
    }
}

impl From<LevelDBError> for Error {
    fn from(e: LevelDBError) -> Error {
        Error::Backend(format!("{:?}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn disk_round_trip() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();

        store.put_bytes("b", b"deadbeef", b"hello").unwrap();
        assert_eq!(
            store.get_bytes("b", b"deadbeef").unwrap(),
            Some(b"hello".to_vec())
        );
        assert_eq!(store.get_bytes("b", b"unknown").unwrap(), None);
    }
}
