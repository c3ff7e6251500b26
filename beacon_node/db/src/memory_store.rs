use super::{get_key_for_col, Error, Store};
use parking_lot::RwLock;
use std::collections::HashMap;

/// A hash-map backed store, for testing.
pub struct MemoryStore {
    db: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn open() -> Self {
        Self {
            db: RwLock::new(HashMap::new()),
        }
    }
}

impl Store for MemoryStore {
    fn get_bytes(&self, column: &str, key: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.db.read().get(&get_key_for_col(column, key)).cloned())
    }

    fn put_bytes(&self, column: &str, key: &[u8], value: &[u8]) -> Result<(), Error> {
        self.db
            .write()
            .insert(get_key_for_col(column, key), value.to_vec());
        Ok(())
    }

    fn key_exists(&self, column: &str, key: &[u8]) -> Result<bool, Error> {
        Ok(self.db.read().contains_key(&get_key_for_col(column, key)))
    }

    fn key_delete(&self, column: &str, key: &[u8]) -> Result<(), Error> {
        self.db.write().remove(&get_key_for_col(column, key));
        Ok(())
    }
}
