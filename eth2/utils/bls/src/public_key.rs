use crate::{BLS_PUBLIC_KEY_BYTE_SIZE, SecretKey};
use blst::min_pk as blst_core;
use std::hash::{Hash, Hasher};

/// A BLS public key (G1, 48-byte compressed form).
#[derive(Clone)]
pub struct PublicKey(pub(crate) blst_core::PublicKey);

impl PublicKey {
    pub fn from_secret_key(secret_key: &SecretKey) -> Self {
        Self(secret_key.0.sk_to_pk())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, blst::BLST_ERROR> {
        blst_core::PublicKey::key_validate(bytes).map(Self)
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        self.0.compress().to_vec()
    }

    /// A short hex excerpt, useful in log lines.
    pub fn concatenated_hex_id(&self) -> String {
        let bytes = self.as_bytes();
        format!("0x{}..{}", hex::encode(&bytes[0..2]), hex::encode(&bytes[46..48]))
    }

    /// The zeroed placeholder key is not a valid curve point, so `default`
    /// derives from the zero-adjacent secret scalar instead.
    pub fn default_placeholder() -> Self {
        let sk = SecretKey::from_bytes(&{
            let mut bytes = [0; 32];
            bytes[31] = 1;
            bytes
        })
        .expect("one is a valid scalar");
        Self::from_secret_key(&sk)
    }

    fn _assert_byte_size(&self) {
        debug_assert_eq!(self.as_bytes().len(), BLS_PUBLIC_KEY_BYTE_SIZE);
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.compress()[..] == other.0.compress()[..]
    }
}

impl Eq for PublicKey {}

impl Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.compress().hash(state)
    }
}

impl Default for PublicKey {
    fn default() -> Self {
        Self::default_placeholder()
    }
}

impl_byte_wrappers!(PublicKey, 48);
