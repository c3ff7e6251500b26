use crate::BLS_SECRET_KEY_BYTE_SIZE;
use blst::min_pk as blst_core;
use rand::RngCore;

/// A BLS secret key. Deliberately carries no serde or Debug-printable
/// representation of its scalar.
#[derive(Clone)]
pub struct SecretKey(pub(crate) blst_core::SecretKey);

impl SecretKey {
    pub fn random() -> Self {
        let mut ikm = [0; 32];
        rand::thread_rng().fill_bytes(&mut ikm);
        // key_gen only fails on short input key material.
        let sk = blst_core::SecretKey::key_gen(&ikm, &[]).expect("ikm is 32 bytes");
        Self(sk)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, blst::BLST_ERROR> {
        if bytes.len() != BLS_SECRET_KEY_BYTE_SIZE {
            return Err(blst::BLST_ERROR::BLST_BAD_ENCODING);
        }
        blst_core::SecretKey::from_bytes(bytes).map(Self)
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        self.0.to_bytes().to_vec()
    }
}

impl PartialEq for SecretKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bytes() == other.0.to_bytes()
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "SecretKey(..)")
    }
}
