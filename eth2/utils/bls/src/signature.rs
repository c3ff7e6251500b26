use crate::{message_with_domain, PublicKey, SecretKey, BLS_SIG_BYTE_SIZE, DST};
use blst::min_pk as blst_core;
use blst::BLST_ERROR;

/// A single BLS signature (G2, 96-byte compressed form).
///
/// The point-at-infinity "empty" signature is representable so that unsigned
/// placeholders (genesis blocks, templates awaiting a validator signature)
/// can round-trip through SSZ; it never verifies.
#[derive(Clone)]
pub struct Signature {
    point: Option<blst_core::Signature>,
}

impl Signature {
    /// Signs `message` under `domain` with `sk`.
    pub fn new(message: &[u8], domain: u64, sk: &SecretKey) -> Self {
        let digest = message_with_domain(message, domain);
        Self {
            point: Some(sk.0.sign(&digest, DST, &[])),
        }
    }

    /// Verifies `self` against `message` under `domain` for `pk`.
    pub fn verify(&self, message: &[u8], domain: u64, pk: &PublicKey) -> bool {
        match &self.point {
            Some(point) => {
                let digest = message_with_domain(message, domain);
                point.verify(true, &digest, DST, &[], &pk.0, true) == BLST_ERROR::BLST_SUCCESS
            }
            None => false,
        }
    }

    /// The placeholder signature used where a container must carry a
    /// signature field that has not been produced yet.
    pub fn empty_signature() -> Self {
        Self { point: None }
    }

    pub fn is_empty(&self) -> bool {
        self.point.is_none()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BLST_ERROR> {
        if bytes == &infinity_bytes()[..] {
            return Ok(Self::empty_signature());
        }
        blst_core::Signature::from_bytes(bytes).map(|point| Self { point: Some(point) })
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        match &self.point {
            Some(point) => point.compress().to_vec(),
            None => infinity_bytes().to_vec(),
        }
    }

    pub(crate) fn point(&self) -> Option<&blst_core::Signature> {
        self.point.as_ref()
    }
}

/// Compressed encoding of the G2 point at infinity.
fn infinity_bytes() -> [u8; BLS_SIG_BYTE_SIZE] {
    let mut bytes = [0; BLS_SIG_BYTE_SIZE];
    bytes[0] = 0xc0;
    bytes
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self::empty_signature()
    }
}

impl_byte_wrappers!(Signature, 96);
