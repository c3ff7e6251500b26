//! Typed wrappers over BLS12-381 signing as used on the beacon chain.
//!
//! Every signed message kind carries a `u64` domain (proposal, attestation,
//! randao, deposit, exit, mixed with the fork version upstream); the domain
//! is bound into the message digest before it reaches the curve, so
//! signatures from different domains can never be confused for one another.
//!
//! Backed by the `blst` implementation of the IETF hash-to-curve suite.

#[macro_use]
mod macros;

mod aggregate_public_key;
mod aggregate_signature;
mod keypair;
mod public_key;
mod secret_key;
mod signature;

pub use crate::aggregate_public_key::AggregatePublicKey;
pub use crate::aggregate_signature::AggregateSignature;
pub use crate::keypair::Keypair;
pub use crate::public_key::PublicKey;
pub use crate::secret_key::SecretKey;
pub use crate::signature::Signature;

pub const BLS_PUBLIC_KEY_BYTE_SIZE: usize = 48;
pub const BLS_SECRET_KEY_BYTE_SIZE: usize = 32;
pub const BLS_SIG_BYTE_SIZE: usize = 96;

pub(crate) const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

use eth2_hashing::hash;
use int_to_bytes::int_to_bytes8;

/// Binds `domain` into `message` ahead of hash-to-curve.
pub(crate) fn message_with_domain(message: &[u8], domain: u64) -> Vec<u8> {
    let mut preimage = message.to_vec();
    preimage.append(&mut int_to_bytes8(domain));
    hash(&preimage)
}
