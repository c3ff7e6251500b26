//! A byte-backed bitfield sized to a committee.
//!
//! Bit `i` lives in byte `i / 8` at position `i % 8`, matching the on-wire
//! layout of aggregation and custody bitfields: the byte length is fixed at
//! construction (`(bits + 7) / 8`) and does not grow on set.

use serde::de::{Deserialize, Deserializer, Error as SerdeError, Visitor};
use serde::ser::{Serialize, Serializer};
use ssz::{Decode, DecodeError, Encode};
use std::fmt;

#[derive(Clone, PartialEq, Eq, Default, Hash)]
pub struct Bitfield {
    bytes: Vec<u8>,
}

impl Bitfield {
    /// An empty, zero-length bitfield.
    pub fn new() -> Self {
        Self { bytes: vec![] }
    }

    /// A zeroed bitfield able to hold `bits` bits.
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            bytes: vec![0; (bits + 7) / 8],
        }
    }

    /// Builds from the wire representation.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    /// The number of bits this field can address.
    pub fn len(&self) -> usize {
        self.bytes.len() * 8
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Reads bit `i`; out-of-range reads are `false`.
    pub fn get(&self, i: usize) -> bool {
        self.bytes
            .get(i / 8)
            .map_or(false, |byte| byte & (1 << (i % 8)) != 0)
    }

    /// Sets bit `i`. Out-of-range writes are ignored; the length is fixed at
    /// construction.
    pub fn set(&mut self, i: usize, to: bool) {
        if let Some(byte) = self.bytes.get_mut(i / 8) {
            if to {
                *byte |= 1 << (i % 8);
            } else {
                *byte &= !(1 << (i % 8));
            }
        }
    }

    pub fn num_set_bits(&self) -> usize {
        self.bytes.iter().map(|byte| byte.count_ones() as usize).sum()
    }

    pub fn is_zero(&self) -> bool {
        self.bytes.iter().all(|byte| *byte == 0)
    }

    /// Indices of the set bits, ascending.
    pub fn iter_set_bits(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(move |i| self.get(*i))
    }

    /// True if no bit is set in both `self` and `other`.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.bytes
            .iter()
            .zip(other.bytes.iter())
            .all(|(a, b)| a & b == 0)
    }

    /// Sets every bit that is set in `other`. The fields must be the same
    /// length; trailing bits of the longer operand are preserved.
    pub fn union_inplace(&mut self, other: &Self) {
        if self.bytes.len() < other.bytes.len() {
            self.bytes.resize(other.bytes.len(), 0);
        }
        for (a, b) in self.bytes.iter_mut().zip(other.bytes.iter()) {
            *a |= b;
        }
    }
}

impl fmt::Debug for Bitfield {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Bitfield(0x{})", hex::encode(&self.bytes))
    }
}

impl Encode for Bitfield {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn ssz_append(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.bytes)
    }
}

impl Decode for Bitfield {
    fn is_ssz_fixed_len() -> bool {
        false
    }

    fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self::from_bytes(bytes))
    }
}

impl tree_hash::TreeHash for Bitfield {
    fn tree_hash_type() -> tree_hash::TreeHashType {
        tree_hash::TreeHashType::List
    }

    fn tree_hash_packed_encoding(&self) -> Vec<u8> {
        unreachable!("List should never be packed.")
    }

    fn tree_hash_packing_factor() -> usize {
        unreachable!("List should never be packed.")
    }

    fn tree_hash_root(&self) -> Vec<u8> {
        tree_hash::TreeHash::tree_hash_root(&self.bytes)
    }
}

impl Serialize for Bitfield {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.bytes)))
    }
}

impl<'de> Deserialize<'de> for Bitfield {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HexVisitor;

        impl<'de> Visitor<'de> for HexVisitor {
            type Value = Bitfield;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a 0x-prefixed hex string")
            }

            fn visit_str<E: SerdeError>(self, value: &str) -> Result<Bitfield, E> {
                let stripped = value.trim_start_matches("0x");
                let bytes = hex::decode(stripped).map_err(E::custom)?;
                Ok(Bitfield::from_bytes(&bytes))
            }
        }

        deserializer.deserialize_str(HexVisitor)
    }
}
