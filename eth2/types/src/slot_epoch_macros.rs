/// Implements the shared behaviour of the `Slot` and `Epoch` newtypes:
/// conversion to/from `u64`, saturating math (against both `Self` and
/// `u64`), ordering, formatting, SSZ, tree hashing and serde.
///
/// Math deliberately saturates rather than wraps; slot arithmetic close to
/// genesis would otherwise underflow.
#[macro_export]
macro_rules! impl_common {
    ($type: ident) => {
        impl $type {
            pub fn as_u64(self) -> u64 {
                self.0
            }

            pub fn as_usize(self) -> usize {
                self.0 as usize
            }
        }

        impl From<u64> for $type {
            fn from(x: u64) -> Self {
                $type(x)
            }
        }

        impl From<$type> for u64 {
            fn from(x: $type) -> u64 {
                x.0
            }
        }

        impl PartialEq for $type {
            fn eq(&self, other: &$type) -> bool {
                self.0 == other.0
            }
        }

        impl PartialEq<u64> for $type {
            fn eq(&self, other: &u64) -> bool {
                self.0 == *other
            }
        }

        impl Ord for $type {
            fn cmp(&self, other: &$type) -> std::cmp::Ordering {
                self.0.cmp(&other.0)
            }
        }

        impl PartialOrd for $type {
            fn partial_cmp(&self, other: &$type) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl std::hash::Hash for $type {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                self.0.hash(state)
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl_math_ops!($type, Add, add, saturating_add);
        impl_math_ops!($type, Sub, sub, saturating_sub);
        impl_math_ops!($type, Mul, mul, saturating_mul);

        impl std::ops::AddAssign for $type {
            fn add_assign(&mut self, other: $type) {
                self.0 = self.0.saturating_add(other.0);
            }
        }

        impl std::ops::AddAssign<u64> for $type {
            fn add_assign(&mut self, other: u64) {
                self.0 = self.0.saturating_add(other);
            }
        }

        impl std::ops::SubAssign<u64> for $type {
            fn sub_assign(&mut self, other: u64) {
                self.0 = self.0.saturating_sub(other);
            }
        }

        impl std::ops::Div<u64> for $type {
            type Output = $type;
            fn div(self, rhs: u64) -> $type {
                $type(self.0 / rhs)
            }
        }

        impl std::ops::Rem<u64> for $type {
            type Output = u64;
            fn rem(self, rhs: u64) -> u64 {
                self.0 % rhs
            }
        }

        impl ssz::Encode for $type {
            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                8
            }

            fn ssz_append(&self, buf: &mut Vec<u8>) {
                ssz::Encode::ssz_append(&self.0, buf)
            }
        }

        impl ssz::Decode for $type {
            fn is_ssz_fixed_len() -> bool {
                true
            }

            fn ssz_fixed_len() -> usize {
                8
            }

            fn from_ssz_bytes(bytes: &[u8]) -> Result<Self, ssz::DecodeError> {
                <u64 as ssz::Decode>::from_ssz_bytes(bytes).map($type)
            }
        }

        impl tree_hash::TreeHash for $type {
            fn tree_hash_type() -> tree_hash::TreeHashType {
                <u64 as tree_hash::TreeHash>::tree_hash_type()
            }

            fn tree_hash_packed_encoding(&self) -> Vec<u8> {
                tree_hash::TreeHash::tree_hash_packed_encoding(&self.0)
            }

            fn tree_hash_packing_factor() -> usize {
                <u64 as tree_hash::TreeHash>::tree_hash_packing_factor()
            }

            fn tree_hash_root(&self) -> Vec<u8> {
                tree_hash::TreeHash::tree_hash_root(&self.0)
            }
        }

        impl serde::ser::Serialize for $type {
            fn serialize<S: serde::ser::Serializer>(
                &self,
                serializer: S,
            ) -> Result<S::Ok, S::Error> {
                serializer.serialize_u64(self.0)
            }
        }

        impl<'de> serde::de::Deserialize<'de> for $type {
            fn deserialize<D: serde::de::Deserializer<'de>>(
                deserializer: D,
            ) -> Result<Self, D::Error> {
                u64::deserialize(deserializer).map($type)
            }
        }
    };
}

#[macro_export]
macro_rules! impl_math_ops {
    ($type: ident, $trait: ident, $fn: ident, $saturating_fn: ident) => {
        impl std::ops::$trait<$type> for $type {
            type Output = $type;
            fn $fn(self, rhs: $type) -> $type {
                $type(self.0.$saturating_fn(rhs.0))
            }
        }

        impl std::ops::$trait<u64> for $type {
            type Output = $type;
            fn $fn(self, rhs: u64) -> $type {
                $type(self.0.$saturating_fn(rhs))
            }
        }
    };
}
