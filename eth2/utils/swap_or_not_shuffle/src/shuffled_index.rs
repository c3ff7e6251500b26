use eth2_hashing::hash;
use int_to_bytes::{int_to_bytes1, int_to_bytes4};

/// Returns the destination of `index` under the swap-or-not permutation of
/// `[0, list_size)` keyed by `seed`.
///
/// Applying this for every `index` in `[0, list_size)` yields a permutation
/// of `[0, list_size)`.
///
/// Returns `None` if `index >= list_size`, `list_size == 0`,
/// `list_size > 2**24` or `rounds == 0`.
pub fn shuffled_index(
    index: usize,
    list_size: usize,
    seed: &[u8],
    rounds: u8,
) -> Option<usize> {
    if index >= list_size || list_size == 0 || list_size > 2_usize.pow(24) || rounds == 0 {
        return None;
    }

    let mut index = index;

    for round in 0..rounds {
        let pivot = round_pivot(seed, round, list_size);
        let flip = (pivot + list_size - index) % list_size;
        let position = std::cmp::max(index, flip);

        let source = hash(
            &[
                seed,
                &int_to_bytes1(round),
                &int_to_bytes4((position / 256) as u32),
            ]
            .concat(),
        );
        let byte = source[(position % 256) / 8];
        let bit = (byte >> (position % 8)) % 2;

        if bit == 1 {
            index = flip;
        }
    }

    Some(index)
}

/// The per-round pivot: the first eight bytes of `H(seed || round)`,
/// little-endian, reduced mod `list_size`.
pub(crate) fn round_pivot(seed: &[u8], round: u8, list_size: usize) -> usize {
    let digest = hash(&[seed, &int_to_bytes1(round)].concat());
    let mut bytes = [0; 8];
    bytes.copy_from_slice(&digest[0..8]);
    (u64::from_le_bytes(bytes) % list_size as u64) as usize
}
