use crate::shuffled_index::round_pivot;
use eth2_hashing::hash;
use int_to_bytes::int_to_bytes4;

const SEED_SIZE: usize = 32;
const PIVOT_VIEW_SIZE: usize = SEED_SIZE + 1;
const TOTAL_SIZE: usize = PIVOT_VIEW_SIZE + 4;

/// Shuffles an entire list in-place, producing the same permutation as
/// mapping `shuffled_index` over `[0, list_size)` when `forwards == false`.
///
/// With large lists this is orders of magnitude faster than the single-index
/// form because each 256-position hash window is computed once per round.
///
/// Shuffles when `forwards == true`, un-shuffles otherwise, such that
/// `shuffle_list(shuffle_list(l, r, s, true), r, s, false) == l`.
///
/// Returns `None` under the same conditions as `shuffled_index`.
pub fn shuffle_list(
    mut input: Vec<usize>,
    rounds: u8,
    seed: &[u8],
    forwards: bool,
) -> Option<Vec<usize>> {
    let list_size = input.len();

    if list_size == 0 || list_size > 2_usize.pow(24) || rounds == 0 {
        return None;
    }

    let mut buf: Vec<u8> = Vec::with_capacity(TOTAL_SIZE);
    buf.extend_from_slice(seed);
    buf.push(0);

    let mut round = if forwards { 0 } else { rounds - 1 };

    loop {
        buf[SEED_SIZE] = round;

        let pivot = round_pivot(seed, round, list_size);

        // Sweep the two mirror halves: positions `0..=pivot` pair up around
        // `pivot / 2`, positions `pivot + 1..list_size` around the midpoint
        // of the remainder. `j` always names the higher position of a pair,
        // which is the one the hash window is keyed on.
        let mirror = (pivot + 1) >> 1;
        sweep(&mut input, &mut buf, 0..mirror, pivot);

        let mirror = (pivot + list_size + 1) >> 1;
        sweep(&mut input, &mut buf, (pivot + 1)..mirror, list_size - 1);

        if forwards {
            round += 1;
            if round == rounds {
                break;
            }
        } else {
            if round == 0 {
                break;
            }
            round -= 1;
        }
    }

    Some(input)
}

/// Swap-or-not over the pairs `(i, j_start - k)` for the `k`-th `i` in
/// `i_range`, re-hashing the 256-position source window only when `j`
/// crosses into the next window.
fn sweep(input: &mut [usize], buf: &mut Vec<u8>, i_range: std::ops::Range<usize>, j_start: usize) {
    let mut source = hash_window(buf, j_start);
    let mut byte_v = source[(j_start & 0xff) >> 3];

    for (k, i) in i_range.enumerate() {
        let j = j_start - k;

        if j & 0xff == 0xff {
            source = hash_window(buf, j);
        }
        if j & 0x07 == 0x07 {
            byte_v = source[(j & 0xff) >> 3];
        }

        if (byte_v >> (j & 0x07)) & 0x01 == 1 {
            input.swap(i, j);
        }
    }
}

fn hash_window(buf: &mut Vec<u8>, position: usize) -> Vec<u8> {
    buf.truncate(PIVOT_VIEW_SIZE);
    buf.extend_from_slice(&int_to_bytes4((position >> 8) as u32));
    hash(buf)
}
