//! The "swap-or-not" shuffle used to assign validators to committees.
//!
//! Two forms are provided:
//!
//! - `shuffled_index` permutes a single index. It is the form the committee
//!   and proposer logic is written against.
//! - `shuffle_list` permutes an entire list in one pass and is dramatically
//!   faster when every index is needed.
//!
//! Both are pure functions of `(seed, round count)` and must stay bit-exact
//! across platforms; the round hash schedule is fixed by the wire protocol.

mod shuffle_list;
mod shuffled_index;

pub use shuffle_list::shuffle_list;
pub use shuffled_index::shuffled_index;

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn list_matches_single_index_form() {
        let seed = [42; 32];
        for &n in &[1usize, 2, 7, 32, 100, 333] {
            let list = shuffle_list(identity(n), 90, &seed, false).unwrap();
            for i in 0..n {
                assert_eq!(
                    list[i],
                    shuffled_index(i, n, &seed, 90).unwrap(),
                    "mismatch at index {} of {}",
                    i,
                    n
                );
            }
        }
    }

    #[test]
    fn outputs_are_permutations() {
        let seed = [7; 32];
        for &n in &[1usize, 13, 64, 512] {
            let mut seen = vec![false; n];
            for i in 0..n {
                seen[shuffled_index(i, n, &seed, 90).unwrap()] = true;
            }
            assert!(seen.into_iter().all(|b| b), "not a permutation for n={}", n);
        }
    }

    #[test]
    fn shuffle_then_unshuffle_is_identity() {
        let seed = [3; 32];
        let input = identity(128);
        let shuffled = shuffle_list(input.clone(), 90, &seed, true).unwrap();
        assert_ne!(input, shuffled);
        let restored = shuffle_list(shuffled, 90, &seed, false).unwrap();
        assert_eq!(input, restored);
    }

    #[test]
    fn rejects_degenerate_inputs() {
        let seed = [0; 32];
        assert_eq!(shuffled_index(0, 0, &seed, 90), None);
        assert_eq!(shuffled_index(4, 4, &seed, 90), None);
        assert_eq!(shuffle_list(vec![], 90, &seed, true), None);
        assert_eq!(shuffle_list(identity(8), 0, &seed, true), None);
    }
}
