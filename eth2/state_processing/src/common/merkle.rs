use eth2_hashing::hash;
use types::Hash256;

/// Verifies a fixed-depth merkle branch: folds `leaf` up through `branch`,
/// taking the left/right position at each level from the bits of `index`,
/// and compares against `root`.
pub fn verify_merkle_branch(
    leaf: Hash256,
    branch: &[Hash256],
    depth: usize,
    index: u64,
    root: Hash256,
) -> bool {
    if branch.len() != depth {
        return false;
    }

    let mut node = leaf;
    for (height, sibling) in branch.iter().enumerate() {
        let mut preimage = Vec::with_capacity(64);
        if (index >> height) & 1 == 1 {
            preimage.extend_from_slice(sibling.as_bytes());
            preimage.extend_from_slice(node.as_bytes());
        } else {
            preimage.extend_from_slice(node.as_bytes());
            preimage.extend_from_slice(sibling.as_bytes());
        }
        node = Hash256::from_slice(&hash(&preimage));
    }

    node == root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash_pair(a: &Hash256, b: &Hash256) -> Hash256 {
        let mut preimage = a.as_bytes().to_vec();
        preimage.extend_from_slice(b.as_bytes());
        Hash256::from_slice(&hash(&preimage))
    }

    #[test]
    fn two_leaf_tree() {
        let leaf_a = Hash256::from_low_u64_be(1);
        let leaf_b = Hash256::from_low_u64_be(2);
        let root = hash_pair(&leaf_a, &leaf_b);

        assert!(verify_merkle_branch(leaf_a, &[leaf_b], 1, 0, root));
        assert!(verify_merkle_branch(leaf_b, &[leaf_a], 1, 1, root));
        assert!(!verify_merkle_branch(leaf_a, &[leaf_b], 1, 1, root));
    }

    #[test]
    fn depth_mismatch_fails() {
        let leaf = Hash256::from_low_u64_be(1);
        assert!(!verify_merkle_branch(leaf, &[], 1, 0, leaf));
    }
}
