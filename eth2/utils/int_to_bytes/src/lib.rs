/// Returns `int` as little-endian bytes with a length of 1.
pub fn int_to_bytes1(int: u8) -> Vec<u8> {
    vec![int]
}

/// Returns `int` as little-endian bytes with a length of 4.
pub fn int_to_bytes4(int: u32) -> Vec<u8> {
    int.to_le_bytes().to_vec()
}

/// Returns `int` as little-endian bytes with a length of 8.
pub fn int_to_bytes8(int: u64) -> Vec<u8> {
    int.to_le_bytes().to_vec()
}

/// Returns `int` as little-endian bytes with a length of 32.
pub fn int_to_bytes32(int: u64) -> Vec<u8> {
    let mut bytes = int.to_le_bytes().to_vec();
    bytes.resize(32, 0);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_to_bytes8_le() {
        assert_eq!(int_to_bytes8(1), vec![1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            int_to_bytes8(u64::max_value()),
            vec![255, 255, 255, 255, 255, 255, 255, 255]
        );
    }

    #[test]
    fn int_to_bytes32_pads_to_32() {
        let bytes = int_to_bytes32(3);
        assert_eq!(bytes.len(), 32);
        assert_eq!(bytes[0], 3);
        assert!(bytes[1..].iter().all(|b| *b == 0));
    }
}
