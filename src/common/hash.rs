use ethereum_types::H256;
use hasher::{Hasher, HasherKeccak};

/// Keccak-256 of the empty byte string. Code hash of an account without code.
pub const NIL_DATA: H256 = H256([
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);

/// Root of the empty Patricia trie, keccak(rlp(null)).
pub const RLP_NULL: H256 = H256([
    0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8, 0x6e,
    0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63, 0xb4, 0x21,
]);

/// The hasher used for all tries and content addressing.
pub fn get_hasher() -> HasherKeccak {
    HasherKeccak::new()
}

/// Keccak-256 digest of `data`.
pub fn summary(data: &[u8]) -> Vec<u8> {
    get_hasher().digest(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_of_empty_is_nil_data() {
        assert_eq!(H256::from_slice(&summary(&[])), NIL_DATA);
    }

    #[test]
    fn summary_known_vector() {
        // keccak256("hello")
        assert_eq!(
            hex::encode(summary(b"hello")),
            "1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }
}
