use proptest::prelude::*;

use txkit_primitives::chainhash::Hash;
use txkit_primitives::util::{ByteReader, VarInt};
use txkit_primitives::ByteData;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn varint_roundtrip(value in any::<u64>(), tail in prop::collection::vec(any::<u8>(), 0..8)) {
        let vi = VarInt(value);
        let mut encoded = vi.to_bytes();
        prop_assert_eq!(encoded.len(), vi.length());
        encoded.extend_from_slice(&tail);

        let (decoded, used) = VarInt::from_bytes(&encoded).unwrap();
        prop_assert_eq!(decoded.value(), value);
        prop_assert_eq!(used, vi.length());
    }

    #[test]
    fn varint_decode_never_panics(data in prop::collection::vec(any::<u8>(), 0..12)) {
        let _ = VarInt::from_bytes(&data);
        let mut reader = ByteReader::new(&data);
        let _ = reader.read_var_bytes();
    }

    #[test]
    fn hash_hex_roundtrip(bytes in prop::array::uniform32(any::<u8>())) {
        let hash = Hash::new(bytes);
        let hash2 = Hash::from_hex(&hash.to_string()).unwrap();
        prop_assert_eq!(hash.as_bytes(), hash2.as_bytes());
    }

    #[test]
    fn bytedata_hex_roundtrip(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let data = ByteData::from(bytes.clone());
        let back = ByteData::from_hex(&data.to_hex()).unwrap();
        prop_assert_eq!(back.as_bytes(), &bytes[..]);
    }
}
