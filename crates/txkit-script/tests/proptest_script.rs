use proptest::prelude::*;

use txkit_script::chunk::{push_data_prefix, tokenize};
use txkit_script::opcodes::is_direct_push;
use txkit_script::{deserialize, serialize, split_redeem_script, Script};

/// A script built from random pushes and plain opcodes, so it always tokenizes.
fn arb_script() -> impl Strategy<Value = Vec<u8>> {
    let push = prop::collection::vec(any::<u8>(), 1..100).prop_map(|data| {
        let mut out = push_data_prefix(data.len()).unwrap();
        out.extend_from_slice(&data);
        out
    });
    let opcode = (0x4fu8..=0xb9).prop_filter("no codeseparator", |op| *op != 0xab).prop_map(|op| vec![op]);
    prop::collection::vec(prop_oneof![push, opcode], 0..12).prop_map(|parts| parts.concat())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn script_hex_roundtrip(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let script = Script::from_bytes(&data);
        let script2 = Script::from_hex(&script.to_hex()).unwrap();
        prop_assert_eq!(script.as_bytes(), script2.as_bytes());
    }

    #[test]
    fn asm_roundtrip(bytes in arb_script()) {
        let asm = deserialize(&bytes).unwrap();
        prop_assert_eq!(serialize(&asm).unwrap(), bytes);
    }

    #[test]
    fn tokenize_offsets_are_increasing(bytes in arb_script()) {
        let chunks = tokenize(&bytes).unwrap();
        for pair in chunks.windows(2) {
            prop_assert!(pair[0].offset < pair[1].offset);
        }
        for chunk in &chunks {
            if is_direct_push(chunk.op) {
                prop_assert_eq!(chunk.data.as_ref().map(Vec::len), Some(chunk.op as usize));
            }
        }
    }

    #[test]
    fn split_never_panics_and_concatenates(data in prop::collection::vec(any::<u8>(), 0..300)) {
        let (stack, redeem) = split_redeem_script(&data);
        prop_assert_eq!([stack, redeem].concat(), data);
    }

    #[test]
    fn split_of_valid_script_concatenates(bytes in arb_script()) {
        let (stack, redeem) = split_redeem_script(&bytes);
        prop_assert_eq!(stack.len() + redeem.len(), bytes.len());
        if !redeem.is_empty() {
            prop_assert!(tokenize(stack).is_ok());
        }
    }
}
