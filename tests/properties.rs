use aar::{Archive, ArchivedFile, Envelope};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeMap;
use std::io::Cursor;

/// Distinct names mapped to arbitrary contents.
fn members(max: usize) -> impl Strategy<Value = Vec<(String, Vec<u8>)>> {
    proptest::collection::btree_map("[a-z0-9_./-]{1,24}", vec(any::<u8>(), 0..512), 0..max)
        .prop_map(|m: BTreeMap<String, Vec<u8>>| m.into_iter().collect())
}

fn build(members: &[(String, Vec<u8>)]) -> Archive {
    let files = members
        .iter()
        .map(|(name, data)| ArchivedFile::from_bytes(name.as_str(), data).unwrap())
        .collect();
    Archive::from_files(files).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn serialize_then_parse_is_identity(ms in members(8)) {
        let archive = build(&ms);
        let bytes = archive.to_bytes().unwrap();
        prop_assert_eq!(Archive::from_bytes(&bytes).unwrap(), archive);
    }

    #[test]
    fn offsets_are_contiguous(ms in members(8)) {
        let archive = build(&ms);
        let header = archive.header();
        if let Some(first) = header.entries.first() {
            prop_assert_eq!(first.offset, header.header_length + 1);
        }
        for pair in header.entries.windows(2) {
            prop_assert_eq!(pair[0].offset + pair[0].size, pair[1].offset);
        }
    }

    #[test]
    fn declared_header_length_is_what_gets_written(ms in members(8)) {
        let archive = build(&ms);
        let header = archive.header();
        prop_assert_eq!(header.to_bytes().unwrap().len() as u64, u64::from(header.header_length));
        prop_assert_eq!(archive.to_bytes().unwrap().len() as u64, archive.total_size());
    }

    #[test]
    fn every_member_is_reachable_by_name(ms in members(6)) {
        let archive = build(&ms);
        let bytes = archive.to_bytes().unwrap();
        for (name, data) in &ms {
            let member = aar::read_member_by_name(Cursor::new(&bytes), name).unwrap();
            prop_assert_eq!(&member.decompressed().unwrap(), data);
        }
    }

    #[test]
    fn single_corrupted_ciphertext_byte_fails(data in vec(any::<u8>(), 1..256), pick in any::<prop::sample::Index>()) {
        let env = Envelope::seal(&data, "pw").unwrap();
        let mut bytes = env.to_bytes();
        let i = 32 + pick.index(bytes.len() - 32);
        bytes[i] ^= 0x80;
        let tampered = Envelope::from_bytes(&bytes).unwrap();
        prop_assert!(tampered.open("pw").unwrap_err().is_authentication_failure());
    }
}
