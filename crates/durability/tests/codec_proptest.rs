//! Property check that the base64-framed payload survives arbitrary
//! byte content, including bytes that would otherwise need escaping in
//! a raw-JSON-string encoding.

use proptest::prelude::*;
use relayq_durability::LogEntry;

proptest! {
    #[test]
    fn publish_payload_round_trips_for_arbitrary_bytes(payload in proptest::collection::vec(any::<u8>(), 0..256)) {
        let entry = LogEntry::publish("m1", &payload, 0, 0);
        let line = entry.encode_line().unwrap();
        let decoded = LogEntry::decode_line(&line).unwrap();
        prop_assert_eq!(decoded.decode_payload().unwrap().unwrap(), payload);
    }
}
