#![no_main]

use covenant::json;
use libfuzzer_sys::fuzz_target;

// Arbitrary input either fails to decode or survives a re-encode unchanged.
fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(value) = json::parse_str(input) {
        let encoded = json::to_json(&value).expect("decoded values re-encode");
        let decoded = json::from_json(&encoded).expect("encoded values decode");
        assert_eq!(decoded, value);
    }
});
