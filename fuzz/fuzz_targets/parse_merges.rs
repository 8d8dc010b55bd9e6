#![no_main]

use agglo_core::canonicalize;
use agglo_core::io::{parse_label_array, parse_merges_json, parse_merges_text};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let _ = parse_label_array(text);
    for records in [parse_merges_text(text), parse_merges_json(text)]
        .into_iter()
        .flatten()
    {
        // Must return an error rather than panic on arbitrary sequences.
        let _ = canonicalize(records.len() + 1, &records);
    }
});
