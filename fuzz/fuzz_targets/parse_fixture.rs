#![no_main]

use agglo_core::CanonicalTree;
use libfuzzer_sys::fuzz_target;

// Any accepted fixture renders back to text that parses to the same tree.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(tree) = text.parse::<CanonicalTree>() {
        let rendered = tree.to_string();
        let reparsed: CanonicalTree = rendered.parse().expect("rendered fixture must parse");
        assert_eq!(reparsed, tree);
    }
});
