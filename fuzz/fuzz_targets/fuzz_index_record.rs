#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must decode or be rejected, never panic
    if let Ok(loaded) = vault_search::index::persist::decode_record(data) {
        let _ = loaded.content.search_candidates("a", 0.2);
    }
});
