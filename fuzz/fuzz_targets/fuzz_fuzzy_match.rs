#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vault_search::query::FuzzyMatcher;

#[derive(Arbitrary, Debug)]
struct Input<'a> {
    query: &'a str,
    name: &'a str,
}

fuzz_target!(|input: Input| {
    // Positions must be strictly increasing and inside the name
    if let Some(m) = FuzzyMatcher::default().score(input.query, input.name) {
        let len = input.name.chars().count();
        assert!(m.positions.windows(2).all(|w| w[0] < w[1]));
        assert!(m.positions.iter().all(|&p| p < len));
    }
});
