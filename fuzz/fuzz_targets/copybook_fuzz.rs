//! Copybook fuzz target: feed arbitrary text to the front end, then lay out what parses.
//! Nothing may panic; parse and layout errors are fine.
//! Build with: cargo fuzz run copybook_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use copybook_layout::{layout, parse_copybook, Declaration, ParseOptions, ResolveOptions, SourceFormat};
#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

/// Product of OCCURS counts above which expansion is skipped to bound memory.
#[cfg(fuzzing)]
const MAX_COPIES: u64 = 4096;

#[cfg(fuzzing)]
fn copies_bounded(events: &[Declaration]) -> bool {
    let mut product = 1u64;
    for e in events {
        let n = match e {
            Declaration::BeginGroup { occurs, .. } | Declaration::Leaf { occurs, .. } => {
                occurs.unwrap_or(1).max(1) as u64
            }
            Declaration::EndGroup => 1,
        };
        product = product.saturating_mul(n);
        if product > MAX_COPIES {
            return false;
        }
    }
    true
}

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    for format in [SourceFormat::Fixed, SourceFormat::Free] {
        if let Ok(events) = parse_copybook(s, &ParseOptions { format }) {
            if copies_bounded(&events) {
                let _ = layout(&events, &ResolveOptions::default());
            }
        }
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run copybook_fuzz");
}
