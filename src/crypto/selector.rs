//! Entry-point selectors
//!
//! Maps a readable entry-point name to an integer id. The relay only ever
//! compares selectors for equality.

use super::hash::{sha256, truncate_to_felt};
use crate::Felt;

/// Top 6 bits are cleared so selectors stay within 122 bits
const SELECTOR_MASK: Felt = Felt::MAX >> 6;

/// Turns entry-point names into selectors
pub trait SelectorCodec {
    fn selector(&self, name: &str) -> Felt;
}

/// Default codec: masked prefix of SHA-256(name)
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256SelectorCodec;

impl SelectorCodec for Sha256SelectorCodec {
    fn selector(&self, name: &str) -> Felt {
        truncate_to_felt(&sha256(name.as_bytes())) & SELECTOR_MASK
    }
}

/// Selector for `name` under the default codec
pub fn selector_from_name(name: &str) -> Felt {
    Sha256SelectorCodec.selector(name)
}
