//! Skip-list level sampling.
//!
//! Mirrors `zslRandomLevel`: every node has level 1, and each further level
//! is granted with probability [`SKIPLIST_P`](crate::SKIPLIST_P), capped at
//! [`SKIPLIST_MAX_LEVEL`](crate::SKIPLIST_MAX_LEVEL).

use rand::Rng;

use crate::{SKIPLIST_MAX_LEVEL, SKIPLIST_P};

const RANDOM_MASK: u32 = 0xFFFF;

/// Draws the number of levels for a new skip-list node.
pub fn random_level<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    let threshold = (SKIPLIST_P * f64::from(RANDOM_MASK)) as u32;
    let mut level = 1;
    while level < SKIPLIST_MAX_LEVEL && rng.gen_range(0..RANDOM_MASK) < threshold {
        level += 1;
    }
    level
}

