// ── Discount code generation ──
//
// Codes are read aloud and typed in by hand, so `0` and `O` never appear.
// Each position first picks one of three character groups, then a
// character inside it. Digits are therefore over-represented relative to
// letters; issued codes already have that shape.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

/// Number of characters in every generated code.
pub const CODE_LENGTH: usize = 8;

const CHARACTER_GROUPS: [&str; 3] = ["123456789", "ABCDEFGHIJKLMN", "PQRSTUVWXYZ"];

/// Injectable randomness for code generation.
pub trait RandomSource: Send + Sync {
    /// Return a value in `0..upper`. `upper` is never zero.
    fn below(&self, upper: usize) -> usize;
}

/// Thread-local RNG from `rand`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn below(&self, upper: usize) -> usize {
        if upper == 0 {
            return 0;
        }
        rand::thread_rng().gen_range(0..upper)
    }
}

/// Replays a fixed sequence, wrapping around at the end.
///
/// Each value is reduced modulo the requested bound.
#[derive(Debug, Default)]
pub struct SequenceRandom {
    values: Vec<usize>,
    cursor: AtomicUsize,
}

impl SequenceRandom {
    pub fn new(values: Vec<usize>) -> Self {
        Self {
            values,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl RandomSource for SequenceRandom {
    fn below(&self, upper: usize) -> usize {
        if upper == 0 || self.values.is_empty() {
            return 0;
        }
        let position = self.cursor.fetch_add(1, Ordering::Relaxed) % self.values.len();
        self.values.get(position).copied().unwrap_or_default() % upper
    }
}

/// Generate one [`CODE_LENGTH`]-character discount code.
///
/// No uniqueness check is made against codes already issued.
pub fn generate_code(random: &dyn RandomSource) -> String {
    (0..CODE_LENGTH)
        .map(|_| {
            let group = pick(random, &CHARACTER_GROUPS).as_bytes();
            char::from(pick(random, group))
        })
        .collect()
}

/// Whether `code` could have come out of [`generate_code`].
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH
        && code
            .chars()
            .all(|c| CHARACTER_GROUPS.iter().any(|group| group.contains(c)))
}

fn pick<T: Copy>(random: &dyn RandomSource, items: &[T]) -> T {
    let index = random.below(items.len()) % items.len();
    items[index]
}
