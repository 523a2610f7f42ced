use std::collections::HashMap;

use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::core::Rgba8;

/// Viridis color ramp, dark violet to yellow.
const VIRIDIS: [[u8; 3]; 11] = [
    [68, 1, 84],
    [72, 36, 117],
    [65, 68, 135],
    [53, 95, 141],
    [42, 120, 142],
    [33, 145, 140],
    [34, 168, 132],
    [68, 191, 112],
    [122, 209, 81],
    [189, 223, 38],
    [253, 231, 37],
];

/// Deterministic label-to-color assignment.
///
/// A label hashes to a position on the viridis ramp, so the same entity keeps
/// the same color across frames, runs, and processes. The optional seed
/// shuffles the whole assignment while staying deterministic. Lookups are
/// memoized per instance.
#[derive(Clone, Debug, Default)]
pub struct Palette {
    seed: u64,
    memo: HashMap<String, Rgba8>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            memo: HashMap::new(),
        }
    }

    /// The color assigned to `label`.
    pub fn color_for(&mut self, label: &str) -> Rgba8 {
        if let Some(color) = self.memo.get(label) {
            return *color;
        }
        let hash = xxh3_64_with_seed(label.as_bytes(), self.seed);
        let t = (hash >> 11) as f64 / (1u64 << 53) as f64;
        let color = sample_ramp(t);
        self.memo.insert(label.to_owned(), color);
        color
    }
}

fn sample_ramp(t: f64) -> Rgba8 {
    let t = t.clamp(0.0, 1.0);
    let scaled = t * (VIRIDIS.len() - 1) as f64;
    let lo = scaled.floor() as usize;
    let hi = (lo + 1).min(VIRIDIS.len() - 1);
    let frac = scaled - lo as f64;

    let lerp = |a: u8, b: u8| -> u8 {
        (f64::from(a) + (f64::from(b) - f64::from(a)) * frac).round() as u8
    };

    Rgba8::rgb(
        lerp(VIRIDIS[lo][0], VIRIDIS[hi][0]),
        lerp(VIRIDIS[lo][1], VIRIDIS[hi][1]),
        lerp(VIRIDIS[lo][2], VIRIDIS[hi][2]),
    )
}
