// ---------------------------------------------------------------------------
// Distance metrics
// ---------------------------------------------------------------------------
//
// Pure functions over f32 feature rows. Accumulation happens in f64 so long
// sparse pivot rows do not lose precision.
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

/// Metric a fitted index was built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
	#[default]
	Euclidean,
	Cosine,
	Manhattan,
}

impl Metric {
	/// Distance between two rows of equal width. Callers validate widths.
	pub fn distance(&self, a: &[f32], b: &[f32]) -> f64 {
		match self {
			Self::Euclidean => euclidean_distance(a, b),
			Self::Cosine => cosine_distance(a, b),
			Self::Manhattan => manhattan_distance(a, b),
		}
	}
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
	let mut sum: f64 = 0.0;
	for (&x, &y) in a.iter().zip(b) {
		let d = x as f64 - y as f64;
		sum += d * d;
	}
	sum.sqrt()
}

pub fn manhattan_distance(a: &[f32], b: &[f32]) -> f64 {
	a.iter()
		.zip(b)
		.map(|(&x, &y)| (x as f64 - y as f64).abs())
		.sum()
}

/// Compute cosine similarity between two f32 vectors.
/// Returns 0.0 for zero-magnitude vectors or dimension mismatches.
/// Result clamped to [-1.0, 1.0].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
	if a.len() != b.len() || a.is_empty() {
		return 0.0;
	}

	let mut dot: f64 = 0.0;
	let mut norm_a: f64 = 0.0;
	let mut norm_b: f64 = 0.0;

	for i in 0..a.len() {
		let ai = a[i] as f64;
		let bi = b[i] as f64;
		dot += ai * bi;
		norm_a += ai * ai;
		norm_b += bi * bi;
	}

	let denom = norm_a.sqrt() * norm_b.sqrt();
	if denom == 0.0 {
		return 0.0;
	}

	let result = dot / denom;
	if !result.is_finite() {
		return 0.0;
	}
	result.clamp(-1.0, 1.0)
}

/// `1 - cosine_similarity`, in [0.0, 2.0]. A zero row is at distance 1.0
/// from everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
	1.0 - cosine_similarity(a, b)
}

/// Round to 4 decimal places, the precision reported to callers.
pub fn round4(value: f64) -> f64 {
	(value * 10_000.0).round() / 10_000.0
}
