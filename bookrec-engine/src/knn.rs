// ---------------------------------------------------------------------------
// Nearest-neighbor index
// ---------------------------------------------------------------------------
//
// The engine only needs one capability from a fitted model: the k nearest
// rows of a feature vector, nearest first. `BruteForceIndex` is the bundled
// implementation; it scans every fitted row and breaks distance ties by
// ascending row index. NaN distances sort after every finite one.
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::codec::{self, CodecError};
use crate::distance::Metric;

pub const MODEL_FORMAT_VERSION: u32 = 1;

/// One neighbor returned by a k-NN query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
	/// Row position in the fitted data (the pivot row order).
	pub index: usize,
	pub distance: f64,
}

/// A fitted index answering k-nearest-neighbor queries.
pub trait NearestNeighbors: Send + Sync {
	/// Number of fitted rows.
	fn len(&self) -> usize;

	fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Width of every fitted row.
	fn dimensions(&self) -> usize;

	/// The `k` nearest fitted rows to `query`, nearest first. Returns at most
	/// `len()` neighbors.
	fn kneighbors(&self, query: &[f32], k: usize) -> Vec<Neighbor>;
}

// ---------------------------------------------------------------------------
// BruteForceIndex
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BruteForceIndex {
	metric: Metric,
	dimensions: usize,
	rows: Vec<Vec<f32>>,
}

impl BruteForceIndex {
	/// Fit over `rows`. Every row must have the same width.
	pub fn fit(metric: Metric, rows: Vec<Vec<f32>>) -> Result<Self, CodecError> {
		let dimensions = rows.first().map_or(0, Vec::len);
		if let Some(i) = rows.iter().position(|r| r.len() != dimensions) {
			return Err(CodecError::Corruption(format!(
				"Row {} has {} values, expected {}",
				i,
				rows[i].len(),
				dimensions
			)));
		}
		Ok(Self {
			metric,
			dimensions,
			rows,
		})
	}

	pub fn metric(&self) -> Metric {
		self.metric
	}

	pub fn to_artifact(&self) -> ModelArtifact {
		ModelArtifact {
			version: MODEL_FORMAT_VERSION,
			metric: self.metric,
			dimensions: self.dimensions,
			rows: self.rows.iter().map(|r| codec::encode_row(r)).collect(),
		}
	}

	pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, CodecError> {
		if artifact.version != MODEL_FORMAT_VERSION {
			return Err(CodecError::Corruption(format!(
				"Unsupported model version: {}",
				artifact.version
			)));
		}
		let rows = codec::decode_rows(&artifact.rows, artifact.dimensions)?;
		Ok(Self {
			metric: artifact.metric,
			dimensions: artifact.dimensions,
			rows,
		})
	}
}

impl NearestNeighbors for BruteForceIndex {
	fn len(&self) -> usize {
		self.rows.len()
	}

	fn dimensions(&self) -> usize {
		self.dimensions
	}

	fn kneighbors(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
		let mut scored: Vec<Neighbor> = self
			.rows
			.iter()
			.enumerate()
			.map(|(index, row)| Neighbor {
				index,
				distance: self.metric.distance(query, row),
			})
			.collect();

		scored.sort_by(|a, b| {
			a.distance
				.is_nan()
				.cmp(&b.distance.is_nan())
				.then(a.distance.total_cmp(&b.distance))
				.then(a.index.cmp(&b.index))
		});
		scored.truncate(k);
		scored
	}
}

/// On-disk form of a fitted model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
	pub version: u32,
	#[serde(default)]
	pub metric: Metric,
	pub dimensions: usize,
	/// Base64 f32 LE rows, in pivot row order.
	pub rows: Vec<String>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
