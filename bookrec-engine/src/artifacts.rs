// ---------------------------------------------------------------------------
// Artifact loader
// ---------------------------------------------------------------------------
//
// Existence checks, modification-time bookkeeping, and the all-or-nothing
// deserialization of the four artifacts a training run writes.
// ---------------------------------------------------------------------------

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::codec::{self, CodecError};
use crate::config::ArtifactPaths;
use crate::error::RecommenderError;
use crate::knn::{BruteForceIndex, ModelArtifact, NearestNeighbors};
use crate::tables::{PivotArtifact, PivotTable, RatingRecord};

/// Paths from `paths` that do not exist on disk, in canonical order.
pub fn missing_artifacts(paths: &ArtifactPaths) -> Vec<PathBuf> {
	paths
		.all()
		.into_iter()
		.filter(|path| !path.exists())
		.map(Path::to_path_buf)
		.collect()
}

// ---------------------------------------------------------------------------
// Freshness tracking
// ---------------------------------------------------------------------------

/// Last observed modification time per artifact path.
#[derive(Debug, Default)]
pub struct FreshnessTracker {
	seen: HashMap<PathBuf, SystemTime>,
}

impl FreshnessTracker {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stat every path and record its current mtime. Returns true if any path
	/// was not seen before or changed since the last observation. Every path
	/// is recorded, even after a change has already been detected.
	pub fn observe(&mut self, paths: &[&Path]) -> std::io::Result<bool> {
		let mut changed = false;
		for path in paths {
			let modified = std::fs::metadata(path)?.modified()?;
			let previous = self.seen.insert(path.to_path_buf(), modified);
			if previous != Some(modified) {
				changed = true;
			}
		}
		Ok(changed)
	}

	pub fn recorded(&self, path: &Path) -> Option<SystemTime> {
		self.seen.get(path).copied()
	}

	pub fn clear(&mut self) {
		self.seen.clear();
	}
}

// ---------------------------------------------------------------------------
// Deserialization
// ---------------------------------------------------------------------------

/// The four artifacts, decoded and shape-checked against each other.
pub struct LoadedArtifacts {
	pub model: Box<dyn NearestNeighbors>,
	pub pivot: PivotTable,
	pub ratings: Vec<RatingRecord>,
	pub book_names: Vec<String>,
}

fn load_error(path: &Path, err: CodecError) -> RecommenderError {
	RecommenderError::load(path.display().to_string(), err.to_string())
}

pub fn load_artifacts(paths: &ArtifactPaths) -> Result<LoadedArtifacts, RecommenderError> {
	let model_artifact: ModelArtifact =
		codec::read_artifact(&paths.model).map_err(|e| load_error(&paths.model, e))?;
	let model =
		BruteForceIndex::from_artifact(model_artifact).map_err(|e| load_error(&paths.model, e))?;

	let pivot_artifact: PivotArtifact =
		codec::read_artifact(&paths.pivot).map_err(|e| load_error(&paths.pivot, e))?;
	let pivot =
		PivotTable::from_artifact(pivot_artifact).map_err(|e| load_error(&paths.pivot, e))?;

	let ratings: Vec<RatingRecord> =
		codec::read_artifact(&paths.ratings).map_err(|e| load_error(&paths.ratings, e))?;
	let book_names: Vec<String> =
		codec::read_artifact(&paths.book_names).map_err(|e| load_error(&paths.book_names, e))?;

	if model.len() != pivot.len() {
		return Err(RecommenderError::load(
			paths.model.display().to_string(),
			format!(
				"model was fitted on {} rows but the pivot has {}",
				model.len(),
				pivot.len()
			),
		));
	}
	if !model.is_empty() && model.dimensions() != pivot.columns().len() {
		return Err(RecommenderError::load(
			paths.model.display().to_string(),
			format!(
				"model has {} dimensions but the pivot has {} columns",
				model.dimensions(),
				pivot.columns().len()
			),
		));
	}

	Ok(LoadedArtifacts {
		model: Box::new(model),
		pivot,
		ratings,
		book_names,
	})
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write a complete artifact set, gzipped. Used by producers written in Rust
/// and by tests.
pub fn write_artifacts(
	paths: &ArtifactPaths,
	model: &BruteForceIndex,
	pivot: &PivotTable,
	ratings: &[RatingRecord],
	book_names: &[String],
) -> Result<(), CodecError> {
	codec::write_artifact(&paths.model, &model.to_artifact(), true)?;
	codec::write_artifact(&paths.pivot, &pivot.to_artifact(), true)?;
	codec::write_artifact(&paths.ratings, &ratings, true)?;
	codec::write_artifact(&paths.book_names, &book_names, true)?;
	Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
