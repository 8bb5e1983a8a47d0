// ---------------------------------------------------------------------------
// RecommendationEngine — cached queries over the trained artifacts
// ---------------------------------------------------------------------------
//
// The loaded artifacts and their derived lookups form one immutable
// `LoadedState` snapshot, published through an `ArcSwapOption`. Readers grab
// the current snapshot and never see a half-applied reload. Freshness checks
// and reloads run under a single writer lock.
//
// Every query stats the artifact files first, so an out-of-band training run
// that rewrites them is picked up on the next call without a restart.
// ---------------------------------------------------------------------------

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use crate::artifacts::{self, FreshnessTracker, LoadedArtifacts};
use crate::config::{ArtifactPaths, TrainCommand};
use crate::distance::round4;
use crate::error::RecommenderError;
use crate::knn::NearestNeighbors;
use crate::lookup::LookupIndex;
use crate::search::{search_titles, DEFAULT_SEARCH_LIMIT};
use crate::tables::{PivotTable, RatingRecord};
use crate::types::{BookRecommendation, RecommendOutcome};

pub const DEFAULT_RECOMMEND_LIMIT: usize = 5;

// ---------------------------------------------------------------------------
// LoadedState
// ---------------------------------------------------------------------------

/// One consistent load of all four artifacts plus the structures derived
/// from them.
pub struct LoadedState {
	model: Box<dyn NearestNeighbors>,
	pivot: PivotTable,
	ratings: Vec<RatingRecord>,
	book_names: Vec<String>,
	lookup: LookupIndex,
}

impl LoadedState {
	pub fn build(artifacts: LoadedArtifacts) -> Self {
		let lookup = LookupIndex::build(&artifacts.book_names, &artifacts.pivot, &artifacts.ratings);
		Self {
			model: artifacts.model,
			pivot: artifacts.pivot,
			ratings: artifacts.ratings,
			book_names: artifacts.book_names,
			lookup,
		}
	}

	pub fn lookup(&self) -> &LookupIndex {
		&self.lookup
	}

	pub fn pivot(&self) -> &PivotTable {
		&self.pivot
	}

	pub fn ratings(&self) -> &[RatingRecord] {
		&self.ratings
	}

	/// Book names as stored, duplicates included.
	pub fn raw_book_names(&self) -> &[String] {
		&self.book_names
	}

	pub fn total_books(&self) -> usize {
		self.lookup.titles.len()
	}

	pub fn search_books(&self, query: &str, limit: usize) -> Vec<String> {
		search_titles(&self.lookup.titles, query, limit)
	}

	pub fn recommend(&self, book_name: &str, limit: usize) -> Result<RecommendOutcome, RecommenderError> {
		if book_name.trim().is_empty() {
			return Err(RecommenderError::Validation(
				"Select a book title to get recommendations.".into(),
			));
		}

		let not_found = || {
			RecommenderError::NotFound(format!(
				"Book '{}' is not available in the trained recommendation index.",
				book_name
			))
		};

		let matched = self.lookup.canonical_title(book_name).ok_or_else(not_found)?;
		let position = self.pivot.position_of(matched).ok_or_else(not_found)?;
		let features = self.pivot.row(position).ok_or_else(not_found)?;

		// One extra neighbor: the matched row is its own nearest neighbor.
		let k = (limit + 1).min(self.pivot.len());
		let neighbors = self.model.kneighbors(features, k);

		let mut recommendations = Vec::with_capacity(limit);
		for neighbor in neighbors {
			if recommendations.len() >= limit {
				break;
			}
			let Some(title) = self.pivot.label(neighbor.index) else {
				continue;
			};
			if title == matched {
				continue;
			}
			recommendations.push(BookRecommendation {
				title: title.to_string(),
				image_url: self.lookup.image_for(title).map(str::to_string),
				distance: round4(neighbor.distance),
			});
		}

		Ok(RecommendOutcome {
			recommendations,
			matched_title: matched.to_string(),
		})
	}
}

// ---------------------------------------------------------------------------
// RecommendationEngine
// ---------------------------------------------------------------------------

pub struct RecommendationEngine {
	paths: ArtifactPaths,
	state: ArcSwapOption<LoadedState>,
	freshness: Mutex<FreshnessTracker>,
	loads: AtomicU64,
}

impl RecommendationEngine {
	/// Create an engine over `paths`. Nothing is read until the first query.
	pub fn new(paths: ArtifactPaths) -> Self {
		Self {
			paths,
			state: ArcSwapOption::empty(),
			freshness: Mutex::new(FreshnessTracker::new()),
			loads: AtomicU64::new(0),
		}
	}

	pub fn paths(&self) -> &ArtifactPaths {
		&self.paths
	}

	/// Number of full artifact loads performed so far.
	pub fn load_count(&self) -> u64 {
		self.loads.load(Ordering::Acquire)
	}

	pub fn is_loaded(&self) -> bool {
		self.state.load().is_some()
	}

	/// Required artifact paths that are absent on disk.
	pub fn missing_artifacts(&self) -> Vec<PathBuf> {
		artifacts::missing_artifacts(&self.paths)
	}

	/// Drop the loaded snapshot and all recorded timestamps.
	pub fn clear_cache(&self) {
		let mut freshness = self.freshness.lock();
		freshness.clear();
		self.state.store(None);
	}

	/// Return a fresh snapshot, reloading every artifact if none is loaded or
	/// any artifact's modification time changed.
	pub fn ensure_loaded(&self) -> Result<Arc<LoadedState>, RecommenderError> {
		let mut freshness = self.freshness.lock();

		let missing = self.missing_artifacts();
		if !missing.is_empty() {
			freshness.clear();
			self.state.store(None);
			return Err(RecommenderError::ArtifactsMissing(
				missing.iter().map(|p| p.display().to_string()).collect(),
			));
		}

		// Always observe so timestamps are recorded even on the first load.
		let changed = freshness.observe(&self.paths.all())?;
		if !changed {
			if let Some(state) = self.state.load_full() {
				return Ok(state);
			}
		}

		let loaded = artifacts::load_artifacts(&self.paths)?;
		let state = Arc::new(LoadedState::build(loaded));
		self.state.store(Some(Arc::clone(&state)));
		self.loads.fetch_add(1, Ordering::AcqRel);
		Ok(state)
	}

	pub fn total_books(&self) -> Result<usize, RecommenderError> {
		Ok(self.ensure_loaded()?.total_books())
	}

	pub fn search_books(&self, query: &str, limit: usize) -> Result<Vec<String>, RecommenderError> {
		Ok(self.ensure_loaded()?.search_books(query, limit))
	}

	pub fn search_books_default(&self, query: &str) -> Result<Vec<String>, RecommenderError> {
		self.search_books(query, DEFAULT_SEARCH_LIMIT)
	}

	pub fn recommend(&self, book_name: &str, limit: usize) -> Result<RecommendOutcome, RecommenderError> {
		self.ensure_loaded()?.recommend(book_name, limit)
	}

	/// Run the external training pipeline, then force a reload so the new
	/// artifacts are served immediately. Returns the new total book count.
	pub fn retrain(&self, command: Option<&TrainCommand>) -> Result<usize, RecommenderError> {
		let command = command
			.ok_or_else(|| RecommenderError::Training("no training command configured".into()))?;

		let status = Command::new(&command.program)
			.args(&command.args)
			.stdin(Stdio::null())
			.stdout(Stdio::null())
			.stderr(Stdio::inherit())
			.status()
			.map_err(|e| {
				RecommenderError::Training(format!("failed to start '{}': {}", command.program, e))
			})?;
		if !status.success() {
			return Err(RecommenderError::Training(format!(
				"'{}' exited with {}",
				command.program, status
			)));
		}

		self.clear_cache();
		self.total_books()
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
	use std::time::{Duration, SystemTime};

	use super::*;
	use crate::artifacts::write_artifacts;
	use crate::distance::Metric;
	use crate::knn::BruteForceIndex;

	struct Fixture {
		_dir: tempfile::TempDir,
		paths: ArtifactPaths,
	}

	fn strings(items: &[&str]) -> Vec<String> {
		items.iter().map(|s| s.to_string()).collect()
	}

	/// Five books over three users. "Harry Potter" is closest to
	/// "Harbor Lights", then "The Hart", then "Dune"; "Emma" is far away.
	fn fixture() -> Fixture {
		let dir = tempfile::tempdir().unwrap();
		let paths = ArtifactPaths::under(dir.path());
		write_library(&paths, &["Harry Potter", "Harbor Lights", "The Hart", "Dune", "Emma"]);
		Fixture { _dir: dir, paths }
	}

	fn write_library(paths: &ArtifactPaths, titles: &[&str]) {
		let all_rows = [
			vec![10.0, 0.0, 0.0],
			vec![9.0, 0.0, 0.0],
			vec![7.0, 0.0, 0.0],
			vec![4.0, 0.0, 0.0],
			vec![0.0, 0.0, 10.0],
		];
		let rows: Vec<Vec<f32>> = all_rows.iter().take(titles.len()).cloned().collect();
		let pivot = PivotTable::new(strings(titles), strings(&["u1", "u2", "u3"]), rows.clone()).unwrap();
		let model = BruteForceIndex::fit(Metric::Euclidean, rows).unwrap();
		let ratings = vec![
			RatingRecord::new("Harry Potter", Some("http://img/hp.jpg")),
			RatingRecord::new("Harbor Lights", Some("nan")),
			RatingRecord::new("Harbor Lights", Some("http://img/late.jpg")),
			RatingRecord::new("The Hart", Some("  ")),
			RatingRecord::new("Dune", None),
			RatingRecord::new("Emma", Some(" http://img/emma.jpg ")),
		];
		let mut names = strings(titles);
		names.extend(strings(titles));
		write_artifacts(paths, &model, &pivot, &ratings, &names).unwrap();
	}

	fn touch(path: &std::path::Path, secs_ahead: u64) {
		std::fs::File::options()
			.write(true)
			.open(path)
			.unwrap()
			.set_modified(SystemTime::now() + Duration::from_secs(secs_ahead))
			.unwrap();
	}

	// -- loader ---------------------------------------------------------------

	#[test]
	fn missing_artifacts_fail_queries_without_loading() {
		let dir = tempfile::tempdir().unwrap();
		let engine = RecommendationEngine::new(ArtifactPaths::under(dir.path()));

		assert_eq!(engine.missing_artifacts().len(), 4);
		let err = engine.total_books().unwrap_err();
		assert!(matches!(err, RecommenderError::ArtifactsMissing(ref p) if p.len() == 4));
		assert_eq!(engine.load_count(), 0);
		assert!(!engine.is_loaded());
	}

	#[test]
	fn loads_once_while_files_are_unchanged() {
		let f = fixture();
		let engine = RecommendationEngine::new(f.paths.clone());

		assert!(engine.missing_artifacts().is_empty());
		engine.ensure_loaded().unwrap();
		assert_eq!(engine.load_count(), 1);
		engine.ensure_loaded().unwrap();
		engine.total_books().unwrap();
		engine.search_books("dune", 5).unwrap();
		assert_eq!(engine.load_count(), 1);
	}

	#[test]
	fn touching_any_single_artifact_reloads_everything() {
		let f = fixture();
		let engine = RecommendationEngine::new(f.paths.clone());
		engine.ensure_loaded().unwrap();

		for (i, path) in f.paths.all().into_iter().enumerate() {
			touch(path, 60 * (i as u64 + 1));
			engine.total_books().unwrap();
			assert_eq!(engine.load_count(), i as u64 + 2);
		}
	}

	#[test]
	fn reload_picks_up_rewritten_artifacts() {
		let f = fixture();
		let engine = RecommendationEngine::new(f.paths.clone());
		assert_eq!(engine.total_books().unwrap(), 5);

		write_library(&f.paths, &["Harry Potter", "Dune"]);
		for path in f.paths.all() {
			touch(path, 120);
		}
		assert_eq!(engine.total_books().unwrap(), 2);
	}

	#[test]
	fn deleting_an_artifact_empties_the_cache() {
		let f = fixture();
		let engine = RecommendationEngine::new(f.paths.clone());
		engine.ensure_loaded().unwrap();
		assert!(engine.is_loaded());

		std::fs::remove_file(&f.paths.pivot).unwrap();
		let err = engine.search_books("", 3).unwrap_err();
		assert_eq!(err.code(), "BOOKREC_ARTIFACTS_MISSING");
		assert!(!engine.is_loaded());
	}

	#[test]
	fn failed_reload_keeps_previous_snapshot() {
		let f = fixture();
		let engine = RecommendationEngine::new(f.paths.clone());
		engine.ensure_loaded().unwrap();

		std::fs::write(&f.paths.book_names, b"[broken").unwrap();
		touch(&f.paths.book_names, 60);
		let err = engine.total_books().unwrap_err();
		assert_eq!(err.code(), "BOOKREC_ARTIFACT_LOAD");
		assert!(engine.is_loaded());
		assert_eq!(engine.load_count(), 1);
	}

	#[test]
	fn clear_cache_then_reload_reproduces_derived_structures() {
		let f = fixture();
		let engine = RecommendationEngine::new(f.paths.clone());
		let before = engine.ensure_loaded().unwrap();

		engine.clear_cache();
		assert!(!engine.is_loaded());
		let after = engine.ensure_loaded().unwrap();

		assert_eq!(engine.load_count(), 2);
		assert_eq!(before.lookup(), after.lookup());
		assert_eq!(before.pivot(), after.pivot());
		assert_eq!(before.ratings(), after.ratings());
		assert_eq!(before.raw_book_names(), after.raw_book_names());
	}

	#[test]
	fn snapshots_outlive_a_reload() {
		let f = fixture();
		let engine = RecommendationEngine::new(f.paths.clone());
		let old = engine.ensure_loaded().unwrap();

		write_library(&f.paths, &["Dune"]);
		for path in f.paths.all() {
			touch(path, 180);
		}
		let new = engine.ensure_loaded().unwrap();

		assert_eq!(old.total_books(), 5);
		assert_eq!(new.total_books(), 1);
	}

	#[test]
	fn concurrent_readers_share_one_engine() {
		let f = fixture();
		let engine = Arc::new(RecommendationEngine::new(f.paths.clone()));

		let handles: Vec<_> = (0..8)
			.map(|i| {
				let engine = Arc::clone(&engine);
				std::thread::spawn(move || {
					for _ in 0..20 {
						let outcome = engine.recommend("dune", 2).unwrap();
						assert_eq!(outcome.recommendations.len(), 2);
						assert_eq!(engine.total_books().unwrap(), 5);
					}
					i
				})
			})
			.collect();
		for handle in handles {
			handle.join().unwrap();
		}

		// Reloads are serialized; unchanged files mean a single load.
		assert_eq!(engine.load_count(), 1);
	}

	// -- queries --------------------------------------------------------------

	#[test]
	fn total_books_counts_deduplicated_names() {
		let f = fixture();
		let engine = RecommendationEngine::new(f.paths.clone());
		assert_eq!(engine.total_books().unwrap(), 5);
		assert_eq!(engine.ensure_loaded().unwrap().raw_book_names().len(), 10);
	}

	#[test]
	fn search_orders_prefix_before_substring() {
		let f = fixture();
		let engine = RecommendationEngine::new(f.paths.clone());
		assert_eq!(
			engine.search_books("har", 10).unwrap(),
			strings(&["Harry Potter", "Harbor Lights", "The Hart"])
		);
		assert_eq!(
			engine.search_books("", 3).unwrap(),
			strings(&["Harry Potter", "Harbor Lights", "The Hart"])
		);
		assert_eq!(engine.search_books_default("").unwrap().len(), 5);
	}

	#[test]
	fn recommend_rejects_blank_input() {
		let f = fixture();
		let engine = RecommendationEngine::new(f.paths.clone());
		for input in ["", "   "] {
			let err = engine.recommend(input, 5).unwrap_err();
			assert!(matches!(err, RecommenderError::Validation(_)));
		}
	}

	#[test]
	fn recommend_unknown_title_is_not_found() {
		let f = fixture();
		let engine = RecommendationEngine::new(f.paths.clone());
		let err = engine.recommend("Nonexistent Title", 5).unwrap_err();
		assert!(matches!(err, RecommenderError::NotFound(_)));
		assert!(err.to_string().contains("Nonexistent Title"));
	}

	#[test]
	fn recommend_matches_case_insensitively_and_excludes_itself() {
		let f = fixture();
		let engine = RecommendationEngine::new(f.paths.clone());
		let outcome = engine.recommend("  harry potter ", 3).unwrap();

		assert_eq!(outcome.matched_title, "Harry Potter");
		let titles: Vec<&str> = outcome.recommendations.iter().map(|r| r.title.as_str()).collect();
		assert_eq!(titles, vec!["Harbor Lights", "The Hart", "Dune"]);
		assert!(outcome.recommendations.iter().all(|r| r.title != "Harry Potter"));
	}

	#[test]
	fn recommend_reports_rounded_distances_and_clean_images() {
		let f = fixture();
		let engine = RecommendationEngine::new(f.paths.clone());
		let outcome = engine.recommend("Harry Potter", 4).unwrap();
		let recs = &outcome.recommendations;

		assert_eq!(recs.len(), 4);
		assert_eq!(recs[0].distance, 1.0);
		assert_eq!(recs[1].distance, 3.0);
		assert_eq!(recs[2].distance, 6.0);
		// sqrt(200) = 14.142135...
		assert_eq!(recs[3].distance, 14.1421);

		// first rating row for "Harbor Lights" was "nan"
		assert_eq!(recs[0].image_url, None);
		assert_eq!(recs[1].image_url, None);
		assert_eq!(recs[2].image_url, None);
		assert_eq!(recs[3].image_url.as_deref(), Some("http://img/emma.jpg"));
	}

	#[test]
	fn recommend_never_exceeds_limit() {
		let f = fixture();
		let engine = RecommendationEngine::new(f.paths.clone());
		for limit in 0..8 {
			let outcome = engine.recommend("Dune", limit).unwrap();
			assert!(outcome.recommendations.len() <= limit);
			assert_eq!(outcome.recommendations.len(), limit.min(4));
		}
	}

	#[test]
	fn retrain_without_command_fails() {
		let f = fixture();
		let engine = RecommendationEngine::new(f.paths.clone());
		let err = engine.retrain(None).unwrap_err();
		assert_eq!(err.code(), "BOOKREC_TRAINING");
	}

	#[cfg(unix)]
	#[test]
	fn retrain_runs_command_and_reloads() {
		let f = fixture();
		let engine = RecommendationEngine::new(f.paths.clone());
		engine.ensure_loaded().unwrap();

		let ok = TrainCommand::parse("true").unwrap();
		assert_eq!(engine.retrain(Some(&ok)).unwrap(), 5);
		assert_eq!(engine.load_count(), 2);

		let failing = TrainCommand::parse("false").unwrap();
		let err = engine.retrain(Some(&failing)).unwrap_err();
		assert!(matches!(err, RecommenderError::Training(_)));
	}
}
