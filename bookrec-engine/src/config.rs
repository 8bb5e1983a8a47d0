use std::path::{Path, PathBuf};

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "bookrec-engine", about = "Book recommendation engine over JSON-RPC 2.0 / NDJSON stdio")]
pub struct CliArgs {
	/// Root directory holding the trained artifacts
	#[arg(long, default_value = "artifacts", env = "BOOKREC_ARTIFACTS_DIR")]
	pub artifacts_dir: PathBuf,

	/// Fitted nearest-neighbor model (defaults to <artifacts-dir>/trained_model/model.json.gz)
	#[arg(long, env = "BOOKREC_MODEL_PATH")]
	pub model_path: Option<PathBuf>,

	/// Book pivot table (defaults to <artifacts-dir>/serialized_objects/book_pivot.json.gz)
	#[arg(long, env = "BOOKREC_PIVOT_PATH")]
	pub pivot_path: Option<PathBuf>,

	/// Final rating table (defaults to <artifacts-dir>/serialized_objects/final_rating.json.gz)
	#[arg(long, env = "BOOKREC_RATINGS_PATH")]
	pub ratings_path: Option<PathBuf>,

	/// Book name list (defaults to <artifacts-dir>/serialized_objects/book_names.json.gz)
	#[arg(long, env = "BOOKREC_BOOK_NAMES_PATH")]
	pub book_names_path: Option<PathBuf>,

	/// Training pipeline command run by `engine/retrain`, e.g. "python -m pipeline"
	#[arg(long, env = "BOOKREC_TRAIN_COMMAND")]
	pub train_command: Option<String>,

	/// Log level (trace, debug, info, warn, error)
	#[arg(long, default_value = "info", env = "BOOKREC_LOG_LEVEL")]
	pub log_level: String,
}

impl CliArgs {
	/// Resolve the four artifact paths, applying per-file overrides.
	pub fn artifact_paths(&self) -> ArtifactPaths {
		let defaults = ArtifactPaths::under(&self.artifacts_dir);
		ArtifactPaths {
			model: self.model_path.clone().unwrap_or(defaults.model),
			pivot: self.pivot_path.clone().unwrap_or(defaults.pivot),
			ratings: self.ratings_path.clone().unwrap_or(defaults.ratings),
			book_names: self.book_names_path.clone().unwrap_or(defaults.book_names),
		}
	}

	/// Split `--train-command` into program and arguments on whitespace.
	pub fn train_command(&self) -> Option<TrainCommand> {
		TrainCommand::parse(self.train_command.as_deref()?)
	}
}

/// Locations of the four artifacts a training run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
	pub model: PathBuf,
	pub pivot: PathBuf,
	pub ratings: PathBuf,
	pub book_names: PathBuf,
}

impl ArtifactPaths {
	/// Default layout under an artifacts root.
	pub fn under(root: &Path) -> Self {
		let objects = root.join("serialized_objects");
		Self {
			model: root.join("trained_model").join("model.json.gz"),
			pivot: objects.join("book_pivot.json.gz"),
			ratings: objects.join("final_rating.json.gz"),
			book_names: objects.join("book_names.json.gz"),
		}
	}

	/// All four paths in canonical order: model, pivot, ratings, names.
	pub fn all(&self) -> [&Path; 4] {
		[
			self.model.as_path(),
			self.pivot.as_path(),
			self.ratings.as_path(),
			self.book_names.as_path(),
		]
	}

	/// Base name of the model file.
	pub fn model_name(&self) -> String {
		self.model
			.file_name()
			.map(|name| name.to_string_lossy().into_owned())
			.unwrap_or_default()
	}
}

/// External training pipeline invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainCommand {
	pub program: String,
	pub args: Vec<String>,
}

impl TrainCommand {
	pub fn parse(command: &str) -> Option<Self> {
		let mut parts = command.split_whitespace().map(str::to_string);
		let program = parts.next()?;
		Some(Self {
			program,
			args: parts.collect(),
		})
	}
}
