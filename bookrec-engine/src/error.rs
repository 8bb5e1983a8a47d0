use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecommenderError {
	#[error("Recommendation artifacts are missing. Train the model first.")]
	ArtifactsMissing(Vec<String>),
	#[error("Failed to load artifact {path}: {reason}")]
	ArtifactLoad { path: String, reason: String },
	#[error("{0}")]
	Validation(String),
	#[error("{0}")]
	NotFound(String),
	#[error("Training failed: {0}")]
	Training(String),
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

impl RecommenderError {
	pub(crate) fn load(path: impl Into<String>, reason: impl Into<String>) -> Self {
		Self::ArtifactLoad {
			path: path.into(),
			reason: reason.into(),
		}
	}

	pub fn code(&self) -> &str {
		match self {
			Self::ArtifactsMissing(_) => "BOOKREC_ARTIFACTS_MISSING",
			Self::ArtifactLoad { .. } => "BOOKREC_ARTIFACT_LOAD",
			Self::Validation(_) => "BOOKREC_VALIDATION",
			Self::NotFound(_) => "BOOKREC_NOT_FOUND",
			Self::Training(_) => "BOOKREC_TRAINING",
			Self::Io(_) => "BOOKREC_IO",
		}
	}

	/// Whether the caller can act on this error (retrain, fix the input)
	/// rather than it being an unexpected failure worth logging.
	pub fn is_recoverable(&self) -> bool {
		matches!(
			self,
			Self::ArtifactsMissing(_) | Self::Validation(_) | Self::NotFound(_)
		)
	}

	pub fn to_json_rpc_error(&self) -> serde_json::Value {
		let mut data = serde_json::json!({
			"bookrecCode": self.code(),
			"message": self.to_string(),
		});
		if let Self::ArtifactsMissing(paths) = self {
			data["missingArtifacts"] = serde_json::json!(paths);
		}
		data
	}
}
