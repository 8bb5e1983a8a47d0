use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecommendation {
	pub title: String,
	#[serde(rename = "imageUrl")]
	pub image_url: Option<String>,
	pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendOutcome {
	pub recommendations: Vec<BookRecommendation>,
	#[serde(rename = "matchedTitle")]
	pub matched_title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
	#[serde(rename = "artifactsMissing")]
	pub artifacts_missing: bool,
	#[serde(rename = "missingArtifacts")]
	pub missing_artifacts: Vec<String>,
	#[serde(rename = "totalBooks")]
	pub total_books: usize,
	#[serde(rename = "modelName")]
	pub model_name: String,
}
