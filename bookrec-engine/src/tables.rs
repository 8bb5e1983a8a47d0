// ---------------------------------------------------------------------------
// Pivot and ratings tables
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::codec::{self, CodecError};

pub const PIVOT_FORMAT_VERSION: u32 = 1;

/// Book × user feature matrix. Row labels are book titles in the order the
/// fitted model was built over.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotTable {
	index: Vec<String>,
	columns: Vec<String>,
	rows: Vec<Vec<f32>>,
}

impl PivotTable {
	pub fn new(
		index: Vec<String>,
		columns: Vec<String>,
		rows: Vec<Vec<f32>>,
	) -> Result<Self, CodecError> {
		if index.len() != rows.len() {
			return Err(CodecError::Corruption(format!(
				"Pivot has {} row labels but {} rows",
				index.len(),
				rows.len()
			)));
		}
		if let Some(i) = rows.iter().position(|r| r.len() != columns.len()) {
			return Err(CodecError::Corruption(format!(
				"Pivot row {} has {} values, expected {}",
				i,
				rows[i].len(),
				columns.len()
			)));
		}
		Ok(Self {
			index,
			columns,
			rows,
		})
	}

	/// Row labels, in row order.
	pub fn index(&self) -> &[String] {
		&self.index
	}

	pub fn columns(&self) -> &[String] {
		&self.columns
	}

	pub fn len(&self) -> usize {
		self.index.len()
	}

	pub fn is_empty(&self) -> bool {
		self.index.is_empty()
	}

	pub fn row(&self, position: usize) -> Option<&[f32]> {
		self.rows.get(position).map(Vec::as_slice)
	}

	pub fn label(&self, position: usize) -> Option<&str> {
		self.index.get(position).map(String::as_str)
	}

	/// First row whose label equals `title` exactly.
	pub fn position_of(&self, title: &str) -> Option<usize> {
		self.index.iter().position(|label| label == title)
	}

	pub fn to_artifact(&self) -> PivotArtifact {
		PivotArtifact {
			version: PIVOT_FORMAT_VERSION,
			index: self.index.clone(),
			columns: self.columns.clone(),
			rows: self.rows.iter().map(|r| codec::encode_row(r)).collect(),
		}
	}

	pub fn from_artifact(artifact: PivotArtifact) -> Result<Self, CodecError> {
		if artifact.version != PIVOT_FORMAT_VERSION {
			return Err(CodecError::Corruption(format!(
				"Unsupported pivot version: {}",
				artifact.version
			)));
		}
		let rows = codec::decode_rows(&artifact.rows, artifact.columns.len())?;
		Self::new(artifact.index, artifact.columns, rows)
	}
}

/// On-disk form of a pivot table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotArtifact {
	pub version: u32,
	pub index: Vec<String>,
	pub columns: Vec<String>,
	pub rows: Vec<String>,
}

/// One row of the final-rating table. Only `title` and `image_url` are
/// interpreted; other columns ride along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
	pub title: String,
	#[serde(default)]
	pub image_url: Option<String>,
	#[serde(flatten)]
	pub extra: HashMap<String, serde_json::Value>,
}

impl RatingRecord {
	pub fn new(title: impl Into<String>, image_url: Option<&str>) -> Self {
		Self {
			title: title.into(),
			image_url: image_url.map(str::to_string),
			extra: HashMap::new(),
		}
	}
}
