// ---------------------------------------------------------------------------
// Artifact codec: JSON documents, optionally gzipped
// ---------------------------------------------------------------------------
//
// Every artifact is a single JSON document. Files starting with the gzip
// magic bytes are decompressed first, so producers may write either form.
// Numeric rows travel as base64 of little-endian f32 bytes to keep wide
// pivot rows compact inside JSON.
// ---------------------------------------------------------------------------

use std::io::Read;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::{GzDecoder, GzEncoder};
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Corruption: {0}")]
	Corruption(String),
	#[error("Serialization: {0}")]
	Serialization(String),
}

// ---------------------------------------------------------------------------
// Row encode / decode
// ---------------------------------------------------------------------------

/// Encode a f32 slice as base64 of Float32 little-endian bytes.
pub fn encode_row(row: &[f32]) -> String {
	let bytes: Vec<u8> = row.iter().flat_map(|f| f.to_le_bytes()).collect();
	STANDARD.encode(&bytes)
}

/// Decode a base64-encoded Float32 LE byte string back to `Vec<f32>`.
pub fn decode_row(encoded: &str) -> Result<Vec<f32>, CodecError> {
	let bytes = STANDARD
		.decode(encoded)
		.map_err(|e| CodecError::Corruption(format!("Invalid base64: {}", e)))?;
	if bytes.len() % 4 != 0 {
		return Err(CodecError::Corruption("Invalid row byte length".into()));
	}
	let mut result = Vec::with_capacity(bytes.len() / 4);
	for chunk in bytes.chunks_exact(4) {
		result.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
	}
	Ok(result)
}

/// Decode every row and check each has exactly `width` values.
pub fn decode_rows(encoded: &[String], width: usize) -> Result<Vec<Vec<f32>>, CodecError> {
	let mut rows = Vec::with_capacity(encoded.len());
	for (i, row) in encoded.iter().enumerate() {
		let decoded = decode_row(row)?;
		if decoded.len() != width {
			return Err(CodecError::Corruption(format!(
				"Row {} has {} values, expected {}",
				i,
				decoded.len(),
				width
			)));
		}
		if let Some(j) = decoded.iter().position(|v| !v.is_finite()) {
			return Err(CodecError::Corruption(format!(
				"Row {} holds a non-finite value at column {}",
				i, j
			)));
		}
		rows.push(decoded);
	}
	Ok(rows)
}

// ---------------------------------------------------------------------------
// Gzip compress / decompress
// ---------------------------------------------------------------------------

/// Gzip-compress a byte slice at level 6.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
	let mut encoder = GzEncoder::new(data, Compression::new(6));
	let mut compressed = Vec::new();
	encoder.read_to_end(&mut compressed)?;
	Ok(compressed)
}

/// Gunzip-decompress a byte slice.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
	let mut decoder = GzDecoder::new(data);
	let mut decompressed = Vec::new();
	decoder.read_to_end(&mut decompressed)?;
	Ok(decompressed)
}

/// Check if data starts with gzip magic bytes (0x1f, 0x8b).
pub fn is_gzipped(data: &[u8]) -> bool {
	data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

/// Read one artifact document from disk, gunzipping when needed.
pub fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, CodecError> {
	let raw = std::fs::read(path)?;
	let bytes = if is_gzipped(&raw) {
		decompress(&raw)?
	} else {
		raw
	};
	serde_json::from_slice(&bytes).map_err(|e| CodecError::Corruption(format!("Invalid JSON: {}", e)))
}

/// Write one artifact document, creating parent directories as needed.
pub fn write_artifact<T: Serialize>(
	path: &Path,
	value: &T,
	gzip: bool,
) -> Result<(), CodecError> {
	if let Some(parent) = path.parent() {
		if !parent.as_os_str().is_empty() {
			std::fs::create_dir_all(parent)?;
		}
	}

	let json = serde_json::to_vec(value)
		.map_err(|e| CodecError::Serialization(format!("Failed to serialize artifact: {}", e)))?;
	let bytes = if gzip { compress(&json)? } else { json };
	std::fs::write(path, bytes)?;
	Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
