// ---------------------------------------------------------------------------
// BookServer — JSON-RPC dispatcher
// ---------------------------------------------------------------------------
//
// Routes JSON-RPC 2.0 requests (NDJSON over stdin) to the shared
// `RecommendationEngine`. The engine reports errors without logging them;
// this layer logs the unexpected ones and turns every error into a JSON-RPC
// error carrying a `bookrecCode`.
// ---------------------------------------------------------------------------

use std::io::{self, BufRead};
use std::sync::Arc;

use crate::config::TrainCommand;
use crate::engine::{RecommendationEngine, DEFAULT_RECOMMEND_LIMIT};
use crate::error::RecommenderError;
use crate::protocol::*;
use crate::search::DEFAULT_SEARCH_LIMIT;
use crate::types::EngineStatus;

pub const MAX_SEARCH_LIMIT: i64 = 20;
pub const MAX_RECOMMEND_LIMIT: i64 = 50;

const NO_RESULTS_NOTICE: &str = "No related titles were found for the selected book.";

pub struct ServerConfig {
	pub train_command: Option<TrainCommand>,
}

enum DispatchError {
	InvalidParams(String),
	Engine(RecommenderError),
}

impl From<RecommenderError> for DispatchError {
	fn from(e: RecommenderError) -> Self {
		Self::Engine(e)
	}
}

type HandlerResult = Result<serde_json::Value, DispatchError>;

/// JSON-RPC server over a shared [`RecommendationEngine`].
pub struct BookServer {
	config: ServerConfig,
	engine: Arc<RecommendationEngine>,
	transport: crate::transport::NdjsonTransport,
}

impl BookServer {
	pub fn new(
		config: ServerConfig,
		engine: Arc<RecommendationEngine>,
		transport: crate::transport::NdjsonTransport,
	) -> Self {
		Self {
			config,
			engine,
			transport,
		}
	}

	/// Main loop: read JSON-RPC messages from stdin, dispatch to handlers.
	pub fn run(&mut self) -> Result<(), RecommenderError> {
		let stdin = io::stdin();
		let reader = stdin.lock();

		for line_result in reader.lines() {
			let line = line_result?;
			if line.trim().is_empty() {
				continue;
			}

			let request: JsonRpcRequest = match serde_json::from_str(&line) {
				Ok(r) => r,
				Err(e) => {
					tracing::error!("Failed to parse request: {}", e);
					continue;
				}
			};

			self.dispatch(request);
		}

		Ok(())
	}

	// ── Dispatch ──────────────────────────────────────────────────────────

	fn dispatch(&mut self, req: JsonRpcRequest) {
		let id = req.id;
		let result = match req.method.as_str() {
			// -- Engine --------------------------------------------------
			"engine/status" => Ok(self.handle_status()),
			"engine/missingArtifacts" => Ok(serde_json::json!({
				"missing": self.missing_artifacts(),
			})),
			"engine/clearCache" => {
				self.engine.clear_cache();
				Ok(serde_json::json!({}))
			}
			"engine/retrain" => self.handle_retrain(),

			// -- Books ---------------------------------------------------
			"books/total" => self
				.engine
				.total_books()
				.map(|count| serde_json::json!({ "count": count }))
				.map_err(DispatchError::from),
			"books/search" => self.handle_search(req.params),
			"books/recommend" => self.handle_recommend(req.params),

			// -- Unknown -------------------------------------------------
			_ => {
				self.transport.write_error(
					id,
					METHOD_NOT_FOUND,
					format!("Unknown method: {}", req.method),
					None,
				);
				return;
			}
		};

		match result {
			Ok(value) => self.transport.write_response(id, value),
			Err(DispatchError::InvalidParams(msg)) => {
				self.transport.write_error(id, INVALID_PARAMS, msg, None)
			}
			Err(DispatchError::Engine(e)) => {
				if !e.is_recoverable() {
					tracing::error!(method = %req.method, code = e.code(), "Request failed: {}", e);
				}
				self.transport.write_error(
					id,
					BOOKREC_ERROR,
					e.to_string(),
					Some(e.to_json_rpc_error()),
				)
			}
		}
	}

	fn missing_artifacts(&self) -> Vec<String> {
		self.engine
			.missing_artifacts()
			.iter()
			.map(|p| p.display().to_string().replace('\\', "/"))
			.collect()
	}

	// ── Handlers ──────────────────────────────────────────────────────────

	fn handle_status(&self) -> serde_json::Value {
		let missing = self.missing_artifacts();
		let mut total_books = 0;
		if missing.is_empty() {
			match self.engine.total_books() {
				Ok(count) => total_books = count,
				Err(e) => tracing::error!("Could not load total book count: {}", e),
			}
		}

		let status = EngineStatus {
			artifacts_missing: !missing.is_empty(),
			missing_artifacts: missing,
			total_books,
			model_name: self.engine.paths().model_name(),
		};
		serde_json::to_value(status).unwrap_or_default()
	}

	fn handle_retrain(&self) -> HandlerResult {
		tracing::info!("Starting training pipeline");
		let total = self
			.engine
			.retrain(self.config.train_command.as_ref())
			.inspect_err(|e| tracing::error!("Training pipeline failed: {}", e))?;
		tracing::info!(total_books = total, "Training completed");
		Ok(serde_json::json!({ "totalBooks": total }))
	}

	fn handle_search(&self, params: serde_json::Value) -> HandlerResult {
		let p: SearchParams = parse_params(params)?;
		let limit = clamp_limit(p.limit, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT);

		if !self.engine.missing_artifacts().is_empty() {
			return Ok(serde_json::json!({ "books": [] }));
		}

		let books = self.engine.search_books(&p.q, limit)?;
		Ok(serde_json::json!({ "books": books }))
	}

	fn handle_recommend(&self, params: serde_json::Value) -> HandlerResult {
		let p: RecommendParams = parse_params(params)?;
		let book_name = p.book_name.trim();
		if book_name.is_empty() {
			return Err(RecommenderError::Validation(
				"Select a book title before requesting recommendations.".into(),
			)
			.into());
		}
		let limit = clamp_limit(p.limit, DEFAULT_RECOMMEND_LIMIT, MAX_RECOMMEND_LIMIT);

		let outcome = self.engine.recommend(book_name, limit)?;
		let mut result = serde_json::to_value(&outcome).unwrap_or_default();
		if outcome.recommendations.is_empty() {
			result["notice"] = serde_json::json!(NO_RESULTS_NOTICE);
		}
		Ok(result)
	}
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_params<T: serde::de::DeserializeOwned>(
	params: serde_json::Value,
) -> Result<T, DispatchError> {
	// Requests may omit params entirely.
	let params = if params.is_null() {
		serde_json::json!({})
	} else {
		params
	};
	serde_json::from_value(params)
		.map_err(|e| DispatchError::InvalidParams(format!("Invalid params: {}", e)))
}

/// Apply `default` when absent and clamp into `1..=max`.
pub fn clamp_limit(requested: Option<i64>, default: usize, max: i64) -> usize {
	requested.unwrap_or(default as i64).clamp(1, max) as usize
}
