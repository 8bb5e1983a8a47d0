use std::sync::Arc;

use anyhow::Result;
use bookrec_engine::config::CliArgs;
use bookrec_engine::engine::RecommendationEngine;
use bookrec_engine::server::{BookServer, ServerConfig};
use bookrec_engine::transport::NdjsonTransport;
use clap::Parser;

fn main() -> Result<()> {
	let args = CliArgs::parse();

	// Logs go to stderr; stdout carries the JSON-RPC stream
	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
		)
		.init();

	let paths = args.artifact_paths();
	let engine = Arc::new(RecommendationEngine::new(paths));

	let missing = engine.missing_artifacts();
	if missing.is_empty() {
		tracing::info!(model = %engine.paths().model_name(), "Artifacts present");
	} else {
		tracing::warn!(missing = ?missing, "Artifacts missing; train the model first");
	}

	let config = ServerConfig {
		train_command: args.train_command(),
	};
	let mut server = BookServer::new(config, engine, NdjsonTransport::new());

	tracing::info!("bookrec-engine ready");
	server.run()?;
	Ok(())
}
