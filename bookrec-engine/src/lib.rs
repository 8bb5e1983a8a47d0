pub mod artifacts;
pub mod codec;
pub mod config;
pub mod distance;
pub mod engine;
pub mod error;
pub mod knn;
pub mod lookup;
pub mod protocol;
pub mod search;
pub mod server;
pub mod tables;
pub mod transport;
pub mod types;

pub use config::{ArtifactPaths, TrainCommand};
pub use engine::{LoadedState, RecommendationEngine};
pub use error::RecommenderError;
