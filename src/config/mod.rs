//! Engine configuration.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EngineConfig (validated, immutable)
//!     → main wires source, model cache, server and observability from it
//! ```
//!
//! # Design Decisions
//! - Every section has defaults, so an empty file is a valid config
//! - serde rejects malformed input, `validate_config` rejects bad values
//! - The configuration tree itself is hot-reloaded by `source::watcher`;
//!   this file is read once at startup

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{EngineConfig, LogFormat, ModelConfig, ObservabilityConfig, ServerConfig, SourceConfig};
