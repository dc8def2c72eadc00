//! Campus Counsel - anonymous campus mental-health consultation library
//!
//! This library provides the LLM consultation gateway used by the campus
//! mental-health service: a provider-agnostic chat gateway speaking two
//! wire dialects, a model resolver, and the session manager that keeps
//! each student's conversation history.
//!
//! # Architecture
//!
//! - `providers`: Provider abstraction, dialect implementations, and the `ChatGateway`
//! - `consultation`: Session resolution, history replay, and exchange persistence
//! - `storage`: Persistence contract and the SQLite backend
//! - `server`: HTTP API
//! - `telemetry`: Span and error recording handle
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use campus_counsel::consultation::ConsultationService;
//! use campus_counsel::telemetry::TracingTelemetry;
//! use campus_counsel::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     config.validate()?;
//!
//!     let service = ConsultationService::from_config(&config, TracingTelemetry::shared())?;
//!     let exchange = service.send_message("student-1", None, "I feel overwhelmed").await?;
//!     println!("{}", exchange.response);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod consultation;
pub mod error;
pub mod prompts;
pub mod providers;
pub mod server;
pub mod storage;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use consultation::ConsultationService;
pub use error::{CounselError, ErrorCategory, Result};
