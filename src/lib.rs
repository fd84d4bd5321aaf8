//! # PeopleDesk HR Portal
//!
//! An internal HR web service that routes authenticated users to AI-assisted
//! agents: document Q&A for employees, candidate screening and email
//! drafting for HR staff.
//!
//! ## Architecture
//!
//! - **Orchestrator**: registers heterogeneous agents, maps user roles and
//!   explicit names to instances, and tolerates partial agent-initialization
//!   failure. Agents whose construction fails at startup stay absent from
//!   the registry; role-mapped kinds are retried lazily on first use.
//! - **Agents**: document Q&A, candidate screening, and email drafting, each
//!   a thin domain layer over SQLite stores and an OpenRouter-backed LLM.
//! - **HTTP layer**: axum JSON API with cookie sessions, mirroring the
//!   `/auth`, `/employee`, `/hr`, and `/email` surfaces.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use peopledesk::agents::builtin_constructors;
//! use peopledesk::config::AppConfig;
//! use peopledesk::orchestrator::Orchestrator;
//! use peopledesk::storage::Database;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Arc::new(AppConfig::from_env()?);
//!     let db = Database::connect(&config.database_url).await?;
//!     let orchestrator =
//!         Orchestrator::bootstrap(builtin_constructors(config, db)).await;
//!
//!     let outcome = orchestrator.route("employee", None, None).await;
//!     println!("routed to {:?}", outcome.agent_name);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod agents;
pub mod auth;
pub mod config;
pub mod error;
pub mod llm_client;
pub mod openrouter;
pub mod orchestrator;
pub mod server;
pub mod storage;
pub mod types;

// Re-exports for convenience
pub use agents::{Agent, DocQaAgent, EmailAgent, HiringAgent};
pub use config::{AppConfig, LlmConfig};
pub use error::{Error, Result};
pub use llm_client::LlmClient;
pub use openrouter::OpenRouterClient;
pub use orchestrator::{AgentConstructor, Orchestrator, RouteOutcome, SelectedBy};
pub use types::UserRole;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::agents::{Agent, DocQaAgent, EmailAgent, HiringAgent};
    pub use crate::config::AppConfig;
    pub use crate::error::{Error, Result};
    pub use crate::orchestrator::{Orchestrator, RouteOutcome, SelectedBy};
    pub use crate::types::UserRole;
}
