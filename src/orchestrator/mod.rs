//! Orchestrator module - role-based routing across the portal's agents
//!
//! The orchestrator owns an in-memory registry of agent instances and a
//! mapping from user roles to default agent names. Route handlers ask it for
//! an agent per request, either by the caller's role or by explicit name.
//!
//! Agents whose construction fails at startup are simply absent from the
//! registry; the two role-mapped agent kinds are retried lazily on the first
//! role lookup that misses.
//!
//! # Example
//!
//! ```rust,ignore
//! use peopledesk::orchestrator::Orchestrator;
//!
//! let orchestrator = Orchestrator::bootstrap(constructors).await;
//! let outcome = orchestrator.route("employee", None, None).await;
//! ```

pub mod registry;
pub mod router;

// Re-exports
pub use registry::{AgentRecord, AgentRegistry, EMAIL_AGENT, HIRING_AGENT, RAG_AGENT};
pub use router::{
    AgentConstructor, AgentInventory, ConstructionError, Orchestrator, RouteOutcome, SelectedBy,
};
