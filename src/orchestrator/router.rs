//! Routing entry points and startup construction
//!
//! The [`Orchestrator`] is built once at service startup and shared with
//! every route handler. Construction of each known agent kind is attempted
//! independently: a failure leaves that agent unregistered and the service
//! running. Role lookups that miss retry construction lazily for the agent
//! kinds that declared a default role.

use crate::agents::Agent;
use crate::orchestrator::registry::AgentRegistry;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Failure to build one agent kind
///
/// A tagged outcome rather than a caught panic: constructors return this for
/// missing dependencies, bad configuration, or unreachable data, and the
/// orchestrator logs it and moves on.
#[derive(Debug, Clone, thiserror::Error)]
#[error("could not construct agent {agent}: {message}")]
pub struct ConstructionError {
    /// Name of the agent kind that failed
    pub agent: String,
    /// Cause description
    pub message: String,
}

impl ConstructionError {
    /// Create a construction error for the named agent kind
    pub fn new(agent: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self {
            agent: agent.into(),
            message: cause.to_string(),
        }
    }
}

type BuildResult = std::result::Result<Arc<dyn Agent>, ConstructionError>;
type BuildFuture = BoxFuture<'static, BuildResult>;

/// A known agent kind: its registry name, optional default role, and builder
///
/// The builder is retained after startup so role lookups can retry it
/// lazily. It must therefore be callable repeatedly.
pub struct AgentConstructor {
    name: &'static str,
    role: Option<&'static str>,
    build: Box<dyn Fn() -> BuildFuture + Send + Sync>,
}

impl AgentConstructor {
    /// Create a constructor for an agent kind
    pub fn new<F, Fut>(name: &'static str, role: Option<&'static str>, build: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BuildResult> + Send + 'static,
    {
        Self {
            name,
            role,
            build: Box::new(move || Box::pin(build())),
        }
    }

    /// Registry name of the agent kind
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Default role of the agent kind, if any
    pub fn role(&self) -> Option<&'static str> {
        self.role
    }
}

/// How an agent was selected for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectedBy {
    /// Caller named the agent directly
    Explicit,
    /// Agent chosen from the caller's role
    Role,
}

/// Result of a routing request
///
/// Exactly one of `agent` and `error` is populated. Absence of an agent is
/// an ordinary outcome, not a fault: the caller decides how to surface it.
pub struct RouteOutcome {
    /// The selected agent, when routing succeeded
    pub agent: Option<Arc<dyn Agent>>,
    /// Registry name of the selected agent
    pub agent_name: Option<String>,
    /// How the agent was selected
    pub selected_by: Option<SelectedBy>,
    /// Description of why routing failed
    pub error: Option<String>,
}

impl RouteOutcome {
    fn selected(agent: Arc<dyn Agent>, name: impl Into<String>, selected_by: SelectedBy) -> Self {
        Self {
            agent: Some(agent),
            agent_name: Some(name.into()),
            selected_by: Some(selected_by),
            error: None,
        }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self {
            agent: None,
            agent_name: None,
            selected_by: None,
            error: Some(error.into()),
        }
    }

    /// Whether an agent was selected
    pub fn is_resolved(&self) -> bool {
        self.agent.is_some()
    }

    /// Downcast the selected agent to its concrete type
    pub fn downcast<T: 'static>(&self) -> Option<&T> {
        self.agent
            .as_ref()
            .and_then(|agent| agent.as_ref().as_any().downcast_ref())
    }
}

/// Registered agent names, role mapping, and count
#[derive(Debug, Clone, Serialize)]
pub struct AgentInventory {
    /// Registered agent names
    pub agents: Vec<String>,
    /// Current role-to-agent-name mapping
    pub role_mapping: HashMap<String, String>,
    /// Number of registered agents
    pub total_agents: usize,
}

/// Central router owning the agent registry and role mapping
pub struct Orchestrator {
    registry: RwLock<AgentRegistry>,
    constructors: Vec<AgentConstructor>,
    // Serializes lazy fallback construction so a role is built at most once.
    fallback_guard: Mutex<()>,
}

impl Orchestrator {
    /// Create an orchestrator with no known agent kinds
    ///
    /// Agents can still be registered manually; role lookups have no
    /// fallback path.
    pub fn new() -> Self {
        Self::with_constructors(Vec::new())
    }

    /// Create an orchestrator that knows the given agent kinds without
    /// constructing any of them
    pub fn with_constructors(constructors: Vec<AgentConstructor>) -> Self {
        Self {
            registry: RwLock::new(AgentRegistry::new()),
            constructors,
            fallback_guard: Mutex::new(()),
        }
    }

    /// Build an orchestrator and attempt construction of every known agent
    ///
    /// Each constructor runs independently; a failure is logged and leaves
    /// that agent kind unregistered. Never fails as a whole.
    pub async fn bootstrap(constructors: Vec<AgentConstructor>) -> Self {
        let orchestrator = Self::with_constructors(constructors);
        for constructor in &orchestrator.constructors {
            match (constructor.build)().await {
                Ok(instance) => {
                    orchestrator.register(constructor.name, instance, constructor.role);
                    info!(
                        agent = constructor.name,
                        role = constructor.role.unwrap_or("none"),
                        "registered agent"
                    );
                }
                Err(err) => {
                    warn!(agent = constructor.name, "could not initialize agent: {err}");
                }
            }
        }
        orchestrator
    }

    /// Register an agent under `name`, optionally claiming a role
    ///
    /// Unconditional: overwrites any previous record for `name` and any
    /// previous holder of `role`.
    pub fn register(&self, name: &str, instance: Arc<dyn Agent>, role: Option<&str>) {
        self.registry.write().register(name, instance, role);
        debug!(agent = name, role = role.unwrap_or("none"), "agent registered");
    }

    /// Look up an agent by explicit name
    ///
    /// No fallback construction is attempted; only role lookups trigger
    /// lazy initialization.
    pub fn resolve_by_name(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.registry.read().get(name)
    }

    /// Look up the agent for a role, constructing it lazily on a miss
    ///
    /// Returns the selected agent name alongside the instance. Repeated
    /// calls after a successful lazy construction return the registered
    /// instance directly.
    pub async fn resolve_by_role(&self, role: &str) -> Option<(String, Arc<dyn Agent>)> {
        if let Some(hit) = self.lookup_role(role) {
            return Some(hit);
        }
        self.construct_fallback(role).await
    }

    fn lookup_role(&self, role: &str) -> Option<(String, Arc<dyn Agent>)> {
        let registry = self.registry.read();
        let name = registry.role_target(role)?;
        let instance = registry.get(name)?;
        Some((name.to_string(), instance))
    }

    async fn construct_fallback(&self, role: &str) -> Option<(String, Arc<dyn Agent>)> {
        // Only agent kinds that declared a default role participate in lazy
        // fallback; explicit-name-only agents never construct on demand.
        let constructor = self
            .constructors
            .iter()
            .find(|c| c.role.is_some_and(|r| r == role))?;

        let _guard = self.fallback_guard.lock().await;
        // Another request may have built this role while we waited.
        if let Some(hit) = self.lookup_role(role) {
            return Some(hit);
        }

        match (constructor.build)().await {
            Ok(instance) => {
                self.register(constructor.name, instance, constructor.role);
                info!(agent = constructor.name, role, "agent constructed lazily");
                self.lookup_role(role)
            }
            Err(err) => {
                warn!(agent = constructor.name, role, "lazy construction failed: {err}");
                None
            }
        }
    }

    /// Route a request to an agent by explicit name or by role
    ///
    /// An explicit `agent_name` takes precedence over the role. `query` is
    /// reserved for content-based routing and does not influence the
    /// decision.
    pub async fn route(
        &self,
        user_role: &str,
        query: Option<&str>,
        agent_name: Option<&str>,
    ) -> RouteOutcome {
        let _ = query;

        if let Some(name) = agent_name {
            return match self.resolve_by_name(name) {
                Some(agent) => RouteOutcome::selected(agent, name, SelectedBy::Explicit),
                None => RouteOutcome::failed(format!("Agent \"{name}\" not found")),
            };
        }

        match self.resolve_by_role(user_role).await {
            Some((name, agent)) => RouteOutcome::selected(agent, name, SelectedBy::Role),
            None => RouteOutcome::failed(format!("No agent found for role \"{user_role}\"")),
        }
    }

    /// Snapshot of the registered agents and role mapping
    pub fn list_agents(&self) -> AgentInventory {
        let registry = self.registry.read();
        AgentInventory {
            agents: registry.names(),
            role_mapping: registry.role_mapping().clone(),
            total_agents: registry.len(),
        }
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::StubAgent;
    use crate::orchestrator::registry::{EMAIL_AGENT, HIRING_AGENT, RAG_AGENT};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn stub_constructor(
        name: &'static str,
        role: Option<&'static str>,
    ) -> AgentConstructor {
        AgentConstructor::new(name, role, move || async move {
            Ok::<Arc<dyn Agent>, ConstructionError>(StubAgent::shared(name))
        })
    }

    fn failing_constructor(
        name: &'static str,
        role: Option<&'static str>,
    ) -> AgentConstructor {
        AgentConstructor::new(name, role, move || async move {
            Err::<Arc<dyn Agent>, _>(ConstructionError::new(name, "missing dependency"))
        })
    }

    #[test]
    fn test_register_then_resolve_by_name() {
        let orchestrator = Orchestrator::new();
        let agent = StubAgent::shared("stub");
        orchestrator.register("stub", agent.clone(), None);

        let found = orchestrator.resolve_by_name("stub").unwrap();
        assert!(Arc::ptr_eq(&found, &agent));
    }

    #[tokio::test]
    async fn test_register_with_role_then_resolve_by_role() {
        let orchestrator = Orchestrator::new();
        let agent = StubAgent::shared("helper");
        orchestrator.register("helper", agent.clone(), Some("employee"));

        let (name, found) = orchestrator.resolve_by_role("employee").await.unwrap();
        assert_eq!(name, "helper");
        assert!(Arc::ptr_eq(&found, &agent));
    }

    #[test]
    fn test_reregistration_last_write_wins() {
        let orchestrator = Orchestrator::new();
        let first = StubAgent::shared("v1");
        let second = StubAgent::shared("v2");

        orchestrator.register("helper", first.clone(), None);
        orchestrator.register("helper", second.clone(), None);

        let found = orchestrator.resolve_by_name("helper").unwrap();
        assert!(Arc::ptr_eq(&found, &second));
        assert!(!Arc::ptr_eq(&found, &first));
    }

    #[tokio::test]
    async fn test_route_unknown_role_reports_role_name() {
        let orchestrator = Orchestrator::new();
        let outcome = orchestrator.route("contractor", None, None).await;

        assert!(!outcome.is_resolved());
        assert!(outcome.agent.is_none());
        let error = outcome.error.unwrap();
        assert!(error.contains("contractor"));
    }

    #[tokio::test]
    async fn test_explicit_name_takes_precedence_over_role() {
        let orchestrator = Orchestrator::new();
        let role_agent = StubAgent::shared(RAG_AGENT);
        let named_agent = StubAgent::shared(EMAIL_AGENT);
        orchestrator.register(RAG_AGENT, role_agent, Some("employee"));
        orchestrator.register(EMAIL_AGENT, named_agent.clone(), None);

        let outcome = orchestrator
            .route("employee", None, Some(EMAIL_AGENT))
            .await;

        assert_eq!(outcome.selected_by, Some(SelectedBy::Explicit));
        assert_eq!(outcome.agent_name.as_deref(), Some(EMAIL_AGENT));
        assert!(Arc::ptr_eq(&outcome.agent.unwrap(), &named_agent));
    }

    #[tokio::test]
    async fn test_route_by_role_tags_selection() {
        let orchestrator = Orchestrator::new();
        orchestrator.register(RAG_AGENT, StubAgent::shared(RAG_AGENT), Some("employee"));

        let outcome = orchestrator.route("employee", Some("any question"), None).await;

        assert_eq!(outcome.selected_by, Some(SelectedBy::Role));
        assert_eq!(outcome.agent_name.as_deref(), Some(RAG_AGENT));
        assert!(outcome.error.is_none());
    }

    #[test]
    fn test_list_agents_counts_and_mapping() {
        let orchestrator = Orchestrator::new();
        orchestrator.register("a", StubAgent::shared("a"), Some("employee"));
        orchestrator.register("b", StubAgent::shared("b"), Some("hr"));
        orchestrator.register("c", StubAgent::shared("c"), None);

        let inventory = orchestrator.list_agents();
        assert_eq!(inventory.total_agents, 3);
        assert_eq!(inventory.agents, vec!["a", "b", "c"]);
        // Exactly the two roles, each pointing at its latest registrant.
        assert_eq!(inventory.role_mapping.len(), 2);
        assert_eq!(inventory.role_mapping.get("employee").unwrap(), "a");
        assert_eq!(inventory.role_mapping.get("hr").unwrap(), "b");
    }

    #[tokio::test]
    async fn test_bootstrap_tolerates_failing_constructor() {
        let orchestrator = Orchestrator::bootstrap(vec![
            stub_constructor(RAG_AGENT, Some("employee")),
            stub_constructor(HIRING_AGENT, Some("hr")),
            failing_constructor(EMAIL_AGENT, None),
        ])
        .await;

        let inventory = orchestrator.list_agents();
        assert_eq!(inventory.total_agents, 2);
        assert_eq!(inventory.agents, vec![HIRING_AGENT, RAG_AGENT]);

        let outcome = orchestrator.route("hr", None, Some(EMAIL_AGENT)).await;
        assert!(outcome.agent.is_none());
        assert_eq!(
            outcome.error.as_deref(),
            Some("Agent \"email_agent\" not found")
        );
    }

    #[tokio::test]
    async fn test_lazy_fallback_constructs_exactly_once() {
        // Fails at startup, then succeeds: the first role lookup constructs
        // the agent, the second returns it without another attempt.
        let attempts = Arc::new(AtomicUsize::new(0));
        let healthy = Arc::new(AtomicBool::new(false));

        let constructor = {
            let attempts = attempts.clone();
            let healthy = healthy.clone();
            AgentConstructor::new(RAG_AGENT, Some("employee"), move || {
                let attempts = attempts.clone();
                let healthy = healthy.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    if healthy.load(Ordering::SeqCst) {
                        Ok(StubAgent::shared(RAG_AGENT))
                    } else {
                        Err(ConstructionError::new(RAG_AGENT, "index unavailable"))
                    }
                }
            })
        };

        let orchestrator = Orchestrator::bootstrap(vec![constructor]).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(orchestrator.list_agents().total_agents, 0);

        // Still failing: the lookup retries and reports absence.
        assert!(orchestrator.resolve_by_role("employee").await.is_none());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);

        healthy.store(true, Ordering::SeqCst);
        let (_, first) = orchestrator.resolve_by_role("employee").await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        let (_, second) = orchestrator.resolve_by_role("employee").await.unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_resolve_by_name_never_constructs() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let constructor = {
            let attempts = attempts.clone();
            AgentConstructor::new(RAG_AGENT, Some("employee"), move || {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<Arc<dyn Agent>, _>(ConstructionError::new(RAG_AGENT, "down"))
                }
            })
        };

        let orchestrator = Orchestrator::bootstrap(vec![constructor]).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);

        assert!(orchestrator.resolve_by_name(RAG_AGENT).is_none());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_only_for_roles_with_constructors() {
        let orchestrator =
            Orchestrator::with_constructors(vec![failing_constructor(EMAIL_AGENT, None)]);

        // "hr" is seeded in the role mapping but has no constructor and no
        // registered agent.
        assert!(orchestrator.resolve_by_role("hr").await.is_none());
        let outcome = orchestrator.route("hr", None, None).await;
        assert!(outcome.error.unwrap().contains("hr"));
    }
}
