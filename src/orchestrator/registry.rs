//! Agent registry and role mapping
//!
//! Plain data structure with no locking; the [`Orchestrator`] wraps it in a
//! `RwLock` so lookups always observe a fully written record.
//!
//! [`Orchestrator`]: crate::orchestrator::Orchestrator

use crate::agents::Agent;
use crate::types::UserRole;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry name of the document Q&A agent
pub const RAG_AGENT: &str = "rag_agent";

/// Registry name of the candidate-screening agent
pub const HIRING_AGENT: &str = "hiring_agent";

/// Registry name of the email agent
pub const EMAIL_AGENT: &str = "email_agent";

/// One registered agent
#[derive(Clone)]
pub struct AgentRecord {
    /// Unique registry key
    pub name: String,
    /// The agent instance; the registry holds the long-lived reference
    pub instance: Arc<dyn Agent>,
    /// Role this agent handles by default, if any
    pub role: Option<String>,
}

/// In-memory mapping from agent names to instances, plus the role mapping
///
/// Registration is unconditional: the same name overwrites the previous
/// record (last-write-wins), and a role registers over any prior holder of
/// that role. The role mapping is seeded for the two known roles before any
/// agent registers, so role lookups are defined even when startup
/// construction failed.
pub struct AgentRegistry {
    agents: HashMap<String, AgentRecord>,
    role_mapping: HashMap<String, String>,
}

impl AgentRegistry {
    /// Create an empty registry with the default role seeds
    pub fn new() -> Self {
        let mut role_mapping = HashMap::new();
        role_mapping.insert(UserRole::Employee.as_str().to_string(), RAG_AGENT.to_string());
        role_mapping.insert(UserRole::Hr.as_str().to_string(), HIRING_AGENT.to_string());
        Self {
            agents: HashMap::new(),
            role_mapping,
        }
    }

    /// Insert or overwrite the record for `name`
    ///
    /// When `role` is given, the role mapping entry for that role is
    /// overwritten to point at `name`.
    pub fn register(&mut self, name: &str, instance: Arc<dyn Agent>, role: Option<&str>) {
        self.agents.insert(
            name.to_string(),
            AgentRecord {
                name: name.to_string(),
                instance,
                role: role.map(str::to_string),
            },
        );
        if let Some(role) = role {
            self.role_mapping
                .insert(role.to_string(), name.to_string());
        }
    }

    /// Instance registered under `name`, if any
    pub fn get(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(name).map(|record| record.instance.clone())
    }

    /// Agent name the role currently maps to, if any
    pub fn role_target(&self, role: &str) -> Option<&str> {
        self.role_mapping.get(role).map(String::as_str)
    }

    /// Registered agent names, sorted for stable output
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }

    /// The full role mapping
    pub fn role_mapping(&self) -> &HashMap<String, String> {
        &self.role_mapping
    }

    /// Number of registered agents
    pub fn len(&self) -> usize {
        self.agents.len()
    }

    /// Whether no agent is registered
    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::StubAgent;

    #[test]
    fn test_default_role_seeds() {
        let registry = AgentRegistry::new();
        assert_eq!(registry.role_target("employee"), Some(RAG_AGENT));
        assert_eq!(registry.role_target("hr"), Some(HIRING_AGENT));
        assert_eq!(registry.role_target("intern"), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = AgentRegistry::new();
        let agent = StubAgent::shared("stub");
        registry.register("stub", agent.clone(), None);

        let found = registry.get("stub").unwrap();
        assert!(Arc::ptr_eq(&found, &agent));
        assert_eq!(registry.len(), 1);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_register_overwrites_record_and_role() {
        let mut registry = AgentRegistry::new();
        let first = StubAgent::shared("v1");
        let second = StubAgent::shared("v2");

        registry.register("helper", first.clone(), Some("employee"));
        registry.register("helper", second.clone(), Some("employee"));

        assert_eq!(registry.len(), 1);
        let found = registry.get("helper").unwrap();
        assert!(Arc::ptr_eq(&found, &second));
        assert!(!Arc::ptr_eq(&found, &first));
        assert_eq!(registry.role_target("employee"), Some("helper"));
    }

    #[test]
    fn test_role_mapping_last_write_wins() {
        let mut registry = AgentRegistry::new();
        registry.register("first", StubAgent::shared("first"), Some("hr"));
        registry.register("second", StubAgent::shared("second"), Some("hr"));

        assert_eq!(registry.role_target("hr"), Some("second"));
        // Both agents remain registered; only the role moved.
        assert_eq!(registry.len(), 2);
        assert!(registry.get("first").is_some());
    }
}
