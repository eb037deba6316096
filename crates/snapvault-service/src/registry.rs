//! In-memory bookkeeping of active components
//!
//! Rebuilt from the backing store at startup and never persisted. Tracks
//! which pids are active, the backing-store id behind each pid, the factory
//! each factory instance came from, and which components manage their own
//! configuration. Attribute schemas supplied from outside are kept here too.

use snapvault_core::AttributeSchema;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Default)]
pub struct Registry {
    active_pids: BTreeSet<String>,
    service_pids: BTreeMap<String, String>,
    factory_pids: BTreeMap<String, String>,
    self_configuring: BTreeSet<String>,
    schemas: BTreeMap<String, AttributeSchema>,
    factory_schemas: BTreeMap<String, AttributeSchema>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an active component
    ///
    /// Returns `false` without touching anything when `pid` is already
    /// active.
    pub fn register(&mut self, pid: &str, service_pid: &str, factory_pid: Option<&str>) -> bool {
        if self.active_pids.contains(pid) {
            return false;
        }

        self.active_pids.insert(pid.to_string());
        self.service_pids
            .insert(pid.to_string(), service_pid.to_string());
        if let Some(factory_pid) = factory_pid {
            self.factory_pids
                .insert(pid.to_string(), factory_pid.to_string());
        }
        true
    }

    /// Record a component that manages its own configuration
    pub fn register_self_configuring(&mut self, pid: &str, service_pid: &str) -> bool {
        if !self.register(pid, service_pid, None) {
            return false;
        }
        self.self_configuring.insert(pid.to_string());
        true
    }

    /// Forget a component. Returns whether it was known.
    pub fn unregister(&mut self, pid: &str) -> bool {
        let known = self.active_pids.remove(pid);
        self.service_pids.remove(pid);
        self.factory_pids.remove(pid);
        self.self_configuring.remove(pid);
        known
    }

    pub fn is_active(&self, pid: &str) -> bool {
        self.active_pids.contains(pid)
    }

    pub fn is_self_configuring(&self, pid: &str) -> bool {
        self.self_configuring.contains(pid)
    }

    /// Backing-store id of a pid
    pub fn service_pid_of(&self, pid: &str) -> Option<&str> {
        self.service_pids.get(pid).map(String::as_str)
    }

    /// Factory a pid was created from
    pub fn factory_pid_of(&self, pid: &str) -> Option<&str> {
        self.factory_pids.get(pid).map(String::as_str)
    }

    /// Whether any active pid is backed by `service_pid`
    pub fn has_service_pid(&self, service_pid: &str) -> bool {
        self.service_pids.values().any(|id| id == service_pid)
    }

    /// Active pids in ascending order
    pub fn active_pids(&self) -> impl Iterator<Item = &str> {
        self.active_pids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.active_pids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active_pids.is_empty()
    }

    pub fn set_schema(&mut self, pid: &str, schema: AttributeSchema) {
        self.schemas.insert(pid.to_string(), schema);
    }

    pub fn set_factory_schema(&mut self, factory_pid: &str, schema: AttributeSchema) {
        self.factory_schemas.insert(factory_pid.to_string(), schema);
    }

    /// Schema of a pid, falling back to the schema of its factory
    pub fn schema_for(&self, pid: &str) -> Option<&AttributeSchema> {
        self.schemas.get(pid).or_else(|| {
            self.factory_pid_of(pid)
                .and_then(|factory_pid| self.factory_schemas.get(factory_pid))
        })
    }

    /// Factories that have a registered schema
    pub fn factory_schema_pids(&self) -> impl Iterator<Item = &str> {
        self.factory_schemas.keys().map(String::as_str)
    }
}
