//! Configuration orchestrator
//!
//! The only component that bridges live state (the backing store) and
//! durable state (the snapshot store). Every operation runs under a single
//! service-wide lock, so registrations, updates, rollbacks and snapshots are
//! fully serialized.

use snapvault_core::{
    AttributeSchema, BackingStore, ComponentConfiguration, Error, Properties, PropertyValue,
    Result, SERVICE_PID_KEY,
};
use snapvault_secrets::{is_placeholder, mask_secrets};
use snapvault_store::SnapshotStore;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::defaults::{default_properties, merge_with_defaults};
use crate::registry::Registry;

#[derive(Debug, Default)]
struct ServiceState {
    registry: Registry,
    /// Pids whose next change event was caused by this service
    pending: BTreeSet<String>,
}

/// Public face of the configuration subsystem
pub struct ConfigurationService {
    store: SnapshotStore,
    backing: Arc<dyn BackingStore>,
    state: Mutex<ServiceState>,
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn with_service_pid(mut properties: Properties, pid: &str) -> Properties {
    properties.insert(
        SERVICE_PID_KEY.to_string(),
        PropertyValue::String(pid.to_string()),
    );
    properties
}

impl ConfigurationService {
    pub fn new(store: SnapshotStore, backing: Arc<dyn BackingStore>) -> Self {
        Self {
            store,
            backing,
            state: Mutex::new(ServiceState::default()),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    pub fn backing_name(&self) -> &'static str {
        self.backing.name()
    }

    // ------------------------------------------------------------------
    // Startup
    // ------------------------------------------------------------------

    /// Rebuild bookkeeping from the backing store and restore the latest
    /// snapshot into it
    ///
    /// Returns the id of the snapshot that was restored, if any.
    pub async fn activate(&self) -> Result<Option<u64>> {
        let mut state = self.state.lock().await;
        self.rebuild_registry(&mut state).await?;

        let Some((id, configs)) = self.store.load_latest() else {
            info!("No usable snapshot; keeping live configuration as is");
            return Ok(None);
        };

        info!(
            "Restoring {} configurations from snapshot {} into {} backing store",
            configs.len(),
            id,
            self.backing.name()
        );
        for config in configs {
            if is_blank(&config.pid) {
                continue;
            }
            let pid = config.pid.clone();
            if let Err(e) = self.push_configuration(&mut state, config).await {
                warn!("Failed to restore configuration of {}: {}", pid, e);
            }
        }
        Ok(Some(id))
    }

    /// Rebuild bookkeeping from the backing store without restoring anything
    ///
    /// Returns the number of components found.
    pub async fn refresh_registry(&self) -> Result<usize> {
        let mut state = self.state.lock().await;
        self.rebuild_registry(&mut state).await?;
        Ok(state.registry.len())
    }

    async fn rebuild_registry(&self, state: &mut ServiceState) -> Result<()> {
        for service_pid in self.backing.list().await? {
            let Some(entry) = self.backing.get(&service_pid).await? else {
                continue;
            };
            let pid = entry
                .properties
                .get(SERVICE_PID_KEY)
                .and_then(PropertyValue::as_str)
                .unwrap_or(&service_pid)
                .to_string();
            state
                .registry
                .register(&pid, &service_pid, entry.factory_pid.as_deref());
        }
        debug!("Registry rebuilt with {} components", state.registry.len());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register an active component
    ///
    /// The first registration of a pid pushes its schema defaults into the
    /// backing store. A failed push is logged; bookkeeping still succeeds.
    /// Returns whether the pid was newly registered.
    pub async fn register_component_configuration(
        &self,
        pid: &str,
        service_pid: &str,
        factory_pid: Option<&str>,
    ) -> bool {
        if is_blank(pid) || is_blank(service_pid) {
            debug!("Ignoring registration without pid");
            return false;
        }

        let mut state = self.state.lock().await;
        if !state.registry.register(pid, service_pid, factory_pid) {
            debug!("{} is already registered", pid);
            return false;
        }
        info!("Registered configurable component {}", pid);

        if let Err(e) = self
            .update_with_default_configuration(&mut state, pid, service_pid)
            .await
        {
            warn!("Unable to push default configuration of {}: {}", pid, e);
        }
        true
    }

    /// Register a component that manages its own configuration
    pub async fn register_self_configuring_component(&self, pid: &str, service_pid: &str) -> bool {
        if is_blank(pid) || is_blank(service_pid) {
            return false;
        }

        let mut state = self.state.lock().await;
        let registered = state.registry.register_self_configuring(pid, service_pid);
        if registered {
            info!("Registered self-configuring component {}", pid);
        }
        registered
    }

    /// Forget a component. The live instance is left alone.
    pub async fn unregister_component_configuration(&self, pid: &str) -> bool {
        if is_blank(pid) {
            return false;
        }

        let mut state = self.state.lock().await;
        state.pending.remove(pid);
        let removed = state.registry.unregister(pid);
        if removed {
            info!("Unregistered component {}", pid);
        }
        removed
    }

    /// Attach attribute metadata to a pid
    pub async fn register_schema(&self, pid: &str, schema: AttributeSchema) {
        self.state.lock().await.registry.set_schema(pid, schema);
    }

    /// Attach attribute metadata to every instance of a factory
    pub async fn register_factory_schema(&self, factory_pid: &str, schema: AttributeSchema) {
        self.state
            .lock()
            .await
            .registry
            .set_factory_schema(factory_pid, schema);
    }

    async fn update_with_default_configuration(
        &self,
        state: &mut ServiceState,
        pid: &str,
        service_pid: &str,
    ) -> Result<()> {
        let mut properties = self
            .backing
            .get(service_pid)
            .await?
            .map(|entry| entry.properties)
            .unwrap_or_default();

        if let Some(schema) = state.registry.schema_for(pid) {
            merge_with_defaults(schema, &mut properties);
        }

        self.push(service_pid, with_service_pid(properties, pid))
            .await?;
        state.pending.insert(pid.to_string());
        Ok(())
    }

    // ------------------------------------------------------------------
    // Factory instances
    // ------------------------------------------------------------------

    /// Create a new instance of `factory_pid` known as `pid`
    ///
    /// The `service-pid` marker is reserved and always names `pid`; a
    /// caller-supplied value for it is replaced.
    pub async fn create_factory_configuration(
        &self,
        factory_pid: &str,
        pid: &str,
        properties: Option<Properties>,
        take_snapshot: bool,
    ) -> Result<()> {
        if is_blank(factory_pid) || is_blank(pid) {
            return Err(Error::invalid_parameter(
                "factory pid and pid must not be empty",
            ));
        }

        let mut state = self.state.lock().await;
        if state.registry.is_active(pid) || state.registry.has_service_pid(pid) {
            return Err(Error::already_exists(pid));
        }

        let service_pid = self.backing.create(factory_pid).await.map_err(|e| {
            Error::configuration(format!("Cannot create component {}: {}", pid, e))
        })?;

        let initial = with_service_pid(properties.unwrap_or_default(), pid);
        if let Err(e) = self.push(&service_pid, initial).await {
            if let Err(cleanup) = self.backing.delete(&service_pid).await {
                warn!("Unable to remove half-created instance {}: {}", service_pid, cleanup);
            }
            return Err(Error::configuration(format!(
                "Cannot create component {}: {}",
                pid, e
            )));
        }
        state.pending.insert(pid.to_string());
        info!("Created {} from factory {}", pid, factory_pid);

        if state.registry.register(pid, &service_pid, Some(factory_pid)) {
            if let Err(e) = self
                .update_with_default_configuration(&mut state, pid, &service_pid)
                .await
            {
                warn!("Unable to push default configuration of {}: {}", pid, e);
            }
        }

        if take_snapshot {
            self.snapshot_locked(&state).await?;
        }
        Ok(())
    }

    /// Delete a factory instance
    ///
    /// Singletons cannot be deleted this way; for them this is a logged
    /// no-op that never touches the backing store.
    pub async fn delete_factory_configuration(&self, pid: &str, take_snapshot: bool) -> Result<()> {
        if is_blank(pid) {
            return Err(Error::invalid_parameter("pid must not be empty"));
        }

        let mut state = self.state.lock().await;
        let service_pid = state
            .registry
            .service_pid_of(pid)
            .map(str::to_string)
            .ok_or_else(|| Error::invalid_parameter(format!("Unknown component {}", pid)))?;

        let entry = self
            .backing
            .get(&service_pid)
            .await
            .map_err(|e| Error::configuration(format!("Cannot delete {}: {}", pid, e)))?
            .ok_or_else(|| {
                Error::configuration(format!("Cannot delete {}: no live instance", pid))
            })?;

        let Some(factory_pid) = entry.factory_pid else {
            info!("{} is not a factory instance; not deleting it", pid);
            return Ok(());
        };

        self.remove_factory_instance(&mut state, pid, &service_pid)
            .await
            .map_err(|e| Error::configuration(format!("Cannot delete {}: {}", pid, e)))?;
        info!("Deleted {} (factory {})", pid, factory_pid);

        if take_snapshot {
            self.snapshot_locked(&state).await?;
        }
        Ok(())
    }

    async fn remove_factory_instance(
        &self,
        state: &mut ServiceState,
        pid: &str,
        service_pid: &str,
    ) -> Result<()> {
        self.backing.delete(service_pid).await?;
        state.registry.unregister(pid);
        state.pending.remove(pid);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Updates
    // ------------------------------------------------------------------

    /// Update a single component
    pub async fn update_configuration(
        &self,
        pid: &str,
        properties: Properties,
        take_snapshot: bool,
    ) -> Result<()> {
        let config = ComponentConfiguration::new(pid).with_properties(properties);
        self.update_configurations(vec![config], take_snapshot)
            .await
    }

    /// Apply a batch of updates, best effort
    ///
    /// Entries without a pid and untracked pids are skipped. Successful
    /// entries stay applied when others fail; the failures are reported as
    /// a partial success after the optional snapshot is written.
    pub async fn update_configurations(
        &self,
        configs: Vec<ComponentConfiguration>,
        take_snapshot: bool,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let mut failures = Vec::new();

        for config in configs {
            if is_blank(&config.pid) {
                debug!("Skipping update entry without pid");
                continue;
            }
            let Some(service_pid) = state.registry.service_pid_of(&config.pid).map(str::to_string)
            else {
                warn!("Skipping update of untracked component {}", config.pid);
                continue;
            };

            let result = self
                .apply_update(&state.registry, &config.pid, &service_pid, config.properties)
                .await;
            match result {
                Ok(()) => {
                    debug!("Updated configuration of {}", config.pid);
                    state.pending.insert(config.pid);
                }
                Err(e) => {
                    warn!("Failed to update {}: {}", config.pid, e);
                    failures.push((config.pid, e.to_string()));
                }
            }
        }

        if take_snapshot {
            self.snapshot_locked(&state).await?;
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::partial_success("update", failures))
        }
    }

    async fn apply_update(
        &self,
        registry: &Registry,
        pid: &str,
        service_pid: &str,
        incoming: Properties,
    ) -> Result<()> {
        let mut merged = self
            .backing
            .get(service_pid)
            .await?
            .map(|entry| entry.properties)
            .unwrap_or_default();

        for (key, value) in incoming {
            // A placeholder keeps the stored secret
            if is_placeholder(&value) {
                continue;
            }
            merged.insert(key, value);
        }

        if let Some(schema) = registry.schema_for(pid) {
            merge_with_defaults(schema, &mut merged);
        }

        self.push(service_pid, with_service_pid(merged, pid)).await
    }

    // ------------------------------------------------------------------
    // Snapshots and rollback
    // ------------------------------------------------------------------

    /// Save the current configuration as a new snapshot
    pub async fn snapshot(&self) -> Result<u64> {
        let state = self.state.lock().await;
        self.snapshot_locked(&state).await
    }

    async fn snapshot_locked(&self, state: &ServiceState) -> Result<u64> {
        let configs = self.current_configurations(&state.registry).await;
        let id = self.store.save(&configs)?;
        info!("Saved snapshot {} with {} configurations", id, configs.len());
        Ok(id)
    }

    /// Live configuration of every active pid, plus history for the rest
    ///
    /// Components known only from the latest snapshot are carried over,
    /// except factory instances that are no longer registered.
    async fn current_configurations(&self, registry: &Registry) -> Vec<ComponentConfiguration> {
        let mut configs = Vec::new();
        let mut live_pids = BTreeSet::new();

        for pid in registry.active_pids() {
            let Some(service_pid) = registry.service_pid_of(pid) else {
                continue;
            };
            match self.backing.get(service_pid).await {
                Ok(Some(entry)) => {
                    let mut config = ComponentConfiguration::new(pid).with_properties(entry.properties);
                    config.factory_pid = registry
                        .factory_pid_of(pid)
                        .map(str::to_string)
                        .or(entry.factory_pid);
                    live_pids.insert(pid.to_string());
                    configs.push(config);
                }
                Ok(None) => debug!("{} has no live configuration", pid),
                Err(e) => warn!("Unable to read live configuration of {}: {}", pid, e),
            }
        }

        if let Some((_, latest)) = self.store.load_latest() {
            for config in latest {
                if live_pids.contains(&config.pid) {
                    continue;
                }
                if config.is_factory_instance() && !registry.is_active(&config.pid) {
                    continue;
                }
                configs.push(config);
            }
        }

        configs
    }

    /// Roll back to the second most recent snapshot
    ///
    /// Returns the id rolled back to.
    pub async fn rollback(&self) -> Result<u64> {
        let mut state = self.state.lock().await;

        let ids = self.store.snapshot_ids();
        if ids.len() < 2 {
            return Err(Error::snapshot_not_found(
                "at least two snapshots are required to roll back",
            ));
        }
        let target = ids
            .iter()
            .rev()
            .nth(1)
            .copied()
            .ok_or_else(|| Error::snapshot_not_found("no previous snapshot"))?;

        self.rollback_locked(&mut state, target).await?;
        Ok(target)
    }

    /// Roll back to snapshot `id`
    ///
    /// The achieved state is recorded as a new snapshot, whose id is
    /// returned. Pids that could not be restored are reported as a partial
    /// success after that snapshot is written.
    pub async fn rollback_to(&self, id: u64) -> Result<u64> {
        let mut state = self.state.lock().await;
        self.rollback_locked(&mut state, id).await
    }

    async fn rollback_locked(&self, state: &mut ServiceState, id: u64) -> Result<u64> {
        let configs = self.store.load(id)?;
        info!("Rolling back to snapshot {}", id);

        let snapshot_pids: BTreeSet<String> = configs.iter().map(|c| c.pid.clone()).collect();
        let mut failures = Vec::new();

        for config in configs {
            if is_blank(&config.pid) {
                continue;
            }
            let pid = config.pid.clone();
            if let Err(e) = self.push_configuration(state, config).await {
                warn!("Error during rollback of {}: {}", pid, e);
                failures.push((pid, e.to_string()));
            }
        }

        let absent: Vec<String> = state
            .registry
            .active_pids()
            .filter(|pid| !snapshot_pids.contains(*pid))
            .filter(|pid| !state.registry.is_self_configuring(pid))
            .map(str::to_string)
            .collect();

        for pid in absent {
            let Some(service_pid) = state.registry.service_pid_of(&pid).map(str::to_string) else {
                continue;
            };

            let result = if state.registry.factory_pid_of(&pid).is_some() {
                info!("Removing {}, which did not exist in snapshot {}", pid, id);
                self.remove_factory_instance(state, &pid, &service_pid).await
            } else {
                info!("Rolling back {} to its default configuration", pid);
                self.reset_to_defaults(state, &pid, &service_pid).await
            };

            if let Err(e) = result {
                warn!("Error during rollback of {}: {}", pid, e);
                failures.push((pid, e.to_string()));
            }
        }

        let new_id = self.snapshot_locked(state).await?;

        if failures.is_empty() {
            Ok(new_id)
        } else {
            Err(Error::partial_success("rollback", failures))
        }
    }

    async fn reset_to_defaults(
        &self,
        state: &mut ServiceState,
        pid: &str,
        service_pid: &str,
    ) -> Result<()> {
        let defaults = state
            .registry
            .schema_for(pid)
            .map(default_properties)
            .unwrap_or_default();

        self.push(service_pid, with_service_pid(defaults, pid)).await?;
        state.pending.insert(pid.to_string());
        Ok(())
    }

    /// Push a stored configuration into the matching live instance
    ///
    /// Untracked factory instances are created; untracked singletons are
    /// written under their own pid. Either way the pid is registered once
    /// the push succeeds. A freshly created instance is removed again when
    /// its push fails.
    async fn push_configuration(
        &self,
        state: &mut ServiceState,
        config: ComponentConfiguration,
    ) -> Result<()> {
        let pid = config.pid;
        let properties = with_service_pid(config.properties, &pid);

        if let Some(service_pid) = state.registry.service_pid_of(&pid).map(str::to_string) {
            self.push(&service_pid, properties).await?;
            state.pending.insert(pid);
            return Ok(());
        }

        let factory_pid = config.factory_pid.as_deref();
        let service_pid = match factory_pid {
            Some(factory_pid) => self.backing.create(factory_pid).await?,
            None => pid.clone(),
        };

        if let Err(e) = self.push(&service_pid, properties).await {
            if factory_pid.is_some() {
                if let Err(cleanup) = self.backing.delete(&service_pid).await {
                    warn!("Unable to remove half-created instance {}: {}", service_pid, cleanup);
                }
            }
            return Err(e);
        }

        state.registry.register(&pid, &service_pid, factory_pid);
        state.pending.insert(pid);
        Ok(())
    }

    /// Protect secrets, then write properties to the backing store
    async fn push(&self, service_pid: &str, mut properties: Properties) -> Result<()> {
        self.store.codec().protect_properties(&mut properties);
        self.backing.set(service_pid, properties).await
    }

    // ------------------------------------------------------------------
    // Change notifications
    // ------------------------------------------------------------------

    /// Handle a change made to a component outside this service
    ///
    /// Changes this service made itself are consumed silently. A change to a
    /// tracked pid results in a new snapshot, whose id is returned.
    pub async fn configuration_event(&self, pid: &str) -> Result<Option<u64>> {
        let mut state = self.state.lock().await;

        if state.pending.remove(pid) {
            debug!("Ignoring change event for {} caused by this service", pid);
            return Ok(None);
        }
        if !state.registry.is_active(pid) {
            debug!("Ignoring change event for untracked {}", pid);
            return Ok(None);
        }

        info!("Configuration of {} changed; taking snapshot", pid);
        self.snapshot_locked(&state).await.map(Some)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub async fn configurable_component_pids(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.registry.active_pids().map(str::to_string).collect()
    }

    /// Factories for which a schema has been registered
    pub async fn factory_component_pids(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state
            .registry
            .factory_schema_pids()
            .map(str::to_string)
            .collect()
    }

    /// Configuration of every active component, secrets masked
    pub async fn component_configurations(&self) -> Result<Vec<ComponentConfiguration>> {
        let state = self.state.lock().await;
        let mut configs = Vec::with_capacity(state.registry.len());
        for pid in state.registry.active_pids() {
            if let Some(config) = self.component_configuration_locked(&state.registry, pid).await? {
                configs.push(config);
            }
        }
        Ok(configs)
    }

    /// Configuration of one component, secrets masked
    ///
    /// `None` when the pid is not tracked.
    pub async fn component_configuration(&self, pid: &str) -> Result<Option<ComponentConfiguration>> {
        let state = self.state.lock().await;
        self.component_configuration_locked(&state.registry, pid)
            .await
    }

    async fn component_configuration_locked(
        &self,
        registry: &Registry,
        pid: &str,
    ) -> Result<Option<ComponentConfiguration>> {
        let Some(service_pid) = registry.service_pid_of(pid) else {
            return Ok(None);
        };

        let mut properties = self
            .backing
            .get(service_pid)
            .await?
            .map(|entry| entry.properties)
            .unwrap_or_default();
        mask_secrets(&mut properties);

        let mut config = ComponentConfiguration::new(pid).with_properties(properties);
        config.factory_pid = registry.factory_pid_of(pid).map(str::to_string);
        config.definition = registry.schema_for(pid).cloned();
        Ok(Some(config))
    }

    /// Schema defaults of a component, secrets masked
    ///
    /// Empty when no schema is known for the pid.
    pub async fn default_component_configuration(&self, pid: &str) -> ComponentConfiguration {
        let state = self.state.lock().await;
        let mut config = ComponentConfiguration::new(pid);

        if let Some(schema) = state.registry.schema_for(pid) {
            let mut defaults = default_properties(schema);
            mask_secrets(&mut defaults);
            config.properties = defaults;
            config.definition = Some(schema.clone());
        }
        config.factory_pid = state.registry.factory_pid_of(pid).map(str::to_string);
        config
    }

    /// Ids of all snapshots, ascending
    pub fn snapshots(&self) -> BTreeSet<u64> {
        self.store.snapshot_ids()
    }

    /// Contents of a snapshot with secrets revealed
    pub fn snapshot_configurations(&self, id: u64) -> Result<Vec<ComponentConfiguration>> {
        self.store.load(id)
    }
}
