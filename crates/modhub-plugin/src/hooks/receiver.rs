//! Hook receivers and the namespace → receiver registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::info;

use modhub_core::result::AppResult;

use super::definitions::HookName;

/// The hook entry point a module exposes.
///
/// One method per built-in hook, each returning [`Value::Null`] unless the
/// module overrides it. Named custom hooks arrive through [`HookReceiver::hook`].
#[async_trait]
pub trait HookReceiver: Send + Sync + std::fmt::Debug {
    /// Route table contribution: an object of `pattern → controller id`.
    async fn route(&self, _params: &Value) -> AppResult<Value> {
        Ok(Value::Null)
    }

    /// Maintenance route table contribution.
    async fn maintenance_route(&self, _params: &Value) -> AppResult<Value> {
        Ok(Value::Null)
    }

    /// Maintenance catch-all controller id.
    async fn maintenance_controller(&self, _params: &Value) -> AppResult<Value> {
        Ok(Value::Null)
    }

    /// Called before the router boots.
    async fn pre_boot(&self, _params: &Value) -> AppResult<Value> {
        Ok(Value::Null)
    }

    /// Called after the route table is known.
    async fn post_boot(&self, _params: &Value) -> AppResult<Value> {
        Ok(Value::Null)
    }

    /// Library paths relative to the module directory.
    async fn libraries(&self, _params: &Value) -> AppResult<Value> {
        Ok(Value::Null)
    }

    /// Install or upgrade routine. Return `false` to report failure.
    async fn install(&self, _params: &Value) -> AppResult<Value> {
        Ok(Value::Null)
    }

    /// Uninstall routine. Return `false` to report failure.
    async fn uninstall(&self, _params: &Value) -> AppResult<Value> {
        Ok(Value::Null)
    }

    /// Permission names the module declares.
    async fn permission(&self, _params: &Value) -> AppResult<Value> {
        Ok(Value::Null)
    }

    /// Administrative control links: an object of `label → url`.
    async fn controls(&self, _params: &Value) -> AppResult<Value> {
        Ok(Value::Null)
    }

    /// Periodic task.
    async fn cron(&self, _params: &Value) -> AppResult<Value> {
        Ok(Value::Null)
    }

    /// Any hook that is not built in.
    async fn hook(&self, _name: &str, _params: &Value) -> AppResult<Value> {
        Ok(Value::Null)
    }

    /// Routes a hook invocation to the matching method.
    async fn receive(&self, hook: &HookName, params: &Value) -> AppResult<Value> {
        match hook {
            HookName::Route => self.route(params).await,
            HookName::MaintenanceRoute => self.maintenance_route(params).await,
            HookName::MaintenanceController => self.maintenance_controller(params).await,
            HookName::PreBoot => self.pre_boot(params).await,
            HookName::PostBoot => self.post_boot(params).await,
            HookName::Libraries => self.libraries(params).await,
            HookName::Install => self.install(params).await,
            HookName::Uninstall => self.uninstall(params).await,
            HookName::Permission => self.permission(params).await,
            HookName::Controls => self.controls(params).await,
            HookName::Cron => self.cron(params).await,
            HookName::Custom(name) => self.hook(name, params).await,
        }
    }
}

/// Registry of hook receivers keyed by module namespace.
///
/// A module without a registered receiver is misconfigured for every hook.
#[derive(Debug, Default)]
pub struct ReceiverRegistry {
    receivers: RwLock<HashMap<String, Arc<dyn HookReceiver>>>,
}

impl ReceiverRegistry {
    /// Creates a new empty receiver registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the receiver for `namespace`.
    pub async fn register(&self, namespace: impl Into<String>, receiver: Arc<dyn HookReceiver>) {
        let namespace = namespace.into();
        info!(namespace = %namespace, "Hook receiver registered");
        self.receivers.write().await.insert(namespace, receiver);
    }

    /// Removes the receiver for `namespace`.
    pub async fn unregister(&self, namespace: &str) -> bool {
        let removed = self.receivers.write().await.remove(namespace).is_some();
        if removed {
            info!(namespace = %namespace, "Hook receiver unregistered");
        }
        removed
    }

    /// Returns the receiver for `namespace`.
    pub async fn get(&self, namespace: &str) -> Option<Arc<dyn HookReceiver>> {
        self.receivers.read().await.get(namespace).cloned()
    }

    /// Returns whether `namespace` has a receiver.
    pub async fn contains(&self, namespace: &str) -> bool {
        self.receivers.read().await.contains_key(namespace)
    }

    /// Returns every registered namespace.
    pub async fn namespaces(&self) -> Vec<String> {
        self.receivers.read().await.keys().cloned().collect()
    }
}
