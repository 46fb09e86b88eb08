//! Hook dispatcher: runs a hook across the core, the enabled extensions, and
//! the application, in that order.
//!
//! - The core tier must always succeed. A missing receiver or a failing
//!   receiver aborts the dispatch.
//! - Extension and application failures are contained: they are logged,
//!   surfaced as a notice in debug mode, and the state is left unchanged.
//! - The application record is re-discovered right before its tier so that
//!   changes made by earlier tiers are honoured.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, error, warn};

use modhub_core::error::AppError;
use modhub_core::result::AppResult;
use modhub_core::types::module::Module;

use super::definitions::{Hook, HookName};
use super::receiver::ReceiverRegistry;
use crate::context::RuntimeContext;
use crate::registry::ModuleRegistry;

/// One module taking part in a dispatch.
#[derive(Debug, Clone, Copy)]
pub enum Participant<'a> {
    /// The core module. Has no registry record.
    Core,
    /// An enabled extension.
    Extension(&'a Module),
    /// The application module.
    Application(&'a Module),
}

impl<'a> Participant<'a> {
    /// The module record, if any.
    pub fn module(&self) -> Option<&'a Module> {
        match *self {
            Self::Core => None,
            Self::Extension(module) | Self::Application(module) => Some(module),
        }
    }

    /// Namespace used to find the receiver.
    pub fn namespace<'c>(&self, context: &'c RuntimeContext) -> &'c str
    where
        'a: 'c,
    {
        match *self {
            Self::Core => &context.core_namespace,
            Self::Extension(module) => &module.slug,
            Self::Application(_) => &context.app_namespace,
        }
    }

    /// Directory of the module.
    pub fn path(&self, context: &RuntimeContext) -> PathBuf {
        match self {
            Self::Core => context.core_dir.clone(),
            Self::Extension(module) => context.extension_dir(&module.slug),
            Self::Application(_) => context.app_dir.clone(),
        }
    }

    fn tier(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Extension(_) => "extension",
            Self::Application(_) => "application",
        }
    }
}

/// Dispatches hooks to module receivers.
#[derive(Debug, Clone)]
pub struct HookDispatcher {
    registry: Arc<ModuleRegistry>,
    receivers: Arc<ReceiverRegistry>,
    context: Arc<RuntimeContext>,
}

impl HookDispatcher {
    /// Creates a new hook dispatcher.
    pub fn new(
        registry: Arc<ModuleRegistry>,
        receivers: Arc<ReceiverRegistry>,
        context: Arc<RuntimeContext>,
    ) -> Self {
        Self {
            registry,
            receivers,
            context,
        }
    }

    /// Returns the runtime context.
    pub fn context(&self) -> &Arc<RuntimeContext> {
        &self.context
    }

    /// Returns the module registry.
    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// Runs `hook` across all three tiers and returns its post-processed state.
    pub async fn dispatch<H: Hook>(&self, hook: &H) -> AppResult<H::Output> {
        let name = hook.name();
        debug!(hook = %name, "Dispatching hook");

        let state = hook.initial_state();
        let mut state = self
            .run_module(hook, Participant::Core, state, false)
            .await
            .map_err(|e| {
                error!(hook = %name, error = %e, "Core hook receiver failed");
                e
            })?;

        let extensions = self
            .registry
            .list_enabled(&self.context.app_namespace)
            .await?;
        for module in &extensions {
            state = self
                .run_contained(hook, Participant::Extension(module), state)
                .await;
        }

        match self
            .registry
            .discover(&self.context.app_dir, &self.context.app_namespace)
            .await
        {
            Ok(Some(app)) if app.enabled => {
                state = self
                    .run_contained(hook, Participant::Application(&app), state)
                    .await;
            }
            Ok(_) => debug!(hook = %name, "Application not enabled, skipping tier"),
            Err(e) => self.contain(&name, &self.context.app_namespace, e).await,
        }

        Ok(hook.post_process(state))
    }

    /// Runs `hook` on a single participant, folding into `state`, without
    /// post-processing.
    ///
    /// `force` runs the participant even when `pre_process` declines it.
    /// Failures propagate to the caller regardless of tier.
    pub async fn run_module<H: Hook>(
        &self,
        hook: &H,
        participant: Participant<'_>,
        state: H::State,
        force: bool,
    ) -> AppResult<H::State> {
        match self.invoke(hook, &participant, force).await? {
            Some(result) => Ok(hook.process(
                result,
                &participant.path(&self.context),
                participant.namespace(&self.context),
                participant.module(),
                state,
            )),
            None => Ok(state),
        }
    }

    /// Runs `hook` on a single participant from its initial state and
    /// post-processes the result.
    pub async fn dispatch_module<H: Hook>(
        &self,
        hook: &H,
        participant: Participant<'_>,
        force: bool,
    ) -> AppResult<H::Output> {
        let state = self
            .run_module(hook, participant, hook.initial_state(), force)
            .await?;
        Ok(hook.post_process(state))
    }

    async fn run_contained<H: Hook>(
        &self,
        hook: &H,
        participant: Participant<'_>,
        state: H::State,
    ) -> H::State {
        match self.invoke(hook, &participant, false).await {
            Ok(Some(result)) => hook.process(
                result,
                &participant.path(&self.context),
                participant.namespace(&self.context),
                participant.module(),
                state,
            ),
            Ok(None) => state,
            Err(e) => {
                self.contain(&hook.name(), participant.namespace(&self.context), e)
                    .await;
                state
            }
        }
    }

    /// Calls the participant's receiver. `Ok(None)` when it declined to participate.
    async fn invoke<H: Hook>(
        &self,
        hook: &H,
        participant: &Participant<'_>,
        force: bool,
    ) -> AppResult<Option<Value>> {
        let name = hook.name();
        let namespace = participant.namespace(&self.context);

        if !hook.pre_process(participant.module()) && !force {
            debug!(hook = %name, namespace = %namespace, "Participant skipped");
            return Ok(None);
        }

        let receiver = self.receivers.get(namespace).await.ok_or_else(|| {
            AppError::configuration(format!("Missing hook receiver in \"{namespace}\""))
        })?;

        let params = hook.params();
        let result = AssertUnwindSafe(receiver.receive(&name, &params))
            .catch_unwind()
            .await
            .map_err(|_| {
                AppError::internal(format!(
                    "Hook receiver in \"{namespace}\" panicked while running \"{name}\""
                ))
            })??;

        debug!(
            hook = %name,
            namespace = %namespace,
            tier = participant.tier(),
            "Hook receiver ran"
        );
        Ok(Some(result))
    }

    async fn contain(&self, hook: &HookName, namespace: &str, cause: AppError) {
        let failure = AppError::contained(format!(
            "Could not run hook \"{hook}\" for \"{namespace}\" module"
        ));
        warn!(
            hook = %hook,
            namespace = %namespace,
            kind = %failure.kind,
            error = %cause,
            "{}",
            failure.message
        );
        if self.context.debug {
            self.context.notices.error(failure.message).await;
        }
    }
}
