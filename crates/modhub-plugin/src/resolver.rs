//! Dependency resolver: enables modules together with their dependencies.
//!
//! Enabling is all-or-nothing per module. Dependencies are enabled first,
//! depth-first in declared order; when one of them cannot be enabled the
//! requesting module is disabled again. Dependencies that were enabled on
//! the way are left enabled.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use tracing::{debug, info, warn};

use modhub_core::error::AppError;
use modhub_core::result::AppResult;

use crate::registry::ModuleRegistry;

/// Result of enabling one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EnableOutcome {
    /// The module (and every dependency) is enabled.
    Enabled,
    /// No record exists for the module.
    NotFound {
        /// Requested slug.
        slug: String,
    },
    /// The module does not support the running core.
    Unsupported {
        /// Module slug.
        slug: String,
    },
    /// A declared dependency has no record. The module was left unchanged.
    MissingDependency {
        /// Module slug.
        slug: String,
        /// First missing dependency.
        dependency: String,
    },
    /// A dependency exists but could not be enabled. The module was disabled.
    Unsatisfiable {
        /// Module slug.
        slug: String,
        /// Dependency that failed.
        dependency: String,
    },
    /// The module depends on itself through its dependency chain.
    Cycle {
        /// Slug met twice on one dependency path.
        slug: String,
    },
}

impl EnableOutcome {
    /// Whether the module ended up enabled.
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled)
    }

    /// Whether enabling failed because of the module's dependencies.
    pub fn is_dependency_failure(&self) -> bool {
        matches!(
            self,
            Self::MissingDependency { .. } | Self::Unsatisfiable { .. } | Self::Cycle { .. }
        )
    }

    /// The failure as an error, or `None` when the module was enabled.
    ///
    /// Dependency failures carry [`ErrorKind::Dependency`](modhub_core::error::ErrorKind::Dependency).
    pub fn error(&self) -> Option<AppError> {
        match self {
            Self::Enabled => None,
            Self::NotFound { slug } => Some(AppError::not_found(format!(
                "Module, {slug}, not found."
            ))),
            Self::Unsupported { slug } => Some(AppError::validation(format!(
                "Module, {slug}, does not support the running core."
            ))),
            Self::MissingDependency { slug, dependency } => Some(AppError::dependency(format!(
                "Module, {slug}, depends on missing module {dependency}."
            ))),
            Self::Unsatisfiable { slug, dependency } => Some(AppError::dependency(format!(
                "Module, {slug}, depends on {dependency}, which could not be enabled."
            ))),
            Self::Cycle { slug } => Some(AppError::dependency(format!(
                "Module, {slug}, depends on itself."
            ))),
        }
    }
}

/// Outcome of a batch module selection.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Some requested module failed because of its dependencies.
    pub missing_dependencies: bool,
    /// Some requested module does not support the running core and was skipped.
    pub unsupported: bool,
    /// Per-slug outcome, in request order.
    pub outcomes: Vec<(String, EnableOutcome)>,
}

impl BatchReport {
    /// Slugs that were enabled.
    pub fn enabled(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_enabled())
            .map(|(slug, _)| slug.as_str())
    }
}

/// Bookkeeping for one top-level `enable` call.
#[derive(Debug, Default)]
struct Walk {
    /// Slugs on the current dependency path.
    path: Vec<String>,
    /// Slugs already enabled during this call.
    done: HashSet<String>,
}

/// Recursively enables modules and their dependencies.
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    registry: Arc<ModuleRegistry>,
    core_namespace: String,
}

impl DependencyResolver {
    /// Creates a resolver. Dependencies on `core_namespace` are always satisfied.
    pub fn new(registry: Arc<ModuleRegistry>, core_namespace: impl Into<String>) -> Self {
        Self {
            registry,
            core_namespace: core_namespace.into(),
        }
    }

    /// Enables `slug` and, first, every module it depends on.
    ///
    /// Idempotent: an already enabled module with satisfied dependencies is
    /// not written again.
    pub async fn enable(&self, slug: &str) -> AppResult<EnableOutcome> {
        let mut walk = Walk::default();
        let outcome = self.enable_inner(slug.to_string(), &mut walk).await?;
        match outcome.error() {
            None => info!(slug = %slug, "Module enabled"),
            Some(err) => warn!(
                slug = %slug,
                kind = %err.kind,
                error = %err,
                "Module could not be enabled"
            ),
        }
        Ok(outcome)
    }

    fn enable_inner<'a>(
        &'a self,
        slug: String,
        walk: &'a mut Walk,
    ) -> BoxFuture<'a, AppResult<EnableOutcome>> {
        Box::pin(async move {
            if walk.path.contains(&slug) {
                warn!(slug = %slug, path = ?walk.path, "Dependency cycle detected");
                return Ok(EnableOutcome::Cycle { slug });
            }
            if walk.done.contains(&slug) {
                return Ok(EnableOutcome::Enabled);
            }

            let Some(mut module) = self.registry.find(&slug).await? else {
                return Ok(EnableOutcome::NotFound { slug });
            };
            if !module.core_supported(self.registry.core_version()) {
                return Ok(EnableOutcome::Unsupported { slug });
            }

            let mut dependencies = Vec::new();
            for dependency in &module.dependencies {
                if dependency == &self.core_namespace {
                    continue;
                }
                match self.registry.find(dependency).await? {
                    Some(found) => dependencies.push(found.slug),
                    None => {
                        warn!(slug = %slug, dependency = %dependency, "Missing dependency");
                        return Ok(EnableOutcome::MissingDependency {
                            slug,
                            dependency: dependency.clone(),
                        });
                    }
                }
            }

            walk.path.push(slug.clone());
            for dependency in dependencies {
                let outcome = self.enable_inner(dependency.clone(), walk).await?;
                if outcome.is_enabled() {
                    continue;
                }

                walk.path.pop();
                if module.enabled {
                    module.enabled = false;
                    self.registry.save(&module).await?;
                }
                debug!(slug = %slug, dependency = %dependency, "Rolled back module");
                return Ok(match outcome {
                    EnableOutcome::Cycle { .. } => outcome,
                    _ => EnableOutcome::Unsatisfiable { slug, dependency },
                });
            }
            walk.path.pop();

            if !module.enabled {
                module.enabled = true;
                self.registry.save(&module).await?;
            }
            walk.done.insert(slug);
            Ok(EnableOutcome::Enabled)
        })
    }

    /// Replaces the enabled set with `slugs`.
    ///
    /// Every module except the application is disabled first, then each
    /// requested slug is enabled in the given order. Modules that do not
    /// support the running core are skipped. Failures are reported, never
    /// raised.
    pub async fn enable_set(&self, slugs: &[String]) -> AppResult<BatchReport> {
        self.registry
            .disable_all_except(self.registry.app_slug())
            .await?;

        let mut report = BatchReport::default();
        for slug in slugs {
            let outcome = match self.registry.find(slug).await? {
                Some(module) if module.core_supported(self.registry.core_version()) => {
                    let outcome = self.enable(slug).await?;
                    if outcome.is_dependency_failure() {
                        report.missing_dependencies = true;
                    }
                    outcome
                }
                found => {
                    let outcome = match found {
                        None => EnableOutcome::NotFound { slug: slug.clone() },
                        Some(_) => {
                            report.unsupported = true;
                            EnableOutcome::Unsupported { slug: slug.clone() }
                        }
                    };
                    if let Some(err) = outcome.error() {
                        warn!(slug = %slug, kind = %err.kind, error = %err, "Skipping module");
                    }
                    outcome
                }
            };
            report.outcomes.push((slug.clone(), outcome));
        }

        info!(
            requested = slugs.len(),
            enabled = report.enabled().count(),
            missing_dependencies = report.missing_dependencies,
            unsupported = report.unsupported,
            "Module selection applied"
        );
        Ok(report)
    }
}
