//! Controllers and the controller registry.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use modhub_core::error::AppError;
use modhub_core::result::AppResult;
use modhub_core::traits::presentation::ViewRenderer;
use modhub_core::traits::user::CurrentUser;
use modhub_plugin::hooks::dispatcher::HookDispatcher;

use crate::request::RequestContext;
use crate::response::Response;
use crate::table::RouteMatch;

/// HTTP request methods a controller can implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
    /// `HEAD`
    Head,
    /// `OPTIONS`
    Options,
}

impl HttpMethod {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(AppError::validation(format!("Unknown HTTP method '{other}'"))),
        }
    }
}

/// Everything a controller can reach while handling one request.
#[derive(Clone, Copy)]
pub struct ControllerScope<'a> {
    /// The current request.
    pub request: &'a RequestContext,
    /// Matched route and groups.
    pub matches: &'a RouteMatch,
    /// Dispatcher for running hooks such as `preprocess_page`.
    pub dispatcher: &'a HookDispatcher,
    /// View renderer.
    pub renderer: &'a dyn ViewRenderer,
    /// Current user.
    pub user: &'a dyn CurrentUser,
}

impl fmt::Debug for ControllerScope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerScope")
            .field("request", self.request)
            .field("matches", self.matches)
            .finish()
    }
}

/// A request handler addressed by id from route tables.
#[async_trait]
pub trait Controller: Send + Sync + fmt::Debug {
    /// Methods this controller implements.
    fn methods(&self) -> &[HttpMethod];

    /// Handles a request whose method is in [`Controller::methods`].
    async fn call(&self, method: HttpMethod, scope: ControllerScope<'_>) -> AppResult<Response>;

    /// Turns a failure of [`Controller::call`] into a response.
    ///
    /// Re-raises by default so the router's fallback chain handles it.
    async fn handle_error(&self, error: AppError, _scope: ControllerScope<'_>) -> AppResult<Response> {
        Err(error)
    }

    /// Whether this controller implements `method`.
    fn supports(&self, method: HttpMethod) -> bool {
        self.methods().contains(&method)
    }
}

/// Registry of controllers keyed by id.
#[derive(Debug, Default)]
pub struct ControllerRegistry {
    controllers: RwLock<HashMap<String, Arc<dyn Controller>>>,
}

impl ControllerRegistry {
    /// Creates a new empty controller registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a controller.
    pub async fn register(&self, id: impl Into<String>, controller: Arc<dyn Controller>) {
        let id = id.into();
        info!(controller = %id, "Controller registered");
        self.controllers.write().await.insert(id, controller);
    }

    /// Resolves a controller id. An unknown id is a configuration error.
    pub async fn resolve(&self, id: &str) -> AppResult<Arc<dyn Controller>> {
        self.controllers
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::configuration(format!("Controller, {id}, not found.")))
    }

    /// Returns whether `id` is registered.
    pub async fn contains(&self, id: &str) -> bool {
        self.controllers.read().await.contains_key(id)
    }
}
