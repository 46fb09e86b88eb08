//! # modhub-router
//!
//! Selects a controller for each incoming request. Provides:
//!
//! - [`RequestContext`]: the request line split into path and query and
//!   classified as process/backend
//! - [`RouteTable`]: patterns matched in descending string order
//! - [`Controller`] and [`ControllerRegistry`]: handlers addressed by id
//! - [`Router`]: matching plus the deterministic fallback chain

pub mod controller;
pub mod render;
pub mod request;
pub mod response;
pub mod router;
pub mod table;
pub mod user;

pub use controller::{Controller, ControllerRegistry, ControllerScope, HttpMethod};
pub use render::TextRenderer;
pub use request::RequestContext;
pub use response::Response;
pub use router::Router;
pub use table::{RouteMatch, RouteTable};
pub use user::SessionUser;
