//! # route_kit
//!
//! Controller-based request dispatch with generated OpenAPI documents.
//!
//! Request and response types derive [`ApiModel`], which builds a static field
//! table. Request types carry a [`Meta`] marker field whose `#[api(...)]`
//! attributes declare the route:
//!
//! ```ignore
//! #[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
//! pub struct ListItemsReq {
//!     #[serde(skip)]
//!     #[api(path = "/items", method = "GET", summary = "List items", tags = "items")]
//!     pub meta: Meta,
//!     #[api(p = "limit", v = "required", description = "Page size")]
//!     pub limit: u32,
//! }
//! ```
//!
//! Controllers annotate their inherent `impl` block with `#[controller]`; every
//! `pub async fn name(&self, ctx: RequestContext, req: Req) -> Result<Res, E>`
//! whose request type carries a route becomes an API. The same field tables
//! drive request decoding, validation and document generation.
//!
//! - **`ApiFramework`**: registers controllers and turns into an
//!   `axum::Router` serving every API plus the document route.
//! - **`decode`**: the query/body decoder behind every route.
//! - **`openapi`**: builds the document with `utoipa`'s model types.

extern crate self as route_kit;

pub mod coerce;
pub mod config;
pub mod context;
pub mod decode;
pub mod descriptor;
mod dispatch;
pub mod error;
pub mod framework;
pub mod handler;
pub mod openapi;
pub mod query;
pub mod registry;
pub mod rules;
pub mod tags;
pub mod validation;
pub mod walker;

pub use config::FrameworkConfig;
pub use context::RequestContext;
pub use descriptor::{ApiModel, DeletedAt, Meta, TypeDescriptor};
pub use error::{Error, Result};
pub use framework::{ApiFramework, FrameworkHandle};
pub use handler::{Controller, MethodEntry};
pub use registry::ApiDefinition;
pub use validation::{RuleValidator, Validator};

#[cfg(feature = "macros")]
pub use route_kit_macros::{controller, ApiModel};

// `inventory::submit!` for static rule registration; `utoipa` for the
// document types returned by `generate_openapi`.
pub use inventory;
pub use utoipa;
