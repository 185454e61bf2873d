//! Axiom Provider
//!
//! A declarative resource reconciler for the [Axiom](https://axiom.co)
//! observability platform. Datasets, monitors, notifiers, API tokens, users
//! and virtual fields are described as plain JSON attribute maps and driven
//! through a create/read/update/delete lifecycle by an orchestrating engine.
//!
//! # Overview
//!
//! - **Schemas** ([`schema`], [`resources`]): typed attribute declarations with
//!   validators, defaults and replace-on-change flags
//! - **Plan state** ([`state`]): the attribute snapshot exchanged per call and
//!   the [`Field`] tri-state
//! - **Converters** (`resources::*::{extract, flatten}`): mapping between plan
//!   state and the remote entities in [`client::models`]
//! - **Reconciler** ([`Reconciler`]): the lifecycle verbs as explicit state
//!   transitions with structured [`Diagnostics`]
//! - **Client** ([`client`]): the [`AxiomApi`] trait and its HTTPS
//!   implementation, [`AxiomClient`]
//! - **Provider** ([`AxiomProvider`]): [`ProviderService`] dispatch by type name
//!
//! # Quick Start
//!
//! ```ignore
//! use axiom_provider::{AxiomProvider, ProviderService};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     axiom_provider::init_logging();
//!
//!     let provider = AxiomProvider::new();
//!     provider.configure(json!({"api_token": "xaat-..."})).await?;
//!
//!     let plan = provider
//!         .plan("axiom_dataset", None, json!({"name": "logs"}), json!({"name": "logs"}))
//!         .await?;
//!     let response = provider.create("axiom_dataset", plan.planned_state).await?;
//!     println!("{:?}", response.new_state);
//!     Ok(())
//! }
//! ```
//!
//! # Resource types
//!
//! | Type name             | Remote entity |
//! |-----------------------|---------------|
//! | `axiom_dataset`       | Dataset       |
//! | `axiom_monitor`       | Monitor       |
//! | `axiom_notifier`      | Notifier      |
//! | `axiom_token`         | API token     |
//! | `axiom_user`          | User          |
//! | `axiom_virtual_field` | Virtual field |
//!
//! Every resource type also has a read-only data source of the same name.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod data_sources;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod service;
pub mod state;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use client::{ApiError, AxiomApi, AxiomClient};
pub use config::ProviderConfig;
pub use diagnostics::Diagnostics;
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::AxiomProvider;
pub use resources::{Outcome, Reconciler, Resource, ResourceKind, Transition};
pub use schema::{Diagnostic, DiagnosticCategory, DiagnosticSeverity, ProviderSchema};
pub use service::ProviderService;
pub use state::{Field, PlanState};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ResourceResponse,
    ServerCapabilities,
};
pub use validation::validate;

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
