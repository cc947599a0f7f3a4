//! Reconciliation against the Taikun control plane
//!
//! The backend accepts commands immediately and converges later. This crate
//! bridges that gap:
//!
//! - [`poller`]: one generic wait loop, bounded by a deadline and
//!   cancellable, driven by a per-kind [`probe`] and [`classify`] pair
//! - [`reconciler`]: kind-aware entry point applying per-kind defaults
//! - [`pagination`]: offset/limit windows over cursor-paged list endpoints
//! - [`servers`]: add-then-verify server provisioning, serialized per
//!   project through [`lock::LockRegistry`]
//!
//! All remote calls go through the [`client::ControlPlane`] trait;
//! [`http::HttpControlPlane`] is the production implementation.

#![deny(missing_docs)]

pub mod classify;
pub mod client;
pub mod http;
pub mod lock;
pub mod pagination;
pub mod poller;
pub mod probe;
pub mod reconciler;
pub mod servers;

#[cfg(test)]
mod testing;

pub use client::{ApiRequest, ApiResponse, ControlPlane};
pub use http::{ClientConfig, HttpControlPlane};
pub use lock::LockRegistry;
pub use pagination::{fetch_window, KubernetesResource, Page, PageSource, WindowRequest};
pub use poller::{Outcome, OutcomeState, Poller, Reconciliation, ReconciliationRequest, TickSink};
pub use probe::{ProbeResult, StatusProbe};
pub use reconciler::{Reconciler, ResourceKey, WaitOptions};
pub use servers::{AddServers, ServerAddReport, ServerProvisioner};
