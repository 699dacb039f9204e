//! # Cosigner Core
//!
//! Offline key-refresh protocol core for a threshold cosigning group.
//!
//! A group of mutually distrusting players, each holding an additive share of
//! a signing key plus precomputed presignature material, periodically
//! re-randomizes their shares without changing the group's combined key. This
//! crate provides the per-player protocol logic:
//!
//! - seed generation and exchange validation ([`refresh::RefreshCoordinator::refresh_key_request`])
//! - PRF-driven share and presignature refresh ([`refresh::RefreshCoordinator::refresh_key`])
//! - two-phase commit and best-effort abort
//!   ([`refresh::RefreshCoordinator::refresh_key_fast_ack`],
//!   [`refresh::RefreshCoordinator::cancel_refresh_key`])
//!
//! Message delivery between players, durable storage, envelope encryption,
//! and backup transport are collaborators of the hosting service, abstracted
//! behind the traits in [`persistency`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use cosigner_core::{RefreshCoordinator, Result};
//!
//! let coordinator = RefreshCoordinator::new(key_persistency, refresh_persistency, platform);
//!
//! // phase 1: produce encrypted seeds for the orchestrator to deliver
//! let outgoing = coordinator
//!     .refresh_key_request(tenant_id, key_id, request_id, &players)
//!     .await?;
//!
//! // phase 2: after the exchange, derive the refreshed material
//! let public_key = coordinator
//!     .refresh_key(key_id, request_id, &exchange_matrix)
//!     .await?;
//!
//! // phase 3: commit, or cancel_refresh_key on abort
//! coordinator
//!     .refresh_key_fast_ack(tenant_id, key_id, request_id)
//!     .await?;
//! ```

pub mod algebra;
pub mod error;
pub mod persistency;
pub mod prf;
pub mod refresh;
pub mod types;

pub use algebra::{get_algebra, CurveAlgebra, SignAlgorithm};
pub use error::{Error, Result};
pub use refresh::RefreshCoordinator;
pub use types::{
    AuxiliaryKeys, CurveScalar, KeyMetadata, PlayerId, PreprocessedSignatureData, Seed,
    SCALAR_SIZE, SEED_SIZE,
};

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
