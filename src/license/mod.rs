//! License Enforcement Module
//!
//! Decides whether one more instance may join given the licenses already
//! attached to the cluster. Licenses are never stored on their own; they
//! ride along on instance records and are re-evaluated at every join.
//!
//! ## Tiers
//! - **Single**: a holder id may appear once in the whole cluster.
//! - **Cluster / Multi**: a holder id may appear up to `mi` times (`-1` = unlimited).

pub mod terms;
pub mod types;

pub use terms::violates_license_terms;
pub use types::{License, LicenseType};
