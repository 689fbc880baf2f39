//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → router.rs (mount prefix match, prefix stripped)
//!     → http::handler (secret path, verb)
//!
//! Revision (revision.rs):
//!     mount prefix + verb table, fixed at startup
//! ```
//!
//! # Design Decisions
//! - Routes built at startup, immutable at runtime
//! - Prefix matching only
//! - One revision per proxy

pub mod revision;
pub mod router;

pub use revision::Revision;
pub use router::secret_routes;
