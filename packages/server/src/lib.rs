//! Public surface for the `i14y-structure-server` crate.
//!
//! Exposes the router builder, state and config types so that external
//! crates (e.g. the conformance test suite) can spin up an in-process server
//! without spawning a subprocess.

pub mod catalogue;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod sessions;

pub use catalogue::{CatalogueLookup, I14yCatalogueClient, LookupError, StaticCatalogue};
pub use config::{ConfigError, ServerConfig};
pub use handlers::AppState;
pub use router::build_router;
pub use sessions::{run_sweeper, SessionStore};
