//! # Quarry
//!
//! A SQL gateway server, usable both as a standalone binary and as a library.
//!
//! An operator provisions isolated "project" databases on a shared backend
//! and runs arbitrary SQL against them; external consumers get a read-only,
//! key-authenticated, row-capped query endpoint per published project.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use quarry::backend::SqliteBackend;
//! use quarry::server::{AppState, create_router};
//! use quarry::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/quarry.db").unwrap();
//! store.initialize().unwrap();
//!
//! let backend = Arc::new(SqliteBackend::new("./data/projects"));
//! let state = Arc::new(AppState::new(
//!     Arc::new(store),
//!     backend,
//!     Duration::from_secs(30),
//! ));
//! let router = create_router(state);
//! // Serve with axum...
//! ```

pub mod auth;
pub mod backend;
pub mod config;
pub mod error;
pub mod query;
pub mod server;
pub mod sql;
pub mod store;
pub mod types;
