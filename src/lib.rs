//! # Mealpass
//!
//! A single-use digital lunch pass server, usable both as a standalone
//! binary and as a library.
//!
//! Students request a pass for their roll number and receive a one-shot
//! QR token; a scanning point validates tokens exactly once; an admin API
//! manages the roster; a dashboard endpoint reports usage.
//!
//! ## Library Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mealpass::server::{AppState, create_router};
//! use mealpass::store::{SqliteStore, Store};
//!
//! let store = SqliteStore::new("./data/mealpass.db").unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store)));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes the CLI binary dependencies. Disable with
//!   `default-features = false`.

pub mod auth;
pub mod config;
pub mod error;
pub mod passes;
pub mod qr;
pub mod server;
pub mod store;
pub mod types;
