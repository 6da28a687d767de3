//! # Signals, path-addressed storage, and validation
//!
//! Reform's core is a small reactive engine for form state. There are four
//! pieces:
//!
//! - `Signal<T>` — observable, reactive value.
//! - `PathStore` — one form's JSON-like data, addressed by string paths.
//! - `Validations` — the per-field validator pipeline.
//! - `Dispose` — run-at-most-once cleanup guard for scoped registrations.
//!
//! ## Signals
//!
//! `Signal<T>` is a cloneable handle to a piece of state:
//!
//! ```rust
//! use reform_core::*;
//!
//! let count = signal(0);
//! count.set(1);
//! count.update(|v| *v += 1);
//! assert_eq!(count.get(), 2);
//! ```
//!
//! ## The store
//!
//! A `PathStore` holds one form's data. Paths are dot/bracket addressable,
//! and writes create intermediate structure as needed:
//!
//! ```rust
//! use reform_core::*;
//! use serde_json::json;
//!
//! let store = PathStore::new(json!({}));
//! let street: Path = "addresses[0].street".parse().unwrap();
//! store.set_path(&street, json!("Elm St"), false);
//! assert_eq!(store.get_path(&street), Some(json!("Elm St")));
//! ```
//!
//! The third argument is the *silent* flag: silent writes seed default
//! values without notifying subscribers or marking the form dirty. Only
//! user-driven edits go through non-silent writes.
//!
//! ## Validation
//!
//! Validators are plain functions from a raw value to a [`Verdict`]. A
//! field carries either none, one, or an ordered chain of them; see
//! [`Validations::run`] for the reduction rules.

pub mod dispose;
pub mod error;
pub mod path;
pub mod signal;
pub mod store;
pub mod validate;

pub use dispose::*;
pub use error::*;
pub use path::*;
pub use signal::*;
pub use store::*;
pub use validate::*;
