//! # Form state, field bindings, and composite synchronizers
//!
//! A [`FormState`] owns one form's data (a `reform_core::PathStore`), its
//! `is_dirty` / `is_edit` lifecycle cells, and hands out declarative field
//! descriptions an external renderer consumes. Field edits funnel through
//! per-field [`InputHandler`]s (validate-and-reject, or sanitize-and-accept
//! for decimal text) or through composite synchronizers (date, multiselect,
//! tags) that keep several sub-inputs and one stored value consistent.
//!
//! ```no_run
//! use std::rc::Rc;
//! use reform_core::{Validations, validate::required};
//! use reform_forms::*;
//! use reform_navigation::{AlwaysAnswer, Router};
//! use serde_json::json;
//!
//! fn build() -> Result<(), reform_core::FormError> {
//!     let state = FormState::with_data(json!({ "name": "" }));
//!
//!     let name = state.text(TextConfig {
//!         title: Some("Name".into()),
//!         validations: Validations::Single(required()),
//!         ..TextConfig::new("name")
//!     })?;
//!
//!     let form = state.form(
//!         FormConfig::new(
//!             Router::new(),
//!             Rc::new(AlwaysAnswer(true)),
//!             |data| Ok(Some(data.clone())),
//!         ),
//!         vec![name],
//!     )?;
//!     (form.on_submit)()?;
//!     Ok(())
//! }
//! ```
//!
//! Construction is fallible where the wiring can actually be wrong (an
//! unparseable path, a drop-down without options, a tag field over
//! non-string storage); those are configuration errors and fail fast.
//! Validation failures never surface as errors: they live in each field's
//! `errors` / `is_valid` cells.

pub mod collections;
pub mod date;
pub mod input;
pub mod state;
pub mod tests;
pub mod view;

pub use collections::{LookupFn, UnwrapFn, WrapFn};
pub use date::{DateParts, days_in_month};
pub use input::{InputHandler, InputMode, Transform};
pub use state::*;
pub use view::*;
