use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error>;

/// Everything that can go wrong outside of per-field validation.
///
/// Field validation failures are deliberately *not* represented here: they
/// live in each field's `errors`/`is_valid` cells and never propagate.
#[derive(Debug, Error)]
pub enum FormError {
    /// Broken wiring at setup time. Always propagates; never retried.
    #[error("form configuration error: {0}")]
    Config(String),

    /// Control-flow signal raised when the user declines to discard unsaved
    /// changes. Consumed by the router integration, never an application
    /// error.
    #[error("navigation cancelled")]
    NavigationCancelled,

    /// A second submit was requested while one is still in flight.
    #[error("a submit is already in flight for this form")]
    SubmitPending,

    #[error("loading form data failed")]
    Load(#[source] BoxError),

    #[error("submit failed")]
    Submit(#[source] BoxError),

    #[error("form data (de)serialization failed")]
    Data(#[source] serde_json::Error),
}

impl FormError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::NavigationCancelled)
    }
}
