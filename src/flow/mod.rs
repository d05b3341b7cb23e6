//! Flow controllers.
//!
//! Each user action runs one controller from `Idle` to a terminal state.
//! The terminal state is read once with `acknowledge`, which puts the
//! controller back in `Idle`. There are no retries; a failed action has to be
//! submitted again.

pub mod creation;
pub mod display;
pub mod lookup;

pub use creation::{CreationFlow, CreationState};
pub use display::{CertificateView, DisplayFlow, DisplayState};
pub use lookup::{LookupFlow, LookupState};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::certificate::validation::ValidationErrors;
use crate::certificate::RepositoryError;
use crate::render::RenderError;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("{0}")]
    Validation(ValidationErrors),
    #[error("{0}")]
    Creation(String),
    #[error("{0}")]
    Fetch(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Error al generar el PDF: {0}")]
    Render(String),
    #[error("El certificado aún no está disponible")]
    NotReady,
}

impl FlowError {
    /// Short machine-readable name used in error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowError::Validation(_) => "ValidationError",
            FlowError::Creation(_) => "CreationError",
            FlowError::Fetch(_) => "FetchError",
            FlowError::NotFound(_) => "NotFound",
            FlowError::Render(_) => "RenderError",
            FlowError::NotReady => "NotReady",
        }
    }
}

impl From<RepositoryError> for FlowError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Validation(errors) => FlowError::Validation(errors),
            RepositoryError::Creation(_) => FlowError::Creation(err.to_string()),
            RepositoryError::Fetch(_) => FlowError::Fetch(err.to_string()),
        }
    }
}

impl From<RenderError> for FlowError {
    fn from(err: RenderError) -> Self {
        FlowError::Render(err.to_string())
    }
}

/// Loading indicator shared between a controller and whoever displays it.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sets the flag until the returned guard is dropped, on every exit path.
    pub fn enter(&self) -> BusyGuard {
        self.0.store(true, Ordering::SeqCst);
        BusyGuard(self.0.clone())
    }
}

pub struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
