//! Top-level error type

use thiserror::Error;

use crate::backend::BackendError;
use crate::export::ExportError;
use crate::loader::LoadError;
use crate::watcher::AttributeError;

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Attributes(#[from] AttributeError),
    #[error("Window error: {0}")]
    Window(String),
}

pub type PreviewResult<T> = Result<T, PreviewError>;
