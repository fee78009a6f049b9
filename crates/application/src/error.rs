use domain::{DomainError, RepositoryError};
use thiserror::Error;

use crate::directory::DirectoryError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("directory error: {0}")]
    Directory(#[from] DirectoryError),
}
