//! Hand-off of a finished [`ImportRecord`] to the storage layer.
//!
//! The pipeline never touches a database. Whatever stores imports
//! implements [`ImportSink`]; its errors come back to the caller untouched
//! inside [`PersistError::Sink`].

use async_trait::async_trait;
use knitlog_core::ImportRecord;
use thiserror::Error;

use crate::error::ImportError;

/// The entity an imported record is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerId {
    Project(i64),
    Yarn(i64),
}

/// Storage collaborator for import results.
#[async_trait]
pub trait ImportSink: Send + Sync {
    /// What the store hands back for a created record, typically its id.
    type Output: Send;
    type Error: std::error::Error + Send + Sync + 'static;

    async fn create(&self, owner: OwnerId, record: &ImportRecord)
        -> Result<Self::Output, Self::Error>;
}

/// Failure of [`Importer::import_into`](crate::pipeline::Importer::import_into).
#[derive(Debug, Error)]
pub enum PersistError<E>
where
    E: std::error::Error + 'static,
{
    #[error(transparent)]
    Import(#[from] ImportError),

    #[error("import sink rejected the record: {0}")]
    Sink(#[source] E),
}
