use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

const DUPLICATE_KEY_CODE: i32 = 11000;

/// A stored document that cannot be turned back into an entity.
#[derive(Debug, Error)]
#[error("invalid `{field}` value `{value}`")]
pub struct DocumentError {
    pub field: &'static str,
    pub value: String,
}

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to read from `{collection}`")]
    Read {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to write to `{collection}`")]
    Write {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("duplicate {entity}")]
    DuplicateKey { entity: &'static str },
    #[error("transaction failed while trying to {stage}")]
    Transaction {
        stage: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("corrupted document in `{collection}`")]
    InvalidDocument {
        collection: &'static str,
        #[source]
        source: DocumentError,
    },
    #[error("upsert on `{collection}` returned no document")]
    MissingUpsert { collection: &'static str },
    /// A step inside a session transaction failed and the transaction was aborted.
    #[error("transaction rolled back")]
    RolledBack {
        #[source]
        source: Box<MongoDaoError>,
    },
}

impl MongoDaoError {
    /// Classify a failed write; unique index violations become
    /// [`MongoDaoError::DuplicateKey`].
    pub fn from_write(collection: &'static str, entity: &'static str, source: MongoError) -> Self {
        if is_duplicate_key(&source) {
            MongoDaoError::DuplicateKey { entity }
        } else {
            MongoDaoError::Write { collection, source }
        }
    }

    /// Wrap an error raised inside an aborted transaction. Uniqueness
    /// violations and transaction-level failures keep their own kind.
    pub fn rolled_back(self) -> Self {
        match self {
            MongoDaoError::DuplicateKey { .. }
            | MongoDaoError::Transaction { .. }
            | MongoDaoError::RolledBack { .. } => self,
            other => MongoDaoError::RolledBack {
                source: Box::new(other),
            },
        }
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(failure)) => failure.code == DUPLICATE_KEY_CODE,
        ErrorKind::Command(failure) => failure.code == DUPLICATE_KEY_CODE,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolled_back_keeps_transaction_level_kinds() {
        assert!(matches!(
            MongoDaoError::DuplicateKey { entity: "pool" }.rolled_back(),
            MongoDaoError::DuplicateKey { .. }
        ));
        let wrapped = MongoDaoError::MissingUpsert {
            collection: "guesses",
        }
        .rolled_back();
        assert!(matches!(wrapped, MongoDaoError::RolledBack { .. }));
        assert!(matches!(wrapped.rolled_back(), MongoDaoError::RolledBack { .. }));
    }
}
