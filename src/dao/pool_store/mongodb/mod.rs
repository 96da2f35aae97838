mod config;
mod connection;
mod error;
mod models;
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoPoolStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::DuplicateKey { entity } => StorageError::DuplicateKey { entity },
            MongoDaoError::Transaction { stage, .. } => {
                StorageError::aborted(format!("transaction failed while trying to {stage}"), err)
            }
            MongoDaoError::RolledBack { .. } => {
                StorageError::aborted("transaction rolled back".into(), err)
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;

    #[test]
    fn failures_inside_a_transaction_abort_it() {
        let err = MongoDaoError::MissingUpsert {
            collection: "participants",
        }
        .rolled_back();
        let storage = StorageError::from(err);
        assert!(matches!(storage, StorageError::Aborted { .. }));
        assert!(matches!(ServiceError::from(storage), ServiceError::Internal(_)));
    }

    #[test]
    fn failures_outside_a_transaction_stay_unavailable() {
        let err = MongoDaoError::MissingUpsert {
            collection: "guesses",
        };
        assert!(matches!(StorageError::from(err), StorageError::Unavailable { .. }));
        let duplicate = MongoDaoError::DuplicateKey { entity: "pool" }.rolled_back();
        assert!(matches!(
            StorageError::from(duplicate),
            StorageError::DuplicateKey { entity: "pool" }
        ));
    }
}
