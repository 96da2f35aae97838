/// Database model definitions.
pub mod models;
/// Pool, game and guess persistence backends.
pub mod pool_store;
/// Storage abstraction layer for database operations.
pub mod storage;
