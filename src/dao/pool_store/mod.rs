pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{
    GameEntity, GuessEntity, GuessUpsert, JoinOutcome, MatchScore, ParticipantEntity, PoolEntity,
    RecomputeReport, UserEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for pools, games and guesses.
///
/// Every mutating method is a single atomic unit: either all of its writes
/// become visible or none do.
pub trait PoolStore: Send + Sync {
    /// Insert a pool, enrolling `owner` in the same transaction when given.
    /// A code collision yields [`StorageError::DuplicateKey`](crate::dao::storage::StorageError).
    fn insert_pool(
        &self,
        pool: PoolEntity,
        owner: Option<ParticipantEntity>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn find_pool(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PoolEntity>>>;
    fn find_pool_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<PoolEntity>>>;
    /// Create a membership and claim pool ownership when the pool has none.
    /// A second membership for the same (user, pool) yields a duplicate key error.
    fn join_pool(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<JoinOutcome>>;
    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    fn find_membership(
        &self,
        pool_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>>;
    fn list_pool_participants(
        &self,
        pool_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;
    fn list_user_memberships(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;
    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;
    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>>;
    /// Create or overwrite the prediction keyed by (participant, game).
    /// An existing guess keeps its id and score.
    fn upsert_guess(&self, guess: GuessUpsert) -> BoxFuture<'static, StorageResult<GuessEntity>>;
    fn list_participant_guesses(
        &self,
        participant_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GuessEntity>>>;
    /// Write the result of a game, rescore its guesses and rebuild the totals
    /// of their owners, all in one transaction. `None` when the game is unknown.
    fn apply_game_result(
        &self,
        game_id: Uuid,
        result: MatchScore,
    ) -> BoxFuture<'static, StorageResult<Option<RecomputeReport>>>;
    fn upsert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<UserEntity>>;
    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    fn find_users(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>>;
    fn count_pools(&self) -> BoxFuture<'static, StorageResult<u64>>;
    fn count_guesses(&self) -> BoxFuture<'static, StorageResult<u64>>;
    fn count_users(&self) -> BoxFuture<'static, StorageResult<u64>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
