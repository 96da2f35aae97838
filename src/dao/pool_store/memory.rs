//! In-process storage backend.
//!
//! All tables live behind a single [`RwLock`]; every mutating operation holds
//! the write guard for its whole duration, which makes each of them a
//! serializable transaction. Writes are staged and validated before the
//! tables are touched so a rejected operation leaves no trace.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    dao::{
        models::{
            GameEntity, GuessEntity, GuessUpsert, JoinOutcome, MatchScore, ParticipantEntity,
            PoolEntity, RecomputeReport, UserEntity,
        },
        pool_store::PoolStore,
        storage::{StorageError, StorageResult},
    },
    engine::recompute::{affected_participants, participant_totals, rescore_guesses},
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserEntity>,
    pools: HashMap<Uuid, PoolEntity>,
    pool_codes: HashMap<String, Uuid>,
    participants: HashMap<Uuid, ParticipantEntity>,
    memberships: HashMap<(Uuid, Uuid), Uuid>,
    games: HashMap<Uuid, GameEntity>,
    guesses: HashMap<Uuid, GuessEntity>,
    guess_keys: HashMap<(Uuid, Uuid), Uuid>,
}

impl Tables {
    fn guesses_of(&self, participant_id: Uuid) -> impl Iterator<Item = &GuessEntity> {
        self.guesses
            .values()
            .filter(move |guess| guess.participant_id == participant_id)
    }
}

/// Storage backend keeping every entity in memory.
#[derive(Clone, Default)]
pub struct MemoryPoolStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryPoolStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    async fn insert_pool(
        &self,
        pool: PoolEntity,
        owner: Option<ParticipantEntity>,
    ) -> StorageResult<()> {
        let mut tables = self.tables.write().await;
        if tables.pool_codes.contains_key(&pool.code) {
            return Err(StorageError::DuplicateKey { entity: "pool code" });
        }

        tables.pool_codes.insert(pool.code.clone(), pool.id);
        if let Some(participant) = owner {
            tables
                .memberships
                .insert((participant.pool_id, participant.user_id), participant.id);
            tables.participants.insert(participant.id, participant);
        }
        tables.pools.insert(pool.id, pool);
        Ok(())
    }

    async fn join_pool(&self, participant: ParticipantEntity) -> StorageResult<JoinOutcome> {
        let mut tables = self.tables.write().await;
        let key = (participant.pool_id, participant.user_id);
        if tables.memberships.contains_key(&key) {
            return Err(StorageError::DuplicateKey {
                entity: "pool membership",
            });
        }

        let Some(pool) = tables.pools.get_mut(&participant.pool_id) else {
            return Err(StorageError::aborted(
                format!("pool `{}` vanished while joining", participant.pool_id),
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        };

        let became_owner = pool.owner_id.is_none();
        if became_owner {
            pool.owner_id = Some(participant.user_id);
        }

        tables.memberships.insert(key, participant.id);
        tables.participants.insert(participant.id, participant.clone());

        Ok(JoinOutcome {
            participant,
            became_owner,
        })
    }

    async fn upsert_guess(&self, upsert: GuessUpsert) -> StorageResult<GuessEntity> {
        let mut tables = self.tables.write().await;
        let key = (upsert.participant_id, upsert.game_id);

        if let Some(id) = tables.guess_keys.get(&key).copied() {
            if let Some(existing) = tables.guesses.get_mut(&id) {
                existing.predicted = upsert.predicted;
                existing.updated_at = upsert.submitted_at;
                return Ok(existing.clone());
            }
        }

        let guess = GuessEntity {
            id: Uuid::now_v7(),
            participant_id: upsert.participant_id,
            game_id: upsert.game_id,
            predicted: upsert.predicted,
            score: 0,
            created_at: upsert.submitted_at,
            updated_at: upsert.submitted_at,
        };
        tables.guess_keys.insert(key, guess.id);
        tables.guesses.insert(guess.id, guess.clone());
        Ok(guess)
    }

    async fn apply_game_result(
        &self,
        game_id: Uuid,
        result: MatchScore,
    ) -> StorageResult<Option<RecomputeReport>> {
        let mut tables = self.tables.write().await;
        let Some(mut game) = tables.games.get(&game_id).cloned() else {
            return Ok(None);
        };
        game.result = Some(result);

        let view: &Tables = &tables;
        let game_guesses: Vec<GuessEntity> = view
            .guesses
            .values()
            .filter(|guess| guess.game_id == game_id)
            .cloned()
            .collect();
        let rescored = rescore_guesses(&game_guesses, result);
        let owners = affected_participants(&rescored);

        // Totals are computed over the staged scores, before anything is written.
        let staged: HashMap<Uuid, i32> = rescored
            .iter()
            .map(|entry| (entry.guess_id, entry.score))
            .collect();
        let owner_guesses: Vec<GuessEntity> = owners
            .iter()
            .flat_map(|owner| view.guesses_of(*owner))
            .map(|guess| {
                let mut guess = guess.clone();
                if let Some(score) = staged.get(&guess.id) {
                    guess.score = *score;
                }
                guess
            })
            .collect();
        let totals = participant_totals(&owners, &owner_guesses);

        let affected_pools: BTreeSet<Uuid> = owners
            .iter()
            .filter_map(|id| view.participants.get(id).map(|p| p.pool_id))
            .collect();

        tables.games.insert(game_id, game.clone());
        for (guess_id, score) in staged {
            if let Some(guess) = tables.guesses.get_mut(&guess_id) {
                guess.score = score;
            }
        }
        for (participant_id, total) in &totals {
            if let Some(participant) = tables.participants.get_mut(participant_id) {
                participant.score = *total;
            }
        }

        Ok(Some(RecomputeReport {
            game,
            guesses_rescored: rescored.len(),
            participant_scores: totals.into_iter().collect(),
            affected_pools: affected_pools.into_iter().collect(),
        }))
    }

    async fn upsert_user(&self, user: UserEntity) -> StorageResult<UserEntity> {
        let mut tables = self.tables.write().await;
        let stored = match tables.users.get(&user.id) {
            Some(existing) => UserEntity {
                created_at: existing.created_at,
                ..user
            },
            None => user,
        };
        tables.users.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

impl PoolStore for MemoryPoolStore {
    fn insert_pool(
        &self,
        pool: PoolEntity,
        owner: Option<ParticipantEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_pool(pool, owner).await })
    }

    fn find_pool(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PoolEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.tables.read().await.pools.get(&id).cloned()) })
    }

    fn find_pool_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<PoolEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.read().await;
            Ok(tables
                .pool_codes
                .get(&code)
                .and_then(|id| tables.pools.get(id))
                .cloned())
        })
    }

    fn join_pool(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<JoinOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.join_pool(participant).await })
    }

    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.tables.read().await.participants.get(&id).cloned()) })
    }

    fn find_membership(
        &self,
        pool_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.read().await;
            Ok(tables
                .memberships
                .get(&(pool_id, user_id))
                .and_then(|id| tables.participants.get(id))
                .cloned())
        })
    }

    fn list_pool_participants(
        &self,
        pool_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.read().await;
            Ok(tables
                .participants
                .values()
                .filter(|participant| participant.pool_id == pool_id)
                .cloned()
                .collect())
        })
    }

    fn list_user_memberships(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.read().await;
            Ok(tables
                .participants
                .values()
                .filter(|participant| participant.user_id == user_id)
                .cloned()
                .collect())
        })
    }

    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.tables.write().await.games.insert(game.id, game);
            Ok(())
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.tables.read().await.games.get(&id).cloned()) })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.tables.read().await.games.values().cloned().collect()) })
    }

    fn upsert_guess(&self, guess: GuessUpsert) -> BoxFuture<'static, StorageResult<GuessEntity>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_guess(guess).await })
    }

    fn list_participant_guesses(
        &self,
        participant_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GuessEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.read().await;
            Ok(tables.guesses_of(participant_id).cloned().collect())
        })
    }

    fn apply_game_result(
        &self,
        game_id: Uuid,
        result: MatchScore,
    ) -> BoxFuture<'static, StorageResult<Option<RecomputeReport>>> {
        let store = self.clone();
        Box::pin(async move { store.apply_game_result(game_id, result).await })
    }

    fn upsert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<UserEntity>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_user(user).await })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.tables.read().await.users.get(&id).cloned()) })
    }

    fn find_users(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let tables = store.tables.read().await;
            Ok(ids
                .iter()
                .filter_map(|id| tables.users.get(id).cloned())
                .collect())
        })
    }

    fn count_pools(&self) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.tables.read().await.pools.len() as u64) })
    }

    fn count_guesses(&self) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.tables.read().await.guesses.len() as u64) })
    }

    fn count_users(&self) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.tables.read().await.users.len() as u64) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn pool(code: &str) -> PoolEntity {
        PoolEntity {
            id: Uuid::now_v7(),
            title: "Office".into(),
            code: code.into(),
            owner_id: None,
            created_at: datetime!(2022-11-01 10:00 UTC),
        }
    }

    #[tokio::test]
    async fn duplicate_code_is_rejected_without_side_effects() {
        let store = MemoryPoolStore::new();
        store.insert_pool(pool("ABC123"), None).await.unwrap();

        let second = pool("ABC123");
        let owner = ParticipantEntity::new(Uuid::new_v4(), second.id, second.created_at);
        let err = PoolStore::insert_pool(&store, second, Some(owner.clone()))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::DuplicateKey { .. }));
        assert_eq!(PoolStore::count_pools(&store).await.unwrap(), 1);
        assert!(
            PoolStore::find_participant(&store, owner.id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn upsert_keeps_identity_of_existing_guess() {
        let store = MemoryPoolStore::new();
        let participant_id = Uuid::new_v4();
        let game_id = Uuid::new_v4();
        let at = datetime!(2022-11-20 10:00 UTC);

        let first = store
            .upsert_guess(GuessUpsert {
                participant_id,
                game_id,
                predicted: MatchScore::new(1, 0),
                submitted_at: at,
            })
            .await
            .unwrap();
        let second = store
            .upsert_guess(GuessUpsert {
                participant_id,
                game_id,
                predicted: MatchScore::new(2, 2),
                submitted_at: at + time::Duration::minutes(5),
            })
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.predicted, MatchScore::new(2, 2));
        assert_eq!(second.created_at, at);
        assert_eq!(PoolStore::count_guesses(&store).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_game_result_is_none() {
        let store = MemoryPoolStore::new();
        let report = store
            .apply_game_result(Uuid::new_v4(), MatchScore::new(1, 1))
            .await
            .unwrap();
        assert!(report.is_none());
    }
}
