use std::{collections::BTreeSet, sync::Arc};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, ClientSession, Collection, Database, IndexModel,
    bson::{Bson, Document, doc},
    options::{IndexOptions, ReturnDocument},
};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{DocumentError, MongoDaoError, MongoResult},
    models::{
        MongoGameDocument, MongoGuessDocument, MongoParticipantDocument, MongoPoolDocument,
        MongoScoreDocument, MongoUserDocument, bson_datetime, doc_id, id_list,
    },
};
use crate::{
    dao::{
        models::{
            GameEntity, GuessEntity, GuessUpsert, JoinOutcome, MatchScore, ParticipantEntity,
            PoolEntity, RecomputeReport, UserEntity,
        },
        pool_store::PoolStore,
        storage::StorageResult,
    },
    engine::recompute::{
        affected_participants, group_by_value, participant_totals, rescore_guesses,
    },
};

const POOLS: &str = "pools";
const PARTICIPANTS: &str = "participants";
const GAMES: &str = "games";
const GUESSES: &str = "guesses";
const USERS: &str = "users";

/// Pool store backed by MongoDB. Multi-document writes run in session
/// transactions, so the server must be a replica set.
#[derive(Clone)]
pub struct MongoPoolStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

fn entities<D, E>(collection: &'static str, documents: Vec<D>) -> MongoResult<Vec<E>>
where
    E: TryFrom<D, Error = DocumentError>,
{
    documents
        .into_iter()
        .map(|document| entity(collection, document))
        .collect()
}

fn entity<D, E>(collection: &'static str, document: D) -> MongoResult<E>
where
    E: TryFrom<D, Error = DocumentError>,
{
    E::try_from(document).map_err(|source| MongoDaoError::InvalidDocument { collection, source })
}

async fn find_all<D>(
    collection: &Collection<D>,
    name: &'static str,
    filter: Document,
) -> MongoResult<Vec<D>>
where
    D: DeserializeOwned + Unpin + Send + Sync,
{
    collection
        .find(filter)
        .await
        .map_err(|source| MongoDaoError::Read {
            collection: name,
            source,
        })?
        .try_collect()
        .await
        .map_err(|source| MongoDaoError::Read {
            collection: name,
            source,
        })
}

async fn find_all_in_session<D>(
    collection: &Collection<D>,
    name: &'static str,
    filter: Document,
    session: &mut ClientSession,
) -> MongoResult<Vec<D>>
where
    D: DeserializeOwned + Unpin + Send + Sync,
{
    let read_error = |source| MongoDaoError::Read {
        collection: name,
        source,
    };
    let mut cursor = collection
        .find(filter)
        .session(&mut *session)
        .await
        .map_err(read_error)?;
    cursor
        .stream(&mut *session)
        .try_collect()
        .await
        .map_err(read_error)
}

impl MongoPoolStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;
        let unique_indexes: [(&'static str, &'static str, Document); 3] = [
            (POOLS, "pool_code_idx", doc! {"code": 1}),
            (
                PARTICIPANTS,
                "participant_membership_idx",
                doc! {"user_id": 1, "pool_id": 1},
            ),
            (
                GUESSES,
                "guess_participant_game_idx",
                doc! {"participant_id": 1, "game_id": 1},
            ),
        ];

        for (collection, index, keys) in unique_indexes {
            let model = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(Some(index.to_owned()))
                        .unique(Some(true))
                        .build(),
                )
                .build();
            database
                .collection::<Document>(collection)
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index,
                    source,
                })?;
        }

        let lookups: [(&'static str, &'static str, Document); 2] = [
            (PARTICIPANTS, "participant_pool_idx", doc! {"pool_id": 1}),
            (GUESSES, "guess_game_idx", doc! {"game_id": 1}),
        ];
        for (collection, index, keys) in lookups {
            let model = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(Some(index.to_owned())).build())
                .build();
            database
                .collection::<Document>(collection)
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index,
                    source,
                })?;
        }

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn begin(&self) -> MongoResult<(Database, ClientSession)> {
        let (client, database) = {
            let guard = self.inner.state.read().await;
            (guard.client.clone(), guard.database.clone())
        };
        let mut session =
            client
                .start_session()
                .await
                .map_err(|source| MongoDaoError::Transaction {
                    stage: "start a session",
                    source,
                })?;
        session
            .start_transaction()
            .await
            .map_err(|source| MongoDaoError::Transaction {
                stage: "start a transaction",
                source,
            })?;
        Ok((database, session))
    }

    async fn finish<T>(mut session: ClientSession, outcome: MongoResult<T>) -> MongoResult<T> {
        match outcome {
            Ok(value) => {
                session
                    .commit_transaction()
                    .await
                    .map_err(|source| MongoDaoError::Transaction {
                        stage: "commit",
                        source,
                    })?;
                Ok(value)
            }
            Err(err) => {
                if let Err(abort) = session.abort_transaction().await {
                    warn!(error = %abort, "failed to abort MongoDB transaction");
                }
                Err(err.rolled_back())
            }
        }
    }

    async fn insert_pool(
        &self,
        pool: PoolEntity,
        owner: Option<ParticipantEntity>,
    ) -> MongoResult<()> {
        let (database, mut session) = self.begin().await?;
        let outcome = async {
            database
                .collection::<MongoPoolDocument>(POOLS)
                .insert_one(MongoPoolDocument::from(pool))
                .session(&mut session)
                .await
                .map_err(|source| MongoDaoError::from_write(POOLS, "pool code", source))?;

            if let Some(participant) = owner {
                database
                    .collection::<MongoParticipantDocument>(PARTICIPANTS)
                    .insert_one(MongoParticipantDocument::from(participant))
                    .session(&mut session)
                    .await
                    .map_err(|source| {
                        MongoDaoError::from_write(PARTICIPANTS, "pool membership", source)
                    })?;
            }
            Ok::<_, MongoDaoError>(())
        }
        .await;
        Self::finish(session, outcome).await
    }

    async fn find_pool(&self, filter: Document) -> MongoResult<Option<PoolEntity>> {
        self.database()
            .await
            .collection::<MongoPoolDocument>(POOLS)
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::Read {
                collection: POOLS,
                source,
            })?
            .map(|document| entity(POOLS, document))
            .transpose()
    }

    async fn join_pool(&self, participant: ParticipantEntity) -> MongoResult<JoinOutcome> {
        let (database, mut session) = self.begin().await?;
        let outcome = async {
            database
                .collection::<MongoParticipantDocument>(PARTICIPANTS)
                .insert_one(MongoParticipantDocument::from(participant.clone()))
                .session(&mut session)
                .await
                .map_err(|source| {
                    MongoDaoError::from_write(PARTICIPANTS, "pool membership", source)
                })?;

            let mut claim = doc_id(participant.pool_id);
            claim.insert("owner_id", Bson::Null);
            let claimed = database
                .collection::<Document>(POOLS)
                .update_one(
                    claim,
                    doc! {"$set": {"owner_id": participant.user_id.to_string()}},
                )
                .session(&mut session)
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: POOLS,
                    source,
                })?;

            Ok::<_, MongoDaoError>(JoinOutcome {
                participant,
                became_owner: claimed.modified_count == 1,
            })
        }
        .await;
        Self::finish(session, outcome).await
    }

    async fn find_participants(&self, filter: Document) -> MongoResult<Vec<ParticipantEntity>> {
        let collection = self
            .database()
            .await
            .collection::<MongoParticipantDocument>(PARTICIPANTS);
        entities(PARTICIPANTS, find_all(&collection, PARTICIPANTS, filter).await?)
    }

    async fn insert_game(&self, game: GameEntity) -> MongoResult<()> {
        self.database()
            .await
            .collection::<MongoGameDocument>(GAMES)
            .insert_one(MongoGameDocument::from(game))
            .await
            .map_err(|source| MongoDaoError::from_write(GAMES, "game", source))?;
        Ok(())
    }

    async fn find_games(&self, filter: Document) -> MongoResult<Vec<GameEntity>> {
        let collection = self
            .database()
            .await
            .collection::<MongoGameDocument>(GAMES);
        entities(GAMES, find_all(&collection, GAMES, filter).await?)
    }

    async fn upsert_guess(&self, upsert: GuessUpsert) -> MongoResult<GuessEntity> {
        let collection = self
            .database()
            .await
            .collection::<MongoGuessDocument>(GUESSES);
        let submitted_at = bson_datetime(upsert.submitted_at);
        let filter = doc! {
            "participant_id": upsert.participant_id.to_string(),
            "game_id": upsert.game_id.to_string(),
        };
        let update = doc! {
            "$set": {
                "predicted": MongoScoreDocument::from(upsert.predicted).to_document(),
                "updated_at": submitted_at,
            },
            "$setOnInsert": {
                "_id": Uuid::now_v7().to_string(),
                "score": 0,
                "created_at": submitted_at,
            },
        };

        // Two concurrent first submissions race on the unique index; the loser
        // retries once and lands on the update path.
        let mut retried = false;
        loop {
            let result = collection
                .find_one_and_update(filter.clone(), update.clone())
                .upsert(true)
                .return_document(ReturnDocument::After)
                .await
                .map_err(|source| MongoDaoError::from_write(GUESSES, "guess", source));

            match result {
                Ok(Some(document)) => return entity(GUESSES, document),
                Ok(None) => return Err(MongoDaoError::MissingUpsert { collection: GUESSES }),
                Err(MongoDaoError::DuplicateKey { .. }) if !retried => retried = true,
                Err(err) => return Err(err),
            }
        }
    }

    async fn find_guesses(&self, filter: Document) -> MongoResult<Vec<GuessEntity>> {
        let collection = self
            .database()
            .await
            .collection::<MongoGuessDocument>(GUESSES);
        entities(GUESSES, find_all(&collection, GUESSES, filter).await?)
    }

    async fn apply_game_result(
        &self,
        game_id: Uuid,
        result: MatchScore,
    ) -> MongoResult<Option<RecomputeReport>> {
        let (database, mut session) = self.begin().await?;
        let outcome = Self::recompute(&database, &mut session, game_id, result).await;
        Self::finish(session, outcome).await
    }

    async fn recompute(
        database: &Database,
        session: &mut ClientSession,
        game_id: Uuid,
        result: MatchScore,
    ) -> MongoResult<Option<RecomputeReport>> {
        let games = database.collection::<MongoGameDocument>(GAMES);
        let guesses = database.collection::<MongoGuessDocument>(GUESSES);
        let participants = database.collection::<MongoParticipantDocument>(PARTICIPANTS);

        let updated = games
            .find_one_and_update(
                doc_id(game_id),
                doc! {"$set": {"result": MongoScoreDocument::from(result).to_document()}},
            )
            .return_document(ReturnDocument::After)
            .session(&mut *session)
            .await
            .map_err(|source| MongoDaoError::Write {
                collection: GAMES,
                source,
            })?;
        let Some(game) = updated else {
            return Ok(None);
        };
        let game: GameEntity = entity(GAMES, game)?;

        let game_guesses: Vec<GuessEntity> = entities(
            GUESSES,
            find_all_in_session(
                &guesses,
                GUESSES,
                doc! {"game_id": game_id.to_string()},
                session,
            )
            .await?,
        )?;
        let rescored = rescore_guesses(&game_guesses, result);

        let by_score = group_by_value(rescored.iter().map(|entry| (entry.guess_id, entry.score)));
        for (score, ids) in by_score {
            guesses
                .update_many(
                    doc! {"_id": {"$in": id_list(&ids)}},
                    doc! {"$set": {"score": score}},
                )
                .session(&mut *session)
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: GUESSES,
                    source,
                })?;
        }

        // Reads inside the transaction observe the updates above.
        let owners = affected_participants(&rescored);
        let owner_ids = id_list(&owners);
        let owner_guesses: Vec<GuessEntity> = entities(
            GUESSES,
            find_all_in_session(
                &guesses,
                GUESSES,
                doc! {"participant_id": {"$in": owner_ids.clone()}},
                session,
            )
            .await?,
        )?;
        let totals = participant_totals(&owners, &owner_guesses);

        let by_total = group_by_value(totals.iter().map(|(id, total)| (*id, *total)));
        for (total, ids) in by_total {
            participants
                .update_many(
                    doc! {"_id": {"$in": id_list(&ids)}},
                    doc! {"$set": {"score": total}},
                )
                .session(&mut *session)
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: PARTICIPANTS,
                    source,
                })?;
        }

        let owner_rows: Vec<ParticipantEntity> = entities(
            PARTICIPANTS,
            find_all_in_session(
                &participants,
                PARTICIPANTS,
                doc! {"_id": {"$in": owner_ids}},
                session,
            )
            .await?,
        )?;
        let affected_pools: BTreeSet<Uuid> = owner_rows.iter().map(|row| row.pool_id).collect();

        Ok(Some(RecomputeReport {
            game,
            guesses_rescored: rescored.len(),
            participant_scores: totals.into_iter().collect(),
            affected_pools: affected_pools.into_iter().collect(),
        }))
    }

    async fn upsert_user(&self, user: UserEntity) -> MongoResult<UserEntity> {
        let document = self
            .database()
            .await
            .collection::<MongoUserDocument>(USERS)
            .find_one_and_update(
                doc_id(user.id),
                doc! {
                    "$set": {
                        "name": user.name,
                        "email": user.email,
                        "avatar_url": user.avatar_url,
                    },
                    "$setOnInsert": {"created_at": bson_datetime(user.created_at)},
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::from_write(USERS, "user", source))?
            .ok_or(MongoDaoError::MissingUpsert { collection: USERS })?;
        entity(USERS, document)
    }

    async fn find_users(&self, filter: Document) -> MongoResult<Vec<UserEntity>> {
        let collection = self
            .database()
            .await
            .collection::<MongoUserDocument>(USERS);
        entities(USERS, find_all(&collection, USERS, filter).await?)
    }

    async fn count(&self, collection: &'static str) -> MongoResult<u64> {
        self.database()
            .await
            .collection::<Document>(collection)
            .count_documents(doc! {})
            .await
            .map_err(|source| MongoDaoError::Read { collection, source })
    }
}

impl PoolStore for MongoPoolStore {
    fn insert_pool(
        &self,
        pool: PoolEntity,
        owner: Option<ParticipantEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_pool(pool, owner).await.map_err(Into::into) })
    }

    fn find_pool(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PoolEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_pool(doc_id(id)).await.map_err(Into::into) })
    }

    fn find_pool_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<PoolEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_pool(doc! {"code": code})
                .await
                .map_err(Into::into)
        })
    }

    fn join_pool(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<JoinOutcome>> {
        let store = self.clone();
        Box::pin(async move { store.join_pool(participant).await.map_err(Into::into) })
    }

    fn find_participant(
        &self,
        id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let found = store.find_participants(doc_id(id)).await?;
            Ok(found.into_iter().next())
        })
    }

    fn find_membership(
        &self,
        pool_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let found = store
                .find_participants(
                    doc! {"pool_id": pool_id.to_string(), "user_id": user_id.to_string()},
                )
                .await?;
            Ok(found.into_iter().next())
        })
    }

    fn list_pool_participants(
        &self,
        pool_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_participants(doc! {"pool_id": pool_id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn list_user_memberships(
        &self,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_participants(doc! {"user_id": user_id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn insert_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert_game(game).await.map_err(Into::into) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let found = store.find_games(doc_id(id)).await?;
            Ok(found.into_iter().next())
        })
    }

    fn list_games(&self) -> BoxFuture<'static, StorageResult<Vec<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_games(doc! {}).await.map_err(Into::into) })
    }

    fn upsert_guess(&self, guess: GuessUpsert) -> BoxFuture<'static, StorageResult<GuessEntity>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_guess(guess).await.map_err(Into::into) })
    }

    fn list_participant_guesses(
        &self,
        participant_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<GuessEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_guesses(doc! {"participant_id": participant_id.to_string()})
                .await
                .map_err(Into::into)
        })
    }

    fn apply_game_result(
        &self,
        game_id: Uuid,
        result: MatchScore,
    ) -> BoxFuture<'static, StorageResult<Option<RecomputeReport>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .apply_game_result(game_id, result)
                .await
                .map_err(Into::into)
        })
    }

    fn upsert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<UserEntity>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_user(user).await.map_err(Into::into) })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let found = store.find_users(doc_id(id)).await?;
            Ok(found.into_iter().next())
        })
    }

    fn find_users(&self, ids: Vec<Uuid>) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_users(doc! {"_id": {"$in": id_list(&ids)}})
                .await
                .map_err(Into::into)
        })
    }

    fn count_pools(&self) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.count(POOLS).await.map_err(Into::into) })
    }

    fn count_guesses(&self) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.count(GUESSES).await.map_err(Into::into) })
    }

    fn count_users(&self) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move { store.count(USERS).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
