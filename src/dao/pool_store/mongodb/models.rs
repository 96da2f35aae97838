//! Document shapes stored in MongoDB.
//!
//! Identifiers are kept as hyphenated strings and timestamps as BSON dates so
//! that filters built with `doc!` always match what serde wrote.

use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::DocumentError;
use crate::dao::models::{
    GameEntity, GuessEntity, MatchScore, ParticipantEntity, PoolEntity, UserEntity,
};

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": id.to_string()}
}

pub fn id_list<'a>(ids: impl IntoIterator<Item = &'a Uuid>) -> Vec<String> {
    ids.into_iter().map(Uuid::to_string).collect()
}

pub fn bson_datetime(value: OffsetDateTime) -> DateTime {
    DateTime::from_millis((value.unix_timestamp_nanos() / 1_000_000) as i64)
}

fn offset_datetime(field: &'static str, value: DateTime) -> Result<OffsetDateTime, DocumentError> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(value.timestamp_millis()) * 1_000_000)
        .map_err(|_| DocumentError {
            field,
            value: value.to_string(),
        })
}

fn parse_uuid(field: &'static str, value: &str) -> Result<Uuid, DocumentError> {
    Uuid::parse_str(value).map_err(|_| DocumentError {
        field,
        value: value.to_owned(),
    })
}

fn parse_optional_uuid(
    field: &'static str,
    value: Option<String>,
) -> Result<Option<Uuid>, DocumentError> {
    value.map(|raw| parse_uuid(field, &raw)).transpose()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MongoScoreDocument {
    first: i32,
    second: i32,
}

impl From<MatchScore> for MongoScoreDocument {
    fn from(value: MatchScore) -> Self {
        Self {
            first: i32::from(value.first),
            second: i32::from(value.second),
        }
    }
}

impl MongoScoreDocument {
    pub fn to_document(self) -> Document {
        doc! {"first": self.first, "second": self.second}
    }

    fn into_score(self, field: &'static str) -> Result<MatchScore, DocumentError> {
        MatchScore::checked(i64::from(self.first), i64::from(self.second)).ok_or_else(|| {
            DocumentError {
                field,
                value: format!("{}:{}", self.first, self.second),
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPoolDocument {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    code: String,
    owner_id: Option<String>,
    created_at: DateTime,
}

impl From<PoolEntity> for MongoPoolDocument {
    fn from(value: PoolEntity) -> Self {
        Self {
            id: value.id.to_string(),
            title: value.title,
            code: value.code,
            owner_id: value.owner_id.map(|id| id.to_string()),
            created_at: bson_datetime(value.created_at),
        }
    }
}

impl TryFrom<MongoPoolDocument> for PoolEntity {
    type Error = DocumentError;

    fn try_from(value: MongoPoolDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid("_id", &value.id)?,
            title: value.title,
            code: value.code,
            owner_id: parse_optional_uuid("owner_id", value.owner_id)?,
            created_at: offset_datetime("created_at", value.created_at)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoParticipantDocument {
    #[serde(rename = "_id")]
    id: String,
    user_id: String,
    pool_id: String,
    score: i32,
    created_at: DateTime,
}

impl From<ParticipantEntity> for MongoParticipantDocument {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            id: value.id.to_string(),
            user_id: value.user_id.to_string(),
            pool_id: value.pool_id.to_string(),
            score: value.score,
            created_at: bson_datetime(value.created_at),
        }
    }
}

impl TryFrom<MongoParticipantDocument> for ParticipantEntity {
    type Error = DocumentError;

    fn try_from(value: MongoParticipantDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid("_id", &value.id)?,
            user_id: parse_uuid("user_id", &value.user_id)?,
            pool_id: parse_uuid("pool_id", &value.pool_id)?,
            score: value.score,
            created_at: offset_datetime("created_at", value.created_at)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameDocument {
    #[serde(rename = "_id")]
    id: String,
    kickoff: DateTime,
    first_team: String,
    second_team: String,
    result: Option<MongoScoreDocument>,
    created_at: DateTime,
}

impl From<GameEntity> for MongoGameDocument {
    fn from(value: GameEntity) -> Self {
        Self {
            id: value.id.to_string(),
            kickoff: bson_datetime(value.kickoff),
            first_team: value.first_team,
            second_team: value.second_team,
            result: value.result.map(Into::into),
            created_at: bson_datetime(value.created_at),
        }
    }
}

impl TryFrom<MongoGameDocument> for GameEntity {
    type Error = DocumentError;

    fn try_from(value: MongoGameDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid("_id", &value.id)?,
            kickoff: offset_datetime("kickoff", value.kickoff)?,
            first_team: value.first_team,
            second_team: value.second_team,
            result: value
                .result
                .map(|score| score.into_score("result"))
                .transpose()?,
            created_at: offset_datetime("created_at", value.created_at)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGuessDocument {
    #[serde(rename = "_id")]
    id: String,
    participant_id: String,
    game_id: String,
    predicted: MongoScoreDocument,
    score: i32,
    created_at: DateTime,
    updated_at: DateTime,
}

impl TryFrom<MongoGuessDocument> for GuessEntity {
    type Error = DocumentError;

    fn try_from(value: MongoGuessDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid("_id", &value.id)?,
            participant_id: parse_uuid("participant_id", &value.participant_id)?,
            game_id: parse_uuid("game_id", &value.game_id)?,
            predicted: value.predicted.into_score("predicted")?,
            score: value.score,
            created_at: offset_datetime("created_at", value.created_at)?,
            updated_at: offset_datetime("updated_at", value.updated_at)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    avatar_url: Option<String>,
    created_at: DateTime,
}

impl TryFrom<MongoUserDocument> for UserEntity {
    type Error = DocumentError;

    fn try_from(value: MongoUserDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid("_id", &value.id)?,
            name: value.name,
            email: value.email,
            avatar_url: value.avatar_url,
            created_at: offset_datetime("created_at", value.created_at)?,
        })
    }
}
