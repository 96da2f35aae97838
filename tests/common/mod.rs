#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use guess_pool_back::{
    config::AppConfig,
    dao::pool_store::memory::MemoryPoolStore,
    dto::user::UpsertProfileRequest,
    engine::code::{CodeSource, RandomCodes},
    services::{auth_service::Credential, user_service},
    state::{AppState, ManualClock, SharedState},
};
use time::{OffsetDateTime, macros::datetime};
use uuid::Uuid;

pub const SECRET: &str = "integration-secret";
pub const START: OffsetDateTime = datetime!(2022-11-20 12:00 UTC);

/// Hands out queued codes first, then random ones.
#[derive(Default)]
pub struct ScriptedCodes {
    queue: Mutex<VecDeque<String>>,
}

impl ScriptedCodes {
    pub fn push(&self, code: &str) {
        self.queue.lock().unwrap().push_back(code.to_owned());
    }
}

impl CodeSource for ScriptedCodes {
    fn next_code(&self) -> String {
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RandomCodes.next_code())
    }
}

pub struct Harness {
    pub state: SharedState,
    pub clock: Arc<ManualClock>,
    pub codes: Arc<ScriptedCodes>,
}

pub async fn harness() -> Harness {
    harness_with(AppConfig::default().with_auth_secret(SECRET)).await
}

pub async fn harness_with(config: AppConfig) -> Harness {
    let clock = Arc::new(ManualClock::new(START));
    let codes = Arc::new(ScriptedCodes::default());
    let state = AppState::with_parts(config, clock.clone(), codes.clone());
    state
        .install_pool_store(Arc::new(MemoryPoolStore::new()))
        .await;
    Harness {
        state,
        clock,
        codes,
    }
}

/// Register a profile and return its user id.
pub async fn register(state: &SharedState, name: &str) -> Uuid {
    let user_id = Uuid::new_v4();
    user_service::upsert_profile(
        state,
        Credential { user_id },
        UpsertProfileRequest {
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            avatar_url: None,
        },
    )
    .await
    .unwrap();
    user_id
}
