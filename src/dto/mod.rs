pub mod game;
pub mod guess;
pub mod health;
pub mod pool;
pub mod ranking;
pub mod sse;
pub mod stats;
pub mod user;
pub mod validation;
