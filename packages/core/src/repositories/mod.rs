pub mod errors;
pub mod pairing_engine;
pub mod question_repository;
pub mod user_history_repository;
