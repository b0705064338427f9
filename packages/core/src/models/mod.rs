pub mod matching;
pub mod question;
pub mod queue;
