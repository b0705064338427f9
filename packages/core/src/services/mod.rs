pub mod errors;
pub mod matching_service;
pub mod question_selector;

pub use matching_service::MatchingService;
pub use question_selector::QuestionSelector;
