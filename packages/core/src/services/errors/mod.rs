pub mod matching_service_errors;
