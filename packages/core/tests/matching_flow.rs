mod common;

use std::collections::HashSet;
use std::sync::Arc;

use common::{build_service, topics, StaticCatalog, StaticHistory};
use matching_core::models::matching::requests::MatchRequest;
use matching_core::models::matching::responses::{CancelOutcome, MatchOutcome, UserStatus};
use matching_core::models::queue::QueueKey;
use matching_core::services::errors::matching_service_errors::MatchingServiceError;

fn request(user_id: &str) -> MatchRequest {
    MatchRequest {
        user_id: user_id.to_string(),
        topics: topics(),
        difficulty: "easy".to_string(),
    }
}

#[tokio::test]
async fn test_second_user_is_matched_with_waiting_user() {
    let service = build_service(
        StaticHistory::default(),
        Arc::new(StaticCatalog::serving(&["two-sum"])),
    );
    let queue = QueueKey::build(&topics(), "easy");

    let first = service.request_match(&request("A")).await.unwrap();
    assert_eq!(
        first,
        MatchOutcome::Waiting {
            queue_key: queue.clone(),
            position: Some(0)
        }
    );
    assert_eq!(
        service.check_user_status("A").await.unwrap(),
        UserStatus::Waiting {
            queue,
            position: Some(0)
        }
    );

    let second = service.request_match(&request("B")).await.unwrap();
    let MatchOutcome::Matched {
        match_id,
        partner_id,
        question_id,
    } = second
    else {
        panic!("expected B to be matched, got {:?}", second);
    };
    assert_eq!(partner_id, "A");
    assert_eq!(question_id, "two-sum");

    for user in ["A", "B"] {
        assert_eq!(
            service.check_user_status(user).await.unwrap(),
            UserStatus::Matched {
                match_id: match_id.clone()
            }
        );
    }
    assert!(service.list_queue_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_lone_user_cancels_while_waiting() {
    let service = build_service(
        StaticHistory::default(),
        Arc::new(StaticCatalog::serving(&["two-sum"])),
    );
    service.request_match(&request("A")).await.unwrap();

    let cancelled = service.cancel_by_user("A").await.unwrap();

    assert_eq!(
        cancelled,
        CancelOutcome::CancelledWaiting {
            queue: QueueKey::build(&topics(), "easy")
        }
    );
    assert_eq!(
        service.check_user_status("A").await.unwrap(),
        UserStatus::NotFound
    );
}

#[tokio::test]
async fn test_catalog_failing_everywhere_sends_both_users_idle() {
    let catalog = Arc::new(StaticCatalog::failing());
    let service = build_service(StaticHistory::default(), catalog.clone());
    service.request_match(&request("A")).await.unwrap();

    let outcome = service.request_match(&request("B")).await.unwrap();

    assert_eq!(outcome, MatchOutcome::NoSuitableQuestion);
    assert_eq!(*catalog.calls.lock().unwrap(), 6);
    for user in ["A", "B"] {
        assert_eq!(
            service.check_user_status(user).await.unwrap(),
            UserStatus::NotFound
        );
    }
}

#[tokio::test]
async fn test_cancelling_a_match_hides_it_from_partner() {
    let service = build_service(
        StaticHistory::default(),
        Arc::new(StaticCatalog::serving(&["two-sum"])),
    );
    service.request_match(&request("A")).await.unwrap();
    let MatchOutcome::Matched { match_id, .. } = service.request_match(&request("B")).await.unwrap()
    else {
        panic!("expected matched");
    };

    let cancelled = service.cancel_by_user("A").await.unwrap();

    assert_eq!(
        cancelled,
        CancelOutcome::CancelledMatched {
            match_id: match_id.clone()
        }
    );
    assert!(matches!(
        service.check_match_status(&match_id).await,
        Err(MatchingServiceError::MatchNotFound(_))
    ));
    assert_eq!(
        service.check_user_status("B").await.unwrap(),
        UserStatus::NotFound
    );
}

#[tokio::test]
async fn test_selected_question_is_not_solved_by_both() {
    let history = StaticHistory::default()
        .with("A", &["two-sum", "three-sum"])
        .with("B", &["two-sum", "valid-anagram"]);
    let service = build_service(
        history,
        Arc::new(StaticCatalog::serving(&["two-sum", "three-sum", "valid-anagram"])),
    );
    service.request_match(&request("A")).await.unwrap();

    let outcome = service.request_match(&request("B")).await.unwrap();

    // Every candidate was solved by someone, so the relaxed pass picks the
    // first one not solved by both.
    assert!(matches!(
        outcome,
        MatchOutcome::Matched { question_id, .. } if question_id == "three-sum"
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_pair_each_user_at_most_once() {
    let service = Arc::new(build_service(
        StaticHistory::default(),
        Arc::new(StaticCatalog::serving(&["two-sum"])),
    ));

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .request_match(&request(&format!("user-{}", i)))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let waiting: HashSet<String> = service
        .list_queue_users()
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.user_id)
        .collect();

    let mut matched = HashSet::new();
    for i in 0..20 {
        let user = format!("user-{}", i);
        match service.check_user_status(&user).await.unwrap() {
            UserStatus::Matched { match_id } => {
                let record = service.check_match_status(&match_id).await.unwrap();
                assert!(record.user_ids.contains(&user));
                assert!(matched.insert(user.clone()), "{} matched twice", user);
                assert!(!waiting.contains(&user));
            }
            UserStatus::Waiting { .. } => assert!(waiting.contains(&user)),
            UserStatus::NotFound => panic!("{} was lost", user),
        }
    }

    assert_eq!(matched.len() + waiting.len(), 20);
    assert!(waiting.len() <= 1);
}
