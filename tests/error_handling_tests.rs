use axum::http::StatusCode;
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;
use worksheet_engine::{
    config::EngineConfig, Answer, ApiError, DataStore, EngineError, ErrorContext,
    SubmitLearningResultRequest, WorksheetService,
};

fn write_seed(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn question_json(id: &str, rate: u32) -> serde_json::Value {
    json!({
        "id": id,
        "subject": "math",
        "content": "1 + 1 = ?",
        "type": "short_answer",
        "difficulty": "low",
        "source": "internal",
        "curriculum": { "chapter_id": "ch1", "section_id": "s1", "lesson_id": "l1" },
        "correct_answer": "2",
        "correct_rate": rate
    })
}

#[test]
fn test_missing_seed_file() {
    let result = DataStore::load(std::path::Path::new("/definitely/not/here/seed.json"));
    assert!(matches!(result, Err(EngineError::SeedDataIo(_))));
}

#[test]
fn test_malformed_seed_file() {
    let file = write_seed("{ \"questions\": [ { \"id\": ");
    let result = DataStore::load(file.path());
    assert!(matches!(result, Err(EngineError::SeedDataFormat(_))));

    // Unknown enum values are format errors too
    let mut bad_subject = question_json("q1", 50);
    bad_subject["subject"] = json!("physics");
    let file = write_seed(&json!({ "questions": [bad_subject] }).to_string());
    assert!(matches!(DataStore::load(file.path()), Err(EngineError::SeedDataFormat(_))));
}

#[test]
fn test_seed_with_invalid_questions() {
    let duplicate = json!({ "questions": [question_json("q1", 50), question_json("q1", 60)] });
    let file = write_seed(&duplicate.to_string());
    assert!(matches!(DataStore::load(file.path()), Err(EngineError::InvalidQuestion(_))));

    let out_of_range = json!({ "questions": [question_json("q1", 150)] });
    let file = write_seed(&out_of_range.to_string());
    assert!(matches!(DataStore::load(file.path()), Err(EngineError::InvalidQuestion(_))));

    let mut no_choices = question_json("q1", 50);
    no_choices["type"] = json!("multiple_choice");
    no_choices["choices"] = json!([]);
    let file = write_seed(&json!({ "questions": [no_choices] }).to_string());
    assert!(matches!(DataStore::load(file.path()), Err(EngineError::InvalidQuestion(_))));
}

#[test]
fn test_seed_with_duplicate_learning_result_ids() {
    let stored = json!({
        "id": "r-1",
        "student_id": "student-1",
        "assignment_id": "hw-1",
        "submitted_at": "2024-05-01T09:00:00Z",
        "answers": [
            { "question_id": "q1", "student_answer": "3", "is_correct": false, "time_spent": 30 }
        ],
        "total_score": 0,
        "correct_rate": 0.0,
        "total_time_spent": 30
    });
    let seed = json!({
        "questions": [question_json("q1", 50)],
        "learning_results": [stored.clone(), stored]
    });
    let file = write_seed(&seed.to_string());

    assert!(matches!(DataStore::load(file.path()), Err(EngineError::InvalidArgument(_))));
}

#[test]
fn test_empty_seed_is_valid() {
    let file = write_seed(r#"{ "questions": [] }"#);
    let store = DataStore::load(file.path()).unwrap();
    assert!(store.catalog.is_empty());
    assert_eq!(store.history.student_count(), 0);
}

#[test]
fn test_api_error_status_codes() {
    let cases = vec![
        (EngineError::QuestionNotFound("q".to_string()), StatusCode::NOT_FOUND),
        (EngineError::InvalidArgument("bad".to_string()), StatusCode::BAD_REQUEST),
        (EngineError::EmptySelection, StatusCode::BAD_REQUEST),
        (EngineError::InvalidQuestion("bad".to_string()), StatusCode::BAD_REQUEST),
        (
            EngineError::SeedDataIo(std::io::Error::new(std::io::ErrorKind::Other, "disk")),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];

    for (error, expected) in cases {
        let description = error.to_string();
        let (status, body) = ApiError::from(error)
            .to_response_with_context(ErrorContext::new("test", "question"));
        assert_eq!(status, expected, "{} should map to {}", description, expected);
        assert!(!body.0.success);
        assert!(body.0.data.is_none());
        println!("✅ '{}' -> {}", description, status);
    }
}

#[test]
fn test_internal_errors_are_not_leaked() {
    let error = EngineError::SeedDataIo(std::io::Error::new(
        std::io::ErrorKind::PermissionDenied,
        "/secret/path",
    ));
    let (_, body) = ApiError::from(error).to_response();

    let message = body.0.error.unwrap();
    assert!(!message.contains("/secret/path"));
}

#[tokio::test]
async fn test_concurrent_learning_result_submissions() {
    let store = DataStore::from_json(&json!({ "questions": [question_json("q1", 50)] }).to_string()).unwrap();
    let service = WorksheetService::new(store, EngineConfig::default());

    let mut tasks = Vec::new();
    for i in 0..20 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            service
                .record_learning_result(SubmitLearningResultRequest {
                    // Every id is submitted twice
                    id: format!("r-{}", i % 10),
                    student_id: "student-1".to_string(),
                    assignment_id: "hw".to_string(),
                    submitted_at: None,
                    answers: vec![Answer {
                        question_id: "q1".to_string(),
                        student_answer: "3".to_string(),
                        is_correct: false,
                        time_spent: 15,
                    }],
                })
                .await
        }));
    }

    let mut accepted = 0;
    let mut duplicates = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(EngineError::InvalidArgument(_)) => duplicates += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(accepted, 10);
    assert_eq!(duplicates, 10);
    assert_eq!(service.learning_results("student-1").await.len(), 10);

    let analysis = service.analyze_wrong_answers("student-1").await;
    assert_eq!(analysis.items[0].wrong_count, 10);
}
