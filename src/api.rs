use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    errors::{ApiError, EngineError, ErrorContext},
    models::*,
    similarity::SimilarQuestion,
    worksheet_service::{ReviewDecision, ReviewOutcome, WorksheetService},
};

// Import logging macros
use crate::{log_api_start, log_api_success, log_api_warn};

type ApiResult<T> = Result<Json<ApiResponse<T>>, (StatusCode, Json<ApiResponse<()>>)>;

#[derive(Clone)]
pub struct AppState {
    pub worksheet_service: WorksheetService,
}

#[derive(Deserialize)]
pub struct QuestionQuery {
    pub subject: Option<String>,
}

#[derive(Deserialize)]
pub struct SimilarQuery {
    pub top_n: Option<usize>,
}

#[derive(Deserialize)]
pub struct AutoTagRequest {
    pub text: String,
    #[serde(default)]
    pub filename: String,
}

#[derive(Deserialize)]
pub struct ApplyAutoTagRequest {
    #[serde(default)]
    pub metadata: WorksheetMetadata,
    pub suggestions: Vec<AutoTagSuggestion>,
    pub accept: Option<Vec<MetadataField>>,
    #[serde(default)]
    pub accept_confident: bool,
}

#[derive(Deserialize)]
pub struct RetestRequest {
    pub question_ids: Option<Vec<QuestionId>>,
    pub mode: RetestMode,
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub questions: usize,
}

#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

fn engine_failure(
    error: EngineError,
    context: ErrorContext,
) -> (StatusCode, Json<ApiResponse<()>>) {
    ApiError::from(error).to_response_with_context(context)
}

pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::success(HealthStatus {
        status: "ok",
        questions: state.worksheet_service.catalog_size().await,
    }))
}

// Question endpoints
pub async fn list_questions(
    State(state): State<AppState>,
    Query(params): Query<QuestionQuery>,
) -> ApiResult<Vec<Question>> {
    log_api_start!("list_questions");

    let subject = match params.subject.as_deref() {
        Some(raw) => Some(raw.parse::<Subject>().map_err(|e| {
            engine_failure(e, ErrorContext::new("list_questions", "question"))
        })?),
        None => None,
    };

    let questions = state.worksheet_service.list_questions(subject).await;
    log_api_success!("list_questions", count = questions.len(), "questions listed");
    Ok(Json(ApiResponse::success(questions)))
}

pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Question> {
    log_api_start!("get_question", question_id = id);

    match state.worksheet_service.get_question(&id).await {
        Some(question) => Ok(Json(ApiResponse::success(question))),
        None => Err(engine_failure(
            EngineError::QuestionNotFound(id.clone()),
            ErrorContext::new("get_question", "question").with_id(&id),
        )),
    }
}

pub async fn get_similar_questions(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<SimilarQuery>,
) -> ApiResult<Vec<SimilarQuestion>> {
    log_api_start!("get_similar_questions", question_id = id);

    let similar = state
        .worksheet_service
        .similar_questions(&id, params.top_n)
        .await
        .map_err(|e| {
            engine_failure(e, ErrorContext::new("get_similar_questions", "question").with_id(&id))
        })?;

    log_api_success!(
        "get_similar_questions",
        question_id = id,
        count = similar.len(),
        "similar questions ranked"
    );
    Ok(Json(ApiResponse::success(similar)))
}

// Auto-tagging endpoints
pub async fn suggest_auto_tags(
    State(state): State<AppState>,
    Json(request): Json<AutoTagRequest>,
) -> ApiResult<Vec<AutoTagSuggestion>> {
    info!(
        filename = %request.filename,
        text_length = request.text.len(),
        "Extracting worksheet metadata"
    );

    let suggestions = state
        .worksheet_service
        .suggest_metadata(&request.text, &request.filename);

    if suggestions.is_empty() {
        log_api_warn!("suggest_auto_tags", "no metadata could be detected");
    } else {
        log_api_success!("suggest_auto_tags", count = suggestions.len(), "suggestions produced");
    }
    Ok(Json(ApiResponse::success(suggestions)))
}

pub async fn apply_auto_tags(
    State(state): State<AppState>,
    Json(request): Json<ApplyAutoTagRequest>,
) -> ApiResult<ReviewOutcome> {
    log_api_start!("apply_auto_tags");

    let decision = match (request.accept, request.accept_confident) {
        (Some(fields), false) => ReviewDecision::Accept(fields),
        (None, true) => ReviewDecision::AcceptConfident,
        _ => {
            return Err(ApiError::ValidationError(
                "exactly one of 'accept' or 'accept_confident' must be given".to_string(),
            )
            .to_response_with_context(ErrorContext::new("apply_auto_tags", "suggestion")));
        }
    };

    let outcome = state
        .worksheet_service
        .review_metadata(request.metadata, request.suggestions, decision)
        .map_err(|e| engine_failure(e, ErrorContext::new("apply_auto_tags", "suggestion")))?;

    log_api_success!("apply_auto_tags", count = outcome.applied.len(), "suggestions applied");
    Ok(Json(ApiResponse::success(outcome)))
}

// Learning result endpoints
pub async fn submit_learning_result(
    State(state): State<AppState>,
    Json(request): Json<SubmitLearningResultRequest>,
) -> ApiResult<LearningResult> {
    log_api_start!("submit_learning_result", student_id = request.student_id);

    let result_id = request.id.clone();
    let result = state
        .worksheet_service
        .record_learning_result(request)
        .await
        .map_err(|e| {
            engine_failure(
                e,
                ErrorContext::new("submit_learning_result", "learning_result").with_id(&result_id),
            )
        })?;

    log_api_success!(
        "submit_learning_result",
        student_id = result.student_id,
        count = result.answers.len(),
        "learning result recorded"
    );
    Ok(Json(ApiResponse::success(result)))
}

pub async fn get_learning_results(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> ApiResult<Vec<LearningResult>> {
    log_api_start!("get_learning_results", student_id = student_id);

    let results = state.worksheet_service.learning_results(&student_id).await;
    log_api_success!(
        "get_learning_results",
        student_id = student_id,
        count = results.len(),
        "learning results retrieved"
    );
    Ok(Json(ApiResponse::success(results)))
}

// Retest endpoints
pub async fn get_wrong_answers(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> ApiResult<RetestAnalysis> {
    log_api_start!("get_wrong_answers", student_id = student_id);

    let analysis = state.worksheet_service.analyze_wrong_answers(&student_id).await;
    if analysis.is_perfect_score() {
        log_api_warn!("get_wrong_answers", student_id = student_id, "no wrong answers recorded");
    } else {
        log_api_success!(
            "get_wrong_answers",
            student_id = student_id,
            count = analysis.items.len(),
            "wrong answers analyzed"
        );
    }
    Ok(Json(ApiResponse::success(analysis)))
}

pub async fn create_retest(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Json(request): Json<RetestRequest>,
) -> ApiResult<RetestOutcome> {
    info!(
        student_id = %student_id,
        mode = ?request.mode,
        selected = request.question_ids.as_ref().map(Vec::len),
        "Composing retest worksheet"
    );

    let outcome = state
        .worksheet_service
        .compose_retest(&student_id, request.question_ids, request.mode)
        .await
        .map_err(|e| {
            engine_failure(e, ErrorContext::new("create_retest", "retest").with_id(&student_id))
        })?;

    match &outcome {
        RetestOutcome::PerfectScore => {
            log_api_success!("create_retest", student_id = student_id, "perfect score, nothing to retest");
        }
        RetestOutcome::Worksheet(worksheet) => {
            log_api_success!(
                "create_retest",
                student_id = student_id,
                count = worksheet.total_questions,
                "retest worksheet composed"
            );
        }
    }
    Ok(Json(ApiResponse::success(outcome)))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        // Question routes
        .route("/api/questions", get(list_questions))
        .route("/api/questions/:id", get(get_question))
        .route("/api/questions/:id/similar", get(get_similar_questions))
        // Auto-tagging routes
        .route("/api/auto-tag", post(suggest_auto_tags))
        .route("/api/auto-tag/apply", post(apply_auto_tags))
        // Learning result routes
        .route("/api/learning-results", post(submit_learning_result))
        .route("/api/students/:id/learning-results", get(get_learning_results))
        // Retest routes
        .route("/api/students/:id/wrong-answers", get(get_wrong_answers))
        .route("/api/students/:id/retest", post(create_retest))
        .with_state(state)
}
