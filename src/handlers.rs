use crate::auth::user_id_from_token;
use crate::community::{Community, CommunityList, NewCommunity};
use crate::error::{AppError, ValidationIssue};
use crate::question::{Question, QuestionList, QuestionPayload, RawQuestion};
use crate::quiz::{QuizDocument, QuizEnvelope, QuizList, QuizMetadata};
use crate::state::{AppState, StoredQuiz};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use tracing::info;

fn request_id_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

fn caller(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    user_id_from_token(token)
}

fn require_caller(headers: &HeaderMap, req_id: &str) -> Result<String, AppError> {
    caller(headers).ok_or_else(|| AppError::unauthorized(req_id))
}

pub async fn list_communities(State(state): State<AppState>) -> Json<CommunityList> {
    let communities = state.db.communities.read().await;
    let mut items: Vec<Community> = communities.values().cloned().collect();
    items.sort_by(|a, b| a.community_name.cmp(&b.community_name));
    Json(CommunityList { communities: items })
}

pub async fn create_community(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(mut payload): Json<NewCommunity>,
) -> Result<(StatusCode, Json<Community>), AppError> {
    let req_id = request_id_from_headers(&headers);
    let user_id = require_caller(&headers, &req_id)?;
    if payload.community_name.trim().is_empty() {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "community validation failed",
            req_id,
        )
        .with_details(vec![ValidationIssue::new("community_name", "must not be empty")]));
    }
    if payload.community_id.trim().is_empty() {
        payload.community_id = uuid::Uuid::new_v4().to_string();
    }

    let mut communities = state.db.communities.write().await;
    if communities.contains_key(&payload.community_id) {
        return Err(AppError::new(StatusCode::CONFLICT, "CONFLICT", "community already exists", req_id));
    }
    let community = payload.into_community(&user_id);
    communities.insert(community.community_id.clone(), community.clone());
    drop(communities);
    info!(community_id = %community.community_id, %user_id, "community created");
    state.persist_or_warn("create_community").await;
    Ok((StatusCode::CREATED, Json(community)))
}

pub async fn get_community(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(community_id): Path<String>,
) -> Result<Json<Community>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let communities = state.db.communities.read().await;
    let community = communities
        .get(&community_id)
        .cloned()
        .ok_or_else(|| AppError::not_found("community", req_id))?;
    Ok(Json(community))
}

async fn change_membership(state: &AppState, headers: &HeaderMap, community_id: &str, join: bool) -> Result<Community, AppError> {
    let req_id = request_id_from_headers(headers);
    let user_id = require_caller(headers, &req_id)?;
    let mut communities = state.db.communities.write().await;
    let community = communities
        .get_mut(community_id)
        .ok_or_else(|| AppError::not_found("community", req_id))?;
    let changed = if join {
        community.join(&user_id)
    } else {
        community.leave(&user_id)
    };
    let updated = community.clone();
    drop(communities);
    if changed {
        info!(%community_id, %user_id, join, "membership changed");
        state.persist_or_warn("membership change").await;
    }
    Ok(updated)
}

pub async fn join_community(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(community_id): Path<String>,
) -> Result<Json<Community>, AppError> {
    change_membership(&state, &headers, &community_id, true).await.map(Json)
}

pub async fn leave_community(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(community_id): Path<String>,
) -> Result<Json<Community>, AppError> {
    change_membership(&state, &headers, &community_id, false).await.map(Json)
}

pub async fn list_quizzes(
    State(state): State<AppState>,
    Path(community_id): Path<String>,
) -> Json<QuizList> {
    let quizzes = state.db.quizzes.read().await;
    let mut items: Vec<_> = quizzes
        .values()
        .filter(|q| q.metadata.community_id == community_id)
        .map(StoredQuiz::record)
        .collect();
    items.sort_by_key(|r| (r.metadata.created_at, r.metadata.quiz_id.clone()));
    Json(QuizList { quizzes: items })
}

fn validated_questions(document: &QuizDocument, req_id: &str) -> Result<Vec<RawQuestion>, AppError> {
    let questions = document
        .validate()
        .map_err(|err| AppError::from_model(err, req_id))?;
    Ok(questions.iter().map(Question::to_raw).collect())
}

pub async fn create_quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(community_id): Path<String>,
    Json(document): Json<QuizDocument>,
) -> Result<(StatusCode, Json<QuizEnvelope>), AppError> {
    let req_id = request_id_from_headers(&headers);
    let user_id = require_caller(&headers, &req_id)?;
    if document.community_id != community_id {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "quiz validation failed",
            req_id,
        )
        .with_details(vec![ValidationIssue::new("community_id", "must match the request path")]));
    }
    if !state.db.communities.read().await.contains_key(&community_id) {
        return Err(AppError::not_found("community", req_id));
    }
    let questions = validated_questions(&document, &req_id)?;

    let key = (community_id.clone(), document.quiz_id.clone());
    let mut quizzes = state.db.quizzes.write().await;
    if quizzes.contains_key(&key) {
        return Err(AppError::new(StatusCode::CONFLICT, "CONFLICT", "quiz already exists", req_id));
    }
    let stored = StoredQuiz {
        metadata: QuizMetadata {
            quiz_id: document.quiz_id,
            community_id,
            title: document.title,
            description: document.description,
            created_at: Some(Utc::now().timestamp()),
            owner_ids: vec![user_id.clone()],
        },
        questions,
    };
    let envelope = stored.envelope();
    quizzes.insert(key, stored);
    drop(quizzes);
    info!(quiz_id = %envelope.metadata.quiz_id, %user_id, "quiz created");
    state.persist_or_warn("create_quiz").await;
    Ok((StatusCode::CREATED, Json(envelope)))
}

pub async fn get_quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((community_id, quiz_id)): Path<(String, String)>,
) -> Result<Json<QuizEnvelope>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let quizzes = state.db.quizzes.read().await;
    let envelope = quizzes
        .get(&(community_id, quiz_id))
        .map(StoredQuiz::envelope)
        .ok_or_else(|| AppError::not_found("quiz", req_id))?;
    Ok(Json(envelope))
}

pub async fn update_quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((community_id, quiz_id)): Path<(String, String)>,
    Json(document): Json<QuizDocument>,
) -> Result<Json<QuizEnvelope>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let user_id = require_caller(&headers, &req_id)?;
    if document.community_id != community_id || document.quiz_id != quiz_id {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_ERROR",
            "quiz validation failed",
            req_id,
        )
        .with_details(vec![ValidationIssue::new("quiz_id", "must match the request path")]));
    }
    let questions = validated_questions(&document, &req_id)?;

    let mut quizzes = state.db.quizzes.write().await;
    let item = quizzes
        .get_mut(&(community_id, quiz_id))
        .ok_or_else(|| AppError::not_found("quiz", req_id.clone()))?;
    if !item.is_owned_by(&user_id) {
        return Err(AppError::forbidden(req_id));
    }
    item.metadata.title = document.title;
    item.metadata.description = document.description;
    item.questions = questions;
    let envelope = item.envelope();
    drop(quizzes);
    state.persist_or_warn("update_quiz").await;
    Ok(Json(envelope))
}

pub async fn delete_quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((community_id, quiz_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    let req_id = request_id_from_headers(&headers);
    let user_id = require_caller(&headers, &req_id)?;
    let key = (community_id, quiz_id);
    let mut quizzes = state.db.quizzes.write().await;
    let existing = quizzes
        .get(&key)
        .ok_or_else(|| AppError::not_found("quiz", req_id.clone()))?;
    if !existing.is_owned_by(&user_id) {
        return Err(AppError::forbidden(req_id));
    }
    quizzes.remove(&key);
    drop(quizzes);
    info!(quiz_id = %key.1, %user_id, "quiz deleted");
    state.persist_or_warn("delete_quiz").await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_questions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((community_id, quiz_id)): Path<(String, String)>,
) -> Result<Json<QuestionList>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let quizzes = state.db.quizzes.read().await;
    let quiz = quizzes
        .get(&(community_id, quiz_id))
        .ok_or_else(|| AppError::not_found("quiz", req_id))?;
    Ok(Json(QuestionList {
        questions: quiz.questions.clone(),
    }))
}

pub async fn get_question(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((community_id, quiz_id, question_id)): Path<(String, String, String)>,
) -> Result<Json<RawQuestion>, AppError> {
    let req_id = request_id_from_headers(&headers);
    let quizzes = state.db.quizzes.read().await;
    let quiz = quizzes
        .get(&(community_id, quiz_id))
        .ok_or_else(|| AppError::not_found("quiz", req_id.clone()))?;
    let question = quiz
        .questions
        .iter()
        .find(|q| q.question_id == question_id)
        .cloned()
        .ok_or_else(|| AppError::not_found("question", req_id))?;
    Ok(Json(question))
}

/// Applies a single-question change to a copy of the quiz and stores it only
/// if the resulting document still validates.
async fn mutate_questions(
    state: &AppState,
    headers: &HeaderMap,
    community_id: String,
    quiz_id: String,
    change: impl FnOnce(&mut Vec<RawQuestion>, &str) -> Result<(), AppError>,
) -> Result<(), AppError> {
    let req_id = request_id_from_headers(headers);
    let user_id = require_caller(headers, &req_id)?;
    let mut quizzes = state.db.quizzes.write().await;
    let quiz = quizzes
        .get_mut(&(community_id, quiz_id))
        .ok_or_else(|| AppError::not_found("quiz", req_id.clone()))?;
    if !quiz.is_owned_by(&user_id) {
        return Err(AppError::forbidden(req_id));
    }
    let mut questions = quiz.questions.clone();
    change(&mut questions, &req_id)?;
    let document = QuizDocument {
        quiz_id: quiz.metadata.quiz_id.clone(),
        community_id: quiz.metadata.community_id.clone(),
        title: quiz.metadata.title.clone(),
        description: quiz.metadata.description.clone(),
        questions,
    };
    quiz.questions = validated_questions(&document, &req_id)?;
    drop(quizzes);
    state.persist_or_warn("question change").await;
    Ok(())
}

fn payload_matches(payload: &QuestionPayload, community_id: &str, quiz_id: &str, req_id: &str) -> Result<(), AppError> {
    if payload.community_id == community_id && payload.quiz_id == quiz_id {
        return Ok(());
    }
    Err(AppError::new(
        StatusCode::BAD_REQUEST,
        "VALIDATION_ERROR",
        "question validation failed",
        req_id,
    )
    .with_details(vec![ValidationIssue::new("quiz_id", "must match the request path")]))
}

pub async fn create_question(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((community_id, quiz_id)): Path<(String, String)>,
    Json(payload): Json<QuestionPayload>,
) -> Result<(StatusCode, Json<RawQuestion>), AppError> {
    payload_matches(&payload, &community_id, &quiz_id, &request_id_from_headers(&headers))?;
    let question = payload.question;
    let created = question.clone();
    mutate_questions(&state, &headers, community_id, quiz_id, move |questions, req_id| {
        if questions.iter().any(|q| q.question_id == question.question_id) {
            return Err(AppError::new(StatusCode::CONFLICT, "CONFLICT", "question already exists", req_id));
        }
        questions.push(question);
        Ok(())
    })
    .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_question(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((community_id, quiz_id, question_id)): Path<(String, String, String)>,
    Json(payload): Json<QuestionPayload>,
) -> Result<Json<RawQuestion>, AppError> {
    payload_matches(&payload, &community_id, &quiz_id, &request_id_from_headers(&headers))?;
    let mut question = payload.question;
    question.question_id = question_id.clone();
    let updated = question.clone();
    mutate_questions(&state, &headers, community_id, quiz_id, move |questions, req_id| {
        let slot = questions
            .iter_mut()
            .find(|q| q.question_id == question_id)
            .ok_or_else(|| AppError::not_found("question", req_id))?;
        *slot = question;
        Ok(())
    })
    .await?;
    Ok(Json(updated))
}

pub async fn delete_question(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((community_id, quiz_id, question_id)): Path<(String, String, String)>,
) -> Result<StatusCode, AppError> {
    mutate_questions(&state, &headers, community_id, quiz_id, move |questions, req_id| {
        let before = questions.len();
        questions.retain(|q| q.question_id != question_id);
        if questions.len() == before {
            return Err(AppError::not_found("question", req_id));
        }
        Ok(())
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
