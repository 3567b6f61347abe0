//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::protocol::{
    AssistantView, ConstitutionQuestionView, ConstitutionQuestionsResponse,
    ConstitutionScoreRequest, ConstitutionScoreResponse, ExchangeView, ExtendedAdviceRequest,
    ExtendedAdviceResponse, HistoryResponse, MessageResponse, ProfileUpdateRequest, ProfileView,
    SubmitRequest, SubmitResponse, SymptomCatalogResponse, SymptomCategoryView,
};
use crate::web::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tcm_assistant_core::{constitution, SubmitOutcome, UserProfile};
use tracing::error;
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        submit_handler,
        extended_advice_handler,
        history_handler,
        reset_handler,
        update_profile_handler,
        constitution_questions_handler,
        score_constitution_handler,
        symptom_catalog_handler,
    ),
    components(
        schemas(
            SubmitRequest,
            SubmitResponse,
            AssistantView,
            ExchangeView,
            HistoryResponse,
            ExtendedAdviceRequest,
            ExtendedAdviceResponse,
            MessageResponse,
            ProfileUpdateRequest,
            ProfileView,
            ConstitutionQuestionsResponse,
            ConstitutionQuestionView,
            ConstitutionScoreRequest,
            ConstitutionScoreResponse,
            SymptomCatalogResponse,
            SymptomCategoryView,
        )
    ),
    tags(
        (name = "TCM Assistant API", description = "API endpoints for the consultation assistant.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Consultation Handlers
//=========================================================================================

/// Submit a consultation turn (free text and/or selected symptom tags).
#[utoipa::path(
    post,
    path = "/consult/submit",
    request_body = SubmitRequest,
    responses(
        (status = 200, description = "Turn handled; `accepted` is false for empty input", body = SubmitResponse),
    )
)]
pub async fn submit_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<SubmitRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut dialogue = app_state.dialogue.lock().await;
    for symptom in &payload.symptoms {
        dialogue.select_symptom(symptom.clone());
    }

    match dialogue.submit(&payload.text).await {
        SubmitOutcome::Ignored => Ok(Json(SubmitResponse {
            accepted: false,
            exchange: None,
        })),
        SubmitOutcome::Answered => {
            let history = dialogue.history();
            let turn_index = history.len() - 2;
            let exchange =
                ExchangeView::from_turns(turn_index, &history[turn_index], &history[turn_index + 1]);
            Ok(Json(SubmitResponse {
                accepted: true,
                exchange: Some(exchange),
            }))
        }
    }
}

/// Request the extended advice plan for an answered exchange.
///
/// This is a side query: the result is for display only and is not recorded
/// in the consultation history.
#[utoipa::path(
    post,
    path = "/consult/extended",
    request_body = ExtendedAdviceRequest,
    responses(
        (status = 200, description = "Extended advice generated", body = ExtendedAdviceResponse),
        (status = 400, description = "No user turn at the given index"),
    )
)]
pub async fn extended_advice_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<ExtendedAdviceRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let dialogue = app_state.dialogue.lock().await;
    match dialogue.request_extended(payload.turn_index).await {
        Ok(content) => Ok(Json(ExtendedAdviceResponse {
            content: tcm_assistant_core::parse::normalize(&content),
        })),
        Err(e) => {
            error!("Extended advice request rejected: {e}");
            Err((StatusCode::BAD_REQUEST, e.to_string()))
        }
    }
}

/// Fetch the full consultation history as display-ready exchanges.
#[utoipa::path(
    get,
    path = "/consult/history",
    responses(
        (status = 200, description = "Consultation history", body = HistoryResponse),
    )
)]
pub async fn history_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let dialogue = app_state.dialogue.lock().await;
    let history = dialogue.history();
    let exchanges = history
        .chunks_exact(2)
        .enumerate()
        .map(|(pair, turns)| ExchangeView::from_turns(pair * 2, &turns[0], &turns[1]))
        .collect();
    Ok(Json(HistoryResponse { exchanges }))
}

/// Clear the consultation history and staged symptoms. The profile survives.
#[utoipa::path(
    post,
    path = "/consult/reset",
    responses(
        (status = 200, description = "Session cleared", body = MessageResponse),
    )
)]
pub async fn reset_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut dialogue = app_state.dialogue.lock().await;
    dialogue.reset();
    Ok(Json(MessageResponse {
        message: "已清空所有问诊记录".to_string(),
    }))
}

/// Update the demographic profile used to differentiate the advice.
#[utoipa::path(
    put,
    path = "/consult/profile",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Profile updated", body = ProfileView),
    )
)]
pub async fn update_profile_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<ProfileUpdateRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut dialogue = app_state.dialogue.lock().await;
    dialogue.set_profile(UserProfile {
        gender: payload.gender.into(),
        age: payload.age,
    });
    Ok(Json(ProfileView::from(dialogue.profile())))
}

//=========================================================================================
// Constitution Questionnaire Handlers
//=========================================================================================

/// Fetch the fixed eight-question constitution questionnaire.
#[utoipa::path(
    get,
    path = "/constitution/questions",
    responses(
        (status = 200, description = "Questionnaire", body = ConstitutionQuestionsResponse),
    )
)]
pub async fn constitution_questions_handler() -> impl IntoResponse {
    let questions = constitution::QUESTIONS
        .iter()
        .map(|q| ConstitutionQuestionView {
            text: q.text.to_string(),
            options: q.options.iter().map(|o| o.to_string()).collect(),
        })
        .collect();
    Json(ConstitutionQuestionsResponse { questions })
}

/// Score a completed questionnaire into a constitution type.
#[utoipa::path(
    post,
    path = "/constitution/score",
    request_body = ConstitutionScoreRequest,
    responses(
        (status = 200, description = "Constitution determined", body = ConstitutionScoreResponse),
        (status = 422, description = "Incomplete or out-of-vocabulary answers"),
    )
)]
pub async fn score_constitution_handler(
    Json(payload): Json<ConstitutionScoreRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match constitution::score(&payload.answers) {
        Ok((label, description)) => Ok(Json(ConstitutionScoreResponse { label, description })),
        Err(e) => Err((StatusCode::UNPROCESSABLE_ENTITY, e.to_string())),
    }
}

//=========================================================================================
// Symptom Catalog Handler
//=========================================================================================

/// Fetch the symptom-keyword catalog shown as quick-select buttons.
#[utoipa::path(
    get,
    path = "/symptoms",
    responses(
        (status = 200, description = "Symptom catalog grouped by body system", body = SymptomCatalogResponse),
    )
)]
pub async fn symptom_catalog_handler() -> impl IntoResponse {
    let categories = SYMPTOM_CATALOG
        .iter()
        .map(|(category, symptoms)| SymptomCategoryView {
            category: category.to_string(),
            symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
        })
        .collect();
    Json(SymptomCatalogResponse { categories })
}

const SYMPTOM_CATALOG: [(&str, &[&str]); 6] = [
    ("头部", &["头痛", "头晕", "偏头痛", "头重", "头胀"]),
    ("呼吸", &["咳嗽", "咽痛", "流涕", "鼻塞", "打喷嚏", "呼吸急促"]),
    ("消化", &["腹痛", "腹胀", "消化不良", "食欲不振", "恶心", "呕吐"]),
    ("睡眠", &["失眠", "多梦", "早醒", "嗜睡", "睡眠质量差"]),
    ("情绪", &["焦虑", "抑郁", "烦躁", "易怒", "心神不宁"]),
    ("其他", &["疲劳", "乏力", "手脚冰凉", "出汗异常", "浮肿"]),
];
