//! services/api/src/web/protocol.rs
//!
//! Request and response payloads exchanged with the presentation layer,
//! plus the mapping from raw model replies to their display form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tcm_assistant_core::parse;
use tcm_assistant_core::{ConversationTurn, Gender, UserProfile};
use utoipa::ToSchema;

//=========================================================================================
// Consultation Payloads
//=========================================================================================

/// One user submission: free text, symptom tags, or both.
#[derive(Deserialize, Debug, ToSchema)]
pub struct SubmitRequest {
    #[serde(default)]
    pub text: String,
    /// Symptom tags picked from the catalog; staged before the text is merged.
    #[serde(default)]
    pub symptoms: Vec<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct SubmitResponse {
    /// False when both inputs were empty and nothing was submitted.
    pub accepted: bool,
    pub exchange: Option<ExchangeView>,
}

/// A model reply in display form.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssistantView {
    /// A clarifying-question turn, displayed as one block.
    FollowUp { content: String },
    /// A structured assessment split into its two sections.
    Assessment { analysis: String, advice: String },
}

impl AssistantView {
    /// Classifies and splits a raw reply, normalizing the markup of every
    /// displayed part. Inconsistent section markers fall back to the
    /// single-block form.
    pub fn from_reply(content: &str) -> Self {
        if parse::classify(content) == parse::ResponseKind::Structured {
            if let Some((analysis, advice)) = parse::split(content) {
                return AssistantView::Assessment {
                    analysis: parse::normalize(&analysis),
                    advice: parse::normalize(&advice),
                };
            }
        }
        AssistantView::FollowUp {
            content: parse::normalize(content),
        }
    }
}

/// One (user, assistant) exchange of the consultation history.
#[derive(Serialize, Debug, ToSchema)]
pub struct ExchangeView {
    /// History index of the user turn; pass this to the extended-advice
    /// endpoint.
    pub turn_index: usize,
    pub asked_at: Option<DateTime<Utc>>,
    pub question: String,
    pub reply: AssistantView,
}

impl ExchangeView {
    pub fn from_turns(turn_index: usize, user: &ConversationTurn, assistant: &ConversationTurn) -> Self {
        Self {
            turn_index,
            asked_at: user.timestamp,
            question: user.content.clone(),
            reply: AssistantView::from_reply(&assistant.content),
        }
    }
}

#[derive(Serialize, Debug, ToSchema)]
pub struct HistoryResponse {
    pub exchanges: Vec<ExchangeView>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct ExtendedAdviceRequest {
    /// History index of the user turn whose assessment is being extended.
    pub turn_index: usize,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ExtendedAdviceResponse {
    pub content: String,
}

/// Confirmation payload for operations without a richer result.
#[derive(Serialize, Debug, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

//=========================================================================================
// Profile Payloads
//=========================================================================================

#[derive(Deserialize, Serialize, Debug, Clone, Copy, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GenderDto {
    Male,
    Female,
    Unknown,
}

impl From<GenderDto> for Gender {
    fn from(dto: GenderDto) -> Self {
        match dto {
            GenderDto::Male => Gender::Male,
            GenderDto::Female => Gender::Female,
            GenderDto::Unknown => Gender::Unknown,
        }
    }
}

impl From<Gender> for GenderDto {
    fn from(gender: Gender) -> Self {
        match gender {
            Gender::Male => GenderDto::Male,
            Gender::Female => GenderDto::Female,
            Gender::Unknown => GenderDto::Unknown,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct ProfileUpdateRequest {
    pub gender: GenderDto,
    pub age: Option<u32>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ProfileView {
    pub gender: GenderDto,
    pub age: Option<u32>,
    /// Derived display label of the age band, e.g. 壮年.
    pub age_category: String,
}

impl From<&UserProfile> for ProfileView {
    fn from(profile: &UserProfile) -> Self {
        Self {
            gender: profile.gender.into(),
            age: profile.age,
            age_category: profile.age_category().label().to_string(),
        }
    }
}

//=========================================================================================
// Constitution Questionnaire Payloads
//=========================================================================================

#[derive(Serialize, Debug, ToSchema)]
pub struct ConstitutionQuestionView {
    pub text: String,
    pub options: Vec<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ConstitutionQuestionsResponse {
    pub questions: Vec<ConstitutionQuestionView>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct ConstitutionScoreRequest {
    /// Exactly eight answers, one per question, in question order.
    pub answers: Vec<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ConstitutionScoreResponse {
    pub label: String,
    pub description: String,
}

//=========================================================================================
// Symptom Catalog Payloads
//=========================================================================================

#[derive(Serialize, Debug, ToSchema)]
pub struct SymptomCategoryView {
    pub category: String,
    pub symptoms: Vec<String>,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct SymptomCatalogResponse {
    pub categories: Vec<SymptomCategoryView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_replies_render_as_assessment() {
        let view = AssistantView::from_reply(
            "一、辨证分析\n肝郁气滞。\n二、养生建议\n1. 疏肝解郁 2. 规律作息",
        );
        assert_eq!(
            view,
            AssistantView::Assessment {
                analysis: "肝郁气滞。".to_string(),
                advice: "<br>1. 疏肝解郁 <br>2. 规律作息".to_string(),
            }
        );
    }

    #[test]
    fn question_replies_render_as_follow_up() {
        let view = AssistantView::from_reply("请问症状持续多久了？");
        assert_eq!(
            view,
            AssistantView::FollowUp {
                content: "请问症状持续多久了？".to_string()
            }
        );
    }

    #[test]
    fn inconsistent_markers_fall_back_to_single_block() {
        let view = AssistantView::from_reply("二、养生建议 在前 一、辨证分析 在后");
        assert!(matches!(view, AssistantView::FollowUp { .. }));
    }
}
