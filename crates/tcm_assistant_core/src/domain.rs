//! crates/tcm_assistant_core/src/domain.rs
//!
//! Defines the pure, core data structures for the consultation dialogue.
//! These structs are independent of any transport or serialization format.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// The author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

/// A single message in the consultation history.
///
/// Turns are immutable once appended and strictly alternate
/// User, Assistant, User, Assistant, ... Assistant turns carry no timestamp;
/// the paired user turn's timestamp dates the exchange.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Some(Utc::now()),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: None,
        }
    }
}

/// Self-reported gender of the person being consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unknown,
}

impl Gender {
    /// Display label used inside prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Gender::Male => "男性",
            Gender::Female => "女性",
            Gender::Unknown => "性别未知",
        }
    }
}

/// Age band used to differentiate advice. Bands are inclusive on their
/// upper edge: 14 is still juvenile, 15 is young-adult, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeCategory {
    Juvenile,
    YoungAdult,
    PrimeAdult,
    MiddleAged,
    Elderly,
    Unknown,
}

impl AgeCategory {
    pub fn from_age(age: Option<u32>) -> Self {
        match age {
            None => AgeCategory::Unknown,
            Some(a) if a <= 14 => AgeCategory::Juvenile,
            Some(a) if a <= 35 => AgeCategory::YoungAdult,
            Some(a) if a <= 55 => AgeCategory::PrimeAdult,
            Some(a) if a <= 70 => AgeCategory::MiddleAged,
            Some(_) => AgeCategory::Elderly,
        }
    }

    /// Display label used inside prompts.
    pub fn label(&self) -> &'static str {
        match self {
            AgeCategory::Juvenile => "少年",
            AgeCategory::YoungAdult => "青年",
            AgeCategory::PrimeAdult => "壮年",
            AgeCategory::MiddleAged => "中年",
            AgeCategory::Elderly => "老年",
            AgeCategory::Unknown => "年龄未知",
        }
    }
}

/// Demographic context carried across the whole session.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub gender: Gender,
    pub age: Option<u32>,
}

impl UserProfile {
    pub fn age_category(&self) -> AgeCategory {
        AgeCategory::from_age(self.age)
    }
}

/// The stage of questioning the controller is about to perform.
///
/// Derived from the session on every turn, never stored: an empty history
/// means intake, a more-advice side query means extended advice, anything
/// else is assessment-capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialoguePhase {
    Intake,
    Assessment,
    ExtendedAdvice,
}

/// The whole mutable state of one consultation.
///
/// Owned exclusively by the dialogue controller; nothing else appends turns
/// or touches the staged symptoms.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub history: Vec<ConversationTurn>,
    pub pending_symptoms: BTreeSet<String>,
    pub profile: UserProfile,
}

impl Session {
    /// Clears the dialogue but keeps the demographic profile.
    pub fn reset(&mut self) {
        self.history.clear();
        self.pending_symptoms.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_category_band_edges() {
        assert_eq!(AgeCategory::from_age(Some(14)), AgeCategory::Juvenile);
        assert_eq!(AgeCategory::from_age(Some(15)), AgeCategory::YoungAdult);
        assert_eq!(AgeCategory::from_age(Some(35)), AgeCategory::YoungAdult);
        assert_eq!(AgeCategory::from_age(Some(36)), AgeCategory::PrimeAdult);
        assert_eq!(AgeCategory::from_age(Some(55)), AgeCategory::PrimeAdult);
        assert_eq!(AgeCategory::from_age(Some(56)), AgeCategory::MiddleAged);
        assert_eq!(AgeCategory::from_age(Some(70)), AgeCategory::MiddleAged);
        assert_eq!(AgeCategory::from_age(Some(71)), AgeCategory::Elderly);
    }

    #[test]
    fn age_category_unknown_when_absent() {
        assert_eq!(AgeCategory::from_age(None), AgeCategory::Unknown);
        assert_eq!(UserProfile::default().age_category(), AgeCategory::Unknown);
    }

    #[test]
    fn session_reset_preserves_profile() {
        let mut session = Session {
            profile: UserProfile {
                gender: Gender::Female,
                age: Some(42),
            },
            ..Default::default()
        };
        session.history.push(ConversationTurn::user("头痛"));
        session.history.push(ConversationTurn::assistant("请问持续多久了？"));
        session.pending_symptoms.insert("失眠".to_string());

        session.reset();

        assert!(session.history.is_empty());
        assert!(session.pending_symptoms.is_empty());
        assert_eq!(session.profile.gender, Gender::Female);
        assert_eq!(session.profile.age, Some(42));
    }

    #[test]
    fn turn_constructors_set_roles_and_timestamps() {
        let user = ConversationTurn::user("咳嗽两周");
        let assistant = ConversationTurn::assistant("是干咳还是有痰？");
        assert_eq!(user.role, Role::User);
        assert!(user.timestamp.is_some());
        assert_eq!(assistant.role, Role::Assistant);
        assert!(assistant.timestamp.is_none());
    }
}
