pub mod constitution;
pub mod dialogue;
pub mod domain;
pub mod parse;
pub mod ports;
pub mod prompt;
pub mod retrieval;

pub use dialogue::{DialogueController, SubmitOutcome};
pub use domain::{
    AgeCategory, ConversationTurn, DialoguePhase, Gender, Role, Session, UserProfile,
};
pub use parse::ResponseKind;
pub use ports::{ChatMessage, ChatRole, CompletionService, KnowledgeRetriever, PortError, PortResult};
