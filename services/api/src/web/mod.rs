pub mod protocol;
pub mod rest;
pub mod state;

// Re-export the handlers to make them easily accessible to the binary that
// will build the web server router.
pub use rest::{
    constitution_questions_handler, extended_advice_handler, history_handler, reset_handler,
    score_constitution_handler, submit_handler, symptom_catalog_handler, update_profile_handler,
};
