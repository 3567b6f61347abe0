//! crates/tcm_assistant_core/src/retrieval.rs
//!
//! Wraps the external retriever with the phase-dependent result count and
//! concatenates the returned passages into one knowledge block.

use crate::ports::KnowledgeRetriever;
use tracing::warn;

/// Result count for the standard intake/assessment turns.
pub const STANDARD_K: usize = 4;
/// Result count for extended-advice side queries.
pub const EXTENDED_K: usize = 8;

/// Fetches the knowledge block for a query.
///
/// A missing retriever (index never built) or a failed search both degrade
/// to an empty block; the prompt composer renders that as a
/// no-retrieved-material mode instead of failing the turn.
pub async fn fetch(
    retriever: Option<&dyn KnowledgeRetriever>,
    query: &str,
    extended: bool,
) -> String {
    let Some(retriever) = retriever else {
        return String::new();
    };

    let k = if extended { EXTENDED_K } else { STANDARD_K };
    match retriever.search(query, k).await {
        Ok(passages) => passages.join("\n"),
        Err(e) => {
            warn!("knowledge retrieval failed, continuing without material: {e}");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{PortError, PortResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingRetriever {
        requested_k: Mutex<Option<usize>>,
        passages: Vec<String>,
    }

    #[async_trait]
    impl KnowledgeRetriever for RecordingRetriever {
        async fn search(&self, _query: &str, k: usize) -> PortResult<Vec<String>> {
            *self.requested_k.lock().unwrap() = Some(k);
            Ok(self.passages.clone())
        }
    }

    struct FailingRetriever;

    #[async_trait]
    impl KnowledgeRetriever for FailingRetriever {
        async fn search(&self, _query: &str, _k: usize) -> PortResult<Vec<String>> {
            Err(PortError::Unavailable("index not built".to_string()))
        }
    }

    #[tokio::test]
    async fn standard_turns_request_four_passages() {
        let retriever = RecordingRetriever {
            requested_k: Mutex::new(None),
            passages: vec!["甲".to_string(), "乙".to_string()],
        };
        let block = fetch(Some(&retriever), "头痛", false).await;
        assert_eq!(block, "甲\n乙");
        assert_eq!(*retriever.requested_k.lock().unwrap(), Some(STANDARD_K));
    }

    #[tokio::test]
    async fn extended_turns_request_eight_passages() {
        let retriever = RecordingRetriever {
            requested_k: Mutex::new(None),
            passages: vec![],
        };
        fetch(Some(&retriever), "头痛", true).await;
        assert_eq!(*retriever.requested_k.lock().unwrap(), Some(EXTENDED_K));
    }

    #[tokio::test]
    async fn missing_retriever_degrades_to_empty_block() {
        assert_eq!(fetch(None, "头痛", false).await, "");
    }

    #[tokio::test]
    async fn failing_retriever_degrades_to_empty_block() {
        assert_eq!(fetch(Some(&FailingRetriever), "头痛", false).await, "");
    }
}
