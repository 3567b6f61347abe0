//! services/api/src/adapters/knowledge.rs
//!
//! This module contains the local knowledge base adapter. It implements the
//! `KnowledgeRetriever` port from the `core` crate: the source document is
//! split into overlapping chunks, each chunk is embedded through the
//! provider's embeddings endpoint, and the resulting index is persisted as
//! JSON so later startups load it instead of rebuilding.

use std::path::Path;

use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tcm_assistant_core::ports::{KnowledgeRetriever, PortError, PortResult};
use tracing::{debug, info};

/// Chunking geometry of the source document, in characters.
const CHUNK_SIZE: usize = 300;
const CHUNK_OVERLAP: usize = 50;

/// Embedding requests are batched to keep request bodies bounded.
const EMBED_BATCH_SIZE: usize = 64;

const INDEX_FILE: &str = "index.json";

//=========================================================================================
// Persisted Index Format
//=========================================================================================

#[derive(Debug, Serialize, Deserialize)]
struct PersistedIndex {
    embedding_model: String,
    chunks: Vec<IndexedChunk>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedChunk {
    text: String,
    vector: Vec<f32>,
}

// Internal structs for deserializing the embeddings API response.
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An embedding index over the local knowledge document, queried by cosine
/// similarity. Read-only after construction, so it can be shared freely.
pub struct EmbeddingIndex {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    chunks: Vec<IndexedChunk>,
}

impl EmbeddingIndex {
    /// Loads the persisted index if one exists for the configured model;
    /// otherwise builds it from the knowledge document and persists it.
    pub async fn open_or_build(
        api_base: &str,
        api_key: &str,
        model: &str,
        knowledge_path: &Path,
        index_dir: &Path,
    ) -> PortResult<Self> {
        let index_path = index_dir.join(INDEX_FILE);

        if let Some(persisted) = load_persisted(&index_path, model) {
            info!(
                "Loaded persisted knowledge index ({} chunks) from {}",
                persisted.chunks.len(),
                index_path.display()
            );
            return Ok(Self {
                http: reqwest::Client::new(),
                api_base: api_base.to_string(),
                api_key: api_key.to_string(),
                model: model.to_string(),
                chunks: persisted.chunks,
            });
        }

        info!("Building knowledge index from {}", knowledge_path.display());
        let document = std::fs::read_to_string(knowledge_path).map_err(|e| {
            PortError::Unavailable(format!(
                "Failed to read knowledge source {}: {}",
                knowledge_path.display(),
                e
            ))
        })?;

        let mut index = Self {
            http: reqwest::Client::new(),
            api_base: api_base.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            chunks: Vec::new(),
        };

        let texts = chunk_text(&document, CHUNK_SIZE, CHUNK_OVERLAP);
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let vectors = index.embed_batch(batch).await?;
            for (text, vector) in batch.iter().zip(vectors) {
                index.chunks.push(IndexedChunk {
                    text: text.clone(),
                    vector,
                });
            }
        }

        persist(&index_path, &index.model, &index.chunks)?;
        info!(
            "Knowledge index built ({} chunks) and persisted to {}",
            index.chunks.len(),
            index_path.display()
        );
        Ok(index)
    }

    /// Generates embeddings for a batch of texts in a single request.
    async fn embed_batch(&self, texts: &[String]) -> PortResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.model,
            "input": texts,
        });

        debug!("Requesting embeddings for a batch of {} texts", texts.len());
        let response = self
            .http
            .post(format!("{}/embeddings", self.api_base))
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Embedding request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_else(|_| "<no body>".into());
            return Err(PortError::Unexpected(format!(
                "Embedding API error ({status}): {error_text}"
            )));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Malformed embedding response: {e}")))?;

        if result.data.len() != texts.len() {
            return Err(PortError::Unexpected(format!(
                "Embedding count mismatch: expected {}, got {}",
                texts.len(),
                result.data.len()
            )));
        }

        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }
}

//=========================================================================================
// `KnowledgeRetriever` Trait Implementation
//=========================================================================================

#[async_trait]
impl KnowledgeRetriever for EmbeddingIndex {
    /// Embeds the query and returns the `k` most similar chunks, best first.
    async fn search(&self, query: &str, k: usize) -> PortResult<Vec<String>> {
        if self.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = self
            .embed_batch(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                PortError::Unexpected("No embedding data for the query.".to_string())
            })?;

        Ok(rank(&self.chunks, &query_vector, k)
            .into_iter()
            .map(|chunk| chunk.text.clone())
            .collect())
    }
}

//=========================================================================================
// Pure Helpers
//=========================================================================================

/// Splits text into fixed-size chunks with character overlap.
fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    if total <= chunk_size {
        let trimmed = text.trim();
        return if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![text.to_string()]
        };
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + chunk_size).min(total);
        let chunk: String = chars[start..end].iter().collect();
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
        if end >= total {
            break;
        }
        start = end - overlap;
    }
    chunks
}

/// Calculates the cosine similarity between two embedding vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x.powi(2)).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x.powi(2)).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot_product / (norm_a * norm_b)
}

/// Returns the `k` chunks most similar to the query vector, best first.
fn rank<'a>(chunks: &'a [IndexedChunk], query: &[f32], k: usize) -> Vec<&'a IndexedChunk> {
    let mut scored: Vec<(f32, &IndexedChunk)> = chunks
        .iter()
        .map(|chunk| (cosine_similarity(&chunk.vector, query), chunk))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().take(k).map(|(_, chunk)| chunk).collect()
}

fn load_persisted(index_path: &Path, model: &str) -> Option<PersistedIndex> {
    let raw = std::fs::read_to_string(index_path).ok()?;
    let persisted: PersistedIndex = serde_json::from_str(&raw).ok()?;
    // A model switch invalidates every stored vector; rebuild in that case.
    (persisted.embedding_model == model).then_some(persisted)
}

fn persist(index_path: &Path, model: &str, chunks: &[IndexedChunk]) -> PortResult<()> {
    if let Some(dir) = index_path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| {
            PortError::Unexpected(format!("Failed to create index directory: {e}"))
        })?;
    }
    let persisted = PersistedIndex {
        embedding_model: model.to_string(),
        chunks: chunks.to_vec(),
    };
    let raw = serde_json::to_string(&persisted)
        .map_err(|e| PortError::Unexpected(format!("Failed to serialize index: {e}")))?;
    std::fs::write(index_path, raw)
        .map_err(|e| PortError::Unexpected(format!("Failed to write index file: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_documents_become_a_single_chunk() {
        assert_eq!(chunk_text("短文", 300, 50), vec!["短文".to_string()]);
        assert!(chunk_text("   \n  ", 300, 50).is_empty());
    }

    #[test]
    fn chunks_overlap_by_the_configured_amount() {
        let text: String = ('a'..='z').cycle().take(25).collect();
        let chunks = chunk_text(&text, 10, 3);

        assert_eq!(chunks[0].chars().count(), 10);
        // Each follow-up chunk re-covers the last 3 chars of its predecessor.
        for pair in chunks.windows(2) {
            let prev_tail: String = pair[0].chars().skip(7).collect();
            let next_head: String = pair[1].chars().take(3).collect();
            assert_eq!(prev_tail, next_head);
        }
        // Full coverage: concatenating without the overlaps restores the text.
        let mut restored = chunks[0].clone();
        for chunk in &chunks[1..] {
            restored.extend(chunk.chars().skip(3));
        }
        assert_eq!(restored, text);
    }

    #[test]
    fn cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn rank_returns_top_k_best_first() {
        let chunks = vec![
            IndexedChunk {
                text: "正交".to_string(),
                vector: vec![0.0, 1.0],
            },
            IndexedChunk {
                text: "同向".to_string(),
                vector: vec![1.0, 0.0],
            },
            IndexedChunk {
                text: "相近".to_string(),
                vector: vec![0.9, 0.1],
            },
        ];
        let top = rank(&chunks, &[1.0, 0.0], 2);
        assert_eq!(top[0].text, "同向");
        assert_eq!(top[1].text, "相近");
    }

    #[test]
    fn persisted_index_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(INDEX_FILE);
        let chunks = vec![IndexedChunk {
            text: "阳虚者宜温补".to_string(),
            vector: vec![0.1, 0.2, 0.3],
        }];

        persist(&path, "embedding-3", &chunks).unwrap();
        let loaded = load_persisted(&path, "embedding-3").unwrap();
        assert_eq!(loaded.embedding_model, "embedding-3");
        assert_eq!(loaded.chunks.len(), 1);
        assert_eq!(loaded.chunks[0].text, "阳虚者宜温补");

        // A different model must not reuse the stored vectors.
        assert!(load_persisted(&path, "embedding-2").is_none());
        // A missing file is simply absent.
        assert!(load_persisted(&dir.path().join("other.json"), "embedding-3").is_none());
    }
}
