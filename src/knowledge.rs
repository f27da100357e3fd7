//! Knowledge retrieval for reply context
//!
//! Plain-text documents are split into overlapping word chunks, embedded once
//! (with a JSON disk cache), and ranked against the transcribed utterance by
//! cosine similarity. The top matches are formatted as reference context for
//! the chat prompt.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One embedded chunk of a source document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Chunk text
    pub text: String,
    /// Title of the document the chunk came from
    pub source: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
}

/// A chunk matched against a query, with its similarity score
#[derive(Debug)]
pub struct Retrieved<'a> {
    /// The matched chunk
    pub chunk: &'a KnowledgeChunk,
    /// Cosine similarity to the query embedding
    pub similarity: f32,
}

/// Split text into overlapping chunks of roughly `chunk_size` words.
///
/// Consecutive chunks share `overlap` words so sentences at chunk borders
/// stay searchable.
#[must_use]
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();

    let mut start = 0;
    while start < words.len() {
        let end = (start + chunk_size).min(words.len());
        chunks.push(words[start..end].join(" "));
        if end == words.len() {
            break;
        }
        start += step;
    }

    chunks
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude or the lengths differ.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    dot / denom
}

/// Response from the embeddings API
#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

/// Embeds text via the OpenAI embeddings API
pub struct EmbeddingClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl EmbeddingClient {
    /// Create a new embedding client.
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing.
    pub fn new(api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::InvalidConfig(
                "OpenAI API key required for embeddings".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model,
        })
    }

    /// Embed a batch of texts, preserving input order.
    ///
    /// # Errors
    ///
    /// Returns error if the API call fails or returns a mismatched count.
    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "embeddings API error");
            return Err(Error::Knowledge(format!(
                "embeddings API error {status}: {body}"
            )));
        }

        let result: EmbeddingResponse = response.json().await?;
        if result.data.len() != inputs.len() {
            return Err(Error::Knowledge(format!(
                "embeddings API returned {} vectors for {} inputs",
                result.data.len(),
                inputs.len()
            )));
        }

        Ok(result.data.into_iter().map(|d| d.embedding).collect())
    }

    /// Embed a single query string.
    ///
    /// # Errors
    ///
    /// Returns error if the API call fails.
    pub async fn embed_one(&self, input: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(std::slice::from_ref(&input.to_string())).await?;
        vectors
            .pop()
            .ok_or_else(|| Error::Knowledge("embeddings API returned no vector".to_string()))
    }
}

/// Embedded document chunks with similarity search
pub struct KnowledgeBase {
    chunks: Vec<KnowledgeChunk>,
    documents: usize,
}

impl KnowledgeBase {
    /// Build a knowledge base from `.txt` files under `documents_dir`.
    ///
    /// If `cache_path` holds a previous run's embeddings they are loaded
    /// wholesale; otherwise every document is chunked and embedded, and the
    /// result written back to the cache.
    ///
    /// # Errors
    ///
    /// Returns error if the documents folder cannot be read or embedding
    /// fails.
    pub async fn load(
        documents_dir: &Path,
        embedder: &EmbeddingClient,
        cache_path: &Path,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<Self> {
        if let Some(chunks) = read_cache(cache_path) {
            let documents = count_sources(&chunks);
            tracing::info!(
                path = %cache_path.display(),
                documents,
                chunks = chunks.len(),
                "loaded embeddings from cache"
            );
            return Ok(Self { chunks, documents });
        }

        let files = collect_text_files(documents_dir)?;
        let mut chunks = Vec::new();

        for file in &files {
            let text = std::fs::read_to_string(file)?;
            let source = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            let pieces = chunk_text(&text, chunk_size, chunk_overlap);
            if pieces.is_empty() {
                tracing::warn!(path = %file.display(), "no text extracted, skipping");
                continue;
            }

            tracing::debug!(source = %source, chunks = pieces.len(), "embedding document");
            let embeddings = embedder.embed(&pieces).await?;

            for (text, embedding) in pieces.into_iter().zip(embeddings) {
                chunks.push(KnowledgeChunk {
                    text,
                    source: source.clone(),
                    embedding,
                });
            }
        }

        let documents = count_sources(&chunks);
        tracing::info!(documents, chunks = chunks.len(), "knowledge base built");

        if let Err(e) = write_cache(cache_path, &chunks) {
            tracing::warn!(path = %cache_path.display(), error = %e, "failed to write embedding cache");
        }

        Ok(Self { chunks, documents })
    }

    /// Construct directly from chunks (used by tests and cache loads)
    #[must_use]
    pub fn from_chunks(chunks: Vec<KnowledgeChunk>) -> Self {
        let documents = count_sources(&chunks);
        Self { chunks, documents }
    }

    /// Rank chunks against a query embedding.
    ///
    /// Only results strictly above `min_similarity` are kept; at most
    /// `top_k` are returned, highest similarity first.
    #[must_use]
    pub fn search(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        min_similarity: f32,
    ) -> Vec<Retrieved<'_>> {
        let mut results: Vec<Retrieved<'_>> = self
            .chunks
            .iter()
            .map(|chunk| Retrieved {
                similarity: cosine_similarity(&chunk.embedding, query_embedding),
                chunk,
            })
            .filter(|r| r.similarity > min_similarity)
            .collect();

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        results
    }

    /// Number of distinct source documents
    #[must_use]
    pub const fn document_count(&self) -> usize {
        self.documents
    }

    /// Total number of embedded chunks
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

/// Format retrieved chunks for prompt injection.
///
/// Sections are added in rank order until `max_chars` is exceeded; the first
/// section is always kept. Returns an empty string for no results.
#[must_use]
pub fn format_context(results: &[Retrieved<'_>], max_chars: usize) -> String {
    if results.is_empty() {
        return String::new();
    }

    let mut body = String::new();
    for (i, r) in results.iter().enumerate() {
        let section = format!("Source: {}\n{}", r.chunk.source, r.chunk.text);
        if i > 0 && body.len() + section.len() > max_chars {
            break;
        }
        if i > 0 {
            body.push('\n');
        }
        let _ = write!(body, "{section}");
    }

    format!("\n\nReference material:\n{body}")
}

/// Collect `.txt` files under `dir`, recursively, in stable order
fn collect_text_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];

    while let Some(current) = stack.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("txt")) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

fn count_sources(chunks: &[KnowledgeChunk]) -> usize {
    let mut sources: Vec<&str> = chunks.iter().map(|c| c.source.as_str()).collect();
    sources.sort_unstable();
    sources.dedup();
    sources.len()
}

/// Load cached embeddings, returning `None` on any failure
fn read_cache(path: &Path) -> Option<Vec<KnowledgeChunk>> {
    if !path.exists() {
        return None;
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(chunks) => Some(chunks),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "invalid embedding cache, rebuilding");
                None
            }
        },
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to read embedding cache");
            None
        }
    }
}

fn write_cache(path: &Path, chunks: &[KnowledgeChunk]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string(chunks)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, source: &str, embedding: Vec<f32>) -> KnowledgeChunk {
        KnowledgeChunk {
            text: text.to_string(),
            source: source.to_string(),
            embedding,
        }
    }

    #[test]
    fn test_chunk_text_sizes() {
        let words: Vec<String> = (0..100).map(|i| format!("w{i}")).collect();
        let text = words.join(" ");

        let chunks = chunk_text(&text, 30, 5);
        assert!(chunks[0].split_whitespace().count() == 30);
        // Step is 25 words: second chunk starts at w25
        assert!(chunks[1].starts_with("w25 "));
    }

    #[test]
    fn test_chunk_text_covers_all_words() {
        let words: Vec<String> = (0..70).map(|i| format!("w{i}")).collect();
        let chunks = chunk_text(&words.join(" "), 30, 5);
        assert!(chunks.last().unwrap().ends_with("w69"));
    }

    #[test]
    fn test_chunk_text_short_input() {
        let chunks = chunk_text("only three words", 300, 50);
        assert_eq!(chunks, vec!["only three words".to_string()]);
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("", 300, 50).is_empty());
        assert!(chunk_text("   \n  ", 300, 50).is_empty());
    }

    #[test]
    fn test_chunk_text_overlap_ge_size_still_terminates() {
        let words: Vec<String> = (0..20).map(|i| format!("w{i}")).collect();
        let chunks = chunk_text(&words.join(" "), 5, 5);
        assert!(!chunks.is_empty());
        assert!(chunks.len() <= 20);
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < f32::EPSILON);
    }

    #[test]
    fn test_cosine_similarity_mismatched_lengths() {
        assert!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]).abs() < f32::EPSILON);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).abs() < f32::EPSILON);
    }

    #[test]
    fn test_search_ranks_by_similarity() {
        let kb = KnowledgeBase::from_chunks(vec![
            chunk("far", "a.txt", vec![0.0, 1.0, 0.0]),
            chunk("close", "b.txt", vec![1.0, 0.1, 0.0]),
        ]);

        let results = kb.search(&[1.0, 0.0, 0.0], 5, 0.3);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.text, "close");
    }

    #[test]
    fn test_search_respects_top_k() {
        let kb = KnowledgeBase::from_chunks(vec![
            chunk("a", "a.txt", vec![1.0, 0.0]),
            chunk("b", "a.txt", vec![0.9, 0.1]),
            chunk("c", "a.txt", vec![0.8, 0.2]),
        ]);

        let results = kb.search(&[1.0, 0.0], 2, 0.3);
        assert_eq!(results.len(), 2);
        assert!(results[0].similarity >= results[1].similarity);
    }

    #[test]
    fn test_search_threshold_is_exclusive() {
        // Identical unit vectors: similarity is exactly 1.0
        let kb = KnowledgeBase::from_chunks(vec![chunk("exact", "a.txt", vec![1.0, 0.0])]);

        assert!(kb.search(&[1.0, 0.0], 5, 1.0).is_empty());
        assert_eq!(kb.search(&[1.0, 0.0], 5, 0.99).len(), 1);
    }

    #[test]
    fn test_search_threshold_filters() {
        let kb = KnowledgeBase::from_chunks(vec![chunk("unrelated", "a.txt", vec![0.0, 1.0])]);
        assert!(kb.search(&[1.0, 0.0], 5, 0.3).is_empty());
    }

    #[test]
    fn test_document_count() {
        let kb = KnowledgeBase::from_chunks(vec![
            chunk("x", "a.txt", vec![1.0]),
            chunk("y", "a.txt", vec![1.0]),
            chunk("z", "b.txt", vec![1.0]),
        ]);
        assert_eq!(kb.document_count(), 2);
        assert_eq!(kb.chunk_count(), 3);
    }

    #[test]
    fn test_format_context_empty() {
        assert!(format_context(&[], 600).is_empty());
    }

    #[test]
    fn test_format_context_includes_sources() {
        let c = chunk("The little prince tends his rose.", "petit_prince.txt", vec![1.0]);
        let results = vec![Retrieved {
            chunk: &c,
            similarity: 0.9,
        }];

        let formatted = format_context(&results, 600);
        assert!(formatted.contains("Reference material:"));
        assert!(formatted.contains("Source: petit_prince.txt"));
        assert!(formatted.contains("tends his rose"));
    }

    #[test]
    fn test_format_context_budget_keeps_first() {
        let long = "x".repeat(500);
        let c1 = chunk(&long, "a.txt", vec![1.0]);
        let c2 = chunk(&long, "b.txt", vec![1.0]);
        let results = vec![
            Retrieved { chunk: &c1, similarity: 0.9 },
            Retrieved { chunk: &c2, similarity: 0.8 },
        ];

        let formatted = format_context(&results, 600);
        assert!(formatted.contains("a.txt"));
        assert!(!formatted.contains("b.txt"));
    }

    #[test]
    fn test_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.json");

        let chunks = vec![chunk("text", "doc.txt", vec![0.1, 0.2, 0.3])];
        write_cache(&path, &chunks).unwrap();

        let loaded = read_cache(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].source, "doc.txt");
        assert_eq!(loaded[0].embedding, vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_cache_missing_file() {
        assert!(read_cache(Path::new("/nonexistent/embeddings.json")).is_none());
    }

    #[test]
    fn test_cache_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(read_cache(&path).is_none());
    }

    #[test]
    fn test_collect_text_files_recursive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
        std::fs::write(dir.path().join("ignore.pdf"), "pdf").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b.txt"), "beta").unwrap();

        let files = collect_text_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.extension().unwrap() == "txt"));
    }
}
