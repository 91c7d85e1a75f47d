//! 검색 모듈 - 질문 임베딩 + top-K 최근접 이웃 검색
//!
//! 질문을 임베딩하여 인덱스를 검색하고, 거리 오름차순(관련성 높은 순)의
//! 청크 시퀀스를 반환합니다. 검색은 결정적입니다: 같은 (인덱스, 질문, K)는
//! 항상 같은 순서의 결과를 냅니다.

pub mod answer;

use std::sync::Arc;

use anyhow::Result;

use crate::embedding::EmbeddingProvider;
use crate::index::{ScoredChunk, VectorIndex};

// ============================================================================
// Retriever
// ============================================================================

/// top-K 청크 검색기
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    /// 새 검색기 생성
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// 질문으로 top-K 청크 검색
    ///
    /// 인덱스의 청크가 K개 미만이면 전부, 0개면 빈 시퀀스를 반환합니다.
    pub async fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<ScoredChunk>> {
        let query = self.embedder.embed(question).await?;
        let mut hits = self.index.search(&query, top_k).await?;

        hits.truncate(top_k);

        tracing::debug!("Retrieved {} chunks (top_k={})", hits.len(), top_k);
        Ok(hits)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{IndexManifest, LanceIndex, VectorEntry};
    use async_trait::async_trait;
    use chrono::Utc;
    use tempfile::TempDir;

    const DIM: usize = 4;

    /// 단어별 고정 벡터를 돌려주는 테스트용 임베더
    struct StubEmbedder;

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            Ok(stub_vector(text))
        }

        fn dimension(&self) -> usize {
            DIM
        }

        fn name(&self) -> &str {
            "stub-embedder"
        }
    }

    /// 텍스트를 결정적으로 4차원 벡터에 매핑
    fn stub_vector(text: &str) -> Vec<f32> {
        let mut v = [0.0f32; DIM];
        for (i, b) in text.bytes().enumerate() {
            v[i % DIM] += (b as f32) / 255.0;
        }
        v.to_vec()
    }

    async fn build_test_index(storage: &std::path::Path, texts: &[&str]) -> LanceIndex {
        let entries: Vec<VectorEntry> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| VectorEntry {
                chunk_id: i as i64,
                chunk_text: text.to_string(),
                source: Some(format!("src-{}", i)),
                embedding: stub_vector(text),
            })
            .collect();

        let manifest = IndexManifest {
            model: "stub-embedder".to_string(),
            dimension: DIM,
            chunk_size: 100,
            chunk_overlap: 10,
            chunk_count: entries.len(),
            created_at: Utc::now(),
        };

        LanceIndex::build(storage, manifest, &entries).await.unwrap()
    }

    #[tokio::test]
    async fn test_retrieve_returns_at_most_k() {
        let dir = TempDir::new().unwrap();
        let index = build_test_index(dir.path(), &["aaa", "bbb", "ccc", "ddd", "eee"]).await;

        let retriever = Retriever::new(Arc::new(StubEmbedder), Arc::new(index));
        let hits = retriever.retrieve("aaa", 2).await.unwrap();

        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_retrieve_exact_match_ranks_first() {
        let dir = TempDir::new().unwrap();
        let index = build_test_index(dir.path(), &["alpha", "bravo", "charlie"]).await;

        let retriever = Retriever::new(Arc::new(StubEmbedder), Arc::new(index));
        let hits = retriever.retrieve("bravo", 3).await.unwrap();

        assert_eq!(hits[0].chunk_text, "bravo");
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn test_retrieve_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let index = Arc::new(build_test_index(dir.path(), &["one", "two", "three"]).await);

        let retriever = Retriever::new(Arc::new(StubEmbedder), index);

        let first = retriever.retrieve("two", 3).await.unwrap();
        let second = retriever.retrieve("two", 3).await.unwrap();

        let ids =
            |hits: &[ScoredChunk]| hits.iter().map(|h| h.chunk_id).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }

    #[tokio::test]
    async fn test_retrieve_fewer_chunks_than_k() {
        let dir = TempDir::new().unwrap();
        let index = build_test_index(dir.path(), &["solo"]).await;

        let retriever = Retriever::new(Arc::new(StubEmbedder), Arc::new(index));
        let hits = retriever.retrieve("anything", 4).await.unwrap();

        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_retrieve_empty_index() {
        let dir = TempDir::new().unwrap();
        let index = build_test_index(dir.path(), &[]).await;

        let retriever = Retriever::new(Arc::new(StubEmbedder), Arc::new(index));
        let hits = retriever.retrieve("anything", 4).await.unwrap();

        assert!(hits.is_empty());
    }
}
