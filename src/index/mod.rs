//! 벡터 인덱스 모듈 - 타입, 트레이트, 매니페스트
//!
//! 인덱스는 ingest가 한 번에 구축하고 디스크에 영속화하며, 질의 시점에는
//! 읽기 전용으로 로드됩니다. 재구축 시 전체가 교체됩니다.

mod lance;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use lance::LanceIndex;

// ============================================================================
// Types
// ============================================================================

/// 인덱스 저장 단위 (청크 + 임베딩)
#[derive(Debug, Clone)]
pub struct VectorEntry {
    /// 청크 ID (ingest 순서대로 0부터 부여)
    pub chunk_id: i64,
    /// 청크 텍스트
    pub chunk_text: String,
    /// 원본 문서 경로 (없을 수 있음)
    pub source: Option<String>,
    /// 임베딩 벡터
    pub embedding: Vec<f32>,
}

/// 검색 결과 청크
///
/// distance는 작을수록 관련성이 높습니다 (L2 거리).
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// 청크 ID
    pub chunk_id: i64,
    /// 청크 텍스트
    pub chunk_text: String,
    /// 원본 문서 경로
    pub source: Option<String>,
    /// 쿼리 벡터와의 거리
    pub distance: f32,
}

/// 인덱스 매니페스트 (storage/manifest.json)
///
/// 구축 시 사용된 모델과 파라미터를 기록합니다. 로드 시 구조적 파싱만
/// 수행하며 무결성 검증은 하지 않습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    /// 임베딩 모델 식별자
    pub model: String,
    /// 임베딩 차원
    pub dimension: usize,
    /// 청크 크기 (문자 수)
    pub chunk_size: usize,
    /// 청크 오버랩 (문자 수)
    pub chunk_overlap: usize,
    /// 저장된 청크 수
    pub chunk_count: usize,
    /// 구축 시각
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// VectorIndex Trait
// ============================================================================

/// 벡터 인덱스 검색 인터페이스
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// K-최근접 이웃 검색
    ///
    /// 거리 오름차순으로 최대 limit개의 청크를 반환합니다.
    /// 인덱스의 청크가 limit보다 적으면 전부 반환합니다.
    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredChunk>>;

    /// 저장된 청크 수
    async fn count(&self) -> Result<usize>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_json_roundtrip() {
        let manifest = IndexManifest {
            model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            dimension: 384,
            chunk_size: 800,
            chunk_overlap: 120,
            chunk_count: 42,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&manifest).unwrap();
        let parsed: IndexManifest = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.model, manifest.model);
        assert_eq!(parsed.dimension, 384);
        assert_eq!(parsed.chunk_count, 42);
    }

    #[test]
    fn test_manifest_rejects_malformed_json() {
        let result = serde_json::from_str::<IndexManifest>("{\"model\": 1}");
        assert!(result.is_err());
    }
}
