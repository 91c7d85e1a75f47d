//! 질의 엔진 - query / rebuild 연산의 파사드
//!
//! HTTP나 CLI 같은 외부 쉘이 소비하는 두 연산을 제공합니다:
//! - `query(question)` → 추출형 답변 + 출처 목록
//! - `rebuild()` → 전체 인덱스 재생성 (하위 프로세스)
//!
//! 임베딩 모델과 인덱스 핸들은 프로세스 전역으로 지연 초기화되며,
//! rebuild 성공 시 세대 카운터가 증가하여 캐시된 상태가 무효화됩니다.
//! 진행 중인 질의는 자신이 잡은 세대의 상태로 끝까지 수행됩니다.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::RwLock;

use crate::config::RagConfig;
use crate::embedding::{EmbeddingProvider, FastEmbedProvider};
use crate::index::LanceIndex;
use crate::ingest;
use crate::retriever::answer::{self, Answer};
use crate::retriever::Retriever;

// ============================================================================
// RagEngine
// ============================================================================

/// 질의/재구축 엔진
pub struct RagEngine {
    config: RagConfig,
    state: RwLock<Option<Arc<EngineState>>>,
    generation: AtomicU64,
}

/// 로드된 모델 + 인덱스 (세대별 불변 스냅샷)
struct EngineState {
    generation: u64,
    retriever: Retriever,
}

impl RagEngine {
    /// 새 엔진 생성 (모델/인덱스는 첫 질의 때 로드)
    pub fn new(config: RagConfig) -> Self {
        Self {
            config,
            state: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// 엔진 설정
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// 질문에 대한 추출형 답변
    ///
    /// # Errors
    /// storage가 없으면 `RagError::IndexNotFound`, 매니페스트의 모델을
    /// 로드할 수 없으면 `RagError::ModelLoad`를 반환합니다.
    pub async fn query(&self, question: &str) -> Result<Answer> {
        let state = self.current_state().await?;
        let hits = state
            .retriever
            .retrieve(question, self.config.top_k)
            .await?;

        Ok(answer::assemble(&hits, self.config.top_k))
    }

    /// 인덱스 재구축
    ///
    /// 하위 ingest 프로세스가 성공하면 세대 카운터를 올려 다음 질의가
    /// 새 인덱스를 로드하게 합니다.
    pub async fn rebuild(&self) -> Result<()> {
        ingest::rebuild(&self.config).await?;

        self.generation.fetch_add(1, Ordering::Release);
        let mut guard = self.state.write().await;
        *guard = None;

        Ok(())
    }

    /// 현재 세대의 엔진 상태 (필요 시 로드)
    async fn current_state(&self) -> Result<Arc<EngineState>> {
        let generation = self.generation.load(Ordering::Acquire);

        {
            let guard = self.state.read().await;
            if let Some(state) = guard.as_ref() {
                if state.generation == generation {
                    return Ok(Arc::clone(state));
                }
            }
        }

        let mut guard = self.state.write().await;

        // 쓰기 락 대기 중에 다른 태스크가 로드를 끝냈을 수 있음
        let generation = self.generation.load(Ordering::Acquire);
        if let Some(state) = guard.as_ref() {
            if state.generation == generation {
                return Ok(Arc::clone(state));
            }
        }

        let state = Arc::new(self.load_state(generation).await?);
        *guard = Some(Arc::clone(&state));

        Ok(state)
    }

    /// 인덱스와 임베딩 모델 로드
    ///
    /// 인덱스를 먼저 열어 storage 부재를 모델 다운로드 없이 빠르게
    /// 보고합니다. 질의 임베딩은 매니페스트에 기록된 구축 시점 모델을
    /// 사용합니다.
    async fn load_state(&self, generation: u64) -> Result<EngineState> {
        let index = LanceIndex::open(&self.config.storage_dir).await?;

        let model_name = index.manifest().model.clone();
        let embedder =
            tokio::task::spawn_blocking(move || FastEmbedProvider::load(&model_name))
                .await
                .context("Embedding model load task failed")??;

        if embedder.dimension() != index.manifest().dimension {
            anyhow::bail!(
                "Index was built with dimension {} but model {} produces {}",
                index.manifest().dimension,
                index.manifest().model,
                embedder.dimension()
            );
        }

        tracing::info!(
            "Query engine ready (generation {}, {} chunks)",
            generation,
            index.manifest().chunk_count
        );

        Ok(EngineState {
            generation,
            retriever: Retriever::new(Arc::new(embedder), Arc::new(index)),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_query_missing_storage_fails_with_index_not_found() {
        let dir = TempDir::new().unwrap();
        let config = RagConfig {
            data_dir: dir.path().join("data"),
            storage_dir: dir.path().join("no-such-storage"),
            ..Default::default()
        };

        let engine = RagEngine::new(config);
        let err = engine.query("anything").await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<RagError>(),
            Some(RagError::IndexNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_rebuild_failure_surfaces_detail() {
        let dir = TempDir::new().unwrap();
        // 존재하지 않는 data 디렉토리로 하위 ingest가 실패함
        let config = RagConfig {
            data_dir: dir.path().join("no-such-data"),
            storage_dir: dir.path().join("storage"),
            ..Default::default()
        };

        let engine = RagEngine::new(config);
        let err = engine.rebuild().await.unwrap_err();

        match err.downcast_ref::<RagError>() {
            Some(RagError::RebuildFailed { detail }) => {
                assert!(!detail.is_empty());
            }
            other => panic!("expected RebuildFailed, got {:?}", other),
        }
    }
}
