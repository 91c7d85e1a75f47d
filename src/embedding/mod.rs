//! 임베딩 모듈 - FastEmbed 로컬 텍스트 벡터화
//!
//! 텍스트를 고정 차원 벡터로 변환합니다. fastembed의 번들 ONNX 모델을
//! 프로세스당 한 번 로드하며, 추론은 결정적입니다 (같은 모델 + 같은
//! 텍스트 = 같은 벡터). 벡터 정규화는 이 모듈의 책임이 아닙니다.
//!
//! ref: https://github.com/Anush008/fastembed-rs

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use crate::error::RagError;

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 텍스트를 벡터로 변환하는 인터페이스입니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 배치 임베딩 (기본 구현: 순차 호출)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// 임베딩 차원 수
    fn dimension(&self) -> usize;

    /// 모델 식별자
    fn name(&self) -> &str;
}

// ============================================================================
// Model Resolution
// ============================================================================

/// 지원 모델 테이블: (정규 식별자, fastembed 모델, 차원)
///
/// 식별자는 HuggingFace 저장소 이름을 따릅니다.
const SUPPORTED_MODELS: &[(&str, EmbeddingModel, usize)] = &[
    (
        "sentence-transformers/all-MiniLM-L6-v2",
        EmbeddingModel::AllMiniLML6V2,
        384,
    ),
    (
        "sentence-transformers/all-MiniLM-L12-v2",
        EmbeddingModel::AllMiniLML12V2,
        384,
    ),
    ("BAAI/bge-small-en-v1.5", EmbeddingModel::BGESmallENV15, 384),
    ("BAAI/bge-base-en-v1.5", EmbeddingModel::BGEBaseENV15, 768),
    ("BAAI/bge-large-en-v1.5", EmbeddingModel::BGELargeENV15, 1024),
    (
        "nomic-ai/nomic-embed-text-v1.5",
        EmbeddingModel::NomicEmbedTextV15,
        768,
    ),
    (
        "intfloat/multilingual-e5-small",
        EmbeddingModel::MultilingualE5Small,
        384,
    ),
];

/// 모델 식별자 해석
///
/// 전체 식별자("sentence-transformers/all-MiniLM-L6-v2") 또는 저장소 없는
/// 짧은 이름("all-MiniLM-L6-v2")을 대소문자 무시로 받습니다.
pub fn resolve_model(name: &str) -> Option<(&'static str, EmbeddingModel, usize)> {
    let wanted = name.trim().to_lowercase();

    SUPPORTED_MODELS
        .iter()
        .find(|(canonical, _, _)| {
            let lower = canonical.to_lowercase();
            let short = lower.rsplit('/').next().unwrap_or_default();
            lower == wanted || short == wanted
        })
        .map(|(canonical, model, dim)| (*canonical, model.clone(), *dim))
}

/// 지원 모델 식별자 목록 (에러 메시지용)
pub fn supported_model_names() -> Vec<&'static str> {
    SUPPORTED_MODELS.iter().map(|(name, _, _)| *name).collect()
}

/// 모델 캐시 디렉토리 (~/.cache/docchat/models)
fn model_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docchat")
        .join("models")
}

// ============================================================================
// FastEmbedProvider
// ============================================================================

/// FastEmbed 로컬 임베딩 구현체
///
/// fastembed의 embed는 &mut self를 요구하므로 모델을 Mutex로 감싸고,
/// CPU 바운드 추론은 spawn_blocking에서 수행합니다.
pub struct FastEmbedProvider {
    model: Arc<Mutex<TextEmbedding>>,
    model_name: &'static str,
    dimension: usize,
}

impl FastEmbedProvider {
    /// 이름으로 모델 로드
    ///
    /// 모델 초기화는 블로킹 작업입니다 (최초 실행 시 모델 다운로드 포함).
    /// async 경로에서는 spawn_blocking으로 감싸서 호출하세요.
    ///
    /// # Errors
    /// 식별자를 해석할 수 없거나 모델 초기화에 실패하면
    /// `RagError::ModelLoad`를 반환합니다.
    pub fn load(name: &str) -> Result<Self, RagError> {
        let (canonical, model, dimension) =
            resolve_model(name).ok_or_else(|| RagError::ModelLoad {
                model: name.to_string(),
                reason: format!(
                    "unknown model identifier; supported: {}",
                    supported_model_names().join(", ")
                ),
            })?;

        let options = InitOptions::new(model)
            .with_cache_dir(model_cache_dir())
            .with_show_download_progress(false);

        let embedding = TextEmbedding::try_new(options).map_err(|e| RagError::ModelLoad {
            model: canonical.to_string(),
            reason: e.to_string(),
        })?;

        tracing::info!("Loaded embedding model {} (dimension {})", canonical, dimension);

        Ok(Self {
            model: Arc::new(Mutex::new(embedding)),
            model_name: canonical,
            dimension,
        })
    }

    /// 블로킹 배치 임베딩 (spawn_blocking 내부용)
    fn embed_blocking(model: &Arc<Mutex<TextEmbedding>>, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut guard = model
            .lock()
            .map_err(|e| anyhow::anyhow!("Embedding model lock poisoned: {}", e))?;

        guard
            .embed(texts, None)
            .map_err(|e| anyhow::anyhow!("Embedding inference failed: {}", e))
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let texts = vec![text.to_string()];
        let mut vectors = self.embed_batch(&texts).await?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Model returned no embedding"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let model = Arc::clone(&self.model);
        let owned = texts.to_vec();
        let expected = texts.len();

        let vectors = tokio::task::spawn_blocking(move || Self::embed_blocking(&model, owned))
            .await
            .map_err(|e| anyhow::anyhow!("Embedding task failed: {}", e))??;

        if vectors.len() != expected {
            anyhow::bail!(
                "Model returned {} embeddings for {} inputs",
                vectors.len(),
                expected
            );
        }

        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        self.model_name
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model_canonical_name() {
        let (canonical, _, dim) =
            resolve_model("sentence-transformers/all-MiniLM-L6-v2").unwrap();
        assert_eq!(canonical, "sentence-transformers/all-MiniLM-L6-v2");
        assert_eq!(dim, 384);
    }

    #[test]
    fn test_resolve_model_short_name_case_insensitive() {
        assert!(resolve_model("all-minilm-l6-v2").is_some());
        assert!(resolve_model("ALL-MINILM-L6-V2").is_some());
        assert!(resolve_model("bge-base-en-v1.5").is_some());
    }

    #[test]
    fn test_resolve_model_unknown() {
        assert!(resolve_model("no-such-model").is_none());
        assert!(resolve_model("").is_none());
    }

    #[test]
    fn test_default_model_is_supported() {
        assert!(resolve_model(crate::config::DEFAULT_EMBEDDING_MODEL).is_some());
    }

    #[test]
    fn test_load_unknown_model_fails_with_model_load_error() {
        let result = FastEmbedProvider::load("no-such-model");
        match result {
            Err(RagError::ModelLoad { model, reason }) => {
                assert_eq!(model, "no-such-model");
                assert!(reason.contains("sentence-transformers/all-MiniLM-L6-v2"));
            }
            _ => panic!("expected ModelLoad error"),
        }
    }
}
