//! 설정 모듈 - 환경변수 기반 파이프라인 설정
//!
//! 모든 항목은 선택적이며 기본값을 가집니다:
//! - `TOP_K`: 검색 결과 수 (기본 4)
//! - `EMBEDDING_MODEL`: 임베딩 모델 식별자 (기본 all-MiniLM-L6-v2)
//! - `CHUNK_SIZE` / `CHUNK_OVERLAP`: 청킹 파라미터 (기본 800 / 120, 문자 수)
//! - `DATA_DIR` / `STORAGE_DIR`: 원본 문서 / 인덱스 디렉토리 (기본 data / storage)

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// 기본 임베딩 모델 식별자
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// 기본 검색 결과 수
pub const DEFAULT_TOP_K: usize = 4;

/// 기본 청크 크기 (문자 수)
pub const DEFAULT_CHUNK_SIZE: usize = 800;

/// 기본 청크 오버랩 (문자 수)
pub const DEFAULT_CHUNK_OVERLAP: usize = 120;

// ============================================================================
// RagConfig
// ============================================================================

/// 파이프라인 설정
#[derive(Debug, Clone)]
pub struct RagConfig {
    /// 검색 결과 수 (K)
    pub top_k: usize,
    /// 임베딩 모델 식별자
    pub embedding_model: String,
    /// 청크 크기 (문자 수)
    pub chunk_size: usize,
    /// 청크 오버랩 (문자 수)
    pub chunk_overlap: usize,
    /// 원본 문서 디렉토리
    pub data_dir: PathBuf,
    /// 인덱스 저장 디렉토리
    pub storage_dir: PathBuf,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            data_dir: PathBuf::from("data"),
            storage_dir: PathBuf::from("storage"),
        }
    }
}

impl RagConfig {
    /// 환경변수에서 설정 로드
    ///
    /// 미설정 변수는 기본값을 사용합니다. 설정되었지만 파싱할 수 없는
    /// 정수 값은 에러입니다.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            top_k: env_usize("TOP_K", defaults.top_k)?,
            embedding_model: env_string("EMBEDDING_MODEL", &defaults.embedding_model),
            chunk_size: env_usize("CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: env_usize("CHUNK_OVERLAP", defaults.chunk_overlap)?,
            data_dir: env_path("DATA_DIR", &defaults.data_dir),
            storage_dir: env_path("STORAGE_DIR", &defaults.storage_dir),
        })
    }

    /// 설정 유효성 검사
    ///
    /// 청크 오버랩은 청크 크기보다 작아야 하고, top_k는 1 이상이어야 합니다.
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            anyhow::bail!("TOP_K must be at least 1");
        }
        if self.chunk_size == 0 {
            anyhow::bail!("CHUNK_SIZE must be at least 1");
        }
        if self.chunk_overlap >= self.chunk_size {
            anyhow::bail!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                self.chunk_overlap,
                self.chunk_size
            );
        }
        if self.embedding_model.trim().is_empty() {
            anyhow::bail!("EMBEDDING_MODEL must not be empty");
        }
        Ok(())
    }
}

// ============================================================================
// Env Helpers
// ============================================================================

/// 환경변수에서 usize 읽기 (미설정 시 기본값)
fn env_usize(name: &str, default: usize) -> Result<usize> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<usize>()
            .with_context(|| format!("Invalid integer in {}: {:?}", name, raw)),
        _ => Ok(default),
    }
}

/// 환경변수에서 문자열 읽기 (미설정 시 기본값)
fn env_string(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().to_string(),
        _ => default.to_string(),
    }
}

/// 환경변수에서 경로 읽기 (미설정 시 기본값)
fn env_path(name: &str, default: &Path) -> PathBuf {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => PathBuf::from(raw.trim()),
        _ => default.to_path_buf(),
    }
}

// ============================================================================
// Tests
// ============================================================================
