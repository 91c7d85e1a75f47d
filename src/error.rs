//! 에러 타입 정의
//!
//! 파이프라인의 치명적 실패 유형을 열거합니다.
//! 재시도는 어디에도 없습니다 - 모든 실패는 호출자에게 동기적으로 보고됩니다.
//! 검색 결과가 비어있는 것은 에러가 아닙니다 ("I don't know." 응답).

use std::path::PathBuf;

use thiserror::Error;

/// RAG 파이프라인 에러
#[derive(Debug, Error)]
pub enum RagError {
    /// 벡터 인덱스가 없거나 손상됨 (query의 전제조건 위반)
    #[error("vector index not found at {path:?} (run `docchat ingest` first)")]
    IndexNotFound { path: PathBuf },

    /// 임베딩 모델을 해석하거나 로드할 수 없음
    #[error("embedding model {model:?} could not be loaded: {reason}")]
    ModelLoad { model: String, reason: String },

    /// 수집 대상 디렉토리에서 문서를 하나도 찾지 못함
    #[error("no documents found under {path:?} (add PDF/DOCX/TXT files and rerun)")]
    EmptyCorpus { path: PathBuf },

    /// 하위 ingest 프로세스가 0이 아닌 코드로 종료됨
    #[error("index rebuild failed: {detail}")]
    RebuildFailed { detail: String },
}

// ============================================================================
// Tests
// ============================================================================
