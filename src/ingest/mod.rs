//! Ingest 파이프라인 - 수집 → 추출 → 청킹 → 임베딩 → 인덱스 구축
//!
//! data/ 디렉토리의 문서 전체를 단일 벡터 인덱스로 변환합니다.
//! 모든 임베딩 작업은 storage/에 대한 첫 쓰기 이전에 완료됩니다.
//! 따라서 ingest가 어느 단계에서 실패하든 이전 인덱스는 보존됩니다.

use anyhow::{Context, Result};
use chrono::Utc;

use crate::chunker::{ChunkConfig, Chunker, WindowChunker};
use crate::collector::{CollectionStats, FileCollector};
use crate::config::RagConfig;
use crate::embedding::{EmbeddingProvider, FastEmbedProvider};
use crate::error::RagError;
use crate::extractor::{ContentExtractor, SourceDocument};
use crate::index::{IndexManifest, LanceIndex, VectorEntry};

// ============================================================================
// Ingest Stats
// ============================================================================

/// Ingest 실행 결과 통계
#[derive(Debug, Clone)]
pub struct IngestStats {
    /// 수집된 파일 수
    pub files: usize,
    /// 추출된 문서 수 (PDF는 페이지당 하나)
    pub documents: usize,
    /// 인덱스에 저장된 청크 수
    pub chunks: usize,
}

// ============================================================================
// Pipeline
// ============================================================================

/// 전체 ingest 파이프라인 실행
///
/// 설정된 임베딩 모델을 로드한 뒤 파이프라인을 수행합니다.
pub async fn run(config: &RagConfig) -> Result<IngestStats> {
    let model_name = config.embedding_model.clone();
    let embedder = tokio::task::spawn_blocking(move || FastEmbedProvider::load(&model_name))
        .await
        .context("Embedding model load task failed")??;

    run_with(config, &embedder).await
}

/// 주어진 임베더로 ingest 파이프라인 실행
pub async fn run_with(config: &RagConfig, embedder: &dyn EmbeddingProvider) -> Result<IngestStats> {
    config.validate()?;

    // 1. 파일 수집
    let collector = FileCollector::with_defaults();
    let files = collector.collect_directory(&config.data_dir)?;
    let file_stats = CollectionStats::from_files(&files);

    tracing::info!(
        "Ingesting {} files (text: {}, pdf: {}, docx: {})",
        file_stats.total_files,
        file_stats.text_files,
        file_stats.pdf_files,
        file_stats.docx_files
    );

    // 2. 텍스트 추출
    let extractor = ContentExtractor::new();
    let mut documents: Vec<SourceDocument> = Vec::new();
    for file in &files {
        let docs = extractor
            .extract(file)
            .await
            .with_context(|| format!("Failed to extract content from {:?}", file.path))?;
        documents.extend(docs);
    }

    if documents.is_empty() {
        return Err(RagError::EmptyCorpus {
            path: config.data_dir.clone(),
        }
        .into());
    }

    // 3. 청킹 (문서 내 순서 보존)
    let chunker = WindowChunker::new(ChunkConfig {
        chunk_size: config.chunk_size,
        chunk_overlap: config.chunk_overlap,
    });

    let mut chunk_texts: Vec<String> = Vec::new();
    let mut chunk_sources: Vec<String> = Vec::new();
    for doc in &documents {
        for chunk in chunker.chunk(&doc.text) {
            chunk_texts.push(chunk);
            chunk_sources.push(doc.source.clone());
        }
    }

    tracing::info!(
        "Chunked {} documents into {} chunks (size {}, overlap {})",
        documents.len(),
        chunk_texts.len(),
        config.chunk_size,
        config.chunk_overlap
    );

    // 4. 임베딩 - 전부 메모리에 준비될 때까지 storage는 건드리지 않음
    let embeddings = embedder
        .embed_batch(&chunk_texts)
        .await
        .context("Failed to embed chunks")?;

    let entries: Vec<VectorEntry> = chunk_texts
        .into_iter()
        .zip(chunk_sources)
        .zip(embeddings)
        .enumerate()
        .map(|(i, ((chunk_text, source), embedding))| VectorEntry {
            chunk_id: i as i64,
            chunk_text,
            source: Some(source),
            embedding,
        })
        .collect();

    // 5. 인덱스 구축 (기존 인덱스 교체)
    let manifest = IndexManifest {
        model: embedder.name().to_string(),
        dimension: embedder.dimension(),
        chunk_size: config.chunk_size,
        chunk_overlap: config.chunk_overlap,
        chunk_count: entries.len(),
        created_at: Utc::now(),
    };

    LanceIndex::build(&config.storage_dir, manifest, &entries).await?;

    Ok(IngestStats {
        files: files.len(),
        documents: documents.len(),
        chunks: entries.len(),
    })
}

// ============================================================================
// Rebuild
// ============================================================================

/// 인덱스 재구축
///
/// 전체 ingest 파이프라인을 하위 프로세스로 실행합니다. 0이 아닌 종료
/// 코드는 캡처된 stderr와 함께 `RagError::RebuildFailed`로 보고됩니다.
pub async fn rebuild(config: &RagConfig) -> Result<(), RagError> {
    let exe = std::env::current_exe().map_err(|e| RagError::RebuildFailed {
        detail: format!("cannot resolve current executable: {}", e),
    })?;

    tracing::info!("Spawning ingest subprocess for rebuild");

    let output = tokio::process::Command::new(exe)
        .arg("ingest")
        .arg("--data-dir")
        .arg(&config.data_dir)
        .arg("--storage-dir")
        .arg(&config.storage_dir)
        .env("EMBEDDING_MODEL", &config.embedding_model)
        .env("CHUNK_SIZE", config.chunk_size.to_string())
        .env("CHUNK_OVERLAP", config.chunk_overlap.to_string())
        .output()
        .await
        .map_err(|e| RagError::RebuildFailed {
            detail: format!("failed to spawn ingest process: {}", e),
        })?;

    if !output.status.success() {
        return Err(RagError::RebuildFailed {
            detail: subprocess_diagnostic(&output),
        });
    }

    tracing::info!("Rebuild completed");
    Ok(())
}

/// 하위 프로세스 실패 진단 문자열 (stderr 마지막 줄들)
fn subprocess_diagnostic(output: &std::process::Output) -> String {
    let status = output
        .status
        .code()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "killed by signal".to_string());

    let stderr = String::from_utf8_lossy(&output.stderr);
    let tail: Vec<&str> = stderr
        .lines()
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .take(10)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    if tail.is_empty() {
        format!("ingest exited with status {}", status)
    } else {
        format!("ingest exited with status {}: {}", status, tail.join("\n"))
    }
}

// ============================================================================
// Tests
// ============================================================================
