//! LanceDB 벡터 인덱스 구현
//!
//! Apache Arrow 기반 columnar 저장소인 LanceDB에 청크 페이로드와
//! 임베딩을 저장하고 최근접 이웃 검색을 수행합니다.
//! ref: https://lancedb.github.io/lancedb/
//!
//! 저장 레이아웃:
//! - storage/manifest.json  - 모델/파라미터 기록
//! - storage/index.lance/   - LanceDB 데이터베이스 (chunks 테이블)

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_array::{
    Array, FixedSizeListArray, Float32Array, Int64Array, RecordBatch, RecordBatchIterator,
    StringArray,
};
use arrow_schema::{DataType, Field, Schema};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};

use crate::error::RagError;

use super::{IndexManifest, ScoredChunk, VectorEntry, VectorIndex};

/// 청크 테이블 이름
const TABLE_NAME: &str = "chunks";

/// 매니페스트 파일 이름
const MANIFEST_FILE: &str = "manifest.json";

/// LanceDB 데이터베이스 디렉토리 이름
const INDEX_DIR: &str = "index.lance";

// ============================================================================
// LanceIndex
// ============================================================================

/// LanceDB 벡터 인덱스
///
/// build로 생성되거나 open으로 로드된 핸들입니다. 거리 척도는 LanceDB
/// 기본값인 L2이며 구축 시점에 고정됩니다.
pub struct LanceIndex {
    db: Connection,
    manifest: IndexManifest,
}

impl LanceIndex {
    /// 인덱스 구축
    ///
    /// 전체 (청크, 벡터) 집합을 받아 기존 인덱스를 통째로 교체합니다.
    /// 이 함수에 진입하기 전까지는 storage 디렉토리에 아무것도 쓰지
    /// 않아야 합니다 - 실패한 ingest가 이전 인덱스를 보존하는 근거입니다.
    pub async fn build(
        storage_dir: &Path,
        manifest: IndexManifest,
        entries: &[VectorEntry],
    ) -> Result<Self> {
        for entry in entries {
            if entry.embedding.len() != manifest.dimension {
                anyhow::bail!(
                    "Chunk {} has embedding dimension {} (expected {})",
                    entry.chunk_id,
                    entry.embedding.len(),
                    manifest.dimension
                );
            }
        }

        // 이전 인덱스 제거 후 새로 생성
        if storage_dir.exists() {
            tokio::fs::remove_dir_all(storage_dir)
                .await
                .with_context(|| format!("Failed to clear storage dir: {:?}", storage_dir))?;
        }
        tokio::fs::create_dir_all(storage_dir)
            .await
            .with_context(|| format!("Failed to create storage dir: {:?}", storage_dir))?;

        let db = connect_db(&storage_dir.join(INDEX_DIR)).await?;

        let schema = Arc::new(Self::schema(manifest.dimension));
        let table = db
            .create_empty_table(TABLE_NAME, schema.clone())
            .execute()
            .await
            .context("Failed to create chunks table")?;

        if !entries.is_empty() {
            let batch = Self::entries_to_batch(entries, &schema)?;
            let batches = RecordBatchIterator::new(vec![Ok(batch)], schema.clone());
            table
                .add(batches)
                .execute()
                .await
                .context("Failed to write chunks to table")?;
        }

        // 매니페스트는 테이블이 완성된 뒤 마지막에 기록
        let manifest_json = serde_json::to_string_pretty(&manifest)
            .context("Failed to serialize index manifest")?;
        tokio::fs::write(storage_dir.join(MANIFEST_FILE), manifest_json)
            .await
            .context("Failed to write index manifest")?;

        tracing::info!(
            "Built vector index at {:?} ({} chunks, dimension {})",
            storage_dir,
            entries.len(),
            manifest.dimension
        );

        Ok(Self { db, manifest })
    }

    /// 인덱스 로드 (읽기 전용)
    ///
    /// # Errors
    /// 디렉토리가 없거나 매니페스트/테이블이 손상된 경우
    /// `RagError::IndexNotFound`를 반환합니다.
    pub async fn open(storage_dir: &Path) -> Result<Self> {
        if !storage_dir.is_dir() {
            return Err(not_found(storage_dir));
        }

        let manifest_raw = tokio::fs::read_to_string(storage_dir.join(MANIFEST_FILE))
            .await
            .map_err(|_| not_found(storage_dir))?;
        let manifest: IndexManifest =
            serde_json::from_str(&manifest_raw).map_err(|_| not_found(storage_dir))?;

        let index_path = storage_dir.join(INDEX_DIR);
        if !index_path.is_dir() {
            return Err(not_found(storage_dir));
        }

        let db = connect_db(&index_path).await?;

        let tables = db
            .table_names()
            .execute()
            .await
            .context("Failed to list index tables")?;
        if !tables.contains(&TABLE_NAME.to_string()) {
            return Err(not_found(storage_dir));
        }

        tracing::debug!(
            "Opened vector index at {:?} ({} chunks)",
            storage_dir,
            manifest.chunk_count
        );

        Ok(Self { db, manifest })
    }

    /// 인덱스 매니페스트
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    /// 청크 테이블 스키마
    fn schema(dimension: usize) -> Schema {
        Schema::new(vec![
            Field::new("chunk_id", DataType::Int64, false),
            Field::new("chunk_text", DataType::Utf8, false),
            Field::new("source", DataType::Utf8, true),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimension as i32,
                ),
                false,
            ),
        ])
    }

    /// 엔트리들을 Arrow RecordBatch로 변환
    fn entries_to_batch(entries: &[VectorEntry], schema: &Arc<Schema>) -> Result<RecordBatch> {
        let dimension = entries
            .first()
            .map(|e| e.embedding.len())
            .unwrap_or_default();

        let chunk_ids: Vec<i64> = entries.iter().map(|e| e.chunk_id).collect();
        let chunk_texts: Vec<&str> = entries.iter().map(|e| e.chunk_text.as_str()).collect();
        let sources: Vec<Option<&str>> = entries.iter().map(|e| e.source.as_deref()).collect();

        let embeddings_flat: Vec<f32> = entries
            .iter()
            .flat_map(|e| e.embedding.iter().copied())
            .collect();

        let values = Float32Array::from(embeddings_flat);
        let item_field = Arc::new(Field::new("item", DataType::Float32, true));
        let embeddings = FixedSizeListArray::try_new(
            item_field,
            dimension as i32,
            Arc::new(values) as Arc<dyn Array>,
            None,
        )
        .context("Failed to build embedding array")?;

        RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Int64Array::from(chunk_ids)),
                Arc::new(StringArray::from(chunk_texts)),
                Arc::new(StringArray::from(sources)),
                Arc::new(embeddings),
            ],
        )
        .context("Failed to build RecordBatch")
    }
}

#[async_trait]
impl VectorIndex for LanceIndex {
    async fn search(&self, query: &[f32], limit: usize) -> Result<Vec<ScoredChunk>> {
        if query.len() != self.manifest.dimension {
            anyhow::bail!(
                "Query vector dimension {} does not match index dimension {}",
                query.len(),
                self.manifest.dimension
            );
        }

        if limit == 0 {
            return Ok(vec![]);
        }

        let table = self
            .db
            .open_table(TABLE_NAME)
            .execute()
            .await
            .context("Failed to open chunks table for search")?;

        let stream = table
            .vector_search(query.to_vec())
            .context("Failed to create vector search")?
            .limit(limit)
            .execute()
            .await
            .context("Failed to execute vector search")?;

        let batches: Vec<RecordBatch> = stream.try_collect().await?;

        let mut results = Vec::new();

        for batch in batches {
            let chunk_ids = batch
                .column_by_name("chunk_id")
                .and_then(|c| c.as_any().downcast_ref::<Int64Array>())
                .ok_or_else(|| anyhow::anyhow!("Missing chunk_id column"))?;

            let chunk_texts = batch
                .column_by_name("chunk_text")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow::anyhow!("Missing chunk_text column"))?;

            let sources = batch
                .column_by_name("source")
                .and_then(|c| c.as_any().downcast_ref::<StringArray>())
                .ok_or_else(|| anyhow::anyhow!("Missing source column"))?;

            // _distance 컬럼은 LanceDB가 자동 추가 (L2, 오름차순이 최상)
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| anyhow::anyhow!("Missing _distance column"))?;

            for i in 0..batch.num_rows() {
                let source = if sources.is_null(i) {
                    None
                } else {
                    Some(sources.value(i).to_string())
                };

                results.push(ScoredChunk {
                    chunk_id: chunk_ids.value(i),
                    chunk_text: chunk_texts.value(i).to_string(),
                    source,
                    distance: distances.value(i),
                });
            }
        }

        // 배치 경계와 무관하게 거리 오름차순 보장 (stable sort - 동률은 삽입 순서 유지)
        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);

        Ok(results)
    }

    async fn count(&self) -> Result<usize> {
        let table = self
            .db
            .open_table(TABLE_NAME)
            .execute()
            .await
            .context("Failed to open chunks table for count")?;

        table.count_rows(None).await.context("Failed to count rows")
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// LanceDB 연결
async fn connect_db(path: &Path) -> Result<Connection> {
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Invalid path encoding: {:?}", path))?;

    lancedb::connect(path_str)
        .execute()
        .await
        .context("Failed to connect to LanceDB")
}

/// IndexNotFound 에러 생성
fn not_found(storage_dir: &Path) -> anyhow::Error {
    RagError::IndexNotFound {
        path: PathBuf::from(storage_dir),
    }
    .into()
}

// ============================================================================
// Tests
// ============================================================================
