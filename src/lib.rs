//! docchat - 로컬 문서 QA 챗봇
//!
//! data/ 디렉토리의 문서(PDF/DOCX/TXT/MD)를 청킹·임베딩하여 LanceDB
//! 벡터 인덱스로 구축하고, 질문과 가장 가까운 top-K 청크를 이어붙인
//! 추출형 답변을 반환합니다. 생성 모델은 사용하지 않습니다.

pub mod chunker;
pub mod cli;
pub mod collector;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod index;
pub mod ingest;
pub mod retriever;

// Re-exports
pub use chunker::{default_chunker, window_chunker, ChunkConfig, Chunker, WindowChunker};
pub use collector::{CollectedFile, CollectionStats, CollectorConfig, FileCollector, FileFormat};
pub use config::RagConfig;
pub use embedding::{EmbeddingProvider, FastEmbedProvider};
pub use engine::RagEngine;
pub use error::RagError;
pub use extractor::{ContentExtractor, SourceDocument};
pub use index::{IndexManifest, LanceIndex, ScoredChunk, VectorEntry, VectorIndex};
pub use ingest::IngestStats;
pub use retriever::answer::{Answer, NO_ANSWER};
pub use retriever::Retriever;
