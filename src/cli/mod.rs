//! CLI 모듈
//!
//! docchat CLI 명령어 정의 및 구현. HTTP 쉘과 동일하게 query/rebuild
//! 연산 위의 얇은 전송 어댑터입니다.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::RagConfig;
use crate::engine::RagEngine;
use crate::index::LanceIndex;
use crate::ingest;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "docchat")]
#[command(version, about = "로컬 문서 QA 챗봇 (추출형 RAG)", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// data/ 디렉토리의 문서를 수집하여 벡터 인덱스 구축
    Ingest {
        /// 원본 문서 디렉토리 (기본: DATA_DIR 또는 ./data)
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// 인덱스 저장 디렉토리 (기본: STORAGE_DIR 또는 ./storage)
        #[arg(long)]
        storage_dir: Option<PathBuf>,
    },

    /// 질문에 대한 답변 검색
    Query {
        /// 질문
        question: String,

        /// 검색 결과 수 (기본: TOP_K 또는 4)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// JSON으로 출력
        #[arg(long)]
        json: bool,
    },

    /// 인덱스 재구축 (ingest를 하위 프로세스로 실행)
    Rebuild,

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ingest {
            data_dir,
            storage_dir,
        } => cmd_ingest(data_dir, storage_dir).await,
        Commands::Query {
            question,
            top_k,
            json,
        } => cmd_query(&question, top_k, json).await,
        Commands::Rebuild => cmd_rebuild().await,
        Commands::Status => cmd_status().await,
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 인덱스 구축 명령어 (ingest)
async fn cmd_ingest(data_dir: Option<PathBuf>, storage_dir: Option<PathBuf>) -> Result<()> {
    let mut config = RagConfig::from_env().context("설정 로드 실패")?;
    if let Some(dir) = data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = storage_dir {
        config.storage_dir = dir;
    }
    config.validate().context("설정 검증 실패")?;

    println!("[*] 문서 수집 중: {}", config.data_dir.display());
    println!("    모델: {}", config.embedding_model);
    println!(
        "    청크: {} 문자 (오버랩 {})",
        config.chunk_size, config.chunk_overlap
    );

    let stats = ingest::run(&config).await.context("ingest 실패")?;

    println!();
    println!("[OK] 인덱스 구축 완료: {}", config.storage_dir.display());
    println!(
        "     파일 {} 개 → 문서 {} 개 → 청크 {} 개",
        stats.files, stats.documents, stats.chunks
    );

    Ok(())
}

/// 질의 명령어 (query)
async fn cmd_query(question: &str, top_k: Option<usize>, json: bool) -> Result<()> {
    let mut config = RagConfig::from_env().context("설정 로드 실패")?;
    if let Some(k) = top_k {
        config.top_k = k;
    }
    config.validate().context("설정 검증 실패")?;

    let engine = RagEngine::new(config);
    let answer = engine.query(question).await.context("질의 실패")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    println!("[*] 질문: {}", question);
    println!();
    println!("{}", answer.answer);

    if !answer.sources.is_empty() {
        println!();
        println!("출처:");
        for source in &answer.sources {
            println!("  - {}", source);
        }
    }

    Ok(())
}

/// 재구축 명령어 (rebuild)
async fn cmd_rebuild() -> Result<()> {
    let config = RagConfig::from_env().context("설정 로드 실패")?;
    config.validate().context("설정 검증 실패")?;

    println!("[*] 인덱스 재구축 중...");

    let engine = RagEngine::new(config);
    engine.rebuild().await.context("재구축 실패")?;

    println!("[OK] 인덱스가 재구축되었습니다.");
    Ok(())
}

/// 상태 명령어 (status)
async fn cmd_status() -> Result<()> {
    let config = RagConfig::from_env().context("설정 로드 실패")?;

    println!("docchat v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("[*] 데이터 디렉토리: {}", config.data_dir.display());
    println!("[*] 인덱스 디렉토리: {}", config.storage_dir.display());
    println!("[*] 임베딩 모델: {}", config.embedding_model);
    println!("[*] TOP_K: {}", config.top_k);
    println!(
        "[*] 청크: {} 문자 (오버랩 {})",
        config.chunk_size, config.chunk_overlap
    );
    println!();

    match LanceIndex::open(&config.storage_dir).await {
        Ok(index) => {
            let manifest = index.manifest();
            println!("[OK] 인덱스: 청크 {} 개", manifest.chunk_count);
            println!(
                "     구축 모델: {} ({}차원)",
                manifest.model, manifest.dimension
            );
            println!(
                "     구축 시각: {}",
                manifest.created_at.format("%Y-%m-%d %H:%M")
            );
        }
        Err(e) => {
            println!("[!] 인덱스 없음: {}", e);
            println!("    `docchat ingest`로 인덱스를 생성하세요.");
        }
    }

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parses_query_with_top_k() {
        let cli = Cli::try_parse_from(["docchat", "query", "업무 시간은?", "-k", "2"]).unwrap();
        match cli.command {
            Commands::Query {
                question,
                top_k,
                json,
            } => {
                assert_eq!(question, "업무 시간은?");
                assert_eq!(top_k, Some(2));
                assert!(!json);
            }
            _ => panic!("expected query command"),
        }
    }

    #[test]
    fn test_cli_parses_ingest_with_dirs() {
        let cli = Cli::try_parse_from([
            "docchat",
            "ingest",
            "--data-dir",
            "corpus",
            "--storage-dir",
            "out",
        ])
        .unwrap();

        match cli.command {
            Commands::Ingest {
                data_dir,
                storage_dir,
            } => {
                assert_eq!(data_dir, Some(PathBuf::from("corpus")));
                assert_eq!(storage_dir, Some(PathBuf::from("out")));
            }
            _ => panic!("expected ingest command"),
        }
    }
}
