//! 콘텐츠 추출 모듈
//!
//! 수집된 파일에서 텍스트를 추출하여 SourceDocument 시퀀스를 만듭니다.
//! - 텍스트/마크다운: UTF-8로 직접 읽기
//! - PDF: 페이지 단위 추출 (페이지당 문서 하나)
//! - DOCX: 문단 텍스트 추출
//!
//! 추출된 모든 문서는 원본 파일 경로를 source 메타데이터로 가집니다.

pub mod docx;
pub mod pdf;

use std::path::Path;

use anyhow::{Context, Result};

use crate::collector::{CollectedFile, FileFormat};

// ============================================================================
// Source Document
// ============================================================================

/// 추출된 원본 문서
///
/// 청킹의 입력 단위입니다. 청킹 후에는 폐기됩니다.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// 추출된 텍스트
    pub text: String,
    /// 원본 파일 경로 (PDF는 페이지 번호 포함)
    pub source: String,
}

// ============================================================================
// Content Extractor
// ============================================================================

/// 콘텐츠 추출기
///
/// FileFormat 별로 고정된 추출 함수에 디스패치합니다.
#[derive(Debug, Default)]
pub struct ContentExtractor;

impl ContentExtractor {
    /// 새 추출기 생성
    pub fn new() -> Self {
        Self
    }

    /// 파일에서 문서 추출
    ///
    /// PDF는 페이지당 하나의 SourceDocument를 반환합니다.
    /// 추출 결과가 공백뿐인 문서는 버려집니다.
    pub async fn extract(&self, file: &CollectedFile) -> Result<Vec<SourceDocument>> {
        let docs = match file.format {
            FileFormat::Text => self.extract_text(&file.path).await?,
            FileFormat::Pdf => self.extract_pdf(&file.path).await?,
            FileFormat::Docx => self.extract_docx(&file.path).await?,
        };

        Ok(docs
            .into_iter()
            .filter(|d| !d.text.trim().is_empty())
            .collect())
    }

    /// 텍스트 파일에서 추출
    async fn extract_text(&self, path: &Path) -> Result<Vec<SourceDocument>> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read text file: {:?}", path))?;

        Ok(vec![SourceDocument {
            text,
            source: path.display().to_string(),
        }])
    }

    /// PDF 파일에서 추출 (페이지당 문서 하나)
    async fn extract_pdf(&self, path: &Path) -> Result<Vec<SourceDocument>> {
        // PDF 추출은 CPU 바운드이므로 spawn_blocking 사용
        let owned = path.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || pdf::extract_pdf_pages(&owned))
            .await
            .context("PDF extraction task failed")??;

        let source = path.display().to_string();

        Ok(pages
            .into_iter()
            .map(|(page, text)| SourceDocument {
                text,
                source: format!("{}#page={}", source, page),
            })
            .collect())
    }

    /// DOCX 파일에서 추출
    async fn extract_docx(&self, path: &Path) -> Result<Vec<SourceDocument>> {
        let owned = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || docx::extract_docx_text(&owned))
            .await
            .context("DOCX extraction task failed")??;

        Ok(vec![SourceDocument {
            text,
            source: path.display().to_string(),
        }])
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_extract_text_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("note.md");
        std::fs::write(&path, "# Title\n\nBody text.").unwrap();

        let file = CollectedFile::from_path(path.clone()).unwrap().unwrap();
        let extractor = ContentExtractor::new();
        let docs = extractor.extract(&file).await.unwrap();

        assert_eq!(docs.len(), 1);
        assert!(docs[0].text.contains("Body text."));
        assert_eq!(docs[0].source, path.display().to_string());
    }

    #[tokio::test]
    async fn test_extract_drops_blank_documents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blank.txt");
        std::fs::write(&path, "   \n\t\n").unwrap();

        let file = CollectedFile::from_path(path).unwrap().unwrap();
        let extractor = ContentExtractor::new();
        let docs = extractor.extract(&file).await.unwrap();

        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_extract_missing_file_fails() {
        let file = CollectedFile {
            path: std::path::PathBuf::from("/nonexistent/docchat.txt"),
            format: FileFormat::Text,
            size: 0,
        };

        let extractor = ContentExtractor::new();
        assert!(extractor.extract(&file).await.is_err());
    }
}
