//! PDF 텍스트 추출
//!
//! pdf-extract 크레이트로 전체 텍스트를 추출한 뒤 페이지 단위로 분리합니다.

use std::path::Path;

use anyhow::{Context, Result};

/// PDF에서 페이지별 텍스트 추출
///
/// (페이지 번호, 텍스트) 튜플 벡터를 반환합니다. 페이지 번호는 1부터
/// 시작합니다. 텍스트가 없는 PDF(스캔본 등)는 빈 벡터를 반환합니다.
pub fn extract_pdf_pages(path: &Path) -> Result<Vec<(usize, String)>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read PDF: {:?}", path))?;

    let text = pdf_extract::extract_text_from_mem(&bytes)
        .with_context(|| format!("Failed to extract text from PDF: {:?}", path))?;

    if text.trim().is_empty() {
        tracing::warn!(
            "No text extracted from PDF: {:?}. It might be a scanned document.",
            path
        );
        return Ok(vec![]);
    }

    Ok(split_pages(&text)
        .into_iter()
        .enumerate()
        .map(|(i, page)| (i + 1, page))
        .collect())
}

/// 추출된 텍스트를 페이지별로 분리
///
/// 폼피드 문자(\x0c)를 우선 시도하고, 없으면 "--- Page N ---" 형태의
/// 구분자 패턴을 시도합니다. 둘 다 실패하면 전체를 한 페이지로 취급합니다.
fn split_pages(text: &str) -> Vec<String> {
    let pages: Vec<String> = text
        .split('\x0c')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if pages.len() > 1 {
        return pages;
    }

    let marker = regex::Regex::new(r"(?m)^[\s]*[-=]+[\s]*(?:Page[\s]*)?(\d+)[\s]*[-=]+[\s]*$")
        .expect("Invalid regex");

    if marker.is_match(text) {
        let pages: Vec<String> = marker
            .split(text)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        if pages.len() > 1 {
            return pages;
        }
    }

    vec![text.trim().to_string()]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pages_with_formfeed() {
        let text = "First page\x0cSecond page\x0cThird page";
        let pages = split_pages(text);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0], "First page");
        assert_eq!(pages[2], "Third page");
    }

    #[test]
    fn test_split_pages_with_marker() {
        let text = "Intro text\n--- Page 2 ---\nSecond page text";
        let pages = split_pages(text);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0], "Intro text");
        assert_eq!(pages[1], "Second page text");
    }

    #[test]
    fn test_split_pages_no_separator() {
        let text = "Just some text without page breaks";
        let pages = split_pages(text);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0], text);
    }

    #[test]
    fn test_split_pages_skips_blank_pages() {
        let text = "One\x0c  \x0cTwo";
        let pages = split_pages(text);
        assert_eq!(pages.len(), 2);
    }
}
