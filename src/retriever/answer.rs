//! 답변 조립 - 검색된 청크를 추출형 답변으로 포맷
//!
//! 순수 포맷팅이며 언어 생성은 없습니다. 청크 텍스트를 검색 순서대로
//! 1-based 인용 마커 `[i]`와 함께 이어붙이고, 출처 목록을 모읍니다.

use serde::Serialize;

use crate::index::ScoredChunk;

/// 검색 결과가 없을 때의 고정 답변
pub const NO_ANSWER: &str = "I don't know.";

/// 출처 정보가 없는 청크의 대체 출처
const UNKNOWN_SOURCE: &str = "unknown";

// ============================================================================
// Answer
// ============================================================================

/// 질의 응답
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// 추출형 답변 텍스트
    pub answer: String,
    /// 출처 목록 (검색 순서, 최대 K개, 중복 허용)
    pub sources: Vec<String>,
}

/// 검색된 청크들로 답변 조립
///
/// 빈 시퀀스면 `"I don't know."`와 빈 출처 목록을 반환합니다.
pub fn assemble(chunks: &[ScoredChunk], top_k: usize) -> Answer {
    if chunks.is_empty() {
        return Answer {
            answer: NO_ANSWER.to_string(),
            sources: vec![],
        };
    }

    let answer = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[{}] {}", i + 1, chunk.chunk_text))
        .collect::<Vec<_>>()
        .join("\n\n");

    let sources = chunks
        .iter()
        .take(top_k)
        .map(|chunk| {
            chunk
                .source
                .clone()
                .unwrap_or_else(|| UNKNOWN_SOURCE.to_string())
        })
        .collect();

    Answer { answer, sources }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str, source: Option<&str>) -> ScoredChunk {
        ScoredChunk {
            chunk_id: 0,
            chunk_text: text.to_string(),
            source: source.map(str::to_string),
            distance: 0.0,
        }
    }

    #[test]
    fn test_assemble_empty_is_i_dont_know() {
        let answer = assemble(&[], 4);
        assert_eq!(answer.answer, "I don't know.");
        assert!(answer.sources.is_empty());
    }

    #[test]
    fn test_assemble_formats_citation_markers_in_order() {
        let chunks = vec![
            chunk("First chunk text.", Some("a.txt")),
            chunk("Second chunk text.", Some("b.pdf#page=2")),
        ];

        let answer = assemble(&chunks, 4);

        assert!(answer.answer.contains("[1] First chunk text."));
        assert!(answer.answer.contains("[2] Second chunk text."));
        assert!(
            answer.answer.find("[1] ").unwrap() < answer.answer.find("[2] ").unwrap()
        );
        // 청크는 빈 줄로 구분
        assert_eq!(
            answer.answer,
            "[1] First chunk text.\n\n[2] Second chunk text."
        );
        assert_eq!(answer.sources, vec!["a.txt", "b.pdf#page=2"]);
    }

    #[test]
    fn test_assemble_missing_source_defaults_to_unknown() {
        let chunks = vec![chunk("text", None)];
        let answer = assemble(&chunks, 4);
        assert_eq!(answer.sources, vec!["unknown"]);
    }

    #[test]
    fn test_assemble_caps_sources_at_top_k() {
        let chunks: Vec<ScoredChunk> = (0..6)
            .map(|i| chunk(&format!("chunk {}", i), Some("same.txt")))
            .collect();

        let answer = assemble(&chunks, 4);
        assert_eq!(answer.sources.len(), 4);
        // 중복 출처는 허용
        assert!(answer.sources.iter().all(|s| s == "same.txt"));
    }

    #[test]
    fn test_answer_serializes_to_json() {
        let answer = assemble(&[chunk("hello", Some("doc.txt"))], 4);
        let json = serde_json::to_string(&answer).unwrap();
        assert!(json.contains("\"answer\""));
        assert!(json.contains("\"sources\""));
        assert!(json.contains("doc.txt"));
    }
}
