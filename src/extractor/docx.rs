//! DOCX 텍스트 추출
//!
//! docx-rs 크레이트로 문서를 파싱하여 문단/표의 텍스트만 모읍니다.
//! 서식, 이미지, 각주 등은 버려집니다.

use std::path::Path;

use anyhow::{Context, Result};
use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, RunChild, Table, TableCellContent, TableChild,
    TableRowChild,
};

/// DOCX에서 플레인 텍스트 추출
pub fn extract_docx_text(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read DOCX: {:?}", path))?;

    let docx = docx_rs::read_docx(&bytes)
        .map_err(|e| anyhow::anyhow!("Failed to parse DOCX {:?}: {:?}", path, e))?;

    let mut out = String::new();

    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => push_paragraph(&mut out, p),
            DocumentChild::Table(t) => push_table(&mut out, t),
            _ => {}
        }
    }

    Ok(out.trim().to_string())
}

/// 문단 텍스트를 수집 버퍼에 추가
fn push_paragraph(out: &mut String, paragraph: &Paragraph) {
    let text = paragraph_text(&paragraph.children);
    if !text.trim().is_empty() {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(text.trim());
    }
}

/// 표의 셀 텍스트를 수집 버퍼에 추가 (행 단위로 한 줄)
fn push_table(out: &mut String, table: &Table) {
    for row in &table.rows {
        let TableChild::TableRow(row) = row;

        let mut cells = Vec::new();
        for cell in &row.cells {
            let TableRowChild::TableCell(cell) = cell;

            let mut cell_text = String::new();
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(p) => {
                        let text = paragraph_text(&p.children);
                        if !text.trim().is_empty() {
                            if !cell_text.is_empty() {
                                cell_text.push(' ');
                            }
                            cell_text.push_str(text.trim());
                        }
                    }
                    TableCellContent::Table(nested) => push_table(&mut cell_text, nested),
                    _ => {}
                }
            }

            if !cell_text.is_empty() {
                cells.push(cell_text);
            }
        }

        if !cells.is_empty() {
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str(&cells.join(" | "));
        }
    }
}

/// 문단 자식 노드들에서 텍스트 수집 (run, hyperlink)
fn paragraph_text(children: &[ParagraphChild]) -> String {
    let mut text = String::new();

    for child in children {
        match child {
            ParagraphChild::Run(run) => {
                for rc in &run.children {
                    match rc {
                        RunChild::Text(t) => text.push_str(&t.text),
                        RunChild::Tab(_) => text.push(' '),
                        RunChild::Break(_) => text.push('\n'),
                        _ => {}
                    }
                }
            }
            ParagraphChild::Hyperlink(link) => {
                text.push_str(&paragraph_text(&link.children));
            }
            _ => {}
        }
    }

    text
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Run};
    use tempfile::TempDir;

    fn write_test_docx(path: &Path, paragraphs: &[&str]) {
        let mut docx = Docx::new();
        for p in paragraphs {
            docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*p)));
        }

        let file = std::fs::File::create(path).unwrap();
        docx.build().pack(file).unwrap();
    }

    #[test]
    fn test_extract_docx_paragraphs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doc.docx");
        write_test_docx(&path, &["First paragraph.", "Second paragraph."]);

        let text = extract_docx_text(&path).unwrap();
        assert!(text.contains("First paragraph."));
        assert!(text.contains("Second paragraph."));

        // 문단은 빈 줄로 구분됨
        let first = text.find("First").unwrap();
        let second = text.find("Second").unwrap();
        assert!(first < second);
        assert!(text[first..second].contains("\n\n"));
    }

    #[test]
    fn test_extract_docx_missing_file_fails() {
        let result = extract_docx_text(Path::new("/nonexistent/docchat.docx"));
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_docx_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.docx");
        std::fs::write(&path, b"not a zip archive").unwrap();

        assert!(extract_docx_text(&path).is_err());
    }
}
