//! Plain-text extraction from uploaded documents

use docx_rs::{DocumentChild, ParagraphChild, RunChild};

use crate::error::{StudyError, StudyResult};
use crate::models::FileType;

/// Extract the transcript of an uploaded file held in memory.
///
/// Unreadable documents are reported as validation errors since the input
/// came from the client.
pub fn extract_text(file_type: FileType, bytes: &[u8]) -> StudyResult<String> {
    let text = match file_type {
        FileType::Pdf => extract_pdf(bytes)?,
        // Legacy .doc is only readable when it is really an OOXML package
        FileType::Docx | FileType::Doc => extract_docx(bytes)?,
        FileType::Txt | FileType::Text | FileType::Notion => extract_plain(bytes),
    };
    Ok(text.trim().to_string())
}

fn extract_pdf(bytes: &[u8]) -> StudyResult<String> {
    let document = lopdf::Document::load_mem(bytes)
        .map_err(|e| StudyError::validation(format!("Could not read PDF: {}", e)))?;
    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    if pages.is_empty() {
        return Ok(String::new());
    }
    document
        .extract_text(&pages)
        .map_err(|e| StudyError::validation(format!("Could not extract PDF text: {}", e)))
}

fn extract_docx(bytes: &[u8]) -> StudyResult<String> {
    let docx = docx_rs::read_docx(bytes)
        .map_err(|e| StudyError::validation(format!("Could not read Word document: {}", e)))?;

    let mut paragraphs = Vec::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            let mut line = String::new();
            for pc in &paragraph.children {
                if let ParagraphChild::Run(run) = pc {
                    for rc in &run.children {
                        match rc {
                            RunChild::Text(t) => line.push_str(&t.text),
                            RunChild::Tab(_) => line.push('\t'),
                            RunChild::Break(_) => line.push('\n'),
                            _ => {}
                        }
                    }
                }
            }
            paragraphs.push(line);
        }
    }
    Ok(paragraphs.join("\n"))
}

fn extract_plain(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
}
