use docx_rs::{read_docx, DocumentChild};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Docx,
    Pdf,
}

impl DocumentKind {
    /// Kind detection goes by extension first, MIME type second; unknown
    /// combinations are rejected before any bytes are parsed.
    pub fn detect(filename: &str, mime_type: Option<&str>) -> Option<Self> {
        let lowered = filename.to_lowercase();
        if lowered.ends_with(".docx") {
            return Some(DocumentKind::Docx);
        }
        if lowered.ends_with(".pdf") {
            return Some(DocumentKind::Pdf);
        }
        match mime_type {
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document") => {
                Some(DocumentKind::Docx)
            }
            Some("application/pdf") => Some(DocumentKind::Pdf),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentKind::Docx => "docx",
            DocumentKind::Pdf => "pdf",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to parse docx document: {0}")]
    Docx(String),
    #[error("failed to extract pdf text: {0}")]
    Pdf(String),
}

/// Turns uploaded document bytes into plain text. Table content and other
/// non-paragraph docx elements are skipped.
pub fn extract_text(bytes: &[u8], kind: DocumentKind) -> Result<String, ExtractError> {
    match kind {
        DocumentKind::Docx => extract_docx(bytes),
        DocumentKind::Pdf => {
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))
        }
    }
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let docx = read_docx(bytes).map_err(|e| ExtractError::Docx(e.to_string()))?;
    let mut text = String::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(p) = child {
            text.push_str(&p.raw_text());
            text.push('\n');
        }
    }
    Ok(text.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Paragraph, Run};

    fn build_docx(lines: &[&str]) -> Vec<u8> {
        let mut docx = Docx::new();
        for line in lines {
            docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(*line)));
        }
        let mut cursor = std::io::Cursor::new(Vec::new());
        docx.build().pack(&mut cursor).expect("pack docx");
        cursor.into_inner()
    }

    #[test]
    fn detect_goes_by_extension_case_insensitively() {
        assert_eq!(
            DocumentKind::detect("Leermeter.DOCX", None),
            Some(DocumentKind::Docx)
        );
        assert_eq!(
            DocumentKind::detect("handleiding.pdf", None),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(DocumentKind::detect("notities.txt", None), None);
    }

    #[test]
    fn detect_falls_back_to_mime_type() {
        assert_eq!(
            DocumentKind::detect("upload", Some("application/pdf")),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::detect("upload", Some("text/plain")),
            None
        );
    }

    #[test]
    fn docx_paragraphs_come_back_as_plain_text() {
        let bytes = build_docx(&["De Leermeter is een hulpmiddel.", "Het meet leerdoelen."]);
        let text = extract_text(&bytes, DocumentKind::Docx).unwrap();
        assert_eq!(
            text,
            "De Leermeter is een hulpmiddel.\nHet meet leerdoelen."
        );
    }

    #[test]
    fn garbage_docx_bytes_produce_typed_error() {
        let err = extract_text(b"dit is geen docx", DocumentKind::Docx).unwrap_err();
        assert!(matches!(err, ExtractError::Docx(_)));
    }

    #[test]
    fn garbage_pdf_bytes_produce_typed_error() {
        let err = extract_text(b"dit is geen pdf", DocumentKind::Pdf).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }
}
