use crate::error::IngestError;
use lopdf::Document;
use std::fs;
use std::path::Path;

// Pages without text stay as empty strings so page numbers line up with the file.
pub fn extract_pdf_pages(path: &Path) -> Result<Vec<String>, IngestError> {
    let document =
        Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))?;

    let mut pages = Vec::new();
    for page_no in document.get_pages().into_keys() {
        let text = document
            .extract_text(&[page_no])
            .map_err(|error| IngestError::PdfParse(format!("page {page_no}: {error}")))?;
        pages.push(text);
    }

    if pages.is_empty() {
        return Err(IngestError::PdfParse(format!(
            "pdf has no pages: {}",
            path.display()
        )));
    }

    Ok(pages)
}

pub fn has_embedded_text<S: AsRef<str>>(pages: &[S]) -> bool {
    pages.iter().any(|page| !page.as_ref().trim().is_empty())
}

pub fn load_text_pages(path: &Path) -> Result<Vec<String>, IngestError> {
    let raw = fs::read_to_string(path)?;
    Ok(raw.split('\u{000c}').map(str::to_string).collect())
}

/// JSON array of pages, each an array of OCR lines. Blank lines are dropped.
pub fn load_ocr_lines(path: &Path) -> Result<Vec<Vec<String>>, IngestError> {
    let raw = fs::read(path)?;
    let pages: Vec<Vec<String>> = serde_json::from_slice(&raw)?;

    Ok(pages
        .into_iter()
        .map(|lines| {
            lines
                .into_iter()
                .map(|line| line.trim().to_string())
                .filter(|line| !line.is_empty())
                .collect()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn text_pages_split_on_form_feed_and_keep_blank_pages() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("doc.txt");
        fs::write(&path, "First page\u{000C}\u{000C}Third page\n")?;

        let pages = load_text_pages(&path)?;
        assert_eq!(pages, vec!["First page", "", "Third page\n"]);
        assert!(has_embedded_text(&pages));
        Ok(())
    }

    #[test]
    fn ocr_lines_are_trimmed_and_blank_lines_dropped() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("lines.json");
        fs::write(&path, r#"[["  Invoice 42 ", "", "Total due"], []]"#)?;

        let pages = load_ocr_lines(&path)?;
        assert_eq!(pages, vec![vec!["Invoice 42", "Total due"], Vec::<&str>::new()]);
        Ok(())
    }

    #[test]
    fn malformed_inputs_are_reported() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let json = dir.path().join("lines.json");
        fs::write(&json, "{not json")?;
        assert!(matches!(load_ocr_lines(&json), Err(IngestError::Json(_))));

        let pdf = dir.path().join("broken.pdf");
        fs::write(&pdf, b"%PDF-1.4\n%broken")?;
        assert!(matches!(extract_pdf_pages(&pdf), Err(IngestError::PdfParse(_))));
        Ok(())
    }

    #[test]
    fn whitespace_pages_have_no_embedded_text() {
        assert!(!has_embedded_text(&["", "  \n "]));
        assert!(!has_embedded_text::<String>(&[]));
    }
}
