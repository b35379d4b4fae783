//! Multi-format text extraction for source documents.
//!
//! Format is selected by file extension: PDF via `pdf-extract`, PPTX/DOCX by
//! walking the OOXML archive with bounded ZIP reads, Markdown and plain text
//! verbatim. Output preserves paragraph structure (blank-line-delimited) so
//! downstream direct-answer extraction can score paragraph units.
//!
//! Any failure here means "source unavailable" to callers; a batch never
//! fails because one document does.

use std::io::Read;
use std::path::Path;

use crate::models::DocType;

/// Maximum decompressed bytes to read from a single ZIP entry (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extraction failure for a single document.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedFormat(String),
    Read(String),
    Pdf(String),
    Ooxml(String),
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedFormat(ext) => {
                write!(f, "unsupported document format: {}", ext)
            }
            ExtractError::Read(e) => write!(f, "failed to read document: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::Ooxml(e) => write!(f, "OOXML extraction failed: {}", e),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extracted document content before it is wrapped into a context entry.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub doc_type: DocType,
    pub text: String,
    /// Pages or slides, when the format exposes a unit count.
    pub unit_count: Option<usize>,
}

/// Extracts plain text from the document at `path`, dispatching on its
/// extension.
pub fn extract_document(path: &Path) -> Result<Extracted, ExtractError> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => extract_pdf(path),
        "pptx" => extract_pptx(path),
        "docx" => extract_docx(path),
        "md" | "txt" => extract_plain_text(path),
        other => Err(ExtractError::UnsupportedFormat(other.to_string())),
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, ExtractError> {
    std::fs::read(path).map_err(|e| ExtractError::Read(format!("{}: {}", path.display(), e)))
}

fn extract_plain_text(path: &Path) -> Result<Extracted, ExtractError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ExtractError::Read(format!("{}: {}", path.display(), e)))?;
    Ok(Extracted {
        doc_type: DocType::Text,
        text,
        unit_count: None,
    })
}

fn extract_pdf(path: &Path) -> Result<Extracted, ExtractError> {
    let bytes = read_bytes(path)?;
    let text = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;
    Ok(Extracted {
        doc_type: DocType::Pdf,
        text,
        unit_count: None,
    })
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ExtractError> {
    let entry = archive
        .by_name(name)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if out.len() as u64 >= max_bytes {
        return Err(ExtractError::Ooxml(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, max_bytes
        )));
    }
    Ok(out)
}

fn extract_docx(path: &Path) -> Result<Extracted, ExtractError> {
    let bytes = read_bytes(path)?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.as_slice()))
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let doc_xml = read_zip_entry_bounded(&mut archive, "word/document.xml", MAX_XML_ENTRY_BYTES)?;
    let text = extract_text_runs(&doc_xml)?;
    Ok(Extracted {
        doc_type: DocType::Word,
        text,
        unit_count: None,
    })
}

fn extract_pptx(path: &Path) -> Result<Extracted, ExtractError> {
    let bytes = read_bytes(path)?;
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes.as_slice()))
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;

    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    slide_names.sort_by_key(|name| {
        name.trim_start_matches("ppt/slides/slide")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });

    let slide_count = slide_names.len();
    let mut slides: Vec<String> = Vec::new();
    for name in slide_names {
        let xml = read_zip_entry_bounded(&mut archive, &name, MAX_XML_ENTRY_BYTES)?;
        let text = extract_text_runs(&xml)?;
        let text = text.trim().to_string();
        if !text.is_empty() {
            slides.push(text);
        }
    }

    Ok(Extracted {
        doc_type: DocType::Slides,
        // Blank line between slides so each slide scores as its own paragraph.
        text: slides.join("\n\n"),
        unit_count: Some(slide_count),
    })
}

/// Collects the character runs (`<w:t>`/`<a:t>`) of an OOXML part, emitting a
/// blank line at each paragraph end (`</w:p>`/`</a:p>`) so paragraph
/// boundaries survive into the extracted text as scoreable units.
fn extract_text_runs(xml: &[u8]) -> Result<String, ExtractError> {
    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                if e.local_name().as_ref() == b"t" {
                    if let Ok(quick_xml::events::Event::Text(te)) = reader.read_event_into(&mut buf)
                    {
                        if !out.is_empty() && !out.ends_with('\n') && !out.ends_with(' ') {
                            out.push(' ');
                        }
                        out.push_str(te.unescape().unwrap_or_default().as_ref());
                    }
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                if e.local_name().as_ref() == b"p" && !out.is_empty() && !out.ends_with("\n\n") {
                    out.push_str("\n\n");
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out.trim_end().to_string())
}
