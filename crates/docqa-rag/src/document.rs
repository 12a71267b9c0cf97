//! Loading source documents from disk

use pulldown_cmark::{Event, Parser, TagEnd};
use serde::Serialize;
use std::fs;
use std::path::Path;

use docqa_core::{Error, Result};

/// Plain text of one input document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceDocument {
    /// File name the text was read from
    pub name: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentFormat {
    PlainText,
    Markdown,
}

impl DocumentFormat {
    fn detect(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase());

        match extension.as_deref() {
            None | Some("txt") | Some("text") => Ok(DocumentFormat::PlainText),
            Some("md") | Some("markdown") => Ok(DocumentFormat::Markdown),
            Some(other) => Err(Error::UnsupportedDocument(format!(
                "{}: .{} files are not supported, convert to .txt or .md first",
                path.display(),
                other
            ))),
        }
    }
}

/// Read a single document as plain text
///
/// Text files are decoded lossily; markdown is reduced to its text content
/// with block boundaries kept as blank lines.
pub fn load_document(path: impl AsRef<Path>) -> Result<SourceDocument> {
    let path = path.as_ref();
    let format = DocumentFormat::detect(path)?;
    let bytes = fs::read(path)?;
    let raw = String::from_utf8_lossy(&bytes);

    let text = match format {
        DocumentFormat::PlainText => raw.into_owned(),
        DocumentFormat::Markdown => markdown_to_text(&raw),
    };

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    tracing::debug!(
        document = %name,
        chars = text.chars().count(),
        "loaded document"
    );

    Ok(SourceDocument { name, text })
}

/// Load every path in order; directories contribute their supported files,
/// one level deep, sorted by name
pub fn load_documents<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<SourceDocument>> {
    let mut documents = Vec::new();

    for path in paths {
        let path = path.as_ref();
        if !path.is_dir() {
            documents.push(load_document(path)?);
            continue;
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file_path = entry.path();
            let hidden = entry.file_name().to_string_lossy().starts_with('.');
            if hidden || !file_path.is_file() {
                continue;
            }
            // unsupported files inside a directory are skipped, not fatal
            if DocumentFormat::detect(&file_path).is_ok() {
                files.push(file_path);
            } else {
                tracing::debug!(path = %file_path.display(), "skipping unsupported file");
            }
        }
        files.sort();

        for file in files {
            documents.push(load_document(&file)?);
        }
    }

    Ok(documents)
}

/// Render markdown to plain text
pub fn markdown_to_text(markdown: &str) -> String {
    let mut text = String::with_capacity(markdown.len());

    for event in Parser::new(markdown) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak => text.push(' '),
            Event::HardBreak => text.push('\n'),
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::CodeBlock
                | TagEnd::TableRow,
            ) => {
                if !text.ends_with("\n\n") {
                    text.push_str(if text.ends_with('\n') { "\n" } else { "\n\n" });
                }
            }
            Event::End(TagEnd::TableCell) => text.push(' '),
            _ => {}
        }
    }

    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_markdown_to_text() {
        let markdown = "# Policy\n\nKnee surgery is **covered**\nafter two years.\n\n- item one\n- item `two`\n";
        assert_eq!(
            markdown_to_text(markdown),
            "Policy\n\nKnee surgery is covered after two years.\n\nitem one\n\nitem two"
        );
    }

    #[test]
    fn test_load_text_and_markdown() {
        let dir = TempDir::new().unwrap();
        let txt = dir.path().join("policy.txt");
        let md = dir.path().join("notes.md");
        fs::write(&txt, "  raw text\nkept as is  ").unwrap();
        fs::write(&md, "## Heading\n\nBody").unwrap();

        let doc = load_document(&txt).unwrap();
        assert_eq!(doc.name, "policy.txt");
        assert_eq!(doc.text, "  raw text\nkept as is  ");

        let doc = load_document(&md).unwrap();
        assert_eq!(doc.text, "Heading\n\nBody");
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.txt");
        fs::write(&path, [b'o', b'k', 0xff, b'!']).unwrap();

        assert_eq!(load_document(&path).unwrap().text, "ok\u{fffd}!");
    }

    #[test]
    fn test_unsupported_and_missing_documents() {
        let dir = TempDir::new().unwrap();
        let pdf = dir.path().join("policy.pdf");
        fs::write(&pdf, b"%PDF-1.4").unwrap();

        assert!(matches!(load_document(&pdf), Err(Error::UnsupportedDocument(_))));
        assert!(matches!(
            load_document(dir.path().join("missing.txt")),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_load_directory_sorted_one_level() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), "second").unwrap();
        fs::write(dir.path().join("a.md"), "first").unwrap();
        fs::write(dir.path().join("c.pdf"), "skipped").unwrap();
        fs::write(dir.path().join(".hidden.txt"), "skipped").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("d.txt"), "skipped").unwrap();

        let extra = dir.path().join("nested").join("d.txt");
        let docs = load_documents(&[dir.path().to_path_buf(), extra]).unwrap();

        let names: Vec<&str> = docs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.md", "b.txt", "d.txt"]);
        assert_eq!(docs[0].text, "first");
    }
}
