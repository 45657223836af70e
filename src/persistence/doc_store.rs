use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::QuarryError;
use crate::Result;

/// Metadata of one document, indexed by its backend document ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Value of the `id` attribute of the `<doc>` record in the corpus file
    pub key: String,
    pub title: String,
    pub link: Option<String>,
    /// Corpus file holding the record
    pub path: PathBuf,
}

/// Byte range of a document body inside a corpus file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocSpan {
    pub key: String,
    pub body: Range<usize>,
}

type OffsetIndex = HashMap<String, Range<usize>>;

/// Read-only document store over plain-text corpus files.
///
/// Corpus files hold records of the form
/// `<doc id="ID" url="URL" title="TITLE">TEXT</doc>`. Each file is scanned
/// once, on first access, into a key → byte-range index; later lookups seek
/// straight to the body.
pub struct DocumentStore {
    records: Vec<DocumentRecord>,
    offsets: RwLock<HashMap<PathBuf, Arc<OffsetIndex>>>,
}

impl DocumentStore {
    pub fn new(records: Vec<DocumentRecord>) -> Self {
        Self {
            records,
            offsets: RwLock::new(HashMap::new()),
        }
    }

    /// Load a metadata file: one `key \t link \t title \t path` line per
    /// document, line index = backend document ID.
    pub fn load(meta_path: impl AsRef<Path>) -> Result<Self> {
        let meta_path = meta_path.as_ref();
        let content = std::fs::read_to_string(meta_path)?;

        let mut records = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != 4 {
                return Err(QuarryError::Config(format!(
                    "{}:{}: expected 4 tab-separated fields, found {}",
                    meta_path.display(),
                    line_no + 1,
                    fields.len()
                )));
            }
            records.push(DocumentRecord {
                key: fields[0].to_string(),
                link: Some(fields[1].to_string()).filter(|link| !link.is_empty()),
                title: fields[2].to_string(),
                path: PathBuf::from(fields[3]),
            });
        }

        info!(path = %meta_path.display(), documents = records.len(), "loaded document metadata");
        Ok(Self::new(records))
    }

    pub fn get(&self, doc_id: u32) -> Option<&DocumentRecord> {
        self.records.get(doc_id as usize)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Body text of a document with line breaks flattened to spaces
    pub fn text(&self, doc_id: u32) -> Result<String> {
        let record = self
            .get(doc_id)
            .ok_or(QuarryError::DocumentNotFound(doc_id))?;
        let index = self.offset_index(&record.path)?;
        let range = index
            .get(&record.key)
            .cloned()
            .ok_or(QuarryError::DocumentNotFound(doc_id))?;

        let mut file = File::open(&record.path)?;
        file.seek(SeekFrom::Start(range.start as u64))?;
        let mut body = vec![0u8; range.end - range.start];
        file.read_exact(&mut body)?;

        let text = String::from_utf8_lossy(&body);
        Ok(text.replace(['\r', '\n'], " "))
    }

    fn offset_index(&self, path: &Path) -> Result<Arc<OffsetIndex>> {
        if let Some(index) = self.offsets.read().get(path) {
            return Ok(index.clone());
        }

        let content = std::fs::read_to_string(path)?;
        let index: OffsetIndex = scan_documents(&content)
            .into_iter()
            .map(|span| (span.key, span.body))
            .collect();
        debug!(path = %path.display(), documents = index.len(), "indexed corpus file");

        let index = Arc::new(index);
        self.offsets
            .write()
            .entry(path.to_path_buf())
            .or_insert_with(|| index.clone());
        Ok(index)
    }
}

/// Find every `<doc ...>BODY</doc>` record in a corpus file.
///
/// Records whose opening tag is malformed or lacks an `id` attribute, or
/// whose body is empty or unterminated, are skipped.
pub fn scan_documents(content: &str) -> Vec<DocSpan> {
    const OPEN: &str = "<doc";
    const CLOSE: &str = "</doc>";

    let mut spans = Vec::new();
    let mut cursor = 0;

    while let Some(found) = content[cursor..].find(OPEN) {
        let tag_start = cursor + found;
        cursor = tag_start + OPEN.len();

        let Some((attributes, body_start)) = parse_open_tag(content, cursor) else {
            continue;
        };
        let Some(close) = content[body_start..].find(CLOSE) else {
            break;
        };
        let body_end = body_start + close;
        cursor = body_end + CLOSE.len();

        if body_end == body_start {
            continue;
        }
        if let Some(key) = attributes.get("id") {
            spans.push(DocSpan {
                key: key.to_string(),
                body: body_start..body_end,
            });
        }
    }

    spans
}

/// Parse `\s+name="value"...>` starting right after `<doc`.
///
/// Returns the attributes and the offset just past `>`.
fn parse_open_tag(content: &str, start: usize) -> Option<(HashMap<&str, &str>, usize)> {
    let bytes = content.as_bytes();
    let mut pos = start;
    let mut attributes = HashMap::new();

    if !bytes.get(pos)?.is_ascii_whitespace() {
        return None;
    }

    loop {
        while bytes.get(pos)?.is_ascii_whitespace() {
            pos += 1;
        }
        if bytes[pos] == b'>' {
            return Some((attributes, pos + 1));
        }

        let name_start = pos;
        while bytes.get(pos)?.is_ascii_alphanumeric() || bytes[pos] == b'_' || bytes[pos] == b'-'
        {
            pos += 1;
        }
        if pos == name_start || bytes[pos] != b'=' || bytes.get(pos + 1) != Some(&b'"') {
            return None;
        }
        let name = &content[name_start..pos];

        let value_start = pos + 2;
        let value_len = content[value_start..].find('"')?;
        attributes.insert(name, &content[value_start..value_start + value_len]);
        pos = value_start + value_len + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CORPUS: &str = "<doc id=\"12\" url=\"https://example.org/?curid=12\" title=\"Anarchism\">\nAnarchism\n\nAnarchism is a political philosophy.\n</doc>\n\
<doc id=\"25\" url=\"https://example.org/?curid=25\" title=\"Autism\">\nAutism is a developmental disorder.\n</doc>\n";

    fn write_corpus(tmp: &TempDir) -> PathBuf {
        let path = tmp.path().join("wiki_00");
        std::fs::write(&path, CORPUS).unwrap();
        path
    }

    #[test]
    fn test_scan_documents() {
        let spans = scan_documents(CORPUS);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].key, "12");
        assert_eq!(spans[1].key, "25");
        assert_eq!(
            &CORPUS[spans[1].body.clone()],
            "\nAutism is a developmental disorder.\n"
        );
    }

    #[test]
    fn test_scan_skips_malformed_records() {
        let content = "<docs>noise</docs><doc id=\"1\">ok</doc><doc url=\"x\">no id</doc><doc id=\"2\"></doc>";
        let spans = scan_documents(content);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].key, "1");
        assert_eq!(&content[spans[0].body.clone()], "ok");
    }

    #[test]
    fn test_scan_attribute_with_angle_bracket() {
        let content = "<doc id=\"7\" title=\"a > b\">body</doc>";
        let spans = scan_documents(content);
        assert_eq!(spans.len(), 1);
        assert_eq!(&content[spans[0].body.clone()], "body");
    }

    #[test]
    fn test_text_lookup() {
        let tmp = TempDir::new().unwrap();
        let path = write_corpus(&tmp);
        let store = DocumentStore::new(vec![
            DocumentRecord {
                key: "25".to_string(),
                title: "Autism".to_string(),
                link: None,
                path: path.clone(),
            },
            DocumentRecord {
                key: "12".to_string(),
                title: "Anarchism".to_string(),
                link: None,
                path,
            },
        ]);

        assert_eq!(store.text(0).unwrap(), " Autism is a developmental disorder. ");
        assert!(store.text(1).unwrap().contains("political philosophy"));
        assert!(matches!(store.text(2), Err(QuarryError::DocumentNotFound(2))));
    }

    #[test]
    fn test_missing_key_in_file() {
        let tmp = TempDir::new().unwrap();
        let path = write_corpus(&tmp);
        let store = DocumentStore::new(vec![DocumentRecord {
            key: "99".to_string(),
            title: "Missing".to_string(),
            link: None,
            path,
        }]);
        assert!(matches!(store.text(0), Err(QuarryError::DocumentNotFound(0))));
    }

    #[test]
    fn test_load_metadata() {
        let tmp = TempDir::new().unwrap();
        let corpus = write_corpus(&tmp);
        let meta = tmp.path().join("meta");
        std::fs::write(
            &meta,
            format!(
                "12\thttps://example.org/?curid=12\tAnarchism\t{}\n25\t\tAutism\t{}\n",
                corpus.display(),
                corpus.display()
            ),
        )
        .unwrap();

        let store = DocumentStore::load(&meta).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(0).unwrap().title, "Anarchism");
        assert_eq!(
            store.get(0).unwrap().link.as_deref(),
            Some("https://example.org/?curid=12")
        );
        assert_eq!(store.get(1).unwrap().link, None);
        assert!(store.text(1).unwrap().contains("developmental"));
    }

    #[test]
    fn test_load_rejects_bad_lines() {
        let tmp = TempDir::new().unwrap();
        let meta = tmp.path().join("meta");
        std::fs::write(&meta, "12\tonly-two\n").unwrap();
        assert!(matches!(
            DocumentStore::load(&meta),
            Err(QuarryError::Config(_))
        ));
    }
}
