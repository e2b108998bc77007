//! Reads raw documents from the input location and stages them as map
//! partitions.
//!
//! The input location is a file or a directory of files (not recursive;
//! names starting with `.` or `_` are ignored). Files ending in `.jsonl` hold
//! one `{"id": ..., "text": ...}` object per line, files ending in `.tsv` hold
//! one `id<TAB>text` record per line, and any other file is a single document
//! named after the file. Lines or files that are not valid UTF-8 are skipped
//! like any other malformed record.

use common::{
    codec::{encode_record, write_lines},
    check_doc_id, BadId, DocId, Document, Result,
};
use eyre::WrapErr;
use log::warn;
use serde::Deserialize;
use std::{
    collections::HashSet,
    fmt,
    fs::{self, create_dir_all},
    io,
    path::{Path, PathBuf},
    str::{self, Utf8Error},
};

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug)]
enum Malformed {
    Json(serde_json::Error),
    Encoding(Utf8Error),
    MissingId,
    UnsafeId(DocId),
    MissingSeparator,
    DuplicateId(DocId),
}

impl fmt::Display for Malformed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Malformed::Json(e) => write!(f, "malformed JSON: {}", e),
            Malformed::Encoding(e) => write!(f, "invalid UTF-8: {}", e),
            Malformed::MissingId => write!(f, "missing document id"),
            Malformed::UnsafeId(id) => write!(f, "document id {:?} contains a tab or line break", id),
            Malformed::MissingSeparator => write!(f, "no tab between id and text"),
            Malformed::DuplicateId(id) => write!(f, "duplicate document id {:?}", id),
        }
    }
}

fn doc_id(id: Option<String>) -> std::result::Result<DocId, Malformed> {
    let id = id.ok_or(Malformed::MissingId)?;
    match check_doc_id(&id) {
        Ok(()) => Ok(id),
        Err(BadId::Blank) => Err(Malformed::MissingId),
        Err(BadId::Separator) => Err(Malformed::UnsafeId(id)),
    }
}

fn parse_json_line(line: &str) -> std::result::Result<Document, Malformed> {
    let raw: RawRecord = serde_json::from_str(line).map_err(Malformed::Json)?;
    Ok(Document {
        id: doc_id(raw.id)?,
        text: raw.text.unwrap_or_default(),
    })
}

fn parse_tsv_line(line: &str) -> std::result::Result<Document, Malformed> {
    let (id, text) = line.split_once('\t').ok_or(Malformed::MissingSeparator)?;
    Ok(Document {
        id: doc_id(Some(id.to_owned()))?,
        text: text.to_owned(),
    })
}

/// The documents of one run. Malformed records are counted, not kept.
#[derive(Debug, Default)]
pub struct Corpus {
    pub documents: Vec<Document>,
    pub skipped: usize,
    seen: HashSet<DocId>,
}

impl Corpus {
    fn add(&mut self, origin: &str, record: std::result::Result<Document, Malformed>) {
        let record = record.and_then(|doc| {
            if self.seen.contains(&doc.id) {
                Err(Malformed::DuplicateId(doc.id))
            } else {
                Ok(doc)
            }
        });
        match record {
            Ok(doc) => {
                self.seen.insert(doc.id.clone());
                self.documents.push(doc);
            }
            Err(reason) => {
                warn!("skipping record at {}: {}", origin, reason);
                self.skipped += 1;
            }
        }
    }

    fn add_lines<F>(&mut self, path: &Path, content: &[u8], parse: F)
    where
        F: Fn(&str) -> std::result::Result<Document, Malformed>,
    {
        for (i, line) in content.split(|b| *b == b'\n').enumerate() {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            let record = match str::from_utf8(line) {
                Ok(line) if line.trim().is_empty() => continue,
                Ok(line) => parse(line),
                Err(e) => Err(Malformed::Encoding(e)),
            };
            self.add(&format!("{}:{}", path.display(), i + 1), record);
        }
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| {
            let name = name.to_string_lossy();
            name.starts_with('.') || name.starts_with('_')
        })
        .unwrap_or(true)
}

fn input_files(path: &Path) -> Result<Vec<PathBuf>> {
    let metadata = fs::metadata(path)
        .wrap_err_with(|| format!("input location {} is not accessible", path.display()))?;
    if metadata.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = fs::read_dir(path)
        .wrap_err_with(|| format!("failed to list {}", path.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    files.retain(|file| file.is_file() && !is_hidden(file));
    files.sort();
    Ok(files)
}

pub fn read_corpus(path: &Path) -> Result<Corpus> {
    let mut corpus = Corpus::default();
    for file in input_files(path)? {
        let content =
            fs::read(&file).wrap_err_with(|| format!("failed to read {}", file.display()))?;
        match file.extension().and_then(|ext| ext.to_str()) {
            Some("jsonl") => corpus.add_lines(&file, &content, parse_json_line),
            Some("tsv") => corpus.add_lines(&file, &content, parse_tsv_line),
            _ => {
                let id = file
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned());
                let record = doc_id(id).and_then(|id| {
                    String::from_utf8(content)
                        .map(|text| Document { id, text })
                        .map_err(|e| Malformed::Encoding(e.utf8_error()))
                });
                corpus.add(&file.display().to_string(), record);
            }
        }
    }
    Ok(corpus)
}

/// Writes `documents` as map partitions of at most `split_size` records each.
pub fn write_splits(documents: &[Document], dir: &Path, split_size: usize) -> Result<Vec<PathBuf>> {
    create_dir_all(dir).wrap_err_with(|| format!("failed to create {}", dir.display()))?;
    documents
        .chunks(split_size.max(1))
        .enumerate()
        .map(|(i, chunk)| {
            let path = dir.join(format!("split-{:05}", i));
            let lines = chunk
                .iter()
                .map(|doc| encode_record(&doc.id, &doc.text))
                .collect::<Result<Vec<_>>>()?;
            write_lines(&path, &lines)?;
            Ok(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::codec::read_records;

    #[test]
    fn parses_json_lines() {
        let doc = parse_json_line(r#"{"id": "doc1", "text": "the cat sat"}"#).unwrap();
        assert_eq!(doc.id, "doc1");
        assert_eq!(doc.text, "the cat sat");

        let no_text = parse_json_line(r#"{"id": "doc2"}"#).unwrap();
        assert_eq!(no_text.text, "");

        assert!(matches!(parse_json_line(r#"{"text": "x"}"#), Err(Malformed::MissingId)));
        assert!(matches!(parse_json_line(r#"{"id": " ", "text": "x"}"#), Err(Malformed::MissingId)));
        assert!(matches!(parse_json_line("{not json"), Err(Malformed::Json(_))));
    }

    #[test]
    fn ids_with_separators_are_rejected() {
        assert!(matches!(
            parse_json_line(r#"{"id": "x\ty", "text": "a"}"#),
            Err(Malformed::UnsafeId(id)) if id == "x\ty"
        ));
        assert!(matches!(
            parse_json_line(r#"{"id": "p\nq", "text": "a"}"#),
            Err(Malformed::UnsafeId(_))
        ));
        assert!(matches!(
            parse_json_line(r#"{"id": "r\r", "text": "a"}"#),
            Err(Malformed::UnsafeId(_))
        ));
        assert_eq!(parse_json_line(r#"{"id": "a b", "text": "a"}"#).unwrap().id, "a b");
    }

    #[test]
    fn parses_tsv_lines() {
        let doc = parse_tsv_line("doc1\tthe cat\tsat").unwrap();
        assert_eq!(doc.id, "doc1");
        assert_eq!(doc.text, "the cat\tsat");
        assert!(matches!(parse_tsv_line("no separator"), Err(Malformed::MissingSeparator)));
        assert!(matches!(parse_tsv_line("\ttext"), Err(Malformed::MissingId)));
    }

    #[test]
    fn skips_and_counts_bad_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.jsonl");
        fs::write(
            &path,
            "{\"id\":\"a\",\"text\":\"x\"}\n\n{\"text\":\"orphan\"}\nbroken\n{\"id\":\"a\",\"text\":\"again\"}\n",
        )
        .unwrap();

        let corpus = read_corpus(&path).unwrap();
        assert_eq!(corpus.documents.len(), 1);
        assert_eq!(corpus.skipped, 3);
    }

    #[test]
    fn reads_directories_and_ignores_hidden_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "whole file").unwrap();
        fs::write(dir.path().join("a.tsv"), "x\tone\ny\ttwo\n").unwrap();
        fs::write(dir.path().join("_SUCCESS"), "").unwrap();
        fs::write(dir.path().join(".hidden"), "secret").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let corpus = read_corpus(dir.path()).unwrap();
        let ids: Vec<&str> = corpus.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y", "b.txt"]);
        assert_eq!(corpus.skipped, 0);
    }

    #[test]
    fn invalid_utf8_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "first document").unwrap();
        fs::write(dir.path().join("b.txt"), "second document").unwrap();
        fs::write(dir.path().join("c.bin"), [0xff, 0xfe, 0x00, 0x80]).unwrap();
        let mut lines = b"{\"id\":\"j1\",\"text\":\"ok\"}\r\n".to_vec();
        lines.extend_from_slice(b"{\"id\":\"j2\",\"text\":\"\xc3\x28\"}\n");
        lines.extend_from_slice(b"{\"id\":\"j3\",\"text\":\"fine\"}\n");
        fs::write(dir.path().join("d.jsonl"), lines).unwrap();

        let corpus = read_corpus(dir.path()).unwrap();
        let ids: Vec<&str> = corpus.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a.txt", "b.txt", "j1", "j3"]);
        assert_eq!(corpus.documents[2].text, "ok");
        assert_eq!(corpus.skipped, 2);
    }

    #[test]
    fn ids_with_separators_are_skipped_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("docs.jsonl");
        fs::write(
            &path,
            concat!(
                "{\"id\":\"x\\ty\",\"text\":\"a b\"}\n",
                "{\"id\":\"p\\nq\",\"text\":\"a b\"}\n",
                "{\"id\":\"ok\",\"text\":\"a b\"}\n",
            ),
        )
        .unwrap();

        let corpus = read_corpus(&path).unwrap();
        assert_eq!(corpus.documents.len(), 1);
        assert_eq!(corpus.documents[0].id, "ok");
        assert_eq!(corpus.skipped, 2);
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_corpus(&dir.path().join("nope")).is_err());
    }

    #[test]
    fn splits_hold_at_most_split_size_documents() {
        let dir = tempfile::tempdir().unwrap();
        let documents: Vec<Document> = (0..5)
            .map(|i| Document {
                id: format!("doc{}", i),
                text: format!("text {}", i),
            })
            .collect();

        let splits = write_splits(&documents, &dir.path().join("splits"), 2).unwrap();
        assert_eq!(splits.len(), 3);
        let records: Vec<(String, String)> = read_records(&splits).unwrap();
        assert_eq!(records.len(), 5);
        assert_eq!(records[4], ("doc4".to_owned(), "text 4".to_owned()));
    }
}
