//! Corpus loading.
//!
//! Produces the ordered, non-empty list of snippets the retrieval index is
//! built from. Supported sources:
//! - `.json`: an array of strings or dataset rows
//! - `.jsonl` / `.ndjson`: one string or dataset row per line
//! - a directory: every `.txt` file, split into blank-line separated paragraphs
//! - anything else: one snippet per non-blank line
//!
//! A dataset row is either `{"conversations": [{"content": ...}, ...]}`, whose
//! turns are flattened in order, or a flat `{"content": ...}` / `{"text": ...}`.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::CorpusEntry;

pub fn load_corpus(path: &Path) -> Result<Vec<CorpusEntry>> {
    let snippets = if path.is_dir() {
        read_txt_dir(path)?
    } else {
        let content = read_file_content(path)?;
        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => parse_json(path, &content)?,
            Some("jsonl" | "ndjson") => parse_jsonl(path, &content)?,
            _ => content.lines().map(str::to_string).collect(),
        }
    };
    let entries = into_entries(snippets);
    if entries.is_empty() {
        return Err(Error::EmptyCorpus(path.display().to_string()));
    }
    tracing::info!(path = %path.display(), entries = entries.len(), "Loaded corpus");
    Ok(entries)
}

/// Number snippets by position after dropping blank ones.
pub fn into_entries<I, S>(snippets: I) -> Vec<CorpusEntry>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    snippets
        .into_iter()
        .filter_map(|s| {
            let trimmed = s.as_ref().trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .enumerate()
        .map(|(id, text)| CorpusEntry { id, text })
        .collect()
}

fn read_file_content(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            Ok(String::from_utf8_lossy(&fs::read(path)?).to_string())
        }
        Err(e) => Err(Error::Corpus { path: path.display().to_string(), reason: e.to_string() }),
    }
}

fn parse_json(path: &Path, content: &str) -> Result<Vec<String>> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| Error::Corpus { path: path.display().to_string(), reason: e.to_string() })?;
    let mut out = Vec::new();
    match &value {
        Value::Array(items) => items.iter().for_each(|item| collect_snippets(item, &mut out)),
        other => collect_snippets(other, &mut out),
    }
    Ok(out)
}

fn parse_jsonl(path: &Path, content: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|e| Error::Corpus {
            path: path.display().to_string(),
            reason: format!("line {}: {}", line_no + 1, e),
        })?;
        collect_snippets(&value, &mut out);
    }
    Ok(out)
}

fn collect_snippets(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Object(map) => {
            if let Some(Value::Array(turns)) = map.get("conversations") {
                for turn in turns {
                    match turn {
                        Value::String(s) => out.push(s.clone()),
                        Value::Object(t) => {
                            if let Some(Value::String(s)) = t.get("content") {
                                out.push(s.clone());
                            }
                        }
                        _ => {}
                    }
                }
            } else if let Some(Value::String(s)) = map.get("content").or_else(|| map.get("text")) {
                out.push(s.clone());
            } else {
                tracing::debug!("Skipping corpus row without conversations/content/text");
            }
        }
        _ => tracing::debug!("Skipping non-text corpus row"),
    }
}

fn read_txt_dir(root: &Path) -> Result<Vec<String>> {
    let files = list_txt_files(root);
    if files.is_empty() {
        tracing::warn!(dir = %root.display(), "No .txt files found");
    }
    let mut out = Vec::new();
    for file_path in &files {
        let content = read_file_content(file_path)?;
        out.extend(content.split("\n\n").map(str::to_string));
    }
    Ok(out)
}

fn list_txt_files(root: &Path) -> Vec<PathBuf> {
    let mut txt_files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
        .map(|e| e.path().to_path_buf())
        .collect();
    txt_files.sort();
    txt_files
}
