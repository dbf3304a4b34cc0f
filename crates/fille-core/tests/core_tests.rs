use std::fs;
use tempfile::TempDir;

use fille_core::corpus::{into_entries, load_corpus};
use fille_core::Error;

#[test]
fn json_array_of_strings() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("corpus.json");
    fs::write(&path, r#"["Spotting is common in early pregnancy.", "  ", "Regular exercise supports hormonal balance."]"#).unwrap();

    let entries = load_corpus(&path).expect("load");
    assert_eq!(entries.len(), 2, "blank snippets are dropped");
    assert_eq!(entries[0].id, 0);
    assert_eq!(entries[0].text, "Spotting is common in early pregnancy.");
    assert_eq!(entries[1].id, 1);
}

#[test]
fn dataset_rows_flatten_conversation_turns() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("rows.jsonl");
    let rows = [
        r#"{"conversations":[{"role":"user","content":"Is spotting normal?"},{"role":"assistant","content":"Often, yes."}]}"#,
        "",
        r#"{"content":"Iron supports energy levels."}"#,
    ];
    fs::write(&path, rows.join("\n")).unwrap();

    let texts: Vec<String> = load_corpus(&path).expect("load").into_iter().map(|e| e.text).collect();
    assert_eq!(texts, vec!["Is spotting normal?", "Often, yes.", "Iron supports energy levels."]);
}

#[test]
fn txt_directory_paragraphs_in_sorted_file_order() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::write(dir.join("b.txt"), "charlie").unwrap();
    fs::write(dir.join("a.txt"), "alpha\n\nbravo").unwrap();
    fs::write(dir.join("ignored.md"), "not a snippet").unwrap();

    let texts: Vec<String> = load_corpus(dir).expect("load").into_iter().map(|e| e.text).collect();
    assert_eq!(texts, vec!["alpha", "bravo", "charlie"]);
}

#[test]
fn plain_text_is_one_snippet_per_line() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("corpus.txt");
    fs::write(&path, "first\n\nsecond\n").unwrap();
    assert_eq!(load_corpus(&path).expect("load").len(), 2);
}

#[test]
fn empty_corpus_is_a_configuration_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("corpus.json");
    fs::write(&path, "[\"\", \"   \"]").unwrap();
    assert!(matches!(load_corpus(&path), Err(Error::EmptyCorpus(_))));
}

#[test]
fn malformed_json_reports_the_path() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("corpus.jsonl");
    fs::write(&path, "{\"content\": \"ok\"}\n{not json").unwrap();
    match load_corpus(&path) {
        Err(Error::Corpus { reason, .. }) => assert!(reason.starts_with("line 2"), "reason={reason}"),
        other => panic!("expected corpus error, got {other:?}"),
    }
}

#[test]
fn ids_are_positions_after_filtering() {
    let entries = into_entries(["", "a", " ", "b"]);
    let ids: Vec<usize> = entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![0, 1]);
}
