//! Diagram loading from local files

use flowboard_core::{DiagramSource, FileDiagramSource, FlowboardError};
use std::fs;
use tempfile::TempDir;

const DOC: &str = r#"{
  "config": { "layout": "horizontal", "updateInterval": 30000, "title": "Ops" },
  "nodes": [
    { "name": "api", "displayName": "API", "connectTo": ["queue"] },
    { "name": "queue", "displayName": "Queue" }
  ]
}"#;

fn dir_with(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, body) in files {
        fs::write(dir.path().join(name), body).unwrap();
    }
    dir
}

#[tokio::test]
async fn reads_and_parses_a_diagram() {
    let dir = dir_with(&[("ops.json", DOC)]);
    let source = FileDiagramSource::new(dir.path());

    let config = source.fetch("ops.json").await.unwrap();
    assert_eq!(config.config.title, "Ops");
    assert_eq!(config.nodes.len(), 2);
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let dir = dir_with(&[]);
    let source = FileDiagramSource::new(dir.path());

    let err = source.fetch("nope.json").await.unwrap_err();
    assert!(matches!(err, FlowboardError::ConfigNotFound(name) if name == "nope.json"));
}

#[tokio::test]
async fn path_traversal_is_rejected() {
    let dir = dir_with(&[("ops.json", DOC)]);
    let source = FileDiagramSource::new(dir.path().join("sub"));

    for name in ["../ops.json", "/etc/passwd", ""] {
        let err = source.fetch(name).await.unwrap_err();
        assert!(matches!(err, FlowboardError::Config(_)), "{name} should be rejected");
    }
}

#[tokio::test]
async fn malformed_documents_are_config_errors() {
    let dir = dir_with(&[
        ("broken.json", "{ \"config\": "),
        ("no-nodes.json", r#"{ "config": {} }"#),
        ("dupes.json", r#"{ "config": {}, "nodes": [{ "name": "a" }, { "name": "a" }] }"#),
    ]);
    let source = FileDiagramSource::new(dir.path());

    for name in ["broken.json", "no-nodes.json", "dupes.json"] {
        let err = source.fetch(name).await.unwrap_err();
        assert!(matches!(err, FlowboardError::Config(_)), "{name}: {err}");
    }
}
