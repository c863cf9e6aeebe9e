//! wasm-bindgen-test integration tests for the I14Y structure WASM bindings.
//!
//! Run with:
//!   wasm-pack test packages/wasm --node
//!
//! These tests compile to WASM and execute in a Node.js process, verifying
//! the exported API surface works end-to-end in a JavaScript host.

use wasm_bindgen_test::*;

// Configure all tests in this file to run in Node.js (no browser required).
wasm_bindgen_test_configure!(run_in_node_experimental);

use i14y_structure_wasm::{
    check_project, export_turtle, import_csv, import_turtle, import_xsd, resolve_label,
    StructureEditor,
};

fn parse(json: &str) -> serde_json::Value {
    serde_json::from_str(json).expect("binding output must be valid JSON")
}

// ---------------------------------------------------------------------------
// importCsv() / exportTurtle()
// ---------------------------------------------------------------------------

#[wasm_bindgen_test]
fn csv_import_infers_columns() {
    let csv = b"Name;Alter;Geburtsdatum\nMuster;42;1980-01-31\n";
    let out = import_csv(csv, Some(r#"{"dataset_name": "Personen"}"#.into())).unwrap();
    let result = parse(&out);
    let nodes = result["graph"]["nodes"].as_array().unwrap();
    assert_eq!(nodes.len(), 4);
    let alter = nodes.iter().find(|n| n["title"]["de"] == "Alter").unwrap();
    assert_eq!(alter["constraints"]["datatype"], "integer");
}

#[wasm_bindgen_test]
fn csv_import_rejects_long_delimiter() {
    let result = import_csv(b"a,b\n1,2\n", Some(r#"{"delimiter": ";;"}"#.into()));
    assert!(result.is_err(), "multi-character delimiter should be rejected");
}

#[wasm_bindgen_test]
fn export_turtle_is_dated() {
    let out = import_csv(b"Name\nMuster\n", None).unwrap();
    let graph = parse(&out)["graph"].to_string();
    let ttl = export_turtle(&graph, Some("2024-03-01".into())).unwrap();
    assert!(ttl.contains("\"2024-03-01\"^^xsd:date"), "got: {ttl}");
    assert!(ttl.contains("sh:PropertyShape"));
}

#[wasm_bindgen_test]
fn export_turtle_without_dataset_returns_err() {
    let err = export_turtle(r#"{"nodes": [], "edges": []}"#, None).unwrap_err();
    assert!(err.as_string().unwrap().starts_with("NoDatasetFound"));
}

// ---------------------------------------------------------------------------
// importXsd() / importTurtle()
// ---------------------------------------------------------------------------

#[wasm_bindgen_test]
fn xsd_import_builds_class() {
    let xsd = br#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="person">
    <xs:complexType><xs:sequence>
      <xs:element name="name" type="xs:string"/>
    </xs:sequence></xs:complexType>
  </xs:element>
</xs:schema>"#;
    let result = parse(&import_xsd(xsd, None).unwrap());
    let nodes = result["graph"]["nodes"].as_array().unwrap();
    assert!(nodes.iter().any(|n| n["type"] == "class"));
}

#[wasm_bindgen_test]
fn malformed_turtle_returns_parse_error() {
    let err = import_turtle(b"this is not turtle", None).unwrap_err();
    assert!(err.as_string().unwrap().starts_with("ParseError"));
}

// ---------------------------------------------------------------------------
// StructureEditor
// ---------------------------------------------------------------------------

#[wasm_bindgen_test]
fn editor_builds_and_exports() {
    let mut editor = StructureEditor::new("Personen", Some("de".into())).unwrap();
    let graph = parse(&editor.graph().unwrap());
    let dataset = graph["nodes"][0]["id"].as_str().unwrap().to_string();

    let created = parse(
        &editor
            .add_node(&format!(
                r#"{{"type": "data_element", "title": {{"de": "Name"}}, "parent_id": "{dataset}", "cardinality": "0..1"}}"#
            ))
            .unwrap(),
    );
    assert_eq!(created["edge"]["cardinality"], "0..1");

    let ttl = editor.to_turtle(None).unwrap();
    assert!(ttl.contains("sh:minCount 0"));

    let restored = StructureEditor::from_project(&editor.to_project().unwrap()).unwrap();
    let graph = parse(&restored.graph().unwrap());
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 2);
}

#[wasm_bindgen_test]
fn editor_protects_only_dataset() {
    let mut editor = StructureEditor::new("Personen", None).unwrap();
    let graph = parse(&editor.graph().unwrap());
    let dataset = graph["nodes"][0]["id"].as_str().unwrap().to_string();
    let err = editor.delete_node(&dataset).unwrap_err();
    assert!(err.as_string().unwrap().starts_with("Protected"));
}

#[wasm_bindgen_test]
fn editor_rejects_duplicate_edge() {
    let mut editor = StructureEditor::new("Personen", None).unwrap();
    let graph = parse(&editor.graph().unwrap());
    let dataset = graph["nodes"][0]["id"].as_str().unwrap().to_string();
    let created = parse(
        &editor
            .add_node(r#"{"type": "data_element", "title": "Name"}"#)
            .unwrap(),
    );
    let id = created["node"]["id"].as_str().unwrap().to_string();
    editor.connect(&dataset, &id, Some("1..n".into())).unwrap();
    let err = editor.connect(&dataset, &id, None).unwrap_err();
    assert!(err.as_string().unwrap().starts_with("Conflict"));
}

// ---------------------------------------------------------------------------
// resolveLabel() / checkProject()
// ---------------------------------------------------------------------------

#[wasm_bindgen_test]
fn resolve_label_falls_back_through_languages() {
    assert_eq!(
        resolve_label(r#"{"fr": "Nom", "en": "Name"}"#).unwrap(),
        Some("Name".to_string())
    );
    assert_eq!(resolve_label("{}").unwrap(), None);
}

#[wasm_bindgen_test]
fn check_project_reports_dangling_edges() {
    let project = r#"{
        "format_version": 2,
        "nodes": [{"id": "d", "type": "dataset", "title": {"de": "D"}}],
        "edges": [{"id": "e", "from": "d", "to": "gone"}]
    }"#;
    let warnings = parse(&check_project(project).unwrap());
    assert_eq!(warnings.as_array().unwrap().len(), 1);
}
