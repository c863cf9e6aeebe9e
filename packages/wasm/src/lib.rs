//! WebAssembly bindings for the I14Y structure editor core.
//!
//! Exposes the importers, the Turtle exporter and an in-memory editor to
//! JavaScript/TypeScript via `wasm-bindgen`, so a browser can build and
//! export data structures without a server round trip. Compile with
//! `wasm-pack build` to produce an npm-ready package.
//!
//! ## Conversion API: [`import_csv`], [`import_xsd`], [`import_turtle`], [`export_turtle`]
//!
//! ```js
//! import init, { importCsv, exportTurtle } from './i14y_structure_wasm.js';
//! await init();
//!
//! const bytes = new Uint8Array(await file.arrayBuffer());
//! const result = JSON.parse(importCsv(bytes, JSON.stringify({ dataset_name: 'Personen' })));
//! // result: { graph: { nodes, edges }, warnings: [...] }
//! const ttl = exportTurtle(JSON.stringify(result.graph));
//! ```
//!
//! ## Editor API: [`StructureEditor`]
//!
//! ```js
//! const editor = new StructureEditor('Personen', 'de');
//! const dataset = JSON.parse(editor.graph()).nodes[0].id;
//! const name = JSON.parse(editor.addNode(JSON.stringify({
//!   type: 'data_element', title: { de: 'Name' }, parent_id: dataset,
//! })));
//! localStorage.setItem('project', editor.toProject());
//! ```

use chrono::{NaiveDate, Utc};
use i14y_structure::import::{
    csv::{import_csv as csv_import, CsvOptions},
    ttl::{import_ttl, TtlOptions},
    xsd::{import_xsd as xsd_import, XsdOptions},
};
use i14y_structure::turtle::{self, ExportOptions};
use i14y_structure::{
    project, Cardinality, Error, GraphData, GraphModel, Imported, Lang, LangMap, NodePatch,
};
use i14y_structure_api::{CreateNodeRequest, ImportParams, ImportResponse, NodeResponse};
use wasm_bindgen::prelude::*;

/// One-time initialisation called at the start of every exported function.
///
/// Installs the `console_error_panic_hook` when the feature is enabled so
/// that Rust panics are forwarded to the browser console as readable errors
/// rather than appearing as generic "unreachable" WASM traps.
fn setup() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Errors cross the boundary as `"<Kind>: <message>"` strings.
fn js_error(e: Error) -> JsValue {
    JsValue::from_str(&format!("{}: {e}", e.kind()))
}

fn parse_error(what: &str, e: serde_json::Error) -> JsValue {
    JsValue::from_str(&format!("ParseError: invalid {what}: {e}"))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

fn params(options: Option<String>) -> Result<ImportParams, JsValue> {
    match options.as_deref().map(str::trim) {
        None | Some("") => Ok(ImportParams::default()),
        Some(json) => serde_json::from_str(json).map_err(|e| parse_error("options", e)),
    }
}

fn imported_json(imported: Imported) -> Result<String, JsValue> {
    to_json(&ImportResponse::new(
        imported.graph.snapshot(),
        imported.warnings,
    ))
}

fn valid_from(date: Option<String>) -> Result<ExportOptions, JsValue> {
    match date.as_deref().map(str::trim) {
        None | Some("") => Ok(ExportOptions::new(Utc::now().date_naive())),
        Some(d) => d
            .parse::<NaiveDate>()
            .map(ExportOptions::new)
            .map_err(|e| JsValue::from_str(&format!("InvalidArgument: valid_from {d:?}: {e}"))),
    }
}

// ── Conversion API ────────────────────────────────────────────────────────────

/// Import a CSV file. `options` is an optional JSON object:
///
/// ```json
/// { "dataset_name": "Personen", "lang": "de", "encoding": "windows-1252", "delimiter": ";" }
/// ```
///
/// Returns `{success, graph, warnings}` as a JSON string; throws on a fatal
/// parse error.
#[wasm_bindgen(js_name = importCsv)]
pub fn import_csv(bytes: &[u8], options: Option<String>) -> Result<String, JsValue> {
    setup();
    let p = params(options)?;
    let defaults = CsvOptions::default();
    let delimiter = match p.delimiter.as_deref() {
        None => None,
        Some("tab") | Some("\t") => Some(b'\t'),
        Some(d) if d.len() == 1 => Some(d.as_bytes()[0]),
        Some(d) => {
            return Err(JsValue::from_str(&format!(
                "InvalidArgument: delimiter must be one ASCII character, got {d:?}"
            )))
        }
    };
    let options = CsvOptions {
        dataset_name: p.dataset_name.unwrap_or(defaults.dataset_name),
        lang: p.lang.unwrap_or(defaults.lang),
        encoding: p.encoding.unwrap_or(defaults.encoding),
        delimiter,
    };
    imported_json(csv_import(bytes, &options).map_err(js_error)?)
}

/// Import an XML schema. `options` accepts `dataset_name` and `lang`.
#[wasm_bindgen(js_name = importXsd)]
pub fn import_xsd(bytes: &[u8], options: Option<String>) -> Result<String, JsValue> {
    setup();
    let p = params(options)?;
    let defaults = XsdOptions::default();
    let options = XsdOptions {
        dataset_name: p.dataset_name.unwrap_or(defaults.dataset_name),
        lang: p.lang.unwrap_or(defaults.lang),
    };
    imported_json(xsd_import(bytes, &options).map_err(js_error)?)
}

/// Import a SHACL Turtle document. `options` accepts `lang`, the language
/// of untagged literals.
#[wasm_bindgen(js_name = importTurtle)]
pub fn import_turtle(bytes: &[u8], options: Option<String>) -> Result<String, JsValue> {
    setup();
    let p = params(options)?;
    let options = TtlOptions {
        lang: p.lang.unwrap_or(TtlOptions::default().lang),
    };
    imported_json(import_ttl(bytes, &options).map_err(js_error)?)
}

/// Serialize a `{nodes, edges}` graph as SHACL Turtle.
///
/// `valid_from` is an optional `YYYY-MM-DD` date for `schema:validFrom`,
/// defaulting to today. Throws `NoDatasetFound` when the graph has no
/// dataset.
#[wasm_bindgen(js_name = exportTurtle)]
pub fn export_turtle(graph_json: &str, valid_from_date: Option<String>) -> Result<String, JsValue> {
    setup();
    let data: GraphData =
        serde_json::from_str(graph_json).map_err(|e| parse_error("graph", e))?;
    turtle::serialize(&data, &valid_from(valid_from_date)?).map_err(js_error)
}

/// The display label of a title object, following de → en → fr → it.
#[wasm_bindgen(js_name = resolveLabel)]
pub fn resolve_label(title_json: &str) -> Result<Option<String>, JsValue> {
    setup();
    let title: LangMap =
        serde_json::from_str(title_json).map_err(|e| parse_error("title", e))?;
    Ok(title.resolve().map(str::to_string))
}

// ── Editor API ────────────────────────────────────────────────────────────────

/// An editable structure graph held in WASM memory.
///
/// Mutating methods take and return JSON strings in the same shapes as the
/// HTTP API. The host persists the graph via [`toProject`] and restores it
/// with [`fromProject`].
#[wasm_bindgen]
pub struct StructureEditor {
    graph: GraphModel,
}

#[wasm_bindgen]
impl StructureEditor {
    /// Start a graph holding one dataset titled `title` in `lang`.
    #[wasm_bindgen(constructor)]
    pub fn new(title: &str, lang: Option<String>) -> Result<StructureEditor, JsValue> {
        setup();
        let lang = match lang.as_deref() {
            None | Some("") => Lang::De,
            Some(l) => l
                .parse::<Lang>()
                .map_err(|e| JsValue::from_str(&format!("InvalidArgument: {e}")))?,
        };
        let graph = GraphModel::with_dataset(LangMap::single(lang, title)).map_err(js_error)?;
        Ok(Self { graph })
    }

    /// Restore an editor from a project file. Load warnings are dropped;
    /// use [`check_project`] to see them.
    #[wasm_bindgen(js_name = fromProject)]
    pub fn from_project(json: &str) -> Result<StructureEditor, JsValue> {
        setup();
        let imported = project::load(json.as_bytes(), Lang::De).map_err(js_error)?;
        Ok(Self {
            graph: imported.graph,
        })
    }

    /// The graph as `{nodes, edges}`.
    pub fn graph(&self) -> Result<String, JsValue> {
        to_json(&self.graph.snapshot())
    }

    /// Create a node from a `POST /nodes` body; returns `{success, node, edge?}`.
    #[wasm_bindgen(js_name = addNode)]
    pub fn add_node(&mut self, request_json: &str) -> Result<String, JsValue> {
        let req: CreateNodeRequest =
            serde_json::from_str(request_json).map_err(|e| parse_error("node", e))?;
        let resp = match req.parent_id.as_deref() {
            Some(parent) => self
                .graph
                .add_child(parent, req.kind, req.fields(), req.cardinality)
                .map(|(node, edge)| NodeResponse::with_edge(node, edge)),
            None => self.graph.add_node(req.kind, req.fields()).map(NodeResponse::new),
        }
        .map_err(js_error)?;
        to_json(&resp)
    }

    /// Merge a partial update into a node; returns the node.
    #[wasm_bindgen(js_name = updateNode)]
    pub fn update_node(&mut self, id: &str, patch_json: &str) -> Result<String, JsValue> {
        let patch: NodePatch =
            serde_json::from_str(patch_json).map_err(|e| parse_error("patch", e))?;
        to_json(&self.graph.update_node(id, patch).map_err(js_error)?)
    }

    /// Delete a node and its edges. The only dataset cannot be deleted.
    #[wasm_bindgen(js_name = deleteNode)]
    pub fn delete_node(&mut self, id: &str) -> Result<(), JsValue> {
        self.graph.delete_node(id).map(|_| ()).map_err(js_error)
    }

    /// Connect `from → to`; `cardinality` is one of `0..1`, `1..1`, `0..n`,
    /// `1..n` and defaults to `1..1`. Returns the edge.
    pub fn connect(
        &mut self,
        from: &str,
        to: &str,
        cardinality: Option<String>,
    ) -> Result<String, JsValue> {
        let cardinality = cardinality
            .map(|c| {
                serde_json::from_value::<Cardinality>(serde_json::Value::String(c))
                    .map_err(|e| parse_error("cardinality", e))
            })
            .transpose()?;
        to_json(&self.graph.connect(from, to, cardinality).map_err(js_error)?)
    }

    /// Remove an edge.
    pub fn disconnect(&mut self, edge_id: &str) -> Result<(), JsValue> {
        self.graph.disconnect(edge_id).map(|_| ()).map_err(js_error)
    }

    /// The graph as SHACL Turtle; see [`export_turtle`].
    #[wasm_bindgen(js_name = toTurtle)]
    pub fn to_turtle(&self, valid_from_date: Option<String>) -> Result<String, JsValue> {
        turtle::serialize(&self.graph.snapshot(), &valid_from(valid_from_date)?)
            .map_err(js_error)
    }

    /// The graph as a project file, stamped with the current time.
    #[wasm_bindgen(js_name = toProject)]
    pub fn to_project(&self) -> Result<String, JsValue> {
        project::save(&self.graph, Utc::now())
            .to_json()
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

/// Load a project file and return its warnings as a JSON array, without
/// keeping the graph.
#[wasm_bindgen(js_name = checkProject)]
pub fn check_project(json: &str) -> Result<String, JsValue> {
    setup();
    let imported = project::load(json.as_bytes(), Lang::De).map_err(js_error)?;
    to_json(&imported.warnings)
}
