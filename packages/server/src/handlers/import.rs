//! Upload handlers: CSV, XSD and Turtle import, and project load.
//!
//! Every endpoint takes a `multipart/form-data` body with a `file` part and
//! optional text parts named after the [`ImportParams`] fields. The upload is
//! parsed into a fresh graph first; the session graph is replaced only when
//! that succeeds.

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use i14y_structure::import::{
    csv::{import_csv, CsvOptions},
    ttl::{import_ttl, TtlOptions},
    xsd::{import_xsd, XsdOptions},
};
use i14y_structure::{project, Imported, Lang};
use i14y_structure_api::{ImportParams, ImportResponse};
use tracing::{info, warn};

use super::AppState;
use crate::{error::AppError, sessions::Session};

/// A received upload.
#[derive(Debug, Default)]
pub struct Upload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
    pub params: ImportParams,
}

impl Upload {
    /// The dataset title: the `dataset_name` field, else the file stem.
    fn dataset_name(&self) -> Option<String> {
        self.params
            .dataset_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| {
                let name = self.file_name.as_deref()?;
                let stem = name.rsplit(['/', '\\']).next().unwrap_or(name);
                let stem = stem.rsplit_once('.').map_or(stem, |(s, _)| s).trim();
                (!stem.is_empty()).then(|| stem.to_string())
            })
    }
}

/// Read the `file` part and the parameter parts of a multipart body.
pub async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    let mut upload = Upload::default();
    let mut has_file = false;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            upload.file_name = field.file_name().map(str::to_string);
            upload.bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("cannot read upload: {e}")))?
                .to_vec();
            has_file = true;
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(format!("cannot read field {name}: {e}")))?;
        let value = value.trim().to_string();
        if value.is_empty() {
            continue;
        }
        match name.as_str() {
            "dataset_name" | "datasetName" => upload.params.dataset_name = Some(value),
            "lang" | "language" => {
                let lang = value
                    .parse::<Lang>()
                    .map_err(|e| AppError::BadRequest(format!("field lang: {e}")))?;
                upload.params.lang = Some(lang);
            }
            "encoding" => upload.params.encoding = Some(value),
            "delimiter" => upload.params.delimiter = Some(value),
            other => warn!("import: ignoring unknown form field {other:?}"),
        }
    }

    if !has_file {
        return Err(AppError::BadRequest("no file uploaded".into()));
    }
    if upload.bytes.is_empty() {
        return Err(AppError::BadRequest("uploaded file is empty".into()));
    }
    Ok(upload)
}

/// Single-byte CSV delimiter from a form value (`;`, `,`, `tab`, `\t`, …).
fn delimiter(value: Option<&str>) -> Result<Option<u8>, AppError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value {
        "tab" | "\\t" | "\t" => Ok(Some(b'\t')),
        v if v.len() == 1 && v.is_ascii() => Ok(Some(v.as_bytes()[0])),
        v => Err(AppError::BadRequest(format!(
            "delimiter must be a single ASCII character, got {v:?}"
        ))),
    }
}

/// Install an import result in the session and build the response.
fn install(session: &Session, what: &str, imported: Imported) -> Json<ImportResponse> {
    let Imported { graph, warnings } = imported;
    let data = graph.snapshot();
    session.replace_graph(graph);
    info!(
        "import: session {} loaded {what} with {} node(s), {} edge(s), {} warning(s)",
        session.id(),
        data.nodes.len(),
        data.edges.len(),
        warnings.len()
    );
    Json(ImportResponse::new(data, warnings))
}

/// `POST /import/csv`: one data element per column.
pub async fn csv(
    State(state): State<AppState>,
    Extension(session): Extension<Arc<Session>>,
    multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    let defaults = CsvOptions::default();
    let options = CsvOptions {
        dataset_name: upload.dataset_name().unwrap_or(defaults.dataset_name),
        lang: upload.params.lang.unwrap_or(state.config.default_lang),
        encoding: upload.params.encoding.clone().unwrap_or(defaults.encoding),
        delimiter: delimiter(upload.params.delimiter.as_deref())?,
    };
    let imported = import_csv(&upload.bytes, &options)?;
    Ok(install(&session, "CSV", imported))
}

/// `POST /import/xsd`: global elements of an XML schema.
pub async fn xsd(
    Extension(session): Extension<Arc<Session>>,
    multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    let defaults = XsdOptions::default();
    let options = XsdOptions {
        dataset_name: upload.dataset_name().unwrap_or(defaults.dataset_name),
        lang: upload.params.lang.unwrap_or(defaults.lang),
    };
    let imported = import_xsd(&upload.bytes, &options)?;
    Ok(install(&session, "XSD", imported))
}

/// `POST /import/ttl`: a SHACL data structure in Turtle.
pub async fn ttl(
    State(state): State<AppState>,
    Extension(session): Extension<Arc<Session>>,
    multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    let options = TtlOptions {
        lang: upload.params.lang.unwrap_or(state.config.default_lang),
    };
    let imported = import_ttl(&upload.bytes, &options)?;
    Ok(install(&session, "Turtle", imported))
}

/// `POST /project/load`: a project file saved by `GET /project/save`, or
/// one of the older layout.
pub async fn load_project(
    State(state): State<AppState>,
    Extension(session): Extension<Arc<Session>>,
    multipart: Multipart,
) -> Result<Json<ImportResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    let lang = upload.params.lang.unwrap_or(state.config.default_lang);
    let imported = project::load(&upload.bytes, lang)?;
    Ok(install(&session, "project", imported))
}
