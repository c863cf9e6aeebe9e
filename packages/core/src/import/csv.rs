//! CSV import: one data element per column.

use encoding_rs::Encoding;
use tracing::debug;

use crate::datatype;
use crate::error::{Error, Result};
use crate::graph::GraphModel;
use crate::import::{ImportWarning, Imported, WarningKind};
use crate::types::{Cardinality, Constraints, Datatype, Lang, LangMap, NodeFields, NodeKind};
use crate::validation::slugify;

/// Parameters of a CSV import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    /// Title of the generated dataset.
    pub dataset_name: String,
    /// Language of the generated titles.
    pub lang: Lang,
    /// WHATWG encoding label of the input (`utf-8`, `windows-1252`, …).
    pub encoding: String,
    /// Field delimiter; detected from the header line when `None`.
    pub delimiter: Option<u8>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            dataset_name: "Dataset".to_string(),
            lang: Lang::De,
            encoding: "utf-8".to_string(),
            delimiter: None,
        }
    }
}

/// Import a CSV document with a header row.
///
/// Produces a dataset plus one data element per column, in column order, with
/// `order` set to the 1-based column position and the datatype inferred from
/// the column's values. Rows with a different cell count than the header are
/// padded or truncated and reported once as a warning.
pub fn import_csv(bytes: &[u8], options: &CsvOptions) -> Result<Imported> {
    let text = decode(bytes, &options.encoding)?;
    let header_line = text
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| Error::Parse("CSV input is empty".into()))?;
    let delimiter = options
        .delimiter
        .unwrap_or_else(|| detect_delimiter(header_line));

    let mut reader = ::csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .trim(::csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::Parse(format!("CSV header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(Error::Parse("CSV header row is empty".into()));
    }

    let mut columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    let mut ragged_rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| Error::Parse(format!("CSV row {}: {e}", i + 2)))?;
        if record.len() != headers.len() {
            ragged_rows.push(i + 2);
        }
        for (c, column) in columns.iter_mut().enumerate() {
            column.push(record.get(c).unwrap_or_default().to_string());
        }
    }

    let mut warnings = Vec::new();
    if !ragged_rows.is_empty() {
        warnings.push(ImportWarning::new(
            WarningKind::RaggedRow,
            None,
            format!(
                "{} row(s) did not match the {} header columns and were padded or truncated (rows {})",
                ragged_rows.len(),
                headers.len(),
                summarize(&ragged_rows)
            ),
        ));
    }

    let dataset_name = match options.dataset_name.trim() {
        "" => "Dataset",
        name => name,
    };
    let mut graph = GraphModel::with_dataset(LangMap::single(options.lang, dataset_name))?;
    let dataset_id = graph
        .dataset()
        .map(|n| n.id.clone())
        .ok_or(Error::NoDatasetFound)?;

    for (i, (header, values)) in headers.iter().zip(&columns).enumerate() {
        let position = i + 1;
        let title = if slugify(header).is_empty() {
            let fallback = format!("column_{position}");
            warnings.push(ImportWarning::new(
                WarningKind::UnusableName,
                Some(fallback.as_str()),
                format!("header {header:?} is not usable as a name"),
            ));
            fallback
        } else {
            header.clone()
        };

        let cardinality = if values.iter().any(|v| v.is_empty()) {
            Cardinality::ZeroOrOne
        } else {
            Cardinality::ExactlyOne
        };
        let fields = NodeFields {
            order: Some(position as i64),
            constraints: Some(column_constraints(values)),
            ..NodeFields::titled(LangMap::single(options.lang, title))
        };
        graph.add_child(&dataset_id, NodeKind::DataElement, fields, Some(cardinality))?;
    }

    graph.auto_layout();
    debug!(
        "csv: imported {} column(s) from {} row(s)",
        headers.len(),
        columns.first().map_or(0, Vec::len)
    );
    Ok(Imported { graph, warnings })
}

/// Decode `bytes` with the encoding named by `label`, dropping a byte order
/// mark. Malformed input is fatal.
fn decode(bytes: &[u8], label: &str) -> Result<String> {
    let encoding = Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| Error::Parse(format!("unknown text encoding {label:?}")))?;
    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    if had_errors {
        return Err(Error::Parse(format!(
            "input is not valid {} text",
            encoding.name()
        )));
    }
    Ok(text.trim_start_matches('\u{feff}').to_string())
}

/// `;` when the header line contains one, else tab when present, else `,`.
fn detect_delimiter(header_line: &str) -> u8 {
    if header_line.contains(';') {
        b';'
    } else if header_line.contains('\t') {
        b'\t'
    } else {
        b','
    }
}

/// Datatype plus, for numeric columns, the range of the values that are
/// valid literals of that datatype.
fn column_constraints(values: &[String]) -> Constraints {
    let datatype = datatype::infer_column(values.iter().map(String::as_str));
    let mut constraints = Constraints::with_datatype(datatype);
    let (min, max) = match datatype {
        Datatype::Integer => bounds(values, |v| {
            datatype::is_integer(v)
                .then(|| v.parse::<i128>().ok())
                .flatten()
        }),
        Datatype::Decimal | Datatype::Double => bounds(values, |v| {
            datatype::is_decimal(v)
                .then(|| v.parse::<f64>().ok())
                .flatten()
        }),
        _ => (None, None),
    };
    constraints.min_inclusive = min;
    constraints.max_inclusive = max;
    constraints
}

/// The original text of the smallest and largest value `parse` accepts.
fn bounds<T: PartialOrd + Copy>(
    values: &[String],
    parse: impl Fn(&str) -> Option<T>,
) -> (Option<String>, Option<String>) {
    let mut min: Option<(T, &String)> = None;
    let mut max: Option<(T, &String)> = None;
    for v in values {
        let Some(n) = parse(v.trim()) else {
            continue;
        };
        if min.map_or(true, |(m, _)| n < m) {
            min = Some((n, v));
        }
        if max.map_or(true, |(m, _)| n > m) {
            max = Some((n, v));
        }
    }
    (
        min.map(|(_, v)| v.trim().to_string()),
        max.map(|(_, v)| v.trim().to_string()),
    )
}

fn summarize(rows: &[usize]) -> String {
    let shown: Vec<String> = rows.iter().take(5).map(usize::to_string).collect();
    if rows.len() > 5 {
        format!("{}, …", shown.join(", "))
    } else {
        shown.join(", ")
    }
}

// --- tests -------------------------------------------------------------------
