use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::types::{Node, NodeKind};

/// Ways a [`Node`] can violate the invariants of its variant.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} requires a title in at least one language")]
    MissingTitle(NodeKind),

    #[error("data element title {0:?} does not yield a usable local name")]
    NoLocalName(String),

    #[error("{0} is only allowed on data elements, not on a {1}")]
    DataElementOnly(&'static str, NodeKind),

    #[error("{0} is only allowed on a dataset, not on a {1}")]
    DatasetOnly(&'static str, NodeKind),

    #[error("identifier {0:?} does not yield a usable local name")]
    InvalidIdentifier(String),

    #[error("min_length {0} exceeds max_length {1}")]
    LengthBounds(u32, u32),

    #[error("pattern {0:?} is not a valid regular expression: {1}")]
    InvalidPattern(String, String),

    #[error("in_values must not contain blank entries")]
    BlankInValue,

    #[error("{0} must be an absolute IRI or a prefixed name, got {1:?}")]
    InvalidIri(&'static str, String),
}

impl From<ValidationError> for crate::Error {
    fn from(e: ValidationError) -> Self {
        crate::Error::InvalidArgument(e.to_string())
    }
}

/// Validate a [`Node`] against the required-field invariants of its variant.
///
/// Returns the first violation found, in field order.
pub fn validate_node(node: &Node) -> Result<(), ValidationError> {
    let Some(label) = node.title.resolve() else {
        return Err(ValidationError::MissingTitle(node.kind));
    };

    if node.kind == NodeKind::DataElement && slugify(label).is_empty() {
        return Err(ValidationError::NoLocalName(label.to_string()));
    }

    if let Some(identifier) = &node.identifier {
        if slugify(identifier).is_empty() {
            return Err(ValidationError::InvalidIdentifier(identifier.clone()));
        }
    }

    if node.kind != NodeKind::DataElement {
        if node.concept_ref.is_some() {
            return Err(ValidationError::DataElementOnly("concept_ref", node.kind));
        }
        if node.constraints.is_some() {
            return Err(ValidationError::DataElementOnly("constraints", node.kind));
        }
    }

    if node.kind != NodeKind::Dataset {
        if node.version.is_some() {
            return Err(ValidationError::DatasetOnly("version", node.kind));
        }
        if node.dataset_ref.is_some() {
            return Err(ValidationError::DatasetOnly("dataset_ref", node.kind));
        }
    }

    if let Some(concept) = &node.concept_ref {
        check_iri("concept_ref.uri", &concept.uri)?;
    }

    if let Some(dataset) = &node.dataset_ref {
        check_iri("dataset_ref.uri", &dataset.uri)?;
    }

    if let Some(c) = &node.constraints {
        if let (Some(min), Some(max)) = (c.min_length, c.max_length) {
            if min > max {
                return Err(ValidationError::LengthBounds(min, max));
            }
        }
        if let Some(pattern) = &c.pattern {
            check_pattern(pattern)?;
        }
        if c.in_values.iter().any(|v| v.trim().is_empty()) {
            return Err(ValidationError::BlankInValue);
        }
        if let Some(iri) = &c.node_reference {
            check_iri("node_reference", iri)?;
        }
        if let Some(iri) = &c.range {
            check_iri("range", iri)?;
        }
    }

    Ok(())
}

/// Checks that `pattern` compiles as a regular expression.
pub fn check_pattern(pattern: &str) -> Result<(), ValidationError> {
    Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| ValidationError::InvalidPattern(pattern.to_string(), e.to_string()))
}

/// Checks that `value` can be written as a Turtle IRI term.
pub fn check_iri(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if IRI_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidIri(field, value.to_string()))
    }
}

/// Turns a label into a URI-safe local name.
///
/// Whitespace, `-` and `/` become `_`; every other character that is not a
/// letter, digit or `_` is dropped. Runs of `_` collapse to one and leading or
/// trailing `_` are removed. Case is preserved.
///
/// ```text
/// "Date of birth"       → "Date_of_birth"
/// "Nummer (AHV-Nr.)"    → "Nummer_AHV_Nr"
/// "  ()  "              → ""
/// ```
pub fn slugify(text: &str) -> String {
    let mapped: String = text
        .trim()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '_' {
                Some(c)
            } else if c.is_whitespace() || c == '-' || c == '/' {
                Some('_')
            } else {
                None
            }
        })
        .collect();
    UNDERSCORE_RUN_RE
        .replace_all(&mapped, "_")
        .trim_matches('_')
        .to_string()
}

/// A local name derived from an opaque node id, for untitled nodes.
pub fn sanitize_id(id: &str) -> String {
    let slug = slugify(id);
    if slug.is_empty() {
        "node".to_string()
    } else {
        format!("n_{slug}")
    }
}

static IRI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[A-Za-z][A-Za-z0-9+.\-]*:[^\s<>"{}|^`\\]+$"#).expect("invalid IRI regex")
});

static UNDERSCORE_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{2,}").expect("invalid underscore regex"));

// --- tests -------------------------------------------------------------------
