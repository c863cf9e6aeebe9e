//! Namespaces and terms of the I14Y SHACL profile.

pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
pub const CUBE: &str = "http://purl.org/linked-data/cube#";
pub const DCAT: &str = "http://www.w3.org/ns/dcat#";
pub const DCTERMS: &str = "http://purl.org/dc/terms/";
pub const OWL: &str = "http://www.w3.org/2002/07/owl#";
pub const PAV: &str = "http://purl.org/pav/";
pub const SCHEMA: &str = "https://schema.org/";
pub const SH: &str = "http://www.w3.org/ns/shacl#";

/// Base of every dataset structure namespace.
pub const DATASET_BASE: &str = "https://www.i14y.admin.ch/resources/datasets/";

/// Prefix declarations emitted at the top of every document, sorted by
/// prefix. The per-dataset `i14y:` prefix is added separately.
pub const PREFIXES: [(&str, &str); 10] = [
    ("cube", CUBE),
    ("dcat", DCAT),
    ("dcterms", DCTERMS),
    ("owl", OWL),
    ("pav", PAV),
    ("rdf", RDF),
    ("rdfs", RDFS),
    ("schema", SCHEMA),
    ("sh", SH),
    ("xsd", XSD),
];

/// The structure namespace of one dataset.
pub fn structure_namespace(base: &str, dataset_slug: &str) -> String {
    format!("{base}{dataset_slug}/structure/")
}

/// Expands a `prefix:local` term against [`PREFIXES`].
pub fn expand(term: &str) -> Option<String> {
    let (prefix, local) = term.split_once(':')?;
    PREFIXES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, ns)| format!("{ns}{local}"))
}

/// Compacts a full IRI into `prefix:local` when the local part is a plain
/// name, otherwise returns `None`.
pub fn compact(iri: &str) -> Option<String> {
    PREFIXES.iter().find_map(|(prefix, ns)| {
        let local = iri.strip_prefix(ns)?;
        let plain = !local.is_empty()
            && local.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && local.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
        plain.then(|| format!("{prefix}:{local}"))
    })
}
