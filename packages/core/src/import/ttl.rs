//! Turtle import: reconstructs a structure graph from a document following
//! the I14Y SHACL profile written by [`crate::turtle`].
//!
//! The dataset is the `cube:DataStructureDefinition` node shape, or failing
//! that the first node shape with `sh:property` values that no `sh:node`
//! points at. Every `sh:property` of a node shape becomes a child: a class
//! when the property shape is an `owl:ObjectProperty` (or has no
//! `sh:datatype`) and its `sh:node` is a node shape of the same document, a
//! data element otherwise.
//!
//! Labels are read per language from `dcterms:title`, then `sh:name`, then
//! `rdfs:label`; descriptions from `dcterms:description`, `sh:description`
//! and `rdfs:comment`. Untagged literals count as the import language.

use std::collections::HashMap;

use oxrdf::{Subject, Term};
use oxttl::TurtleParser;
use tracing::debug;

use crate::datatype;
use crate::error::{Error, Result};
use crate::graph::GraphModel;
use crate::import::{ImportWarning, Imported, WarningKind};
use crate::types::{
    Cardinality, ConceptRef, Constraints, DatasetRef, Datatype, Lang, LangMap, NodeFields,
    NodeKind, Position,
};
use crate::validation::slugify;
use crate::vocab::{CUBE, DCAT, DCTERMS, OWL, PAV, RDF, RDFS, SCHEMA, SH, XSD};

/// Parameters of a Turtle import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TtlOptions {
    /// Language assigned to literals without a language tag.
    pub lang: Lang,
}

impl Default for TtlOptions {
    fn default() -> Self {
        Self { lang: Lang::De }
    }
}

const TITLES: [(&str, &str); 3] = [(DCTERMS, "title"), (SH, "name"), (RDFS, "label")];
const DESCRIPTIONS: [(&str, &str); 3] = [
    (DCTERMS, "description"),
    (SH, "description"),
    (RDFS, "comment"),
];

/// Import a Turtle document.
///
/// Syntax errors and a document without a dataset shape fail with
/// [`Error::Parse`]. A property shape without any title is skipped together
/// with its subtree and reported as [`WarningKind::SchemaMismatch`].
pub fn import_ttl(bytes: &[u8], options: &TtlOptions) -> Result<Imported> {
    let store = Store::parse(bytes)?;
    let dataset = store.dataset()?;

    let mut warnings = Vec::new();
    let mut title = store.lang_map(&dataset, &TITLES, options.lang);
    if title.is_empty() {
        let fallback = local_name(&dataset).unwrap_or("Dataset").to_string();
        warnings.push(ImportWarning::new(
            WarningKind::SchemaMismatch,
            Some(dataset.to_string().as_str()),
            format!("dataset shape has no title, using {fallback:?}"),
        ));
        title.set(options.lang, fallback);
    }
    let version = store
        .literal(&dataset, PAV, "version")
        .or_else(|| store.literal(&dataset, SCHEMA, "version"))
        .map(str::to_string);
    let dataset_ref = match (
        store.literal(&dataset, DCTERMS, "identifier"),
        store.iri(&dataset, DCAT, "dataset"),
    ) {
        (Some(id), Some(uri)) => Some(DatasetRef {
            id: id.to_string(),
            uri: uri.to_string(),
        }),
        (Some(id), None) => Some(DatasetRef::new(id)),
        (None, Some(uri)) => DatasetRef::from_uri(uri),
        (None, None) => None,
    };

    let mut graph = GraphModel::new();
    let fields = NodeFields {
        description: store.lang_map(&dataset, &DESCRIPTIONS, options.lang),
        identifier: identifier(&store, &dataset, &title),
        position: Some(Position { x: 0.5, y: 0.1 }),
        version,
        dataset_ref,
        ..NodeFields::titled(title)
    };
    let root = graph.add_node(NodeKind::Dataset, fields)?;

    let mut builder = Builder {
        store: &store,
        graph,
        warnings,
        lang: options.lang,
        stack: vec![dataset.clone()],
    };
    builder.properties(&root.id, &dataset);

    let Builder {
        mut graph,
        warnings,
        ..
    } = builder;
    graph.auto_layout();
    debug!(
        "ttl: imported {} node(s) from {} subject(s) with {} warning(s)",
        graph.node_count(),
        store.subjects.len(),
        warnings.len()
    );
    Ok(Imported { graph, warnings })
}

// --- triples -----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Res {
    Iri(String),
    Blank(String),
}

impl std::fmt::Display for Res {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Res::Iri(iri) => write!(f, "<{iri}>"),
            Res::Blank(id) => write!(f, "_:{id}"),
        }
    }
}

#[derive(Debug, Clone)]
enum Obj {
    Res(Res),
    Literal {
        value: String,
        lang: Option<String>,
        datatype: String,
    },
}

impl Obj {
    fn as_res(&self) -> Option<&Res> {
        match self {
            Obj::Res(r) => Some(r),
            Obj::Literal { .. } => None,
        }
    }

    fn as_iri(&self) -> Option<&str> {
        match self {
            Obj::Res(Res::Iri(iri)) => Some(iri),
            _ => None,
        }
    }

    /// Lexical form of a literal, or the IRI of a named node.
    fn lexical(&self) -> Option<&str> {
        match self {
            Obj::Literal { value, .. } => Some(value),
            Obj::Res(Res::Iri(iri)) => Some(iri),
            Obj::Res(Res::Blank(_)) => None,
        }
    }
}

/// All triples of a document, grouped by subject in document order.
struct Store {
    subjects: Vec<Res>,
    triples: HashMap<Res, Vec<(String, Obj)>>,
}

impl Store {
    fn parse(bytes: &[u8]) -> Result<Self> {
        let mut store = Store {
            subjects: Vec::new(),
            triples: HashMap::new(),
        };
        for triple in TurtleParser::new().for_reader(bytes) {
            let triple = triple.map_err(|e| Error::Parse(format!("invalid Turtle: {e}")))?;
            let Some(subject) = to_res(triple.subject) else {
                continue;
            };
            let Some(object) = to_obj(triple.object) else {
                continue;
            };
            let entry = store.triples.entry(subject.clone()).or_insert_with(|| {
                store.subjects.push(subject);
                Vec::new()
            });
            entry.push((triple.predicate.into_string(), object));
        }
        Ok(store)
    }

    fn objects<'s>(
        &'s self,
        s: &Res,
        ns: &'static str,
        local: &'static str,
    ) -> impl Iterator<Item = &'s Obj> + 's {
        self.triples
            .get(s)
            .into_iter()
            .flatten()
            .filter(move |(p, _)| is(p, ns, local))
            .map(|(_, o)| o)
    }

    fn first(&self, s: &Res, ns: &'static str, local: &'static str) -> Option<&Obj> {
        self.objects(s, ns, local).next()
    }

    fn literal(&self, s: &Res, ns: &'static str, local: &'static str) -> Option<&str> {
        self.objects(s, ns, local).find_map(|o| match o {
            Obj::Literal { value, .. } => Some(value.as_str()),
            Obj::Res(_) => None,
        })
    }

    fn iri(&self, s: &Res, ns: &'static str, local: &'static str) -> Option<&str> {
        self.objects(s, ns, local).find_map(Obj::as_iri)
    }

    fn has_type(&self, s: &Res, ns: &'static str, local: &'static str) -> bool {
        self.objects(s, RDF, "type")
            .filter_map(Obj::as_iri)
            .any(|t| is(t, ns, local))
    }

    fn is_object_of(&self, target: &Res, ns: &'static str, local: &'static str) -> bool {
        self.triples.values().flatten().any(|(p, o)| {
            is(p, ns, local) && o.as_res() == Some(target)
        })
    }

    /// Items of an RDF collection, in order. Stops at `rdf:nil` or at the
    /// first malformed or repeated cell.
    fn list(&self, head: &Obj) -> Vec<&Obj> {
        let mut items = Vec::new();
        let mut seen = Vec::new();
        let mut cell = head.as_res();
        while let Some(current) = cell {
            if matches!(current, Res::Iri(iri) if is(iri, RDF, "nil")) || seen.contains(&current) {
                break;
            }
            seen.push(current);
            let Some(item) = self.first(current, RDF, "first") else {
                break;
            };
            items.push(item);
            cell = self.first(current, RDF, "rest").and_then(Obj::as_res);
        }
        items
    }

    /// Literals of the given predicates merged per language; the first
    /// predicate providing a language wins.
    fn lang_map(&self, s: &Res, predicates: &[(&'static str, &'static str)], default: Lang) -> LangMap {
        let mut map = LangMap::new();
        for (ns, local) in predicates {
            let mut found = LangMap::new();
            for obj in self.objects(s, ns, local) {
                let Obj::Literal { value, lang, .. } = obj else {
                    continue;
                };
                let lang = match lang {
                    Some(tag) => match tag.parse::<Lang>() {
                        Ok(lang) => lang,
                        Err(_) => {
                            debug!("ttl: ignoring literal with language {tag} on {s}");
                            continue;
                        }
                    },
                    None => default,
                };
                if found.get(lang).is_none() {
                    found.set(lang, value.trim());
                }
            }
            map.fill_missing(&found);
        }
        map
    }

    fn dataset(&self) -> Result<Res> {
        let shapes: Vec<&Res> = self
            .subjects
            .iter()
            .filter(|s| self.has_type(s, SH, "NodeShape"))
            .collect();
        if let Some(dsd) = shapes
            .iter()
            .find(|s| self.has_type(s, CUBE, "DataStructureDefinition"))
        {
            return Ok((*dsd).clone());
        }
        shapes
            .into_iter()
            .find(|s| self.first(s, SH, "property").is_some() && !self.is_object_of(s, SH, "node"))
            .cloned()
            .ok_or_else(|| Error::Parse("document contains no dataset node shape".into()))
    }
}

fn is(iri: &str, ns: &str, local: &str) -> bool {
    iri.strip_prefix(ns) == Some(local)
}

fn to_res(subject: Subject) -> Option<Res> {
    #[allow(unreachable_patterns)]
    match subject {
        Subject::NamedNode(n) => Some(Res::Iri(n.into_string())),
        Subject::BlankNode(b) => Some(Res::Blank(b.into_string())),
        _ => None,
    }
}

fn to_obj(term: Term) -> Option<Obj> {
    #[allow(unreachable_patterns)]
    match term {
        Term::NamedNode(n) => Some(Obj::Res(Res::Iri(n.into_string()))),
        Term::BlankNode(b) => Some(Obj::Res(Res::Blank(b.into_string()))),
        Term::Literal(l) => Some(Obj::Literal {
            value: l.value().to_string(),
            lang: l.language().map(str::to_string),
            datatype: l.datatype().as_str().to_string(),
        }),
        _ => None,
    }
}

/// Last segment of an IRI path or fragment.
fn local_name(res: &Res) -> Option<&str> {
    match res {
        Res::Iri(iri) => iri.rsplit(|c| c == '/' || c == '#').next().filter(|l| !l.is_empty()),
        Res::Blank(_) => None,
    }
}

/// The URI local name as identifier, when it is not just the title slug.
///
/// A `-N` suffix is read as a collision suffix only when the document also
/// describes the un-suffixed IRI.
fn identifier(store: &Store, res: &Res, title: &LangMap) -> Option<String> {
    let local = local_name(res)?;
    let base = match (res, local.rsplit_once('-')) {
        (Res::Iri(iri), Some((base, n)))
            if !base.is_empty() && n.parse::<u32>().is_ok_and(|n| n >= 2) =>
        {
            let stem = &iri[..iri.len() - n.len() - 1];
            if store.triples.contains_key(&Res::Iri(stem.to_string())) {
                base
            } else {
                local
            }
        }
        _ => local,
    };
    let title_slug = title.resolve().map(slugify).unwrap_or_default();
    (base != title_slug && !slugify(base).is_empty()).then(|| base.to_string())
}

fn count(obj: Option<&Obj>) -> Option<u32> {
    obj.and_then(Obj::lexical).and_then(|v| v.trim().parse().ok())
}

// --- tree building -----------------------------------------------------------

struct Builder<'s> {
    store: &'s Store,
    graph: GraphModel,
    warnings: Vec<ImportWarning>,
    lang: Lang,
    /// Node shapes being expanded, for recursion detection.
    stack: Vec<Res>,
}

impl Builder<'_> {
    fn properties(&mut self, parent_id: &str, shape: &Res) {
        let store = self.store;
        for property in store.objects(shape, SH, "property").filter_map(Obj::as_res) {
            self.property(parent_id, property);
        }
    }

    fn property(&mut self, parent_id: &str, property: &Res) {
        let store = self.store;
        let subject = property.to_string();

        let title = store.lang_map(property, &TITLES, self.lang);
        if title.is_empty() {
            self.warnings.push(ImportWarning::new(
                WarningKind::SchemaMismatch,
                Some(subject.as_str()),
                "property shape has no title, skipped with its subtree",
            ));
            return;
        }
        let description = store.lang_map(property, &DESCRIPTIONS, self.lang);
        let order = store
            .literal(property, SH, "order")
            .and_then(|v| v.trim().parse::<i64>().ok());
        let cardinality = match (
            count(store.first(property, SH, "minCount")),
            count(store.first(property, SH, "maxCount")),
        ) {
            (None, None) => Cardinality::ExactlyOne,
            (min, max) => Cardinality::from_counts(min, max),
        };

        let node_shape = store
            .first(property, SH, "node")
            .and_then(Obj::as_res)
            .filter(|t| store.has_type(t, SH, "NodeShape"));
        let is_class = node_shape.is_some()
            && (store.has_type(property, OWL, "ObjectProperty")
                || store.first(property, SH, "datatype").is_none());

        let mut fields = NodeFields {
            identifier: identifier(store, property, &title),
            description,
            order,
            ..NodeFields::titled(title)
        };

        match node_shape.filter(|_| is_class) {
            Some(node_shape) => {
                fields
                    .description
                    .fill_missing(&store.lang_map(node_shape, &DESCRIPTIONS, self.lang));
                let class = match self.graph.add_child(
                    parent_id,
                    NodeKind::Class,
                    fields,
                    Some(cardinality),
                ) {
                    Ok((class, _)) => class,
                    Err(e) => {
                        self.warnings.push(ImportWarning::skipped(&subject, &e));
                        return;
                    }
                };
                if self.stack.contains(node_shape) {
                    self.warnings.push(ImportWarning::new(
                        WarningKind::RecursiveType,
                        Some(node_shape.to_string().as_str()),
                        "node shape refers to itself, nested properties not expanded",
                    ));
                    return;
                }
                self.stack.push(node_shape.clone());
                self.properties(&class.id, node_shape);
                self.stack.pop();
            }
            None => {
                fields.concept_ref = store
                    .iri(property, DCTERMS, "conformsTo")
                    .map(ConceptRef::from_uri);
                fields.constraints = Some(self.constraints(property, &subject));
                if let Err(e) = self.graph.add_child(
                    parent_id,
                    NodeKind::DataElement,
                    fields,
                    Some(cardinality),
                ) {
                    self.warnings.push(ImportWarning::skipped(&subject, &e));
                }
            }
        }
    }

    fn constraints(&mut self, property: &Res, subject: &str) -> Constraints {
        let store = self.store;
        let datatype = match store.iri(property, SH, "datatype") {
            None => Datatype::String,
            Some(iri) => self.datatype(iri, subject),
        };

        let mut c = Constraints::with_datatype(datatype);
        c.min_length = count(store.first(property, SH, "minLength"));
        c.max_length = count(store.first(property, SH, "maxLength"));
        c.pattern = store.literal(property, SH, "pattern").map(str::to_string);
        if let Some(head) = store.first(property, SH, "in") {
            c.in_values = store
                .list(head)
                .into_iter()
                .filter_map(Obj::lexical)
                .map(str::to_string)
                .filter(|v| !v.trim().is_empty())
                .collect();
        }
        // A sh:node into the document is a class link, handled by the caller.
        c.node_reference = store
            .iri(property, SH, "node")
            .map(str::to_string);
        c.range = store.iri(property, SH, "class").map(str::to_string);
        c.min_inclusive = store
            .first(property, SH, "minInclusive")
            .and_then(Obj::lexical)
            .map(str::to_string);
        c.max_inclusive = store
            .first(property, SH, "maxInclusive")
            .and_then(Obj::lexical)
            .map(str::to_string);
        c
    }

    fn datatype(&mut self, iri: &str, subject: &str) -> Datatype {
        let builtin = iri
            .strip_prefix(XSD)
            .and_then(datatype::xsd_builtin);
        builtin.unwrap_or_else(|| {
            self.warnings.push(ImportWarning::new(
                WarningKind::UnmappedDatatype,
                Some(subject),
                format!("no canonical datatype for <{iri}>, using string"),
            ));
            Datatype::String
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turtle::{serialize, ExportOptions};
    use crate::types::{Node, NodePatch};
    use chrono::NaiveDate;

    const PREFIXES: &str = r#"
@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix dcterms: <http://purl.org/dc/terms/> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
@prefix cube: <http://purl.org/linked-data/cube#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix ex: <https://example.org/> .
"#;

    fn import(body: &str) -> Imported {
        import_ttl(format!("{PREFIXES}{body}").as_bytes(), &TtlOptions::default()).unwrap()
    }

    fn by_label<'g>(g: &'g GraphModel, label: &str) -> &'g Node {
        g.nodes().find(|n| n.label() == label).unwrap()
    }

    #[test]
    fn invalid_turtle_is_a_parse_error() {
        let err = import_ttl(b"<a> <b> ", &TtlOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn document_without_dataset_is_rejected() {
        let err = import_ttl(
            format!("{PREFIXES} ex:a a sh:PropertyShape ; sh:name \"A\" .").as_bytes(),
            &TtlOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Parse(m) if m.contains("dataset")));
    }

    #[test]
    fn reads_labels_constraints_and_concepts() {
        let imported = import(
            r#"
ex:ds a cube:DataStructureDefinition, sh:NodeShape ;
    dcterms:title "Personen"@de, "People"@en ;
    sh:property ex:age, ex:status .
ex:age a sh:PropertyShape ;
    sh:name "Alter"@de ;
    rdfs:label "Age"@en, "Ignored"@de ;
    dcterms:conformsTo <https://www.i14y.admin.ch/catalog/concepts/08d94604/description> ;
    sh:datatype xsd:int ;
    sh:order 2 ;
    sh:minCount 0 ;
    sh:maxCount 1 ;
    sh:minInclusive 0 ;
    sh:maxInclusive 130 .
ex:status a sh:PropertyShape ;
    sh:name "Status" ;
    sh:datatype xsd:string ;
    sh:order 1 ;
    sh:in ( "active" "retired" ) .
"#,
        );
        let g = &imported.graph;
        let ds = g.dataset().unwrap();
        assert_eq!(ds.title.get(Lang::En), Some("People"));
        assert_eq!(ds.identifier.as_deref(), Some("ds"));

        let children: Vec<&str> = g.children(&ds.id).iter().map(|(_, n)| n.label()).collect();
        assert_eq!(children, ["Status", "Alter"]);

        let age = by_label(g, "Alter");
        assert_eq!(age.title.get(Lang::En), Some("Age"));
        assert_eq!(age.order, Some(2));
        assert_eq!(age.datatype(), Datatype::Integer);
        let c = age.constraints.as_ref().unwrap();
        assert_eq!(c.min_inclusive.as_deref(), Some("0"));
        assert_eq!(c.max_inclusive.as_deref(), Some("130"));
        let concept = age.concept_ref.as_ref().unwrap();
        assert_eq!(concept.id.as_deref(), Some("08d94604"));
        assert_eq!(g.edge_between(&ds.id, &age.id).unwrap().cardinality, Cardinality::ZeroOrOne);

        let status = by_label(g, "Status");
        assert_eq!(status.title.get(Lang::De), Some("Status"));
        assert_eq!(
            status.constraints.as_ref().unwrap().in_values,
            ["active", "retired"]
        );
        assert!(imported.warnings.is_empty(), "{:?}", imported.warnings);
    }

    #[test]
    fn untitled_property_is_skipped_with_a_warning() {
        let imported = import(
            r#"
ex:ds a cube:DataStructureDefinition, sh:NodeShape ;
    dcterms:title "DS"@de ;
    sh:property ex:a, ex:b .
ex:a a sh:PropertyShape ; sh:datatype xsd:string .
ex:b a sh:PropertyShape ; sh:name "B"@de ; sh:datatype xsd:string .
"#,
        );
        assert_eq!(imported.graph.node_count(), 2);
        assert_eq!(imported.warnings.len(), 1);
        assert_eq!(imported.warnings[0].kind, WarningKind::SchemaMismatch);
        assert_eq!(
            imported.warnings[0].subject.as_deref(),
            Some("<https://example.org/a>")
        );
    }

    #[test]
    fn dataset_found_without_cube_type() {
        let imported = import(
            r#"
ex:Address a sh:NodeShape ; sh:property ex:street .
ex:street sh:name "Street"@en ; sh:datatype xsd:string .
ex:root a sh:NodeShape ; rdfs:label "Root"@en ; sh:property ex:address .
ex:address a owl:ObjectProperty ; sh:name "Address"@en ; sh:node ex:Address .
"#,
        );
        let g = &imported.graph;
        let ds = g.dataset().unwrap();
        assert_eq!(ds.label(), "Root");
        let address = by_label(g, "Address");
        assert_eq!(address.kind, NodeKind::Class);
        assert_eq!(g.children(&address.id)[0].1.label(), "Street");
    }

    #[test]
    fn self_referencing_node_shape_is_cut() {
        let imported = import(
            r#"
ex:ds a cube:DataStructureDefinition, sh:NodeShape ; dcterms:title "DS"@de ; sh:property ex:tree .
ex:tree a owl:ObjectProperty ; sh:name "Tree"@de ; sh:node ex:TreeType .
ex:TreeType a sh:NodeShape ; sh:property ex:sub .
ex:sub a owl:ObjectProperty ; sh:name "Sub"@de ; sh:node ex:TreeType .
"#,
        );
        assert_eq!(imported.graph.node_count(), 3);
        assert_eq!(imported.warnings.len(), 1);
        assert_eq!(imported.warnings[0].kind, WarningKind::RecursiveType);
    }

    #[test]
    fn unmapped_datatype_falls_back_to_string() {
        let imported = import(
            r#"
ex:ds a cube:DataStructureDefinition, sh:NodeShape ; dcterms:title "DS"@de ; sh:property ex:x .
ex:x sh:name "X"@de ; sh:datatype ex:Money .
"#,
        );
        assert_eq!(by_label(&imported.graph, "X").datatype(), Datatype::String);
        assert_eq!(imported.warnings[0].kind, WarningKind::UnmappedDatatype);
    }

    #[test]
    fn serializer_output_round_trips() {
        let mut g = GraphModel::with_dataset(LangMap::single(Lang::De, "Personen")).unwrap();
        let ds = g.dataset().unwrap().id.clone();
        let name = NodeFields {
            description: LangMap::single(Lang::En, "Family name"),
            constraints: Some(Constraints {
                max_length: Some(100),
                pattern: Some("^[A-Z].*$".into()),
                ..Constraints::with_datatype(Datatype::String)
            }),
            concept_ref: Some(ConceptRef::from_uri(crate::types::concept_uri("abc"))),
            ..NodeFields::titled(
                [(Lang::De, "Name".to_string()), (Lang::En, "Name".to_string())]
                    .into_iter()
                    .collect(),
            )
        };
        g.add_child(&ds, NodeKind::DataElement, name, None).unwrap();
        let (address, _) = g
            .add_child(
                &ds,
                NodeKind::Class,
                NodeFields::titled(LangMap::single(Lang::De, "Adresse")),
                Some(Cardinality::ZeroOrMore),
            )
            .unwrap();
        let code = NodeFields {
            identifier: Some("plz".into()),
            constraints: Some(Constraints {
                in_values: vec!["3000".into(), "8000".into()],
                ..Constraints::with_datatype(Datatype::Integer)
            }),
            ..NodeFields::titled(LangMap::single(Lang::De, "Postleitzahl"))
        };
        g.add_child(&address.id, NodeKind::DataElement, code, None).unwrap();
        g.update_node(
            &ds,
            NodePatch {
                version: Some(Some("2.1.0".into())),
                dataset_ref: Some(Some(DatasetRef::new("ds-9"))),
                ..Default::default()
            },
        )
        .unwrap();

        let options = ExportOptions::new(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        let ttl = serialize(&g.snapshot(), &options).unwrap();
        let imported = import_ttl(ttl.as_bytes(), &TtlOptions::default()).unwrap();
        assert!(imported.warnings.is_empty(), "{:?}", imported.warnings);

        let back = &imported.graph;
        assert_eq!(back.node_count(), g.node_count());
        let ds = back.dataset().unwrap();
        assert_eq!(ds.version.as_deref(), Some("2.1.0"));
        assert_eq!(ds.identifier, None);
        assert_eq!(ds.dataset_ref, Some(DatasetRef::new("ds-9")));

        let name = by_label(back, "Name");
        assert_eq!(name.title.get(Lang::En), Some("Name"));
        assert_eq!(name.description.get(Lang::En), Some("Family name"));
        assert_eq!(name.order, Some(1));
        assert_eq!(name.identifier, None);
        let c = name.constraints.as_ref().unwrap();
        assert_eq!(c.max_length, Some(100));
        assert_eq!(c.pattern.as_deref(), Some("^[A-Z].*$"));
        assert_eq!(
            name.concept_ref.as_ref().unwrap().uri,
            crate::types::concept_uri("abc")
        );

        let address = by_label(back, "Adresse");
        assert_eq!(address.kind, NodeKind::Class);
        assert_eq!(address.order, Some(2));
        assert_eq!(
            back.edge_between(&ds.id, &address.id).unwrap().cardinality,
            Cardinality::ZeroOrMore
        );
        let plz = by_label(back, "Postleitzahl");
        assert_eq!(plz.identifier.as_deref(), Some("plz"));
        assert_eq!(plz.datatype(), Datatype::Integer);
        assert_eq!(plz.constraints.as_ref().unwrap().in_values, ["3000", "8000"]);
    }

    #[test]
    fn numeric_suffixes_are_stripped_only_for_real_collisions() {
        let mut g = GraphModel::with_dataset(LangMap::single(Lang::De, "Personen")).unwrap();
        let ds = g.dataset().unwrap().id.clone();
        for title in ["Name", "Name"] {
            g.add_child(
                &ds,
                NodeKind::DataElement,
                NodeFields::titled(LangMap::single(Lang::De, title)),
                None,
            )
            .unwrap();
        }
        let item = NodeFields {
            identifier: Some("item-3".into()),
            ..NodeFields::titled(LangMap::single(Lang::De, "Artikel"))
        };
        g.add_child(&ds, NodeKind::DataElement, item, None).unwrap();

        let options = ExportOptions::new(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        let ttl = serialize(&g.snapshot(), &options).unwrap();
        assert!(ttl.contains("Personen/Name-2"), "{ttl}");

        let back = import_ttl(ttl.as_bytes(), &TtlOptions::default()).unwrap().graph;
        let names: Vec<&Node> = back.nodes().filter(|n| n.label() == "Name").collect();
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.identifier.is_none()));
        assert_eq!(by_label(&back, "Artikel").identifier.as_deref(), Some("item-3"));
    }
}
