//! Core data types of the structure editor.
//!
//! This module defines the JSON shapes shared by the graph model, the
//! importers, the project file and the HTTP API: [`Node`], [`Edge`],
//! [`GraphData`], the multilingual [`LangMap`] and the enumerations
//! [`NodeKind`], [`Cardinality`], [`Datatype`] and [`Lang`].

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Base of every published I14Y concept URI.
pub const CONCEPT_URI_BASE: &str = "https://www.i14y.admin.ch/catalog/concepts/";
pub const DATASET_URI_BASE: &str = "https://www.i14y.admin.ch/catalog/datasets/";

/// A label language supported by the I14Y catalogue.
///
/// Declaration order is the emission order of language-tagged literals and,
/// for the first four, the label fallback order used by [`resolve_label`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    De,
    En,
    Fr,
    It,
}

impl Lang {
    /// All languages in fallback order.
    pub const ALL: [Lang; 4] = [Lang::De, Lang::En, Lang::Fr, Lang::It];

    pub fn as_str(&self) -> &'static str {
        match self {
            Lang::De => "de",
            Lang::En => "en",
            Lang::Fr => "fr",
            Lang::It => "it",
        }
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses a language code. Region subtags are ignored (`de-CH` → `de`).
impl std::str::FromStr for Lang {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let primary = s.split(['-', '_']).next().unwrap_or_default();
        match primary.to_ascii_lowercase().as_str() {
            "de" => Ok(Lang::De),
            "en" => Ok(Lang::En),
            "fr" => Ok(Lang::Fr),
            "it" => Ok(Lang::It),
            _ => Err(format!(
                "unknown language {:?}; expected one of: de, en, fr, it",
                s
            )),
        }
    }
}

// --- multilingual text -------------------------------------------------------

/// A language → text mapping used for titles and descriptions.
///
/// Entries are never blank: inserting an empty or whitespace-only value
/// removes the language instead.
///
/// Deserializes from either an object (`{"de": "Name", "en": "Name"}`) or a
/// plain string, which is taken as German text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LangMap(BTreeMap<Lang, String>);

impl LangMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map holding one language.
    pub fn single(lang: Lang, text: impl Into<String>) -> Self {
        let mut map = Self::new();
        map.set(lang, text);
        map
    }

    pub fn get(&self, lang: Lang) -> Option<&str> {
        self.0.get(&lang).map(String::as_str)
    }

    /// Sets the text for `lang`, or removes it when `text` is blank.
    pub fn set(&mut self, lang: Lang, text: impl Into<String>) -> &mut Self {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            self.0.remove(&lang);
        } else {
            self.0.insert(lang, trimmed.to_string());
        }
        self
    }

    pub fn remove(&mut self, lang: Lang) -> Option<String> {
        self.0.remove(&lang)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Entries in emission order (de, en, fr, it).
    pub fn iter(&self) -> impl Iterator<Item = (Lang, &str)> {
        self.0.iter().map(|(l, s)| (*l, s.as_str()))
    }

    /// Key-wise merge: `None` or blank values remove a language, every other
    /// value replaces it. Languages absent from `patch` are left untouched.
    pub fn merge(&mut self, patch: &LangPatch) {
        for (lang, value) in &patch.0 {
            match value {
                Some(text) => {
                    self.set(*lang, text.clone());
                }
                None => {
                    self.0.remove(lang);
                }
            }
        }
    }

    /// Adds every language of `other` that is missing here.
    pub fn fill_missing(&mut self, other: &LangMap) {
        for (lang, text) in other.iter() {
            self.0.entry(lang).or_insert_with(|| text.to_string());
        }
    }

    /// The display label, see [`resolve_label`].
    pub fn resolve(&self) -> Option<&str> {
        resolve_label(self)
    }
}

impl FromIterator<(Lang, String)> for LangMap {
    fn from_iter<I: IntoIterator<Item = (Lang, String)>>(iter: I) -> Self {
        let mut map = LangMap::new();
        for (lang, text) in iter {
            map.set(lang, text);
        }
        map
    }
}

impl<'de> Deserialize<'de> for LangMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let patch = LangPatch::deserialize(deserializer)?;
        let mut map = LangMap::new();
        map.merge(&patch);
        Ok(map)
    }
}

/// Resolves the display label of a multilingual map.
///
/// Fallback order: de → en → fr → it → first available. Returns `None` only
/// for an empty map.
pub fn resolve_label(map: &LangMap) -> Option<&str> {
    Lang::ALL
        .iter()
        .find_map(|lang| map.get(*lang))
        .or_else(|| map.0.values().next().map(String::as_str))
}

/// A partial update of a [`LangMap`]. A `null` value clears that language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LangPatch(pub BTreeMap<Lang, Option<String>>);

impl LangPatch {
    pub fn set(mut self, lang: Lang, text: impl Into<String>) -> Self {
        self.0.insert(lang, Some(text.into()));
        self
    }

    pub fn clear(mut self, lang: Lang) -> Self {
        self.0.insert(lang, None);
        self
    }
}

impl<'de> Deserialize<'de> for LangPatch {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Map(BTreeMap<Lang, Option<String>>),
            Text(String),
        }

        Ok(match Repr::deserialize(deserializer)? {
            Repr::Map(map) => LangPatch(map),
            Repr::Text(text) => LangPatch(BTreeMap::from([(Lang::De, Some(text))])),
        })
    }
}

// --- enumerations ------------------------------------------------------------

/// The variant of a node in the structure graph.
///
/// Serialises as snake_case (`"data_element"`). Older project files used
/// `"concept"` for data elements; that spelling is still accepted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// The root structure (a SHACL node shape and cube structure definition).
    Dataset,
    /// An intermediate grouping, exported as a nested node shape.
    Class,
    /// A leaf field, exported as a property shape.
    #[serde(alias = "concept", alias = "dataelement")]
    DataElement,
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::Dataset => write!(f, "dataset"),
            NodeKind::Class => write!(f, "class"),
            NodeKind::DataElement => write!(f, "data_element"),
        }
    }
}

impl std::str::FromStr for NodeKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dataset" => Ok(NodeKind::Dataset),
            "class" => Ok(NodeKind::Class),
            "data_element" | "dataelement" | "concept" => Ok(NodeKind::DataElement),
            _ => Err(format!(
                "unknown node type {:?}; expected one of: dataset, class, data_element",
                s
            )),
        }
    }
}

/// Occurrence constraint on a containment edge.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Cardinality {
    #[serde(rename = "0..1")]
    ZeroOrOne,
    #[default]
    #[serde(rename = "1..1", alias = "1")]
    ExactlyOne,
    #[serde(rename = "0..n", alias = "0..*", alias = "*")]
    ZeroOrMore,
    #[serde(rename = "1..n", alias = "1..*")]
    OneOrMore,
}

impl Cardinality {
    /// Value of `sh:minCount`.
    pub fn min_count(&self) -> u32 {
        match self {
            Cardinality::ZeroOrOne | Cardinality::ZeroOrMore => 0,
            Cardinality::ExactlyOne | Cardinality::OneOrMore => 1,
        }
    }

    /// Value of `sh:maxCount`; `None` means unbounded.
    pub fn max_count(&self) -> Option<u32> {
        match self {
            Cardinality::ZeroOrOne | Cardinality::ExactlyOne => Some(1),
            Cardinality::ZeroOrMore | Cardinality::OneOrMore => None,
        }
    }

    /// The closest cardinality for a pair of SHACL counts. Any minimum above
    /// zero counts as required; any maximum above one, or none, as repeated.
    /// With neither count present the default `1..1` applies.
    pub fn from_counts(min: Option<u32>, max: Option<u32>) -> Self {
        if min.is_none() && max.is_none() {
            return Cardinality::ExactlyOne;
        }
        let required = min.unwrap_or(0) > 0;
        let repeated = max.map_or(true, |m| m > 1);
        match (required, repeated) {
            (false, false) => Cardinality::ZeroOrOne,
            (true, false) => Cardinality::ExactlyOne,
            (false, true) => Cardinality::ZeroOrMore,
            (true, true) => Cardinality::OneOrMore,
        }
    }
}

impl std::fmt::Display for Cardinality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cardinality::ZeroOrOne => write!(f, "0..1"),
            Cardinality::ExactlyOne => write!(f, "1..1"),
            Cardinality::ZeroOrMore => write!(f, "0..n"),
            Cardinality::OneOrMore => write!(f, "1..n"),
        }
    }
}

/// Parses `min..max` notation; `n`, `*` and `unbounded` denote no maximum.
impl std::str::FromStr for Cardinality {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || format!("unknown cardinality {:?}; expected one of: 0..1, 1..1, 0..n, 1..n", s);
        let (min, max) = s.trim().split_once("..").ok_or_else(err)?;
        let min: u32 = min.trim().parse().map_err(|_| err())?;
        let max = match max.trim() {
            "n" | "*" | "unbounded" | "unlimited" => None,
            m => Some(m.parse::<u32>().map_err(|_| err())?),
        };
        if max.is_some_and(|m| m < min) {
            return Err(err());
        }
        Ok(Cardinality::from_counts(Some(min), max))
    }
}

/// Canonical output datatypes, all in the XML Schema namespace.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String")]
pub enum Datatype {
    #[default]
    #[serde(rename = "string")]
    String,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "integer")]
    Integer,
    #[serde(rename = "decimal")]
    Decimal,
    #[serde(rename = "double")]
    Double,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "dateTime")]
    DateTime,
    #[serde(rename = "time")]
    Time,
    #[serde(rename = "gYear")]
    GYear,
    #[serde(rename = "anyURI")]
    AnyUri,
}

impl Datatype {
    pub const ALL: [Datatype; 10] = [
        Datatype::String,
        Datatype::Boolean,
        Datatype::Integer,
        Datatype::Decimal,
        Datatype::Double,
        Datatype::Date,
        Datatype::DateTime,
        Datatype::Time,
        Datatype::GYear,
        Datatype::AnyUri,
    ];

    /// The local name in the XML Schema namespace (`dateTime`, `anyURI`, …).
    pub fn local_name(&self) -> &'static str {
        match self {
            Datatype::String => "string",
            Datatype::Boolean => "boolean",
            Datatype::Integer => "integer",
            Datatype::Decimal => "decimal",
            Datatype::Double => "double",
            Datatype::Date => "date",
            Datatype::DateTime => "dateTime",
            Datatype::Time => "time",
            Datatype::GYear => "gYear",
            Datatype::AnyUri => "anyURI",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Datatype::Integer | Datatype::Decimal | Datatype::Double)
    }
}

impl std::fmt::Display for Datatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.local_name())
    }
}

/// Parses a canonical datatype name, with or without an `xsd:` prefix or the
/// full XML Schema namespace.
impl std::str::FromStr for Datatype {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let local = s
            .trim()
            .trim_start_matches(crate::vocab::XSD)
            .trim_start_matches("xsd:")
            .trim_start_matches("xs:");
        Datatype::ALL
            .into_iter()
            .find(|dt| dt.local_name().eq_ignore_ascii_case(local))
            .ok_or_else(|| format!("unknown datatype {:?}", s))
    }
}

impl TryFrom<String> for Datatype {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// --- nodes and edges ---------------------------------------------------------

/// A display position in normalized `[0, 1]` coordinates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    /// A position with both coordinates clamped to `[0, 1]`. Non-finite
    /// coordinates become `0.5`.
    pub fn clamped(x: f64, y: f64) -> Self {
        let clamp = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.5 };
        Self { x: clamp(x), y: clamp(y) }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self { x: 0.5, y: 0.5 }
    }
}

/// Reference from a data element to an external I14Y concept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConceptRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub uri: String,
    #[serde(default, skip_serializing_if = "LangMap::is_empty")]
    pub title: LangMap,
    #[serde(default, skip_serializing_if = "LangMap::is_empty")]
    pub description: LangMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
}

impl ConceptRef {
    /// A stub carrying only a URI. The id is recovered when the URI follows
    /// the catalogue pattern `…/catalog/concepts/{id}/description`.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let id = uri
            .strip_prefix(CONCEPT_URI_BASE)
            .and_then(|rest| rest.split('/').next())
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        Self {
            id,
            uri,
            ..Default::default()
        }
    }
}

/// The catalogue URI of a concept id.
pub fn concept_uri(id: &str) -> String {
    format!("{CONCEPT_URI_BASE}{id}/description")
}

/// Link from a dataset node to a dataset published in the I14Y catalogue.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DatasetRef {
    /// Catalogue id of the dataset.
    pub id: String,
    pub uri: String,
}

impl DatasetRef {
    /// A link to catalogue dataset `id`, with its canonical URI.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let uri = dataset_uri(&id);
        Self { id, uri }
    }

    /// Recover the id from a URI of the form `…/catalog/datasets/{id}/description`.
    pub fn from_uri(uri: impl Into<String>) -> Option<Self> {
        let uri = uri.into();
        let id = uri
            .strip_prefix(DATASET_URI_BASE)
            .and_then(|rest| rest.split('/').next())
            .filter(|id| !id.is_empty())?
            .to_string();
        Some(Self { id, uri })
    }
}

/// The catalogue URI of a dataset id.
pub fn dataset_uri(id: &str) -> String {
    format!("{DATASET_URI_BASE}{id}/description")
}

/// Facets a concept contributes to the data elements that conform to it.
///
/// Populated fields replace the element's own; `datatype` is only a hint and
/// fills an unset datatype.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConceptFacets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<Datatype>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    /// Codes of the concept's code list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub in_values: Vec<String>,
}

/// Value constraints of a data element, exported as SHACL constraint triples.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<Datatype>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub in_values: Vec<String>,
    /// IRI of a node shape the value must conform to (`sh:node`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_reference: Option<String>,
    /// IRI of the class of the value (`sh:class`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    /// Lexical lower bound (`sh:minInclusive`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_inclusive: Option<String>,
    /// Lexical upper bound (`sh:maxInclusive`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_inclusive: Option<String>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        *self == Constraints::default()
    }

    pub fn with_datatype(datatype: Datatype) -> Self {
        Self {
            datatype: Some(datatype),
            ..Default::default()
        }
    }
}

/// A node of the structure graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub title: LangMap,
    #[serde(default, skip_serializing_if = "LangMap::is_empty")]
    pub description: LangMap,
    /// Local slug for the node's URI segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Emission order among siblings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default)]
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept_ref: Option<ConceptRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
    /// Published version of a dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Catalogue dataset this dataset node describes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_ref: Option<DatasetRef>,
}

impl Node {
    /// The resolved display label, or the id for an untitled node.
    pub fn label(&self) -> &str {
        self.title.resolve().unwrap_or(&self.id)
    }

    /// The effective datatype: the explicit constraint, else `string`.
    pub fn datatype(&self) -> Datatype {
        self.constraints
            .as_ref()
            .and_then(|c| c.datatype)
            .unwrap_or_default()
    }
}

/// A directed containment edge: `to` is a property of `from`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Edge {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub cardinality: Cardinality,
}

/// An immutable `{nodes, edges}` view of a graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphData {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// Fields accepted when creating a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeFields {
    #[serde(default)]
    pub title: LangMap,
    #[serde(default)]
    pub description: LangMap,
    #[serde(default)]
    pub identifier: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub concept_ref: Option<ConceptRef>,
    #[serde(default)]
    pub constraints: Option<Constraints>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub dataset_ref: Option<DatasetRef>,
}

impl NodeFields {
    pub fn titled(title: LangMap) -> Self {
        Self {
            title,
            ..Default::default()
        }
    }
}

/// A partial node update. Absent fields are left untouched; for the
/// optional scalar fields an explicit `null` clears the value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<LangPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<LangPatch>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub order: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub concept_ref: Option<Option<ConceptRef>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Option<Constraints>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub version: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option", skip_serializing_if = "Option::is_none")]
    pub dataset_ref: Option<Option<DatasetRef>>,
}

/// Distinguishes a missing field (`None`, via `#[serde(default)]`) from an
/// explicit `null` (`Some(None)`).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// --- tests -------------------------------------------------------------------
