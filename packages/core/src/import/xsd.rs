//! XML Schema import: global elements and their complex types become a
//! Class/DataElement tree.
//!
//! Supported declarations:
//!
//! - global and local `xsd:element` (by `name` + `type`, inline types, or `ref`);
//! - `xsd:sequence`, `xsd:all`, `xsd:choice` (members of a choice are optional)
//!   and `xsd:group ref`;
//! - `xsd:complexContent` extension of a named complex type;
//! - `xsd:simpleContent` extension (the text value becomes a `value` element);
//! - `xsd:attribute` (`use="required"` → `1..1`, otherwise `0..1`);
//! - `xsd:simpleType` restrictions with the facets `length`, `minLength`,
//!   `maxLength`, `pattern`, `enumeration`, `minInclusive`, `maxInclusive` and,
//!   for integers, `minExclusive`/`maxExclusive`;
//! - `xsd:annotation/xsd:documentation` as description, in its `xml:lang`.
//!
//! Namespace prefixes are taken from the declarations on the schema element.
//! `xsd:include` and `xsd:import` targets are not fetched: a reference into
//! them is reported as unresolved.

use std::collections::{HashMap, HashSet};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::datatype;
use crate::error::{Error, Result};
use crate::graph::GraphModel;
use crate::import::{ImportWarning, Imported, WarningKind};
use crate::types::{
    Cardinality, Constraints, Datatype, Lang, LangMap, LangPatch, Node, NodeFields, NodeKind,
    NodePatch,
};
use crate::validation::{check_pattern, slugify};

pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// Parameters of an XSD import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XsdOptions {
    /// Title of the generated dataset.
    pub dataset_name: String,
    /// Language of element names used as titles, and of undeclared
    /// documentation.
    pub lang: Lang,
}

impl Default for XsdOptions {
    fn default() -> Self {
        Self {
            dataset_name: "Dataset".to_string(),
            lang: Lang::En,
        }
    }
}

/// Import an XSD document.
///
/// Malformed XML or any unresolvable type, element, group or attribute
/// reference fails with [`Error::Parse`] naming the reference, and nothing
/// is returned. Names without a usable local name are replaced by
/// `element_{n}`; an element the graph rejects is skipped with a warning.
pub fn import_xsd(bytes: &[u8], options: &XsdOptions) -> Result<Imported> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::Parse(format!("XSD is not valid UTF-8: {e}")))?;
    let root = parse_xml(text.trim_start_matches('\u{feff}'))?;
    let schema = Schema::new(&root)?;

    let dataset_name = match options.dataset_name.trim() {
        "" => "Dataset",
        name => name,
    };
    let mut graph = GraphModel::with_dataset(LangMap::single(options.lang, dataset_name))?;
    let dataset_id = graph
        .dataset()
        .map(|n| n.id.clone())
        .ok_or(Error::NoDatasetFound)?;
    let description = schema.documentation(&root, options.lang);
    if !description.is_empty() {
        let patch = NodePatch {
            description: Some(LangPatch(
                description.iter().map(|(l, t)| (l, Some(t.to_string()))).collect(),
            )),
            ..Default::default()
        };
        graph.update_node(&dataset_id, patch)?;
    }

    let mut builder = Builder {
        schema: &schema,
        graph,
        warnings: Vec::new(),
        lang: options.lang,
        stack: Vec::new(),
    };

    let globals = schema.root.children_named(&schema, "element");
    if globals.is_empty() {
        builder.warnings.push(ImportWarning::new(
            WarningKind::SchemaMismatch,
            None,
            "schema declares no global elements",
        ));
    }
    let mut order = 0;
    for element in globals {
        builder.element(&dataset_id, element, &mut order, false)?;
    }

    let Builder {
        mut graph,
        warnings,
        ..
    } = builder;
    graph.auto_layout();
    debug!(
        "xsd: imported {} node(s) with {} warning(s)",
        graph.node_count(),
        warnings.len()
    );
    Ok(Imported { graph, warnings })
}

// --- XML tree ----------------------------------------------------------------

#[derive(Debug, Default)]
struct XmlElement {
    /// Qualified name as written (`xs:element`).
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<XmlElement>,
    text: String,
}

impl XmlElement {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| Error::Parse(format!("attribute on <{name}>: {e}")))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr
                .unescape_value()
                .map_err(|e| Error::Parse(format!("attribute {key} on <{name}>: {e}")))?
                .to_string();
            attrs.push((key, value));
        }
        Ok(Self {
            name,
            attrs,
            ..Default::default()
        })
    }

    fn prefix(&self) -> &str {
        split_qname(&self.name).0
    }

    fn local(&self) -> &str {
        split_qname(&self.name).1
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// XSD children with the given local name.
    fn children_named(&self, schema: &Schema<'_>, local: &str) -> Vec<&XmlElement> {
        self.children
            .iter()
            .filter(|c| schema.is_xsd(c) && c.local() == local)
            .collect()
    }

    fn child_named(&self, schema: &Schema<'_>, local: &str) -> Option<&XmlElement> {
        self.children
            .iter()
            .find(|c| schema.is_xsd(c) && c.local() == local)
    }
}

fn split_qname(name: &str) -> (&str, &str) {
    name.split_once(':').unwrap_or(("", name))
}

/// Parse a document into an element tree. Mismatched or unclosed tags are
/// reported with the byte position.
fn parse_xml(text: &str) -> Result<XmlElement> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let position = reader.buffer_position();
        let event = reader
            .read_event()
            .map_err(|e| Error::Parse(format!("malformed XML at byte {position}: {e}")))?;
        match event {
            Event::Start(ref e) => stack.push(XmlElement::from_start(e)?),
            Event::Empty(ref e) => {
                let element = XmlElement::from_start(e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::Parse(format!("unexpected end tag at byte {position}")))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(ref e) => {
                let text = e
                    .unescape()
                    .map_err(|e| Error::Parse(format!("text at byte {position}: {e}")))?;
                match stack.last_mut() {
                    Some(parent) => parent.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => {
                        return Err(Error::Parse(format!(
                            "text outside the root element at byte {position}"
                        )))
                    }
                }
            }
            Event::CData(e) => {
                if let Some(parent) = stack.last_mut() {
                    parent.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::Parse(format!(
            "unexpected end of document: <{}> is not closed",
            open.name
        )));
    }
    root.ok_or_else(|| Error::Parse("document has no root element".into()))
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(Error::Parse(format!(
                "second root element <{}>",
                element.name
            )))
        }
    }
    Ok(())
}

// --- schema ------------------------------------------------------------------

/// Global declarations of a schema, by local name.
struct Schema<'x> {
    root: &'x XmlElement,
    /// Prefixes bound to the XML Schema namespace; `""` for the default.
    xsd_prefixes: HashSet<String>,
    complex_types: HashMap<&'x str, &'x XmlElement>,
    simple_types: HashMap<&'x str, &'x XmlElement>,
    elements: HashMap<&'x str, &'x XmlElement>,
    groups: HashMap<&'x str, &'x XmlElement>,
    attribute_groups: HashMap<&'x str, &'x XmlElement>,
    attributes: HashMap<&'x str, &'x XmlElement>,
    has_external: bool,
}

/// What a type reference resolves to.
enum TypeRef<'x> {
    Builtin(&'x str),
    Simple(&'x XmlElement),
    Complex(&'x str, &'x XmlElement),
}

impl<'x> Schema<'x> {
    fn new(root: &'x XmlElement) -> Result<Self> {
        let mut xsd_prefixes = HashSet::new();
        for (key, value) in &root.attrs {
            if value != XSD_NS {
                continue;
            }
            if key == "xmlns" {
                xsd_prefixes.insert(String::new());
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                xsd_prefixes.insert(prefix.to_string());
            }
        }

        let mut schema = Self {
            root,
            xsd_prefixes,
            complex_types: HashMap::new(),
            simple_types: HashMap::new(),
            elements: HashMap::new(),
            groups: HashMap::new(),
            attribute_groups: HashMap::new(),
            attributes: HashMap::new(),
            has_external: false,
        };
        if !schema.is_xsd(root) || root.local() != "schema" {
            return Err(Error::Parse(format!(
                "root element <{}> is not an XML Schema",
                root.name
            )));
        }

        let declarations: Vec<&'x XmlElement> =
            root.children.iter().filter(|c| schema.is_xsd(c)).collect();
        for child in declarations {
            let name = child.attr("name");
            match (child.local(), name) {
                ("complexType", Some(n)) => {
                    schema.complex_types.insert(n, child);
                }
                ("simpleType", Some(n)) => {
                    schema.simple_types.insert(n, child);
                }
                ("element", Some(n)) => {
                    schema.elements.insert(n, child);
                }
                ("group", Some(n)) => {
                    schema.groups.insert(n, child);
                }
                ("attributeGroup", Some(n)) => {
                    schema.attribute_groups.insert(n, child);
                }
                ("attribute", Some(n)) => {
                    schema.attributes.insert(n, child);
                }
                ("include" | "import" | "redefine", _) => schema.has_external = true,
                _ => {}
            }
        }
        Ok(schema)
    }

    fn is_xsd(&self, element: &XmlElement) -> bool {
        self.xsd_prefixes.contains(element.prefix())
    }

    fn unresolved(&self, what: &str, name: &str) -> Error {
        let hint = if self.has_external {
            " (included or imported schemas are not resolved)"
        } else {
            ""
        };
        Error::Parse(format!("unresolved {what} reference {name:?}{hint}"))
    }

    fn resolve_type(&self, name: &'x str) -> Result<TypeRef<'x>> {
        let (prefix, local) = split_qname(name);
        if self.xsd_prefixes.contains(prefix) && !self.is_user_type(prefix, local) {
            return Ok(TypeRef::Builtin(local));
        }
        if let Some(ct) = self.complex_types.get(local) {
            return Ok(TypeRef::Complex(local, ct));
        }
        if let Some(st) = self.simple_types.get(local) {
            return Ok(TypeRef::Simple(st));
        }
        Err(self.unresolved("type", name))
    }

    /// With the XSD namespace as default namespace, an unprefixed name may
    /// still denote a type declared in this schema.
    fn is_user_type(&self, prefix: &str, local: &str) -> bool {
        prefix.is_empty()
            && (self.complex_types.contains_key(local) || self.simple_types.contains_key(local))
    }

    fn global(
        &self,
        map: &HashMap<&'x str, &'x XmlElement>,
        what: &str,
        name: &str,
    ) -> Result<&'x XmlElement> {
        map.get(split_qname(name).1)
            .copied()
            .ok_or_else(|| self.unresolved(what, name))
    }

    /// `xsd:annotation/xsd:documentation` texts by language.
    fn documentation(&self, element: &XmlElement, default_lang: Lang) -> LangMap {
        let mut docs = LangMap::new();
        for annotation in element.children_named(self, "annotation") {
            for doc in annotation.children_named(self, "documentation") {
                let lang = match doc.attr("xml:lang") {
                    Some(code) => match code.parse::<Lang>() {
                        Ok(lang) => lang,
                        Err(_) => continue,
                    },
                    None => default_lang,
                };
                let text = doc.text.split_whitespace().collect::<Vec<_>>().join(" ");
                if docs.get(lang).is_none() {
                    docs.set(lang, text);
                }
            }
        }
        docs
    }
}

// --- tree building -----------------------------------------------------------

/// Datatype and facets of a simple type.
#[derive(Debug, Default)]
struct SimpleInfo {
    datatype: Datatype,
    constraints: Constraints,
}

struct Builder<'s, 'x> {
    schema: &'s Schema<'x>,
    graph: GraphModel,
    warnings: Vec<ImportWarning>,
    lang: Lang,
    /// Named complex types and element refs being expanded, for recursion
    /// detection.
    stack: Vec<String>,
}

impl<'x> Builder<'_, 'x> {
    fn element(
        &mut self,
        parent_id: &str,
        element: &'x XmlElement,
        order: &mut usize,
        in_choice: bool,
    ) -> Result<()> {
        let decl: &'x XmlElement = match element.attr("ref") {
            Some(r) => self.schema.global(&self.schema.elements, "element", r)?,
            None => element,
        };
        let name = decl
            .attr("name")
            .ok_or_else(|| Error::Parse("element without name or ref".into()))?;

        if element.attr("maxOccurs") == Some("0") {
            return Ok(());
        }
        let mut cardinality = occurs(element)?;
        if in_choice {
            cardinality = optional(cardinality);
        }

        let mut description = self.schema.documentation(decl, self.lang);
        let ref_key = element.attr("ref").map(|r| format!("element:{r}"));
        if let Some(key) = &ref_key {
            if self.stack.contains(key) {
                self.recursion(name);
                return Ok(());
            }
        }

        match self.content(decl)? {
            Content::Simple(info) => {
                *order += 1;
                self.add_element(parent_id, name, description, info, *order, cardinality)?;
            }
            Content::Complex(type_name, complex) => {
                let key = type_name.map(|t| format!("type:{t}"));
                if let Some(key) = &key {
                    if self.stack.contains(key) {
                        self.recursion(name);
                        return Ok(());
                    }
                }
                description.fill_missing(&self.schema.documentation(complex, self.lang));

                *order += 1;
                let title = self.title(name, *order);
                let fields = NodeFields {
                    description,
                    order: Some(*order as i64),
                    ..NodeFields::titled(LangMap::single(self.lang, title.as_str()))
                };
                let Some(class) =
                    self.add_or_skip(&title, parent_id, NodeKind::Class, fields, cardinality)?
                else {
                    return Ok(());
                };

                let pushed: Vec<String> = ref_key.into_iter().chain(key).collect();
                let depth = pushed.len();
                self.stack.extend(pushed);
                let result = self.complex_children(&class.id, complex);
                self.stack.truncate(self.stack.len() - depth);
                result?;
            }
        }
        Ok(())
    }

    fn content(&mut self, decl: &'x XmlElement) -> Result<Content<'x>> {
        if let Some(type_name) = decl.attr("type") {
            return Ok(match self.schema.resolve_type(type_name)? {
                TypeRef::Builtin(local) => Content::Simple(self.builtin(local, type_name)),
                TypeRef::Simple(st) => Content::Simple(self.simple_type(st, 0)?),
                TypeRef::Complex(name, ct) => Content::Complex(Some(name), ct),
            });
        }
        if let Some(ct) = decl.child_named(self.schema, "complexType") {
            return Ok(Content::Complex(None, ct));
        }
        if let Some(st) = decl.child_named(self.schema, "simpleType") {
            return Ok(Content::Simple(self.simple_type(st, 0)?));
        }
        Ok(Content::Simple(SimpleInfo::default()))
    }

    fn builtin(&mut self, local: &str, written: &str) -> SimpleInfo {
        let datatype = datatype::xsd_builtin(local).unwrap_or_else(|| {
            self.warnings.push(ImportWarning::new(
                WarningKind::UnmappedDatatype,
                Some(written),
                "no canonical datatype, using string",
            ));
            Datatype::String
        });
        SimpleInfo {
            datatype,
            constraints: Constraints::default(),
        }
    }

    fn simple_type(&mut self, st: &'x XmlElement, depth: usize) -> Result<SimpleInfo> {
        if depth > 32 {
            return Err(Error::Parse(format!(
                "simple type derivation too deep at {:?}",
                st.attr("name").unwrap_or("(anonymous)")
            )));
        }
        let subject = st.attr("name").unwrap_or("(anonymous simple type)");

        let Some(restriction) = st.child_named(self.schema, "restriction") else {
            // xsd:list and xsd:union have no single canonical datatype.
            self.warnings.push(ImportWarning::new(
                WarningKind::UnmappedDatatype,
                Some(subject),
                "list or union type, using string",
            ));
            return Ok(SimpleInfo::default());
        };

        let mut info = match restriction.attr("base") {
            Some(base) => match self.schema.resolve_type(base)? {
                TypeRef::Builtin(local) => self.builtin(local, base),
                TypeRef::Simple(parent) => self.simple_type(parent, depth + 1)?,
                TypeRef::Complex(..) => {
                    return Err(Error::Parse(format!(
                        "simple type {subject:?} restricts complex type {base:?}"
                    )))
                }
            },
            None => match restriction.child_named(self.schema, "simpleType") {
                Some(inner) => self.simple_type(inner, depth + 1)?,
                None => SimpleInfo::default(),
            },
        };
        self.facets(subject, restriction, &mut info)?;
        Ok(info)
    }

    fn facets(&mut self, subject: &str, restriction: &XmlElement, info: &mut SimpleInfo) -> Result<()> {
        let mut patterns = Vec::new();
        let mut enumeration = Vec::new();
        let schema = self.schema;
        let c = &mut info.constraints;

        for facet in restriction.children.iter().filter(|f| schema.is_xsd(f)) {
            let Some(value) = facet.attr("value") else {
                continue;
            };
            let number = || {
                value.trim().parse::<u32>().map_err(|_| {
                    Error::Parse(format!("facet {} of {subject:?} is not a count: {value:?}", facet.local()))
                })
            };
            match facet.local() {
                "length" => {
                    let n = number()?;
                    c.min_length = Some(n);
                    c.max_length = Some(n);
                }
                "minLength" => c.min_length = Some(number()?),
                "maxLength" => c.max_length = Some(number()?),
                "pattern" => patterns.push(value.to_string()),
                "enumeration" => enumeration.push(value.to_string()),
                "minInclusive" => c.min_inclusive = Some(value.to_string()),
                "maxInclusive" => c.max_inclusive = Some(value.to_string()),
                "minExclusive" | "maxExclusive" => {
                    let is_min = facet.local() == "minExclusive";
                    let bound = match (info.datatype, value.trim().parse::<i64>()) {
                        (Datatype::Integer, Ok(n)) if is_min => n.checked_add(1),
                        (Datatype::Integer, Ok(n)) => n.checked_sub(1),
                        _ => None,
                    };
                    match bound {
                        Some(n) if is_min => c.min_inclusive = Some(n.to_string()),
                        Some(n) => c.max_inclusive = Some(n.to_string()),
                        None => self.warnings.push(ImportWarning::new(
                            WarningKind::UnsupportedConstraint,
                            Some(subject),
                            format!(
                                "{} {value:?} has no inclusive integer equivalent",
                                facet.local()
                            ),
                        )),
                    }
                }
                other => debug!("xsd: ignoring facet {other} on {subject}"),
            }
        }

        if !patterns.is_empty() {
            // XSD patterns match the whole value, sh:pattern any substring.
            let alternatives = if patterns.len() == 1 {
                patterns.remove(0)
            } else {
                patterns
                    .iter()
                    .map(|p| format!("({p})"))
                    .collect::<Vec<_>>()
                    .join("|")
            };
            let combined = format!("^(?:{alternatives})$");
            match check_pattern(&combined) {
                Ok(()) => c.pattern = Some(combined),
                Err(e) => self.warnings.push(ImportWarning::new(
                    WarningKind::UnsupportedConstraint,
                    Some(subject),
                    e.to_string(),
                )),
            }
        }
        if !enumeration.is_empty() {
            enumeration.retain(|v| !v.trim().is_empty());
            c.in_values = enumeration;
        }
        Ok(())
    }

    /// Children of a complex type: particles first, then attributes.
    fn complex_children(&mut self, parent_id: &str, ct: &'x XmlElement) -> Result<()> {
        let mut order = 0;
        self.complex_body(parent_id, ct, &mut order)
    }

    fn complex_body(&mut self, parent_id: &str, body: &'x XmlElement, order: &mut usize) -> Result<()> {
        let schema = self.schema;
        for child in body.children.iter().filter(|c| schema.is_xsd(c)) {
            match child.local() {
                "sequence" | "all" | "choice" | "group" => {
                    self.particle(parent_id, child, order, false)?
                }
                "attribute" => self.attribute(parent_id, child, order)?,
                "attributeGroup" => {
                    if let Some(r) = child.attr("ref") {
                        let group =
                            schema.global(&schema.attribute_groups, "attribute group", r)?;
                        self.complex_body(parent_id, group, order)?;
                    } else {
                        self.complex_body(parent_id, child, order)?;
                    }
                }
                "complexContent" => {
                    for derivation in child
                        .children
                        .iter()
                        .filter(|d| matches!(d.local(), "extension" | "restriction"))
                    {
                        if derivation.local() == "extension" {
                            if let Some(base) = derivation.attr("base") {
                                self.inherit(parent_id, base, order)?;
                            }
                        }
                        self.complex_body(parent_id, derivation, order)?;
                    }
                }
                "simpleContent" => {
                    for derivation in child
                        .children
                        .iter()
                        .filter(|d| matches!(d.local(), "extension" | "restriction"))
                    {
                        let info = match derivation.attr("base") {
                            Some(base) => match self.schema.resolve_type(base)? {
                                TypeRef::Builtin(local) => self.builtin(local, base),
                                TypeRef::Simple(st) => self.simple_type(st, 0)?,
                                TypeRef::Complex(..) => SimpleInfo::default(),
                            },
                            None => SimpleInfo::default(),
                        };
                        *order += 1;
                        self.add_element(
                            parent_id,
                            "value",
                            LangMap::new(),
                            info,
                            *order,
                            Cardinality::ExactlyOne,
                        )?;
                        self.complex_body(parent_id, derivation, order)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Add the children of the named base type of an extension.
    fn inherit(&mut self, parent_id: &str, base: &'x str, order: &mut usize) -> Result<()> {
        match self.schema.resolve_type(base)? {
            TypeRef::Complex(name, ct) => {
                let key = format!("type:{name}");
                if self.stack.contains(&key) {
                    self.recursion(name);
                    return Ok(());
                }
                self.stack.push(key);
                let result = self.complex_body(parent_id, ct, order);
                self.stack.pop();
                result
            }
            TypeRef::Builtin(_) => Ok(()),
            TypeRef::Simple(_) => Err(Error::Parse(format!(
                "complex content extends simple type {base:?}"
            ))),
        }
    }

    fn particle(
        &mut self,
        parent_id: &str,
        particle: &'x XmlElement,
        order: &mut usize,
        in_choice: bool,
    ) -> Result<()> {
        let (container, in_choice) = match particle.local() {
            "group" => match particle.attr("ref") {
                Some(r) => (self.schema.global(&self.schema.groups, "group", r)?, in_choice),
                None => (particle, in_choice),
            },
            "choice" => (particle, true),
            _ => (particle, in_choice || particle.attr("minOccurs") == Some("0")),
        };

        let schema = self.schema;
        for child in container.children.iter().filter(|c| schema.is_xsd(c)) {
            match child.local() {
                "element" => self.element(parent_id, child, order, in_choice)?,
                "sequence" | "all" | "choice" | "group" => {
                    self.particle(parent_id, child, order, in_choice)?
                }
                "any" => debug!("xsd: skipping xsd:any below {parent_id}"),
                _ => {}
            }
        }
        Ok(())
    }

    fn attribute(&mut self, parent_id: &str, attribute: &'x XmlElement, order: &mut usize) -> Result<()> {
        let decl: &'x XmlElement = match attribute.attr("ref") {
            Some(r) => self.schema.global(&self.schema.attributes, "attribute", r)?,
            None => attribute,
        };
        let use_ = attribute.attr("use").or(decl.attr("use")).unwrap_or("optional");
        if use_ == "prohibited" {
            return Ok(());
        }
        let Some(name) = decl.attr("name") else {
            return Err(Error::Parse("attribute without name or ref".into()));
        };
        let info = match decl.attr("type") {
            Some(type_name) => match self.schema.resolve_type(type_name)? {
                TypeRef::Builtin(local) => self.builtin(local, type_name),
                TypeRef::Simple(st) => self.simple_type(st, 0)?,
                TypeRef::Complex(..) => {
                    return Err(Error::Parse(format!(
                        "attribute {name:?} has complex type {type_name:?}"
                    )))
                }
            },
            None => match decl.child_named(self.schema, "simpleType") {
                Some(st) => self.simple_type(st, 0)?,
                None => SimpleInfo::default(),
            },
        };
        let cardinality = if use_ == "required" {
            Cardinality::ExactlyOne
        } else {
            Cardinality::ZeroOrOne
        };
        let description = self.schema.documentation(decl, self.lang);
        *order += 1;
        self.add_element(parent_id, name, description, info, *order, cardinality)
    }

    fn add_element(
        &mut self,
        parent_id: &str,
        name: &str,
        description: LangMap,
        info: SimpleInfo,
        order: usize,
        cardinality: Cardinality,
    ) -> Result<()> {
        let mut constraints = info.constraints;
        constraints.datatype = Some(info.datatype);
        let title = self.title(name, order);
        let fields = NodeFields {
            description,
            order: Some(order as i64),
            constraints: Some(constraints),
            ..NodeFields::titled(LangMap::single(self.lang, title.as_str()))
        };
        self.add_or_skip(&title, parent_id, NodeKind::DataElement, fields, cardinality)?;
        Ok(())
    }

    /// `name`, or `element_{order}` when it yields no local name.
    fn title(&mut self, name: &str, order: usize) -> String {
        if !slugify(name).is_empty() {
            return name.to_string();
        }
        let fallback = format!("element_{order}");
        self.warnings.push(ImportWarning::new(
            WarningKind::UnusableName,
            Some(fallback.as_str()),
            format!("name {name:?} is not usable as a local name"),
        ));
        fallback
    }

    /// Add a node below `parent_id`. A node the graph rejects, such as one
    /// with contradictory length facets, is skipped with a warning.
    fn add_or_skip(
        &mut self,
        subject: &str,
        parent_id: &str,
        kind: NodeKind,
        fields: NodeFields,
        cardinality: Cardinality,
    ) -> Result<Option<Node>> {
        match self.graph.add_child(parent_id, kind, fields, Some(cardinality)) {
            Ok((node, _)) => Ok(Some(node)),
            Err(e @ Error::InvalidArgument(_)) => {
                self.warnings.push(ImportWarning::skipped(subject, &e));
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn recursion(&mut self, name: &str) {
        self.warnings.push(ImportWarning::new(
            WarningKind::RecursiveType,
            Some(name),
            "recursive declaration, nested occurrence not expanded",
        ));
    }
}

enum Content<'x> {
    Simple(SimpleInfo),
    Complex(Option<&'x str>, &'x XmlElement),
}

/// Cardinality from `minOccurs`/`maxOccurs` (both default to 1).
fn occurs(element: &XmlElement) -> Result<Cardinality> {
    let parse = |attr: &str| -> Result<Option<u32>> {
        match element.attr(attr) {
            None => Ok(Some(1)),
            Some("unbounded") => Ok(None),
            Some(v) => v.trim().parse::<u32>().map(Some).map_err(|_| {
                Error::Parse(format!("{attr}={v:?} on element {:?}", element.attr("name").unwrap_or_default()))
            }),
        }
    };
    let min = parse("minOccurs")?.unwrap_or(1);
    let max = parse("maxOccurs")?;
    Ok(Cardinality::from_counts(Some(min), max))
}

fn optional(cardinality: Cardinality) -> Cardinality {
    match cardinality {
        Cardinality::ExactlyOne => Cardinality::ZeroOrOne,
        Cardinality::OneOrMore => Cardinality::ZeroOrMore,
        other => other,
    }
}

// --- tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn import(xsd: &str) -> Imported {
        import_xsd(
            xsd.as_bytes(),
            &XsdOptions {
                dataset_name: "Personen".into(),
                lang: Lang::En,
            },
        )
        .unwrap()
    }

    fn children<'g>(g: &'g GraphModel, id: &str) -> Vec<(Cardinality, &'g Node)> {
        g.children(id)
            .into_iter()
            .map(|(e, n)| (e.cardinality, n))
            .collect()
    }

    const PERSON: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:tns="urn:example">
  <xs:annotation><xs:documentation xml:lang="de">Personenregister</xs:documentation></xs:annotation>
  <xs:simpleType name="PostalCode">
    <xs:restriction base="xs:string">
      <xs:length value="4"/>
      <xs:pattern value="\d{4}"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:complexType name="Address">
    <xs:sequence>
      <xs:element name="street" type="xs:string"/>
      <xs:element name="zip" type="tns:PostalCode"/>
    </xs:sequence>
    <xs:attribute name="verified" type="xs:boolean" use="required"/>
  </xs:complexType>
  <xs:element name="person">
    <xs:annotation><xs:documentation>A registered person</xs:documentation></xs:annotation>
    <xs:complexType>
      <xs:sequence>
        <xs:element name="name" type="xs:string"/>
        <xs:element name="age" type="xs:int" minOccurs="0"/>
        <xs:element name="address" type="tns:Address" maxOccurs="unbounded"/>
        <xs:element name="gender">
          <xs:simpleType>
            <xs:restriction base="xs:token">
              <xs:enumeration value="f"/>
              <xs:enumeration value="m"/>
            </xs:restriction>
          </xs:simpleType>
        </xs:element>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

    #[test]
    fn nested_sequences_become_a_tree() {
        let imported = import(PERSON);
        let g = &imported.graph;
        let ds = g.dataset().unwrap();
        assert_eq!(ds.description.get(Lang::De), Some("Personenregister"));

        let top = children(g, &ds.id);
        assert_eq!(top.len(), 1);
        let (_, person) = top[0];
        assert_eq!(person.kind, NodeKind::Class);
        assert_eq!(person.title.get(Lang::En), Some("person"));
        assert_eq!(person.description.get(Lang::En), Some("A registered person"));

        let fields = children(g, &person.id);
        let names: Vec<&str> = fields.iter().map(|(_, n)| n.label()).collect();
        assert_eq!(names, ["name", "age", "address", "gender"]);

        let (card, age) = fields[1];
        assert_eq!(card, Cardinality::ZeroOrOne);
        assert_eq!(age.datatype(), Datatype::Integer);

        let (card, address) = fields[2];
        assert_eq!(card, Cardinality::OneOrMore);
        assert_eq!(address.kind, NodeKind::Class);

        let (_, gender) = fields[3];
        assert_eq!(
            gender.constraints.as_ref().unwrap().in_values,
            vec!["f".to_string(), "m".to_string()]
        );
        assert!(imported.warnings.is_empty(), "{:?}", imported.warnings);
    }

    #[test]
    fn named_simple_types_carry_facets_and_attributes_follow_particles() {
        let imported = import(PERSON);
        let g = &imported.graph;
        let address = g.nodes().find(|n| n.label() == "address").unwrap();
        let fields = children(g, &address.id);
        let names: Vec<&str> = fields.iter().map(|(_, n)| n.label()).collect();
        assert_eq!(names, ["street", "zip", "verified"]);

        let zip = fields[1].1.constraints.as_ref().unwrap();
        assert_eq!(zip.min_length, Some(4));
        assert_eq!(zip.max_length, Some(4));
        assert_eq!(zip.pattern.as_deref(), Some(r"^(?:\d{4})$"));

        let (card, verified) = fields[2];
        assert_eq!(card, Cardinality::ExactlyOne);
        assert_eq!(verified.datatype(), Datatype::Boolean);
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let err = import_xsd(
            b"<xs:schema xmlns:xs=\"http://www.w3.org/2001/XMLSchema\"><xs:element></xs:schema>",
            &XsdOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));

        let err = import_xsd(b"<root/>", &XsdOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Parse(m) if m.contains("not an XML Schema")));
    }

    #[test]
    fn unresolved_type_names_the_reference() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" xmlns:ext="urn:ext">
  <xs:include schemaLocation="common.xsd"/>
  <xs:element name="person" type="ext:PersonType"/>
</xs:schema>"#;
        let err = import_xsd(xsd.as_bytes(), &XsdOptions::default()).unwrap_err();
        match err {
            Error::Parse(message) => {
                assert!(message.contains("ext:PersonType"), "{message}");
                assert!(message.contains("not resolved"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn element_refs_and_choices() {
        let xsd = r#"<schema xmlns="http://www.w3.org/2001/XMLSchema">
  <element name="email" type="string"/>
  <element name="contact">
    <complexType>
      <choice>
        <element ref="email"/>
        <element name="phone" type="string" maxOccurs="3"/>
      </choice>
    </complexType>
  </element>
</schema>"#;
        let imported = import(xsd);
        let g = &imported.graph;
        let contact = g.nodes().find(|n| n.label() == "contact").unwrap();
        let fields = children(g, &contact.id);
        assert_eq!(fields[0].0, Cardinality::ZeroOrOne);
        assert_eq!(fields[0].1.label(), "email");
        assert_eq!(fields[1].0, Cardinality::ZeroOrMore);
    }

    #[test]
    fn recursive_types_are_cut() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:complexType name="Node">
    <xs:sequence>
      <xs:element name="label" type="xs:string"/>
      <xs:element name="child" type="Node" minOccurs="0" maxOccurs="unbounded"/>
    </xs:sequence>
  </xs:complexType>
  <xs:element name="tree" type="Node"/>
</xs:schema>"#;
        let imported = import(xsd);
        assert_eq!(imported.warnings.len(), 1);
        assert_eq!(imported.warnings[0].kind, WarningKind::RecursiveType);
        let tree = imported.graph.nodes().find(|n| n.label() == "tree").unwrap();
        assert_eq!(children(&imported.graph, &tree.id).len(), 1);
    }

    #[test]
    fn unknown_builtin_falls_back_to_string() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="blob" type="xs:anyFancyType"/>
</xs:schema>"#;
        let imported = import(xsd);
        let blob = imported.graph.nodes().find(|n| n.label() == "blob").unwrap();
        assert_eq!(blob.datatype(), Datatype::String);
        assert_eq!(imported.warnings[0].kind, WarningKind::UnmappedDatatype);
    }

    #[test]
    fn complex_content_extension_inherits_base_children() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:complexType name="Base">
    <xs:sequence><xs:element name="id" type="xs:integer"/></xs:sequence>
  </xs:complexType>
  <xs:element name="item">
    <xs:complexType>
      <xs:complexContent>
        <xs:extension base="Base">
          <xs:sequence><xs:element name="label" type="xs:string"/></xs:sequence>
        </xs:extension>
      </xs:complexContent>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;
        let imported = import(xsd);
        let item = imported.graph.nodes().find(|n| n.label() == "item").unwrap();
        let names: Vec<&str> = children(&imported.graph, &item.id)
            .iter()
            .map(|(_, n)| n.label())
            .collect();
        assert_eq!(names, ["id", "label"]);
    }

    #[test]
    fn exclusive_bounds_at_the_integer_limits_are_dropped_with_a_warning() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="counter">
    <xs:simpleType>
      <xs:restriction base="xs:integer">
        <xs:minExclusive value="9223372036854775807"/>
        <xs:maxExclusive value="100"/>
      </xs:restriction>
    </xs:simpleType>
  </xs:element>
</xs:schema>"#;
        let imported = import(xsd);
        let counter = imported.graph.nodes().find(|n| n.label() == "counter").unwrap();
        let c = counter.constraints.as_ref().unwrap();
        assert_eq!(c.min_inclusive, None);
        assert_eq!(c.max_inclusive.as_deref(), Some("99"));
        assert_eq!(imported.warnings.len(), 1);
        assert_eq!(imported.warnings[0].kind, WarningKind::UnsupportedConstraint);

        let xsd = xsd
            .replace(r#"<xs:minExclusive value="9223372036854775807"/>"#, "")
            .replace("100", "-9223372036854775808");
        let imported = import(&xsd);
        let counter = imported.graph.nodes().find(|n| n.label() == "counter").unwrap();
        assert_eq!(counter.constraints.as_ref().unwrap().max_inclusive, None);
        assert_eq!(imported.warnings[0].kind, WarningKind::UnsupportedConstraint);
    }

    #[test]
    fn unusable_names_get_a_positional_title_and_siblings_survive() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="record">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="_" type="xs:string"/>
        <xs:element name="ok" type="xs:string"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;
        let imported = import(xsd);
        let record = imported.graph.nodes().find(|n| n.label() == "record").unwrap();
        let names: Vec<&str> = children(&imported.graph, &record.id)
            .iter()
            .map(|(_, n)| n.label())
            .collect();
        assert_eq!(names, ["element_1", "ok"]);
        assert_eq!(imported.warnings.len(), 1);
        assert_eq!(imported.warnings[0].kind, WarningKind::UnusableName);
        assert_eq!(imported.warnings[0].subject.as_deref(), Some("element_1"));
    }

    #[test]
    fn contradictory_length_facets_skip_only_that_element() {
        let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="record">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="code">
          <xs:simpleType>
            <xs:restriction base="xs:string">
              <xs:minLength value="5"/>
              <xs:maxLength value="2"/>
            </xs:restriction>
          </xs:simpleType>
        </xs:element>
        <xs:element name="label" type="xs:string"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;
        let imported = import(xsd);
        let record = imported.graph.nodes().find(|n| n.label() == "record").unwrap();
        let names: Vec<&str> = children(&imported.graph, &record.id)
            .iter()
            .map(|(_, n)| n.label())
            .collect();
        assert_eq!(names, ["label"]);
        assert_eq!(imported.warnings[0].kind, WarningKind::SchemaMismatch);
        assert_eq!(imported.warnings[0].subject.as_deref(), Some("code"));
    }
}
