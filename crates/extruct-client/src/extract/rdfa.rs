//! RDFa (Lite) attributes, emitted as expanded JSON-LD node objects.
//!
//! Supports `vocab`, `prefix`, `typeof`, `property`, `about`, `resource`,
//! `href`/`src`, `content`, `datatype`, `datetime` and `lang`. `rel`/`rev`
//! chaining is not processed.

use std::collections::HashMap;
use std::rc::Rc;

use scraper::{ElementRef, Html};
use serde_json::{Map, Value, json};
use url::Url;

use super::dom::{child_elements, raw_text, resolve};
use super::opengraph::parse_prefixes;

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// Prefixes available without a declaration.
const INITIAL_PREFIXES: [(&str, &str); 15] = [
    ("cc", "http://creativecommons.org/ns#"),
    ("dc", "http://purl.org/dc/terms/"),
    ("dcterms", "http://purl.org/dc/terms/"),
    ("foaf", "http://xmlns.com/foaf/0.1/"),
    ("og", "http://ogp.me/ns#"),
    ("owl", "http://www.w3.org/2002/07/owl#"),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("schema", "http://schema.org/"),
    ("sioc", "http://rdfs.org/sioc/ns#"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
    ("v", "http://rdf.data-vocabulary.org/#"),
    ("vcard", "http://www.w3.org/2006/vcard/ns#"),
    ("xhv", "http://www.w3.org/1999/xhtml/vocab#"),
    ("xsd", XSD),
];

/// Extract the RDFa graph of `doc` as a list of node objects, in the order
/// subjects are first seen.
pub(crate) fn extract(doc: &Html, base: Option<&Url>) -> Vec<Value> {
    let context = Rc::new(EvalContext {
        subject: base.map(Url::to_string).unwrap_or_default(),
        vocab: None,
        prefixes: INITIAL_PREFIXES
            .iter()
            .map(|(p, uri)| (p.to_string(), uri.to_string()))
            .collect(),
        lang: None,
    });

    let mut processor = Processor {
        base,
        graph: Graph::default(),
    };

    // Pre-order walk with an explicit stack; page nesting depth is unbounded.
    let mut pending = vec![(doc.root_element(), context)];
    while let Some((el, parent)) = pending.pop() {
        let ctx = processor.process(el, parent);
        let children: Vec<ElementRef<'_>> = child_elements(el).collect();
        pending.extend(children.into_iter().rev().map(|child| (child, Rc::clone(&ctx))));
    }
    processor.graph.into_nodes()
}

/// Evaluation context inherited from ancestors. Shared between siblings and
/// copied only when an element changes it.
#[derive(Clone)]
struct EvalContext {
    subject: String,
    vocab: Option<String>,
    prefixes: HashMap<String, String>,
    lang: Option<String>,
}

#[derive(Default)]
struct Graph {
    nodes: Vec<Map<String, Value>>,
    index: HashMap<String, usize>,
    blank_nodes: usize,
}

impl Graph {
    fn new_blank(&mut self) -> String {
        self.blank_nodes += 1;
        format!("_:b{}", self.blank_nodes - 1)
    }

    fn node(&mut self, id: &str) -> &mut Map<String, Value> {
        let idx = match self.index.get(id) {
            Some(idx) => *idx,
            None => {
                let mut node = Map::new();
                node.insert("@id".into(), json!(id));
                self.nodes.push(node);
                self.index.insert(id.to_string(), self.nodes.len() - 1);
                self.nodes.len() - 1
            }
        };
        &mut self.nodes[idx]
    }

    fn add_type(&mut self, id: &str, type_iri: String) {
        let types = self
            .node(id)
            .entry("@type")
            .or_insert_with(|| json!([]));
        if let Value::Array(types) = types
            && !types.iter().any(|t| t == type_iri.as_str())
        {
            types.push(json!(type_iri));
        }
    }

    fn add_value(&mut self, id: &str, property: String, value: Value) {
        let values = self.node(id).entry(property).or_insert_with(|| json!([]));
        if let Value::Array(values) = values {
            values.push(value);
        }
    }

    fn into_nodes(self) -> Vec<Value> {
        self.nodes.into_iter().map(Value::Object).collect()
    }
}

struct Processor<'b> {
    base: Option<&'b Url>,
    graph: Graph,
}

impl Processor<'_> {
    /// Record the triples of `el` and return the context its children
    /// are evaluated in.
    fn process(&mut self, el: ElementRef<'_>, parent: Rc<EvalContext>) -> Rc<EvalContext> {
        let e = el.value();
        let mut ctx = parent;

        if let Some(vocab) = e.attr("vocab") {
            let vocab = vocab.trim();
            let vocab = (!vocab.is_empty()).then(|| resolve(self.base, vocab));
            if ctx.vocab != vocab {
                Rc::make_mut(&mut ctx).vocab = vocab;
            }
        }
        if let Some(prefix) = e.attr("prefix") {
            let declared = parse_prefixes(prefix);
            if !declared.is_empty() {
                Rc::make_mut(&mut ctx).prefixes.extend(declared);
            }
        }
        if let Some(lang) = e.attr("lang").or_else(|| e.attr("xml:lang")) {
            let lang = lang.trim();
            let lang = (!lang.is_empty()).then(|| lang.to_string());
            if ctx.lang != lang {
                Rc::make_mut(&mut ctx).lang = lang;
            }
        }

        let about = e.attr("about").map(|v| self.resource_iri(v, &ctx));
        let resource = e
            .attr("resource")
            .map(|v| self.resource_iri(v, &ctx))
            .or_else(|| e.attr("href").map(|v| resolve(self.base, v)))
            .or_else(|| e.attr("src").map(|v| resolve(self.base, v)));
        let properties: Vec<String> = e
            .attr("property")
            .map(|p| p.split_whitespace().filter_map(|t| expand_term(t, &ctx)).collect())
            .unwrap_or_default();
        let types: Vec<String> = e
            .attr("typeof")
            .map(|t| t.split_whitespace().filter_map(|t| expand_term(t, &ctx)).collect())
            .unwrap_or_default();
        let has_typeof = e.attr("typeof").is_some();
        let has_property = e.attr("property").is_some();

        let new_subject = if has_typeof {
            let typed = match (&about, &resource) {
                (Some(about), _) => about.clone(),
                (None, Some(resource)) => resource.clone(),
                (None, None) => self.graph.new_blank(),
            };
            for ty in types {
                self.graph.add_type(&typed, ty);
            }
            if about.is_none() {
                for property in &properties {
                    self.graph
                        .add_value(&ctx.subject, property.clone(), json!({"@id": typed}));
                }
            } else {
                let literal = self.literal(el, &ctx);
                for property in &properties {
                    self.graph.add_value(&typed, property.clone(), literal.clone());
                }
            }
            Some(typed)
        } else if has_property {
            let subject = about.clone().unwrap_or_else(|| ctx.subject.clone());
            let value = match (e.attr("content"), &resource) {
                (None, Some(resource)) => json!({"@id": resource}),
                _ => self.literal(el, &ctx),
            };
            for property in properties {
                self.graph.add_value(&subject, property, value.clone());
            }
            about
        } else {
            about.or(resource)
        };

        if let Some(subject) = new_subject
            && subject != ctx.subject
        {
            Rc::make_mut(&mut ctx).subject = subject;
        }
        ctx
    }

    /// A literal object for `el`: `content`, else `datetime`, else its text.
    fn literal(&self, el: ElementRef<'_>, ctx: &EvalContext) -> Value {
        let e = el.value();
        let (text, implied_type) = if let Some(content) = e.attr("content") {
            (content.to_string(), None)
        } else if let Some(datetime) = e.attr("datetime") {
            (datetime.to_string(), datetime_type(datetime))
        } else {
            (raw_text(el), None)
        };

        let mut literal = Map::new();
        literal.insert("@value".into(), json!(text));
        let datatype = e
            .attr("datatype")
            .filter(|d| !d.trim().is_empty())
            .and_then(|d| expand_term(d.trim(), ctx))
            .or(implied_type);
        match datatype {
            Some(datatype) => {
                literal.insert("@type".into(), json!(datatype));
            }
            None => {
                if let Some(lang) = &ctx.lang {
                    literal.insert("@language".into(), json!(lang));
                }
            }
        }
        Value::Object(literal)
    }

    /// `about`/`resource` accept safe CURIEs, CURIEs with a known prefix, and
    /// (relative) IRIs.
    fn resource_iri(&self, raw: &str, ctx: &EvalContext) -> String {
        let raw = raw.trim();
        if let Some(curie) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            return expand_curie(curie, ctx).unwrap_or_else(|| curie.to_string());
        }
        if raw.starts_with("_:") {
            return raw.to_string();
        }
        if let Some((prefix, _)) = raw.split_once(':')
            && ctx.prefixes.contains_key(&prefix.to_ascii_lowercase())
        {
            return expand_curie(raw, ctx).unwrap_or_else(|| raw.to_string());
        }
        resolve(self.base, raw)
    }
}

/// Expand a `property`/`typeof`/`datatype` token: a CURIE with a known
/// prefix, an absolute IRI, or a term resolved against the current vocab.
fn expand_term(term: &str, ctx: &EvalContext) -> Option<String> {
    if term.contains(':') {
        return expand_curie(term, ctx).or_else(|| Some(term.to_string()));
    }
    ctx.vocab.as_ref().map(|vocab| format!("{vocab}{term}"))
}

fn expand_curie(curie: &str, ctx: &EvalContext) -> Option<String> {
    let (prefix, reference) = curie.split_once(':')?;
    if prefix == "_" {
        return Some(curie.to_string());
    }
    if reference.starts_with("//") {
        return None;
    }
    ctx.prefixes
        .get(&prefix.to_ascii_lowercase())
        .map(|uri| format!("{uri}{reference}"))
}

/// XSD type of a `datetime` attribute value, when its shape is recognisable.
fn datetime_type(value: &str) -> Option<String> {
    let value = value.trim();
    let is_date = |s: &str| {
        s.len() == 10
            && s.char_indices()
                .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() })
    };

    if is_date(value) {
        Some(format!("{XSD}date"))
    } else if value.get(..10).is_some_and(is_date)
        && value.get(10..).is_some_and(|rest| rest.starts_with('T'))
    {
        Some(format!("{XSD}dateTime"))
    } else {
        None
    }
}
