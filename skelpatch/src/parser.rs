//! HTML5 parsing into the arena [`Tree`].
//!
//! Uses html5ever's tree construction for browser-compatible error recovery;
//! parse errors are ignored on purpose - recorded pages are routinely
//! non-conformant. The parse graph is an Rc-based scratch DOM (weak parent
//! pointers, interior mutability, as the TreeSink contract wants); the second
//! stage converts it into the arena tree while applying the recording
//! pipeline's stripping rules:
//!
//! - the DOCTYPE is dropped, and stray top-level siblings are wrapped under a
//!   synthesized `<html>` root;
//! - comments, processing instructions, `<meta>` elements, and
//!   whitespace-only text runs never make it into the tree;
//! - `<noscript>` descendants collapse into one text child holding their
//!   serialized form;
//! - multi-valued attributes (`class` and friends) become token lists.

use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::{ElementFlags, NodeOrText, QuirksMode, TreeSink};
use html5ever::{Attribute, ExpandedName, QualName, parse_document};
use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt::Write;
use std::rc::{Rc, Weak};
use tendril::StrTendril;

use crate::dom::{AttrValue, Attrs, NodeRef, Tree};
use crate::error::{Error, Result};

/// What to remove while building a tree. Everything except `None` exists for
/// the similarity pass; diffing always parses with `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StripMode {
    /// Keep attributes and text content.
    #[default]
    None,
    /// Drop all attributes.
    Attrs,
    /// Blank text content but keep the text nodes.
    Bodies,
    /// Drop attributes and remove text nodes entirely.
    Both,
    /// Drop attributes and blank text content, keeping the text nodes.
    BothPreserveNodes,
}

impl StripMode {
    fn strip_attrs(self) -> bool {
        matches!(
            self,
            StripMode::Attrs | StripMode::Both | StripMode::BothPreserveNodes
        )
    }

    fn strip_body(self) -> bool {
        matches!(
            self,
            StripMode::Bodies | StripMode::Both | StripMode::BothPreserveNodes
        )
    }

    fn preserve_nodes(self) -> bool {
        matches!(self, StripMode::Bodies | StripMode::BothPreserveNodes)
    }
}

/// Parse an HTML string into a sealed [`Tree`].
pub fn parse_html(input: &str, strip: StripMode) -> Result<Tree> {
    if input.trim().is_empty() {
        return Err(Error::InvalidInput("empty HTML input".to_string()));
    }

    let sink = parse_document(Sink::default(), Default::default()).one(input);

    let top_level: Vec<Handle> = sink
        .document
        .children
        .borrow()
        .iter()
        .filter(|child| matches!(child.data, ParseData::Element { .. }))
        .cloned()
        .collect();

    let mut tree = Tree::new();
    match top_level.as_slice() {
        [] => return Err(Error::InvalidInput("no elements in HTML input".to_string())),
        [root] => convert_into(&mut tree, None, root, strip),
        many => {
            // Doctype siblings without a top-most <html>: wrap them.
            let root = tree.add_element(None, "html", Attrs::new());
            for child in many {
                convert_into(&mut tree, Some(root), child, strip);
            }
        }
    }
    tree.seal();
    Ok(tree)
}

/// Multi-valued HTML attributes, parsed as ordered token lists. Global
/// entries apply to every element, the rest are per-tag.
const GLOBAL_TOKEN_ATTRS: &[&str] = &["class", "accesskey", "dropzone"];
const PER_TAG_TOKEN_ATTRS: &[(&str, &[&str])] = &[
    ("a", &["rel", "rev"]),
    ("link", &["rel", "rev"]),
    ("area", &["rel"]),
    ("td", &["headers"]),
    ("th", &["headers"]),
    ("form", &["accept-charset"]),
    ("object", &["archive"]),
    ("icon", &["sizes"]),
    ("iframe", &["sandbox"]),
    ("output", &["for"]),
];

fn is_token_list_attr(tag: &str, attr: &str) -> bool {
    GLOBAL_TOKEN_ATTRS.contains(&attr)
        || PER_TAG_TOKEN_ATTRS
            .iter()
            .any(|(t, attrs)| *t == tag && attrs.contains(&attr))
}

fn convert_attrs(tag: &str, attrs: &[Attribute], strip: StripMode) -> Attrs {
    let mut out = Attrs::new();
    if strip.strip_attrs() {
        return out;
    }
    for attr in attrs {
        let name = attr.name.local.to_string();
        let value = if is_token_list_attr(tag, &name) {
            AttrValue::Tokens(attr.value.split_whitespace().map(String::from).collect())
        } else {
            AttrValue::Str(attr.value.to_string())
        };
        out.insert(name, value);
    }
    out
}

/// Non-empty, all-whitespace text runs are dropped before tree construction.
fn is_whitespace_run(text: &str) -> bool {
    !text.is_empty() && text.chars().all(char::is_whitespace)
}

fn convert_into(tree: &mut Tree, parent: Option<NodeRef>, node: &Handle, strip: StripMode) {
    let ParseData::Element { name, attrs } = &node.data else {
        return;
    };
    let tag = name.local.as_ref();
    let attrs = convert_attrs(tag, &attrs.borrow()[..], strip);
    let elem = tree.add_element(parent, tag, attrs);

    if tag == "noscript" {
        // Collapse all descendants into a single text child holding their
        // serialized form (with scripting enabled the parser already hands
        // the content over as one raw text run).
        let mut content = String::new();
        for child in node.children.borrow().iter() {
            serialize_parse_node(child, strip, &mut content);
        }
        if !content.is_empty() && !is_whitespace_run(&content) {
            tree.add_text(elem, content);
        }
        return;
    }

    for child in node.children.borrow().iter() {
        match &child.data {
            ParseData::Element { name, .. } => {
                if name.local.as_ref() == "meta" {
                    continue;
                }
                convert_into(tree, Some(elem), child, strip);
            }
            ParseData::Text(contents) => {
                let text = contents.borrow();
                if is_whitespace_run(&text) {
                    continue;
                }
                if strip.strip_body() {
                    if strip.preserve_nodes() {
                        tree.add_text(elem, String::new());
                    }
                    continue;
                }
                tree.add_text(elem, text.to_string());
            }
            ParseData::Document | ParseData::Comment => {}
        }
    }
}

/// Serialize a parse-graph subtree the way the tree serializer would, with
/// the same stripping rules applied. Only used for the noscript collapse.
fn serialize_parse_node(node: &Handle, strip: StripMode, out: &mut String) {
    match &node.data {
        ParseData::Text(contents) => {
            let text = contents.borrow();
            if is_whitespace_run(&text) {
                return;
            }
            if !strip.strip_body() {
                out.push_str(&text);
            }
        }
        ParseData::Element { name, attrs } => {
            let tag = name.local.as_ref();
            if tag == "meta" {
                return;
            }
            let _ = write!(out, "<{}", tag);
            if !strip.strip_attrs() {
                for attr in attrs.borrow().iter() {
                    let name = attr.name.local.as_ref();
                    let rendered = if is_token_list_attr(tag, name) {
                        attr.value
                            .split_whitespace()
                            .collect::<Vec<_>>()
                            .join(" ")
                    } else {
                        attr.value.replace('"', "&quot;")
                    };
                    let _ = write!(out, " {}=\"{}\"", name, rendered);
                }
            }
            if crate::serialize::VOID_ELEMENTS.contains(&tag) {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in node.children.borrow().iter() {
                serialize_parse_node(child, strip, out);
            }
            let _ = write!(out, "</{}>", tag);
        }
        ParseData::Document | ParseData::Comment => {}
    }
}

// =============================================================================
// TreeSink scratch DOM
// =============================================================================

type Handle = Rc<ParseNode>;
type WeakHandle = Weak<ParseNode>;

struct ParseNode {
    parent: Cell<Option<WeakHandle>>,
    children: RefCell<Vec<Handle>>,
    data: ParseData,
}

enum ParseData {
    Document,
    Element {
        name: QualName,
        attrs: RefCell<Vec<Attribute>>,
    },
    Text(RefCell<StrTendril>),
    Comment,
}

impl ParseNode {
    fn new(data: ParseData) -> Handle {
        Rc::new(ParseNode {
            parent: Cell::new(None),
            children: RefCell::new(Vec::new()),
            data,
        })
    }

    fn parent(&self) -> Option<WeakHandle> {
        let parent = self.parent.take();
        self.parent.set(parent.clone());
        parent
    }
}

/// Append a parentless node to another node's children.
fn append(new_parent: &Handle, child: Handle) {
    child.parent.set(Some(Rc::downgrade(new_parent)));
    new_parent.children.borrow_mut().push(child);
}

/// If the node has a parent, get it and this node's position in its children.
fn get_parent_and_index(target: &Handle) -> Option<(Handle, usize)> {
    let parent = target.parent()?.upgrade()?;
    let i = parent
        .children
        .borrow()
        .iter()
        .position(|child| Rc::ptr_eq(child, target))?;
    Some((parent, i))
}

fn append_to_existing_text(prev: &Handle, text: &str) -> bool {
    match &prev.data {
        ParseData::Text(contents) => {
            contents.borrow_mut().push_slice(text);
            true
        }
        _ => false,
    }
}

fn remove_from_parent(target: &Handle) {
    if let Some((parent, i)) = get_parent_and_index(target) {
        parent.children.borrow_mut().remove(i);
        target.parent.set(None);
    }
}

struct Sink {
    document: Handle,
}

impl Default for Sink {
    fn default() -> Self {
        Sink {
            document: ParseNode::new(ParseData::Document),
        }
    }
}

impl TreeSink for Sink {
    type Output = Self;
    type Handle = Handle;
    type ElemName<'a>
        = ExpandedName<'a>
    where
        Self: 'a;

    fn finish(self) -> Self {
        self
    }

    fn parse_error(&self, _msg: Cow<'static, str>) {
        // Accept everything browsers accept.
    }

    fn get_document(&self) -> Handle {
        self.document.clone()
    }

    fn get_template_contents(&self, target: &Handle) -> Handle {
        // Template children just nest under the element; good enough for
        // diffing, which never instantiates templates.
        target.clone()
    }

    fn set_quirks_mode(&self, _mode: QuirksMode) {}

    fn same_node(&self, x: &Handle, y: &Handle) -> bool {
        Rc::ptr_eq(x, y)
    }

    fn elem_name<'a>(&'a self, target: &'a Handle) -> ExpandedName<'a> {
        match &target.data {
            ParseData::Element { name, .. } => name.expanded(),
            _ => panic!("elem_name called on a non-element"),
        }
    }

    fn create_element(&self, name: QualName, attrs: Vec<Attribute>, _flags: ElementFlags) -> Handle {
        ParseNode::new(ParseData::Element {
            name,
            attrs: RefCell::new(attrs),
        })
    }

    fn create_comment(&self, _text: StrTendril) -> Handle {
        ParseNode::new(ParseData::Comment)
    }

    fn create_pi(&self, _target: StrTendril, _data: StrTendril) -> Handle {
        ParseNode::new(ParseData::Comment)
    }

    fn append(&self, parent: &Handle, child: NodeOrText<Handle>) {
        // Merge adjacent text runs.
        if let NodeOrText::AppendText(text) = &child {
            if let Some(last) = parent.children.borrow().last() {
                if append_to_existing_text(last, text) {
                    return;
                }
            }
        }
        append(
            parent,
            match child {
                NodeOrText::AppendText(text) => {
                    ParseNode::new(ParseData::Text(RefCell::new(text)))
                }
                NodeOrText::AppendNode(node) => node,
            },
        );
    }

    fn append_before_sibling(&self, sibling: &Handle, child: NodeOrText<Handle>) {
        let Some((parent, i)) = get_parent_and_index(sibling) else {
            return;
        };
        let child = match (child, i) {
            (NodeOrText::AppendText(text), 0) => {
                ParseNode::new(ParseData::Text(RefCell::new(text)))
            }
            (NodeOrText::AppendText(text), i) => {
                let children = parent.children.borrow();
                if append_to_existing_text(&children[i - 1], &text) {
                    return;
                }
                drop(children);
                ParseNode::new(ParseData::Text(RefCell::new(text)))
            }
            (NodeOrText::AppendNode(node), _) => node,
        };
        remove_from_parent(&child);
        child.parent.set(Some(Rc::downgrade(&parent)));
        parent.children.borrow_mut().insert(i, child);
    }

    fn append_based_on_parent_node(
        &self,
        element: &Handle,
        prev_element: &Handle,
        child: NodeOrText<Handle>,
    ) {
        if element.parent().is_some() {
            self.append_before_sibling(element, child);
        } else {
            self.append(prev_element, child);
        }
    }

    fn append_doctype_to_document(
        &self,
        _name: StrTendril,
        _public_id: StrTendril,
        _system_id: StrTendril,
    ) {
        // The doctype is dropped before tree construction.
    }

    fn add_attrs_if_missing(&self, target: &Handle, attrs: Vec<Attribute>) {
        let ParseData::Element { attrs: existing, .. } = &target.data else {
            return;
        };
        let mut existing = existing.borrow_mut();
        for attr in attrs {
            if !existing.iter().any(|a| a.name == attr.name) {
                existing.push(attr);
            }
        }
    }

    fn remove_from_parent(&self, target: &Handle) {
        remove_from_parent(target);
    }

    fn reparent_children(&self, node: &Handle, new_parent: &Handle) {
        let children = std::mem::take(&mut *node.children.borrow_mut());
        for child in &children {
            child.parent.set(Some(Rc::downgrade(new_parent)));
        }
        new_parent.children.borrow_mut().extend(children);
    }
}
