//! Injection of the browser-side patcher bootstrap.
//!
//! The replayed page ships with two script elements: the main patcher (the
//! caller-supplied implementation of `applyJsonUpdates`) as the very first
//! child of `<head>`, and a bottom bootstrap as the last child of `<body>`
//! that removes itself and kicks off patching once the skeleton has loaded.

use crate::dom::{AttrValue, Attrs, Tree};
use crate::error::{Error, Result};

/// The fixed bottom bootstrap; `_getElementById` is saved by the main
/// patcher before page scripts can clobber it.
const BOTTOM_PATCHER_SRC: &str = "var patcher = _getElementById\
.call(document, \"bottom-patcher\");\
patcher.remove();\
applyJsonUpdates();";

/// Insert the main patcher at the top of `<head>` and the bootstrap at the
/// bottom of `<body>`. The root's first child must be the head and its last
/// child the body.
pub fn insert_patchers(tree: &mut Tree, patcher_js: &str) -> Result<()> {
    let root = tree.root();

    let &head = tree.node(root).children().first().ok_or_else(|| {
        Error::InvalidInput("document root has no children to patch".to_string())
    })?;
    if tree.node(head).name() != "head" {
        return Err(Error::InvalidInput(
            "first child of the root is not <head>".to_string(),
        ));
    }
    let mut attrs = Attrs::new();
    attrs.insert("id".to_string(), AttrValue::from("main-patcher"));
    let main_patcher = tree.create_element("script", attrs);
    tree.insert_child_at(head, 0, main_patcher);
    tree.refresh_cpid(main_patcher, 0);
    tree.add_text(main_patcher, patcher_js.to_string());

    let &body = tree.node(root).children().last().ok_or_else(|| {
        Error::InvalidInput("document root has no children to patch".to_string())
    })?;
    if tree.node(body).name() != "body" {
        return Err(Error::InvalidInput(
            "last child of the root is not <body>".to_string(),
        ));
    }
    let mut attrs = Attrs::new();
    attrs.insert("id".to_string(), AttrValue::from("bottom-patcher"));
    let bottom_patcher = tree.create_element("script", attrs);
    tree.append_child(body, bottom_patcher);
    tree.add_text(bottom_patcher, BOTTOM_PATCHER_SRC.to_string());

    Ok(())
}
