//! Parse -> serialize -> reparse stability.
//!
//! The emitted HTML of a stripped tree must reparse into a structurally
//! identical tree: whitespace, comments, and meta nodes are already gone, so
//! the second pass has nothing left to strip.

use skelpatch::{StripMode, Tree, parse_html};

fn parse(html: &str) -> Tree {
    parse_html(html, StripMode::None).unwrap()
}

fn assert_roundtrip(html: &str) {
    let tree = parse(html);
    let emitted = tree.to_html();
    let reparsed = parse(&emitted);
    assert!(
        tree.structurally_eq(&reparsed),
        "reparse of {emitted:?} changed the tree"
    );
    assert_eq!(emitted, reparsed.to_html());
}

#[test]
fn plain_page() {
    assert_roundtrip("<html><head><title>t</title></head><body><p>hi</p></body></html>");
}

#[test]
fn page_with_attributes_and_classes() {
    assert_roundtrip(
        "<html><head></head><body>\
         <a class=\"x y\" href=\"/z\">link</a>\
         <div id=\"main\" data-model=\"[1,2]\"><span>s</span></div>\
         </body></html>",
    );
}

#[test]
fn page_with_void_elements() {
    assert_roundtrip(
        "<html><head><link rel=\"stylesheet\" href=\"a.css\"></head>\
         <body><img src=\"p.png\"><br><input type=\"text\"></body></html>",
    );
}

#[test]
fn page_with_noscript() {
    assert_roundtrip(
        "<html><head></head><body>\
         <noscript><img src=\"a.png\"></noscript>\
         </body></html>",
    );
}

#[test]
fn messy_input_normalizes_once_then_stays_fixed() {
    // Doctype, comments, meta, and whitespace disappear on the first parse;
    // after that the output is a fixed point.
    let tree = parse(
        "<!DOCTYPE html>\n<html>\n  <head>\n    <meta charset=\"utf-8\">\n    \
         <title>t</title>\n  </head>\n  <body>\n    <!-- c -->\n    <p>hi</p>\n  \
         </body>\n</html>",
    );
    let emitted = tree.to_html();
    assert_eq!(
        emitted,
        "<html><head><title>t</title></head><body><p>hi</p></body></html>"
    );
    assert_roundtrip(&emitted);
}
