//! Interface to the external tree-edit-distance solver.
//!
//! The solver is an opaque transducer: it reads two trees in a bracketed
//! text format and prints one mapped post-order pair per line. Anything
//! honoring that contract works; in practice it is the APTED jar.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::dom::{NodeKind, NodeRef, Tree};
use crate::error::{Error, Result};

/// Render a tree in the solver's bracketed input format: `{` name, then the
/// children in order, then `}`; a text node is `{#text:"<escaped>"}` with
/// backslash and double-quote escaped by a leading backslash.
pub fn bracketed_repr(tree: &Tree) -> String {
    let mut out = String::new();
    bracketed_node(tree, tree.root(), &mut out);
    out
}

fn bracketed_node(tree: &Tree, node: NodeRef, out: &mut String) {
    out.push('{');
    match &tree.node(node).kind {
        NodeKind::Element { name, children, .. } => {
            out.push_str(name);
            for &child in children {
                bracketed_node(tree, child, out);
            }
        }
        NodeKind::Text { content } => {
            out.push_str("#text:\"");
            for c in content.chars() {
                if c == '\\' || c == '"' {
                    out.push('\\');
                }
                out.push(c);
            }
            out.push('"');
        }
    }
    out.push('}');
}

/// Write a tree's bracketed form to a file.
pub fn write_solver_input(tree: &Tree, path: &Path) -> Result<()> {
    std::fs::write(path, bracketed_repr(tree))?;
    Ok(())
}

/// Parse the solver's stdout: an info line we ignore, then `src->dst` pairs.
pub fn parse_mapping(output: &str) -> Result<Vec<(usize, usize)>> {
    let mut mapping = Vec::new();
    for line in output.lines().skip(1) {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let pair = line
            .split_once("->")
            .and_then(|(a, b)| Some((a.trim().parse().ok()?, b.trim().parse().ok()?)))
            .ok_or_else(|| {
                Error::ExternalFailure(format!("malformed mapping line {line:?}"))
            })?;
        mapping.push(pair);
    }
    Ok(mapping)
}

/// Runs the APTED jar as a subprocess.
#[derive(Debug, Clone)]
pub struct AptedSolver {
    jar_path: PathBuf,
}

impl AptedSolver {
    pub fn new(jar_path: impl Into<PathBuf>) -> Self {
        AptedSolver {
            jar_path: jar_path.into(),
        }
    }

    /// Invoke the solver on two tree files with the mapping flag and parse
    /// the pair list from its stdout.
    pub fn compute_mapping(
        &self,
        first_tree: &Path,
        second_tree: &Path,
    ) -> Result<Vec<(usize, usize)>> {
        tracing::debug!(jar = %self.jar_path.display(), "invoking the tree-edit-distance solver");
        let output = Command::new("java")
            .arg("-jar")
            .arg(&self.jar_path)
            .arg("-f")
            .arg(first_tree)
            .arg(second_tree)
            .arg("-m")
            .output()?;
        if !output.status.success() {
            return Err(Error::ExternalFailure(format!(
                "solver exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        parse_mapping(&String::from_utf8_lossy(&output.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{StripMode, parse_html};

    #[test]
    fn bracketed_repr_nests_children_in_order() {
        let tree = parse_html(
            "<html><head><title>t</title></head><body><p>hi</p></body></html>",
            StripMode::None,
        )
        .unwrap();
        assert_eq!(
            bracketed_repr(&tree),
            "{html{head{title{#text:\"t\"}}}{body{p{#text:\"hi\"}}}}"
        );
    }

    #[test]
    fn bracketed_text_escapes_quotes_and_backslashes() {
        let tree =
            parse_html("<html><body><p>a\"b\\c</p></body></html>", StripMode::None).unwrap();
        assert!(bracketed_repr(&tree).contains("{#text:\"a\\\"b\\\\c\"}"));
    }

    #[test]
    fn mapping_parser_skips_the_info_line() {
        let output = "distance: 3\n1->1\n2->0\n0->2\n";
        assert_eq!(parse_mapping(output).unwrap(), vec![(1, 1), (2, 0), (0, 2)]);
    }

    #[test]
    fn malformed_mapping_is_an_external_failure() {
        let output = "info\n1->1\nnot a pair\n";
        assert!(matches!(
            parse_mapping(output),
            Err(Error::ExternalFailure(_))
        ));
    }
}
