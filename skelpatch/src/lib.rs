//! HTML-tree differencing for web-page replay.
//!
//! skelpatch takes two versions of the same page and produces either a
//! *common* tree (the structure and content both share - the skeleton a
//! replay server ships up front) or a JSON patch that reconstructs the first
//! page client-side on top of that skeleton.
//!
//! The pipeline:
//! - **Parsing**: browser-compatible HTML5 parsing via html5ever into an
//!   arena tree with stable post-order ids ([`parse_html`])
//! - **Solver**: the optimal node mapping comes from an external
//!   tree-edit-distance solver ([`solver::AptedSolver`])
//! - **Diffing**: the mapping becomes a sorted [`diff::EditSequence`] of
//!   Delete/Insert/Merge edits, replayed into a common tree or a minimized
//!   JSON patch
//!
//! # Example
//!
//! ```rust,ignore
//! use skelpatch::{parse_html, StripMode, diff::edits_from_mapping};
//!
//! let first = parse_html(&old_html, StripMode::None)?;
//! let second = parse_html(&new_html, StripMode::None)?;
//! let mapping = solver.compute_mapping(&first_file, &second_file)?;
//! let mut edits = edits_from_mapping(&first, &second, &mapping)?;
//! let common = edits.generate_common_tree(&first, &second)?;
//! ```

pub mod diff;
mod dom;
mod error;
mod parser;
pub mod patcher;
mod serialize;
pub mod similarity;
pub mod solver;

pub use dom::{AttrValue, Attrs, NodeData, NodeId, NodeKind, NodeRef, PathId, TEXT_NAME, Tree};
pub use error::{Error, Result};
pub use parser::{StripMode, parse_html};
pub use serialize::serialize_subtree;
