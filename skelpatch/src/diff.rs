//! Tree edits around an external tree-edit-distance mapping.
//!
//! The solver hands back post-order node pairs; this module turns them into
//! typed edits (Delete, Insert, Merge), orders them by child-path id, and
//! replays them two ways:
//!
//! - `apply` mutates a subject tree toward the *common* tree - the
//!   intersection both pages share, which the browser will already have when
//!   the patch arrives;
//! - `shadow_apply` simulates what the browser-side patcher will do, which
//!   surfaces subtree moves that matched-in-place nodes would otherwise hide.
//!
//! Node lookups during replay always go through post-order ids: those are
//! frozen at tree construction, while child-path ids shift under every
//! structural mutation.

use serde_json::{Map, Value, json};

use crate::dom::{AttrValue, NodeId, NodeKind, NodeRef, Tree};
use crate::error::{Error, Result};

/// What happened to one attribute (or to the text content, under the key
/// `"content"`) between a source node and its matched target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Remove,
    Change,
}

/// One atomic difference between two like-typed nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeChange {
    pub kind: ChangeKind,
    pub key: String,
    /// The target-side value; `None` for removals.
    pub value: Option<AttrValue>,
}

impl MergeChange {
    fn add(key: &str, value: AttrValue) -> Self {
        MergeChange {
            kind: ChangeKind::Add,
            key: key.to_string(),
            value: Some(value),
        }
    }

    fn remove(key: &str) -> Self {
        MergeChange {
            kind: ChangeKind::Remove,
            key: key.to_string(),
            value: None,
        }
    }

    fn change(key: &str, value: AttrValue) -> Self {
        MergeChange {
            kind: ChangeKind::Change,
            key: key.to_string(),
            value: Some(value),
        }
    }
}

/// Compare a source node against its matched target and describe the
/// differences. Callers must not pair incompatible nodes: a name or node-kind
/// mismatch is an error, not a change.
pub fn merge_changes(
    first: &Tree,
    source: NodeRef,
    second: &Tree,
    target: NodeRef,
) -> Result<Vec<MergeChange>> {
    let s = first.node(source);
    let t = second.node(target);
    if s.name() != t.name() {
        return Err(Error::InvalidInput(format!(
            "cannot merge nodes with names {:?} and {:?}",
            s.name(),
            t.name()
        )));
    }
    match (&s.kind, &t.kind) {
        (NodeKind::Text { content: sc }, NodeKind::Text { content: tc }) => {
            // If the common tree blanks a content it is not reparsed as an
            // empty text node on the next round, so empty-vs-nonempty is an
            // add/remove rather than a change.
            if sc == tc {
                Ok(vec![])
            } else if sc.is_empty() {
                Ok(vec![MergeChange::add("content", AttrValue::Str(tc.clone()))])
            } else if tc.is_empty() {
                Ok(vec![MergeChange::remove("content")])
            } else {
                Ok(vec![MergeChange::change(
                    "content",
                    AttrValue::Str(tc.clone()),
                )])
            }
        }
        (
            NodeKind::Element { attrs: sa, .. },
            NodeKind::Element { attrs: ta, .. },
        ) => {
            let mut changes = Vec::new();
            for (key, this_value) in sa {
                match ta.get(key) {
                    None => changes.push(MergeChange::remove(key)),
                    Some(other_value) if other_value != this_value => {
                        match (this_value, other_value) {
                            // Token lists compare as sets so a mere reorder
                            // (or a target that is a subset of the source) is
                            // not a change.
                            (AttrValue::Tokens(these), AttrValue::Tokens(others)) => {
                                if !others.iter().all(|t| these.contains(t)) {
                                    changes.push(MergeChange::change(key, other_value.clone()));
                                }
                            }
                            _ => changes.push(MergeChange::change(key, other_value.clone())),
                        }
                    }
                    Some(_) => {}
                }
            }
            for (key, that_value) in ta {
                if !sa.contains_key(key) {
                    changes.push(MergeChange::add(key, that_value.clone()));
                }
            }
            Ok(changes)
        }
        _ => Err(Error::InvalidInput(
            "cannot merge an element with a text node".to_string(),
        )),
    }
}

fn cpid_json(id: &NodeId) -> Value {
    Value::Array(id.path().iter().map(|&i| Value::from(i)).collect())
}

fn attr_value_json(value: &AttrValue) -> Value {
    match value {
        AttrValue::Str(s) => Value::String(s.clone()),
        AttrValue::Tokens(tokens) => {
            Value::Array(tokens.iter().map(|t| Value::String(t.clone())).collect())
        }
    }
}

fn attrs_json(attrs: &crate::dom::Attrs) -> Value {
    let mut map = Map::new();
    for (key, value) in attrs {
        map.insert(key.clone(), attr_value_json(value));
    }
    Value::Object(map)
}

/// Remove the source node from the subject tree.
#[derive(Debug, Clone)]
pub struct Delete {
    source: NodeRef,
    cpid: NodeId,
}

impl Delete {
    pub fn new(first: &Tree, source: NodeRef) -> Self {
        let cpid = first.node(source).cpid.clone();
        Delete { source, cpid }
    }

    /// Splice the equivalent subject node out: its children are promoted
    /// into its parent's child list at its position.
    fn apply(&self, first: &Tree, subject: &mut Tree) -> Result<()> {
        let found = subject.find_by_post_id(first.node(self.source).post_id)?;
        subject.splice_out(found)
    }

    fn get_json(&self, first: &Tree) -> Value {
        let data = first.node(self.source);
        let mut rec = Map::new();
        rec.insert("type".to_string(), json!("Delete"));
        rec.insert("cpid".to_string(), cpid_json(&data.cpid));
        rec.insert("tag_name".to_string(), json!(data.name()));
        if let Some(content) = data.text_content() {
            rec.insert("content".to_string(), json!(content));
        }
        Value::Object(rec)
    }
}

/// Insert the target node (which only exists in the second tree).
#[derive(Debug, Clone)]
pub struct Insert {
    target: NodeRef,
    cpid: NodeId,
}

impl Insert {
    pub fn new(second: &Tree, target: NodeRef) -> Self {
        let cpid = second.node(target).cpid.clone();
        Insert { target, cpid }
    }

    /// In the live DOM the target cpid either does not exist yet or points
    /// at some sibling, so the record addresses the parent and carries the
    /// intended child index separately.
    fn get_json(&self, second: &Tree) -> Result<Value> {
        let data = second.node(self.target);
        let parent = data.parent.ok_or_else(|| {
            Error::InvalidInput("cannot insert a root node into another tree".to_string())
        })?;
        let mut rec = Map::new();
        rec.insert("cpid".to_string(), cpid_json(&second.node(parent).cpid));
        rec.insert("i".to_string(), json!(data.cpid.last_child_index()));
        match &data.kind {
            NodeKind::Element { name, attrs, .. } => {
                rec.insert("n".to_string(), json!(name));
                rec.insert("attrs".to_string(), attrs_json(attrs));
            }
            NodeKind::Text { content } => {
                rec.insert("c".to_string(), json!(content));
            }
        }
        Ok(Value::Object(rec))
    }

    /// Insert a childless copy of the target, the way a browser inserting a
    /// bare element would; the following Merge/Insert/Delete edits supply the
    /// descendants, so they see the same structure the patcher will.
    fn shadow_apply(&self, second: &Tree, subject: &mut Tree) -> Result<()> {
        let data = second.node(self.target);
        let target_parent = data.parent.ok_or_else(|| {
            Error::InvalidInput("cannot insert a root node into another tree".to_string())
        })?;
        let parent_cpid = second.node(target_parent).cpid.clone();
        let parent = subject.find_by_cpid(&parent_cpid)?;
        if !subject.node(parent).is_element() {
            return Err(Error::InvalidInput(format!(
                "insert parent {parent_cpid} is a text node in the subject tree"
            )));
        }
        let index = data.cpid.last_child_index() as usize;
        let copy = subject.adopt_shallow(second, self.target, parent);
        subject.insert_child_at(parent, index, copy);
        Ok(())
    }
}

/// Reconcile a matched (source, target) pair of same-named nodes.
#[derive(Debug, Clone)]
pub struct Merge {
    source: NodeRef,
    target: NodeRef,
    cpid: NodeId,
    changes: Vec<MergeChange>,
}

impl Merge {
    pub fn new(first: &Tree, source: NodeRef, second: &Tree, target: NodeRef) -> Result<Self> {
        let changes = merge_changes(first, source, second, target).inspect_err(|_| {
            tracing::debug!(
                source_post_id = first.node(source).post_id,
                source_name = first.node(source).name(),
                target_post_id = second.node(target).post_id,
                target_name = second.node(target).name(),
                "mapping paired incompatible nodes"
            );
        })?;
        let cpid = second.node(target).cpid.clone();
        Ok(Merge {
            source,
            target,
            cpid,
            changes,
        })
    }

    pub fn changes(&self) -> &[MergeChange] {
        &self.changes
    }

    /// Keep only what the two nodes share: blank changed text, drop or
    /// intersect changed attributes, ignore additions.
    fn apply(&self, first: &Tree, second: &Tree, subject: &mut Tree) -> Result<()> {
        let found = subject.find_by_post_id(first.node(self.source).post_id)?;
        if subject.node(found).is_text() {
            if !self.changes.is_empty() {
                if let NodeKind::Text { content } = &mut subject.node_mut(found).kind {
                    content.clear();
                }
            }
            return Ok(());
        }
        for change in &self.changes {
            match (change.kind, &change.value) {
                (ChangeKind::Remove, _) => {
                    if let NodeKind::Element { attrs, .. } = &mut subject.node_mut(found).kind {
                        attrs.shift_remove(&change.key);
                    }
                }
                (ChangeKind::Change, Some(AttrValue::Str(new_value))) => {
                    // Changed string values are not common - except data-*
                    // attributes carrying bracketed payloads, which the
                    // replayed page needs present (if blank) to boot.
                    let keep_blank = change.key.starts_with("data-")
                        && (new_value.contains('[') || new_value.contains(']'));
                    if let NodeKind::Element { attrs, .. } = &mut subject.node_mut(found).kind {
                        if keep_blank {
                            attrs.insert(change.key.clone(), AttrValue::Str(String::new()));
                        } else {
                            attrs.shift_remove(&change.key);
                        }
                    }
                }
                (ChangeKind::Change, Some(AttrValue::Tokens(_))) => {
                    let source_tokens = first
                        .node(self.source)
                        .attrs()
                        .and_then(|a| a.get(&change.key))
                        .and_then(AttrValue::as_tokens)
                        .ok_or_else(|| {
                            Error::InvalidInput(format!(
                                "merge change references missing token attribute {:?}",
                                change.key
                            ))
                        })?;
                    let target_tokens = second
                        .node(self.target)
                        .attrs()
                        .and_then(|a| a.get(&change.key))
                        .and_then(AttrValue::as_tokens)
                        .ok_or_else(|| {
                            Error::InvalidInput(format!(
                                "merge change references missing token attribute {:?}",
                                change.key
                            ))
                        })?;
                    let common: Vec<String> = source_tokens
                        .iter()
                        .filter(|t| target_tokens.contains(t))
                        .cloned()
                        .collect();
                    if let NodeKind::Element { attrs, .. } = &mut subject.node_mut(found).kind {
                        attrs.insert(change.key.clone(), AttrValue::Tokens(common));
                    }
                }
                // Additions are target-only; nothing to keep in common.
                (ChangeKind::Add, _) | (ChangeKind::Change, None) => {}
            }
        }
        Ok(())
    }

    fn get_json(&self, second: &Tree) -> Value {
        let data = second.node(self.target);
        let mut rec = Map::new();
        rec.insert("cpid".to_string(), cpid_json(&data.cpid));
        match &data.kind {
            NodeKind::Element { name, .. } => {
                rec.insert("n".to_string(), json!(name));
                let mut attrs = Map::new();
                for change in &self.changes {
                    match (&change.kind, &change.value) {
                        (ChangeKind::Remove, _) => {
                            tracing::debug!(
                                key = %change.key,
                                cpid = %data.cpid,
                                "patch output removes an attribute"
                            );
                            attrs.insert(change.key.clone(), Value::Null);
                        }
                        (_, Some(value)) => {
                            attrs.insert(change.key.clone(), attr_value_json(value));
                        }
                        (_, None) => {}
                    }
                }
                rec.insert("attrs".to_string(), Value::Object(attrs));
            }
            NodeKind::Text { content } => {
                // Text comparison yields at most one change.
                debug_assert!(self.changes.len() <= 1);
                if let Some(change) = self.changes.first() {
                    match change.kind {
                        ChangeKind::Remove => {
                            rec.insert("c".to_string(), json!(""));
                        }
                        _ => {
                            rec.insert("c".to_string(), json!(content));
                        }
                    }
                }
            }
        }
        Value::Object(rec)
    }

    /// Check whether the subject node already sits where the target says it
    /// should. If not, earlier edits must have put its intended parent in
    /// place already - verify that, detach the node, reattach it under the
    /// intended parent, and report the move to the patch stream.
    fn shadow_apply(
        &self,
        first: &Tree,
        second: &Tree,
        subject: &mut Tree,
    ) -> Result<Option<Value>> {
        let found = subject.find_by_post_id(first.node(self.source).post_id)?;
        let target = second.node(self.target);
        if subject.node(found).cpid == target.cpid {
            return Ok(None);
        }

        let found_parent = subject.node(found).parent.ok_or_else(|| {
            Error::InvariantViolation("matched node has no parent in the subject tree".to_string())
        })?;
        let parent_cpid = subject.node(found_parent).cpid.clone();
        let parent_name = subject.node(found_parent).name().to_string();
        if !second.has_ancestor_matching(self.target, &parent_cpid, &parent_name) {
            return Err(Error::InvariantViolation(format!(
                "cannot resolve a move: subject node sits at {} but the target wants {}",
                subject.node(found).cpid,
                target.cpid
            )));
        }

        let old_cpid = subject.node(found).cpid.clone();
        subject.remove_subtree(found_parent, found)?;
        let target_parent = target.parent.ok_or_else(|| {
            Error::InvariantViolation("move target is the root of the second tree".to_string())
        })?;
        let target_parent_cpid = second.node(target_parent).cpid.clone();
        let expected_parent = subject.find_by_cpid(&target_parent_cpid)?;
        subject.append_child(expected_parent, found);

        let mut mv = Map::new();
        mv.insert("cpid".to_string(), cpid_json(&old_cpid));
        mv.insert("np".to_string(), cpid_json(&target_parent_cpid));
        mv.insert("j".to_string(), json!(target.cpid.last_child_index()));
        Ok(Some(Value::Object(mv)))
    }
}

/// Edit variant tag, for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Delete,
    Insert,
    Merge,
}

/// One tree edit. Ordered by the cpid it affects: Deletes by the source
/// cpid, Inserts and Merges by the target cpid.
#[derive(Debug, Clone)]
pub enum Edit {
    Delete(Delete),
    Insert(Insert),
    Merge(Merge),
}

impl Edit {
    pub fn kind(&self) -> EditKind {
        match self {
            Edit::Delete(_) => EditKind::Delete,
            Edit::Insert(_) => EditKind::Insert,
            Edit::Merge(_) => EditKind::Merge,
        }
    }

    pub fn cpid(&self) -> &NodeId {
        match self {
            Edit::Delete(d) => &d.cpid,
            Edit::Insert(i) => &i.cpid,
            Edit::Merge(m) => &m.cpid,
        }
    }

    /// Deletes and Inserts cost 1; a Merge costs 1 only when it carries
    /// changes.
    pub fn cost(&self) -> u32 {
        match self {
            Edit::Delete(_) | Edit::Insert(_) => 1,
            Edit::Merge(m) => u32::from(!m.changes.is_empty()),
        }
    }

    /// The first-tree node this edit consumes; Inserts have none.
    fn source(&self) -> Option<NodeRef> {
        match self {
            Edit::Delete(d) => Some(d.source),
            Edit::Merge(m) => Some(m.source),
            Edit::Insert(_) => None,
        }
    }

    /// Mutate the subject toward the common tree. Inserts are intentionally
    /// no-ops here: the common tree omits them.
    pub fn apply(&self, first: &Tree, second: &Tree, subject: &mut Tree) -> Result<()> {
        match self {
            Edit::Delete(d) => d.apply(first, subject),
            Edit::Insert(_) => Ok(()),
            Edit::Merge(m) => m.apply(first, second, subject),
        }
    }

    /// Simulate the browser-side patcher against the subject; Merges may
    /// report a move record for the patch stream.
    pub fn shadow_apply(
        &self,
        first: &Tree,
        second: &Tree,
        subject: &mut Tree,
    ) -> Result<Option<Value>> {
        match self {
            Edit::Delete(d) => d.apply(first, subject).map(|()| None),
            Edit::Insert(i) => i.shadow_apply(second, subject).map(|()| None),
            Edit::Merge(m) => m.shadow_apply(first, second, subject),
        }
    }

    /// The structured record this edit contributes to the JSON patch.
    pub fn get_json(&self, first: &Tree, second: &Tree) -> Result<Value> {
        match self {
            Edit::Delete(d) => Ok(d.get_json(first)),
            Edit::Insert(i) => i.get_json(second),
            Edit::Merge(m) => Ok(m.get_json(second)),
        }
    }
}

/// A totally-ordered collection of edits with a cached total cost.
#[derive(Debug, Clone, Default)]
pub struct EditSequence {
    edits: Vec<Edit>,
    total_cost: u32,
}

impl From<Edit> for EditSequence {
    fn from(edit: Edit) -> Self {
        let total_cost = edit.cost();
        EditSequence {
            edits: vec![edit],
            total_cost,
        }
    }
}

impl EditSequence {
    /// Sort the edits by affected cpid (stable, so mapping order breaks
    /// ties) and cache the summed cost.
    pub fn new(mut edits: Vec<Edit>) -> Self {
        edits.sort_by(|a, b| a.cpid().cmp(b.cpid()));
        let total_cost = edits.iter().map(Edit::cost).sum();
        EditSequence { edits, total_cost }
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn total_cost(&self) -> u32 {
        self.total_cost
    }

    /// Immutable-style combinator: a new sequence holding the left-subtree
    /// edits plus the recent edit(s), with the costs summed arithmetically.
    /// No cost optimization across runs of consecutive deletes/inserts is
    /// attempted.
    pub fn append(left: &EditSequence, recent: impl Into<EditSequence>) -> EditSequence {
        let recent = recent.into();
        let mut edits = left.edits.clone();
        let total_cost = left.total_cost + recent.total_cost;
        edits.extend(recent.edits);
        edits.sort_by(|a, b| a.cpid().cmp(b.cpid()));
        EditSequence { edits, total_cost }
    }

    /// Remove every edit of the given kind, adjusting the cached cost.
    /// Sort order is preserved.
    pub fn filter_out(&mut self, kind: EditKind) {
        let removed: u32 = self
            .edits
            .iter()
            .filter(|e| e.kind() == kind)
            .map(Edit::cost)
            .sum();
        self.total_cost -= removed;
        self.edits.retain(|e| e.kind() != kind);
    }

    /// Scripts sitting below the first actual difference cannot be trusted
    /// to run against the reduced DOM, so their edits become deletes. The
    /// leading run of zero-cost merges is left untouched; from the first
    /// nonzero-cost edit on, every script edit is rewritten (a Merge becomes
    /// a Delete, together with the following edit when it covers that
    /// script's text child).
    fn cut_scripts(&mut self, first: &Tree) {
        let mut cutting = false;
        let mut index = 0;
        while index < self.edits.len() {
            if !cutting {
                if self.edits[index].cost() == 0 {
                    index += 1;
                    continue;
                }
                cutting = true;
            }
            // Inserts are filtered out before this runs; every remaining
            // edit has a source node.
            let Some(source) = self.edits[index].source() else {
                index += 1;
                continue;
            };
            if first.node(source).name() == "script" {
                let next_is_script_content = self
                    .edits
                    .get(index + 1)
                    .and_then(Edit::source)
                    .filter(|&next| first.node(next).parent == Some(source));
                if matches!(self.edits[index], Edit::Merge(_)) {
                    self.edits[index] = Edit::Delete(Delete::new(first, source));
                    // The script's text content, if any, is the very next
                    // edit; it goes with its script.
                    if let Some(next_source) = next_is_script_content {
                        self.edits[index + 1] = Edit::Delete(Delete::new(first, next_source));
                    }
                } else if next_is_script_content.is_some()
                    && !matches!(self.edits[index + 1], Edit::Delete(_))
                {
                    tracing::warn!(
                        script = %self.edits[index].cpid(),
                        "edit following a deleted script is not itself a delete"
                    );
                    debug_assert!(false, "script content edit should be a delete");
                }
            }
            index += 1;
        }
    }

    /// Build the common tree from a deep copy of the source: drop all
    /// Inserts, rewrite script edits below the first difference, then apply
    /// the remaining edits in order.
    pub fn generate_common_tree(&mut self, first: &Tree, second: &Tree) -> Result<Tree> {
        self.filter_out(EditKind::Insert);
        self.cut_scripts(first);
        let mut common = first.deepcopy();
        for edit in &self.edits {
            edit.apply(first, second, &mut common)?;
        }
        Ok(common)
    }

    /// Build the minimized JSON patch. Every edit is shadow-applied to a
    /// deep copy of the source first: when a node is inserted but its
    /// children already exist in the source tree, the Merge edits covering
    /// those children must surface as move records so the patcher can drag
    /// them into position.
    pub fn generate_json_update(&self, first: &Tree, second: &Tree) -> Result<Value> {
        let mut output: Vec<Value> = Vec::new();
        let mut subject = first.deepcopy();
        for edit in &self.edits {
            if let Some(mv) = edit.shadow_apply(first, second, &mut subject)? {
                output.push(mv);
            }
            if edit.cost() > 0 {
                output.push(edit.get_json(first, second)?);
            }
        }

        let mut i = 0;
        // minimization shrinks the list, so re-check the length every round
        while i < output.len() {
            minimize_at(&mut output, i);
            i += 1;
        }

        Ok(json!({ "edits": output }))
    }
}

/// Whether `next` is a direct child record of `parent`: same (vestigial)
/// type tag, its cpid extends the parent's by exactly the parent's insert
/// index.
fn is_direct_child(parent: &Value, next: &Value) -> bool {
    if next.get("t") != parent.get("t") {
        return false;
    }
    let (Some(next_cpid), Some(parent_cpid)) = (
        next.get("cpid").and_then(Value::as_array),
        parent.get("cpid").and_then(Value::as_array),
    ) else {
        return false;
    };
    next_cpid.len() == parent_cpid.len() + 1
        && next_cpid[..parent_cpid.len()] == parent_cpid[..]
        && next_cpid.last() == parent.get("i")
}

/// Fold direct-child records into their parent's `c` list, recursively,
/// then collapse an element record whose only child is a text record into a
/// bare content string.
fn minimize_at(output: &mut Vec<Value>, index: usize) {
    while index + 1 < output.len() && is_direct_child(&output[index], &output[index + 1]) {
        minimize_at(output, index + 1);
        let mut child = output.remove(index + 1);
        if let Some(obj) = child.as_object_mut() {
            obj.remove("cpid");
            obj.remove("i");
        }
        if let Some(parent) = output[index].as_object_mut() {
            let children = parent
                .entry("c")
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Some(list) = children.as_array_mut() {
                list.push(child);
            }
        }
    }

    let Some(parent) = output[index].as_object_mut() else {
        return;
    };
    let is_element = parent
        .get("n")
        .and_then(Value::as_str)
        .is_some_and(|n| !n.is_empty());
    if !is_element {
        return;
    }
    let only_text_content = parent.get("c").and_then(Value::as_array).and_then(|c| {
        if c.len() == 1 && c[0].get("n").is_none() {
            c[0].get("c").cloned()
        } else {
            None
        }
    });
    if let Some(content) = only_text_content {
        parent.insert("c".to_string(), content);
    }
}

/// Translate the solver's post-order pair list into typed edits. `0` denotes
/// "absent": `(0, b)` inserts, `(a, 0)` deletes, `(a, b)` merges. The pairs
/// themselves are taken at face value; each one is a local decision.
pub fn edits_from_mapping(
    first: &Tree,
    second: &Tree,
    mapping: &[(usize, usize)],
) -> Result<EditSequence> {
    let mut edits = Vec::with_capacity(mapping.len());
    for &(a, b) in mapping {
        let edit = if a == 0 {
            Edit::Insert(Insert::new(second, second.find_by_post_id(b)?))
        } else if b == 0 {
            Edit::Delete(Delete::new(first, first.find_by_post_id(a)?))
        } else {
            Edit::Merge(Merge::new(
                first,
                first.find_by_post_id(a)?,
                second,
                second.find_by_post_id(b)?,
            )?)
        };
        edits.push(edit);
    }
    Ok(EditSequence::new(edits))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Attrs;
    use crate::parser::{StripMode, parse_html};

    fn parse(html: &str) -> Tree {
        parse_html(html, StripMode::None).unwrap()
    }

    /// Pair every node of two structurally identical trees.
    fn identity_mapping(tree: &Tree) -> Vec<(usize, usize)> {
        (1..=tree.node_count()).map(|i| (i, i)).collect()
    }

    // Post-order ids used below: the parser always synthesizes
    // <html><head></head><body>...</body></html>, so head is post id 1 and
    // the body content starts at 2.

    #[test]
    fn text_merge_changes() {
        let a = parse("<html><p>hi</p></html>");
        let b = parse("<html><p>bye</p></html>");
        let ta = a.find_by_post_id(2).unwrap();
        let tb = b.find_by_post_id(2).unwrap();
        assert_eq!(a.node(ta).name(), "text");

        let changes = merge_changes(&a, ta, &b, tb).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Change);
        assert_eq!(changes[0].key, "content");
        assert_eq!(changes[0].value, Some(AttrValue::from("bye")));

        let same = merge_changes(&a, ta, &a, ta).unwrap();
        assert!(same.is_empty());
    }

    #[test]
    fn element_merge_changes_add_remove_change() {
        let a = parse("<html><p id=\"x\" lang=\"en\">t</p></html>");
        let b = parse("<html><p lang=\"fr\" title=\"new\">t</p></html>");
        let pa = a.find_by_post_id(3).unwrap();
        let pb = b.find_by_post_id(3).unwrap();
        assert_eq!(a.node(pa).name(), "p");

        let changes = merge_changes(&a, pa, &b, pb).unwrap();
        assert_eq!(changes.len(), 3);
        assert!(changes.iter().any(|c| c.kind == ChangeKind::Remove && c.key == "id"));
        assert!(changes.iter().any(|c| {
            c.kind == ChangeKind::Change && c.key == "lang" && c.value == Some(AttrValue::from("fr"))
        }));
        assert!(changes.iter().any(|c| c.kind == ChangeKind::Add && c.key == "title"));
    }

    #[test]
    fn token_subset_is_not_a_change() {
        // target tokens are a subset of the source's: treated as unchanged
        let a = parse("<html><a class=\"x y z\">t</a></html>");
        let b = parse("<html><a class=\"z x\">t</a></html>");
        let na = a.find_by_post_id(3).unwrap();
        let nb = b.find_by_post_id(3).unwrap();
        let changes = merge_changes(&a, na, &b, nb).unwrap();
        assert!(changes.is_empty());

        // a genuinely new token is a change carrying the target value
        let c = parse("<html><a class=\"y w\">t</a></html>");
        let nc = c.find_by_post_id(3).unwrap();
        let changes = merge_changes(&a, na, &c, nc).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes[0].value,
            Some(AttrValue::Tokens(vec!["y".to_string(), "w".to_string()]))
        );
    }

    #[test]
    fn merge_of_different_names_is_an_error() {
        let a = parse("<html><p>t</p></html>");
        let b = parse("<html><div>t</div></html>");
        let pa = a.find_by_post_id(3).unwrap();
        let db = b.find_by_post_id(3).unwrap();
        assert!(Merge::new(&a, pa, &b, db).is_err());
    }

    #[test]
    fn merge_with_no_changes_costs_nothing_and_does_nothing() {
        let a = parse("<html><p>t</p></html>");
        let b = parse("<html><p>t</p></html>");
        let edits = edits_from_mapping(&a, &b, &identity_mapping(&a)).unwrap();
        assert_eq!(edits.total_cost(), 0);
        for edit in edits.edits() {
            let Edit::Merge(m) = edit else {
                panic!("identity mapping should produce only merges");
            };
            assert!(m.changes().is_empty());
        }

        let mut subject = a.deepcopy();
        for edit in edits.edits() {
            edit.apply(&a, &b, &mut subject).unwrap();
        }
        assert!(subject.structurally_eq(&a));
    }

    #[test]
    fn edits_sort_by_cpid() {
        let a = parse("<html><head></head><body><p>hi</p></body></html>");
        let b = parse("<html><head></head><body><p>hi</p></body></html>");
        let edits = edits_from_mapping(&a, &b, &identity_mapping(&a)).unwrap();
        let cpids: Vec<_> = edits.edits().iter().map(|e| e.cpid().clone()).collect();
        let mut sorted = cpids.clone();
        sorted.sort();
        assert_eq!(cpids, sorted);
        // root first, then depth-first
        assert_eq!(cpids[0].path(), &[0]);
        assert_eq!(cpids[1].path(), &[0, 0]);
    }

    #[test]
    fn append_combines_costs() {
        let a = parse("<html><p>x</p></html>");
        let b = parse("<html><p>y</p></html>");
        let merged = edits_from_mapping(&a, &b, &identity_mapping(&a)).unwrap();
        let extra = Edit::Delete(Delete::new(&a, a.find_by_post_id(1).unwrap()));
        let combined = EditSequence::append(&merged, extra);
        assert_eq!(combined.total_cost(), merged.total_cost() + 1);
        assert_eq!(combined.edits().len(), merged.edits().len() + 1);
    }

    #[test]
    fn filter_out_adjusts_cost() {
        let a = parse("<html><p>x</p></html>");
        let b = parse("<html><p>x</p><p>y</p></html>");
        // first: head=1 x=2 p=3 body=4 html=5
        // second: head=1 x=2 p=3 y=4 p=5 body=6 html=7
        let mapping = vec![(5, 7), (4, 6), (1, 1), (3, 3), (2, 2), (0, 5), (0, 4)];
        let mut edits = edits_from_mapping(&a, &b, &mapping).unwrap();
        assert_eq!(edits.total_cost(), 2);
        edits.filter_out(EditKind::Insert);
        assert_eq!(edits.total_cost(), 0);
        assert_eq!(edits.edits().len(), 5);
    }

    #[test]
    fn minimization_folds_nested_inserts() {
        let mut output = vec![
            json!({"cpid": [0, 1], "i": 1, "n": "p", "attrs": {}}),
            json!({"cpid": [0, 1, 1], "i": 0, "c": "bye"}),
        ];
        let mut i = 0;
        while i < output.len() {
            minimize_at(&mut output, i);
            i += 1;
        }
        assert_eq!(
            output,
            vec![json!({"cpid": [0, 1], "i": 1, "n": "p", "attrs": {}, "c": "bye"})]
        );
    }

    #[test]
    fn minimization_leaves_unrelated_records_alone() {
        let mut output = vec![
            json!({"type": "Delete", "cpid": [0, 0, 1], "tag_name": "img"}),
            json!({"cpid": [0, 1], "n": "p", "attrs": {"class": ["y"]}}),
        ];
        let mut i = 0;
        while i < output.len() {
            minimize_at(&mut output, i);
            i += 1;
        }
        assert_eq!(output.len(), 2);
    }

    #[test]
    fn deep_nested_insert_minimizes_to_one_record() {
        let mut output = vec![
            json!({"cpid": [0, 1], "i": 2, "n": "div", "attrs": {}}),
            json!({"cpid": [0, 1, 2], "i": 0, "n": "span", "attrs": {}}),
            json!({"cpid": [0, 1, 2, 0], "i": 0, "c": "deep"}),
        ];
        let mut i = 0;
        while i < output.len() {
            minimize_at(&mut output, i);
            i += 1;
        }
        assert_eq!(
            output,
            vec![json!({
                "cpid": [0, 1], "i": 2, "n": "div", "attrs": {},
                "c": [{"n": "span", "attrs": {}, "c": "deep"}]
            })]
        );
    }

    #[test]
    fn data_bracket_values_keep_a_blank_attribute() {
        let a = parse("<html><p data-model=\"[1,2]\">t</p></html>");
        let b = parse("<html><p data-model=\"[3]\">t</p></html>");
        let mapping = identity_mapping(&a);
        let mut edits = edits_from_mapping(&a, &b, &mapping).unwrap();
        let common = edits.generate_common_tree(&a, &b).unwrap();

        let p = common.find_by_post_id(3).unwrap();
        assert_eq!(
            common.node(p).attrs().unwrap().get("data-model"),
            Some(&AttrValue::from(""))
        );
    }

    #[test]
    fn changed_plain_attribute_is_dropped_from_common() {
        let a = parse("<html><p lang=\"en\">t</p></html>");
        let b = parse("<html><p lang=\"fr\">t</p></html>");
        let mut edits = edits_from_mapping(&a, &b, &identity_mapping(&a)).unwrap();
        let common = edits.generate_common_tree(&a, &b).unwrap();
        let p = common.find_by_post_id(3).unwrap();
        assert!(common.node(p).attrs().unwrap().get("lang").is_none());
    }

    #[test]
    fn empty_attrs_map_builds_empty_object() {
        assert_eq!(attrs_json(&Attrs::new()), json!({}));
    }
}
