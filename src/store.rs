//! In-memory document holder with bounded undo/redo history.
//!
//! The store is the only stateful piece of the crate: parsing, validation,
//! and suggestions are pure functions over a snapshot. Edits never mutate
//! the current document; each produces a fresh snapshot, so readers can
//! never observe torn state.

use std::collections::VecDeque;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{ComposeDocument, Resource, ResourceKind, Service};

/// Snapshots retained for undo by default.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One discrete, named document edit.
pub enum Edit {
    UpsertService { name: String, service: Service },
    DeleteService { name: String },
    RenameService { from: String, to: String },
    UpsertResource { kind: ResourceKind, name: String, resource: Resource },
    DeleteResource { kind: ResourceKind, name: String },
    RenameResource { kind: ResourceKind, from: String, to: String },
    SetProjectName { name: Option<String> },
    Replace { document: ComposeDocument },
}

/// Applies one edit to a snapshot, returning the new document. Pure; the
/// input is never mutated. Renames that would collide with an existing
/// entity, and deletes/renames of unknown entities, are no-ops.
pub fn apply_edit(document: &ComposeDocument, edit: &Edit) -> ComposeDocument {
    let mut next = document.clone();
    match edit {
        Edit::UpsertService { name, service } => {
            next.services.insert(name.clone(), service.clone());
        }
        Edit::DeleteService { name } => {
            next.services.shift_remove(name);
        }
        Edit::RenameService { from, to } => {
            if rename_key(&mut next.services, from, to) {
                for service in next.services.values_mut() {
                    rename_key(&mut service.depends_on, from, to);
                }
            }
        }
        Edit::UpsertResource { kind, name, resource } => {
            next.resources_mut(*kind).insert(name.clone(), resource.clone());
        }
        Edit::DeleteResource { kind, name } => {
            next.resources_mut(*kind).shift_remove(name);
        }
        Edit::RenameResource { kind, from, to } => {
            if rename_key(next.resources_mut(*kind), from, to) {
                rewrite_resource_references(&mut next, *kind, from, to);
            }
        }
        Edit::SetProjectName { name } => {
            next.project_name = name.clone();
        }
        Edit::Replace { document } => {
            next = document.clone();
        }
    }
    next
}

/// Renames a key in place, preserving entry order. Returns false when the
/// source is missing or the target already exists.
fn rename_key<V>(map: &mut IndexMap<String, V>, from: &str, to: &str) -> bool {
    if from == to || !map.contains_key(from) || map.contains_key(to) {
        return false;
    }
    let entries = std::mem::take(map);
    for (key, value) in entries {
        let key = if key == from { to.to_string() } else { key };
        map.insert(key, value);
    }
    true
}

fn rewrite_resource_references(
    document: &mut ComposeDocument,
    kind: ResourceKind,
    from: &str,
    to: &str,
) {
    match kind {
        ResourceKind::Network => {
            for service in document.services.values_mut() {
                for attachment in &mut service.networks {
                    if attachment.name == from {
                        attachment.name = to.to_string();
                    }
                }
            }
        }
        ResourceKind::Volume => {
            for service in document.services.values_mut() {
                for mount in &mut service.volumes {
                    if !mount.source_is_path() && mount.source.as_deref() == Some(from) {
                        mount.source = Some(to.to_string());
                    }
                }
            }
        }
        // Services reference secrets/configs only through pass-through
        // keys, which stay as the user wrote them.
        ResourceKind::Secret | ResourceKind::Config => {}
    }
}

#[derive(Debug)]
/// History-tracked holder of the current document.
pub struct DocumentStore {
    current: ComposeDocument,
    undo: VecDeque<ComposeDocument>,
    redo: Vec<ComposeDocument>,
    limit: usize,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    /// Empty store with the default history bound.
    pub fn new() -> Self {
        Self::with_document(ComposeDocument::new(), DEFAULT_HISTORY_LIMIT)
    }

    /// Store seeded with a document, retaining up to `limit` undo snapshots.
    pub fn with_document(document: ComposeDocument, limit: usize) -> Self {
        Self {
            current: document,
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn current(&self) -> &ComposeDocument {
        &self.current
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Applies an edit, pushing the previous snapshot onto the undo stack
    /// and clearing any redo tail.
    pub fn apply(&mut self, edit: &Edit) -> &ComposeDocument {
        let next = apply_edit(&self.current, edit);
        self.undo.push_back(std::mem::replace(&mut self.current, next));
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
        self.redo.clear();
        debug!(history = self.undo.len(), "applied edit");
        &self.current
    }

    /// Steps back one snapshot, if any.
    pub fn undo(&mut self) -> Option<&ComposeDocument> {
        let previous = self.undo.pop_back()?;
        self.redo.push(std::mem::replace(&mut self.current, previous));
        Some(&self.current)
    }

    /// Re-applies the most recently undone snapshot, if any.
    pub fn redo(&mut self) -> Option<&ComposeDocument> {
        let next = self.redo.pop()?;
        self.undo.push_back(std::mem::replace(&mut self.current, next));
        Some(&self.current)
    }

    /// Discards the document and all history.
    pub fn reset(&mut self) {
        self.current = ComposeDocument::new();
        self.undo.clear();
        self.redo.clear();
    }
}
