//! Recursive traversal over a model's fields.
//!
//! Embedded (`serde(flatten)`) fields are expanded in place, the `Meta` marker
//! is skipped and non-embedded nested models are left for the caller to descend
//! into. A model already on the ancestor path is skipped without error, so
//! cyclic type graphs terminate: the repeated branch is simply invisible.

use std::any::TypeId;
use std::collections::HashSet;

use crate::descriptor::{FieldDescriptor, FieldRole, TypeDescriptor};
use crate::tags::{self, ResolvedField};

#[derive(Debug, Clone)]
pub struct WalkedField {
    pub field: &'static FieldDescriptor,
    pub resolved: ResolvedField,
}

impl WalkedField {
    fn new(field: &'static FieldDescriptor) -> Self {
        WalkedField {
            field,
            resolved: tags::resolve(field),
        }
    }

    pub fn wire_name(&self) -> &str {
        &self.resolved.wire_name
    }

    pub fn json_name(&self) -> &'static str {
        tags::json_name(self.field)
    }
}

/// Ancestor set keyed by type identity.
#[derive(Debug, Default)]
pub struct Visited {
    types: HashSet<TypeId>,
}

impl Visited {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a traversal rooted at `root`.
    pub fn rooted(root: &TypeDescriptor) -> Self {
        let mut visited = Self::new();
        visited.enter(root);
        visited
    }

    /// Returns `false` if `desc` is already on the path.
    pub fn enter(&mut self, desc: &TypeDescriptor) -> bool {
        self.types.insert(desc.type_id)
    }

    pub fn leave(&mut self, desc: &TypeDescriptor) {
        self.types.remove(&desc.type_id);
    }

    pub fn contains(&self, desc: &TypeDescriptor) -> bool {
        self.types.contains(&desc.type_id)
    }
}

/// Fields of `desc` with embedded models promoted into the parent namespace.
pub fn walk(desc: &'static TypeDescriptor, visited: &mut Visited) -> Vec<WalkedField> {
    let mut out = Vec::new();
    expand(desc, visited, &mut out);
    out
}

fn expand(desc: &'static TypeDescriptor, visited: &mut Visited, out: &mut Vec<WalkedField>) {
    for field in desc.fields() {
        match field.role {
            FieldRole::Meta => continue,
            FieldRole::Embedded => {
                if let Some(inner) = field.shape.struct_model() {
                    if visited.enter(inner) {
                        expand(inner, visited, out);
                        visited.leave(inner);
                    }
                    continue;
                }
                out.push(WalkedField::new(field));
            }
            FieldRole::Plain => out.push(WalkedField::new(field)),
        }
    }
}

/// Direct fields only: embedded and marker fields are skipped, not expanded.
pub fn fields(desc: &'static TypeDescriptor) -> impl Iterator<Item = WalkedField> {
    desc.fields()
        .iter()
        .filter(|field| field.role == FieldRole::Plain)
        .map(WalkedField::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ApiModel, Meta};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
    struct Paging {
        #[api(p = "page")]
        page_no: u32,
        size: u32,
    }

    #[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
    struct Search {
        #[serde(skip)]
        #[api(path = "/search", method = "GET")]
        meta: Meta,
        #[serde(flatten)]
        paging: Paging,
        keyword: String,
        next: Option<Box<Search>>,
    }

    #[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
    struct Loop {
        #[serde(flatten)]
        inner: Box<LoopInner>,
        name: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize, ApiModel)]
    struct LoopInner {
        depth: u8,
        #[serde(flatten)]
        back: Option<Box<Loop>>,
    }

    fn names(fields: &[WalkedField]) -> Vec<&str> {
        fields.iter().map(WalkedField::wire_name).collect()
    }

    #[test]
    fn embedded_fields_are_promoted_and_marker_skipped() {
        let desc = Search::descriptor();
        let walked = walk(desc, &mut Visited::rooted(desc));
        assert_eq!(names(&walked), ["page", "size", "keyword", "next"]);
    }

    #[test]
    fn direct_fields_skip_embedded() {
        let direct: Vec<_> = fields(Search::descriptor()).collect();
        assert_eq!(names(&direct), ["keyword", "next"]);
    }

    #[test]
    fn embedding_cycle_is_cut() {
        let desc = Loop::descriptor();
        let walked = walk(desc, &mut Visited::rooted(desc));
        assert_eq!(names(&walked), ["depth", "name"]);
    }

    #[test]
    fn visited_tracks_ancestors_only() {
        let desc = Paging::descriptor();
        let mut visited = Visited::new();
        assert!(visited.enter(desc));
        assert!(!visited.enter(desc));
        visited.leave(desc);
        assert!(!visited.contains(desc));
    }
}
