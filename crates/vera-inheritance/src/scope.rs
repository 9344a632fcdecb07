//! # Scope Hierarchy
//!
//! Scopes form a tree: enterprise → region → country → brand. Levels may
//! be skipped (a brand directly under its enterprise is fine) but never
//! reversed. [`ScopeTree`] validates a flat scope list once and answers the
//! two questions the computer and its callers ask: "what is the ancestor
//! chain of this scope?" and "which scopes must be recomputed when this one
//! changes?".

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use vera_core::{ScopeId, ValidationError};

/// Organizational level of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeType {
    /// Top of the hierarchy.
    Enterprise,
    /// Geographic region.
    Region,
    /// Country within a region.
    Country,
    /// Brand, the most specific level.
    Brand,
}

impl ScopeType {
    /// Depth rank: enterprise 0 through brand 3.
    pub fn depth(&self) -> u8 {
        match self {
            Self::Enterprise => 0,
            Self::Region => 1,
            Self::Country => 2,
            Self::Brand => 3,
        }
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enterprise => "enterprise",
            Self::Region => "region",
            Self::Country => "country",
            Self::Brand => "brand",
        }
    }
}

impl std::fmt::Display for ScopeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the organizational tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Scope identifier.
    pub id: ScopeId,
    /// Organizational level.
    pub scope_type: ScopeType,
    /// Parent scope; `None` for a root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ScopeId>,
    /// Human-readable location, e.g. `acme/emea/de`.
    #[serde(default)]
    pub path: String,
}

/// Check that `child` may sit directly below `parent`.
pub(crate) fn check_depth(parent: &Scope, child: &Scope) -> Result<(), ValidationError> {
    if child.scope_type.depth() <= parent.scope_type.depth() {
        return Err(ValidationError::ScopeDepthOrder {
            scope_id: child.id.to_string(),
            parent_type: parent.scope_type.to_string(),
            child_type: child.scope_type.to_string(),
        });
    }
    Ok(())
}

/// A validated scope forest.
#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    scopes: BTreeMap<ScopeId, Scope>,
    children: BTreeMap<ScopeId, BTreeSet<ScopeId>>,
}

impl ScopeTree {
    /// Build a tree from a flat scope list.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::DuplicateScope`] if an id repeats.
    /// - [`ValidationError::UnknownScope`] for a dangling parent reference.
    /// - [`ValidationError::ScopeCycle`] if parent links loop.
    /// - [`ValidationError::ScopeDepthOrder`] if a child is not strictly
    ///   deeper than its parent.
    pub fn new(scopes: impl IntoIterator<Item = Scope>) -> Result<Self, ValidationError> {
        let mut map = BTreeMap::new();
        for scope in scopes {
            if map.contains_key(&scope.id) {
                return Err(ValidationError::DuplicateScope(scope.id.to_string()));
            }
            map.insert(scope.id.clone(), scope);
        }

        let mut children: BTreeMap<ScopeId, BTreeSet<ScopeId>> = BTreeMap::new();
        for scope in map.values() {
            if let Some(parent_id) = &scope.parent_id {
                if !map.contains_key(parent_id) {
                    return Err(ValidationError::UnknownScope(parent_id.to_string()));
                }
                children
                    .entry(parent_id.clone())
                    .or_default()
                    .insert(scope.id.clone());
            }
        }

        // A walk longer than the scope count must revisit a node.
        for scope in map.values() {
            let mut current = scope;
            let mut steps = 0usize;
            while let Some(parent_id) = &current.parent_id {
                steps += 1;
                if parent_id == &scope.id || steps > map.len() {
                    return Err(ValidationError::ScopeCycle(scope.id.to_string()));
                }
                match map.get(parent_id) {
                    Some(parent) => current = parent,
                    None => return Err(ValidationError::UnknownScope(parent_id.to_string())),
                }
            }
        }

        for scope in map.values() {
            if let Some(parent) = scope.parent_id.as_ref().and_then(|p| map.get(p)) {
                check_depth(parent, scope)?;
            }
        }

        Ok(Self {
            scopes: map,
            children,
        })
    }

    /// Look up a scope.
    pub fn get(&self, id: &ScopeId) -> Option<&Scope> {
        self.scopes.get(id)
    }

    /// Number of scopes.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// True if the tree holds no scopes.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Root scopes, sorted by id.
    pub fn roots(&self) -> Vec<&Scope> {
        self.scopes
            .values()
            .filter(|s| s.parent_id.is_none())
            .collect()
    }

    /// Direct children of a scope, sorted by id.
    pub fn children(&self, id: &ScopeId) -> Vec<&Scope> {
        self.children
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|c| self.scopes.get(c))
            .collect()
    }

    /// The chain from the root down to `id`, inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownScope`] if `id` is not in the tree.
    pub fn ancestor_chain(&self, id: &ScopeId) -> Result<Vec<Scope>, ValidationError> {
        let mut chain = Vec::new();
        let mut next = Some(id);
        while let Some(current) = next {
            let scope = self
                .scopes
                .get(current)
                .ok_or_else(|| ValidationError::UnknownScope(current.to_string()))?;
            chain.push(scope.clone());
            next = scope.parent_id.as_ref();
        }
        chain.reverse();
        Ok(chain)
    }

    /// `changed` followed by every descendant, breadth-first with each
    /// level's siblings in id order.
    ///
    /// Recomputing effective policies in this order guarantees every
    /// parent is current before its children.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownScope`] if `changed` is not in the
    /// tree.
    pub fn invalidation_order(&self, changed: &ScopeId) -> Result<Vec<ScopeId>, ValidationError> {
        if !self.scopes.contains_key(changed) {
            return Err(ValidationError::UnknownScope(changed.to_string()));
        }
        let mut order = Vec::new();
        let mut queue = VecDeque::from([changed.clone()]);
        while let Some(id) = queue.pop_front() {
            if let Some(kids) = self.children.get(&id) {
                queue.extend(kids.iter().cloned());
            }
            order.push(id);
        }
        Ok(order)
    }
}
