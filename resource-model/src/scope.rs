//! Construct scope tree.
//!
//! Every construct declared in a stack occupies a node in a tree rooted at the
//! stack. The tree gives each construct a stable path, which is what generated
//! physical names and logical ids are derived from.
//!
//! ```mermaid
//! flowchart TD
//!     S([Stack]) -- Contains --> A([MyApp])
//!     A -- Contains --> E([Prod])
//!     E -- Contains --> R([Resource])
//!     E -- Contains --> R0([Role0])
//! ```

use crate::config::DeploymentEnv;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use thiserror::Error;

/// Id dropped from every path when deriving names
pub const HIDDEN_ID: &str = "Default";
/// Id dropped from the human-readable part of generated names
pub const HIDDEN_FROM_HUMAN_ID: &str = "Resource";
/// Length of the hash suffix on generated names
pub const HASH_LEN: usize = 8;
/// Upper bound on logical ids accepted by the provisioning engine
pub const MAX_LOGICAL_ID_LENGTH: usize = 255;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("There is already a construct with id '{id}' in {parent}")]
    DuplicateId { parent: ConstructPath, id: String },

    #[error("Unknown construct path: {path}")]
    UnknownPath { path: ConstructPath },

    #[error("Invalid construct id '{id}': {reason}")]
    InvalidId { id: String, reason: String },

    #[error("Unable to calculate a unique name for an empty set of components")]
    EmptyComponents,
}

pub type ScopeResult<T> = Result<T, ScopeError>;

/// Ordered construct ids from the stack root down to a construct
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConstructPath(Vec<String>);

impl ConstructPath {
    pub fn components(&self) -> &[String] {
        &self.0
    }

    /// Id of the construct this path points at
    pub fn id(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    pub fn child(&self, id: impl Into<String>) -> Self {
        let mut components = self.0.clone();
        components.push(id.into());
        Self(components)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.len() <= 1 {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }
}

impl std::fmt::Display for ConstructPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

/// Options for [`ScopeContext::unique_resource_name`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueNameOptions {
    pub max_length: usize,
    pub separator: String,
    pub allowed_special_characters: String,
}

impl Default for UniqueNameOptions {
    fn default() -> Self {
        Self {
            max_length: 256,
            separator: String::new(),
            allowed_special_characters: String::new(),
        }
    }
}

impl UniqueNameOptions {
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_allowed_special_characters(mut self, allowed: impl Into<String>) -> Self {
        self.allowed_special_characters = allowed.into();
        self
    }
}

/// Explicit deployment scope: the stack's environment plus its construct tree.
///
/// Sibling ids are unique, so two constructs never share a path and therefore
/// never share a generated name. The tree is append-only.
pub struct ScopeContext {
    env: DeploymentEnv,
    tree: DiGraph<String, ()>,
    index: HashMap<ConstructPath, NodeIndex>,
    root: ConstructPath,
}

impl ScopeContext {
    /// Create a scope rooted at a stack with the given id
    pub fn new(stack_id: impl Into<String>, env: DeploymentEnv) -> Self {
        let stack_id = stack_id.into();
        let mut tree = DiGraph::new();
        let root_idx = tree.add_node(stack_id.clone());
        let root = ConstructPath(vec![stack_id]);

        let mut index = HashMap::new();
        index.insert(root.clone(), root_idx);

        Self {
            env,
            tree,
            index,
            root,
        }
    }

    pub fn env(&self) -> &DeploymentEnv {
        &self.env
    }

    pub fn root(&self) -> &ConstructPath {
        &self.root
    }

    pub fn contains(&self, path: &ConstructPath) -> bool {
        self.index.contains_key(path)
    }

    /// Number of constructs in the tree, the stack included
    pub fn construct_count(&self) -> usize {
        self.tree.node_count()
    }

    /// Path a child of `parent` with `id` would get, without registering it.
    ///
    /// Fails exactly when [`add_child`](Self::add_child) would.
    pub fn check_child(&self, parent: &ConstructPath, id: &str) -> ScopeResult<ConstructPath> {
        if id.is_empty() {
            return Err(ScopeError::InvalidId {
                id: id.to_string(),
                reason: "construct ids cannot be empty".to_string(),
            });
        }
        if id.contains('/') {
            return Err(ScopeError::InvalidId {
                id: id.to_string(),
                reason: "construct ids cannot contain '/'".to_string(),
            });
        }
        if !self.index.contains_key(parent) {
            return Err(ScopeError::UnknownPath {
                path: parent.clone(),
            });
        }

        let path = parent.child(id);
        if self.index.contains_key(&path) {
            return Err(ScopeError::DuplicateId {
                parent: parent.clone(),
                id: id.to_string(),
            });
        }
        Ok(path)
    }

    /// Register a child construct under `parent`
    pub fn add_child(&mut self, parent: &ConstructPath, id: &str) -> ScopeResult<ConstructPath> {
        let path = self.check_child(parent, id)?;
        let parent_idx = *self
            .index
            .get(parent)
            .ok_or_else(|| ScopeError::UnknownPath {
                path: parent.clone(),
            })?;

        let node_idx = self.tree.add_node(id.to_string());
        self.tree.add_edge(parent_idx, node_idx, ());
        self.index.insert(path.clone(), node_idx);
        Ok(path)
    }

    /// Child ids of a construct, in the order they were added
    pub fn children(&self, path: &ConstructPath) -> ScopeResult<Vec<String>> {
        let idx = self
            .index
            .get(path)
            .ok_or_else(|| ScopeError::UnknownPath { path: path.clone() })?;
        let mut children: Vec<NodeIndex> = self
            .tree
            .neighbors_directed(*idx, Direction::Outgoing)
            .collect();
        children.sort();
        Ok(children.into_iter().map(|n| self.tree[n].clone()).collect())
    }

    /// Generate a physical name that is unique within this stack.
    ///
    /// The name is a function of the construct path only, so re-synthesizing
    /// an unchanged tree yields the same name.
    pub fn unique_resource_name(
        &self,
        path: &ConstructPath,
        options: &UniqueNameOptions,
    ) -> ScopeResult<String> {
        if !self.contains(path) {
            return Err(ScopeError::UnknownPath { path: path.clone() });
        }
        make_unique_resource_name(path.components(), options)
    }

    /// Logical id for the resource at `path`
    pub fn logical_id(&self, path: &ConstructPath) -> ScopeResult<String> {
        if !self.contains(path) {
            return Err(ScopeError::UnknownPath { path: path.clone() });
        }
        make_logical_id(path)
    }
}

impl std::fmt::Debug for ScopeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeContext")
            .field("env", &self.env)
            .field("root", &self.root)
            .field("constructs", &self.tree.node_count())
            .finish_non_exhaustive()
    }
}

/// Logical id for a path, whether or not it is registered yet
pub fn make_logical_id(path: &ConstructPath) -> ScopeResult<String> {
    let options = UniqueNameOptions::default().with_max_length(MAX_LOGICAL_ID_LENGTH);
    make_unique_resource_name(path.components(), &options)
}

/// Name derived from path components, bounded to `options.max_length`.
pub fn make_unique_resource_name(
    components: &[String],
    options: &UniqueNameOptions,
) -> ScopeResult<String> {
    let components: Vec<&str> = components
        .iter()
        .map(String::as_str)
        .filter(|c| *c != HIDDEN_ID)
        .collect();

    if components.is_empty() {
        return Err(ScopeError::EmptyComponents);
    }

    // A lone top-level id is used as-is when it already fits.
    if components.len() == 1 {
        let name = remove_disallowed(components[0], &options.allowed_special_characters);
        if name.len() <= options.max_length {
            return Ok(name);
        }
    }

    let hash = path_hash(&components);
    let mut human = remove_dupes(&components)
        .into_iter()
        .filter(|c| *c != HIDDEN_FROM_HUMAN_ID)
        .map(|c| remove_disallowed(c, &options.allowed_special_characters))
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(&options.separator);
    human.push_str(&options.separator);

    let max_human_length = options.max_length.saturating_sub(HASH_LEN);
    if human.len() > max_human_length {
        human = split_in_middle(&human, max_human_length);
    }
    Ok(format!("{}{}", human, hash))
}

/// Uppercase hex prefix of the SHA-256 of the `/`-joined path
fn path_hash(components: &[&str]) -> String {
    let digest = Sha256::digest(components.join("/").as_bytes());
    digest
        .iter()
        .take(HASH_LEN / 2)
        .map(|b| format!("{:02X}", b))
        .collect()
}

fn remove_disallowed(component: &str, allowed: &str) -> String {
    component
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || allowed.contains(*c))
        .collect()
}

/// Collapse consecutive duplicate components (`Foo/Foo/Bar` -> `Foo/Bar`)
fn remove_dupes<'a>(components: &[&'a str]) -> Vec<&'a str> {
    let mut result: Vec<&str> = Vec::with_capacity(components.len());
    for &component in components {
        if result.last() != Some(&component) {
            result.push(component);
        }
    }
    result
}

/// Keep the head and the tail of `value`, dropping the middle
fn split_in_middle(value: &str, max_length: usize) -> String {
    // Names are ASCII after `remove_disallowed`, except for allowed specials.
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= max_length {
        return value.to_string();
    }
    let half = max_length / 2;
    let head: String = chars[..half].iter().collect();
    let tail: String = chars[chars.len() - half..].iter().collect();
    format!("{}{}", head, tail)
}
