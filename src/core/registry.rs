// src/core/registry.rs

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

use crate::models::{CommandDescriptor, Operation};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("The command at path '{path}' cannot be extended")]
    InvalidPath { path: String },
    #[error("Name '{name}' collides with an existing entry in group '{group}'")]
    NameCollision { name: String, group: String },
    #[error(
        "Group '{group}' already has a solo command ('{existing}'); '{name}' cannot also be solo"
    )]
    DuplicateSolo {
        name: String,
        existing: String,
        group: String,
    },
    #[error("Default command '{name}' does not exist in group '{group}'")]
    UnknownDefault { name: String, group: String },
    #[error("Descriptor '{name}' declares no operations or subcommands")]
    EmptyDescriptor { name: String },
}

/// A node of the command tree: a navigable group or an invokable leaf.
#[derive(Debug)]
pub enum CommandNode {
    Group(Group),
    Leaf(Operation),
}

impl CommandNode {
    pub fn name(&self) -> &str {
        match self {
            Self::Group(group) => &group.name,
            Self::Leaf(leaf) => &leaf.name,
        }
    }

    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Group(group) => group.description.as_deref(),
            Self::Leaf(leaf) => leaf.description.as_deref(),
        }
    }

    pub fn synonyms(&self) -> &[String] {
        match self {
            Self::Group(group) => &group.synonyms,
            Self::Leaf(leaf) => &leaf.synonyms,
        }
    }

    pub fn is_hidden(&self) -> bool {
        match self {
            Self::Group(group) => group.hidden,
            Self::Leaf(leaf) => leaf.hidden,
        }
    }

    pub fn is_solo(&self) -> bool {
        match self {
            Self::Group(_) => false,
            Self::Leaf(leaf) => leaf.solo,
        }
    }
}

/// A command group: named children navigable by further argument tokens.
/// Built once at startup, immutable during dispatch.
#[derive(Debug, Default)]
pub struct Group {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) synonyms: Vec<String>,
    pub(crate) hidden: bool,
    pub(crate) children: HashMap<String, CommandNode>,
    pub(crate) synonym_map: HashMap<String, String>,
    pub(crate) default_child: Option<String>,
}

impl Group {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn default_child(&self) -> Option<&str> {
        self.default_child.as_deref()
    }

    /// Looks up a child by name, then by synonym. A synonym resolves to the
    /// identical node as its primary name.
    pub fn resolve(&self, token: &str) -> Option<&CommandNode> {
        self.children.get(token).or_else(|| {
            self.synonym_map
                .get(token)
                .and_then(|name| self.children.get(name))
        })
    }

    /// The lexicographically sorted names of immediate, non-hidden children.
    pub fn list_visible(&self) -> Vec<String> {
        self.children
            .iter()
            .filter(|(_, node)| !node.is_hidden())
            .map(|(name, _)| name.clone())
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect()
    }

    fn solo_child(&self) -> Option<&str> {
        self.children
            .values()
            .find(|node| node.is_solo())
            .map(CommandNode::name)
    }

    fn check_key_free(&self, key: &str) -> Result<(), RegistryError> {
        if self.children.contains_key(key) || self.synonym_map.contains_key(key) {
            return Err(RegistryError::NameCollision {
                name: key.to_string(),
                group: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Inserts a node, enforcing the group invariants: no name or synonym
    /// collisions, and at most one solo leaf.
    pub(crate) fn insert(&mut self, node: CommandNode) -> Result<(), RegistryError> {
        self.check_key_free(node.name())?;
        for synonym in node.synonyms() {
            self.check_key_free(synonym)?;
        }
        if node.is_solo() {
            if let Some(existing) = self.solo_child() {
                return Err(RegistryError::DuplicateSolo {
                    name: node.name().to_string(),
                    existing: existing.to_string(),
                    group: self.name.clone(),
                });
            }
        }
        let name = node.name().to_string();
        for synonym in node.synonyms() {
            self.synonym_map.insert(synonym.clone(), name.clone());
        }
        log::debug!("Registered '{}' in group '{}'", name, self.name);
        self.children.insert(name, node);
        Ok(())
    }
}

/// The tree of named command groups and leaf operations, rooted at the tool
/// name. Registration happens here; dispatch reads it immutably.
#[derive(Debug)]
pub struct CommandTree {
    pub(crate) root: Group,
}

impl CommandTree {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            root: Group::new(name),
        }
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    /// Attaches a descriptor's nodes at the root.
    pub fn register(&mut self, descriptor: CommandDescriptor) -> Result<(), RegistryError> {
        Self::attach(&mut self.root, descriptor)
    }

    /// Attaches a descriptor at an explicit path, walking or creating
    /// intermediate groups along the way. A per-segment description is
    /// applied only where the segment does not already have one. The
    /// descriptor's operations merge directly into the located group: the
    /// path names the namespace, not the descriptor.
    pub fn register_at(
        &mut self,
        path: &[&str],
        descriptions: &[&str],
        descriptor: CommandDescriptor,
    ) -> Result<(), RegistryError> {
        let group = Self::locate_path(&mut self.root, path, descriptions)?;
        Self::merge_into(group, descriptor)
    }

    fn locate_path<'a>(
        root: &'a mut Group,
        path: &[&str],
        descriptions: &[&str],
    ) -> Result<&'a mut Group, RegistryError> {
        let mut current = root;
        for (index, segment) in path.iter().enumerate() {
            let description = descriptions
                .get(index)
                .copied()
                .filter(|text| !text.is_empty());
            let node = current
                .children
                .entry(segment.to_string())
                .or_insert_with(|| {
                    log::debug!("Creating intermediate group '{segment}'");
                    let mut group = Group::new(*segment);
                    group.description = description.map(ToString::to_string);
                    CommandNode::Group(group)
                });
            match node {
                CommandNode::Group(group) => {
                    if group.description.is_none() {
                        group.description = description.map(ToString::to_string);
                    }
                    current = group;
                }
                CommandNode::Leaf(_) => {
                    return Err(RegistryError::InvalidPath {
                        path: path
                            .get(..=index)
                            .unwrap_or(path)
                            .join(" "),
                    });
                }
            }
        }
        Ok(current)
    }

    /// Merges a descriptor's operations and subcommands directly into
    /// `parent`, discarding the descriptor's own name as a namespace level.
    fn merge_into(parent: &mut Group, descriptor: CommandDescriptor) -> Result<(), RegistryError> {
        if descriptor.operations.is_empty() && descriptor.subcommands.is_empty() {
            return Err(RegistryError::EmptyDescriptor {
                name: descriptor.name,
            });
        }
        for operation in descriptor.operations {
            parent.insert(CommandNode::Leaf(operation))?;
        }
        for subcommand in descriptor.subcommands {
            Self::attach(parent, subcommand)?;
        }
        Ok(())
    }

    fn attach(parent: &mut Group, descriptor: CommandDescriptor) -> Result<(), RegistryError> {
        if descriptor.transparent {
            return Self::merge_into(parent, descriptor);
        }
        if descriptor.operations.is_empty() && descriptor.subcommands.is_empty() {
            return Err(RegistryError::EmptyDescriptor {
                name: descriptor.name,
            });
        }

        let mut group = Group::new(descriptor.name);
        group.description = descriptor.description;
        group.synonyms = descriptor.synonyms;
        group.hidden = descriptor.hidden;
        for operation in descriptor.operations {
            if operation.is_default {
                group.default_child = Some(operation.name.clone());
            }
            group.insert(CommandNode::Leaf(operation))?;
        }
        for subcommand in descriptor.subcommands {
            Self::attach(&mut group, subcommand)?;
        }
        parent.insert(CommandNode::Group(group))
    }

    /// Build-time validation and default assignment: every explicit default
    /// must resolve, and a group with exactly one visible child and no
    /// explicit default gets that child as its default.
    pub(crate) fn finalize(&mut self) -> Result<(), RegistryError> {
        Self::finalize_group(&mut self.root)
    }

    fn finalize_group(group: &mut Group) -> Result<(), RegistryError> {
        if let Some(default) = &group.default_child {
            if !group.children.contains_key(default) && !group.synonym_map.contains_key(default) {
                return Err(RegistryError::UnknownDefault {
                    name: default.clone(),
                    group: group.name.clone(),
                });
            }
        } else {
            let visible = group.list_visible();
            if visible.len() == 1 {
                group.default_child = visible.into_iter().next();
            }
        }
        for child in group.children.values_mut() {
            if let CommandNode::Group(subgroup) = child {
                Self::finalize_group(subgroup)?;
            }
        }
        Ok(())
    }
}

// MARK: --- UNIT TESTS ---
