//! Hierarchical operator namespaces
//!
//! Each operator kind owns one tree. Interior nodes are namespaces, leaves are
//! operators; a path segment can never be both.

use super::kind::OpId;
use crate::error::{Error, Result};
use std::collections::BTreeMap;

#[derive(Debug)]
enum Node {
    Leaf(OpId),
    Branch(Namespace),
}

/// One namespace level
#[derive(Debug, Default)]
pub(crate) struct Namespace {
    children: BTreeMap<String, Node>,
}

fn split(path: &str) -> Result<Vec<&str>> {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(Error::invalid_value(format!("Invalid operator path: {path:?}")));
    }
    Ok(parts)
}

impl Namespace {
    /// Look up a leaf by dotted path
    pub fn get(&self, path: &str) -> Option<OpId> {
        let mut node = self;
        let mut parts = path.split('.').peekable();
        while let Some(part) = parts.next() {
            match node.children.get(part)? {
                Node::Leaf(id) if parts.peek().is_none() => return Some(*id),
                Node::Leaf(_) => return None,
                Node::Branch(ns) => node = ns,
            }
        }
        None
    }

    /// Whether `path` names a namespace (interior node)
    pub fn is_namespace(&self, path: &str) -> bool {
        let mut node = self;
        for part in path.split('.') {
            match node.children.get(part) {
                Some(Node::Branch(ns)) => node = ns,
                _ => return false,
            }
        }
        true
    }

    /// Fail unless `path` could be inserted as a new leaf
    ///
    /// Returns the existing leaf if the exact path is already bound, so the
    /// caller can decide between a conflict and a rebinding.
    pub fn check_insert(&self, path: &str) -> Result<Option<OpId>> {
        let parts = split(path)?;
        let (last, parents) = parts.split_last().ok_or_else(|| Error::invalid_value("empty path"))?;
        let mut node = self;
        for (depth, part) in parents.iter().enumerate() {
            match node.children.get(*part) {
                None => return Ok(None),
                Some(Node::Branch(ns)) => node = ns,
                Some(Node::Leaf(_)) => {
                    let prefix = parts[..=depth].join(".");
                    return Err(Error::path_conflict(
                        &prefix,
                        format!("{prefix} is an operator, not a namespace"),
                    ));
                }
            }
        }
        match node.children.get(*last) {
            None => Ok(None),
            Some(Node::Leaf(id)) => Ok(Some(*id)),
            Some(Node::Branch(_)) => Err(Error::path_conflict(
                path,
                format!("{path} is a namespace, not an operator"),
            )),
        }
    }

    /// Insert a leaf; `check_insert` must have succeeded with `None`
    pub fn insert(&mut self, path: &str, id: OpId) -> Result<()> {
        if self.check_insert(path)?.is_some() {
            return Err(Error::path_conflict(path, "an operator with this name exists"));
        }
        let parts = split(path)?;
        let (last, parents) = parts.split_last().ok_or_else(|| Error::invalid_value("empty path"))?;
        let mut node = self;
        for part in parents {
            let child = node
                .children
                .entry((*part).to_string())
                .or_insert_with(|| Node::Branch(Namespace::default()));
            node = match child {
                Node::Branch(ns) => ns,
                Node::Leaf(_) => {
                    return Err(Error::path_conflict(path, format!("{part} is an operator")))
                }
            };
        }
        node.children.insert((*last).to_string(), Node::Leaf(id));
        Ok(())
    }

    /// Every leaf with its full dotted path, depth-first in name order
    pub fn leaves(&self) -> Vec<(String, OpId)> {
        let mut out = Vec::new();
        self.collect("", &mut out);
        out
    }

    fn collect(&self, prefix: &str, out: &mut Vec<(String, OpId)>) {
        for (name, node) in &self.children {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            match node {
                Node::Leaf(id) => out.push((path, *id)),
                Node::Branch(ns) => ns.collect(&path, out),
            }
        }
    }
}
