//! Arena representation of the task forest.
//!
//! Nodes live in a map keyed by id. Each node keeps its parent id and the
//! ordered ids of its children; top-level ids live in `roots`. The nested
//! [`Task`] shape is only built at the read and persistence boundary.

use crate::error::StoreError;
use crate::types::{Order, Task};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub order: Order,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub parent: Option<String>,
    pub children: Vec<String>,
}

impl Node {
    pub fn new(id: String, title: String, description: Option<String>, order: Order) -> Self {
        let now = Utc::now();
        Self {
            id,
            title,
            description,
            completed: false,
            order,
            created_at: now,
            updated_at: now,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Copy of the node's own fields with the given children.
    pub fn to_task(&self, children: Vec<Task>) -> Task {
        Task {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            completed: self.completed,
            order: self.order,
            created_at: self.created_at,
            updated_at: self.updated_at,
            children,
            parent_id: self.parent.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Forest {
    nodes: HashMap<String, Node>,
    roots: Vec<String>,
}

impl Forest {
    /// Build the arena from nested tasks.
    ///
    /// Parent links come from the nesting; persisted `parentId` values are
    /// ignored. Duplicate ids are rejected.
    pub fn from_tasks(tasks: Vec<Task>) -> Result<Self, StoreError> {
        let mut forest = Forest::default();
        for task in tasks {
            let id = forest.load(task, None)?;
            forest.roots.push(id);
        }
        Ok(forest)
    }

    fn load(&mut self, task: Task, parent: Option<&str>) -> Result<String, StoreError> {
        if self.nodes.contains_key(&task.id) {
            return Err(StoreError::invalid_value(
                "tasks",
                format!("duplicate task id {}", task.id),
            ));
        }
        let id = task.id;
        self.nodes.insert(
            id.clone(),
            Node {
                id: id.clone(),
                title: task.title,
                description: task.description,
                completed: task.completed,
                order: task.order,
                created_at: task.created_at,
                updated_at: task.updated_at,
                parent: parent.map(str::to_string),
                children: Vec::new(),
            },
        );
        let mut child_ids = Vec::with_capacity(task.children.len());
        for child in task.children {
            child_ids.push(self.load(child, Some(&id))?);
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.children = child_ids;
        }
        Ok(id)
    }

    /// Nested tasks in stored sibling-list order, for persistence.
    pub fn to_tasks(&self) -> Vec<Task> {
        self.roots
            .iter()
            .filter_map(|id| self.build(id, false))
            .collect()
    }

    /// Nested copy of the whole forest, sorted by `order` at every level.
    pub fn sorted_roots(&self) -> Vec<Task> {
        self.sorted_ids(&self.roots)
            .into_iter()
            .filter_map(|id| self.build(id, true))
            .collect()
    }

    /// Nested copy of one task, children sorted by `order`.
    pub fn snapshot(&self, id: &str) -> Option<Task> {
        self.build(id, true)
    }

    fn build(&self, id: &str, sorted: bool) -> Option<Task> {
        let node = self.nodes.get(id)?;
        let child_ids: Vec<&String> = if sorted {
            self.sorted_ids(&node.children)
        } else {
            node.children.iter().collect()
        };
        let children = child_ids
            .into_iter()
            .filter_map(|child| self.build(child, sorted))
            .collect();
        Some(node.to_task(children))
    }

    /// Stable sort of ids by their node's `order`.
    fn sorted_ids<'a>(&self, ids: &'a [String]) -> Vec<&'a String> {
        let mut sorted: Vec<&String> = ids.iter().collect();
        sorted.sort_by(|a, b| self.order_of(a).total_cmp(&self.order_of(b)));
        sorted
    }

    fn order_of(&self, id: &str) -> Order {
        self.nodes.get(id).map(|n| n.order).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Sibling list of `parent`, or the top-level list for `None`.
    pub fn siblings(&self, parent: Option<&str>) -> &[String] {
        match parent {
            None => &self.roots,
            Some(pid) => self
                .nodes
                .get(pid)
                .map(|n| n.children.as_slice())
                .unwrap_or(&[]),
        }
    }

    fn siblings_mut(&mut self, parent: Option<&str>) -> Option<&mut Vec<String>> {
        match parent {
            None => Some(&mut self.roots),
            Some(pid) => self.nodes.get_mut(pid).map(|n| &mut n.children),
        }
    }

    /// Append a new node to its parent's sibling list.
    ///
    /// The parent must exist; callers resolve it first.
    pub fn insert(&mut self, mut node: Node, parent: Option<&str>) {
        node.parent = parent.map(str::to_string);
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        if let Some(list) = self.siblings_mut(parent) {
            list.push(id);
        }
    }

    /// Stable-sort a sibling list by `order`.
    pub fn sort_siblings(&mut self, parent: Option<&str>) {
        let Some(list) = self.siblings_mut(parent) else {
            return;
        };
        let mut ids = std::mem::take(list);
        ids.sort_by(|a, b| self.order_of(a).total_cmp(&self.order_of(b)));
        if let Some(list) = self.siblings_mut(parent) {
            *list = ids;
        }
    }

    /// Reassign `order` of a sibling list to `0..n-1` by position.
    pub fn renormalize(&mut self, parent: Option<&str>) {
        let ids = self.siblings(parent).to_vec();
        for (index, id) in ids.iter().enumerate() {
            if let Some(node) = self.nodes.get_mut(id) {
                node.order = index as Order;
            }
        }
    }

    /// Unlink a node from its sibling list, keeping it and its subtree.
    pub fn detach(&mut self, id: &str) -> Option<Option<String>> {
        let parent = self.nodes.get(id)?.parent.clone();
        if let Some(list) = self.siblings_mut(parent.as_deref()) {
            list.retain(|sibling| sibling != id);
        }
        Some(parent)
    }

    /// Link a detached node into `parent`'s sibling list at `index`.
    pub fn attach_at(&mut self, id: &str, parent: Option<&str>, index: usize) {
        if let Some(list) = self.siblings_mut(parent) {
            let index = index.min(list.len());
            list.insert(index, id.to_string());
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = parent.map(str::to_string);
        }
    }

    /// Remove a node and its whole subtree. Returns how many nodes went away.
    pub fn remove_subtree(&mut self, id: &str) -> Option<usize> {
        self.detach(id)?;
        let mut removed = 0;
        let mut pending = vec![id.to_string()];
        while let Some(next) = pending.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                pending.extend(node.children);
                removed += 1;
            }
        }
        Some(removed)
    }

    /// Whether `candidate` is `ancestor` or lies below it.
    pub fn is_self_or_descendant(&self, candidate: &str, ancestor: &str) -> bool {
        let mut current = Some(candidate);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent.as_deref());
        }
        false
    }

    /// Ids of every completed node, at any depth.
    pub fn completed_ids(&self) -> Vec<String> {
        self.nodes
            .values()
            .filter(|n| n.completed)
            .map(|n| n.id.clone())
            .collect()
    }

    /// Highest id that parses as an integer.
    pub fn max_numeric_id(&self) -> Option<u64> {
        self.nodes.keys().filter_map(|id| id.parse::<u64>().ok()).max()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }
}
