//! DOM Tree (arena-based allocation)
//!
//! Nodes are never freed: removing a node only unlinks it, so every
//! [`NodeId`] handed out stays addressable and can be checked for
//! staleness by the layers above.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::{
    DomError, DomResult, ElementData, Node, NodeData, NodeId, NodeType, byte_offset, char_len,
};

static NEXT_DOCUMENT_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies one arena. Nodes of different arenas never share a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(u32);

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    id: DocumentId,
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a new tree holding only a document node
    pub fn new() -> Self {
        let mut tree = Self {
            id: DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed)),
            nodes: Vec::new(),
        };
        tree.push(NodeData::Document);
        tree
    }

    /// Arena identity
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// The document node
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Whether `id` addresses a node of this arena
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Number of nodes in the arena (attached or not)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound)
    }

    // --- Creation ---

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeData::Element(ElementData::new(tag)))
    }

    pub fn create_text(&mut self, data: &str) -> NodeId {
        self.push(NodeData::Text(data.to_string()))
    }

    pub fn create_comment(&mut self, data: &str) -> NodeId {
        self.push(NodeData::Comment(data.to_string()))
    }

    pub fn create_cdata_section(&mut self, data: &str) -> NodeId {
        self.push(NodeData::CDataSection(data.to_string()))
    }

    pub fn create_processing_instruction(&mut self, target: &str, data: &str) -> NodeId {
        self.push(NodeData::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        })
    }

    pub fn create_doctype(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Doctype {
            name: name.to_string(),
        })
    }

    pub fn create_fragment(&mut self) -> NodeId {
        self.push(NodeData::DocumentFragment)
    }

    // --- Navigation ---

    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.get(id).map(Node::node_type)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent.link())
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.first_child.link())
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.last_child.link())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.next_sibling.link())
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.prev_sibling.link())
    }

    /// Iterate over the children of `id`
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    pub fn child_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).nth(index)
    }

    /// Position of `id` among its siblings (0 when detached)
    pub fn index_of(&self, id: NodeId) -> usize {
        let mut index = 0;
        let mut current = self.prev_sibling(id);
        while let Some(node) = current {
            index += 1;
            current = self.prev_sibling(node);
        }
        index
    }

    /// Character count for character data, 0 for doctypes, child count otherwise
    pub fn length(&self, id: NodeId) -> usize {
        match self.get(id) {
            Some(node) => match node.character_data() {
                Some(data) => char_len(data),
                None if matches!(node.data, NodeData::Doctype { .. }) => 0,
                None => self.child_count(id),
            },
            None => 0,
        }
    }

    pub fn is_character_data(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_character_data)
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_text)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_element)
    }

    /// Character data of a Text/CDATA/Comment/PI node
    pub fn data(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(Node::character_data)
    }

    /// Strict ancestors of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// `id` followed by its ancestors
    pub fn inclusive_ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.contains(id).then_some(id),
        }
    }

    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    pub fn is_inclusive_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.is_ancestor_of(ancestor, node)
    }

    /// Topmost inclusive ancestor of `id`
    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.inclusive_ancestors(id).last().unwrap_or(id)
    }

    /// Nearest node that is an inclusive ancestor of both `a` and `b`
    pub fn common_ancestor(&self, a: NodeId, b: NodeId) -> Option<NodeId> {
        self.inclusive_ancestors(a)
            .find(|&candidate| self.is_inclusive_ancestor_of(candidate, b))
    }

    /// The child of `ancestor` that is an inclusive ancestor of `node`
    pub fn closest_ancestor_in(&self, node: NodeId, ancestor: NodeId) -> Option<NodeId> {
        self.inclusive_ancestors(node)
            .find(|&n| self.parent(n) == Some(ancestor))
    }

    /// Next node in pre-order that stays inside `root`'s subtree
    pub fn following(&self, id: NodeId, root: NodeId) -> Option<NodeId> {
        if let Some(child) = self.first_child(id) {
            return Some(child);
        }
        let mut current = id;
        loop {
            if current == root {
                return None;
            }
            if let Some(sibling) = self.next_sibling(current) {
                return Some(sibling);
            }
            current = self.parent(current)?;
        }
    }

    /// Descendants of `id` in pre-order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            root: id,
            next: self.first_child(id),
        }
    }

    /// Concatenated data of Text/CDATA descendants (own data for character data)
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(data) = self.data(id) {
            return data.to_string();
        }
        self.descendants(id)
            .filter(|&n| self.is_text(n))
            .filter_map(|n| self.data(n))
            .collect()
    }

    // --- Attributes ---

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.get(id)
            .and_then(Node::as_element)
            .map(|e| e.tag.as_str())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)
            .and_then(Node::as_element)
            .and_then(|e| e.get_attr(name))
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> DomResult<()> {
        let element = self
            .get_mut(id)
            .ok_or(DomError::NotFound)?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType)?;
        element.set_attr(name, value);
        Ok(())
    }

    /// Whether `id` sits inside a `contenteditable` region
    pub fn is_editable(&self, id: NodeId) -> bool {
        for node in self.inclusive_ancestors(id) {
            match self.attribute(node, "contenteditable") {
                Some("false") => return false,
                Some(_) => return true,
                None => {}
            }
        }
        false
    }

    // --- Mutation ---

    /// Append `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or append when `None`).
    ///
    /// A fragment is dissolved: its children move into `parent` in order.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<NodeId> {
        self.check_insert(parent, child)?;
        if let Some(reference) = reference {
            if self.parent(reference) != Some(parent) {
                return Err(DomError::NotAChild);
            }
        }

        if self.node_type(child) == Some(NodeType::DocumentFragment) {
            let moved: Vec<NodeId> = self.children(child).collect();
            for node in moved {
                self.unlink(node);
                self.link_before(parent, node, reference);
            }
            return Ok(child);
        }

        let reference = if reference == Some(child) {
            self.next_sibling(child)
        } else {
            reference
        };
        self.unlink(child);
        self.link_before(parent, child, reference);
        Ok(child)
    }

    /// Insert `child` right after `reference` in `reference`'s parent
    pub fn insert_after(&mut self, child: NodeId, reference: NodeId) -> DomResult<NodeId> {
        let parent = self.parent(reference).ok_or(DomError::NotFound)?;
        let next = self.next_sibling(reference);
        self.insert_before(parent, child, next)
    }

    /// Remove `child` from `parent`
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        if self.parent(child) != Some(parent) {
            return Err(DomError::NotAChild);
        }
        self.unlink(child);
        Ok(child)
    }

    /// Unlink `id` from its parent, if any
    pub fn detach(&mut self, id: NodeId) {
        if self.contains(id) {
            self.unlink(id);
        }
    }

    /// Copy `id` (and its subtree when `deep`) into new detached nodes
    pub fn clone_node(&mut self, id: NodeId, deep: bool) -> DomResult<NodeId> {
        let data = self.node(id)?.data.clone();
        let copy = self.push(data);
        if deep {
            let children: Vec<NodeId> = self.children(id).collect();
            for child in children {
                let child_copy = self.clone_node(child, true)?;
                self.link_before(copy, child_copy, None);
            }
        }
        Ok(copy)
    }

    /// Merge adjacent text nodes and drop empty ones below `id`
    pub fn normalize(&mut self, id: NodeId) {
        let mut child = self.first_child(id);
        while let Some(current) = child {
            if self.node_type(current) == Some(NodeType::Text) {
                if self.length(current) == 0 {
                    child = self.next_sibling(current);
                    self.unlink(current);
                    continue;
                }
                while let Some(next) = self.next_sibling(current) {
                    if self.node_type(next) != Some(NodeType::Text) {
                        break;
                    }
                    let tail = self.data(next).unwrap_or_default().to_string();
                    if let Some(data) = self.nodes[current.index()].character_data_mut() {
                        data.push_str(&tail);
                    }
                    self.unlink(next);
                }
            } else {
                self.normalize(current);
            }
            child = self.next_sibling(current);
        }
    }

    // --- Character data ---

    fn data_mut(&mut self, id: NodeId) -> DomResult<&mut String> {
        self.get_mut(id)
            .ok_or(DomError::NotFound)?
            .character_data_mut()
            .ok_or(DomError::InvalidNodeType)
    }

    fn check_offset(&self, id: NodeId, offset: usize) -> DomResult<usize> {
        let length = self.length(id);
        if offset > length {
            return Err(DomError::IndexSize { offset, length });
        }
        Ok(length)
    }

    pub fn set_data(&mut self, id: NodeId, value: &str) -> DomResult<()> {
        let data = self.data_mut(id)?;
        data.clear();
        data.push_str(value);
        Ok(())
    }

    /// `count` characters starting at `offset`, clamped at the end
    pub fn substring_data(&self, id: NodeId, offset: usize, count: usize) -> DomResult<String> {
        self.check_offset(id, offset)?;
        let data = self.data(id).ok_or(DomError::InvalidNodeType)?;
        Ok(crate::char_slice(data, offset, offset.saturating_add(count)).to_string())
    }

    pub fn append_data(&mut self, id: NodeId, value: &str) -> DomResult<()> {
        self.data_mut(id)?.push_str(value);
        Ok(())
    }

    pub fn insert_data(&mut self, id: NodeId, offset: usize, value: &str) -> DomResult<()> {
        self.check_offset(id, offset)?;
        let data = self.data_mut(id)?;
        let at = byte_offset(data, offset);
        data.insert_str(at, value);
        Ok(())
    }

    pub fn delete_data(&mut self, id: NodeId, offset: usize, count: usize) -> DomResult<()> {
        self.check_offset(id, offset)?;
        let data = self.data_mut(id)?;
        let from = byte_offset(data, offset);
        let to = byte_offset(data, offset.saturating_add(count));
        data.replace_range(from..to, "");
        Ok(())
    }

    /// Split character data at `offset`; the tail moves into a new sibling
    /// inserted right after `id`, which is returned.
    pub fn split_text(&mut self, id: NodeId, offset: usize) -> DomResult<NodeId> {
        self.check_offset(id, offset)?;
        let tail = {
            let data = self.data_mut(id)?;
            let at = byte_offset(data, offset);
            data.split_off(at)
        };
        let new_node = self.clone_node(id, false)?;
        self.set_data(new_node, &tail)?;
        if let Some(parent) = self.parent(id) {
            let next = self.next_sibling(id);
            self.link_before(parent, new_node, next);
        }
        Ok(new_node)
    }

    // --- Linking ---

    fn check_insert(&self, parent: NodeId, child: NodeId) -> DomResult<()> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;
        if !parent_node.can_have_children() {
            return Err(DomError::HierarchyRequest("parent cannot have children"));
        }
        if matches!(child_node.data, NodeData::Document) {
            return Err(DomError::HierarchyRequest("a document cannot be inserted"));
        }
        if self.is_inclusive_ancestor_of(child, parent) {
            return Err(DomError::HierarchyRequest("node is an ancestor of the parent"));
        }
        Ok(())
    }

    fn unlink(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = &self.nodes[id.index()];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        if !parent.is_valid() {
            return;
        }
        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else {
            self.nodes[parent.index()].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else {
            self.nodes[parent.index()].last_child = prev;
        }
        let node = &mut self.nodes[id.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
    }

    fn link_before(&mut self, parent: NodeId, child: NodeId, reference: Option<NodeId>) {
        match reference {
            Some(reference) => {
                let prev = self.nodes[reference.index()].prev_sibling;
                self.nodes[reference.index()].prev_sibling = child;
                if prev.is_valid() {
                    self.nodes[prev.index()].next_sibling = child;
                } else {
                    self.nodes[parent.index()].first_child = child;
                }
                let node = &mut self.nodes[child.index()];
                node.prev_sibling = prev;
                node.next_sibling = reference;
            }
            None => {
                let last = self.nodes[parent.index()].last_child;
                if last.is_valid() {
                    self.nodes[last.index()].next_sibling = child;
                } else {
                    self.nodes[parent.index()].first_child = child;
                }
                self.nodes[parent.index()].last_child = child;
                let node = &mut self.nodes[child.index()];
                node.prev_sibling = last;
                node.next_sibling = NodeId::NONE;
            }
        }
        self.nodes[child.index()].parent = parent;
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over a node's children
pub struct Children<'a> {
    tree: &'a DomTree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}

/// Iterator up the parent chain
pub struct Ancestors<'a> {
    tree: &'a DomTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// Pre-order iterator bounded by a subtree root
pub struct Descendants<'a> {
    tree: &'a DomTree,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.following(current, self.root);
        Some(current)
    }
}
