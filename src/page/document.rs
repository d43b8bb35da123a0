use std::sync::{Arc, Mutex};

use scraper::{ElementRef, Html};

/// Handle to an element of a [`Document`]. Stays valid after the element
/// is detached; it then simply refers to an orphan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    hidden: bool,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            attrs: Vec::new(),
            parent: None,
            children: Vec::new(),
            hidden: false,
        }
    }
}

/// The page's live element tree.
///
/// `scraper::Html` only builds it; the tree itself has to be mutable
/// (entries get marked, captions hidden, nodes added and removed while the
/// page lives), which `scraper`'s read-only tree and `Selector` matching
/// cannot express. Selectors are therefore small predicates over this tree.
///
/// Writes to elements that are no longer attached to the root are ignored:
/// asynchronous callbacks may still hold handles to removed elements.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

pub type SharedDocument = Arc<Mutex<Document>>;

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("#document")],
        }
    }

    /// Build a tree from an HTML page, keeping elements only.
    pub fn parse_html(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut doc = Document::new();
        let root = doc.root();
        doc.import(parsed.root_element(), root);
        doc
    }

    fn import(&mut self, element: ElementRef<'_>, parent: NodeId) {
        let value = element.value();
        let node = self.create_element(value.name());
        for (name, val) in value.attrs() {
            self.set_attr(node, name, val);
        }
        self.append_child(parent, node);

        for child in element.children() {
            if let Some(child) = ElementRef::wrap(child) {
                self.import(child, node);
            }
        }
    }

    pub fn into_shared(self) -> SharedDocument {
        Arc::new(Mutex::new(self))
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.nodes.push(Node::new(tag));
        NodeId(self.nodes.len() - 1)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.is_ancestor(child, parent) {
            return;
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Insert `child` at position `index` among `parent`'s children.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        if parent == child || self.is_ancestor(child, parent) {
            return;
        }
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Remove an element (and its subtree) from the tree.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != node);
        }
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.nodes[node.0].parent;
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.nodes[n.0].parent;
        }
        false
    }

    pub fn is_attached(&self, node: NodeId) -> bool {
        node == self.root() || self.is_ancestor(self.root(), node)
    }

    /// Child indices from the root down to `node`. Comparing keys compares
    /// document order. `None` once the node is detached.
    pub fn order_key(&self, node: NodeId) -> Option<Vec<usize>> {
        let mut key = Vec::new();
        let mut current = node;
        while let Some(parent) = self.nodes[current.0].parent {
            let index = self.nodes[parent.0]
                .children
                .iter()
                .position(|c| *c == current)?;
            key.push(index);
            current = parent;
        }
        if current != self.root() {
            return None;
        }
        key.reverse();
        Some(key)
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let n = &mut self.nodes[node.0];
        match name {
            "id" => n.id = Some(value.to_string()),
            "class" => {
                n.classes = value.split_whitespace().map(String::from).collect();
            }
            _ => match n.attrs.iter_mut().find(|(k, _)| k == name) {
                Some((_, v)) => *v = value.to_string(),
                None => n.attrs.push((name.to_string(), value.to_string())),
            },
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        let n = &self.nodes[node.0];
        match name {
            "id" => n.id.as_deref(),
            _ => n
                .attrs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
        }
    }

    pub fn tag(&self, node: NodeId) -> &str {
        &self.nodes[node.0].tag
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes[node.0].children.clone()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes[node.0].classes.iter().any(|c| c == class)
    }

    /// Returns false when the element is detached and nothing was written.
    pub fn add_class(&mut self, node: NodeId, class: &str) -> bool {
        if !self.is_attached(node) {
            return false;
        }
        if !self.has_class(node, class) {
            self.nodes[node.0].classes.push(class.to_string());
        }
        true
    }

    pub fn hide(&mut self, node: NodeId) -> bool {
        if !self.is_attached(node) {
            return false;
        }
        self.nodes[node.0].hidden = true;
        true
    }

    pub fn is_hidden(&self, node: NodeId) -> bool {
        self.nodes[node.0].hidden
    }

    /// First attached element with the given `id`, in document order.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.find_descendant(self.root(), |doc, n| doc.nodes[n.0].id.as_deref() == Some(id))
    }

    /// First descendant of `node` (preorder, `node` excluded) matching `pred`.
    pub fn find_descendant<F>(&self, node: NodeId, pred: F) -> Option<NodeId>
    where
        F: Fn(&Document, NodeId) -> bool,
    {
        let mut stack: Vec<NodeId> = self.nodes[node.0].children.iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            if pred(self, current) {
                return Some(current);
            }
            stack.extend(self.nodes[current.0].children.iter().rev().copied());
        }
        None
    }

    /// `tag.class` style match.
    pub fn matches(&self, node: NodeId, tag: &str, class: Option<&str>) -> bool {
        self.tag(node) == tag && class.map_or(true, |c| self.has_class(node, c))
    }
}
