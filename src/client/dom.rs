//! The slice of the DOM the client behaviours use.
//!
//! [`Dom`] is implemented by whatever hosts the behaviours. [`MemoryDom`] is
//! a small arena-backed tree for building documents in tests and tooling.

use std::collections::BTreeMap;

/// Document operations needed by the lazy video loader and copy widget.
pub trait Dom {
    /// Handle to an element; cheap to copy and compare.
    type Node: Copy + Eq;

    /// Elements with `tag` (and `class`, if given), in document order.
    fn query_all(&self, tag: &str, class: Option<&str>) -> Vec<Self::Node>;
    /// Direct children of `node` with `tag`.
    fn children(&self, node: Self::Node, tag: &str) -> Vec<Self::Node>;

    fn attribute(&self, node: Self::Node, name: &str) -> Option<String>;
    fn set_attribute(&mut self, node: Self::Node, name: &str, value: &str);

    fn has_class(&self, node: Self::Node, class: &str) -> bool;
    fn add_class(&mut self, node: Self::Node, class: &str);
    fn remove_class(&mut self, node: Self::Node, class: &str);

    /// Concatenated text of `node` and its descendants.
    fn text_content(&self, node: Self::Node) -> String;
    /// Replace all content of `node` with `text`.
    fn set_text(&mut self, node: Self::Node, text: &str);

    /// A new element that is not yet attached.
    fn create_element(&mut self, tag: &str) -> Self::Node;
    /// Attach `node` as the sibling immediately before `reference`.
    fn insert_before(&mut self, node: Self::Node, reference: Self::Node);

    /// Ask a media element to (re)load its sources.
    fn reload(&mut self, node: Self::Node);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, Default)]
struct Element {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    reloads: u32,
}

/// In-memory document. The root is a `body` element.
#[derive(Debug, Clone)]
pub struct MemoryDom {
    elements: Vec<Element>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    pub fn new() -> Self {
        Self {
            elements: vec![Element {
                tag: "body".into(),
                ..Element::default()
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Create an element and append it as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, tag: &str) -> NodeId {
        let node = self.create_element(tag);
        self.elements[node.0].parent = Some(parent);
        self.elements[parent.0].children.push(node);
        node
    }

    pub fn tag(&self, node: NodeId) -> &str {
        &self.elements[node.0].tag
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.elements[node.0].parent
    }

    /// All children of `node`, in order.
    pub fn child_nodes(&self, node: NodeId) -> &[NodeId] {
        &self.elements[node.0].children
    }

    /// How many times [`Dom::reload`] was called on `node`.
    pub fn reload_count(&self, node: NodeId) -> u32 {
        self.elements[node.0].reloads
    }

    fn classes(&self, node: NodeId) -> Vec<String> {
        self.elements[node.0]
            .attributes
            .get("class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    fn set_classes(&mut self, node: NodeId, classes: &[String]) {
        let attributes = &mut self.elements[node.0].attributes;
        if classes.is_empty() {
            attributes.remove("class");
        } else {
            attributes.insert("class".into(), classes.join(" "));
        }
    }

    fn descendants(&self, node: NodeId, out: &mut Vec<NodeId>) {
        for &child in &self.elements[node.0].children {
            out.push(child);
            self.descendants(child, out);
        }
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.elements[node.0].parent.take() {
            self.elements[parent.0].children.retain(|&c| c != node);
        }
    }
}

impl Dom for MemoryDom {
    type Node = NodeId;

    fn query_all(&self, tag: &str, class: Option<&str>) -> Vec<NodeId> {
        let mut all = Vec::new();
        self.descendants(self.root(), &mut all);
        all.into_iter()
            .filter(|&n| self.tag(n) == tag)
            .filter(|&n| class.is_none_or(|c| self.has_class(n, c)))
            .collect()
    }

    fn children(&self, node: NodeId, tag: &str) -> Vec<NodeId> {
        self.elements[node.0]
            .children
            .iter()
            .copied()
            .filter(|&c| self.tag(c) == tag)
            .collect()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.elements[node.0].attributes.get(name).cloned()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        self.elements[node.0]
            .attributes
            .insert(name.to_string(), value.to_string());
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).iter().any(|c| c == class)
    }

    fn add_class(&mut self, node: NodeId, class: &str) {
        let mut classes = self.classes(node);
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
            self.set_classes(node, &classes);
        }
    }

    fn remove_class(&mut self, node: NodeId, class: &str) {
        let mut classes = self.classes(node);
        classes.retain(|c| c != class);
        self.set_classes(node, &classes);
    }

    fn text_content(&self, node: NodeId) -> String {
        let element = &self.elements[node.0];
        let mut text = element.text.clone();
        for &child in &element.children {
            text.push_str(&self.text_content(child));
        }
        text
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        for child in std::mem::take(&mut self.elements[node.0].children) {
            self.elements[child.0].parent = None;
        }
        self.elements[node.0].text = text.to_string();
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.elements.push(Element {
            tag: tag.to_string(),
            ..Element::default()
        });
        NodeId(self.elements.len() - 1)
    }

    fn insert_before(&mut self, node: NodeId, reference: NodeId) {
        let Some(parent) = self.elements[reference.0].parent else {
            return;
        };
        self.detach(node);
        let siblings = &mut self.elements[parent.0].children;
        let index = siblings
            .iter()
            .position(|&c| c == reference)
            .unwrap_or(siblings.len());
        siblings.insert(index, node);
        self.elements[node.0].parent = Some(parent);
    }

    fn reload(&mut self, node: NodeId) {
        self.elements[node.0].reloads += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_all_in_document_order() {
        let mut dom = MemoryDom::new();
        let a = dom.append(dom.root(), "pre");
        let div = dom.append(dom.root(), "div");
        let b = dom.append(div, "pre");
        let c = dom.append(dom.root(), "pre");
        assert_eq!(dom.query_all("pre", None), vec![a, b, c]);
    }

    #[test]
    fn query_all_filters_by_class() {
        let mut dom = MemoryDom::new();
        let lazy = dom.append(dom.root(), "video");
        dom.add_class(lazy, "lazy");
        dom.append(dom.root(), "video");
        assert_eq!(dom.query_all("video", Some("lazy")), vec![lazy]);
    }

    #[test]
    fn classes_add_and_remove() {
        let mut dom = MemoryDom::new();
        let node = dom.append(dom.root(), "video");
        dom.set_attribute(node, "class", "lazy wide");
        dom.add_class(node, "lazy");
        assert_eq!(dom.attribute(node, "class").as_deref(), Some("lazy wide"));
        dom.remove_class(node, "lazy");
        assert!(!dom.has_class(node, "lazy"));
        assert!(dom.has_class(node, "wide"));
        dom.remove_class(node, "wide");
        assert_eq!(dom.attribute(node, "class"), None);
    }

    #[test]
    fn text_content_includes_descendants() {
        let mut dom = MemoryDom::new();
        let pre = dom.append(dom.root(), "pre");
        let code = dom.append(pre, "code");
        dom.set_text(code, "console.log(1)");
        assert_eq!(dom.text_content(pre), "console.log(1)");
    }

    #[test]
    fn set_text_replaces_children() {
        let mut dom = MemoryDom::new();
        let button = dom.append(dom.root(), "button");
        dom.append(button, "span");
        dom.set_text(button, "Copy");
        assert!(dom.child_nodes(button).is_empty());
        assert_eq!(dom.text_content(button), "Copy");
    }

    #[test]
    fn insert_before_places_sibling() {
        let mut dom = MemoryDom::new();
        let first = dom.append(dom.root(), "p");
        let pre = dom.append(dom.root(), "pre");
        let button = dom.create_element("button");
        dom.insert_before(button, pre);
        assert_eq!(dom.child_nodes(dom.root()), &[first, button, pre]);
        assert_eq!(dom.parent(button), Some(dom.root()));
    }

    #[test]
    fn children_filters_by_tag() {
        let mut dom = MemoryDom::new();
        let video = dom.append(dom.root(), "video");
        let s1 = dom.append(video, "source");
        dom.append(video, "track");
        let s2 = dom.append(video, "source");
        assert_eq!(dom.children(video, "source"), vec![s1, s2]);
    }
}
