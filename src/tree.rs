//! Inspector tree: the module tree as nested nodes, or a filtered flat list.

use serde::Serialize;

use crate::module::Module;
use crate::path;

const COLOR_DARK: u32 = 0x666666;
const COLOR_WHITE: u32 = 0xffffff;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectorTag {
    pub label: String,
    pub text_color: u32,
    pub background_color: u32,
}

impl InspectorTag {
    pub fn namespaced() -> Self {
        Self {
            label: "namespaced".to_string(),
            text_color: COLOR_WHITE,
            background_color: COLOR_DARK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectorNode {
    pub id: String,
    pub label: String,
    pub tags: Vec<InspectorTag>,
    pub children: Vec<InspectorNode>,
}

impl InspectorNode {
    fn for_module(module: &Module, path: &str, label: &str, children: Vec<InspectorNode>) -> Self {
        let tags = if module.namespaced {
            vec![InspectorTag::namespaced()]
        } else {
            Vec::new()
        };
        Self {
            id: path::node_id(path).to_string(),
            label: label.to_string(),
            tags,
            children,
        }
    }

    pub fn is_namespaced(&self) -> bool {
        self.tags.iter().any(|t| t.label == "namespaced")
    }

    /// Nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(InspectorNode::count).sum::<usize>()
    }

    /// Ids of this subtree in pre-order.
    pub fn ids(&self) -> Vec<String> {
        let mut ids = vec![self.id.clone()];
        for child in &self.children {
            ids.extend(child.ids());
        }
        ids
    }
}

/// Full nested tree rooted at the root module.
pub fn format_tree(root: &Module) -> InspectorNode {
    format_subtree(root, "")
}

fn format_subtree(module: &Module, path: &str) -> InspectorNode {
    let children = module
        .children
        .iter()
        .map(|(name, child)| format_subtree(child, &path::child_path(path, name)))
        .collect();
    InspectorNode::for_module(module, path, path::display_label(path), children)
}

/// Pre-order flat list of every module whose path contains `filter`.
/// Children are visited whether or not their parent matched. The root's
/// path is empty, so it only matches the empty filter. Labels carry the
/// whole path since the list has no nesting to tell same-named modules apart.
pub fn flatten_tree(root: &Module, filter: &str) -> Vec<InspectorNode> {
    let mut nodes = Vec::new();
    flatten_into(&mut nodes, root, filter, "");
    nodes
}

fn flatten_into(nodes: &mut Vec<InspectorNode>, module: &Module, filter: &str, path: &str) {
    if path.contains(filter) {
        nodes.push(InspectorNode::for_module(module, path, path::flat_label(path), Vec::new()));
    }
    for (name, child) in &module.children {
        flatten_into(nodes, child, filter, &path::child_path(path, name));
    }
}

/// Tree query as the inspector issues it: a non-empty filter yields the
/// flat list, otherwise a single full tree.
pub fn inspector_tree(root: &Module, filter: Option<&str>) -> Vec<InspectorNode> {
    match filter {
        Some(filter) if !filter.is_empty() => flatten_tree(root, filter),
        _ => vec![format_tree(root)],
    }
}
