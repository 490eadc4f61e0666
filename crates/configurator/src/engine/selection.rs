use super::domain::{ConfigurationTreeNode, SelectedSet};

/// Collect every selected component id in the tree rooted at `root`.
pub fn collect_selected(root: &ConfigurationTreeNode) -> SelectedSet {
    let mut selected = SelectedSet::default();
    let mut pending = vec![root];

    while let Some(node) = pending.pop() {
        if let Some(component_id) = &node.selected_component_id {
            selected.insert(component_id.clone());
        }
        pending.extend(node.children.iter());
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_nested_selections_without_duplicates() {
        let tree = ConfigurationTreeNode::new("root", "sp-engine")
            .selecting("eng-1")
            .with_child(
                ConfigurationTreeNode::new("trans", "sp-transmission")
                    .selecting("trans-1")
                    .with_child(ConfigurationTreeNode::new("dup", "sp-engine").selecting("eng-1")),
            )
            .with_child(ConfigurationTreeNode::new("tire", "sp-tire"));

        let selected = collect_selected(&tree);

        assert_eq!(selected.len(), 2);
        assert!(selected.contains("eng-1"));
        assert!(selected.contains("trans-1"));
        assert!(selected.len() <= tree.node_count());
    }

    #[test]
    fn empty_tree_yields_empty_set() {
        let tree = ConfigurationTreeNode::new("root", "sp-engine");
        assert!(collect_selected(&tree).is_empty());
    }
}
