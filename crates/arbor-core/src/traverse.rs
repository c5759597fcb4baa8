//! Whole-tree passes over the target model.

use crate::node::Node;

/// Depth-first pre-order traversal, starting at the node itself.
pub struct Walk {
    stack: Vec<Node>,
}

impl Iterator for Walk {
    type Item = Node;

    fn next(&mut self) -> Option<Node> {
        let node = self.stack.pop()?;
        let children = node.children();
        self.stack.extend(children.into_iter().rev());
        Some(node)
    }
}

impl Node {
    pub fn walk(&self) -> Walk {
        Walk {
            stack: vec![self.clone()],
        }
    }

    /// (Re)assigns parent back-references across the whole subtree. The pass
    /// is idempotent: running it on an already consistent tree is a no-op.
    pub fn assign_parents(&self) {
        for node in self.walk() {
            for child in node.children() {
                child.set_parent(Some(&node));
            }
        }
    }

    /// Removes every provenance link in the subtree, trading traceability
    /// for deterministic, position-free output.
    pub fn strip_origins(&self) {
        for node in self.walk() {
            node.set_origin(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_type::{NodeType, ValueKind};
    use crate::origin::Origin;
    use crate::value::Value;

    fn small_tree() -> (Node, Node, Node) {
        let leaf = NodeType::builder("Leaf")
            .optional_attribute("label", ValueKind::Str)
            .build()
            .unwrap();
        let root_ty = NodeType::builder("Root")
            .containment_list("items", &leaf)
            .build()
            .unwrap();
        let a = Node::new(&leaf).unwrap();
        let b = Node::new(&leaf).unwrap();
        let root = Node::new(&root_ty).unwrap();
        root.set(
            "items",
            Some(Value::List(vec![
                Value::Node(a.clone()),
                Value::Node(b.clone()),
            ])),
        )
        .unwrap();
        (root, a, b)
    }

    #[test]
    fn walk_is_preorder() {
        let (root, a, b) = small_tree();
        let visited: Vec<Node> = root.walk().collect();
        assert_eq!(visited, vec![root, a, b]);
    }

    #[test]
    fn assign_parents_is_idempotent() {
        let (root, a, b) = small_tree();
        assert!(a.parent().is_none());
        root.assign_parents();
        root.assign_parents();
        assert_eq!(a.parent(), Some(root.clone()));
        assert_eq!(b.parent(), Some(root));
    }

    #[test]
    fn strip_origins_clears_the_whole_tree() {
        let (root, a, _) = small_tree();
        a.set_origin(Some(Origin::simple(None, Some("a".to_string()))));
        root.set_origin(Some(Origin::simple(None, Some("root".to_string()))));
        root.strip_origins();
        assert!(root.origin().is_none());
        assert!(a.origin().is_none());
    }
}
