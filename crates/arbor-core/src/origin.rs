use crate::node::Node;
use crate::range::Range;
use crate::source::{SourceNode, SourceRef};
use std::fmt;

/// Provenance record linking an output node to the input it derives from.
#[derive(Clone)]
pub enum Origin {
    /// Explicitly recorded position and text.
    Simple {
        range: Option<Range>,
        text: Option<String>,
    },
    /// Delegates position and text to another node of the target model.
    Node(Node),
    /// Delegates position and text to a source tree element.
    Source(SourceRef),
    /// The merge of several origins, e.g. for nodes condensed from many
    /// source elements.
    Composite(Vec<Origin>),
}

impl Origin {
    pub fn simple(range: Option<Range>, text: Option<String>) -> Origin {
        Origin::Simple { range, text }
    }

    pub fn range(&self) -> Option<Range> {
        match self {
            Origin::Simple { range, .. } => *range,
            Origin::Node(node) => node.range(),
            Origin::Source(source) => source.range(),
            Origin::Composite(origins) => origins
                .iter()
                .filter_map(Origin::range)
                .reduce(|merged, next| merged.union(&next)),
        }
    }

    pub fn text(&self) -> Option<String> {
        match self {
            Origin::Simple { text, .. } => text.clone(),
            Origin::Node(node) => SourceNode::text(node),
            Origin::Source(source) => source.text(),
            Origin::Composite(origins) => {
                let parts: Vec<String> = origins.iter().filter_map(Origin::text).collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(""))
                }
            }
        }
    }

    /// Whether this origin points directly at the given node. A node set as
    /// its own origin would form a cycle, so such origins are dropped.
    pub(crate) fn refers_to(&self, node: &Node) -> bool {
        match self {
            Origin::Node(target) => target == node,
            Origin::Source(source) => source
                .as_any()
                .downcast_ref::<Node>()
                .is_some_and(|target| target == node),
            _ => false,
        }
    }
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Simple { range, text } => f
                .debug_struct("SimpleOrigin")
                .field("range", range)
                .field("text", text)
                .finish(),
            Origin::Node(node) => write!(f, "NodeOrigin({})", node.node_type().name()),
            Origin::Source(source) => write!(f, "SourceOrigin({})", source.node_type().name()),
            Origin::Composite(origins) => f.debug_tuple("CompositeOrigin").field(&origins.len()).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::Point;

    #[test]
    fn composite_origin_merges_ranges_and_text() {
        let first = Origin::simple(
            Some(Range::new(Point::new(1, 0), Point::new(1, 3))),
            Some("set".to_string()),
        );
        let second = Origin::simple(
            Some(Range::new(Point::new(1, 4), Point::new(1, 7))),
            Some("foo".to_string()),
        );
        let composite = Origin::Composite(vec![first, second]);
        assert_eq!(
            composite.range(),
            Some(Range::new(Point::new(1, 0), Point::new(1, 7)))
        );
        assert_eq!(composite.text(), Some("setfoo".to_string()));
    }

    #[test]
    fn empty_composite_has_no_range() {
        let composite = Origin::Composite(Vec::new());
        assert_eq!(composite.range(), None);
        assert_eq!(composite.text(), None);
    }
}
