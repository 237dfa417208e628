//! Structural validation, entry resolution and edge routing.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use petgraph::Direction;
use stepcore::{Edge, NodeSpec, WorkflowDefinition, WorkflowError};
use std::collections::HashMap;

/// A workflow definition that passed structural validation, indexed by node id
pub struct ValidatedWorkflow<'a> {
    definition: &'a WorkflowDefinition,
    index: HashMap<&'a str, NodeIndex>,
    graph: DiGraph<usize, ()>,
}

impl<'a> ValidatedWorkflow<'a> {
    /// Validate the node and edge collections
    ///
    /// Checks, in order: every node has an id, ids are unique, the node
    /// set is non-empty, and every edge target names an existing node.
    pub fn new(definition: &'a WorkflowDefinition) -> Result<Self, WorkflowError> {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        
        for (position, node) in definition.nodes.iter().enumerate() {
            if node.id.is_empty() {
                return Err(WorkflowError::MissingNodeId);
            }
            if index.contains_key(node.id.as_str()) {
                return Err(WorkflowError::DuplicateNodeId(node.id.clone()));
            }
            index.insert(node.id.as_str(), graph.add_node(position));
        }
        
        if definition.nodes.is_empty() {
            return Err(WorkflowError::NoNodes);
        }
        
        for edge in &definition.edges {
            let to_idx = index.get(edge.target.as_str()).ok_or_else(|| {
                WorkflowError::EdgeTargetNotFound {
                    from: edge.source.clone(),
                    target: edge.target.clone(),
                }
            })?;
            // Edges leaving an unknown source can never be followed; they
            // still count toward the target's in-degree.
            match index.get(edge.source.as_str()) {
                Some(from_idx) => {
                    graph.add_edge(*from_idx, *to_idx, ());
                }
                None => {
                    let orphan = graph.add_node(usize::MAX);
                    graph.add_edge(orphan, *to_idx, ());
                }
            }
        }
        
        Ok(Self {
            definition,
            index,
            graph,
        })
    }
    
    pub fn node(&self, id: &str) -> Option<&'a NodeSpec> {
        let idx = self.index.get(id)?;
        self.definition.nodes.get(self.graph[*idx])
    }
    
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }
    
    /// Number of edges pointing at a node
    pub fn in_degree(&self, id: &str) -> usize {
        self.index.get(id).map_or(0, |idx| {
            self.graph.neighbors_directed(*idx, Direction::Incoming).count()
        })
    }
    
    /// Determine the unique starting node of a run
    ///
    /// Priority: explicit entry; first in-degree-zero trigger; first
    /// in-degree-zero node; first trigger; first node. Definition order
    /// breaks ties.
    pub fn resolve_entry(&self) -> Result<&'a str, WorkflowError> {
        if let Some(explicit) = self.definition.entry.as_deref().filter(|e| !e.is_empty()) {
            return self
                .node(explicit)
                .map(|n| n.id.as_str())
                .ok_or_else(|| WorkflowError::EntryNotFound(explicit.to_string()));
        }
        
        let definition: &'a WorkflowDefinition = self.definition;
        let nodes = &definition.nodes;
        let roots: Vec<&'a NodeSpec> = nodes
            .iter()
            .filter(|n| self.in_degree(&n.id) == 0)
            .collect();
        
        roots
            .iter()
            .find(|n| n.is_trigger())
            .or_else(|| roots.first())
            .copied()
            .or_else(|| nodes.iter().find(|n| n.is_trigger()))
            .or_else(|| nodes.first())
            .map(|n| n.id.as_str())
            .ok_or(WorkflowError::NoNodes)
    }
    
    /// Node ids that can never be visited starting from `entry`
    pub fn unreachable_from(&self, entry: &str) -> Vec<&'a str> {
        let Some(start) = self.index.get(entry) else {
            return Vec::new();
        };
        
        let mut seen = vec![false; self.graph.node_count()];
        let mut dfs = Dfs::new(&self.graph, *start);
        while let Some(idx) = dfs.next(&self.graph) {
            seen[idx.index()] = true;
        }
        
        self.definition
            .nodes
            .iter()
            .filter(|n| {
                self.index
                    .get(n.id.as_str())
                    .is_some_and(|idx| !seen[idx.index()])
            })
            .map(|n| n.id.as_str())
            .collect()
    }
    
    pub fn next_node(&self, current: &str, port: Option<&str>) -> Option<&'a str> {
        choose_next(&self.definition.edges, current, port)
    }
}

/// Select the edge to follow out of `current`
///
/// Prefers the first edge declaring `port`, then the first unlabeled edge,
/// then the first outgoing edge of any kind.
pub fn choose_next<'e>(edges: &'e [Edge], current: &str, port: Option<&str>) -> Option<&'e str> {
    let outgoing: Vec<&Edge> = edges.iter().filter(|e| e.source == current).collect();
    let first = *outgoing.first()?;
    
    if let Some(port) = port {
        if let Some(edge) = outgoing
            .iter()
            .copied()
            .find(|e| e.source_port.as_deref() == Some(port))
        {
            return Some(edge.target.as_str());
        }
    }
    
    if let Some(edge) = outgoing.iter().copied().find(|e| e.port().is_none()) {
        return Some(edge.target.as_str());
    }
    
    // TODO: make this last-resort edge opt-in once editors guarantee an edge per emitted port
    tracing::warn!(
        "No edge from '{}' matches port {:?}; following first outgoing edge to '{}'",
        current,
        port,
        first.target
    );
    Some(first.target.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, node_type: &str) -> NodeSpec {
        NodeSpec::new(id, node_type)
    }

    fn definition(nodes: Vec<NodeSpec>, edges: Vec<Edge>) -> WorkflowDefinition {
        WorkflowDefinition {
            nodes,
            edges,
            entry: None,
        }
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let def = definition(vec![node("a", "x"), node("a", "y")], vec![]);
        let err = ValidatedWorkflow::new(&def).err();
        assert_eq!(err, Some(WorkflowError::DuplicateNodeId("a".to_string())));
    }

    #[test]
    fn test_rejects_missing_id_and_empty_set() {
        let def = definition(vec![node("", "x")], vec![]);
        assert_eq!(ValidatedWorkflow::new(&def).err(), Some(WorkflowError::MissingNodeId));

        let empty = definition(vec![], vec![]);
        assert_eq!(ValidatedWorkflow::new(&empty).err(), Some(WorkflowError::NoNodes));
    }

    #[test]
    fn test_rejects_dangling_edge_target() {
        let def = definition(vec![node("a", "x")], vec![Edge::new("a", "ghost")]);
        assert!(matches!(
            ValidatedWorkflow::new(&def),
            Err(WorkflowError::EdgeTargetNotFound { target, .. }) if target == "ghost"
        ));
    }

    #[test]
    fn test_explicit_entry_must_exist() {
        let def = definition(vec![node("a", "x")], vec![]).with_entry("b");
        let graph = ValidatedWorkflow::new(&def).unwrap();
        assert_eq!(graph.resolve_entry(), Err(WorkflowError::EntryNotFound("b".to_string())));

        let def = definition(vec![node("a", "x"), node("b", "y")], vec![]).with_entry("b");
        let graph = ValidatedWorkflow::new(&def).unwrap();
        assert_eq!(graph.resolve_entry(), Ok("b"));
    }

    #[test]
    fn test_entry_prefers_root_trigger() {
        let def = definition(
            vec![
                node("act", "action.chat"),
                node("hook", "trigger.webhook"),
                node("end", "logic.end"),
            ],
            vec![Edge::new("hook", "end")],
        );
        let graph = ValidatedWorkflow::new(&def).unwrap();
        assert_eq!(graph.resolve_entry(), Ok("hook"));
        // Deterministic across calls
        assert_eq!(graph.resolve_entry(), graph.resolve_entry());
    }

    #[test]
    fn test_empty_explicit_entry_is_ignored() {
        let def = definition(
            vec![node("end", "logic.end"), node("hook", "trigger.webhook")],
            vec![Edge::new("hook", "end")],
        )
        .with_entry("");
        let graph = ValidatedWorkflow::new(&def).unwrap();
        assert_eq!(graph.resolve_entry(), Ok("hook"));
    }

    #[test]
    fn test_entry_falls_back_to_first_root() {
        let def = definition(
            vec![node("b", "action.chat"), node("a", "action.chat")],
            vec![Edge::new("b", "a")],
        );
        let graph = ValidatedWorkflow::new(&def).unwrap();
        assert_eq!(graph.resolve_entry(), Ok("b"));
    }

    #[test]
    fn test_entry_in_cycle_prefers_trigger_then_first() {
        let cyclic = definition(
            vec![node("a", "action.chat"), node("t", "trigger.webhook")],
            vec![Edge::new("a", "t"), Edge::new("t", "a")],
        );
        let graph = ValidatedWorkflow::new(&cyclic).unwrap();
        assert_eq!(graph.resolve_entry(), Ok("t"));

        let plain = definition(
            vec![node("a", "action.chat"), node("b", "action.chat")],
            vec![Edge::new("a", "b"), Edge::new("b", "a")],
        );
        let graph = ValidatedWorkflow::new(&plain).unwrap();
        assert_eq!(graph.resolve_entry(), Ok("a"));
    }

    #[test]
    fn test_choose_next_port_routing() {
        let edges = vec![
            Edge::new("A", "B").with_port("success"),
            Edge::new("A", "C"),
        ];
        assert_eq!(choose_next(&edges, "A", Some("success")), Some("B"));
        assert_eq!(choose_next(&edges, "A", Some("other")), Some("C"));
        assert_eq!(choose_next(&edges, "A", None), Some("C"));
        assert_eq!(choose_next(&edges, "Z", Some("success")), None);
    }

    #[test]
    fn test_choose_next_last_resort() {
        let edges = vec![
            Edge::new("A", "B").with_port("true"),
            Edge::new("A", "C").with_port("false"),
        ];
        assert_eq!(choose_next(&edges, "A", Some("maybe")), Some("B"));
        assert_eq!(choose_next(&edges, "A", Some("false")), Some("C"));
    }

    #[test]
    fn test_empty_port_label_counts_as_unlabeled() {
        let edges = vec![
            Edge::new("A", "B").with_port("x"),
            Edge::new("A", "C").with_port(""),
        ];
        assert_eq!(choose_next(&edges, "A", None), Some("C"));
    }

    #[test]
    fn test_unreachable_nodes() {
        let def = definition(
            vec![node("a", "x"), node("b", "x"), node("c", "x")],
            vec![Edge::new("a", "b")],
        );
        let graph = ValidatedWorkflow::new(&def).unwrap();
        assert_eq!(graph.unreachable_from("a"), vec!["c"]);
    }
}
