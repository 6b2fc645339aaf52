use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::topology::{
    CLUSTER_NAMESPACE, Edge, EdgeKind, GraphModel, NodeKind, RiskSnapshot, Subgraph,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Service,
    Anomaly,
    Full,
}

impl ViewMode {
    pub const ALL: [Self; 3] = [Self::Service, Self::Anomaly, Self::Full];

    pub fn label(self) -> &'static str {
        match self {
            Self::Service => "Service map",
            Self::Anomaly => "Anomaly focus",
            Self::Full => "Full topology",
        }
    }

    pub fn uses_namespace_filter(self) -> bool {
        self == Self::Full
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Service => "service",
            Self::Anomaly => "anomaly",
            Self::Full => "full",
        };
        f.write_str(name)
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "service" => Ok(Self::Service),
            "anomaly" => Ok(Self::Anomaly),
            "full" => Ok(Self::Full),
            other => Err(format!(
                "unknown view mode `{other}` (expected service, anomaly or full)"
            )),
        }
    }
}

pub type NamespaceFilter = BTreeSet<String>;

pub fn project(
    graph: &GraphModel,
    risk: &RiskSnapshot,
    mode: ViewMode,
    filter: &NamespaceFilter,
) -> Subgraph {
    let keep = match mode {
        ViewMode::Service => service_nodes(graph),
        ViewMode::Anomaly => anomaly_nodes(graph, risk),
        ViewMode::Full if filter.is_empty() => {
            graph.nodes().map(|node| node.key.as_str()).collect()
        }
        ViewMode::Full => namespace_nodes(graph, filter),
    };

    let edge_allowed = |edge: &Edge| match mode {
        ViewMode::Service => matches!(edge.kind, EdgeKind::Calls | EdgeKind::RoutesTo),
        ViewMode::Anomaly | ViewMode::Full => true,
    };

    let nodes = graph
        .nodes()
        .filter(|node| keep.contains(node.key.as_str()))
        .cloned()
        .collect();

    let mut seen = HashSet::new();
    let edges = graph
        .edges()
        .iter()
        .filter(|edge| {
            edge_allowed(*edge)
                && keep.contains(edge.from.as_str())
                && keep.contains(edge.to.as_str())
        })
        .filter(|edge| seen.insert(*edge))
        .cloned()
        .collect();

    Subgraph { nodes, edges }
}

fn service_nodes(graph: &GraphModel) -> HashSet<&str> {
    graph
        .nodes()
        .filter(|node| matches!(node.kind, NodeKind::Service | NodeKind::Ingress))
        .map(|node| node.key.as_str())
        .collect()
}

fn anomaly_nodes<'a>(graph: &'a GraphModel, risk: &RiskSnapshot) -> HashSet<&'a str> {
    let seeds = graph
        .nodes()
        .filter(|node| risk.is_anomalous(&node.key))
        .map(|node| node.key.as_str())
        .collect::<HashSet<_>>();
    if seeds.is_empty() {
        return seeds;
    }

    let mut expanded = seeds.clone();
    for edge in graph.valid_edges() {
        if seeds.contains(edge.from.as_str()) {
            expanded.insert(edge.to.as_str());
        }
        if seeds.contains(edge.to.as_str()) {
            expanded.insert(edge.from.as_str());
        }
    }
    expanded
}

fn namespace_nodes<'a>(graph: &'a GraphModel, filter: &NamespaceFilter) -> HashSet<&'a str> {
    let workload = graph
        .nodes()
        .filter(|node| filter.contains(&node.namespace))
        .map(|node| node.key.as_str())
        .collect::<HashSet<_>>();

    let mut kept = workload.clone();
    for edge in graph.valid_edges() {
        for (near, far) in [(&edge.from, &edge.to), (&edge.to, &edge.from)] {
            if !workload.contains(near.as_str()) {
                continue;
            }
            if let Some(node) = graph.node(far)
                && node.is_infrastructure()
            {
                kept.insert(node.key.as_str());
            }
        }
    }
    kept
}

pub fn namespaces(graph: &GraphModel) -> Vec<String> {
    graph
        .nodes()
        .filter(|node| !node.namespace.is_empty() && node.namespace != CLUSTER_NAMESPACE)
        .map(|node| node.namespace.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::topology::Node;

    fn scenario() -> (GraphModel, RiskSnapshot) {
        let graph = GraphModel::new(
            [
                Node::new("svcA", NodeKind::Service, "svc-a", "shop"),
                Node::new("svcB", NodeKind::Service, "svc-b", "shop"),
                Node::new("podA", NodeKind::Pod, "pod-a", "shop"),
                Node::new("ingressX", NodeKind::Ingress, "ingress-x", "edge"),
            ],
            vec![
                Edge::new("ingressX", "svcA", EdgeKind::RoutesTo),
                Edge::new("svcA", "svcB", EdgeKind::Calls),
                Edge::new("svcB", "podA", EdgeKind::ScheduledOn),
            ],
        );
        let risk = [("svcB".to_owned(), 85.0)].into_iter().collect();
        (graph, risk)
    }

    fn keys(subgraph: &Subgraph) -> Vec<&str> {
        subgraph.node_keys().collect()
    }

    #[test]
    fn anomaly_view_expands_one_hop() {
        let (graph, risk) = scenario();
        let view = project(&graph, &risk, ViewMode::Anomaly, &NamespaceFilter::new());

        assert_eq!(keys(&view), vec!["podA", "svcA", "svcB"]);
        assert_eq!(view.edges.len(), 2);
    }

    #[test]
    fn service_view_drops_pods_and_scheduling_edges() {
        let (graph, risk) = scenario();
        let view = project(&graph, &risk, ViewMode::Service, &NamespaceFilter::new());

        assert_eq!(keys(&view), vec!["ingressX", "svcA", "svcB"]);
        assert_eq!(
            view.edges,
            vec![
                Edge::new("ingressX", "svcA", EdgeKind::RoutesTo),
                Edge::new("svcA", "svcB", EdgeKind::Calls),
            ]
        );
    }

    #[test]
    fn anomaly_view_without_risk_is_empty() {
        let (graph, _) = scenario();
        let view = project(
            &graph,
            &RiskSnapshot::default(),
            ViewMode::Anomaly,
            &NamespaceFilter::new(),
        );
        assert!(view.is_empty());
        assert!(view.edges.is_empty());
    }

    #[test]
    fn risk_for_unknown_keys_does_not_seed() {
        let (graph, _) = scenario();
        let risk: RiskSnapshot = [("ghost".to_owned(), 99.0)].into_iter().collect();
        let view = project(&graph, &risk, ViewMode::Anomaly, &NamespaceFilter::new());
        assert!(view.is_empty());
    }

    #[test]
    fn full_view_keeps_adjacent_cluster_nodes() {
        let graph = GraphModel::new(
            [
                Node::new("svc:a", NodeKind::Service, "a", "team-a"),
                Node::new("pod:a", NodeKind::Pod, "a-1", "team-a"),
                Node::new("svc:b", NodeKind::Service, "b", "team-b"),
                Node::new("node:w1", NodeKind::PhysicalNode, "w1", CLUSTER_NAMESPACE),
                Node::new("node:w2", NodeKind::PhysicalNode, "w2", CLUSTER_NAMESPACE),
            ],
            vec![
                Edge::new("svc:a", "pod:a", EdgeKind::Other),
                Edge::new("pod:a", "node:w1", EdgeKind::ScheduledOn),
                Edge::new("svc:b", "node:w2", EdgeKind::ScheduledOn),
                Edge::new("svc:a", "svc:b", EdgeKind::Calls),
                Edge::new("pod:a", "node:missing", EdgeKind::ScheduledOn),
            ],
        );
        let filter = NamespaceFilter::from(["team-a".to_owned()]);
        let view = project(&graph, &RiskSnapshot::default(), ViewMode::Full, &filter);

        assert_eq!(keys(&view), vec!["node:w1", "pod:a", "svc:a"]);
        assert_eq!(view.edges.len(), 2);
    }

    #[test]
    fn full_view_without_filter_is_identity_minus_dangling_edges() {
        let (mut graph, risk) = scenario();
        let mut edges = graph.edges().to_vec();
        edges.push(Edge::new("svcA", "nowhere", EdgeKind::Calls));
        edges.push(Edge::new("svcA", "svcB", EdgeKind::Calls));
        graph = GraphModel::new(graph.nodes().cloned().collect::<Vec<_>>(), edges);

        let view = project(&graph, &risk, ViewMode::Full, &NamespaceFilter::new());
        assert_eq!(view.nodes.len(), 4);
        assert_eq!(view.edges.len(), 3);
    }

    #[test]
    fn namespaces_skip_cluster_scope() {
        let graph = GraphModel::new(
            [
                Node::new("a", NodeKind::Service, "a", "zeta"),
                Node::new("b", NodeKind::Service, "b", "alpha"),
                Node::new("c", NodeKind::PhysicalNode, "c", CLUSTER_NAMESPACE),
            ],
            Vec::new(),
        );
        assert_eq!(namespaces(&graph), vec!["alpha", "zeta"]);
    }

    #[test]
    fn view_mode_parses_from_cli_names() {
        assert_eq!("Anomaly".parse::<ViewMode>(), Ok(ViewMode::Anomaly));
        assert!("topology".parse::<ViewMode>().is_err());
        assert_eq!(ViewMode::Full.to_string(), "full");
    }
}
