use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

pub type NodeKey = String;

pub const CLUSTER_NAMESPACE: &str = "_cluster";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Service,
    Pod,
    #[serde(alias = "node", alias = "physical_node")]
    PhysicalNode,
    Ingress,
}

impl NodeKind {
    pub const ALL: [Self; 4] = [Self::Service, Self::Pod, Self::PhysicalNode, Self::Ingress];

    pub fn label(self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Pod => "pod",
            Self::PhysicalNode => "physical node",
            Self::Ingress => "ingress",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Calls,
    RoutesTo,
    ScheduledOn,
    #[serde(other)]
    Other,
}

impl EdgeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Calls => "calls",
            Self::RoutesTo => "routes_to",
            Self::ScheduledOn => "scheduled_on",
            Self::Other => "other",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub key: NodeKey,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

impl Node {
    pub fn new(
        key: impl Into<NodeKey>,
        kind: NodeKind,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            kind,
            name: name.into(),
            namespace: namespace.into(),
        }
    }

    pub fn is_infrastructure(&self) -> bool {
        self.kind == NodeKind::PhysicalNode || self.namespace == CLUSTER_NAMESPACE
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeKey,
    pub to: NodeKey,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(from: impl Into<NodeKey>, to: impl Into<NodeKey>, kind: EdgeKind) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
        }
    }

    pub fn touches(&self, key: &str) -> bool {
        self.from == key || self.to == key
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphModel {
    #[serde(default)]
    nodes: BTreeMap<NodeKey, Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

impl GraphModel {
    pub fn new(nodes: impl IntoIterator<Item = Node>, edges: Vec<Edge>) -> Self {
        let nodes = nodes
            .into_iter()
            .map(|node| (node.key.clone(), node))
            .collect();
        Self { nodes, edges }
    }

    pub fn from_keyed(nodes: BTreeMap<NodeKey, Node>, edges: Vec<Edge>) -> Self {
        let nodes = nodes
            .into_iter()
            .map(|(key, mut node)| {
                node.key.clone_from(&key);
                (key, node)
            })
            .collect();
        Self { nodes, edges }
    }

    pub fn node(&self, key: &str) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn valid_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges
            .iter()
            .filter(|edge| self.contains(&edge.from) && self.contains(&edge.to))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
    #[default]
    #[serde(other)]
    None,
}

impl RiskLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::None => "none",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityRisk {
    pub entity_key: NodeKey,
    #[serde(default)]
    pub r_final: f64,
    #[serde(default)]
    pub risk_level: RiskLevel,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RiskSnapshot {
    scores: HashMap<NodeKey, f64>,
    levels: HashMap<NodeKey, RiskLevel>,
}

impl RiskSnapshot {
    pub fn from_entities(entities: impl IntoIterator<Item = EntityRisk>) -> Self {
        let mut snapshot = Self::default();
        for entity in entities {
            let score = if entity.r_final.is_finite() {
                entity.r_final
            } else {
                0.0
            };
            let entry = snapshot
                .scores
                .entry(entity.entity_key.clone())
                .or_insert(score);
            if score >= *entry {
                *entry = score;
                snapshot.levels.insert(entity.entity_key, entity.risk_level);
            }
        }
        snapshot
    }

    pub fn r_final(&self, key: &str) -> f64 {
        self.scores.get(key).copied().unwrap_or(0.0)
    }

    pub fn level(&self, key: &str) -> RiskLevel {
        self.levels.get(key).copied().unwrap_or_default()
    }

    pub fn is_anomalous(&self, key: &str) -> bool {
        self.r_final(key) > 0.0
    }

    pub fn anomalous_keys(&self) -> impl Iterator<Item = &NodeKey> {
        self.scores
            .iter()
            .filter(|(_, score)| **score > 0.0)
            .map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

impl FromIterator<(NodeKey, f64)> for RiskSnapshot {
    fn from_iter<T: IntoIterator<Item = (NodeKey, f64)>>(iter: T) -> Self {
        Self::from_entities(iter.into_iter().map(|(entity_key, r_final)| EntityRisk {
            entity_key,
            r_final,
            risk_level: RiskLevel::None,
        }))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Subgraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Subgraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.nodes.iter().any(|node| node.key == key)
    }

    pub fn node_keys(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|node| node.key.as_str())
    }
}
