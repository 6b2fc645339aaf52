use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::demo::demo_snapshot;
use crate::topology::{Edge, EntityRisk, GraphModel, Node, NodeKey, RiskSnapshot};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid snapshot JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub graph: GraphModel,
    pub risk: RiskSnapshot,
}

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    nodes: BTreeMap<NodeKey, Node>,
    #[serde(default)]
    edges: Vec<Edge>,
    #[serde(default)]
    risks: Vec<EntityRisk>,
}

pub fn parse_snapshot(raw: &str) -> Result<Snapshot, serde_json::Error> {
    let file: SnapshotFile = serde_json::from_str(raw)?;
    Ok(Snapshot {
        graph: GraphModel::from_keyed(file.nodes, file.edges),
        risk: RiskSnapshot::from_entities(file.risks),
    })
}

pub fn parse_risks(raw: &str) -> Result<RiskSnapshot, serde_json::Error> {
    let entities: Vec<EntityRisk> = serde_json::from_str(raw)?;
    Ok(RiskSnapshot::from_entities(entities))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotSource {
    File { graph: PathBuf, risk: Option<PathBuf> },
    Demo { seed: u64 },
}

impl SnapshotSource {
    pub fn describe(&self) -> String {
        match self {
            Self::File { graph, .. } => graph.display().to_string(),
            Self::Demo { seed } => format!("demo topology (seed {seed})"),
        }
    }

    pub fn fetch(&self, tick: u64) -> Result<Snapshot, SourceError> {
        match self {
            Self::Demo { seed } => Ok(demo_snapshot(*seed, tick)),
            Self::File { graph, risk } => {
                let mut snapshot =
                    parse_snapshot(&read(graph)?).map_err(|source| SourceError::Parse {
                        path: graph.clone(),
                        source,
                    })?;
                if let Some(path) = risk {
                    snapshot.risk = parse_risks(&read(path)?).map_err(|source| SourceError::Parse {
                        path: path.clone(),
                        source,
                    })?;
                }
                Ok(snapshot)
            }
        }
    }
}

fn read(path: &Path) -> Result<String, SourceError> {
    fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn spawn_poller(
    source: SnapshotSource,
    interval: Duration,
) -> Receiver<Result<Snapshot, String>> {
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for tick in 0.. {
            let result = source.fetch(tick).map_err(|error| {
                warn!(%error, "snapshot poll failed");
                error.to_string()
            });
            if let Ok(snapshot) = &result {
                debug!(
                    tick,
                    nodes = snapshot.graph.node_count(),
                    edges = snapshot.graph.edges().len(),
                    risks = snapshot.risk.len(),
                    "snapshot polled"
                );
            }
            if tx.send(result).is_err() {
                break;
            }
            thread::sleep(interval);
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::topology::{EdgeKind, NodeKind, RiskLevel};

    const SNAPSHOT: &str = r#"{
        "nodes": {
            "svc:checkout": {
                "key": "svc:checkout", "type": "service", "name": "checkout", "namespace": "shop"
            },
            "pod:checkout-1": {
                "key": "stale", "type": "pod", "name": "checkout-1", "namespace": "shop"
            },
            "node:w1": { "key": "node:w1", "type": "node", "name": "w1", "namespace": "_cluster" }
        },
        "edges": [
            { "from": "svc:checkout", "to": "pod:checkout-1", "type": "scheduled_on" },
            { "from": "pod:checkout-1", "to": "node:w1", "type": "scheduled_on" },
            { "from": "svc:checkout", "to": "svc:cart", "type": "grpc" }
        ],
        "risks": [
            { "entityKey": "svc:checkout", "rFinal": 85.0, "riskLevel": "critical" },
            { "entityKey": "pod:checkout-1", "rFinal": 12.5 }
        ]
    }"#;

    #[test]
    fn parses_snapshot_files() {
        let snapshot = parse_snapshot(SNAPSHOT).unwrap();

        assert_eq!(snapshot.graph.node_count(), 3);
        assert_eq!(
            snapshot.graph.node("pod:checkout-1").map(|node| node.kind),
            Some(NodeKind::Pod)
        );
        assert_eq!(
            snapshot.graph.node("node:w1").map(|node| node.kind),
            Some(NodeKind::PhysicalNode)
        );
        assert_eq!(snapshot.graph.edges()[2].kind, EdgeKind::Other);
        assert_eq!(snapshot.graph.valid_edges().count(), 2);
        assert_eq!(snapshot.risk.r_final("svc:checkout"), 85.0);
        assert_eq!(snapshot.risk.level("svc:checkout"), RiskLevel::Critical);
        assert_eq!(snapshot.risk.level("pod:checkout-1"), RiskLevel::None);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let snapshot = parse_snapshot("{}").unwrap();
        assert!(snapshot.graph.is_empty());
        assert!(snapshot.risk.is_empty());
    }

    #[test]
    fn file_source_reports_typed_errors() {
        let dir = std::env::temp_dir().join(format!("topology-lens-source-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let broken = dir.join("broken.json");
        fs::write(&broken, "{ not json").unwrap();

        let missing = SnapshotSource::File {
            graph: dir.join("missing.json"),
            risk: None,
        };
        assert!(matches!(missing.fetch(0), Err(SourceError::Io { .. })));

        let invalid = SnapshotSource::File {
            graph: broken.clone(),
            risk: None,
        };
        let error = invalid.fetch(0).unwrap_err();
        assert!(matches!(error, SourceError::Parse { ref path, .. } if *path == broken));
        assert!(error.to_string().contains("broken.json"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn risk_file_overrides_embedded_risks() {
        let dir = std::env::temp_dir().join(format!("topology-lens-risk-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let graph = dir.join("graph.json");
        let risk = dir.join("risk.json");
        fs::write(&graph, SNAPSHOT).unwrap();
        fs::write(&risk, r#"[{ "entityKey": "node:w1", "rFinal": 40.0, "riskLevel": "medium" }]"#)
            .unwrap();

        let source = SnapshotSource::File {
            graph,
            risk: Some(risk),
        };
        let snapshot = source.fetch(3).unwrap();
        assert_eq!(snapshot.risk.len(), 1);
        assert_eq!(snapshot.risk.r_final("node:w1"), 40.0);
        assert_eq!(snapshot.risk.r_final("svc:checkout"), 0.0);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn poller_delivers_demo_snapshots() {
        let rx = spawn_poller(SnapshotSource::Demo { seed: 7 }, Duration::from_millis(1));
        let first = rx.recv().unwrap().unwrap();
        let second = rx.recv().unwrap().unwrap();

        assert_eq!(first.graph, second.graph);
        assert!(!first.graph.is_empty());
    }
}
