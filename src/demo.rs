use crate::risk::RiskTier;
use crate::source::Snapshot;
use crate::topology::{
    CLUSTER_NAMESPACE, Edge, EdgeKind, EntityRisk, GraphModel, Node, NodeKind, RiskLevel,
    RiskSnapshot,
};
use crate::util::stable_pair;

const WORKERS: usize = 4;
const PODS_PER_SERVICE: usize = 2;
const TICKS_PER_PHASE: u64 = 4;

struct Namespace {
    name: &'static str,
    services: [&'static str; 3],
    ingress_to: Option<&'static str>,
}

const NAMESPACES: [Namespace; 3] = [
    Namespace {
        name: "storefront",
        services: ["web", "cart", "checkout"],
        ingress_to: Some("web"),
    },
    Namespace {
        name: "payments",
        services: ["gateway", "ledger", "fraud"],
        ingress_to: None,
    },
    Namespace {
        name: "identity",
        services: ["auth", "profile", "session"],
        ingress_to: Some("auth"),
    },
];

const CALLS: [(&str, &str); 10] = [
    ("storefront/web", "storefront/cart"),
    ("storefront/web", "storefront/checkout"),
    ("storefront/web", "identity/auth"),
    ("storefront/cart", "identity/session"),
    ("storefront/checkout", "payments/gateway"),
    ("storefront/checkout", "identity/session"),
    ("payments/gateway", "payments/ledger"),
    ("payments/gateway", "payments/fraud"),
    ("identity/auth", "identity/profile"),
    ("identity/auth", "identity/session"),
];

fn service_key(qualified: &str) -> String {
    format!("svc:{qualified}")
}

fn worker_key(index: usize) -> String {
    format!("node:worker-{}", index + 1)
}

pub fn demo_snapshot(seed: u64, tick: u64) -> Snapshot {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    for index in 0..WORKERS {
        nodes.push(Node::new(
            worker_key(index),
            NodeKind::PhysicalNode,
            format!("worker-{}", index + 1),
            CLUSTER_NAMESPACE,
        ));
    }

    let mut placement = (seed % WORKERS as u64) as usize;
    for namespace in &NAMESPACES {
        if let Some(target) = namespace.ingress_to {
            let key = format!("ingress:{}", namespace.name);
            nodes.push(Node::new(
                key.clone(),
                NodeKind::Ingress,
                format!("{}-ingress", namespace.name),
                namespace.name,
            ));
            edges.push(Edge::new(
                key,
                service_key(&format!("{}/{target}", namespace.name)),
                EdgeKind::RoutesTo,
            ));
        }

        for service in namespace.services {
            let qualified = format!("{}/{service}", namespace.name);
            let svc_key = service_key(&qualified);
            nodes.push(Node::new(
                svc_key.clone(),
                NodeKind::Service,
                service,
                namespace.name,
            ));

            for replica in 0..PODS_PER_SERVICE {
                let pod_key = format!("pod:{qualified}-{replica}");
                nodes.push(Node::new(
                    pod_key.clone(),
                    NodeKind::Pod,
                    format!("{service}-{replica}"),
                    namespace.name,
                ));
                edges.push(Edge::new(svc_key.clone(), pod_key.clone(), EdgeKind::ScheduledOn));
                edges.push(Edge::new(
                    pod_key,
                    worker_key(placement % WORKERS),
                    EdgeKind::ScheduledOn,
                ));
                placement += 1;
            }
        }
    }

    for (from, to) in CALLS {
        edges.push(Edge::new(service_key(from), service_key(to), EdgeKind::Calls));
    }

    let graph = GraphModel::new(nodes, edges);
    let risk = demo_risk(&graph, seed, tick / TICKS_PER_PHASE);
    Snapshot { graph, risk }
}

fn demo_risk(graph: &GraphModel, seed: u64, phase: u64) -> RiskSnapshot {
    let services = graph
        .nodes()
        .filter(|node| node.kind == NodeKind::Service)
        .map(|node| node.key.as_str())
        .collect::<Vec<_>>();
    let hotspot = services
        .get((seed.wrapping_add(phase) % services.len().max(1) as u64) as usize)
        .copied();

    let entities = graph.nodes().filter_map(|node| {
        let (roll, spread) = stable_pair(&format!("{}#{seed}#{phase}", node.key));
        let score = if Some(node.key.as_str()) == hotspot {
            88.0 + f64::from(spread) * 6.0
        } else if roll > 0.75 {
            f64::from((roll - 0.75) * 4.0 * 70.0) + 5.0
        } else {
            return None;
        };
        Some(EntityRisk {
            entity_key: node.key.clone(),
            r_final: score,
            risk_level: level_for(score),
        })
    });
    RiskSnapshot::from_entities(entities.collect::<Vec<_>>())
}

fn level_for(score: f64) -> RiskLevel {
    RiskTier::from_score(score).into()
}
