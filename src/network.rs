use crate::config::NetworkConfig;
use crate::pledge::Pledge;
use crate::text::escape_xml;
use crate::theme::Theme;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::HashSet;
use std::f32::consts::TAU;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutNode {
    #[serde(flatten)]
    pub pledge: Pledge,
    /// Percent of the container, in [0, 100].
    pub x: f32,
    pub y: f32,
    pub cluster: usize,
    /// Placed on the deterministic ring after rejection sampling gave up.
    pub fallback: bool,
}

impl LayoutNode {
    pub fn id(&self) -> &str {
        self.pledge.key()
    }

    pub fn distance_to(&self, other: &LayoutNode) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    IntraCluster,
    Bridge,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutEdge {
    pub source: String,
    pub target: String,
    pub from: (f32, f32),
    pub to: (f32, f32),
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterCenter {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkLayout {
    pub nodes: Vec<LayoutNode>,
    pub edges: Vec<LayoutEdge>,
    pub clusters: Vec<ClusterCenter>,
    pub fallback_placements: usize,
}

impl NetworkLayout {
    pub fn is_renderable(&self) -> bool {
        self.nodes.len() > 1
    }
}

pub fn cluster_count(n: usize, config: &NetworkConfig) -> usize {
    n.div_ceil(config.pledges_per_cluster.max(1))
        .min(config.max_clusters.max(1))
}

/// Lays out the first `max_nodes` pledges.
pub fn layout_network<R: Rng + ?Sized>(
    pledges: &[Pledge],
    config: &NetworkConfig,
    rng: &mut R,
) -> NetworkLayout {
    let working = &pledges[..pledges.len().min(config.max_nodes)];
    match working {
        [] => return NetworkLayout::default(),
        [only] => {
            return NetworkLayout {
                nodes: vec![LayoutNode {
                    pledge: only.clone(),
                    x: 50.0,
                    y: 50.0,
                    cluster: 0,
                    fallback: false,
                }],
                ..NetworkLayout::default()
            };
        }
        _ => {}
    }

    let n = working.len();
    let k = cluster_count(n, config);
    let clusters = place_clusters(k, config, rng);

    let mut nodes: Vec<LayoutNode> = Vec::with_capacity(n);
    let mut fallback_placements = 0;
    for (index, pledge) in working.iter().enumerate() {
        let cluster = index % k;
        let (x, y, fallback) = match sample_position(&clusters[cluster], &nodes, config, rng) {
            Some((x, y)) => (x, y, false),
            None => {
                fallback_placements += 1;
                let (x, y) = ring_position(index, n, config);
                (x, y, true)
            }
        };
        nodes.push(LayoutNode {
            pledge: pledge.clone(),
            x,
            y,
            cluster,
            fallback,
        });
    }

    let edges = connect(&nodes, config, rng);
    NetworkLayout {
        nodes,
        edges,
        clusters,
        fallback_placements,
    }
}

fn place_clusters<R: Rng + ?Sized>(
    k: usize,
    config: &NetworkConfig,
    rng: &mut R,
) -> Vec<ClusterCenter> {
    (0..k)
        .map(|i| {
            let angle = TAU * i as f32 / k as f32;
            let radius = uniform(rng, config.cluster_radius);
            ClusterCenter {
                x: 50.0 + angle.cos() * radius + jitter(rng, config.cluster_jitter),
                y: 50.0 + angle.sin() * radius + jitter(rng, config.cluster_jitter),
            }
        })
        .collect()
}

/// Rejection sampling around the cluster center; `None` after
/// `max_attempts` candidates all landed too close to a placed node.
fn sample_position<R: Rng + ?Sized>(
    center: &ClusterCenter,
    placed: &[LayoutNode],
    config: &NetworkConfig,
    rng: &mut R,
) -> Option<(f32, f32)> {
    for _ in 0..config.max_attempts {
        let angle = rng.gen_range(0.0..TAU);
        let radius = uniform(rng, config.node_radius);
        let x = clamp_to_container(
            center.x + angle.cos() * radius + jitter(rng, config.node_jitter),
            config,
        );
        let y = clamp_to_container(
            center.y + angle.sin() * radius + jitter(rng, config.node_jitter),
            config,
        );
        let crowded = placed.iter().any(|node| {
            ((node.x - x).powi(2) + (node.y - y).powi(2)).sqrt() < config.min_separation
        });
        if !crowded {
            return Some((x, y));
        }
    }
    None
}

fn ring_position(index: usize, n: usize, config: &NetworkConfig) -> (f32, f32) {
    let angle = TAU * index as f32 / n.max(1) as f32;
    let radius = 20.0 + (index % 3) as f32 * 10.0;
    (
        clamp_to_container(50.0 + angle.cos() * radius, config),
        clamp_to_container(50.0 + angle.sin() * radius, config),
    )
}

fn connect<R: Rng + ?Sized>(
    nodes: &[LayoutNode],
    config: &NetworkConfig,
    rng: &mut R,
) -> Vec<LayoutEdge> {
    let mut seen: HashSet<(usize, usize)> = HashSet::new();
    let mut edges = Vec::new();
    let mut add = |a: usize, b: usize, kind: EdgeKind, edges: &mut Vec<LayoutEdge>| {
        let key = (a.min(b), a.max(b));
        if a == b || !seen.insert(key) {
            return;
        }
        edges.push(LayoutEdge {
            source: nodes[a].id().to_string(),
            target: nodes[b].id().to_string(),
            from: (nodes[a].x, nodes[a].y),
            to: (nodes[b].x, nodes[b].y),
            kind,
        });
    };

    for (i, node) in nodes.iter().enumerate() {
        let same: Vec<usize> = (0..nodes.len())
            .filter(|&j| j != i && nodes[j].cluster == node.cluster)
            .collect();
        let wanted = count_in(rng, config.intra_links).min(same.len());
        for &j in same.choose_multiple(rng, wanted) {
            add(i, j, EdgeKind::IntraCluster, &mut edges);
        }

        if rng.gen_bool(config.bridge_probability.clamp(0.0, 1.0)) {
            let others: Vec<usize> = (0..nodes.len())
                .filter(|&j| nodes[j].cluster != node.cluster)
                .collect();
            let wanted = count_in(rng, config.bridge_links).min(others.len());
            for &j in others.choose_multiple(rng, wanted) {
                add(i, j, EdgeKind::Bridge, &mut edges);
            }
        }
    }
    edges
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (f32, f32)) -> f32 {
    if hi > lo { rng.gen_range(lo..=hi) } else { lo }
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, amount: f32) -> f32 {
    if amount > 0.0 {
        rng.gen_range(-amount..=amount)
    } else {
        0.0
    }
}

fn count_in<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (usize, usize)) -> usize {
    if hi > lo { rng.gen_range(lo..=hi) } else { lo }
}

fn clamp_to_container(value: f32, config: &NetworkConfig) -> f32 {
    let pad = config.padding.clamp(0.0, 50.0);
    value.clamp(pad, 100.0 - pad)
}

pub fn render_network_svg(layout: &NetworkLayout, theme: &Theme, size: f32) -> String {
    let scale = size / 100.0;
    let node_radius = (size * 0.03).max(6.0);
    let font = escape_xml(&theme.font_family);
    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{size}\" height=\"{size}\" viewBox=\"0 0 {size} {size}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.network_background
    ));

    for edge in &layout.edges {
        let (stroke, dash) = match edge.kind {
            EdgeKind::IntraCluster => (theme.intra_edge_color.as_str(), ""),
            EdgeKind::Bridge => (theme.bridge_edge_color.as_str(), " stroke-dasharray=\"4 4\""),
        };
        svg.push_str(&format!(
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{stroke}\" stroke-width=\"1.2\"{dash}/>",
            edge.from.0 * scale,
            edge.from.1 * scale,
            edge.to.0 * scale,
            edge.to.1 * scale,
        ));
    }

    for node in &layout.nodes {
        let cx = node.x * scale;
        let cy = node.y * scale;
        svg.push_str(&format!(
            "<circle cx=\"{cx:.2}\" cy=\"{cy:.2}\" r=\"{node_radius:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"2\"/>",
            theme.cluster_color(node.cluster),
            theme.profile_border_color
        ));
        svg.push_str(&format!(
            "<text x=\"{cx:.2}\" y=\"{:.2}\" text-anchor=\"middle\" font-family=\"{font}\" font-size=\"11\" fill=\"{}\">@{}</text>",
            cy + node_radius + 12.0,
            theme.caption_color,
            escape_xml(&node.pledge.username)
        ));
    }

    svg.push_str("</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pledges(n: usize) -> Vec<Pledge> {
        (0..n)
            .map(|i| Pledge {
                id: Some(format!("id{i}")),
                username: format!("user{i}"),
                message: format!("I, user{i}, hodl"),
                timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap(),
                profile_url: String::new(),
                created_at: None,
                likes: 0,
                is_verified: false,
            })
            .collect()
    }

    #[test]
    fn cluster_count_formula() {
        let config = NetworkConfig::default();
        assert_eq!(cluster_count(3, &config), 1);
        assert_eq!(cluster_count(5, &config), 1);
        assert_eq!(cluster_count(7, &config), 2);
        assert_eq!(cluster_count(20, &config), 4);
        assert_eq!(cluster_count(200, &config), 4);
    }

    #[test]
    fn empty_and_single_inputs() {
        let config = NetworkConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let empty = layout_network(&[], &config, &mut rng);
        assert!(empty.nodes.is_empty() && empty.edges.is_empty());

        let single = layout_network(&pledges(1), &config, &mut rng);
        assert_eq!(single.nodes.len(), 1);
        assert!(single.edges.is_empty());
        assert!(single.clusters.is_empty());
        assert!(!single.is_renderable());
    }

    #[test]
    fn caps_working_set_and_cluster_indices() {
        let config = NetworkConfig::default();
        let mut rng = StdRng::seed_from_u64(9);
        let layout = layout_network(&pledges(35), &config, &mut rng);
        assert_eq!(layout.nodes.len(), 20);
        assert_eq!(layout.clusters.len(), 4);
        for (index, node) in layout.nodes.iter().enumerate() {
            assert_eq!(node.cluster, index % 4);
            assert!((0.0..=100.0).contains(&node.x));
            assert!((0.0..=100.0).contains(&node.y));
        }
    }

    #[test]
    fn same_seed_same_layout() {
        let config = NetworkConfig::default();
        let input = pledges(12);
        let a = layout_network(&input, &config, &mut StdRng::seed_from_u64(42));
        let b = layout_network(&input, &config, &mut StdRng::seed_from_u64(42));
        let pos = |l: &NetworkLayout| l.nodes.iter().map(|n| (n.x, n.y)).collect::<Vec<_>>();
        assert_eq!(pos(&a), pos(&b));
        assert_eq!(a.edges.len(), b.edges.len());
    }

    #[test]
    fn edges_are_unique_unordered_pairs() {
        let config = NetworkConfig::default();
        for seed in 0..25 {
            let layout = layout_network(&pledges(20), &config, &mut StdRng::seed_from_u64(seed));
            let mut pairs = HashSet::new();
            for edge in &layout.edges {
                assert_ne!(edge.source, edge.target);
                let key = if edge.source < edge.target {
                    (edge.source.clone(), edge.target.clone())
                } else {
                    (edge.target.clone(), edge.source.clone())
                };
                assert!(pairs.insert(key), "duplicate edge in seed {seed}");
            }
        }
    }

    #[test]
    fn edge_kinds_match_clusters() {
        let config = NetworkConfig::default();
        let layout = layout_network(&pledges(16), &config, &mut StdRng::seed_from_u64(3));
        let cluster_of = |id: &str| {
            layout
                .nodes
                .iter()
                .find(|n| n.id() == id)
                .map(|n| n.cluster)
                .unwrap()
        };
        for edge in &layout.edges {
            let same = cluster_of(&edge.source) == cluster_of(&edge.target);
            assert_eq!(same, edge.kind == EdgeKind::IntraCluster);
        }
    }

    #[test]
    fn impossible_separation_falls_back_to_ring() {
        let config = NetworkConfig {
            min_separation: 500.0,
            ..NetworkConfig::default()
        };
        let layout = layout_network(&pledges(6), &config, &mut StdRng::seed_from_u64(5));
        // first node always fits, every later one must fall back
        assert!(!layout.nodes[0].fallback);
        assert_eq!(layout.fallback_placements, 5);
        for (index, node) in layout.nodes.iter().enumerate().skip(1) {
            let (x, y) = ring_position(index, 6, &config);
            assert_eq!((node.x, node.y), (x, y));
        }
    }

    #[test]
    fn edge_kind_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&EdgeKind::IntraCluster).unwrap(),
            "\"intra-cluster\""
        );
        assert_eq!(serde_json::to_string(&EdgeKind::Bridge).unwrap(), "\"bridge\"");
    }

    #[test]
    fn svg_contains_every_node() {
        let config = NetworkConfig::default();
        let layout = layout_network(&pledges(4), &config, &mut StdRng::seed_from_u64(8));
        let svg = render_network_svg(&layout, &Theme::succinct(), 600.0);
        assert_eq!(svg.matches("<circle").count(), 4);
        assert_eq!(svg.matches("<line").count(), layout.edges.len());
        assert!(svg.contains("@user3"));
    }
}
