use eframe::egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Shape, Stroke, Vec2, pos2, vec2};

use crate::interaction::Viewport;
use crate::layout::LayoutGraph;
use crate::topology::{EdgeKind, NodeKind};
use crate::util::short_label;

const SQRT_3: f32 = 1.732_050_8;
const LABEL_MAX_CHARS: usize = 22;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeShape {
    Circle,
    Square,
    Diamond,
    Hexagon,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NodeStyle {
    pub shape: NodeShape,
    pub radius: f32,
}

impl NodeStyle {
    pub const fn for_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Service => Self {
                shape: NodeShape::Circle,
                radius: 18.0,
            },
            NodeKind::Pod => Self {
                shape: NodeShape::Square,
                radius: 11.0,
            },
            NodeKind::Ingress => Self {
                shape: NodeShape::Diamond,
                radius: 13.0,
            },
            NodeKind::PhysicalNode => Self {
                shape: NodeShape::Hexagon,
                radius: 21.0,
            },
        }
    }
}

impl NodeShape {
    pub fn contains(self, offset: Vec2, radius: f32) -> bool {
        let ax = offset.x.abs();
        let ay = offset.y.abs();
        match self {
            Self::Circle => offset.length_sq() <= radius * radius,
            Self::Square => ax <= radius && ay <= radius,
            Self::Diamond => ax + ay <= radius,
            // Pointy-top regular hexagon with circumradius `radius`.
            Self::Hexagon => ax <= radius * SQRT_3 * 0.5 && ay <= radius - ax / SQRT_3,
        }
    }

    pub fn vertices(self, center: Pos2, radius: f32) -> Vec<Pos2> {
        match self {
            Self::Circle => Vec::new(),
            Self::Square => vec![
                center + vec2(-radius, -radius),
                center + vec2(radius, -radius),
                center + vec2(radius, radius),
                center + vec2(-radius, radius),
            ],
            Self::Diamond => vec![
                center + vec2(0.0, -radius),
                center + vec2(radius, 0.0),
                center + vec2(0.0, radius),
                center + vec2(-radius, 0.0),
            ],
            Self::Hexagon => (0..6)
                .map(|corner| {
                    let angle =
                        std::f32::consts::FRAC_PI_2 + corner as f32 * std::f32::consts::FRAC_PI_3;
                    center + vec2(angle.cos(), angle.sin()) * radius
                })
                .collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeStyle {
    pub width: f32,
    pub color: Color32,
    pub dashed: bool,
    pub arrow_size: f32,
}

impl EdgeStyle {
    pub fn for_edge(kind: EdgeKind, anomalous: bool) -> Self {
        if anomalous {
            return Self {
                width: 2.4,
                color: Color32::from_rgb(229, 62, 62),
                dashed: false,
                arrow_size: 10.0,
            };
        }

        match kind {
            EdgeKind::Calls => Self {
                width: 1.4,
                color: Color32::from_rgb(150, 162, 178),
                dashed: false,
                arrow_size: 7.0,
            },
            EdgeKind::RoutesTo => Self {
                width: 1.4,
                color: Color32::from_rgb(120, 180, 230),
                dashed: true,
                arrow_size: 7.0,
            },
            EdgeKind::ScheduledOn => Self {
                width: 0.9,
                color: Color32::from_rgba_unmultiplied(120, 128, 140, 170),
                dashed: true,
                arrow_size: 5.0,
            },
            EdgeKind::Other => Self {
                width: 1.0,
                color: Color32::from_rgb(110, 116, 126),
                dashed: false,
                arrow_size: 6.0,
            },
        }
    }
}

/// Trims the centre-to-centre segment so it starts and ends on each node's radius.
///
/// Returns `None` when the nodes overlap and there is no visible segment left.
pub fn edge_endpoints(
    from: Pos2,
    from_radius: f32,
    to: Pos2,
    to_radius: f32,
) -> Option<(Pos2, Pos2)> {
    let delta = to - from;
    let distance = delta.length();
    if distance <= from_radius + to_radius {
        return None;
    }

    let direction = delta / distance;
    Some((from + direction * from_radius, to - direction * to_radius))
}

pub fn arrowhead(tip: Pos2, direction: Vec2, size: f32) -> [Pos2; 3] {
    let direction = if direction.length_sq() > 0.0 {
        direction.normalized()
    } else {
        Vec2::X
    };
    let normal = direction.rot90();
    let base = tip - direction * size;
    [tip, base + normal * (size * 0.5), base - normal * (size * 0.5)]
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgePrimitive {
    pub start: Pos2,
    pub end: Pos2,
    pub arrow: [Pos2; 3],
    pub style: EdgeStyle,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodePrimitive {
    pub index: usize,
    pub center: Pos2,
    pub radius: f32,
    pub shape: NodeShape,
    pub fill: Color32,
    pub label: String,
    pub selected: bool,
    pub hovered: bool,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    pub edges: Vec<EdgePrimitive>,
    pub nodes: Vec<NodePrimitive>,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FrameOptions<'a> {
    pub selected: Option<&'a str>,
    pub hovered: Option<usize>,
    pub show_labels: bool,
}

pub fn build_frame(
    graph: &LayoutGraph,
    viewport: &Viewport,
    screen: Rect,
    options: FrameOptions<'_>,
) -> Frame {
    let scale = viewport.scale(screen);
    let centers = graph
        .nodes()
        .iter()
        .map(|node| viewport.model_to_screen(screen, node.pos))
        .collect::<Vec<_>>();
    let radii = graph
        .nodes()
        .iter()
        .map(|node| node.radius * scale)
        .collect::<Vec<_>>();

    let mut frame = Frame::default();
    for edge in graph.edges() {
        let (Some(&from), Some(&to)) = (centers.get(edge.from), centers.get(edge.to)) else {
            continue;
        };
        let Some((start, end)) = edge_endpoints(from, radii[edge.from], to, radii[edge.to]) else {
            continue;
        };
        let style = EdgeStyle::for_edge(edge.kind, edge.anomalous);
        let arrow_size = (style.arrow_size * scale.sqrt()).clamp(3.0, 16.0);
        frame.edges.push(EdgePrimitive {
            start,
            end,
            arrow: arrowhead(end, end - start, arrow_size),
            style,
        });
    }

    for (index, node) in graph.nodes().iter().enumerate() {
        let center = centers[index];
        let radius = radii[index];
        if !shape_visible(screen, center, radius) {
            continue;
        }

        let selected = options.selected == Some(node.key.as_str());
        let hovered = options.hovered == Some(index);
        let label = if options.show_labels || selected || hovered {
            short_label(&node.name, LABEL_MAX_CHARS)
        } else {
            String::new()
        };

        frame.nodes.push(NodePrimitive {
            index,
            center,
            radius,
            shape: NodeStyle::for_kind(node.kind).shape,
            fill: node.color,
            label,
            selected,
            hovered,
        });
    }

    frame
}

fn blend_color(base: Color32, overlay: Color32, amount: f32) -> Color32 {
    let amount = amount.clamp(0.0, 1.0);
    let inverse = 1.0 - amount;

    Color32::from_rgba_unmultiplied(
        ((base.r() as f32 * inverse) + (overlay.r() as f32 * amount)) as u8,
        ((base.g() as f32 * inverse) + (overlay.g() as f32 * amount)) as u8,
        ((base.b() as f32 * inverse) + (overlay.b() as f32 * amount)) as u8,
        ((base.a() as f32 * inverse) + (overlay.a() as f32 * amount)) as u8,
    )
}

fn shape_visible(rect: Rect, position: Pos2, radius: f32) -> bool {
    !(position.x + radius < rect.left()
        || position.x - radius > rect.right()
        || position.y + radius < rect.top()
        || position.y - radius > rect.bottom())
}

pub fn draw_background(painter: &Painter, rect: Rect, viewport: &Viewport) {
    painter.rect_filled(rect, 0.0, Color32::from_rgb(19, 23, 29));

    let step = (60.0 * viewport.scale(rect)).clamp(20.0, 160.0);
    let origin = viewport.model_to_screen(rect, Vec2::ZERO);
    let stroke = Stroke::new(1.0, Color32::from_rgba_unmultiplied(60, 70, 80, 70));

    let mut x = rect.left() + (origin.x - rect.left()).rem_euclid(step);
    while x < rect.right() {
        painter.line_segment([pos2(x, rect.top()), pos2(x, rect.bottom())], stroke);
        x += step;
    }

    let mut y = rect.top() + (origin.y - rect.top()).rem_euclid(step);
    while y < rect.bottom() {
        painter.line_segment([pos2(rect.left(), y), pos2(rect.right(), y)], stroke);
        y += step;
    }
}

pub fn paint(painter: &Painter, frame: &Frame) {
    for edge in &frame.edges {
        let stroke = Stroke::new(edge.style.width, edge.style.color);
        if edge.style.dashed {
            painter.extend(Shape::dashed_line(&[edge.start, edge.end], stroke, 6.0, 4.0));
        } else {
            painter.line_segment([edge.start, edge.end], stroke);
        }
        painter.add(Shape::convex_polygon(
            edge.arrow.to_vec(),
            edge.style.color,
            Stroke::NONE,
        ));
    }

    let outline = Stroke::new(1.2, Color32::from_rgba_unmultiplied(15, 15, 15, 200));
    let highlight = Color32::from_rgb(245, 206, 93);
    for node in &frame.nodes {
        let fill = if node.hovered {
            blend_color(node.fill, Color32::WHITE, 0.25)
        } else {
            node.fill
        };

        match node.shape {
            NodeShape::Circle => {
                painter.circle_filled(node.center, node.radius, fill);
                painter.circle_stroke(node.center, node.radius, outline);
            }
            shape => {
                painter.add(Shape::convex_polygon(
                    shape.vertices(node.center, node.radius),
                    fill,
                    outline,
                ));
            }
        }

        if node.selected {
            painter.circle_stroke(
                node.center,
                node.radius + 5.0,
                Stroke::new(2.2, highlight),
            );
        }

        if !node.label.is_empty() {
            painter.text(
                node.center + vec2(0.0, node.radius + 4.0),
                Align2::CENTER_TOP,
                &node.label,
                FontId::proportional(12.0),
                Color32::from_gray(232),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn larger_shapes_for_services_and_physical_nodes() {
        let service = NodeStyle::for_kind(NodeKind::Service).radius;
        let physical = NodeStyle::for_kind(NodeKind::PhysicalNode).radius;
        for small in [NodeKind::Pod, NodeKind::Ingress] {
            let radius = NodeStyle::for_kind(small).radius;
            assert!(radius < service && radius < physical);
        }
    }

    #[test]
    fn shape_containment_follows_geometry() {
        let r = 10.0;
        assert!(NodeShape::Circle.contains(vec2(6.0, 7.9), r));
        assert!(!NodeShape::Circle.contains(vec2(8.0, 8.0), r));

        assert!(NodeShape::Square.contains(vec2(9.5, -9.5), r));
        assert!(!NodeShape::Square.contains(vec2(10.5, 0.0), r));

        assert!(NodeShape::Diamond.contains(vec2(5.0, 4.9), r));
        assert!(!NodeShape::Diamond.contains(vec2(6.0, 6.0), r));

        assert!(NodeShape::Hexagon.contains(vec2(0.0, 9.9), r));
        assert!(NodeShape::Hexagon.contains(vec2(8.6, 0.0), r));
        assert!(!NodeShape::Hexagon.contains(vec2(8.8, 0.0), r));
        assert!(!NodeShape::Hexagon.contains(vec2(8.0, 6.0), r));
    }

    #[test]
    fn hexagon_vertices_lie_on_the_boundary() {
        let center = pos2(40.0, -12.0);
        let vertices = NodeShape::Hexagon.vertices(center, 10.0);
        assert_eq!(vertices.len(), 6);
        for vertex in vertices {
            assert!(((vertex - center).length() - 10.0).abs() < 1e-3);
            assert!(NodeShape::Hexagon.contains((vertex - center) * 0.999, 10.0));
        }
    }

    #[test]
    fn edge_endpoints_stop_at_node_boundaries() {
        let (start, end) = edge_endpoints(pos2(0.0, 0.0), 10.0, pos2(100.0, 0.0), 20.0).unwrap();
        assert_eq!(start, pos2(10.0, 0.0));
        assert_eq!(end, pos2(80.0, 0.0));
        assert!(edge_endpoints(pos2(0.0, 0.0), 10.0, pos2(25.0, 0.0), 20.0).is_none());
    }

    #[test]
    fn arrowhead_points_along_the_edge() {
        let [tip, left, right] = arrowhead(pos2(50.0, 0.0), vec2(10.0, 0.0), 8.0);
        assert_eq!(tip, pos2(50.0, 0.0));
        assert!((left.x - 42.0).abs() < 1e-4 && (right.x - 42.0).abs() < 1e-4);
        assert!((left.y + right.y).abs() < 1e-4);
        assert!((left.y - right.y).abs() > 7.9);
    }

    #[test]
    fn anomalous_edges_override_kind_style() {
        let normal = EdgeStyle::for_edge(EdgeKind::RoutesTo, false);
        let anomalous = EdgeStyle::for_edge(EdgeKind::RoutesTo, true);
        assert!(normal.dashed);
        assert!(!anomalous.dashed);
        assert!(anomalous.arrow_size > normal.arrow_size);
    }
}
