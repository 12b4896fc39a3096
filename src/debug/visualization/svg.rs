// src/debug/visualization/svg.rs
use crate::math::{error::NavResult, types::*};
use crate::navmesh::local_geometry::LocalGeometryView;
use bevy::log::info;
use std::io::Write;

// ===================================================================================
// 1. HILFS-STRUCT für die SVG-Erstellung
// ===================================================================================
/// Ein Helfer zum Erstellen einer SVG-Datei.
struct SvgBuilder {
    content: String,
    point_radius: f64,
}

impl SvgBuilder {
    /// Erstellt ein neues SVG-Grundgerüst mit Header, Stil und Hintergrund.
    fn new(display_bounds: &Bounds2D, svg_pixel_size: f64) -> Self {
        let min_x = display_bounds.min.x;
        let min_y = display_bounds.min.y;
        let width = display_bounds.width();
        let height = display_bounds.height();

        let stroke_w_normal = (width + height) / 2.0 * 0.003;
        let stroke_w_thin = (width + height) / 2.0 * 0.001;
        let point_radius = (width + height) / 2.0 * 0.004;

        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<svg width="{svg_pixel_size}" height="{svg_pixel_size}" viewBox="{min_x} {min_y} {width} {height}" xmlns="http://www.w3.org/2000/svg">
  <style>
    .background {{ fill: #f0f0f0; fill-opacity: 1.0; }}
    .sector-bounds {{ fill: none; stroke: #888888; stroke-width: {stroke_w_thin}; stroke-dasharray: 5,5; }}
    .land {{ fill: rgba(150, 255, 150, 0.5); stroke: #00aa00; stroke-width: {stroke_w_normal}; }}
    .hole {{ fill: #f0f0f0; stroke: #aa0000; stroke-width: {stroke_w_normal}; }}
    .triangle {{ fill: none; stroke: #66aa66; stroke-width: {stroke_w_thin}; }}
    .barrier {{ stroke: #cc6600; stroke-width: {stroke_w_thin}; }}
    .waypoint {{ fill: #aaccff; stroke: #0000cc; stroke-width: {stroke_w_thin}; }}
    .path {{ fill: none; stroke: #5500aa; stroke-width: {stroke_w_normal}; }}
  </style>
  <rect x="{min_x}" y="{min_y}" width="{width}" height="{height}" class="background" />
"#,
        );

        Self { content, point_radius }
    }

    fn points_attribute(vertices: impl IntoIterator<Item = Point2D>) -> String {
        vertices
            .into_iter()
            .map(|p| format!("{:.3},{:.3}", p.x, p.y))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn draw_polygon(&mut self, vertices: impl IntoIterator<Item = Point2D>, class: &str) {
        let points = Self::points_attribute(vertices);
        self.content
            .push_str(&format!("  <polygon points=\"{points}\" class=\"{class}\" />\n"));
    }

    fn draw_polyline(&mut self, vertices: &[Point2D], class: &str) {
        if vertices.len() < 2 {
            return;
        }
        let points = Self::points_attribute(vertices.iter().copied());
        self.content
            .push_str(&format!("  <polyline points=\"{points}\" class=\"{class}\" />\n"));
    }

    fn draw_line(&mut self, segment: &DoubleLineSegment2, class: &str) {
        self.content.push_str(&format!(
            "  <line x1=\"{:.3}\" y1=\"{:.3}\" x2=\"{:.3}\" y2=\"{:.3}\" class=\"{class}\" />\n",
            segment.a.x, segment.a.y, segment.b.x, segment.b.y
        ));
    }

    fn draw_circle(&mut self, center: Point2D, radius: f64, class: &str) {
        self.content.push_str(&format!(
            "  <circle cx=\"{:.3}\" cy=\"{:.3}\" r=\"{radius:.3}\" class=\"{class}\" />\n",
            center.x, center.y
        ));
    }

    fn draw_rect(&mut self, bounds: &Bounds2D, class: &str) {
        self.content.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" class=\"{class}\" />\n",
            bounds.min.x,
            bounds.min.y,
            bounds.width(),
            bounds.height()
        ));
    }

    fn finish(mut self) -> String {
        self.content.push_str("</svg>\n");
        self.content
    }
}

/// Zeichnet eine lokale Geometrie-Sicht: Land und Löcher, Dreiecke, Barrieren,
/// Wegpunkte und optional eine Route (lokale Koordinaten).
pub fn render_local_geometry_svg(
    view: &LocalGeometryView,
    route: Option<&[Point2D]>,
    svg_pixel_size: f64,
) -> NavResult<String> {
    let sector_bounds = view.job().sector.metadata.local_boundary.to_bounds();
    let display_bounds = sector_bounds.expand(0.05 * sector_bounds.width().max(sector_bounds.height()));
    let mut svg = SvgBuilder::new(&display_bounds, svg_pixel_size);
    svg.draw_rect(&sector_bounds, "sector-bounds");

    let land = view.punched_land()?;
    for index in 0..land.nodes.len() {
        svg.draw_polygon(land.contour(index).iter().map(|p| p.as_dvec2()), "land");
        for hole in land.hole_contours(index) {
            svg.draw_polygon(hole.iter().map(|p| p.as_dvec2()), "hole");
        }
    }

    for island in &view.triangulation()?.islands {
        for triangle in &island.triangles {
            svg.draw_polygon(triangle.points, "triangle");
        }
    }

    let radius = svg.point_radius;
    for node in &land.nodes {
        for barrier in node.barriers.items() {
            svg.draw_line(barrier, "barrier");
        }
        for waypoint in &node.waypoints {
            svg.draw_circle(*waypoint, radius, "waypoint");
        }
    }

    if let Some(route) = route {
        svg.draw_polyline(route, "path");
    }
    Ok(svg.finish())
}

/// Schreibt [`render_local_geometry_svg`] in eine Datei.
pub fn write_local_geometry_svg(
    filename: &str,
    view: &LocalGeometryView,
    route: Option<&[Point2D]>,
    svg_pixel_size: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    let content = render_local_geometry_svg(view, route, svg_pixel_size)?;
    let mut file = std::fs::File::create(filename)?;
    file.write_all(content.as_bytes())?;
    info!("Debug SVG '{}' wurde erstellt.", filename);
    Ok(())
}
