//! Buffer construction from boolean primitives.
//!
//! Dilation is built out of pieces the planar engine already handles
//! robustly: a circle for every vertex, a capsule (the convex hull of the
//! two end circles) for every segment, and the polygon body itself for
//! areal inputs. The union of all pieces approximates a round-joined buffer
//! with [`ARC_SEGMENTS`] segments per full arc.

use geo::{BooleanOps, ConvexHull, Coord, Geometry, Line, LineString, MultiPoint, Point, Polygon};

use crate::constants::ARC_SEGMENTS;

/// Dilates `geometry` by `distance` (> 0) in coordinate-plane units.
pub(crate) fn dilate(geometry: &Geometry<f64>, distance: f64) -> geo::MultiPolygon<f64> {
    let mut pieces = Vec::new();
    collect_pieces(geometry, distance, &mut pieces);

    pieces
        .into_iter()
        .fold(geo::MultiPolygon(Vec::new()), |acc, piece| {
            acc.union(&geo::MultiPolygon(vec![piece]))
        })
}

fn collect_pieces(geometry: &Geometry<f64>, distance: f64, out: &mut Vec<Polygon<f64>>) {
    match geometry {
        Geometry::Point(point) => out.push(circle(point.0, distance)),
        Geometry::MultiPoint(points) => {
            for point in &points.0 {
                out.push(circle(point.0, distance));
            }
        }
        Geometry::Line(line) => out.push(capsule(*line, distance)),
        Geometry::LineString(line) => collect_line_pieces(line, distance, out),
        Geometry::MultiLineString(lines) => {
            for line in &lines.0 {
                collect_line_pieces(line, distance, out);
            }
        }
        Geometry::Polygon(polygon) => collect_polygon_pieces(polygon, distance, out),
        Geometry::MultiPolygon(polygons) => {
            for polygon in &polygons.0 {
                collect_polygon_pieces(polygon, distance, out);
            }
        }
        Geometry::Rect(rect) => collect_polygon_pieces(&rect.to_polygon(), distance, out),
        Geometry::Triangle(triangle) => {
            collect_polygon_pieces(&triangle.to_polygon(), distance, out);
        }
        Geometry::GeometryCollection(collection) => {
            for child in &collection.0 {
                collect_pieces(child, distance, out);
            }
        }
    }
}

fn collect_line_pieces(line: &LineString<f64>, distance: f64, out: &mut Vec<Polygon<f64>>) {
    for segment in line.lines() {
        out.push(capsule(segment, distance));
    }
}

fn collect_polygon_pieces(polygon: &Polygon<f64>, distance: f64, out: &mut Vec<Polygon<f64>>) {
    out.push(polygon.clone());
    collect_line_pieces(polygon.exterior(), distance, out);
    for interior in polygon.interiors() {
        collect_line_pieces(interior, distance, out);
    }
}

fn circle_coords(center: Coord<f64>, radius: f64) -> Vec<Coord<f64>> {
    (0..ARC_SEGMENTS)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let theta = std::f64::consts::TAU * (i as f64) / (ARC_SEGMENTS as f64);
            Coord {
                x: radius.mul_add(theta.cos(), center.x),
                y: radius.mul_add(theta.sin(), center.y),
            }
        })
        .collect()
}

fn circle(center: Coord<f64>, radius: f64) -> Polygon<f64> {
    // Polygon::new closes the ring.
    Polygon::new(LineString::from(circle_coords(center, radius)), vec![])
}

fn capsule(segment: Line<f64>, radius: f64) -> Polygon<f64> {
    let mut points: Vec<Point<f64>> = circle_coords(segment.start, radius)
        .into_iter()
        .map(Point::from)
        .collect();
    points.extend(
        circle_coords(segment.end, radius)
            .into_iter()
            .map(Point::from),
    );
    MultiPoint(points).convex_hull()
}
