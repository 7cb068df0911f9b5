//! Stroke geometry in world space

use crate::constants::MIN_DAB_RADIUS;
use crate::types::{Point, Tool};

use super::Bounds;

/// A rasterizable primitive, in world-space pixels
///
/// Coverage is decided at pixel centers with hard edges.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Filled circle
    Dab { center: Point, radius: f32 },
    /// Round-capped, round-joined thick polyline
    Polyline { points: Vec<Point>, radius: f32 },
    /// Filled axis-aligned rectangle between two corners
    Rect { min: Point, max: Point },
    /// Filled axis-aligned ellipse
    Ellipse { center: Point, rx: f32, ry: f32 },
}

/// Brush radius for a given size, never below the minimum dab radius
#[inline]
pub fn brush_radius(size: f32) -> f32 {
    (size * 0.5).max(MIN_DAB_RADIUS)
}

/// Force equal width and height using the larger drag magnitude,
/// keeping the drag direction on each axis
pub fn square_corner(start: Point, end: Point) -> Point {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let side = dx.abs().max(dy.abs());
    Point::new(start.x + side * dx.signum(), start.y + side * dy.signum())
}

impl Shape {
    /// Build the shape a tool draws through `points`.
    ///
    /// Shape tools use only the first and last point. A stroke without any
    /// drag extent collapses to a dab so a click always leaves a mark.
    pub fn from_tool(tool: Tool, points: &[Point], size: f32, square: bool) -> Option<Shape> {
        let first = *points.first()?;
        let last = *points.last()?;
        let radius = brush_radius(size);

        if points.iter().all(|p| *p == first) {
            return Some(Shape::Dab {
                center: first,
                radius,
            });
        }

        let shape = match tool {
            Tool::Brush | Tool::Eraser => Shape::Polyline {
                points: points.to_vec(),
                radius,
            },
            Tool::Line => Shape::Polyline {
                points: vec![first, last],
                radius,
            },
            Tool::Rect | Tool::Ellipse => {
                let corner = if square {
                    square_corner(first, last)
                } else {
                    last
                };
                let min = Point::new(first.x.min(corner.x), first.y.min(corner.y));
                let max = Point::new(first.x.max(corner.x), first.y.max(corner.y));
                if tool == Tool::Rect {
                    Shape::Rect { min, max }
                } else {
                    Shape::Ellipse {
                        center: Point::new((min.x + max.x) * 0.5, (min.y + max.y) * 0.5),
                        rx: ((max.x - min.x) * 0.5).max(0.5),
                        ry: ((max.y - min.y) * 0.5).max(0.5),
                    }
                }
            }
        };
        Some(shape)
    }

    /// World-space bounding box of everything this shape can cover
    pub fn bounds(&self) -> Bounds {
        match self {
            Shape::Dab { center, radius } => Bounds::around(*center, *radius),
            Shape::Polyline { points, radius } => points
                .windows(2)
                .map(|seg| Bounds::segment(seg[0], seg[1]).expand(*radius))
                .reduce(Bounds::union)
                .unwrap_or_else(|| {
                    Bounds::around(points.first().copied().unwrap_or_default(), *radius)
                }),
            Shape::Rect { min, max } => Bounds::segment(*min, *max),
            Shape::Ellipse { center, rx, ry } => Bounds {
                min_x: center.x - rx,
                min_y: center.y - ry,
                max_x: center.x + rx,
                max_y: center.y + ry,
            },
        }
    }

    /// True if the world-space sample point lies inside the shape
    pub fn covers(&self, x: f64, y: f64) -> bool {
        match self {
            Shape::Dab { center, radius } => in_circle(*center, *radius, x, y),
            Shape::Polyline { points, radius } => {
                if points.len() == 1 {
                    return in_circle(points[0], *radius, x, y);
                }
                points
                    .windows(2)
                    .any(|seg| in_capsule(seg[0], seg[1], *radius, x, y))
            }
            Shape::Rect { min, max } => {
                x >= min.x as f64 && x <= max.x as f64 && y >= min.y as f64 && y <= max.y as f64
            }
            Shape::Ellipse { center, rx, ry } => {
                let nx = (x - center.x as f64) / *rx as f64;
                let ny = (y - center.y as f64) / *ry as f64;
                nx * nx + ny * ny <= 1.0
            }
        }
    }
}

#[inline]
fn in_circle(center: Point, radius: f32, x: f64, y: f64) -> bool {
    let dx = x - center.x as f64;
    let dy = y - center.y as f64;
    let r = radius as f64;
    dx * dx + dy * dy <= r * r
}

/// Distance from (x, y) to segment `a..b` is within `radius`
#[inline]
pub(crate) fn in_capsule(a: Point, b: Point, radius: f32, x: f64, y: f64) -> bool {
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (bx, by) = (b.x as f64, b.y as f64);
    let (abx, aby) = (bx - ax, by - ay);
    let len_sq = abx * abx + aby * aby;
    let t = if len_sq > 0.0 {
        (((x - ax) * abx + (y - ay) * aby) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let dx = x - (ax + abx * t);
    let dy = y - (ay + aby * t);
    let r = radius as f64;
    dx * dx + dy * dy <= r * r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_point_is_dab() {
        let shape = Shape::from_tool(Tool::Brush, &[Point::new(4.0, 4.0)], 10.0, false).unwrap();
        assert_eq!(
            shape,
            Shape::Dab {
                center: Point::new(4.0, 4.0),
                radius: 5.0
            }
        );

        // A click with a shape tool also leaves a dab
        let shape = Shape::from_tool(
            Tool::Rect,
            &[Point::new(1.0, 1.0), Point::new(1.0, 1.0)],
            2.0,
            false,
        )
        .unwrap();
        assert!(matches!(shape, Shape::Dab { .. }));
    }

    #[test]
    fn test_empty_points() {
        assert!(Shape::from_tool(Tool::Brush, &[], 1.0, false).is_none());
    }

    #[test]
    fn test_rect_drag_direction_independent() {
        let a = Point::new(10.0, 20.0);
        let b = Point::new(50.0, 80.0);
        for tool in [Tool::Rect, Tool::Ellipse] {
            let forward = Shape::from_tool(tool, &[a, b], 4.0, false).unwrap();
            let backward = Shape::from_tool(tool, &[b, a], 4.0, false).unwrap();
            assert_eq!(forward, backward);
            assert_eq!(forward.bounds(), backward.bounds());
        }
    }

    #[test]
    fn test_square_uses_larger_magnitude() {
        let start = Point::new(0.0, 0.0);
        assert_eq!(square_corner(start, Point::new(10.0, -4.0)), Point::new(10.0, -10.0));
        assert_eq!(square_corner(start, Point::new(-3.0, 7.0)), Point::new(-7.0, 7.0));

        let shape = Shape::from_tool(Tool::Rect, &[start, Point::new(-3.0, 7.0)], 1.0, true).unwrap();
        assert_eq!(
            shape,
            Shape::Rect {
                min: Point::new(-7.0, 0.0),
                max: Point::new(0.0, 7.0)
            }
        );
    }

    #[test]
    fn test_line_uses_endpoints_only() {
        let points = [Point::new(0.0, 0.0), Point::new(100.0, 100.0), Point::new(10.0, 0.0)];
        let shape = Shape::from_tool(Tool::Line, &points, 2.0, false).unwrap();
        assert!(shape.covers(5.0, 0.5));
        assert!(!shape.covers(50.0, 50.0));
    }

    #[test]
    fn test_capsule_coverage() {
        let shape = Shape::Polyline {
            points: vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)],
            radius: 2.0,
        };
        assert!(shape.covers(5.0, 1.9));
        assert!(!shape.covers(5.0, 2.1));
        // Round caps
        assert!(shape.covers(11.5, 0.0));
        assert!(!shape.covers(11.5, 1.9));
    }

    #[test]
    fn test_ellipse_coverage() {
        let shape = Shape::from_tool(
            Tool::Ellipse,
            &[Point::new(0.0, 0.0), Point::new(20.0, 10.0)],
            1.0,
            false,
        )
        .unwrap();
        assert!(shape.covers(10.0, 5.0));
        assert!(shape.covers(0.5, 5.0));
        // Bounding box corner is outside the inscribed ellipse
        assert!(!shape.covers(1.0, 1.0));
    }
}
