//! Point-in-polygon tests for boundary assignment.

/// Tolerance for treating a point as lying on an edge.
const EDGE_EPSILON: f64 = 1e-12;

/// Closed polygon ring in `(lon, lat)` order.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    vertices: Vec<(f64, f64)>,
    min: (f64, f64),
    max: (f64, f64),
}

impl Ring {
    /// Build a ring, closing it if the last vertex differs from the first.
    ///
    /// Returns `None` when fewer than three distinct vertices remain.
    pub fn new(mut vertices: Vec<(f64, f64)>) -> Option<Self> {
        vertices.dedup();
        if let (Some(first), Some(last)) = (vertices.first().copied(), vertices.last().copied())
            && first != last
        {
            vertices.push(first);
        }

        // Closed ring: n + 1 entries for n distinct corners.
        if vertices.len() < 4 {
            return None;
        }

        let mut min = (f64::INFINITY, f64::INFINITY);
        let mut max = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &(x, y) in &vertices {
            min = (min.0.min(x), min.1.min(y));
            max = (max.0.max(x), max.1.max(y));
        }

        Some(Self { vertices, min, max })
    }

    pub fn vertices(&self) -> &[(f64, f64)] {
        &self.vertices
    }

    /// Whether the point is inside the ring or on its boundary.
    pub fn covers(&self, lon: f64, lat: f64) -> bool {
        if lon < self.min.0 || lon > self.max.0 || lat < self.min.1 || lat > self.max.1 {
            return false;
        }

        let mut inside = false;
        for edge in self.vertices.windows(2) {
            let (a, b) = (edge[0], edge[1]);
            if on_segment(a, b, (lon, lat)) {
                return true;
            }
            // Even-odd rule on a ray towards +lon.
            if (a.1 > lat) != (b.1 > lat) {
                let x = a.0 + (lat - a.1) * (b.0 - a.0) / (b.1 - a.1);
                if lon < x {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

fn on_segment(a: (f64, f64), b: (f64, f64), p: (f64, f64)) -> bool {
    let cross = (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0);
    if cross.abs() > EDGE_EPSILON {
        return false;
    }
    p.0 >= a.0.min(b.0) && p.0 <= a.0.max(b.0) && p.1 >= a.1.min(b.1) && p.1 <= a.1.max(b.1)
}

/// Named area a point can fall into.
pub trait Area {
    fn name(&self) -> &str;
    fn ring(&self) -> &Ring;
}

/// Name of the first area covering the point, in the given order.
pub fn assign_boundary<A: Area>(lat: f64, lon: f64, areas: &[A]) -> Option<&str> {
    areas.iter().find(|area| area.ring().covers(lon, lat)).map(Area::name)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, Ring);

    impl Area for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn ring(&self) -> &Ring {
            &self.1
        }
    }

    fn square(x0: f64, y0: f64, size: f64) -> Ring {
        Ring::new(vec![(x0, y0), (x0 + size, y0), (x0 + size, y0 + size), (x0, y0 + size), (x0, y0)]).unwrap()
    }

    #[test]
    fn test_inside_and_outside() {
        let ring = square(0.0, 0.0, 1.0);
        assert!(ring.covers(0.5, 0.5));
        assert!(!ring.covers(1.5, 0.5));
        assert!(!ring.covers(0.5, -0.1));
    }

    #[test]
    fn test_edges_and_vertices_are_covered() {
        let ring = square(0.0, 0.0, 1.0);
        assert!(ring.covers(1.0, 0.5));
        assert!(ring.covers(0.5, 0.0));
        assert!(ring.covers(0.0, 0.0));
        assert!(ring.covers(1.0, 1.0));
    }

    #[test]
    fn test_concave_ring() {
        // U shape opening towards +lat.
        let ring = Ring::new(vec![(0.0, 0.0), (3.0, 0.0), (3.0, 3.0), (2.0, 3.0), (2.0, 1.0), (1.0, 1.0), (1.0, 3.0), (0.0, 3.0)])
            .unwrap();
        assert!(ring.covers(0.5, 2.0));
        assert!(ring.covers(2.5, 2.0));
        assert!(!ring.covers(1.5, 2.0));
        assert!(ring.covers(1.5, 1.0));
    }

    #[test]
    fn test_open_ring_is_closed() {
        let ring = Ring::new(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)]).unwrap();
        assert_eq!(ring.vertices().len(), 4);
        assert_eq!(ring.vertices().first(), ring.vertices().last());
    }

    #[test]
    fn test_degenerate_rings_rejected() {
        assert!(Ring::new(vec![]).is_none());
        assert!(Ring::new(vec![(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]).is_none());
        assert!(Ring::new(vec![(0.0, 0.0), (0.0, 0.0), (1.0, 1.0)]).is_none());
    }

    #[test]
    fn test_first_covering_area_wins() {
        let areas = vec![
            Named("west", square(0.0, 0.0, 1.0)),
            Named("east", square(1.0, 0.0, 1.0)),
            Named("big", square(-5.0, -5.0, 10.0)),
        ];
        assert_eq!(assign_boundary(0.5, 0.5, &areas), Some("west"));
        assert_eq!(assign_boundary(0.5, 1.0, &areas), Some("west"));
        assert_eq!(assign_boundary(0.5, 1.5, &areas), Some("east"));
        assert_eq!(assign_boundary(4.0, 4.0, &areas), Some("big"));
        assert_eq!(assign_boundary(20.0, 20.0, &areas), None);
    }
}
