use std::f64::consts::PI;

use crate::model::Point;

/// Places `count` points evenly on a circle, starting at angle zero.
/// A single point sits on the center.
pub fn circular(count: usize, center: Point, radius: f64) -> Vec<Point> {
    if count == 1 {
        return vec![center];
    }
    (0..count)
        .map(|i| {
            let angle = (i as f64) * 2.0 * PI / count as f64;
            Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        a.distance(b) < 1e-9
    }

    #[test]
    fn empty_and_single() {
        assert!(circular(0, Point::new(0.0, 0.0), 10.0).is_empty());
        let one = circular(1, Point::new(5.0, 7.0), 10.0);
        assert_eq!(one, vec![Point::new(5.0, 7.0)]);
    }

    #[test]
    fn four_points_on_axes() {
        let points = circular(4, Point::new(100.0, 100.0), 50.0);
        assert!(close(points[0], Point::new(150.0, 100.0)));
        assert!(close(points[1], Point::new(100.0, 150.0)));
        assert!(close(points[2], Point::new(50.0, 100.0)));
        assert!(close(points[3], Point::new(100.0, 50.0)));
    }

    #[test]
    fn every_point_is_on_the_circle() {
        let center = Point::new(300.0, 300.0);
        for point in circular(7, center, 200.0) {
            assert!((point.distance(center) - 200.0).abs() < 1e-9);
        }
    }
}
