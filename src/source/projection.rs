use crate::types::{Point2, Point3, Resolution};

// Horizontal and vertical field of view of the structured-light depth camera.
const KINECT_HORIZONTAL_FOV: f32 = 1.014_468_6;
const KINECT_VERTICAL_FOV: f32 = 0.789_809_0;

// Keeps points at or behind the sensor plane finite.
const MIN_PROJECTION_DEPTH: f32 = 1.0;

/// Field-of-view based real-world (mm) to projective (pixel) transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectiveTransform {
    resolution: Resolution,
    x_to_z: f32,
    y_to_z: f32,
}

impl ProjectiveTransform {
    pub fn new(resolution: Resolution, horizontal_fov: f32, vertical_fov: f32) -> Self {
        Self {
            resolution,
            x_to_z: (horizontal_fov / 2.0).tan() * 2.0,
            y_to_z: (vertical_fov / 2.0).tan() * 2.0,
        }
    }

    pub fn kinect(resolution: Resolution) -> Self {
        Self::new(resolution, KINECT_HORIZONTAL_FOV, KINECT_VERTICAL_FOV)
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn to_projective(&self, point: Point3) -> Point2 {
        let width = self.resolution.width as f32;
        let height = self.resolution.height as f32;
        let z = point.z.max(MIN_PROJECTION_DEPTH);

        Point2::new(
            width / self.x_to_z * point.x / z + width / 2.0,
            height / 2.0 - height / self.y_to_z * point.y / z,
        )
    }

    pub fn to_real_world(&self, point: Point2, z: f32) -> Point3 {
        let width = self.resolution.width as f32;
        let height = self.resolution.height as f32;

        Point3::new(
            (point.x / width - 0.5) * z * self.x_to_z,
            (0.5 - point.y / height) * z * self.y_to_z,
            z,
        )
    }

    pub fn project_all(&self, points: &[Point3]) -> Vec<Point2> {
        points.iter().map(|p| self.to_projective(*p)).collect()
    }

    /// Pixels per millimetre at depth `z`, horizontally.
    pub fn scale_at(&self, z: f32) -> f32 {
        self.resolution.width as f32 / self.x_to_z / z.max(MIN_PROJECTION_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-2
    }

    #[test]
    fn optical_axis_hits_the_centre() {
        let transform = ProjectiveTransform::kinect(Resolution::new(640, 480));
        let p = transform.to_projective(Point3::new(0.0, 0.0, 2_000.0));
        assert_eq!(p, Point2::new(320.0, 240.0));
    }

    #[test]
    fn up_and_right_map_to_screen_up_and_right() {
        let transform = ProjectiveTransform::kinect(Resolution::new(640, 480));
        let p = transform.to_projective(Point3::new(300.0, 300.0, 2_000.0));
        assert!(p.x > 320.0);
        assert!(p.y < 240.0);
    }

    #[test]
    fn real_world_round_trips() {
        let transform = ProjectiveTransform::kinect(Resolution::new(320, 240));
        let world = Point3::new(-410.0, 125.0, 2_750.0);
        let back = transform.to_real_world(transform.to_projective(world), world.z);
        assert!(close(back.x, world.x) && close(back.y, world.y));
    }

    #[test]
    fn points_behind_sensor_stay_finite() {
        let transform = ProjectiveTransform::kinect(Resolution::new(640, 480));
        let p = transform.to_projective(Point3::new(10.0, 10.0, -5.0));
        assert!(p.x.is_finite() && p.y.is_finite());
    }
}
