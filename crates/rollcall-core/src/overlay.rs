//! Landmark overlay rendering for the optional debug/visualization sink.
//!
//! Paints the 478 dense landmarks onto a copy of the region they were
//! computed on: every point as a dot colored blue→red by relative depth,
//! the semantic points (nose tip, mouth corners, iris centers) highlighted,
//! and the face-oval and lip contours as polylines. Never on the
//! recognition path.

use crate::frame::Frame;
use crate::landmarks::{LandmarkSet, FACE_OVAL, LOWER_LIP, UPPER_LIP};
use crate::types::Point;

const GREEN: [u8; 3] = [0, 200, 0];
const YELLOW: [u8; 3] = [230, 230, 0];
const CYAN: [u8; 3] = [0, 220, 220];
const MAGENTA: [u8; 3] = [220, 0, 220];
const RED: [u8; 3] = [220, 0, 0];

/// Render the landmark overlay onto a copy of `region`.
pub fn render_landmarks(region: &Frame, landmarks: &LandmarkSet) -> Frame {
    let mut canvas = Canvas {
        data: region.data().to_vec(),
        width: region.width(),
        height: region.height(),
    };

    // Depth range for the blue→red gradient
    let (z_min, z_max) = landmarks.points().iter().fold(
        (f32::MAX, f32::MIN),
        |(lo, hi), p| (lo.min(p.z), hi.max(p.z)),
    );
    let z_range = (z_max - z_min).max(1e-4);

    for p in landmarks.points() {
        let t = ((p.z - z_min) / z_range).clamp(0.0, 1.0);
        let r = (t * 255.0) as u8;
        canvas.dot(p.x, p.y, 1, [r, 0, 255 - r]);
    }

    canvas.polyline(landmarks, &FACE_OVAL, MAGENTA);
    canvas.polyline(landmarks, &UPPER_LIP, RED);
    canvas.polyline(landmarks, &LOWER_LIP, RED);

    canvas.dot_at(landmarks.nose_tip(), 2, GREEN);
    canvas.dot_at(landmarks.mouth_left(), 2, YELLOW);
    canvas.dot_at(landmarks.mouth_right(), 2, YELLOW);
    canvas.dot_at(landmarks.left_iris_center(), 2, CYAN);
    canvas.dot_at(landmarks.right_iris_center(), 2, CYAN);

    Frame::new(canvas.data, canvas.width, canvas.height)
        .expect("overlay preserves region dimensions")
}

struct Canvas {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Canvas {
    fn put(&mut self, x: i32, y: i32, color: [u8; 3]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let off = (y as usize * self.width as usize + x as usize) * 3;
        self.data[off..off + 3].copy_from_slice(&color);
    }

    fn dot(&mut self, cx: f32, cy: f32, radius: i32, color: [u8; 3]) {
        let (cx, cy) = (cx.round() as i32, cy.round() as i32);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.put(cx + dx, cy + dy, color);
                }
            }
        }
    }

    fn dot_at(&mut self, p: Point, radius: i32, color: [u8; 3]) {
        self.dot(p.x, p.y, radius, color);
    }

    fn line(&mut self, a: Point, b: Point, color: [u8; 3]) {
        let steps = (b.x - a.x).abs().max((b.y - a.y).abs()).ceil().max(1.0) as usize;
        for s in 0..=steps {
            let t = s as f32 / steps as f32;
            let x = a.x + (b.x - a.x) * t;
            let y = a.y + (b.y - a.y) * t;
            self.put(x.round() as i32, y.round() as i32, color);
        }
    }

    fn polyline(&mut self, landmarks: &LandmarkSet, indices: &[usize], color: [u8; 3]) {
        for pair in indices.windows(2) {
            let a = landmarks.point(pair[0]);
            let b = landmarks.point(pair[1]);
            self.line(Point::new(a.x, a.y), Point::new(b.x, b.y), color);
        }
    }
}
