//! Geometry primitives shared by the container tree, the animation pipeline
//! and the IPC reporting layer.
//!
//! All logical coordinates are integer pixels in the global (multi-output)
//! coordinate space. The animation pipeline interpolates in `f32` and hands
//! fractional positions back to the consumer, which truncates on apply.

use serde::{Deserialize, Serialize};

/// A point in global display coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Size { width, height }
    }
}

/// A rectangle with position and dimensions.
///
/// Used for the logical area a parent assigns to a child, the visible area
/// after gaps and borders, output extents and animation clip areas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Rect { x, y, width, height }
    }

    pub fn from_point_size(top_left: Point, size: Size) -> Self {
        Rect {
            x: top_left.x,
            y: top_left.y,
            width: size.width,
            height: size.height,
        }
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Check if a point is contained within the rectangle. The right and
    /// bottom edges are exclusive.
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    /// Check if `other` lies entirely within this rectangle.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.x + other.width <= self.x + self.width
            && other.y + other.height <= self.y + self.height
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }

    /// The length of the rectangle along `direction`'s axis.
    pub fn span(&self, direction: Direction) -> i32 {
        if direction.is_vertical() {
            self.height
        } else {
            self.width
        }
    }
}

/// A cardinal direction used for selection walks, movement and resizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Up/Down operate on the vertical axis, Left/Right on the horizontal.
    pub fn is_vertical(&self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }

    /// Up and Left walk toward lower indices/coordinates.
    pub fn is_negative(&self) -> bool {
        matches!(self, Direction::Up | Direction::Left)
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

/// A column-major 4x4 transform matrix.
///
/// Only the operations the animation pipeline needs are provided: identity,
/// the zero matrix (used as the first frame of a grow animation), uniform
/// translation and scaling, and composition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4(pub [[f32; 4]; 4]);

impl Mat4 {
    pub fn identity() -> Self {
        let mut m = [[0.0; 4]; 4];
        for (i, col) in m.iter_mut().enumerate() {
            col[i] = 1.0;
        }
        Mat4(m)
    }

    pub fn zero() -> Self {
        Mat4([[0.0; 4]; 4])
    }

    pub fn translation(dx: f32, dy: f32) -> Self {
        let mut m = Mat4::identity();
        m.0[3][0] = dx;
        m.0[3][1] = dy;
        m
    }

    pub fn scaling(sx: f32, sy: f32) -> Self {
        let mut m = Mat4::identity();
        m.0[0][0] = sx;
        m.0[1][1] = sy;
        m
    }

    /// Column-major matrix product `self * rhs`.
    pub fn mul(&self, rhs: &Mat4) -> Mat4 {
        let a = &self.0;
        let b = &rhs.0;
        let mut out = [[0.0f32; 4]; 4];
        for (c, out_col) in out.iter_mut().enumerate() {
            for (r, cell) in out_col.iter_mut().enumerate() {
                *cell = (0..4).map(|k| a[k][r] * b[c][k]).sum();
            }
        }
        Mat4(out)
    }

    /// A scale anchored at `(cx, cy)` rather than the origin, i.e.
    /// `translate(c) * scale(s) * translate(-c)`.
    pub fn scale_about(sx: f32, sy: f32, cx: f32, cy: f32) -> Mat4 {
        Mat4::translation(cx, cy)
            .mul(&Mat4::scaling(sx, sy))
            .mul(&Mat4::translation(-cx, -cy))
    }

    pub fn is_identity(&self) -> bool {
        *self == Mat4::identity()
    }

    /// Flatten into the 16-float column-major form render consumers expect.
    pub fn to_cols_array(&self) -> [f32; 16] {
        let mut out = [0.0; 16];
        for (i, col) in self.0.iter().enumerate() {
            out[i * 4..i * 4 + 4].copy_from_slice(col);
        }
        out
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Mat4::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_contains_point_edges() {
        let rect = Rect::new(10, 10, 100, 100);
        assert!(rect.contains_point(10, 10));
        assert!(rect.contains_point(109, 109));
        assert!(!rect.contains_point(110, 50));
        assert!(!rect.contains_point(50, 110));
        assert!(!rect.contains_point(9, 50));
    }

    #[test]
    fn rect_intersects() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 50, 100, 100);
        let c = Rect::new(200, 200, 10, 10);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn direction_axes() {
        assert!(Direction::Up.is_vertical());
        assert!(Direction::Down.is_vertical());
        assert!(!Direction::Left.is_vertical());
        assert!(Direction::Up.is_negative());
        assert!(Direction::Left.is_negative());
        assert!(!Direction::Right.is_negative());
        assert_eq!(Direction::Left.opposite(), Direction::Right);
    }

    #[test]
    fn mat4_identity_product() {
        let id = Mat4::identity();
        let t = Mat4::translation(5.0, -3.0);
        assert_eq!(id.mul(&t), t);
        assert_eq!(t.mul(&id), t);
    }

    #[test]
    fn mat4_translation_composes() {
        let a = Mat4::translation(2.0, 3.0);
        let b = Mat4::translation(-1.0, 4.0);
        let c = a.mul(&b);
        assert_eq!(c.0[3][0], 1.0);
        assert_eq!(c.0[3][1], 7.0);
    }

    #[test]
    fn mat4_scale_about_center_fixes_center() {
        // The anchor point must be unmoved by the transform.
        let m = Mat4::scale_about(0.5, 0.5, 100.0, 50.0);
        let x = m.0[0][0] * 100.0 + m.0[3][0];
        let y = m.0[1][1] * 50.0 + m.0[3][1];
        assert!((x - 100.0).abs() < 1e-4);
        assert!((y - 50.0).abs() < 1e-4);
    }
}
