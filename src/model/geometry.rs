//! Page-space geometry: rectangles and affine matrices.

use lopdf::Object;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in PDF user space (origin bottom-left).
///
/// Coordinates are always normalized so that `x0 <= x1` and `y0 <= y1`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    /// Create a rectangle from two corners in any order.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Read a `[llx lly urx ury]` array such as an annotation `/Rect` or a form `/BBox`.
    pub fn from_pdf_array(array: &[Object]) -> Option<Self> {
        if array.len() < 4 {
            return None;
        }
        let n: Vec<f32> = array[..4].iter().filter_map(get_number).collect();
        if n.len() != 4 {
            return None;
        }
        Some(Self::new(n[0], n[1], n[2], n[3]))
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// True when the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Inclusive point test.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    /// Overlapping region, if any.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        Some(Rect {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        })
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Serialize back into a PDF number array.
    pub fn to_pdf_array(&self) -> Vec<Object> {
        vec![
            Object::Real(self.x0),
            Object::Real(self.y0),
            Object::Real(self.x1),
            Object::Real(self.y1),
        ]
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{:.1} {:.1} {:.1} {:.1}]",
            self.x0, self.y0, self.x1, self.y1
        )
    }
}

/// Affine transform `[a b c d e f]` using PDF's row-vector convention.
///
/// A point maps as `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Build a matrix from six numeric operands (`cm`, `Tm`, `/Matrix`).
    pub fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() < 6 {
            return None;
        }
        let n: Vec<f32> = operands[..6].iter().filter_map(get_number).collect();
        if n.len() != 6 {
            return None;
        }
        Some(Self::new(n[0], n[1], n[2], n[3], n[4], n[5]))
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn concat(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Bounding box of a transformed rectangle.
    pub fn transform_rect(&self, rect: &Rect) -> Rect {
        let corners = [
            self.transform_point(rect.x0, rect.y0),
            self.transform_point(rect.x1, rect.y0),
            self.transform_point(rect.x0, rect.y1),
            self.transform_point(rect.x1, rect.y1),
        ];
        let (mut x0, mut y0) = corners[0];
        let (mut x1, mut y1) = corners[0];
        for &(x, y) in &corners[1..] {
            x0 = x0.min(x);
            y0 = y0.min(y);
            x1 = x1.max(x);
            y1 = y1.max(y);
        }
        Rect { x0, y0, x1, y1 }
    }
}

/// Extract a number from a PDF object.
pub fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_normalizes() {
        let r = Rect::new(100.0, 50.0, 10.0, 5.0);
        assert_eq!(r, Rect::new(10.0, 5.0, 100.0, 50.0));
        assert_eq!(r.width(), 90.0);
        assert_eq!(r.height(), 45.0);
    }

    #[test]
    fn test_rect_from_pdf_array() {
        let arr = vec![
            Object::Integer(10),
            Object::Real(20.5),
            Object::Integer(110),
            Object::Integer(40),
        ];
        let r = Rect::from_pdf_array(&arr).unwrap();
        assert_eq!(r.x0, 10.0);
        assert_eq!(r.y0, 20.5);
        assert_eq!(r.x1, 110.0);

        let bad = vec![Object::Integer(1), Object::Name(b"X".to_vec())];
        assert!(Rect::from_pdf_array(&bad).is_none());
    }

    #[test]
    fn test_rect_intersection() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 15.0, 15.0);
        let c = Rect::new(20.0, 20.0, 30.0, 30.0);
        assert_eq!(a.intersect(&b), Some(Rect::new(5.0, 5.0, 10.0, 10.0)));
        assert!(a.intersect(&c).is_none());
        assert_eq!(a.union(&c), Rect::new(0.0, 0.0, 30.0, 30.0));
    }

    #[test]
    fn test_rect_contains_point() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains_point(5.0, 5.0));
        assert!(r.contains_point(10.0, 0.0));
        assert!(!r.contains_point(10.1, 5.0));
    }

    #[test]
    fn test_matrix_concat_order() {
        // scale then translate
        let scale = Matrix::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let shift = Matrix::translation(10.0, 20.0);
        let m = scale.concat(&shift);
        assert_eq!(m.transform_point(1.0, 1.0), (12.0, 22.0));

        let m = shift.concat(&scale);
        assert_eq!(m.transform_point(1.0, 1.0), (22.0, 42.0));
    }

    #[test]
    fn test_matrix_transform_rect() {
        // 90 degree rotation
        let rot = Matrix::new(0.0, 1.0, -1.0, 0.0, 0.0, 0.0);
        let r = rot.transform_rect(&Rect::new(0.0, 0.0, 10.0, 5.0));
        assert_eq!(r, Rect::new(-5.0, 0.0, 0.0, 10.0));
    }

    #[test]
    fn test_matrix_from_operands() {
        let ops: Vec<Object> = vec![
            100.into(),
            0.into(),
            0.into(),
            50.into(),
            Object::Real(72.0),
            Object::Real(700.0),
        ];
        let m = Matrix::from_operands(&ops).unwrap();
        assert_eq!(m.transform_rect(&Rect::new(0.0, 0.0, 1.0, 1.0)), Rect::new(72.0, 700.0, 172.0, 750.0));
        assert!(Matrix::from_operands(&ops[..5]).is_none());
    }
}
