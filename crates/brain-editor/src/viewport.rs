use brain_core::Point;

/// Screen ↔ canvas transform: `screen = canvas * zoom + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub offset: Point,
    pub zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Point::default(),
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn to_canvas(&self, x: f32, y: f32) -> Point {
        Point::new((x - self.offset.x) / self.zoom, (y - self.offset.y) / self.zoom)
    }

    pub fn to_screen(&self, p: Point) -> Point {
        Point::new(p.x * self.zoom + self.offset.x, p.y * self.zoom + self.offset.y)
    }

    /// Translate by a screen-space delta. Graph coordinates are untouched.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.offset.x += dx;
        self.offset.y += dy;
    }

    /// Scale by `factor`, keeping the canvas point under `(x, y)` fixed.
    pub fn zoom_at(&mut self, factor: f32, x: f32, y: f32, min: f32, max: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let anchor = self.to_canvas(x, y);
        self.zoom = (self.zoom * factor).clamp(min, max);
        self.offset.x = x - anchor.x * self.zoom;
        self.offset.y = y - anchor.y * self.zoom;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
