//! Geometry types shared between the rendering engine and host-facing models
//!
//! All coordinates are in the engine's page space (PDF points, y growing
//! downwards) unless a type says otherwise.

/// A point in page space
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PointF {
    pub x: f32,
    pub y: f32,
}

impl PointF {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Width/height pair in page space
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SizeF {
    pub width: f32,
    pub height: f32,
}

impl SizeF {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// True when either side is zero, negative or not a number
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Axis-aligned rectangle given by its two corners
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RectF {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl RectF {
    #[must_use]
    pub const fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Smallest rectangle containing all the given points
    #[must_use]
    pub fn from_points(points: &[PointF]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        points.iter().skip(1).fold(
            Self::new(first.x, first.y, first.x, first.y),
            |acc, p| Self {
                x0: acc.x0.min(p.x),
                y0: acc.y0.min(p.y),
                x1: acc.x1.max(p.x),
                y1: acc.y1.max(p.y),
            },
        )
    }

    /// Same rectangle with corners ordered so that `x0 <= x1` and `y0 <= y1`
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            x0: self.x0.min(self.x1),
            y0: self.y0.min(self.y1),
            x1: self.x0.max(self.x1),
            y1: self.y0.max(self.y1),
        }
    }

    #[must_use]
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    #[must_use]
    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    #[must_use]
    pub fn size(&self) -> SizeF {
        SizeF::new(self.width(), self.height())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }
}

/// Rectangle expressed as fractions of a page's width and height.
///
/// This is the coordinate space hosts use for text selection and viewports.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NormalizedRect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl NormalizedRect {
    /// Normalizes `rect` against a page of the given size.
    ///
    /// Returns `None` for a degenerate page size.
    #[must_use]
    pub fn from_page_rect(rect: &RectF, page: SizeF) -> Option<Self> {
        if page.is_degenerate() {
            return None;
        }
        let width = f64::from(page.width);
        let height = f64::from(page.height);
        Some(Self {
            left: f64::from(rect.x0) / width,
            top: f64::from(rect.y0) / height,
            right: f64::from(rect.x1) / width,
            bottom: f64::from(rect.y1) / height,
        })
    }
}

/// Scaling transform from page space to device pixels
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scale {
    pub sx: f32,
    pub sy: f32,
}

impl Scale {
    pub const IDENTITY: Self = Self { sx: 1.0, sy: 1.0 };

    /// Transform mapping `page` onto a `width` x `height` pixel area
    #[must_use]
    pub fn fit(page: SizeF, width: u32, height: u32) -> Self {
        if page.is_degenerate() {
            return Self::IDENTITY;
        }
        Self {
            sx: width as f32 / page.width,
            sy: height as f32 / page.height,
        }
    }
}

#[cfg(feature = "pdf")]
impl From<mupdf::Rect> for RectF {
    fn from(r: mupdf::Rect) -> Self {
        Self::new(r.x0, r.y0, r.x1, r.y1)
    }
}

#[cfg(feature = "pdf")]
impl From<mupdf::Point> for PointF {
    fn from(p: mupdf::Point) -> Self {
        Self::new(p.x, p.y)
    }
}

#[cfg(feature = "pdf")]
impl From<mupdf::Quad> for RectF {
    fn from(q: mupdf::Quad) -> Self {
        Self::from_points(&[q.ul.into(), q.ur.into(), q.ll.into(), q.lr.into()])
    }
}

#[cfg(feature = "pdf")]
impl From<Scale> for mupdf::Matrix {
    fn from(s: Scale) -> Self {
        mupdf::Matrix::new_scale(s.sx, s.sy)
    }
}
