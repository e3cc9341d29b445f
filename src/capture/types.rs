// Shared capture types: desktop rectangles, output rotation, output descriptors

/// Rectangle in desktop coordinates, right/bottom exclusive.
///
/// Mirrors the OS `RECT` layout so output coordinates can be stored without
/// conversion. Coordinates may be negative for outputs left of or above the
/// primary display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Rectangle anchored at the origin, as used for destination buffers.
    ///
    /// Sizes beyond `i32::MAX` saturate; use [`checked_from_size`](Self::checked_from_size)
    /// to reject them instead.
    pub const fn from_size(width: u32, height: u32) -> Self {
        let right = if width > i32::MAX as u32 { i32::MAX } else { width as i32 };
        let bottom = if height > i32::MAX as u32 { i32::MAX } else { height as i32 };
        Self::new(0, 0, right, bottom)
    }

    /// Origin-anchored rectangle, or `None` when a side exceeds `i32::MAX`.
    pub fn checked_from_size(width: u32, height: u32) -> Option<Self> {
        let right = i32::try_from(width).ok()?;
        let bottom = i32::try_from(height).ok()?;
        Some(Self::new(0, 0, right, bottom))
    }

    pub fn width(&self) -> u32 {
        (self.right as i64 - self.left as i64).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom as i64 - self.top as i64).max(0) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Smallest rectangle containing both. Empty rectangles do not contribute.
    pub fn union(&self, other: &Rect) -> Rect {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Top-left of `self` expressed relative to `origin`'s top-left.
    pub fn offset_from(&self, origin: &Rect) -> (i64, i64) {
        (
            self.left as i64 - origin.left as i64,
            self.top as i64 - origin.top as i64,
        )
    }

    /// Bounding box of a set of rectangles; all zeros when the set is empty.
    pub fn bounding<'a>(rects: impl IntoIterator<Item = &'a Rect>) -> Rect {
        rects
            .into_iter()
            .fold(Rect::default(), |acc, rect| acc.union(rect))
    }
}

/// How an output's scan-out is rotated relative to the desktop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum Rotation {
    #[default]
    Identity,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Rotation {
    /// Whether the native surface has width and height swapped relative to
    /// the output's desktop rectangle.
    pub fn swaps_axes(self) -> bool {
        matches!(self, Self::Rotate90 | Self::Rotate270)
    }

    /// Native surface size for an output whose desktop footprint is `width x height`.
    pub fn native_size(self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_axes() {
            (height, width)
        } else {
            (width, height)
        }
    }
}

/// Output descriptor
///
/// Fixed for the lifetime of the duplication session; the compositor only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDescriptor {
    /// Position in registry enumeration order
    pub index: usize,
    /// Device name (e.g. "\\\\.\\DISPLAY1")
    pub name: String,
    /// Desktop-space rectangle
    pub rect: Rect,
    /// Scan-out rotation
    pub rotation: Rotation,
    /// Whether the OS reports this output as the primary monitor
    pub is_primary: bool,
}

impl OutputDescriptor {
    pub fn new(
        index: usize,
        name: impl Into<String>,
        rect: Rect,
        rotation: Rotation,
        is_primary: bool,
    ) -> Self {
        Self {
            index,
            name: name.into(),
            rect,
            rotation,
            is_primary,
        }
    }

    /// Width/height of the surface the duplication session hands out.
    pub fn native_size(&self) -> (u32, u32) {
        self.rotation
            .native_size(self.rect.width(), self.rect.height())
    }
}
