use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

/// Two-dimensional size in texels / pixels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

impl Extent2d {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Three-dimensional size in texels.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Extent3d {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Extent3d {
    #[inline]
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self { width, height, depth }
    }

    #[inline]
    pub const fn flat(width: u32, height: u32) -> Self {
        Self { width, height, depth: 1 }
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0 || self.depth == 0
    }

    #[inline]
    pub const fn to_2d(self) -> Extent2d {
        Extent2d { width: self.width, height: self.height }
    }
}

impl From<Extent2d> for Extent3d {
    fn from(e: Extent2d) -> Self {
        Self::flat(e.width, e.height)
    }
}

/// Pixel rectangle, origin bottom-left as in GL window space.
///
/// Used for viewports and scissor boxes.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Rect2d {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2d {
    #[inline]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle covering a whole surface of size `extent`.
    #[inline]
    pub const fn from_extent(extent: Extent2d) -> Self {
        Self { x: 0, y: 0, width: extent.width, height: extent.height }
    }
}

/// Linear RGBA color. Laid out as `vec4` so it can go straight into a
/// uniform block.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a color from `0`–`255` channel bytes.
    #[inline]
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0)
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

bitflags! {
    /// Buffers cleared at the start of a batch.
    #[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
    pub struct ClearFlags: u32 {
        const COLOR   = 1 << 0;
        const DEPTH   = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// Clear values applied to a framebuffer before its batch executes.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClearState {
    pub color: Color,
    pub depth: f32,
    pub stencil: i32,
    pub flags: ClearFlags,
}

impl Default for ClearState {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            depth: 1.0,
            stencil: 0,
            flags: ClearFlags::COLOR | ClearFlags::DEPTH,
        }
    }
}

impl ClearState {
    /// Clear state that leaves every attachment untouched.
    pub const fn load() -> Self {
        Self { color: Color::TRANSPARENT, depth: 1.0, stencil: 0, flags: ClearFlags::empty() }
    }

    #[inline]
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_bytes_match_vec4() {
        let c = Color::from_rgba8(255, 0, 51, 255);
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&c));
        assert_eq!(floats, &[1.0, 0.0, 0.2, 1.0]);
        assert_eq!(std::mem::size_of::<Color>(), 16);
    }

    #[test]
    fn load_clears_nothing() {
        assert!(ClearState::load().flags.is_empty());
        assert!(ClearState::default().flags.contains(ClearFlags::COLOR | ClearFlags::DEPTH));
    }

    #[test]
    fn extent_emptiness() {
        assert!(Extent2d::new(0, 4).is_empty());
        assert!(!Extent3d::from(Extent2d::new(2, 2)).is_empty());
        assert_eq!(Rect2d::from_extent(Extent2d::new(3, 4)), Rect2d::new(0, 0, 3, 4));
    }
}
