use crate::resource::{ClearState, Extent2d};

/// Construction parameters for a [`Context`](super::Context).
///
/// Capacities are starting points; every pool grows on demand and keeps its
/// size across frames.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Size of the first frame-arena block in bytes.
    pub arena_block_size: usize,

    /// Target batches preallocated per frame.
    pub batch_capacity: usize,

    /// Commands preallocated per batch.
    pub command_capacity: usize,

    /// Initial size of the window-system framebuffer.
    ///
    /// Keep it in sync with the window through
    /// [`resize_default_framebuffer`](super::Context::resize_default_framebuffer).
    pub default_extent: Extent2d,

    /// Clear state of the default framebuffer.
    pub default_clear: ClearState,

    /// Log a warning for every resource still alive when the context is
    /// dropped. Such resources are destroyed either way.
    pub report_leaks: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            arena_block_size: 64 * 1024,
            batch_capacity: 4,
            command_capacity: 64,
            default_extent: Extent2d::new(800, 600),
            default_clear: ClearState::default(),
            report_leaks: true,
        }
    }
}
