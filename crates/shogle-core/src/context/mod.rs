//! The render context: resource registries, frame recording and teardown.
//!
//! A [`Context`] owns one backend. Resources are created through it and
//! named by generation-checked handles; every frame is recorded between
//! [`Context::start_frame`] and [`Context::end_frame`] and reaches the
//! backend as one batch per touched framebuffer.

mod config;
mod context;
mod map;
mod nodes;
mod resources;

pub use config::ContextConfig;
pub use context::{Context, FrameStats, DEFAULT_FRAMEBUFFER};
pub use map::BufferMap;
