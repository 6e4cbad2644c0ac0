//! ShOGLE render core.
//!
//! Backend-agnostic pieces of the renderer: resource handles and registries,
//! frame-scoped memory, command recording and the interface a graphics
//! backend implements. `shogle-gl` provides the OpenGL backend; the
//! [`backend::HeadlessBackend`] runs everything on the CPU for tests.

pub mod backend;
pub mod context;
pub mod error;
pub mod expected;
pub mod handle;
pub mod memory;
pub mod render;
pub mod resource;

pub mod logging;
pub mod time;

pub use backend::{Backend, BackendError, BackendResult, RenderLimits};
pub use context::{BufferMap, Context, ContextConfig, FrameStats, DEFAULT_FRAMEBUFFER};
pub use error::{ErrorKind, RenderError, RenderResult};
pub use expected::Expected;
