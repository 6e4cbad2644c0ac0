//! OpenGL backend for `shogle-core`, built on `glow`.
//!
//! The window layer creates the context and hands it over already current:
//!
//! ```no_run
//! # fn window_context() -> std::sync::Arc<glow::Context> { unimplemented!() }
//! use shogle_core::{Context, ContextConfig};
//! use shogle_gl::{GlBackend, GlInit, Headless};
//!
//! # fn main() -> anyhow::Result<()> {
//! let gl = window_context();
//! // SAFETY: `gl` is current on this thread for the lifetime of the backend.
//! let backend = unsafe { GlBackend::new(gl, Headless, GlInit::default())? };
//! let mut ctx = Context::new(backend, ContextConfig::default())?;
//! ctx.start_frame();
//! ctx.end_frame();
//! ctx.swap_buffers()?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod convert;
mod draw;
mod init;
mod objects;
mod surface;

pub use backend::GlBackend;
pub use init::{GlInfo, GlInit};
pub use surface::{GlSurface, Headless};

pub use glow;
