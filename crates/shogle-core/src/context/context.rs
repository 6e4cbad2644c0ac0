use crate::backend::{Backend, BackendResult, RenderLimits};
use crate::error::{RenderError, RenderResult};
use crate::handle::{BufferHandle, FramebufferHandle, Handle, RawHandle, ResourceList};
use crate::memory::{AllocError, Arena, ArenaVec};
use crate::render::{
    ExternalCmdDesc, ExternalTarget, FrameRecorder, IndexBinding, RecordedDraw, RecordedKind,
    RecordedUniform, RenderCmdDesc, RenderData, ShaderBufferBinding, TextureBinding, VertexBinding,
};
use crate::resource::{
    BufferKind, ClearState, Color, Extent2d, FramebufferInfo, Rect2d, MAX_VERTEX_BINDINGS,
};

use super::config::ContextConfig;
use super::nodes::{BufferNode, FramebufferNode, PipelineNode, ShaderNode, TextureNode};

/// Handle of the window-system framebuffer.
///
/// It never names a slot of the framebuffer registry and cannot be destroyed.
pub const DEFAULT_FRAMEBUFFER: FramebufferHandle = Handle::new(u32::MAX, u32::MAX);

/// Summary of one submitted frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame_index: u64,
    pub batches: usize,
    pub commands: usize,
    /// Commands lost to host allocation failure.
    pub dropped_commands: usize,
    /// Frame arena usage right before it was cleared.
    pub arena_bytes: usize,
}

/// Owner of a backend and of every resource created through it.
///
/// Frame state machine: idle → [`start_frame`](Self::start_frame) → recording
/// → [`end_frame`](Self::end_frame) → idle. Commands are copied into a frame
/// arena while recording and handed to the backend in one call at the end of
/// the frame.
pub struct Context {
    pub(super) backend: Box<dyn Backend>,
    pub(super) limits: RenderLimits,
    pub(super) arena: Arena,

    pub(super) buffers: ResourceList<BufferNode>,
    pub(super) textures: ResourceList<TextureNode>,
    pub(super) shaders: ResourceList<ShaderNode>,
    pub(super) pipelines: ResourceList<PipelineNode>,
    pub(super) framebuffers: ResourceList<FramebufferNode>,

    default_raw: RawHandle,
    pub(super) default_info: FramebufferInfo,

    recorder: FrameRecorder,
    recording: bool,
    frame_index: u64,
    dropped: usize,
    report_leaks: bool,
}

impl Context {
    /// Takes ownership of `backend`.
    ///
    /// Fails only if the frame arena or the batch pool cannot be allocated.
    pub fn new<B: Backend + 'static>(backend: B, config: ContextConfig) -> RenderResult<Self> {
        let arena = Arena::try_new(config.arena_block_size).ok_or_else(|| {
            RenderError::allocation(format!(
                "cannot allocate a {} byte frame arena",
                config.arena_block_size
            ))
        })?;
        let recorder = FrameRecorder::with_capacity(config.batch_capacity, config.command_capacity)?;

        let limits = backend.limits();
        let default_raw = backend.default_framebuffer();
        log::debug!(
            "context created on backend `{}` (default framebuffer {}x{})",
            backend.name(),
            config.default_extent.width,
            config.default_extent.height
        );

        Ok(Self {
            backend: Box::new(backend),
            limits,
            arena,
            buffers: ResourceList::new(),
            textures: ResourceList::new(),
            shaders: ResourceList::new(),
            pipelines: ResourceList::new(),
            framebuffers: ResourceList::new(),
            default_raw,
            default_info: FramebufferInfo {
                extent: config.default_extent,
                viewport: Rect2d::from_extent(config.default_extent),
                clear: config.default_clear,
                color_attachments: 1,
                has_depth: true,
            },
            recorder,
            recording: false,
            frame_index: 0,
            dropped: 0,
            report_leaks: config.report_leaks,
        })
    }

    #[inline]
    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    #[inline]
    pub fn limits(&self) -> &RenderLimits {
        &self.limits
    }

    #[inline]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Index of the next frame to be ended.
    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Releases frame-arena blocks beyond the first.
    ///
    /// Useful after a one-off frame much larger than usual.
    pub fn trim_frame_memory(&mut self) {
        if !self.recording {
            self.arena.release_unused();
        }
    }

    /// Invalidates scratch data used by a creation call.
    ///
    /// While recording the arena also holds the frame, so it is only cleared
    /// between frames.
    pub(super) fn end_scratch(&mut self) {
        if !self.recording {
            self.arena.clear();
        }
    }

    // ── default framebuffer and framebuffer state ────────────────────────

    #[inline]
    pub fn default_framebuffer(&self) -> FramebufferHandle {
        DEFAULT_FRAMEBUFFER
    }

    #[inline]
    pub(super) fn default_raw(&self) -> RawHandle {
        self.default_raw
    }

    /// Follows a window resize; the viewport is reset to the full surface.
    pub fn resize_default_framebuffer(&mut self, extent: Extent2d) {
        self.default_info.extent = extent;
        self.default_info.viewport = Rect2d::from_extent(extent);
        log::debug!("default framebuffer resized to {}x{}", extent.width, extent.height);
    }

    pub fn framebuffer_info(&self, fb: FramebufferHandle) -> Option<FramebufferInfo> {
        if fb == DEFAULT_FRAMEBUFFER {
            return Some(self.default_info);
        }
        self.framebuffers.get(fb.index(), fb.generation()).map(|n| n.info)
    }

    fn framebuffer_info_mut(&mut self, fb: FramebufferHandle) -> RenderResult<&mut FramebufferInfo> {
        if fb == DEFAULT_FRAMEBUFFER {
            return Ok(&mut self.default_info);
        }
        self.framebuffers
            .get_mut(fb.index(), fb.generation())
            .map(|n| &mut n.info)
            .ok_or_else(|| RenderError::invalid_handle(format!("{fb:?} is not a live framebuffer")))
    }

    /// Viewport applied when the framebuffer's batch starts.
    ///
    /// Takes effect from the next batch opened for the target.
    pub fn set_viewport(&mut self, fb: FramebufferHandle, viewport: Rect2d) -> RenderResult<()> {
        self.framebuffer_info_mut(fb)?.viewport = viewport;
        Ok(())
    }

    pub fn set_clear_color(&mut self, fb: FramebufferHandle, color: Color) -> RenderResult<()> {
        self.framebuffer_info_mut(fb)?.clear.color = color;
        Ok(())
    }

    pub fn set_clear_state(&mut self, fb: FramebufferHandle, clear: ClearState) -> RenderResult<()> {
        self.framebuffer_info_mut(fb)?.clear = clear;
        Ok(())
    }

    // ── frame ────────────────────────────────────────────────────────────

    /// # Panics
    /// Panics if a frame is already being recorded.
    pub fn start_frame(&mut self) {
        assert!(!self.recording, "start_frame called while frame {} is recording", self.frame_index);
        self.recording = true;
        self.dropped = 0;
    }

    /// Records a draw into the batch of `desc.target`.
    ///
    /// Every span of `desc` is copied, so it may point at temporaries.
    ///
    /// # Panics
    /// Panics outside `start_frame`/`end_frame`, or if `desc` names a
    /// resource that is not alive.
    pub fn submit_render_command(&mut self, desc: &RenderCmdDesc<'_>) {
        assert!(self.recording, "submit_render_command called outside of a frame");
        let (target, clear, viewport) = self.resolve_target(desc.target);
        let pipeline = self
            .pipelines
            .get(desc.pipeline.index(), desc.pipeline.generation())
            .unwrap_or_else(|| panic!("render command uses dead pipeline {:?}", desc.pipeline));
        assert!(!pipeline.info.compute, "compute pipeline submitted as a draw");
        let pipeline = pipeline.raw;

        let recorded = match self.copy_draw(desc, pipeline) {
            Ok(d) => d,
            Err(err) => {
                self.drop_command(&err.to_string());
                return;
            }
        };
        let pushed = self.recorder.push(
            target,
            move || (clear, viewport),
            desc.sort_group,
            RecordedKind::Draw(recorded),
        );
        if let Err(err) = pushed {
            self.drop_command(&err.to_string());
        }
    }

    /// Records a closure run by the backend at this point of the batch.
    ///
    /// # Panics
    /// Panics outside `start_frame`/`end_frame`, or if the target is dead.
    pub fn submit_external_command<F>(&mut self, desc: &ExternalCmdDesc, callback: F)
    where
        F: Fn(&ExternalTarget) + 'static,
    {
        assert!(self.recording, "submit_external_command called outside of a frame");
        let (target, clear, viewport) = self.resolve_target(desc.target);

        let stored = match self.arena.construct(callback) {
            Ok(f) => {
                let f: &(dyn Fn(&ExternalTarget) + 'static) = &*f;
                // SAFETY: `f` was just constructed in the frame arena.
                unsafe { self.arena.detach(f) }
            }
            Err(err) => {
                self.drop_command(&err.to_string());
                return;
            }
        };
        let pushed = self.recorder.push(
            target,
            move || (clear, viewport),
            desc.sort_group,
            RecordedKind::Closure(stored),
        );
        if let Err(err) = pushed {
            self.drop_command(&err.to_string());
        }
    }

    /// Records a plain function run by the backend at this point of the batch.
    pub fn submit_external_fn(&mut self, desc: &ExternalCmdDesc, callback: fn(&ExternalTarget)) {
        assert!(self.recording, "submit_external_fn called outside of a frame");
        let (target, clear, viewport) = self.resolve_target(desc.target);
        let pushed = self.recorder.push(
            target,
            move || (clear, viewport),
            desc.sort_group,
            RecordedKind::Function(callback),
        );
        if let Err(err) = pushed {
            self.drop_command(&err.to_string());
        }
    }

    /// Sorts every batch, hands the frame to the backend and clears the
    /// frame arena.
    ///
    /// Backend execution errors are logged, not returned.
    ///
    /// # Panics
    /// Panics if no frame is being recorded.
    pub fn end_frame(&mut self) -> FrameStats {
        assert!(self.recording, "end_frame called without start_frame");
        self.recording = false;

        let batches = self.recorder.batch_count();
        let commands = self.recorder.command_count();

        match flush(&mut *self.backend, &self.arena, &mut self.recorder) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                log::error!("frame {}: backend failed to execute: {err}", self.frame_index);
            }
            Err(err) => {
                log::error!(
                    "frame {}: {commands} command(s) dropped while building batches: {err}",
                    self.frame_index
                );
                self.dropped += commands;
            }
        }

        let stats = FrameStats {
            frame_index: self.frame_index,
            batches,
            commands,
            dropped_commands: self.dropped,
            arena_bytes: self.arena.allocated_bytes(),
        };

        self.recorder.reset();
        self.arena.clear();
        self.frame_index += 1;

        log::trace!(
            "frame {}: {} batch(es), {} command(s), {} arena bytes",
            stats.frame_index,
            stats.batches,
            stats.commands,
            stats.arena_bytes
        );
        stats
    }

    /// Presents the default framebuffer.
    ///
    /// # Panics
    /// Panics while a frame is being recorded.
    pub fn swap_buffers(&mut self) -> RenderResult<()> {
        assert!(!self.recording, "swap_buffers called before end_frame");
        self.backend
            .swap_buffers()
            .map_err(|e| RenderError::from_backend("swap_buffers", e))
    }

    /// Blocks until the backend has finished all submitted work.
    pub fn device_wait(&mut self) {
        self.backend.device_wait();
    }

    fn drop_command(&mut self, reason: &str) {
        self.dropped += 1;
        log::error!("frame {}: command dropped: {reason}", self.frame_index);
    }

    fn resolve_target(&self, fb: FramebufferHandle) -> (RawHandle, ClearState, Rect2d) {
        if fb == DEFAULT_FRAMEBUFFER {
            return (self.default_raw, self.default_info.clear, self.default_info.viewport);
        }
        let node = self
            .framebuffers
            .get(fb.index(), fb.generation())
            .unwrap_or_else(|| panic!("command targets dead framebuffer {fb:?}"));
        (node.raw, node.info.clear, node.info.viewport)
    }

    /// Resolves handles and copies the spans of `desc` into the frame arena.
    fn copy_draw(&self, desc: &RenderCmdDesc<'_>, pipeline: RawHandle) -> Result<RecordedDraw, AllocError> {
        let arena = &self.arena;

        let buffer = |h: BufferHandle| {
            self.buffers
                .get(h.index(), h.generation())
                .unwrap_or_else(|| panic!("render command uses dead buffer {h:?}"))
        };

        let vertex_buffers = arena.alloc_slice_from_iter(desc.vertex_buffers.iter().map(|v| {
            assert!(
                (v.location as usize) < MAX_VERTEX_BINDINGS,
                "vertex binding location {} exceeds the limit of {MAX_VERTEX_BINDINGS}",
                v.location
            );
            VertexBinding { location: v.location, buffer: buffer(v.buffer).raw, offset: v.offset }
        }))?;

        let index_buffer = desc.index_buffer.map(|ib| IndexBinding {
            buffer: buffer(ib.buffer).raw,
            format: ib.format,
            offset: ib.offset,
        });

        let shader_buffers = arena.alloc_slice_from_iter(desc.shader_buffers.iter().map(|sb| {
            let node = buffer(sb.buffer);
            assert!(
                matches!(node.info.kind, BufferKind::Uniform | BufferKind::ShaderStorage),
                "{:?} bound as a shader buffer is a {:?} buffer",
                sb.buffer,
                node.info.kind
            );
            assert!(sb.offset < node.info.size, "shader buffer offset past the end of {:?}", sb.buffer);
            let size = if sb.size == 0 { node.info.size - sb.offset } else { sb.size };
            assert!(
                sb.offset.checked_add(size).is_some_and(|end| end <= node.info.size),
                "shader buffer range {}+{size} exceeds the {} bytes of {:?}",
                sb.offset,
                node.info.size,
                sb.buffer
            );
            ShaderBufferBinding {
                buffer: node.raw,
                kind: node.info.kind,
                binding: sb.binding,
                offset: sb.offset,
                size,
            }
        }))?;

        let max_units = self.limits.max_texture_units;
        let textures = arena.alloc_slice_from_iter(desc.textures.iter().map(|t| {
            let node = self
                .textures
                .get(t.texture.index(), t.texture.generation())
                .unwrap_or_else(|| panic!("render command uses dead texture {:?}", t.texture));
            assert!(t.unit < max_units, "texture unit {} exceeds the limit of {max_units}", t.unit);
            TextureBinding { texture: node.raw, kind: node.info.kind, unit: t.unit }
        }))?;

        let mut uniforms = ArenaVec::with_capacity_in(desc.uniforms.len(), arena)?;
        for u in desc.uniforms {
            let name = arena.alloc_str(u.name)?;
            // SAFETY: `name` was allocated by `arena` above.
            let name = unsafe { arena.detach(&*name) };
            uniforms.push(RecordedUniform { name, data: u.data })?;
        }
        let uniforms = uniforms.into_slice();

        // SAFETY: every span below was allocated by `arena` in this function.
        unsafe {
            Ok(RecordedDraw {
                pipeline,
                vertex_buffers: arena.detach(&*vertex_buffers),
                index_buffer,
                shader_buffers: arena.detach(&*shader_buffers),
                textures: arena.detach(&*textures),
                uniforms: arena.detach(&*uniforms),
                options: desc.options,
            })
        }
    }
}

/// Builds the frame's batch array in `arena` and submits it.
fn flush(
    backend: &mut dyn Backend,
    arena: &Arena,
    recorder: &mut FrameRecorder,
) -> Result<BackendResult<()>, AllocError> {
    let batches = recorder.batches_mut();
    let mut data = ArenaVec::with_capacity_in(batches.len(), arena)?;

    for batch in batches.iter_mut() {
        batch.sort();
        let mut commands = ArenaVec::with_capacity_in(batch.commands.len(), arena)?;
        for cmd in &batch.commands {
            commands.push(cmd.resolve(arena)?)?;
        }
        data.push(RenderData {
            target: batch.target,
            clear: batch.clear,
            viewport: batch.viewport,
            commands: commands.into_slice(),
        })?;
    }

    Ok(backend.submit_render_data(data.as_slice()))
}

impl Drop for Context {
    fn drop(&mut self) {
        if self.recording {
            log::warn!("context dropped while frame {} was recording", self.frame_index);
            self.recorder.reset();
        }
        self.backend.device_wait();

        let report = self.report_leaks;
        let backend = &mut self.backend;
        let mut leaked = 0;
        leaked += sweep(&mut self.framebuffers, "framebuffer", report, |n| {
            backend.destroy_framebuffer(n.raw)
        });
        leaked += sweep(&mut self.pipelines, "pipeline", report, |n| backend.destroy_pipeline(n.raw));
        leaked += sweep(&mut self.shaders, "shader", report, |n| backend.destroy_shader(n.raw));
        leaked += sweep(&mut self.textures, "texture", report, |n| backend.destroy_texture(n.raw));
        leaked += sweep(&mut self.buffers, "buffer", report, |n| backend.destroy_buffer(n.raw));

        if leaked > 0 && report {
            log::warn!("{leaked} leaked resource(s) destroyed at context teardown");
        }
        log::debug!("context on backend `{}` destroyed", self.backend.name());
    }
}

/// Destroys every node left in `list`, newest first.
fn sweep<T>(
    list: &mut ResourceList<T>,
    label: &str,
    report: bool,
    mut release: impl FnMut(&T),
) -> usize {
    let mut count = 0;
    while let Some((index, node)) = list.pop_front() {
        if report {
            log::warn!("leaked {label} in slot {index} destroyed at context teardown");
        }
        release(&node);
        count += 1;
    }
    count
}
