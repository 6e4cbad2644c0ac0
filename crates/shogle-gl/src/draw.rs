//! Frame execution: batches, clears, pipeline state and draw calls.

use glow::HasContext;

use shogle_core::handle::RawHandle;
use shogle_core::render::{
    DrawCmd, ExternalTarget, RenderCmdKind, RenderData, Uniform, UniformData,
};
use shogle_core::resource::{BufferKind, ClearFlags, ClearState, PipelineTests, Rect2d};
use shogle_core::{BackendError, BackendResult};

use crate::convert::{self, gl_int};
use crate::objects::{GlProgram, Objects};

/// Upper bound on errors drained after one batch; a lost context can report
/// the same error forever.
const MAX_DRAINED_ERRORS: usize = 16;

/// Runs the batches of one frame against the current context.
pub(crate) struct Executor<'a> {
    pub gl: &'a glow::Context,
    pub objects: &'a mut Objects,
    pub embedded: bool,
    pub debug_checks: bool,
    pub applied: AppliedProgram,
}

/// Program whose fixed-function state is currently applied.
#[derive(Debug, Default)]
pub(crate) struct AppliedProgram(Option<RawHandle>);

impl AppliedProgram {
    /// Records `program` as applied; returns whether its state must be set.
    fn switch_to(&mut self, program: RawHandle) -> bool {
        if self.0 == Some(program) {
            return false;
        }
        self.0 = Some(program);
        true
    }

    /// Forgets the applied program after other code changed GL state.
    fn invalidate(&mut self) {
        self.0 = None;
    }
}

impl Executor<'_> {
    /// Executes every batch; a failing command or batch is logged and the
    /// first failure is returned once the frame is done.
    pub fn run(&mut self, batches: &[RenderData<'_>]) -> BackendResult<()> {
        self.applied.invalidate();
        let mut status = Ok(());
        for batch in batches {
            let result = self.run_batch(batch).and_then(|()| self.check_errors(batch.target));
            if let Err(e) = result {
                log::debug!("gl: batch for target {} failed: {e}", batch.target.0);
                if status.is_ok() {
                    status = Err(e);
                }
            }
        }
        // SAFETY: the context is current for the whole submit call.
        unsafe {
            self.gl.bind_vertex_array(None);
            self.gl.use_program(None);
        }
        status
    }

    fn run_batch(&mut self, batch: &RenderData<'_>) -> BackendResult<()> {
        let framebuffer = self.framebuffer(batch.target)?;
        // SAFETY: see `run`.
        unsafe {
            self.bind_target(framebuffer, batch.viewport);
            clear(self.gl, &batch.clear);
        }
        // The clear reset the write masks.
        self.applied.invalidate();

        let mut status = Ok(());
        for cmd in batch.commands {
            match &cmd.kind {
                RenderCmdKind::Draw(draw) => {
                    if let Err(e) = self.draw(draw) {
                        log::error!("gl: draw with program {} failed: {e}", draw.pipeline.0);
                        if status.is_ok() {
                            status = Err(e);
                        }
                    }
                }
                RenderCmdKind::External(callback) => {
                    callback.invoke(&ExternalTarget {
                        framebuffer: batch.target,
                        viewport: batch.viewport,
                        sort_group: cmd.sort_group,
                    });
                    // The callback may have touched any state.
                    self.applied.invalidate();
                    // SAFETY: see `run`.
                    unsafe { self.bind_target(framebuffer, batch.viewport) };
                }
            }
        }
        status
    }

    fn framebuffer(&self, target: RawHandle) -> BackendResult<Option<glow::Framebuffer>> {
        if target.0 == 0 {
            return Ok(None);
        }
        Ok(Some(self.objects.framebuffers.get(target)?.raw))
    }

    unsafe fn bind_target(&self, framebuffer: Option<glow::Framebuffer>, viewport: Rect2d) {
        let gl = self.gl;
        // SAFETY: forwarded from the caller.
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, framebuffer);
            gl.viewport(viewport.x, viewport.y, saturate(viewport.width), saturate(viewport.height));
        }
    }

    fn draw(&mut self, cmd: &DrawCmd<'_>) -> BackendResult<()> {
        let gl = self.gl;
        let objects = &mut *self.objects;
        let program = objects.programs.get_mut(cmd.pipeline)?;
        let Some(vao) = program.vao else {
            return Err(BackendError::Unsupported("compute program used for a draw".to_owned()));
        };

        // SAFETY: see `run`. Every name comes from a live table entry.
        unsafe {
            if self.applied.switch_to(cmd.pipeline) {
                gl.use_program(Some(program.raw));
                gl.bind_vertex_array(Some(vao));
                apply_tests(gl, &program.tests, self.embedded);
            }

            match cmd.options.scissor {
                Some(r) => {
                    gl.enable(glow::SCISSOR_TEST);
                    gl.scissor(r.x, r.y, saturate(r.width), saturate(r.height));
                }
                None => gl.disable(glow::SCISSOR_TEST),
            }

            for v in cmd.vertex_buffers {
                let buffer = objects.buffers.get(v.buffer)?;
                gl.bind_vertex_buffer(
                    v.location,
                    Some(buffer.raw),
                    gl_int(v.offset)?,
                    program.stride(v.location),
                );
            }

            let index = match cmd.index_buffer {
                Some(ib) => {
                    gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(objects.buffers.get(ib.buffer)?.raw));
                    Some(ib)
                }
                None => {
                    gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, None);
                    None
                }
            };

            for sb in cmd.shader_buffers {
                let target = match sb.kind {
                    BufferKind::Uniform => glow::UNIFORM_BUFFER,
                    BufferKind::ShaderStorage => glow::SHADER_STORAGE_BUFFER,
                    other => {
                        return Err(BackendError::Api(format!(
                            "{other:?} buffer bound as a shader buffer"
                        )));
                    }
                };
                let buffer = objects.buffers.get(sb.buffer)?;
                gl.bind_buffer_range(
                    target,
                    sb.binding,
                    Some(buffer.raw),
                    gl_int(sb.offset)?,
                    gl_int(sb.size)?,
                );
            }

            for t in cmd.textures {
                let texture = objects.textures.get(t.texture)?;
                gl.active_texture(glow::TEXTURE0 + t.unit);
                gl.bind_texture(convert::texture_target(texture.kind), Some(texture.raw));
            }

            for uniform in cmd.uniforms {
                if let Some(location) = uniform_location(gl, program, uniform) {
                    set_uniform(gl, &location, &uniform.data);
                }
            }

            let mode = convert::primitive(program.primitive);
            let opts = &cmd.options;
            let count = gl_int(opts.count)?;
            let instances = gl_int(opts.instances.max(1))?;
            match index {
                Some(ib) => {
                    let ty = convert::index_type(ib.format);
                    let offset = gl_int(ib.offset + opts.offset as usize * ib.format.size())?;
                    match (instances > 1, opts.base_vertex != 0) {
                        (false, false) => gl.draw_elements(mode, count, ty, offset),
                        (false, true) => {
                            gl.draw_elements_base_vertex(mode, count, ty, offset, opts.base_vertex)
                        }
                        (true, false) => gl.draw_elements_instanced(mode, count, ty, offset, instances),
                        (true, true) => gl.draw_elements_instanced_base_vertex(
                            mode,
                            count,
                            ty,
                            offset,
                            instances,
                            opts.base_vertex,
                        ),
                    }
                }
                None => {
                    let first = gl_int(opts.offset)?;
                    if instances > 1 {
                        gl.draw_arrays_instanced(mode, first, count, instances);
                    } else {
                        gl.draw_arrays(mode, first, count);
                    }
                }
            }
        }
        Ok(())
    }

    /// Drains `glGetError` when debug checks are on.
    fn check_errors(&self, target: RawHandle) -> BackendResult<()> {
        if !self.debug_checks {
            return Ok(());
        }
        let mut first = None;
        for _ in 0..MAX_DRAINED_ERRORS {
            // SAFETY: see `run`.
            let code = unsafe { self.gl.get_error() };
            if code == glow::NO_ERROR {
                break;
            }
            log::error!("gl: {} while drawing into target {}", convert::error_name(code), target.0);
            first.get_or_insert(code);
        }
        match first {
            None => Ok(()),
            Some(glow::OUT_OF_MEMORY) => Err(BackendError::OutOfMemory),
            Some(code) => Err(BackendError::Api(convert::error_name(code).to_owned())),
        }
    }
}

fn saturate(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

/// Clears the bound target. Write masks and scissoring are reset first so
/// pipeline state never limits a clear.
unsafe fn clear(gl: &glow::Context, state: &ClearState) {
    let mask = convert::clear_mask(state.flags);
    if mask == 0 {
        return;
    }
    // SAFETY: forwarded from the caller.
    unsafe {
        gl.disable(glow::SCISSOR_TEST);
        if state.flags.contains(ClearFlags::COLOR) {
            let c = state.color;
            gl.color_mask(true, true, true, true);
            gl.clear_color(c.r, c.g, c.b, c.a);
        }
        if state.flags.contains(ClearFlags::DEPTH) {
            gl.depth_mask(true);
            gl.clear_depth_f32(state.depth);
        }
        if state.flags.contains(ClearFlags::STENCIL) {
            gl.stencil_mask(!0);
            gl.clear_stencil(state.stencil);
        }
        gl.clear(mask);
    }
}

unsafe fn apply_tests(gl: &glow::Context, tests: &PipelineTests, embedded: bool) {
    // SAFETY: forwarded from the caller.
    unsafe {
        match tests.depth {
            Some(depth) => {
                gl.enable(glow::DEPTH_TEST);
                gl.depth_func(convert::compare_func(depth.func));
                gl.depth_mask(depth.write);
            }
            None => gl.disable(glow::DEPTH_TEST),
        }

        match tests.stencil {
            Some(s) => {
                gl.enable(glow::STENCIL_TEST);
                gl.stencil_func(convert::compare_func(s.func), s.reference, s.read_mask);
                gl.stencil_op(
                    convert::stencil_op(s.fail),
                    convert::stencil_op(s.depth_fail),
                    convert::stencil_op(s.pass),
                );
                gl.stencil_mask(s.write_mask);
            }
            None => gl.disable(glow::STENCIL_TEST),
        }

        match tests.blend {
            Some(b) => {
                gl.enable(glow::BLEND);
                gl.blend_func_separate(
                    convert::blend_factor(b.src_color),
                    convert::blend_factor(b.dst_color),
                    convert::blend_factor(b.src_alpha),
                    convert::blend_factor(b.dst_alpha),
                );
                gl.blend_equation_separate(convert::blend_op(b.color_op), convert::blend_op(b.alpha_op));
                let c = b.constant;
                gl.blend_color(c.r, c.g, c.b, c.a);
            }
            None => gl.disable(glow::BLEND),
        }

        match tests.cull {
            Some(mode) => {
                gl.enable(glow::CULL_FACE);
                gl.cull_face(convert::cull_face(mode));
            }
            None => gl.disable(glow::CULL_FACE),
        }
        gl.front_face(convert::front_face(tests.front_face));

        // GLES has no polygon mode.
        if !embedded {
            gl.polygon_mode(glow::FRONT_AND_BACK, convert::polygon_mode(tests.polygon));
        }
    }
}

/// Cached location of `uniform`; names the linker dropped are looked up
/// once and then skipped.
fn uniform_location(
    gl: &glow::Context,
    program: &mut GlProgram,
    uniform: &Uniform<'_>,
) -> Option<glow::UniformLocation> {
    if let Some(location) = program.uniforms.get(uniform.name) {
        return location.clone();
    }
    // SAFETY: the context is current during submit.
    let location = unsafe { gl.get_uniform_location(program.raw, uniform.name) };
    if location.is_none() {
        log::warn!("gl: uniform `{}` is not active in program {}", uniform.name, program.raw.0);
    }
    program.uniforms.insert(uniform.name.to_owned(), location.clone());
    location
}

unsafe fn set_uniform(gl: &glow::Context, location: &glow::UniformLocation, data: &UniformData) {
    let l = Some(location);
    // SAFETY: forwarded from the caller; the owning program is in use.
    unsafe {
        match *data {
            UniformData::Float(x) => gl.uniform_1_f32(l, x),
            UniformData::Vec2([x, y]) => gl.uniform_2_f32(l, x, y),
            UniformData::Vec3([x, y, z]) => gl.uniform_3_f32(l, x, y, z),
            UniformData::Vec4([x, y, z, w]) => gl.uniform_4_f32(l, x, y, z, w),
            UniformData::Int(x) => gl.uniform_1_i32(l, x),
            UniformData::IVec2([x, y]) => gl.uniform_2_i32(l, x, y),
            UniformData::IVec3([x, y, z]) => gl.uniform_3_i32(l, x, y, z),
            UniformData::IVec4([x, y, z, w]) => gl.uniform_4_i32(l, x, y, z, w),
            UniformData::UInt(x) => gl.uniform_1_u32(l, x),
            UniformData::Mat3(ref m) => gl.uniform_matrix_3_f32_slice(l, false, m),
            UniformData::Mat4(ref m) => gl.uniform_matrix_4_f32_slice(l, false, m),
        }
    }
}
