use std::ptr::NonNull;
use std::sync::Arc;

use glow::HasContext;

use shogle_core::handle::RawHandle;
use shogle_core::render::RenderData;
use shogle_core::resource::{
    BufferCreateInfo, BufferData, FramebufferCreateInfo, MapAccess, MapRange, Origin3d,
    PipelineCreateInfo, ResolvedAttachment, SamplerOptions, ShaderCreateInfo, ShaderStage,
    TextureAddress, TextureCreateInfo, TextureImage, TextureKind, TextureUpload, VertexStep,
    image_byte_size,
};
use shogle_core::{Backend, BackendError, BackendResult, RenderLimits};

use crate::convert::{self, gl_int, AttribFetch, PixelFormat};
use crate::draw::{AppliedProgram, Executor};
use crate::init::{query_limits, GlInfo, GlInit};
use crate::objects::{
    GlBuffer, GlFramebuffer, GlName, GlProgram, GlShader, GlTexture, Objects,
};
use crate::surface::GlSurface;

/// [`Backend`] over an OpenGL 4.3 / GLES 3.1 context.
///
/// The window layer owns the context and keeps it current on the thread
/// that drives the backend.
pub struct GlBackend {
    gl: Arc<glow::Context>,
    surface: Box<dyn GlSurface>,
    init: GlInit,
    info: GlInfo,
    limits: RenderLimits,
    objects: Objects,
}

impl GlBackend {
    /// Wraps a loaded context.
    ///
    /// Fails if the driver is older than the version `init` asks for.
    ///
    /// # Safety
    /// `gl` must be current on the calling thread and stay current whenever
    /// the backend is used or dropped.
    pub unsafe fn new<S: GlSurface + 'static>(
        gl: Arc<glow::Context>,
        surface: S,
        init: GlInit,
    ) -> anyhow::Result<Self> {
        // SAFETY: forwarded from the caller.
        let info = unsafe { GlInfo::query(&gl) };
        let (api, required) = if info.embedded {
            ("OpenGL ES", init.min_es_version)
        } else {
            ("OpenGL", init.min_version)
        };
        anyhow::ensure!(
            info.at_least(required),
            "{api} {}.{} is older than the required {}.{} ({})",
            info.major,
            info.minor,
            required.0,
            required.1,
            info.renderer
        );

        // SAFETY: forwarded from the caller.
        let limits = unsafe { query_limits(&gl) };
        if init.srgb_framebuffer && !info.embedded {
            // SAFETY: forwarded from the caller.
            unsafe { gl.enable(glow::FRAMEBUFFER_SRGB) };
        }

        log::info!("gl: {} on {} ({})", info.version, info.renderer, info.vendor);
        log::debug!("gl: {limits:?}");

        Ok(Self {
            gl,
            surface: Box::new(surface),
            init,
            info,
            limits,
            objects: Objects::new(),
        })
    }

    /// The shared context, for code that draws next to the backend.
    #[inline]
    pub fn gl(&self) -> &Arc<glow::Context> {
        &self.gl
    }

    #[inline]
    pub fn info(&self) -> &GlInfo {
        &self.info
    }

    /// Number of GL objects the backend currently owns.
    #[inline]
    pub fn live_objects(&self) -> usize {
        self.objects.total()
    }

    /// Turns a pending allocation error into `OutOfMemory`.
    fn check_alloc(&self, what: &str) -> BackendResult<()> {
        // SAFETY: the context is current (see `new`).
        let code = unsafe { self.gl.get_error() };
        match code {
            glow::NO_ERROR => Ok(()),
            glow::OUT_OF_MEMORY => {
                log::error!("gl: out of memory creating {what}");
                Err(BackendError::OutOfMemory)
            }
            other => Err(BackendError::Api(format!(
                "{} creating {what}",
                convert::error_name(other)
            ))),
        }
    }
}

// ── texture helpers ──────────────────────────────────────────────────────

/// Uploads `image` into `layer_count` consecutive layers starting at `layer`.
///
/// # Safety
/// The context must be current and the destination texture bound to the
/// target of `kind`.
#[allow(clippy::too_many_arguments)]
unsafe fn upload_image(
    gl: &glow::Context,
    kind: TextureKind,
    pf: PixelFormat,
    image: &TextureImage<'_>,
    origin: Origin3d,
    layer: u32,
    layer_count: u32,
    level: u32,
) -> BackendResult<()> {
    let target = convert::texture_target(kind);
    let e = image.extent;
    let (x, y, z) = (gl_int(origin.x)?, gl_int(origin.y)?, gl_int(origin.z)?);
    let (w, h, d) = (gl_int(e.width)?, gl_int(e.height)?, gl_int(e.depth)?);
    let level = gl_int(level)?;

    // SAFETY: forwarded from the caller.
    unsafe {
        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, gl_int(image.alignment)?);
        match kind {
            TextureKind::D2 => gl.tex_sub_image_2d(
                target, level, x, y, w, h, pf.format, pf.ty, pixels(image.pixels),
            ),
            TextureKind::D3 => gl.tex_sub_image_3d(
                target, level, x, y, z, w, h, d, pf.format, pf.ty, pixels(image.pixels),
            ),
            TextureKind::D2Array => gl.tex_sub_image_3d(
                target,
                level,
                x,
                y,
                gl_int(layer)?,
                w,
                h,
                gl_int(layer_count)?,
                pf.format,
                pf.ty,
                pixels(image.pixels),
            ),
            TextureKind::Cubemap => {
                let face_bytes = image_byte_size(e, image.format, image.alignment, 1)
                    .ok_or_else(|| BackendError::Api("cubemap face size overflows".to_owned()))?;
                for (i, face) in image.pixels.chunks_exact(face_bytes).take(layer_count as usize).enumerate() {
                    gl.tex_sub_image_2d(
                        convert::cube_face(layer + i as u32),
                        level,
                        x,
                        y,
                        w,
                        h,
                        pf.format,
                        pf.ty,
                        pixels(face),
                    );
                }
            }
        }
        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 4);
    }
    Ok(())
}

fn pixels(bytes: &[u8]) -> glow::PixelUnpackData<'_> {
    glow::PixelUnpackData::Slice(Some(bytes))
}

/// # Safety
/// The context must be current and the texture bound to `target`.
unsafe fn apply_sampler(gl: &glow::Context, target: u32, sampler: &SamplerOptions, levels: u32) {
    let param = |v: u32| v as i32;
    // SAFETY: forwarded from the caller.
    unsafe {
        gl.tex_parameter_i32(
            target,
            glow::TEXTURE_MIN_FILTER,
            param(convert::min_filter(sampler.min_filter, sampler.mip_filter)),
        );
        gl.tex_parameter_i32(target, glow::TEXTURE_MAG_FILTER, param(convert::mag_filter(sampler.mag_filter)));
        gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_S, param(convert::address_mode(sampler.address_u)));
        gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_T, param(convert::address_mode(sampler.address_v)));
        gl.tex_parameter_i32(target, glow::TEXTURE_WRAP_R, param(convert::address_mode(sampler.address_w)));
        gl.tex_parameter_i32(target, glow::TEXTURE_MAX_LEVEL, param(levels.saturating_sub(1)));

        let border = [sampler.address_u, sampler.address_v, sampler.address_w]
            .contains(&TextureAddress::ClampToBorder);
        if border {
            gl.tex_parameter_f32_slice(target, glow::TEXTURE_BORDER_COLOR, &sampler.border_color.to_array());
        }
    }
}

/// # Safety
/// The context must be current and a framebuffer bound to `GL_FRAMEBUFFER`.
unsafe fn attach(gl: &glow::Context, point: u32, texture: glow::Texture, a: &ResolvedAttachment) -> BackendResult<()> {
    let level = gl_int(a.level)?;
    // SAFETY: forwarded from the caller.
    unsafe {
        match a.kind {
            TextureKind::D2 => {
                gl.framebuffer_texture_2d(glow::FRAMEBUFFER, point, glow::TEXTURE_2D, Some(texture), level)
            }
            TextureKind::Cubemap => gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                point,
                convert::cube_face(a.layer),
                Some(texture),
                level,
            ),
            TextureKind::D2Array | TextureKind::D3 => gl.framebuffer_texture_layer(
                glow::FRAMEBUFFER,
                point,
                Some(texture),
                level,
                gl_int(a.layer)?,
            ),
        }
    }
    Ok(())
}

impl Backend for GlBackend {
    fn name(&self) -> &str {
        "opengl"
    }

    fn limits(&self) -> RenderLimits {
        self.limits
    }

    fn default_framebuffer(&self) -> RawHandle {
        RawHandle(0)
    }

    // ── buffers ──────────────────────────────────────────────────────────

    fn create_buffer(&mut self, info: &BufferCreateInfo<'_>) -> BackendResult<RawHandle> {
        let gl = &self.gl;
        let size = gl_int(info.size)?;
        let usage = convert::buffer_usage(info.usage);
        let initial = match info.data {
            Some(data) => Some((gl_int(data.offset)?, data)),
            None => None,
        };

        // SAFETY: the context is current (see `new`).
        let raw = unsafe {
            let raw = gl.create_buffer().map_err(BackendError::Api)?;
            gl.bind_buffer(glow::COPY_WRITE_BUFFER, Some(raw));
            match initial {
                Some((0, data)) if data.bytes.len() == info.size => {
                    gl.buffer_data_u8_slice(glow::COPY_WRITE_BUFFER, data.bytes, usage)
                }
                Some((offset, data)) => {
                    gl.buffer_data_size(glow::COPY_WRITE_BUFFER, size, usage);
                    gl.buffer_sub_data_u8_slice(glow::COPY_WRITE_BUFFER, offset, data.bytes);
                }
                None => gl.buffer_data_size(glow::COPY_WRITE_BUFFER, size, usage),
            }
            gl.bind_buffer(glow::COPY_WRITE_BUFFER, None);
            raw
        };
        if let Err(e) = self.check_alloc("a buffer") {
            // SAFETY: `raw` was created above and is not referenced elsewhere.
            unsafe { self.gl.delete_buffer(raw) };
            return Err(e);
        }

        let handle = raw.raw_handle();
        self.objects.buffers.insert(
            handle,
            GlBuffer { raw, kind: info.kind, size: info.size, mapped: false },
        );
        log::trace!("gl: buffer {} ({:?}, {} bytes)", handle.0, info.kind, info.size);
        Ok(handle)
    }

    fn update_buffer(&mut self, buffer: RawHandle, data: BufferData<'_>) -> BackendResult<()> {
        let object = self.objects.buffers.get(buffer)?;
        if object.mapped {
            return Err(BackendError::Api(format!("buffer {} is mapped", buffer.0)));
        }
        let offset = gl_int(data.offset)?;
        // SAFETY: the context is current; `object.raw` is live.
        unsafe {
            self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, Some(object.raw));
            self.gl.buffer_sub_data_u8_slice(glow::COPY_WRITE_BUFFER, offset, data.bytes);
            self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, None);
        }
        Ok(())
    }

    fn map_buffer(
        &mut self,
        buffer: RawHandle,
        range: MapRange,
        access: MapAccess,
    ) -> BackendResult<NonNull<u8>> {
        let gl = &self.gl;
        let object = self.objects.buffers.get_mut(buffer)?;
        let (offset, len) = (gl_int(range.offset)?, gl_int(range.len)?);
        // SAFETY: the context is current; `object.raw` is live.
        let ptr = unsafe {
            gl.bind_buffer(glow::COPY_WRITE_BUFFER, Some(object.raw));
            let ptr = gl.map_buffer_range(glow::COPY_WRITE_BUFFER, offset, len, convert::map_access(access));
            gl.bind_buffer(glow::COPY_WRITE_BUFFER, None);
            ptr
        };
        let ptr = NonNull::new(ptr)
            .ok_or_else(|| BackendError::Api(format!("glMapBufferRange failed for buffer {}", buffer.0)))?;
        object.mapped = true;
        Ok(ptr)
    }

    fn unmap_buffer(&mut self, buffer: RawHandle) {
        let Ok(object) = self.objects.buffers.get_mut(buffer) else {
            log::warn!("gl: unmap of unknown buffer {}", buffer.0);
            return;
        };
        // SAFETY: the context is current; `object.raw` is live.
        unsafe {
            self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, Some(object.raw));
            self.gl.unmap_buffer(glow::COPY_WRITE_BUFFER);
            self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, None);
        }
        object.mapped = false;
    }

    fn destroy_buffer(&mut self, buffer: RawHandle) {
        if !buffer.is_valid() {
            return;
        }
        if let Some(object) = self.objects.buffers.remove(buffer) {
            // SAFETY: the context is current; deleting a mapped buffer unmaps it.
            unsafe { self.gl.delete_buffer(object.raw) };
        }
    }

    // ── textures ─────────────────────────────────────────────────────────

    fn create_texture(&mut self, info: &TextureCreateInfo<'_>) -> BackendResult<RawHandle> {
        let gl = &self.gl;
        let pf = convert::pixel_format(info.format);
        if info.data.is_some() && !pf.uploadable {
            return Err(BackendError::Unsupported(format!("pixel uploads in {:?}", info.format)));
        }
        let target = convert::texture_target(info.kind);
        let e = info.extent;
        let (w, h) = (gl_int(e.width)?, gl_int(e.height)?);
        let levels = gl_int(info.levels)?;
        let depth = match info.kind {
            TextureKind::D2Array => gl_int(info.layers)?,
            _ => gl_int(e.depth)?,
        };

        // SAFETY: the context is current (see `new`).
        let raw = unsafe {
            let raw = gl.create_texture().map_err(BackendError::Api)?;
            gl.bind_texture(target, Some(raw));
            match info.kind {
                TextureKind::D2 | TextureKind::Cubemap => {
                    gl.tex_storage_2d(target, levels, pf.internal, w, h)
                }
                TextureKind::D2Array | TextureKind::D3 => {
                    gl.tex_storage_3d(target, levels, pf.internal, w, h, depth)
                }
            }
            apply_sampler(gl, target, &info.sampler, info.levels);

            let mut status = Ok(());
            if let Some(image) = &info.data {
                status = upload_image(gl, info.kind, pf, image, Origin3d::default(), 0, info.layers, 0);
                if status.is_ok() && info.generate_mipmaps {
                    gl.generate_mipmap(target);
                }
            }
            gl.bind_texture(target, None);
            if let Err(e) = status.and_then(|()| self.check_alloc("a texture")) {
                gl.delete_texture(raw);
                return Err(e);
            }
            raw
        };

        let handle = raw.raw_handle();
        self.objects.textures.insert(
            handle,
            GlTexture {
                raw,
                kind: info.kind,
                format: info.format,
                extent: info.extent,
                layers: info.layers,
                levels: info.levels,
            },
        );
        log::trace!("gl: texture {} ({:?} {:?} {:?})", handle.0, info.kind, info.format, info.extent);
        Ok(handle)
    }

    fn update_texture(&mut self, texture: RawHandle, upload: &TextureUpload<'_>) -> BackendResult<()> {
        let object = self.objects.textures.get(texture)?;
        let pf = convert::pixel_format(object.format);
        if !pf.uploadable {
            return Err(BackendError::Unsupported(format!("pixel uploads in {:?}", object.format)));
        }
        let target = convert::texture_target(object.kind);
        // SAFETY: the context is current; `object.raw` is live.
        unsafe {
            self.gl.bind_texture(target, Some(object.raw));
            let status = upload_image(
                &self.gl,
                object.kind,
                pf,
                &upload.image,
                upload.origin,
                upload.layer,
                1,
                upload.level,
            );
            self.gl.bind_texture(target, None);
            status
        }
    }

    fn update_texture_sampler(
        &mut self,
        texture: RawHandle,
        sampler: &SamplerOptions,
    ) -> BackendResult<()> {
        let object = self.objects.textures.get(texture)?;
        let target = convert::texture_target(object.kind);
        // SAFETY: the context is current; `object.raw` is live.
        unsafe {
            self.gl.bind_texture(target, Some(object.raw));
            apply_sampler(&self.gl, target, sampler, object.levels);
            self.gl.bind_texture(target, None);
        }
        Ok(())
    }

    fn destroy_texture(&mut self, texture: RawHandle) {
        if !texture.is_valid() {
            return;
        }
        if let Some(object) = self.objects.textures.remove(texture) {
            // SAFETY: the context is current.
            unsafe { self.gl.delete_texture(object.raw) };
        }
    }

    // ── shaders and pipelines ────────────────────────────────────────────

    fn create_shader(&mut self, info: &ShaderCreateInfo<'_>) -> BackendResult<RawHandle> {
        let gl = &self.gl;
        // SAFETY: the context is current (see `new`).
        let raw = unsafe {
            let raw = gl.create_shader(convert::shader_type(info.stage)).map_err(BackendError::Api)?;
            gl.shader_source(raw, info.source);
            gl.compile_shader(raw);
            if !gl.get_shader_compile_status(raw) {
                let log = gl.get_shader_info_log(raw);
                gl.delete_shader(raw);
                log::debug!("gl: {:?} shader failed to compile:\n{log}", info.stage);
                return Err(BackendError::CompileFailed(log));
            }
            raw
        };

        let handle = raw.raw_handle();
        self.objects.shaders.insert(handle, GlShader { raw, stage: info.stage });
        Ok(handle)
    }

    fn destroy_shader(&mut self, shader: RawHandle) {
        if !shader.is_valid() {
            return;
        }
        if let Some(object) = self.objects.shaders.remove(shader) {
            // SAFETY: the context is current; linked programs keep their copy.
            unsafe { self.gl.delete_shader(object.raw) };
        }
    }

    fn create_pipeline(&mut self, info: &PipelineCreateInfo<'_>) -> BackendResult<RawHandle> {
        let mut shaders = Vec::with_capacity(info.stages.len());
        for stage in info.stages {
            let shader = self.objects.shaders.get(stage.shader)?;
            debug_assert_eq!(shader.stage, stage.stage);
            shaders.push(shader.raw);
        }
        let compute = info.stages.iter().any(|s| s.stage == ShaderStage::Compute);
        let gl = &self.gl;

        // SAFETY: the context is current (see `new`); every shader is live.
        let (raw, vao) = unsafe {
            let raw = gl.create_program().map_err(BackendError::Api)?;
            for &shader in &shaders {
                gl.attach_shader(raw, shader);
            }
            gl.link_program(raw);
            for &shader in &shaders {
                gl.detach_shader(raw, shader);
            }
            if !gl.get_program_link_status(raw) {
                let log = gl.get_program_info_log(raw);
                gl.delete_program(raw);
                log::debug!("gl: program failed to link:\n{log}");
                return Err(BackendError::LinkFailed(log));
            }

            let vao = if compute {
                None
            } else {
                let vao = match gl.create_vertex_array() {
                    Ok(vao) => vao,
                    Err(e) => {
                        gl.delete_program(raw);
                        return Err(BackendError::Api(e));
                    }
                };
                gl.bind_vertex_array(Some(vao));
                for attr in info.attributes {
                    let loc = attr.location;
                    let components = attr.format.components() as i32;
                    let ty = convert::component_type(attr.format.component_type());
                    gl.enable_vertex_attrib_array(loc);
                    match convert::attrib_fetch(attr.format) {
                        AttribFetch::Float { normalized } => {
                            gl.vertex_attrib_format_f32(loc, components, ty, normalized, attr.offset)
                        }
                        AttribFetch::Integer => gl.vertex_attrib_format_i32(loc, components, ty, attr.offset),
                    }
                    gl.vertex_attrib_binding(loc, loc);
                    let divisor = match attr.step {
                        VertexStep::Vertex => 0,
                        VertexStep::Instance(rate) => rate,
                    };
                    gl.vertex_binding_divisor(loc, divisor);
                }
                gl.bind_vertex_array(None);
                Some(vao)
            };
            (raw, vao)
        };

        let strides = info
            .attributes
            .iter()
            .map(|a| (a.location, a.effective_stride() as i32))
            .collect();
        let handle = raw.raw_handle();
        self.objects.programs.insert(
            handle,
            GlProgram {
                raw,
                vao,
                strides,
                primitive: info.primitive,
                tests: info.tests,
                uniforms: Default::default(),
            },
        );
        log::trace!("gl: program {} ({} stages)", handle.0, info.stages.len());
        Ok(handle)
    }

    fn destroy_pipeline(&mut self, pipeline: RawHandle) {
        if !pipeline.is_valid() {
            return;
        }
        if let Some(object) = self.objects.programs.remove(pipeline) {
            // SAFETY: the context is current.
            unsafe {
                if let Some(vao) = object.vao {
                    self.gl.delete_vertex_array(vao);
                }
                self.gl.delete_program(object.raw);
            }
        }
    }

    // ── framebuffers ─────────────────────────────────────────────────────

    fn create_framebuffer(&mut self, info: &FramebufferCreateInfo<'_>) -> BackendResult<RawHandle> {
        let mut color = Vec::with_capacity(info.color.len());
        for a in info.color {
            color.push((self.objects.textures.get(a.texture)?.raw, *a));
        }
        let depth = match &info.depth {
            Some(a) => {
                let point = if a.format.has_stencil() {
                    glow::DEPTH_STENCIL_ATTACHMENT
                } else {
                    glow::DEPTH_ATTACHMENT
                };
                Some((point, self.objects.textures.get(a.texture)?.raw, *a))
            }
            None => None,
        };
        let draw_buffers: Vec<u32> = (0..color.len() as u32).map(|i| glow::COLOR_ATTACHMENT0 + i).collect();
        let gl = &self.gl;

        // SAFETY: the context is current (see `new`); every texture is live.
        let raw = unsafe {
            let raw = gl.create_framebuffer().map_err(BackendError::Api)?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(raw));
            let mut status = Ok(());
            for (point, (texture, a)) in draw_buffers.iter().zip(&color) {
                status = status.and_then(|()| attach(gl, *point, *texture, a));
            }
            if let Some((point, texture, a)) = &depth {
                status = status.and_then(|()| attach(gl, *point, *texture, a));
            }
            if draw_buffers.is_empty() {
                gl.draw_buffer(glow::NONE);
            } else {
                gl.draw_buffers(&draw_buffers);
            }
            let complete = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);

            if status.is_ok() && complete != glow::FRAMEBUFFER_COMPLETE {
                status = Err(BackendError::IncompleteFramebuffer(convert::framebuffer_status_name(complete)));
            }
            if let Err(e) = status {
                gl.delete_framebuffer(raw);
                return Err(e);
            }
            raw
        };

        let handle = raw.raw_handle();
        self.objects.framebuffers.insert(handle, GlFramebuffer { raw, extent: info.extent });
        log::trace!("gl: framebuffer {} ({:?}, {} color)", handle.0, info.extent, info.color.len());
        Ok(handle)
    }

    fn destroy_framebuffer(&mut self, framebuffer: RawHandle) {
        if !framebuffer.is_valid() || framebuffer.0 == 0 {
            return;
        }
        if let Some(object) = self.objects.framebuffers.remove(framebuffer) {
            // SAFETY: the context is current.
            unsafe { self.gl.delete_framebuffer(object.raw) };
        }
    }

    // ── frame ────────────────────────────────────────────────────────────

    fn submit_render_data(&mut self, batches: &[RenderData<'_>]) -> BackendResult<()> {
        Executor {
            gl: &self.gl,
            objects: &mut self.objects,
            embedded: self.info.embedded,
            debug_checks: self.init.debug_checks,
            applied: AppliedProgram::default(),
        }
        .run(batches)
    }

    fn device_wait(&mut self) {
        // SAFETY: the context is current.
        unsafe { self.gl.finish() };
    }

    fn swap_buffers(&mut self) -> BackendResult<()> {
        self.surface
            .swap_buffers()
            .map_err(|e| BackendError::Api(format!("swap failed: {e:#}")))
    }
}

impl Drop for GlBackend {
    fn drop(&mut self) {
        let leftover = self.objects.total();
        if leftover > 0 {
            log::debug!("gl: deleting {leftover} objects left at teardown");
        }
        let gl = &self.gl;
        // SAFETY: the context is current (see `new`).
        unsafe {
            for fb in self.objects.framebuffers.drain() {
                gl.delete_framebuffer(fb.raw);
            }
            for program in self.objects.programs.drain() {
                if let Some(vao) = program.vao {
                    gl.delete_vertex_array(vao);
                }
                gl.delete_program(program.raw);
            }
            for shader in self.objects.shaders.drain() {
                gl.delete_shader(shader.raw);
            }
            for texture in self.objects.textures.drain() {
                gl.delete_texture(texture.raw);
            }
            for buffer in self.objects.buffers.drain() {
                gl.delete_buffer(buffer.raw);
            }
        }
    }
}
