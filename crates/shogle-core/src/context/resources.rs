use crate::error::{RenderError, RenderResult};
use crate::expected::Expected;
use crate::handle::kind::Kind;
use crate::handle::{
    BufferHandle, FramebufferHandle, Handle, PipelineHandle, RawHandle, ResourceList,
    ShaderHandle, TextureHandle,
};
use crate::memory::ArenaVec;
use crate::resource::{
    check_attachment, validate_stages, BufferData, BufferDesc, BufferInfo, FramebufferAttachment,
    FramebufferCreateInfo, FramebufferDesc, FramebufferInfo, PipelineCreateInfo, PipelineDesc, PipelineInfo,
    ResolvedAttachment, SamplerOptions, ShaderDesc, ShaderInfo, ShaderStage, StageBinding,
    TextureDesc, TextureInfo, TextureUpload,
};

use super::context::{Context, DEFAULT_FRAMEBUFFER};
use super::nodes::{BufferNode, FramebufferNode, PipelineNode, ShaderNode, TextureNode};

/// Distinct stages a pipeline can hold.
const MAX_STAGES: usize = 6;

/// Links a node whose backend object already exists.
///
/// If the registry cannot grow, the backend object is released through
/// `release` so nothing leaks.
fn link<T, K>(
    list: &mut ResourceList<T>,
    node: T,
    release: impl FnOnce(),
) -> RenderResult<Handle<K>> {
    match list.try_insert(node) {
        Ok((index, generation)) => Ok(Handle::new(index, generation)),
        Err((_, err)) => {
            release();
            Err(err.into())
        }
    }
}

fn dead<K: Kind>(handle: Handle<K>) -> RenderError {
    RenderError::invalid_handle(format!("{handle:?} does not refer to a live resource"))
}

impl Context {
    // ── buffers ──────────────────────────────────────────────────────────

    pub fn create_buffer(&mut self, desc: &BufferDesc<'_>) -> RenderResult<BufferHandle> {
        let info = desc.validate().transform(|()| desc.create_info())?;
        let raw = self
            .backend
            .create_buffer(&info)
            .transform_error(|e| RenderError::from_backend("create_buffer", e))?;

        let node = BufferNode {
            raw,
            info: BufferInfo { kind: info.kind, flags: info.flags, size: info.size },
            mapped: false,
        };
        let backend = &mut self.backend;
        let handle: BufferHandle = link(&mut self.buffers, node, || backend.destroy_buffer(raw))?;
        log::debug!("created {handle:?}: {:?}, {} bytes", info.kind, info.size);
        Ok(handle)
    }

    /// Destroys a buffer. Stale handles are ignored.
    ///
    /// Returns whether a live buffer was destroyed.
    pub fn destroy_buffer(&mut self, buffer: BufferHandle) -> bool {
        let Some(node) = self.buffers.remove(buffer.index(), buffer.generation()) else {
            return false;
        };
        if node.mapped {
            self.backend.unmap_buffer(node.raw);
        }
        self.backend.destroy_buffer(node.raw);
        log::debug!("destroyed {buffer:?}");
        true
    }

    pub fn buffer_info(&self, buffer: BufferHandle) -> Option<BufferInfo> {
        self.buffers.get(buffer.index(), buffer.generation()).map(|n| n.info)
    }

    #[inline]
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Replaces part of a dynamic buffer.
    pub fn buffer_upload(&mut self, buffer: BufferHandle, data: BufferData<'_>) -> RenderResult<()> {
        let node = self
            .buffers
            .get(buffer.index(), buffer.generation())
            .ok_or_else(|| dead(buffer))?;
        node.info.validate_upload(&data)?;
        if node.mapped {
            return Err(RenderError::validation(format!("{buffer:?} is mapped")));
        }
        let raw = node.raw;
        self.backend
            .update_buffer(raw, data)
            .map_err(|e| RenderError::from_backend("buffer_upload", e))
    }

    // ── textures ─────────────────────────────────────────────────────────

    pub fn create_texture(&mut self, desc: &TextureDesc<'_>) -> RenderResult<TextureHandle> {
        let info = desc.validate(&self.limits).transform(|()| desc.create_info())?;
        let raw = self
            .backend
            .create_texture(&info)
            .transform_error(|e| RenderError::from_backend("create_texture", e))?;

        let node = TextureNode {
            raw,
            info: TextureInfo {
                kind: info.kind,
                format: info.format,
                extent: info.extent,
                layers: info.layers,
                levels: info.levels,
                sampler: info.sampler,
            },
        };
        let backend = &mut self.backend;
        let handle: TextureHandle = link(&mut self.textures, node, || backend.destroy_texture(raw))?;
        log::debug!(
            "created {handle:?}: {:?} {:?} {}x{}x{}, {} layer(s), {} level(s)",
            info.kind,
            info.format,
            info.extent.width,
            info.extent.height,
            info.extent.depth,
            info.layers,
            info.levels
        );
        Ok(handle)
    }

    pub fn destroy_texture(&mut self, texture: TextureHandle) -> bool {
        let Some(node) = self.textures.remove(texture.index(), texture.generation()) else {
            return false;
        };
        self.backend.destroy_texture(node.raw);
        log::debug!("destroyed {texture:?}");
        true
    }

    pub fn texture_info(&self, texture: TextureHandle) -> Option<TextureInfo> {
        self.textures.get(texture.index(), texture.generation()).map(|n| n.info)
    }

    #[inline]
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Replaces pixels of one level of one layer.
    pub fn texture_upload(
        &mut self,
        texture: TextureHandle,
        upload: &TextureUpload<'_>,
    ) -> RenderResult<()> {
        let node = self
            .textures
            .get(texture.index(), texture.generation())
            .ok_or_else(|| dead(texture))?;
        node.info.validate_upload(upload)?;
        let raw = node.raw;
        self.backend
            .update_texture(raw, upload)
            .map_err(|e| RenderError::from_backend("texture_upload", e))
    }

    /// Replaces filtering and addressing options.
    pub fn texture_set_sampler(
        &mut self,
        texture: TextureHandle,
        sampler: SamplerOptions,
    ) -> RenderResult<()> {
        let node = self
            .textures
            .get_mut(texture.index(), texture.generation())
            .ok_or_else(|| dead(texture))?;
        if sampler.mip_filter.is_some() && node.info.levels == 1 {
            log::debug!("{texture:?} has a single level; mip filter has no effect");
        }
        self.backend
            .update_texture_sampler(node.raw, &sampler)
            .map_err(|e| RenderError::from_backend("texture_set_sampler", e))?;
        node.info.sampler = sampler;
        Ok(())
    }

    // ── shaders ──────────────────────────────────────────────────────────

    /// Compiles a shader stage. Compiler diagnostics end up in the error
    /// message.
    pub fn create_shader(&mut self, desc: &ShaderDesc<'_>) -> RenderResult<ShaderHandle> {
        let info = desc.validate().transform(|()| desc.create_info())?;
        let raw = self
            .backend
            .create_shader(&info)
            .transform_error(|e| RenderError::from_backend("create_shader", e))?;

        let node = ShaderNode { raw, info: ShaderInfo { stage: info.stage } };
        let backend = &mut self.backend;
        let handle: ShaderHandle = link(&mut self.shaders, node, || backend.destroy_shader(raw))?;
        log::debug!("created {handle:?}: {} stage", info.stage);
        Ok(handle)
    }

    /// Destroys a shader. Pipelines already linked from it stay usable.
    pub fn destroy_shader(&mut self, shader: ShaderHandle) -> bool {
        let Some(node) = self.shaders.remove(shader.index(), shader.generation()) else {
            return false;
        };
        self.backend.destroy_shader(node.raw);
        log::debug!("destroyed {shader:?}");
        true
    }

    pub fn shader_info(&self, shader: ShaderHandle) -> Option<ShaderInfo> {
        self.shaders.get(shader.index(), shader.generation()).map(|n| n.info)
    }

    #[inline]
    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    // ── pipelines ────────────────────────────────────────────────────────

    /// Links shaders, vertex layout and fixed-function state. Linker
    /// diagnostics end up in the error message.
    pub fn create_pipeline(&mut self, desc: &PipelineDesc<'_>) -> RenderResult<PipelineHandle> {
        let handle = self
            .validate_pipeline(desc)
            .and_then(|()| self.build_pipeline(desc));
        self.end_scratch();
        handle
    }

    fn validate_pipeline(&self, desc: &PipelineDesc<'_>) -> RenderResult<()> {
        if desc.stages.len() > MAX_STAGES {
            return Err(RenderError::validation(format!(
                "pipeline has {} stages, at most {MAX_STAGES} are possible",
                desc.stages.len()
            )));
        }
        let mut stages = [ShaderStage::Vertex; MAX_STAGES];
        for (slot, &h) in stages.iter_mut().zip(desc.stages) {
            let node = self.shaders.get(h.index(), h.generation()).ok_or_else(|| dead(h))?;
            *slot = node.info.stage;
        }
        validate_stages(&stages[..desc.stages.len()])?;
        desc.validate_attributes(&self.limits)
    }

    fn build_pipeline(&mut self, desc: &PipelineDesc<'_>) -> RenderResult<PipelineHandle> {
        let mut stages = ArenaVec::with_capacity_in(desc.stages.len(), &self.arena)?;
        for &h in desc.stages {
            let node = self.shaders.get(h.index(), h.generation()).ok_or_else(|| dead(h))?;
            stages.push(StageBinding { stage: node.info.stage, shader: node.raw })?;
        }
        let info = PipelineCreateInfo {
            stages: stages.as_slice(),
            attributes: desc.attributes,
            primitive: desc.primitive,
            tests: desc.tests,
        };

        let raw = self
            .backend
            .create_pipeline(&info)
            .transform_error(|e| RenderError::from_backend("create_pipeline", e))?;

        let compute = info.stages.iter().any(|s| s.stage == ShaderStage::Compute);
        let node = PipelineNode {
            raw,
            info: PipelineInfo {
                primitive: desc.primitive,
                stage_count: desc.stages.len() as u32,
                attribute_count: desc.attributes.len() as u32,
                compute,
                tests: desc.tests,
            },
        };
        let backend = &mut self.backend;
        let handle: PipelineHandle = link(&mut self.pipelines, node, || backend.destroy_pipeline(raw))?;
        log::debug!(
            "created {handle:?}: {} stage(s), {} attribute(s), {:?}",
            desc.stages.len(),
            desc.attributes.len(),
            desc.primitive
        );
        Ok(handle)
    }

    pub fn destroy_pipeline(&mut self, pipeline: PipelineHandle) -> bool {
        let Some(node) = self.pipelines.remove(pipeline.index(), pipeline.generation()) else {
            return false;
        };
        self.backend.destroy_pipeline(node.raw);
        log::debug!("destroyed {pipeline:?}");
        true
    }

    pub fn pipeline_info(&self, pipeline: PipelineHandle) -> Option<PipelineInfo> {
        self.pipelines.get(pipeline.index(), pipeline.generation()).map(|n| n.info)
    }

    #[inline]
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    // ── framebuffers ─────────────────────────────────────────────────────

    /// Creates an offscreen framebuffer rendering into textures.
    pub fn create_framebuffer(&mut self, desc: &FramebufferDesc<'_>) -> RenderResult<FramebufferHandle> {
        let handle = self
            .validate_framebuffer(desc)
            .and_then(|()| self.build_framebuffer(desc));
        self.end_scratch();
        handle
    }

    fn validate_framebuffer(&self, desc: &FramebufferDesc<'_>) -> RenderResult<()> {
        desc.validate(&self.limits)?;
        let color = desc.color.iter().map(|a| (a, false));
        for (attachment, depth) in color.chain(desc.depth.iter().map(|a| (a, true))) {
            let h = attachment.texture;
            let node = self.textures.get(h.index(), h.generation()).ok_or_else(|| dead(h))?;
            check_attachment(desc.extent, &node.info, attachment, depth)?;
        }
        Ok(())
    }

    fn resolve_attachment(&self, a: &FramebufferAttachment) -> RenderResult<ResolvedAttachment> {
        let node = self
            .textures
            .get(a.texture.index(), a.texture.generation())
            .ok_or_else(|| dead(a.texture))?;
        Ok(ResolvedAttachment {
            texture: node.raw,
            kind: node.info.kind,
            format: node.info.format,
            layer: a.layer,
            level: a.level,
        })
    }

    fn build_framebuffer(&mut self, desc: &FramebufferDesc<'_>) -> RenderResult<FramebufferHandle> {
        let mut color = ArenaVec::with_capacity_in(desc.color.len(), &self.arena)?;
        for a in desc.color {
            color.push(self.resolve_attachment(a)?)?;
        }
        let depth = desc.depth.as_ref().map(|a| self.resolve_attachment(a)).transpose()?;
        let info = FramebufferCreateInfo { extent: desc.extent, color: color.as_slice(), depth };

        let raw = self
            .backend
            .create_framebuffer(&info)
            .transform_error(|e| RenderError::from_backend("create_framebuffer", e))?;

        let node = FramebufferNode {
            raw,
            info: FramebufferInfo {
                extent: desc.extent,
                viewport: desc.resolved_viewport(),
                clear: desc.clear,
                color_attachments: desc.color.len() as u32,
                has_depth: desc.depth.is_some(),
            },
        };
        let backend = &mut self.backend;
        let handle: FramebufferHandle = link(&mut self.framebuffers, node, || backend.destroy_framebuffer(raw))?;
        log::debug!(
            "created {handle:?}: {}x{}, {} color attachment(s){}",
            desc.extent.width,
            desc.extent.height,
            desc.color.len(),
            if desc.depth.is_some() { " + depth" } else { "" }
        );
        Ok(handle)
    }

    /// Destroys an offscreen framebuffer. The default framebuffer and stale
    /// handles are ignored.
    pub fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) -> bool {
        if framebuffer == DEFAULT_FRAMEBUFFER {
            log::warn!("the default framebuffer cannot be destroyed");
            return false;
        }
        let Some(node) = self.framebuffers.remove(framebuffer.index(), framebuffer.generation())
        else {
            return false;
        };
        self.backend.destroy_framebuffer(node.raw);
        log::debug!("destroyed {framebuffer:?}");
        true
    }

    /// Live offscreen framebuffers; the default framebuffer is not counted.
    #[inline]
    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    // ── backend handles ──────────────────────────────────────────────────

    /// Backend object behind a buffer, for interop inside external commands.
    pub fn raw_buffer(&self, buffer: BufferHandle) -> Option<RawHandle> {
        self.buffers.get(buffer.index(), buffer.generation()).map(|n| n.raw)
    }

    pub fn raw_texture(&self, texture: TextureHandle) -> Option<RawHandle> {
        self.textures.get(texture.index(), texture.generation()).map(|n| n.raw)
    }

    pub fn raw_shader(&self, shader: ShaderHandle) -> Option<RawHandle> {
        self.shaders.get(shader.index(), shader.generation()).map(|n| n.raw)
    }

    pub fn raw_pipeline(&self, pipeline: PipelineHandle) -> Option<RawHandle> {
        self.pipelines.get(pipeline.index(), pipeline.generation()).map(|n| n.raw)
    }

    pub fn raw_framebuffer(&self, framebuffer: FramebufferHandle) -> Option<RawHandle> {
        if framebuffer == DEFAULT_FRAMEBUFFER {
            return Some(self.default_raw());
        }
        self.framebuffers
            .get(framebuffer.index(), framebuffer.generation())
            .map(|n| n.raw)
    }
}
