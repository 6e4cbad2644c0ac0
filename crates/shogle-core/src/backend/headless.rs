use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::ptr::NonNull;
use std::rc::Rc;

use crate::handle::RawHandle;
use crate::render::{ExternalTarget, RenderCmdKind, RenderData, UniformData};
use crate::resource::{
    BufferCreateInfo, BufferData, ClearState, Extent2d, FramebufferCreateInfo, MapAccess,
    MapRange, PipelineCreateInfo, Rect2d, SamplerOptions, ShaderCreateInfo, ShaderStage,
    TextureCreateInfo, TextureUpload,
};

use super::{Backend, BackendError, BackendResult, RenderLimits};

const DEFAULT_FRAMEBUFFER: RawHandle = RawHandle(0);

/// One command as the headless backend executed it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCommand {
    pub sort_group: u32,
    /// `None` for external commands.
    pub pipeline: Option<RawHandle>,
    pub count: u32,
    pub instances: u32,
    pub indexed: bool,
    pub vertex_buffers: Vec<RawHandle>,
    pub textures: Vec<RawHandle>,
    pub uniforms: Vec<(String, UniformData)>,
}

impl RecordedCommand {
    #[inline]
    pub fn is_external(&self) -> bool {
        self.pipeline.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedBatch {
    pub target: RawHandle,
    pub clear: ClearState,
    pub viewport: Rect2d,
    pub commands: Vec<RecordedCommand>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedFrame {
    pub batches: Vec<RecordedBatch>,
}

enum Object {
    Buffer { bytes: Vec<u8>, mapped: bool },
    Texture { sampler: SamplerOptions, uploads: u32 },
    Shader { stage: ShaderStage },
    Pipeline,
    Framebuffer { extent: Extent2d },
}

impl Object {
    fn label(&self) -> &'static str {
        match self {
            Object::Buffer { .. } => "buffer",
            Object::Texture { .. } => "texture",
            Object::Shader { .. } => "shader",
            Object::Pipeline => "pipeline",
            Object::Framebuffer { .. } => "framebuffer",
        }
    }
}

#[derive(Default)]
struct State {
    objects: HashMap<u64, Object>,
    next_id: u64,
    frames: Vec<RecordedFrame>,
    destroyed: Vec<(&'static str, RawHandle)>,
    fail_allocations: bool,
    waits: u32,
    swaps: u32,
}

impl State {
    fn insert(&mut self, object: Object) -> BackendResult<RawHandle> {
        if self.fail_allocations {
            return Err(BackendError::OutOfMemory);
        }
        self.next_id += 1;
        self.objects.insert(self.next_id, object);
        Ok(RawHandle(self.next_id))
    }

    fn remove(&mut self, handle: RawHandle, label: &'static str) {
        let matches = self.objects.get(&handle.0).is_some_and(|o| o.label() == label);
        if matches {
            self.objects.remove(&handle.0);
            self.destroyed.push((label, handle));
        } else if handle.is_valid() {
            log::warn!("headless: destroy of unknown {label} {}", handle.0);
        }
    }

    fn buffer_mut(&mut self, handle: RawHandle) -> BackendResult<(&mut Vec<u8>, &mut bool)> {
        match self.objects.get_mut(&handle.0) {
            Some(Object::Buffer { bytes, mapped }) => Ok((bytes, mapped)),
            _ => Err(BackendError::InvalidHandle),
        }
    }

    fn is(&self, handle: RawHandle, label: &str) -> bool {
        self.objects.get(&handle.0).is_some_and(|o| o.label() == label)
    }
}

/// Backend that executes nothing on a GPU.
///
/// Keeps buffer contents in host memory, checks every handle it receives
/// and records each submitted frame. Shader sources containing `#error`
/// fail to compile. External callbacks are invoked in execution order.
///
/// A [`HeadlessProbe`] observes the backend after it was moved into a
/// context.
pub struct HeadlessBackend {
    state: Rc<RefCell<State>>,
    limits: RenderLimits,
}

/// Shared view into a [`HeadlessBackend`].
#[derive(Clone)]
pub struct HeadlessProbe {
    state: Rc<RefCell<State>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::with_limits(RenderLimits::default())
    }

    pub fn with_limits(limits: RenderLimits) -> Self {
        Self { state: Rc::new(RefCell::new(State::default())), limits }
    }

    pub fn probe(&self) -> HeadlessProbe {
        HeadlessProbe { state: Rc::clone(&self.state) }
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessProbe {
    /// Every frame submitted so far.
    pub fn frames(&self) -> Ref<'_, [RecordedFrame]> {
        Ref::map(self.state.borrow(), |s| s.frames.as_slice())
    }

    pub fn last_frame(&self) -> Option<RecordedFrame> {
        self.state.borrow().frames.last().cloned()
    }

    pub fn frame_count(&self) -> usize {
        self.state.borrow().frames.len()
    }

    /// Current contents of a buffer.
    pub fn buffer_bytes(&self, buffer: RawHandle) -> Option<Vec<u8>> {
        match self.state.borrow().objects.get(&buffer.0) {
            Some(Object::Buffer { bytes, .. }) => Some(bytes.clone()),
            _ => None,
        }
    }

    pub fn texture_sampler(&self, texture: RawHandle) -> Option<SamplerOptions> {
        match self.state.borrow().objects.get(&texture.0) {
            Some(Object::Texture { sampler, .. }) => Some(*sampler),
            _ => None,
        }
    }

    /// Pixel uploads received by a texture after creation.
    pub fn texture_uploads(&self, texture: RawHandle) -> Option<u32> {
        match self.state.borrow().objects.get(&texture.0) {
            Some(Object::Texture { uploads, .. }) => Some(*uploads),
            _ => None,
        }
    }

    pub fn live_objects(&self) -> usize {
        self.state.borrow().objects.len()
    }

    pub fn is_live(&self, handle: RawHandle) -> bool {
        self.state.borrow().objects.contains_key(&handle.0)
    }

    /// Destroyed objects as `(kind, handle)`, in destruction order.
    pub fn destroyed(&self) -> Vec<(&'static str, RawHandle)> {
        self.state.borrow().destroyed.clone()
    }

    pub fn waits(&self) -> u32 {
        self.state.borrow().waits
    }

    pub fn swaps(&self) -> u32 {
        self.state.borrow().swaps
    }

    /// Makes every following create call report `OutOfMemory`.
    pub fn fail_allocations(&self, fail: bool) {
        self.state.borrow_mut().fail_allocations = fail;
    }
}

impl Backend for HeadlessBackend {
    fn name(&self) -> &str {
        "headless"
    }

    fn limits(&self) -> RenderLimits {
        self.limits
    }

    fn default_framebuffer(&self) -> RawHandle {
        DEFAULT_FRAMEBUFFER
    }

    fn create_buffer(&mut self, info: &BufferCreateInfo<'_>) -> BackendResult<RawHandle> {
        let mut bytes = vec![0u8; info.size];
        if let Some(data) = info.data {
            bytes[data.offset..data.offset + data.bytes.len()].copy_from_slice(data.bytes);
        }
        self.state.borrow_mut().insert(Object::Buffer { bytes, mapped: false })
    }

    fn update_buffer(&mut self, buffer: RawHandle, data: BufferData<'_>) -> BackendResult<()> {
        let mut st = self.state.borrow_mut();
        let (bytes, mapped) = st.buffer_mut(buffer)?;
        if *mapped {
            return Err(BackendError::Api("buffer is mapped".into()));
        }
        let end = data
            .end()
            .filter(|&e| e <= bytes.len())
            .ok_or_else(|| BackendError::Api("update out of range".into()))?;
        bytes[data.offset..end].copy_from_slice(data.bytes);
        Ok(())
    }

    fn map_buffer(
        &mut self,
        buffer: RawHandle,
        range: MapRange,
        _access: MapAccess,
    ) -> BackendResult<NonNull<u8>> {
        let mut st = self.state.borrow_mut();
        let (bytes, mapped) = st.buffer_mut(buffer)?;
        if *mapped {
            return Err(BackendError::Api("buffer is already mapped".into()));
        }
        if range.offset.checked_add(range.len).is_none_or(|end| end > bytes.len()) {
            return Err(BackendError::Api("map range out of bounds".into()));
        }
        *mapped = true;
        // The vector is never resized, so the pointer stays valid until unmap.
        NonNull::new(bytes[range.offset..].as_mut_ptr()).ok_or(BackendError::OutOfMemory)
    }

    fn unmap_buffer(&mut self, buffer: RawHandle) {
        if let Ok((_, mapped)) = self.state.borrow_mut().buffer_mut(buffer) {
            *mapped = false;
        }
    }

    fn destroy_buffer(&mut self, buffer: RawHandle) {
        self.state.borrow_mut().remove(buffer, "buffer");
    }

    fn create_texture(&mut self, info: &TextureCreateInfo<'_>) -> BackendResult<RawHandle> {
        self.state
            .borrow_mut()
            .insert(Object::Texture { sampler: info.sampler, uploads: 0 })
    }

    fn update_texture(
        &mut self,
        texture: RawHandle,
        _upload: &TextureUpload<'_>,
    ) -> BackendResult<()> {
        match self.state.borrow_mut().objects.get_mut(&texture.0) {
            Some(Object::Texture { uploads, .. }) => {
                *uploads += 1;
                Ok(())
            }
            _ => Err(BackendError::InvalidHandle),
        }
    }

    fn update_texture_sampler(
        &mut self,
        texture: RawHandle,
        options: &SamplerOptions,
    ) -> BackendResult<()> {
        match self.state.borrow_mut().objects.get_mut(&texture.0) {
            Some(Object::Texture { sampler, .. }) => {
                *sampler = *options;
                Ok(())
            }
            _ => Err(BackendError::InvalidHandle),
        }
    }

    fn destroy_texture(&mut self, texture: RawHandle) {
        self.state.borrow_mut().remove(texture, "texture");
    }

    fn create_shader(&mut self, info: &ShaderCreateInfo<'_>) -> BackendResult<RawHandle> {
        if let Some((n, line)) = info.source.lines().enumerate().find(|(_, l)| l.contains("#error")) {
            return Err(BackendError::CompileFailed(format!(
                "0:{}: '#error' : {}",
                n + 1,
                line.trim()
            )));
        }
        self.state.borrow_mut().insert(Object::Shader { stage: info.stage })
    }

    fn destroy_shader(&mut self, shader: RawHandle) {
        self.state.borrow_mut().remove(shader, "shader");
    }

    fn create_pipeline(&mut self, info: &PipelineCreateInfo<'_>) -> BackendResult<RawHandle> {
        let mut st = self.state.borrow_mut();
        for binding in info.stages {
            match st.objects.get(&binding.shader.0) {
                Some(Object::Shader { stage }) if *stage == binding.stage => {}
                Some(Object::Shader { stage }) => {
                    return Err(BackendError::LinkFailed(format!(
                        "shader {} is a {stage} shader, bound as {}",
                        binding.shader.0, binding.stage
                    )));
                }
                _ => return Err(BackendError::InvalidHandle),
            }
        }
        st.insert(Object::Pipeline)
    }

    fn destroy_pipeline(&mut self, pipeline: RawHandle) {
        self.state.borrow_mut().remove(pipeline, "pipeline");
    }

    fn create_framebuffer(&mut self, info: &FramebufferCreateInfo<'_>) -> BackendResult<RawHandle> {
        let mut st = self.state.borrow_mut();
        let all = info.color.iter().chain(info.depth.iter());
        for attachment in all {
            if !st.is(attachment.texture, "texture") {
                return Err(BackendError::InvalidHandle);
            }
        }
        st.insert(Object::Framebuffer { extent: info.extent })
    }

    fn destroy_framebuffer(&mut self, framebuffer: RawHandle) {
        self.state.borrow_mut().remove(framebuffer, "framebuffer");
    }

    fn submit_render_data(&mut self, batches: &[RenderData<'_>]) -> BackendResult<()> {
        let mut frame = RecordedFrame { batches: Vec::with_capacity(batches.len()) };
        let mut status = Ok(());

        for data in batches {
            {
                let st = self.state.borrow();
                let known = data.target == DEFAULT_FRAMEBUFFER || st.is(data.target, "framebuffer");
                if !known {
                    status = Err(BackendError::InvalidHandle);
                    continue;
                }
                if let Some(Object::Framebuffer { extent }) = st.objects.get(&data.target.0) {
                    log::trace!("headless: target {} ({}x{})", data.target.0, extent.width, extent.height);
                }
            }

            let mut batch = RecordedBatch {
                target: data.target,
                clear: data.clear,
                viewport: data.viewport,
                commands: Vec::with_capacity(data.commands.len()),
            };

            for cmd in data.commands {
                match &cmd.kind {
                    RenderCmdKind::Draw(draw) => {
                        let st = self.state.borrow();
                        let handles_ok = st.is(draw.pipeline, "pipeline")
                            && draw.vertex_buffers.iter().all(|v| st.is(v.buffer, "buffer"))
                            && draw.index_buffer.is_none_or(|i| st.is(i.buffer, "buffer"))
                            && draw.shader_buffers.iter().all(|b| st.is(b.buffer, "buffer"))
                            && draw.textures.iter().all(|t| st.is(t.texture, "texture"));
                        if !handles_ok {
                            log::error!("headless: draw references a dead object");
                            status = Err(BackendError::InvalidHandle);
                            continue;
                        }
                        batch.commands.push(RecordedCommand {
                            sort_group: cmd.sort_group,
                            pipeline: Some(draw.pipeline),
                            count: draw.options.count,
                            instances: draw.options.instances,
                            indexed: draw.index_buffer.is_some(),
                            vertex_buffers: draw.vertex_buffers.iter().map(|v| v.buffer).collect(),
                            textures: draw.textures.iter().map(|t| t.texture).collect(),
                            uniforms: draw
                                .uniforms
                                .iter()
                                .map(|u| (u.name.to_owned(), u.data))
                                .collect(),
                        });
                    }
                    RenderCmdKind::External(callback) => {
                        // No state borrow is held: the callback may use a probe.
                        callback.invoke(&ExternalTarget {
                            framebuffer: data.target,
                            viewport: data.viewport,
                            sort_group: cmd.sort_group,
                        });
                        batch.commands.push(RecordedCommand {
                            sort_group: cmd.sort_group,
                            pipeline: None,
                            count: 0,
                            instances: 0,
                            indexed: false,
                            vertex_buffers: Vec::new(),
                            textures: Vec::new(),
                            uniforms: Vec::new(),
                        });
                    }
                }
            }
            frame.batches.push(batch);
        }

        self.state.borrow_mut().frames.push(frame);
        status
    }

    fn device_wait(&mut self) {
        self.state.borrow_mut().waits += 1;
    }

    fn swap_buffers(&mut self) -> BackendResult<()> {
        self.state.borrow_mut().swaps += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{BufferFlags, BufferKind, BufferUsage, StageBinding};

    fn dynamic_buffer(size: usize) -> BufferCreateInfo<'static> {
        BufferCreateInfo {
            kind: BufferKind::Vertex,
            flags: BufferFlags::DYNAMIC,
            usage: BufferUsage::Dynamic,
            size,
            data: None,
        }
    }

    #[test]
    fn buffer_contents_are_kept() {
        let mut b = HeadlessBackend::new();
        let probe = b.probe();
        let h = b.create_buffer(&dynamic_buffer(4)).unwrap();
        b.update_buffer(h, BufferData::at(&[7, 8], 2)).unwrap();
        assert_eq!(probe.buffer_bytes(h), Some(vec![0, 0, 7, 8]));
    }

    #[test]
    fn mapping_exposes_buffer_memory() {
        let mut b = HeadlessBackend::new();
        let probe = b.probe();
        let h = b.create_buffer(&dynamic_buffer(8)).unwrap();
        let range = MapRange { offset: 4, len: 4 };
        let ptr = b.map_buffer(h, range, MapAccess::Write).unwrap();
        // SAFETY: the mapping covers 4 bytes and is live until unmap.
        unsafe { std::slice::from_raw_parts_mut(ptr.as_ptr(), 4).fill(0xAB) };
        assert!(b.update_buffer(h, BufferData::new(&[1])).is_err());
        b.unmap_buffer(h);
        assert_eq!(probe.buffer_bytes(h).unwrap()[4..], [0xABu8; 4]);
    }

    #[test]
    fn error_directive_fails_compilation() {
        let mut b = HeadlessBackend::new();
        let err = b
            .create_shader(&ShaderCreateInfo {
                stage: ShaderStage::Fragment,
                source: "#version 330\n#error not today\n",
            })
            .unwrap_err();
        match err {
            BackendError::CompileFailed(log) => assert!(log.starts_with("0:2:")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pipeline_rejects_stage_mismatch() {
        let mut b = HeadlessBackend::new();
        let vs = b
            .create_shader(&ShaderCreateInfo { stage: ShaderStage::Vertex, source: "v" })
            .unwrap();
        let stages = [StageBinding { stage: ShaderStage::Fragment, shader: vs }];
        let info = PipelineCreateInfo {
            stages: &stages,
            attributes: &[],
            primitive: Default::default(),
            tests: Default::default(),
        };
        assert!(matches!(b.create_pipeline(&info), Err(BackendError::LinkFailed(_))));
    }

    #[test]
    fn destroy_tolerates_tombstone_and_logs_order() {
        let mut b = HeadlessBackend::new();
        let probe = b.probe();
        let h = b.create_buffer(&dynamic_buffer(1)).unwrap();
        b.destroy_buffer(RawHandle::TOMBSTONE);
        b.destroy_buffer(h);
        b.destroy_buffer(h);
        assert_eq!(probe.destroyed(), [("buffer", h)]);
        assert_eq!(probe.live_objects(), 0);
    }

    #[test]
    fn allocation_failure_is_reported() {
        let mut b = HeadlessBackend::new();
        b.probe().fail_allocations(true);
        assert_eq!(b.create_buffer(&dynamic_buffer(1)), Err(BackendError::OutOfMemory));
    }
}
