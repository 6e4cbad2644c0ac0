use std::collections::TryReserveError;

use crate::handle::RawHandle;
use crate::memory::{AllocError, Arena, ArenaPtr};
use crate::resource::{ClearState, Rect2d};

use super::cmd::{
    DrawCmd, DrawOptions, ExternalCallback, ExternalTarget, IndexBinding, RenderCmd,
    RenderCmdKind, ShaderBufferBinding, TextureBinding, Uniform, UniformData, VertexBinding,
};
use super::key::SortKey;

#[derive(Copy, Clone)]
pub(crate) struct RecordedUniform {
    pub name: ArenaPtr<str>,
    pub data: UniformData,
}

/// A draw whose spans were copied into the frame arena.
pub(crate) struct RecordedDraw {
    pub pipeline: RawHandle,
    pub vertex_buffers: ArenaPtr<[VertexBinding]>,
    pub index_buffer: Option<IndexBinding>,
    pub shader_buffers: ArenaPtr<[ShaderBufferBinding]>,
    pub textures: ArenaPtr<[TextureBinding]>,
    pub uniforms: ArenaPtr<[RecordedUniform]>,
    pub options: DrawOptions,
}

pub(crate) enum RecordedKind {
    Draw(RecordedDraw),
    Function(fn(&ExternalTarget)),
    Closure(ArenaPtr<dyn Fn(&ExternalTarget)>),
}

pub(crate) struct RecordedCmd {
    pub key: SortKey,
    pub kind: RecordedKind,
}

impl RecordedCmd {
    /// Re-borrows the arena spans as a backend command.
    pub fn resolve<'a>(&self, arena: &'a Arena) -> Result<RenderCmd<'a>, AllocError> {
        let kind = match &self.kind {
            RecordedKind::Draw(d) => {
                let uniforms = arena.attach(d.uniforms);
                let uniforms = arena.alloc_slice_from_iter(
                    uniforms.iter().map(|u| Uniform { name: arena.attach(u.name), data: u.data }),
                )?;
                RenderCmdKind::Draw(DrawCmd {
                    pipeline: d.pipeline,
                    vertex_buffers: arena.attach(d.vertex_buffers),
                    index_buffer: d.index_buffer,
                    shader_buffers: arena.attach(d.shader_buffers),
                    textures: arena.attach(d.textures),
                    uniforms,
                    options: d.options,
                })
            }
            RecordedKind::Function(f) => RenderCmdKind::External(ExternalCallback::Function(*f)),
            RecordedKind::Closure(f) => {
                RenderCmdKind::External(ExternalCallback::Closure(arena.attach(*f)))
            }
        };
        Ok(RenderCmd { sort_group: self.key.group, kind })
    }
}

/// Commands recorded for one target during the current frame.
pub(crate) struct Batch {
    pub target: RawHandle,
    pub clear: ClearState,
    pub viewport: Rect2d,
    pub commands: Vec<RecordedCmd>,
}

/// Per-target batches of the frame being recorded.
///
/// Batches keep the order in which their target was first touched. Batch
/// slots and their command vectors are pooled: once warmed up, recording a
/// frame does not touch the heap.
pub(crate) struct FrameRecorder {
    batches: Vec<Batch>,
    active: usize,
    next_order: u32,
    command_capacity: usize,
}

impl FrameRecorder {
    pub fn with_capacity(batches: usize, commands: usize) -> Result<Self, TryReserveError> {
        let mut pool = Vec::new();
        pool.try_reserve(batches)?;
        for _ in 0..batches {
            pool.push(Batch::empty(commands)?);
        }
        Ok(Self { batches: pool, active: 0, next_order: 0, command_capacity: commands })
    }

    /// Forgets the recorded frame, keeping every allocation.
    ///
    /// Must run before the arena holding the command spans is cleared.
    pub fn reset(&mut self) {
        for batch in &mut self.batches[..self.active] {
            batch.commands.clear();
        }
        self.active = 0;
        self.next_order = 0;
    }

    /// Appends a command to the batch of `target`, opening the batch with
    /// `snapshot()` if this is the first command for it this frame.
    pub fn push(
        &mut self,
        target: RawHandle,
        snapshot: impl FnOnce() -> (ClearState, Rect2d),
        group: u32,
        kind: RecordedKind,
    ) -> Result<(), TryReserveError> {
        let index = match self.batches[..self.active].iter().position(|b| b.target == target) {
            Some(i) => i,
            None => self.open(target, snapshot)?,
        };

        let commands = &mut self.batches[index].commands;
        commands.try_reserve(1)?;
        commands.push(RecordedCmd { key: SortKey::new(group, self.next_order), kind });
        self.next_order = self.next_order.wrapping_add(1);
        Ok(())
    }

    fn open(
        &mut self,
        target: RawHandle,
        snapshot: impl FnOnce() -> (ClearState, Rect2d),
    ) -> Result<usize, TryReserveError> {
        if self.active == self.batches.len() {
            self.batches.try_reserve(1)?;
            self.batches.push(Batch::empty(self.command_capacity)?);
        }
        let (clear, viewport) = snapshot();
        let batch = &mut self.batches[self.active];
        batch.target = target;
        batch.clear = clear;
        batch.viewport = viewport;
        debug_assert!(batch.commands.is_empty());

        self.active += 1;
        Ok(self.active - 1)
    }

    /// Batches of the current frame, first-touched first.
    pub fn batches_mut(&mut self) -> &mut [Batch] {
        &mut self.batches[..self.active]
    }

    #[inline]
    pub fn batch_count(&self) -> usize {
        self.active
    }

    pub fn command_count(&self) -> usize {
        self.batches[..self.active].iter().map(|b| b.commands.len()).sum()
    }

    #[inline]
    pub fn pooled_batches(&self) -> usize {
        self.batches.len()
    }
}

impl Batch {
    fn empty(commands: usize) -> Result<Self, TryReserveError> {
        let mut v = Vec::new();
        v.try_reserve(commands)?;
        Ok(Self {
            target: RawHandle::TOMBSTONE,
            clear: ClearState::default(),
            viewport: Rect2d::default(),
            commands: v,
        })
    }

    /// Sorts commands by `(sort_group, submission order)`.
    pub fn sort(&mut self) {
        self.commands.sort_unstable_by_key(|c| c.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn external(_: &ExternalTarget) {}

    fn snapshot(tag: i32) -> impl FnOnce() -> (ClearState, Rect2d) {
        move || (ClearState::default(), Rect2d::new(tag, 0, 1, 1))
    }

    fn groups(batch: &Batch) -> Vec<(u32, u32)> {
        batch.commands.iter().map(|c| (c.key.group, c.key.order)).collect()
    }

    // ── batching ──────────────────────────────────────────────────────────

    #[test]
    fn batches_follow_first_touch() {
        let mut r = FrameRecorder::with_capacity(1, 4).unwrap();
        let (a, b) = (RawHandle::new(10), RawHandle::new(20));
        r.push(b, snapshot(2), 0, RecordedKind::Function(external)).unwrap();
        r.push(a, snapshot(1), 0, RecordedKind::Function(external)).unwrap();
        r.push(b, snapshot(99), 0, RecordedKind::Function(external)).unwrap();

        let targets: Vec<RawHandle> = r.batches_mut().iter().map(|b| b.target).collect();
        assert_eq!(targets, [b, a]);
        // The snapshot is taken once, at first touch.
        assert_eq!(r.batches_mut()[0].viewport.x, 2);
        assert_eq!(r.command_count(), 3);
    }

    #[test]
    fn sort_is_stable_within_groups() {
        let mut r = FrameRecorder::with_capacity(1, 4).unwrap();
        let t = RawHandle::new(0);
        for g in [2, 0, 1, 0] {
            r.push(t, snapshot(0), g, RecordedKind::Function(external)).unwrap();
        }
        let batch = &mut r.batches_mut()[0];
        batch.sort();
        assert_eq!(groups(batch), [(0, 1), (0, 3), (1, 2), (2, 0)]);
    }

    // ── pooling ───────────────────────────────────────────────────────────

    #[test]
    fn reset_keeps_pool_and_capacity() {
        let mut r = FrameRecorder::with_capacity(1, 2).unwrap();
        for t in 0..3 {
            for _ in 0..8 {
                r.push(RawHandle::new(t), snapshot(0), 0, RecordedKind::Function(external))
                    .unwrap();
            }
        }
        assert_eq!(r.pooled_batches(), 3);
        let caps: Vec<usize> = r.batches_mut().iter().map(|b| b.commands.capacity()).collect();

        r.reset();
        assert_eq!(r.batch_count(), 0);
        assert_eq!(r.pooled_batches(), 3);

        for t in 0..3 {
            r.push(RawHandle::new(t), snapshot(0), 0, RecordedKind::Function(external)).unwrap();
        }
        let after: Vec<usize> = r.batches_mut().iter().map(|b| b.commands.capacity()).collect();
        assert_eq!(caps, after);
        assert_eq!(r.batches_mut()[0].commands[0].key.order, 0);
    }

    // ── resolution ────────────────────────────────────────────────────────

    #[test]
    fn resolve_reborrows_arena_spans() {
        let arena = Arena::try_new(1024).unwrap();
        let vb = arena
            .alloc_slice_copy(&[VertexBinding { location: 0, buffer: RawHandle::new(5), offset: 0 }])
            .unwrap();
        let name = arena.alloc_str("u_color").unwrap();
        // SAFETY: every detached value below was allocated by `arena`.
        let name = unsafe { arena.detach(&*name) };
        let uniforms = arena
            .alloc_slice_copy(&[RecordedUniform { name, data: UniformData::Float(0.5) }])
            .unwrap();
        let empty_sb: &[ShaderBufferBinding] = &[];
        let empty_tx: &[TextureBinding] = &[];

        let cmd = RecordedCmd {
            key: SortKey::new(3, 0),
            kind: RecordedKind::Draw(RecordedDraw {
                pipeline: RawHandle::new(1),
                vertex_buffers: unsafe { arena.detach(&*vb) },
                index_buffer: None,
                shader_buffers: unsafe { arena.detach(empty_sb) },
                textures: unsafe { arena.detach(empty_tx) },
                uniforms: unsafe { arena.detach(&*uniforms) },
                options: DrawOptions::vertices(3),
            }),
        };

        let resolved = cmd.resolve(&arena).unwrap();
        assert_eq!(resolved.sort_group, 3);
        let RenderCmdKind::Draw(draw) = resolved.kind else {
            panic!("expected a draw command");
        };
        assert_eq!(draw.vertex_buffers[0].buffer, RawHandle::new(5));
        assert_eq!(draw.uniforms[0].name, "u_color");
        assert_eq!(draw.uniforms[0].data, UniformData::Float(0.5));
        assert_eq!(draw.options.count, 3);
    }

    #[test]
    #[should_panic(expected = "after the arena was cleared")]
    fn resolving_after_clear_panics() {
        let mut arena = Arena::try_new(256).unwrap();
        let f = arena.construct(|_: &ExternalTarget| {}).unwrap();
        let f: &(dyn Fn(&ExternalTarget) + 'static) = &*f;
        // SAFETY: `f` lives in `arena`.
        let f = unsafe { arena.detach(f) };
        let cmd = RecordedCmd { key: SortKey::new(0, 0), kind: RecordedKind::Closure(f) };
        arena.clear();
        let _ = cmd.resolve(&arena);
    }
}
