use core::fmt;
use core::hash::{Hash, Hasher};
use core::marker::PhantomData;

/// Backend-side token for a GPU object.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct RawHandle(pub u64);

impl RawHandle {
    /// Reserved value meaning "not allocated / destroyed".
    pub const TOMBSTONE: RawHandle = RawHandle(u64::MAX);

    #[inline]
    pub const fn new(v: u64) -> Self {
        Self(v)
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != Self::TOMBSTONE.0
    }
}

impl Default for RawHandle {
    fn default() -> Self {
        Self::TOMBSTONE
    }
}

/// Application-facing handle: a generation-checked slot index.
///
/// Handles are plain values and do not own the resource. A handle whose slot
/// was freed (or reused) no longer resolves, so use-after-destroy is detected
/// instead of reading another resource.
pub struct Handle<K> {
    index: u32,
    generation: u32,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Handle<K> {
    #[inline]
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation, _kind: PhantomData }
    }

    #[inline]
    pub fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<K> Eq for Handle<K> {}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<K: kind::Kind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}v{})", K::NAME, self.index, self.generation)
    }
}

/// Marker types distinguishing handle kinds.
pub mod kind {
    pub trait Kind {
        const NAME: &'static str;
    }

    macro_rules! kinds {
        ($($name:ident => $label:literal),* $(,)?) => {
            $(
                #[derive(Debug)]
                pub enum $name {}

                impl Kind for $name {
                    const NAME: &'static str = $label;
                }
            )*
        };
    }

    kinds! {
        Buffer => "Buffer",
        Texture => "Texture",
        Shader => "Shader",
        Pipeline => "Pipeline",
        Framebuffer => "Framebuffer",
    }
}

pub type BufferHandle = Handle<kind::Buffer>;
pub type TextureHandle = Handle<kind::Texture>;
pub type ShaderHandle = Handle<kind::Shader>;
pub type PipelineHandle = Handle<kind::Pipeline>;
pub type FramebufferHandle = Handle<kind::Framebuffer>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tombstone_is_invalid() {
        assert!(!RawHandle::TOMBSTONE.is_valid());
        assert!(!RawHandle::default().is_valid());
        assert!(RawHandle::new(0).is_valid());
    }

    #[test]
    fn handles_compare_by_index_and_generation() {
        let a = BufferHandle::new(3, 1);
        assert_eq!(a, BufferHandle::new(3, 1));
        assert_ne!(a, BufferHandle::new(3, 2));
        assert_eq!(format!("{a:?}"), "Buffer(3v1)");
    }
}
