//! Contracts for externally managed assets.
//!
//! The simulation never touches image memory; sprites only carry an opaque
//! texture handle that an asset collaborator reference counts.

/// Opaque, reference-counted texture handle. `TextureHandle::NONE` is never valid.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct TextureHandle {
    pub id: u32,
    pub generation: u32,
}

impl TextureHandle {
    pub const NONE: TextureHandle = TextureHandle { id: 0, generation: 0 };

    pub const fn new(id: u32, generation: u32) -> Self {
        Self { id, generation }
    }

    pub fn is_none(&self) -> bool {
        self.generation == 0
    }
}

/// Reference counting provided by the asset layer.
pub trait TextureProvider {
    /// Acquire (or add a reference to) the texture stored at `path`.
    fn acquire(&mut self, path: &str) -> TextureHandle;

    /// Add a reference to an already acquired handle.
    fn add_ref(&mut self, handle: TextureHandle);

    /// Drop one reference. The texture is freed once the count reaches zero.
    fn release(&mut self, handle: TextureHandle);

    fn is_valid(&self, handle: TextureHandle) -> bool;
}
