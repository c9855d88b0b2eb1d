//! Shared image buffers: the resolve capability and an in-process pool.
//!
//! A [`BufferHandle`] travels in the message; the bytes never do. The
//! receiving side turns a handle into a read-only [`ImageData`] view through
//! a [`BufferResolver`], and the view is dropped when the listener returns.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use procam_protocol::BufferHandle;

use crate::error::ResolveError;

/// Resolves handles to readable bytes for the duration of a transaction.
pub trait BufferResolver: Send + Sync {
    fn resolve(&self, handle: &BufferHandle) -> Result<Bytes, ResolveError>;
}

impl<T: BufferResolver + ?Sized> BufferResolver for Arc<T> {
    fn resolve(&self, handle: &BufferHandle) -> Result<Bytes, ResolveError> {
        (**self).resolve(handle)
    }
}

impl<T: BufferResolver + ?Sized> BufferResolver for &T {
    fn resolve(&self, handle: &BufferHandle) -> Result<Bytes, ResolveError> {
        (**self).resolve(handle)
    }
}

/// Borrowed view of an image buffer handed to a listener.
///
/// Not `Clone`: a listener that needs the pixels after returning must copy
/// them out.
pub struct ImageData {
    handle: BufferHandle,
    view: Bytes,
}

impl ImageData {
    pub(crate) fn new(handle: BufferHandle, view: Bytes) -> Self {
        Self { handle, view }
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.view
    }

    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("handle", &self.handle)
            .field("len", &self.view.len())
            .finish()
    }
}

/// In-process stand-in for a shared-memory allocator.
///
/// Heaps are immutable once registered. The pool owns them; handles only
/// name regions inside them, and resolving never transfers ownership.
#[derive(Debug)]
pub struct SharedMemoryPool {
    heaps: RwLock<HashMap<u64, Bytes>>,
    next_id: AtomicU64,
}

impl Default for SharedMemoryPool {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedMemoryPool {
    pub fn new() -> Self {
        Self {
            heaps: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a heap and returns its id.
    pub fn register(&self, data: impl Into<Bytes>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.heaps.write().insert(id, data.into());
        id
    }

    /// Returns a handle to `size` bytes at `offset` inside a registered heap.
    pub fn allocate(
        &self,
        heap_id: u64,
        offset: u32,
        size: u32,
    ) -> Result<BufferHandle, ResolveError> {
        let handle = BufferHandle::new(heap_id, offset, size);
        self.resolve(&handle)?;
        Ok(handle)
    }

    /// Registers `data` as its own heap and returns a handle covering all of it.
    pub fn share(&self, data: impl Into<Bytes>) -> Result<BufferHandle, ResolveError> {
        let data = data.into();
        let size = u32::try_from(data.len()).map_err(|_| ResolveError::HeapTooLarge(data.len()))?;
        let heap_id = self.register(data);
        Ok(BufferHandle::new(heap_id, 0, size))
    }

    /// Drops the pool's reference to a heap. Views already resolved stay
    /// readable until their transaction ends.
    pub fn release(&self, heap_id: u64) -> bool {
        self.heaps.write().remove(&heap_id).is_some()
    }

    pub fn heap_count(&self) -> usize {
        self.heaps.read().len()
    }
}

impl BufferResolver for SharedMemoryPool {
    fn resolve(&self, handle: &BufferHandle) -> Result<Bytes, ResolveError> {
        let heaps = self.heaps.read();
        let heap = heaps
            .get(&handle.heap_id)
            .ok_or(ResolveError::UnknownHeap(handle.heap_id))?;
        match handle.range() {
            Some(range) if range.end <= heap.len() => Ok(heap.slice(range)),
            _ => Err(ResolveError::OutOfBounds {
                heap_id: handle.heap_id,
                offset: handle.offset,
                size: handle.size,
                heap_len: heap.len(),
            }),
        }
    }
}
