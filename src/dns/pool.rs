//! Lock-free free-list of fixed-size receive buffers.
//!
//! A [`PooledBuffer`] is only lent out for the duration of a socket read. Its payload is copied
//! into an owned `Vec` with [`PooledBuffer::copy_out`], which hands the buffer straight back to
//! the pool, so nothing downstream of the read ever aliases pooled memory.
//!
//! The free-list is a bounded [`ArrayQueue`]: when it is full a released buffer is simply
//! dropped, so the pool never holds more than its capacity.

use crossbeam_queue::ArrayQueue;
use std::ops::{Deref, DerefMut};

/// Default number of idle buffers kept by the dispatcher's pool.
pub const DEFAULT_POOL_CAPACITY: usize = 64;

#[derive(Debug)]
pub struct BufferPool {
    buffers: ArrayQueue<Box<[u8]>>,
    buffer_size: usize,
}

impl BufferPool {
    /// Create a pool keeping at most `capacity` idle buffers of `buffer_size` bytes each.
    #[must_use]
    pub fn new(capacity: usize, buffer_size: usize) -> Self {
        BufferPool {
            buffers: ArrayQueue::new(capacity.max(1)),
            buffer_size,
        }
    }

    /// Take a buffer from the free-list, allocating a fresh one when the list is empty.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let buf = self
            .buffers
            .pop()
            .unwrap_or_else(|| vec![0u8; self.buffer_size].into_boxed_slice());
        PooledBuffer {
            pool: self,
            buf: Some(buf),
        }
    }

    /// Number of buffers currently sitting in the free-list.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.buffers.len()
    }

    fn release(&self, buf: Box<[u8]>) {
        // Pool is full, drop the buffer.
        let _ = self.buffers.push(buf);
    }
}

/// A buffer on loan from a [`BufferPool`]. Returned to the pool on drop.
#[derive(Debug)]
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buf: Option<Box<[u8]>>,
}

impl PooledBuffer<'_> {
    /// Copy the first `len` bytes into a freshly owned buffer and release this one.
    #[must_use]
    pub fn copy_out(self, len: usize) -> Vec<u8> {
        let len = len.min(self.len());
        self[..len].to_vec()
    }
}

impl Deref for PooledBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buf.as_deref().unwrap_or_default()
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().unwrap_or_default()
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release(buf);
        }
    }
}
