//! Reusable datagram buffers.
//!
//! The receive loop copies each datagram into a [`PooledBuffer`] and moves it
//! into the worker task. The guard hands the allocation back to its pool when
//! dropped, which is only after the worker is finished with the bytes.

#![allow(clippy::disallowed_types, reason = "Synchronous push/pop only, never held across await")]

use std::{
    ops::Deref,
    sync::{Arc, Mutex, PoisonError},
};

use crate::config::PoolConfig;

#[derive(Debug)]
struct PoolInner {
    idle: Mutex<Vec<Vec<u8>>>,
    buffer_size: usize,
    max_idle: usize,
}

impl PoolInner {
    fn idle(&self) -> std::sync::MutexGuard<'_, Vec<Vec<u8>>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Pool of fixed-capacity byte buffers. Clones share the same pool.
#[derive(Debug, Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    /// Create an empty pool.
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(Vec::with_capacity(config.max_idle)),
                buffer_size: config.buffer_size,
                max_idle: config.max_idle,
            }),
        }
    }

    /// Capacity of every buffer this pool hands out.
    pub fn buffer_size(&self) -> usize {
        self.inner.buffer_size
    }

    /// Buffers currently waiting for reuse.
    pub fn idle_count(&self) -> usize {
        self.inner.idle().len()
    }

    /// Take an empty buffer, reusing an idle one when available.
    pub fn acquire(&self) -> PooledBuffer {
        let buf = self
            .inner
            .idle()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(self.inner.buffer_size));
        PooledBuffer { buf, pool: Arc::clone(&self.inner) }
    }
}

/// Buffer on loan from a [`BufferPool`].
///
/// Dereferences to the bytes written so far.
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Vec<u8>,
    pool: Arc<PoolInner>,
}

impl PooledBuffer {
    /// Replace the contents with `data`, truncated to the pool's buffer size.
    pub fn fill_from(&mut self, data: &[u8]) {
        let len = data.len().min(self.pool.buffer_size);
        self.buf.clear();
        self.buf.extend_from_slice(&data[..len]);
    }
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();

        let mut idle = self.pool.idle();
        if idle.len() < self.pool.max_idle {
            idle.push(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(max_idle: usize) -> BufferPool {
        BufferPool::new(&PoolConfig { buffer_size: 16, max_idle })
    }

    #[test]
    fn buffer_returns_on_drop() {
        let pool = pool(4);
        assert_eq!(pool.idle_count(), 0);

        let mut buffer = pool.acquire();
        buffer.fill_from(b"hello");
        assert_eq!(&buffer[..], b"hello");

        drop(buffer);
        assert_eq!(pool.idle_count(), 1);

        let reused = pool.acquire();
        assert!(reused.is_empty());
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn idle_buffers_are_capped() {
        let pool = pool(1);
        let a = pool.acquire();
        let b = pool.acquire();
        drop(a);
        drop(b);
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn fill_truncates_to_buffer_size() {
        let pool = pool(1);
        let mut buffer = pool.acquire();
        buffer.fill_from(&[7u8; 32]);
        assert_eq!(buffer.len(), 16);
    }

    #[test]
    fn buffer_outlives_pool_handle() {
        let pool = pool(1);
        let mut buffer = pool.acquire();
        let clone = pool.clone();
        drop(pool);

        buffer.fill_from(b"still valid");
        drop(buffer);
        assert_eq!(clone.idle_count(), 1);
    }
}
