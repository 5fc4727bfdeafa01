//! Reusable encode buffers.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

/// Buffers larger than this are dropped instead of returned to the pool.
pub const DEFAULT_MAX_RETAINED: usize = 1 << 20;

/// Idle buffers kept for reuse.
const MAX_IDLE: usize = 64;

/// Pool of byte buffers shared by concurrent captures.
#[derive(Debug)]
pub struct BufferPool {
    idle: Mutex<Vec<Vec<u8>>>,
    max_retained: usize,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETAINED)
    }
}

impl BufferPool {
    pub fn new(max_retained: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_retained,
        }
    }

    /// Takes an empty buffer; it returns to the pool when the guard drops.
    pub fn acquire(self: &Arc<Self>) -> PooledBuffer {
        let buffer = self
            .idle
            .lock()
            .ok()
            .and_then(|mut idle| idle.pop())
            .unwrap_or_default();

        PooledBuffer {
            buffer,
            pool: Arc::clone(self),
        }
    }

    /// Number of buffers waiting for reuse.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }

    fn release(&self, mut buffer: Vec<u8>) {
        if buffer.capacity() > self.max_retained {
            return;
        }
        buffer.clear();
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < MAX_IDLE {
                idle.push(buffer);
            }
        }
    }
}

/// A buffer on loan from a [`BufferPool`].
#[derive(Debug)]
pub struct PooledBuffer {
    buffer: Vec<u8>,
    pool: Arc<BufferPool>,
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buffer));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_is_reused_and_cleared() {
        let pool = Arc::new(BufferPool::default());
        {
            let mut buffer = pool.acquire();
            buffer.extend_from_slice(b"leftover");
        }
        assert_eq!(pool.idle_count(), 1);

        let buffer = pool.acquire();
        assert!(buffer.is_empty());
        assert!(buffer.capacity() >= 8);
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_oversized_buffers_are_dropped() {
        let pool = Arc::new(BufferPool::new(16));
        {
            let mut buffer = pool.acquire();
            buffer.extend_from_slice(&[0u8; 64]);
        }
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn test_concurrent_loans_get_distinct_buffers() {
        let pool = Arc::new(BufferPool::default());
        let mut a = pool.acquire();
        let mut b = pool.acquire();
        a.push(1);
        b.push(2);
        assert_eq!(a.as_slice(), &[1]);
        assert_eq!(b.as_slice(), &[2]);

        drop(a);
        drop(b);
        assert_eq!(pool.idle_count(), 2);
    }
}
