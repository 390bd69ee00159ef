use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

/// Bounded pool of byte buffers for HTTP body reads, so a steady scrape load
/// settles into a fixed set of allocations.
pub struct BufferPool {
    buffers: Mutex<Vec<Vec<u8>>>,
    max_pooled: usize,
}

impl BufferPool {
    pub fn new(max_pooled: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
            max_pooled,
        }
    }

    /// Take a cleared buffer out of the pool, or allocate a fresh one. The
    /// guard returns it on drop, on every exit path.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let buffer = self
            .buffers
            .lock()
            .expect("buffer pool lock poisoned")
            .pop()
            .unwrap_or_default();
        PooledBuffer {
            pool: self,
            buffer: Some(buffer),
        }
    }

    fn release(&self, mut buffer: Vec<u8>) {
        buffer.clear();
        let mut buffers = self.buffers.lock().expect("buffer pool lock poisoned");
        if buffers.len() < self.max_pooled {
            buffers.push(buffer);
        }
    }

    #[cfg(test)]
    fn pooled(&self) -> usize {
        self.buffers.lock().unwrap().len()
    }
}

pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buffer: Option<Vec<u8>>,
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        self.buffer.as_ref().expect("buffer taken")
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        self.buffer.as_mut().expect("buffer taken")
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.pool.release(buffer);
        }
    }
}
