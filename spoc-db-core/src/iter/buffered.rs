//! Prefetching reader over a slow statement source
//!
//! [`AsyncBufferedIterator`] drains a source stream into a bounded buffer. In
//! asynchronous mode a named background thread fills the buffer while the
//! consumer works; the thread blocks when the buffer is full. In synchronous
//! mode the buffer is filled on the caller's thread whenever it runs dry.
//!
//! ## Capacity policy
//!
//! Given the source's fast upper-bound count `n` and a requested capacity:
//! - `0` means "buffer everything": capacity becomes `min(n, MAXIMUM_CAPACITY)`
//! - a capacity above `n` is reduced to `n` and the read is synchronous
//! - `n < ASYNC_LOW_WATER` always reads synchronously
//! - capacity is never below 1
//!
//! ## Chunking
//!
//! In asynchronous mode `next_chunk()` waits until at least
//! `min(capacity, MIN_CHUNK_SIZE)` tuples are buffered or the reader has
//! finished, then hands over everything buffered.
//!
//! ## Cancellation
//!
//! `close()` raises a cancel flag, wakes the reader and drops buffered tuples.
//! It never joins the reader thread; a reader stuck inside a slow source call
//! exits the next time it checks the flag.

use super::{BoxedIterator, ChunkCursor, ChunkedOrderedIterator, IterState};
use crate::error::{Error, Result};
use crate::key_order::KeyOrder;
use crate::spo::Spo;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Hard upper bound on buffered tuples
pub const MAXIMUM_CAPACITY: usize = 10 * 1024;

/// Smallest chunk handed out while the reader is still running
pub const MIN_CHUNK_SIZE: usize = 100;

/// Below this many source tuples a background reader is not worth starting
pub const ASYNC_LOW_WATER: u64 = 100;

/// Buffer settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Requested capacity; 0 buffers the whole source (up to `MAXIMUM_CAPACITY`)
    pub capacity: usize,
    /// Allow a background reader when the policy permits one
    pub async_enabled: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 0,
            async_enabled: true,
        }
    }
}

impl BufferConfig {
    /// Effective `(capacity, async)` for a source of `range_count` tuples
    pub fn plan(&self, range_count: u64) -> (usize, bool) {
        let count = usize::try_from(range_count).unwrap_or(usize::MAX);
        let mut async_read = self.async_enabled;
        let mut capacity = if self.capacity == 0 {
            count.min(MAXIMUM_CAPACITY)
        } else {
            self.capacity
        };
        if capacity > count {
            capacity = count;
            async_read = false;
        }
        if range_count < ASYNC_LOW_WATER {
            async_read = false;
        }
        (capacity.max(1), async_read)
    }
}

struct BufState {
    queue: VecDeque<Spo>,
    done: bool,
    error: Option<Error>,
}

/// State shared between the consumer and the reader thread
struct Shared {
    state: Mutex<BufState>,
    not_empty: Condvar,
    not_full: Condvar,
    cancelled: AtomicBool,
    capacity: usize,
    /// Consumer wakes once this many tuples are buffered
    threshold: usize,
}

impl Shared {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

enum Mode {
    Sync { src: Option<BoxedIterator> },
    Async { shared: Arc<Shared> },
}

/// Bounded prefetching wrapper around a statement stream
pub struct AsyncBufferedIterator {
    mode: Mode,
    capacity: usize,
    key_order: Option<KeyOrder>,
    cursor: ChunkCursor,
    state: IterState,
}

impl AsyncBufferedIterator {
    /// Buffer `src`, whose fast range count is `range_count`, with the
    /// requested capacity (0 = everything).
    pub fn new(src: BoxedIterator, range_count: u64, capacity: usize) -> Result<Self> {
        Self::with_config(
            src,
            range_count,
            &BufferConfig {
                capacity,
                ..BufferConfig::default()
            },
        )
    }

    pub fn with_config(
        src: BoxedIterator,
        range_count: u64,
        config: &BufferConfig,
    ) -> Result<Self> {
        let (capacity, async_read) = config.plan(range_count);
        let key_order = src.key_order();
        tracing::debug!(
            range_count,
            requested = config.capacity,
            capacity,
            async_read,
            "buffered reader configured"
        );
        let mode = if async_read {
            Mode::Async {
                shared: spawn_reader(src, capacity)?,
            }
        } else {
            Mode::Sync { src: Some(src) }
        };
        Ok(Self {
            mode,
            capacity,
            key_order,
            cursor: ChunkCursor::new(),
            state: IterState::Open,
        })
    }

    /// Effective capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True if a background reader is filling the buffer
    pub fn is_async(&self) -> bool {
        matches!(self.mode, Mode::Async { .. })
    }

    /// Synchronous fill: read up to `capacity` tuples from the source on the
    /// calling thread. Returns the number read; 0 once the source is drained.
    pub fn fill_sync(&mut self) -> Result<usize> {
        self.state.check_open("fill_sync")?;
        let src = match &mut self.mode {
            Mode::Sync { src } => src,
            Mode::Async { .. } => {
                return Err(Error::illegal_state(
                    "synchronous fill on an asynchronous reader",
                ))
            }
        };
        let Some(inner) = src.as_mut() else {
            return Ok(0);
        };
        let mut buf = Vec::with_capacity(self.capacity.min(MAXIMUM_CAPACITY));
        while buf.len() < self.capacity {
            match inner.next()? {
                Some(spo) => buf.push(spo),
                None => {
                    inner.close();
                    *src = None;
                    break;
                }
            }
        }
        let n = buf.len();
        self.cursor.load(buf);
        Ok(n)
    }

    /// Wait for the reader to buffer a chunk's worth of tuples (or finish) and
    /// take everything buffered. Empty once the reader is done and drained.
    pub fn wait_async(&mut self) -> Result<Vec<Spo>> {
        self.state.check_open("wait_async")?;
        let shared = match &self.mode {
            Mode::Async { shared } => Arc::clone(shared),
            Mode::Sync { .. } => {
                return Err(Error::illegal_state(
                    "asynchronous wait on a synchronous reader",
                ))
            }
        };
        let mut st = shared.state.lock();
        while st.queue.len() < shared.threshold && !st.done {
            shared.not_empty.wait(&mut st);
        }
        if st.queue.is_empty() {
            return match st.error.take() {
                Some(e) => Err(e),
                None => Ok(Vec::new()),
            };
        }
        let chunk: Vec<Spo> = st.queue.drain(..).collect();
        drop(st);
        shared.not_full.notify_all();
        Ok(chunk)
    }

    fn fetch(&mut self) -> Result<Vec<Spo>> {
        if self.state == IterState::Exhausted {
            return Ok(Vec::new());
        }
        let chunk = if self.is_async() {
            self.wait_async()?
        } else {
            self.fill_sync()?;
            self.cursor.take()
        };
        if chunk.is_empty() {
            self.state = IterState::Exhausted;
        }
        Ok(chunk)
    }
}

impl ChunkedOrderedIterator for AsyncBufferedIterator {
    fn has_next(&mut self) -> Result<bool> {
        if self.state.is_closed() {
            return Ok(false);
        }
        if self.cursor.has_buffered() {
            return Ok(true);
        }
        let chunk = self.fetch()?;
        let any = !chunk.is_empty();
        self.cursor.load(chunk);
        Ok(any)
    }

    fn next(&mut self) -> Result<Option<Spo>> {
        self.state.check_open("next")?;
        if !self.has_next()? {
            return Ok(None);
        }
        Ok(self.cursor.pop())
    }

    fn next_chunk(&mut self) -> Result<Vec<Spo>> {
        self.state.check_open("next_chunk")?;
        if self.cursor.has_buffered() {
            return Ok(self.cursor.take());
        }
        self.fetch()
    }

    fn key_order(&self) -> Option<KeyOrder> {
        self.key_order
    }

    fn close(&mut self) {
        if self.state.is_closed() {
            return;
        }
        self.state = IterState::Closed;
        self.cursor.clear();
        match &mut self.mode {
            Mode::Sync { src } => {
                if let Some(mut inner) = src.take() {
                    inner.close();
                }
            }
            Mode::Async { shared } => {
                shared.cancelled.store(true, Ordering::Release);
                shared.state.lock().queue.clear();
                shared.not_full.notify_all();
                shared.not_empty.notify_all();
            }
        }
    }
}

impl Drop for AsyncBufferedIterator {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Reader thread
// ============================================================================

fn spawn_reader(src: BoxedIterator, capacity: usize) -> Result<Arc<Shared>> {
    let shared = Arc::new(Shared {
        state: Mutex::new(BufState {
            queue: VecDeque::with_capacity(capacity),
            done: false,
            error: None,
        }),
        not_empty: Condvar::new(),
        not_full: Condvar::new(),
        cancelled: AtomicBool::new(false),
        capacity,
        threshold: capacity.min(MIN_CHUNK_SIZE),
    });
    let reader_shared = Arc::clone(&shared);
    std::thread::Builder::new()
        .name("spoc-prefetch".to_string())
        .spawn(move || {
            let _span = tracing::debug_span!("prefetch_reader", capacity).entered();
            let mut src = src;
            match read_into(&mut src, &reader_shared) {
                Ok(produced) => tracing::debug!(produced, "prefetch reader finished"),
                Err(e) if e.is_cancelled() => tracing::debug!("prefetch reader cancelled"),
                Err(e) => {
                    tracing::warn!(error = %e, "prefetch reader failed");
                    reader_shared.state.lock().error = Some(e);
                }
            }
            src.close();
            reader_shared.state.lock().done = true;
            reader_shared.not_empty.notify_all();
        })
        .map_err(|e| Error::storage(format!("failed to spawn prefetch reader: {}", e)))?;
    Ok(shared)
}

/// Move tuples from `src` into the shared queue, blocking while it is full.
fn read_into(src: &mut BoxedIterator, shared: &Shared) -> Result<u64> {
    let mut produced = 0u64;
    loop {
        if shared.is_cancelled() {
            return Err(Error::cancelled("prefetch reader"));
        }
        let chunk = src.next_chunk()?;
        if chunk.is_empty() {
            return Ok(produced);
        }
        let mut st = shared.state.lock();
        for spo in chunk {
            while st.queue.len() >= shared.capacity && !shared.is_cancelled() {
                shared.not_full.wait(&mut st);
            }
            if shared.is_cancelled() {
                return Err(Error::cancelled("prefetch reader"));
            }
            st.queue.push_back(spo);
            produced += 1;
            if st.queue.len() >= shared.threshold {
                shared.not_empty.notify_one();
            }
        }
        drop(st);
        shared.not_empty.notify_one();
    }
}
