//! Captured host output.
//!
//! Host writes land in a bounded line buffer that the render loop drains into
//! the scrolling region, so they never interleave with the gauge box. Once
//! released, writes go straight to the real stdout, or to the sink given to
//! [`OutputMultiplexer::with_sink`].

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

struct Buffer {
    lines: VecDeque<String>,
    capacity: usize,
    released: bool,
    sink: Box<dyn Write + Send>,
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("lines", &self.lines.len())
            .field("capacity", &self.capacity)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl Buffer {
    /// Writes straight to the sink. Callers hold the lock, so pass-through
    /// output keeps the order of the writes.
    fn emit(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let _ = self.sink.write_all(text.as_bytes());
        let _ = self.sink.flush();
    }

    fn append(&mut self, text: &str) {
        for segment in text.split_inclusive('\n') {
            match self.lines.back_mut() {
                Some(last) if !last.ends_with('\n') => last.push_str(segment),
                _ => self.lines.push_back(segment.to_owned()),
            }
        }
        while self.lines.len() > self.capacity {
            let _ = self.lines.pop_front();
        }
    }

    fn take(&mut self) -> String {
        self.lines.drain(..).collect()
    }
}

/// Shared, bounded capture of host output. Clones share one buffer.
#[derive(Debug, Clone)]
pub struct OutputMultiplexer {
    inner: Arc<Mutex<Buffer>>,
}

impl OutputMultiplexer {
    /// Creates a multiplexer retaining the last `capacity` lines (minimum 1).
    /// Once released it passes writes through to stdout.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_sink(capacity, io::stdout())
    }

    /// Like [`new`](Self::new), passing released writes to `sink` instead of
    /// stdout.
    #[must_use]
    pub fn with_sink<W>(capacity: usize, sink: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Buffer {
                lines: VecDeque::new(),
                capacity: capacity.max(1),
                released: false,
                sink: Box::new(sink),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Buffer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends host output.
    ///
    /// A trailing partial line is continued by the next write. Only the last
    /// `capacity` lines are kept. After [`release`](Self::release) the text
    /// goes straight to the sink.
    pub fn write(&self, text: &str) {
        let mut buffer = self.lock();
        if buffer.released {
            buffer.emit(text);
        } else {
            buffer.append(text);
        }
    }

    /// Returns everything buffered since the last drain and clears it.
    #[must_use]
    pub fn drain(&self) -> String {
        self.lock().take()
    }

    /// Number of buffered lines, counting an unterminated last line.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().lines.len()
    }

    /// Whether nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().lines.is_empty()
    }

    /// Maximum number of lines retained between drains.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Whether writes currently pass straight through to stdout.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.lock().released
    }

    /// Switches to pass-through and flushes whatever is still buffered to
    /// the sink. Calling it again is a no-op.
    pub fn release(&self) {
        self.release_with("");
    }

    /// Switches to pass-through, writing `earlier` ahead of whatever is
    /// still buffered.
    ///
    /// `earlier` is output drained before the release. The switch and both
    /// writes happen under one lock, so a concurrent write lands after them.
    /// On an already released multiplexer only `earlier` is written.
    pub fn release_with(&self, earlier: &str) {
        let mut buffer = self.lock();
        buffer.emit(earlier);
        if buffer.released {
            return;
        }
        buffer.released = true;
        let pending = buffer.take();
        buffer.emit(&pending);
        drop(buffer);
        tracing::debug!(
            bytes = earlier.len() + pending.len(),
            "output multiplexer released"
        );
    }

    /// An [`io::Write`] handle into this multiplexer.
    #[must_use]
    pub fn writer(&self) -> MuxWriter {
        MuxWriter { mux: self.clone() }
    }
}

/// [`io::Write`] adapter over an [`OutputMultiplexer`], e.g. for a
/// `tracing` subscriber.
#[derive(Debug, Clone)]
pub struct MuxWriter {
    mux: OutputMultiplexer,
}

impl Write for MuxWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.mux.write(&String::from_utf8_lossy(buf));
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
