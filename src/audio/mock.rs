// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    fmt,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::debug;

use super::{
    buffer::SampleBuffer,
    sink::{OutputSink, SinkError},
};

/// A mock sink. Records every chunk it accepts so tests can inspect the stream.
///
/// A gated sink only accepts a chunk after a permit has been released with
/// [`RecordingSink::release`], which lets tests hold the generation loop at a chunk
/// boundary. A refusing sink rejects everything as if the device had stalled.
pub struct RecordingSink {
    name: String,
    chunks: Mutex<Vec<SampleBuffer>>,
    refusing: AtomicBool,
    permits: Option<(Sender<()>, Receiver<()>)>,
    /// Pushes currently waiting for a permit.
    blocked: AtomicUsize,
}

impl RecordingSink {
    /// A sink that accepts everything immediately.
    pub fn new(name: &str) -> RecordingSink {
        RecordingSink {
            name: name.to_string(),
            chunks: Mutex::new(Vec::new()),
            refusing: AtomicBool::new(false),
            permits: None,
            blocked: AtomicUsize::new(0),
        }
    }

    /// A sink that accepts one chunk per released permit.
    pub fn gated(name: &str) -> RecordingSink {
        RecordingSink {
            permits: Some(crossbeam_channel::unbounded()),
            ..RecordingSink::new(name)
        }
    }

    /// Allows `count` more chunks through a gated sink.
    pub fn release(&self, count: usize) {
        if let Some((tx, _)) = &self.permits {
            for _ in 0..count {
                let _ = tx.send(());
            }
        }
    }

    /// Makes the sink refuse (or accept again) every chunk.
    pub fn set_refusing(&self, refusing: bool) {
        self.refusing.store(refusing, Ordering::Relaxed);
    }

    /// Number of pushes held at the gate right now.
    pub fn blocked_pushes(&self) -> usize {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Number of chunks accepted so far.
    pub fn len(&self) -> usize {
        self.chunks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A copy of every chunk accepted so far, in delivery order.
    pub fn chunks(&self) -> Vec<SampleBuffer> {
        self.chunks.lock().clone()
    }
}

impl OutputSink for RecordingSink {
    fn push(&self, chunk: SampleBuffer, timeout: Duration) -> Result<(), SinkError> {
        if self.refusing.load(Ordering::Relaxed) {
            std::thread::sleep(timeout);
            return Err(SinkError::Timeout(timeout));
        }
        if let Some((_, rx)) = &self.permits {
            self.blocked.fetch_add(1, Ordering::SeqCst);
            let permit = rx.recv_timeout(timeout);
            self.blocked.fetch_sub(1, Ordering::SeqCst);
            permit.map_err(|_| SinkError::Timeout(timeout))?;
        }

        let mut chunks = self.chunks.lock();
        chunks.push(chunk);
        debug!(sink = self.name, chunks = chunks.len(), "Chunk recorded");
        Ok(())
    }
}

impl fmt::Display for RecordingSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_chunks() {
        let sink = RecordingSink::new("mock");
        assert!(sink.is_empty());
        sink.push(SampleBuffer::silence(4), Duration::ZERO).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.chunks()[0].frames(), 4);
        assert_eq!(format!("{}", sink), "mock (Mock)");
    }

    #[test]
    fn test_gated_sink_requires_permit() {
        let sink = RecordingSink::gated("gated");
        let result = sink.push(SampleBuffer::silence(1), Duration::from_millis(5));
        assert!(matches!(result, Err(SinkError::Timeout(_))));
        assert!(sink.is_empty());
        assert_eq!(sink.blocked_pushes(), 0);

        sink.release(1);
        sink.push(SampleBuffer::silence(1), Duration::from_millis(5)).unwrap();
        assert_eq!(sink.len(), 1);
    }

    #[test]
    fn test_refusing_sink() {
        let sink = RecordingSink::new("refusing");
        sink.set_refusing(true);
        let result = sink.push(SampleBuffer::silence(1), Duration::from_millis(1));
        assert!(matches!(result, Err(SinkError::Timeout(_))));
        sink.set_refusing(false);
        assert!(sink
            .push(SampleBuffer::silence(1), Duration::from_millis(1))
            .is_ok());
    }
}
