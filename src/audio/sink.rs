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

//! Output sinks that receive finished chunks from the engine.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use crossbeam_channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};

use super::buffer::SampleBuffer;

/// Errors a sink can report when refusing a chunk.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Output sink did not accept chunk within {0:?}")]
    Timeout(Duration),

    #[error("Output sink disconnected")]
    Disconnected,
}

/// Where the engine delivers audio. Implementations apply backpressure by blocking the
/// caller, up to `timeout`, rather than dropping frames.
pub trait OutputSink: Send + Sync {
    /// Hands a finished chunk to the sink. Either the whole chunk is accepted or an error
    /// is returned; chunks are never partially consumed.
    fn push(&self, chunk: SampleBuffer, timeout: Duration) -> Result<(), SinkError>;
}

/// A sink backed by a bounded channel. The paired [`ChunkReceiver`] is drained by the host
/// (an audio callback, a file writer, a network stream...).
pub struct ChannelSink {
    tx: Sender<SampleBuffer>,
}

/// The consuming side of a [`ChannelSink`].
pub struct ChunkReceiver {
    rx: Receiver<SampleBuffer>,
}

impl ChannelSink {
    /// Creates a sink that holds at most `capacity` undelivered chunks before blocking.
    pub fn bounded(capacity: usize) -> (ChannelSink, ChunkReceiver) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (ChannelSink { tx }, ChunkReceiver { rx })
    }
}

impl OutputSink for ChannelSink {
    fn push(&self, chunk: SampleBuffer, timeout: Duration) -> Result<(), SinkError> {
        self.tx.send_timeout(chunk, timeout).map_err(|e| match e {
            SendTimeoutError::Timeout(_) => SinkError::Timeout(timeout),
            SendTimeoutError::Disconnected(_) => SinkError::Disconnected,
        })
    }
}

impl ChunkReceiver {
    /// Waits up to `timeout` for the next chunk. Returns None on timeout or when the sink
    /// side has gone away.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<SampleBuffer> {
        match self.rx.recv_timeout(timeout) {
            Ok(chunk) => Some(chunk),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Takes the next chunk if one is already waiting.
    pub fn try_recv(&self) -> Option<SampleBuffer> {
        self.rx.try_recv().ok()
    }

    /// Number of chunks waiting to be consumed.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

/// A sink that discards audio, counting what it was given.
#[derive(Default)]
pub struct NullSink {
    chunks: AtomicU64,
    frames: AtomicU64,
}

impl NullSink {
    pub fn new() -> NullSink {
        NullSink::default()
    }

    /// Number of chunks accepted so far.
    pub fn chunks(&self) -> u64 {
        self.chunks.load(Ordering::Relaxed)
    }

    /// Number of frames accepted so far.
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

impl OutputSink for NullSink {
    fn push(&self, chunk: SampleBuffer, _: Duration) -> Result<(), SinkError> {
        self.chunks.fetch_add(1, Ordering::Relaxed);
        self.frames.fetch_add(chunk.frames() as u64, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_delivers_in_order() {
        let (sink, receiver) = ChannelSink::bounded(4);
        for i in 0..3 {
            let chunk = SampleBuffer::from_interleaved(vec![i, i]);
            sink.push(chunk, Duration::from_millis(10)).unwrap();
        }
        assert_eq!(receiver.pending(), 3);
        for i in 0..3 {
            let chunk = receiver.try_recv().unwrap();
            assert_eq!(chunk.samples(), &[i, i]);
        }
        assert!(receiver.try_recv().is_none());
    }

    #[test]
    fn test_channel_sink_times_out_when_full() {
        let (sink, _receiver) = ChannelSink::bounded(1);
        sink.push(SampleBuffer::silence(1), Duration::from_millis(10))
            .unwrap();
        let result = sink.push(SampleBuffer::silence(1), Duration::from_millis(10));
        assert!(matches!(result, Err(SinkError::Timeout(_))));
    }

    #[test]
    fn test_channel_sink_disconnected() {
        let (sink, receiver) = ChannelSink::bounded(1);
        drop(receiver);
        let result = sink.push(SampleBuffer::silence(1), Duration::from_millis(10));
        assert!(matches!(result, Err(SinkError::Disconnected)));
    }

    #[test]
    fn test_null_sink_counts() {
        let sink = NullSink::new();
        sink.push(SampleBuffer::silence(128), Duration::ZERO).unwrap();
        sink.push(SampleBuffer::silence(64), Duration::ZERO).unwrap();
        assert_eq!(sink.chunks(), 2);
        assert_eq!(sink.frames(), 192);
    }
}
