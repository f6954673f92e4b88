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

//! The engine's outward audio boundary: the fixed PCM format, the buffer type that carries
//! it, and the sinks chunks are delivered to.

pub mod buffer;
pub mod format;
pub mod mock;
pub mod sink;
pub mod thread_priority;

pub use buffer::SampleBuffer;
pub use format::{AudioFormat, BITS_PER_SAMPLE, CHANNELS, SAMPLE_RATE};
pub use sink::{ChannelSink, ChunkReceiver, NullSink, OutputSink, SinkError};
