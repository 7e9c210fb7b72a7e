// Memory backend - Deterministic in-process sources and destinations with fault injection

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::Rescaler;
use crate::ports::*;

/// `AVERROR(ENOENT)`
const CODE_NOT_FOUND: i32 = -2;

/// Codec parameters of an in-memory stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryParameters {
    pub kind: MediaKind,
    pub codec: String,
    pub width: u32,
    pub height: u32,
}

/// Scripted source content
#[derive(Debug, Clone, Default)]
pub struct MemoryMedia {
    streams: Vec<SourceStream>,
    /// (stream, width, height, packets read before they are known)
    late_dimensions: Vec<(usize, u32, u32, usize)>,
    packets: Vec<Packet>,
    discovery_error: Option<RemuxError>,
    read_error_after: Option<usize>,
}

impl MemoryMedia {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stream; its index is its position
    pub fn stream(mut self, kind: MediaKind, codec: &str, time_base: Timebase) -> Self {
        let index = self.streams.len();
        self.streams.push(SourceStream::new(index, kind, codec, time_base));
        self
    }

    /// Append a video stream whose frame size is known at discovery
    pub fn video(self, codec: &str, time_base: Timebase, width: u32, height: u32) -> Self {
        let mut media = self.stream(MediaKind::Video, codec, time_base);
        if let Some(last) = media.streams.last_mut() {
            last.width = width;
            last.height = height;
        }
        media
    }

    /// Frame size of `stream` becomes known once `after` packets have been read
    pub fn dimensions_after(mut self, stream: usize, width: u32, height: u32, after: usize) -> Self {
        self.late_dimensions.push((stream, width, height, after));
        self
    }

    pub fn packet(mut self, packet: Packet) -> Self {
        self.packets.push(packet);
        self
    }

    pub fn packets(mut self, packets: impl IntoIterator<Item = Packet>) -> Self {
        self.packets.extend(packets);
        self
    }

    pub fn fail_discovery(mut self, error: RemuxError) -> Self {
        self.discovery_error = Some(error);
        self
    }

    /// Every read after `packets` successful ones fails
    pub fn fail_read_after(mut self, packets: usize) -> Self {
        self.read_error_after = Some(packets);
        self
    }
}

/// Failures the destination injects
#[derive(Debug, Clone, Default)]
pub struct SinkFaults {
    /// Header write fails while any video stream lacks a frame size
    pub reject_unsized_video: bool,
    /// Packets for destination streams of this kind are refused
    pub reject_kind: Option<MediaKind>,
    /// Stream allocation fails past this many streams
    pub max_streams: Option<usize>,
    /// Time base every stream is switched to when the header is written
    pub header_time_base: Option<Timebase>,
    pub fail_create: bool,
    pub fail_trailer: bool,
    /// Closing the byte sink fails
    pub fail_close: bool,
}

/// Lifecycle events recorded by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEvent {
    NetworkInit,
    NetworkDeinit,
    SourceOpened(String),
    SourceClosed(String),
    SinkCreated(String),
    SinkClosed(String),
}

/// Final state of a destination, captured when its sink is dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryOutput {
    pub streams: Vec<(MemoryParameters, Timebase)>,
    pub packets: Vec<Packet>,
    pub header_written: bool,
    pub trailer_written: bool,
    /// Closed explicitly, not only dropped
    pub closed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryJournal {
    pub events: Vec<JournalEvent>,
    pub outputs: BTreeMap<String, MemoryOutput>,
}

impl MemoryJournal {
    pub fn count(&self, event: &JournalEvent) -> usize {
        self.events.iter().filter(|recorded| *recorded == event).count()
    }
}

type SharedJournal = Rc<RefCell<MemoryJournal>>;

/// [`MediaBackend`] serving scripted sources and recording destinations
#[derive(Debug, Default)]
pub struct MemoryBackend {
    sources: HashMap<String, MemoryMedia>,
    faults: SinkFaults,
    journal: SharedJournal,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, locator: &str, media: MemoryMedia) -> Self {
        self.sources.insert(locator.to_string(), media);
        self
    }

    pub fn with_faults(mut self, faults: SinkFaults) -> Self {
        self.faults = faults;
        self
    }

    /// Snapshot of everything recorded so far
    pub fn journal(&self) -> MemoryJournal {
        self.journal.borrow().clone()
    }

    pub fn output(&self, path: &str) -> Option<MemoryOutput> {
        self.journal.borrow().outputs.get(path).cloned()
    }

    fn record(&self, event: JournalEvent) {
        self.journal.borrow_mut().events.push(event);
    }
}

impl MediaBackend for MemoryBackend {
    type Parameters = MemoryParameters;
    type Packet = Packet;
    type Source = MemorySource;
    type Sink = MemorySink;

    fn open_source(&self, locator: &str, _config: &InputConfig) -> Result<MemorySource, RemuxError> {
        let media = self.sources.get(locator).cloned().ok_or_else(|| {
            RemuxError::open(format!("{}: No such file or directory", locator), CODE_NOT_FOUND)
        })?;

        self.record(JournalEvent::SourceOpened(locator.to_string()));
        Ok(MemorySource {
            locator: locator.to_string(),
            media,
            discovered: false,
            cursor: 0,
            journal: Rc::clone(&self.journal),
        })
    }

    fn create_sink(&self, path: &str, config: &OutputConfig) -> Result<MemorySink, RemuxError> {
        if self.faults.fail_create {
            return Err(RemuxError::io(format!("{}: Permission denied", path), -13));
        }
        debug!(path, format = %config.format, "Memory destination created");

        self.record(JournalEvent::SinkCreated(path.to_string()));
        Ok(MemorySink {
            path: path.to_string(),
            faults: self.faults.clone(),
            output: MemoryOutput {
                streams: Vec::new(),
                packets: Vec::new(),
                header_written: false,
                trailer_written: false,
                closed: false,
            },
            journal: Rc::clone(&self.journal),
        })
    }

    fn network_init(&self) {
        self.record(JournalEvent::NetworkInit);
    }

    fn network_deinit(&self) {
        self.record(JournalEvent::NetworkDeinit);
    }
}

pub struct MemorySource {
    locator: String,
    media: MemoryMedia,
    discovered: bool,
    cursor: usize,
    journal: SharedJournal,
}

impl MemorySource {
    fn describe(&self, stream: &SourceStream) -> SourceStream {
        let mut described = stream.clone();
        for (index, width, height, after) in &self.media.late_dimensions {
            if *index == stream.index && self.cursor >= *after {
                described.width = *width;
                described.height = *height;
            }
        }
        described
    }
}

impl DemuxSource for MemorySource {
    type Parameters = MemoryParameters;
    type Packet = Packet;

    fn discover_streams(&mut self) -> Result<(), RemuxError> {
        if let Some(error) = &self.media.discovery_error {
            return Err(error.clone());
        }
        self.discovered = true;
        Ok(())
    }

    fn streams(&self) -> Vec<SourceStream> {
        if !self.discovered {
            return Vec::new();
        }
        self.media.streams.iter().map(|stream| self.describe(stream)).collect()
    }

    fn parameters(&self, index: usize) -> Option<MemoryParameters> {
        let stream = self.describe(self.media.streams.get(index)?);
        Some(MemoryParameters {
            kind: stream.kind,
            codec: stream.codec,
            width: stream.width,
            height: stream.height,
        })
    }

    fn read_packet(&mut self) -> Result<Option<Packet>, RemuxError> {
        if let Some(limit) = self.media.read_error_after {
            if self.cursor >= limit {
                return Err(RemuxError::read(
                    format!("{}: Input/output error", self.locator),
                    CODE_IO,
                ));
            }
        }

        let packet = self.media.packets.get(self.cursor).cloned();
        if packet.is_some() {
            self.cursor += 1;
        }
        Ok(packet)
    }
}

impl Drop for MemorySource {
    fn drop(&mut self) {
        self.journal
            .borrow_mut()
            .events
            .push(JournalEvent::SourceClosed(self.locator.clone()));
    }
}

pub struct MemorySink {
    path: String,
    faults: SinkFaults,
    output: MemoryOutput,
    journal: SharedJournal,
}

impl MuxSink for MemorySink {
    type Parameters = MemoryParameters;
    type Packet = Packet;

    fn add_stream(
        &mut self,
        parameters: &MemoryParameters,
        time_base: Timebase,
    ) -> Result<usize, RemuxError> {
        if let Some(max) = self.faults.max_streams {
            if self.output.streams.len() >= max {
                return Err(RemuxError::stream_creation(
                    format!("{} accepts at most {} streams", self.path, max),
                    CODE_INVALID_ARGUMENT,
                ));
            }
        }
        self.output.streams.push((parameters.clone(), time_base));
        Ok(self.output.streams.len() - 1)
    }

    fn stream_count(&self) -> usize {
        self.output.streams.len()
    }

    fn stream_time_base(&self, index: usize) -> Option<Timebase> {
        self.output.streams.get(index).map(|(_, time_base)| *time_base)
    }

    fn write_header(&mut self) -> Result<(), RemuxError> {
        if self.faults.reject_unsized_video {
            let unsized_video = self.output.streams.iter().any(|(parameters, _)| {
                parameters.kind == MediaKind::Video && (parameters.width == 0 || parameters.height == 0)
            });
            if unsized_video {
                return Err(RemuxError::write_header(
                    "dimensions not set",
                    CODE_INVALID_ARGUMENT,
                ));
            }
        }

        if let Some(time_base) = self.faults.header_time_base {
            for (_, stream_time_base) in self.output.streams.iter_mut() {
                *stream_time_base = time_base;
            }
        }
        self.output.header_written = true;
        Ok(())
    }

    fn write_interleaved(&mut self, packet: Packet) -> Result<(), RemuxError> {
        let (parameters, _) = self.output.streams.get(packet.stream_index).ok_or_else(|| {
            RemuxError::write_frame(
                format!("no destination stream {}", packet.stream_index),
                CODE_INVALID_ARGUMENT,
            )
        })?;

        if self.faults.reject_kind == Some(parameters.kind) {
            return Err(RemuxError::write_frame(
                format!("{} packet rejected by muxer", parameters.kind),
                CODE_INVALID_DATA,
            ));
        }

        self.output.packets.push(packet);
        Ok(())
    }

    fn write_trailer(&mut self) -> Result<(), RemuxError> {
        if self.faults.fail_trailer {
            return Err(RemuxError::write_frame("trailer write failed", CODE_IO));
        }
        self.output.trailer_written = true;
        Ok(())
    }

    fn close(&mut self) -> Result<(), RemuxError> {
        if self.output.closed {
            return Ok(());
        }
        if self.faults.fail_close {
            return Err(RemuxError::io(format!("{}: No space left on device", self.path), -28));
        }
        self.output.closed = true;
        Ok(())
    }
}

impl Drop for MemorySink {
    fn drop(&mut self) {
        let mut journal = self.journal.borrow_mut();
        journal.outputs.insert(self.path.clone(), self.output.clone());
        journal.events.push(JournalEvent::SinkClosed(self.path.clone()));
    }
}

impl MediaPacket for Packet {
    fn stream_index(&self) -> usize {
        self.stream_index
    }

    fn set_stream_index(&mut self, index: usize) {
        self.stream_index = index;
    }

    fn rescale_ts(&mut self, from: Timebase, to: Timebase) {
        self.pts = Rescaler::rescale_timestamp(self.pts, from, to);
        self.dts = Rescaler::rescale_timestamp(self.dts, from, to);
        self.duration = Rescaler::rescale_duration(self.duration, from, to);
    }

    fn clear_position(&mut self) {
        self.position = None;
    }

    fn size(&self) -> usize {
        self.data.len()
    }
}
