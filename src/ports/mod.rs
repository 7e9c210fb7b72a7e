// Ports - Interface definitions (contracts)

use crate::domain::errors::RemuxError;
use crate::domain::model::*;

/// Mutable view of one demultiplexed access unit
pub trait MediaPacket {
    /// Index of the stream the packet belongs to
    fn stream_index(&self) -> usize;
    fn set_stream_index(&mut self, index: usize);

    /// Convert pts, dts and duration from `from` ticks to `to` ticks,
    /// rounding to nearest and leaving absent timestamps absent
    fn rescale_ts(&mut self, from: Timebase, to: Timebase);

    /// Forget the byte offset recorded by the demuxer
    fn clear_position(&mut self);

    /// Payload size in bytes
    fn size(&self) -> usize;
}

/// Port for an open segmented source
pub trait DemuxSource {
    /// Opaque codec parameters, copied verbatim into the destination
    type Parameters: Clone;
    type Packet: MediaPacket;

    /// Run the demuxer's stream discovery pass
    fn discover_streams(&mut self) -> Result<(), RemuxError>;

    /// Current stream descriptors in source order
    fn streams(&self) -> Vec<SourceStream>;

    /// Codec parameters of one source stream
    fn parameters(&self, index: usize) -> Option<Self::Parameters>;

    /// Next packet in source order; `Ok(None)` at end of source
    fn read_packet(&mut self) -> Result<Option<Self::Packet>, RemuxError>;
}

/// Port for the single-file destination container.
///
/// Dropping the sink closes its byte sink.
pub trait MuxSink {
    type Parameters;
    type Packet: MediaPacket;

    /// Append a stream with copied codec parameters (codec tag cleared) and
    /// return its destination index
    fn add_stream(
        &mut self,
        parameters: &Self::Parameters,
        time_base: Timebase,
    ) -> Result<usize, RemuxError>;

    fn stream_count(&self) -> usize;

    /// Time base of a destination stream; may change when the header is written
    fn stream_time_base(&self, index: usize) -> Option<Timebase>;

    fn write_header(&mut self) -> Result<(), RemuxError>;

    /// Hand a packet to the muxer's interleaving queue
    fn write_interleaved(&mut self, packet: Self::Packet) -> Result<(), RemuxError>;

    /// Flush the interleaving queue and write trailer/index structures
    fn write_trailer(&mut self) -> Result<(), RemuxError>;

    /// Close the byte sink and report the failure dropping would swallow.
    /// Closing twice is a no-op.
    fn close(&mut self) -> Result<(), RemuxError>;
}

/// Port bundling the demuxing and muxing collaborators
pub trait MediaBackend {
    type Parameters: Clone;
    type Packet: MediaPacket;
    type Source: DemuxSource<Parameters = Self::Parameters, Packet = Self::Packet>;
    type Sink: MuxSink<Parameters = Self::Parameters, Packet = Self::Packet>;

    /// Open the source without running stream discovery
    fn open_source(&self, locator: &str, config: &InputConfig) -> Result<Self::Source, RemuxError>;

    /// Create (or truncate) the destination
    fn create_sink(&self, path: &str, config: &OutputConfig) -> Result<Self::Sink, RemuxError>;

    /// Process-wide network protocol setup, paired with [`MediaBackend::network_deinit`]
    fn network_init(&self) {}

    fn network_deinit(&self) {}
}

/// Port for progress reporting
pub trait ProgressPort: Send + Sync {
    fn on_event(&self, event: &RemuxEvent);
}
