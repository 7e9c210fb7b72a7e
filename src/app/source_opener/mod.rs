// Source opener - Opens the segmented source and settles video stream metadata

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::DimensionRules;
use crate::ports::*;

/// Open source plus the outcome of the dimension probe.
///
/// Packets consumed while probing are replayed ahead of the rest of the
/// source so the relay still sees every packet in source order.
pub struct OpenedSource<S: DemuxSource> {
    source: S,
    replay: VecDeque<S::Packet>,
    probe: ProbeStatus,
}

impl<S: DemuxSource> OpenedSource<S> {
    pub fn probe_status(&self) -> ProbeStatus {
        self.probe
    }
}

impl<S: DemuxSource> DemuxSource for OpenedSource<S> {
    type Parameters = S::Parameters;
    type Packet = S::Packet;

    fn discover_streams(&mut self) -> Result<(), RemuxError> {
        self.source.discover_streams()
    }

    fn streams(&self) -> Vec<SourceStream> {
        self.source.streams()
    }

    fn parameters(&self, index: usize) -> Option<Self::Parameters> {
        self.source.parameters(index)
    }

    fn read_packet(&mut self) -> Result<Option<Self::Packet>, RemuxError> {
        if let Some(packet) = self.replay.pop_front() {
            return Ok(Some(packet));
        }
        self.source.read_packet()
    }
}

/// Opens sources with the configured demuxer options and probing budget
pub struct SourceOpener<'a, B: MediaBackend> {
    backend: &'a B,
    config: &'a RemuxConfig,
}

impl<'a, B: MediaBackend> SourceOpener<'a, B> {
    pub fn new(backend: &'a B, config: &'a RemuxConfig) -> Self {
        Self { backend, config }
    }

    /// Open `locator`, run stream discovery and wait for video dimensions.
    ///
    /// Unknown dimensions after the probe budget are reported through
    /// [`ProbeStatus::DimensionsMissing`] and left for the header write to
    /// reject, unless `strict_dimensions` is set.
    pub fn open(&self, locator: &str) -> Result<OpenedSource<B::Source>, RemuxError> {
        debug!(
            locator,
            format = ?self.config.input.format,
            analyze_duration_us = self.config.input.analyze_duration_us,
            probe_size = self.config.input.probe_size,
            "Opening source"
        );

        let mut source = self.backend.open_source(locator, &self.config.input)?;
        source.discover_streams()?;

        let streams = source.streams();
        info!("Source opened: {} streams", streams.len());
        for stream in &streams {
            debug!(
                index = stream.index,
                kind = %stream.kind,
                codec = %stream.codec,
                time_base = %stream.time_base,
                width = stream.width,
                height = stream.height,
                "Discovered stream"
            );
        }

        let mut replay = VecDeque::new();
        let probe = self.probe_dimensions(&mut source, &mut replay);

        if let ProbeStatus::DimensionsMissing { packets_read } = probe {
            let missing = DimensionRules::unsized_video(&source.streams());
            if self.config.strict_dimensions {
                return Err(RemuxError::metadata(
                    format!(
                        "video frame dimensions unknown for streams {:?} after {} packets",
                        missing, packets_read
                    ),
                    CODE_INVALID_ARGUMENT,
                ));
            }
            warn!(
                streams = ?missing,
                packets_read,
                "Video frame dimensions still unknown, continuing"
            );
        }

        Ok(OpenedSource {
            source,
            replay,
            probe,
        })
    }

    fn probe_dimensions(
        &self,
        source: &mut B::Source,
        replay: &mut VecDeque<B::Packet>,
    ) -> ProbeStatus {
        if DimensionRules::all_video_sized(&source.streams()) {
            return ProbeStatus::Ready { packets_read: 0 };
        }

        let budget = self.config.dimension_probe_packets;
        debug!(budget, "Reading packets to settle video dimensions");

        while replay.len() < budget {
            match source.read_packet() {
                Ok(Some(packet)) => replay.push_back(packet),
                Ok(None) => break,
                Err(e) => {
                    warn!("Dimension probe stopped early: {}", e);
                    break;
                }
            }

            if DimensionRules::all_video_sized(&source.streams()) {
                debug!(packets_read = replay.len(), "Video dimensions available");
                return ProbeStatus::Ready {
                    packets_read: replay.len(),
                };
            }
        }

        ProbeStatus::DimensionsMissing {
            packets_read: replay.len(),
        }
    }
}
