// Domain models - Streams, packets, mapping tables and run configuration

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::errors::RemuxError;

/// Timebase for timestamp calculations - duration of one tick as a rational number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timebase {
    pub num: i32,
    pub den: i32,
}

impl Timebase {
    /// Create a new timebase
    pub fn new(num: i32, den: i32) -> Result<Self, RemuxError> {
        if den == 0 {
            return Err(RemuxError::BadArgs(
                "Timebase denominator cannot be zero".to_string(),
            ));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating point seconds
    pub fn to_seconds(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Convert a tick count to seconds
    pub fn ticks_to_seconds(&self, ticks: i64) -> f64 {
        ticks as f64 * self.to_seconds()
    }

    /// MPEG-TS clock used by HLS segments
    pub fn mpegts() -> Self {
        Self { num: 1, den: 90_000 }
    }
}

impl fmt::Display for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Media kind of an elementary stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    /// Subtitles, data, attachments and anything unknown
    Other,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Other => write!(f, "other"),
        }
    }
}

/// One elementary stream discovered in the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStream {
    pub index: usize,
    pub kind: MediaKind,
    pub codec: String,
    pub time_base: Timebase,
    /// Zero until the demuxer has seen enough of the stream
    pub width: u32,
    pub height: u32,
}

impl SourceStream {
    pub fn new(index: usize, kind: MediaKind, codec: impl Into<String>, time_base: Timebase) -> Self {
        Self {
            index,
            kind,
            codec: codec.into(),
            time_base,
            width: 0,
            height: 0,
        }
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Whether the stream can be carried into the output at all
    pub fn is_av(&self) -> bool {
        matches!(self.kind, MediaKind::Video | MediaKind::Audio)
    }

    /// True for non-video streams and for video streams with known frame size
    pub fn has_dimensions(&self) -> bool {
        self.kind != MediaKind::Video || (self.width > 0 && self.height > 0)
    }
}

/// Rule selecting which source streams reach the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingPolicy {
    AudioAndVideo,
    VideoOnly,
}

impl MappingPolicy {
    /// Policies tried in order, each more conservative than the last
    pub const FALLBACK_ORDER: [MappingPolicy; 2] =
        [MappingPolicy::AudioAndVideo, MappingPolicy::VideoOnly];

    /// Whether a stream of `kind` is carried under this policy
    pub fn includes(&self, kind: MediaKind) -> bool {
        match (self, kind) {
            (_, MediaKind::Other) => false,
            (MappingPolicy::VideoOnly, MediaKind::Audio) => false,
            _ => true,
        }
    }
}

impl fmt::Display for MappingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MappingPolicy::AudioAndVideo => write!(f, "audio+video"),
            MappingPolicy::VideoOnly => write!(f, "video-only"),
        }
    }
}

/// Source stream index to destination stream index, `None` for excluded streams
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamMappingTable {
    entries: Vec<Option<usize>>,
    output_streams: usize,
}

impl StreamMappingTable {
    /// Build the table for `streams` under `policy`.
    ///
    /// Destination indices are assigned densely from 0 in source order.
    pub fn build(streams: &[SourceStream], policy: MappingPolicy) -> Self {
        let mut next = 0;
        let entries = streams
            .iter()
            .map(|stream| {
                if policy.includes(stream.kind) {
                    let assigned = next;
                    next += 1;
                    Some(assigned)
                } else {
                    None
                }
            })
            .collect();

        Self {
            entries,
            output_streams: next,
        }
    }

    /// Destination index for a source stream; `None` when excluded or out of range
    pub fn destination(&self, source_index: usize) -> Option<usize> {
        self.entries.get(source_index).copied().flatten()
    }

    /// Number of source streams covered
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Number of destination streams the table points at
    pub fn output_streams(&self) -> usize {
        self.output_streams
    }

    /// (source, destination) pairs for included streams in destination order
    pub fn included(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(source, dest)| dest.map(|dest| (source, dest)))
    }
}

/// In-memory access unit, used by the memory backend and in tests
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    pub stream_index: usize,
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    pub duration: i64,
    pub position: Option<i64>,
    pub data: Vec<u8>,
}

impl Packet {
    pub fn new(stream_index: usize, pts: i64, duration: i64, data: Vec<u8>) -> Self {
        Self {
            stream_index,
            pts: Some(pts),
            dts: Some(pts),
            duration,
            position: None,
            data,
        }
    }

    pub fn with_dts(mut self, dts: Option<i64>) -> Self {
        self.dts = dts;
        self
    }

    pub fn at_position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }
}

/// Demuxer options applied when opening the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Demuxer short name forced on open; `None` lets the demuxer detect the format.
    /// Stored as `"auto"` in config files.
    #[serde(with = "input_format")]
    pub format: Option<String>,
    pub protocol_whitelist: String,
    pub allowed_extensions: String,
    /// Analysis window in microseconds
    pub analyze_duration_us: u64,
    /// Probe budget in bytes
    pub probe_size: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            format: Some("hls".to_string()),
            protocol_whitelist: "file,crypto,data".to_string(),
            allowed_extensions: "ALL".to_string(),
            analyze_duration_us: 40_000_000,
            probe_size: 100_000_000,
        }
    }
}

/// `None` <-> `"auto"` (or empty) so probing survives a config round trip
mod input_format {
    use serde::{Deserialize, Deserializer, Serializer};

    pub const AUTO: &str = "auto";

    pub fn serialize<S: Serializer>(format: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(format.as_deref().unwrap_or(AUTO))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        let format = String::deserialize(deserializer)?;
        let trimmed = format.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(AUTO) {
            Ok(None)
        } else {
            Ok(Some(trimmed.to_string()))
        }
    }
}

impl InputConfig {
    /// Key/value demuxer options in the order they are applied
    pub fn options(&self) -> Vec<(&'static str, String)> {
        vec![
            ("protocol_whitelist", self.protocol_whitelist.clone()),
            ("allowed_extensions", self.allowed_extensions.clone()),
            ("analyzeduration", self.analyze_duration_us.to_string()),
            ("probesize", self.probe_size.to_string()),
        ]
    }
}

/// Muxer options for the destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Muxer short name
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "mp4".to_string(),
        }
    }
}

/// Complete run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemuxConfig {
    /// Extra packets read while waiting for video frame dimensions
    pub dimension_probe_packets: usize,
    /// Fail at open time instead of at header time when dimensions stay unknown
    pub strict_dimensions: bool,
    /// Packets between progress events; 0 disables them
    pub progress_interval: u64,
    pub input: InputConfig,
    pub output: OutputConfig,
}

impl Default for RemuxConfig {
    fn default() -> Self {
        Self {
            dimension_probe_packets: 200,
            strict_dimensions: false,
            progress_interval: 500,
            input: InputConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Outcome of the dimension probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeStatus {
    /// Every video stream has frame dimensions
    Ready { packets_read: usize },
    /// Budget exhausted or source ended with dimensions still unknown
    DimensionsMissing { packets_read: usize },
}

impl ProbeStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ProbeStatus::Ready { .. })
    }

    pub fn packets_read(&self) -> usize {
        match self {
            ProbeStatus::Ready { packets_read } | ProbeStatus::DimensionsMissing { packets_read } => {
                *packets_read
            }
        }
    }
}

/// Packet relay state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RelayState {
    Initializing,
    Reading,
    Writing,
    Finalizing,
    Done,
    Failed,
}

/// Counters collected by one relay run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    pub packets_written: u64,
    pub packets_skipped: u64,
    pub bytes_written: u64,
}

/// Result of a successful remux
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemuxReport {
    pub source: String,
    pub output: String,
    pub policy: MappingPolicy,
    /// 1-based attempt that succeeded
    pub attempts: usize,
    pub streams_written: usize,
    pub probe: ProbeStatus,
    pub stats: RelayStats,
}

/// Events published while a remux runs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RemuxEvent {
    Started {
        attempt: usize,
        policy: MappingPolicy,
        output: String,
    },
    Running {
        packets: u64,
        bytes: u64,
    },
    Done {
        output: String,
        policy: MappingPolicy,
        bytes: u64,
    },
    Failed {
        attempt: usize,
        policy: MappingPolicy,
        stage: String,
        code: i32,
    },
}
