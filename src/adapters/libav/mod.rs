//! libav backend built on `ffmpeg-next`
//!
//! Opens HLS playlists through the `hls` demuxer with an explicit protocol
//! whitelist and writes the destination through the interleaving muxer.
//! Codec parameters and packets are `ffmpeg-next` types passed through the
//! pipeline untouched apart from timing fields.

mod sink;
mod source;

use std::sync::OnceLock;

use ffmpeg_next::codec;
use ffmpeg_next::util::log::Level;
use ffmpeg_next::Rational;
use tracing::debug;

use crate::domain::errors::RemuxError;
use crate::domain::model::*;
use crate::error::{HlsRemuxError, HlsRemuxResult};
use crate::ports::*;

pub use sink::LibavSink;
pub use source::LibavSource;

static LIBAV_INIT: OnceLock<Result<(), ffmpeg_next::Error>> = OnceLock::new();

/// Register libav components and quiet its logger, once per process
pub fn init_libav() -> HlsRemuxResult<()> {
    let outcome = LIBAV_INIT.get_or_init(|| {
        ffmpeg_next::init()?;
        ffmpeg_next::util::log::set_level(Level::Error);
        debug!("libav initialized");
        Ok(())
    });

    outcome.clone().map_err(|e| HlsRemuxError::FFmpegInitError {
        message: e.to_string(),
    })
}

/// Integer code carried by an `ffmpeg-next` error
pub(crate) fn error_code(error: ffmpeg_next::Error) -> i32 {
    i32::from(error)
}

impl From<Rational> for Timebase {
    fn from(rational: Rational) -> Self {
        Timebase {
            num: rational.numerator(),
            den: rational.denominator(),
        }
    }
}

impl From<Timebase> for Rational {
    fn from(time_base: Timebase) -> Self {
        Rational::new(time_base.num, time_base.den)
    }
}

/// Production [`MediaBackend`]
#[derive(Debug, Clone, Copy)]
pub struct LibavBackend {
    _initialized: (),
}

impl LibavBackend {
    pub fn new() -> HlsRemuxResult<Self> {
        init_libav()?;
        Ok(Self { _initialized: () })
    }
}

impl MediaBackend for LibavBackend {
    type Parameters = codec::Parameters;
    type Packet = ffmpeg_next::Packet;
    type Source = LibavSource;
    type Sink = LibavSink;

    fn open_source(&self, locator: &str, config: &InputConfig) -> Result<LibavSource, RemuxError> {
        LibavSource::open(locator, config)
    }

    fn create_sink(&self, path: &str, config: &OutputConfig) -> Result<LibavSink, RemuxError> {
        LibavSink::create(path, config)
    }

    fn network_init(&self) {
        ffmpeg_next::format::network::init();
    }

    fn network_deinit(&self) {
        ffmpeg_next::format::network::deinit();
    }
}

impl MediaPacket for ffmpeg_next::Packet {
    fn stream_index(&self) -> usize {
        ffmpeg_next::Packet::stream(self)
    }

    fn set_stream_index(&mut self, index: usize) {
        ffmpeg_next::Packet::set_stream(self, index);
    }

    fn rescale_ts(&mut self, from: Timebase, to: Timebase) {
        ffmpeg_next::Packet::rescale_ts(self, Rational::from(from), Rational::from(to));
    }

    fn clear_position(&mut self) {
        self.set_position(-1);
    }

    fn size(&self) -> usize {
        ffmpeg_next::Packet::size(self)
    }
}
