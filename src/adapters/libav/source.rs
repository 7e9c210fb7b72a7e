// libav source - Demuxer context opened with a forced input format

use std::ffi::CString;
use std::ptr;

use ffmpeg_next::format::context::Input;
use ffmpeg_next::media;
use ffmpeg_next::{codec, ffi, Dictionary, Stream};
use tracing::debug;

use super::error_code;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

pub struct LibavSource {
    context: Input,
    locator: String,
}

impl LibavSource {
    /// Open `locator` without running stream discovery
    pub fn open(locator: &str, config: &InputConfig) -> Result<Self, RemuxError> {
        let path = CString::new(locator).map_err(|_| {
            RemuxError::open(
                format!("locator contains a NUL byte: {:?}", locator),
                CODE_INVALID_ARGUMENT,
            )
        })?;

        // Keeps the format name alive until the open call returns
        let format_name = match &config.format {
            Some(name) => Some(CString::new(name.as_str()).map_err(|_| {
                RemuxError::open(format!("bad input format name {:?}", name), CODE_INVALID_ARGUMENT)
            })?),
            None => None,
        };
        let format = match &format_name {
            Some(name) => {
                let found = unsafe { ffi::av_find_input_format(name.as_ptr()) };
                if found.is_null() {
                    return Err(RemuxError::open(
                        format!("unknown input format {:?}", name),
                        CODE_INVALID_ARGUMENT,
                    ));
                }
                found
            }
            None => ptr::null(),
        };

        let mut options = Dictionary::new();
        for (key, value) in config.options() {
            options.set(key, &value);
        }

        unsafe {
            let mut raw = ptr::null_mut();
            let mut raw_options = options.disown();
            let ret = ffi::avformat_open_input(&mut raw, path.as_ptr(), format, &mut raw_options);

            // Whatever the demuxer did not consume is freed here
            let leftover = Dictionary::own(raw_options);
            for (key, _) in leftover.iter() {
                debug!(option = key, "Demuxer ignored option");
            }

            if ret < 0 {
                let error = ffmpeg_next::Error::from(ret);
                return Err(RemuxError::open(format!("{}: {}", locator, error), ret));
            }

            Ok(Self {
                context: Input::wrap(raw),
                locator: locator.to_string(),
            })
        }
    }

    fn describe(stream: &Stream<'_>) -> SourceStream {
        let parameters = stream.parameters();
        let kind = match parameters.medium() {
            media::Type::Video => MediaKind::Video,
            media::Type::Audio => MediaKind::Audio,
            _ => MediaKind::Other,
        };
        let (width, height) = unsafe {
            let raw = parameters.as_ptr();
            ((*raw).width.max(0) as u32, (*raw).height.max(0) as u32)
        };

        SourceStream::new(
            stream.index(),
            kind,
            parameters.id().name(),
            Timebase::from(stream.time_base()),
        )
        .with_dimensions(width, height)
    }
}

impl DemuxSource for LibavSource {
    type Parameters = codec::Parameters;
    type Packet = ffmpeg_next::Packet;

    fn discover_streams(&mut self) -> Result<(), RemuxError> {
        let ret = unsafe { ffi::avformat_find_stream_info(self.context.as_mut_ptr(), ptr::null_mut()) };
        if ret < 0 {
            let error = ffmpeg_next::Error::from(ret);
            return Err(RemuxError::metadata(format!("{}: {}", self.locator, error), ret));
        }
        Ok(())
    }

    fn streams(&self) -> Vec<SourceStream> {
        self.context.streams().map(|stream| Self::describe(&stream)).collect()
    }

    fn parameters(&self, index: usize) -> Option<codec::Parameters> {
        self.context.stream(index).map(|stream| stream.parameters())
    }

    fn read_packet(&mut self) -> Result<Option<ffmpeg_next::Packet>, RemuxError> {
        let mut packet = ffmpeg_next::Packet::empty();
        match packet.read(&mut self.context) {
            Ok(()) => Ok(Some(packet)),
            Err(ffmpeg_next::Error::Eof) => Ok(None),
            Err(e) => Err(RemuxError::read(e.to_string(), error_code(e))),
        }
    }
}

impl Drop for LibavSource {
    fn drop(&mut self) {
        debug!(locator = %self.locator, "Closing source");
    }
}
