// libav sink - Muxer context writing the single-file destination

use ffmpeg_next::format::context::Output;
use ffmpeg_next::{codec, encoder, ffi, format};
use tracing::debug;

use super::error_code;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

pub struct LibavSink {
    context: Output,
    path: String,
}

impl LibavSink {
    /// Allocate the muxer and open (or truncate) the byte sink at `path`
    pub fn create(path: &str, config: &OutputConfig) -> Result<Self, RemuxError> {
        let context = format::output_as(&path, &config.format)
            .map_err(|e| RemuxError::io(format!("{}: {}", path, e), error_code(e)))?;

        debug!(path, format = %config.format, "Destination created");
        Ok(Self {
            context,
            path: path.to_string(),
        })
    }
}

impl MuxSink for LibavSink {
    type Parameters = codec::Parameters;
    type Packet = ffmpeg_next::Packet;

    fn add_stream(
        &mut self,
        parameters: &codec::Parameters,
        time_base: Timebase,
    ) -> Result<usize, RemuxError> {
        let mut stream = self
            .context
            .add_stream(encoder::find(codec::Id::None))
            .map_err(|e| RemuxError::stream_creation(e.to_string(), error_code(e)))?;

        stream.set_parameters(parameters.clone());
        // Source container tags are usually invalid in MP4; let the muxer pick
        unsafe {
            (*(*stream.as_mut_ptr()).codecpar).codec_tag = 0;
        }
        stream.set_time_base(time_base);

        Ok(stream.index())
    }

    fn stream_count(&self) -> usize {
        self.context.nb_streams() as usize
    }

    fn stream_time_base(&self, index: usize) -> Option<Timebase> {
        self.context
            .stream(index)
            .map(|stream| Timebase::from(stream.time_base()))
    }

    fn write_header(&mut self) -> Result<(), RemuxError> {
        self.context
            .write_header()
            .map_err(|e| RemuxError::write_header(format!("{}: {}", self.path, e), error_code(e)))
    }

    fn write_interleaved(&mut self, packet: ffmpeg_next::Packet) -> Result<(), RemuxError> {
        packet
            .write_interleaved(&mut self.context)
            .map_err(|e| RemuxError::write_frame(e.to_string(), error_code(e)))
    }

    fn write_trailer(&mut self) -> Result<(), RemuxError> {
        self.context
            .write_trailer()
            .map_err(|e| RemuxError::write_frame(format!("trailer for {}: {}", self.path, e), error_code(e)))
    }

    fn close(&mut self) -> Result<(), RemuxError> {
        // The context destructor skips a null pb, so closing here is final
        let ret = unsafe {
            let raw = self.context.as_mut_ptr();
            if (*raw).pb.is_null() {
                return Ok(());
            }
            ffi::avio_closep(&mut (*raw).pb)
        };
        if ret < 0 {
            let error = ffmpeg_next::Error::from(ret);
            return Err(RemuxError::io(format!("closing {}: {}", self.path, error), ret));
        }
        debug!(path = %self.path, "Destination closed");
        Ok(())
    }
}

impl Drop for LibavSink {
    fn drop(&mut self) {
        debug!(path = %self.path, "Releasing destination");
    }
}
