//! hls-remux library
//!
//! Lossless remuxing of a local HLS playlist (with its segments and keys)
//! into a single MP4 file. Audio and video are copied as they are; when the
//! destination refuses the combination, the run is retried with video only.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use app::{RemuxInteractor, RemuxRequest};
pub use domain::errors::RemuxError;
pub use domain::model::{MappingPolicy, RemuxConfig, RemuxReport};
pub use error::{HlsRemuxError, HlsRemuxResult};

use app::container::DefaultAppContainer;

/// Remux `source` into `destination` with the default configuration.
///
/// Blank arguments are rejected before libav is touched.
pub fn try_remux(source: &str, destination: &str) -> HlsRemuxResult<RemuxReport> {
    let request = RemuxRequest::new(source, destination);
    request.validate()?;

    let container = DefaultAppContainer::new(RemuxConfig::default())?;
    Ok(container.remux_interactor().remux(&request)?)
}

/// Integer form of [`try_remux`]: 0 on success, otherwise a negative error code
pub fn remux(source: &str, destination: &str) -> i32 {
    match try_remux(source, destination) {
        Ok(_) => 0,
        Err(e) => e.code(),
    }
}
