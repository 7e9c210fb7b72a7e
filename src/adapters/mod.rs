// Adapters - External system implementations

pub mod libav;
pub mod memory;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use libav::{init_libav, LibavBackend};
pub use memory::{JournalEvent, MemoryBackend, MemoryMedia, MemoryOutput, MemoryParameters, SinkFaults};
pub use toml_config::TomlConfigAdapter;
pub use tracing_log::{init_logging, LogLevel, TracingProgressAdapter};
