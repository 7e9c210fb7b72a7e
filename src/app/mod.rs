// Application layer - Use case interactors and the pipeline stages they drive

pub mod container;
pub mod inspect_interactor;
pub mod packet_relay;
pub mod remux_interactor;
pub mod source_opener;
pub mod stream_mapper;

// Re-export interactors
pub use inspect_interactor::{InspectInteractor, InspectReport, PolicyPreview};
pub use remux_interactor::{RemuxInteractor, RemuxRequest};
