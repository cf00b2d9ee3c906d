pub mod draft;
pub mod settings;

pub use draft::Draft;
pub use settings::{EncryptionMode, TransportSettings};
