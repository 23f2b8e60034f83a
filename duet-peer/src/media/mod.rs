mod capture_device;
mod local_media_source;
mod media_stream;

pub use capture_device::*;
pub use local_media_source::*;
pub use media_stream::*;
