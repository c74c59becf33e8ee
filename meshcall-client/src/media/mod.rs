mod local_media;
mod track;

pub use local_media::*;
pub use track::*;
