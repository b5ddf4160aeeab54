mod builder;
mod decode;
mod error;
mod path;
mod wire;

pub use builder::StreamBuilder;
pub use decode::{
    AttrMap, AttrValue, CancelToken, Command, DecodeOptions, StreamDecoder, decode_all,
};
pub use error::StreamError;
pub use path::StreamPath;
pub use wire::{AttrTag, CommandKind, SUPPORTED_VERSIONS};
