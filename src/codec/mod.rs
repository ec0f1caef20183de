//! Parameter conversion and payload codecs

pub mod convert;
pub mod json;

pub use convert::{convert, convert_repeated};
pub use json::{JsonCodec, JsonUnitStream};
