pub mod fields;
pub mod payload;

pub use fields::{slugify, DefaultValue, FieldKind, FieldSpec};
pub use payload::Payload;
