//! Binary protocol re-exports from velio-binary crate.

pub use velio_binary::{
    flags, BinaryDataType, BinaryEncoder, BinaryResult, ColumnLayout, SchemaLayout,
    SchemaLayoutCache, HEADER_SIZE,
};
