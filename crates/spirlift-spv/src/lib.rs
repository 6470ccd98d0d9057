//! SPIR-V input graph for the translator.
//!
//! Parses a SPIR-V binary with [rspirv](https://crates.io/crates/rspirv)
//! and builds an id-addressed graph of types, values, functions and basic
//! blocks — the immutable input the translation engine walks.

mod decode;
mod module;

pub use decode::{decode_bytes, decode_module, decode_words};
pub use module::{
    Block, Decorations, ExecutionMode, ExtInstSet, Function, Id, ImageDescriptor, Inst,
    MemoryAccess, Module, Type, Value, ValueKind,
};

/// Re-export of the `spirv` enum crate used throughout the graph.
pub use rspirv::spirv;

/// Errors produced while decoding a SPIR-V binary into the input graph.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The binary could not be parsed at all.
    #[error("invalid SPIR-V binary: {0}")]
    Parse(String),
    /// The module uses a construct the decoder does not understand.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// The module is structurally broken.
    #[error("malformed module: {0}")]
    Malformed(String),
}
