//! Named module metadata.

use crate::func::Value;

/// A metadata operand.
#[derive(Clone, Debug)]
pub enum Metadata {
    /// A metadata string.
    String(String),
    /// An i32 constant operand.
    Int(u32),
    /// A value reference (function, or a constant such as undef).
    Value(Value),
    /// A nested metadata node.
    Node(Vec<Metadata>),
}

/// A named metadata entry (`!name = !{...}`).
#[derive(Clone, Debug)]
pub struct NamedMetadata {
    pub name: String,
    pub operands: Vec<Metadata>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_node() {
        let node = Metadata::Node(vec![
            Metadata::String("reqd_work_group_size".into()),
            Metadata::Int(1),
            Metadata::Int(2),
            Metadata::Int(3),
        ]);
        match node {
            Metadata::Node(ops) => assert_eq!(ops.len(), 4),
            _ => unreachable!(),
        }
    }
}
