//! Type system for the target IR.

use crate::arena::Handle;

/// OpenCL SPIR address space numbering.
///
/// The numeric values are part of the output contract and must not change.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct AddressSpace(pub u32);

impl AddressSpace {
    /// Function-local / private memory.
    pub const PRIVATE: Self = Self(0);
    /// Global (cross-workgroup) memory.
    pub const GLOBAL: Self = Self(1);
    /// Constant memory.
    pub const CONSTANT: Self = Self(2);
    /// Local (workgroup) memory.
    pub const LOCAL: Self = Self(3);
    /// The generic address space.
    pub const GENERIC: Self = Self(4);
}

/// A named type.
///
/// `name` is only meaningful for struct types; every other variant keeps
/// it `None` so that structural deduplication applies.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct Type {
    pub name: Option<String>,
    pub inner: TypeInner,
}

/// The concrete shape of a type.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub enum TypeInner {
    /// The void type.
    Void,
    /// An integer of the given bit width. `i1` doubles as bool.
    Int { bits: u32 },
    /// An IEEE float: 16, 32 or 64 bits.
    Float { bits: u32 },
    /// A pointer into a specific address space.
    Pointer {
        pointee: Handle<Type>,
        space: AddressSpace,
    },
    /// A fixed-width SIMD vector.
    Vector { elem: Handle<Type>, count: u32 },
    /// A fixed-length array.
    Array { elem: Handle<Type>, len: u64 },
    /// A struct with a body. Named via [`Type::name`].
    Struct {
        members: Vec<Handle<Type>>,
        packed: bool,
    },
    /// A named struct without a body.
    OpaqueStruct,
    /// A function signature.
    Function {
        ret: Handle<Type>,
        params: Vec<Handle<Type>>,
        varargs: bool,
    },
}

impl TypeInner {
    /// Returns `true` for `Struct` and `OpaqueStruct`.
    pub fn is_struct(&self) -> bool {
        matches!(self, Self::Struct { .. } | Self::OpaqueStruct)
    }

    /// Returns `true` for pointer types.
    pub fn is_pointer(&self) -> bool {
        matches!(self, Self::Pointer { .. })
    }

    /// Scalar bit width of an int/float, or of a vector's element.
    pub fn scalar_bits(&self, types: &crate::arena::UniqueArena<Type>) -> Option<u32> {
        match *self {
            Self::Int { bits } | Self::Float { bits } => Some(bits),
            Self::Vector { elem, .. } => types[elem].inner.scalar_bits(types),
            _ => None,
        }
    }
}
