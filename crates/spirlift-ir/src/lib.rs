//! Typed target IR for the OpenCL SPIR profile.
//!
//! An arena-based IR owning types, constants, global variables, functions
//! and named metadata, shaped after LLVM's module structure but kept to
//! the subset a SPIR-V translator emits. Handles are stable across the
//! rewrite passes (placeholder resolution, builtin-variable demotion,
//! post-processing) that detach instructions and globals in place.

pub mod arena;
mod attrs;
mod consts;
mod display;
mod func;
mod global;
pub mod layout;
mod metadata;
mod types;

pub use arena::{Arena, Handle, UniqueArena};
pub use attrs::{CallConv, FnAttrs, Linkage, ParamAttrs};
pub use consts::Constant;
pub use display::dump_module;
pub use func::{
    BasicBlock, BinOp, CastOp, FloatPredicate, Function, InstKind, Instruction, IntPredicate,
    Parameter, Value,
};
pub use global::GlobalVariable;
pub use metadata::{Metadata, NamedMetadata};
pub use types::{AddressSpace, Type, TypeInner};

/// An IR module: the unit of translation.
#[derive(Clone, Debug, Default)]
pub struct Module {
    /// Deduplicated type arena.
    pub types: UniqueArena<Type>,
    /// Module constants.
    pub constants: Arena<Constant>,
    /// Module-scope variables.
    pub globals: Arena<GlobalVariable>,
    /// Definitions and declarations.
    pub functions: Arena<Function>,
    /// Named metadata, in emission order.
    pub named_metadata: Vec<NamedMetadata>,
    /// Target triple, if set.
    pub target_triple: Option<String>,
    /// Data layout string, if set.
    pub data_layout: Option<String>,
}

impl Module {
    /// Creates an empty module.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns an anonymous type.
    pub fn type_(&mut self, inner: TypeInner) -> Handle<Type> {
        self.types.insert(Type { name: None, inner })
    }

    /// The void type.
    pub fn void_type(&mut self) -> Handle<Type> {
        self.type_(TypeInner::Void)
    }

    /// An integer type of the given width.
    pub fn int_type(&mut self, bits: u32) -> Handle<Type> {
        self.type_(TypeInner::Int { bits })
    }

    /// A float type of the given width.
    pub fn float_type(&mut self, bits: u32) -> Handle<Type> {
        self.type_(TypeInner::Float { bits })
    }

    /// A pointer type.
    pub fn pointer_type(&mut self, pointee: Handle<Type>, space: AddressSpace) -> Handle<Type> {
        self.type_(TypeInner::Pointer { pointee, space })
    }

    /// A vector type.
    pub fn vector_type(&mut self, elem: Handle<Type>, count: u32) -> Handle<Type> {
        self.type_(TypeInner::Vector { elem, count })
    }

    /// An array type.
    pub fn array_type(&mut self, elem: Handle<Type>, len: u64) -> Handle<Type> {
        self.type_(TypeInner::Array { elem, len })
    }

    /// A function type.
    pub fn function_type(
        &mut self,
        ret: Handle<Type>,
        params: Vec<Handle<Type>>,
        varargs: bool,
    ) -> Handle<Type> {
        self.type_(TypeInner::Function {
            ret,
            params,
            varargs,
        })
    }

    /// Gets or creates the named opaque struct type.
    pub fn opaque_struct_type(&mut self, name: &str) -> Handle<Type> {
        self.types.insert(Type {
            name: Some(name.to_owned()),
            inner: TypeInner::OpaqueStruct,
        })
    }

    /// Gets or creates a pointer to the named opaque struct type.
    pub fn opaque_ptr_type(&mut self, name: &str, space: AddressSpace) -> Handle<Type> {
        let pointee = self.opaque_struct_type(name);
        self.pointer_type(pointee, space)
    }

    /// Adds an integer constant.
    pub fn const_int(&mut self, ty: Handle<Type>, value: u64, signed: bool) -> Handle<Constant> {
        self.constants.append(Constant::Int { ty, value, signed })
    }

    /// Adds an `i32` constant.
    pub fn const_i32(&mut self, value: u32) -> Handle<Constant> {
        let ty = self.int_type(32);
        self.const_int(ty, u64::from(value), true)
    }

    /// Adds an `i1` constant.
    pub fn const_bool(&mut self, value: bool) -> Handle<Constant> {
        let ty = self.int_type(1);
        self.const_int(ty, u64::from(value), false)
    }

    /// Adds an undef constant of the given type.
    pub fn const_undef(&mut self, ty: Handle<Type>) -> Handle<Constant> {
        self.constants.append(Constant::Undef { ty })
    }

    /// Looks up a live function by name.
    pub fn function_by_name(&self, name: &str) -> Option<Handle<Function>> {
        self.functions
            .iter()
            .find(|(_, f)| f.name == name)
            .map(|(h, _)| h)
    }

    /// Gets or inserts a named metadata entry and returns its operand list.
    pub fn named_md_mut(&mut self, name: &str) -> &mut Vec<Metadata> {
        if let Some(pos) = self.named_metadata.iter().position(|m| m.name == name) {
            return &mut self.named_metadata[pos].operands;
        }
        self.named_metadata.push(NamedMetadata {
            name: name.to_owned(),
            operands: Vec::new(),
        });
        &mut self.named_metadata.last_mut().unwrap().operands
    }

    /// Looks up a named metadata entry.
    pub fn named_md(&self, name: &str) -> Option<&NamedMetadata> {
        self.named_metadata.iter().find(|m| m.name == name)
    }

    /// The return type of a function-typed handle.
    pub fn return_type_of(&self, fn_ty: Handle<Type>) -> Handle<Type> {
        match self.types[fn_ty].inner {
            TypeInner::Function { ret, .. } => ret,
            _ => panic!("return_type_of on a non-function type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opaque_ptr_type_is_uniqued() {
        let mut m = Module::new();
        let a = m.opaque_ptr_type("opencl.sampler_t", AddressSpace::GLOBAL);
        let b = m.opaque_ptr_type("opencl.sampler_t", AddressSpace::GLOBAL);
        assert_eq!(a, b);
        let c = m.opaque_ptr_type("opencl.sampler_t", AddressSpace::PRIVATE);
        assert_ne!(a, c);
    }

    #[test]
    fn named_md_get_or_insert() {
        let mut m = Module::new();
        m.named_md_mut("opencl.kernels").push(Metadata::Int(1));
        m.named_md_mut("opencl.kernels").push(Metadata::Int(2));
        assert_eq!(m.named_md("opencl.kernels").unwrap().operands.len(), 2);
        assert_eq!(m.named_metadata.len(), 1);
    }

    #[test]
    fn function_lookup_skips_detached() {
        let mut m = Module::new();
        let void = m.void_type();
        let fty = m.function_type(void, vec![], false);
        let h = m.functions.append(Function::new("gone", fty));
        assert!(m.function_by_name("gone").is_some());
        m.functions.remove(h);
        assert!(m.function_by_name("gone").is_none());
    }
}
