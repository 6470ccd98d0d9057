//! Module-scope global variables.

use crate::arena::Handle;
use crate::attrs::Linkage;
use crate::consts::Constant;
use crate::types::{AddressSpace, Type};

/// A module-scope variable.
#[derive(Clone, Debug)]
pub struct GlobalVariable {
    pub name: String,
    /// The value type (not the pointer type).
    pub ty: Handle<Type>,
    pub space: AddressSpace,
    pub linkage: Linkage,
    pub is_constant: bool,
    pub init: Option<Handle<Constant>>,
    pub align: Option<u32>,
    /// Set for constant i8-array globals (string literals); the address
    /// of such a global is not significant.
    pub unnamed_addr: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::UniqueArena;
    use crate::types::TypeInner;

    #[test]
    fn global_defaults() {
        let mut types = UniqueArena::new();
        let i8_ty = types.insert(Type {
            name: None,
            inner: TypeInner::Int { bits: 8 },
        });
        let gv = GlobalVariable {
            name: "data".into(),
            ty: i8_ty,
            space: AddressSpace::CONSTANT,
            linkage: Linkage::Internal,
            is_constant: true,
            init: None,
            align: Some(1),
            unnamed_addr: false,
        };
        assert_eq!(gv.space, AddressSpace::CONSTANT);
        assert!(gv.is_constant);
    }
}
