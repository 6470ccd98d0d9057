//! Linkage, calling conventions, and attribute sets.

/// Linkage of a global value.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Linkage {
    /// Externally visible.
    External,
    /// Visible only inside the module.
    Internal,
    /// Like internal, but the name is not significant.
    Private,
}

/// Calling convention of a function or call site.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum CallConv {
    /// Default C convention, used for intrinsics.
    C,
    /// OpenCL SPIR device function.
    SpirFunc,
    /// OpenCL SPIR kernel entry point.
    SpirKernel,
}

/// Bitflags for function attributes.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
pub struct FnAttrs(u32);

impl FnAttrs {
    /// No attributes.
    pub const EMPTY: Self = Self(0);
    /// The function never unwinds.
    pub const NOUNWIND: Self = Self(1);
    /// The function reads no memory.
    pub const READNONE: Self = Self(1 << 1);
    /// The function only reads memory.
    pub const READONLY: Self = Self(1 << 2);
    /// Always inline this function.
    pub const ALWAYSINLINE: Self = Self(1 << 3);
    /// Never inline this function.
    pub const NOINLINE: Self = Self(1 << 4);

    /// Returns `true` if `self` contains all flags in `other`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no flags are set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for FnAttrs {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for FnAttrs {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Bitflags for parameter and return-value attributes.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
pub struct ParamAttrs(u32);

impl ParamAttrs {
    /// No attributes.
    pub const EMPTY: Self = Self(0);
    /// Zero-extended by the caller.
    pub const ZEXT: Self = Self(1);
    /// Sign-extended by the caller.
    pub const SEXT: Self = Self(1 << 1);
    /// Passed by value.
    pub const BYVAL: Self = Self(1 << 2);
    /// Structure return pointer.
    pub const SRET: Self = Self(1 << 3);
    /// Does not alias other arguments.
    pub const NOALIAS: Self = Self(1 << 4);
    /// The callee does not capture the pointer.
    pub const NOCAPTURE: Self = Self(1 << 5);

    /// Returns `true` if `self` contains all flags in `other`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no flags are set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for ParamAttrs {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ParamAttrs {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fn_attr_flags() {
        let attrs = FnAttrs::NOUNWIND | FnAttrs::READNONE;
        assert!(attrs.contains(FnAttrs::NOUNWIND));
        assert!(attrs.contains(FnAttrs::READNONE));
        assert!(!attrs.contains(FnAttrs::NOINLINE));
        assert!(FnAttrs::EMPTY.is_empty());
    }

    #[test]
    fn fn_attr_bitor_assign() {
        let mut attrs = FnAttrs::NOUNWIND;
        attrs |= FnAttrs::READONLY;
        assert!(attrs.contains(FnAttrs::NOUNWIND));
        assert!(attrs.contains(FnAttrs::READONLY));
    }

    #[test]
    fn param_attr_flags() {
        let attrs = ParamAttrs::ZEXT | ParamAttrs::NOALIAS;
        assert!(attrs.contains(ParamAttrs::ZEXT));
        assert!(!attrs.contains(ParamAttrs::SEXT));
    }
}
