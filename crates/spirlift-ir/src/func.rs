//! Functions, basic blocks, and instructions.

use crate::arena::{Arena, Handle};
use crate::attrs::{CallConv, FnAttrs, Linkage, ParamAttrs};
use crate::consts::Constant;
use crate::global::GlobalVariable;
use crate::types::Type;

/// A reference to a value usable as an instruction operand.
///
/// `Arg` and `Inst` are local to the enclosing function; the other
/// variants reference module-level entities.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Value {
    /// A module constant.
    Const(Handle<Constant>),
    /// The address of a global variable.
    Global(Handle<GlobalVariable>),
    /// A function (used as a callee or a function-pointer argument).
    Func(Handle<Function>),
    /// A parameter of the enclosing function, by index.
    Arg(u32),
    /// The result of an instruction in the enclosing function.
    Inst(Handle<Instruction>),
}

/// A formal parameter declaration.
#[derive(Clone, Debug)]
pub struct Parameter {
    pub name: Option<String>,
    pub ty: Handle<Type>,
    pub attrs: ParamAttrs,
}

/// A basic block: an ordered list of instruction handles.
#[derive(Clone, Debug, Default)]
pub struct BasicBlock {
    pub name: Option<String>,
    pub insts: Vec<Handle<Instruction>>,
}

/// Integer binary operators.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    UDiv,
    SDiv,
    URem,
    SRem,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
    Shl,
    LShr,
    AShr,
    And,
    Or,
    Xor,
}

/// Cast operators.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    FPTrunc,
    FPExt,
    FPToUI,
    FPToSI,
    UIToFP,
    SIToFP,
    PtrToInt,
    IntToPtr,
    BitCast,
    AddrSpaceCast,
}

/// Integer comparison predicates.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum IntPredicate {
    Eq,
    Ne,
    Ugt,
    Uge,
    Ult,
    Ule,
    Sgt,
    Sge,
    Slt,
    Sle,
}

/// Floating point comparison predicates.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum FloatPredicate {
    Oeq,
    Ogt,
    Oge,
    Olt,
    Ole,
    One,
    Ord,
    Uno,
    Ueq,
    Ugt,
    Uge,
    Ult,
    Ule,
    Une,
}

/// An instruction. `ty` is the result type (`void` for instructions
/// without a result).
#[derive(Clone, Debug)]
pub struct Instruction {
    pub name: Option<String>,
    pub ty: Handle<Type>,
    pub kind: InstKind,
}

/// The operation an instruction performs.
#[derive(Clone, Debug)]
pub enum InstKind {
    Binary {
        op: BinOp,
        lhs: Value,
        rhs: Value,
        /// No-signed-wrap flag.
        nsw: bool,
        /// Exact flag on lshr/ashr.
        exact: bool,
    },
    FNeg {
        value: Value,
    },
    Cast {
        op: CastOp,
        value: Value,
    },
    ICmp {
        pred: IntPredicate,
        lhs: Value,
        rhs: Value,
    },
    FCmp {
        pred: FloatPredicate,
        lhs: Value,
        rhs: Value,
    },
    Alloca {
        allocated: Handle<Type>,
        /// Element count for array allocations.
        count: Option<Value>,
        align: Option<u32>,
    },
    Load {
        ptr: Value,
        align: Option<u32>,
        volatile: bool,
    },
    Store {
        value: Value,
        ptr: Value,
        align: Option<u32>,
        volatile: bool,
    },
    GetElementPtr {
        base: Value,
        indices: Vec<Value>,
        inbounds: bool,
    },
    Phi {
        incoming: Vec<(Value, Handle<BasicBlock>)>,
    },
    Select {
        cond: Value,
        if_true: Value,
        if_false: Value,
    },
    ExtractElement {
        vector: Value,
        index: Value,
    },
    InsertElement {
        vector: Value,
        element: Value,
        index: Value,
    },
    ShuffleVector {
        a: Value,
        b: Value,
        /// `None` lanes are undef.
        mask: Vec<Option<u32>>,
    },
    Call {
        callee: Handle<Function>,
        args: Vec<Value>,
        cconv: CallConv,
        attrs: FnAttrs,
    },
    Br {
        dest: Handle<BasicBlock>,
    },
    CondBr {
        cond: Value,
        then_dest: Handle<BasicBlock>,
        else_dest: Handle<BasicBlock>,
    },
    Switch {
        value: Value,
        default: Handle<BasicBlock>,
        cases: Vec<(u64, Handle<BasicBlock>)>,
    },
    Ret {
        value: Option<Value>,
    },
}

impl InstKind {
    /// Visits every value operand mutably.
    pub fn for_each_operand_mut(&mut self, mut f: impl FnMut(&mut Value)) {
        match self {
            Self::Binary { lhs, rhs, .. } => {
                f(lhs);
                f(rhs);
            }
            Self::FNeg { value } | Self::Cast { value, .. } => f(value),
            Self::ICmp { lhs, rhs, .. } | Self::FCmp { lhs, rhs, .. } => {
                f(lhs);
                f(rhs);
            }
            Self::Alloca { count, .. } => {
                if let Some(c) = count {
                    f(c);
                }
            }
            Self::Load { ptr, .. } => f(ptr),
            Self::Store { value, ptr, .. } => {
                f(value);
                f(ptr);
            }
            Self::GetElementPtr { base, indices, .. } => {
                f(base);
                for i in indices {
                    f(i);
                }
            }
            Self::Phi { incoming } => {
                for (v, _) in incoming {
                    f(v);
                }
            }
            Self::Select {
                cond,
                if_true,
                if_false,
            } => {
                f(cond);
                f(if_true);
                f(if_false);
            }
            Self::ExtractElement { vector, index } => {
                f(vector);
                f(index);
            }
            Self::InsertElement {
                vector,
                element,
                index,
            } => {
                f(vector);
                f(element);
                f(index);
            }
            Self::ShuffleVector { a, b, .. } => {
                f(a);
                f(b);
            }
            Self::Call { args, .. } => {
                for a in args {
                    f(a);
                }
            }
            Self::CondBr { cond, .. } => f(cond),
            Self::Switch { value, .. } => f(value),
            Self::Ret { value } => {
                if let Some(v) = value {
                    f(v);
                }
            }
            Self::Br { .. } => {}
        }
    }

    /// Visits every value operand.
    pub fn for_each_operand(&self, mut f: impl FnMut(Value)) {
        let mut clone = self.clone();
        clone.for_each_operand_mut(|v| f(*v));
    }
}

/// A function definition or declaration.
///
/// Instructions and basic blocks live in per-function arenas; a function
/// with no blocks is a declaration.
#[derive(Clone, Debug)]
pub struct Function {
    pub name: String,
    /// The function type (a [`TypeInner::Function`](crate::TypeInner::Function)).
    pub ty: Handle<Type>,
    pub linkage: Linkage,
    pub cconv: CallConv,
    pub attrs: FnAttrs,
    pub ret_attrs: ParamAttrs,
    pub params: Vec<Parameter>,
    pub blocks: Arena<BasicBlock>,
    pub insts: Arena<Instruction>,
}

impl Function {
    /// Creates an empty declaration.
    pub fn new(name: impl Into<String>, ty: Handle<Type>) -> Self {
        Self {
            name: name.into(),
            ty,
            linkage: Linkage::External,
            cconv: CallConv::SpirFunc,
            attrs: FnAttrs::EMPTY,
            ret_attrs: ParamAttrs::EMPTY,
            params: Vec::new(),
            blocks: Arena::new(),
            insts: Arena::new(),
        }
    }

    /// Returns `true` if the function has no body.
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns `true` for `llvm.`-prefixed intrinsics.
    pub fn is_intrinsic(&self) -> bool {
        self.name.starts_with("llvm.")
    }

    /// Appends a new basic block.
    pub fn append_block(&mut self, name: Option<String>) -> Handle<BasicBlock> {
        self.blocks.append(BasicBlock {
            name,
            insts: Vec::new(),
        })
    }

    /// Appends an instruction to the end of `bb`.
    pub fn append_inst(&mut self, bb: Handle<BasicBlock>, inst: Instruction) -> Handle<Instruction> {
        let handle = self.insts.append(inst);
        self.blocks[bb].insts.push(handle);
        handle
    }

    /// Inserts an instruction immediately before `before` in `bb`.
    pub fn insert_inst_before(
        &mut self,
        bb: Handle<BasicBlock>,
        before: Handle<Instruction>,
        inst: Instruction,
    ) -> Handle<Instruction> {
        let handle = self.insts.append(inst);
        let list = &mut self.blocks[bb].insts;
        let pos = list
            .iter()
            .position(|&i| i == before)
            .unwrap_or(list.len());
        list.insert(pos, handle);
        handle
    }

    /// Replaces every operand use of `old` with `new` across the whole body.
    pub fn replace_all_uses(&mut self, old: Value, new: Value) {
        for (_, inst) in self.insts.iter_mut() {
            inst.kind.for_each_operand_mut(|v| {
                if *v == old {
                    *v = new;
                }
            });
        }
    }

    /// Detaches an instruction from its block and removes it from the arena.
    pub fn detach_inst(&mut self, inst: Handle<Instruction>) {
        for (_, block) in self.blocks.iter_mut() {
            block.insts.retain(|&i| i != inst);
        }
        self.insts.remove(inst);
    }

    /// Finds the block containing `inst`.
    pub fn block_of(&self, inst: Handle<Instruction>) -> Option<Handle<BasicBlock>> {
        self.blocks
            .iter()
            .find(|(_, b)| b.insts.contains(&inst))
            .map(|(h, _)| h)
    }

    /// The entry block, if any.
    pub fn entry_block(&self) -> Option<Handle<BasicBlock>> {
        self.blocks.iter().next().map(|(h, _)| h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::UniqueArena;
    use crate::types::{Type, TypeInner};

    fn fn_type() -> (UniqueArena<Type>, Handle<Type>, Handle<Type>) {
        let mut types = UniqueArena::new();
        let void = types.insert(Type {
            name: None,
            inner: TypeInner::Void,
        });
        let i32_ty = types.insert(Type {
            name: None,
            inner: TypeInner::Int { bits: 32 },
        });
        let fty = types.insert(Type {
            name: None,
            inner: TypeInner::Function {
                ret: void,
                params: vec![],
                varargs: false,
            },
        });
        (types, fty, i32_ty)
    }

    #[test]
    fn declaration_has_no_body() {
        let (_, fty, _) = fn_type();
        let f = Function::new("ext", fty);
        assert!(f.is_declaration());
        assert!(!f.is_intrinsic());
    }

    #[test]
    fn intrinsic_by_name() {
        let (_, fty, _) = fn_type();
        let f = Function::new("llvm.memcpy.p0i8.p1i8.i32", fty);
        assert!(f.is_intrinsic());
    }

    #[test]
    fn replace_all_uses_rewrites_operands() {
        let (_, fty, i32_ty) = fn_type();
        let mut f = Function::new("f", fty);
        let bb = f.append_block(Some("entry".into()));
        let a = f.append_inst(
            bb,
            Instruction {
                name: None,
                ty: i32_ty,
                kind: InstKind::Binary {
                    op: BinOp::Add,
                    lhs: Value::Arg(0),
                    rhs: Value::Arg(1),
                    nsw: false,
                    exact: false,
                },
            },
        );
        let b = f.append_inst(
            bb,
            Instruction {
                name: None,
                ty: i32_ty,
                kind: InstKind::Binary {
                    op: BinOp::Mul,
                    lhs: Value::Inst(a),
                    rhs: Value::Inst(a),
                    nsw: false,
                    exact: false,
                },
            },
        );
        f.replace_all_uses(Value::Inst(a), Value::Arg(2));
        match &f.insts[b].kind {
            InstKind::Binary { lhs, rhs, .. } => {
                assert_eq!(*lhs, Value::Arg(2));
                assert_eq!(*rhs, Value::Arg(2));
            }
            _ => panic!("expected Binary"),
        }
    }

    #[test]
    fn detach_inst_removes_from_block() {
        let (_, fty, i32_ty) = fn_type();
        let mut f = Function::new("f", fty);
        let bb = f.append_block(None);
        let a = f.append_inst(
            bb,
            Instruction {
                name: None,
                ty: i32_ty,
                kind: InstKind::FNeg {
                    value: Value::Arg(0),
                },
            },
        );
        assert_eq!(f.block_of(a), Some(bb));
        f.detach_inst(a);
        assert!(f.blocks[bb].insts.is_empty());
        assert!(f.insts.try_get(a).is_none());
    }

    #[test]
    fn insert_before_keeps_order() {
        let (_, fty, i32_ty) = fn_type();
        let mut f = Function::new("f", fty);
        let bb = f.append_block(None);
        let second = f.append_inst(
            bb,
            Instruction {
                name: None,
                ty: i32_ty,
                kind: InstKind::FNeg {
                    value: Value::Arg(0),
                },
            },
        );
        let first = f.insert_inst_before(
            bb,
            second,
            Instruction {
                name: None,
                ty: i32_ty,
                kind: InstKind::FNeg {
                    value: Value::Arg(1),
                },
            },
        );
        assert_eq!(f.blocks[bb].insts, vec![first, second]);
    }
}
