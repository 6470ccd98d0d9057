//! The id-addressed SPIR-V module graph.

use std::collections::{HashMap, HashSet};

use rspirv::spirv;

/// A SPIR-V result id. Instructions without a result id are assigned
/// synthetic ids above the module bound so every instruction can be
/// addressed uniformly.
pub type Id = u32;

/// The extended instruction sets the translator accepts.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum ExtInstSet {
    /// `OpenCL.std.12`
    OpenCl12,
    /// `OpenCL.std.20` (also plain `OpenCL.std`)
    OpenCl20,
    /// `OpenCL.std.21`
    OpenCl21,
}

/// The shape of an image type, reduced to what the OpenCL lowering needs.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub struct ImageDescriptor {
    pub dim: spirv::Dim,
    pub arrayed: bool,
    pub depth: bool,
    pub multisampled: bool,
}

/// A SPIR-V type.
#[derive(Clone, Debug, PartialEq)]
pub enum Type {
    Void,
    Bool,
    Int { width: u32, signed: bool },
    Float { width: u32 },
    Array { elem: Id, length: u64 },
    Pointer { elem: Id, storage: spirv::StorageClass },
    Vector { elem: Id, count: u32 },
    Struct {
        members: Vec<Id>,
        name: String,
        packed: bool,
    },
    Opaque { name: String },
    Function { ret: Id, params: Vec<Id> },
    Image {
        descriptor: ImageDescriptor,
        access: spirv::AccessQualifier,
    },
    Sampler,
    Pipe { access: spirv::AccessQualifier },
    Event,
    DeviceEvent,
    ReserveId,
    Queue,
}

/// Decorations attached to a value or parameter.
#[derive(Clone, Debug, Default)]
pub struct Decorations {
    pub alignment: Option<u32>,
    pub volatile: bool,
    pub constant: bool,
    pub builtin: Option<spirv::BuiltIn>,
    pub linkage: Option<spirv::LinkageType>,
    pub saturated_conversion: bool,
    pub fp_rounding_mode: Option<spirv::FPRoundingMode>,
    pub func_param_attrs: Vec<spirv::FunctionParameterAttribute>,
}

impl Decorations {
    /// Whether the value carries the zero-extend parameter attribute.
    pub fn is_zext(&self) -> bool {
        self.func_param_attrs
            .contains(&spirv::FunctionParameterAttribute::Zext)
    }
}

/// Memory access qualifiers on loads, stores and copies.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemoryAccess {
    pub volatile: bool,
    pub alignment: u32,
}

/// An id-addressed value: constant, variable, parameter, function, label
/// or instruction.
#[derive(Clone, Debug)]
pub struct Value {
    /// Result type id, if the value has one.
    pub ty: Option<Id>,
    /// Debug name (possibly empty).
    pub name: String,
    pub decorations: Decorations,
    pub kind: ValueKind,
}

/// What a [`Value`] is.
#[derive(Clone, Debug)]
pub enum ValueKind {
    /// A scalar constant. `bits` holds the zero-extended bit pattern,
    /// wide enough for 64-bit payloads.
    Constant { bits: u64 },
    /// A composite (vector or array) constant.
    ConstantComposite { elements: Vec<Id> },
    /// A null constant.
    ConstantNull,
    /// A literal sampler constant.
    ConstantSampler {
        addressing_mode: u32,
        normalized: u32,
        filter_mode: u32,
    },
    /// An undefined value.
    Undef,
    /// A variable; module scope unless `storage` is `Function`.
    Variable {
        storage: spirv::StorageClass,
        init: Option<Id>,
    },
    /// A formal parameter of `function`.
    Param { function: usize, index: u32 },
    /// A function, by index into [`Module::functions`].
    Function { function: usize },
    /// A basic-block label.
    Label { function: usize, block: usize },
    /// An instruction.
    Inst(Inst),
}

/// An instruction body. One- and two-operand value instructions are
/// normalized to `Unary`/`Binary`; the rest keep their structure.
#[derive(Clone, Debug)]
pub enum Inst {
    Unary { op: spirv::Op, operand: Id },
    Binary { op: spirv::Op, a: Id, b: Id },
    Load { ptr: Id, access: MemoryAccess },
    Store {
        ptr: Id,
        value: Id,
        access: MemoryAccess,
    },
    CopyMemorySized {
        target: Id,
        source: Id,
        size: Id,
        access: MemoryAccess,
    },
    Select { cond: Id, if_true: Id, if_false: Id },
    AccessChain {
        base: Id,
        indices: Vec<Id>,
        inbounds: bool,
    },
    CompositeExtract { composite: Id, indices: Vec<u32> },
    CompositeInsert {
        object: Id,
        composite: Id,
        indices: Vec<u32>,
    },
    VectorExtractDynamic { vector: Id, index: Id },
    VectorInsertDynamic {
        vector: Id,
        component: Id,
        index: Id,
    },
    VectorShuffle {
        a: Id,
        b: Id,
        components: Vec<u32>,
    },
    Phi { pairs: Vec<(Id, Id)> },
    Branch { target: Id },
    BranchConditional {
        cond: Id,
        true_label: Id,
        false_label: Id,
    },
    Switch {
        selector: Id,
        default: Id,
        cases: Vec<(u64, Id)>,
    },
    Return,
    ReturnValue { value: Id },
    FunctionCall { function: Id, args: Vec<Id> },
    /// Extended instruction. `args` keeps the raw operand words: trailing
    /// literals (vector widths, rounding modes) are consumed by name
    /// rewriting before the rest resolve as value ids.
    ExtInst { set: Id, number: u32, args: Vec<u32> },
    ControlBarrier { semantics: u32 },
    MemoryBarrier { semantics: u32 },
    /// An atomic operation. Scope and semantics operands are dropped;
    /// `operands` holds the value arguments after the pointer.
    Atomic {
        op: spirv::Op,
        ptr: Id,
        operands: Vec<Id>,
    },
    /// Any other instruction, as an opcode plus its id operands.
    Other { op: spirv::Op, operands: Vec<Id> },
}

/// An execution mode attached to an entry point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    LocalSize([u32; 3]),
    LocalSizeHint([u32; 3]),
    /// The raw vector-type-hint encoding: high 16 bits vector width,
    /// low 16 bits scalar kind.
    VecTypeHint(u32),
    ContractionOff,
}

/// A basic block: a label id and the ordered instruction ids.
#[derive(Clone, Debug, Default)]
pub struct Block {
    pub label: Id,
    pub insts: Vec<Id>,
}

/// A function definition.
#[derive(Clone, Debug)]
pub struct Function {
    pub id: Id,
    pub name: String,
    /// Id of the `Type::Function` signature.
    pub type_id: Id,
    pub control: spirv::FunctionControl,
    /// Parameter value ids, in declaration order.
    pub params: Vec<Id>,
    pub blocks: Vec<Block>,
    pub linkage: Option<spirv::LinkageType>,
    pub execution_modes: Vec<ExecutionMode>,
}

impl Function {
    /// Finds the local-size execution mode, if declared.
    pub fn local_size(&self) -> Option<[u32; 3]> {
        self.execution_modes.iter().find_map(|m| match m {
            ExecutionMode::LocalSize(s) => Some(*s),
            _ => None,
        })
    }

    /// Finds the local-size-hint execution mode, if declared.
    pub fn local_size_hint(&self) -> Option<[u32; 3]> {
        self.execution_modes.iter().find_map(|m| match m {
            ExecutionMode::LocalSizeHint(s) => Some(*s),
            _ => None,
        })
    }

    /// Finds the vector-type-hint execution mode, if declared.
    pub fn vec_type_hint(&self) -> Option<u32> {
        self.execution_modes.iter().find_map(|m| match m {
            ExecutionMode::VecTypeHint(v) => Some(*v),
            _ => None,
        })
    }

    /// Whether FP contraction is disabled for this entry point.
    pub fn contraction_off(&self) -> bool {
        self.execution_modes.contains(&ExecutionMode::ContractionOff)
    }
}

/// A decoded SPIR-V module.
#[derive(Clone, Debug)]
pub struct Module {
    pub addressing_model: spirv::AddressingModel,
    pub memory_model: spirv::MemoryModel,
    pub source_language: spirv::SourceLanguage,
    /// Source language version as (major, minor).
    pub source_version: (u32, u32),
    pub source_extensions: Vec<String>,
    /// Compile flags recorded in the module, space-joined.
    pub compile_flags: String,
    /// Imported extended instruction sets, by result id.
    pub ext_inst_sets: HashMap<Id, ExtInstSet>,
    pub types: HashMap<Id, Type>,
    pub values: HashMap<Id, Value>,
    /// Module-scope variable ids, in declaration order.
    pub global_variables: Vec<Id>,
    pub functions: Vec<Function>,
    /// Ids of kernel entry-point functions.
    pub entry_points: HashSet<Id>,
    next_id: Id,
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

impl Module {
    /// Creates an empty module with `Physical64` addressing.
    pub fn new() -> Self {
        Self {
            addressing_model: spirv::AddressingModel::Physical64,
            memory_model: spirv::MemoryModel::OpenCL,
            source_language: spirv::SourceLanguage::OpenCL_C,
            source_version: (1, 2),
            source_extensions: Vec::new(),
            compile_flags: String::new(),
            ext_inst_sets: HashMap::new(),
            types: HashMap::new(),
            values: HashMap::new(),
            global_variables: Vec::new(),
            functions: Vec::new(),
            entry_points: HashSet::new(),
            next_id: 1,
        }
    }

    /// Allocates a fresh id.
    pub fn fresh_id(&mut self) -> Id {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Reserves ids so that `fresh_id` never collides with `bound`.
    pub fn reserve_ids(&mut self, bound: Id) {
        self.next_id = self.next_id.max(bound);
    }

    /// Looks up a type.
    pub fn type_of(&self, id: Id) -> Option<&Type> {
        self.types.get(&id)
    }

    /// Looks up a value.
    pub fn value(&self, id: Id) -> Option<&Value> {
        self.values.get(&id)
    }

    /// Whether `id` names a kernel entry point.
    pub fn is_entry_point(&self, id: Id) -> bool {
        self.entry_points.contains(&id)
    }

    /// Adds a type under a fresh id.
    pub fn add_type(&mut self, ty: Type) -> Id {
        let id = self.fresh_id();
        self.types.insert(id, ty);
        id
    }

    /// Adds a type under an explicit id.
    pub fn add_type_with_id(&mut self, id: Id, ty: Type) {
        self.reserve_ids(id + 1);
        self.types.insert(id, ty);
    }

    /// Adds a value under a fresh id.
    pub fn add_value(&mut self, value: Value) -> Id {
        let id = self.fresh_id();
        self.values.insert(id, value);
        id
    }

    /// Adds a value under an explicit id.
    pub fn add_value_with_id(&mut self, id: Id, value: Value) {
        self.reserve_ids(id + 1);
        self.values.insert(id, value);
    }

    /// Adds an unnamed, undecorated constant of the given type.
    pub fn add_constant(&mut self, ty: Id, bits: u64) -> Id {
        self.add_value(Value {
            ty: Some(ty),
            name: String::new(),
            decorations: Decorations::default(),
            kind: ValueKind::Constant { bits },
        })
    }

    /// Adds a module-scope variable and records it in declaration order.
    pub fn add_global_variable(&mut self, value: Value) -> Id {
        debug_assert!(matches!(value.kind, ValueKind::Variable { .. }));
        let id = self.add_value(value);
        self.global_variables.push(id);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_do_not_collide_with_reserved() {
        let mut m = Module::new();
        m.add_type_with_id(40, Type::Void);
        let id = m.fresh_id();
        assert!(id > 40);
    }

    #[test]
    fn global_variable_order() {
        let mut m = Module::new();
        let void = m.add_type(Type::Void);
        let ptr = m.add_type(Type::Pointer {
            elem: void,
            storage: spirv::StorageClass::CrossWorkgroup,
        });
        let a = m.add_global_variable(Value {
            ty: Some(ptr),
            name: "a".into(),
            decorations: Decorations::default(),
            kind: ValueKind::Variable {
                storage: spirv::StorageClass::CrossWorkgroup,
                init: None,
            },
        });
        let b = m.add_global_variable(Value {
            ty: Some(ptr),
            name: "b".into(),
            decorations: Decorations::default(),
            kind: ValueKind::Variable {
                storage: spirv::StorageClass::CrossWorkgroup,
                init: None,
            },
        });
        assert_eq!(m.global_variables, vec![a, b]);
    }

    #[test]
    fn execution_mode_lookups() {
        let f = Function {
            id: 1,
            name: "k".into(),
            type_id: 2,
            control: spirv::FunctionControl::empty(),
            params: vec![],
            blocks: vec![],
            linkage: None,
            execution_modes: vec![
                ExecutionMode::LocalSize([4, 2, 1]),
                ExecutionMode::ContractionOff,
            ],
        };
        assert_eq!(f.local_size(), Some([4, 2, 1]));
        assert_eq!(f.local_size_hint(), None);
        assert!(f.contraction_off());
    }
}
