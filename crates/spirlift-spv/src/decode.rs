//! Decoding pass: `rspirv::dr::Module` → [`Module`] graph.

use std::collections::HashMap;

use rspirv::dr;
use rspirv::spirv::{self, Op};

use crate::module::{
    Block, Decorations, ExecutionMode, ExtInstSet, Function, Id, ImageDescriptor, Inst,
    MemoryAccess, Module, Type, Value, ValueKind,
};
use crate::DecodeError;

/// Parses a SPIR-V binary from raw bytes and builds the module graph.
pub fn decode_bytes(bytes: &[u8]) -> Result<Module, DecodeError> {
    let dr = dr::load_bytes(bytes).map_err(|e| DecodeError::Parse(format!("{e:?}")))?;
    decode_module(&dr)
}

/// Parses a SPIR-V binary from words and builds the module graph.
pub fn decode_words(words: &[u32]) -> Result<Module, DecodeError> {
    let dr = dr::load_words(words).map_err(|e| DecodeError::Parse(format!("{e:?}")))?;
    decode_module(&dr)
}

/// Builds the module graph from an already-parsed data representation.
pub fn decode_module(dr: &dr::Module) -> Result<Module, DecodeError> {
    let mut decoder = Decoder {
        dr,
        names: HashMap::new(),
        decos: HashMap::new(),
        exec_modes: HashMap::new(),
        module: Module::new(),
    };
    if let Some(header) = &dr.header {
        decoder.module.reserve_ids(header.bound);
    }
    decoder.collect_names();
    decoder.collect_decorations()?;
    decoder.decode_module_info()?;
    decoder.decode_types_and_globals()?;
    decoder.register_functions()?;
    decoder.decode_function_bodies()?;
    log::debug!(
        "decoded SPIR-V module: {} types, {} values, {} functions",
        decoder.module.types.len(),
        decoder.module.values.len(),
        decoder.module.functions.len()
    );
    Ok(decoder.module)
}

#[derive(Clone, Default)]
struct RawDecorations {
    base: Decorations,
    cpacked: bool,
}

struct Decoder<'a> {
    dr: &'a dr::Module,
    names: HashMap<Id, String>,
    decos: HashMap<Id, RawDecorations>,
    exec_modes: HashMap<Id, Vec<ExecutionMode>>,
    module: Module,
}

fn operand_id(op: &dr::Operand) -> Option<Id> {
    match *op {
        dr::Operand::IdRef(w)
        | dr::Operand::IdScope(w)
        | dr::Operand::IdMemorySemantics(w) => Some(w),
        _ => None,
    }
}

fn operand_lit32(op: &dr::Operand) -> Option<u32> {
    match *op {
        dr::Operand::LiteralBit32(w) => Some(w),
        dr::Operand::LiteralExtInstInteger(w) => Some(w),
        dr::Operand::IdRef(w) => Some(w),
        _ => None,
    }
}

impl<'a> Decoder<'a> {
    fn name_of(&self, id: Id) -> String {
        self.names.get(&id).cloned().unwrap_or_default()
    }

    fn decorations_of(&self, id: Id) -> Decorations {
        self.decos
            .get(&id)
            .map(|d| d.base.clone())
            .unwrap_or_default()
    }

    fn id_at(&self, inst: &dr::Instruction, index: usize) -> Result<Id, DecodeError> {
        inst.operands
            .get(index)
            .and_then(operand_id)
            .ok_or_else(|| {
                DecodeError::Malformed(format!(
                    "{:?}: expected id operand at index {index}",
                    inst.class.opcode
                ))
            })
    }

    fn lit32_at(&self, inst: &dr::Instruction, index: usize) -> Result<u32, DecodeError> {
        inst.operands
            .get(index)
            .and_then(operand_lit32)
            .ok_or_else(|| {
                DecodeError::Malformed(format!(
                    "{:?}: expected literal operand at index {index}",
                    inst.class.opcode
                ))
            })
    }

    fn result_id(&self, inst: &dr::Instruction) -> Result<Id, DecodeError> {
        inst.result_id.ok_or_else(|| {
            DecodeError::Malformed(format!("{:?}: missing result id", inst.class.opcode))
        })
    }

    /// Resolves an id that must name an integer constant.
    fn constant_u64(&self, id: Id) -> Result<u64, DecodeError> {
        match self.module.values.get(&id).map(|v| &v.kind) {
            Some(ValueKind::Constant { bits }) => Ok(*bits),
            _ => Err(DecodeError::Malformed(format!(
                "id %{id} is not an integer constant"
            ))),
        }
    }

    fn collect_names(&mut self) {
        for inst in &self.dr.debug_names {
            if inst.class.opcode == Op::Name {
                if let (Some(id), Some(dr::Operand::LiteralString(s))) = (
                    inst.operands.first().and_then(operand_id),
                    inst.operands.get(1),
                ) {
                    self.names.insert(id, s.clone());
                }
            }
        }
    }

    fn collect_decorations(&mut self) -> Result<(), DecodeError> {
        for inst in &self.dr.annotations {
            if inst.class.opcode != Op::Decorate {
                continue;
            }
            let target = self.id_at(inst, 0)?;
            let deco = match inst.operands.get(1) {
                Some(dr::Operand::Decoration(d)) => *d,
                _ => continue,
            };
            let entry = self.decos.entry(target).or_default();
            match deco {
                spirv::Decoration::Alignment => {
                    if let Some(dr::Operand::LiteralBit32(a)) = inst.operands.get(2) {
                        entry.base.alignment = Some(*a);
                    }
                }
                spirv::Decoration::Volatile => entry.base.volatile = true,
                spirv::Decoration::Constant => entry.base.constant = true,
                spirv::Decoration::CPacked => entry.cpacked = true,
                spirv::Decoration::SaturatedConversion => {
                    entry.base.saturated_conversion = true;
                }
                spirv::Decoration::BuiltIn => {
                    if let Some(dr::Operand::BuiltIn(b)) = inst.operands.get(2) {
                        entry.base.builtin = Some(*b);
                    }
                }
                spirv::Decoration::LinkageAttributes => {
                    if let Some(dr::Operand::LinkageType(lt)) = inst.operands.get(3) {
                        entry.base.linkage = Some(*lt);
                    }
                }
                spirv::Decoration::FPRoundingMode => {
                    if let Some(dr::Operand::FPRoundingMode(m)) = inst.operands.get(2) {
                        entry.base.fp_rounding_mode = Some(*m);
                    }
                }
                spirv::Decoration::FuncParamAttr => {
                    if let Some(dr::Operand::FunctionParameterAttribute(a)) = inst.operands.get(2)
                    {
                        entry.base.func_param_attrs.push(*a);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn decode_module_info(&mut self) -> Result<(), DecodeError> {
        if let Some(mm) = &self.dr.memory_model {
            if let Some(dr::Operand::AddressingModel(am)) = mm.operands.first() {
                self.module.addressing_model = *am;
            }
            if let Some(dr::Operand::MemoryModel(m)) = mm.operands.get(1) {
                self.module.memory_model = *m;
            }
        }

        for inst in &self.dr.debug_string_source {
            match inst.class.opcode {
                Op::Source => {
                    if let Some(dr::Operand::SourceLanguage(lang)) = inst.operands.first() {
                        self.module.source_language = *lang;
                    }
                    if let Some(dr::Operand::LiteralBit32(ver)) = inst.operands.get(1) {
                        self.module.source_version = normalize_version(*ver);
                    }
                }
                Op::SourceExtension => {
                    if let Some(dr::Operand::LiteralString(s)) = inst.operands.first() {
                        self.module.source_extensions.push(s.clone());
                    }
                }
                _ => {}
            }
        }

        let mut flags = Vec::new();
        for inst in &self.dr.debug_module_processed {
            if let Some(dr::Operand::LiteralString(s)) = inst.operands.first() {
                flags.push(s.clone());
            }
        }
        self.module.compile_flags = flags.join(" ");

        for inst in &self.dr.ext_inst_imports {
            let id = self.result_id(inst)?;
            let name = match inst.operands.first() {
                Some(dr::Operand::LiteralString(s)) => s.as_str(),
                _ => "",
            };
            let set = match name {
                "OpenCL.std" | "OpenCL.std.20" => ExtInstSet::OpenCl20,
                "OpenCL.std.12" => ExtInstSet::OpenCl12,
                "OpenCL.std.21" => ExtInstSet::OpenCl21,
                other => {
                    return Err(DecodeError::Unsupported(format!(
                        "extended instruction set '{other}'"
                    )))
                }
            };
            self.module.ext_inst_sets.insert(id, set);
        }

        for inst in &self.dr.entry_points {
            let model = match inst.operands.first() {
                Some(dr::Operand::ExecutionModel(m)) => *m,
                _ => continue,
            };
            if model != spirv::ExecutionModel::Kernel {
                return Err(DecodeError::Unsupported(format!(
                    "execution model {model:?}"
                )));
            }
            let func = self.id_at(inst, 1)?;
            self.module.entry_points.insert(func);
            if let Some(dr::Operand::LiteralString(name)) = inst.operands.get(2) {
                self.names.entry(func).or_insert_with(|| name.clone());
            }
        }

        for inst in &self.dr.execution_modes {
            let func = self.id_at(inst, 0)?;
            let mode = match inst.operands.get(1) {
                Some(dr::Operand::ExecutionMode(m)) => *m,
                _ => continue,
            };
            let decoded = match mode {
                spirv::ExecutionMode::LocalSize => ExecutionMode::LocalSize([
                    self.lit32_at(inst, 2)?,
                    self.lit32_at(inst, 3)?,
                    self.lit32_at(inst, 4)?,
                ]),
                spirv::ExecutionMode::LocalSizeHint => ExecutionMode::LocalSizeHint([
                    self.lit32_at(inst, 2)?,
                    self.lit32_at(inst, 3)?,
                    self.lit32_at(inst, 4)?,
                ]),
                spirv::ExecutionMode::VecTypeHint => {
                    ExecutionMode::VecTypeHint(self.lit32_at(inst, 2)?)
                }
                spirv::ExecutionMode::ContractionOff => ExecutionMode::ContractionOff,
                _ => continue,
            };
            self.exec_modes.entry(func).or_default().push(decoded);
        }
        Ok(())
    }

    fn decode_types_and_globals(&mut self) -> Result<(), DecodeError> {
        for inst in &self.dr.types_global_values {
            let op = inst.class.opcode;
            match op {
                Op::TypeVoid => self.add_type(inst, Type::Void)?,
                Op::TypeBool => self.add_type(inst, Type::Bool)?,
                Op::TypeInt => {
                    let width = self.lit32_at(inst, 0)?;
                    let signed = self.lit32_at(inst, 1)? != 0;
                    self.add_type(inst, Type::Int { width, signed })?
                }
                Op::TypeFloat => {
                    let width = self.lit32_at(inst, 0)?;
                    self.add_type(inst, Type::Float { width })?
                }
                Op::TypeVector => {
                    let elem = self.id_at(inst, 0)?;
                    let count = self.lit32_at(inst, 1)?;
                    self.add_type(inst, Type::Vector { elem, count })?
                }
                Op::TypeArray => {
                    let elem = self.id_at(inst, 0)?;
                    let length = self.constant_u64(self.id_at(inst, 1)?)?;
                    self.add_type(inst, Type::Array { elem, length })?
                }
                Op::TypeStruct => {
                    let id = self.result_id(inst)?;
                    let members = inst.operands.iter().filter_map(operand_id).collect();
                    let packed = self.decos.get(&id).is_some_and(|d| d.cpacked);
                    let name = self.name_of(id);
                    self.module.add_type_with_id(
                        id,
                        Type::Struct {
                            members,
                            name,
                            packed,
                        },
                    );
                }
                Op::TypeOpaque => {
                    let name = match inst.operands.first() {
                        Some(dr::Operand::LiteralString(s)) => s.clone(),
                        _ => String::new(),
                    };
                    self.add_type(inst, Type::Opaque { name })?
                }
                Op::TypePointer => {
                    let storage = match inst.operands.first() {
                        Some(dr::Operand::StorageClass(sc)) => *sc,
                        _ => {
                            return Err(DecodeError::Malformed(
                                "OpTypePointer without storage class".into(),
                            ))
                        }
                    };
                    let elem = self.id_at(inst, 1)?;
                    self.add_type(inst, Type::Pointer { elem, storage })?
                }
                Op::TypeFunction => {
                    let ret = self.id_at(inst, 0)?;
                    let params = inst.operands[1..]
                        .iter()
                        .filter_map(operand_id)
                        .collect();
                    self.add_type(inst, Type::Function { ret, params })?
                }
                Op::TypeImage => {
                    let dim = match inst.operands.get(1) {
                        Some(dr::Operand::Dim(d)) => *d,
                        _ => spirv::Dim::Dim2D,
                    };
                    let depth = self.lit32_at(inst, 2)? == 1;
                    let arrayed = self.lit32_at(inst, 3)? != 0;
                    let multisampled = self.lit32_at(inst, 4)? != 0;
                    let access = match inst.operands.get(7) {
                        Some(dr::Operand::AccessQualifier(a)) => *a,
                        _ => spirv::AccessQualifier::ReadOnly,
                    };
                    self.add_type(
                        inst,
                        Type::Image {
                            descriptor: ImageDescriptor {
                                dim,
                                arrayed,
                                depth,
                                multisampled,
                            },
                            access,
                        },
                    )?
                }
                Op::TypeSampler => self.add_type(inst, Type::Sampler)?,
                // No OpenCL lowering exists for standalone sampled-image
                // values; reject here so translation never sees the type.
                Op::TypeSampledImage => {
                    return Err(DecodeError::Unsupported("sampled image type".into()))
                }
                Op::TypePipe => {
                    let access = match inst.operands.first() {
                        Some(dr::Operand::AccessQualifier(a)) => *a,
                        _ => spirv::AccessQualifier::ReadWrite,
                    };
                    self.add_type(inst, Type::Pipe { access })?
                }
                Op::TypeEvent => self.add_type(inst, Type::Event)?,
                Op::TypeDeviceEvent => self.add_type(inst, Type::DeviceEvent)?,
                Op::TypeReserveId => self.add_type(inst, Type::ReserveId)?,
                Op::TypeQueue => self.add_type(inst, Type::Queue)?,
                Op::Constant
                | Op::SpecConstant
                | Op::ConstantTrue
                | Op::ConstantFalse
                | Op::SpecConstantTrue
                | Op::SpecConstantFalse
                | Op::ConstantComposite
                | Op::SpecConstantComposite
                | Op::ConstantNull
                | Op::ConstantSampler
                | Op::Undef => {
                    let id = self.result_id(inst)?;
                    let value = self.decode_constant(inst)?;
                    self.module.add_value_with_id(id, value);
                }
                Op::Variable => {
                    let id = self.result_id(inst)?;
                    let value = self.decode_variable(inst)?;
                    self.module.add_value_with_id(id, value);
                    self.module.global_variables.push(id);
                }
                Op::Line | Op::NoLine | Op::Nop => {}
                other => {
                    return Err(DecodeError::Unsupported(format!(
                        "module-scope instruction {other:?}"
                    )))
                }
            }
        }
        Ok(())
    }

    fn add_type(&mut self, inst: &dr::Instruction, ty: Type) -> Result<(), DecodeError> {
        let id = self.result_id(inst)?;
        self.module.add_type_with_id(id, ty);
        Ok(())
    }

    fn decode_constant(&self, inst: &dr::Instruction) -> Result<Value, DecodeError> {
        let id = self.result_id(inst)?;
        let kind = match inst.class.opcode {
            Op::Constant | Op::SpecConstant => {
                let bits = match inst.operands.first() {
                    Some(dr::Operand::LiteralBit32(w)) => u64::from(*w),
                    Some(dr::Operand::LiteralBit64(w)) => *w,
                    _ => {
                        return Err(DecodeError::Malformed(
                            "OpConstant without literal value".into(),
                        ))
                    }
                };
                ValueKind::Constant { bits }
            }
            Op::ConstantTrue | Op::SpecConstantTrue => ValueKind::Constant { bits: 1 },
            Op::ConstantFalse | Op::SpecConstantFalse => ValueKind::Constant { bits: 0 },
            Op::ConstantComposite | Op::SpecConstantComposite => ValueKind::ConstantComposite {
                elements: inst.operands.iter().filter_map(operand_id).collect(),
            },
            Op::ConstantNull => ValueKind::ConstantNull,
            Op::ConstantSampler => {
                let addressing_mode = match inst.operands.first() {
                    Some(dr::Operand::SamplerAddressingMode(m)) => *m as u32,
                    _ => 0,
                };
                let normalized = self.lit32_at(inst, 1)?;
                let filter_mode = match inst.operands.get(2) {
                    Some(dr::Operand::SamplerFilterMode(m)) => *m as u32,
                    _ => 0,
                };
                ValueKind::ConstantSampler {
                    addressing_mode,
                    normalized,
                    filter_mode,
                }
            }
            Op::Undef => ValueKind::Undef,
            other => {
                return Err(DecodeError::Unsupported(format!("constant op {other:?}")))
            }
        };
        Ok(Value {
            ty: inst.result_type,
            name: self.name_of(id),
            decorations: self.decorations_of(id),
            kind,
        })
    }

    fn decode_variable(&self, inst: &dr::Instruction) -> Result<Value, DecodeError> {
        let id = self.result_id(inst)?;
        let storage = match inst.operands.first() {
            Some(dr::Operand::StorageClass(sc)) => *sc,
            _ => {
                return Err(DecodeError::Malformed(
                    "OpVariable without storage class".into(),
                ))
            }
        };
        let init = inst.operands.get(1).and_then(operand_id);
        Ok(Value {
            ty: inst.result_type,
            name: self.name_of(id),
            decorations: self.decorations_of(id),
            kind: ValueKind::Variable { storage, init },
        })
    }

    fn register_functions(&mut self) -> Result<(), DecodeError> {
        for (func_index, f) in self.dr.functions.iter().enumerate() {
            let def = f.def.as_ref().ok_or_else(|| {
                DecodeError::Malformed("function without OpFunction".into())
            })?;
            let id = self.result_id(def)?;
            let control = match def.operands.first() {
                Some(dr::Operand::FunctionControl(c)) => *c,
                _ => spirv::FunctionControl::NONE,
            };
            let type_id = self.id_at(def, 1)?;
            let linkage = self.decorations_of(id).linkage;
            let mut function = Function {
                id,
                name: self.name_of(id),
                type_id,
                control,
                params: Vec::new(),
                blocks: Vec::new(),
                linkage,
                execution_modes: self.exec_modes.remove(&id).unwrap_or_default(),
            };

            for (index, p) in f.parameters.iter().enumerate() {
                let pid = self.result_id(p)?;
                self.module.add_value_with_id(
                    pid,
                    Value {
                        ty: p.result_type,
                        name: self.name_of(pid),
                        decorations: self.decorations_of(pid),
                        kind: ValueKind::Param {
                            function: func_index,
                            index: index as u32,
                        },
                    },
                );
                function.params.push(pid);
            }

            for (block_index, b) in f.blocks.iter().enumerate() {
                let label = b
                    .label
                    .as_ref()
                    .and_then(|l| l.result_id)
                    .ok_or_else(|| DecodeError::Malformed("block without label".into()))?;
                self.module.add_value_with_id(
                    label,
                    Value {
                        ty: None,
                        name: self.name_of(label),
                        decorations: Decorations::default(),
                        kind: ValueKind::Label {
                            function: func_index,
                            block: block_index,
                        },
                    },
                );
                function.blocks.push(Block {
                    label,
                    insts: Vec::new(),
                });
            }

            self.module.add_value_with_id(
                id,
                Value {
                    ty: Some(type_id),
                    name: self.name_of(id),
                    decorations: self.decorations_of(id),
                    kind: ValueKind::Function {
                        function: func_index,
                    },
                },
            );
            self.module.functions.push(function);
        }
        Ok(())
    }

    fn decode_function_bodies(&mut self) -> Result<(), DecodeError> {
        for (func_index, f) in self.dr.functions.iter().enumerate() {
            for (block_index, b) in f.blocks.iter().enumerate() {
                for inst in &b.instructions {
                    if matches!(inst.class.opcode, Op::Line | Op::NoLine | Op::Nop) {
                        continue;
                    }
                    let id = match inst.result_id {
                        Some(id) => id,
                        None => self.module.fresh_id(),
                    };
                    let (value, listed) = self.decode_body_inst(inst, id)?;
                    self.module.add_value_with_id(id, value);
                    if listed {
                        self.module.functions[func_index].blocks[block_index]
                            .insts
                            .push(id);
                    }
                }
            }
        }
        Ok(())
    }

    /// Decodes one instruction inside a block. Returns the value and
    /// whether it participates in block scan order.
    fn decode_body_inst(
        &self,
        inst: &dr::Instruction,
        id: Id,
    ) -> Result<(Value, bool), DecodeError> {
        let op = inst.class.opcode;
        let value = |kind: ValueKind| Value {
            ty: inst.result_type,
            name: self.name_of(id),
            decorations: self.decorations_of(id),
            kind,
        };

        let (kind, listed) = match op {
            Op::Undef => (ValueKind::Undef, false),
            Op::Variable => {
                let v = self.decode_variable(inst)?;
                return Ok((v, true));
            }
            Op::Load => {
                let ptr = self.id_at(inst, 0)?;
                let access = self.memory_access(inst, 1);
                (ValueKind::Inst(Inst::Load { ptr, access }), true)
            }
            Op::Store => {
                let ptr = self.id_at(inst, 0)?;
                let val = self.id_at(inst, 1)?;
                let access = self.memory_access(inst, 2);
                (
                    ValueKind::Inst(Inst::Store {
                        ptr,
                        value: val,
                        access,
                    }),
                    true,
                )
            }
            Op::CopyMemorySized => {
                let target = self.id_at(inst, 0)?;
                let source = self.id_at(inst, 1)?;
                let size = self.id_at(inst, 2)?;
                let access = self.memory_access(inst, 3);
                (
                    ValueKind::Inst(Inst::CopyMemorySized {
                        target,
                        source,
                        size,
                        access,
                    }),
                    true,
                )
            }
            Op::Select => (
                ValueKind::Inst(Inst::Select {
                    cond: self.id_at(inst, 0)?,
                    if_true: self.id_at(inst, 1)?,
                    if_false: self.id_at(inst, 2)?,
                }),
                true,
            ),
            Op::AccessChain | Op::InBoundsAccessChain => (
                ValueKind::Inst(Inst::AccessChain {
                    base: self.id_at(inst, 0)?,
                    indices: inst.operands[1..]
                        .iter()
                        .filter_map(operand_id)
                        .collect(),
                    inbounds: op == Op::InBoundsAccessChain,
                }),
                true,
            ),
            Op::CompositeExtract => (
                ValueKind::Inst(Inst::CompositeExtract {
                    composite: self.id_at(inst, 0)?,
                    indices: inst.operands[1..]
                        .iter()
                        .filter_map(operand_lit32)
                        .collect(),
                }),
                true,
            ),
            Op::CompositeInsert => (
                ValueKind::Inst(Inst::CompositeInsert {
                    object: self.id_at(inst, 0)?,
                    composite: self.id_at(inst, 1)?,
                    indices: inst.operands[2..]
                        .iter()
                        .filter_map(operand_lit32)
                        .collect(),
                }),
                true,
            ),
            Op::VectorExtractDynamic => (
                ValueKind::Inst(Inst::VectorExtractDynamic {
                    vector: self.id_at(inst, 0)?,
                    index: self.id_at(inst, 1)?,
                }),
                true,
            ),
            Op::VectorInsertDynamic => (
                ValueKind::Inst(Inst::VectorInsertDynamic {
                    vector: self.id_at(inst, 0)?,
                    component: self.id_at(inst, 1)?,
                    index: self.id_at(inst, 2)?,
                }),
                true,
            ),
            Op::VectorShuffle => (
                ValueKind::Inst(Inst::VectorShuffle {
                    a: self.id_at(inst, 0)?,
                    b: self.id_at(inst, 1)?,
                    components: inst.operands[2..]
                        .iter()
                        .filter_map(operand_lit32)
                        .collect(),
                }),
                true,
            ),
            Op::Phi => {
                let ids: Vec<Id> = inst.operands.iter().filter_map(operand_id).collect();
                let pairs = ids.chunks(2).map(|c| (c[0], c[1])).collect();
                (ValueKind::Inst(Inst::Phi { pairs }), true)
            }
            Op::Branch => (
                ValueKind::Inst(Inst::Branch {
                    target: self.id_at(inst, 0)?,
                }),
                true,
            ),
            Op::BranchConditional => (
                ValueKind::Inst(Inst::BranchConditional {
                    cond: self.id_at(inst, 0)?,
                    true_label: self.id_at(inst, 1)?,
                    false_label: self.id_at(inst, 2)?,
                }),
                true,
            ),
            Op::Switch => {
                let selector = self.id_at(inst, 0)?;
                let default = self.id_at(inst, 1)?;
                let mut cases = Vec::new();
                let rest = &inst.operands[2..];
                for pair in rest.chunks(2) {
                    if pair.len() != 2 {
                        return Err(DecodeError::Malformed("odd OpSwitch case list".into()));
                    }
                    let lit = match pair[0] {
                        dr::Operand::LiteralBit32(w) => u64::from(w),
                        dr::Operand::LiteralBit64(w) => w,
                        _ => {
                            return Err(DecodeError::Malformed(
                                "OpSwitch case is not a literal".into(),
                            ))
                        }
                    };
                    let label = operand_id(&pair[1]).ok_or_else(|| {
                        DecodeError::Malformed("OpSwitch case without label".into())
                    })?;
                    cases.push((lit, label));
                }
                (
                    ValueKind::Inst(Inst::Switch {
                        selector,
                        default,
                        cases,
                    }),
                    true,
                )
            }
            Op::Return => (ValueKind::Inst(Inst::Return), true),
            Op::ReturnValue => (
                ValueKind::Inst(Inst::ReturnValue {
                    value: self.id_at(inst, 0)?,
                }),
                true,
            ),
            Op::FunctionCall => (
                ValueKind::Inst(Inst::FunctionCall {
                    function: self.id_at(inst, 0)?,
                    args: inst.operands[1..]
                        .iter()
                        .filter_map(operand_id)
                        .collect(),
                }),
                true,
            ),
            Op::ExtInst => {
                let set = self.id_at(inst, 0)?;
                let number = self.lit32_at(inst, 1)?;
                let args = inst.operands[2..]
                    .iter()
                    .filter_map(operand_lit32)
                    .collect();
                (ValueKind::Inst(Inst::ExtInst { set, number, args }), true)
            }
            Op::ControlBarrier => {
                let semantics = self.constant_u64(self.id_at(inst, 2)?)? as u32;
                (ValueKind::Inst(Inst::ControlBarrier { semantics }), true)
            }
            Op::MemoryBarrier => {
                let semantics = self.constant_u64(self.id_at(inst, 1)?)? as u32;
                (ValueKind::Inst(Inst::MemoryBarrier { semantics }), true)
            }
            _ if is_atomic_op(op) => {
                let ptr = self.id_at(inst, 0)?;
                // ptr, scope, semantics (x2 for compare-exchange), values...
                let skip = match op {
                    Op::AtomicCompareExchange | Op::AtomicCompareExchangeWeak => 4,
                    _ => 3,
                };
                let operands = inst.operands[skip.min(inst.operands.len())..]
                    .iter()
                    .filter_map(operand_id)
                    .collect();
                (ValueKind::Inst(Inst::Atomic { op, ptr, operands }), true)
            }
            _ if is_unary_op(op) => (
                ValueKind::Inst(Inst::Unary {
                    op,
                    operand: self.id_at(inst, 0)?,
                }),
                true,
            ),
            _ if is_binary_op(op) => (
                ValueKind::Inst(Inst::Binary {
                    op,
                    a: self.id_at(inst, 0)?,
                    b: self.id_at(inst, 1)?,
                }),
                true,
            ),
            other => (
                ValueKind::Inst(Inst::Other {
                    op: other,
                    operands: inst.operands.iter().filter_map(operand_id).collect(),
                }),
                true,
            ),
        };
        Ok((value(kind), listed))
    }

    fn memory_access(&self, inst: &dr::Instruction, index: usize) -> MemoryAccess {
        let mut access = MemoryAccess::default();
        if let Some(dr::Operand::MemoryAccess(ma)) = inst.operands.get(index) {
            access.volatile = ma.contains(spirv::MemoryAccess::VOLATILE);
            if ma.contains(spirv::MemoryAccess::ALIGNED) {
                if let Some(dr::Operand::LiteralBit32(a)) = inst.operands.get(index + 1) {
                    access.alignment = *a;
                }
            }
        }
        access
    }
}

fn normalize_version(ver: u32) -> (u32, u32) {
    if ver >= 100_000 {
        (ver / 100_000, (ver % 100_000) / 1_000)
    } else {
        (ver / 10, ver % 10)
    }
}

fn is_atomic_op(op: Op) -> bool {
    matches!(
        op,
        Op::AtomicLoad
            | Op::AtomicStore
            | Op::AtomicExchange
            | Op::AtomicCompareExchange
            | Op::AtomicCompareExchangeWeak
            | Op::AtomicIIncrement
            | Op::AtomicIDecrement
            | Op::AtomicIAdd
            | Op::AtomicISub
            | Op::AtomicSMin
            | Op::AtomicUMin
            | Op::AtomicSMax
            | Op::AtomicUMax
            | Op::AtomicAnd
            | Op::AtomicOr
            | Op::AtomicXor
    )
}

fn is_unary_op(op: Op) -> bool {
    matches!(
        op,
        Op::SNegate
            | Op::FNegate
            | Op::Not
            | Op::LogicalNot
            | Op::ConvertFToU
            | Op::ConvertFToS
            | Op::ConvertSToF
            | Op::ConvertUToF
            | Op::UConvert
            | Op::SConvert
            | Op::FConvert
            | Op::SatConvertSToU
            | Op::SatConvertUToS
            | Op::ConvertPtrToU
            | Op::ConvertUToPtr
            | Op::PtrCastToGeneric
            | Op::GenericCastToPtr
            | Op::Bitcast
            | Op::IsNan
            | Op::IsInf
            | Op::IsFinite
            | Op::IsNormal
            | Op::SignBitSet
            | Op::Any
            | Op::All
    )
}

fn is_binary_op(op: Op) -> bool {
    matches!(
        op,
        Op::IAdd
            | Op::ISub
            | Op::IMul
            | Op::SDiv
            | Op::UDiv
            | Op::SRem
            | Op::UMod
            | Op::FAdd
            | Op::FSub
            | Op::FMul
            | Op::FDiv
            | Op::FRem
            | Op::ShiftLeftLogical
            | Op::ShiftRightLogical
            | Op::ShiftRightArithmetic
            | Op::BitwiseAnd
            | Op::BitwiseOr
            | Op::BitwiseXor
            | Op::LogicalAnd
            | Op::LogicalOr
            | Op::LogicalEqual
            | Op::LogicalNotEqual
            | Op::IEqual
            | Op::INotEqual
            | Op::UGreaterThan
            | Op::UGreaterThanEqual
            | Op::ULessThan
            | Op::ULessThanEqual
            | Op::SGreaterThan
            | Op::SGreaterThanEqual
            | Op::SLessThan
            | Op::SLessThanEqual
            | Op::FOrdEqual
            | Op::FOrdNotEqual
            | Op::FOrdLessThan
            | Op::FOrdLessThanEqual
            | Op::FOrdGreaterThan
            | Op::FOrdGreaterThanEqual
            | Op::FUnordEqual
            | Op::FUnordNotEqual
            | Op::FUnordLessThan
            | Op::FUnordLessThanEqual
            | Op::FUnordGreaterThan
            | Op::FUnordGreaterThanEqual
            | Op::LessOrGreater
            | Op::Ordered
            | Op::Unordered
            | Op::Dot
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(op: u16, count: u16) -> u32 {
        (u32::from(count) << 16) | u32::from(op)
    }

    /// Hand-assembles a minimal Physical64 kernel module:
    /// `kernel void foo() {}`.
    fn empty_kernel_words() -> Vec<u32> {
        let mut w = vec![
            0x0723_0203, // magic
            0x0001_0000, // version 1.0
            0,           // generator
            5,           // bound
            0,           // schema
        ];
        // OpCapability Addresses
        w.extend([word(17, 2), 4]);
        // OpCapability Kernel
        w.extend([word(17, 2), 6]);
        // OpMemoryModel Physical64 OpenCL
        w.extend([word(14, 3), 2, 2]);
        // OpEntryPoint Kernel %3 "foo"
        w.extend([word(15, 4), 6, 3, 0x006F_6F66]);
        // OpTypeVoid %1
        w.extend([word(19, 2), 1]);
        // OpTypeFunction %2 %1
        w.extend([word(33, 3), 2, 1]);
        // OpFunction %1 %3 None %2
        w.extend([word(54, 5), 1, 3, 0, 2]);
        // OpLabel %4
        w.extend([word(248, 2), 4]);
        // OpReturn
        w.extend([word(253, 1)]);
        // OpFunctionEnd
        w.extend([word(56, 1)]);
        w
    }

    #[test]
    fn decode_empty_kernel() {
        let module = decode_words(&empty_kernel_words()).expect("should decode");
        assert_eq!(
            module.addressing_model,
            spirv::AddressingModel::Physical64
        );
        assert_eq!(module.functions.len(), 1);
        let f = &module.functions[0];
        assert_eq!(f.name, "foo");
        assert_eq!(f.blocks.len(), 1);
        assert!(module.is_entry_point(f.id));
        assert!(matches!(module.type_of(1), Some(Type::Void)));
        assert!(matches!(
            module.type_of(2),
            Some(Type::Function { ret: 1, .. })
        ));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_bytes(&[1, 2, 3]).is_err());
        assert!(decode_words(&[0xDEAD_BEEF]).is_err());
    }

    #[test]
    fn decode_rejects_sampled_image_type() {
        let mut w = vec![
            0x0723_0203, // magic
            0x0001_0000, // version 1.0
            0,           // generator
            5,           // bound
            0,           // schema
        ];
        // OpCapability Kernel
        w.extend([word(17, 2), 6]);
        // OpMemoryModel Physical64 OpenCL
        w.extend([word(14, 3), 2, 2]);
        // OpTypeVoid %1
        w.extend([word(19, 2), 1]);
        // OpTypeFloat %2 32
        w.extend([word(22, 3), 2, 32]);
        // OpTypeImage %3 %2 2D 0 0 0 0 Unknown
        w.extend([word(25, 9), 3, 2, 1, 0, 0, 0, 0, 0]);
        // OpTypeSampledImage %4 %3
        w.extend([word(27, 3), 4, 3]);
        let err = decode_words(&w).unwrap_err();
        assert!(matches!(err, DecodeError::Unsupported(_)));
    }

    #[test]
    fn version_normalization() {
        assert_eq!(normalize_version(12), (1, 2));
        assert_eq!(normalize_version(20), (2, 0));
        assert_eq!(normalize_version(102_000), (1, 2));
        assert_eq!(normalize_version(200_000), (2, 0));
    }

    #[test]
    fn op_categories_disjoint() {
        for op in [Op::IAdd, Op::FOrdEqual, Op::Dot] {
            assert!(is_binary_op(op));
            assert!(!is_unary_op(op));
            assert!(!is_atomic_op(op));
        }
        for op in [Op::SNegate, Op::Bitcast, Op::IsNan] {
            assert!(is_unary_op(op));
            assert!(!is_binary_op(op));
        }
        assert!(is_atomic_op(Op::AtomicIAdd));
    }
}
