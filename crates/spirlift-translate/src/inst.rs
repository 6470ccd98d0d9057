//! The instruction dispatcher: one arm per SPIR-V instruction form.

use spirlift_ir as ir;
use spirlift_spv as spv;
use spirlift_spv::spirv::Op;

use crate::builtins::builtin_inst_name;
use crate::{Result, TranslateError, Translator};

fn direct_bin_op(op: Op) -> Option<ir::BinOp> {
    Some(match op {
        Op::IAdd => ir::BinOp::Add,
        Op::ISub => ir::BinOp::Sub,
        Op::IMul => ir::BinOp::Mul,
        Op::UDiv => ir::BinOp::UDiv,
        Op::SDiv => ir::BinOp::SDiv,
        Op::SRem => ir::BinOp::SRem,
        Op::UMod => ir::BinOp::URem,
        Op::FAdd => ir::BinOp::FAdd,
        Op::FSub => ir::BinOp::FSub,
        Op::FMul => ir::BinOp::FMul,
        Op::FDiv => ir::BinOp::FDiv,
        Op::FRem => ir::BinOp::FRem,
        Op::ShiftLeftLogical => ir::BinOp::Shl,
        Op::ShiftRightLogical => ir::BinOp::LShr,
        Op::ShiftRightArithmetic => ir::BinOp::AShr,
        // Logical ops on i1 fold to the bitwise forms.
        Op::BitwiseAnd | Op::LogicalAnd => ir::BinOp::And,
        Op::BitwiseOr | Op::LogicalOr => ir::BinOp::Or,
        Op::BitwiseXor | Op::LogicalNotEqual => ir::BinOp::Xor,
        _ => return None,
    })
}

fn int_predicate(op: Op) -> Option<ir::IntPredicate> {
    Some(match op {
        Op::IEqual | Op::LogicalEqual => ir::IntPredicate::Eq,
        Op::INotEqual => ir::IntPredicate::Ne,
        Op::UGreaterThan => ir::IntPredicate::Ugt,
        Op::UGreaterThanEqual => ir::IntPredicate::Uge,
        Op::ULessThan => ir::IntPredicate::Ult,
        Op::ULessThanEqual => ir::IntPredicate::Ule,
        Op::SGreaterThan => ir::IntPredicate::Sgt,
        Op::SGreaterThanEqual => ir::IntPredicate::Sge,
        Op::SLessThan => ir::IntPredicate::Slt,
        Op::SLessThanEqual => ir::IntPredicate::Sle,
        _ => return None,
    })
}

fn float_predicate(op: Op) -> Option<ir::FloatPredicate> {
    Some(match op {
        Op::FOrdEqual => ir::FloatPredicate::Oeq,
        Op::FOrdGreaterThan => ir::FloatPredicate::Ogt,
        Op::FOrdGreaterThanEqual => ir::FloatPredicate::Oge,
        Op::FOrdLessThan => ir::FloatPredicate::Olt,
        Op::FOrdLessThanEqual => ir::FloatPredicate::Ole,
        Op::FOrdNotEqual => ir::FloatPredicate::One,
        Op::FUnordEqual => ir::FloatPredicate::Ueq,
        Op::FUnordGreaterThan => ir::FloatPredicate::Ugt,
        Op::FUnordGreaterThanEqual => ir::FloatPredicate::Uge,
        Op::FUnordLessThan => ir::FloatPredicate::Ult,
        Op::FUnordLessThanEqual => ir::FloatPredicate::Ule,
        Op::FUnordNotEqual => ir::FloatPredicate::Une,
        _ => return None,
    })
}

fn is_direct_cmp(op: Op) -> bool {
    int_predicate(op).is_some() || float_predicate(op).is_some()
}

fn is_convert_op(op: Op) -> bool {
    matches!(
        op,
        Op::ConvertFToU
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
    )
}

impl<'a> Translator<'a> {
    fn result_type(&mut self, id: spv::Id) -> Result<ir::Handle<ir::Type>> {
        match self.spv_value(id)?.ty {
            Some(t) => self.translate_type(t),
            None => Ok(self.module.void_type()),
        }
    }

    fn inst_name(&self, id: spv::Id) -> String {
        self.spv
            .value(id)
            .map(|v| v.name.clone())
            .unwrap_or_default()
    }

    pub(crate) fn translate_inst(
        &mut self,
        id: spv::Id,
        inst: &spv::Inst,
        bb: Option<ir::Handle<ir::BasicBlock>>,
    ) -> Result<ir::Value> {
        let bb = bb.ok_or_else(|| {
            TranslateError::Malformed(format!("instruction %{id} translated outside a block"))
        })?;
        let name = self.inst_name(id);
        let void = self.module.void_type();

        match inst {
            spv::Inst::Branch { target } => {
                let dest = self.block_of_label(*target)?;
                let v = self.push_inst(bb, "", void, ir::InstKind::Br { dest })?;
                self.map_value(id, v)
            }
            spv::Inst::BranchConditional {
                cond,
                true_label,
                false_label,
            } => {
                let cond = self.translate_value(*cond, Some(bb), true)?;
                let then_dest = self.block_of_label(*true_label)?;
                let else_dest = self.block_of_label(*false_label)?;
                let v = self.push_inst(
                    bb,
                    "",
                    void,
                    ir::InstKind::CondBr {
                        cond,
                        then_dest,
                        else_dest,
                    },
                )?;
                self.map_value(id, v)
            }
            spv::Inst::Phi { pairs } => {
                let ty = self.result_type(id)?;
                let phi = self.push_inst(bb, &name, ty, ir::InstKind::Phi { incoming: vec![] })?;
                self.map_value(id, phi)?;
                for &(value_id, label) in pairs {
                    let incoming = self.translate_value(value_id, Some(bb), true)?;
                    let block = self.block_of_label(label)?;
                    let func = self.cur_fctx()?.func;
                    if let ir::Value::Inst(h) = phi {
                        if let ir::InstKind::Phi { incoming: list } =
                            &mut self.module.functions[func].insts[h].kind
                        {
                            list.push((incoming, block));
                        }
                    }
                }
                Ok(phi)
            }
            spv::Inst::Switch {
                selector,
                default,
                cases,
            } => {
                let value = self.translate_value(*selector, Some(bb), true)?;
                let default = self.block_of_label(*default)?;
                let cases = cases
                    .iter()
                    .map(|&(lit, label)| Ok((lit, self.block_of_label(label)?)))
                    .collect::<Result<Vec<_>>>()?;
                let v = self.push_inst(
                    bb,
                    "",
                    void,
                    ir::InstKind::Switch {
                        value,
                        default,
                        cases,
                    },
                )?;
                self.map_value(id, v)
            }
            spv::Inst::Return => {
                let v = self.push_inst(bb, "", void, ir::InstKind::Ret { value: None })?;
                self.map_value(id, v)
            }
            spv::Inst::ReturnValue { value } => {
                let value = self.translate_value(*value, Some(bb), true)?;
                let v = self.push_inst(bb, "", void, ir::InstKind::Ret { value: Some(value) })?;
                self.map_value(id, v)
            }
            spv::Inst::Load { ptr, access } => {
                let ptr = self.translate_value(*ptr, Some(bb), true)?;
                let ty = self.result_type(id)?;
                let v = self.push_inst(
                    bb,
                    &name,
                    ty,
                    ir::InstKind::Load {
                        ptr,
                        align: (access.alignment != 0).then_some(access.alignment),
                        volatile: access.volatile,
                    },
                )?;
                self.map_value(id, v)
            }
            spv::Inst::Store { ptr, value, access } => {
                let value = self.translate_value(*value, Some(bb), true)?;
                let ptr = self.translate_value(*ptr, Some(bb), true)?;
                let v = self.push_inst(
                    bb,
                    "",
                    void,
                    ir::InstKind::Store {
                        value,
                        ptr,
                        align: (access.alignment != 0).then_some(access.alignment),
                        volatile: access.volatile,
                    },
                )?;
                self.map_value(id, v)
            }
            spv::Inst::CopyMemorySized {
                target,
                source,
                size,
                access,
            } => self.translate_copy_memory_sized(id, *target, *source, *size, access, bb),
            spv::Inst::Select {
                cond,
                if_true,
                if_false,
            } => {
                let cond = self.translate_value(*cond, Some(bb), true)?;
                let if_true = self.translate_value(*if_true, Some(bb), true)?;
                let if_false = self.translate_value(*if_false, Some(bb), true)?;
                let ty = self.result_type(id)?;
                let v = self.push_inst(
                    bb,
                    &name,
                    ty,
                    ir::InstKind::Select {
                        cond,
                        if_true,
                        if_false,
                    },
                )?;
                self.map_value(id, v)
            }
            spv::Inst::AccessChain {
                base,
                indices,
                inbounds,
            } => {
                let base = self.translate_value(*base, Some(bb), true)?;
                let indices = self.translate_values(indices, Some(bb))?;
                let ty = self.result_type(id)?;
                let v = self.push_inst(
                    bb,
                    &name,
                    ty,
                    ir::InstKind::GetElementPtr {
                        base,
                        indices,
                        inbounds: *inbounds,
                    },
                )?;
                self.map_value(id, v)
            }
            spv::Inst::CompositeExtract { composite, indices } => {
                self.check_vector_composite(*composite, indices.len(), id)?;
                let vector = self.translate_value(*composite, Some(bb), true)?;
                let index = self.module.const_i32(indices[0]);
                let ty = self.result_type(id)?;
                let v = self.push_inst(
                    bb,
                    &name,
                    ty,
                    ir::InstKind::ExtractElement {
                        vector,
                        index: ir::Value::Const(index),
                    },
                )?;
                self.map_value(id, v)
            }
            spv::Inst::CompositeInsert {
                object,
                composite,
                indices,
            } => {
                self.check_vector_composite(*composite, indices.len(), id)?;
                let vector = self.translate_value(*composite, Some(bb), true)?;
                let element = self.translate_value(*object, Some(bb), true)?;
                let index = self.module.const_i32(indices[0]);
                let ty = self.result_type(id)?;
                let v = self.push_inst(
                    bb,
                    &name,
                    ty,
                    ir::InstKind::InsertElement {
                        vector,
                        element,
                        index: ir::Value::Const(index),
                    },
                )?;
                self.map_value(id, v)
            }
            spv::Inst::VectorExtractDynamic { vector, index } => {
                let vector = self.translate_value(*vector, Some(bb), true)?;
                let index = self.translate_value(*index, Some(bb), true)?;
                let ty = self.result_type(id)?;
                let v = self.push_inst(
                    bb,
                    &name,
                    ty,
                    ir::InstKind::ExtractElement { vector, index },
                )?;
                self.map_value(id, v)
            }
            spv::Inst::VectorInsertDynamic {
                vector,
                component,
                index,
            } => {
                let vector = self.translate_value(*vector, Some(bb), true)?;
                let element = self.translate_value(*component, Some(bb), true)?;
                let index = self.translate_value(*index, Some(bb), true)?;
                let ty = self.result_type(id)?;
                let v = self.push_inst(
                    bb,
                    &name,
                    ty,
                    ir::InstKind::InsertElement {
                        vector,
                        element,
                        index,
                    },
                )?;
                self.map_value(id, v)
            }
            spv::Inst::VectorShuffle { a, b, components } => {
                let a = self.translate_value(*a, Some(bb), true)?;
                let b = self.translate_value(*b, Some(bb), true)?;
                let mask = components
                    .iter()
                    .map(|&c| (c != u32::MAX).then_some(c))
                    .collect();
                let ty = self.result_type(id)?;
                let v = self.push_inst(
                    bb,
                    &name,
                    ty,
                    ir::InstKind::ShuffleVector { a, b, mask },
                )?;
                self.map_value(id, v)
            }
            spv::Inst::FunctionCall { function, args } => {
                let callee_index = match &self.spv_value(*function)?.kind {
                    spv::ValueKind::Function { function } => *function,
                    _ => {
                        return Err(TranslateError::Malformed(format!(
                            "call target %{function} is not a function"
                        )))
                    }
                };
                let callee = self.translate_function(callee_index)?;
                let args = self.translate_values(args, Some(bb))?;
                let ret = self.module.return_type_of(self.module.functions[callee].ty);
                let (cconv, attrs) = self.callsite_of(callee);
                let v = self.push_inst(
                    bb,
                    &name,
                    ret,
                    ir::InstKind::Call {
                        callee,
                        args,
                        cconv,
                        attrs,
                    },
                )?;
                self.map_value(id, v)
            }
            spv::Inst::ExtInst { set, number, args } => {
                let v = self.translate_ext_inst(id, *set, *number, args, bb)?;
                self.map_value(id, v)
            }
            spv::Inst::ControlBarrier { semantics } => {
                let v =
                    self.translate_barrier_fence(id, Op::ControlBarrier, *semantics, bb)?;
                self.map_value(id, v)
            }
            spv::Inst::MemoryBarrier { semantics } => {
                let v = self.translate_barrier_fence(id, Op::MemoryBarrier, *semantics, bb)?;
                self.map_value(id, v)
            }
            spv::Inst::Atomic { op, ptr, operands } => {
                let v = self.translate_atomic(id, *op, *ptr, operands, bb)?;
                self.map_value(id, v)
            }
            spv::Inst::Unary { op, operand } => self.translate_unary(id, *op, *operand, bb),
            spv::Inst::Binary { op, a, b } => self.translate_binary(id, *op, *a, *b, bb),
            spv::Inst::Other { op, operands } => self.translate_other(id, *op, operands, bb),
        }
    }

    fn check_vector_composite(
        &self,
        composite: spv::Id,
        index_count: usize,
        id: spv::Id,
    ) -> Result<()> {
        let ty = self.type_id_of_value(composite)?;
        if !matches!(self.spv_type(ty)?, spv::Type::Vector { .. }) {
            return Err(TranslateError::Unsupported(format!(
                "composite access %{id} on a non-vector"
            )));
        }
        if index_count != 1 {
            return Err(TranslateError::Malformed(format!(
                "composite access %{id} with {index_count} indices"
            )));
        }
        Ok(())
    }

    fn translate_unary(
        &mut self,
        id: spv::Id,
        op: Op,
        operand: spv::Id,
        bb: ir::Handle<ir::BasicBlock>,
    ) -> Result<ir::Value> {
        let name = self.inst_name(id);
        match op {
            Op::SNegate => {
                let ty = self.result_type(id)?;
                let zero = self.const_zero(ty)?;
                let value = self.translate_value(operand, Some(bb), true)?;
                let v = self.push_inst(
                    bb,
                    &name,
                    ty,
                    ir::InstKind::Binary {
                        op: ir::BinOp::Sub,
                        lhs: zero,
                        rhs: value,
                        nsw: true,
                        exact: false,
                    },
                )?;
                self.map_value(id, v)
            }
            Op::FNegate => {
                let ty = self.result_type(id)?;
                let value = self.translate_value(operand, Some(bb), true)?;
                let v = self.push_inst(bb, &name, ty, ir::InstKind::FNeg { value })?;
                self.map_value(id, v)
            }
            Op::Not | Op::LogicalNot => {
                let ty = self.result_type(id)?;
                let ones = self.const_all_ones(ty)?;
                let value = self.translate_value(operand, Some(bb), true)?;
                let v = self.push_inst(
                    bb,
                    &name,
                    ty,
                    ir::InstKind::Binary {
                        op: ir::BinOp::Xor,
                        lhs: value,
                        rhs: ones,
                        nsw: false,
                        exact: false,
                    },
                )?;
                self.map_value(id, v)
            }
            _ if builtin_inst_name(op).is_some() => {
                let builtin = builtin_inst_name(op).unwrap();
                let v = self.emit_builtin_call(id, bb, builtin, &[operand], Some(op), None)?;
                self.map_value(id, v)
            }
            _ if is_convert_op(op) => {
                let value = self.spv_value(id)?;
                let needs_builtin = value.decorations.saturated_conversion
                    || value.decorations.fp_rounding_mode.is_some()
                    || matches!(op, Op::SatConvertSToU | Op::SatConvertUToS);
                let v = if needs_builtin {
                    let builtin = self.convert_builtin_name(id, op)?;
                    self.emit_builtin_call(id, bb, &builtin, &[operand], Some(op), None)?
                } else {
                    self.translate_convert(id, op, operand, bb)?
                };
                self.map_value(id, v)
            }
            other => Err(TranslateError::Unsupported(format!(
                "unary instruction {other:?}"
            ))),
        }
    }

    fn translate_convert(
        &mut self,
        id: spv::Id,
        op: Op,
        operand: spv::Id,
        bb: ir::Handle<ir::BasicBlock>,
    ) -> Result<ir::Value> {
        let name = self.inst_name(id);
        let value = self.translate_value(operand, Some(bb), true)?;
        let dst_ty = self.result_type(id)?;
        let src_ty = self.value_type(value)?;
        let src_bits = self.module.types[src_ty]
            .inner
            .scalar_bits(&self.module.types)
            .unwrap_or(0);
        let dst_bits = self.module.types[dst_ty]
            .inner
            .scalar_bits(&self.module.types)
            .unwrap_or(0);
        let extends = dst_bits > src_bits;
        let cast_op = match op {
            Op::PtrCastToGeneric | Op::GenericCastToPtr => ir::CastOp::AddrSpaceCast,
            Op::SConvert => {
                if extends {
                    ir::CastOp::SExt
                } else {
                    ir::CastOp::Trunc
                }
            }
            Op::UConvert => {
                if extends {
                    ir::CastOp::ZExt
                } else {
                    ir::CastOp::Trunc
                }
            }
            Op::FConvert => {
                if extends {
                    ir::CastOp::FPExt
                } else {
                    ir::CastOp::FPTrunc
                }
            }
            Op::ConvertFToU => ir::CastOp::FPToUI,
            Op::ConvertFToS => ir::CastOp::FPToSI,
            Op::ConvertUToF => ir::CastOp::UIToFP,
            Op::ConvertSToF => ir::CastOp::SIToFP,
            Op::ConvertPtrToU => ir::CastOp::PtrToInt,
            Op::ConvertUToPtr => ir::CastOp::IntToPtr,
            Op::Bitcast => ir::CastOp::BitCast,
            other => {
                return Err(TranslateError::Unsupported(format!(
                    "conversion {other:?}"
                )))
            }
        };
        self.push_inst(bb, &name, dst_ty, ir::InstKind::Cast { op: cast_op, value })
    }

    fn translate_binary(
        &mut self,
        id: spv::Id,
        op: Op,
        a: spv::Id,
        b: spv::Id,
        bb: ir::Handle<ir::BasicBlock>,
    ) -> Result<ir::Value> {
        let name = self.inst_name(id);
        if let Some(bin) = direct_bin_op(op) {
            let lhs = self.translate_value(a, Some(bb), true)?;
            let rhs = self.translate_value(b, Some(bb), true)?;
            let ty = self.result_type(id)?;
            let v = self.push_inst(
                bb,
                &name,
                ty,
                ir::InstKind::Binary {
                    op: bin,
                    lhs,
                    rhs,
                    nsw: false,
                    exact: false,
                },
            )?;
            return self.map_value(id, v);
        }
        if is_direct_cmp(op) {
            let v = self.translate_cmp(id, op, a, b, bb)?;
            return self.map_value(id, v);
        }
        if let Some(builtin) = builtin_inst_name(op) {
            let v = self.emit_builtin_call(id, bb, builtin, &[a, b], Some(op), None)?;
            return self.map_value(id, v);
        }
        Err(TranslateError::Unsupported(format!(
            "binary instruction {op:?}"
        )))
    }

    /// Direct comparisons. Pointer-typed operands take the integer
    /// predicate family.
    fn translate_cmp(
        &mut self,
        id: spv::Id,
        op: Op,
        a: spv::Id,
        b: spv::Id,
        bb: ir::Handle<ir::BasicBlock>,
    ) -> Result<ir::Value> {
        let name = self.inst_name(id);
        let operand_ty = self.type_id_of_value(a)?;
        let base = match self.spv_type(operand_ty)? {
            spv::Type::Vector { elem, .. } => self.spv_type(*elem)?,
            other => other,
        };
        let lhs = self.translate_value(a, Some(bb), true)?;
        let rhs = self.translate_value(b, Some(bb), true)?;
        let ty = self.result_type(id)?;
        match base {
            spv::Type::Int { .. } | spv::Type::Bool | spv::Type::Pointer { .. } => {
                let pred = int_predicate(op).ok_or_else(|| {
                    TranslateError::Malformed(format!("{op:?} is not an integer compare"))
                })?;
                self.push_inst(bb, &name, ty, ir::InstKind::ICmp { pred, lhs, rhs })
            }
            spv::Type::Float { .. } => {
                let pred = float_predicate(op).ok_or_else(|| {
                    TranslateError::Malformed(format!("{op:?} is not a float compare"))
                })?;
                self.push_inst(bb, &name, ty, ir::InstKind::FCmp { pred, lhs, rhs })
            }
            _ => Err(TranslateError::Malformed(format!(
                "compare %{id} without integer, float or pointer operands"
            ))),
        }
    }

    /// `OpCopyMemorySized` lowers to an `llvm.memcpy` intrinsic call whose
    /// suffix encodes the two address spaces and the size width.
    fn translate_copy_memory_sized(
        &mut self,
        id: spv::Id,
        target: spv::Id,
        source: spv::Id,
        size: spv::Id,
        access: &spv::MemoryAccess,
        bb: ir::Handle<ir::BasicBlock>,
    ) -> Result<ir::Value> {
        let private_suffix = |storage| match crate::types::addr_space(storage) {
            Ok(space) if space == ir::AddressSpace::PRIVATE => "p0i8",
            _ => "p1i8",
        };
        let dst_storage = match self.spv_type(self.type_id_of_value(target)?)? {
            spv::Type::Pointer { storage, .. } => *storage,
            _ => return Err(TranslateError::Malformed("memcpy target is not a pointer".into())),
        };
        let src_storage = match self.spv_type(self.type_id_of_value(source)?)? {
            spv::Type::Pointer { storage, .. } => *storage,
            _ => return Err(TranslateError::Malformed("memcpy source is not a pointer".into())),
        };
        let size_bits = match self.spv_type(self.type_id_of_value(size)?)? {
            spv::Type::Int { width, .. } => *width,
            _ => return Err(TranslateError::Malformed("memcpy size is not an integer".into())),
        };
        let symbol = format!(
            "llvm.memcpy.{}.{}.{}",
            private_suffix(dst_storage),
            private_suffix(src_storage),
            if size_bits == 32 { "i32" } else { "i64" }
        );

        let dst_ty = self.translate_type(self.type_id_of_value(target)?)?;
        let src_ty = self.translate_type(self.type_id_of_value(source)?)?;
        let size_ty = self.translate_type(self.type_id_of_value(size)?)?;
        let i32_ty = self.module.int_type(32);
        let i1_ty = self.module.int_type(1);
        let void = self.module.void_type();
        let callee = self.get_or_declare_builtin(
            &symbol,
            void,
            vec![dst_ty, src_ty, size_ty, i32_ty, i1_ty],
            false,
            ir::FnAttrs::EMPTY,
        );

        let dst = self.translate_value(target, Some(bb), true)?;
        let src = self.translate_value(source, Some(bb), true)?;
        let size = self.translate_value(size, Some(bb), true)?;
        let align = self.module.const_i32(access.alignment);
        let volatile = self.module.const_bool(access.volatile);
        let (cconv, attrs) = self.callsite_of(callee);
        let v = self.push_inst(
            bb,
            "",
            void,
            ir::InstKind::Call {
                callee,
                args: vec![
                    dst,
                    src,
                    size,
                    ir::Value::Const(align),
                    ir::Value::Const(volatile),
                ],
                cconv,
                attrs,
            },
        )?;
        self.map_value(id, v)
    }

    fn translate_other(
        &mut self,
        id: spv::Id,
        op: Op,
        operands: &[spv::Id],
        bb: ir::Handle<ir::BasicBlock>,
    ) -> Result<ir::Value> {
        if op == Op::BuildNDRange {
            let first = operands.first().ok_or_else(|| {
                TranslateError::Malformed("ndrange without operands".into())
            })?;
            let dim = match self.spv_type(self.type_id_of_value(*first)?)? {
                spv::Type::Vector { count, .. } => *count,
                _ => 1,
            };
            let builtin = format!("ndrange_{dim}D");
            let v = self.emit_builtin_call(id, bb, &builtin, operands, Some(op), None)?;
            return self.map_value(id, v);
        }
        if let Some(builtin) = builtin_inst_name(op) {
            let v = self.emit_builtin_call(id, bb, builtin, operands, Some(op), None)?;
            return self.map_value(id, v);
        }
        Err(TranslateError::Unsupported(format!("instruction {op:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_op_map() {
        assert_eq!(direct_bin_op(Op::IAdd), Some(ir::BinOp::Add));
        assert_eq!(direct_bin_op(Op::UMod), Some(ir::BinOp::URem));
        assert_eq!(direct_bin_op(Op::LogicalAnd), Some(ir::BinOp::And));
        assert_eq!(direct_bin_op(Op::ShiftRightArithmetic), Some(ir::BinOp::AShr));
        assert_eq!(direct_bin_op(Op::Dot), None);
    }

    #[test]
    fn predicate_maps() {
        assert_eq!(int_predicate(Op::SLessThan), Some(ir::IntPredicate::Slt));
        assert_eq!(int_predicate(Op::UGreaterThan), Some(ir::IntPredicate::Ugt));
        assert_eq!(float_predicate(Op::FOrdNotEqual), Some(ir::FloatPredicate::One));
        assert_eq!(float_predicate(Op::FUnordLessThan), Some(ir::FloatPredicate::Ult));
        assert!(!is_direct_cmp(Op::LessOrGreater));
        assert!(!is_direct_cmp(Op::Ordered));
    }

    #[test]
    fn convert_classification() {
        assert!(is_convert_op(Op::Bitcast));
        assert!(is_convert_op(Op::SatConvertUToS));
        assert!(!is_convert_op(Op::IAdd));
    }
}
