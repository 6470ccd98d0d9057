//! Builtin-variable demotion: loads of builtin input globals become calls
//! to the `get_global_id` family.

use spirlift_ir as ir;
use spirlift_spv::spirv;

use crate::{Result, TranslateError, Translator};

/// The OpenCL builtin behind a SPIR-V builtin input variable.
pub(crate) fn builtin_variable_fn_name(kind: spirv::BuiltIn) -> Result<&'static str> {
    Ok(match kind {
        spirv::BuiltIn::GlobalInvocationId => "get_global_id",
        spirv::BuiltIn::GlobalSize => "get_global_size",
        spirv::BuiltIn::GlobalOffset => "get_global_offset",
        spirv::BuiltIn::LocalInvocationId => "get_local_id",
        spirv::BuiltIn::WorkgroupSize => "get_local_size",
        spirv::BuiltIn::NumWorkgroups => "get_num_groups",
        spirv::BuiltIn::WorkgroupId => "get_group_id",
        spirv::BuiltIn::WorkDim => "get_work_dim",
        other => {
            return Err(TranslateError::Unsupported(format!(
                "builtin variable {other:?}"
            )))
        }
    })
}

impl<'a> Translator<'a> {
    /// Rewrites every registered builtin global and detaches it.
    pub(crate) fn demote_builtin_variables(&mut self) -> Result<()> {
        let worklist = std::mem::take(&mut self.builtin_gv_map);
        for (gv, kind) in worklist {
            self.demote_builtin_variable(gv, kind)?;
            self.module.globals.remove(gv);
        }
        Ok(())
    }

    fn demote_builtin_variable(
        &mut self,
        gv: ir::Handle<ir::GlobalVariable>,
        kind: spirv::BuiltIn,
    ) -> Result<()> {
        let name = builtin_variable_fn_name(kind)?;
        let value_ty = self.module.globals[gv].ty;
        // A vector builtin takes the dimension index; a scalar one takes
        // no arguments.
        let (ret_ty, takes_dim) = match self.module.types[value_ty].inner {
            ir::TypeInner::Vector { elem, .. } => (elem, true),
            _ => (value_ty, false),
        };
        let params = if takes_dim {
            vec![self.module.int_type(32)]
        } else {
            Vec::new()
        };
        let symbol = self.mangle_builtin(name, &params)?;
        let callee = self.get_or_declare_builtin(
            &symbol,
            ret_ty,
            params,
            false,
            ir::FnAttrs::READNONE,
        );
        let (cconv, attrs) = self.callsite_of(callee);
        log::debug!("demoting builtin variable {kind:?} to {symbol}");

        let handles: Vec<_> = self.module.functions.iter().map(|(h, _)| h).collect();
        for fh in handles {
            self.demote_in_function(fh, gv, callee, takes_dim, ret_ty, cconv, attrs)?;
        }
        Ok(())
    }

    fn demote_in_function(
        &mut self,
        fh: ir::Handle<ir::Function>,
        gv: ir::Handle<ir::GlobalVariable>,
        callee: ir::Handle<ir::Function>,
        takes_dim: bool,
        ret_ty: ir::Handle<ir::Type>,
        cconv: ir::CallConv,
        attrs: ir::FnAttrs,
    ) -> Result<()> {
        let loads: Vec<_> = self.module.functions[fh]
            .insts
            .iter()
            .filter(|(_, inst)| {
                matches!(
                    inst.kind,
                    ir::InstKind::Load {
                        ptr: ir::Value::Global(g),
                        ..
                    } if g == gv
                )
            })
            .map(|(h, _)| h)
            .collect();

        for load in loads {
            if !takes_dim {
                let func = &mut self.module.functions[fh];
                let name = func.insts[load].name.clone();
                let bb = func.block_of(load).ok_or_else(|| {
                    TranslateError::Malformed("builtin load outside any block".into())
                })?;
                let call = func.insert_inst_before(
                    bb,
                    load,
                    ir::Instruction {
                        name,
                        ty: ret_ty,
                        kind: ir::InstKind::Call {
                            callee,
                            args: Vec::new(),
                            cconv,
                            attrs,
                        },
                    },
                );
                func.replace_all_uses(ir::Value::Inst(load), ir::Value::Inst(call));
                func.detach_inst(load);
                continue;
            }

            // Vector form: every use of the load must be an extractelement
            // whose index becomes the call argument.
            let extracts: Vec<_> = self.module.functions[fh]
                .insts
                .iter()
                .filter_map(|(h, inst)| match inst.kind {
                    ir::InstKind::ExtractElement { vector, index }
                        if vector == ir::Value::Inst(load) =>
                    {
                        Some((h, index))
                    }
                    _ => None,
                })
                .collect();
            let mut use_count = 0usize;
            for (_, inst) in self.module.functions[fh].insts.iter() {
                inst.kind.for_each_operand(|v| {
                    if v == ir::Value::Inst(load) {
                        use_count += 1;
                    }
                });
            }
            if use_count != extracts.len() {
                return Err(TranslateError::Malformed(
                    "builtin variable load has a use that is not an extractelement".into(),
                ));
            }

            for (ee, index) in extracts {
                let func = &mut self.module.functions[fh];
                let name = func.insts[ee].name.clone();
                let bb = func.block_of(ee).ok_or_else(|| {
                    TranslateError::Malformed("extractelement outside any block".into())
                })?;
                let call = func.insert_inst_before(
                    bb,
                    ee,
                    ir::Instruction {
                        name,
                        ty: ret_ty,
                        kind: ir::InstKind::Call {
                            callee,
                            args: vec![index],
                            cconv,
                            attrs,
                        },
                    },
                );
                func.replace_all_uses(ir::Value::Inst(ee), ir::Value::Inst(call));
                func.detach_inst(ee);
            }
            self.module.functions[fh].detach_inst(load);
        }

        // Any surviving use of the global is a pattern the demoter does
        // not understand.
        let mut stray = false;
        for (_, inst) in self.module.functions[fh].insts.iter() {
            inst.kind.for_each_operand(|v| {
                if v == ir::Value::Global(gv) {
                    stray = true;
                }
            });
        }
        if stray {
            return Err(TranslateError::Malformed(
                "unsupported use of a builtin input variable".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_name_map() {
        assert_eq!(
            builtin_variable_fn_name(spirv::BuiltIn::GlobalInvocationId).unwrap(),
            "get_global_id"
        );
        assert_eq!(
            builtin_variable_fn_name(spirv::BuiltIn::WorkDim).unwrap(),
            "get_work_dim"
        );
        assert_eq!(
            builtin_variable_fn_name(spirv::BuiltIn::NumWorkgroups).unwrap(),
            "get_num_groups"
        );
        assert!(builtin_variable_fn_name(spirv::BuiltIn::Position).is_err());
    }
}
