//! Function signatures, attributes and two-pass CFG lowering.

use spirlift_ir as ir;
use spirlift_spv::spirv;

use crate::constants::linkage_of;
use crate::{non_empty, FnCtx, Result, TranslateError, Translator};

fn param_attr(attr: spirv::FunctionParameterAttribute) -> Option<ir::ParamAttrs> {
    match attr {
        spirv::FunctionParameterAttribute::Zext => Some(ir::ParamAttrs::ZEXT),
        spirv::FunctionParameterAttribute::Sext => Some(ir::ParamAttrs::SEXT),
        spirv::FunctionParameterAttribute::ByVal => Some(ir::ParamAttrs::BYVAL),
        spirv::FunctionParameterAttribute::Sret => Some(ir::ParamAttrs::SRET),
        spirv::FunctionParameterAttribute::NoAlias => Some(ir::ParamAttrs::NOALIAS),
        spirv::FunctionParameterAttribute::NoCapture => Some(ir::ParamAttrs::NOCAPTURE),
        // The read/write markers have no parameter-level analog here;
        // they surface in kernel argument metadata instead.
        _ => None,
    }
}

fn function_control_attrs(control: spirv::FunctionControl) -> ir::FnAttrs {
    let mut attrs = ir::FnAttrs::EMPTY;
    if control.contains(spirv::FunctionControl::PURE) {
        attrs |= ir::FnAttrs::READNONE;
    }
    if control.contains(spirv::FunctionControl::CONST) {
        attrs |= ir::FnAttrs::READONLY;
    }
    if control.contains(spirv::FunctionControl::INLINE) {
        attrs |= ir::FnAttrs::ALWAYSINLINE;
    }
    if control.contains(spirv::FunctionControl::DONT_INLINE) {
        attrs |= ir::FnAttrs::NOINLINE;
    }
    attrs
}

impl<'a> Translator<'a> {
    /// Translates a function: signature and attributes first, then every
    /// basic block up-front, then the instructions in listed order.
    pub(crate) fn translate_function(
        &mut self,
        index: usize,
    ) -> Result<ir::Handle<ir::Function>> {
        let spv_module = self.spv;
        let sf = &spv_module.functions[index];
        if let Some(&mapped) = self.func_map.get(&sf.id) {
            return Ok(mapped);
        }

        let is_kernel = spv_module.is_entry_point(sf.id);
        let fn_ty = self.translate_type(sf.type_id)?;
        if !matches!(
            self.module.types[fn_ty].inner,
            ir::TypeInner::Function { .. }
        ) {
            return Err(TranslateError::Malformed(format!(
                "function %{} has a non-function type",
                sf.id
            )));
        }

        let mut func = ir::Function::new(sf.name.clone(), fn_ty);
        func.linkage = if is_kernel {
            ir::Linkage::External
        } else {
            linkage_of(sf.linkage)
        };
        if !func.is_intrinsic() {
            func.cconv = if is_kernel {
                ir::CallConv::SpirKernel
            } else {
                ir::CallConv::SpirFunc
            };
            func.attrs = ir::FnAttrs::NOUNWIND | function_control_attrs(sf.control);
        }

        for &pid in &sf.params {
            let pval = self.spv_value(pid)?;
            let pty = self.translate_type(self.value_type_id(pval)?)?;
            let mut attrs = ir::ParamAttrs::EMPTY;
            for &a in &pval.decorations.func_param_attrs {
                if let Some(mapped) = param_attr(a) {
                    attrs |= mapped;
                }
            }
            func.params.push(ir::Parameter {
                name: non_empty(&pval.name),
                ty: pty,
                attrs,
            });
        }
        // Return-value attributes live on the function id itself.
        if let Some(fval) = spv_module.value(sf.id) {
            for &a in &fval.decorations.func_param_attrs {
                if let Some(mapped) = param_attr(a) {
                    func.ret_attrs |= mapped;
                }
            }
        }

        let handle = self.module.functions.append(func);
        self.map_function(sf.id, handle);
        self.map_value(sf.id, ir::Value::Func(handle))?;

        if sf.blocks.is_empty() {
            return Ok(handle);
        }

        // First pass: materialize every block so cross-block branches and
        // phis resolve without placeholders.
        let mut fctx = FnCtx {
            func: handle,
            block_map: Default::default(),
        };
        for block in &sf.blocks {
            let label_name = spv_module
                .value(block.label)
                .map(|v| v.name.clone())
                .unwrap_or_default();
            let bb = self.module.functions[handle].append_block(non_empty(&label_name));
            fctx.block_map.insert(block.label, bb);
        }
        self.fn_stack.push(fctx);

        for (i, &pid) in sf.params.iter().enumerate() {
            self.map_value(pid, ir::Value::Arg(i as u32))?;
        }

        // Second pass: instructions in listed order, placeholders off so
        // real definitions replace any outstanding forward references.
        let result: Result<()> = (|| {
            for block in &sf.blocks {
                let bb = self.cur_fctx()?.block_map[&block.label];
                for &inst_id in &block.insts {
                    self.translate_value(inst_id, Some(bb), false)?;
                }
            }
            Ok(())
        })();
        self.fn_stack.pop();
        result?;

        // Once the outermost function finishes, every forward reference
        // must have met its definition.
        if self.fn_stack.is_empty() && !self.placeholder_map.is_empty() {
            return Err(TranslateError::Malformed(format!(
                "unresolved forward references in function {}",
                sf.name
            )));
        }

        log::debug!(
            "translated function {} ({} blocks)",
            sf.name,
            sf.blocks.len()
        );
        Ok(handle)
    }

    /// Resolves a label id to the block created in the first pass.
    pub(crate) fn block_of_label(
        &self,
        label: spirlift_spv::Id,
    ) -> Result<ir::Handle<ir::BasicBlock>> {
        self.cur_fctx()?
            .block_map
            .get(&label)
            .copied()
            .ok_or_else(|| TranslateError::Malformed(format!("unknown label %{label}")))
    }
}
