//! Post-processing rewrites on the emitted module: struct-returning
//! builtins gain an sret-style pointer parameter, and builtins taking a
//! function pointer are rebuilt around a block bind.

use spirlift_ir as ir;

use crate::{Result, TranslateError, Translator};

/// `__spirv_<name>_` decoration applied to block-taking builtins.
pub(crate) fn decorate_spirv_function(name: &str) -> String {
    format!("__spirv_{name}_")
}

pub(crate) fn is_spirv_decorated(name: &str) -> bool {
    name.starts_with("__spirv_") && name.ends_with('_')
}

pub(crate) fn undecorate_spirv_function(name: &str) -> &str {
    name.strip_prefix("__spirv_")
        .and_then(|n| n.strip_suffix('_'))
        .unwrap_or(name)
}

/// Strips an Itanium-mangled symbol back to its base name.
fn demangled_base(name: &str) -> &str {
    let Some(rest) = name.strip_prefix("_Z") else {
        return name;
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    let Ok(len) = digits.parse::<usize>() else {
        return name;
    };
    let tail = &rest[digits.len()..];
    tail.get(..len).unwrap_or(name)
}

/// Whether a (possibly mangled) symbol names an OpenCL builtin.
pub(crate) fn ocl_builtin_base_name(symbol: &str) -> Option<&str> {
    let base = demangled_base(symbol);
    const PREFIXES: [&str; 8] = [
        "get_",
        "atomic_",
        "convert_",
        "vload",
        "vstore",
        "ndrange_",
        "async_work_group",
        "work_group_",
    ];
    const EXACT: [&str; 20] = [
        "barrier",
        "mem_fence",
        "read_mem_fence",
        "write_mem_fence",
        "dot",
        "any",
        "all",
        "isnan",
        "isinf",
        "isfinite",
        "isnormal",
        "signbit",
        "islessgreater",
        "isordered",
        "isunordered",
        "enqueue_kernel",
        "enqueue_marker",
        "printf",
        "wait_group_events",
        "prefetch",
    ];
    if PREFIXES.iter().any(|p| base.starts_with(p)) || EXACT.contains(&base) {
        Some(base)
    } else {
        None
    }
}

impl<'a> Translator<'a> {
    /// Two sweeps over declared functions, §4.9.
    pub(crate) fn post_process(&mut self) -> Result<()> {
        let declarations: Vec<_> = self
            .module
            .functions
            .iter()
            .filter(|(_, f)| f.is_declaration() && !f.name.is_empty())
            .map(|(h, _)| h)
            .collect();
        for fh in declarations {
            if self.module.functions.try_get(fh).is_none() {
                continue;
            }
            let name = self.module.functions[fh].name.clone();
            let ret = self.module.return_type_of(self.module.functions[fh].ty);
            if self.module.types[ret].inner.is_struct() && ocl_builtin_base_name(&name).is_some()
            {
                log::debug!("rewriting struct-returning builtin {name}");
                self.post_process_struct_return(fh)?;
                continue;
            }
            if self.has_function_pointer_param(fh) && is_spirv_decorated(&name) {
                log::debug!("rewriting function-pointer builtin {name}");
                self.post_process_func_pointer(fh)?;
            }
        }
        Ok(())
    }

    fn has_function_pointer_param(&self, fh: ir::Handle<ir::Function>) -> bool {
        self.module.functions[fh].params.iter().any(|p| {
            match self.module.types[p.ty].inner {
                ir::TypeInner::Pointer { pointee, .. } => matches!(
                    self.module.types[pointee].inner,
                    ir::TypeInner::Function { .. }
                ),
                _ => false,
            }
        })
    }

    /// Renames the declaration with a `.old` suffix, recreates it
    /// returning void with a leading result pointer, and folds each call's
    /// consuming store into the new first argument.
    fn post_process_struct_return(&mut self, old: ir::Handle<ir::Function>) -> Result<()> {
        let name = self.module.functions[old].name.clone();
        self.module.functions[old].name = format!("{name}.old");
        let old_ty = self.module.functions[old].ty;
        let (ret, old_params) = match &self.module.types[old_ty].inner {
            ir::TypeInner::Function { ret, params, .. } => (*ret, params.clone()),
            _ => {
                return Err(TranslateError::PostProcess(format!(
                    "{name} has a non-function type"
                )))
            }
        };
        let ptr_ret = self
            .module
            .pointer_type(ret, ir::AddressSpace::PRIVATE);
        let void = self.module.void_type();
        let mut new_params = vec![ptr_ret];
        new_params.extend(old_params);
        let new_f = self.get_or_declare_builtin(&name, void, new_params, false, ir::FnAttrs::EMPTY);

        let definitions: Vec<_> = self
            .module
            .functions
            .iter()
            .filter(|(_, f)| !f.is_declaration())
            .map(|(h, _)| h)
            .collect();
        for df in definitions {
            let calls: Vec<_> = self.module.functions[df]
                .insts
                .iter()
                .filter(|(_, inst)| {
                    matches!(inst.kind, ir::InstKind::Call { callee, .. } if callee == old)
                })
                .map(|(h, _)| h)
                .collect();
            for ci in calls {
                let store = self.module.functions[df]
                    .insts
                    .iter()
                    .find(|(_, inst)| {
                        matches!(
                            inst.kind,
                            ir::InstKind::Store { value, .. } if value == ir::Value::Inst(ci)
                        )
                    })
                    .map(|(h, _)| h);
                let Some(store) = store else {
                    return Err(TranslateError::PostProcess(format!(
                        "call to struct-returning {name} has no consuming store"
                    )));
                };
                let dest = match self.module.functions[df].insts[store].kind {
                    ir::InstKind::Store { ptr, .. } => ptr,
                    _ => unreachable!(),
                };
                let mut args = match &self.module.functions[df].insts[ci].kind {
                    ir::InstKind::Call { args, .. } => args.clone(),
                    _ => unreachable!(),
                };
                args.insert(0, dest);
                let bb = self.module.functions[df].block_of(ci).ok_or_else(|| {
                    TranslateError::PostProcess("call site outside any block".into())
                })?;
                let call_name = self.module.functions[df].insts[ci].name.clone();
                let (cconv, attrs) = self.callsite_of(new_f);
                self.module.functions[df].insert_inst_before(
                    bb,
                    ci,
                    ir::Instruction {
                        name: call_name,
                        ty: void,
                        kind: ir::InstKind::Call {
                            callee: new_f,
                            args,
                            cconv,
                            attrs,
                        },
                    },
                );
                self.module.functions[df].detach_inst(store);
                self.module.functions[df].detach_inst(ci);
            }
        }
        self.module.functions.remove(old);
        Ok(())
    }

    /// Replaces the function-pointer argument with a block bind; for
    /// `enqueue_kernel` the three context operands move into the bind.
    fn post_process_func_pointer(&mut self, old: ir::Handle<ir::Function>) -> Result<()> {
        let decorated = self.module.functions[old].name.clone();
        let base = undecorate_spirv_function(&decorated).to_owned();
        let ret = self.module.return_type_of(self.module.functions[old].ty);

        let definitions: Vec<_> = self
            .module
            .functions
            .iter()
            .filter(|(_, f)| !f.is_declaration())
            .map(|(h, _)| h)
            .collect();
        for df in definitions {
            let calls: Vec<_> = self.module.functions[df]
                .insts
                .iter()
                .filter(|(_, inst)| {
                    matches!(inst.kind, ir::InstKind::Call { callee, .. } if callee == old)
                })
                .map(|(h, _)| h)
                .collect();
            for ci in calls {
                let mut args = match &self.module.functions[df].insts[ci].kind {
                    ir::InstKind::Call { args, .. } => args.clone(),
                    _ => unreachable!(),
                };
                let pos = args
                    .iter()
                    .position(|a| matches!(a, ir::Value::Func(_)))
                    .ok_or_else(|| {
                        TranslateError::PostProcess(format!(
                            "call to {decorated} has no function argument"
                        ))
                    })?;
                let invoke = match args[pos] {
                    ir::Value::Func(f) => f,
                    _ => unreachable!(),
                };
                let context = if base == "enqueue_kernel" {
                    if args.len() < pos + 4 {
                        return Err(TranslateError::PostProcess(
                            "enqueue_kernel with fewer trailing arguments than required".into(),
                        ));
                    }
                    let ctx = (args[pos + 1], args[pos + 2], args[pos + 3]);
                    args.drain(pos + 1..pos + 4);
                    Some(ctx)
                } else {
                    None
                };
                let bb = self.module.functions[df].block_of(ci).ok_or_else(|| {
                    TranslateError::PostProcess("call site outside any block".into())
                })?;
                let block = self.add_block_bind(df, bb, ci, invoke, context)?;
                args[pos] = block;

                let arg_tys: Vec<_> = args
                    .iter()
                    .map(|&a| self.value_type_in(df, a))
                    .collect();
                let new_callee =
                    self.get_or_declare_builtin(&base, ret, arg_tys, false, ir::FnAttrs::EMPTY);
                let (cconv, attrs) = self.callsite_of(new_callee);
                let call_name = self.module.functions[df].insts[ci].name.clone();
                let new_call = self.module.functions[df].insert_inst_before(
                    bb,
                    ci,
                    ir::Instruction {
                        name: call_name,
                        ty: ret,
                        kind: ir::InstKind::Call {
                            callee: new_callee,
                            args,
                            cconv,
                            attrs,
                        },
                    },
                );
                self.module.functions[df]
                    .replace_all_uses(ir::Value::Inst(ci), ir::Value::Inst(new_call));
                self.module.functions[df].detach_inst(ci);
            }
        }
        self.module.functions.remove(old);
        Ok(())
    }

    /// Emits `spir_block_bind(invoke, ctx, ctx_len, ctx_align)` ahead of
    /// `before`, returning the block value.
    fn add_block_bind(
        &mut self,
        df: ir::Handle<ir::Function>,
        bb: ir::Handle<ir::BasicBlock>,
        before: ir::Handle<ir::Instruction>,
        invoke: ir::Handle<ir::Function>,
        context: Option<(ir::Value, ir::Value, ir::Value)>,
    ) -> Result<ir::Value> {
        let void = self.module.void_type();
        let void_fn_ty = self.module.function_type(void, vec![], false);
        let void_fn_ptr = self
            .module
            .pointer_type(void_fn_ty, ir::AddressSpace::PRIVATE);
        let cast = self.module.functions[df].insert_inst_before(
            bb,
            before,
            ir::Instruction {
                name: None,
                ty: void_fn_ptr,
                kind: ir::InstKind::Cast {
                    op: ir::CastOp::BitCast,
                    value: ir::Value::Func(invoke),
                },
            },
        );

        let (ctx, ctx_len, ctx_align) = match context {
            Some(c) => c,
            None => {
                let i8_ty = self.module.int_type(8);
                let i8_ptr = self.module.pointer_type(i8_ty, ir::AddressSpace::PRIVATE);
                let null = self
                    .module
                    .constants
                    .append(ir::Constant::NullPointer { ty: i8_ptr });
                let zero = self.module.const_i32(0);
                (
                    ir::Value::Const(null),
                    ir::Value::Const(zero),
                    ir::Value::Const(zero),
                )
            }
        };
        let ctx_ty = self.value_type_in(df, ctx);
        let len_ty = self.value_type_in(df, ctx_len);
        let align_ty = self.value_type_in(df, ctx_align);
        let block_ptr = self
            .module
            .opaque_ptr_type("opencl.block", ir::AddressSpace::PRIVATE);
        let callee = self.get_or_declare_builtin(
            "spir_block_bind",
            block_ptr,
            vec![void_fn_ptr, ctx_ty, len_ty, align_ty],
            false,
            ir::FnAttrs::EMPTY,
        );
        let (cconv, attrs) = self.callsite_of(callee);
        let call = self.module.functions[df].insert_inst_before(
            bb,
            before,
            ir::Instruction {
                name: Some("block".into()),
                ty: block_ptr,
                kind: ir::InstKind::Call {
                    callee,
                    args: vec![ir::Value::Inst(cast), ctx, ctx_len, ctx_align],
                    cconv,
                    attrs,
                },
            },
        );
        Ok(ir::Value::Inst(call))
    }
}
