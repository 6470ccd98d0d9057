//! Builtin-call emission: naming, declaration, mangling, call-site setup.
//!
//! Every external builtin call — extended instructions, atomics, barriers,
//! demoted builtin variables, conversion builtins — funnels through
//! [`Translator::emit_builtin_call`] or its bespoke siblings here.

use spirlift_ir as ir;
use spirlift_spv as spv;
use spirlift_spv::spirv;

use crate::mangle::{mangle, MangleType, Primitive};
use crate::{Result, TranslateError, Translator};

/// OpenCL.std extended-instruction number for `printf` (not mangled).
pub(crate) const EXT_INST_PRINTF: u32 = 184;

/// Static table from OpenCL.std instruction number to the unmangled
/// OpenCL builtin name. Signed/unsigned pairs collapse onto one name;
/// signedness is recovered from the argument types during mangling.
pub(crate) fn ext_inst_name(number: u32) -> Option<&'static str> {
    Some(match number {
        0 => "acos",
        1 => "acosh",
        2 => "acospi",
        3 => "asin",
        4 => "asinh",
        5 => "asinpi",
        6 => "atan",
        7 => "atan2",
        8 => "atanh",
        9 => "atanpi",
        10 => "atan2pi",
        11 => "cbrt",
        12 => "ceil",
        13 => "copysign",
        14 => "cos",
        15 => "cosh",
        16 => "cospi",
        17 => "erfc",
        18 => "erf",
        19 => "exp",
        20 => "exp2",
        21 => "exp10",
        22 => "expm1",
        23 => "fabs",
        24 => "fdim",
        25 => "floor",
        26 => "fma",
        27 => "fmax",
        28 => "fmin",
        29 => "fmod",
        30 => "fract",
        31 => "frexp",
        32 => "hypot",
        33 => "ilogb",
        34 => "ldexp",
        35 => "lgamma",
        36 => "lgamma_r",
        37 => "log",
        38 => "log2",
        39 => "log10",
        40 => "log1p",
        41 => "logb",
        42 => "mad",
        43 => "maxmag",
        44 => "minmag",
        45 => "modf",
        46 => "nan",
        47 => "nextafter",
        48 => "pow",
        49 => "pown",
        50 => "powr",
        51 => "remainder",
        52 => "remquo",
        53 => "rint",
        54 => "rootn",
        55 => "round",
        56 => "rsqrt",
        57 => "sin",
        58 => "sincos",
        59 => "sinh",
        60 => "sinpi",
        61 => "sqrt",
        62 => "tan",
        63 => "tanh",
        64 => "tanpi",
        65 => "tgamma",
        66 => "trunc",
        67 => "half_cos",
        68 => "half_divide",
        69 => "half_exp",
        70 => "half_exp2",
        71 => "half_exp10",
        72 => "half_log",
        73 => "half_log2",
        74 => "half_log10",
        75 => "half_powr",
        76 => "half_recip",
        77 => "half_rsqrt",
        78 => "half_sin",
        79 => "half_sqrt",
        80 => "half_tan",
        81 => "native_cos",
        82 => "native_divide",
        83 => "native_exp",
        84 => "native_exp2",
        85 => "native_exp10",
        86 => "native_log",
        87 => "native_log2",
        88 => "native_log10",
        89 => "native_powr",
        90 => "native_recip",
        91 => "native_rsqrt",
        92 => "native_sin",
        93 => "native_sqrt",
        94 => "native_tan",
        95 => "clamp",
        96 => "degrees",
        97 => "max",
        98 => "min",
        99 => "mix",
        100 => "radians",
        101 => "step",
        102 => "smoothstep",
        103 => "sign",
        104 => "cross",
        105 => "distance",
        106 => "length",
        107 => "normalize",
        108 => "fast_distance",
        109 => "fast_length",
        110 => "fast_normalize",
        141 => "abs",
        142 => "abs_diff",
        143 | 144 => "add_sat",
        145 | 146 => "hadd",
        147 | 148 => "rhadd",
        149 | 150 => "clamp",
        151 => "clz",
        152 => "ctz",
        153 => "mad_hi",
        154 | 155 => "mad_sat",
        156 | 157 => "max",
        158 | 159 => "min",
        160 => "mul_hi",
        161 => "rotate",
        162 | 163 => "sub_sat",
        164 | 165 => "upsample",
        166 => "popcount",
        167 | 168 => "mad24",
        169 | 170 => "mul24",
        171 => "vloadn",
        172 => "vstoren",
        173 => "vload_half",
        174 => "vload_halfn",
        175 => "vstore_half",
        176 => "vstore_half_r",
        177 => "vstore_halfn",
        178 => "vstore_halfn_r",
        179 => "vloada_halfn",
        180 => "vstorea_halfn",
        181 => "vstorea_halfn_r",
        182 => "shuffle",
        183 => "shuffle2",
        184 => "printf",
        185 => "prefetch",
        186 => "bitselect",
        187 => "select",
        201 => "abs",
        202 => "abs_diff",
        203 => "mul_hi",
        204 => "mad_hi",
        _ => return None,
    })
}

/// Core instructions that lower to a builtin call, by canonical name.
pub(crate) fn builtin_inst_name(op: spirv::Op) -> Option<&'static str> {
    use spirv::Op;
    Some(match op {
        Op::AtomicExchange => "atomic_xchg",
        Op::AtomicCompareExchange | Op::AtomicCompareExchangeWeak => "atomic_cmpxchg",
        Op::AtomicIIncrement => "atomic_inc",
        Op::AtomicIDecrement => "atomic_dec",
        Op::AtomicIAdd => "atomic_add",
        Op::AtomicISub => "atomic_sub",
        Op::AtomicSMin | Op::AtomicUMin => "atomic_min",
        Op::AtomicSMax | Op::AtomicUMax => "atomic_max",
        Op::AtomicAnd => "atomic_and",
        Op::AtomicOr => "atomic_or",
        Op::AtomicXor => "atomic_xor",
        Op::Dot => "dot",
        Op::Any => "any",
        Op::All => "all",
        Op::IsNan => "isnan",
        Op::IsInf => "isinf",
        Op::IsFinite => "isfinite",
        Op::IsNormal => "isnormal",
        Op::SignBitSet => "signbit",
        Op::LessOrGreater => "islessgreater",
        Op::Ordered => "isordered",
        Op::Unordered => "isunordered",
        Op::EnqueueKernel => "enqueue_kernel",
        Op::EnqueueMarker => "enqueue_marker",
        Op::RetainEvent => "retain_event",
        Op::ReleaseEvent => "release_event",
        Op::CreateUserEvent => "create_user_event",
        Op::IsValidEvent => "is_valid_event",
        Op::SetUserEventStatus => "set_user_event_status",
        Op::CaptureEventProfilingInfo => "capture_event_profiling_info",
        Op::GetDefaultQueue => "get_default_queue",
        Op::GetKernelWorkGroupSize => "get_kernel_work_group_size",
        Op::GetKernelPreferredWorkGroupSizeMultiple => {
            "get_kernel_preferred_work_group_size_multiple"
        }
        Op::ReadPipe => "read_pipe",
        Op::WritePipe => "write_pipe",
        Op::GroupWaitEvents => "wait_group_events",
        _ => return None,
    })
}

/// Compare-family opcodes: their SPIR-V bool result widens to `i32`
/// around a builtin call.
pub(crate) fn is_cmp_op(op: spirv::Op) -> bool {
    use spirv::Op;
    matches!(
        op,
        Op::IsNan
            | Op::IsInf
            | Op::IsFinite
            | Op::IsNormal
            | Op::SignBitSet
            | Op::LessOrGreater
            | Op::Ordered
            | Op::Unordered
    )
}

/// SPIR-V memory-semantics bits → OpenCL `CLK_*_MEM_FENCE` flag bits.
pub(crate) fn mem_fence_flags(semantics: u32) -> u32 {
    let mut flags = 0;
    if semantics & 0x100 != 0 {
        flags |= 1; // CLK_LOCAL_MEM_FENCE
    }
    if semantics & 0x200 != 0 {
        flags |= 2; // CLK_GLOBAL_MEM_FENCE
    }
    if semantics & 0x800 != 0 {
        flags |= 4; // CLK_IMAGE_MEM_FENCE
    }
    flags
}

pub(crate) fn rounding_suffix(mode: spirv::FPRoundingMode) -> &'static str {
    match mode {
        spirv::FPRoundingMode::RTE => "rte",
        spirv::FPRoundingMode::RTZ => "rtz",
        spirv::FPRoundingMode::RTP => "rtp",
        spirv::FPRoundingMode::RTN => "rtn",
    }
}

fn rounding_suffix_literal(mode: u32) -> Result<&'static str> {
    Ok(match mode {
        0 => "rte",
        1 => "rtz",
        2 => "rtp",
        3 => "rtn",
        other => {
            return Err(TranslateError::Malformed(format!(
                "invalid rounding mode literal {other}"
            )))
        }
    })
}

/// Which arguments mangle as unsigned for a given builtin name.
enum UnsignedHints {
    None,
    All,
    Args(&'static [usize]),
}

impl UnsignedHints {
    fn is_unsigned(&self, index: usize) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::Args(list) => list.contains(&index),
        }
    }
}

fn unsigned_arg_hints(name: &str) -> UnsignedHints {
    if name.starts_with("get_")
        || name.starts_with("uconvert")
        || matches!(
            name,
            "barrier" | "mem_fence" | "read_mem_fence" | "write_mem_fence"
        )
    {
        UnsignedHints::All
    } else if name.starts_with("vload") {
        UnsignedHints::Args(&[0])
    } else if name.starts_with("vstore") {
        UnsignedHints::Args(&[1])
    } else {
        UnsignedHints::None
    }
}

/// Strips an `opencl.*` struct name down to its mangled source name:
/// `opencl.image2d_t__read_only` → `ocl_image2d`.
fn ocl_source_name(name: &str) -> String {
    let base = name.strip_prefix("opencl.").unwrap_or(name);
    let base = base.split("__").next().unwrap_or(base);
    let base = base.strip_suffix("_t").unwrap_or(base);
    format!("ocl_{base}")
}

impl<'a> Translator<'a> {
    /// Builds a mangling descriptor for a lowered type.
    pub(crate) fn mangle_type_of(
        &self,
        ty: ir::Handle<ir::Type>,
        unsigned: bool,
    ) -> Result<MangleType> {
        let t = &self.module.types[ty];
        Ok(match &t.inner {
            ir::TypeInner::Void => MangleType::Primitive(Primitive::Void),
            ir::TypeInner::Int { bits } => {
                MangleType::Primitive(int_primitive(*bits, unsigned)?)
            }
            ir::TypeInner::Float { bits } => MangleType::Primitive(match bits {
                16 => Primitive::Half,
                32 => Primitive::Float,
                64 => Primitive::Double,
                other => return Err(TranslateError::InvalidFloatWidth(*other)),
            }),
            ir::TypeInner::Vector { elem, count } => {
                let prim = match self.mangle_type_of(*elem, unsigned)? {
                    MangleType::Primitive(p) => p,
                    _ => {
                        return Err(TranslateError::Malformed(
                            "vector of non-scalar in mangling".into(),
                        ))
                    }
                };
                MangleType::Vector {
                    elem: prim,
                    count: *count,
                }
            }
            ir::TypeInner::Pointer { pointee, space } => {
                let pointee_ty = &self.module.types[*pointee];
                // OpenCL opaque handle types mangle as their source name,
                // not as pointers.
                if let (Some(name), ir::TypeInner::OpaqueStruct) =
                    (&pointee_ty.name, &pointee_ty.inner)
                {
                    if name.starts_with("opencl.") {
                        return Ok(MangleType::Primitive(Primitive::Named(ocl_source_name(
                            name,
                        ))));
                    }
                }
                MangleType::Pointer {
                    pointee: Box::new(self.mangle_type_of(*pointee, unsigned)?),
                    addr_space: space.0,
                }
            }
            ir::TypeInner::Struct { .. } | ir::TypeInner::OpaqueStruct => {
                let name = t.name.clone().unwrap_or_else(|| "anon".into());
                MangleType::Primitive(Primitive::Named(name))
            }
            ir::TypeInner::Array { .. } | ir::TypeInner::Function { .. } => {
                return Err(TranslateError::Unsupported(
                    "array or function type in builtin mangling".into(),
                ))
            }
        })
    }

    /// Mangles a builtin name against lowered argument types.
    pub(crate) fn mangle_builtin(
        &self,
        name: &str,
        arg_tys: &[ir::Handle<ir::Type>],
    ) -> Result<String> {
        let hints = unsigned_arg_hints(name);
        let descriptors = arg_tys
            .iter()
            .enumerate()
            .map(|(i, &t)| self.mangle_type_of(t, hints.is_unsigned(i)))
            .collect::<Result<Vec<_>>>()?;
        Ok(mangle(name, &descriptors))
    }

    /// Declares (or reuses) an external builtin with the given signature.
    pub(crate) fn get_or_declare_builtin(
        &mut self,
        symbol: &str,
        ret: ir::Handle<ir::Type>,
        params: Vec<ir::Handle<ir::Type>>,
        varargs: bool,
        extra_attrs: ir::FnAttrs,
    ) -> ir::Handle<ir::Function> {
        let fn_ty = self.module.function_type(ret, params.clone(), varargs);
        if let Some(existing) = self.module.function_by_name(symbol) {
            if self.module.functions[existing].ty == fn_ty {
                return existing;
            }
        }
        let mut func = ir::Function::new(symbol, fn_ty);
        func.linkage = ir::Linkage::External;
        func.cconv = if func.is_intrinsic() {
            ir::CallConv::C
        } else {
            ir::CallConv::SpirFunc
        };
        func.attrs = ir::FnAttrs::NOUNWIND | extra_attrs;
        func.params = params
            .into_iter()
            .map(|ty| ir::Parameter {
                name: None,
                ty,
                attrs: ir::ParamAttrs::EMPTY,
            })
            .collect();
        self.module.functions.append(func)
    }

    /// Calling convention and attributes a call site copies from its
    /// callee (intrinsics keep the defaults).
    pub(crate) fn callsite_of(
        &self,
        callee: ir::Handle<ir::Function>,
    ) -> (ir::CallConv, ir::FnAttrs) {
        let f = &self.module.functions[callee];
        if f.is_intrinsic() {
            (ir::CallConv::C, ir::FnAttrs::EMPTY)
        } else {
            (f.cconv, f.attrs)
        }
    }

    /// The shared builtin-call path: lowers argument types (function
    /// pointers become private-space pointers and switch the symbol to the
    /// `__spirv_<name>_` decoration), widens bool compare results to i32,
    /// mangles, declares, calls, and truncates back when widened.
    pub(crate) fn emit_builtin_call(
        &mut self,
        id: spv::Id,
        bb: ir::Handle<ir::BasicBlock>,
        name: &str,
        arg_ids: &[spv::Id],
        op: Option<spirv::Op>,
        ret_override: Option<ir::Handle<ir::Type>>,
    ) -> Result<ir::Value> {
        let inst_name = self.spv_value(id)?.name.clone();
        let ret_type_id = self.spv_value(id)?.ty;

        let mut has_fn_ptr = false;
        let mut arg_tys = Vec::with_capacity(arg_ids.len());
        for &a in arg_ids {
            let mut t = self.translate_type(self.type_id_of_value(a)?)?;
            if matches!(self.module.types[t].inner, ir::TypeInner::Function { .. }) {
                t = self.module.pointer_type(t, ir::AddressSpace::PRIVATE);
                has_fn_ptr = true;
            }
            arg_tys.push(t);
        }

        let mut ret_ty = match ret_override {
            Some(t) => t,
            None => match ret_type_id {
                Some(t) => self.translate_type(t)?,
                None => self.module.void_type(),
            },
        };

        // Comparison widening: the OpenCL-level builtin returns i32.
        let mut widened_from = None;
        if op.is_some_and(is_cmp_op) {
            if let Some(rt) = ret_type_id {
                match self.spv_type(rt)? {
                    spv::Type::Bool => {
                        widened_from = Some(self.translate_type(rt)?);
                        ret_ty = self.module.int_type(32);
                    }
                    spv::Type::Vector { elem, count } => {
                        let (elem, count) = (*elem, *count);
                        if matches!(self.spv_type(elem)?, spv::Type::Bool) {
                            widened_from = Some(self.translate_type(rt)?);
                            let i32_ty = self.module.int_type(32);
                            ret_ty = self.module.vector_type(i32_ty, count);
                        }
                    }
                    _ => {
                        return Err(TranslateError::Malformed(
                            "comparison without a bool result".into(),
                        ))
                    }
                }
            }
        }

        let symbol = if has_fn_ptr {
            crate::postprocess::decorate_spirv_function(name)
        } else {
            self.mangle_builtin(name, &arg_tys)?
        };
        let callee = self.get_or_declare_builtin(
            &symbol,
            ret_ty,
            arg_tys,
            false,
            ir::FnAttrs::EMPTY,
        );
        let args = self.translate_values(arg_ids, Some(bb))?;
        let (cconv, attrs) = self.callsite_of(callee);
        let call = self.push_inst(
            bb,
            &inst_name,
            ret_ty,
            ir::InstKind::Call {
                callee,
                args,
                cconv,
                attrs,
            },
        )?;

        if let Some(orig) = widened_from {
            return self.push_inst(
                bb,
                "cvt",
                orig,
                ir::InstKind::Cast {
                    op: ir::CastOp::Trunc,
                    value: call,
                },
            );
        }
        Ok(call)
    }

    /// Atomics: canonical `atomic_*` name, return type taken from the
    /// pointee of the first operand.
    pub(crate) fn translate_atomic(
        &mut self,
        id: spv::Id,
        op: spirv::Op,
        ptr: spv::Id,
        operands: &[spv::Id],
        bb: ir::Handle<ir::BasicBlock>,
    ) -> Result<ir::Value> {
        let name = builtin_inst_name(op).ok_or_else(|| {
            TranslateError::Unsupported(format!("atomic instruction {op:?}"))
        })?;
        let mut arg_ids = vec![ptr];
        arg_ids.extend_from_slice(operands);
        let ptr_ty = self.translate_type(self.type_id_of_value(ptr)?)?;
        let ret = match self.module.types[ptr_ty].inner {
            ir::TypeInner::Pointer { pointee, .. } => pointee,
            _ => {
                return Err(TranslateError::Malformed(
                    "atomic on a non-pointer operand".into(),
                ))
            }
        };
        self.emit_builtin_call(id, bb, name, &arg_ids, Some(op), Some(ret))
    }

    /// `OpControlBarrier` / `OpMemoryBarrier` → `barrier` / `mem_fence`
    /// with a translated flag mask.
    pub(crate) fn translate_barrier_fence(
        &mut self,
        id: spv::Id,
        op: spirv::Op,
        semantics: u32,
        bb: ir::Handle<ir::BasicBlock>,
    ) -> Result<ir::Value> {
        let name = match op {
            spirv::Op::MemoryBarrier => "mem_fence",
            spirv::Op::ControlBarrier => "barrier",
            other => {
                return Err(TranslateError::Malformed(format!(
                    "{other:?} is not a barrier"
                )))
            }
        };
        let inst_name = self.spv_value(id)?.name.clone();
        let i32_ty = self.module.int_type(32);
        let void = self.module.void_type();
        let symbol = self.mangle_builtin(name, &[i32_ty])?;
        let callee =
            self.get_or_declare_builtin(&symbol, void, vec![i32_ty], false, ir::FnAttrs::EMPTY);
        let flags = self.module.const_i32(mem_fence_flags(semantics));
        let (cconv, attrs) = self.callsite_of(callee);
        self.push_inst(
            bb,
            &inst_name,
            void,
            ir::InstKind::Call {
                callee,
                args: vec![ir::Value::Const(flags)],
                cconv,
                attrs,
            },
        )
    }

    /// Extended instructions: table lookup, vector load/store rewriting,
    /// printf and read_image special cases.
    pub(crate) fn translate_ext_inst(
        &mut self,
        id: spv::Id,
        set: spv::Id,
        number: u32,
        words: &[u32],
        bb: ir::Handle<ir::BasicBlock>,
    ) -> Result<ir::Value> {
        if !self.spv.ext_inst_sets.contains_key(&set) {
            return Err(TranslateError::Malformed(format!(
                "extended instruction references unknown set %{set}"
            )));
        }
        let is_printf = number == EXT_INST_PRINTF;
        let mut name = ext_inst_name(number)
            .ok_or_else(|| {
                TranslateError::Unsupported(format!("extended instruction {number}"))
            })?
            .to_string();
        let mut words = words.to_vec();
        self.rewrite_vector_load_store(&mut name, &mut words)?;
        let arg_ids = words;

        let mut arg_tys = Vec::with_capacity(arg_ids.len());
        for &a in &arg_ids {
            arg_tys.push(self.translate_type(self.type_id_of_value(a)?)?);
        }
        let ret_ty = match self.spv_value(id)?.ty {
            Some(t) => self.translate_type(t)?,
            None => self.module.void_type(),
        };

        let mut varargs = false;
        let symbol = if is_printf {
            varargs = true;
            arg_tys.truncate(1);
            "printf".to_string()
        } else {
            if name.starts_with("read_image") && arg_tys.len() > 1 {
                arg_tys[1] = self
                    .module
                    .opaque_ptr_type("opencl.sampler_t", ir::AddressSpace::GLOBAL);
            }
            self.mangle_builtin(&name, &arg_tys)?
        };

        let callee =
            self.get_or_declare_builtin(&symbol, ret_ty, arg_tys, varargs, ir::FnAttrs::EMPTY);
        let args = self.translate_values(&arg_ids, Some(bb))?;
        let inst_name = self.spv_value(id)?.name.clone();
        let cconv = self.module.functions[callee].cconv;
        self.push_inst(
            bb,
            &inst_name,
            ret_ty,
            ir::InstKind::Call {
                callee,
                args,
                cconv,
                attrs: ir::FnAttrs::NOUNWIND,
            },
        )
    }

    /// `vloadn`/`vstoren` width substitution and explicit rounding-mode
    /// suffixes, consuming trailing literal operands.
    pub(crate) fn rewrite_vector_load_store(
        &mut self,
        name: &mut String,
        words: &mut Vec<u32>,
    ) -> Result<()> {
        if name.starts_with("vload") {
            if let Some(pos) = name.find('n') {
                let last = words.pop().ok_or_else(|| {
                    TranslateError::Malformed(format!("{name} without a width literal"))
                })?;
                if last != 1 {
                    name.replace_range(pos..pos + 1, &last.to_string());
                } else {
                    name.remove(pos);
                }
            }
        } else if name.starts_with("vstore") {
            if let Some(pos) = name.find('n') {
                let data_ty = self.type_id_of_value(
                    *words.first().ok_or_else(|| {
                        TranslateError::Malformed(format!("{name} without operands"))
                    })?,
                )?;
                if let spv::Type::Vector { count, .. } = self.spv_type(data_ty)? {
                    let count = *count;
                    name.replace_range(pos..pos + 1, &count.to_string());
                } else {
                    name.remove(pos);
                }
            }
            if let Some(pos) = name.find("_r") {
                let mode = words.pop().ok_or_else(|| {
                    TranslateError::Malformed(format!("{name} without a rounding literal"))
                })?;
                let suffix = format!("_{}", rounding_suffix_literal(mode)?);
                name.replace_range(pos..pos + 2, &suffix);
            }
        }
        Ok(())
    }

    /// `convert_<dst>` builtin names for saturated / rounded conversions.
    pub(crate) fn convert_builtin_name(&self, id: spv::Id, op: spirv::Op) -> Result<String> {
        use spirv::Op;
        let value = self.spv_value(id)?;
        let ty = self.value_type_id(value)?;
        let from_unsigned = matches!(op, Op::ConvertUToF | Op::UConvert | Op::SatConvertUToS);
        let to_signed = !matches!(op, Op::ConvertFToU | Op::UConvert | Op::SatConvertSToU);
        let mut name = String::new();
        if from_unsigned {
            name.push('u');
        }
        name.push_str("convert_");
        name.push_str(&self.ocl_type_name(ty, to_signed)?);
        let saturated = value.decorations.saturated_conversion
            || matches!(op, Op::SatConvertSToU | Op::SatConvertUToS);
        if saturated {
            name.push_str("_sat");
        }
        if let Some(mode) = value.decorations.fp_rounding_mode {
            name.push('_');
            name.push_str(rounding_suffix(mode));
        }
        Ok(name)
    }
}

fn int_primitive(bits: u32, unsigned: bool) -> Result<Primitive> {
    Ok(match (bits, unsigned) {
        (1, _) => Primitive::Bool,
        (8, false) => Primitive::Char,
        (8, true) => Primitive::UChar,
        (16, false) => Primitive::Short,
        (16, true) => Primitive::UShort,
        (32, false) => Primitive::Int,
        (32, true) => Primitive::UInt,
        (64, false) => Primitive::Long,
        (64, true) => Primitive::ULong,
        (other, _) => return Err(TranslateError::InvalidIntWidth(other)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ext_inst_table_spot_checks() {
        assert_eq!(ext_inst_name(23), Some("fabs"));
        assert_eq!(ext_inst_name(141), Some("abs"));
        assert_eq!(ext_inst_name(201), Some("abs"));
        assert_eq!(ext_inst_name(171), Some("vloadn"));
        assert_eq!(ext_inst_name(EXT_INST_PRINTF), Some("printf"));
        assert_eq!(ext_inst_name(999), None);
    }

    #[test]
    fn fence_flag_translation() {
        assert_eq!(mem_fence_flags(0x100), 1);
        assert_eq!(mem_fence_flags(0x200), 2);
        assert_eq!(mem_fence_flags(0x800), 4);
        assert_eq!(mem_fence_flags(0x300), 3);
        assert_eq!(mem_fence_flags(0), 0);
    }

    #[test]
    fn atomic_names() {
        assert_eq!(builtin_inst_name(spirv::Op::AtomicIAdd), Some("atomic_add"));
        assert_eq!(
            builtin_inst_name(spirv::Op::AtomicUMax),
            Some("atomic_max")
        );
        assert_eq!(builtin_inst_name(spirv::Op::IAdd), None);
    }

    #[test]
    fn source_names() {
        assert_eq!(ocl_source_name("opencl.sampler_t"), "ocl_sampler");
        assert_eq!(
            ocl_source_name("opencl.image2d_t__read_only"),
            "ocl_image2d"
        );
        assert_eq!(ocl_source_name("opencl.event_t"), "ocl_event");
        assert_eq!(ocl_source_name("opencl.block"), "ocl_block");
    }

    #[test]
    fn vload_rewrite() {
        let m = spv::Module::new();
        let mut tr = Translator::new(&m);
        let mut name = "vloadn".to_string();
        let mut words = vec![10, 11, 4];
        tr.rewrite_vector_load_store(&mut name, &mut words).unwrap();
        assert_eq!(name, "vload4");
        assert_eq!(words, vec![10, 11]);

        let mut name = "vloadn".to_string();
        let mut words = vec![10, 11, 1];
        tr.rewrite_vector_load_store(&mut name, &mut words).unwrap();
        assert_eq!(name, "vload");
        assert_eq!(words, vec![10, 11]);
    }

    #[test]
    fn vstore_rounding_rewrite() {
        let mut m = spv::Module::new();
        let f32_id = m.add_type(spv::Type::Float { width: 32 });
        let data = m.add_constant(f32_id, 0);
        let mut tr_words = vec![data, 20, 21, 1]; // data, offset, ptr, RTZ
        let m2 = m.clone();
        let mut tr = Translator::new(&m2);
        let mut name = "vstore_half_r".to_string();
        tr.rewrite_vector_load_store(&mut name, &mut tr_words)
            .unwrap();
        assert_eq!(name, "vstore_half_rtz");
        assert_eq!(tr_words, vec![data, 20, 21]);
    }

    #[test]
    fn vstoren_width_from_data_type() {
        let mut m = spv::Module::new();
        let f32_id = m.add_type(spv::Type::Float { width: 32 });
        let v2 = m.add_type(spv::Type::Vector {
            elem: f32_id,
            count: 2,
        });
        let data = m.add_constant(v2, 0);
        let m2 = m.clone();
        let mut tr = Translator::new(&m2);
        let mut name = "vstoren".to_string();
        let mut words = vec![data, 20, 21];
        tr.rewrite_vector_load_store(&mut name, &mut words).unwrap();
        assert_eq!(name, "vstore2");
        assert_eq!(words, vec![data, 20, 21]);
    }
}
