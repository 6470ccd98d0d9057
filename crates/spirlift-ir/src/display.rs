//! Textual dump of an IR module for debugging.
//!
//! The listing is LLVM-flavoured but not byte-compatible with an LLVM
//! assembly printer; it exists for the debug artifact and for tests.

use std::collections::HashMap;
use std::fmt::Write;

use crate::arena::Handle;
use crate::attrs::{CallConv, FnAttrs, Linkage, ParamAttrs};
use crate::consts::Constant;
use crate::func::{
    BasicBlock, BinOp, CastOp, FloatPredicate, Function, InstKind, Instruction, IntPredicate,
    Value,
};
use crate::metadata::Metadata;
use crate::types::{Type, TypeInner};
use crate::Module;

/// Renders the whole module as text.
pub fn dump_module(module: &Module) -> String {
    let mut out = String::new();
    if let Some(layout) = &module.data_layout {
        let _ = writeln!(out, "target datalayout = \"{layout}\"");
    }
    if let Some(triple) = &module.target_triple {
        let _ = writeln!(out, "target triple = \"{triple}\"");
    }
    out.push('\n');

    for (_, ty) in module.types.iter() {
        if let Some(name) = &ty.name {
            match &ty.inner {
                TypeInner::OpaqueStruct => {
                    let _ = writeln!(out, "%{name} = type opaque");
                }
                TypeInner::Struct { members, packed } => {
                    let body = members
                        .iter()
                        .map(|&m| type_name(module, m))
                        .collect::<Vec<_>>()
                        .join(", ");
                    if *packed {
                        let _ = writeln!(out, "%{name} = type <{{ {body} }}>");
                    } else {
                        let _ = writeln!(out, "%{name} = type {{ {body} }}");
                    }
                }
                _ => {}
            }
        }
    }
    out.push('\n');

    for (_, gv) in module.globals.iter() {
        let space = if gv.space.0 != 0 {
            format!(" addrspace({})", gv.space.0)
        } else {
            String::new()
        };
        let kind = if gv.is_constant { "constant" } else { "global" };
        let init = match gv.init {
            Some(c) => format!(" {}", const_body(module, c)),
            None => String::new(),
        };
        let align = match gv.align {
            Some(a) => format!(", align {a}"),
            None => String::new(),
        };
        let unnamed = if gv.unnamed_addr { "unnamed_addr " } else { "" };
        let _ = writeln!(
            out,
            "@{} ={}{} {}{} {}{}{}",
            gv.name,
            linkage_name(gv.linkage),
            space,
            unnamed,
            kind,
            type_name(module, gv.ty),
            init,
            align
        );
    }
    out.push('\n');

    for (_, f) in module.functions.iter() {
        dump_function(&mut out, module, f);
        out.push('\n');
    }

    for md in &module.named_metadata {
        let ops = md
            .operands
            .iter()
            .map(|m| metadata_text(module, m))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "!{} = !{{{ops}}}", md.name);
    }
    out
}

fn linkage_name(linkage: Linkage) -> &'static str {
    match linkage {
        Linkage::External => "",
        Linkage::Internal => " internal",
        Linkage::Private => " private",
    }
}

fn cconv_name(cc: CallConv) -> &'static str {
    match cc {
        CallConv::C => "",
        CallConv::SpirFunc => "spir_func ",
        CallConv::SpirKernel => "spir_kernel ",
    }
}

fn fn_attrs_text(attrs: FnAttrs) -> String {
    let mut s = String::new();
    for (flag, name) in [
        (FnAttrs::NOUNWIND, "nounwind"),
        (FnAttrs::READNONE, "readnone"),
        (FnAttrs::READONLY, "readonly"),
        (FnAttrs::ALWAYSINLINE, "alwaysinline"),
        (FnAttrs::NOINLINE, "noinline"),
    ] {
        if attrs.contains(flag) {
            s.push(' ');
            s.push_str(name);
        }
    }
    s
}

fn param_attrs_text(attrs: ParamAttrs) -> String {
    let mut s = String::new();
    for (flag, name) in [
        (ParamAttrs::ZEXT, "zeroext"),
        (ParamAttrs::SEXT, "signext"),
        (ParamAttrs::BYVAL, "byval"),
        (ParamAttrs::SRET, "sret"),
        (ParamAttrs::NOALIAS, "noalias"),
        (ParamAttrs::NOCAPTURE, "nocapture"),
    ] {
        if attrs.contains(flag) {
            s.push_str(name);
            s.push(' ');
        }
    }
    s
}

/// Returns the printable name of a type.
pub fn type_name(module: &Module, ty: Handle<Type>) -> String {
    let t = &module.types[ty];
    if let Some(name) = &t.name {
        return format!("%{name}");
    }
    match &t.inner {
        TypeInner::Void => "void".into(),
        TypeInner::Int { bits } => format!("i{bits}"),
        TypeInner::Float { bits } => match bits {
            16 => "half".into(),
            32 => "float".into(),
            64 => "double".into(),
            other => format!("f{other}"),
        },
        TypeInner::Pointer { pointee, space } => {
            let inner = type_name(module, *pointee);
            if space.0 == 0 {
                format!("{inner}*")
            } else {
                format!("{inner} addrspace({})*", space.0)
            }
        }
        TypeInner::Vector { elem, count } => {
            format!("<{count} x {}>", type_name(module, *elem))
        }
        TypeInner::Array { elem, len } => {
            format!("[{len} x {}]", type_name(module, *elem))
        }
        TypeInner::Struct { members, packed } => {
            let body = members
                .iter()
                .map(|&m| type_name(module, m))
                .collect::<Vec<_>>()
                .join(", ");
            if *packed {
                format!("<{{ {body} }}>")
            } else {
                format!("{{ {body} }}")
            }
        }
        TypeInner::OpaqueStruct => "opaque".into(),
        TypeInner::Function {
            ret,
            params,
            varargs,
        } => {
            let mut ps = params
                .iter()
                .map(|&p| type_name(module, p))
                .collect::<Vec<_>>();
            if *varargs {
                ps.push("...".into());
            }
            format!("{} ({})", type_name(module, *ret), ps.join(", "))
        }
    }
}

fn const_body(module: &Module, c: Handle<Constant>) -> String {
    match &module.constants[c] {
        Constant::Int { value, signed, ty } => {
            let bits = match module.types[*ty].inner {
                TypeInner::Int { bits } => bits,
                _ => 64,
            };
            if *signed && bits >= 2 {
                let shifted = 64 - bits;
                let v = ((*value << shifted) as i64) >> shifted;
                format!("{v}")
            } else {
                format!("{value}")
            }
        }
        Constant::Float { bits, ty } => match module.types[*ty].inner {
            TypeInner::Float { bits: 32 } => format!("{:e}", f32::from_bits(*bits as u32)),
            TypeInner::Float { bits: 64 } => format!("{:e}", f64::from_bits(*bits)),
            _ => format!("0x{bits:X}"),
        },
        Constant::NullPointer { .. } => "null".into(),
        Constant::AggregateZero { .. } => "zeroinitializer".into(),
        Constant::Undef { .. } => "undef".into(),
        Constant::Vector { elems, .. } => {
            let body = elems
                .iter()
                .map(|&e| const_text(module, e))
                .collect::<Vec<_>>()
                .join(", ");
            format!("<{body}>")
        }
        Constant::Array { elems, .. } => {
            let body = elems
                .iter()
                .map(|&e| const_text(module, e))
                .collect::<Vec<_>>()
                .join(", ");
            format!("[{body}]")
        }
    }
}

fn const_text(module: &Module, c: Handle<Constant>) -> String {
    format!(
        "{} {}",
        type_name(module, module.constants[c].ty()),
        const_body(module, c)
    )
}

struct Namer {
    names: HashMap<Value, String>,
    blocks: HashMap<Handle<BasicBlock>, String>,
}

impl Namer {
    fn build(module: &Module, f: &Function) -> Self {
        let mut names = HashMap::new();
        let mut blocks = HashMap::new();
        let mut counter = 0usize;
        let next = |name: &Option<String>, counter: &mut usize| match name {
            Some(n) if !n.is_empty() => n.clone(),
            _ => {
                let n = format!("{counter}");
                *counter += 1;
                n
            }
        };
        for (i, p) in f.params.iter().enumerate() {
            names.insert(Value::Arg(i as u32), next(&p.name, &mut counter));
        }
        for (bh, block) in f.blocks.iter() {
            blocks.insert(bh, next(&block.name, &mut counter));
            for &ih in &block.insts {
                let inst = &f.insts[ih];
                if !matches!(module.types[inst.ty].inner, TypeInner::Void) {
                    names.insert(Value::Inst(ih), next(&inst.name, &mut counter));
                }
            }
        }
        Self { names, blocks }
    }

    fn value(&self, module: &Module, _f: &Function, v: Value) -> String {
        match v {
            Value::Const(c) => const_body(module, c),
            Value::Global(g) => format!("@{}", module.globals[g].name),
            Value::Func(func) => format!("@{}", module.functions[func].name),
            Value::Arg(_) | Value::Inst(_) => match self.names.get(&v) {
                Some(n) => format!("%{n}"),
                None => "%<detached>".into(),
            },
        }
    }

    fn typed_value(&self, module: &Module, f: &Function, v: Value) -> String {
        let ty = value_type_text(module, f, v);
        format!("{ty} {}", self.value(module, f, v))
    }

    fn block(&self, b: Handle<BasicBlock>) -> String {
        match self.blocks.get(&b) {
            Some(n) => format!("%{n}"),
            None => "%<detached>".into(),
        }
    }
}

fn value_type_text(module: &Module, f: &Function, v: Value) -> String {
    match v {
        Value::Const(c) => type_name(module, module.constants[c].ty()),
        Value::Global(g) => {
            let gv = &module.globals[g];
            let inner = type_name(module, gv.ty);
            if gv.space.0 == 0 {
                format!("{inner}*")
            } else {
                format!("{inner} addrspace({})*", gv.space.0)
            }
        }
        Value::Func(func) => type_name(module, module.functions[func].ty),
        Value::Arg(i) => type_name(module, f.params[i as usize].ty),
        Value::Inst(i) => match f.insts.try_get(i) {
            Some(inst) => type_name(module, inst.ty),
            None => "<detached>".into(),
        },
    }
}

fn dump_function(out: &mut String, module: &Module, f: &Function) {
    let (ret, varargs) = match &module.types[f.ty].inner {
        TypeInner::Function { ret, varargs, .. } => (*ret, *varargs),
        _ => return,
    };
    let namer = Namer::build(module, f);
    let params = f
        .params
        .iter()
        .enumerate()
        .map(|(i, p)| {
            format!(
                "{} {}%{}",
                type_name(module, p.ty),
                param_attrs_text(p.attrs),
                namer.names[&Value::Arg(i as u32)]
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    let params = if varargs && params.is_empty() {
        "...".to_string()
    } else if varargs {
        format!("{params}, ...")
    } else {
        params
    };
    let head = format!(
        "{}{}{} @{}({})",
        cconv_name(f.cconv),
        type_name(module, ret),
        linkage_name(f.linkage),
        f.name,
        params
    );
    if f.is_declaration() {
        let _ = writeln!(out, "declare {head}{}", fn_attrs_text(f.attrs));
        return;
    }
    let _ = writeln!(out, "define {head}{} {{", fn_attrs_text(f.attrs));
    for (bh, block) in f.blocks.iter() {
        let _ = writeln!(out, "{}:", namer.block(bh).trim_start_matches('%'));
        for &ih in &block.insts {
            let inst = &f.insts[ih];
            let text = inst_text(module, f, &namer, inst);
            match namer.names.get(&Value::Inst(ih)) {
                Some(n) => {
                    let _ = writeln!(out, "  %{n} = {text}");
                }
                None => {
                    let _ = writeln!(out, "  {text}");
                }
            }
        }
    }
    let _ = writeln!(out, "}}");
}

fn bin_op_name(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "add",
        BinOp::Sub => "sub",
        BinOp::Mul => "mul",
        BinOp::UDiv => "udiv",
        BinOp::SDiv => "sdiv",
        BinOp::URem => "urem",
        BinOp::SRem => "srem",
        BinOp::FAdd => "fadd",
        BinOp::FSub => "fsub",
        BinOp::FMul => "fmul",
        BinOp::FDiv => "fdiv",
        BinOp::FRem => "frem",
        BinOp::Shl => "shl",
        BinOp::LShr => "lshr",
        BinOp::AShr => "ashr",
        BinOp::And => "and",
        BinOp::Or => "or",
        BinOp::Xor => "xor",
    }
}

fn cast_op_name(op: CastOp) -> &'static str {
    match op {
        CastOp::Trunc => "trunc",
        CastOp::ZExt => "zext",
        CastOp::SExt => "sext",
        CastOp::FPTrunc => "fptrunc",
        CastOp::FPExt => "fpext",
        CastOp::FPToUI => "fptoui",
        CastOp::FPToSI => "fptosi",
        CastOp::UIToFP => "uitofp",
        CastOp::SIToFP => "sitofp",
        CastOp::PtrToInt => "ptrtoint",
        CastOp::IntToPtr => "inttoptr",
        CastOp::BitCast => "bitcast",
        CastOp::AddrSpaceCast => "addrspacecast",
    }
}

fn int_pred_name(pred: IntPredicate) -> &'static str {
    match pred {
        IntPredicate::Eq => "eq",
        IntPredicate::Ne => "ne",
        IntPredicate::Ugt => "ugt",
        IntPredicate::Uge => "uge",
        IntPredicate::Ult => "ult",
        IntPredicate::Ule => "ule",
        IntPredicate::Sgt => "sgt",
        IntPredicate::Sge => "sge",
        IntPredicate::Slt => "slt",
        IntPredicate::Sle => "sle",
    }
}

fn float_pred_name(pred: FloatPredicate) -> &'static str {
    match pred {
        FloatPredicate::Oeq => "oeq",
        FloatPredicate::Ogt => "ogt",
        FloatPredicate::Oge => "oge",
        FloatPredicate::Olt => "olt",
        FloatPredicate::Ole => "ole",
        FloatPredicate::One => "one",
        FloatPredicate::Ord => "ord",
        FloatPredicate::Uno => "uno",
        FloatPredicate::Ueq => "ueq",
        FloatPredicate::Ugt => "ugt",
        FloatPredicate::Uge => "uge",
        FloatPredicate::Ult => "ult",
        FloatPredicate::Ule => "ule",
        FloatPredicate::Une => "une",
    }
}

fn inst_text(module: &Module, f: &Function, namer: &Namer, inst: &Instruction) -> String {
    let v = |val: Value| namer.value(module, f, val);
    let tv = |val: Value| namer.typed_value(module, f, val);
    match &inst.kind {
        InstKind::Binary {
            op,
            lhs,
            rhs,
            nsw,
            exact,
        } => {
            let mut flags = String::new();
            if *nsw {
                flags.push_str(" nsw");
            }
            if *exact {
                flags.push_str(" exact");
            }
            format!(
                "{}{flags} {} {}, {}",
                bin_op_name(*op),
                type_name(module, inst.ty),
                v(*lhs),
                v(*rhs)
            )
        }
        InstKind::FNeg { value } => format!("fneg {}", tv(*value)),
        InstKind::Cast { op, value } => format!(
            "{} {} to {}",
            cast_op_name(*op),
            tv(*value),
            type_name(module, inst.ty)
        ),
        InstKind::ICmp { pred, lhs, rhs } => {
            format!("icmp {} {}, {}", int_pred_name(*pred), tv(*lhs), v(*rhs))
        }
        InstKind::FCmp { pred, lhs, rhs } => {
            format!("fcmp {} {}, {}", float_pred_name(*pred), tv(*lhs), v(*rhs))
        }
        InstKind::Alloca {
            allocated,
            count,
            align,
        } => {
            let count = match count {
                Some(c) => format!(", {}", tv(*c)),
                None => String::new(),
            };
            let align = match align {
                Some(a) => format!(", align {a}"),
                None => String::new(),
            };
            format!("alloca {}{count}{align}", type_name(module, *allocated))
        }
        InstKind::Load {
            ptr,
            align,
            volatile,
        } => {
            let vol = if *volatile { "volatile " } else { "" };
            let align = match align {
                Some(a) => format!(", align {a}"),
                None => String::new(),
            };
            format!("load {vol}{}{align}", tv(*ptr))
        }
        InstKind::Store {
            value,
            ptr,
            align,
            volatile,
        } => {
            let vol = if *volatile { "volatile " } else { "" };
            let align = match align {
                Some(a) => format!(", align {a}"),
                None => String::new(),
            };
            format!("store {vol}{}, {}{align}", tv(*value), tv(*ptr))
        }
        InstKind::GetElementPtr {
            base,
            indices,
            inbounds,
        } => {
            let ib = if *inbounds { "inbounds " } else { "" };
            let idx = indices
                .iter()
                .map(|&i| tv(i))
                .collect::<Vec<_>>()
                .join(", ");
            format!("getelementptr {ib}{}, {idx}", tv(*base))
        }
        InstKind::Phi { incoming } => {
            let pairs = incoming
                .iter()
                .map(|&(val, bb)| format!("[ {}, {} ]", v(val), namer.block(bb)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("phi {} {pairs}", type_name(module, inst.ty))
        }
        InstKind::Select {
            cond,
            if_true,
            if_false,
        } => format!("select {}, {}, {}", tv(*cond), tv(*if_true), tv(*if_false)),
        InstKind::ExtractElement { vector, index } => {
            format!("extractelement {}, {}", tv(*vector), tv(*index))
        }
        InstKind::InsertElement {
            vector,
            element,
            index,
        } => format!(
            "insertelement {}, {}, {}",
            tv(*vector),
            tv(*element),
            tv(*index)
        ),
        InstKind::ShuffleVector { a, b, mask } => {
            let lanes = mask
                .iter()
                .map(|m| match m {
                    Some(i) => format!("i32 {i}"),
                    None => "i32 undef".into(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("shufflevector {}, {}, <{lanes}>", tv(*a), tv(*b))
        }
        InstKind::Call {
            callee,
            args,
            cconv,
            ..
        } => {
            let callee_f = &module.functions[*callee];
            let ret = module.return_type_of(callee_f.ty);
            let args = args.iter().map(|&a| tv(a)).collect::<Vec<_>>().join(", ");
            format!(
                "call {}{} @{}({args})",
                cconv_name(*cconv),
                type_name(module, ret),
                callee_f.name
            )
        }
        InstKind::Br { dest } => format!("br label {}", namer.block(*dest)),
        InstKind::CondBr {
            cond,
            then_dest,
            else_dest,
        } => format!(
            "br {}, label {}, label {}",
            tv(*cond),
            namer.block(*then_dest),
            namer.block(*else_dest)
        ),
        InstKind::Switch {
            value,
            default,
            cases,
        } => {
            let cases = cases
                .iter()
                .map(|&(lit, bb)| format!("i32 {lit}, label {}", namer.block(bb)))
                .collect::<Vec<_>>()
                .join(" ");
            format!(
                "switch {}, label {} [ {cases} ]",
                tv(*value),
                namer.block(*default)
            )
        }
        InstKind::Ret { value } => match value {
            Some(val) => format!("ret {}", tv(*val)),
            None => "ret void".into(),
        },
    }
}

fn metadata_text(module: &Module, md: &Metadata) -> String {
    match md {
        Metadata::String(s) => format!("!\"{s}\""),
        Metadata::Int(i) => format!("i32 {i}"),
        Metadata::Value(v) => match v {
            Value::Func(f) => format!("@{}", module.functions[*f].name),
            Value::Const(c) => const_text(module, *c),
            other => format!("{other:?}"),
        },
        Metadata::Node(ops) => {
            let body = ops
                .iter()
                .map(|m| metadata_text(module, m))
                .collect::<Vec<_>>()
                .join(", ");
            format!("!{{{body}}}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::{CallConv, FnAttrs, Linkage};
    use crate::func::{Function, InstKind, Instruction};

    #[test]
    fn dump_empty_module() {
        let module = Module::new();
        let text = dump_module(&module);
        assert!(!text.contains("target triple"));
    }

    #[test]
    fn dump_kernel_with_ret() {
        let mut module = Module::new();
        module.target_triple = Some(crate::layout::TRIPLE64.into());
        let void = module.void_type();
        let fty = module.function_type(void, vec![], false);
        let mut f = Function::new("foo", fty);
        f.cconv = CallConv::SpirKernel;
        f.attrs = FnAttrs::NOUNWIND;
        f.linkage = Linkage::External;
        let bb = f.append_block(Some("entry".into()));
        f.append_inst(
            bb,
            Instruction {
                name: None,
                ty: void,
                kind: InstKind::Ret { value: None },
            },
        );
        module.functions.append(f);
        let text = dump_module(&module);
        assert!(text.contains("target triple = \"spir64-unknown-unknown\""));
        assert!(text.contains("define spir_kernel void @foo()"));
        assert!(text.contains("nounwind"));
        assert!(text.contains("ret void"));
    }

    #[test]
    fn dump_declaration() {
        let mut module = Module::new();
        let i32_ty = module.int_type(32);
        let fty = module.function_type(i32_ty, vec![i32_ty], false);
        let mut f = Function::new("_Z13get_global_idj", fty);
        f.attrs = FnAttrs::NOUNWIND | FnAttrs::READNONE;
        module.functions.append(f);
        let text = dump_module(&module);
        assert!(text.contains("declare spir_func i32 @_Z13get_global_idj"));
        assert!(text.contains("readnone"));
    }

    #[test]
    fn type_names() {
        let mut module = Module::new();
        let f32_ty = module.float_type(32);
        let v4 = module.vector_type(f32_ty, 4);
        assert_eq!(type_name(&module, v4), "<4 x float>");
        let ptr = module.pointer_type(v4, crate::AddressSpace::GLOBAL);
        assert_eq!(type_name(&module, ptr), "<4 x float> addrspace(1)*");
        let sampler = module.opaque_struct_type("opencl.sampler_t");
        assert_eq!(type_name(&module, sampler), "%opencl.sampler_t");
    }
}
