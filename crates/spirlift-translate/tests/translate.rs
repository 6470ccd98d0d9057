//! End-to-end translation scenarios over hand-built module graphs.

use spirlift_ir as ir;
use spirlift_spv as spv;
use spirlift_spv::spirv;
use spirlift_translate::{translate_module, Options, TranslateError};

fn default_decorations() -> spv::Decorations {
    spv::Decorations::default()
}

fn add_inst(m: &mut spv::Module, ty: Option<spv::Id>, name: &str, inst: spv::Inst) -> spv::Id {
    m.add_value(spv::Value {
        ty,
        name: name.into(),
        decorations: default_decorations(),
        kind: spv::ValueKind::Inst(inst),
    })
}

/// Registers a single-entry-point function over the given blocks and
/// returns its id.
fn add_kernel(
    m: &mut spv::Module,
    name: &str,
    type_id: spv::Id,
    params: Vec<spv::Id>,
    blocks: Vec<spv::Block>,
) -> spv::Id {
    let func_index = m.functions.len();
    let id = m.add_value(spv::Value {
        ty: Some(type_id),
        name: name.into(),
        decorations: default_decorations(),
        kind: spv::ValueKind::Function {
            function: func_index,
        },
    });
    for (block_index, block) in blocks.iter().enumerate() {
        m.add_value_with_id(
            block.label,
            spv::Value {
                ty: None,
                name: String::new(),
                decorations: default_decorations(),
                kind: spv::ValueKind::Label {
                    function: func_index,
                    block: block_index,
                },
            },
        );
    }
    m.functions.push(spv::Function {
        id,
        name: name.into(),
        type_id,
        control: spirv::FunctionControl::NONE,
        params,
        blocks,
        linkage: None,
        execution_modes: vec![],
    });
    m.entry_points.insert(id);
    id
}

fn find_function<'m>(module: &'m ir::Module, name: &str) -> Option<&'m ir::Function> {
    module
        .functions
        .iter()
        .find(|(_, f)| f.name == name)
        .map(|(_, f)| f)
}

fn placeholder_globals(module: &ir::Module) -> Vec<String> {
    module
        .globals
        .iter()
        .filter(|(_, g)| g.name.starts_with("placeholder."))
        .map(|(_, g)| g.name.clone())
        .collect()
}

fn assert_nounwind_everywhere(module: &ir::Module) {
    for (_, f) in module.functions.iter() {
        if !f.is_intrinsic() {
            assert!(
                f.attrs.contains(ir::FnAttrs::NOUNWIND),
                "{} is missing nounwind",
                f.name
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Scenario 1: Physical64 empty kernel
// ---------------------------------------------------------------------------

#[test]
fn physical64_empty_kernel() {
    let mut m = spv::Module::new();
    m.addressing_model = spirv::AddressingModel::Physical64;
    let void = m.add_type(spv::Type::Void);
    let fnty = m.add_type(spv::Type::Function {
        ret: void,
        params: vec![],
    });
    let label = m.fresh_id();
    let ret = add_inst(&mut m, None, "", spv::Inst::Return);
    add_kernel(
        &mut m,
        "foo",
        fnty,
        vec![],
        vec![spv::Block {
            label,
            insts: vec![ret],
        }],
    );

    let module = translate_module(&m, &Options::default()).expect("translation should succeed");

    assert_eq!(
        module.target_triple.as_deref(),
        Some("spir64-unknown-unknown")
    );
    assert!(module
        .data_layout
        .as_deref()
        .unwrap()
        .starts_with("e-p:64:64:64"));

    let foo = find_function(&module, "foo").expect("kernel should exist");
    assert_eq!(foo.cconv, ir::CallConv::SpirKernel);
    assert_eq!(foo.linkage, ir::Linkage::External);
    assert!(foo.attrs.contains(ir::FnAttrs::NOUNWIND));
    assert_nounwind_everywhere(&module);

    let kernels = module.named_md("opencl.kernels").expect("kernels md");
    assert_eq!(kernels.operands.len(), 1);
    let ir::Metadata::Node(kernel) = &kernels.operands[0] else {
        panic!("kernel operand should be a node");
    };
    // Function reference plus five argument-metadata children.
    assert_eq!(kernel.len(), 6);
    assert!(matches!(
        kernel[0],
        ir::Metadata::Value(ir::Value::Func(_))
    ));
    let headers = [
        "kernel_arg_addr_space",
        "kernel_arg_access_qual",
        "kernel_arg_type",
        "kernel_arg_type_qual",
        "kernel_arg_base_type",
    ];
    for (child, header) in kernel[1..].iter().zip(headers) {
        let ir::Metadata::Node(ops) = child else {
            panic!("argument metadata should be a node");
        };
        // Header string plus one operand per argument: no arguments here.
        assert_eq!(ops.len(), 1);
        match &ops[0] {
            ir::Metadata::String(s) => assert_eq!(s, header),
            other => panic!("expected header string, got {other:?}"),
        }
    }

    // FP contract stays enabled without ContractionOff.
    assert!(module.named_md("opencl.enable.FP_CONTRACT").is_some());
}

// ---------------------------------------------------------------------------
// Scenario 2: forward-referenced PHI
// ---------------------------------------------------------------------------

#[test]
fn forward_referenced_phi() {
    let mut m = spv::Module::new();
    let void = m.add_type(spv::Type::Void);
    let bool_ty = m.add_type(spv::Type::Bool);
    let i32_ty = m.add_type(spv::Type::Int {
        width: 32,
        signed: true,
    });
    let fnty = m.add_type(spv::Type::Function {
        ret: void,
        params: vec![],
    });
    let c0 = m.add_constant(i32_ty, 0);
    let c1 = m.add_constant(i32_ty, 1);
    let cond = m.add_constant(bool_ty, 1);

    let entry = m.fresh_id();
    let loop_l = m.fresh_id();
    let exit = m.fresh_id();

    let br_entry = add_inst(&mut m, None, "", spv::Inst::Branch { target: loop_l });
    // The phi's second incoming is the add defined after it.
    let phi = m.fresh_id();
    let inc = m.fresh_id();
    m.add_value_with_id(
        phi,
        spv::Value {
            ty: Some(i32_ty),
            name: "iv".into(),
            decorations: default_decorations(),
            kind: spv::ValueKind::Inst(spv::Inst::Phi {
                pairs: vec![(c0, entry), (inc, loop_l)],
            }),
        },
    );
    m.add_value_with_id(
        inc,
        spv::Value {
            ty: Some(i32_ty),
            name: "inc".into(),
            decorations: default_decorations(),
            kind: spv::ValueKind::Inst(spv::Inst::Binary {
                op: spirv::Op::IAdd,
                a: phi,
                b: c1,
            }),
        },
    );
    let loop_br = add_inst(
        &mut m,
        None,
        "",
        spv::Inst::BranchConditional {
            cond,
            true_label: loop_l,
            false_label: exit,
        },
    );
    let ret = add_inst(&mut m, None, "", spv::Inst::Return);

    add_kernel(
        &mut m,
        "loop_kernel",
        fnty,
        vec![],
        vec![
            spv::Block {
                label: entry,
                insts: vec![br_entry],
            },
            spv::Block {
                label: loop_l,
                insts: vec![phi, inc, loop_br],
            },
            spv::Block {
                label: exit,
                insts: vec![ret],
            },
        ],
    );

    let module = translate_module(&m, &Options::default()).expect("translation should succeed");

    // Placeholder liveness: nothing left behind.
    assert!(placeholder_globals(&module).is_empty());
    let f = find_function(&module, "loop_kernel").unwrap();
    for (_, inst) in f.insts.iter() {
        if let ir::InstKind::Load { ptr, .. } = inst.kind {
            if let ir::Value::Global(g) = ptr {
                assert!(
                    module.globals.try_get(g).is_some(),
                    "load from a detached global survived"
                );
            }
        }
    }

    // The phi's incomings are the constant and the add, in listed order.
    let (phi_incoming, add_handle) = {
        let mut incoming = None;
        let mut add = None;
        for (h, inst) in f.insts.iter() {
            match &inst.kind {
                ir::InstKind::Phi { incoming: list } => incoming = Some(list.clone()),
                ir::InstKind::Binary {
                    op: ir::BinOp::Add, ..
                } => add = Some(h),
                _ => {}
            }
        }
        (incoming.expect("phi exists"), add.expect("add exists"))
    };
    assert_eq!(phi_incoming.len(), 2);
    assert!(matches!(phi_incoming[0].0, ir::Value::Const(_)));
    assert_eq!(phi_incoming[1].0, ir::Value::Inst(add_handle));

    // And the add consumes the phi directly, not a placeholder load.
    match &f.insts[add_handle].kind {
        ir::InstKind::Binary { lhs, .. } => {
            assert!(matches!(lhs, ir::Value::Inst(_)));
        }
        _ => unreachable!(),
    }
}

// ---------------------------------------------------------------------------
// Scenario 3: builtin variable demotion
// ---------------------------------------------------------------------------

#[test]
fn builtin_variable_demotion() {
    let mut m = spv::Module::new();
    let void = m.add_type(spv::Type::Void);
    let u32_ty = m.add_type(spv::Type::Int {
        width: 32,
        signed: false,
    });
    let v3u32 = m.add_type(spv::Type::Vector {
        elem: u32_ty,
        count: 3,
    });
    let ptr_v3 = m.add_type(spv::Type::Pointer {
        elem: v3u32,
        storage: spirv::StorageClass::Input,
    });
    let fnty = m.add_type(spv::Type::Function {
        ret: void,
        params: vec![],
    });

    let mut decorations = default_decorations();
    decorations.builtin = Some(spirv::BuiltIn::GlobalInvocationId);
    let gid = m.add_global_variable(spv::Value {
        ty: Some(ptr_v3),
        name: "gid".into(),
        decorations,
        kind: spv::ValueKind::Variable {
            storage: spirv::StorageClass::Input,
            init: None,
        },
    });

    let label = m.fresh_id();
    let load = add_inst(
        &mut m,
        Some(v3u32),
        "v",
        spv::Inst::Load {
            ptr: gid,
            access: spv::MemoryAccess::default(),
        },
    );
    let extract = add_inst(
        &mut m,
        Some(u32_ty),
        "x",
        spv::Inst::CompositeExtract {
            composite: load,
            indices: vec![1],
        },
    );
    let ret = add_inst(&mut m, None, "", spv::Inst::Return);
    add_kernel(
        &mut m,
        "reads_gid",
        fnty,
        vec![],
        vec![spv::Block {
            label,
            insts: vec![load, extract, ret],
        }],
    );

    let module = translate_module(&m, &Options::default()).expect("translation should succeed");

    // The builtin global is gone.
    assert!(
        !module.globals.iter().any(|(_, g)| g.name == "gid"),
        "builtin global should be detached"
    );

    let callee = find_function(&module, "_Z13get_global_idj")
        .expect("mangled get_global_id declared");
    assert!(callee.is_declaration());
    assert!(callee.attrs.contains(ir::FnAttrs::NOUNWIND));
    assert!(callee.attrs.contains(ir::FnAttrs::READNONE));
    assert_eq!(callee.cconv, ir::CallConv::SpirFunc);

    let kernel = find_function(&module, "reads_gid").unwrap();
    let calls: Vec<_> = kernel
        .insts
        .iter()
        .filter_map(|(_, inst)| match &inst.kind {
            ir::InstKind::Call { callee, args, cconv, attrs } => {
                Some((*callee, args.clone(), *cconv, *attrs))
            }
            _ => None,
        })
        .collect();
    assert_eq!(calls.len(), 1, "exactly one call to get_global_id");
    let (callee_h, args, cconv, attrs) = &calls[0];
    assert_eq!(module.functions[*callee_h].name, "_Z13get_global_idj");
    assert_eq!(*cconv, ir::CallConv::SpirFunc);
    assert!(attrs.contains(ir::FnAttrs::NOUNWIND));
    assert!(attrs.contains(ir::FnAttrs::READNONE));
    assert_eq!(args.len(), 1);
    match args[0] {
        ir::Value::Const(c) => match module.constants[c] {
            ir::Constant::Int { value, .. } => assert_eq!(value, 1),
            _ => panic!("dimension index should be an integer"),
        },
        _ => panic!("dimension index should be a constant"),
    }

    // No loads or extracts of the old global survive.
    for (_, inst) in kernel.insts.iter() {
        assert!(!matches!(inst.kind, ir::InstKind::ExtractElement { .. }));
        assert!(!matches!(inst.kind, ir::InstKind::Load { .. }));
    }
}

// ---------------------------------------------------------------------------
// Scenario 4: saturated convert with rounding
// ---------------------------------------------------------------------------

#[test]
fn saturated_convert_with_rounding() {
    let mut m = spv::Module::new();
    let void = m.add_type(spv::Type::Void);
    let f32_ty = m.add_type(spv::Type::Float { width: 32 });
    let u32_ty = m.add_type(spv::Type::Int {
        width: 32,
        signed: false,
    });
    let fnty = m.add_type(spv::Type::Function {
        ret: void,
        params: vec![],
    });
    let c = m.add_constant(f32_ty, 1.5f32.to_bits() as u64);

    let label = m.fresh_id();
    let mut decorations = default_decorations();
    decorations.saturated_conversion = true;
    decorations.fp_rounding_mode = Some(spirv::FPRoundingMode::RTZ);
    let convert = m.add_value(spv::Value {
        ty: Some(u32_ty),
        name: "converted".into(),
        decorations,
        kind: spv::ValueKind::Inst(spv::Inst::Unary {
            op: spirv::Op::ConvertFToU,
            operand: c,
        }),
    });
    let ret = add_inst(&mut m, None, "", spv::Inst::Return);
    add_kernel(
        &mut m,
        "converts",
        fnty,
        vec![],
        vec![spv::Block {
            label,
            insts: vec![convert, ret],
        }],
    );

    let module = translate_module(&m, &Options::default()).expect("translation should succeed");

    let callee = find_function(&module, "_Z20convert_uint_sat_rtzf")
        .expect("saturated convert becomes a builtin call");
    assert!(callee.is_declaration());

    let kernel = find_function(&module, "converts").unwrap();
    let mut calls = 0;
    for (_, inst) in kernel.insts.iter() {
        match &inst.kind {
            ir::InstKind::Call { callee, .. } => {
                assert_eq!(module.functions[*callee].name, "_Z20convert_uint_sat_rtzf");
                calls += 1;
            }
            ir::InstKind::Cast { .. } => panic!("no direct cast should be emitted"),
            _ => {}
        }
    }
    assert_eq!(calls, 1);
}

// ---------------------------------------------------------------------------
// Scenario 5: memcpy lowering
// ---------------------------------------------------------------------------

#[test]
fn copy_memory_sized_lowering() {
    let mut m = spv::Module::new();
    let void = m.add_type(spv::Type::Void);
    let i8_ty = m.add_type(spv::Type::Int {
        width: 8,
        signed: true,
    });
    let i32_ty = m.add_type(spv::Type::Int {
        width: 32,
        signed: true,
    });
    let dst_ptr_ty = m.add_type(spv::Type::Pointer {
        elem: i8_ty,
        storage: spirv::StorageClass::Function,
    });
    let src_ptr_ty = m.add_type(spv::Type::Pointer {
        elem: i8_ty,
        storage: spirv::StorageClass::CrossWorkgroup,
    });
    let fnty = m.add_type(spv::Type::Function {
        ret: void,
        params: vec![dst_ptr_ty, src_ptr_ty],
    });
    let dst = m.add_value(spv::Value {
        ty: Some(dst_ptr_ty),
        name: "dst".into(),
        decorations: default_decorations(),
        kind: spv::ValueKind::Param {
            function: 0,
            index: 0,
        },
    });
    let src = m.add_value(spv::Value {
        ty: Some(src_ptr_ty),
        name: "src".into(),
        decorations: default_decorations(),
        kind: spv::ValueKind::Param {
            function: 0,
            index: 1,
        },
    });
    let size = m.add_constant(i32_ty, 16);

    let label = m.fresh_id();
    let copy = add_inst(
        &mut m,
        None,
        "",
        spv::Inst::CopyMemorySized {
            target: dst,
            source: src,
            size,
            access: spv::MemoryAccess {
                volatile: false,
                alignment: 4,
            },
        },
    );
    let ret = add_inst(&mut m, None, "", spv::Inst::Return);
    add_kernel(
        &mut m,
        "copies",
        fnty,
        vec![dst, src],
        vec![spv::Block {
            label,
            insts: vec![copy, ret],
        }],
    );

    let module = translate_module(&m, &Options::default()).expect("translation should succeed");

    let callee = find_function(&module, "llvm.memcpy.p0i8.p1i8.i32")
        .expect("memcpy intrinsic declared");
    assert!(callee.is_declaration());

    let kernel = find_function(&module, "copies").unwrap();
    let call = kernel
        .insts
        .iter()
        .find_map(|(_, inst)| match &inst.kind {
            ir::InstKind::Call { callee, args, .. } => Some((*callee, args.clone())),
            _ => None,
        })
        .expect("memcpy call emitted");
    assert_eq!(module.functions[call.0].name, "llvm.memcpy.p0i8.p1i8.i32");
    let args = call.1;
    assert_eq!(args.len(), 5);
    assert_eq!(args[0], ir::Value::Arg(0));
    assert_eq!(args[1], ir::Value::Arg(1));
    match args[3] {
        ir::Value::Const(c) => match module.constants[c] {
            ir::Constant::Int { value, .. } => assert_eq!(value, 4),
            _ => panic!("align should be an i32 constant"),
        },
        _ => panic!("align should be a constant"),
    }
    match args[4] {
        ir::Value::Const(c) => match module.constants[c] {
            ir::Constant::Int { value, .. } => assert_eq!(value, 0),
            _ => panic!("isvolatile should be an i1 constant"),
        },
        _ => panic!("isvolatile should be a constant"),
    }
}

// ---------------------------------------------------------------------------
// Scenario 6: struct-returning builtin post-processing
// ---------------------------------------------------------------------------

#[test]
fn struct_return_post_process() {
    let mut m = spv::Module::new();
    let void = m.add_type(spv::Type::Void);
    let i32_ty = m.add_type(spv::Type::Int {
        width: 32,
        signed: true,
    });
    let ndrange = m.add_type(spv::Type::Struct {
        members: vec![i32_ty, i32_ty, i32_ty],
        name: "struct.ndrange_t".into(),
        packed: false,
    });
    let ndrange_ptr = m.add_type(spv::Type::Pointer {
        elem: ndrange,
        storage: spirv::StorageClass::Function,
    });
    let fnty = m.add_type(spv::Type::Function {
        ret: void,
        params: vec![],
    });
    let gsize = m.add_constant(i32_ty, 64);

    let label = m.fresh_id();
    // Function-scope variable: becomes the alloca receiving the range.
    let slot = m.add_value(spv::Value {
        ty: Some(ndrange_ptr),
        name: "nd".into(),
        decorations: default_decorations(),
        kind: spv::ValueKind::Variable {
            storage: spirv::StorageClass::Function,
            init: None,
        },
    });
    let build = add_inst(
        &mut m,
        Some(ndrange),
        "range",
        spv::Inst::Other {
            op: spirv::Op::BuildNDRange,
            operands: vec![gsize],
        },
    );
    let store = add_inst(
        &mut m,
        None,
        "",
        spv::Inst::Store {
            ptr: slot,
            value: build,
            access: spv::MemoryAccess::default(),
        },
    );
    let ret = add_inst(&mut m, None, "", spv::Inst::Return);
    add_kernel(
        &mut m,
        "builds_ndrange",
        fnty,
        vec![],
        vec![spv::Block {
            label,
            insts: vec![slot, build, store, ret],
        }],
    );

    let module = translate_module(&m, &Options::default()).expect("translation should succeed");

    // The declaration now returns void and takes the result pointer first.
    let decl = find_function(&module, "_Z10ndrange_1Di")
        .expect("rewritten ndrange_1D declaration");
    assert!(decl.is_declaration());
    let ir::TypeInner::Function { ret, params, .. } = &module.types[decl.ty].inner else {
        panic!("expected function type");
    };
    assert!(matches!(module.types[*ret].inner, ir::TypeInner::Void));
    assert_eq!(params.len(), 2);
    match module.types[params[0]].inner {
        ir::TypeInner::Pointer { pointee, space } => {
            assert_eq!(space, ir::AddressSpace::PRIVATE);
            assert!(module.types[pointee].inner.is_struct());
        }
        _ => panic!("first parameter should be the result pointer"),
    }

    // The old declaration is detached.
    assert!(find_function(&module, "_Z10ndrange_1Di.old").is_none());

    // The store is folded into the call; its destination leads the args.
    let kernel = find_function(&module, "builds_ndrange").unwrap();
    let mut saw_call = false;
    for (_, inst) in kernel.insts.iter() {
        match &inst.kind {
            ir::InstKind::Store { .. } => panic!("consuming store should be removed"),
            ir::InstKind::Call { callee, args, .. } => {
                assert_eq!(module.functions[*callee].name, "_Z10ndrange_1Di");
                assert_eq!(args.len(), 2);
                assert!(matches!(args[0], ir::Value::Inst(_)), "dest is the alloca");
                saw_call = true;
            }
            _ => {}
        }
    }
    assert!(saw_call);
}

// ---------------------------------------------------------------------------
// Universal invariants on a composite module
// ---------------------------------------------------------------------------

#[test]
fn barrier_and_kernel_invariants() {
    let mut m = spv::Module::new();
    let void = m.add_type(spv::Type::Void);
    let fnty = m.add_type(spv::Type::Function {
        ret: void,
        params: vec![],
    });
    let label = m.fresh_id();
    // CrossWorkgroupMemory | WorkgroupMemory semantics.
    let barrier = add_inst(
        &mut m,
        None,
        "",
        spv::Inst::ControlBarrier {
            semantics: 0x300,
        },
    );
    let ret = add_inst(&mut m, None, "", spv::Inst::Return);
    add_kernel(
        &mut m,
        "syncs",
        fnty,
        vec![],
        vec![spv::Block {
            label,
            insts: vec![barrier, ret],
        }],
    );

    let module = translate_module(&m, &Options::default()).expect("translation should succeed");

    assert_nounwind_everywhere(&module);
    assert!(placeholder_globals(&module).is_empty());

    let callee = find_function(&module, "_Z7barrierj").expect("mangled barrier declared");
    assert_eq!(callee.cconv, ir::CallConv::SpirFunc);

    let kernel = find_function(&module, "syncs").unwrap();
    let call_arg = kernel
        .insts
        .iter()
        .find_map(|(_, inst)| match &inst.kind {
            ir::InstKind::Call { args, .. } => Some(args[0]),
            _ => None,
        })
        .expect("barrier call emitted");
    match call_arg {
        ir::Value::Const(c) => match module.constants[c] {
            // local | global fence flags
            ir::Constant::Int { value, .. } => assert_eq!(value, 3),
            _ => panic!("expected integer flags"),
        },
        _ => panic!("expected constant flags"),
    }

    // Every kernel appears exactly once under opencl.kernels.
    let kernels = module.named_md("opencl.kernels").unwrap();
    assert_eq!(kernels.operands.len(), 1);

    // Version metadata is present.
    assert!(module.named_md("opencl.spir.version").is_some());
    assert!(module.named_md("opencl.ocl.version").is_some());
    assert!(module.named_md("opencl.used.extensions").is_some());
    assert!(module
        .named_md("opencl.used.optional.core.features")
        .is_some());
    assert!(module.named_md("opencl.compiler.options").is_some());
}

#[test]
fn unknown_instruction_is_fatal() {
    let mut m = spv::Module::new();
    let void = m.add_type(spv::Type::Void);
    let fnty = m.add_type(spv::Type::Function {
        ret: void,
        params: vec![],
    });
    let label = m.fresh_id();
    let weird = add_inst(
        &mut m,
        None,
        "",
        spv::Inst::Other {
            op: spirv::Op::Unreachable,
            operands: vec![],
        },
    );
    add_kernel(
        &mut m,
        "broken",
        fnty,
        vec![],
        vec![spv::Block {
            label,
            insts: vec![weird],
        }],
    );

    let err = translate_module(&m, &Options::default()).unwrap_err();
    assert!(matches!(err, TranslateError::Unsupported(_)));
}
