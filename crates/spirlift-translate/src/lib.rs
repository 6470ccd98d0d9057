//! Translation engine: SPIR-V module graph → OpenCL SPIR target IR.
//!
//! The engine walks a decoded [`spv::Module`] in a fixed order — addressing
//! model, module-scope variables, functions (signature, blocks, then
//! instructions), metadata, builtin-variable demotion, post-processing —
//! and emits an equivalent [`ir::Module`]. Identity maps keyed by SPIR-V
//! ids mediate every cross-reference; forward references inside a function
//! body are carried by placeholder loads that are replaced and detached
//! when the real value materializes.

use std::collections::HashMap;
use std::path::PathBuf;

use spirlift_ir as ir;
use spirlift_spv as spv;
use spirlift_spv::spirv;

mod builtin_vars;
mod builtins;
mod constants;
mod functions;
mod inst;
pub mod mangle;
mod metadata;
mod postprocess;
mod types;

/// Name prefix of the disposable globals backing forward references.
pub const PLACEHOLDER_PREFIX: &str = "placeholder.";

/// Engine configuration.
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// When set, the emitted IR is dumped as text to this path before
    /// `translate` returns (on the failure path too).
    pub debug_ir_path: Option<PathBuf>,
}

/// Errors surfaced by the translation engine.
#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    /// The module's addressing model is not one the target knows.
    #[error("invalid addressing model {0:?}")]
    InvalidAddressingModel(spirv::AddressingModel),
    /// A referenced type id has no definition.
    #[error("unknown type id %{0}")]
    UnknownType(spv::Id),
    /// A referenced value id has no definition.
    #[error("unknown value id %{0}")]
    UnknownValue(spv::Id),
    /// An integer type has a width the target cannot express.
    #[error("invalid integer bit width {0}")]
    InvalidIntWidth(u32),
    /// A float type has a width the target cannot express.
    #[error("invalid float bit width {0}")]
    InvalidFloatWidth(u32),
    /// A pointer uses a storage class with no address-space mapping.
    #[error("invalid storage class {0:?}")]
    InvalidStorageClass(spirv::StorageClass),
    /// A recognized construct the engine does not implement.
    #[error("unsupported: {0}")]
    Unsupported(String),
    /// Structurally broken input.
    #[error("malformed module: {0}")]
    Malformed(String),
    /// An emitted call site could not be rewritten in post-processing.
    #[error("post-processing failed: {0}")]
    PostProcess(String),
}

/// Errors surfaced by [`read_spirv`].
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The binary failed to decode into the input graph.
    #[error(transparent)]
    Decode(#[from] spv::DecodeError),
    /// The graph failed to translate.
    #[error(transparent)]
    Translate(#[from] TranslateError),
}

type Result<T, E = TranslateError> = std::result::Result<T, E>;

/// Reads a SPIR-V binary and translates it to a target IR module.
pub fn read_spirv(bytes: &[u8], options: &Options) -> Result<ir::Module, ReadError> {
    let spv_module = spv::decode_bytes(bytes)?;
    Ok(translate_module(&spv_module, options)?)
}

/// Translates an already-decoded module graph.
///
/// On success the emitted module is handed to the caller; on failure it is
/// dropped after the optional debug dump.
pub fn translate_module(
    spv_module: &spv::Module,
    options: &Options,
) -> Result<ir::Module, TranslateError> {
    let mut translator = Translator::new(spv_module);
    let outcome = translator.translate();
    if let Some(path) = &options.debug_ir_path {
        let text = ir::dump_module(&translator.module);
        if let Err(e) = std::fs::write(path, text) {
            log::warn!("failed to write debug IR to {}: {e}", path.display());
        }
    }
    outcome.map(|()| translator.module)
}

/// An outstanding forward reference: the placeholder load and the private
/// global backing it.
pub(crate) struct Placeholder {
    pub load: ir::Handle<ir::Instruction>,
    pub global: ir::Handle<ir::GlobalVariable>,
}

/// Per-function translation state. Functions can be translated reentrantly
/// (a call operand forces its callee), so these live on a stack.
pub(crate) struct FnCtx {
    pub func: ir::Handle<ir::Function>,
    /// Label id → emitted block, filled by the first pass over blocks.
    pub block_map: HashMap<spv::Id, ir::Handle<ir::BasicBlock>>,
}

/// The translation engine. Owns the emitted module and the identity maps
/// for the duration of one `translate` run.
pub(crate) struct Translator<'a> {
    pub spv: &'a spv::Module,
    pub module: ir::Module,
    pub type_map: HashMap<spv::Id, ir::Handle<ir::Type>>,
    pub value_map: HashMap<spv::Id, ir::Value>,
    pub func_map: HashMap<spv::Id, ir::Handle<ir::Function>>,
    pub builtin_gv_map: Vec<(ir::Handle<ir::GlobalVariable>, spirv::BuiltIn)>,
    pub placeholder_map: HashMap<spv::Id, Placeholder>,
    pub fn_stack: Vec<FnCtx>,
}

impl<'a> Translator<'a> {
    pub fn new(spv_module: &'a spv::Module) -> Self {
        Self {
            spv: spv_module,
            module: ir::Module::new(),
            type_map: HashMap::new(),
            value_map: HashMap::new(),
            func_map: HashMap::new(),
            builtin_gv_map: Vec::new(),
            placeholder_map: HashMap::new(),
            fn_stack: Vec::new(),
        }
    }

    /// Runs the whole pipeline in the fixed consumption order.
    pub fn translate(&mut self) -> Result<()> {
        self.translate_addressing_model()?;

        let spv_module = self.spv;
        for &gv in &spv_module.global_variables {
            self.translate_value(gv, None, false)?;
        }
        log::debug!("translated {} module-scope variables", self.module.globals.len());

        for index in 0..self.spv.functions.len() {
            self.translate_function(index)?;
        }

        self.emit_kernel_metadata()?;
        self.emit_fp_contract_metadata()?;
        self.emit_source_language()?;
        self.emit_source_extensions()?;
        self.emit_compiler_options()?;
        self.demote_builtin_variables()?;
        self.post_process()?;
        Ok(())
    }

    // ----- identity maps (the only write paths) -----

    pub(crate) fn map_type(
        &mut self,
        id: spv::Id,
        ty: ir::Handle<ir::Type>,
    ) -> ir::Handle<ir::Type> {
        self.type_map.insert(id, ty);
        ty
    }

    /// Records the translation of `id`. If `id` is already mapped, the
    /// existing entry must be a placeholder load: every use is retargeted
    /// to `value` and the load and its backing global are detached.
    pub(crate) fn map_value(&mut self, id: spv::Id, value: ir::Value) -> Result<ir::Value> {
        if let Some(&existing) = self.value_map.get(&id) {
            if existing == value {
                return Ok(value);
            }
            let ph = self.placeholder_map.remove(&id).ok_or_else(|| {
                TranslateError::Malformed(format!("value %{id} translated twice"))
            })?;
            if existing != ir::Value::Inst(ph.load) {
                return Err(TranslateError::Malformed(format!(
                    "stale placeholder for value %{id}"
                )));
            }
            let name_ok = self.module.globals.try_get(ph.global)
                .is_some_and(|g| g.name.starts_with(PLACEHOLDER_PREFIX));
            if !name_ok {
                return Err(TranslateError::Malformed(format!(
                    "placeholder global for value %{id} is missing"
                )));
            }
            let func = self
                .fn_stack
                .last()
                .map(|f| f.func)
                .ok_or_else(|| TranslateError::Malformed("placeholder outside function".into()))?;
            let body = &mut self.module.functions[func];
            body.replace_all_uses(ir::Value::Inst(ph.load), value);
            body.detach_inst(ph.load);
            self.module.globals.remove(ph.global);
        }
        self.value_map.insert(id, value);
        Ok(value)
    }

    pub(crate) fn map_function(&mut self, id: spv::Id, f: ir::Handle<ir::Function>) {
        self.func_map.insert(id, f);
    }

    // ----- value translation (§4.1 protocol) -----

    /// Translates a value, reusing the mapped result unless an outstanding
    /// placeholder must now be resolved by the real definition.
    pub(crate) fn translate_value(
        &mut self,
        id: spv::Id,
        bb: Option<ir::Handle<ir::BasicBlock>>,
        create_placeholder: bool,
    ) -> Result<ir::Value> {
        if let Some(&mapped) = self.value_map.get(&id) {
            if !self.placeholder_map.contains_key(&id) || create_placeholder {
                return Ok(mapped);
            }
        }
        let value = self.translate_value_nodec(id, bb, create_placeholder)?;
        self.apply_name(id, value);
        self.apply_decorations(id, value)?;
        Ok(value)
    }

    pub(crate) fn translate_values(
        &mut self,
        ids: &[spv::Id],
        bb: Option<ir::Handle<ir::BasicBlock>>,
    ) -> Result<Vec<ir::Value>> {
        ids.iter()
            .map(|&id| self.translate_value(id, bb, true))
            .collect()
    }

    fn translate_value_nodec(
        &mut self,
        id: spv::Id,
        bb: Option<ir::Handle<ir::BasicBlock>>,
        create_placeholder: bool,
    ) -> Result<ir::Value> {
        let spv_module = self.spv;
        let value = spv_module
            .value(id)
            .ok_or(TranslateError::UnknownValue(id))?;

        match &value.kind {
            spv::ValueKind::Constant { bits } => self.translate_scalar_constant(id, value, *bits),
            spv::ValueKind::ConstantComposite { elements } => {
                self.translate_composite_constant(id, value, elements, bb)
            }
            spv::ValueKind::ConstantNull => self.translate_null_constant(id, value),
            spv::ValueKind::ConstantSampler {
                addressing_mode,
                normalized,
                filter_mode,
            } => self.translate_sampler_constant(id, *addressing_mode, *normalized, *filter_mode),
            spv::ValueKind::Undef => {
                let ty = self.value_type_id(value)?;
                let lowered = self.translate_type(ty)?;
                let undef = self.module.const_undef(lowered);
                self.map_value(id, ir::Value::Const(undef))
            }
            spv::ValueKind::Variable { storage, init } => {
                self.translate_variable(id, value, *storage, *init, bb)
            }
            spv::ValueKind::Param { index, .. } => {
                self.map_value(id, ir::Value::Arg(*index))
            }
            spv::ValueKind::Function { function } => {
                let f = self.translate_function(*function)?;
                Ok(ir::Value::Func(f))
            }
            spv::ValueKind::Label { .. } => Err(TranslateError::Malformed(format!(
                "label %{id} used as a value"
            ))),
            spv::ValueKind::Inst(inst) => {
                if create_placeholder {
                    return self.create_placeholder(id, value, bb);
                }
                let inst = inst.clone();
                self.translate_inst(id, &inst, bb)
            }
        }
    }

    /// Emits a load of a fresh private `placeholder.`-global standing in
    /// for a not-yet-translated instruction.
    fn create_placeholder(
        &mut self,
        id: spv::Id,
        value: &spv::Value,
        bb: Option<ir::Handle<ir::BasicBlock>>,
    ) -> Result<ir::Value> {
        let ty_id = self.value_type_id(value)?;
        let lowered = self.translate_type(ty_id)?;
        let bb = bb.ok_or_else(|| {
            TranslateError::Malformed(format!("forward reference to %{id} outside a block"))
        })?;
        let global = self.module.globals.append(ir::GlobalVariable {
            name: format!("{PLACEHOLDER_PREFIX}{}", value.name),
            ty: lowered,
            space: ir::AddressSpace::PRIVATE,
            linkage: ir::Linkage::Private,
            is_constant: false,
            init: None,
            align: None,
            unnamed_addr: false,
        });
        let func = self
            .fn_stack
            .last()
            .map(|f| f.func)
            .ok_or_else(|| TranslateError::Malformed("forward reference outside function".into()))?;
        let load = self.module.functions[func].append_inst(
            bb,
            ir::Instruction {
                name: non_empty(&value.name),
                ty: lowered,
                kind: ir::InstKind::Load {
                    ptr: ir::Value::Global(global),
                    align: None,
                    volatile: false,
                },
            },
        );
        self.placeholder_map.insert(id, Placeholder { load, global });
        self.map_value(id, ir::Value::Inst(load))
    }

    // ----- decorations -----

    fn apply_name(&mut self, id: spv::Id, value: ir::Value) {
        let name = match self.spv.value(id) {
            Some(v) if !v.name.is_empty() => v.name.clone(),
            _ => return,
        };
        if let ir::Value::Inst(h) = value {
            if let Some(fctx) = self.fn_stack.last() {
                if let Some(inst) = self.module.functions[fctx.func].insts.try_get(h) {
                    if inst.name.is_none() {
                        self.module.functions[fctx.func].insts[h].name = Some(name);
                    }
                }
            }
        }
    }

    /// Applies alignment decorations and the exact flag on arithmetic and
    /// logical right shifts.
    fn apply_decorations(&mut self, id: spv::Id, value: ir::Value) -> Result<()> {
        let decorations = match self.spv.value(id) {
            Some(v) => v.decorations.clone(),
            None => return Ok(()),
        };
        match value {
            ir::Value::Global(g) => {
                if let Some(align) = decorations.alignment {
                    if self.module.globals.try_get(g).is_some() {
                        self.module.globals[g].align = Some(align);
                    }
                }
            }
            ir::Value::Inst(h) => {
                let Some(fctx) = self.fn_stack.last() else {
                    return Ok(());
                };
                let func = fctx.func;
                let Some(inst) = self.module.functions[func].insts.try_get(h) else {
                    return Ok(());
                };
                match inst.kind {
                    ir::InstKind::Alloca { .. } => {
                        if let Some(align) = decorations.alignment {
                            if let ir::InstKind::Alloca { align: a, .. } =
                                &mut self.module.functions[func].insts[h].kind
                            {
                                *a = Some(align);
                            }
                        }
                    }
                    ir::InstKind::Binary {
                        op: ir::BinOp::LShr | ir::BinOp::AShr,
                        ..
                    } => {
                        if let ir::InstKind::Binary { exact, .. } =
                            &mut self.module.functions[func].insts[h].kind
                        {
                            *exact = true;
                        }
                    }
                    _ => {}
                }
            }
            _ => {}
        }
        Ok(())
    }

    // ----- small helpers shared across the impl blocks -----

    pub(crate) fn value_type_id(&self, value: &spv::Value) -> Result<spv::Id> {
        value
            .ty
            .ok_or_else(|| TranslateError::Malformed("value without a type".into()))
    }

    pub(crate) fn spv_value(&self, id: spv::Id) -> Result<&'a spv::Value> {
        self.spv.value(id).ok_or(TranslateError::UnknownValue(id))
    }

    pub(crate) fn spv_type(&self, id: spv::Id) -> Result<&'a spv::Type> {
        self.spv.type_of(id).ok_or(TranslateError::UnknownType(id))
    }

    /// The type id of a value id.
    pub(crate) fn type_id_of_value(&self, id: spv::Id) -> Result<spv::Id> {
        self.value_type_id(self.spv_value(id)?)
    }

    pub(crate) fn cur_fctx(&self) -> Result<&FnCtx> {
        self.fn_stack
            .last()
            .ok_or_else(|| TranslateError::Malformed("instruction outside a function".into()))
    }

    /// The IR type of an already-translated value in the current function.
    pub(crate) fn value_type(&mut self, value: ir::Value) -> Result<ir::Handle<ir::Type>> {
        let func = self.cur_fctx().map(|f| f.func);
        match value {
            ir::Value::Arg(_) | ir::Value::Inst(_) => {
                let func = func?;
                Ok(self.value_type_in(func, value))
            }
            other => Ok(self.value_type_in_module(other)),
        }
    }

    /// The IR type of a value local to `func` (or module-level).
    pub(crate) fn value_type_in(
        &mut self,
        func: ir::Handle<ir::Function>,
        value: ir::Value,
    ) -> ir::Handle<ir::Type> {
        match value {
            ir::Value::Arg(i) => self.module.functions[func].params[i as usize].ty,
            ir::Value::Inst(h) => self.module.functions[func].insts[h].ty,
            other => self.value_type_in_module(other),
        }
    }

    fn value_type_in_module(&mut self, value: ir::Value) -> ir::Handle<ir::Type> {
        match value {
            ir::Value::Const(c) => self.module.constants[c].ty(),
            ir::Value::Global(g) => {
                let (ty, space) = {
                    let gv = &self.module.globals[g];
                    (gv.ty, gv.space)
                };
                self.module.pointer_type(ty, space)
            }
            ir::Value::Func(f) => self.module.functions[f].ty,
            ir::Value::Arg(_) | ir::Value::Inst(_) => {
                unreachable!("function-local value handled by value_type_in")
            }
        }
    }

    /// Appends an instruction to the current function.
    pub(crate) fn push_inst(
        &mut self,
        bb: ir::Handle<ir::BasicBlock>,
        name: &str,
        ty: ir::Handle<ir::Type>,
        kind: ir::InstKind,
    ) -> Result<ir::Value> {
        let func = self.cur_fctx()?.func;
        let handle = self.module.functions[func].append_inst(
            bb,
            ir::Instruction {
                name: non_empty(name),
                ty,
                kind,
            },
        );
        Ok(ir::Value::Inst(handle))
    }
}

pub(crate) fn non_empty(name: &str) -> Option<String> {
    if name.is_empty() {
        None
    } else {
        Some(name.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_has_no_debug_path() {
        assert!(Options::default().debug_ir_path.is_none());
    }

    #[test]
    fn read_spirv_rejects_garbage() {
        let err = read_spirv(&[0, 1, 2, 3], &Options::default());
        assert!(matches!(err, Err(ReadError::Decode(_))));
    }

    #[test]
    fn error_messages_name_the_id() {
        let e = TranslateError::UnknownValue(42);
        assert_eq!(e.to_string(), "unknown value id %42");
    }
}
