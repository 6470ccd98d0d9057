//! Module metadata emission: target selection, kernel argument info,
//! execution-mode hints, versions, extensions and compile flags.

use spirlift_ir as ir;
use spirlift_spv as spv;
use spirlift_spv::spirv;

use crate::types::{access_qualifier_name, addr_space};
use crate::{Result, TranslateError, Translator};

pub(crate) const MD_KERNELS: &str = "opencl.kernels";
pub(crate) const MD_COMPILER_OPTIONS: &str = "opencl.compiler.options";
pub(crate) const MD_FP_CONTRACT: &str = "opencl.enable.FP_CONTRACT";
pub(crate) const MD_SPIR_VERSION: &str = "opencl.spir.version";
pub(crate) const MD_OCL_VERSION: &str = "opencl.ocl.version";
pub(crate) const MD_USED_EXTENSIONS: &str = "opencl.used.extensions";
pub(crate) const MD_OPT_CORE_FEATURES: &str = "opencl.used.optional.core.features";

const MD_ARG_ADDR_SPACE: &str = "kernel_arg_addr_space";
const MD_ARG_ACCESS_QUAL: &str = "kernel_arg_access_qual";
const MD_ARG_TYPE: &str = "kernel_arg_type";
const MD_ARG_TYPE_QUAL: &str = "kernel_arg_type_qual";
const MD_ARG_BASE_TYPE: &str = "kernel_arg_base_type";
const MD_ARG_NAME: &str = "kernel_arg_name";

const MD_REQD_WG_SIZE: &str = "reqd_work_group_size";
const MD_WG_SIZE_HINT: &str = "work_group_size_hint";
const MD_VEC_TYPE_HINT: &str = "vec_type_hint";

/// Optional core features recognized in the source-extension string.
const OPT_CORE_FEATURES: [&str; 2] = ["cl_images", "cl_doubles"];

impl<'a> Translator<'a> {
    /// Physical32/Physical64 select the 32- and 64-bit SPIR triple and
    /// data layout; Logical leaves both unset.
    pub(crate) fn translate_addressing_model(&mut self) -> Result<()> {
        match self.spv.addressing_model {
            spirv::AddressingModel::Physical64 => {
                self.module.target_triple = Some(ir::layout::TRIPLE64.into());
                self.module.data_layout = Some(ir::layout::DATALAYOUT64.into());
            }
            spirv::AddressingModel::Physical32 => {
                self.module.target_triple = Some(ir::layout::TRIPLE32.into());
                self.module.data_layout = Some(ir::layout::DATALAYOUT32.into());
            }
            spirv::AddressingModel::Logical => {}
            other => return Err(TranslateError::InvalidAddressingModel(other)),
        }
        Ok(())
    }

    pub(crate) fn emit_kernel_metadata(&mut self) -> Result<()> {
        self.module.named_md_mut(MD_KERNELS);
        let spv_module = self.spv;
        for sf in &spv_module.functions {
            let handle = match self.func_map.get(&sf.id) {
                Some(&h) => h,
                None => {
                    return Err(TranslateError::Malformed(format!(
                        "function %{} was never translated",
                        sf.id
                    )))
                }
            };
            if self.module.functions[handle].cconv != ir::CallConv::SpirKernel {
                continue;
            }

            let mut kernel_md = vec![ir::Metadata::Value(ir::Value::Func(handle))];

            // kernel_arg_addr_space
            let mut ops = vec![ir::Metadata::String(MD_ARG_ADDR_SPACE.into())];
            for &pid in &sf.params {
                let ty = self.type_id_of_value(pid)?;
                let space = match self.spv_type(ty)? {
                    spv::Type::Pointer { storage, .. } => addr_space(*storage)?.0,
                    spv::Type::Image { .. } | spv::Type::Pipe { .. } => {
                        ir::AddressSpace::GLOBAL.0
                    }
                    _ => ir::AddressSpace::PRIVATE.0,
                };
                ops.push(ir::Metadata::Int(space));
            }
            kernel_md.push(ir::Metadata::Node(ops));

            // kernel_arg_access_qual
            let mut ops = vec![ir::Metadata::String(MD_ARG_ACCESS_QUAL.into())];
            for &pid in &sf.params {
                let ty = self.type_id_of_value(pid)?;
                let qual = match self.spv_type(ty)? {
                    spv::Type::Image { access, .. } => access_qualifier_name(*access),
                    _ => "none",
                };
                ops.push(ir::Metadata::String(qual.into()));
            }
            kernel_md.push(ir::Metadata::Node(ops));

            // kernel_arg_type
            let mut ops = vec![ir::Metadata::String(MD_ARG_TYPE.into())];
            for &pid in &sf.params {
                ops.push(ir::Metadata::String(self.arg_type_name(pid)?));
            }
            kernel_md.push(ir::Metadata::Node(ops));

            // kernel_arg_type_qual
            let mut ops = vec![ir::Metadata::String(MD_ARG_TYPE_QUAL.into())];
            for &pid in &sf.params {
                ops.push(ir::Metadata::String(self.arg_type_qualifiers(pid)?));
            }
            kernel_md.push(ir::Metadata::Node(ops));

            // kernel_arg_base_type
            let mut ops = vec![ir::Metadata::String(MD_ARG_BASE_TYPE.into())];
            for &pid in &sf.params {
                ops.push(ir::Metadata::String(self.arg_type_name(pid)?));
            }
            kernel_md.push(ir::Metadata::Node(ops));

            // kernel_arg_name, only with -cl-kernel-arg-info and fully
            // named arguments.
            if spv_module.compile_flags.contains("-cl-kernel-arg-info") {
                let all_named = sf
                    .params
                    .iter()
                    .all(|&pid| spv_module.value(pid).is_some_and(|v| !v.name.is_empty()));
                if all_named {
                    let mut ops = vec![ir::Metadata::String(MD_ARG_NAME.into())];
                    for &pid in &sf.params {
                        let name = self.spv_value(pid)?.name.clone();
                        ops.push(ir::Metadata::String(name));
                    }
                    kernel_md.push(ir::Metadata::Node(ops));
                }
            }

            if let Some(size) = sf.local_size() {
                kernel_md.push(string_int_vec(MD_REQD_WG_SIZE, &size));
            }
            if let Some(size) = sf.local_size_hint() {
                kernel_md.push(string_int_vec(MD_WG_SIZE_HINT, &size));
            }
            if let Some(encoded) = sf.vec_type_hint() {
                let (hint_ty, is_integer) = self.vec_hint_type(encoded);
                let undef = self.module.const_undef(hint_ty);
                kernel_md.push(ir::Metadata::Node(vec![
                    ir::Metadata::String(MD_VEC_TYPE_HINT.into()),
                    ir::Metadata::Value(ir::Value::Const(undef)),
                    ir::Metadata::Int(u32::from(is_integer)),
                ]));
            }

            self.module
                .named_md_mut(MD_KERNELS)
                .push(ir::Metadata::Node(kernel_md));
        }
        Ok(())
    }

    fn arg_type_name(&self, pid: spv::Id) -> Result<String> {
        let value = self.spv_value(pid)?;
        let mut ty = self.value_type_id(value)?;
        // byval arguments report their pointee type.
        if value
            .decorations
            .func_param_attrs
            .contains(&spirv::FunctionParameterAttribute::ByVal)
        {
            if let spv::Type::Pointer { elem, .. } = self.spv_type(ty)? {
                ty = *elem;
            }
        }
        self.ocl_type_name(ty, !value.decorations.is_zext())
    }

    fn arg_type_qualifiers(&self, pid: spv::Id) -> Result<String> {
        let value = self.spv_value(pid)?;
        let mut qual = String::new();
        if value.decorations.volatile {
            qual.push_str("volatile");
        }
        for attr in &value.decorations.func_param_attrs {
            let word = match attr {
                spirv::FunctionParameterAttribute::NoAlias => "restrict",
                spirv::FunctionParameterAttribute::NoWrite => "const",
                _ => continue,
            };
            if !qual.is_empty() {
                qual.push(' ');
            }
            qual.push_str(word);
        }
        Ok(qual)
    }

    /// Decodes the vector-type-hint literal (high 16 bits width, low 16
    /// bits scalar kind) into an IR type.
    fn vec_hint_type(&mut self, encoded: u32) -> (ir::Handle<ir::Type>, bool) {
        let width = encoded >> 16;
        let kind = encoded & 0xFFFF;
        let (scalar, is_integer) = match kind {
            0 => (self.module.int_type(8), true),
            1 => (self.module.int_type(16), true),
            2 => (self.module.int_type(32), true),
            3 => (self.module.int_type(64), true),
            4 => (self.module.float_type(16), false),
            5 => (self.module.float_type(32), false),
            6 => (self.module.float_type(64), false),
            _ => (self.module.int_type(32), true),
        };
        if width > 1 {
            (self.module.vector_type(scalar, width), is_integer)
        } else {
            (scalar, is_integer)
        }
    }

    /// A module-level FP-contract flag is emitted unless some kernel
    /// declares `ContractionOff`.
    pub(crate) fn emit_fp_contract_metadata(&mut self) -> Result<()> {
        let contraction_off = self
            .spv
            .functions
            .iter()
            .filter(|f| self.spv.is_entry_point(f.id))
            .any(|f| f.contraction_off());
        if !contraction_off {
            self.module.named_md_mut(MD_FP_CONTRACT);
        }
        Ok(())
    }

    /// SPIR-V carries only the source language version; it doubles as the
    /// SPIR version.
    pub(crate) fn emit_source_language(&mut self) -> Result<()> {
        match self.spv.source_language {
            spirv::SourceLanguage::OpenCL_C
            | spirv::SourceLanguage::OpenCL_CPP
            | spirv::SourceLanguage::Unknown => {}
            other => {
                return Err(TranslateError::Unsupported(format!(
                    "source language {other:?}"
                )))
            }
        }
        let (major, minor) = self.spv.source_version;
        for md_name in [MD_SPIR_VERSION, MD_OCL_VERSION] {
            self.module.named_md_mut(md_name).push(ir::Metadata::Node(vec![
                ir::Metadata::Int(major),
                ir::Metadata::Int(minor),
            ]));
        }
        Ok(())
    }

    /// Splits the known optional core features out of the extension
    /// string; the rest is emitted verbatim.
    pub(crate) fn emit_source_extensions(&mut self) -> Result<()> {
        let mut extensions = self.spv.source_extensions.join(" ");
        let mut features = String::new();
        for feature in OPT_CORE_FEATURES {
            if let Some(pos) = extensions.find(feature) {
                extensions.replace_range(pos..pos + feature.len(), "");
                if !features.is_empty() {
                    features.push(' ');
                }
                features.push_str(feature);
            }
        }
        let extensions = extensions.split_whitespace().collect::<Vec<_>>().join(" ");
        push_string_md(&mut self.module, MD_USED_EXTENSIONS, &extensions);
        push_string_md(&mut self.module, MD_OPT_CORE_FEATURES, &features);
        Ok(())
    }

    pub(crate) fn emit_compiler_options(&mut self) -> Result<()> {
        let flags = self.spv.compile_flags.clone();
        push_string_md(&mut self.module, MD_COMPILER_OPTIONS, &flags);
        Ok(())
    }
}

fn string_int_vec(header: &str, ints: &[u32]) -> ir::Metadata {
    let mut ops = vec![ir::Metadata::String(header.into())];
    ops.extend(ints.iter().map(|&i| ir::Metadata::Int(i)));
    ir::Metadata::Node(ops)
}

/// An empty string emits an empty node, matching the consumer's schema.
fn push_string_md(module: &mut ir::Module, name: &str, value: &str) {
    let node = if value.is_empty() {
        ir::Metadata::Node(vec![])
    } else {
        ir::Metadata::Node(vec![ir::Metadata::String(value.into())])
    };
    module.named_md_mut(name).push(node);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addressing_model_selects_layout() {
        let mut m = spv::Module::new();
        m.addressing_model = spirv::AddressingModel::Physical32;
        let mut tr = Translator::new(&m);
        tr.translate_addressing_model().unwrap();
        assert_eq!(
            tr.module.target_triple.as_deref(),
            Some("spir-unknown-unknown")
        );
        assert!(tr
            .module
            .data_layout
            .as_deref()
            .unwrap()
            .starts_with("e-p:32:32:32"));
    }

    #[test]
    fn logical_addressing_leaves_layout_unset() {
        let mut m = spv::Module::new();
        m.addressing_model = spirv::AddressingModel::Logical;
        let mut tr = Translator::new(&m);
        tr.translate_addressing_model().unwrap();
        assert!(tr.module.target_triple.is_none());
        assert!(tr.module.data_layout.is_none());
    }

    #[test]
    fn extension_feature_extraction() {
        let mut m = spv::Module::new();
        m.source_extensions =
            vec!["cl_khr_fp16".into(), "cl_doubles".into(), "cl_images".into()];
        let mut tr = Translator::new(&m);
        tr.emit_source_extensions().unwrap();
        let ext = tr.module.named_md(MD_USED_EXTENSIONS).unwrap();
        match &ext.operands[0] {
            ir::Metadata::Node(ops) => match &ops[0] {
                ir::Metadata::String(s) => assert_eq!(s, "cl_khr_fp16"),
                _ => panic!("expected string"),
            },
            _ => panic!("expected node"),
        }
        let feats = tr.module.named_md(MD_OPT_CORE_FEATURES).unwrap();
        match &feats.operands[0] {
            ir::Metadata::Node(ops) => match &ops[0] {
                ir::Metadata::String(s) => assert_eq!(s, "cl_images cl_doubles"),
                _ => panic!("expected string"),
            },
            _ => panic!("expected node"),
        }
    }

    #[test]
    fn version_metadata() {
        let mut m = spv::Module::new();
        m.source_version = (2, 0);
        let mut tr = Translator::new(&m);
        tr.emit_source_language().unwrap();
        for name in [MD_SPIR_VERSION, MD_OCL_VERSION] {
            let md = tr.module.named_md(name).unwrap();
            match &md.operands[0] {
                ir::Metadata::Node(ops) => {
                    assert!(matches!(ops[0], ir::Metadata::Int(2)));
                    assert!(matches!(ops[1], ir::Metadata::Int(0)));
                }
                _ => panic!("expected node"),
            }
        }
    }

    #[test]
    fn vec_hint_decoding() {
        let m = spv::Module::new();
        let mut tr = Translator::new(&m);
        // 4 x f32
        let (ty, is_int) = tr.vec_hint_type((4 << 16) | 5);
        assert!(!is_int);
        assert!(matches!(
            tr.module.types[ty].inner,
            ir::TypeInner::Vector { count: 4, .. }
        ));
        // scalar i32
        let (ty, is_int) = tr.vec_hint_type(2);
        assert!(is_int);
        assert!(matches!(
            tr.module.types[ty].inner,
            ir::TypeInner::Int { bits: 32 }
        ));
    }
}
