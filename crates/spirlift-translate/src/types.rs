//! Type lowering (memoized structural recursion) and OpenCL type names.

use spirlift_ir as ir;
use spirlift_spv as spv;
use spirlift_spv::spirv;

use crate::{Result, TranslateError, Translator};

/// Maps a storage class to the OpenCL SPIR address space.
///
/// `Input` is admitted for builtin input variables; those globals are
/// rewritten away before the module is returned.
pub(crate) fn addr_space(storage: spirv::StorageClass) -> Result<ir::AddressSpace> {
    match storage {
        spirv::StorageClass::Function => Ok(ir::AddressSpace::PRIVATE),
        spirv::StorageClass::CrossWorkgroup => Ok(ir::AddressSpace::GLOBAL),
        spirv::StorageClass::UniformConstant => Ok(ir::AddressSpace::CONSTANT),
        spirv::StorageClass::Workgroup => Ok(ir::AddressSpace::LOCAL),
        spirv::StorageClass::Generic => Ok(ir::AddressSpace::GENERIC),
        spirv::StorageClass::Input => Ok(ir::AddressSpace::PRIVATE),
        other => Err(TranslateError::InvalidStorageClass(other)),
    }
}

/// The `opencl.*` struct name for an image type.
pub(crate) fn image_type_name(desc: &spv::ImageDescriptor) -> Result<&'static str> {
    Ok(match (desc.dim, desc.arrayed) {
        (spirv::Dim::Dim1D, false) => "opencl.image1d_t",
        (spirv::Dim::Dim1D, true) => "opencl.image1d_array_t",
        (spirv::Dim::DimBuffer, false) => "opencl.image1d_buffer_t",
        (spirv::Dim::Dim2D, false) => "opencl.image2d_t",
        (spirv::Dim::Dim2D, true) => "opencl.image2d_array_t",
        (spirv::Dim::Dim3D, false) => "opencl.image3d_t",
        other => {
            return Err(TranslateError::Unsupported(format!(
                "image dimensionality {other:?}"
            )))
        }
    })
}

/// The textual access qualifier used in image type names and metadata.
pub(crate) fn access_qualifier_name(access: spirv::AccessQualifier) -> &'static str {
    match access {
        spirv::AccessQualifier::ReadOnly => "read_only",
        spirv::AccessQualifier::WriteOnly => "write_only",
        spirv::AccessQualifier::ReadWrite => "read_write",
    }
}

impl<'a> Translator<'a> {
    /// Lowers a SPIR-V type, memoized through the type map.
    pub(crate) fn translate_type(&mut self, id: spv::Id) -> Result<ir::Handle<ir::Type>> {
        if let Some(&mapped) = self.type_map.get(&id) {
            return Ok(mapped);
        }
        let ty = self.spv_type(id)?;
        let lowered = match ty {
            spv::Type::Void => self.module.void_type(),
            spv::Type::Bool => self.module.int_type(1),
            spv::Type::Int { width, .. } => {
                if ![8, 16, 32, 64].contains(width) {
                    return Err(TranslateError::InvalidIntWidth(*width));
                }
                self.module.int_type(*width)
            }
            spv::Type::Float { width } => {
                if ![16, 32, 64].contains(width) {
                    return Err(TranslateError::InvalidFloatWidth(*width));
                }
                self.module.float_type(*width)
            }
            spv::Type::Array { elem, length } => {
                let (elem, length) = (*elem, *length);
                let elem = self.translate_type(elem)?;
                self.module.array_type(elem, length)
            }
            spv::Type::Pointer { elem, storage } => {
                let (elem, storage) = (*elem, *storage);
                let pointee = self.translate_type(elem)?;
                self.module.pointer_type(pointee, addr_space(storage)?)
            }
            spv::Type::Vector { elem, count } => {
                let (elem, count) = (*elem, *count);
                let elem = self.translate_type(elem)?;
                self.module.vector_type(elem, count)
            }
            spv::Type::Opaque { name } => self.module.opaque_struct_type(name),
            spv::Type::Struct {
                members,
                name,
                packed,
            } => {
                let (members, name, packed) = (members.clone(), name.clone(), *packed);
                let members = members
                    .iter()
                    .map(|&m| self.translate_type(m))
                    .collect::<Result<Vec<_>>>()?;
                self.module.types.insert(ir::Type {
                    name: crate::non_empty(&name),
                    inner: ir::TypeInner::Struct { members, packed },
                })
            }
            spv::Type::Function { ret, params } => {
                let (ret, params) = (*ret, params.clone());
                let ret = self.translate_type(ret)?;
                let params = params
                    .iter()
                    .map(|&p| self.translate_type(p))
                    .collect::<Result<Vec<_>>>()?;
                self.module.function_type(ret, params, false)
            }
            spv::Type::Image { descriptor, access } => {
                let name = format!(
                    "{}__{}",
                    image_type_name(descriptor)?,
                    access_qualifier_name(*access)
                );
                self.module.opaque_ptr_type(&name, ir::AddressSpace::GLOBAL)
            }
            spv::Type::Sampler => self.module.int_type(32),
            spv::Type::Pipe { .. } => self
                .module
                .opaque_ptr_type("opencl.pipe_t", ir::AddressSpace::GLOBAL),
            spv::Type::Event => self
                .module
                .opaque_ptr_type("opencl.event_t", ir::AddressSpace::PRIVATE),
            spv::Type::DeviceEvent => self
                .module
                .opaque_ptr_type("opencl.clk_event_t", ir::AddressSpace::PRIVATE),
            spv::Type::ReserveId => self
                .module
                .opaque_ptr_type("opencl.reserve_id_t", ir::AddressSpace::PRIVATE),
            spv::Type::Queue => self
                .module
                .opaque_ptr_type("opencl.queue_t", ir::AddressSpace::PRIVATE),
        };
        Ok(self.map_type(id, lowered))
    }

    pub(crate) fn translate_type_vector(
        &mut self,
        ids: &[spv::Id],
    ) -> Result<Vec<ir::Handle<ir::Type>>> {
        ids.iter().map(|&id| self.translate_type(id)).collect()
    }

    /// The textual OpenCL type name used in kernel-argument metadata.
    ///
    /// For sub-32-bit integers the signedness comes from the zext/sext
    /// decoration on the defining parameter, carried in `signed`.
    pub(crate) fn ocl_type_name(&self, id: spv::Id, signed: bool) -> Result<String> {
        let ty = self.spv_type(id)?;
        Ok(match ty {
            spv::Type::Void => "void".into(),
            spv::Type::Bool => "bool".into(),
            spv::Type::Int { width, .. } => {
                let base = match width {
                    8 => "char",
                    16 => "short",
                    32 => "int",
                    64 => "long",
                    other => return Err(TranslateError::InvalidIntWidth(*other)),
                };
                if signed {
                    base.into()
                } else {
                    format!("u{base}")
                }
            }
            spv::Type::Float { width } => match width {
                16 => "half".into(),
                32 => "float".into(),
                64 => "double".into(),
                other => return Err(TranslateError::InvalidFloatWidth(*other)),
            },
            spv::Type::Array { .. } => "array".into(),
            spv::Type::Pointer { elem, .. } => {
                format!("{}*", self.ocl_type_name(*elem, true)?)
            }
            spv::Type::Vector { elem, count } => {
                format!("{}{count}", self.ocl_type_name(*elem, signed)?)
            }
            spv::Type::Opaque { name } => name.clone(),
            spv::Type::Struct { name, .. } => {
                if let Some(rest) = name.strip_prefix("struct.") {
                    format!("struct {rest}")
                } else if let Some(rest) = name.strip_prefix("union.") {
                    format!("union {rest}")
                } else {
                    name.clone()
                }
            }
            spv::Type::Function { .. } => {
                return Err(TranslateError::Unsupported(
                    "function type in argument metadata".into(),
                ))
            }
            spv::Type::Image { descriptor, .. } => image_type_name(descriptor)?
                .trim_start_matches("opencl.")
                .into(),
            spv::Type::Sampler => "sampler_t".into(),
            spv::Type::Pipe { .. } => "pipe_t".into(),
            spv::Type::Event => "opencl.event_t".into(),
            spv::Type::DeviceEvent => "opencl.clk_event_t".into(),
            spv::Type::ReserveId => "opencl.reserve_id_t".into(),
            spv::Type::Queue => "opencl.queue_t".into(),
        })
    }
}
