//! Constant, variable and allocation lowering.

use spirlift_ir as ir;
use spirlift_spv as spv;
use spirlift_spv::spirv;

use crate::types::addr_space;
use crate::{Result, TranslateError, Translator};

pub(crate) fn linkage_of(linkage: Option<spirv::LinkageType>) -> ir::Linkage {
    match linkage {
        Some(_) => ir::Linkage::External,
        None => ir::Linkage::Internal,
    }
}

impl<'a> Translator<'a> {
    pub(crate) fn translate_scalar_constant(
        &mut self,
        id: spv::Id,
        value: &spv::Value,
        bits: u64,
    ) -> Result<ir::Value> {
        let ty_id = self.value_type_id(value)?;
        let lowered = self.translate_type(ty_id)?;
        let constant = match self.spv_type(ty_id)? {
            spv::Type::Bool => self.module.const_int(lowered, bits & 1, false),
            spv::Type::Int { signed, .. } => self.module.const_int(lowered, bits, *signed),
            spv::Type::Float { width } => {
                let masked = match width {
                    16 => bits & 0xFFFF,
                    32 => bits & 0xFFFF_FFFF,
                    _ => bits,
                };
                self.module.constants.append(ir::Constant::Float {
                    ty: lowered,
                    bits: masked,
                })
            }
            other => {
                return Err(TranslateError::Unsupported(format!(
                    "scalar constant of type {other:?}"
                )))
            }
        };
        self.map_value(id, ir::Value::Const(constant))
    }

    pub(crate) fn translate_composite_constant(
        &mut self,
        id: spv::Id,
        value: &spv::Value,
        elements: &[spv::Id],
        bb: Option<ir::Handle<ir::BasicBlock>>,
    ) -> Result<ir::Value> {
        let ty_id = self.value_type_id(value)?;
        let lowered = self.translate_type(ty_id)?;
        let mut elems = Vec::with_capacity(elements.len());
        for &e in elements {
            match self.translate_value(e, bb, true)? {
                ir::Value::Const(c) => elems.push(c),
                _ => {
                    return Err(TranslateError::Malformed(format!(
                        "composite constant %{id} has a non-constant element"
                    )))
                }
            }
        }
        let constant = match self.spv_type(ty_id)? {
            spv::Type::Vector { .. } => self.module.constants.append(ir::Constant::Vector {
                ty: lowered,
                elems,
            }),
            spv::Type::Array { .. } => self.module.constants.append(ir::Constant::Array {
                ty: lowered,
                elems,
            }),
            other => {
                return Err(TranslateError::Unsupported(format!(
                    "composite constant of type {other:?}"
                )))
            }
        };
        self.map_value(id, ir::Value::Const(constant))
    }

    pub(crate) fn translate_null_constant(
        &mut self,
        id: spv::Id,
        value: &spv::Value,
    ) -> Result<ir::Value> {
        let ty_id = self.value_type_id(value)?;
        let lowered = self.translate_type(ty_id)?;
        let constant = if self.module.types[lowered].inner.is_pointer() {
            self.module
                .constants
                .append(ir::Constant::NullPointer { ty: lowered })
        } else {
            self.module
                .constants
                .append(ir::Constant::AggregateZero { ty: lowered })
        };
        self.map_value(id, ir::Value::Const(constant))
    }

    /// Samplers lower to an `i32` with the literal layout
    /// `(addr_mode << 1) | normalized | ((filter_mode + 1) << 4)`.
    pub(crate) fn translate_sampler_constant(
        &mut self,
        id: spv::Id,
        addressing_mode: u32,
        normalized: u32,
        filter_mode: u32,
    ) -> Result<ir::Value> {
        let literal = (addressing_mode << 1) | normalized | ((filter_mode + 1) << 4);
        let constant = self.module.const_i32(literal);
        self.map_value(id, ir::Value::Const(constant))
    }

    pub(crate) fn translate_variable(
        &mut self,
        id: spv::Id,
        value: &spv::Value,
        storage: spirv::StorageClass,
        init: Option<spv::Id>,
        bb: Option<ir::Handle<ir::BasicBlock>>,
    ) -> Result<ir::Value> {
        let ptr_ty = self.value_type_id(value)?;
        let pointee_id = match self.spv_type(ptr_ty)? {
            spv::Type::Pointer { elem, .. } => *elem,
            _ => {
                return Err(TranslateError::Malformed(format!(
                    "variable %{id} is not pointer-typed"
                )))
            }
        };
        let ty = self.translate_type(pointee_id)?;

        if storage == spirv::StorageClass::Function {
            let bb = bb.ok_or_else(|| {
                TranslateError::Malformed(format!("function-scope variable %{id} outside a block"))
            })?;
            let result_ty = self.translate_type(ptr_ty)?;
            let alloca = self.push_inst(
                bb,
                &value.name,
                result_ty,
                ir::InstKind::Alloca {
                    allocated: ty,
                    count: None,
                    align: None,
                },
            )?;
            return self.map_value(id, alloca);
        }

        let space = addr_space(storage)?;
        let is_constant =
            storage == spirv::StorageClass::UniformConstant || value.decorations.constant;
        let init = match init {
            Some(i) => match self.translate_value(i, None, false)? {
                ir::Value::Const(c) => Some(c),
                _ => {
                    return Err(TranslateError::Malformed(format!(
                        "initializer of %{id} is not a constant"
                    )))
                }
            },
            None => None,
        };
        let unnamed_addr = is_constant && self.is_i8_array(ty);
        let gv = self.module.globals.append(ir::GlobalVariable {
            name: value.name.clone(),
            ty,
            space,
            linkage: linkage_of(value.decorations.linkage),
            is_constant,
            init,
            align: None,
            unnamed_addr,
        });
        if let Some(kind) = value.decorations.builtin {
            self.builtin_gv_map.push((gv, kind));
        }
        self.map_value(id, ir::Value::Global(gv))
    }

    fn is_i8_array(&self, ty: ir::Handle<ir::Type>) -> bool {
        match self.module.types[ty].inner {
            ir::TypeInner::Array { elem, .. } => {
                matches!(self.module.types[elem].inner, ir::TypeInner::Int { bits: 8 })
            }
            _ => false,
        }
    }

    /// Builds an all-ones constant of an integer or integer-vector type,
    /// used when lowering bitwise not.
    pub(crate) fn const_all_ones(&mut self, ty: ir::Handle<ir::Type>) -> Result<ir::Value> {
        let constant = match self.module.types[ty].inner {
            ir::TypeInner::Int { bits } => {
                let value = if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 };
                self.module.const_int(ty, value, true)
            }
            ir::TypeInner::Vector { elem, count } => {
                let lane = match self.const_all_ones(elem)? {
                    ir::Value::Const(c) => c,
                    _ => unreachable!(),
                };
                let elems = vec![lane; count as usize];
                self.module
                    .constants
                    .append(ir::Constant::Vector { ty, elems })
            }
            _ => {
                return Err(TranslateError::Malformed(
                    "bitwise not on a non-integer type".into(),
                ))
            }
        };
        Ok(ir::Value::Const(constant))
    }

    /// Builds a zero constant of an integer type (the subtrahend of a
    /// no-signed-wrap negate).
    pub(crate) fn const_zero(&mut self, ty: ir::Handle<ir::Type>) -> Result<ir::Value> {
        let constant = match self.module.types[ty].inner {
            ir::TypeInner::Int { .. } => self.module.const_int(ty, 0, true),
            ir::TypeInner::Vector { .. } => self
                .module
                .constants
                .append(ir::Constant::AggregateZero { ty }),
            _ => {
                return Err(TranslateError::Malformed(
                    "integer negate on a non-integer type".into(),
                ))
            }
        };
        Ok(ir::Value::Const(constant))
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_with_types() -> (spv::Module, spv::Id, spv::Id, spv::Id) {
        let mut m = spv::Module::new();
        let i32_id = m.add_type(spv::Type::Int {
            width: 32,
            signed: true,
        });
        let f64_id = m.add_type(spv::Type::Float { width: 64 });
        let bool_id = m.add_type(spv::Type::Bool);
        (m, i32_id, f64_id, bool_id)
    }

    #[test]
    fn scalar_int_constant() {
        let (mut m, i32_id, _, _) = module_with_types();
        let c = m.add_constant(i32_id, 7);
        let mut tr = Translator::new(&m);
        let v = tr.translate_value(c, None, false).unwrap();
        match v {
            ir::Value::Const(h) => match tr.module.constants[h] {
                ir::Constant::Int { value, signed, .. } => {
                    assert_eq!(value, 7);
                    assert!(signed);
                }
                _ => panic!("expected Int"),
            },
            _ => panic!("expected Const"),
        }
    }

    #[test]
    fn f64_constant_keeps_full_bit_pattern() {
        let (mut m, _, f64_id, _) = module_with_types();
        let bits = (-2.5f64).to_bits();
        let c = m.add_constant(f64_id, bits);
        let mut tr = Translator::new(&m);
        let v = tr.translate_value(c, None, false).unwrap();
        match v {
            ir::Value::Const(h) => match tr.module.constants[h] {
                ir::Constant::Float { bits: got, .. } => {
                    assert_eq!(f64::from_bits(got), -2.5);
                }
                _ => panic!("expected Float"),
            },
            _ => panic!("expected Const"),
        }
    }

    #[test]
    fn sampler_constant_layout() {
        // CLK_ADDRESS_CLAMP (2 pre-shift), unnormalized, CLK_FILTER_NEAREST.
        let mut m = spv::Module::new();
        let i32_id = m.add_type(spv::Type::Int {
            width: 32,
            signed: true,
        });
        let id = m.add_value(spv::Value {
            ty: Some(i32_id),
            name: String::new(),
            decorations: spv::Decorations::default(),
            kind: spv::ValueKind::ConstantSampler {
                addressing_mode: 2,
                normalized: 0,
                filter_mode: 0,
            },
        });
        let mut tr = Translator::new(&m);
        let v = tr.translate_value(id, None, false).unwrap();
        match v {
            ir::Value::Const(h) => match tr.module.constants[h] {
                ir::Constant::Int { value, .. } => {
                    assert_eq!(value, (2 << 1) | (1 << 4));
                }
                _ => panic!("expected Int"),
            },
            _ => panic!("expected Const"),
        }
    }

    #[test]
    fn string_literal_global_gets_unnamed_addr() {
        let mut m = spv::Module::new();
        let i8_id = m.add_type(spv::Type::Int {
            width: 8,
            signed: true,
        });
        let arr = m.add_type(spv::Type::Array {
            elem: i8_id,
            length: 6,
        });
        let ptr = m.add_type(spv::Type::Pointer {
            elem: arr,
            storage: spirv::StorageClass::UniformConstant,
        });
        let gv = m.add_global_variable(spv::Value {
            ty: Some(ptr),
            name: "fmt".into(),
            decorations: spv::Decorations::default(),
            kind: spv::ValueKind::Variable {
                storage: spirv::StorageClass::UniformConstant,
                init: None,
            },
        });
        let mut tr = Translator::new(&m);
        let v = tr.translate_value(gv, None, false).unwrap();
        match v {
            ir::Value::Global(h) => {
                let g = &tr.module.globals[h];
                assert!(g.is_constant);
                assert!(g.unnamed_addr);
                assert_eq!(g.space, ir::AddressSpace::CONSTANT);
            }
            _ => panic!("expected Global"),
        }
    }
}
