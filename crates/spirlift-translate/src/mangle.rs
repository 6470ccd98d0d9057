//! Itanium-style OpenCL name mangling.
//!
//! A pure function from an unmangled builtin name and its argument types
//! to the external symbol the consumer ABI expects. Address-space
//! qualifiers use the `U3AS<n>` vendor extension; repeated compound types
//! compress through standard substitutions (`S_`, `S0_`, …).

/// A builtin scalar, or a named opaque source type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Primitive {
    Void,
    Bool,
    Char,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    Half,
    Float,
    Double,
    /// A named source type (e.g. `ocl_sampler`), encoded as `<len><name>`.
    Named(String),
}

impl Primitive {
    fn is_builtin(&self) -> bool {
        !matches!(self, Self::Named(_))
    }

    fn code(&self) -> String {
        match self {
            Self::Void => "v".into(),
            Self::Bool => "b".into(),
            Self::Char => "c".into(),
            Self::UChar => "h".into(),
            Self::Short => "s".into(),
            Self::UShort => "t".into(),
            Self::Int => "i".into(),
            Self::UInt => "j".into(),
            Self::Long => "l".into(),
            Self::ULong => "m".into(),
            Self::Half => "Dh".into(),
            Self::Float => "f".into(),
            Self::Double => "d".into(),
            Self::Named(name) => format!("{}{}", name.len(), name),
        }
    }
}

/// An argument type descriptor for the mangler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MangleType {
    Primitive(Primitive),
    Vector { elem: Primitive, count: u32 },
    Pointer {
        pointee: Box<MangleType>,
        addr_space: u32,
    },
}

impl MangleType {
    /// The full encoding of this type with no substitutions applied.
    fn canonical(&self) -> String {
        match self {
            Self::Primitive(p) => p.code(),
            Self::Vector { elem, count } => format!("Dv{count}_{}", elem.code()),
            Self::Pointer {
                pointee,
                addr_space,
            } => {
                if *addr_space == 0 {
                    format!("P{}", pointee.canonical())
                } else {
                    format!("PU3AS{addr_space}{}", pointee.canonical())
                }
            }
        }
    }
}

struct Mangler {
    out: String,
    substitutions: Vec<String>,
}

impl Mangler {
    fn try_substitute(&mut self, canonical: &str) -> bool {
        if let Some(index) = self.substitutions.iter().position(|s| s == canonical) {
            self.out.push_str(&substitution_token(index));
            true
        } else {
            false
        }
    }

    fn record(&mut self, canonical: String) {
        if !self.substitutions.contains(&canonical) {
            self.substitutions.push(canonical);
        }
    }

    fn encode(&mut self, ty: &MangleType) {
        let canonical = ty.canonical();
        match ty {
            MangleType::Primitive(p) if p.is_builtin() => {
                self.out.push_str(&p.code());
                return;
            }
            MangleType::Primitive(p) => {
                if self.try_substitute(&canonical) {
                    return;
                }
                self.out.push_str(&p.code());
            }
            MangleType::Vector { .. } => {
                if self.try_substitute(&canonical) {
                    return;
                }
                self.out.push_str(&canonical);
            }
            MangleType::Pointer {
                pointee,
                addr_space,
            } => {
                if self.try_substitute(&canonical) {
                    return;
                }
                self.out.push('P');
                if *addr_space != 0 {
                    let qualified = format!("U3AS{addr_space}{}", pointee.canonical());
                    if !self.try_substitute(&qualified) {
                        self.out.push_str(&format!("U3AS{addr_space}"));
                        self.encode(pointee);
                        self.record(qualified);
                    }
                } else {
                    self.encode(pointee);
                }
            }
        }
        self.record(canonical);
    }
}

/// Substitution tokens: `S_`, `S0_`, `S1_`, … with base-36 indices.
fn substitution_token(index: usize) -> String {
    if index == 0 {
        "S_".into()
    } else {
        let mut n = index - 1;
        let mut digits = Vec::new();
        loop {
            let d = (n % 36) as u32;
            let c = char::from_digit(d, 36).unwrap().to_ascii_uppercase();
            digits.push(c);
            n /= 36;
            if n == 0 {
                break;
            }
        }
        digits.reverse();
        format!("S{}_", digits.into_iter().collect::<String>())
    }
}

/// Mangles `name(args...)`. A function with no arguments encodes a single
/// `v` parameter list.
pub fn mangle(name: &str, args: &[MangleType]) -> String {
    let mut mangler = Mangler {
        out: format!("_Z{}{}", name.len(), name),
        substitutions: Vec::new(),
    };
    if args.is_empty() {
        mangler.out.push('v');
    } else {
        for arg in args {
            mangler.encode(arg);
        }
    }
    mangler.out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ptr(pointee: MangleType, addr_space: u32) -> MangleType {
        MangleType::Pointer {
            pointee: Box::new(pointee),
            addr_space,
        }
    }

    #[test]
    fn zero_arg_function() {
        assert_eq!(
            mangle("get_work_dim", &[]),
            "_Z12get_work_dimv"
        );
    }

    #[test]
    fn unsigned_int_arg() {
        assert_eq!(
            mangle("get_global_id", &[MangleType::Primitive(Primitive::UInt)]),
            "_Z13get_global_idj"
        );
        assert_eq!(
            mangle("barrier", &[MangleType::Primitive(Primitive::UInt)]),
            "_Z7barrierj"
        );
    }

    #[test]
    fn pointer_with_address_space() {
        let args = [
            ptr(MangleType::Primitive(Primitive::Int), 1),
            MangleType::Primitive(Primitive::Int),
        ];
        assert_eq!(mangle("atomic_add", &args), "_Z10atomic_addPU3AS1ii");
    }

    #[test]
    fn private_pointer_has_no_qualifier() {
        let args = [ptr(MangleType::Primitive(Primitive::Float), 0)];
        assert_eq!(mangle("frexp", &args), "_Z5frexpPf");
    }

    #[test]
    fn vector_substitution() {
        let v4f = MangleType::Vector {
            elem: Primitive::Float,
            count: 4,
        };
        let v4u = MangleType::Vector {
            elem: Primitive::UInt,
            count: 4,
        };
        assert_eq!(
            mangle("shuffle2", &[v4f.clone(), v4f, v4u]),
            "_Z8shuffle2Dv4_fS_Dv4_j"
        );
    }

    #[test]
    fn repeated_pointer_substitution() {
        // The qualified pointee registers first (S_), the pointer second
        // (S0_); a repeat of the whole pointer type uses the second token.
        let p = ptr(MangleType::Primitive(Primitive::Float), 1);
        assert_eq!(
            mangle("sincos", &[
                MangleType::Primitive(Primitive::Float),
                p.clone(),
                p
            ]),
            "_Z6sincosfPU3AS1fS0_"
        );
    }

    #[test]
    fn named_type_arg() {
        let sampler = MangleType::Primitive(Primitive::Named("ocl_sampler".into()));
        assert_eq!(
            mangle("f", &[sampler.clone(), sampler]),
            "_Z1f11ocl_samplerS_"
        );
    }

    #[test]
    fn convert_builtin() {
        assert_eq!(
            mangle("convert_uint_sat_rtz", &[MangleType::Primitive(Primitive::Float)]),
            "_Z20convert_uint_sat_rtzf"
        );
    }

    #[test]
    fn substitution_tokens() {
        assert_eq!(substitution_token(0), "S_");
        assert_eq!(substitution_token(1), "S0_");
        assert_eq!(substitution_token(11), "SA_");
        assert_eq!(substitution_token(37), "S10_");
    }
}
