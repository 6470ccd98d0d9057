//! Target triple and data layout strings for the OpenCL SPIR profile.

/// Target triple for 32-bit SPIR.
pub const TRIPLE32: &str = "spir-unknown-unknown";
/// Target triple for 64-bit SPIR.
pub const TRIPLE64: &str = "spir64-unknown-unknown";

/// Data layout for 32-bit SPIR.
pub const DATALAYOUT32: &str = "e-p:32:32:32-i1:8:8-i8:8:8-i16:16:16-i32:32:32\
-i64:64:64-f32:32:32-f64:64:64-v16:16:16-v24:32:32\
-v32:32:32-v48:64:64-v64:64:64-v96:128:128\
-v128:128:128-v192:256:256-v256:256:256\
-v512:512:512-v1024:1024:1024";

/// Data layout for 64-bit SPIR.
pub const DATALAYOUT64: &str = "e-p:64:64:64-i1:8:8-i8:8:8-i16:16:16-i32:32:32\
-i64:64:64-f32:32:32-f64:64:64-v16:16:16-v24:32:32\
-v32:32:32-v48:64:64-v64:64:64-v96:128:128\
-v128:128:128-v192:256:256-v256:256:256\
-v512:512:512-v1024:1024:1024";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_differ_only_in_pointer_width() {
        assert!(DATALAYOUT32.starts_with("e-p:32:32:32"));
        assert!(DATALAYOUT64.starts_with("e-p:64:64:64"));
        assert_eq!(
            DATALAYOUT32.trim_start_matches("e-p:32:32:32"),
            DATALAYOUT64.trim_start_matches("e-p:64:64:64")
        );
    }

    #[test]
    fn triples() {
        assert_eq!(TRIPLE32, "spir-unknown-unknown");
        assert_eq!(TRIPLE64, "spir64-unknown-unknown");
    }
}
