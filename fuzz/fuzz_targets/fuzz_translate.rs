#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // The full decode + translate pipeline should never panic.
    let _ = spirlift_translate::read_spirv(data, &spirlift_translate::Options::default());
});
