#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut cursor = std::io::Cursor::new(data);

    // Check that it decodes without a panic.
    _ = gm1::tgx::read_tgx(&mut cursor);
});
