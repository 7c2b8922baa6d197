#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // An even-length prefix becomes one row of 16-bit pixels.
    let row = &data[..data.len() & !1];
    if row.is_empty() || row.len() > 4096 {
        return;
    }

    let mut encoded = Vec::new();
    gm1::tgx::encode_row(&mut encoded, row, 2).unwrap();

    let mut image = gm1::Image::new((row.len() / 2) as u32, 1, gm1::TGX16).unwrap();
    gm1::tgx::decode_image(&mut &encoded[..], encoded.len() as u64, &mut image.full_view())
        .unwrap();

    assert_eq!(image.row(0), row);
});
