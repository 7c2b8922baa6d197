#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(reader) = gm1::Reader::from_mem(data) else {
        return;
    };

    for i in 0..reader.num_entries() {
        let header = reader.entry_header(i).unwrap();
        if header.width as usize * header.height as usize > (10 << 16) {
            continue;
        }
        _ = reader.read_entry(i);
    }
});
