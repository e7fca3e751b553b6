#![no_main]
use libfuzzer_sys::fuzz_target;
use warcar::transcode::warc_to_car;
use warcar::warc::WarcReader;

fuzz_target!(|data: &[u8]| {
    for record in WarcReader::new(data) {
        if record.is_err() {
            break;
        }
    }

    // Whatever parses must also transcode.
    let mut car = Vec::new();
    let _ = warc_to_car(data, &mut car);
});
