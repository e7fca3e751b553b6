#![no_main]
use libfuzzer_sys::fuzz_target;
use warcar::car::BlockReader;
use warcar::dagcbor::decode_headers;

fuzz_target!(|data: &[u8]| {
    // Framing and header-object decoding must only ever return errors.
    let Ok(reader) = BlockReader::new(data) else {
        return;
    };
    for block in reader {
        match block {
            Ok(block) => {
                let _ = decode_headers(&block.data);
            }
            Err(_) => break,
        }
    }
});
