#![no_main]
use libfuzzer_sys::fuzz_target;
use warcar::transcode::car_to_warc;

const CAR_HEADER: [u8; 18] = [
    0x11, 0xA2, 0x65, b'r', b'o', b'o', b't', b's', 0x80, 0x67, b'v', b'e', b'r', b's', b'i',
    b'o', b'n', 0x01,
];

fuzz_target!(|data: &[u8]| {
    // Raw input, header check included.
    let _ = car_to_warc(data, &mut Vec::new());

    // Arbitrary frames after a valid archive header.
    let mut car = CAR_HEADER.to_vec();
    car.extend_from_slice(data);
    let _ = car_to_warc(&car[..], &mut Vec::new());
});
