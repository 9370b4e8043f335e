#![no_main]

use fastmeter_rs::payload::dna::parse_dna;
use fastmeter_rs::payload::id::parse_identity;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = parse_dna(data);
    let _ = parse_identity(data);
});
