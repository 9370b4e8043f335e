#![no_main]

use fastmeter_rs::payload::config::parse_fast_meter_config;
use fastmeter_rs::payload::definition::parse_relay_definition;
use fastmeter_rs::payload::{block_available, checksum8, locate_block};
use fastmeter_rs::CommandCode;
use libfuzzer_sys::fuzz_target;

const DEFINITION: CommandCode = CommandCode::new([0xA5, 0xC0]);
const CONFIG: CommandCode = CommandCode::new([0xA5, 0xC1]);

fuzz_target!(|data: &[u8]| {
    let _ = block_available(data, DEFINITION);
    let _ = locate_block(data, DEFINITION, "fuzz");
    let _ = parse_relay_definition(data, DEFINITION);
    let _ = parse_fast_meter_config(data, CONFIG);

    // Force a consistent header and checksum so the body parsers are reached
    if data.len() >= 2 && data.len() < 250 {
        let mut framed = CONFIG.as_bytes().to_vec();
        framed.push((data.len() + 5) as u8);
        framed.extend_from_slice(data);
        framed.push(0x00);
        framed.push(checksum8(&framed));
        let _ = parse_fast_meter_config(&framed, CONFIG);

        framed[..2].copy_from_slice(DEFINITION.as_bytes());
        let last = framed.len() - 1;
        framed[last] = checksum8(&framed[..last]);
        let _ = parse_relay_definition(&framed, DEFINITION);
    }
});
