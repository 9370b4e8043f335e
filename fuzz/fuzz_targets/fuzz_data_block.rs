#![no_main]

use fastmeter_rs::payload::config::parse_fast_meter_config;
use fastmeter_rs::payload::data::parse_fast_meter_data;
use fastmeter_rs::payload::dna::parse_dna;
use fastmeter_rs::payload::encode_block;
use fastmeter_rs::CommandCode;
use libfuzzer_sys::fuzz_target;

const CONFIG: CommandCode = CommandCode::new([0xA5, 0xC1]);
const DATA: CommandCode = CommandCode::new([0xA5, 0xD1]);

fuzz_target!(|data: &[u8]| {
    // First byte picks the split between configuration and data payloads
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = (split as usize).min(rest.len());
    let (config_payload, data_payload) = rest.split_at(split);
    if config_payload.len() > 250 || data_payload.len() > 250 {
        return;
    }

    let Ok(config) = parse_fast_meter_config(&encode_block(CONFIG, config_payload), CONFIG) else {
        return;
    };
    let Ok(dna) = parse_dna(b"\"A\",\"B\",\"C\",\"D\",\"E\",\"F\",\"G\",\"H\",\"00\"\r\n") else {
        return;
    };
    let _ = config.data_length();
    let _ = parse_fast_meter_data(&encode_block(DATA, data_payload), DATA, &config, &dna);
});
