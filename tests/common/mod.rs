//! Shared relay fixtures for the integration tests.
//!
//! Builds the blocks of a small relay: two analog channels (IA scaled by
//! 0.5, FREQ as a float), one time stamp and one digital bank.

#![allow(dead_code)]

use fastmeter_rs::payload::encode_block;
use fastmeter_rs::relay::AccessLevel;
use fastmeter_rs::{ClientSettings, CommandCode, CommandSet, MockRelay, RelaySession};

pub const DEFINITION: CommandCode = CommandCode::new([0xA5, 0xC0]);
pub const CONFIG_REGULAR: CommandCode = CommandCode::new([0xA5, 0xC1]);
pub const CONFIG_DEMAND: CommandCode = CommandCode::new([0xA5, 0xC2]);
pub const CONFIG_PEAK: CommandCode = CommandCode::new([0xA5, 0xC3]);
pub const DATA_REGULAR: CommandCode = CommandCode::new([0xA5, 0xD1]);
pub const DATA_DEMAND: CommandCode = CommandCode::new([0xA5, 0xD2]);
pub const DATA_PEAK: CommandCode = CommandCode::new([0xA5, 0xD3]);

pub const FID: &str = "SEL-351S-6-R514-V0-Z103100-D20180220";

/// Definition naming all three fast meters, SEL with Fast Operate and
/// Fast Message.
pub fn definition_block() -> Vec<u8> {
    definition_block_with_flags(&[])
}

/// [`definition_block`] with status flag entries.
pub fn definition_block_with_flags(flags: &[(u16, [u8; 6])]) -> Vec<u8> {
    let mut payload = vec![0x02, 0x03, flags.len() as u8];
    for (config, data) in [
        (CONFIG_REGULAR, DATA_REGULAR),
        (CONFIG_DEMAND, DATA_DEMAND),
        (CONFIG_PEAK, DATA_PEAK),
    ] {
        payload.extend_from_slice(config.as_bytes());
        payload.extend_from_slice(data.as_bytes());
    }
    payload.push(0x01);
    for (status_bit, affected) in flags {
        payload.extend_from_slice(&status_bit.to_be_bytes());
        payload.extend_from_slice(affected);
    }
    payload.extend_from_slice(&[0x01, 0x00, 0x00, 0x02]);
    encode_block(DEFINITION, &payload)
}

pub fn config_block(code: CommandCode) -> Vec<u8> {
    let mut payload = vec![0x01, 0x02, 0x01, 0x02, 0x01, 0x01, 0x00];
    payload.extend_from_slice(&[0x00, 0x04, 0x00, 0x0A, 0x00, 0x12]);
    payload.extend_from_slice(b"IA\0\0\0\0");
    payload.extend_from_slice(&[0x00, 0x00, 0x00, 0x13]);
    payload.extend_from_slice(b"FREQ\0\0");
    payload.extend_from_slice(&[0x01, 0xFF, 0xFF, 0xFF]);
    encode_block(code, &payload)
}

/// Data block matching [`config_block`].
pub fn data_block(code: CommandCode, status: u8, ia_raw: i16, freq: f32, digitals: u8) -> Vec<u8> {
    let mut payload = vec![status];
    payload.extend_from_slice(&ia_raw.to_be_bytes());
    payload.extend_from_slice(&freq.to_be_bytes());
    // 2024-03-15 12:30:30.000
    payload.extend_from_slice(&[0x07, 0xE8, 0x03, 0x0F, 0x0C, 0x1E, 0x75, 0x30]);
    payload.push(digitals);
    payload.extend_from_slice(&0.5f32.to_be_bytes());
    encode_block(code, &payload)
}

pub const DNA_TABLE: &[u8] =
    b"\"TRIP\",\"*\",\"IN101\",\"*\",\"*\",\"*\",\"*\",\"OUT101\",\"0A1B\"\r\n";

pub fn id_response(fid: &str) -> Vec<u8> {
    format!(
        "\"FID={fid}\",\"09A6\"\r\n\
         \"BFID=SLBT-3CF1-R102-V0-Z100100-D20150622\",\"0940\"\r\n\
         \"CID=5A47\",\"0268\"\r\n\
         \"DEVID=FEEDER 12\",\"0427\"\r\n\
         \"DEVCODE=70\",\"0313\"\r\n\
         \"PARTNO=0351S61H3351321\",\"0543\"\r\n\
         \"CONFIG=11110101\",\"03E7\"\r\n"
    )
    .into_bytes()
}

/// A relay that answers the whole auto-configuration and a regular poll.
pub fn scripted_relay() -> MockRelay {
    let mut relay = MockRelay::new();
    relay.respond_binary(DEFINITION, &definition_block());
    for code in [CONFIG_REGULAR, CONFIG_DEMAND, CONFIG_PEAK] {
        relay.respond_binary(code, &config_block(code));
    }
    relay.respond_binary(
        DATA_REGULAR,
        &data_block(DATA_REGULAR, 0x00, 250, 59.98, 0b1000_0001),
    );
    relay.respond_text("DNA", AccessLevel::Acc, DNA_TABLE);
    relay.respond_text("ID", AccessLevel::Zero, &id_response(FID));
    relay
}

pub fn settings() -> ClientSettings {
    ClientSettings::immediate()
}

pub fn session(relay: MockRelay) -> RelaySession<MockRelay> {
    RelaySession::new(relay, CommandSet::default(), settings())
}

pub async fn configured_session() -> RelaySession<MockRelay> {
    RelaySession::connect(scripted_relay(), CommandSet::default(), settings())
        .await
        .expect("scripted relay configures")
}
