//! Relay identity (`ID` command).
//!
//! Each line of the response has the form `"KEY=value","checksum"`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::ParseError;

const BLOCK: &str = "ID";

static ID_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(FID|BFID|CID|DEVID|DEVCODE|PARTNO|CONFIG|SPECIAL)=([^"]*)","([^"]*)""#)
        .expect("ID line pattern is a valid literal")
});

/// Firmware and hardware identification of a relay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelayIdentity {
    pub fid: String,
    pub bfid: String,
    pub cid: String,
    pub devid: String,
    pub partno: String,
    pub config: String,
    pub devcode: Option<String>,
    pub special: Option<String>,
}

fn required(fields: &mut HashMap<String, String>, field: &'static str) -> Result<String, ParseError> {
    fields
        .remove(field)
        .ok_or(ParseError::MissingField { block: BLOCK, field })
}

/// Parse an `ID` response.
pub fn parse_identity(raw: &[u8]) -> Result<RelayIdentity, ParseError> {
    let text = String::from_utf8_lossy(raw);

    let mut fields = HashMap::new();
    for captures in ID_LINE.captures_iter(&text) {
        fields
            .entry(captures[1].to_string())
            .or_insert_with(|| captures[2].trim().to_string());
    }

    Ok(RelayIdentity {
        fid: required(&mut fields, "FID")?,
        bfid: required(&mut fields, "BFID")?,
        cid: required(&mut fields, "CID")?,
        devid: required(&mut fields, "DEVID")?,
        partno: required(&mut fields, "PARTNO")?,
        config: required(&mut fields, "CONFIG")?,
        devcode: fields.remove("DEVCODE"),
        special: fields.remove("SPECIAL"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &[u8] = b"ID\r\n\
\"FID=SEL-351S-6-R514-V0-Z103100-D20180220\",\"09A6\"\r\n\
\"BFID=SLBT-3CF1-R102-V0-Z100100-D20150622\",\"0940\"\r\n\
\"CID=5A47\",\"0268\"\r\n\
\"DEVID=FEEDER 12\",\"0427\"\r\n\
\"DEVCODE=70\",\"0313\"\r\n\
\"PARTNO=0351S61H3351321\",\"0543\"\r\n\
\"CONFIG=11110101\",\"03E7\"\r\n\
\r\n=>";

    #[test]
    fn test_parse_identity() {
        let identity = parse_identity(RESPONSE).unwrap();
        assert_eq!(identity.fid, "SEL-351S-6-R514-V0-Z103100-D20180220");
        assert_eq!(identity.bfid, "SLBT-3CF1-R102-V0-Z100100-D20150622");
        assert_eq!(identity.cid, "5A47");
        assert_eq!(identity.devid, "FEEDER 12");
        assert_eq!(identity.partno, "0351S61H3351321");
        assert_eq!(identity.config, "11110101");
        assert_eq!(identity.devcode.as_deref(), Some("70"));
        assert_eq!(identity.special, None);
    }

    #[test]
    fn test_missing_required_field() {
        assert_eq!(
            parse_identity(b"\"FID=SEL-351\",\"01\"\r\n"),
            Err(ParseError::MissingField { block: BLOCK, field: "BFID" })
        );
    }

    #[test]
    fn test_id_line_pattern() {
        let captures = ID_LINE.captures(r#""CID=5A47","0268""#).unwrap();
        assert_eq!(&captures[1], "CID");
        assert_eq!(&captures[2], "5A47");
        assert_eq!(&captures[3], "0268");
        assert!(ID_LINE.captures(r#""UNKNOWN=1","00""#).is_none());
    }
}
