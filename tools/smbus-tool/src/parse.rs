//! Argument parsing helpers.

/// Parse a decimal or `0x`-prefixed hexadecimal number.
fn parse_number(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else {
        s.parse()
    };
    parsed.map_err(|e| format!("invalid number '{}': {}", s, e))
}

pub fn parse_u8(s: &str) -> Result<u8, String> {
    let value = parse_number(s)?;
    u8::try_from(value).map_err(|_| format!("{} does not fit in a byte", s))
}

pub fn parse_u16(s: &str) -> Result<u16, String> {
    let value = parse_number(s)?;
    u16::try_from(value).map_err(|_| format!("{} does not fit in a word", s))
}

/// Validate a target address for the command line (0x03-0x77, as i2c-tools).
pub fn parse_address(s: &str) -> Result<u8, String> {
    let address = parse_u8(s)?;
    if !(0x03..=0x77).contains(&address) {
        return Err(format!("address {} out of range 0x03-0x77", s));
    }
    Ok(address)
}
