use nom::number::streaming::le_u24;
use nom::IResult;

pub struct Utils;

impl Utils {
    /// Parses a little-endian 24-bit two's complement integer.
    pub fn le_i24(input: &[u8]) -> IResult<&[u8], i32> {
        let (input, raw) = le_u24(input)?;
        let value = if raw & 0x80_0000 != 0 {
            (raw | 0xFF00_0000) as i32
        } else {
            raw as i32
        };
        Ok((input, value))
    }
}
