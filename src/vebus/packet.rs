use crate::prelude::*;

use crate::vebus::frame::Frame;

use nom_derive::{Nom, Parse};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Winmon sub-command for reading a RAM variable's scale and offset.
const GET_RAM_VAR_INFO: u8 = 0x36;

/// RAM variable ids, in the converter's own numbering.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum RamVar {
    UMains = 0,
    IMains = 1,
    UInverter = 2,
    IInverter = 3,
    UBattery = 4,
    IBattery = 5,
}

/// Snapshot frame selector for the F command.
#[derive(Clone, Copy, Debug, Eq, PartialEq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum FrameKind {
    Dc = 0,
    AcL1 = 1,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Request {
    Version,
    AssignAddress { address: u8 },
    RamVarInfo { var: RamVar },
    FrameInfo { kind: FrameKind },
}

impl Request {
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Request::Version => vec![b'V'],
            Request::AssignAddress { address } => vec![b'A', 0x01, *address],
            Request::RamVarInfo { var } => vec![b'W', GET_RAM_VAR_INFO, (*var).into(), 0x00],
            Request::FrameInfo { kind } => vec![b'F', (*kind).into()],
        }
    }

    /// The request as a full wire frame.
    pub fn bytes(&self) -> Vec<u8> {
        Frame::command(&self.payload())
    }
}

/// Scale and offset pair from a W reply. Raw readings become engineering
/// units via `(raw + offset) * scale(scale)`.
#[derive(PartialEq, Clone, Copy, Debug, Nom)]
#[nom(LittleEndian)]
pub struct RamVarInfo {
    #[nom(SkipBefore(3))]
    pub scale: i16,
    #[nom(SkipBefore(1))]
    pub offset: i16,
}

impl RamVarInfo {
    pub fn decode(frame: &Frame) -> Result<Self, Error> {
        match Self::parse(&frame.payload) {
            Ok((_, info)) => Ok(info),
            Err(_) => Err(Error::Decode {
                what: "ram var info",
                frame: hex::encode(&frame.payload),
            }),
        }
    }

    pub fn apply(&self, raw: f64) -> f64 {
        (raw + f64::from(self.offset)) * scale(self.scale)
    }
}

/// AC snapshot frame (F 1). The voltage and current here are raw and need
/// the scale pairs fetched around the snapshot, plus the per-frame factors.
#[derive(PartialEq, Clone, Copy, Debug, Nom)]
#[nom(LittleEndian)]
pub struct AcFrame {
    #[nom(SkipBefore(1))]
    pub bf_factor: u8,
    pub inverter_factor: u8,
    #[nom(SkipBefore(7))]
    pub u_inv: u16,
    pub i_inv: i16,
}

impl AcFrame {
    pub fn decode(frame: &Frame) -> Result<Self, Error> {
        match Self::parse(&frame.payload) {
            Ok((_, ac)) => Ok(ac),
            Err(_) => Err(Error::Decode {
                what: "ac frame",
                frame: hex::encode(&frame.payload),
            }),
        }
    }
}

/// DC snapshot frame (F 0). Current is a 24-bit two's complement value.
#[derive(PartialEq, Clone, Copy, Debug, Nom)]
#[nom(LittleEndian)]
pub struct DcFrame {
    #[nom(SkipBefore(6))]
    pub voltage_raw: u16,
    #[nom(Parse = "Utils::le_i24")]
    pub current_raw: i32,
}

impl DcFrame {
    pub fn decode(frame: &Frame) -> Result<Self, Error> {
        match Self::parse(&frame.payload) {
            Ok((_, dc)) => Ok(dc),
            Err(_) => Err(Error::Decode {
                what: "dc frame",
                frame: hex::encode(&frame.payload),
            }),
        }
    }
}

/// Expands a raw scale factor. Values of 0x4000 and up encode the
/// reciprocal 1/(0x8000 - factor); smaller values multiply directly.
pub fn scale(factor: i16) -> f64 {
    let s = i32::from(factor).abs();
    if s >= 0x4000 {
        1.0 / f64::from(0x8000 - s)
    } else {
        f64::from(s)
    }
}
