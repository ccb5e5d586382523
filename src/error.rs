use thiserror::Error;

/// Errors from talking to the converter over the MK3 interface.
#[derive(Debug, Error)]
pub enum Error {
    #[error("bad checksum in frame {frame}")]
    Checksum { frame: String },

    #[error("no response within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("address assignment failed after {attempts} attempts")]
    Handshake { attempts: u32 },

    #[error("malformed {what} reply: {frame}")]
    Decode { what: &'static str, frame: String },

    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
