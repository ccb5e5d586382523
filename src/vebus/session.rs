use crate::prelude::*;

use crate::vebus::frame::{Frame, FrameDecoder};
use crate::vebus::packet::Request;

use async_trait::async_trait;
use bytes::BytesMut;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::time::timeout;
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};
use tokio_util::codec::Decoder;

const MAX_BUFFER_SIZE: usize = 1024;

/// How long the converter gets to digest the version inquiry before we try
/// to assign an address.
const SETTLE_MS: u64 = 500;

const HANDSHAKE_ATTEMPTS: u32 = 3;

/// Byte stream to the converter, plus a way to throw away whatever input is
/// sitting in it.
#[async_trait]
pub trait Link: AsyncRead + AsyncWrite + Unpin + Send {
    async fn discard_input(&mut self) -> Result<(), Error>;
}

#[async_trait]
impl Link for SerialStream {
    async fn discard_input(&mut self) -> Result<(), Error> {
        self.clear(ClearBuffer::Input)?;
        Ok(())
    }
}

#[async_trait]
impl Link for DuplexStream {
    async fn discard_input(&mut self) -> Result<(), Error> {
        let mut sink = [0u8; 256];
        while let Ok(Ok(n)) = timeout(Duration::ZERO, self.read(&mut sink)).await {
            if n == 0 {
                break;
            }
        }
        Ok(())
    }
}

/// Request/reply exchange with the converter over one link.
pub struct Session<L: Link> {
    link: L,
    buffer: BytesMut,
    decoder: FrameDecoder,
    read_timeout: Duration,
    stats: Arc<Mutex<PollStats>>,
}

impl Session<SerialStream> {
    pub fn open(
        device: &str,
        baud: u32,
        read_timeout: Duration,
        stats: Arc<Mutex<PollStats>>,
    ) -> Result<Self, Error> {
        info!("Opening {} at {} baud", device, baud);
        let link = tokio_serial::new(device, baud).open_native_async()?;

        Ok(Self::new(link, read_timeout, stats))
    }
}

impl<L: Link> Session<L> {
    pub fn new(link: L, read_timeout: Duration, stats: Arc<Mutex<PollStats>>) -> Self {
        Self {
            link,
            buffer: BytesMut::with_capacity(MAX_BUFFER_SIZE),
            decoder: FrameDecoder::new(),
            read_timeout,
            stats,
        }
    }

    /// Makes the converter address itself. The version inquiry is sent blind;
    /// whatever the converter answers with during startup is discarded after
    /// a settle delay, then address assignment is tried a few times.
    pub async fn handshake(&mut self) -> Result<(), Error> {
        self.send(Request::Version).await?;
        tokio::time::sleep(Duration::from_millis(SETTLE_MS)).await;
        self.reset_input_buffer().await?;

        for attempt in 1..=HANDSHAKE_ATTEMPTS {
            match self.transact(Request::AssignAddress { address: 0x00 }).await {
                Ok(_) => return Ok(()),
                Err(e) => warn!(
                    "address assignment attempt {}/{} failed: {}",
                    attempt, HANDSHAKE_ATTEMPTS, e
                ),
            }
        }

        Err(Error::Handshake {
            attempts: HANDSHAKE_ATTEMPTS,
        })
    }

    /// Sends one request and returns the first reply that is not a version
    /// broadcast.
    pub async fn transact(&mut self, request: Request) -> Result<Frame, Error> {
        self.send(request).await?;

        loop {
            let frame = self.read_frame().await?;

            if frame.is_version_broadcast() {
                debug!("discarding {:?}", frame);
                self.stats.lock().unwrap().broadcasts_discarded += 1;
                continue;
            }

            return Ok(frame);
        }
    }

    /// Drops everything the converter sent that we have not consumed yet,
    /// both bytes buffered here and bytes still pending on the link.
    pub async fn reset_input_buffer(&mut self) -> Result<(), Error> {
        self.buffer.clear();
        self.link.discard_input().await
    }

    async fn send(&mut self, request: Request) -> Result<(), Error> {
        let bytes = request.bytes();
        debug!("TX {}", hex::encode(&bytes));

        self.link.write_all(&bytes).await?;
        self.link.flush().await?;
        self.stats.lock().unwrap().frames_sent += 1;

        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Frame, Error> {
        loop {
            if let Some(frame) = self.decoder.decode(&mut self.buffer)? {
                trace!("RX {:?}", frame);
                self.stats.lock().unwrap().frames_received += 1;
                return Ok(frame);
            }

            if self.buffer.len() >= MAX_BUFFER_SIZE {
                return Err(Error::Decode {
                    what: "frame",
                    frame: hex::encode(&self.buffer),
                });
            }

            match timeout(self.read_timeout, self.link.read_buf(&mut self.buffer)).await {
                Ok(Ok(0)) => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "link closed",
                    )
                    .into())
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    return Err(Error::Timeout {
                        timeout_ms: self.read_timeout.as_millis() as u64,
                    })
                }
            }
        }
    }
}
