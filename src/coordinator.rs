use crate::prelude::*;

use crate::datalog_writer::DatalogWriter;
use crate::vebus::reader::Reader;
use crate::vebus::session::{Link, Session};

use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Escalate to a warning on every Nth consecutive failed cycle.
const FAILURE_WARN_EVERY: u64 = 10;

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ChannelData {
    Shutdown,
}

#[derive(Debug, Default)]
pub struct PollStats {
    pub cycles_attempted: u64,
    pub cycles_completed: u64,
    pub consecutive_failures: u64,
    // Failure counters by kind
    pub checksum_errors: u64,
    pub timeouts: u64,
    pub decode_errors: u64,
    pub io_errors: u64,
    // Link traffic
    pub frames_sent: u64,
    pub frames_received: u64,
    pub broadcasts_discarded: u64,
    // Output
    pub samples_published: u64,
    pub datalog_records_written: u64,
}

impl PollStats {
    pub fn print_summary(&self) {
        info!("Poll Statistics:");
        info!("  Cycles attempted: {}", self.cycles_attempted);
        info!("  Cycles completed: {}", self.cycles_completed);
        info!("  Frames sent: {}", self.frames_sent);
        info!("  Frames received: {}", self.frames_received);
        info!("  Version broadcasts discarded: {}", self.broadcasts_discarded);
        info!("  Failures:");
        info!("    Checksum errors: {}", self.checksum_errors);
        info!("    Timeouts: {}", self.timeouts);
        info!("    Decode errors: {}", self.decode_errors);
        info!("    I/O errors: {}", self.io_errors);
        info!("  Samples published: {}", self.samples_published);
        info!("  Datalog records written: {}", self.datalog_records_written);
    }

    fn count_failure(&mut self, error: &Error) {
        match error {
            Error::Checksum { .. } => self.checksum_errors += 1,
            Error::Timeout { .. } => self.timeouts += 1,
            Error::Decode { .. } => self.decode_errors += 1,
            _ => self.io_errors += 1,
        }
        self.consecutive_failures += 1;
    }
}

/// Owns the session and drives the poll cycle on a fixed cadence.
pub struct Coordinator<L: Link> {
    config: ConfigWrapper,
    channels: Channels,
    session: Session<L>,
    datalog_writer: Option<DatalogWriter>,
    pub stats: Arc<Mutex<PollStats>>,
}

impl<L: Link> Coordinator<L> {
    pub fn new(
        config: ConfigWrapper,
        channels: Channels,
        session: Session<L>,
        datalog_writer: Option<DatalogWriter>,
        stats: Arc<Mutex<PollStats>>,
    ) -> Self {
        Self {
            config,
            channels,
            session,
            datalog_writer,
            stats,
        }
    }

    /// Handshakes, then polls until told to shut down. A failed handshake is
    /// fatal; a failed poll cycle is logged and retried on the next tick.
    pub async fn start(&mut self) -> Result<()> {
        self.session.handshake().await?;
        info!(
            "Converter addressed, polling every {}s",
            self.config.poll_interval()
        );

        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.poll_interval()));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut receiver = self.channels.to_coordinator.subscribe();

        loop {
            tokio::select! {
                _ = interval.tick() => self.poll_once().await,
                message = receiver.recv() => match message {
                    Ok(ChannelData::Shutdown) => break,
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                },
            }
        }

        info!("Shutting down coordinator");
        self.stats.lock().unwrap().print_summary();

        Ok(())
    }

    pub fn stop(&self) {
        let _ = self.channels.to_coordinator.send(ChannelData::Shutdown);
    }

    async fn poll_once(&mut self) {
        self.stats.lock().unwrap().cycles_attempted += 1;

        match Reader::new(&mut self.session).run().await {
            Ok(sample) => {
                debug!("{:?}", sample);

                let mut stats = self.stats.lock().unwrap();
                stats.cycles_completed += 1;
                stats.consecutive_failures = 0;
                drop(stats);

                if let Some(writer) = &self.datalog_writer {
                    if let Err(e) = writer.write_sample(&sample) {
                        error!("Failed to write datalog record: {}", e);
                    }
                }

                if self
                    .channels
                    .samples
                    .send(publisher::ChannelData::Sample(sample))
                    .is_err()
                {
                    warn!("No subscribers for sample, dropping it");
                }
            }
            Err(e) => {
                error!("Poll cycle failed: {}", e);

                let mut stats = self.stats.lock().unwrap();
                stats.count_failure(&e);
                if stats.consecutive_failures % FAILURE_WARN_EVERY == 0 {
                    warn!("{} consecutive poll failures", stats.consecutive_failures);
                }
            }
        }
    }
}
