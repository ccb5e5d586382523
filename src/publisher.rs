use crate::prelude::*;

use crate::vebus::reader::Sample;

use std::ffi::OsString;
use std::path::Path;
use std::sync::{Arc, Mutex};

static METRIC: &str = "MULTIPLUS_INV";

#[derive(Debug, Clone)]
pub enum ChannelData {
    Sample(Sample),
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    pub mode: &'static str,
    pub value: f64,
}

/// Turns a sample into the exported metric set. AC values are only exported
/// when asked for; the DC side is always present.
pub fn metrics(sample: &Sample, publish_ac: bool) -> Vec<Metric> {
    let mut metrics = vec![
        Metric {
            mode: "batVolts",
            value: sample.dc_voltage,
        },
        Metric {
            mode: "batAmps",
            value: sample.dc_current,
        },
        Metric {
            mode: "outputW",
            value: sample.dc_power,
        },
    ];

    if publish_ac {
        metrics.push(Metric {
            mode: "acVolts",
            value: sample.ac_voltage,
        });
        metrics.push(Metric {
            mode: "acAmps",
            value: sample.ac_current,
        });
    }

    metrics
}

pub fn render(metrics: &[Metric]) -> String {
    let mut out = String::new();
    for metric in metrics {
        out.push_str(&format!(
            "{}{{mode=\"{}\"}} {}\n",
            METRIC, metric.mode, metric.value
        ));
    }

    out
}

/// Writes the contents to a sibling .tmp file and renames it into place, so
/// a scraper never sees a half-written file.
pub fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");

    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)
}

/// Receives samples and maintains the Prometheus textfile.
#[derive(Clone)]
pub struct Publisher {
    config: ConfigWrapper,
    channels: Channels,
    stats: Arc<Mutex<PollStats>>,
}

impl Publisher {
    pub fn new(config: ConfigWrapper, channels: Channels, stats: Arc<Mutex<PollStats>>) -> Self {
        Self {
            config,
            channels,
            stats,
        }
    }

    pub async fn start(&self) -> Result<()> {
        let mut receiver = self.channels.samples.subscribe();

        info!("Publishing metrics to {}", self.config.metrics_file());

        loop {
            match receiver.recv().await {
                Ok(ChannelData::Sample(sample)) => {
                    if let Err(e) = self.publish(&sample) {
                        error!("Failed to publish metrics: {}", e);
                    }
                }
                Ok(ChannelData::Shutdown) => break,
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Lagged behind, skipped {} samples", n);
                }
            }
        }

        info!("publisher exiting");

        Ok(())
    }

    pub fn stop(&self) {
        let _ = self.channels.samples.send(ChannelData::Shutdown);
    }

    fn publish(&self, sample: &Sample) -> Result<()> {
        let metrics = metrics(sample, self.config.publish_ac());
        let path = self.config.metrics_file();

        write_atomic(Path::new(&path), &render(&metrics))?;
        self.stats.lock().unwrap().samples_published += 1;

        debug!("published {} metrics to {}", metrics.len(), path);

        Ok(())
    }
}
