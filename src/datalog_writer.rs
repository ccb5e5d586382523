use crate::prelude::*;

use crate::vebus::reader::Sample;

use serde_json::json;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct DatalogWriter {
    path: String,
    file: Arc<Mutex<std::fs::File>>,
    stats: Arc<Mutex<PollStats>>,
}

impl DatalogWriter {
    pub fn new(path: &str, stats: Arc<Mutex<PollStats>>) -> Result<Self> {
        info!("Opening datalog file at {}", path);

        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                error!("Failed to open datalog file {}: {}", path, e);
                return Err(e.into());
            }
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) =
                std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))
            {
                error!("Failed to set permissions on datalog file {}: {}", path, e);
                return Err(e.into());
            }
        }

        Ok(Self {
            path: path.to_string(),
            file: Arc::new(Mutex::new(file)),
            stats,
        })
    }

    /// Appends one sample as a JSON line.
    pub fn write_sample(&self, sample: &Sample) -> Result<()> {
        let record = json!({
            "utc_timestamp": chrono::Utc::now().timestamp(),
            "dc_voltage": sample.dc_voltage,
            "dc_current": sample.dc_current,
            "dc_power": sample.dc_power,
            "ac_voltage": sample.ac_voltage,
            "ac_current": sample.ac_current,
        });

        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("failed to lock datalog file"))?;

        if let Err(e) = writeln!(file, "{}", record) {
            error!("Failed to write to datalog file {}: {}", self.path, e);
            return Err(e.into());
        }
        file.flush()?;

        self.stats.lock().unwrap().datalog_records_written += 1;

        Ok(())
    }
}
