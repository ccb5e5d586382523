pub use std::io::Write;

pub use anyhow::{anyhow, bail, Result};
pub use log::{debug, error, info, trace, warn};
pub use tokio::sync::broadcast;

pub use crate::channels::Channels;
pub use crate::config::{Config, ConfigWrapper};
pub use crate::coordinator::PollStats;
pub use crate::error::Error;
pub use crate::options::Options;
pub use crate::utils::Utils;

pub use crate::{config, coordinator, datalog_writer, publisher, vebus};
