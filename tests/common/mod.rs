#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, DuplexStream};

use vebus_bridge::prelude::*;
use vebus_bridge::vebus::frame::Frame;
use vebus_bridge::vebus::reader::Sample;
use vebus_bridge::vebus::session::Session;

pub const READ_TIMEOUT: Duration = Duration::from_millis(1000);

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// An in-memory link pair: the local end goes into a Session, the remote end
/// plays the converter.
pub fn link_pair() -> (DuplexStream, DuplexStream) {
    tokio::io::duplex(4096)
}

pub fn session_over(link: DuplexStream) -> (Session<DuplexStream>, Arc<Mutex<PollStats>>) {
    let stats = Arc::new(Mutex::new(PollStats::default()));
    (Session::new(link, READ_TIMEOUT, stats.clone()), stats)
}

/// Reads one framed request on the converter side and returns its command
/// bytes, with the lead byte and checksum stripped.
pub async fn recv_request(link: &mut DuplexStream) -> Vec<u8> {
    let mut length = [0u8; 1];
    link.read_exact(&mut length).await.unwrap();

    let mut rest = vec![0u8; length[0] as usize + 1];
    link.read_exact(&mut rest).await.unwrap();

    rest[1..rest.len() - 1].to_vec()
}

// Converter-side reply builders. Replies use the same framing as commands.

pub fn ram_var_info_reply(scale: i16, offset: i16) -> Vec<u8> {
    let scale = scale.to_le_bytes();
    let offset = offset.to_le_bytes();

    Frame::command(&[b'W', 0x8E, scale[0], scale[1], 0x00, offset[0], offset[1]])
}

pub fn ac_frame_reply(bf_factor: u8, inverter_factor: u8, u_inv: u16, i_inv: i16) -> Vec<u8> {
    let u = u_inv.to_le_bytes();
    let i = i_inv.to_le_bytes();

    let mut body = vec![bf_factor, inverter_factor];
    body.extend_from_slice(&[0x00; 7]);
    body.extend_from_slice(&[u[0], u[1], i[0], i[1]]);

    Frame::command(&body)
}

pub fn dc_frame_reply(voltage: u16, current: i32) -> Vec<u8> {
    let v = voltage.to_le_bytes();
    let c = current.to_le_bytes();

    let mut body = vec![0x00; 5];
    body.extend_from_slice(&[v[0], v[1], c[0], c[1], c[2]]);

    Frame::command(&body)
}

pub fn version_broadcast() -> Vec<u8> {
    Frame::command(&[b'V', 0x93, 0x41, 0x0E, 0x00, 0x00])
}

pub fn address_ack() -> Vec<u8> {
    Frame::command(&[b'A', 0x01, 0x00])
}

pub fn sample() -> Sample {
    Sample {
        dc_voltage: 50.5,
        dc_current: -4.25,
        dc_power: -214.625,
        ac_voltage: 230.5,
        ac_current: 1.5,
    }
}

pub fn test_config(yaml: &str) -> Result<ConfigWrapper> {
    let config: Config = serde_yaml::from_str(yaml)?;
    Ok(ConfigWrapper::from_config(config))
}
