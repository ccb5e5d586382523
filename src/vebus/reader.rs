use crate::prelude::*;

use crate::vebus::packet::{AcFrame, DcFrame, FrameKind, RamVar, RamVarInfo, Request};
use crate::vebus::session::{Link, Session};

use serde::Serialize;

/// One complete set of readings from a poll cycle, in volts, amps and watts.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Sample {
    pub dc_voltage: f64,
    pub dc_current: f64,
    pub dc_power: f64,
    pub ac_voltage: f64,
    pub ac_current: f64,
}

/// Runs the measurement cycle against an addressed converter.
pub struct Reader<'a, L: Link> {
    session: &'a mut Session<L>,
}

impl<'a, L: Link> Reader<'a, L> {
    pub fn new(session: &'a mut Session<L>) -> Self {
        Self { session }
    }

    /// The six-transaction cycle. Snapshot frames do not say which RAM
    /// variable their values belong to; the fixed request order is what ties
    /// raw values to the right scale pairs, so it must not be reordered.
    pub async fn run(mut self) -> Result<Sample, Error> {
        let u_inverter = self.ram_var_info(RamVar::UInverter).await?;
        let ac = self.ac_frame().await?;
        let i_inverter = self.ram_var_info(RamVar::IInverter).await?;
        let dc = self.dc_frame().await?;
        let u_battery = self.ram_var_info(RamVar::UBattery).await?;
        let i_battery = self.ram_var_info(RamVar::IBattery).await?;

        let ac_voltage = u_inverter.apply(f64::from(ac.u_inv)) * f64::from(ac.bf_factor);
        let ac_current = i_inverter.apply(f64::from(ac.i_inv)) * f64::from(ac.inverter_factor);

        let dc_voltage = u_battery.apply(f64::from(dc.voltage_raw));
        let dc_current = i_battery.apply(f64::from(dc.current_raw));

        Ok(Sample {
            dc_voltage,
            dc_current,
            dc_power: dc_voltage * dc_current,
            ac_voltage,
            ac_current,
        })
    }

    async fn ram_var_info(&mut self, var: RamVar) -> Result<RamVarInfo, Error> {
        self.session.reset_input_buffer().await?;
        let frame = self.session.transact(Request::RamVarInfo { var }).await?;

        RamVarInfo::decode(&frame)
    }

    async fn ac_frame(&mut self) -> Result<AcFrame, Error> {
        self.session.reset_input_buffer().await?;
        let frame = self
            .session
            .transact(Request::FrameInfo {
                kind: FrameKind::AcL1,
            })
            .await?;

        AcFrame::decode(&frame)
    }

    async fn dc_frame(&mut self) -> Result<DcFrame, Error> {
        self.session.reset_input_buffer().await?;
        let frame = self
            .session
            .transact(Request::FrameInfo {
                kind: FrameKind::Dc,
            })
            .await?;

        DcFrame::decode(&frame)
    }
}
