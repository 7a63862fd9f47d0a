//! Hardware adapter: bridges digital pins to the domain's actuator port.
//!
//! Generic over any `embedded-hal` pins, so the same adapter drives the
//! sysfs GPIO driver on a Pi and [`SimPin`](crate::drivers::sim_pin::SimPin)
//! on a development host.  This is the only module in the system that
//! touches pin levels.
//!
//! Outputs are active-high.  The stop button is wired with a pull-down,
//! so a high level means pressed.

use embedded_hal::digital::{InputPin, OutputPin, PinState};
use log::{info, warn};

use crate::app::ports::{ActuatorPort, Input, Level, Output, SensorPort, SensorSnapshot};
use crate::error::{ActuatorFault, SensorError};

/// Light relay, pump relay and stop button behind [`ActuatorPort`].
pub struct GpioActuators<L, P, B>
where
    L: OutputPin,
    P: OutputPin,
    B: InputPin,
{
    light: L,
    pump: P,
    stop_button: B,
    released: bool,
}

impl<L, P, B> GpioActuators<L, P, B>
where
    L: OutputPin,
    P: OutputPin,
    B: InputPin,
{
    pub fn new(light: L, pump: P, stop_button: B) -> Self {
        Self {
            light,
            pump,
            stop_button,
            released: false,
        }
    }

    fn write(&mut self, output: Output, state: PinState) -> Result<(), ActuatorFault> {
        let result = match output {
            Output::Light => self.light.set_state(state).map_err(|e| format!("{e:?}")),
            Output::Pump => self.pump.set_state(state).map_err(|e| format!("{e:?}")),
        };
        result.map_err(|reason| ActuatorFault::WriteFailed { output, reason })
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<L, P, B> ActuatorPort for GpioActuators<L, P, B>
where
    L: OutputPin,
    P: OutputPin,
    B: InputPin,
{
    fn set(&mut self, output: Output, level: Level) -> Result<(), ActuatorFault> {
        if self.released {
            return Err(ActuatorFault::Released);
        }
        self.write(output, PinState::from(level == Level::On))
    }

    fn read(&mut self, input: Input) -> Result<bool, ActuatorFault> {
        if self.released {
            return Err(ActuatorFault::Released);
        }
        match input {
            Input::StopButton => self.stop_button.is_high().map_err(|e| ActuatorFault::ReadFailed {
                input,
                reason: format!("{e:?}"),
            }),
        }
    }

    fn release(&mut self) -> Result<(), ActuatorFault> {
        if self.released {
            return Ok(());
        }
        // Both outputs are attempted; the first failure is reported.
        let light = self.write(Output::Light, PinState::Low);
        let pump = self.write(Output::Pump, PinState::Low);
        self.released = true;
        info!("Hardware: outputs low, pins released");
        light.and(pump)
    }
}

impl<L, P, B> Drop for GpioActuators<L, P, B>
where
    L: OutputPin,
    P: OutputPin,
    B: InputPin,
{
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!("Hardware: dropped without release, forcing outputs low");
        let _ = self.light.set_low();
        let _ = self.pump.set_low();
    }
}

// ── SensorPort implementation ─────────────────────────────────

/// Sensor port for a rig with no probes fitted.  Every sample is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbes;

impl SensorPort for NoProbes {
    fn sample(&mut self) -> Result<SensorSnapshot, SensorError> {
        Ok(SensorSnapshot::default())
    }
}
