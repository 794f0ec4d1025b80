use std::collections::{BTreeMap, HashMap, VecDeque};

use nepo::config::{MotorPort, SensorPort};

use crate::hardware::{HardwarePort, SensorChannel};

/// Test double for the hardware seam.
///
/// Every call is appended to an ordered action log, the program's only
/// externally visible effect under test. Time is virtual: `delay` and
/// `play_tone` advance a millisecond clock that `timer_ms` reads back.
/// Sensor values are scripted per (port, channel): queued values are
/// consumed one per sample, and the last one sticks.
#[derive(Debug, Default)]
pub struct MockHardware {
    log: Vec<String>,
    clock_ms: u32,
    speeds: BTreeMap<MotorPort, i32>,
    tacho: BTreeMap<MotorPort, i32>,
    scripted: HashMap<(SensorPort, SensorChannel), VecDeque<f64>>,
    last_sample: HashMap<(SensorPort, SensorChannel), f64>,
    buttons: VecDeque<bool>,
}

impl MockHardware {
    pub fn new() -> Self {
        MockHardware::default()
    }

    /// The ordered interaction log.
    pub fn log(&self) -> &[String] {
        &self.log
    }

    pub fn clock_ms(&self) -> u32 {
        self.clock_ms
    }

    /// Queue a sensor value for the given port and channel.
    pub fn push_sensor(&mut self, port: SensorPort, channel: SensorChannel, value: f64) {
        self.scripted
            .entry((port, channel))
            .or_default()
            .push_back(value);
    }

    /// Queue a button-press poll result.
    pub fn push_button(&mut self, pressed: bool) {
        self.buttons.push_back(pressed);
    }

    /// Preload a tacho count, as if the motor had already turned.
    pub fn set_tacho(&mut self, port: MotorPort, degrees: i32) {
        self.tacho.insert(port, degrees);
    }

    fn record(&mut self, entry: String) {
        self.log.push(entry);
    }
}

/// Render a sample the way block literals print: integral values
/// without a decimal point.
fn fmt_num(value: f64) -> String {
    if value.is_finite() && value == value.floor() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

impl HardwarePort for MockHardware {
    fn clear_display(&mut self) {
        self.record("clearDisplay()".to_string());
    }

    fn display_text(&mut self, text: &str, x: u8, y: u8) {
        self.record(format!("displayText({:?},{},{})", text, x, y));
    }

    fn refresh_display(&mut self) {
        self.record("refreshDisplay()".to_string());
    }

    fn motor_set_speed(&mut self, port: MotorPort, speed: i32) {
        self.speeds.insert(port, speed);
        self.record(format!("motorSetSpeed({},{})", port, speed));
    }

    fn motor_rotate(&mut self, port: MotorPort, degrees: i32) {
        *self.tacho.entry(port).or_insert(0) += degrees;
        self.record(format!("motorRotate({},{})", port, degrees));
    }

    fn motor_forward(&mut self, port: MotorPort) {
        self.record(format!("motorForward({})", port));
    }

    fn motor_backward(&mut self, port: MotorPort) {
        self.record(format!("motorBackward({})", port));
    }

    fn motor_stop(&mut self, port: MotorPort, immediate: bool) {
        if immediate {
            self.record(format!("motorStop({},immediate)", port));
        } else {
            self.record(format!("motorStop({})", port));
        }
    }

    fn motor_float(&mut self, port: MotorPort) {
        self.record(format!("motorFloat({})", port));
    }

    fn motor_speed(&mut self, port: MotorPort) -> i32 {
        let speed = self.speeds.get(&port).copied().unwrap_or(0);
        self.record(format!("motorSpeed({})->{}", port, speed));
        speed
    }

    fn motor_tacho_degrees(&mut self, port: MotorPort) -> i32 {
        let degrees = self.tacho.get(&port).copied().unwrap_or(0);
        self.record(format!("motorTacho({})->{}", port, degrees));
        degrees
    }

    fn sample_sensor(&mut self, port: SensorPort, channel: SensorChannel) -> f64 {
        let key = (port, channel);
        let value = match self.scripted.get_mut(&key).and_then(|q| q.pop_front()) {
            Some(v) => {
                self.last_sample.insert(key, v);
                v
            }
            None => self.last_sample.get(&key).copied().unwrap_or(0.0),
        };
        self.record(format!("sampleSensor({},{})->{}", port, channel, fmt_num(value)));
        value
    }

    fn play_tone(&mut self, frequency_hz: u32, duration_ms: u32) {
        self.clock_ms = self.clock_ms.saturating_add(duration_ms);
        self.record(format!("playTone({},{})", frequency_hz, duration_ms));
    }

    fn delay(&mut self, ms: u32) {
        self.clock_ms = self.clock_ms.saturating_add(ms);
        self.record(format!("delay({})", ms));
    }

    fn timer_ms(&mut self) -> u32 {
        let now = self.clock_ms;
        self.record(format!("timer()->{}", now));
        now
    }

    fn wait_for_button(&mut self) {
        self.record("waitForButton()".to_string());
    }

    fn button_pressed(&mut self) -> bool {
        let pressed = self.buttons.pop_front().unwrap_or(false);
        self.record(format!("buttonPressed()->{}", pressed));
        pressed
    }
}
