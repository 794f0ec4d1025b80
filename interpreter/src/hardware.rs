use nepo::config::{MotorPort, SensorPort};

/// What a sensor read asks the hardware for. One sensor kind can serve
/// several channels (a gyro reports both angle and rate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorChannel {
    Touch,
    Distance,
    Light,
    Colour,
    Loudness,
    GyroAngle,
    GyroRate,
    Compass,
}

impl SensorChannel {
    /// Parse a channel name as written in harness scripts.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim() {
            "touch" => Some(SensorChannel::Touch),
            "distance" => Some(SensorChannel::Distance),
            "light" => Some(SensorChannel::Light),
            "colour" | "color" => Some(SensorChannel::Colour),
            "loudness" => Some(SensorChannel::Loudness),
            "gyroAngle" => Some(SensorChannel::GyroAngle),
            "gyroRate" => Some(SensorChannel::GyroRate),
            "compass" => Some(SensorChannel::Compass),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SensorChannel::Touch => "touch",
            SensorChannel::Distance => "distance",
            SensorChannel::Light => "light",
            SensorChannel::Colour => "colour",
            SensorChannel::Loudness => "loudness",
            SensorChannel::GyroAngle => "gyroAngle",
            SensorChannel::GyroRate => "gyroRate",
            SensorChannel::Compass => "compass",
        }
    }
}

impl std::fmt::Display for SensorChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The external capability seam the executor drives and never
/// implements: display, motors, sensors, sound and timing.
///
/// The executor is single-threaded and all suspension (`delay`,
/// `play_tone`, the wait-until poll loop) goes through this trait, so a
/// test double fully controls time. Speeds are percentages in 0..=100;
/// rotations are signed degrees; distances follow whatever unit the
/// physical sensor reports (centimeters on the stock ultrasonic).
pub trait HardwarePort {
    fn clear_display(&mut self);
    fn display_text(&mut self, text: &str, x: u8, y: u8);
    fn refresh_display(&mut self);

    /// Apply a speed without starting motion.
    fn motor_set_speed(&mut self, port: MotorPort, speed: i32);
    /// Rotate by a signed number of degrees, blocking until done.
    fn motor_rotate(&mut self, port: MotorPort, degrees: i32);
    fn motor_forward(&mut self, port: MotorPort);
    fn motor_backward(&mut self, port: MotorPort);
    /// Brake. `immediate` brakes hard; otherwise the motor ramps down.
    fn motor_stop(&mut self, port: MotorPort, immediate: bool);
    /// Cut power and coast.
    fn motor_float(&mut self, port: MotorPort);
    fn motor_speed(&mut self, port: MotorPort) -> i32;
    /// Accumulated rotation in degrees since program start.
    fn motor_tacho_degrees(&mut self, port: MotorPort) -> i32;

    fn sample_sensor(&mut self, port: SensorPort, channel: SensorChannel) -> f64;

    /// Emit a tone, blocking for its duration.
    fn play_tone(&mut self, frequency_hz: u32, duration_ms: u32);
    fn delay(&mut self, ms: u32);
    /// Milliseconds since program start.
    fn timer_ms(&mut self) -> u32;

    fn wait_for_button(&mut self);
    fn button_pressed(&mut self) -> bool;
}
