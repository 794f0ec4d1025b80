use std::collections::BTreeMap;
use std::fmt;

use crate::ProgramTree;
use crate::block::Block;
use crate::element::Element;

/// Default wheel diameter in centimeters.
pub const DEFAULT_WHEEL_DIAMETER: f64 = 5.6;
/// Default track width in centimeters.
pub const DEFAULT_TRACK_WIDTH: f64 = 12.0;

/// A motor output port on the brick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MotorPort {
    A,
    B,
    C,
}

impl MotorPort {
    /// Parse a port letter as written in `MOTORPORT` fields and
    /// `M<port>` slot names.
    pub fn from_letter(s: &str) -> Option<Self> {
        match s.trim() {
            "A" => Some(MotorPort::A),
            "B" => Some(MotorPort::B),
            "C" => Some(MotorPort::C),
            _ => None,
        }
    }
}

impl fmt::Display for MotorPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorPort::A => write!(f, "A"),
            MotorPort::B => write!(f, "B"),
            MotorPort::C => write!(f, "C"),
        }
    }
}

/// A sensor input port on the brick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SensorPort {
    S1,
    S2,
    S3,
    S4,
}

impl SensorPort {
    /// Parse a port number as written in `SENSORPORT` fields ("4") and
    /// `S<port>` slot names ("S4").
    pub fn from_number(s: &str) -> Option<Self> {
        let s = s.trim();
        let s = s.strip_prefix('S').unwrap_or(s);
        match s {
            "1" => Some(SensorPort::S1),
            "2" => Some(SensorPort::S2),
            "3" => Some(SensorPort::S3),
            "4" => Some(SensorPort::S4),
            _ => None,
        }
    }
}

impl fmt::Display for SensorPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorPort::S1 => write!(f, "S1"),
            SensorPort::S2 => write!(f, "S2"),
            SensorPort::S3 => write!(f, "S3"),
            SensorPort::S4 => write!(f, "S4"),
        }
    }
}

/// A drive-train role assigned to a motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveRole {
    Left,
    Right,
    None,
}

impl DriveRole {
    fn from_field(s: &str) -> Self {
        match s.trim() {
            "LEFT" => DriveRole::Left,
            "RIGHT" => DriveRole::Right,
            _ => DriveRole::None,
        }
    }
}

/// The kind of sensor bound to a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Touch,
    Ultrasonic,
    Light,
    Sound,
    Gyro,
    Color,
    Unknown,
}

impl SensorKind {
    /// Derive the kind from a `robBrick_*` block type suffix.
    pub fn from_type(block_type: &str) -> Self {
        match block_type.strip_prefix("robBrick_").unwrap_or(block_type) {
            "touch" => SensorKind::Touch,
            "ultrasonic" => SensorKind::Ultrasonic,
            "light" => SensorKind::Light,
            "sound" => SensorKind::Sound,
            "gyro" => SensorKind::Gyro,
            "colour" | "color" => SensorKind::Color,
            _ => SensorKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorConfig {
    pub port: MotorPort,
    pub regulation: bool,
    pub reverse: bool,
    pub role: DriveRole,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorConfig {
    pub port: SensorPort,
    pub kind: SensorKind,
}

/// Wheel geometry and per-port device bindings. Built once from a
/// configuration document (or the fixed default), read-only afterward.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotConfiguration {
    pub wheel_diameter: f64,
    pub track_width: f64,
    pub motors: BTreeMap<MotorPort, MotorConfig>,
    pub sensors: BTreeMap<SensorPort, SensorConfig>,
}

impl RobotConfiguration {
    pub fn motor(&self, port: MotorPort) -> Option<&MotorConfig> {
        self.motors.get(&port)
    }

    pub fn sensor(&self, port: SensorPort) -> Option<&SensorConfig> {
        self.sensors.get(&port)
    }
}

/// The fixed default: left drive motor on B, right on C, a touch sensor
/// on S1 and an ultrasonic sensor on S4.
impl Default for RobotConfiguration {
    fn default() -> Self {
        let mut motors = BTreeMap::new();
        motors.insert(
            MotorPort::B,
            MotorConfig {
                port: MotorPort::B,
                regulation: true,
                reverse: false,
                role: DriveRole::Left,
            },
        );
        motors.insert(
            MotorPort::C,
            MotorConfig {
                port: MotorPort::C,
                regulation: true,
                reverse: false,
                role: DriveRole::Right,
            },
        );
        let mut sensors = BTreeMap::new();
        sensors.insert(
            SensorPort::S1,
            SensorConfig {
                port: SensorPort::S1,
                kind: SensorKind::Touch,
            },
        );
        sensors.insert(
            SensorPort::S4,
            SensorConfig {
                port: SensorPort::S4,
                kind: SensorKind::Ultrasonic,
            },
        );
        RobotConfiguration {
            wheel_diameter: DEFAULT_WHEEL_DIAMETER,
            track_width: DEFAULT_TRACK_WIDTH,
            motors,
            sensors,
        }
    }
}

/// Raised when a configuration document is structurally unusable.
/// Malformed fragments inside a usable document are skipped instead.
#[derive(Debug)]
pub enum ConfigError {
    NotConfigRoot(String),
    NoBrickBlock,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NotConfigRoot(tag) => {
                write!(f, "configuration root must be <config>, found <{}>", tag)
            }
            ConfigError::NoBrickBlock => {
                write!(f, "configuration has no brick block")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Build a RobotConfiguration from a `config`-rooted document.
///
/// The main brick block carries the wheel geometry as fields and one
/// `value` slot per bound port: `M<port>` with a motor child, `S<port>`
/// (or any other `robBrick_*` child) with a sensor child. Malformed
/// numerics keep the defaults; malformed port slots are skipped.
pub fn parse_configuration(tree: &ProgramTree) -> Result<RobotConfiguration, ConfigError> {
    if tree.root.tag_name() != "config" {
        return Err(ConfigError::NotConfigRoot(tree.root.tag_name().to_string()));
    }
    let brick = find_brick(&tree.root).ok_or(ConfigError::NoBrickBlock)?;

    let mut config = RobotConfiguration {
        wheel_diameter: DEFAULT_WHEEL_DIAMETER,
        track_width: DEFAULT_TRACK_WIDTH,
        motors: BTreeMap::new(),
        sensors: BTreeMap::new(),
    };
    if let Some(v) = brick.field("WHEEL_DIAMETER").and_then(parse_metric) {
        config.wheel_diameter = v;
    }
    if let Some(v) = brick.field("TRACK_WIDTH").and_then(parse_metric) {
        config.track_width = v;
    }

    for slot in brick.element().children() {
        if slot.tag_name() != "value" {
            continue;
        }
        let Some(name) = slot.attribute("name") else {
            continue;
        };
        let Some(device) = slot.children().iter().find_map(Block::from_element) else {
            continue;
        };
        let device_type = device.block_type();
        if !device_type.starts_with("robBrick_") {
            continue;
        }

        if device_type.starts_with("robBrick_motor") {
            let Some(port) = name
                .as_str()
                .strip_prefix('M')
                .and_then(MotorPort::from_letter)
            else {
                continue;
            };
            config.motors.insert(
                port,
                MotorConfig {
                    port,
                    regulation: device.field("MOTOR_REGULATION") != Some("FALSE"),
                    reverse: device.field("MOTOR_REVERSE") == Some("ON"),
                    role: DriveRole::from_field(device.field("MOTOR_DRIVE").unwrap_or("")),
                },
            );
        } else {
            let Some(port) = SensorPort::from_number(name.as_str()) else {
                continue;
            };
            config.sensors.insert(
                port,
                SensorConfig {
                    port,
                    kind: SensorKind::from_type(device_type),
                },
            );
        }
    }

    Ok(config)
}

/// The main brick block: the first block typed `robBrick_*-Brick`.
fn find_brick(el: &Element) -> Option<Block<'_>> {
    if let Some(block) = Block::from_element(el) {
        let t = block.block_type();
        if t.starts_with("robBrick_") && t.ends_with("-Brick") {
            return Some(block);
        }
    }
    for child in el.children() {
        if let Some(found) = find_brick(child) {
            return Some(found);
        }
    }
    None
}

/// Parse a geometry field. Exports from some locales write a decimal
/// comma.
fn parse_metric(s: &str) -> Option<f64> {
    s.trim().replace(',', ".").parse().ok()
}
