use nepo::block::Block;
use nepo::config::{SensorKind, SensorPort};
use rand::Rng;

use crate::error::{BlockError, RuntimeError};
use crate::executor::{BlockKind, Interpreter};
use crate::hardware::SensorChannel;
use crate::runtime_value::{RuntimeValue, parse_number};

/// Nesting ceiling for value slots. The visual editor cannot produce
/// anything close to this depth.
pub(crate) const MAX_DEPTH: usize = 64;

impl Interpreter<'_> {
    /// Evaluate an expression block. Pure with respect to the Program
    /// Tree; sensor, motor-state and timer reads go through the
    /// hardware port. Unrecognized expression types yield `Empty`.
    pub(crate) fn evaluate(
        &mut self,
        block: Block,
        depth: usize,
    ) -> Result<RuntimeValue, BlockError> {
        let block_type = block.block_type();
        if depth > MAX_DEPTH {
            return Err(BlockError::new(
                block_type,
                None,
                RuntimeError::ExpressionTooDeep,
            ));
        }
        let Some(kind) = BlockKind::from_type(block_type) else {
            self.warn(block_type, "unknown expression type, yields nothing");
            return Ok(RuntimeValue::Empty);
        };

        match kind {
            // --- Literals ---
            BlockKind::MathNumber => Ok(RuntimeValue::Number(parse_number(
                block.field("NUM").unwrap_or(""),
            ))),
            BlockKind::Text => Ok(RuntimeValue::Text(
                block.field("TEXT").unwrap_or("").to_string(),
            )),
            BlockKind::LogicBoolean => {
                Ok(RuntimeValue::Boolean(block.field("BOOL") == Some("TRUE")))
            }

            // --- Variables ---
            BlockKind::VariablesGet => {
                Ok(self.variables.get(block.field("VAR").unwrap_or("")))
            }

            // --- Math ---
            BlockKind::MathArithmetic => self.math_arithmetic(block, depth),
            BlockKind::MathSingle => self.math_single(block, depth),
            BlockKind::MathRandomInt => {
                let from = self.eval_number(block, "FROM", depth)?.round() as i64;
                let to = self.eval_number(block, "TO", depth)?.round() as i64;
                let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
                let n = rand::thread_rng().gen_range(lo..=hi);
                Ok(RuntimeValue::Number(n as f64))
            }

            // --- Logic ---
            BlockKind::LogicCompare => self.logic_compare(block, depth),
            BlockKind::LogicOperation => self.logic_operation(block, depth),

            // --- Text ---
            BlockKind::TextJoin => {
                let a = self.eval_text(block, "A", depth)?;
                let b = self.eval_text(block, "B", depth)?;
                Ok(RuntimeValue::Text(format!("{}{}", a, b)))
            }

            // --- Sensor reads, gated by the configuration ---
            BlockKind::TouchIsPressed => {
                let port = self.sensor_port(block)?;
                self.require_sensor(block, port, &[SensorKind::Touch], "touch")?;
                let v = self.port.sample_sensor(port, SensorChannel::Touch);
                Ok(RuntimeValue::Boolean(v != 0.0))
            }
            BlockKind::UltrasonicDistance => {
                let port = self.sensor_port(block)?;
                self.require_sensor(block, port, &[SensorKind::Ultrasonic], "ultrasonic")?;
                Ok(RuntimeValue::Number(
                    self.port.sample_sensor(port, SensorChannel::Distance),
                ))
            }
            BlockKind::GyroAngle => {
                let port = self.sensor_port(block)?;
                self.require_sensor(block, port, &[SensorKind::Gyro], "gyro")?;
                Ok(RuntimeValue::Number(
                    self.port.sample_sensor(port, SensorChannel::GyroAngle),
                ))
            }
            BlockKind::GyroRate => {
                let port = self.sensor_port(block)?;
                self.require_sensor(block, port, &[SensorKind::Gyro], "gyro")?;
                Ok(RuntimeValue::Number(
                    self.port.sample_sensor(port, SensorChannel::GyroRate),
                ))
            }
            BlockKind::ColourColour => {
                let port = self.sensor_port(block)?;
                self.require_sensor(block, port, &[SensorKind::Color], "colour")?;
                Ok(RuntimeValue::Number(
                    self.port.sample_sensor(port, SensorChannel::Colour),
                ))
            }
            BlockKind::ColourLight => {
                let port = self.sensor_port(block)?;
                self.require_sensor(
                    block,
                    port,
                    &[SensorKind::Color, SensorKind::Light],
                    "light",
                )?;
                Ok(RuntimeValue::Number(
                    self.port.sample_sensor(port, SensorChannel::Light),
                ))
            }
            BlockKind::SoundLoudness => {
                let port = self.sensor_port(block)?;
                self.require_sensor(block, port, &[SensorKind::Sound], "sound")?;
                Ok(RuntimeValue::Number(
                    self.port.sample_sensor(port, SensorChannel::Loudness),
                ))
            }
            BlockKind::CompassAngle => {
                // No dedicated kind exists for a compass; any bound
                // device on the port satisfies the gate.
                let port = self.sensor_port(block)?;
                if self.config.sensor(port).is_none() {
                    return Err(BlockError::new(
                        block.block_type(),
                        Some("SENSORPORT"),
                        RuntimeError::SensorMismatch {
                            port,
                            expected: "compass",
                        },
                    ));
                }
                Ok(RuntimeValue::Number(
                    self.port.sample_sensor(port, SensorChannel::Compass),
                ))
            }

            // --- Motor state and timer reads ---
            BlockKind::MotorGetPower => {
                let port = self.motor_port(block)?;
                Ok(RuntimeValue::Number(self.port.motor_speed(port) as f64))
            }
            BlockKind::EncoderRotation => {
                let port = self.motor_port(block)?;
                let degrees = self.port.motor_tacho_degrees(port) as f64;
                if block.field("MODE") == Some("ROTATION") {
                    Ok(RuntimeValue::Number(degrees / 360.0))
                } else {
                    Ok(RuntimeValue::Number(degrees))
                }
            }
            BlockKind::TimerGet => Ok(RuntimeValue::Number(self.port.timer_ms() as f64)),

            // A statement block in value position produces nothing.
            _ => {
                self.warn(block_type, "statement block in value position, yields nothing");
                Ok(RuntimeValue::Empty)
            }
        }
    }

    fn math_arithmetic(&mut self, block: Block, depth: usize) -> Result<RuntimeValue, BlockError> {
        let op = block.field("OP").unwrap_or("");
        let a = self.eval_number(block, "A", depth)?;
        let b = self.eval_number(block, "B", depth)?;
        let result = match op {
            "ADD" => a + b,
            "MINUS" => a - b,
            "MULTIPLY" => a * b,
            "POWER" => a.powf(b),
            "DIVIDE" => {
                if b == 0.0 {
                    0.0
                } else {
                    a / b
                }
            }
            _ => {
                self.warn(block.block_type(), format!("unknown operator '{}'", op));
                return Ok(RuntimeValue::Empty);
            }
        };
        Ok(RuntimeValue::Number(result))
    }

    fn math_single(&mut self, block: Block, depth: usize) -> Result<RuntimeValue, BlockError> {
        let op = block.field("OP").unwrap_or("");
        let n = self.eval_number(block, "NUM", depth)?;
        // Trig crosses the API boundary in degrees.
        let result = match op {
            "ROOT" => n.sqrt(),
            "ABS" => n.abs(),
            "NEG" => -n,
            "LN" => n.ln(),
            "LOG10" => n.log10(),
            "EXP" => n.exp(),
            "POW10" => 10f64.powf(n),
            "SIN" => n.to_radians().sin(),
            "COS" => n.to_radians().cos(),
            "TAN" => n.to_radians().tan(),
            "ASIN" => n.asin().to_degrees(),
            "ACOS" => n.acos().to_degrees(),
            "ATAN" => n.atan().to_degrees(),
            _ => {
                self.warn(block.block_type(), format!("unknown operator '{}'", op));
                return Ok(RuntimeValue::Empty);
            }
        };
        Ok(RuntimeValue::Number(result))
    }

    fn logic_compare(&mut self, block: Block, depth: usize) -> Result<RuntimeValue, BlockError> {
        let op = block.field("OP").unwrap_or("");
        match op {
            // Equality compares values as tagged unions; mixed types
            // are simply unequal.
            "EQ" | "NEQ" => {
                let a = self.eval_raw(block, "A", depth)?;
                let b = self.eval_raw(block, "B", depth)?;
                let eq = a == b;
                Ok(RuntimeValue::Boolean(if op == "EQ" { eq } else { !eq }))
            }
            _ => {
                let a = self.eval_number(block, "A", depth)?;
                let b = self.eval_number(block, "B", depth)?;
                match op {
                    "LT" => Ok(RuntimeValue::Boolean(a < b)),
                    "LTE" => Ok(RuntimeValue::Boolean(a <= b)),
                    "GT" => Ok(RuntimeValue::Boolean(a > b)),
                    "GTE" => Ok(RuntimeValue::Boolean(a >= b)),
                    _ => {
                        self.warn(block.block_type(), format!("unknown operator '{}'", op));
                        Ok(RuntimeValue::Empty)
                    }
                }
            }
        }
    }

    fn logic_operation(&mut self, block: Block, depth: usize) -> Result<RuntimeValue, BlockError> {
        let op = block.field("OP").unwrap_or("");
        match op {
            "AND" => {
                let a = self.eval_bool(block, "A", depth)?;
                let b = self.eval_bool(block, "B", depth)?;
                Ok(RuntimeValue::Boolean(a && b))
            }
            "OR" => {
                let a = self.eval_bool(block, "A", depth)?;
                let b = self.eval_bool(block, "B", depth)?;
                Ok(RuntimeValue::Boolean(a || b))
            }
            "NOT" => {
                let a = self.eval_bool(block, "A", depth)?;
                Ok(RuntimeValue::Boolean(!a))
            }
            _ => {
                self.warn(block.block_type(), format!("unknown operator '{}'", op));
                Ok(RuntimeValue::Empty)
            }
        }
    }

    // -----------------------------------------------------------------
    // Nested-slot helpers
    // -----------------------------------------------------------------

    fn eval_raw(&mut self, block: Block, slot: &str, depth: usize) -> Result<RuntimeValue, BlockError> {
        match block.value(slot) {
            Some(inner) => self.evaluate(inner, depth + 1),
            None => Ok(RuntimeValue::Empty),
        }
    }

    fn eval_number(&mut self, block: Block, slot: &str, depth: usize) -> Result<f64, BlockError> {
        Ok(self.eval_raw(block, slot, depth)?.as_number())
    }

    fn eval_text(&mut self, block: Block, slot: &str, depth: usize) -> Result<String, BlockError> {
        Ok(self.eval_raw(block, slot, depth)?.to_string())
    }

    /// Logic operands are strict booleans; a missing operand defaults
    /// to false.
    fn eval_bool(&mut self, block: Block, slot: &str, depth: usize) -> Result<bool, BlockError> {
        match block.value(slot) {
            Some(inner) => match self.evaluate(inner, depth + 1)? {
                RuntimeValue::Boolean(b) => Ok(b),
                other => Err(BlockError::new(
                    block.block_type(),
                    Some(slot),
                    RuntimeError::TypeError {
                        expected: "Boolean",
                        got: other.type_name(),
                    },
                )),
            },
            None => Ok(false),
        }
    }

    fn require_sensor(
        &self,
        block: Block,
        port: SensorPort,
        accepted: &[SensorKind],
        expected: &'static str,
    ) -> Result<(), BlockError> {
        match self.config.sensor(port) {
            Some(sensor) if accepted.contains(&sensor.kind) => Ok(()),
            _ => Err(BlockError::new(
                block.block_type(),
                Some("SENSORPORT"),
                RuntimeError::SensorMismatch { port, expected },
            )),
        }
    }
}
