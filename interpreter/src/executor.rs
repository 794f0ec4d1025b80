use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use nepo::ProgramTree;
use nepo::block::{self, Block, START_BLOCK_TYPE};
use nepo::config::{MotorPort, RobotConfiguration, SensorPort, parse_configuration};

use crate::environment::VariableStore;
use crate::error::{BlockError, RunWarning, RuntimeError, TerminationReason};
use crate::hardware::HardwarePort;
use crate::runtime_value::RuntimeValue;

/// Iteration ceiling for unbounded loops. Guarantees termination even
/// for erroneous programs; an honest robot program never gets near it.
pub const LOOP_CEILING: u64 = 1_000_000;

/// Poll interval for `wait_until` conditions.
pub const POLL_INTERVAL_MS: u32 = 50;

/// Wall-clock ceiling for one `wait_until` block.
pub const WAIT_UNTIL_CEILING_MS: u32 = 30_000;

/// The enumerated block vocabulary. Dispatch goes through one lookup
/// here instead of a string-equality chain in every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockKind {
    // Statements
    Start,
    WaitTime,
    If,
    IfElse,
    RepeatTimes,
    RepeatForever,
    While,
    WaitUntil,
    MotorOn,
    MotorStop,
    MotorFloat,
    MotorSetSpeed,
    DisplayText,
    DisplayClear,
    PlayTone,
    VariablesSet,
    // Expressions
    MathNumber,
    Text,
    LogicBoolean,
    VariablesGet,
    MathArithmetic,
    MathSingle,
    MathRandomInt,
    LogicCompare,
    LogicOperation,
    TextJoin,
    TouchIsPressed,
    UltrasonicDistance,
    GyroAngle,
    GyroRate,
    ColourColour,
    ColourLight,
    SoundLoudness,
    CompassAngle,
    MotorGetPower,
    EncoderRotation,
    TimerGet,
}

impl BlockKind {
    pub(crate) fn from_type(block_type: &str) -> Option<Self> {
        Some(match block_type {
            "robControls_start" => BlockKind::Start,
            "robControls_wait_time" => BlockKind::WaitTime,
            "robControls_if" => BlockKind::If,
            "robControls_ifElse" => BlockKind::IfElse,
            "robControls_repeat_times" => BlockKind::RepeatTimes,
            "robControls_repeat_forever" => BlockKind::RepeatForever,
            "robControls_while" => BlockKind::While,
            "robControls_wait_until" => BlockKind::WaitUntil,
            "robActions_motor_on" => BlockKind::MotorOn,
            "robActions_motor_stop" => BlockKind::MotorStop,
            "robActions_motor_float" => BlockKind::MotorFloat,
            "robActions_motor_setSpeed" => BlockKind::MotorSetSpeed,
            "robActions_motor_getPower" => BlockKind::MotorGetPower,
            "robActions_display_text" => BlockKind::DisplayText,
            "robActions_display_clear" => BlockKind::DisplayClear,
            "robActions_play_tone" => BlockKind::PlayTone,
            "variables_set" => BlockKind::VariablesSet,
            "variables_get" => BlockKind::VariablesGet,
            "math_number" => BlockKind::MathNumber,
            "text" => BlockKind::Text,
            "logic_boolean" => BlockKind::LogicBoolean,
            "math_arithmetic" => BlockKind::MathArithmetic,
            "math_single" => BlockKind::MathSingle,
            "math_random_int" => BlockKind::MathRandomInt,
            "logic_compare" => BlockKind::LogicCompare,
            "logic_operation" => BlockKind::LogicOperation,
            "text_join" => BlockKind::TextJoin,
            "robSensors_touch_isPressed" => BlockKind::TouchIsPressed,
            "robSensors_ultrasonic_distance" => BlockKind::UltrasonicDistance,
            "robSensors_gyro_angle" => BlockKind::GyroAngle,
            "robSensors_gyro_rate" => BlockKind::GyroRate,
            "robSensors_colour_colour" => BlockKind::ColourColour,
            "robSensors_colour_light" => BlockKind::ColourLight,
            "robSensors_sound_loudness" => BlockKind::SoundLoudness,
            "robSensors_compass_angle" => BlockKind::CompassAngle,
            "robSensors_encoder_rotation" => BlockKind::EncoderRotation,
            "robSensors_timer_get" => BlockKind::TimerGet,
            _ => return None,
        })
    }
}

/// The host's stop handle. Cloneable; clearing it stops the run at the
/// next sequencing or iteration step.
#[derive(Debug, Clone)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn new() -> Self {
        RunFlag(Arc::new(AtomicBool::new(true)))
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        RunFlag::new()
    }
}

/// How a run ended, plus the diagnostics that did not stop it.
#[derive(Debug)]
pub struct RunOutcome {
    pub reason: TerminationReason,
    pub warnings: Vec<RunWarning>,
}

/// Run a program to completion on the given hardware.
pub fn run(
    program: &ProgramTree,
    config: Option<&ProgramTree>,
    port: &mut dyn HardwarePort,
) -> RunOutcome {
    run_with_flag(program, config, port, RunFlag::new())
}

/// Run a program with an externally held stop handle.
pub fn run_with_flag(
    program: &ProgramTree,
    config: Option<&ProgramTree>,
    port: &mut dyn HardwarePort,
    flag: RunFlag,
) -> RunOutcome {
    let robot = match config {
        Some(tree) => match parse_configuration(tree) {
            Ok(robot) => robot,
            Err(e) => {
                return RunOutcome {
                    reason: TerminationReason::ConfigurationError(e.to_string()),
                    warnings: Vec::new(),
                };
            }
        },
        None => RobotConfiguration::default(),
    };

    let mut warnings = Vec::new();
    let (start, extra_starts) = match block::find_start_block(program) {
        Ok(found) => found,
        Err(e) => {
            return RunOutcome {
                reason: TerminationReason::FatalError(e.to_string()),
                warnings,
            };
        }
    };
    if extra_starts > 0 {
        warnings.push(RunWarning::new(
            START_BLOCK_TYPE,
            format!("{} extra start block(s) ignored", extra_starts),
        ));
    }

    let mut interpreter = Interpreter::new(robot, port, flag.clone());
    let result = interpreter.execute(start);
    warnings.append(&mut interpreter.warnings);

    let reason = match result {
        Ok(()) if flag.is_running() => TerminationReason::Completed,
        Ok(()) => TerminationReason::StoppedByHost,
        Err(e) => TerminationReason::FatalError(e.to_string()),
    };
    RunOutcome { reason, warnings }
}

/// The block executor: walks the Program Tree from the entry block,
/// dispatching by block type, maintaining the variable store and the
/// loop/wait safety ceilings, driving the hardware port for effects.
pub struct Interpreter<'h> {
    pub(crate) config: RobotConfiguration,
    pub(crate) port: &'h mut dyn HardwarePort,
    pub(crate) variables: VariableStore,
    flag: RunFlag,
    pub(crate) warnings: Vec<RunWarning>,
}

impl<'h> Interpreter<'h> {
    pub fn new(
        config: RobotConfiguration,
        port: &'h mut dyn HardwarePort,
        flag: RunFlag,
    ) -> Self {
        Interpreter {
            config,
            port,
            variables: VariableStore::new(),
            flag,
            warnings: Vec::new(),
        }
    }

    pub fn warnings(&self) -> &[RunWarning] {
        &self.warnings
    }

    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    /// Execute the entry block's `ST` sequence once.
    pub fn execute(&mut self, start: Block) -> Result<(), BlockError> {
        self.execute_sequence(start.statement("ST"))
    }

    fn running(&self) -> bool {
        self.flag.is_running()
    }

    /// Walk a `next`-linked block sequence, honoring the stop flag
    /// between blocks.
    pub(crate) fn execute_sequence(&mut self, first: Option<Block>) -> Result<(), BlockError> {
        let mut current = first;
        while let Some(block) = current {
            if !self.running() {
                return Ok(());
            }
            self.execute_block(block)?;
            current = block.next();
        }
        Ok(())
    }

    fn execute_block(&mut self, block: Block) -> Result<(), BlockError> {
        let block_type = block.block_type();
        let Some(kind) = BlockKind::from_type(block_type) else {
            self.warn(block_type, "unknown block type, skipped");
            return Ok(());
        };

        match kind {
            BlockKind::Start => {
                // The entry is chosen by the host; a start block inside
                // a sequence has nothing to do.
                self.warn(block_type, "start block inside a sequence, skipped");
                Ok(())
            }

            BlockKind::WaitTime => {
                let ms = self.number_slot(block, "WAIT", 0.0)?.max(0.0).round() as u32;
                self.port.delay(ms);
                Ok(())
            }

            BlockKind::If => {
                if self.bool_slot(block, "IF0", false)? {
                    self.execute_sequence(block.statement("DO0"))
                } else {
                    Ok(())
                }
            }

            BlockKind::IfElse => {
                if self.bool_slot(block, "IF0", false)? {
                    self.execute_sequence(block.statement("DO0"))
                } else {
                    self.execute_sequence(block.statement("ELSE"))
                }
            }

            BlockKind::RepeatTimes => {
                let times = self.number_slot(block, "TIMES", 0.0)?.floor();
                let times = if times > 0.0 { times as u64 } else { 0 };
                for _ in 0..times {
                    if !self.running() {
                        break;
                    }
                    self.execute_sequence(block.statement("DO"))?;
                }
                Ok(())
            }

            BlockKind::RepeatForever => {
                let mut iterations: u64 = 0;
                while self.running() {
                    if iterations >= LOOP_CEILING {
                        self.warn(block_type, "iteration ceiling reached, loop abandoned");
                        break;
                    }
                    self.execute_sequence(block.statement("DO"))?;
                    iterations += 1;
                }
                Ok(())
            }

            BlockKind::While => {
                let mut iterations: u64 = 0;
                while self.running() {
                    if iterations >= LOOP_CEILING {
                        self.warn(block_type, "iteration ceiling reached, loop abandoned");
                        break;
                    }
                    if !self.bool_slot(block, "BOOL", false)? {
                        break;
                    }
                    self.execute_sequence(block.statement("DO"))?;
                    iterations += 1;
                }
                Ok(())
            }

            BlockKind::WaitUntil => {
                let mut waited: u32 = 0;
                while self.running() {
                    if self.bool_slot(block, "CONDITION", true)? {
                        break;
                    }
                    if waited >= WAIT_UNTIL_CEILING_MS {
                        self.warn(block_type, "wall-clock ceiling reached, wait abandoned");
                        break;
                    }
                    self.port.delay(POLL_INTERVAL_MS);
                    waited += POLL_INTERVAL_MS;
                }
                Ok(())
            }

            BlockKind::MotorOn => self.motor_on(block),

            BlockKind::MotorStop => {
                let port = self.motor_port(block)?;
                self.port.motor_stop(port, true);
                Ok(())
            }

            BlockKind::MotorFloat => {
                let port = self.motor_port(block)?;
                self.port.motor_float(port);
                Ok(())
            }

            BlockKind::MotorSetSpeed => {
                let port = self.motor_port(block)?;
                let power = self.number_slot(block, "POWER", 0.0)?;
                self.port.motor_set_speed(port, clamp_speed(power));
                Ok(())
            }

            BlockKind::DisplayText => {
                let text = self.text_slot(block, "OUT")?;
                self.port.clear_display();
                self.port.display_text(&text, 0, 0);
                self.port.refresh_display();
                Ok(())
            }

            BlockKind::DisplayClear => {
                self.port.clear_display();
                self.port.refresh_display();
                Ok(())
            }

            BlockKind::PlayTone => {
                let frequency = self.number_slot(block, "FREQUENCY", 0.0)?.max(0.0).round() as u32;
                let duration = self.number_slot(block, "DURATION", 0.0)?.max(0.0).round() as u32;
                self.port.play_tone(frequency, duration);
                Ok(())
            }

            BlockKind::VariablesSet => {
                match block.field("VAR") {
                    Some(name) if !name.is_empty() => {
                        let value = self.value_slot(block, "VALUE")?;
                        self.variables.set(name, value);
                    }
                    _ => self.warn(block_type, "missing variable name, skipped"),
                }
                Ok(())
            }

            // An expression block in statement position: evaluate it
            // for its sensor-read effects and discard the value.
            _ => self.evaluate(block, 0).map(|_| ()),
        }
    }

    fn motor_on(&mut self, block: Block) -> Result<(), BlockError> {
        let port = self.motor_port(block)?;
        let reverse = self.config.motor(port).map(|m| m.reverse).unwrap_or(false);
        let power = self.number_slot(block, "POWER", 0.0)?;
        self.port.motor_set_speed(port, clamp_speed(power));

        if block.field("MOTORROTATION") == Some("ROTATIONS") {
            let value = self.number_slot(block, "VALUE", 0.0)?;
            let mut degrees = (value * 360.0).round() as i32;
            if reverse {
                degrees = -degrees;
            }
            self.port.motor_rotate(port, degrees);
        } else {
            let forward = (power >= 0.0) != reverse;
            if forward {
                self.port.motor_forward(port);
            } else {
                self.port.motor_backward(port);
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Slot helpers. Missing slots substitute their defined defaults.
    // -----------------------------------------------------------------

    pub(crate) fn warn(&mut self, block_type: &str, message: impl Into<String>) {
        self.warnings.push(RunWarning::new(block_type, message));
    }

    pub(crate) fn value_slot(&mut self, block: Block, slot: &str) -> Result<RuntimeValue, BlockError> {
        match block.value(slot) {
            Some(inner) => self.evaluate(inner, 0),
            None => Ok(RuntimeValue::Empty),
        }
    }

    pub(crate) fn number_slot(
        &mut self,
        block: Block,
        slot: &str,
        default: f64,
    ) -> Result<f64, BlockError> {
        match block.value(slot) {
            Some(inner) => Ok(self.evaluate(inner, 0)?.as_number()),
            None => Ok(default),
        }
    }

    /// Condition slots are strict: a non-Boolean is a handler failure.
    pub(crate) fn bool_slot(
        &mut self,
        block: Block,
        slot: &str,
        default: bool,
    ) -> Result<bool, BlockError> {
        match block.value(slot) {
            Some(inner) => match self.evaluate(inner, 0)? {
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
            None => Ok(default),
        }
    }

    pub(crate) fn text_slot(&mut self, block: Block, slot: &str) -> Result<String, BlockError> {
        Ok(self.value_slot(block, slot)?.to_string())
    }

    /// The motor port named by the `MOTORPORT` field, checked against
    /// the configuration's bindings.
    pub(crate) fn motor_port(&self, block: Block) -> Result<MotorPort, BlockError> {
        let field = block.field("MOTORPORT").unwrap_or("");
        let port = MotorPort::from_letter(field).ok_or_else(|| {
            BlockError::new(
                block.block_type(),
                Some("MOTORPORT"),
                RuntimeError::UnknownMotorPort(field.to_string()),
            )
        })?;
        if self.config.motor(port).is_none() {
            return Err(BlockError::new(
                block.block_type(),
                Some("MOTORPORT"),
                RuntimeError::MotorNotBound(port),
            ));
        }
        Ok(port)
    }

    /// The sensor port named by the `SENSORPORT` field. Kind gating
    /// happens at the read site.
    pub(crate) fn sensor_port(&self, block: Block) -> Result<SensorPort, BlockError> {
        let field = block.field("SENSORPORT").unwrap_or("");
        SensorPort::from_number(field).ok_or_else(|| {
            BlockError::new(
                block.block_type(),
                Some("SENSORPORT"),
                RuntimeError::UnknownSensorPort(field.to_string()),
            )
        })
    }
}

/// Power → speed: magnitude, rounded, clamped to 0..=100.
fn clamp_speed(power: f64) -> i32 {
    power.abs().round().clamp(0.0, 100.0) as i32
}
