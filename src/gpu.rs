//! GPU data types shared between Rust and the device evaluator.
//!
//! An optimized program maps 1:1, in order, onto fixed-width
//! [`GpuRecord`]s; array position equals program counter. The record layout
//! is `#[repr(C)]` and matches the shader-side struct:
//!
//! ```text
//! struct ModelOp {
//!     int   opcode;   // Opcode
//!     int   arg1;     // input index (INPUT only)
//!     float arg2;     // literal (CONST only)
//! };
//! ```
//!
//! Opcodes 0-5 keep the values the original kernel header assigned
//! (ADD, SUB, MUL, DIV, INPUT, CONST); every other instruction kind is
//! numbered from 6 upward in a fixed order.
//!
//! [`replay_records`] is a sequential reference evaluator over a record
//! stream. It shares the interpreter's stack machine, so the two backends
//! agree bit for bit on every program whose literals are exactly
//! representable as `f32`.

use tracing::warn;

use crate::error::{EvaluationError, PipelineError};
use crate::evaluator::Instruction;
use crate::evaluator::execution::StackMachine;
use crate::evaluator::instruction::{max_input_index, max_stack_depth};

/// Maximum number of input distributions per model on the device.
pub const MAX_INPUTS: usize = 32;
/// Maximum evaluation stack depth on the device.
pub const MAX_STACK: usize = 32;
/// Maximum number of records per program on the device.
pub const MAX_OPS: usize = 128;

/// Record opcode (matches the device-side constants).
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Add = 0,
    Subtract = 1,
    Multiply = 2,
    Divide = 3,
    Input = 4,
    Constant = 5,
    Power = 6,
    Min = 7,
    Max = 8,
    LessThan = 9,
    GreaterThan = 10,
    LessOrEqual = 11,
    GreaterOrEqual = 12,
    Equal = 13,
    NotEqual = 14,
    Negate = 15,
    Abs = 16,
    Sqrt = 17,
    Log = 18,
    Exp = 19,
    Sin = 20,
    Cos = 21,
    Tan = 22,
    Select = 23,
}

impl Opcode {
    /// Every opcode, in numeric order.
    pub const ALL: [Opcode; 24] = [
        Opcode::Add,
        Opcode::Subtract,
        Opcode::Multiply,
        Opcode::Divide,
        Opcode::Input,
        Opcode::Constant,
        Opcode::Power,
        Opcode::Min,
        Opcode::Max,
        Opcode::LessThan,
        Opcode::GreaterThan,
        Opcode::LessOrEqual,
        Opcode::GreaterOrEqual,
        Opcode::Equal,
        Opcode::NotEqual,
        Opcode::Negate,
        Opcode::Abs,
        Opcode::Sqrt,
        Opcode::Log,
        Opcode::Exp,
        Opcode::Sin,
        Opcode::Cos,
        Opcode::Tan,
        Opcode::Select,
    ];

    /// Opcode for an instruction kind.
    pub const fn of(instr: Instruction) -> Self {
        match instr {
            Instruction::Input(_) => Opcode::Input,
            Instruction::Constant(_) => Opcode::Constant,
            Instruction::Add => Opcode::Add,
            Instruction::Subtract => Opcode::Subtract,
            Instruction::Multiply => Opcode::Multiply,
            Instruction::Divide => Opcode::Divide,
            Instruction::Power => Opcode::Power,
            Instruction::Min => Opcode::Min,
            Instruction::Max => Opcode::Max,
            Instruction::LessThan => Opcode::LessThan,
            Instruction::GreaterThan => Opcode::GreaterThan,
            Instruction::LessOrEqual => Opcode::LessOrEqual,
            Instruction::GreaterOrEqual => Opcode::GreaterOrEqual,
            Instruction::Equal => Opcode::Equal,
            Instruction::NotEqual => Opcode::NotEqual,
            Instruction::Negate => Opcode::Negate,
            Instruction::Abs => Opcode::Abs,
            Instruction::Sqrt => Opcode::Sqrt,
            Instruction::Log => Opcode::Log,
            Instruction::Exp => Opcode::Exp,
            Instruction::Sin => Opcode::Sin,
            Instruction::Cos => Opcode::Cos,
            Instruction::Tan => Opcode::Tan,
            Instruction::Select => Opcode::Select,
        }
    }

    /// Decode a raw opcode.
    pub fn from_i32(raw: i32) -> Option<Self> {
        usize::try_from(raw)
            .ok()
            .and_then(|i| Opcode::ALL.get(i).copied())
    }

    /// Raw value written to the record.
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Listing name, matching [`Instruction::mnemonic`].
    pub fn name(self) -> &'static str {
        match self {
            Opcode::Input => "input",
            Opcode::Constant => "const",
            other => other.operator().map_or("?", Instruction::mnemonic),
        }
    }

    /// Operator instruction for this opcode; `None` for `Input` and
    /// `Constant`, which need their record arguments.
    const fn operator(self) -> Option<Instruction> {
        Some(match self {
            Opcode::Input | Opcode::Constant => return None,
            Opcode::Add => Instruction::Add,
            Opcode::Subtract => Instruction::Subtract,
            Opcode::Multiply => Instruction::Multiply,
            Opcode::Divide => Instruction::Divide,
            Opcode::Power => Instruction::Power,
            Opcode::Min => Instruction::Min,
            Opcode::Max => Instruction::Max,
            Opcode::LessThan => Instruction::LessThan,
            Opcode::GreaterThan => Instruction::GreaterThan,
            Opcode::LessOrEqual => Instruction::LessOrEqual,
            Opcode::GreaterOrEqual => Instruction::GreaterOrEqual,
            Opcode::Equal => Instruction::Equal,
            Opcode::NotEqual => Instruction::NotEqual,
            Opcode::Negate => Instruction::Negate,
            Opcode::Abs => Instruction::Abs,
            Opcode::Sqrt => Instruction::Sqrt,
            Opcode::Log => Instruction::Log,
            Opcode::Exp => Instruction::Exp,
            Opcode::Sin => Instruction::Sin,
            Opcode::Cos => Instruction::Cos,
            Opcode::Tan => Instruction::Tan,
            Opcode::Select => Instruction::Select,
        })
    }
}

#[allow(
    clippy::cast_possible_truncation,
    reason = "The device record stores literals as f32"
)]
fn narrow(value: f64) -> f32 {
    value as f32
}

/// True if `value` survives the round trip through a record's `f32` field.
/// NaN counts as exact: it stays NaN on both backends.
pub fn is_f32_exact(value: f64) -> bool {
    value.is_nan() || f64::from(narrow(value)) == value
}

/// Packed program record (12 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpuRecord {
    /// Instruction kind (see [`Opcode`]).
    pub opcode: i32,
    /// Input index for `Input`; zero otherwise.
    pub arg1: i32,
    /// Literal for `Constant`; zero otherwise.
    pub arg2: f32,
}

impl GpuRecord {
    /// Size of one record in bytes.
    pub const SIZE: usize = 12;

    /// Encode one instruction.
    ///
    /// # Errors
    ///
    /// [`PipelineError::GpuLimitExceeded`] if an input index does not fit `i32`.
    pub fn encode(instr: Instruction) -> Result<Self, PipelineError> {
        let opcode = Opcode::of(instr).as_i32();
        let record = match instr {
            Instruction::Input(index) => {
                let arg1 = i32::try_from(index).map_err(|_| PipelineError::GpuLimitExceeded {
                    what: "input index",
                    value: index,
                    limit: i32::MAX as usize,
                })?;
                GpuRecord {
                    opcode,
                    arg1,
                    arg2: 0.0,
                }
            }
            Instruction::Constant(value) => {
                let arg2 = narrow(value);
                if !is_f32_exact(value) {
                    warn!(
                        value,
                        stored = f64::from(arg2),
                        "constant is not exactly representable in a GPU record"
                    );
                }
                GpuRecord {
                    opcode,
                    arg1: 0,
                    arg2,
                }
            }
            _ => GpuRecord {
                opcode,
                arg1: 0,
                arg2: 0.0,
            },
        };
        Ok(record)
    }

    /// Decode back to an instruction. Literals are widened to `f64`.
    ///
    /// # Errors
    ///
    /// [`EvaluationError::InvalidOperation`] for an unknown opcode or a
    /// negative input index.
    pub fn decode(&self) -> Result<Instruction, EvaluationError> {
        let opcode = Opcode::from_i32(self.opcode).ok_or_else(|| {
            EvaluationError::InvalidOperation(format!("unknown opcode {}", self.opcode))
        })?;
        match opcode {
            Opcode::Input => usize::try_from(self.arg1)
                .map(Instruction::Input)
                .map_err(|_| {
                    EvaluationError::InvalidOperation(format!(
                        "negative input index {}",
                        self.arg1
                    ))
                }),
            Opcode::Constant => Ok(Instruction::Constant(f64::from(self.arg2))),
            other => other.operator().ok_or_else(|| {
                EvaluationError::InvalidOperation(format!("unknown opcode {}", self.opcode))
            }),
        }
    }

    /// Little-endian bytes in field order, for upload.
    pub fn to_le_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0_u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.opcode.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.arg1.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.arg2.to_le_bytes());
        bytes
    }
}

/// Device capacity limits a program must fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuLimits {
    pub max_inputs: usize,
    pub max_stack: usize,
    pub max_ops: usize,
}

impl GpuLimits {
    /// Limits compiled into the Monte Carlo kernels.
    pub const fn metal_default() -> Self {
        Self {
            max_inputs: MAX_INPUTS,
            max_stack: MAX_STACK,
            max_ops: MAX_OPS,
        }
    }
}

impl Default for GpuLimits {
    fn default() -> Self {
        Self::metal_default()
    }
}

/// Encode a program into device records.
///
/// # Errors
///
/// [`PipelineError::GpuLimitExceeded`] if an input index does not fit `i32`.
pub fn to_gpu_records(program: &[Instruction]) -> Result<Vec<GpuRecord>, PipelineError> {
    program.iter().map(|&instr| GpuRecord::encode(instr)).collect()
}

/// Sequential reference evaluation of a record stream.
///
/// # Errors
///
/// The same [`EvaluationError`]s as the interpreter, plus
/// [`EvaluationError::InvalidOperation`] for records that do not decode.
pub fn replay_records(records: &[GpuRecord], inputs: &[f64]) -> Result<f64, EvaluationError> {
    let mut machine = StackMachine::with_capacity(inputs, MAX_STACK);
    for record in records {
        machine.step(record.decode()?)?;
    }
    machine.finish()
}

/// Encoded program plus the metadata the device launch needs.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuProgram {
    records: Vec<GpuRecord>,
    max_stack_depth: usize,
    required_inputs: usize,
    /// First literal that narrowing to `f32` changes, with its position
    inexact_constant: Option<(usize, f64)>,
}

impl GpuProgram {
    /// Encode an (optimized) program.
    ///
    /// # Errors
    ///
    /// See [`to_gpu_records`].
    pub fn encode(program: &[Instruction]) -> Result<Self, PipelineError> {
        Ok(Self {
            records: to_gpu_records(program)?,
            max_stack_depth: max_stack_depth(program),
            required_inputs: max_input_index(program).map_or(0, |i| i + 1),
            inexact_constant: program.iter().enumerate().find_map(|(pc, instr)| {
                instr
                    .as_constant()
                    .filter(|&value| !is_f32_exact(value))
                    .map(|value| (pc, value))
            }),
        })
    }

    pub fn records(&self) -> &[GpuRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub const fn max_stack_depth(&self) -> usize {
        self.max_stack_depth
    }

    /// Input vector width the records read from.
    pub const fn required_inputs(&self) -> usize {
        self.required_inputs
    }

    /// Check the program against device limits and CPU parity.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::GpuLimitExceeded`] naming the first violated limit
    /// - [`PipelineError::InexactGpuConstant`] for the first literal that the
    ///   record's `f32` field cannot hold exactly
    pub fn validate(&self, limits: &GpuLimits) -> Result<(), PipelineError> {
        let checks = [
            ("operation count", self.records.len(), limits.max_ops),
            ("stack depth", self.max_stack_depth, limits.max_stack),
            ("input count", self.required_inputs, limits.max_inputs),
        ];
        for (what, value, limit) in checks {
            if value > limit {
                return Err(PipelineError::GpuLimitExceeded { what, value, limit });
            }
        }
        match self.inexact_constant {
            Some((pc, value)) => Err(PipelineError::InexactGpuConstant { pc, value }),
            None => Ok(()),
        }
    }

    /// Evaluate the records sequentially on the CPU.
    ///
    /// # Errors
    ///
    /// See [`replay_records`].
    pub fn replay(&self, inputs: &[f64]) -> Result<f64, EvaluationError> {
        replay_records(&self.records, inputs)
    }

    /// All records as little-endian bytes, ready for a device buffer.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.records.len() * GpuRecord::SIZE);
        for record in &self.records {
            bytes.extend_from_slice(&record.to_le_bytes());
        }
        bytes
    }
}
