//! Conversions between holding registers and wider values.
//!
//! Every multi-register value is stored least-significant word first: the
//! register at the lowest index carries the low 16 bits. Inside a register
//! the bytes are big-endian. So `[0x0001, 0x0002]` read as a 32-bit integer
//! is `0x0002_0001`.
//!
//! Registers travel as plain integers ([`RegisterValue`]). Only the low 16
//! bits of an input register are used, which lets sign-extended values from
//! [`crate::decode_read_response`] and the zero-extended values produced
//! here be mixed freely.

use crate::{ModbusError, ModbusResult};

/// One holding register carried as a plain integer.
pub type RegisterValue = i32;

fn word(register: RegisterValue) -> [u8; 2] {
    (register as u16).to_be_bytes()
}

fn register(bytes: [u8; 2]) -> RegisterValue {
    u16::from_be_bytes(bytes) as RegisterValue
}

fn check_count(registers: &[RegisterValue], expected: usize) -> ModbusResult<()> {
    if registers.len() != expected {
        return Err(ModbusError::InvalidLength {
            expected,
            actual: registers.len(),
        });
    }
    Ok(())
}

/// Lay the registers out as big-endian bytes, most significant word first.
fn assemble<const N: usize>(registers: &[RegisterValue]) -> ModbusResult<[u8; N]> {
    check_count(registers, N / 2)?;
    let mut bytes = [0u8; N];
    for (i, reg) in registers.iter().rev().enumerate() {
        bytes[i * 2..i * 2 + 2].copy_from_slice(&word(*reg));
    }
    Ok(bytes)
}

/// Inverse of [`assemble`].
fn split<const W: usize>(bytes: &[u8]) -> [RegisterValue; W] {
    let mut registers = [0; W];
    for (i, pair) in bytes.chunks_exact(2).rev().enumerate() {
        registers[i] = register([pair[0], pair[1]]);
    }
    registers
}

pub fn registers_to_float32(registers: &[RegisterValue]) -> ModbusResult<f32> {
    Ok(f32::from_be_bytes(assemble::<4>(registers)?))
}

pub fn registers_to_int32(registers: &[RegisterValue]) -> ModbusResult<i32> {
    Ok(i32::from_be_bytes(assemble::<4>(registers)?))
}

pub fn registers_to_int64(registers: &[RegisterValue]) -> ModbusResult<i64> {
    Ok(i64::from_be_bytes(assemble::<8>(registers)?))
}

pub fn registers_to_double64(registers: &[RegisterValue]) -> ModbusResult<f64> {
    Ok(f64::from_be_bytes(assemble::<8>(registers)?))
}

pub fn float32_to_registers(value: f32) -> [RegisterValue; 2] {
    split(&value.to_be_bytes())
}

pub fn int32_to_registers(value: i32) -> [RegisterValue; 2] {
    split(&value.to_be_bytes())
}

pub fn int64_to_registers(value: i64) -> [RegisterValue; 4] {
    split(&value.to_be_bytes())
}

pub fn double64_to_registers(value: f64) -> [RegisterValue; 4] {
    split(&value.to_be_bytes())
}

/// Decode `length` characters packed two per register, starting at register
/// `offset`.
///
/// Each register contributes its low byte first, then its high byte. Bytes
/// map one-to-one onto characters (Latin-1); padding bytes are kept as NUL.
///
/// An odd `length` fails with [`ModbusError::InvalidLength`] whose `expected`
/// is the next even length. A window that does not fit in `registers` fails
/// with `expected` set to the register count the window needs.
pub fn registers_to_text(
    registers: &[RegisterValue],
    offset: usize,
    length: usize,
) -> ModbusResult<String> {
    if length % 2 != 0 {
        return Err(ModbusError::InvalidLength {
            expected: length + 1,
            actual: length,
        });
    }
    let end = offset
        .checked_add(length / 2)
        .filter(|&end| end <= registers.len())
        .ok_or(ModbusError::InvalidLength {
            expected: offset.saturating_add(length / 2),
            actual: registers.len(),
        })?;

    let mut text = String::with_capacity(length);
    for reg in &registers[offset..end] {
        let [high, low] = word(*reg);
        text.push(low as char);
        text.push(high as char);
    }
    Ok(text)
}

/// Pack text two characters per register, low byte first.
///
/// An odd trailing character gets a zero high byte. Characters outside the
/// single-byte range cannot be represented and are rejected.
pub fn text_to_registers(text: &str) -> ModbusResult<Vec<RegisterValue>> {
    let bytes = text
        .chars()
        .map(|c| {
            u8::try_from(c).map_err(|_| {
                ModbusError::InvalidArgument(format!("character {c:?} does not fit in one byte"))
            })
        })
        .collect::<ModbusResult<Vec<u8>>>()?;

    let registers = bytes
        .chunks(2)
        .map(|pair| register([pair.get(1).copied().unwrap_or(0), pair[0]]))
        .collect();
    Ok(registers)
}
