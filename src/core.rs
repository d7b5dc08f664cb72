use std::fmt;

use crate::{ModbusError, ModbusResult};

pub const READ_HOLDING_REGISTERS: u8 = 0x03;
pub const WRITE_SINGLE_REGISTER: u8 = 0x06;

/// Set on the function code byte of every fault response.
pub const FAULT_FLAG: u8 = 0x80;

/// Largest register count a single read may request.
pub const MAX_READ_QUANTITY: i32 = 125;

const MAX_ADDRESS: i32 = 65535;
const MIN_REGISTER_VALUE: i32 = i16::MIN as i32;
const MAX_REGISTER_VALUE: i32 = u16::MAX as i32;

/// Fault code reported by the device in a rejected response.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FaultCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    ServerDeviceFailure,
    /// Any code outside the table above, carried through unchanged.
    Other(u8),
}

impl FaultCode {
    pub fn code(self) -> u8 {
        match self {
            FaultCode::IllegalFunction => 1,
            FaultCode::IllegalDataAddress => 2,
            FaultCode::IllegalDataValue => 3,
            FaultCode::ServerDeviceFailure => 4,
            FaultCode::Other(code) => code,
        }
    }
}

impl From<u8> for FaultCode {
    fn from(code: u8) -> Self {
        match code {
            1 => FaultCode::IllegalFunction,
            2 => FaultCode::IllegalDataAddress,
            3 => FaultCode::IllegalDataValue,
            4 => FaultCode::ServerDeviceFailure,
            other => FaultCode::Other(other),
        }
    }
}

impl fmt::Display for FaultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultCode::IllegalFunction => write!(f, "illegal function"),
            FaultCode::IllegalDataAddress => write!(f, "illegal data address"),
            FaultCode::IllegalDataValue => write!(f, "illegal data value"),
            FaultCode::ServerDeviceFailure => write!(f, "server device failure"),
            FaultCode::Other(code) => write!(f, "unknown server exception, code {code}"),
        }
    }
}

/// Function code byte the device sends back when it rejects `function_code`.
pub(crate) fn fault_marker(function_code: u8) -> u8 {
    function_code | FAULT_FLAG
}

fn check_address(addr: i32) -> ModbusResult<u16> {
    if !(0..=MAX_ADDRESS).contains(&addr) {
        return Err(ModbusError::InvalidArgument(format!(
            "address {addr} outside 0..={MAX_ADDRESS}"
        )));
    }
    Ok(addr as u16)
}

/// PDU for function 0x03: code, start address, register count.
pub(crate) fn read_holding_pdu(start_addr: i32, quantity: i32) -> ModbusResult<[u8; 5]> {
    let start_addr = check_address(start_addr)?;
    if !(1..=MAX_READ_QUANTITY).contains(&quantity) {
        return Err(ModbusError::InvalidArgument(format!(
            "quantity {quantity} outside 1..={MAX_READ_QUANTITY}"
        )));
    }
    let quantity = quantity as u16;

    let mut msg: [u8; 5] = [0; 5];
    msg[0] = READ_HOLDING_REGISTERS;
    msg[1] = (start_addr >> 8) as u8;
    msg[2] = start_addr as u8;
    msg[3] = (quantity >> 8) as u8;
    msg[4] = quantity as u8;
    Ok(msg)
}

/// PDU for function 0x06: code, register address, value.
///
/// The value may be given either as an unsigned register (0..=65535) or as a
/// signed one (-32768..=32767); only its low 16 bits go on the wire.
pub(crate) fn write_single_pdu(addr: i32, value: i32) -> ModbusResult<[u8; 5]> {
    let addr = check_address(addr)?;
    if !(MIN_REGISTER_VALUE..=MAX_REGISTER_VALUE).contains(&value) {
        return Err(ModbusError::InvalidArgument(format!(
            "value {value} overflows a 16-bit register"
        )));
    }
    let value = value as u16;

    let mut msg: [u8; 5] = [0; 5];
    msg[0] = WRITE_SINGLE_REGISTER;
    msg[1] = (addr >> 8) as u8;
    msg[2] = addr as u8;
    msg[3] = (value >> 8) as u8;
    msg[4] = value as u8;
    Ok(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fault_code_table() {
        assert_eq!(FaultCode::from(1), FaultCode::IllegalFunction);
        assert_eq!(FaultCode::from(4), FaultCode::ServerDeviceFailure);
        assert_eq!(FaultCode::from(0x0B), FaultCode::Other(0x0B));
        assert_eq!(FaultCode::Other(0x0B).code(), 0x0B);
        assert_eq!(FaultCode::IllegalDataValue.code(), 3);
    }

    #[test]
    fn fault_marker_sets_high_bit() {
        assert_eq!(fault_marker(READ_HOLDING_REGISTERS), 0x83);
        assert_eq!(fault_marker(WRITE_SINGLE_REGISTER), 0x86);
    }

    #[test]
    fn write_pdu_accepts_signed_values() {
        let pdu = write_single_pdu(0x10, -1).unwrap();
        assert_eq!(pdu, [0x06, 0x00, 0x10, 0xFF, 0xFF]);

        let pdu = write_single_pdu(0x10, 0xFFFF).unwrap();
        assert_eq!(pdu, [0x06, 0x00, 0x10, 0xFF, 0xFF]);
    }

    #[test]
    fn write_pdu_rejects_overflow() {
        assert!(matches!(
            write_single_pdu(0, 65536),
            Err(ModbusError::InvalidArgument(_))
        ));
        assert!(matches!(
            write_single_pdu(0, -32769),
            Err(ModbusError::InvalidArgument(_))
        ));
        assert!(matches!(
            write_single_pdu(-1, 0),
            Err(ModbusError::InvalidArgument(_))
        ));
    }

    #[test]
    fn read_pdu_rejects_zero_quantity() {
        assert!(matches!(
            read_holding_pdu(0, 0),
            Err(ModbusError::InvalidArgument(_))
        ));
    }
}
