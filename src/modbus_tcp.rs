use crate::core::{
    READ_HOLDING_REGISTERS, WRITE_SINGLE_REGISTER, fault_marker, read_holding_pdu,
    write_single_pdu,
};
use crate::registers::RegisterValue;
use crate::{FaultCode, ModbusError, ModbusResult};

/// First six bytes of every request: transaction id, protocol id and the
/// remaining-length field.
///
/// These are device-compatibility constants, not computed Modbus TCP fields.
/// The transaction id never increments, and the length field is sent as
/// `0x06 0x00` rather than the textbook `0x00 0x06`. The paired inverter
/// answers this exact header; do not "correct" it without checking against
/// the real device.
pub const FRAME_HEADER: [u8; 6] = [0x00, 0x01, 0x00, 0x00, 0x06, 0x00];

/// Largest Modbus TCP application data unit.
pub const MAX_ADU_LENGTH: usize = 260;

const REQUEST_LEN: usize = 12;
const FUNCTION_OFFSET: usize = 7;
const FAULT_CODE_OFFSET: usize = 8;
const REGISTERS_OFFSET: usize = 9;
const FAULT_FRAME_LEN: usize = 9;
const WRITE_ECHO_LEN: usize = 12;

fn wrap_tcp(unit_id: u8, pdu: [u8; 5]) -> [u8; REQUEST_LEN] {
    let mut frame = [0u8; REQUEST_LEN];
    frame[..6].copy_from_slice(&FRAME_HEADER);
    frame[6] = unit_id;
    frame[7..].copy_from_slice(&pdu);
    frame
}

/// Build the 12-byte request for function 0x03.
///
/// Fails with [`ModbusError::InvalidArgument`] unless
/// `0 <= start_address <= 65535` and `1 <= quantity <= 125`.
pub fn encode_read_holding_registers(
    unit_id: u8,
    start_address: i32,
    quantity: i32,
) -> ModbusResult<[u8; REQUEST_LEN]> {
    let pdu = read_holding_pdu(start_address, quantity)?;
    Ok(wrap_tcp(unit_id, pdu))
}

/// Build the 12-byte request for function 0x06.
pub fn encode_write_single_register(
    unit_id: u8,
    address: i32,
    value: i32,
) -> ModbusResult<[u8; REQUEST_LEN]> {
    let pdu = write_single_pdu(address, value)?;
    Ok(wrap_tcp(unit_id, pdu))
}

fn check_len(frame: &[u8], expected: usize) -> ModbusResult<()> {
    if frame.len() < expected {
        return Err(ModbusError::TruncatedResponse {
            expected,
            actual: frame.len(),
        });
    }
    Ok(())
}

fn check_fault(frame: &[u8], function_code: u8) -> ModbusResult<()> {
    check_len(frame, FUNCTION_OFFSET + 1)?;
    if frame[FUNCTION_OFFSET] == fault_marker(function_code) {
        check_len(frame, FAULT_FRAME_LEN)?;
        return Err(ModbusError::Fault(FaultCode::from(frame[FAULT_CODE_OFFSET])));
    }
    Ok(())
}

/// Decode a response to [`encode_read_holding_registers`].
///
/// Registers come back in arrival order as sign-extended 16-bit values. No
/// word reordering happens here; that is up to the conversion in
/// [`crate::registers`] the caller feeds them into.
pub fn decode_read_response(frame: &[u8], quantity: usize) -> ModbusResult<Vec<RegisterValue>> {
    check_fault(frame, READ_HOLDING_REGISTERS)?;
    check_len(frame, REGISTERS_OFFSET + quantity * 2)?;

    let result = frame[REGISTERS_OFFSET..REGISTERS_OFFSET + quantity * 2]
        .chunks_exact(2)
        .map(|pair| i16::from_be_bytes([pair[0], pair[1]]) as RegisterValue)
        .collect();
    Ok(result)
}

/// Decode a response to [`encode_write_single_register`].
pub fn decode_write_response(frame: &[u8]) -> ModbusResult<()> {
    check_fault(frame, WRITE_SINGLE_REGISTER)
}

/// Total bytes a read response occupies, judged from what has arrived so far.
pub(crate) fn read_response_len(received: &[u8], quantity: usize) -> usize {
    if is_fault(received, READ_HOLDING_REGISTERS) {
        FAULT_FRAME_LEN
    } else {
        REGISTERS_OFFSET + quantity * 2
    }
}

/// Total bytes a write response occupies, judged from what has arrived so far.
pub(crate) fn write_response_len(received: &[u8]) -> usize {
    if is_fault(received, WRITE_SINGLE_REGISTER) {
        FAULT_FRAME_LEN
    } else {
        WRITE_ECHO_LEN
    }
}

fn is_fault(received: &[u8], function_code: u8) -> bool {
    received
        .get(FUNCTION_OFFSET)
        .is_some_and(|&fc| fc == fault_marker(function_code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_len_follows_fault_marker() {
        let pending = [0x00, 0x01, 0x00, 0x00];
        assert_eq!(read_response_len(&pending, 2), 13);
        assert_eq!(write_response_len(&pending), 12);

        let fault = [0x00, 0x01, 0x00, 0x00, 0x00, 0x03, 0x47, 0x83];
        assert_eq!(read_response_len(&fault, 2), 9);

        let fault = [0x00, 0x01, 0x00, 0x00, 0x00, 0x03, 0x47, 0x86];
        assert_eq!(write_response_len(&fault), 9);
    }

    #[test]
    fn fault_without_code_byte_is_truncated() {
        let frame = [0x00, 0x01, 0x00, 0x00, 0x00, 0x03, 0x47, 0x83];
        assert!(matches!(
            decode_read_response(&frame, 2),
            Err(ModbusError::TruncatedResponse { expected: 9, actual: 8 })
        ));
    }

    #[test]
    fn short_register_payload_is_truncated() {
        let frame = [0x00, 0x01, 0x00, 0x00, 0x00, 0x07, 0x47, 0x03, 0x04, 0x41, 0x00];
        assert!(matches!(
            decode_read_response(&frame, 2),
            Err(ModbusError::TruncatedResponse { expected: 13, actual: 11 })
        ));
    }

    #[test]
    fn registers_are_sign_extended() {
        let frame = [0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x47, 0x03, 0x02, 0xFF, 0xFE];
        assert_eq!(decode_read_response(&frame, 1).unwrap(), vec![-2]);
    }
}
