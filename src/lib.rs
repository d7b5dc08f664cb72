// lib.rs

mod core;
mod modbus_tcp;

pub mod config;
pub mod registers;
pub mod session;
pub mod telemetry;

pub use config::ClientConfig;
pub use self::core::{FaultCode, MAX_READ_QUANTITY, READ_HOLDING_REGISTERS, WRITE_SINGLE_REGISTER};
pub use modbus_tcp::{
    FRAME_HEADER, MAX_ADU_LENGTH, decode_read_response, decode_write_response,
    encode_read_holding_registers, encode_write_single_register,
};
pub use registers::RegisterValue;
pub use session::{Connector, ModbusSession, TcpConnector, Transport};
pub use telemetry::TelemetryPoint;

pub type ModbusResult<T> = Result<T, ModbusError>;

#[derive(Debug, thiserror::Error)]
pub enum ModbusError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Modbus fault: {0}")]
    Fault(FaultCode),

    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Truncated response: need {expected} bytes, received {actual}")]
    TruncatedResponse { expected: usize, actual: usize },
}

impl ModbusError {
    /// True when the error is a transport read/write that ran past the
    /// session's read timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            ModbusError::Connection(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }

    /// The fault code carried by a device rejection, if this is one.
    pub fn fault_code(&self) -> Option<FaultCode> {
        match self {
            ModbusError::Fault(code) => Some(*code),
            _ => None,
        }
    }
}
