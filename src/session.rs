//! One blocking Modbus TCP connection to one device.
//!
//! A session sends exactly one request and waits for its response before the
//! next call can start; every exchanging method takes `&mut self`, so the
//! borrow checker rules out a second request in flight. Sharing a session
//! across threads needs external locking (e.g. a `Mutex`) because the
//! protocol has no way to tell interleaved responses apart.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::modbus_tcp::{self, MAX_ADU_LENGTH};
use crate::registers::RegisterValue;
use crate::{ModbusError, ModbusResult, READ_HOLDING_REGISTERS, WRITE_SINGLE_REGISTER};

/// Byte stream a session talks over.
pub trait Transport: Read + Write {
    /// Close both directions. Any blocked read on the stream is released.
    fn shutdown(&mut self) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn shutdown(&mut self) -> io::Result<()> {
        TcpStream::shutdown(self, Shutdown::Both)
    }
}

/// Opens the stream for a session.
pub trait Connector {
    type Stream: Transport;

    /// Open a new stream. Reads on the returned stream must fail once
    /// `timeout` elapses without data.
    fn connect(&mut self, timeout: Duration) -> io::Result<Self::Stream>;
}

#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    port: u16,
}

impl TcpConnector {
    pub fn new(host: &str, port: u16) -> Self {
        TcpConnector {
            host: host.to_string(),
            port,
        }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&mut self, timeout: Duration) -> io::Result<TcpStream> {
        let mut last_err = None;
        for addr in (self.host.as_str(), self.port).to_socket_addrs()? {
            debug!("TCP connecting: {}", addr);
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(timeout))?;
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("TCP_NODELAY: {}", e);
                    }
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                ErrorKind::AddrNotAvailable,
                format!("{}:{} resolved to no address", self.host, self.port),
            )
        }))
    }
}

enum Connection<S> {
    Closed,
    Open(S),
}

pub struct ModbusSession<C: Connector> {
    connector: C,
    unit_id: u8,
    connection: Connection<C::Stream>,
}

impl<C: Connector> ModbusSession<C> {
    /// A closed session addressing `unit_id`.
    pub fn new(connector: C, unit_id: u8) -> Self {
        ModbusSession {
            connector,
            unit_id,
            connection: Connection::Closed,
        }
    }

    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.connection, Connection::Open(_))
    }

    /// Open the connection, replacing any connection already open.
    pub fn connect(&mut self, timeout: Duration) -> ModbusResult<()> {
        if self.is_connected() {
            debug!("Reconnect: closing previous stream");
            self.disconnect();
        }
        match self.connector.connect(timeout) {
            Ok(stream) => {
                info!("Connected: unit={} timeout={:?}", self.unit_id, timeout);
                self.connection = Connection::Open(stream);
                Ok(())
            }
            Err(e) => {
                error!("Connect failed: {}", e);
                Err(ModbusError::Connection(e))
            }
        }
    }

    /// Close the connection. Does nothing if it is already closed.
    pub fn disconnect(&mut self) {
        if let Connection::Open(mut stream) =
            std::mem::replace(&mut self.connection, Connection::Closed)
        {
            if let Err(e) = stream.shutdown() {
                debug!("Shutdown: {}", e);
            }
            info!("Disconnected: unit={}", self.unit_id);
        }
    }

    /// Read `quantity` holding registers starting at `address` (function 0x03).
    pub fn read_holding_registers(
        &mut self,
        address: i32,
        quantity: i32,
    ) -> ModbusResult<Vec<RegisterValue>> {
        self.ensure_connected()?;
        let request = modbus_tcp::encode_read_holding_registers(self.unit_id, address, quantity)?;
        debug!("FC{:02} addr={} qty={}", READ_HOLDING_REGISTERS, address, quantity);

        let quantity = quantity as usize;
        let response = self.exchange(&request, |received| {
            modbus_tcp::read_response_len(received, quantity)
        })?;
        modbus_tcp::decode_read_response(&response, quantity).inspect_err(|e| {
            debug!("FC{:02} rejected: {}", READ_HOLDING_REGISTERS, e);
        })
    }

    /// Write one holding register (function 0x06).
    pub fn write_single_register(&mut self, address: i32, value: i32) -> ModbusResult<()> {
        self.ensure_connected()?;
        let request = modbus_tcp::encode_write_single_register(self.unit_id, address, value)?;
        debug!("FC{:02} addr={} value={}", WRITE_SINGLE_REGISTER, address, value);

        let response = self.exchange(&request, modbus_tcp::write_response_len)?;
        modbus_tcp::decode_write_response(&response).inspect_err(|e| {
            debug!("FC{:02} rejected: {}", WRITE_SINGLE_REGISTER, e);
        })
    }

    fn ensure_connected(&self) -> ModbusResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ModbusError::NotConnected)
        }
    }

    /// Send `request` and collect the response. A transport failure leaves
    /// the stream in an unknown position, so it closes the connection.
    fn exchange(
        &mut self,
        request: &[u8],
        response_len: impl Fn(&[u8]) -> usize,
    ) -> ModbusResult<Vec<u8>> {
        let stream = match &mut self.connection {
            Connection::Open(stream) => stream,
            Connection::Closed => return Err(ModbusError::NotConnected),
        };

        match transact(stream, request, response_len) {
            Ok(response) => Ok(response),
            Err(e) => {
                if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock {
                    warn!("Response timeout, closing connection");
                } else {
                    error!("Transport error, closing connection: {}", e);
                }
                self.disconnect();
                Err(ModbusError::Connection(e))
            }
        }
    }
}

impl<C: Connector> Drop for ModbusSession<C> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn transact<S: Transport>(
    stream: &mut S,
    request: &[u8],
    response_len: impl Fn(&[u8]) -> usize,
) -> io::Result<Vec<u8>> {
    stream.write_all(request)?;
    stream.flush()?;
    debug!("TX: {}B", request.len());

    let mut buffer = [0u8; MAX_ADU_LENGTH];
    let mut received = 0;
    loop {
        let expected = response_len(&buffer[..received]).min(MAX_ADU_LENGTH);
        if received >= expected {
            break;
        }
        match stream.read(&mut buffer[received..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("stream closed after {received} of {expected} bytes"),
                ));
            }
            Ok(n) => received += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    debug!("RX: {}B", received);
    Ok(buffer[..received].to_vec())
}
