use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use serialport::SerialPort;
use tracing::{debug, warn};

use crate::errors::{ModemError, Result};

/// Single read slice, the command timeout is enforced across slices.
const READ_SLICE: Duration = Duration::from_millis(100);

/// Something that answers AT commands with their raw reply text.
pub trait AtTransport {
    fn send(&mut self, command: &str) -> Result<String>;
}

fn is_error_line(line: &str) -> bool {
    line == "ERROR" || line.starts_with("+CME ERROR") || line.starts_with("+CMS ERROR")
}

/// A line of its own holding `OK` or an error result code ends the reply.
fn is_final(response: &str) -> bool {
    response
        .lines()
        .map(str::trim)
        .any(|line| line == "OK" || is_error_line(line))
}

fn is_error(response: &str) -> bool {
    response.lines().map(str::trim).any(is_error_line)
}

/// A modem attached to a serial port.
pub struct SerialModem {
    port: Box<dyn SerialPort>,
    command_timeout: Duration,
}

impl SerialModem {
    pub fn open(device: &str, baud: u32, command_timeout: Duration) -> Result<Self> {
        let port = serialport::new(device, baud)
            .timeout(READ_SLICE)
            .open()
            .map_err(|source| ModemError::Open {
                device: device.to_string(),
                source,
            })?;

        Ok(Self {
            port,
            command_timeout,
        })
    }
}

impl AtTransport for SerialModem {
    /// Writes `command\r\n` and collects the reply until a final result code or
    /// the command timeout. A partial reply at timeout is returned as is.
    fn send(&mut self, command: &str) -> Result<String> {
        debug!("Sending AT command: {}", command);
        self.port.write_all(format!("{command}\r\n").as_bytes())?;

        let deadline = Instant::now() + self.command_timeout;
        let mut response = String::new();
        let mut buf = [0u8; 1024];

        while Instant::now() < deadline {
            match self.port.read(&mut buf) {
                Ok(n) if n > 0 => {
                    response.push_str(&String::from_utf8_lossy(&buf[..n]));
                    if is_final(&response) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) if e.kind() == ErrorKind::TimedOut => {}
                Err(e) => return Err(e.into()),
            }
        }

        if response.is_empty() {
            return Err(ModemError::NoResponse(command.to_string()));
        }

        if is_error(&response) {
            warn!("AT command returned error: {}", response.trim());
        } else if !is_final(&response) {
            warn!(command, "AT command timed out with a partial reply");
        } else {
            debug!("AT command response: {}", response.trim());
        }

        Ok(response)
    }
}
