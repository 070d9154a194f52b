use std::fmt;

use serde::Serialize;

/// `<stat>` of a `+CREG` / `+CEREG` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RegistrationStatus {
    NotRegistered,
    Home,
    Searching,
    Denied,
    OutOfRange,
    Roaming,
    Unknown,
}

impl RegistrationStatus {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => RegistrationStatus::NotRegistered,
            1 => RegistrationStatus::Home,
            2 => RegistrationStatus::Searching,
            3 => RegistrationStatus::Denied,
            4 => RegistrationStatus::OutOfRange,
            5 => RegistrationStatus::Roaming,
            _ => RegistrationStatus::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RegistrationStatus::NotRegistered => "not registered",
            RegistrationStatus::Home => "home network",
            RegistrationStatus::Searching => "searching",
            RegistrationStatus::Denied => "denied",
            RegistrationStatus::OutOfRange => "out of range",
            RegistrationStatus::Roaming => "roaming",
            RegistrationStatus::Unknown => "unknown",
        }
    }

    /// Hex RGB color the status is shown with.
    pub fn color(self) -> &'static str {
        match self {
            RegistrationStatus::NotRegistered => "#c23616",
            RegistrationStatus::Home => "#44bd32",
            RegistrationStatus::Searching => "#e67e22",
            RegistrationStatus::Denied => "#e84118",
            RegistrationStatus::OutOfRange => "#f39c12",
            RegistrationStatus::Roaming => "#0097e6",
            RegistrationStatus::Unknown => "#7f8c8d",
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Location area code and cell id of the serving cell, both decoded from hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CellIdentity {
    pub lac: u32,
    pub cid: u32,
}

impl CellIdentity {
    pub fn new(lac: u32, cid: u32) -> Self {
        Self { lac, cid }
    }

    pub fn from_hex(lac: &str, cid: &str) -> Option<Self> {
        Some(Self {
            lac: u32::from_str_radix(lac, 16).ok()?,
            cid: u32::from_str_radix(cid, 16).ok()?,
        })
    }
}

/// A decoded registration reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub status: RegistrationStatus,
    pub identity: Option<CellIdentity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(RegistrationStatus::from_code(1), RegistrationStatus::Home);
        assert_eq!(RegistrationStatus::from_code(5), RegistrationStatus::Roaming);
        assert_eq!(RegistrationStatus::from_code(6), RegistrationStatus::Unknown);
        assert_eq!(RegistrationStatus::from_code(9), RegistrationStatus::Unknown);
    }

    #[test]
    fn status_colors() {
        assert_eq!(RegistrationStatus::Home.color(), "#44bd32");
        assert_eq!(RegistrationStatus::Roaming.color(), "#0097e6");
        assert_eq!(RegistrationStatus::Unknown.color(), "#7f8c8d");
    }

    #[test]
    fn identity_from_hex() {
        assert_eq!(
            CellIdentity::from_hex("1A2B", "00112233"),
            Some(CellIdentity::new(6699, 1_122_867))
        );
        assert_eq!(CellIdentity::from_hex("1a2b", "ff"), Some(CellIdentity::new(6699, 255)));
        assert_eq!(CellIdentity::from_hex("1A2B", "123456789"), None);
    }
}
