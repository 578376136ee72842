use crate::{
    Result,
    constants::{
        METHOD_TURN_OFF_PIN, METHOD_TURN_ON_PIN, MSG_PIN_OFF, MSG_PIN_ON, PRODUCT_ID, VENDOR_ID,
    },
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pin action requested from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinAction {
    On,
    Off,
}

impl PinAction {
    /// Wire name of the action.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PinAction::On => "on",
            PinAction::Off => "off",
        }
    }

    /// Bus method performing this action.
    #[must_use]
    pub fn method(self) -> &'static str {
        match self {
            PinAction::On => METHOD_TURN_ON_PIN,
            PinAction::Off => METHOD_TURN_OFF_PIN,
        }
    }

    /// Phrase the firmware replies with when the action succeeded.
    #[must_use]
    pub fn expected_reply(self) -> &'static str {
        match self {
            PinAction::On => MSG_PIN_ON,
            PinAction::Off => MSG_PIN_OFF,
        }
    }
}

impl fmt::Display for PinAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PinAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "on" => Ok(PinAction::On),
            "off" => Ok(PinAction::Off),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }
}

/// Command sent to the device: switch `pin` according to `action`.
///
/// Serializes to the wire request `{"action":"on","pin":5}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinCommand {
    pub action: PinAction,
    pub pin: u32,
}

impl PinCommand {
    #[must_use]
    pub fn new(action: PinAction, pin: u32) -> Self {
        Self { action, pin }
    }
}

impl fmt::Display for PinCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} pin {}", self.action, self.pin)
    }
}

/// USB vendor/product identifier pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UsbId {
    pub vid: u16,
    pub pid: u16,
}

impl UsbId {
    #[must_use]
    pub const fn new(vid: u16, pid: u16) -> Self {
        Self { vid, pid }
    }

    /// Identifier of the supported microcontroller.
    #[must_use]
    pub const fn microcontroller() -> Self {
        Self::new(VENDOR_ID, PRODUCT_ID)
    }

    #[must_use]
    pub fn matches(&self, vid: u16, pid: u16) -> bool {
        self.vid == vid && self.pid == pid
    }
}

impl Default for UsbId {
    fn default() -> Self {
        Self::microcontroller()
    }
}

impl fmt::Display for UsbId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04X}:{:04X}", self.vid, self.pid)
    }
}
