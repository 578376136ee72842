//! The `devctl` bus object.
//!
//! Each control call walks the same steps, and any failure skips straight to
//! the reply:
//!
//! ```text
//! Validate ─► Open+Lock ─► Configure ─► Write ─► Read ─► Decode ─► Reply
//!    │            │            │          │        │        │
//!    └────────────┴────────────┴──────────┴────────┴────────┴──────► Reply(error)
//! ```
//!
//! Argument errors are JSON-RPC `INVALID_PARAMS` errors and never touch a
//! device. Every later outcome is a `{status[, error]}` result.

use crate::error::RpcError;
use crate::router::Router;
use devctl_core::constants::{
    MAX_DEVICES, METHOD_LIST_DEVICES, METHOD_TURN_OFF_PIN, METHOD_TURN_ON_PIN, OBJECT_NAME,
    RESPONSE_BUFFER_SIZE, TRANSACTION_TIMEOUT,
};
use devctl_core::{PinAction, PinCommand, RpcResult, Status};
use devctl_protocol::{DeviceResponse, ProtocolError, ResponseCodec, encode_request};
use devctl_serial::{
    DeviceDiscovery, PortEnumerator, SerialBackend, SerialTransport, TransportError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Arguments of `turn_on_pin` and `turn_off_pin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlArgs {
    /// Device path as returned by `list_devices`.
    pub device: String,
    pub pin: u32,
}

impl ControlArgs {
    /// Extract and validate arguments from a params object.
    ///
    /// # Errors
    /// `RpcError::InvalidParams` when `device` or `pin` is missing or
    /// mistyped, or `device` is empty.
    pub fn from_params(params: &Value) -> Result<Self, RpcError> {
        let args =
            Self::deserialize(params).map_err(|e| RpcError::InvalidParams(e.to_string()))?;
        if args.device.is_empty() {
            return Err(RpcError::InvalidParams("device must not be empty".into()));
        }
        Ok(args)
    }
}

/// Reply of `list_devices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListDevicesReply {
    Devices { devices: Vec<String> },
    Failed { status: Status },
}

/// Failure of a control call after argument validation.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ControlError {
    /// Caller-facing status of this failure.
    pub fn status(&self) -> Status {
        match self {
            ControlError::Transport(error) => match error {
                TransportError::OpenFailed { .. }
                | TransportError::LockFailed { .. }
                | TransportError::ConfigFailed { .. } => Status::ConnectFail,
                TransportError::WriteFailed { .. } => Status::SendFail,
                TransportError::ReadFailed { .. } => Status::RecvFail,
                TransportError::Disconnected { .. } => Status::Disconnected,
                TransportError::ResponseTooLarge { .. } => Status::ResponseTooLarge,
                _ => Status::InternalError,
            },
            ControlError::Protocol(ProtocolError::DiagnosticOverflow { .. }) => {
                Status::UnknownError
            }
            ControlError::Protocol(_) => Status::InternalError,
        }
    }
}

/// Implements the `devctl` methods over a port enumerator and a serial
/// backend.
#[derive(Debug, Clone)]
pub struct RequestDispatcher<E, B> {
    discovery: DeviceDiscovery<E>,
    transport: SerialTransport<B>,
    timeout: Duration,
}

#[cfg(unix)]
impl RequestDispatcher<devctl_serial::SystemPorts, devctl_serial::TtyBackend> {
    /// Dispatcher talking to the real system.
    pub fn system() -> Self {
        Self::new(devctl_serial::SystemPorts, devctl_serial::TtyBackend)
    }
}

impl<E: PortEnumerator, B: SerialBackend> RequestDispatcher<E, B> {
    pub fn new(enumerator: E, backend: B) -> Self {
        Self::with_parts(
            DeviceDiscovery::new(enumerator),
            SerialTransport::new(backend),
        )
    }

    pub fn with_parts(discovery: DeviceDiscovery<E>, transport: SerialTransport<B>) -> Self {
        Self {
            discovery,
            transport,
            timeout: TRANSACTION_TIMEOUT,
        }
    }

    /// Paths of the attached microcontrollers, in enumeration order.
    pub fn list_devices(&self) -> ListDevicesReply {
        match self.discovery.discover(MAX_DEVICES) {
            Ok(discovery) => {
                debug!(
                    count = discovery.devices.len(),
                    truncated = discovery.truncated,
                    "Listed devices"
                );
                ListDevicesReply::Devices {
                    devices: discovery.paths(),
                }
            }
            Err(error) => {
                error!(%error, "Failed to list devices");
                ListDevicesReply::Failed {
                    status: Status::UnknownError,
                }
            }
        }
    }

    pub fn turn_on_pin(&self, device: &str, pin: u32) -> RpcResult {
        self.control(PinAction::On, device, pin)
    }

    pub fn turn_off_pin(&self, device: &str, pin: u32) -> RpcResult {
        self.control(PinAction::Off, device, pin)
    }

    fn control(&self, action: PinAction, device: &str, pin: u32) -> RpcResult {
        debug!(device, pin, %action, "Control request");

        match self.exchange(action, device, pin) {
            Ok(DeviceResponse::Success) => {
                info!(device, pin, %action, "Pin switched");
                RpcResult::ok()
            }
            Ok(DeviceResponse::OperationFailed { message }) => {
                warn!(device, pin, %action, %message, "Device reported failure");
                RpcResult::failure(Status::OperationFailed, message.as_str())
            }
            Ok(DeviceResponse::ParseFailure { message }) => {
                warn!(device, pin, %action, %message, "Unreadable device reply");
                RpcResult::failure(Status::ParseFailure, message.as_str())
            }
            Err(failure) => {
                let status = failure.status();
                if status == Status::InternalError {
                    error!(device, pin, %action, error = ?failure, "Unclassified control failure");
                } else {
                    error!(
                        device,
                        pin,
                        %action,
                        status = status.code(),
                        error = %failure,
                        "Control request failed"
                    );
                }
                RpcResult::generic(status)
            }
        }
    }

    fn exchange(
        &self,
        action: PinAction,
        device: &str,
        pin: u32,
    ) -> Result<DeviceResponse, ControlError> {
        let request = encode_request(&PinCommand::new(action, pin))?;
        let reply = self
            .transport
            .transact::<RESPONSE_BUFFER_SIZE>(device, &request, self.timeout)?;
        Ok(ResponseCodec::parse(&reply, action)?)
    }
}

fn to_result<T: Serialize>(reply: T) -> Result<Value, RpcError> {
    serde_json::to_value(reply).map_err(|e| RpcError::Internal(e.to_string()))
}

fn list_devices<E: PortEnumerator, B: SerialBackend>(
    dispatcher: &RequestDispatcher<E, B>,
    _params: &Value,
) -> Result<Value, RpcError> {
    to_result(dispatcher.list_devices())
}

fn turn_on_pin<E: PortEnumerator, B: SerialBackend>(
    dispatcher: &RequestDispatcher<E, B>,
    params: &Value,
) -> Result<Value, RpcError> {
    let args = ControlArgs::from_params(params)
        .inspect_err(|error| warn!(%error, "Rejected turn_on_pin arguments"))?;
    to_result(dispatcher.turn_on_pin(&args.device, args.pin))
}

fn turn_off_pin<E: PortEnumerator, B: SerialBackend>(
    dispatcher: &RequestDispatcher<E, B>,
    params: &Value,
) -> Result<Value, RpcError> {
    let args = ControlArgs::from_params(params)
        .inspect_err(|error| warn!(%error, "Rejected turn_off_pin arguments"))?;
    to_result(dispatcher.turn_off_pin(&args.device, args.pin))
}

/// Method table of the `devctl` object.
pub fn devctl_router<E: PortEnumerator, B: SerialBackend>() -> Router<RequestDispatcher<E, B>> {
    Router::new(OBJECT_NAME)
        .method(METHOD_LIST_DEVICES, list_devices::<E, B>)
        .method(METHOD_TURN_ON_PIN, turn_on_pin::<E, B>)
        .method(METHOD_TURN_OFF_PIN, turn_off_pin::<E, B>)
}

#[cfg(test)]
mod tests {
    use super::*;
    use devctl_serial::mock::{MockDevice, MockPorts};
    use rstest::rstest;
    use serde_json::json;
    use std::io;

    fn dispatcher(ports: &MockPorts) -> RequestDispatcher<MockPorts, MockPorts> {
        RequestDispatcher::new(ports.clone(), ports.clone())
    }

    #[rstest]
    #[case::missing_pin(json!({"device": "/dev/ttyUSB0"}))]
    #[case::missing_device(json!({"pin": 5}))]
    #[case::empty_device(json!({"device": "", "pin": 5}))]
    #[case::negative_pin(json!({"device": "/dev/ttyUSB0", "pin": -1}))]
    #[case::pin_too_large(json!({"device": "/dev/ttyUSB0", "pin": 4_294_967_296_u64}))]
    #[case::pin_as_string(json!({"device": "/dev/ttyUSB0", "pin": "5"}))]
    #[case::device_as_number(json!({"device": 0, "pin": 5}))]
    #[case::legacy_device_id(json!({"device_id": "/dev/ttyUSB0", "pin": 5}))]
    fn test_invalid_arguments(#[case] params: Value) {
        assert!(matches!(
            ControlArgs::from_params(&params),
            Err(RpcError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_valid_arguments() {
        let params = json!({"device": "/dev/ttyUSB0", "pin": 4_294_967_295_u32});
        let args = ControlArgs::from_params(&params).unwrap();
        assert_eq!(args.device, "/dev/ttyUSB0");
        assert_eq!(args.pin, u32::MAX);
    }

    #[rstest]
    #[case(TransportError::OpenFailed { device: "d".into(), source: io::ErrorKind::NotFound.into() }, Status::ConnectFail)]
    #[case(TransportError::LockFailed { device: "d".into(), source: io::ErrorKind::WouldBlock.into() }, Status::ConnectFail)]
    #[case(TransportError::ConfigFailed { device: "d".into(), source: devctl_serial::LineConfigError::UnsupportedBaudRate(1) }, Status::ConnectFail)]
    #[case(TransportError::WriteFailed { device: "d".into(), source: io::ErrorKind::WriteZero.into() }, Status::SendFail)]
    #[case(TransportError::ReadFailed { device: "d".into(), source: io::ErrorKind::TimedOut.into() }, Status::RecvFail)]
    #[case(TransportError::Disconnected { device: "d".into() }, Status::Disconnected)]
    #[case(TransportError::ResponseTooLarge { device: "d".into(), len: 60, capacity: 50 }, Status::ResponseTooLarge)]
    fn test_transport_status(#[case] error: TransportError, #[case] status: Status) {
        assert_eq!(ControlError::from(error).status(), status);
    }

    #[test]
    fn test_protocol_status() {
        let overflow = ProtocolError::DiagnosticOverflow { capacity: 128 };
        let too_large = ProtocolError::RequestTooLarge {
            len: 60,
            capacity: 50,
        };
        assert_eq!(ControlError::from(overflow).status(), Status::UnknownError);
        assert_eq!(ControlError::from(too_large).status(), Status::InternalError);
    }

    #[test]
    fn test_list_devices_failure_reports_status_only() {
        let ports = MockPorts::new();
        ports.fail_enumeration("no udev");

        let reply = dispatcher(&ports).list_devices();
        assert_eq!(
            reply,
            ListDevicesReply::Failed {
                status: Status::UnknownError
            }
        );
        assert_eq!(serde_json::to_value(&reply).unwrap(), json!({"status": 9}));
    }

    #[test]
    fn test_router_rejects_arguments_before_io() {
        let ports = MockPorts::new();
        ports.script("/dev/ttyUSB0", MockDevice::replying(b"{}"));

        let outcome = devctl_router().call(
            &dispatcher(&ports),
            "devctl.turn_off_pin",
            &json!({"device": "/dev/ttyUSB0"}),
        );

        assert!(matches!(outcome, Err(RpcError::InvalidParams(_))));
        assert_eq!(ports.open_count(), 0);
    }

    #[test]
    fn test_router_lists_all_methods() {
        let router: Router<RequestDispatcher<MockPorts, MockPorts>> = devctl_router();
        let names: Vec<String> = router.methods().collect();
        assert_eq!(
            names,
            vec!["devctl.list_devices", "devctl.turn_off_pin", "devctl.turn_on_pin"]
        );
    }
}
