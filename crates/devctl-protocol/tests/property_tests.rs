//! Property-based tests for the serial wire format.
//!
//! These tests use proptest to generate arbitrary replies and commands and
//! verify that the codec's classification invariants hold for all of them.

use devctl_core::constants::MSG_MAXLEN;
use devctl_core::{PinAction, PinCommand};
use devctl_protocol::{DeviceResponse, ResponseCodec, encode_request};
use proptest::prelude::*;

/// Strategy for generating pin actions.
fn any_action() -> impl Strategy<Value = PinAction> {
    prop_oneof![Just(PinAction::On), Just(PinAction::Off)]
}

/// Strategy for generating short device messages without JSON metacharacters.
fn device_message() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9 ]{0,40}").expect("Failed to create message strategy")
}

proptest! {
    /// Property: the codec never panics, whatever bytes the device sends.
    #[test]
    fn prop_parse_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..64), action in any_action()) {
        let _ = ResponseCodec::parse(&bytes, action);
    }

    /// Property: a reply is a success only with status 0 and the exact phrase
    /// of the requested action.
    #[test]
    fn prop_success_requires_exact_phrase(
        code in -5i64..5,
        msg in device_message(),
        action in any_action(),
    ) {
        let reply = serde_json::json!({"response": code, "msg": msg}).to_string();
        let decoded = ResponseCodec::parse(reply.as_bytes(), action).unwrap();

        let expected_success = code == 0 && msg == action.expected_reply();
        prop_assert_eq!(decoded.is_success(), expected_success);

        if !expected_success {
            prop_assert!(matches!(decoded, DeviceResponse::OperationFailed { .. }), "expected OperationFailed");
            prop_assert_eq!(decoded.message(), Some(msg.as_str()));
        }
    }

    /// Property: the phrase for one action never validates the other action.
    #[test]
    fn prop_opposite_phrase_never_succeeds(action in any_action()) {
        let opposite = match action {
            PinAction::On => PinAction::Off,
            PinAction::Off => PinAction::On,
        };
        let reply = serde_json::json!({"response": 0, "msg": opposite.expected_reply()}).to_string();
        let decoded = ResponseCodec::parse(reply.as_bytes(), action).unwrap();
        prop_assert!(!decoded.is_success());
    }

    /// Property: every command encodes into a single line within the frame.
    #[test]
    fn prop_every_command_fits_frame(pin in any::<u32>(), action in any_action()) {
        let frame = encode_request(&PinCommand::new(action, pin)).unwrap();
        prop_assert!(frame.len() <= MSG_MAXLEN);
        prop_assert_eq!(frame.iter().filter(|b| **b == b'\n').count(), 1);

        let decoded: PinCommand = serde_json::from_slice(&frame).unwrap();
        prop_assert_eq!(decoded, PinCommand::new(action, pin));
    }
}
