//! Property tests for device discovery.

use devctl_core::UsbId;
use devctl_serial::DeviceDiscovery;
use devctl_serial::mock::MockPorts;
use proptest::prelude::*;

fn port_ids() -> impl Strategy<Value = Vec<(u16, u16)>> {
    prop::collection::vec(
        prop_oneof![
            Just((0x10C4_u16, 0xEA60_u16)),
            (any::<u16>(), any::<u16>()),
            Just((0x10C4_u16, 0xEA61_u16)),
        ],
        0..24,
    )
}

proptest! {
    #[test]
    fn discovered_devices_match_and_respect_bound(ids in port_ids(), max in 0usize..20) {
        let ports = MockPorts::new();
        for (index, (vid, pid)) in ids.iter().enumerate() {
            ports.add_usb_port(&format!("/dev/ttyUSB{index}"), *vid, *pid);
        }
        let matching: Vec<String> = ids
            .iter()
            .enumerate()
            .filter(|(_, (vid, pid))| UsbId::microcontroller().matches(*vid, *pid))
            .map(|(index, _)| format!("/dev/ttyUSB{index}"))
            .collect();

        let discovery = DeviceDiscovery::new(ports).discover(max).unwrap();

        prop_assert!(discovery.devices.len() <= max);
        prop_assert_eq!(discovery.truncated, matching.len() > max);
        prop_assert_eq!(discovery.paths(), matching.into_iter().take(max).collect::<Vec<_>>());
        for device in &discovery.devices {
            prop_assert_eq!(device.usb_id, UsbId::microcontroller());
        }
    }
}
