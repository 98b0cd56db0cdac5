//! Owned device naming.
//!
//! Owned devices are named `inaccel0`, `inaccel1`, ... with a global,
//! zero-based index. The format is shared with existing deployments and must
//! not change.
//!
//! Classification is strict: only the exact canonical rendering of an index
//! counts as owned. `inaccel01`, `inaccel-fpga` and `inaccel` are foreign.

use crds::HostDevice;

/// Reserved prefix of owned device names
pub const OWNED_PREFIX: &str = "inaccel";

/// Name of the owned device with the given index.
pub fn canonical_name(index: usize) -> String {
    format!("{OWNED_PREFIX}{index}")
}

/// Owned host device number `index` reserving one unit of `resource_name`.
pub fn owned_host_device(resource_name: &str, index: usize) -> HostDevice {
    HostDevice::new(canonical_name(index), resource_name)
}

/// Whether `device` is the owned device with the given index.
pub fn is_owned_device(device: &HostDevice, index: usize) -> bool {
    device.name == canonical_name(index)
}

/// Index of `device` if it is owned, `None` if it is foreign.
pub fn owned_index(device: &HostDevice) -> Option<usize> {
    let suffix = device.name.strip_prefix(OWNED_PREFIX)?;
    // usize::from_str accepts a leading '+'
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let index = suffix.parse::<usize>().ok()?;
    is_owned_device(device, index).then_some(index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name(0), "inaccel0");
        assert_eq!(canonical_name(12), "inaccel12");
    }

    #[test]
    fn test_owned_host_device() {
        let device = owned_host_device("xilinx.com/fpga-xilinx_u250", 3);
        assert_eq!(device.name, "inaccel3");
        assert_eq!(device.device_name, "xilinx.com/fpga-xilinx_u250");
        assert!(device.extra.is_empty());
    }

    #[test]
    fn test_is_owned_device_checks_exact_index() {
        let device = HostDevice::new("inaccel2", "gpuA");
        assert!(is_owned_device(&device, 2));
        assert!(!is_owned_device(&device, 0));
        assert!(!is_owned_device(&device, 20));
    }

    #[test]
    fn test_owned_index() {
        assert_eq!(owned_index(&HostDevice::new("inaccel0", "x")), Some(0));
        assert_eq!(owned_index(&HostDevice::new("inaccel42", "x")), Some(42));
    }

    #[test]
    fn test_owned_index_rejects_non_canonical_names() {
        for name in [
            "inaccel",
            "inaccel01",
            "inaccel+1",
            "inaccel-fpga",
            "inaccel1a",
            "INACCEL1",
            "gpu0",
            "myinaccel0",
            "inaccel99999999999999999999999",
        ] {
            assert_eq!(owned_index(&HostDevice::new(name, "x")), None, "{name} should be foreign");
        }
    }
}
