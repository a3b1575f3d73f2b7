//! Parser for `sbd dump` and `sbd list` output
//!
//! Support bundles print one block per device and command. Header lines
//! (`Timeout (msgwait) : 120`) and slot lines (`0  hn1-db-0  clear`) are
//! attributed to the device named by the most recent command or dump banner.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// `sbd -d <dev> dump|list` command echo, or the dump banner
static DEVICE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:sbd\s+-d\s+(\S+)\s+(?:dump|list)\b|^==Dumping header on disk\s+(\S+))").unwrap()
});

static TIMEOUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Timeout \((\w+)\)\s*:\s*(\S+)").unwrap());

/// Slot number, node, message and optional sender
static SLOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(\S+)\s+(\S+)(?:\s+(\S+))?\s*$").unwrap());

/// One node slot on a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SbdSlot {
    pub index: u32,
    pub node: String,
    /// `clear` when no fencing request is pending
    pub message: String,
}

impl SbdSlot {
    pub fn is_clear(&self) -> bool {
        self.message == "clear"
    }
}

/// Header timeouts and slots of one SBD device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SbdDevice {
    pub path: String,
    /// `watchdog`, `allocate`, `loop`, `msgwait` -> raw value
    pub timeouts: BTreeMap<String, String>,
    pub slots: Vec<SbdSlot>,
}

impl SbdDevice {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn timeout(&self, name: &str) -> Option<&str> {
        self.timeouts.get(name).map(String::as_str)
    }
}

/// Collect devices in order of first mention
pub fn parse_sbd(text: &str) -> Vec<SbdDevice> {
    let mut devices: Vec<SbdDevice> = Vec::new();
    let mut current: Option<usize> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(caps) = DEVICE_RE.captures(line) {
            if let Some(path) = caps.get(1).or_else(|| caps.get(2)) {
                let path = path.as_str();
                let idx = match devices.iter().position(|d| d.path == path) {
                    Some(idx) => idx,
                    None => {
                        devices.push(SbdDevice::new(path));
                        devices.len() - 1
                    }
                };
                current = Some(idx);
            }
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        let Some(device) = current.and_then(|idx| devices.get_mut(idx)) else {
            log::debug!("sbd output before any device: '{}'", line);
            continue;
        };

        if let Some(caps) = TIMEOUT_RE.captures(line) {
            device
                .timeouts
                .insert(caps[1].to_string(), caps[2].to_string());
        } else if let Some(caps) = SLOT_RE.captures(line) {
            let Ok(index) = caps[1].parse() else {
                continue;
            };
            device.slots.push(SbdSlot {
                index,
                node: caps[2].to_string(),
                message: caps[3].to_string(),
            });
        }
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "\
#==[ Command ]======================================#
# /usr/sbin/sbd -d /dev/disk/by-id/scsi-36001405a dump
==Dumping header on disk /dev/disk/by-id/scsi-36001405a
Header version     : 2.1
UUID               : 9b3f2c5e-6b0f-4b8a-9a3e-1c0e7f3d2a11
Number of slots    : 255
Sector size        : 512
Timeout (watchdog) : 60
Timeout (allocate) : 2
Timeout (loop)     : 1
Timeout (msgwait)  : 120
==Header on disk /dev/disk/by-id/scsi-36001405a is dumped

#==[ Command ]======================================#
# /usr/sbin/sbd -d /dev/disk/by-id/scsi-36001405a list
0\thn1-db-0\tclear
1\thn1-db-1\treset\thn1-db-0
";

    #[test]
    fn test_parse_dump_and_list() {
        let devices = parse_sbd(DUMP);

        assert_eq!(devices.len(), 1);
        let device = &devices[0];
        assert_eq!(device.path, "/dev/disk/by-id/scsi-36001405a");
        assert_eq!(device.timeout("watchdog"), Some("60"));
        assert_eq!(device.timeout("msgwait"), Some("120"));
        assert_eq!(device.slots.len(), 2);
        assert!(device.slots[0].is_clear());
        assert_eq!(device.slots[1].node, "hn1-db-1");
        assert_eq!(device.slots[1].message, "reset");
    }

    #[test]
    fn test_multiple_devices_keep_order() {
        let text = "\
==Dumping header on disk /dev/sdb
Timeout (watchdog) : 60
==Dumping header on disk /dev/sdc
Timeout (watchdog) : 30
# sbd -d /dev/sdb list
0 vm1 clear
";
        let devices = parse_sbd(text);
        let paths: Vec<_> = devices.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(paths, vec!["/dev/sdb", "/dev/sdc"]);
        assert_eq!(devices[0].slots.len(), 1);
        assert_eq!(devices[1].timeout("watchdog"), Some("30"));
    }

    #[test]
    fn test_lines_before_a_device_are_ignored() {
        let devices = parse_sbd("0 vm1 clear\nTimeout (msgwait) : 120\n");
        assert!(devices.is_empty());
    }
}
