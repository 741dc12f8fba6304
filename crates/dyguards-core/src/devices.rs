//! Network device enumeration from `/proc/net`.

use std::{fs, path::Path};

use tracing::warn;

/// Kernel list of wireless interfaces.
pub const WIRELESS_FILE: &str = "/proc/net/wireless";

/// Kernel list of all interfaces.
pub const ALL_FILE: &str = "/proc/net/dev";

/// Interface names known to the kernel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceLists {
    /// Wireless interfaces.
    pub wireless: Vec<String>,
    /// Every interface, wireless included.
    pub all: Vec<String>,
}

impl DeviceLists {
    /// Read both lists from `/proc/net`.
    pub fn from_proc() -> Self {
        Self::from_paths(Path::new(WIRELESS_FILE), Path::new(ALL_FILE))
    }

    /// Read both lists from the given files. A missing file gives an empty list.
    pub fn from_paths(wireless: &Path, all: &Path) -> Self {
        Self { wireless: read_list(wireless), all: read_list(all) }
    }
}

fn read_list(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(content) => parse_device_list(&content),
        Err(err) => {
            warn!(path = %path.display(), %err, "device list not readable");
            Vec::new()
        },
    }
}

/// Interface names from a `/proc/net/{dev,wireless}` table.
///
/// Skips the two header lines and takes the first word of every other line,
/// without its trailing colon.
pub fn parse_device_list(content: &str) -> Vec<String> {
    content
        .lines()
        .filter(|line| !line.starts_with("Inter-") && !line.starts_with(" face"))
        .filter_map(|line| line.split_whitespace().next())
        .map(|word| word.strip_suffix(':').unwrap_or(word).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    const PROC_NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:  123456     789    0    0    0     0          0         0   123456     789    0    0    0     0       0          0
  eth0: 9876543    4321    0    0    0     0          0         0  1234567    3210    0    0    0     0       0          0
 wlan0: 5555555    2222    0    0    0     0          0         0   444444    1111    0    0    0     0       0          0
";

    const PROC_NET_WIRELESS: &str = "\
Inter-| sta-|   Quality        |   Discarded packets               | Missed | WE
 face | tus | link level noise |  nwid  crypt   frag  retry   misc | beacon | 22
 wlan0: 0000   54.  -56.  -256        0      0      0      0     12        0
";

    #[test]
    fn parses_proc_net_dev() {
        assert_eq!(parse_device_list(PROC_NET_DEV), vec!["lo", "eth0", "wlan0"]);
    }

    #[test]
    fn parses_proc_net_wireless() {
        assert_eq!(parse_device_list(PROC_NET_WIRELESS), vec!["wlan0"]);
    }

    #[test]
    fn missing_files_give_empty_lists() {
        let dir = TempDir::new().expect("tempdir");
        let all = dir.path().join("dev");
        fs::write(&all, PROC_NET_DEV).expect("write dev");

        let lists = DeviceLists::from_paths(&dir.path().join("wireless"), &all);
        assert!(lists.wireless.is_empty());
        assert_eq!(lists.all.len(), 3);
    }
}
