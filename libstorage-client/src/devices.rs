//! Local block-device discovery.
//!
//! Scans a partition listing such as `/proc/partitions` for device names
//! that start with a given prefix:
//!
//! ```text
//! major minor  #blocks  name
//!
//!  202        0    8388608 xvda
//!  202       16    1048576 xvdb
//! ```
//!
//! A line matches when its last whitespace-separated token is the prefix
//! followed by one or more ASCII word characters (`[0-9A-Za-z_]`). The
//! matched token, prefix included, becomes `/dev/<token>`.

use regex::Regex;

use crate::{ClientError, Result};

/// Extract `/dev/...` paths for every line ending in `<prefix>` plus ASCII
/// word characters.
///
/// Output follows line order and keeps duplicates.
pub fn scan_local_devices(content: &str, prefix: &str) -> Result<Vec<String>> {
    let pattern = format!(r"^.+?\s+({}(?-u:\w)+)$", regex::escape(prefix));
    let rx = Regex::new(&pattern)
        .map_err(|e| ClientError::Config(format!("invalid device prefix {:?}: {}", prefix, e)))?;

    Ok(content
        .lines()
        .filter_map(|line| rx.captures(line))
        .map(|caps| format!("/dev/{}", &caps[1]))
        .collect())
}
