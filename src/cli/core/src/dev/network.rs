/* src/cli/core/src/dev/network.rs */

use anyhow::{Result, bail};

const PORT_SEARCH_SPAN: u16 = 100;

/// `preferred` if it is free, otherwise the next free port above it.
pub(super) fn find_available_port(preferred: u16) -> Result<u16> {
  let last = preferred.saturating_add(PORT_SEARCH_SPAN);
  for port in preferred..last {
    if std::net::TcpListener::bind(("0.0.0.0", port)).is_ok() {
      return Ok(port);
    }
  }
  bail!("no available port found in range {preferred}-{}", last - 1);
}
