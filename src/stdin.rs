//! Component I — Stdin Forwarder.
//!
//! The triggering hook event's stdin is read exactly once and the same
//! bytes are replayed to every spawned child, so a multi-directory action
//! doesn't race multiple children over one pipe.

use std::io::IsTerminal;

use tokio::io::AsyncReadExt;

/// Read all of stdin into a buffer, unless stdin is a terminal (in which
/// case there is nothing meaningful to forward and we return `None`).
pub async fn read_once() -> Option<Vec<u8>> {
    if std::io::stdin().is_terminal() {
        return None;
    }
    let mut buffer = Vec::new();
    match tokio::io::stdin().read_to_end(&mut buffer).await {
        Ok(_) => Some(buffer),
        Err(err) => {
            tracing::warn!(error = %err, "failed to read stdin for forwarding");
            None
        }
    }
}
