/* src/cli/core/src/dev/reload.rs */

// Live-reload channel: every connected browser gets every message.

use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
  Recompiling,
  Reload { file: String },
  Error { message: String },
}

impl ReloadMessage {
  pub fn to_json(&self) -> String {
    serde_json::to_string(self).unwrap_or_default()
  }
}

#[derive(Debug, Clone)]
pub struct ReloadHub {
  tx: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
  pub fn new(capacity: usize) -> Self {
    let (tx, _) = broadcast::channel(capacity);
    Self { tx }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
    self.tx.subscribe()
  }

  /// Number of clients the message reached; zero when nobody is connected.
  pub fn send(&self, message: ReloadMessage) -> usize {
    self.tx.send(message).unwrap_or(0)
  }

  pub fn client_count(&self) -> usize {
    self.tx.receiver_count()
  }
}

impl Default for ReloadHub {
  fn default() -> Self {
    Self::new(64)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn wire_format() {
    assert_eq!(ReloadMessage::Recompiling.to_json(), r#"{"type":"recompiling"}"#);
    assert_eq!(
      ReloadMessage::Reload { file: "pages/about.jsx".into() }.to_json(),
      r#"{"type":"reload","file":"pages/about.jsx"}"#
    );
    assert_eq!(
      ReloadMessage::Error { message: "boom".into() }.to_json(),
      r#"{"type":"error","message":"boom"}"#
    );
  }

  #[tokio::test]
  async fn subscribers_receive_in_order() {
    let hub = ReloadHub::default();
    assert_eq!(hub.send(ReloadMessage::Recompiling), 0);

    let mut rx = hub.subscribe();
    assert_eq!(hub.client_count(), 1);
    hub.send(ReloadMessage::Recompiling);
    hub.send(ReloadMessage::Reload { file: "a.jsx".into() });
    assert_eq!(rx.recv().await.unwrap(), ReloadMessage::Recompiling);
    assert_eq!(rx.recv().await.unwrap(), ReloadMessage::Reload { file: "a.jsx".into() });
  }
}
