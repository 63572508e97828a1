//! WebSocket live reload.

use pipewright_static::{ReloadEvent, ReloadNotifier};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Path the client script connects to.
pub const LIVERELOAD_PATH: &str = "/__livereload";

/// Messages pushed to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveReloadMessage {
    /// Connection established
    Connected,

    /// Full page reload
    Reload,

    /// Re-fetch these stylesheets in place
    InjectCss {
        /// URL paths under the destination root
        paths: Vec<String>,
    },
}

impl From<ReloadEvent> for LiveReloadMessage {
    fn from(event: ReloadEvent) -> Self {
        match event {
            ReloadEvent::Full => LiveReloadMessage::Reload,
            ReloadEvent::InjectCss(paths) => LiveReloadMessage::InjectCss { paths },
        }
    }
}

/// Broadcasts reload messages to every connected browser.
#[derive(Debug, Clone)]
pub struct LiveReloadHub {
    sender: broadcast::Sender<LiveReloadMessage>,
}

impl LiveReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    pub fn send(&self, msg: LiveReloadMessage) {
        // No receivers just means no browser is open.
        let _ = self.sender.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveReloadMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for LiveReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadNotifier for LiveReloadHub {
    fn notify(&self, event: ReloadEvent) {
        let msg = LiveReloadMessage::from(event);
        tracing::debug!("Live reload to {} client(s): {:?}", self.subscriber_count(), msg);
        self.send(msg);
    }
}

/// Client-side script injected into served HTML pages.
///
/// The socket URL is derived from `location`, so the page works behind any
/// host name the server is reached by.
pub fn livereload_client_script() -> String {
    format!(
        r#"<script>
(function() {{
  'use strict';

  var url = (location.protocol === 'https:' ? 'wss://' : 'ws://') + location.host + '{}';
  var ws = new WebSocket(url);

  function injectCss(paths) {{
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    var matched = false;
    links.forEach(function(link) {{
      var href = link.getAttribute('href');
      if (!href) return;
      var clean = new URL(href, location.href).pathname;
      if (paths.indexOf(clean) !== -1) {{
        link.href = clean + '?livereload=' + Date.now();
        matched = true;
      }}
    }});
    if (!matched) location.reload();
  }}

  ws.onmessage = function(event) {{
    var msg = JSON.parse(event.data);
    switch (msg.type) {{
      case 'reload':
        location.reload();
        break;
      case 'inject_css':
        injectCss(msg.paths);
        break;
      case 'connected':
        console.log('[livereload] connected');
        break;
    }}
  }};

  ws.onclose = function() {{
    setTimeout(function() {{ location.reload(); }}, 1000);
  }};
}})();
</script>"#,
        LIVERELOAD_PATH
    )
}

/// Insert the client script before the last `</body>`, or append it when
/// the page has no body tag.
pub fn inject_script(html: &str) -> String {
    let script = livereload_client_script();
    match html.rfind("</body>") {
        Some(index) => {
            let mut out = String::with_capacity(html.len() + script.len());
            out.push_str(&html[..index]);
            out.push_str(&script);
            out.push_str(&html[index..]);
            out
        }
        None => format!("{}{}", html, script),
    }
}
