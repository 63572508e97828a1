//! The seam between finished stages and the live-reload server.

use crate::paths::AssetKind;

/// What browsers should do after a stage finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadEvent {
    /// Reload the whole page.
    Full,
    /// Re-fetch the given stylesheets (URL paths) without reloading.
    InjectCss(Vec<String>),
}

impl ReloadEvent {
    /// The event a successful stage of `kind` sends, if any.
    ///
    /// `urls` are the written files as URL paths under the destination root.
    pub fn for_stage(kind: AssetKind, urls: Vec<String>) -> Option<Self> {
        match kind {
            AssetKind::Html | AssetKind::Js => Some(ReloadEvent::Full),
            AssetKind::Styles => Some(ReloadEvent::InjectCss(urls)),
            AssetKind::ImageSvg | AssetKind::ImageRaster | AssetKind::Fonts => None,
        }
    }
}

/// Receives reload events from the pipeline.
pub trait ReloadNotifier: Send + Sync {
    fn notify(&self, event: ReloadEvent);
}

/// Discards every event; used when no server is running.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl ReloadNotifier for NoopNotifier {
    fn notify(&self, event: ReloadEvent) {
        tracing::trace!("No reload listener for {:?}", event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_page_assets_trigger_reloads() {
        assert_eq!(ReloadEvent::for_stage(AssetKind::Html, vec![]), Some(ReloadEvent::Full));
        assert_eq!(ReloadEvent::for_stage(AssetKind::Js, vec![]), Some(ReloadEvent::Full));
        assert_eq!(
            ReloadEvent::for_stage(AssetKind::Styles, vec!["/assets/styles/main.css".into()]),
            Some(ReloadEvent::InjectCss(vec!["/assets/styles/main.css".into()]))
        );
        assert_eq!(ReloadEvent::for_stage(AssetKind::ImageSvg, vec![]), None);
        assert_eq!(ReloadEvent::for_stage(AssetKind::Fonts, vec![]), None);
    }
}
