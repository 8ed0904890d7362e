//! Side effects returned as data for the host adapter to carry out.

use log::debug;
use serde::Serialize;
use tokio::sync::mpsc;
use url::form_urlencoded;

use crate::models::Category;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Effect {
    ShowNotification { title: String, message: String },
    SetIndicator { text: String },
    ClearIndicator,
    RedirectNow { tab_id: u32, url: String },
    DriftWarning { level: u32, switches: usize },
    SaveWorkspace { name: String },
    ReleaseParkedLinks,
}

/// Fire-and-forget effect channel. A closed receiver never fails the caller.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<Effect>,
}

impl Outbox {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Effect>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, effect: Effect) {
        if let Err(err) = self.tx.send(effect) {
            debug!("dropping effect, adapter gone: {:?}", err.0);
        }
    }
}

/// Decision page address carrying the original URL and its category.
pub fn intercept_url(intercept_path: &str, original_url: &str, category: Category) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("url", original_url)
        .append_pair("context", category.as_str())
        .finish();
    format!("{intercept_path}?{query}")
}
