//! Newline-delimited JSON adapter between the core and the browser host.
//!
//! Inbound lines are `Request`s. Outbound lines are either a bare
//! `Response`, an `{"effect": …}` frame, or an `{"updateRules": …}` frame.

use std::collections::{BTreeSet, HashSet};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::{mpsc, Mutex},
};
use tokio_util::sync::CancellationToken;

use crate::{
    effects::Effect,
    messages::{dispatch, Request, Response},
    policy::{BlockRule, EnforcementEngine},
    session::FocusController,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleUpdate {
    pub remove_rule_ids: Vec<u32>,
    pub add_rules: Vec<BlockRule>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum OutboundFrame {
    Response(Response),
    Effect { effect: Effect },
    UpdateRules { update_rules: RuleUpdate },
}

#[derive(Debug, Clone)]
pub struct HostOutput {
    tx: mpsc::UnboundedSender<OutboundFrame>,
}

impl HostOutput {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, frame: OutboundFrame) -> Result<()> {
        self.tx
            .send(frame)
            .map_err(|_| anyhow::anyhow!("host output closed"))
    }
}

/// Rule table owned by the host. Installs are forwarded as update frames and
/// the installed id set is tracked locally.
pub struct HostBridge {
    output: HostOutput,
    installed: Mutex<BTreeSet<u32>>,
    max_rules: usize,
}

impl HostBridge {
    pub fn new(output: HostOutput, max_rules: usize) -> Self {
        Self {
            output,
            installed: Mutex::new(BTreeSet::new()),
            max_rules,
        }
    }
}

#[async_trait]
impl EnforcementEngine for HostBridge {
    fn max_rules(&self) -> usize {
        self.max_rules
    }

    async fn installed_rule_ids(&self) -> Result<Vec<u32>> {
        Ok(self.installed.lock().await.iter().copied().collect())
    }

    async fn update_rules(&self, remove_rule_ids: Vec<u32>, add_rules: Vec<BlockRule>) -> Result<()> {
        let mut installed = self.installed.lock().await;
        let mut next = installed.clone();
        for id in &remove_rule_ids {
            next.remove(id);
        }

        let mut seen = HashSet::new();
        for rule in &add_rules {
            if !seen.insert(rule.id) || !next.insert(rule.id) {
                bail!("duplicate rule id {}", rule.id);
            }
        }
        if next.len() > self.max_rules {
            bail!(
                "rule count {} exceeds host maximum {}",
                next.len(),
                self.max_rules
            );
        }

        self.output
            .send(OutboundFrame::UpdateRules {
                update_rules: RuleUpdate {
                    remove_rule_ids,
                    add_rules,
                },
            })
            .context("failed to forward rule update")?;
        *installed = next;
        Ok(())
    }
}

async fn write_frame<W: AsyncWrite + Unpin>(output: &mut W, frame: &OutboundFrame) -> Result<()> {
    let mut line = serde_json::to_string(frame).context("failed to encode frame")?;
    line.push('\n');
    output.write_all(line.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}

/// Writes frames and effects until shutdown, then drains what is queued.
pub async fn write_frames<W: AsyncWrite + Unpin>(
    mut output: W,
    mut frames: mpsc::UnboundedReceiver<OutboundFrame>,
    mut effects: mpsc::UnboundedReceiver<Effect>,
    shutdown: CancellationToken,
) -> Result<()> {
    loop {
        let frame = tokio::select! {
            biased;
            Some(frame) = frames.recv() => frame,
            Some(effect) = effects.recv() => OutboundFrame::Effect { effect },
            _ = shutdown.cancelled() => break,
            else => break,
        };
        write_frame(&mut output, &frame).await?;
    }

    while let Ok(frame) = frames.try_recv() {
        write_frame(&mut output, &frame).await?;
    }
    while let Ok(effect) = effects.try_recv() {
        write_frame(&mut output, &OutboundFrame::Effect { effect }).await?;
    }
    Ok(())
}

/// Answers requests one line at a time until EOF or shutdown.
pub async fn read_requests<R: AsyncBufRead + Unpin>(
    core: &FocusController,
    input: R,
    output: &HostOutput,
    shutdown: &CancellationToken,
) -> Result<()> {
    let mut lines = input.lines();
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line.context("failed to read request line")?,
        };
        let Some(line) = line else {
            log_info!("host closed input; stopping");
            break;
        };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(trimmed) {
            Ok(request) => dispatch(core, request).await,
            Err(err) => {
                log_warn!("rejected malformed request: {err}");
                Response::Error {
                    message: format!("invalid request: {err}"),
                }
            }
        };
        if let Response::Error { message } = &response {
            log_error!("request failed: {message}");
        }
        output.send(OutboundFrame::Response(response))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        models::Category,
        policy::{domain_pattern, HostCoverage},
    };

    fn rule(id: u32) -> BlockRule {
        BlockRule::redirecting(
            id,
            1,
            Category::Social,
            vec!["x.com".to_string()],
            HostCoverage::WithSubdomains,
            "/intercept.html",
        )
    }

    #[tokio::test]
    async fn bridge_forwards_updates_and_tracks_ids() {
        let (output, mut rx) = HostOutput::channel();
        let bridge = HostBridge::new(output, 10);

        bridge.update_rules(vec![], vec![rule(1), rule(2)]).await.unwrap();
        bridge.update_rules(vec![1, 2], vec![rule(3)]).await.unwrap();
        assert_eq!(bridge.installed_rule_ids().await.unwrap(), vec![3]);

        let first = rx.recv().await.unwrap();
        let json = serde_json::to_value(&first).unwrap();
        assert_eq!(json["updateRules"]["removeRuleIds"], json!([]));
        assert_eq!(json["updateRules"]["addRules"][0]["id"], 1);
        assert_eq!(
            json["updateRules"]["addRules"][0]["condition"]["regexFilter"],
            domain_pattern(&["x.com".to_string()], HostCoverage::WithSubdomains)
        );
    }

    #[tokio::test]
    async fn bridge_rejects_over_capacity_without_forwarding() {
        let (output, mut rx) = HostOutput::channel();
        let bridge = HostBridge::new(output, 1);

        assert!(bridge.update_rules(vec![], vec![rule(1), rule(2)]).await.is_err());
        assert!(bridge.update_rules(vec![], vec![rule(4), rule(4)]).await.is_err());
        assert!(bridge.installed_rule_ids().await.unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn effect_frames_are_wrapped() {
        let json = serde_json::to_value(OutboundFrame::Effect {
            effect: Effect::ClearIndicator,
        })
        .unwrap();
        assert_eq!(json, json!({"effect": {"type": "clearIndicator"}}));
    }
}
