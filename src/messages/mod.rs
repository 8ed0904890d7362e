//! Request/response protocol between the host surfaces and the core.

use std::collections::BTreeSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::{
    drift::DriftStatus,
    models::{Category, ContentClassification, FocusState},
    policy::CompileReport,
    session::{FocusController, FocusStatus, NavigationDecision},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Request {
    GetStatus,
    StartSession {
        allowed: Vec<String>,
        #[serde(default)]
        duration_minutes: Option<f64>,
    },
    EndSession {
        #[serde(default)]
        save_workspace: Option<String>,
    },
    IsBlocked {
        #[serde(default)]
        category: Option<String>,
    },
    ClassifyDomain {
        domain: String,
    },
    RecordOverride {
        domain: String,
        category: String,
    },
    GetTimeLeft,
    GetDriftStatus,
    Navigation {
        tab_id: u32,
        url: String,
    },
    ContentClassified {
        tab_id: u32,
        url: String,
        classification: ContentClassification,
    },
    TabClosed {
        tab_id: u32,
    },
    Recompile,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Response {
    Status(FocusStatus),
    SessionStarted { state: FocusState },
    SessionEnded,
    Blocked { blocked: bool },
    Classification { category: Option<Category> },
    OverrideRecorded,
    TimeLeft { seconds: u64 },
    Drift(DriftStatus),
    Navigation(NavigationDecision),
    Ack,
    Compiled(CompileReport),
    Error { message: String },
}

fn parse_categories(names: &[String]) -> Result<BTreeSet<Category>> {
    names
        .iter()
        .map(|name| name.parse::<Category>().map_err(Into::into))
        .collect()
}

/// Runs one request. Failures come back as `Response::Error`.
pub async fn dispatch(core: &FocusController, request: Request) -> Response {
    match handle(core, request).await {
        Ok(response) => response,
        Err(err) => Response::Error {
            message: format!("{err:#}"),
        },
    }
}

async fn handle(core: &FocusController, request: Request) -> Result<Response> {
    let response = match request {
        Request::GetStatus => Response::Status(core.status().await),
        Request::StartSession {
            allowed,
            duration_minutes,
        } => {
            let allowed = parse_categories(&allowed)?;
            let state = core.start(allowed, duration_minutes).await?;
            Response::SessionStarted { state }
        }
        Request::EndSession { save_workspace } => {
            core.end(save_workspace).await?;
            Response::SessionEnded
        }
        Request::IsBlocked { category } => {
            let category = category.as_deref().map(str::parse::<Category>).transpose()?;
            Response::Blocked {
                blocked: core.is_blocked(category).await,
            }
        }
        Request::ClassifyDomain { domain } => Response::Classification {
            category: core.classify_domain(&domain).await,
        },
        Request::RecordOverride { domain, category } => {
            core.record_override(&domain, category.parse()?).await?;
            Response::OverrideRecorded
        }
        Request::GetTimeLeft => Response::TimeLeft {
            seconds: core.time_left_secs().await,
        },
        Request::GetDriftStatus => Response::Drift(core.drift_status().await),
        Request::Navigation { tab_id, url } => {
            Response::Navigation(core.on_navigation(tab_id, &url).await)
        }
        Request::ContentClassified {
            tab_id,
            url,
            classification,
        } => Response::Navigation(
            core.on_content_classified(tab_id, &url, classification)
                .await?,
        ),
        Request::TabClosed { tab_id } => {
            core.tab_closed(tab_id).await;
            Response::Ack
        }
        Request::Recompile => Response::Compiled(core.recompile().await?),
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn requests_parse_from_camel_case_json() {
        let request: Request = serde_json::from_value(json!({
            "type": "startSession",
            "allowed": ["Work", "development"],
            "durationMinutes": 25
        }))
        .unwrap();
        assert_eq!(
            request,
            Request::StartSession {
                allowed: vec!["Work".into(), "development".into()],
                duration_minutes: Some(25.0),
            }
        );

        let request: Request =
            serde_json::from_value(json!({"type": "navigation", "tabId": 3, "url": "https://x.com"}))
                .unwrap();
        assert!(matches!(request, Request::Navigation { tab_id: 3, .. }));
    }

    #[test]
    fn optional_fields_may_be_omitted() {
        let request: Request = serde_json::from_value(json!({"type": "endSession"})).unwrap();
        assert_eq!(request, Request::EndSession { save_workspace: None });
        let request: Request = serde_json::from_value(json!({"type": "isBlocked"})).unwrap();
        assert_eq!(request, Request::IsBlocked { category: None });
    }

    #[test]
    fn unknown_category_is_rejected_at_the_boundary() {
        let err = parse_categories(&["Work".into(), "Gaming".into()]).unwrap_err();
        assert!(err.to_string().contains("Gaming"));
        assert_eq!(
            parse_categories(&["news".into()]).unwrap(),
            BTreeSet::from([Category::News])
        );
    }

    #[test]
    fn responses_carry_type_tag() {
        let json = serde_json::to_value(Response::TimeLeft { seconds: 42 }).unwrap();
        assert_eq!(json, json!({"type": "timeLeft", "seconds": 42}));
        let json = serde_json::to_value(Response::Error {
            message: "nope".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "error");
    }
}
