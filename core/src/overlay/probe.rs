// Probe fetching and evaluation
//
// Fetch failures never escape a tick: every outcome becomes a display state
// plus an optional annotation.

use super::path::{lookup, lookup_present};
use crate::config::AppConfig;
use crate::diagram::{DataGridItem, StatusProbe};
use crate::{FlowboardError, Result};
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const NOT_AVAILABLE: &str = "N/A";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProbeError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("{0}")]
    Network(String),

    #[error("Invalid response body: {0}")]
    Decode(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Up,
    Down,
    Unknown,
}

/// Fetches a probe target's JSON body through the metrics proxy
#[async_trait]
pub trait ProbeFetcher: Send + Sync {
    async fn fetch(&self, target_url: &str, node: &str) -> std::result::Result<Value, ProbeError>;
}

/// `GET {base}/metrics?url={target}&node={name}`
pub struct HttpProbeFetcher {
    http: Client,
    config: AppConfig,
}

impl HttpProbeFetcher {
    pub fn new(config: AppConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.api.request_timeout_ms))
            .build()
            .map_err(|e| FlowboardError::Http(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl ProbeFetcher for HttpProbeFetcher {
    async fn fetch(&self, target_url: &str, node: &str) -> std::result::Result<Value, ProbeError> {
        let url = self.config.build_metrics_url(target_url, Some(node));
        debug!(target: "overlay", node = %node, url = %url, "Probing");

        let response = self
            .http
            .get(&url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| ProbeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<Value>().await {
                Ok(body) => body
                    .get("error")
                    .and_then(Value::as_str)
                    .unwrap_or("Service error")
                    .to_string(),
                Err(_) => "Unknown error".to_string(),
            };
            warn!(target: "overlay", node = %node, status = %status, "Probe target returned error");
            return Err(ProbeError::Http {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ProbeError::Decode(e.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StatusOutcome {
    pub state: StatusState,
    pub annotation: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MetricOutcome {
    pub display: String,
    /// Set when the display is a fallback rather than a real reading
    pub annotation: Option<String>,
}

/// Map a status fetch onto up/down/unknown.
///
/// `mock` turns failed fetches into `up` and must stay off outside development.
pub fn evaluate_status(
    probe: &StatusProbe,
    fetched: std::result::Result<Value, ProbeError>,
    mock: bool,
) -> StatusOutcome {
    match fetched {
        Ok(body) => match lookup(&body, &probe.value_field) {
            Some(v) if *v == probe.up_value => StatusOutcome {
                state: StatusState::Up,
                annotation: None,
            },
            Some(v) if *v == probe.down_value => StatusOutcome {
                state: StatusState::Down,
                annotation: None,
            },
            other => StatusOutcome {
                state: StatusState::Unknown,
                annotation: Some(format!("Unexpected value: {}", describe(other))),
            },
        },
        Err(ProbeError::Http { .. }) if mock => StatusOutcome {
            state: StatusState::Up,
            annotation: Some("Mocked (dev mode)".to_string()),
        },
        Err(_) if mock => StatusOutcome {
            state: StatusState::Up,
            annotation: Some("Mocked (network error)".to_string()),
        },
        Err(e) => StatusOutcome {
            state: StatusState::Unknown,
            annotation: Some(e.to_string()),
        },
    }
}

/// Format a metric fetch for display; `"N/A"` on any failure
pub fn evaluate_metric(
    item: &DataGridItem,
    fetched: std::result::Result<Value, ProbeError>,
    mock: bool,
) -> MetricOutcome {
    match fetched {
        Ok(body) => match lookup_present(&body, &item.value_field) {
            Some(v) => MetricOutcome {
                display: format_metric_value(v),
                annotation: None,
            },
            None => MetricOutcome {
                display: NOT_AVAILABLE.to_string(),
                annotation: Some(format!("Field '{}' not found", item.value_field)),
            },
        },
        Err(e @ ProbeError::Http { .. }) => MetricOutcome {
            display: NOT_AVAILABLE.to_string(),
            annotation: Some(e.to_string()),
        },
        Err(_) if mock => {
            let placeholder: u32 = rand::thread_rng().gen_range(0..1000);
            MetricOutcome {
                display: format_number(placeholder as f64),
                annotation: Some("Mocked (network error)".to_string()),
            }
        }
        Err(e) => MetricOutcome {
            display: NOT_AVAILABLE.to_string(),
            annotation: Some(e.to_string()),
        },
    }
}

/// Numbers get thousands separators, strings are shown raw
pub fn format_metric_value(value: &Value) -> String {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                group_integer(i.unsigned_abs().to_string(), i < 0)
            } else if let Some(u) = n.as_u64() {
                group_integer(u.to_string(), false)
            } else {
                format_number(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Null => NOT_AVAILABLE.to_string(),
        other => other.to_string(),
    }
}

/// en-US grouping with at most three fraction digits
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "∞" } else { "-∞" }.to_string();
    }

    let fixed = format!("{:.3}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac = frac_part.trim_end_matches('0');
    let negative = value < 0.0 && (int_part != "0" || !frac.is_empty());

    let mut out = group_integer(int_part.to_string(), negative);
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    out
}

fn group_integer(digits: String, negative: bool) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if negative {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

fn describe(value: Option<&Value>) -> String {
    match value {
        None => "missing".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
