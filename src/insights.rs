//! Narrative insights for a dashboard page.
//!
//! The page view is summarised into a plain-text prompt and sent to an
//! OpenAI-compatible chat completion endpoint. Insights are optional; the
//! dashboard works without an endpoint configured.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::InsightsConfig;
use crate::dashboard::PageView;
use crate::sources::SourcePayload;

const SYSTEM_PROMPT: &str = "You are a marketing analyst. Given dashboard figures for a \
date range, write a short summary of performance, call out notable changes versus the \
previous period and differences between markets, and suggest up to three actions. \
Use plain prose and keep currency values as given.";

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("insight request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("insight endpoint returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("insight response had no completion text")]
    EmptyCompletion,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Insight {
    pub model: String,
    pub text: String,
}

pub struct InsightClient {
    client: Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

impl InsightClient {
    pub fn new(config: &InsightsConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("marketlens/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub async fn generate(&self, view: &PageView) -> Result<Insight, InsightError> {
        let prompt = build_prompt(view);
        debug!("Requesting insights for {} page ({} chars)", view.page, prompt.len());

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
        };

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!("Insight endpoint returned {}", status);
            return Err(InsightError::Status { status, body });
        }

        let parsed: ChatResponse = response.json().await?;
        let text = completion_text(parsed).ok_or(InsightError::EmptyCompletion)?;

        Ok(Insight {
            model: self.model.clone(),
            text,
        })
    }
}

fn completion_text(response: ChatResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Plain-text summary of a page view, one fact per line
pub fn build_prompt(view: &PageView) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Dashboard page: {}", view.page);
    if let Some(range) = &view.range {
        let _ = writeln!(
            out,
            "Date range: {} to {} ({} days)",
            range.start_str(),
            range.end_str(),
            range.days()
        );
    }
    let _ = writeln!(out, "Market filter: {}", view.market.as_str());

    if view.totals.spend > 0.0 || view.totals.impressions > 0.0 {
        let t = &view.totals;
        let _ = writeln!(
            out,
            "Totals: spend {:.2}, clicks {:.0}, impressions {:.0}, conversions {:.0}, \
             CPC {:.2}, CTR {:.2}%, cost per conversion {:.2}",
            t.spend, t.clicks, t.impressions, t.conversions, t.cpc, t.ctr, t.cost_per_conversion
        );
    }

    if view.markets.iter().any(|m| m.campaigns > 0) {
        out.push_str("By market:\n");
        for bucket in view.markets.iter().filter(|m| m.campaigns > 0) {
            let name = bucket.market.map_or("Unclassified", |m| m.display_name());
            let _ = writeln!(
                out,
                "- {}: {} campaigns, spend {:.2}, clicks {:.0}, conversions {:.0}",
                name,
                bucket.campaigns,
                bucket.metrics.spend,
                bucket.metrics.clicks,
                bucket.metrics.conversions
            );
        }
    }

    if !view.comparisons.is_empty() {
        match &view.previous_range {
            Some(prev) => {
                let _ = writeln!(
                    out,
                    "Versus previous period ({} to {}):",
                    prev.start_str(),
                    prev.end_str()
                );
            }
            None => out.push_str("Versus previous period:\n"),
        }
        for c in &view.comparisons {
            match &c.change {
                Some(change) => {
                    let _ = writeln!(
                        out,
                        "- {}: {:.2} ({:+.1}%)",
                        c.metric, c.current, change.percent_change
                    );
                }
                None => {
                    let _ = writeln!(out, "- {}: {:.2} (no comparison)", c.metric, c.current);
                }
            }
        }
    }

    let mut top: Vec<_> = view.campaigns.iter().filter(|c| c.metrics.spend > 0.0).collect();
    top.sort_by(|a, b| b.metrics.spend.total_cmp(&a.metrics.spend));
    if !top.is_empty() {
        out.push_str("Top campaigns by spend:\n");
        for c in top.into_iter().take(5) {
            let _ = writeln!(
                out,
                "- {} ({}): spend {:.2}, conversions {:.0}",
                c.name, c.source, c.metrics.spend, c.metrics.conversions
            );
        }
    }

    for payload in &view.sources {
        if let SourcePayload::Email(report) = payload {
            out.push_str("Email campaigns:\n");
            for c in &report.campaigns {
                let _ = writeln!(
                    out,
                    "- {}: {:.0} sent, open rate {:.1}%, click rate {:.1}%, revenue {:.2}",
                    c.name,
                    c.sent,
                    c.open_rate(),
                    c.click_rate(),
                    c.revenue
                );
            }
        }
    }

    if !view.placeholder_sources.is_empty() {
        let names: Vec<&str> = view
            .placeholder_sources
            .iter()
            .map(|k| k.display_name())
            .collect();
        let _ = writeln!(
            out,
            "Note: figures for {} are sample data, not live.",
            names.join(", ")
        );
    }

    out
}
