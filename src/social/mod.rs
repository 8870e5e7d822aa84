//! Outbound social posts
//!
//! Composition lives in `daily`, `transactions` and `news`; delivery goes
//! through a [`Poster`]. Idempotency markers are objects under `tweets/` in
//! the store and are only written after a live post succeeds.

pub mod daily;
pub mod news;
pub mod transactions;

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde_json::json;
use tracing::{info, warn};

use crate::cli::types::{home_date, PostKind};
use crate::config::{SocialConfig, SOCIAL_WEBHOOK_ENV_VAR};
use crate::pipeline::RunContext;
use crate::store::BlobStore;
use crate::{DataError, Result};

pub const MARKER_SUBJECT: &str = "tweets";

/// Something that can publish a text post.
#[allow(async_fn_in_trait)]
pub trait Poster {
    /// Whether posts actually leave the process. Markers are only touched
    /// by live posters.
    fn is_live(&self) -> bool;

    async fn post(&self, text: &str) -> Result<()>;
}

/// POSTs `{"text": ...}` to a webhook with an optional bearer token.
#[derive(Debug, Clone)]
pub struct WebhookPoster {
    client: Client,
    url: String,
    token: Option<String>,
}

impl WebhookPoster {
    pub fn new(client: Client, config: &SocialConfig) -> Self {
        Self {
            client,
            url: config.webhook_url.clone(),
            token: config.token.clone(),
        }
    }
}

impl Poster for WebhookPoster {
    fn is_live(&self) -> bool {
        true
    }

    async fn post(&self, text: &str) -> Result<()> {
        let mut request = self.client.post(&self.url).json(&json!({ "text": text }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DataError::Post {
                message: format!("webhook answered {}: {}", status, body.trim()),
            });
        }
        Ok(())
    }
}

/// Prints what would be posted.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunPoster;

impl Poster for DryRunPoster {
    fn is_live(&self) -> bool {
        false
    }

    async fn post(&self, text: &str) -> Result<()> {
        println!("--- dry run, not posted ---\n{}\n", text);
        Ok(())
    }
}

/// The poster chosen on the command line.
#[derive(Debug, Clone)]
pub enum AnyPoster {
    Webhook(WebhookPoster),
    DryRun(DryRunPoster),
}

impl AnyPoster {
    /// A webhook poster when `live`, else a dry run. Going live without a
    /// configured webhook is an error.
    pub fn select(live: bool, social: Option<&SocialConfig>, client: Client) -> Result<Self> {
        if !live {
            return Ok(AnyPoster::DryRun(DryRunPoster));
        }
        match social {
            Some(config) => Ok(AnyPoster::Webhook(WebhookPoster::new(client, config))),
            None => Err(DataError::MissingEnv {
                var: SOCIAL_WEBHOOK_ENV_VAR.to_string(),
            }),
        }
    }
}

impl Poster for AnyPoster {
    fn is_live(&self) -> bool {
        match self {
            AnyPoster::Webhook(p) => p.is_live(),
            AnyPoster::DryRun(p) => p.is_live(),
        }
    }

    async fn post(&self, text: &str) -> Result<()> {
        match self {
            AnyPoster::Webhook(p) => p.post(text).await,
            AnyPoster::DryRun(p) => p.post(text).await,
        }
    }
}

/// What one `post` invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostReport {
    pub kind: PostKind,
    /// Every text composed, whether or not it was sent.
    pub composed: Vec<String>,
    /// Texts accepted by a live poster.
    pub posted: usize,
    /// Why nothing was composed, when that is the case.
    pub skipped: Option<String>,
}

impl PostReport {
    pub fn skipped(kind: PostKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            composed: Vec::new(),
            posted: 0,
            skipped: Some(reason.into()),
        }
    }

    pub fn summary(&self) -> String {
        match &self.skipped {
            Some(reason) => format!("skipped: {}", reason),
            None => format!("{} composed, {} posted", self.composed.len(), self.posted),
        }
    }
}

/// Compose and send one kind of post as of `now`.
pub async fn run_post<P: Poster>(
    ctx: &RunContext<'_>,
    kind: PostKind,
    poster: &P,
    force: bool,
    now: DateTime<Utc>,
) -> Result<PostReport> {
    info!(kind = %kind, live = poster.is_live(), "composing post");
    match kind {
        PostKind::Summary | PostKind::Batting | PostKind::Pitching => {
            daily::post_daily(ctx, kind, poster, home_date(now)).await
        }
        PostKind::Transactions => transactions::post_transactions(ctx, poster, force, now).await,
        PostKind::News => news::post_news(ctx, poster).await,
    }
}

fn marker_key(ctx: &RunContext<'_>, file_name: &str) -> String {
    ctx.config.object_key(MARKER_SUBJECT, file_name)
}

fn last_post_file(kind: PostKind) -> String {
    format!("last_tweet_date_{}.txt", kind)
}

/// The home date of the last successful post of `kind`.
pub async fn last_post_date(ctx: &RunContext<'_>, kind: PostKind) -> Result<Option<NaiveDate>> {
    let key = marker_key(ctx, &last_post_file(kind));
    let Some(body) = ctx.store.get(&key).await? else {
        return Ok(None);
    };
    let text = String::from_utf8_lossy(&body);
    match NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d") {
        Ok(date) => Ok(Some(date)),
        Err(e) => {
            warn!(key = %key, error = %e, "unreadable post marker, ignoring it");
            Ok(None)
        }
    }
}

pub async fn record_post_date(ctx: &RunContext<'_>, kind: PostKind, date: NaiveDate) -> Result<()> {
    let key = marker_key(ctx, &last_post_file(kind));
    let body = Bytes::from(date.format("%Y-%m-%d").to_string());
    ctx.store.put(&key, body, "text/plain").await
}
