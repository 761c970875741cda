//! Webhook pipeline: authenticate, parse, normalise, resolve, invalidate.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde_json::Value;
use tracing::{info, warn};

use crate::application::auth::WebhookAuthenticator;
use crate::application::error::AppError;
use crate::application::tags::{Resolution, TagResolver};
use crate::cache::{CacheInvalidator, CacheTag};
use crate::domain::notification::normalize;

pub(crate) const METRIC_REQUESTS: &str = "geographer_revalidate_requests_total";
pub(crate) const METRIC_RESOLVE_MS: &str = "geographer_revalidate_resolve_ms";

/// Raw inputs of one webhook delivery.
#[derive(Debug, Clone, Copy)]
pub struct WebhookDelivery<'a> {
    /// Secret presented by the sender, already extracted from the request.
    pub secret: &'a str,
    pub body: &'a [u8],
}

/// Terminal non-error outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevalidationOutcome {
    /// Every listed tag was submitted for invalidation.
    Revalidated { tags: Vec<CacheTag> },
    /// Nothing to do for this type.
    Unhandled { document_type: String },
}

impl RevalidationOutcome {
    fn label(&self) -> &'static str {
        match self {
            RevalidationOutcome::Revalidated { .. } => "revalidated",
            RevalidationOutcome::Unhandled { .. } => "unhandled",
        }
    }
}

#[derive(Clone)]
pub struct RevalidationService {
    authenticator: WebhookAuthenticator,
    resolver: TagResolver,
    invalidator: Arc<dyn CacheInvalidator>,
}

impl RevalidationService {
    pub fn new(
        authenticator: WebhookAuthenticator,
        resolver: TagResolver,
        invalidator: Arc<dyn CacheInvalidator>,
    ) -> Self {
        Self {
            authenticator,
            resolver,
            invalidator,
        }
    }

    /// Run one delivery through the pipeline.
    ///
    /// Tags are only invalidated once resolution has fully succeeded.
    pub async fn handle(
        &self,
        delivery: WebhookDelivery<'_>,
    ) -> Result<RevalidationOutcome, AppError> {
        let result = self.run(delivery).await;
        let outcome = match &result {
            Ok(outcome) => outcome.label(),
            Err(err) => error_label(err),
        };
        counter!(METRIC_REQUESTS, "outcome" => outcome).increment(1);
        result
    }

    async fn run(&self, delivery: WebhookDelivery<'_>) -> Result<RevalidationOutcome, AppError> {
        self.authenticator.verify(delivery.secret)?;

        let payload: Value = serde_json::from_slice(delivery.body).map_err(AppError::invalid_json)?;
        let notification = normalize(&payload)?;
        info!(
            target = "geographer::revalidate",
            document_type = %notification.document_type,
            document_id = notification.document_id.as_deref().unwrap_or(""),
            slug = notification.slug.as_deref().unwrap_or(""),
            slug_changed = notification.slug_changed(),
            "Processing change notification"
        );

        let started = Instant::now();
        let resolution = self.resolver.resolve(&notification).await;
        histogram!(METRIC_RESOLVE_MS).record(started.elapsed().as_secs_f64() * 1000.0);

        let tags = match resolution? {
            Resolution::Tags(tags) => tags,
            Resolution::Unhandled(document_type) => {
                warn!(
                    target = "geographer::revalidate",
                    document_type = %document_type,
                    "Ignoring unhandled document type"
                );
                return Ok(RevalidationOutcome::Unhandled { document_type });
            }
        };

        let report = self.invalidator.invalidate(&tags);
        info!(
            target = "geographer::revalidate",
            tags = ?report.tags,
            evicted_entries = report.evicted_entries,
            "Revalidated tags"
        );

        Ok(RevalidationOutcome::Revalidated { tags: report.tags })
    }
}

fn error_label(error: &AppError) -> &'static str {
    match error {
        AppError::Misconfigured => "misconfigured",
        AppError::Unauthorized => "unauthorized",
        AppError::InvalidJson(_) | AppError::Domain(_) => "malformed",
        AppError::UpstreamQuery(_) => "upstream_error",
        AppError::Infra(_) | AppError::Unexpected(_) => "error",
    }
}
