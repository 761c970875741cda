use axum::{
    Json,
    body::Bytes,
    extract::{RawQuery, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use geographer_api_types::RevalidationResponse;

use crate::application::auth::provided_secret;
use crate::application::revalidate::{RevalidationOutcome, WebhookDelivery};

use super::WebhookState;

/// `POST /api/revalidate`
///
/// The body is taken as raw bytes so that authentication always runs
/// before any attempt to parse it.
pub(super) async fn revalidate(
    State(state): State<WebhookState>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let query_secret = query.as_deref().and_then(secret_from_query);
    let secret = provided_secret(authorization, query_secret.as_deref());

    let delivery = WebhookDelivery {
        secret: &secret,
        body: &body,
    };

    match state.revalidation.handle(delivery).await {
        Ok(RevalidationOutcome::Revalidated { tags }) => {
            let tags = tags.into_iter().map(|tag| tag.into_string()).collect();
            (StatusCode::OK, Json(RevalidationResponse::success(tags))).into_response()
        }
        Ok(RevalidationOutcome::Unhandled { document_type }) => (
            StatusCode::ACCEPTED,
            Json(RevalidationResponse::rejected(format!(
                "Unhandled Sanity type \"{document_type}\"."
            ))),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

fn secret_from_query(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "secret")
        .map(|(_, value)| value.into_owned())
}
