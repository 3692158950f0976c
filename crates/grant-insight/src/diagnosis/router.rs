use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tracing::{error, warn};

use super::answers::ValidationError;
use super::domain::{DiagnosisOutcome, DiagnosisRecord, Owner, SessionId};
use super::repository::{GrantRepository, HistoryRepository};
use super::security::{constant_time_eq, NonceGuard, DIAGNOSIS_NONCE_ACTION};
use super::service::{DiagnosisError, DiagnosisService};
use crate::config::DiagnosisConfig;
use crate::grants::GrantSummaryView;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const SESSION_ID_HEADER: &str = "x-session-id";
/// Carries the shared secret of the authenticating proxy that set `x-user-id`.
pub const PROXY_SECRET_HEADER: &str = "x-proxy-secret";

/// Shared state behind the diagnosis routes.
pub struct DiagnosisState<G, H> {
    pub service: Arc<DiagnosisService<G, H>>,
    pub guard: NonceGuard,
    pub identity: IdentityPolicy,
    /// Exposes storage error detail in failure envelopes.
    pub debug: bool,
}

/// Router builder exposing the diagnosis endpoints.
pub fn diagnosis_router<G, H>(
    service: Arc<DiagnosisService<G, H>>,
    guard: NonceGuard,
    identity: IdentityPolicy,
    debug: bool,
) -> Router
where
    G: GrantRepository + 'static,
    H: HistoryRepository + 'static,
{
    let state = Arc::new(DiagnosisState {
        service,
        guard,
        identity,
        debug,
    });

    Router::new()
        .route("/api/v1/diagnosis", post(diagnose_handler::<G, H>))
        .route("/api/v1/diagnosis/questions", get(questions_handler::<G, H>))
        .route("/api/v1/diagnosis/nonce", get(nonce_handler::<G, H>))
        .route("/api/v1/diagnosis/history", post(history_handler::<G, H>))
        .with_state(state)
}

/// Caller identity resolved from request headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Identity {
    pub owner: Owner,
    /// A session id was minted for this request and must be echoed back.
    pub issued_session: bool,
}

/// Decides which headers establish the caller's identity.
///
/// `x-user-id` is honoured only when the request also carries the configured proxy secret.
/// Everything else resolves to a session.
#[derive(Clone, Default)]
pub struct IdentityPolicy {
    proxy_secret: Option<String>,
}

impl fmt::Debug for IdentityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityPolicy")
            .field("trusts_proxy", &self.proxy_secret.is_some())
            .finish()
    }
}

impl IdentityPolicy {
    /// Ignores `x-user-id` entirely.
    pub fn sessions_only() -> Self {
        Self::default()
    }

    pub fn trusting_proxy(secret: impl Into<String>) -> Self {
        let secret = secret.into();
        Self {
            proxy_secret: (!secret.is_empty()).then_some(secret),
        }
    }

    pub fn from_config(config: &DiagnosisConfig) -> Self {
        match &config.trusted_proxy_secret {
            Some(secret) => Self::trusting_proxy(secret.clone()),
            None => Self::sessions_only(),
        }
    }

    pub(crate) fn resolve(&self, headers: &HeaderMap) -> Identity {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        if self.vouched(header(PROXY_SECRET_HEADER)) {
            if let Some(user_id) = header(USER_ID_HEADER).and_then(|raw| raw.parse::<u64>().ok())
            {
                return Identity {
                    owner: Owner::User(user_id),
                    issued_session: false,
                };
            }
        }

        match header(SESSION_ID_HEADER) {
            Some(session) => Identity {
                owner: Owner::Session(SessionId(session.to_string())),
                issued_session: false,
            },
            None => Identity {
                owner: Owner::Session(SessionId::generate()),
                issued_session: true,
            },
        }
    }

    fn vouched(&self, presented: Option<&str>) -> bool {
        match (&self.proxy_secret, presented) {
            (Some(expected), Some(presented)) => {
                constant_time_eq(expected.as_bytes(), presented.as_bytes())
            }
            _ => false,
        }
    }
}

pub(crate) async fn questions_handler<G, H>(
    State(state): State<Arc<DiagnosisState<G, H>>>,
) -> Response
where
    G: GrantRepository + 'static,
    H: HistoryRepository + 'static,
{
    success(StatusCode::OK, json!(state.service.catalog()))
}

pub(crate) async fn nonce_handler<G, H>(
    State(state): State<Arc<DiagnosisState<G, H>>>,
    headers: HeaderMap,
) -> Response
where
    G: GrantRepository + 'static,
    H: HistoryRepository + 'static,
{
    let identity = state.identity.resolve(&headers);
    let nonce = state.guard.issue(DIAGNOSIS_NONCE_ACTION, &identity.owner);

    let mut data = json!({ "nonce": nonce });
    if let Some(session) = identity.owner.session_id() {
        data["session_id"] = json!(session);
    }
    with_session(success(StatusCode::OK, data), &identity)
}

pub(crate) async fn diagnose_handler<G, H>(
    State(state): State<Arc<DiagnosisState<G, H>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    G: GrantRepository + 'static,
    H: HistoryRepository + 'static,
{
    let identity = state.identity.resolve(&headers);
    let body = parse_body(&body);

    if let Err(response) = check_nonce(&state.guard, &body, &identity) {
        return with_session(response, &identity);
    }

    let response = match answers_payload(&body)
        .map_err(DiagnosisError::from)
        .and_then(|answers| state.service.diagnose(&identity.owner, &answers))
    {
        Ok(outcome) => success(StatusCode::OK, outcome_view(&outcome, &identity.owner)),
        Err(DiagnosisError::Validation(error)) => {
            warn!(%error, "diagnosis rejected");
            failure(
                StatusCode::UNPROCESSABLE_ENTITY,
                &error.to_string(),
                Some(state.service.fallback_grants()),
                None,
            )
        }
        Err(DiagnosisError::Repository(error)) => {
            error!(%error, "diagnosis failed");
            let detail = state.debug.then(|| error.to_string());
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "診断処理中にエラーが発生しました",
                Some(state.service.fallback_grants()),
                detail,
            )
        }
    };

    with_session(response, &identity)
}

pub(crate) async fn history_handler<G, H>(
    State(state): State<Arc<DiagnosisState<G, H>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    G: GrantRepository + 'static,
    H: HistoryRepository + 'static,
{
    let identity = state.identity.resolve(&headers);
    let body = parse_body(&body);

    if let Err(response) = check_nonce(&state.guard, &body, &identity) {
        return with_session(response, &identity);
    }

    let response = match state.service.history(&identity.owner) {
        Ok(records) => {
            let history: Vec<Value> = records.iter().map(record_view).collect();
            success(StatusCode::OK, json!({ "history": history }))
        }
        Err(other) => {
            error!(error = %other, "history lookup failed");
            let detail = state.debug.then(|| other.to_string());
            failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                "履歴の取得に失敗しました",
                None,
                detail,
            )
        }
    };

    with_session(response, &identity)
}

fn parse_body(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap_or(Value::Null)
}

fn check_nonce(guard: &NonceGuard, body: &Value, identity: &Identity) -> Result<(), Response> {
    let token = body.get("nonce").and_then(Value::as_str).unwrap_or_default();
    guard
        .verify(token, DIAGNOSIS_NONCE_ACTION, &identity.owner)
        .map_err(|error| failure(StatusCode::FORBIDDEN, &error.to_string(), None, None))
}

/// Answers arrive as an object or as a string holding a JSON object.
fn answers_payload(body: &Value) -> Result<Value, ValidationError> {
    match body.get("answers") {
        None | Some(Value::Null) => Ok(Value::Object(Default::default())),
        Some(Value::String(raw)) => serde_json::from_str(raw)
            .map_err(|error| ValidationError::MalformedPayload(format!("answers: {error}"))),
        Some(other) => Ok(other.clone()),
    }
}

fn outcome_view(outcome: &DiagnosisOutcome, owner: &Owner) -> Value {
    let match_reasons: BTreeMap<String, Vec<&str>> = outcome
        .results
        .iter()
        .map(|result| {
            (
                result.grant_id.to_string(),
                result.reasons.iter().map(|reason| reason.label()).collect(),
            )
        })
        .collect();
    let recommendations: Vec<&str> = outcome
        .recommendations
        .iter()
        .map(|recommendation| recommendation.label())
        .collect();

    let mut data = json!({
        "diagnosis_id": outcome.diagnosis_id,
        "matched_grants": outcome.matched_grants,
        "match_reasons": match_reasons,
        "confidence_score": outcome.confidence_score,
        "recommendations": recommendations,
        "candidate_count": outcome.candidate_count,
        "created_at": outcome.created_at,
    });
    if !outcome.fallback_grants.is_empty() {
        data["fallback_grants"] = json!(outcome.fallback_grants);
    }
    if let Some(session) = owner.session_id() {
        data["session_id"] = json!(session);
    }
    data
}

fn record_view(record: &DiagnosisRecord) -> Value {
    json!({
        "id": record.id,
        "answers": record.answers,
        "results": record.results,
        "matched_grants": record.matched_grants,
        "confidence_score": record.confidence,
        "recommendations": record
            .recommendations
            .iter()
            .map(|recommendation| recommendation.label())
            .collect::<Vec<_>>(),
        "created_at": record.created_at,
    })
}

pub(crate) fn success(status: StatusCode, data: Value) -> Response {
    let payload = json!({
        "success": true,
        "data": data,
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) fn failure(
    status: StatusCode,
    message: &str,
    fallback_grants: Option<Vec<GrantSummaryView>>,
    debug: Option<String>,
) -> Response {
    let mut data = json!({
        "message": message,
        "status": status.as_u16(),
    });
    if let Some(grants) = fallback_grants {
        data["fallback_grants"] = json!(grants);
    }
    if let Some(detail) = debug {
        data["debug"] = json!(detail);
    }

    let payload = json!({
        "success": false,
        "data": data,
    });
    (status, axum::Json(payload)).into_response()
}

fn with_session(mut response: Response, identity: &Identity) -> Response {
    if !identity.issued_session {
        return response;
    }
    if let Some(session) = identity.owner.session_id() {
        if let Ok(value) = HeaderValue::from_str(&session.0) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(SESSION_ID_HEADER), value);
        }
    }
    response
}
