use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, OpenApi};
use uuid::Uuid;

use crate::error::{CampaignError, CampaignResult, ErrorBody};
use crate::models::{
    Campaign, CampaignFilter, CampaignProgress, CampaignStatus, CreateCampaign, CreateRecipient,
    DeliveryError, ProviderEvent, Recipient, RecipientFilter, RecipientStatus, ScheduleRequest,
    ScheduleResponse, SendAccepted, SendRequest, SuppressionEntry, SuppressionSource,
    UnsubscribeRequest, UpdateCampaign, WebhookAck,
};
use crate::repository::CampaignRepository;
use crate::service::CampaignService;

/// 1x1 transparent GIF served by the open-tracking endpoint
const TRACKING_PIXEL: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0xff, 0xff,
    0xff, 0x00, 0x00, 0x00, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00,
    0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3b,
];

fn parse_campaign_id(id: &str) -> CampaignResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| CampaignError::Validation("Invalid campaign ID".to_string()))
}

/// Create a new campaign
#[utoipa::path(
    post,
    path = "",
    tag = "campaigns",
    request_body = CreateCampaign,
    responses(
        (status = 201, description = "Campaign created successfully", body = Campaign),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn create_campaign<R: CampaignRepository>(
    State(service): State<Arc<CampaignService<R>>>,
    Json(input): Json<CreateCampaign>,
) -> CampaignResult<impl IntoResponse> {
    let campaign = service.create_campaign(input).await?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

/// List campaigns with optional filters
#[utoipa::path(
    get,
    path = "",
    tag = "campaigns",
    params(CampaignFilter),
    responses(
        (status = 200, description = "List of campaigns", body = Vec<Campaign>),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn list_campaigns<R: CampaignRepository>(
    State(service): State<Arc<CampaignService<R>>>,
    Query(filter): Query<CampaignFilter>,
) -> CampaignResult<Json<Vec<Campaign>>> {
    let campaigns = service.list_campaigns(filter).await?;
    Ok(Json(campaigns))
}

/// Get a campaign by ID
#[utoipa::path(
    get,
    path = "/{id}",
    tag = "campaigns",
    params(
        ("id" = String, Path, description = "Campaign ID")
    ),
    responses(
        (status = 200, description = "Campaign found", body = Campaign),
        (status = 400, description = "Invalid campaign ID", body = ErrorBody),
        (status = 404, description = "Campaign not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn get_campaign<R: CampaignRepository>(
    State(service): State<Arc<CampaignService<R>>>,
    Path(id): Path<String>,
) -> CampaignResult<impl IntoResponse> {
    let campaign_id = parse_campaign_id(&id)?;

    let campaign = service.get_campaign(campaign_id).await?;
    Ok(Json(campaign))
}

/// Update a campaign's draft-editable fields
#[utoipa::path(
    put,
    path = "/{id}",
    tag = "campaigns",
    params(
        ("id" = String, Path, description = "Campaign ID")
    ),
    request_body = UpdateCampaign,
    responses(
        (status = 200, description = "Campaign updated successfully", body = Campaign),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 404, description = "Campaign not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn update_campaign<R: CampaignRepository>(
    State(service): State<Arc<CampaignService<R>>>,
    Path(id): Path<String>,
    Json(input): Json<UpdateCampaign>,
) -> CampaignResult<impl IntoResponse> {
    let campaign_id = parse_campaign_id(&id)?;

    let campaign = service.update_campaign(campaign_id, input).await?;
    Ok(Json(campaign))
}

/// Delete a campaign
#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "campaigns",
    params(
        ("id" = String, Path, description = "Campaign ID")
    ),
    responses(
        (status = 204, description = "Campaign deleted successfully"),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 404, description = "Campaign not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn delete_campaign<R: CampaignRepository>(
    State(service): State<Arc<CampaignService<R>>>,
    Path(id): Path<String>,
) -> CampaignResult<impl IntoResponse> {
    let campaign_id = parse_campaign_id(&id)?;

    service.delete_campaign(campaign_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Add a recipient to a campaign
#[utoipa::path(
    post,
    path = "/{id}/recipients",
    tag = "campaigns",
    params(
        ("id" = String, Path, description = "Campaign ID")
    ),
    request_body = CreateRecipient,
    responses(
        (status = 201, description = "Recipient added successfully", body = Recipient),
        (status = 400, description = "Invalid request or suppressed address", body = ErrorBody),
        (status = 404, description = "Campaign not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn add_recipient<R: CampaignRepository>(
    State(service): State<Arc<CampaignService<R>>>,
    Path(id): Path<String>,
    Json(input): Json<CreateRecipient>,
) -> CampaignResult<impl IntoResponse> {
    let campaign_id = parse_campaign_id(&id)?;

    let recipient = service.add_recipient(campaign_id, input).await?;
    Ok((StatusCode::CREATED, Json(recipient)))
}

/// List a campaign's recipients
#[utoipa::path(
    get,
    path = "/{id}/recipients",
    tag = "campaigns",
    params(
        ("id" = String, Path, description = "Campaign ID"),
        RecipientFilter
    ),
    responses(
        (status = 200, description = "List of recipients", body = Vec<Recipient>),
        (status = 400, description = "Invalid campaign ID", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn list_recipients<R: CampaignRepository>(
    State(service): State<Arc<CampaignService<R>>>,
    Path(id): Path<String>,
    Query(filter): Query<RecipientFilter>,
) -> CampaignResult<Json<Vec<Recipient>>> {
    let campaign_id = parse_campaign_id(&id)?;

    let recipients = service.list_recipients(campaign_id, filter).await?;
    Ok(Json(recipients))
}

/// Start sending a campaign
#[utoipa::path(
    post,
    path = "/{id}/send",
    tag = "campaigns",
    params(
        ("id" = String, Path, description = "Campaign ID")
    ),
    request_body = SendRequest,
    responses(
        (status = 202, description = "Campaign sending started", body = SendAccepted),
        (status = 400, description = "Campaign cannot be sent", body = ErrorBody),
        (status = 404, description = "Campaign not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn send_campaign<R: CampaignRepository + 'static>(
    State(service): State<Arc<CampaignService<R>>>,
    Path(id): Path<String>,
    Json(request): Json<SendRequest>,
) -> CampaignResult<impl IntoResponse> {
    let campaign_id = parse_campaign_id(&id)?;

    let accepted = service.start_send(campaign_id, request).await?;
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}

/// Pause a sending campaign
#[utoipa::path(
    post,
    path = "/{id}/pause",
    tag = "campaigns",
    params(
        ("id" = String, Path, description = "Campaign ID")
    ),
    responses(
        (status = 200, description = "Campaign paused", body = Campaign),
        (status = 400, description = "Campaign is not sending", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn pause_campaign<R: CampaignRepository>(
    State(service): State<Arc<CampaignService<R>>>,
    Path(id): Path<String>,
) -> CampaignResult<impl IntoResponse> {
    let campaign_id = parse_campaign_id(&id)?;

    let campaign = service.pause_campaign(campaign_id).await?;
    Ok(Json(campaign))
}

/// Schedule a campaign for a future send
#[utoipa::path(
    post,
    path = "/{id}/schedule",
    tag = "campaigns",
    params(
        ("id" = String, Path, description = "Campaign ID")
    ),
    request_body = ScheduleRequest,
    responses(
        (status = 200, description = "Campaign scheduled", body = ScheduleResponse),
        (status = 400, description = "Campaign cannot be scheduled", body = ErrorBody),
        (status = 404, description = "Campaign not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn schedule_campaign<R: CampaignRepository>(
    State(service): State<Arc<CampaignService<R>>>,
    Path(id): Path<String>,
    Json(request): Json<ScheduleRequest>,
) -> CampaignResult<impl IntoResponse> {
    let campaign_id = parse_campaign_id(&id)?;

    let response = service.schedule_campaign(campaign_id, request).await?;
    Ok(Json(response))
}

/// Cancel a campaign's schedule
#[utoipa::path(
    post,
    path = "/{id}/cancel-schedule",
    tag = "campaigns",
    params(
        ("id" = String, Path, description = "Campaign ID")
    ),
    responses(
        (status = 200, description = "Schedule cancelled", body = ScheduleResponse),
        (status = 400, description = "Campaign is not scheduled", body = ErrorBody),
        (status = 404, description = "Campaign not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn cancel_schedule<R: CampaignRepository>(
    State(service): State<Arc<CampaignService<R>>>,
    Path(id): Path<String>,
) -> CampaignResult<impl IntoResponse> {
    let campaign_id = parse_campaign_id(&id)?;

    let response = service.cancel_schedule(campaign_id).await?;
    Ok(Json(response))
}

/// Live sending progress for a campaign
#[utoipa::path(
    get,
    path = "/{id}/progress",
    tag = "campaigns",
    params(
        ("id" = String, Path, description = "Campaign ID")
    ),
    responses(
        (status = 200, description = "Campaign progress", body = CampaignProgress),
        (status = 400, description = "Invalid campaign ID", body = ErrorBody),
        (status = 404, description = "Campaign not found", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn campaign_progress<R: CampaignRepository>(
    State(service): State<Arc<CampaignService<R>>>,
    Path(id): Path<String>,
) -> CampaignResult<impl IntoResponse> {
    let campaign_id = parse_campaign_id(&id)?;

    let progress = service.campaign_progress(campaign_id).await?;
    Ok(Json(progress))
}

/// Unsubscribe an email address from all campaigns
#[utoipa::path(
    post,
    path = "/unsubscribe",
    tag = "subscriptions",
    request_body = UnsubscribeRequest,
    responses(
        (status = 201, description = "Unsubscribe recorded", body = SuppressionEntry),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn unsubscribe<R: CampaignRepository>(
    State(service): State<Arc<CampaignService<R>>>,
    Json(request): Json<UnsubscribeRequest>,
) -> CampaignResult<impl IntoResponse> {
    let entry = service.unsubscribe(request).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// Ingest delivery events from the email provider
#[utoipa::path(
    post,
    path = "/webhooks/email-events",
    tag = "subscriptions",
    request_body = Vec<ProviderEvent>,
    responses(
        (status = 200, description = "Events processed", body = WebhookAck),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
pub async fn email_events<R: CampaignRepository>(
    State(service): State<Arc<CampaignService<R>>>,
    Json(events): Json<Vec<ProviderEvent>>,
) -> CampaignResult<Json<WebhookAck>> {
    let ack = service.process_provider_events(events).await?;
    Ok(Json(ack))
}

/// Query parameters for the open-tracking pixel
#[derive(Debug, Deserialize, IntoParams)]
pub struct OpenTrackingParams {
    /// Campaign ID
    c: String,
    /// Recipient ID
    r: String,
    /// Verification token
    t: String,
}

/// Query parameters for the click-tracking redirect
#[derive(Debug, Deserialize, IntoParams)]
pub struct ClickTrackingParams {
    /// Campaign ID
    c: String,
    /// Recipient ID
    r: String,
    /// Verification token
    t: String,
    /// Destination URL
    u: String,
}

fn client_meta(headers: &HeaderMap) -> (Option<String>, Option<String>) {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());
    (user_agent, ip)
}

fn pixel_response() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "image/gif"),
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        TRACKING_PIXEL,
    )
}

/// Open-tracking pixel
///
/// Always answers with the pixel; tracking failures must never break
/// image loading in the recipient's mail client.
#[utoipa::path(
    get,
    path = "/open",
    tag = "tracking",
    params(OpenTrackingParams),
    responses(
        (status = 200, description = "Tracking pixel", content_type = "image/gif")
    )
)]
pub async fn track_open<R: CampaignRepository>(
    State(service): State<Arc<CampaignService<R>>>,
    Query(params): Query<OpenTrackingParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let (Ok(campaign_id), Ok(recipient_id)) =
        (Uuid::parse_str(&params.c), Uuid::parse_str(&params.r))
    {
        let (user_agent, ip) = client_meta(&headers);
        if let Err(e) = service
            .track_open(campaign_id, recipient_id, &params.t, user_agent, ip)
            .await
        {
            error!(error = %e, "Open tracking failed");
        }
    }

    pixel_response()
}

/// Click-tracking redirect
///
/// Always redirects to the destination URL, even when the token does
/// not verify.
#[utoipa::path(
    get,
    path = "/click",
    tag = "tracking",
    params(ClickTrackingParams),
    responses(
        (status = 307, description = "Redirect to the destination URL")
    )
)]
pub async fn track_click<R: CampaignRepository>(
    State(service): State<Arc<CampaignService<R>>>,
    Query(params): Query<ClickTrackingParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let (Ok(campaign_id), Ok(recipient_id)) =
        (Uuid::parse_str(&params.c), Uuid::parse_str(&params.r))
    {
        let (user_agent, ip) = client_meta(&headers);
        if let Err(e) = service
            .track_click(campaign_id, recipient_id, &params.t, &params.u, user_agent, ip)
            .await
        {
            error!(error = %e, "Click tracking failed");
        }
    }

    Redirect::temporary(&params.u)
}

/// OpenAPI documentation for the campaign API
#[derive(OpenApi)]
#[openapi(
    paths(
        create_campaign,
        list_campaigns,
        get_campaign,
        update_campaign,
        delete_campaign,
        add_recipient,
        list_recipients,
        send_campaign,
        pause_campaign,
        schedule_campaign,
        cancel_schedule,
        campaign_progress,
        unsubscribe,
        email_events,
        track_open,
        track_click,
    ),
    components(
        schemas(
            Campaign,
            CampaignStatus,
            CampaignProgress,
            CreateCampaign,
            UpdateCampaign,
            CreateRecipient,
            DeliveryError,
            ErrorBody,
            ProviderEvent,
            Recipient,
            RecipientStatus,
            ScheduleRequest,
            ScheduleResponse,
            SendAccepted,
            SendRequest,
            SuppressionEntry,
            SuppressionSource,
            UnsubscribeRequest,
            WebhookAck,
        )
    ),
    tags(
        (name = "campaigns", description = "Campaign management and delivery"),
        (name = "subscriptions", description = "Unsubscribes and provider delivery events"),
        (name = "tracking", description = "Open and click tracking")
    )
)]
pub struct ApiDoc;

/// Router for campaign management, nested under `/api/campaigns`
pub fn campaigns_router<R: CampaignRepository + 'static>(service: CampaignService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_campaigns).post(create_campaign))
        .route(
            "/{id}",
            get(get_campaign).put(update_campaign).delete(delete_campaign),
        )
        .route("/{id}/recipients", get(list_recipients).post(add_recipient))
        .route("/{id}/send", post(send_campaign))
        .route("/{id}/pause", post(pause_campaign))
        .route("/{id}/schedule", post(schedule_campaign))
        .route("/{id}/cancel-schedule", post(cancel_schedule))
        .route("/{id}/progress", get(campaign_progress))
        .with_state(shared_service)
}

/// Router for the public unsubscribe and provider webhooks, nested
/// under `/api`
pub fn subscriptions_router<R: CampaignRepository + 'static>(
    service: CampaignService<R>,
) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/unsubscribe", post(unsubscribe))
        .route("/webhooks/email-events", post(email_events))
        .with_state(shared_service)
}

/// Router for tracking endpoints, nested under `/track`
///
/// Kept off the `/api` prefix so the URLs baked into sent mail stay
/// short and stable.
pub fn tracking_router<R: CampaignRepository + 'static>(service: CampaignService<R>) -> Router {
    let shared_service = Arc::new(service);

    Router::new()
        .route("/open", get(track_open))
        .route("/click", get(track_click))
        .with_state(shared_service)
}
