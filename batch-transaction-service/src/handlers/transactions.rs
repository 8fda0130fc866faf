use crate::dtos::{
    MessageResponse, TransactionDetailResponse, TransactionListResponse, UpdateStatusRequest,
    UploadResponse, UPDATED_MESSAGE,
};
use crate::middleware::AuthUser;
use crate::models::{ListParams, PageRequest, TransactionStatus};
use crate::services::UploadRequest;
use crate::startup::AppState;
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, RawQuery, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use bytes::Bytes;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::str::FromStr;
use uuid::Uuid;

fn parse_transaction_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(anyhow::anyhow!("invalid transaction id")))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(anyhow::anyhow!("Upload exceeds the size limit"))
    } else {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", err))
    }
}

#[derive(Default)]
struct UploadForm {
    file: Option<Bytes>,
    total_amount: Option<String>,
    total_record: Option<String>,
    from_account: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => form.file = Some(field.bytes().await.map_err(multipart_error)?),
                "total_amount" => form.total_amount = Some(field.text().await.map_err(multipart_error)?),
                "total_record" => form.total_record = Some(field.text().await.map_err(multipart_error)?),
                "from_account" => form.from_account = Some(field.text().await.map_err(multipart_error)?),
                other => tracing::debug!(field = other, "Ignoring unknown multipart field"),
            }
        }

        Ok(form)
    }

    fn into_request(self) -> Result<UploadRequest, AppError> {
        let file = self
            .file
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("No file uploaded")))?;

        let total_amount = self
            .total_amount
            .as_deref()
            .map(str::trim)
            .and_then(|raw| Decimal::from_str(raw).or_else(|_| Decimal::from_scientific(raw)).ok())
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("invalid total_amount")))?;

        let total_record = self
            .total_record
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i32>().ok())
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("invalid total_record")))?;

        Ok(UploadRequest {
            file,
            total_amount,
            total_record,
            from_account: self.from_account.unwrap_or_default(),
        })
    }
}

pub async fn create_transaction(
    State(state): State<AppState>,
    AuthUser(maker): AuthUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let upload = UploadForm::read(multipart).await?.into_request()?;

    let header = state.engine.create_from_upload(upload, &maker).await?;

    Ok((StatusCode::CREATED, Json(UploadResponse::from(&header))))
}

pub async fn get_summary(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let summary = state.engine.summary().await?;
    Ok(Json(summary))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    AuthUser(approver): AuthUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_transaction_id(&id)?;

    state
        .engine
        .update_status(id, &body.status, &approver)
        .await?;

    Ok(Json(MessageResponse::new(UPDATED_MESSAGE)))
}

/// `page` and `per_page` that fail to parse fall back to their defaults;
/// every `status` value must name a known status.
fn list_params(query: Option<&str>) -> Result<ListParams, AppError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query.unwrap_or_default())
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("invalid query string: {}", e)))?;

    let mut page = None;
    let mut per_page = None;
    let mut statuses = Vec::new();

    for (key, value) in pairs {
        match key.as_str() {
            "page" => page = value.trim().parse().ok(),
            "per_page" => per_page = value.trim().parse().ok(),
            "status" => {
                let status = TransactionStatus::from_str(&value).map_err(|_| {
                    AppError::BadRequest(anyhow::anyhow!("invalid transaction status"))
                })?;
                if !statuses.contains(&status) {
                    statuses.push(status);
                }
            }
            _ => {}
        }
    }

    Ok(ListParams {
        statuses,
        page: PageRequest::normalize(page, per_page),
    })
}

pub async fn list_transactions(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<impl IntoResponse, AppError> {
    let params = list_params(query.as_deref())?;
    let page = state.engine.list(&params).await?;

    Ok(Json(TransactionListResponse {
        data: page.data,
        pagination: page.pagination,
    }))
}

pub async fn get_transaction_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_transaction_id(&id)?;
    let details = state.engine.detail(id).await?;

    Ok(Json(TransactionDetailResponse { data: details }))
}
