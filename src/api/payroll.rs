use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::model::payslip::{ItemEvent, PayslipBatch, PayslipItem, PayslipStatus};
use crate::model::role::Actor;
use crate::payroll::PayrollEngine;
use crate::payroll::approval::ItemEdit;
use crate::payroll::batch::{BatchDetail, GenerateBatch};

#[derive(Deserialize, ToSchema)]
pub struct TransitionItems {
    #[schema(example = json!([11, 12, 13]))]
    pub item_ids: Vec<u64>,

    #[schema(example = "approved_by_hr")]
    pub new_status: PayslipStatus,

    #[schema(example = "Checked against site logbook")]
    pub remark: Option<String>,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct RemarkBody {
    #[schema(example = "Overtime not authorised by site engineer")]
    pub remark: Option<String>,
}

#[derive(Deserialize, ToSchema, Default)]
pub struct ReleaseBody {
    #[schema(example = "signatures/2026/01/emp-1001.png")]
    pub evidence_ref: Option<String>,
}

/// Generate a payroll batch for a period
#[utoipa::path(
    post,
    path = "/api/payroll/batches",
    request_body = GenerateBatch,
    responses(
        (status = 201, description = "Batch generated", body = BatchDetail),
        (status = 400, description = "Invalid period or input"),
        (status = 403, description = "Caller is not HR"),
        (status = 409, description = "Every active employee already covered"),
        (status = 422, description = "No active employees")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn generate_payroll(
    actor: Actor,
    engine: web::Data<PayrollEngine>,
    payload: web::Json<GenerateBatch>,
) -> actix_web::Result<impl Responder> {
    let detail = engine.generate(&actor, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(detail))
}

#[utoipa::path(
    get,
    path = "/api/payroll/batches",
    responses(
        (status = 200, description = "Batches, newest first", body = [PayslipBatch]),
        (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn list_batches(
    actor: Actor,
    engine: web::Data<PayrollEngine>,
) -> actix_web::Result<impl Responder> {
    let batches = engine.list_batches(&actor).await?;
    Ok(HttpResponse::Ok().json(batches))
}

#[utoipa::path(
    get,
    path = "/api/payroll/batches/{batch_id}",
    params(
        ("batch_id" = u64, Path, description = "Payroll batch ID")
    ),
    responses(
        (status = 200, body = BatchDetail),
        (status = 404, description = "Batch not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_batch(
    actor: Actor,
    engine: web::Data<PayrollEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let detail = engine.get_batch(&actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// HR approves every pending item of a batch
#[utoipa::path(
    put,
    path = "/api/payroll/batches/{batch_id}/accept",
    params(
        ("batch_id" = u64, Path, description = "Payroll batch ID")
    ),
    request_body(content = RemarkBody, description = "Optional remark"),
    responses(
        (status = 200, description = "Items that were approved", body = [PayslipItem]),
        (status = 403),
        (status = 404, description = "Batch not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn accept_batch(
    actor: Actor,
    engine: web::Data<PayrollEngine>,
    path: web::Path<u64>,
    body: Option<web::Json<RemarkBody>>,
) -> actix_web::Result<impl Responder> {
    let remark = body.and_then(|b| b.into_inner().remark);
    let items = engine
        .accept_batch(&actor, path.into_inner(), remark)
        .await?;
    Ok(HttpResponse::Ok().json(items))
}

/// HR rejects every pending item of a batch
#[utoipa::path(
    put,
    path = "/api/payroll/batches/{batch_id}/reject",
    params(
        ("batch_id" = u64, Path, description = "Payroll batch ID")
    ),
    request_body = RemarkBody,
    responses(
        (status = 200, description = "Items that were rejected", body = [PayslipItem]),
        (status = 400, description = "Remark missing"),
        (status = 403),
        (status = 404, description = "Batch not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn reject_batch(
    actor: Actor,
    engine: web::Data<PayrollEngine>,
    path: web::Path<u64>,
    body: web::Json<RemarkBody>,
) -> actix_web::Result<impl Responder> {
    let remark = body.into_inner().remark.unwrap_or_default();
    let items = engine
        .reject_batch(&actor, path.into_inner(), remark)
        .await?;
    Ok(HttpResponse::Ok().json(items))
}

/// HR decision on one or many pending items
#[utoipa::path(
    put,
    path = "/api/payroll/items/transition",
    request_body = TransitionItems,
    responses(
        (status = 200, description = "Items after the transition", body = [PayslipItem]),
        (status = 400, description = "Bad status or missing remark"),
        (status = 403),
        (status = 404, description = "Unknown item"),
        (status = 409, description = "An item is not pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn transition_items(
    actor: Actor,
    engine: web::Data<PayrollEngine>,
    payload: web::Json<TransitionItems>,
) -> actix_web::Result<impl Responder> {
    let TransitionItems {
        item_ids,
        new_status,
        remark,
    } = payload.into_inner();
    let items = engine
        .transition_items(&actor, &item_ids, new_status, remark)
        .await?;
    Ok(HttpResponse::Ok().json(items))
}

#[utoipa::path(
    get,
    path = "/api/payroll/items/{item_id}",
    params(
        ("item_id" = u64, Path, description = "Payslip item ID")
    ),
    responses(
        (status = 200, body = PayslipItem),
        (status = 404, description = "Item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn get_item(
    actor: Actor,
    engine: web::Data<PayrollEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let item = engine.get_item(&actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(item))
}

#[utoipa::path(
    get,
    path = "/api/payroll/items/{item_id}/history",
    params(
        ("item_id" = u64, Path, description = "Payslip item ID")
    ),
    responses(
        (status = 200, description = "Status changes, oldest first", body = [ItemEvent]),
        (status = 404, description = "Item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn item_history(
    actor: Actor,
    engine: web::Data<PayrollEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let events = engine.item_history(&actor, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(events))
}

/// Edit hours, overtime or deductions of a pending item
#[utoipa::path(
    put,
    path = "/api/payroll/items/{item_id}",
    params(
        ("item_id" = u64, Path, description = "Payslip item ID")
    ),
    request_body = ItemEdit,
    responses(
        (status = 200, description = "Recomputed item", body = PayslipItem),
        (status = 400, description = "Negative or missing values"),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Item no longer pending or changed concurrently")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn edit_item(
    actor: Actor,
    engine: web::Data<PayrollEngine>,
    path: web::Path<u64>,
    payload: web::Json<ItemEdit>,
) -> actix_web::Result<impl Responder> {
    let item = engine
        .edit_item_fields(&actor, path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(item))
}

/// Re-read attendance for the batch period and recompute a pending item
#[utoipa::path(
    post,
    path = "/api/payroll/items/{item_id}/recompute-hours",
    params(
        ("item_id" = u64, Path, description = "Payslip item ID")
    ),
    responses(
        (status = 200, description = "Recomputed item", body = PayslipItem),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Item no longer pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn recompute_hours(
    actor: Actor,
    engine: web::Data<PayrollEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let item = engine
        .recompute_hours(&actor, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(item))
}

/// Finance/Executive marks an HR-approved item paid
#[utoipa::path(
    put,
    path = "/api/payroll/items/{item_id}/release",
    params(
        ("item_id" = u64, Path, description = "Payslip item ID")
    ),
    request_body(content = ReleaseBody, description = "Optional evidence reference"),
    responses(
        (status = 200, description = "Paid item", body = PayslipItem),
        (status = 403, description = "Caller is not Finance/Executive"),
        (status = 409, description = "Item is not approved by HR")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn release_payment(
    actor: Actor,
    engine: web::Data<PayrollEngine>,
    path: web::Path<u64>,
    body: Option<web::Json<ReleaseBody>>,
) -> actix_web::Result<impl Responder> {
    let evidence_ref = body.and_then(|b| b.into_inner().evidence_ref);
    let item = engine
        .release_payment(&actor, path.into_inner(), evidence_ref)
        .await?;
    Ok(HttpResponse::Ok().json(item))
}

/// Finance/Executive bounces an HR-approved item
#[utoipa::path(
    put,
    path = "/api/payroll/items/{item_id}/reject-release",
    params(
        ("item_id" = u64, Path, description = "Payslip item ID")
    ),
    request_body = RemarkBody,
    responses(
        (status = 200, description = "Rejected item", body = PayslipItem),
        (status = 400, description = "Remark missing"),
        (status = 403, description = "Caller is not Finance/Executive"),
        (status = 409, description = "Item is not approved by HR")
    ),
    security(("bearer_auth" = [])),
    tag = "Payroll"
)]
pub async fn reject_at_release(
    actor: Actor,
    engine: web::Data<PayrollEngine>,
    path: web::Path<u64>,
    body: web::Json<RemarkBody>,
) -> actix_web::Result<impl Responder> {
    let remark = body.into_inner().remark.unwrap_or_default();
    let item = engine
        .reject_at_release(&actor, path.into_inner(), remark)
        .await?;
    Ok(HttpResponse::Ok().json(item))
}
