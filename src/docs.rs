use crate::api::payroll::{ReleaseBody, RemarkBody, TransitionItems};
use crate::model::payslip::{
    BatchSummary, ItemEvent, PayslipBatch, PayslipItem, PayslipStatus, StatusTotal,
};
use crate::model::role::ApprovalTier;
use crate::payroll::approval::ItemEdit;
use crate::payroll::batch::{BatchDetail, GenerateBatch};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Payroll Engine API",
        version = "1.0.0",
        description = r#"
## Payroll Computation & Approval

Turns attendance into payslips and walks every payslip through a two-tier approval.

### 🔹 Flow
- **Generate**
  - HR creates a batch for a period; one pending payslip per active employee
- **HR review**
  - Edit hours, overtime or deductions while pending
  - Approve or reject single items, many items, or a whole batch
- **Release**
  - Finance or Executive pays or bounces HR-approved items

### 🔐 Security
Every endpoint requires a **JWT Bearer** access token.
HR decisions need the HR role; release needs Finance or Executive.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::payroll::generate_payroll,
        crate::api::payroll::list_batches,
        crate::api::payroll::get_batch,
        crate::api::payroll::accept_batch,
        crate::api::payroll::reject_batch,

        crate::api::payroll::transition_items,
        crate::api::payroll::get_item,
        crate::api::payroll::item_history,
        crate::api::payroll::edit_item,
        crate::api::payroll::recompute_hours,

        crate::api::payroll::release_payment,
        crate::api::payroll::reject_at_release
    ),
    components(
        schemas(
            GenerateBatch,
            BatchDetail,
            BatchSummary,
            StatusTotal,
            PayslipBatch,
            PayslipItem,
            PayslipStatus,
            ItemEvent,
            ItemEdit,
            ApprovalTier,
            TransitionItems,
            RemarkBody,
            ReleaseBody
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Payroll", description = "Payroll generation, approval and release APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
