//! Payment checkpoints: dated instalments of a project's price.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::activity::{self, msg};
use crate::error::{AppError, AppResult};
use crate::models::{PayCheckPointInfo, PAY_CHECK_POINT_COLUMNS};
use crate::validate;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayCheckPointRequest {
    pub pay_date: String,
    pub price: i64,
    pub label: String,
}

/// A checkpoint that passed validation, ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayCheckPoint {
    pub pay_date: DateTime<Utc>,
    pub price: i64,
    pub label: String,
}

impl PayCheckPointRequest {
    pub fn validate(&self) -> AppResult<NewPayCheckPoint> {
        validate::length("Checkpoint label", &self.label, 1, 50)?;
        validate::non_negative("price", self.price)?;
        Ok(NewPayCheckPoint {
            pay_date: validate::date("payDate", &self.pay_date)?,
            price: self.price,
            label: self.label.clone(),
        })
    }
}

pub fn insert(
    conn: &Connection,
    project_id: i64,
    checkpoint: &NewPayCheckPoint,
    now: DateTime<Utc>,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO pay_check_points (project_id, pay_date, price, label, paid_amount, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
        params![
            project_id,
            checkpoint.pay_date,
            checkpoint.price,
            checkpoint.label,
            now
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Checkpoints of a project ordered by due date.
pub fn list(conn: &Connection, project_id: i64) -> AppResult<Vec<PayCheckPointInfo>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM pay_check_points WHERE project_id = ?1 ORDER BY pay_date, id",
        PAY_CHECK_POINT_COLUMNS
    ))?;
    let rows = stmt
        .query_map([project_id], PayCheckPointInfo::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaidRequest {
    #[serde(alias = "payCheckPointId")]
    pub paycheckpoint_id: i64,
    pub paid_amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaidResponse {
    pub success: bool,
    pub message: String,
    pub id: i64,
    pub paid_amount: i64,
    pub label: String,
    pub price: i64,
}

/// Record how much of a checkpoint has been paid. Overpayment is accepted.
pub fn update_paid(
    conn: &Connection,
    owner_id: i64,
    req: &UpdatePaidRequest,
) -> AppResult<UpdatePaidResponse> {
    validate::non_negative("paidAmount", req.paid_amount)?;

    let (project_id, author_id, label, price): (i64, i64, String, i64) = conn
        .query_row(
            "SELECT c.project_id, p.author_id, c.label, c.price
             FROM pay_check_points c JOIN projects p ON p.id = c.project_id
             WHERE c.id = ?1",
            [req.paycheckpoint_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?
        .ok_or_else(|| AppError::not_found("Payment checkpoint not found"))?;
    if author_id != owner_id {
        return Err(AppError::forbidden(
            "You do not have access to this payment checkpoint",
        ));
    }

    conn.execute(
        "UPDATE pay_check_points SET paid_amount = ?1, updated_at = ?2 WHERE id = ?3",
        params![req.paid_amount, Utc::now(), req.paycheckpoint_id],
    )?;
    activity::record(
        conn,
        Some(owner_id),
        Some(project_id),
        msg::PAY_CHECK_POINT_PAID,
        Some(json!({
            "paycheckpointId": req.paycheckpoint_id,
            "label": label,
            "paidAmount": req.paid_amount,
        })),
    );

    Ok(UpdatePaidResponse {
        success: true,
        message: "Paid amount updated successfully".to_string(),
        id: req.paycheckpoint_id,
        paid_amount: req.paid_amount,
        label,
        price,
    })
}
