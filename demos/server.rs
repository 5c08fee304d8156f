// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! REST API server for couples and their shared book.
//!
//! Run with: `cargo run --example server`
//!
//! # Example requests
//!
//! ```bash
//! # Invite a partner
//! curl -X POST http://localhost:3000/couples/invite \
//!   -H "Content-Type: application/json" \
//!   -d '{"inviter": 1, "invitee": 2}'
//!
//! # Accept the invite
//! curl -X POST http://localhost:3000/couples/1/accept \
//!   -H "Content-Type: application/json" \
//!   -d '{"user_id": 2}'
//!
//! # Add a shared expense
//! curl -X POST http://localhost:3000/couples/1/expenses \
//!   -H "Content-Type: application/json" \
//!   -d '{"id": 1, "paid_by": 1, "amount": "1000.00", "split": "equal", "date": "2025-01-10", "category": "Rent"}'
//!
//! # Settle up
//! curl -X POST http://localhost:3000/couples/1/settle \
//!   -H "Content-Type: application/json" \
//!   -d '{"id": 1, "paid_by": 2, "paid_to": 1, "amount": "500.00"}'
//!
//! # Get balance
//! curl http://localhost:3000/couples/1/balance
//!
//! # Create a savings goal and contribute to it
//! curl -X POST http://localhost:3000/couples/1/goals \
//!   -H "Content-Type: application/json" \
//!   -d '{"id": 1, "user_id": 1, "title": "Trip", "target_amount": "2000.00", "deadline": "2025-12-01"}'
//! curl -X POST http://localhost:3000/couples/1/goals/1/contribute \
//!   -H "Content-Type: application/json" \
//!   -d '{"user_id": 2, "amount": "250.00"}'
//! curl http://localhost:3000/couples/1/goals
//! ```

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use splitmint::{
    BalanceSummary, Contribution, CoupleId, CoupleRegistry, DataWarning, ExpenseId, GoalId,
    GoalProgress, LedgerError, SavingsGoal, SettleUp, Settlement, SettlementId, SharedExpense,
    Split, UserId, suggest_settlement,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

// === Request/Response DTOs ===

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub inviter: u32,
    pub invitee: u32,
}

#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub couple_id: u32,
}

/// Request body for accepting or declining an invite.
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub user_id: u32,
}

/// Request body for shared expenses.
///
/// `paid_by` is a user ID; the server maps it to the partner slot.
/// `split` uses the compact form, e.g. `"percentage:60:40"`.
#[derive(Debug, Deserialize)]
pub struct ExpenseRequest {
    pub id: u32,
    pub paid_by: u32,
    pub amount: Decimal,
    pub split: Split,
    pub date: NaiveDate,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    pub id: u32,
    pub paid_by: u32,
    pub paid_to: u32,
    pub amount: Decimal,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub couple_id: u32,
    pub summary: BalanceSummary,
    pub all_settled: bool,
    pub settle_up: Option<SettleUp>,
    pub warnings: Vec<DataWarning>,
}

#[derive(Debug, Deserialize)]
pub struct GoalRequest {
    pub id: u32,
    pub user_id: u32,
    pub title: String,
    pub target_amount: Decimal,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ContributeRequest {
    pub user_id: u32,
    pub amount: Decimal,
}

/// A savings goal with its progress as of today.
#[derive(Debug, Serialize)]
pub struct GoalResponse {
    #[serde(flatten)]
    pub goal: SavingsGoal,
    pub progress: GoalProgress,
}

impl From<SavingsGoal> for GoalResponse {
    fn from(goal: SavingsGoal) -> Self {
        let progress = goal.progress(Utc::now().date_naive());
        Self { goal, progress }
    }
}

/// Response body for errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// === Application State ===

/// Shared application state containing the couple registry.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<CoupleRegistry>,
}

// === Error Handling ===

/// Converts ledger errors and unknown couples into HTTP responses.
pub enum AppError {
    Ledger(LedgerError),
    CoupleNotFound,
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        AppError::Ledger(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let err = match self {
            AppError::Ledger(err) => err,
            AppError::CoupleNotFound => {
                return (
                    StatusCode::NOT_FOUND,
                    Json(ErrorResponse {
                        error: "Couple not found".to_string(),
                        code: "COUPLE_NOT_FOUND".to_string(),
                    }),
                )
                    .into_response();
            }
        };

        let (status, code) = match &err {
            LedgerError::InvalidAmount => (StatusCode::BAD_REQUEST, "INVALID_AMOUNT"),
            LedgerError::SplitMismatch { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "SPLIT_MISMATCH")
            }
            LedgerError::AmountOverflow => (StatusCode::UNPROCESSABLE_ENTITY, "AMOUNT_OVERFLOW"),
            LedgerError::InvalidSplitRatio(_) => (StatusCode::BAD_REQUEST, "INVALID_SPLIT_RATIO"),
            LedgerError::SelfSettlement => (StatusCode::BAD_REQUEST, "SELF_SETTLEMENT"),
            LedgerError::SettlementIncreasesDebt => {
                (StatusCode::UNPROCESSABLE_ENTITY, "SETTLEMENT_INCREASES_DEBT")
            }
            LedgerError::SelfInvite => (StatusCode::BAD_REQUEST, "SELF_INVITE"),
            LedgerError::AlreadyPaired => (StatusCode::CONFLICT, "ALREADY_PAIRED"),
            LedgerError::InviteNotFound => (StatusCode::NOT_FOUND, "INVITE_NOT_FOUND"),
            LedgerError::NotInvitee => (StatusCode::FORBIDDEN, "NOT_INVITEE"),
            LedgerError::CoupleNotActive => (StatusCode::CONFLICT, "COUPLE_NOT_ACTIVE"),
            LedgerError::NotAMember => (StatusCode::FORBIDDEN, "NOT_A_MEMBER"),
            LedgerError::DuplicateRecord => (StatusCode::CONFLICT, "DUPLICATE_RECORD"),
            LedgerError::RecordNotFound => (StatusCode::NOT_FOUND, "RECORD_NOT_FOUND"),
            LedgerError::GoalNotFound => (StatusCode::NOT_FOUND, "GOAL_NOT_FOUND"),
        };

        (
            status,
            Json(ErrorResponse {
                error: err.to_string(),
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}

// === Handlers ===

/// POST /couples/invite - Invite a partner.
async fn invite(
    State(state): State<AppState>,
    Json(request): Json<InviteRequest>,
) -> Result<(StatusCode, Json<InviteResponse>), AppError> {
    let couple_id = state
        .registry
        .invite(UserId(request.inviter), UserId(request.invitee))?;
    Ok((
        StatusCode::CREATED,
        Json(InviteResponse {
            couple_id: couple_id.0,
        }),
    ))
}

/// POST /couples/{id}/accept - Accept a pending invite.
async fn accept(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Json(request): Json<AnswerRequest>,
) -> Result<StatusCode, AppError> {
    state.registry.accept(CoupleId(id), UserId(request.user_id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /couples/{id}/decline - Decline a pending invite.
async fn decline(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Json(request): Json<AnswerRequest>,
) -> Result<StatusCode, AppError> {
    state.registry.decline(CoupleId(id), UserId(request.user_id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /couples/{id}/expenses - Add a shared expense.
async fn add_expense(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Json(request): Json<ExpenseRequest>,
) -> Result<StatusCode, AppError> {
    let couple = state
        .registry
        .get(&CoupleId(id))
        .ok_or(AppError::CoupleNotFound)?;
    let payer = couple.slot_of(UserId(request.paid_by))?;
    let mut expense = SharedExpense::new(
        ExpenseId(request.id),
        payer,
        request.amount,
        request.split,
        request.date,
        request.category,
    );
    expense.description = request.description;
    couple.add_expense(expense)?;
    Ok(StatusCode::CREATED)
}

/// DELETE /couples/{id}/expenses/{expense_id} - Delete a shared expense.
async fn delete_expense(
    State(state): State<AppState>,
    Path((id, expense_id)): Path<(u32, u32)>,
) -> Result<StatusCode, AppError> {
    let couple = state
        .registry
        .get(&CoupleId(id))
        .ok_or(AppError::CoupleNotFound)?;
    couple.delete_expense(ExpenseId(expense_id))?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /couples/{id}/settle - Record a settlement between partners.
async fn settle(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Json(request): Json<SettleRequest>,
) -> Result<StatusCode, AppError> {
    let couple = state
        .registry
        .get(&CoupleId(id))
        .ok_or(AppError::CoupleNotFound)?;
    let mut settlement = Settlement::new(
        SettlementId(request.id),
        couple.slot_of(UserId(request.paid_by))?,
        couple.slot_of(UserId(request.paid_to))?,
        request.amount,
        Utc::now(),
    );
    settlement.note = request.note;
    couple.record_settlement(settlement)?;
    Ok(StatusCode::CREATED)
}

/// GET /couples/{id}/balance - Recompute the balance summary.
async fn balance(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<BalanceResponse>, AppError> {
    let couple = state
        .registry
        .get(&CoupleId(id))
        .ok_or(AppError::CoupleNotFound)?;
    let report = couple.balance()?;
    Ok(Json(BalanceResponse {
        couple_id: id,
        summary: report.summary,
        all_settled: report.summary.all_settled(),
        settle_up: suggest_settlement(&report.summary),
        warnings: report.warnings,
    }))
}

/// POST /couples/{id}/goals - Create a savings goal.
async fn create_goal(
    State(state): State<AppState>,
    Path(id): Path<u32>,
    Json(request): Json<GoalRequest>,
) -> Result<(StatusCode, Json<GoalResponse>), AppError> {
    let couple = state
        .registry
        .get(&CoupleId(id))
        .ok_or(AppError::CoupleNotFound)?;
    couple.slot_of(UserId(request.user_id))?;
    let goal = SavingsGoal::new(
        GoalId(request.id),
        request.title,
        request.target_amount,
        request.deadline,
    )?;
    couple.create_goal(goal.clone())?;
    Ok((StatusCode::CREATED, Json(goal.into())))
}

/// POST /couples/{id}/goals/{goal_id}/contribute - Contribute to a goal.
async fn contribute(
    State(state): State<AppState>,
    Path((id, goal_id)): Path<(u32, u32)>,
    Json(request): Json<ContributeRequest>,
) -> Result<Json<GoalResponse>, AppError> {
    let couple = state
        .registry
        .get(&CoupleId(id))
        .ok_or(AppError::CoupleNotFound)?;
    let goal_id = GoalId(goal_id);
    couple.contribute(
        goal_id,
        Contribution {
            user_id: UserId(request.user_id),
            amount: request.amount,
            created_at: Utc::now(),
        },
    )?;
    let goal = couple.goal(goal_id).ok_or(LedgerError::GoalNotFound)?;
    Ok(Json(goal.into()))
}

/// GET /couples/{id}/goals - List savings goals with their progress.
async fn list_goals(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<Vec<GoalResponse>>, AppError> {
    let couple = state
        .registry
        .get(&CoupleId(id))
        .ok_or(AppError::CoupleNotFound)?;
    Ok(Json(couple.goals().into_iter().map(GoalResponse::from).collect()))
}

// === Router ===

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/couples/invite", post(invite))
        .route("/couples/{id}/accept", post(accept))
        .route("/couples/{id}/decline", post(decline))
        .route("/couples/{id}/expenses", post(add_expense))
        .route("/couples/{id}/expenses/{expense_id}", delete(delete_expense))
        .route("/couples/{id}/settle", post(settle))
        .route("/couples/{id}/balance", get(balance))
        .route("/couples/{id}/goals", post(create_goal).get(list_goals))
        .route("/couples/{id}/goals/{goal_id}/contribute", post(contribute))
        .with_state(state)
}

// === Main ===

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "splitmint=info,server=info".into()),
        )
        .init();

    let state = AppState {
        registry: Arc::new(CoupleRegistry::new()),
    };

    let app = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:3000").await.unwrap();
    info!("SplitMint API server running on http://127.0.0.1:3000");
    println!();
    println!("Endpoints:");
    println!("  POST   /couples/invite                     - Invite a partner");
    println!("  POST   /couples/:id/accept                 - Accept an invite");
    println!("  POST   /couples/:id/decline                - Decline an invite");
    println!("  POST   /couples/:id/expenses               - Add a shared expense");
    println!("  DELETE /couples/:id/expenses/:expense_id   - Delete a shared expense");
    println!("  POST   /couples/:id/settle                 - Record a settlement");
    println!("  GET    /couples/:id/balance                - Get the balance summary");
    println!("  POST   /couples/:id/goals                  - Create a savings goal");
    println!("  GET    /couples/:id/goals                  - List savings goals");
    println!("  POST   /couples/:id/goals/:goal_id/contribute - Contribute to a goal");

    axum::serve(listener, app).await.unwrap();
}
