//! Expense business logic - creation, approval workflow, deletion and listing.
//!
//! Every operation that can move money runs inside one database transaction,
//! so the ledger debit or credit and the expense row change commit or roll back
//! together. Role checks and the transition graph live in
//! [`crate::core::workflow`]; this module applies their decisions.

use crate::{
    core::{
        admission::{self, SufficiencyCheck},
        denomination::CurrencyBreakdown,
        ledger,
        workflow::{INITIAL_STATUS, PermissionTable, TransitionPlan, plan_transition},
    },
    entities::{
        Expense, ExpenseCategory, ExpenseStatus, ExpenseType, Priority, Role, cash_day, expense,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// Who is performing an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Officer id
    pub id: String,
    /// Role the officer acts in
    pub role: Role,
}

impl Actor {
    /// Creates an actor.
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}

/// Input for [`create_expense`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpense {
    /// Short title, must not be blank
    pub title: String,
    /// Optional longer description
    pub description: Option<String>,
    /// Requested amount, must be positive
    pub amount: i64,
    /// Expense category
    pub category: ExpenseCategory,
    /// Debit or credit
    pub expense_type: ExpenseType,
    /// Urgency
    pub priority: Priority,
    /// Business date; defaults to the creation date
    pub expense_date: Option<NaiveDate>,
    /// Approval chain names
    pub prepared_by: Option<String>,
    /// Approval chain names
    pub checked_by: Option<String>,
    /// Approval chain names
    pub passed_by: Option<String>,
    /// Optional note/coin composition; must add up to `amount`
    pub currency_notes: Option<CurrencyBreakdown>,
}

impl NewExpense {
    /// A debit of medium priority with no date, description or approval chain.
    pub fn new(title: impl Into<String>, amount: i64, category: ExpenseCategory) -> Self {
        Self {
            title: title.into(),
            description: None,
            amount,
            category,
            expense_type: ExpenseType::Debit,
            priority: Priority::Medium,
            expense_date: None,
            prepared_by: None,
            checked_by: None,
            passed_by: None,
            currency_notes: None,
        }
    }

    /// Sets the business date.
    #[must_use]
    pub const fn on(mut self, date: NaiveDate) -> Self {
        self.expense_date = Some(date);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::validation("Expense title cannot be empty"));
        }
        ledger::ensure_amount(self.amount)?;
        if let Some(notes) = &self.currency_notes {
            notes.ensure_total(self.amount)?;
        }
        Ok(())
    }

    /// Ledger day the expense will be charged to if created at `now`.
    pub(crate) fn ledger_date(&self, now: DateTime<Utc>) -> NaiveDate {
        self.expense_date.unwrap_or_else(|| now.date_naive())
    }
}

/// Criteria for [`list_expenses`]; `None` fields match everything
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    /// Only this status
    pub status: Option<ExpenseStatus>,
    /// Only this category
    pub category: Option<ExpenseCategory>,
    /// Only ledger days in this inclusive range
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

/// Result of [`create_expense`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedExpense {
    /// The stored expense, always `pending`
    pub expense: expense::Model,
    /// Admission result at creation time
    pub funds: SufficiencyCheck,
}

/// Result of [`transition_expense`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// The expense after the call
    pub expense: expense::Model,
    /// `false` when the expense was already in the requested status
    pub changed: bool,
    /// Ledger state after a debit, if one happened
    pub ledger: Option<cash_day::Model>,
}

/// Result of [`delete_expense`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedExpense {
    /// The expense as it was before deletion
    pub expense: expense::Model,
    /// Ledger state after the credit, if the expense had consumed cash
    pub ledger: Option<cash_day::Model>,
}

/// Creates a new `pending` expense after checking role and available cash.
///
/// Admission is checked against the expense's ledger day. An insufficient
/// result fails with `Error::InsufficientFunds` unless `proceed_anyway` is
/// set, in which case the expense is stored with `funds_override`.
///
/// # Errors
/// * `Error::Validation` / `Error::InvalidAmount` for bad input
/// * `Error::PermissionDenied` if the actor's role may not create expenses
/// * `Error::InsufficientFunds` when cash is short and not overridden
#[instrument(skip(db, permissions, new), fields(title = %new.title, amount = new.amount))]
pub async fn create_expense(
    db: &DatabaseConnection,
    permissions: &PermissionTable,
    new: NewExpense,
    actor: &Actor,
    proceed_anyway: bool,
    now: DateTime<Utc>,
) -> Result<CreatedExpense> {
    new.validate()?;
    permissions.ensure_create(actor.role)?;

    let ledger_date = new.ledger_date(now);
    let currency_notes = new
        .currency_notes
        .as_ref()
        .map(CurrencyBreakdown::to_json)
        .transpose()?;

    let txn = db.begin().await?;

    let funds = admission::check_sufficient_cash(&txn, ledger_date, new.amount).await?;
    if !proceed_anyway {
        funds.into_result()?;
    }

    let expense = expense::ActiveModel {
        title: Set(new.title.trim().to_string()),
        description: Set(new.description),
        amount: Set(new.amount),
        category: Set(new.category),
        expense_type: Set(new.expense_type),
        priority: Set(new.priority),
        expense_date: Set(new.expense_date),
        status: Set(INITIAL_STATUS),
        prepared_by: Set(new.prepared_by),
        checked_by: Set(new.checked_by),
        passed_by: Set(new.passed_by),
        created_by_id: Set(actor.id.clone()),
        created_by_role: Set(actor.role),
        approved_by_id: Set(None),
        approved_at: Set(None),
        paid_at: Set(None),
        rejected_at: Set(None),
        funds_override: Set(!funds.sufficient),
        currency_notes: Set(currency_notes),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    if expense.funds_override {
        warn!(
            "Expense {} created by {} despite shortfall of {} on {}",
            expense.id, actor.id, funds.shortfall, ledger_date
        );
    } else {
        info!(
            "Expense {} created by {} for {} on {}",
            expense.id, actor.id, expense.amount, ledger_date
        );
    }

    Ok(CreatedExpense { expense, funds })
}

/// Retrieves an expense by id.
pub async fn get_expense_by_id<C>(db: &C, id: i64) -> Result<Option<expense::Model>>
where
    C: ConnectionTrait,
{
    Expense::find_by_id(id).one(db).await.map_err(Into::into)
}

async fn require_expense<C>(db: &C, id: i64) -> Result<expense::Model>
where
    C: ConnectionTrait,
{
    get_expense_by_id(db, id)
        .await?
        .ok_or(Error::ExpenseNotFound { id })
}

/// Moves an expense to `target`, debiting the ledger when it is approved.
///
/// Requesting the status the expense is already in changes nothing. The
/// status update is guarded on the status that was read, so two concurrent
/// approvals cannot both debit.
///
/// # Errors
/// * `Error::ExpenseNotFound` if no expense has `id`
/// * `Error::InvalidTransition` for an edge outside the workflow graph
/// * `Error::PermissionDenied` if the actor's role may not take the edge
/// * `Error::CashDayNotFound` when approving against a day with no ledger
/// * `Error::Conflict` if the expense changed concurrently
#[instrument(skip(db, permissions, actor), fields(actor = %actor.id, role = %actor.role))]
pub async fn transition_expense(
    db: &DatabaseConnection,
    permissions: &PermissionTable,
    id: i64,
    target: ExpenseStatus,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome> {
    let txn = db.begin().await?;

    let current = require_expense(&txn, id).await?;
    let (to, debit) = match plan_transition(permissions, actor.role, current.status, target)? {
        TransitionPlan::Unchanged => {
            info!("Expense {} already {}, nothing to do", id, target);
            return Ok(TransitionOutcome {
                expense: current,
                changed: false,
                ledger: None,
            });
        }
        TransitionPlan::Move { to, debit } => (to, debit),
    };

    let ledger_date = current.ledger_date();
    let ledger = if debit {
        Some(ledger::debit(&txn, ledger_date, current.amount, id, now).await?)
    } else {
        None
    };

    let mut changes = expense::ActiveModel {
        status: Set(to),
        updated_at: Set(now),
        ..Default::default()
    };
    match to {
        ExpenseStatus::Approved => {
            changes.approved_by_id = Set(Some(actor.id.clone()));
            changes.approved_at = Set(Some(now));
        }
        ExpenseStatus::Paid => changes.paid_at = Set(Some(now)),
        ExpenseStatus::Rejected => changes.rejected_at = Set(Some(now)),
        ExpenseStatus::Pending => {}
    }

    let result = Expense::update_many()
        .set(changes)
        .filter(expense::Column::Id.eq(id))
        .filter(expense::Column::Status.eq(current.status))
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::Conflict {
            date: ledger_date,
            detail: format!("expense {id} is no longer '{}'", current.status),
        });
    }

    let expense = require_expense(&txn, id).await?;
    txn.commit().await?;

    info!(
        "Expense {} moved from {} to {} by {}",
        id, current.status, to, actor.id
    );
    Ok(TransitionOutcome {
        expense,
        changed: true,
        ledger,
    })
}

/// Deletes an expense, crediting the ledger back if it had been approved or paid.
///
/// # Errors
/// * `Error::PermissionDenied` if the actor's role may not delete expenses
/// * `Error::ExpenseNotFound` if no expense has `id`
#[instrument(skip(db, permissions, actor), fields(actor = %actor.id, role = %actor.role))]
pub async fn delete_expense(
    db: &DatabaseConnection,
    permissions: &PermissionTable,
    id: i64,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<DeletedExpense> {
    permissions.ensure_delete(actor.role)?;

    let txn = db.begin().await?;

    let expense = require_expense(&txn, id).await?;
    let ledger_date = expense.ledger_date();

    // Reverse the debit before the row disappears
    let ledger = if expense.status.consumes_cash() {
        Some(ledger::credit(&txn, ledger_date, expense.amount, id, now).await?)
    } else {
        None
    };

    let result = Expense::delete_many()
        .filter(expense::Column::Id.eq(id))
        .filter(expense::Column::Status.eq(expense.status))
        .exec(&txn)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::Conflict {
            date: ledger_date,
            detail: format!("expense {id} changed while being deleted"),
        });
    }

    txn.commit().await?;

    info!(
        "Expense {} ({}) deleted by {}{}",
        id,
        expense.status,
        actor.id,
        if ledger.is_some() {
            ", ledger credited"
        } else {
            ""
        }
    );
    Ok(DeletedExpense { expense, ledger })
}

/// Lists expenses matching `filter`, newest first.
///
/// The date range applies to each expense's ledger day, so undated expenses
/// are matched on their creation date.
pub async fn list_expenses<C>(db: &C, filter: &ExpenseFilter) -> Result<Vec<expense::Model>>
where
    C: ConnectionTrait,
{
    let mut query = Expense::find();
    if let Some(status) = filter.status {
        query = query.filter(expense::Column::Status.eq(status));
    }
    if let Some(category) = filter.category {
        query = query.filter(expense::Column::Category.eq(category));
    }
    if let Some((start, end)) = filter.date_range {
        query = query.filter(ledger_day_between(start, end));
    }

    let expenses = query
        .order_by_desc(expense::Column::CreatedAt)
        .order_by_desc(expense::Column::Id)
        .all(db)
        .await?;

    // Timestamps compare as stored text in SQL; the ledger day is exact
    Ok(match filter.date_range {
        Some((start, end)) => expenses
            .into_iter()
            .filter(|e| (start..=end).contains(&e.ledger_date()))
            .collect(),
        None => expenses,
    })
}

/// `expense_date` in `[start, end]`, or no date and created on one of those days.
fn ledger_day_between(start: NaiveDate, end: NaiveDate) -> Condition {
    let mut undated = Condition::all()
        .add(expense::Column::ExpenseDate.is_null())
        .add(expense::Column::CreatedAt.gte(start.and_time(NaiveTime::MIN).and_utc()));
    if let Some(next) = end.succ_opt() {
        let next_midnight = next.and_time(NaiveTime::MIN).and_utc();
        undated = undated.add(expense::Column::CreatedAt.lt(next_midnight));
    }

    Condition::any()
        .add(expense::Column::ExpenseDate.between(start, end))
        .add(undated)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::denomination::DenominationTable;
    use crate::test_utils::*;
    use chrono::Duration;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_create_expense_validation() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let permissions = PermissionTable::default();

        let blank = NewExpense::new("  ", 100, ExpenseCategory::Travel);
        let result = create_expense(&db, &permissions, blank, &admin(), false, test_now()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        let zero = NewExpense::new("Taxi", 0, ExpenseCategory::Travel);
        let result = create_expense(&db, &permissions, zero, &admin(), false, test_now()).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: 0 })));

        let huge = NewExpense::new("Taxi", ledger::MAX_AMOUNT + 1, ExpenseCategory::Travel);
        let result = create_expense(&db, &permissions, huge, &admin(), true, test_now()).await;
        assert!(matches!(
            result,
            Err(Error::InvalidAmount { amount }) if amount == ledger::MAX_AMOUNT + 1
        ));

        let mut mismatched = NewExpense::new("Taxi", 450, ExpenseCategory::Travel);
        mismatched.currency_notes = Some(CurrencyBreakdown::from_counts(
            &DenominationTable::default(),
            [("note_200", 2)],
        )?);
        let result =
            create_expense(&db, &permissions, mismatched, &admin(), false, test_now()).await;
        assert!(matches!(result, Err(Error::Validation { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_officer_cannot_create() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let new = NewExpense::new("Pens", 50, ExpenseCategory::OfficeSupplies);

        let result = create_expense(
            &db,
            &PermissionTable::default(),
            new,
            &officer(),
            false,
            test_now(),
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::PermissionDenied {
                role: Role::Officer,
                ..
            })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_expense_is_pending_and_leaves_ledger() -> Result<()> {
        let db = setup_with_cash_day(10_000).await?;

        let created = create_test_expense(&db, 9_000).await?;

        assert_eq!(created.expense.status, ExpenseStatus::Pending);
        assert_eq!(created.expense.created_by_id, "manager-1");
        assert_eq!(created.expense.created_by_role, Role::Manager);
        assert!(!created.expense.funds_override);
        assert!(created.funds.sufficient);
        assert_eq!(ledger::available_amount(&db, test_date()).await?, 10_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_expense_insufficient_funds() -> Result<()> {
        let db = setup_with_cash_day(500).await?;
        let new = NewExpense::new("Printer", 800, ExpenseCategory::OfficeSupplies).on(test_date());

        let result = create_expense(
            &db,
            &PermissionTable::default(),
            new,
            &manager(),
            false,
            test_now(),
        )
        .await;
        assert!(matches!(
            result,
            Err(Error::InsufficientFunds {
                available: 500,
                required: 800,
                shortfall: 300
            })
        ));
        assert!(list_expenses(&db, &ExpenseFilter::default()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_proceed_anyway_records_override() -> Result<()> {
        let db = setup_with_cash_day(500).await?;
        let new = NewExpense::new("Printer", 800, ExpenseCategory::OfficeSupplies).on(test_date());

        let created = create_expense(
            &db,
            &PermissionTable::default(),
            new,
            &manager(),
            true,
            test_now(),
        )
        .await?;
        assert!(created.expense.funds_override);
        assert_eq!(created.funds.shortfall, 300);
        assert_eq!(created.expense.status, ExpenseStatus::Pending);
        Ok(())
    }

    #[tokio::test]
    async fn test_undated_expense_uses_creation_day() -> Result<()> {
        let db = setup_with_cash_day(1_000).await?;
        let new = NewExpense::new("Tea", 120, ExpenseCategory::Refreshments);

        let created = create_expense(
            &db,
            &PermissionTable::default(),
            new,
            &admin(),
            false,
            test_now(),
        )
        .await?;
        assert!(created.expense.expense_date.is_none());
        assert_eq!(created.expense.ledger_date(), test_date());
        assert!(created.funds.sufficient);
        Ok(())
    }

    #[tokio::test]
    async fn test_approve_debits_once() -> Result<()> {
        let db = setup_with_cash_day(10_000).await?;
        let permissions = PermissionTable::default();
        let id = create_test_expense(&db, 9_000).await?.expense.id;

        let approved =
            transition_expense(&db, &permissions, id, ExpenseStatus::Approved, &admin(), test_now())
                .await?;
        assert!(approved.changed);
        assert_eq!(approved.expense.status, ExpenseStatus::Approved);
        assert_eq!(approved.expense.approved_by_id.as_deref(), Some("admin-1"));
        assert_eq!(approved.expense.approved_at, Some(test_now()));
        assert_eq!(approved.ledger.unwrap().available_amount, 1_000);

        let again =
            transition_expense(&db, &permissions, id, ExpenseStatus::Approved, &admin(), test_now())
                .await?;
        assert!(!again.changed);
        assert!(again.ledger.is_none());
        assert_eq!(ledger::available_amount(&db, test_date()).await?, 1_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_pay_and_reject_leave_ledger() -> Result<()> {
        let db = setup_with_cash_day(10_000).await?;
        let permissions = PermissionTable::default();
        let paid_id = create_test_expense(&db, 2_000).await?.expense.id;
        let rejected_id = create_test_expense(&db, 3_000).await?.expense.id;

        transition_expense(&db, &permissions, paid_id, ExpenseStatus::Approved, &admin(), test_now())
            .await?;
        let paid =
            transition_expense(&db, &permissions, paid_id, ExpenseStatus::Paid, &admin(), test_now())
                .await?;
        assert!(paid.ledger.is_none());
        assert_eq!(paid.expense.paid_at, Some(test_now()));

        let rejected = transition_expense(
            &db,
            &permissions,
            rejected_id,
            ExpenseStatus::Rejected,
            &admin(),
            test_now(),
        )
        .await?;
        assert_eq!(rejected.expense.rejected_at, Some(test_now()));
        assert!(rejected.expense.approved_at.is_none());

        assert_eq!(ledger::available_amount(&db, test_date()).await?, 8_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_transition_errors() -> Result<()> {
        let db = setup_with_cash_day(10_000).await?;
        let permissions = PermissionTable::default();
        let id = create_test_expense(&db, 100).await?.expense.id;

        let missing =
            transition_expense(&db, &permissions, 999, ExpenseStatus::Approved, &admin(), test_now())
                .await;
        assert!(matches!(missing, Err(Error::ExpenseNotFound { id: 999 })));

        let skip =
            transition_expense(&db, &permissions, id, ExpenseStatus::Paid, &admin(), test_now())
                .await;
        assert!(matches!(skip, Err(Error::InvalidTransition { .. })));

        let denied = transition_expense(
            &db,
            &permissions,
            id,
            ExpenseStatus::Approved,
            &manager(),
            test_now(),
        )
        .await;
        assert!(matches!(denied, Err(Error::PermissionDenied { .. })));

        // Failed attempts leave the expense and ledger untouched
        let expense = get_expense_by_id(&db, id).await?.unwrap();
        assert_eq!(expense.status, ExpenseStatus::Pending);
        assert_eq!(ledger::available_amount(&db, test_date()).await?, 10_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_approve_without_ledger_rolls_back() -> Result<()> {
        let db = setup_test_db().await?;
        let new = NewExpense::new("Courier", 300, ExpenseCategory::Communication).on(test_date());
        let id = create_expense(
            &db,
            &PermissionTable::default(),
            new,
            &admin(),
            true,
            test_now(),
        )
        .await?
        .expense
        .id;

        let result = transition_expense(
            &db,
            &PermissionTable::default(),
            id,
            ExpenseStatus::Approved,
            &admin(),
            test_now(),
        )
        .await;
        assert!(matches!(result, Err(Error::CashDayNotFound { .. })));

        let expense = get_expense_by_id(&db, id).await?.unwrap();
        assert_eq!(expense.status, ExpenseStatus::Pending);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_credits_consumed_cash() -> Result<()> {
        let db = setup_with_cash_day(10_000).await?;
        let permissions = PermissionTable::default();
        let approved_id = create_test_expense(&db, 4_000).await?.expense.id;
        let pending_id = create_test_expense(&db, 1_000).await?.expense.id;

        transition_expense(
            &db,
            &permissions,
            approved_id,
            ExpenseStatus::Approved,
            &admin(),
            test_now(),
        )
        .await?;
        assert_eq!(ledger::available_amount(&db, test_date()).await?, 6_000);

        let deleted = delete_expense(&db, &permissions, approved_id, &admin(), test_now()).await?;
        assert_eq!(deleted.expense.status, ExpenseStatus::Approved);
        assert_eq!(deleted.ledger.unwrap().available_amount, 10_000);

        let deleted = delete_expense(&db, &permissions, pending_id, &admin(), test_now()).await?;
        assert!(deleted.ledger.is_none());

        assert!(get_expense_by_id(&db, approved_id).await?.is_none());
        assert_eq!(ledger::available_amount(&db, test_date()).await?, 10_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_requires_permission() -> Result<()> {
        let db = setup_with_cash_day(10_000).await?;
        let id = create_test_expense(&db, 100).await?.expense.id;

        let result =
            delete_expense(&db, &PermissionTable::default(), id, &manager(), test_now()).await;
        assert!(matches!(result, Err(Error::PermissionDenied { .. })));
        assert!(get_expense_by_id(&db, id).await?.is_some());

        let missing =
            delete_expense(&db, &PermissionTable::default(), 404, &admin(), test_now()).await;
        assert!(matches!(missing, Err(Error::ExpenseNotFound { id: 404 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_expenses_filters() -> Result<()> {
        let db = setup_with_cash_day(10_000).await?;
        let permissions = PermissionTable::default();
        let later = test_date().succ_opt().unwrap();

        let travel = NewExpense::new("Bus", 40, ExpenseCategory::Travel).on(test_date());
        let travel_id = create_expense(&db, &permissions, travel, &admin(), false, test_now())
            .await?
            .expense
            .id;
        let rent = NewExpense::new("Rent", 100, ExpenseCategory::Rent).on(later);
        create_expense(&db, &permissions, rent, &admin(), true, test_now()).await?;

        transition_expense(
            &db,
            &permissions,
            travel_id,
            ExpenseStatus::Approved,
            &admin(),
            test_now(),
        )
        .await?;

        let all = list_expenses(&db, &ExpenseFilter::default()).await?;
        assert_eq!(all.len(), 2);
        assert!(all[0].id > all[1].id);

        let approved = list_expenses(
            &db,
            &ExpenseFilter {
                status: Some(ExpenseStatus::Approved),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].id, travel_id);

        let rent_only = list_expenses(
            &db,
            &ExpenseFilter {
                category: Some(ExpenseCategory::Rent),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(rent_only.len(), 1);

        let later_only = list_expenses(
            &db,
            &ExpenseFilter {
                date_range: Some((later, later)),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(later_only.len(), 1);
        assert_eq!(later_only[0].category, ExpenseCategory::Rent);
        Ok(())
    }

    #[tokio::test]
    async fn test_date_range_is_filtered_in_sql() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([Vec::<expense::Model>::new()])
            .into_connection();

        let filter = ExpenseFilter {
            date_range: Some((test_date(), test_date())),
            ..Default::default()
        };
        assert!(list_expenses(&db, &filter).await?.is_empty());

        let log = format!("{:?}", db.into_transaction_log());
        assert!(log.contains("BETWEEN"), "{log}");
        assert!(log.contains("IS NULL"), "{log}");
        Ok(())
    }

    #[tokio::test]
    async fn test_undated_expenses_match_on_creation_day() -> Result<()> {
        let db = setup_test_db().await?;
        let permissions = PermissionTable::default();
        let midnight = test_date().and_time(NaiveTime::MIN).and_utc();
        let next_midnight = midnight + Duration::days(1);

        let mut ids = Vec::new();
        for (title, created_at) in [
            ("Late taxi", midnight - Duration::seconds(1)),
            ("Early taxi", midnight),
            ("Night taxi", next_midnight - Duration::seconds(1)),
            ("Next taxi", next_midnight),
        ] {
            let new = NewExpense::new(title, 50, ExpenseCategory::Travel);
            let created = create_expense(&db, &permissions, new, &admin(), true, created_at).await?;
            ids.push(created.expense.id);
        }
        // Dated inside the range although entered the day before
        let dated = NewExpense::new("Booked taxi", 70, ExpenseCategory::Travel).on(test_date());
        let entered = midnight - Duration::hours(6);
        let dated_id = create_expense(&db, &permissions, dated, &admin(), true, entered)
            .await?
            .expense
            .id;

        let listed: Vec<_> = list_expenses(
            &db,
            &ExpenseFilter {
                date_range: Some((test_date(), test_date())),
                ..Default::default()
            },
        )
        .await?
        .into_iter()
        .map(|e| e.id)
        .collect();

        assert_eq!(listed.len(), 3);
        assert!(listed.contains(&ids[1]));
        assert!(listed.contains(&ids[2]));
        assert!(listed.contains(&dated_id));
        Ok(())
    }
}
