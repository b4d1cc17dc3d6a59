//! Subscriber account repository
//!
//! PostgreSQL implementation of the `AccountStore` port. The account row and
//! its suspension history make up the aggregate; ledger entries and payments
//! are append-only tables read back for history queries.
//!
//! A unit of work is a transaction holding `SELECT ... FOR UPDATE` on the
//! account row. Concurrent writers of the same account queue on that row
//! lock; writers of different accounts never touch each other's rows.
//! Dropping a `PgAccountLock` without committing rolls the transaction back.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{AccountId, Currency, LedgerEntryId, Money, PaymentId, SuspensionId};
use domain_subscription::{
    Account, AccountEvent, AccountLock, AccountParts, AccountQuery, AccountStore, LedgerEntry,
    PaymentMethod, PaymentRecord, ServiceStatus, SubscriptionError, SuspensionEnd,
    SuspensionReason, SuspensionRecord,
};

use crate::error::DatabaseError;

const RECEIPT_CONSTRAINT: &str = "uq_account_payments_receipt";

const ACCOUNT_COLUMNS: &str = r#"
    account_id, holder_name, plan, monthly_price, currency, months_owed,
    advance_months_consumed, advance_credit_months, status, next_due_date,
    opened_at, updated_at, cancelled_at, cancelled_by, version
"#;

const SUSPENSION_COLUMNS: &str = r#"
    suspension_id, account_id, reason, notes, suspended_by, suspended_at,
    reactivated_by, reactivated_at, ended_by
"#;

/// Repository for subscriber accounts and their history
#[derive(Debug, Clone)]
pub struct PgAccountStore {
    pool: PgPool,
}

impl PgAccountStore {
    /// Creates a new PgAccountStore with the given connection pool
    ///
    /// # Arguments
    ///
    /// * `pool` - The PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn ensure_exists(&self, id: AccountId) -> Result<(), SubscriptionError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM subscriber_accounts WHERE account_id = $1)",
        )
        .bind(uuid(id))
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if exists {
            Ok(())
        } else {
            Err(SubscriptionError::not_found(id))
        }
    }
}

/// An account row locked for the lifetime of a transaction
pub struct PgAccountLock {
    tx: Transaction<'static, Postgres>,
    snapshot: Account,
}

#[async_trait]
impl AccountLock for PgAccountLock {
    fn account(&self) -> &Account {
        &self.snapshot
    }

    async fn has_receipt(&mut self, receipt_number: &str) -> Result<bool, SubscriptionError> {
        let used: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM account_payments WHERE account_id = $1 AND receipt_number = $2)",
        )
        .bind(uuid(self.snapshot.id()))
        .bind(receipt_number)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(DatabaseError::from)?;

        Ok(used)
    }

    #[instrument(skip(self, account, events), fields(account_id = %account.id(), events = events.len()))]
    async fn commit(self: Box<Self>, account: &Account, events: &[AccountEvent]) -> Result<(), SubscriptionError> {
        let PgAccountLock { mut tx, snapshot } = *self;
        if account.id() != snapshot.id() {
            return Err(SubscriptionError::storage(format!(
                "lock for {} cannot commit {}",
                snapshot.id(),
                account.id()
            )));
        }

        update_account(&mut tx, account).await?;
        append_history(&mut tx, events).await?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;

        debug!(version = account.version(), "Account committed");
        Ok(())
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    #[instrument(skip(self, account, events), fields(account_id = %account.id()))]
    async fn create(&self, account: &Account, events: &[AccountEvent]) -> Result<(), SubscriptionError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;

        insert_account(&mut tx, account).await?;
        for record in account.suspensions() {
            insert_suspension(&mut tx, record).await?;
        }
        append_history(&mut tx, events).await?;

        tx.commit()
            .await
            .map_err(|e| DatabaseError::TransactionFailed(e.to_string()))?;
        Ok(())
    }

    #[instrument(skip(self), fields(account_id = %id))]
    async fn get(&self, id: AccountId) -> Result<Account, SubscriptionError> {
        let mut conn = self.pool.acquire().await.map_err(DatabaseError::from)?;
        load_account(&mut conn, id, false).await
    }

    #[instrument(skip(self))]
    async fn list(&self, query: AccountQuery) -> Result<Vec<Account>, SubscriptionError> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
            FROM subscriber_accounts
            WHERE ($1::text IS NULL OR status = $1)
              AND (NOT $2 OR status <> 'cancelled')
            ORDER BY opened_at, account_id
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(query.status.map(|s| s.as_str()))
        .bind(query.exclude_cancelled)
        .bind(query.limit.map(i64::from))
        .bind(i64::from(query.offset.unwrap_or(0)))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        let ids: Vec<Uuid> = rows.iter().map(|r| r.account_id).collect();
        let suspension_rows = sqlx::query_as::<_, SuspensionRow>(&format!(
            r#"
            SELECT {SUSPENSION_COLUMNS}
            FROM account_suspensions
            WHERE account_id = ANY($1)
            ORDER BY suspended_at, suspension_id
            "#
        ))
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        let mut suspensions: HashMap<Uuid, Vec<SuspensionRecord>> = HashMap::new();
        for row in suspension_rows {
            let account_id = row.account_id;
            suspensions.entry(account_id).or_default().push(row.into_record()?);
        }

        rows.into_iter()
            .map(|row| {
                let history = suspensions.remove(&row.account_id).unwrap_or_default();
                row.into_account(history)
            })
            .collect()
    }

    #[instrument(skip(self), fields(account_id = %id))]
    async fn lock(&self, id: AccountId) -> Result<Box<dyn AccountLock>, SubscriptionError> {
        let mut tx = self.pool.begin().await.map_err(DatabaseError::from)?;
        let snapshot = load_account(&mut tx, id, true).await?;
        Ok(Box::new(PgAccountLock { tx, snapshot }))
    }

    #[instrument(skip(self), fields(account_id = %id))]
    async fn ledger_entries(&self, id: AccountId) -> Result<Vec<LedgerEntry>, SubscriptionError> {
        self.ensure_exists(id).await?;

        let rows = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT entry_id, account_id, requested_delta, applied_delta, reason, actor,
                   resulting_months_owed, advance_months, credit_applied, recorded_at
            FROM account_ledger_entries
            WHERE account_id = $1
            ORDER BY recorded_at, entry_id
            "#,
        )
        .bind(uuid(id))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        rows.into_iter()
            .map(|row| row.into_entry().map_err(SubscriptionError::from))
            .collect()
    }

    #[instrument(skip(self), fields(account_id = %id))]
    async fn payments(&self, id: AccountId) -> Result<Vec<PaymentRecord>, SubscriptionError> {
        self.ensure_exists(id).await?;

        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT payment_id, account_id, amount, currency, months_settled, months_deducted,
                   advance_months, receipt_number, method, paid_at, operation_number, notes,
                   contact, recorded_by, recorded_at
            FROM account_payments
            WHERE account_id = $1
            ORDER BY recorded_at, payment_id
            "#,
        )
        .bind(uuid(id))
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        rows.into_iter().map(PaymentRow::into_record).collect()
    }

    async fn health_check(&self) -> Result<(), SubscriptionError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        Ok(())
    }
}

// ============================================================================
// Statements
// ============================================================================

async fn load_account(conn: &mut PgConnection, id: AccountId, for_update: bool) -> Result<Account, SubscriptionError> {
    let lock_clause = if for_update { "FOR UPDATE" } else { "" };
    let row = sqlx::query_as::<_, AccountRow>(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM subscriber_accounts WHERE account_id = $1 {lock_clause}"
    ))
    .bind(uuid(id))
    .fetch_optional(&mut *conn)
    .await
    .map_err(DatabaseError::from)?
    .ok_or_else(|| SubscriptionError::not_found(id))?;

    let suspensions = sqlx::query_as::<_, SuspensionRow>(&format!(
        r#"
        SELECT {SUSPENSION_COLUMNS}
        FROM account_suspensions
        WHERE account_id = $1
        ORDER BY suspended_at, suspension_id
        "#
    ))
    .bind(uuid(id))
    .fetch_all(&mut *conn)
    .await
    .map_err(DatabaseError::from)?
    .into_iter()
    .map(SuspensionRow::into_record)
    .collect::<Result<Vec<_>, _>>()?;

    row.into_account(suspensions)
}

async fn insert_account(conn: &mut PgConnection, account: &Account) -> Result<(), SubscriptionError> {
    sqlx::query(
        r#"
        INSERT INTO subscriber_accounts (
            account_id, holder_name, plan, monthly_price, currency, months_owed,
            advance_months_consumed, advance_credit_months, status, next_due_date,
            opened_at, updated_at, cancelled_at, cancelled_by, version
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        "#,
    )
    .bind(uuid(account.id()))
    .bind(account.holder_name())
    .bind(account.plan())
    .bind(account.monthly_price().amount())
    .bind(account.currency().code())
    .bind(i64::from(account.months_owed()))
    .bind(i64::from(account.advance_months_consumed()))
    .bind(i64::from(account.advance_credit_months()))
    .bind(account.status().as_str())
    .bind(account.next_due_date())
    .bind(account.opened_at())
    .bind(account.updated_at())
    .bind(account.cancelled_at())
    .bind(account.cancelled_by())
    .bind(i64::from(account.version()))
    .execute(&mut *conn)
    .await
    .map_err(|e| match DatabaseError::from(e) {
        DatabaseError::DuplicateEntry(_) => DatabaseError::duplicate("Account", "id", account.id()),
        other => other,
    })?;
    Ok(())
}

async fn update_account(conn: &mut PgConnection, account: &Account) -> Result<(), SubscriptionError> {
    let result = sqlx::query(
        r#"
        UPDATE subscriber_accounts SET
            holder_name = $2,
            plan = $3,
            monthly_price = $4,
            currency = $5,
            months_owed = $6,
            advance_months_consumed = $7,
            advance_credit_months = $8,
            status = $9,
            next_due_date = $10,
            updated_at = $11,
            cancelled_at = $12,
            cancelled_by = $13,
            version = $14
        WHERE account_id = $1
        "#,
    )
    .bind(uuid(account.id()))
    .bind(account.holder_name())
    .bind(account.plan())
    .bind(account.monthly_price().amount())
    .bind(account.currency().code())
    .bind(i64::from(account.months_owed()))
    .bind(i64::from(account.advance_months_consumed()))
    .bind(i64::from(account.advance_credit_months()))
    .bind(account.status().as_str())
    .bind(account.next_due_date())
    .bind(account.updated_at())
    .bind(account.cancelled_at())
    .bind(account.cancelled_by())
    .bind(i64::from(account.version()))
    .execute(&mut *conn)
    .await
    .map_err(DatabaseError::from)?;

    if result.rows_affected() == 0 {
        return Err(SubscriptionError::not_found(account.id()));
    }
    Ok(())
}

/// Writes the history rows carried by committed events
async fn append_history(conn: &mut PgConnection, events: &[AccountEvent]) -> Result<(), SubscriptionError> {
    for event in events {
        match event {
            AccountEvent::LedgerAdjusted(entry) => insert_ledger_entry(conn, entry).await?,
            AccountEvent::PaymentRecorded(payment) => insert_payment(conn, payment).await?,
            AccountEvent::Suspended(record) => insert_suspension(conn, record).await?,
            AccountEvent::Reactivated(record) => close_suspension(conn, record).await?,
            AccountEvent::Cancelled {
                closed_suspension: Some(record),
                ..
            } => close_suspension(conn, record).await?,
            AccountEvent::AccountOpened { .. }
            | AccountEvent::ProfileUpdated { .. }
            | AccountEvent::Cancelled { .. } => {}
        }
    }
    Ok(())
}

async fn insert_ledger_entry(conn: &mut PgConnection, entry: &LedgerEntry) -> Result<(), SubscriptionError> {
    sqlx::query(
        r#"
        INSERT INTO account_ledger_entries (
            entry_id, account_id, requested_delta, applied_delta, reason, actor,
            resulting_months_owed, advance_months, credit_applied, recorded_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(*entry.id.as_uuid())
    .bind(uuid(entry.account_id))
    .bind(entry.requested_delta)
    .bind(entry.applied_delta)
    .bind(&entry.reason)
    .bind(&entry.actor)
    .bind(i64::from(entry.resulting_months_owed))
    .bind(i64::from(entry.advance_months))
    .bind(i64::from(entry.credit_applied))
    .bind(entry.recorded_at)
    .execute(&mut *conn)
    .await
    .map_err(DatabaseError::from)?;
    Ok(())
}

async fn insert_payment(conn: &mut PgConnection, payment: &PaymentRecord) -> Result<(), SubscriptionError> {
    sqlx::query(
        r#"
        INSERT INTO account_payments (
            payment_id, account_id, amount, currency, months_settled, months_deducted,
            advance_months, receipt_number, method, paid_at, operation_number, notes,
            contact, recorded_by, recorded_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        "#,
    )
    .bind(*payment.id.as_uuid())
    .bind(uuid(payment.account_id))
    .bind(payment.amount.amount())
    .bind(payment.amount.currency().code())
    .bind(i64::from(payment.months_settled))
    .bind(i64::from(payment.months_deducted))
    .bind(i64::from(payment.advance_months))
    .bind(&payment.receipt_number)
    .bind(payment.method.as_str())
    .bind(payment.paid_at)
    .bind(&payment.operation_number)
    .bind(&payment.notes)
    .bind(&payment.contact)
    .bind(&payment.recorded_by)
    .bind(payment.recorded_at)
    .execute(&mut *conn)
    .await
    .map_err(|e| {
        let receipt_taken = e
            .as_database_error()
            .and_then(|db| db.constraint())
            .is_some_and(|c| c == RECEIPT_CONSTRAINT);
        if receipt_taken {
            SubscriptionError::DuplicateReceipt {
                account_id: payment.account_id.to_string(),
                receipt_number: payment.receipt_number.clone(),
            }
        } else {
            DatabaseError::from(e).into()
        }
    })?;
    Ok(())
}

async fn insert_suspension(conn: &mut PgConnection, record: &SuspensionRecord) -> Result<(), SubscriptionError> {
    sqlx::query(
        r#"
        INSERT INTO account_suspensions (
            suspension_id, account_id, reason, notes, suspended_by, suspended_at,
            reactivated_by, reactivated_at, ended_by
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(*record.id.as_uuid())
    .bind(uuid(record.account_id))
    .bind(record.reason.code())
    .bind(&record.notes)
    .bind(&record.suspended_by)
    .bind(record.suspended_at)
    .bind(&record.reactivated_by)
    .bind(record.reactivated_at)
    .bind(record.ended_by.map(|e| e.as_str()))
    .execute(&mut *conn)
    .await
    .map_err(DatabaseError::from)?;
    Ok(())
}

/// Closes an open suspension row; a closed row is never updated again
async fn close_suspension(conn: &mut PgConnection, record: &SuspensionRecord) -> Result<(), SubscriptionError> {
    let result = sqlx::query(
        r#"
        UPDATE account_suspensions
        SET reactivated_by = $2, reactivated_at = $3, ended_by = $4
        WHERE suspension_id = $1 AND reactivated_at IS NULL
        "#,
    )
    .bind(*record.id.as_uuid())
    .bind(&record.reactivated_by)
    .bind(record.reactivated_at)
    .bind(record.ended_by.map(|e| e.as_str()))
    .execute(&mut *conn)
    .await
    .map_err(DatabaseError::from)?;

    if result.rows_affected() != 1 {
        return Err(SubscriptionError::storage(format!(
            "suspension {} is not open",
            record.id
        )));
    }
    Ok(())
}

// ============================================================================
// Rows
// ============================================================================

/// Database row for a subscriber account
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    pub account_id: Uuid,
    pub holder_name: String,
    pub plan: Option<String>,
    pub monthly_price: Decimal,
    pub currency: String,
    pub months_owed: i64,
    pub advance_months_consumed: i64,
    pub advance_credit_months: i64,
    pub status: String,
    pub next_due_date: NaiveDate,
    pub opened_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub version: i64,
}

impl AccountRow {
    /// Rebuilds the aggregate; rows that break an account invariant are rejected
    pub fn into_account(self, suspensions: Vec<SuspensionRecord>) -> Result<Account, SubscriptionError> {
        let currency: Currency = self
            .currency
            .parse()
            .map_err(|e| DatabaseError::bad_column("currency", e))?;
        let status: ServiceStatus = self
            .status
            .parse()
            .map_err(|e| DatabaseError::bad_column("status", e))?;

        Account::restore(AccountParts {
            id: AccountId::from_uuid(self.account_id),
            holder_name: self.holder_name,
            plan: self.plan,
            monthly_price: Money::new(self.monthly_price, currency),
            months_owed: to_u32("months_owed", self.months_owed)?,
            advance_months_consumed: to_u32("advance_months_consumed", self.advance_months_consumed)?,
            advance_credit_months: to_u32("advance_credit_months", self.advance_credit_months)?,
            status,
            next_due_date: self.next_due_date,
            suspensions,
            opened_at: self.opened_at,
            updated_at: self.updated_at,
            cancelled_at: self.cancelled_at,
            cancelled_by: self.cancelled_by,
            version: to_u32("version", self.version)?,
        })
    }
}

/// Database row for a suspension period
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SuspensionRow {
    pub suspension_id: Uuid,
    pub account_id: Uuid,
    pub reason: String,
    pub notes: Option<String>,
    pub suspended_by: String,
    pub suspended_at: DateTime<Utc>,
    pub reactivated_by: Option<String>,
    pub reactivated_at: Option<DateTime<Utc>>,
    pub ended_by: Option<String>,
}

impl SuspensionRow {
    pub fn into_record(self) -> Result<SuspensionRecord, DatabaseError> {
        let reason = SuspensionReason::parse(&self.reason).map_err(|e| DatabaseError::bad_column("reason", e))?;
        let ended_by = match self.ended_by.as_deref() {
            None => None,
            Some("reactivation") => Some(SuspensionEnd::Reactivation),
            Some("cancellation") => Some(SuspensionEnd::Cancellation),
            Some(other) => return Err(DatabaseError::bad_column("ended_by", other)),
        };

        Ok(SuspensionRecord {
            id: SuspensionId::from_uuid(self.suspension_id),
            account_id: AccountId::from_uuid(self.account_id),
            reason,
            notes: self.notes,
            suspended_by: self.suspended_by,
            suspended_at: self.suspended_at,
            reactivated_by: self.reactivated_by,
            reactivated_at: self.reactivated_at,
            ended_by,
        })
    }
}

/// Database row for a ledger entry
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LedgerRow {
    pub entry_id: Uuid,
    pub account_id: Uuid,
    pub requested_delta: i32,
    pub applied_delta: i32,
    pub reason: String,
    pub actor: String,
    pub resulting_months_owed: i64,
    pub advance_months: i64,
    pub credit_applied: i64,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerRow {
    pub fn into_entry(self) -> Result<LedgerEntry, DatabaseError> {
        Ok(LedgerEntry {
            id: LedgerEntryId::from_uuid(self.entry_id),
            account_id: AccountId::from_uuid(self.account_id),
            recorded_at: self.recorded_at,
            requested_delta: self.requested_delta,
            applied_delta: self.applied_delta,
            reason: self.reason,
            actor: self.actor,
            resulting_months_owed: to_u32("resulting_months_owed", self.resulting_months_owed)?,
            advance_months: to_u32("advance_months", self.advance_months)?,
            credit_applied: to_u32("credit_applied", self.credit_applied)?,
        })
    }
}

/// Database row for an applied payment
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub account_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub months_settled: i64,
    pub months_deducted: i64,
    pub advance_months: i64,
    pub receipt_number: String,
    pub method: String,
    pub paid_at: DateTime<Utc>,
    pub operation_number: Option<String>,
    pub notes: Option<String>,
    pub contact: Option<String>,
    pub recorded_by: String,
    pub recorded_at: DateTime<Utc>,
}

impl PaymentRow {
    pub fn into_record(self) -> Result<PaymentRecord, SubscriptionError> {
        let currency: Currency = self
            .currency
            .parse()
            .map_err(|e| DatabaseError::bad_column("currency", e))?;
        let method: PaymentMethod = self
            .method
            .parse()
            .map_err(|e| DatabaseError::bad_column("method", e))?;

        Ok(PaymentRecord {
            id: PaymentId::from_uuid(self.payment_id),
            account_id: AccountId::from_uuid(self.account_id),
            amount: Money::new(self.amount, currency),
            months_settled: to_u32("months_settled", self.months_settled)?,
            months_deducted: to_u32("months_deducted", self.months_deducted)?,
            advance_months: to_u32("advance_months", self.advance_months)?,
            receipt_number: self.receipt_number,
            method,
            paid_at: self.paid_at,
            operation_number: self.operation_number,
            notes: self.notes,
            contact: self.contact,
            recorded_by: self.recorded_by,
            recorded_at: self.recorded_at,
        })
    }
}

fn uuid(id: AccountId) -> Uuid {
    *id.as_uuid()
}

fn to_u32(column: &str, value: i64) -> Result<u32, DatabaseError> {
    u32::try_from(value).map_err(|e| DatabaseError::bad_column(column, e))
}
