use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};
use uuid::Uuid;

use tillstack_cash::{
    CashRegister, CashRegisterId, CloseRegister, Expense, ExpenseId, ExpenseInput, OpenRegister,
    RegisterSummary, ensure_none_open, group_by_method,
};
use tillstack_core::{DomainError, Money, Page, PageRequest, TenantId, UserId};

use super::{Listing, PostgresPosStore, commit, count, found, limit_offset, rows};
use crate::error::map_sqlx_error;
use crate::{CashStore, ListQuery, StoreError, StoreResult};

pub(super) const REGISTER_COLUMNS: &str = "id, company_id, user_id, opened_at, closed_at, \
     opening_amount, closing_amount, total_sales, total_expenses, notes";

const EXPENSE_COLUMNS: &str = "id, company_id, cash_register_id, user_id, amount, description, \
     notes, date, created_at, updated_at";

const EXPENSES: Listing = Listing {
    columns: EXPENSE_COLUMNS,
    from: "FROM expenses WHERE company_id = $1 AND deleted_at IS NULL \
           AND ($2::text IS NULL OR description ILIKE $2 OR notes ILIKE $2)",
    order: "created_at DESC, id DESC",
};

/// The company's open register, locked when `for_update`.
pub(super) async fn open_register_of(
    conn: &mut PgConnection,
    tenant: TenantId,
    for_update: bool,
) -> StoreResult<Option<CashRegister>> {
    let lock = if for_update { "FOR UPDATE" } else { "" };
    let row = sqlx::query(&format!(
        "SELECT {REGISTER_COLUMNS} FROM cash_registers \
         WHERE company_id = $1 AND closed_at IS NULL {lock}"
    ))
    .bind(tenant.as_uuid())
    .fetch_optional(conn)
    .await
    .map_err(|e| map_sqlx_error("open_register_of", e))?;
    row.map(|r| rows::register(&r))
        .transpose()
        .map_err(|e| map_sqlx_error("open_register_of", e))
}

/// Lock registers `ids` of `tenant` in id order.
pub(super) async fn lock_registers(
    conn: &mut PgConnection,
    tenant: TenantId,
    ids: &[Uuid],
) -> StoreResult<BTreeMap<CashRegisterId, CashRegister>> {
    let records = sqlx::query(&format!(
        "SELECT {REGISTER_COLUMNS} FROM cash_registers \
         WHERE id = ANY($1) AND company_id = $2 ORDER BY id FOR UPDATE"
    ))
    .bind(ids)
    .bind(tenant.as_uuid())
    .fetch_all(conn)
    .await
    .map_err(|e| map_sqlx_error("lock_registers", e))?;
    let registers = rows::all(&records, rows::register).map_err(|e| map_sqlx_error("lock_registers", e))?;
    Ok(registers.into_iter().map(|r| (r.id, r)).collect())
}

/// Write back the running totals of a locked register.
pub(super) async fn save_totals(conn: &mut PgConnection, register: &CashRegister) -> StoreResult<()> {
    sqlx::query("UPDATE cash_registers SET total_sales = $2, total_expenses = $3 WHERE id = $1")
        .bind(register.id.as_uuid())
        .bind(register.total_sales.cents())
        .bind(register.total_expenses.cents())
        .execute(conn)
        .await
        .map_err(|e| map_sqlx_error("save_register_totals", e))?;
    Ok(())
}

async fn summarize(pool: &PgPool, register: CashRegister) -> StoreResult<RegisterSummary> {
    let records = sqlx::query(
        r#"
        SELECT s.payment_method_id, pm.name AS payment_method_name,
               SUM(s.total)::BIGINT AS total, COUNT(*) AS sales_count
        FROM sales s
        LEFT JOIN payment_methods pm ON pm.id = s.payment_method_id
        WHERE s.cash_register_id = $1 AND s.annulled_at IS NULL
        GROUP BY s.payment_method_id, pm.name
        "#,
    )
    .bind(register.id.as_uuid())
    .fetch_all(pool)
    .await
    .map_err(|e| map_sqlx_error("register_summary", e))?;

    let grouped = rows::all(&records, rows::method_total).map_err(|e| map_sqlx_error("register_summary", e))?;
    let sales_count: u64 = grouped.iter().map(|(n, _)| count(*n)).sum();
    let totals = grouped.into_iter().map(|(_, total)| total);

    let expenses: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM expenses \
         WHERE cash_register_id = $1 AND deleted_at IS NULL",
    )
    .bind(register.id.as_uuid())
    .fetch_one(pool)
    .await
    .map_err(|e| map_sqlx_error("register_summary", e))?;

    Ok(RegisterSummary::new(
        register,
        sales_count,
        group_by_method(totals)?,
        Money::from_cents(expenses),
    )?)
}

async fn lock_expense(conn: &mut PgConnection, tenant: TenantId, id: ExpenseId) -> StoreResult<Expense> {
    let row = sqlx::query(&format!(
        "SELECT {EXPENSE_COLUMNS} FROM expenses \
         WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL FOR UPDATE"
    ))
    .bind(id.as_uuid())
    .bind(tenant.as_uuid())
    .fetch_optional(conn)
    .await
    .map_err(|e| map_sqlx_error("lock_expense", e))?;
    let row = found(row, "expense")?;
    rows::expense(&row).map_err(|e| map_sqlx_error("lock_expense", e))
}

fn missing_register() -> StoreError {
    DomainError::field("cash_register_id", "does not exist").into()
}

#[async_trait]
impl CashStore for PostgresPosStore {
    #[instrument(skip(self, input), fields(tenant_id = %tenant), err)]
    async fn open_register(
        &self,
        tenant: TenantId,
        actor: UserId,
        input: OpenRegister,
        now: DateTime<Utc>,
    ) -> StoreResult<CashRegister> {
        let input = input.validated()?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        ensure_none_open(open_register_of(&mut tx, tenant, true).await?.as_ref())?;

        let register = CashRegister::open(tenant, actor, input, now);
        sqlx::query(
            r#"
            INSERT INTO cash_registers (
                id, company_id, user_id, opened_at, opening_amount, total_sales, total_expenses, notes
            )
            VALUES ($1, $2, $3, $4, $5, 0, 0, $6)
            "#,
        )
        .bind(register.id.as_uuid())
        .bind(tenant.as_uuid())
        .bind(actor.as_uuid())
        .bind(now)
        .bind(register.opening_amount.cents())
        .bind(&register.notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("open_register", e))?;

        commit(tx, "open_register").await?;
        info!(register_id = %register.id, "cash register opened");
        Ok(register)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn current_register(&self, tenant: TenantId) -> StoreResult<Option<RegisterSummary>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        match open_register_of(&mut conn, tenant, false).await? {
            Some(register) => Ok(Some(summarize(&self.pool, register).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn register_summary(&self, tenant: TenantId, id: CashRegisterId) -> StoreResult<RegisterSummary> {
        let row = sqlx::query(&format!(
            "SELECT {REGISTER_COLUMNS} FROM cash_registers WHERE id = $1 AND company_id = $2"
        ))
        .bind(id.as_uuid())
        .bind(tenant.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("register_summary", e))?;
        let row = found(row, "cash register")?;
        let register = rows::register(&row).map_err(|e| map_sqlx_error("register_summary", e))?;
        summarize(&self.pool, register).await
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant), err)]
    async fn close_register(
        &self,
        tenant: TenantId,
        id: CashRegisterId,
        input: CloseRegister,
        now: DateTime<Utc>,
    ) -> StoreResult<CashRegister> {
        let input = input.validated()?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        let mut registers = lock_registers(&mut tx, tenant, &[*id.as_uuid()]).await?;
        let mut register = found(registers.remove(&id), "cash register")?;
        register.close(input, now)?;

        sqlx::query("UPDATE cash_registers SET closed_at = $2, closing_amount = $3 WHERE id = $1")
            .bind(register.id.as_uuid())
            .bind(register.closed_at)
            .bind(register.closing_amount.map(Money::cents))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("close_register", e))?;

        commit(tx, "close_register").await?;
        info!(
            register_id = %register.id,
            closing_amount = ?register.closing_amount.map(Money::cents),
            "cash register closed"
        );
        Ok(register)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn register_history(&self, tenant: TenantId, page: PageRequest) -> StoreResult<Page<RegisterSummary>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM cash_registers WHERE company_id = $1 AND closed_at IS NOT NULL",
        )
        .bind(tenant.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("register_history", e))?;

        let (limit, offset) = limit_offset(page);
        let records = sqlx::query(&format!(
            "SELECT {REGISTER_COLUMNS} FROM cash_registers \
             WHERE company_id = $1 AND closed_at IS NOT NULL \
             ORDER BY closed_at DESC, id DESC LIMIT $2 OFFSET $3"
        ))
        .bind(tenant.as_uuid())
        .bind(limit)
        .bind(offset)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("register_history", e))?;
        let registers = rows::all(&records, rows::register).map_err(|e| map_sqlx_error("register_history", e))?;

        let mut summaries = Vec::with_capacity(registers.len());
        for register in registers {
            summaries.push(summarize(&self.pool, register).await?);
        }
        Ok(Page::new(summaries, count(total), page))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn list_expenses(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<Expense>> {
        EXPENSES
            .fetch(&self.pool, tenant, query, rows::expense, "list_expenses")
            .await
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn get_expense(&self, tenant: TenantId, id: ExpenseId) -> StoreResult<Expense> {
        let row = sqlx::query(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1 AND company_id = $2 AND deleted_at IS NULL"
        ))
        .bind(id.as_uuid())
        .bind(tenant.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_expense", e))?;
        let row = found(row, "expense")?;
        rows::expense(&row).map_err(|e| map_sqlx_error("get_expense", e))
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant), err)]
    async fn create_expense(
        &self,
        tenant: TenantId,
        actor: UserId,
        input: ExpenseInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Expense> {
        let input = input.validated()?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        let mut registers = lock_registers(&mut tx, tenant, &[*input.cash_register_id.as_uuid()]).await?;
        let mut register = registers
            .remove(&input.cash_register_id)
            .ok_or_else(missing_register)?;

        let expense = Expense::post(&mut register, actor, input, now)?;
        save_totals(&mut tx, &register).await?;
        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, company_id, cash_register_id, user_id, amount, description, notes, date,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8, $8)
            "#,
        )
        .bind(expense.id.as_uuid())
        .bind(tenant.as_uuid())
        .bind(expense.cash_register_id.as_uuid())
        .bind(actor.as_uuid())
        .bind(expense.amount.cents())
        .bind(&expense.description)
        .bind(&expense.notes)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("create_expense", e))?;

        commit(tx, "create_expense").await?;
        Ok(expense)
    }

    #[instrument(skip(self, input), fields(tenant_id = %tenant), err)]
    async fn update_expense(
        &self,
        tenant: TenantId,
        id: ExpenseId,
        input: ExpenseInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Expense> {
        let input = input.validated()?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        let mut expense = lock_expense(&mut tx, tenant, id).await?;

        let ids = [*expense.cash_register_id.as_uuid(), *input.cash_register_id.as_uuid()];
        let mut registers = lock_registers(&mut tx, tenant, &ids).await?;
        let mut current = registers
            .remove(&expense.cash_register_id)
            .ok_or_else(|| StoreError::Database("expense without register".to_string()))?;

        if input.cash_register_id == current.id {
            expense.rebook(input, &mut current, None, now)?;
            save_totals(&mut tx, &current).await?;
        } else {
            let mut target = registers
                .remove(&input.cash_register_id)
                .ok_or_else(missing_register)?;
            expense.rebook(input, &mut current, Some(&mut target), now)?;
            save_totals(&mut tx, &current).await?;
            save_totals(&mut tx, &target).await?;
        }

        sqlx::query(
            r#"
            UPDATE expenses
            SET cash_register_id = $2, amount = $3, description = $4, notes = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(expense.id.as_uuid())
        .bind(expense.cash_register_id.as_uuid())
        .bind(expense.amount.cents())
        .bind(&expense.description)
        .bind(&expense.notes)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_expense", e))?;

        commit(tx, "update_expense").await?;
        Ok(expense)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant), err)]
    async fn delete_expense(&self, tenant: TenantId, id: ExpenseId, now: DateTime<Utc>) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        let expense = lock_expense(&mut tx, tenant, id).await?;
        let mut registers = lock_registers(&mut tx, tenant, &[*expense.cash_register_id.as_uuid()]).await?;
        let mut register = registers
            .remove(&expense.cash_register_id)
            .ok_or_else(|| StoreError::Database("expense without register".to_string()))?;

        expense.revert(&mut register)?;
        save_totals(&mut tx, &register).await?;
        sqlx::query("UPDATE expenses SET deleted_at = $2 WHERE id = $1")
            .bind(expense.id.as_uuid())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_expense", e))?;

        commit(tx, "delete_expense").await
    }
}
