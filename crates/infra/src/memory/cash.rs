use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tillstack_cash::{
    CashRegister, CashRegisterId, CloseRegister, Expense, ExpenseId, ExpenseInput, OpenRegister,
    PaymentMethodTotal, RegisterSummary, ensure_none_open, group_by_method,
};
use tillstack_core::{DomainError, Money, Page, PageRequest, TenantId, UserId};

use super::{InMemoryPosStore, Stored, Tables, live, live_mut, live_rows, owned, owned_mut, rows};
use crate::{CashStore, ListQuery, StoreError, StoreResult};

fn open_register_of(t: &Tables, tenant: TenantId) -> Option<&CashRegister> {
    t.registers
        .values()
        .find(|r| r.company_id == tenant && r.is_open())
}

fn summarize(t: &Tables, register: CashRegister) -> StoreResult<RegisterSummary> {
    let sales: Vec<_> = t
        .sales
        .values()
        .filter(|s| s.cash_register_id == register.id && !s.is_annulled())
        .collect();
    let by_method = group_by_method(sales.iter().map(|s| PaymentMethodTotal {
        payment_method_id: s.payment_method_id,
        payment_method_name: s
            .payment_method_id
            .and_then(|id| t.payment_methods.get(&id))
            .map(|pm| pm.record.name.clone()),
        total: s.total,
    }))?;
    let expenses_total = Money::total(
        t.expenses
            .values()
            .filter(|e| e.is_live() && e.record.cash_register_id == register.id)
            .map(|e| e.record.amount),
    )?;
    Ok(RegisterSummary::new(register, sales.len() as u64, by_method, expenses_total)?)
}

/// Register named by an expense; unknown ids are reported on the input field.
fn expense_register(t: &mut Tables, tenant: TenantId, id: CashRegisterId) -> StoreResult<CashRegister> {
    t.registers
        .remove(&id)
        .filter(|r| r.company_id == tenant)
        .ok_or_else(|| DomainError::field("cash_register_id", "does not exist").into())
}

#[async_trait]
impl CashStore for InMemoryPosStore {
    async fn open_register(
        &self,
        tenant: TenantId,
        actor: UserId,
        input: OpenRegister,
        now: DateTime<Utc>,
    ) -> StoreResult<CashRegister> {
        let input = input.validated()?;
        self.write(|t| {
            ensure_none_open(open_register_of(t, tenant))?;
            let register = CashRegister::open(tenant, actor, input, now);
            t.registers.insert(register.id, register.clone());
            Ok(register)
        })
    }

    async fn current_register(&self, tenant: TenantId) -> StoreResult<Option<RegisterSummary>> {
        self.read(|t| {
            open_register_of(t, tenant)
                .cloned()
                .map(|r| summarize(t, r))
                .transpose()
        })
    }

    async fn register_summary(&self, tenant: TenantId, id: CashRegisterId) -> StoreResult<RegisterSummary> {
        self.read(|t| {
            let register = owned(&t.registers, tenant, &id, "cash register")?.clone();
            summarize(t, register)
        })
    }

    async fn close_register(
        &self,
        tenant: TenantId,
        id: CashRegisterId,
        input: CloseRegister,
        now: DateTime<Utc>,
    ) -> StoreResult<CashRegister> {
        let input = input.validated()?;
        self.write(|t| {
            let register = owned_mut(&mut t.registers, tenant, &id, "cash register")?;
            register.close(input, now)?;
            Ok(register.clone())
        })
    }

    async fn register_history(&self, tenant: TenantId, page: PageRequest) -> StoreResult<Page<RegisterSummary>> {
        self.read(|t| {
            let mut closed: Vec<CashRegister> = rows(&t.registers, tenant)
                .into_iter()
                .filter(|r| !r.is_open())
                .collect();
            closed.sort_by(|a, b| (b.closed_at, b.id).cmp(&(a.closed_at, a.id)));
            page.slice(closed).try_map(|r| summarize(t, r))
        })
    }

    async fn list_expenses(&self, tenant: TenantId, query: &ListQuery) -> StoreResult<Page<Expense>> {
        self.read(|t| {
            let rows = live_rows(&t.expenses, tenant)
                .into_iter()
                .filter(|e| query.accepts(|s| e.matches(s)))
                .collect();
            Ok(query.page.slice(rows))
        })
    }

    async fn get_expense(&self, tenant: TenantId, id: ExpenseId) -> StoreResult<Expense> {
        self.read(|t| live(&t.expenses, tenant, &id, "expense").cloned())
    }

    async fn create_expense(
        &self,
        tenant: TenantId,
        actor: UserId,
        input: ExpenseInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Expense> {
        let input = input.validated()?;
        self.write(|t| {
            let mut register = expense_register(t, tenant, input.cash_register_id)?;
            let expense = Expense::post(&mut register, actor, input, now)?;
            t.registers.insert(register.id, register);
            t.expenses.insert(expense.id, Stored::new(expense.clone()));
            Ok(expense)
        })
    }

    async fn update_expense(
        &self,
        tenant: TenantId,
        id: ExpenseId,
        input: ExpenseInput,
        now: DateTime<Utc>,
    ) -> StoreResult<Expense> {
        let input = input.validated()?;
        self.write(|t| {
            let mut expense = live(&t.expenses, tenant, &id, "expense")?.clone();
            let mut current = t
                .registers
                .remove(&expense.cash_register_id)
                .ok_or_else(|| StoreError::Database("expense without register".to_string()))?;

            if input.cash_register_id == current.id {
                expense.rebook(input, &mut current, None, now)?;
                t.registers.insert(current.id, current);
            } else {
                let mut target = expense_register(t, tenant, input.cash_register_id)?;
                expense.rebook(input, &mut current, Some(&mut target), now)?;
                t.registers.insert(current.id, current);
                t.registers.insert(target.id, target);
            }

            live_mut(&mut t.expenses, tenant, &id, "expense")?.record = expense.clone();
            Ok(expense)
        })
    }

    async fn delete_expense(&self, tenant: TenantId, id: ExpenseId, now: DateTime<Utc>) -> StoreResult<()> {
        self.write(|t| {
            let expense = live(&t.expenses, tenant, &id, "expense")?.clone();
            let register = owned_mut(&mut t.registers, tenant, &expense.cash_register_id, "cash register")?;
            expense.revert(register)?;
            live_mut(&mut t.expenses, tenant, &id, "expense")?.deleted_at = Some(now);
            Ok(())
        })
    }
}
