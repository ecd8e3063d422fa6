//! Credit ledger: append-only transactions with a derived balance.

use rusqlite::{params, Connection, TransactionBehavior};
use thiserror::Error;

use crate::db::models::{BalanceSnapshot, CreditTransaction};
use crate::db::text_enum;
use crate::domain::{PaymentMethod, TransactionStatus};

#[derive(Debug, Error)]
pub enum CreditError {
    #[error("{0}")]
    Validation(String),

    #[error("Balance of user {0} overflows")]
    Overflow(i64),

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),
}

/// Largest single recharge accepted.
pub const MAX_RECHARGE: i64 = 10_000_000;
/// Largest balance a user may accumulate.
pub const MAX_BALANCE: i64 = 1_000_000_000_000;

pub fn recharge(
    conn: &mut Connection,
    user_id: i64,
    amount: i64,
    method: PaymentMethod,
) -> Result<CreditTransaction, CreditError> {
    if amount <= 0 {
        return Err(CreditError::Validation(
            "Amount must be greater than zero".into(),
        ));
    }
    if amount > MAX_RECHARGE {
        return Err(CreditError::Validation(format!(
            "Amount cannot exceed {}",
            MAX_RECHARGE
        )));
    }

    let status = method.initial_status();
    let reference = format!("RC-{}", uuid::Uuid::now_v7().simple());

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let current = balance(&tx, user_id)?.total;
    match current.checked_add(amount) {
        Some(next) if next <= MAX_BALANCE => {}
        _ => {
            return Err(CreditError::Validation(format!(
                "Balance cannot exceed {}",
                MAX_BALANCE
            )))
        }
    }

    tx.execute(
        "INSERT INTO credit_transactions (user_id, amount, method, status, reference)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, amount, method.as_str(), status.as_str(), reference],
    )?;
    let id = tx.last_insert_rowid();

    let created = tx.query_row(
        "SELECT id, amount, method, status, reference, created_at FROM credit_transactions WHERE id = ?1",
        params![id],
        transaction_from_row,
    )?;
    tx.commit()?;

    tracing::info!(
        "Recharge {} of {} by {} for user {} is {}",
        reference,
        amount,
        method.as_str(),
        user_id,
        status.as_str()
    );

    Ok(created)
}

/// Balance and full history, oldest first, read in a single statement.
pub fn balance(conn: &Connection, user_id: i64) -> Result<BalanceSnapshot, CreditError> {
    let mut stmt = conn.prepare(
        "SELECT id, amount, method, status, reference, created_at
         FROM credit_transactions WHERE user_id = ?1 ORDER BY id ASC",
    )?;
    let history = stmt
        .query_map(params![user_id], transaction_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    summarize(history).ok_or(CreditError::Overflow(user_id))
}

/// total = every non-failed amount; available = total - pending.
/// `None` when the sums do not fit in an `i64`.
pub fn summarize(transactions: Vec<CreditTransaction>) -> Option<BalanceSnapshot> {
    let mut total: i64 = 0;
    let mut pending: i64 = 0;
    for tx in &transactions {
        match tx.status {
            TransactionStatus::Completed => total = total.checked_add(tx.amount)?,
            TransactionStatus::Pending => {
                total = total.checked_add(tx.amount)?;
                pending = pending.checked_add(tx.amount)?;
            }
            TransactionStatus::Failed => {}
        }
    }

    Some(BalanceSnapshot {
        total,
        available: total.checked_sub(pending)?,
        pending,
        transactions,
    })
}

fn transaction_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CreditTransaction> {
    Ok(CreditTransaction {
        id: row.get(0)?,
        amount: row.get(1)?,
        method: text_enum(row, 2)?,
        status: text_enum(row, 3)?,
        reference: row.get(4)?,
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support;
    use crate::domain::Role;

    fn tx(id: i64, amount: i64, status: TransactionStatus) -> CreditTransaction {
        CreditTransaction {
            id,
            amount,
            method: PaymentMethod::Card,
            status,
            reference: format!("RC-{}", id),
            created_at: "2025-01-01 00:00:00".into(),
        }
    }

    #[test]
    fn cash_recharge_is_pending() {
        let mut conn = test_support::conn();
        let user = test_support::user(&conn, "Ana", Role::Player);

        let cash = recharge(&mut conn, user.id, 6500, PaymentMethod::Cash).unwrap();
        assert_eq!(cash.status, TransactionStatus::Pending);

        let card = recharge(&mut conn, user.id, 10000, PaymentMethod::Card).unwrap();
        assert_eq!(card.status, TransactionStatus::Completed);
        assert_ne!(cash.reference, card.reference);
    }

    #[test]
    fn recharge_rejects_non_positive_amounts() {
        let mut conn = test_support::conn();
        let user = test_support::user(&conn, "Ana", Role::Player);
        for amount in [0, -100] {
            assert!(matches!(
                recharge(&mut conn, user.id, amount, PaymentMethod::Card),
                Err(CreditError::Validation(_))
            ));
        }
        assert!(balance(&conn, user.id).unwrap().transactions.is_empty());
    }

    #[test]
    fn balance_derives_totals_in_insertion_order() {
        let mut conn = test_support::conn();
        let user = test_support::user(&conn, "Ana", Role::Player);

        recharge(&mut conn, user.id, 10000, PaymentMethod::Card).unwrap();
        recharge(&mut conn, user.id, 6500, PaymentMethod::Cash).unwrap();
        recharge(&mut conn, user.id, 3000, PaymentMethod::Transfer).unwrap();

        let snapshot = balance(&conn, user.id).unwrap();
        assert_eq!(snapshot.total, 19500);
        assert_eq!(snapshot.pending, 6500);
        assert_eq!(snapshot.available, 13000);
        let amounts: Vec<i64> = snapshot.transactions.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![10000, 6500, 3000]);
    }

    #[test]
    fn balances_are_per_user() {
        let mut conn = test_support::conn();
        let ana = test_support::user(&conn, "Ana", Role::Player);
        let beto = test_support::user(&conn, "Beto", Role::Player);
        recharge(&mut conn, ana.id, 5000, PaymentMethod::Card).unwrap();

        assert_eq!(balance(&conn, beto.id).unwrap().total, 0);
    }

    #[test]
    fn failed_transactions_do_not_count() {
        let snapshot = summarize(vec![
            tx(1, 1000, TransactionStatus::Completed),
            tx(2, 500, TransactionStatus::Failed),
            tx(3, 200, TransactionStatus::Pending),
        ])
        .unwrap();
        assert_eq!(snapshot.total, 1200);
        assert_eq!(snapshot.pending, 200);
        assert_eq!(snapshot.available, 1000);
        assert_eq!(snapshot.transactions.len(), 3);
    }

    #[test]
    fn oversized_recharge_is_rejected() {
        let mut conn = test_support::conn();
        let user = test_support::user(&conn, "Ana", Role::Player);

        for amount in [MAX_RECHARGE + 1, i64::MAX] {
            assert!(matches!(
                recharge(&mut conn, user.id, amount, PaymentMethod::Card),
                Err(CreditError::Validation(_))
            ));
        }
        recharge(&mut conn, user.id, MAX_RECHARGE, PaymentMethod::Card).unwrap();
        assert_eq!(balance(&conn, user.id).unwrap().total, MAX_RECHARGE);
    }

    #[test]
    fn balance_cap_stops_further_recharges() {
        let mut conn = test_support::conn();
        let user = test_support::user(&conn, "Ana", Role::Player);
        conn.execute(
            "INSERT INTO credit_transactions (user_id, amount, method, status, reference)
             VALUES (?1, ?2, 'tarjeta', 'completado', 'RC-seed')",
            params![user.id, MAX_BALANCE],
        )
        .unwrap();

        assert!(matches!(
            recharge(&mut conn, user.id, 1, PaymentMethod::Card),
            Err(CreditError::Validation(_))
        ));
        assert_eq!(balance(&conn, user.id).unwrap().total, MAX_BALANCE);
    }

    #[test]
    fn overflowing_history_is_an_error_not_a_panic() {
        assert!(summarize(vec![
            tx(1, i64::MAX, TransactionStatus::Completed),
            tx(2, 1, TransactionStatus::Completed),
        ])
        .is_none());

        let mut conn = test_support::conn();
        let user = test_support::user(&conn, "Ana", Role::Player);
        for reference in ["RC-a", "RC-b"] {
            conn.execute(
                "INSERT INTO credit_transactions (user_id, amount, method, status, reference)
                 VALUES (?1, ?2, 'tarjeta', 'completado', ?3)",
                params![user.id, i64::MAX, reference],
            )
            .unwrap();
        }
        assert!(matches!(
            balance(&conn, user.id),
            Err(CreditError::Overflow(id)) if id == user.id
        ));
        assert!(matches!(
            recharge(&mut conn, user.id, 1, PaymentMethod::Card),
            Err(CreditError::Overflow(_))
        ));
    }
}
