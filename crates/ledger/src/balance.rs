//! Balance folds - every balance is a projection over ledger entries
//!
//! The general-wallet rule is asymmetric by kind, not a single status
//! predicate: credits count only once completed, but a withdrawal debits
//! spendable funds the moment it is pending.

use crate::entry::{EntryKind, EntryStatus, LedgerEntry};
use rust_decimal::Decimal;
use uuid::Uuid;

/// General-wallet balance for `owner`: fold over entries with no scope.
///
/// - Credit kinds (deposit, transfer-in, loan disbursement) add
///   `amount - fee`, but only when completed.
/// - Debit kinds (withdrawal, transfer-out, service charge, loan
///   repayment) subtract `amount + fee` when completed; a withdrawal is
///   subtracted while still pending as well.
/// - Failed entries never count.
pub fn wallet_balance(entries: &[LedgerEntry], owner: Uuid) -> Decimal {
    entries
        .iter()
        .filter(|e| e.is_wallet_entry(owner))
        .filter_map(wallet_effect)
        .sum()
}

/// The signed wallet effect of a single entry, or None if it does not
/// count under the asymmetric status rule.
fn wallet_effect(entry: &LedgerEntry) -> Option<Decimal> {
    if entry.status == EntryStatus::Failed {
        return None;
    }
    if entry.kind.is_credit() {
        if entry.status != EntryStatus::Completed {
            return None;
        }
        return Some(entry.amount.value() - entry.fee.value());
    }
    // Debits: completed always count; pending counts for withdrawals only,
    // so funds queued for withdrawal stop being spendable immediately.
    let counts = entry.status == EntryStatus::Completed
        || (entry.status == EntryStatus::Pending && entry.kind == EntryKind::Withdrawal);
    if counts {
        Some(-(entry.amount.value() + entry.fee.value()))
    } else {
        None
    }
}

/// Subscription balance for the standard (metadata-free) archetype: a flat
/// sum of `amount - fee` over all completed entries in the scope, with no
/// sign inversion by kind.
///
/// This assumes every entry tied to such a subscription is additive. A
/// withdrawal recorded against the scope would be added, not subtracted -
/// inconsistent with the wallet rule, kept deliberately pending a product
/// decision (see DESIGN.md).
pub fn subscription_flat_balance(entries: &[LedgerEntry], scope: Uuid) -> Decimal {
    entries
        .iter()
        .filter(|e| e.scope == Some(scope) && e.status == EntryStatus::Completed)
        .map(|e| e.amount.value() - e.fee.value())
        .sum()
}
