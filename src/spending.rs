//! Spending reports computed over the stores.

use crate::model::{Amount, Category, CategoryId, Transaction};
use crate::store::{CategoryStore, TransactionStore};
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// The direction of money movement.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flow {
    Income,
    Expense,
}

serde_plain::derive_display_from_serialize!(Flow);
serde_plain::derive_fromstr_from_deserialize!(Flow);

impl Flow {
    fn matches(&self, transaction: &Transaction) -> bool {
        match self {
            Flow::Income => transaction.is_income(),
            Flow::Expense => !transaction.is_income(),
        }
    }
}

/// Restricts a report to a calendar year, a month (1 to 12) of any year, a direction, or any
/// combination of these. The default filter matches everything.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub flow: Option<Flow>,
}

impl Filter {
    pub fn matches(&self, transaction: &Transaction) -> bool {
        let date = transaction.date();
        self.year.is_none_or(|year| date.year() == year)
            && self.month.is_none_or(|month| date.month() == month)
            && self.flow.is_none_or(|flow| flow.matches(transaction))
    }
}

/// Returns the transactions that pass `filter`, preserving their order.
pub fn filter_transactions(transactions: &[Transaction], filter: &Filter) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|t| filter.matches(t))
        .cloned()
        .collect()
}

/// The total attributed to one category.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category: Category,
    pub total: Amount,
    pub count: usize,
}

/// Totals every known category over the transactions that pass `filter`.
///
/// Every category appears in the result, starting from zero. Uncategorized transactions count
/// toward the category named `other_category` when one exists. Transactions that point at a
/// category which no longer exists are left out. The result is sorted by descending total, then
/// by name.
pub async fn spending_by_category<S>(
    store: &S,
    filter: &Filter,
    other_category: &str,
) -> Result<Vec<CategoryTotal>>
where
    S: TransactionStore + CategoryStore + ?Sized,
{
    let (categories, transactions) =
        tokio::try_join!(store.list_categories(), store.list_transactions())?;
    if categories.is_empty() {
        return Ok(Vec::new());
    }

    let fallback: Option<CategoryId> = categories
        .iter()
        .find(|c| c.name() == other_category)
        .map(|c| c.id().clone());

    let mut totals: HashMap<CategoryId, (Amount, usize)> = categories
        .iter()
        .map(|c| (c.id().clone(), (Amount::ZERO, 0)))
        .collect();

    for transaction in transactions.iter().filter(|t| filter.matches(t)) {
        let Some(category_id) = transaction.category_id().or(fallback.as_ref()) else {
            continue;
        };
        match totals.get_mut(category_id) {
            Some((total, count)) => {
                *total = total.checked_add(transaction.amount()).with_context(|| {
                    format!("The total for category {category_id} is too large to represent")
                })?;
                *count += 1;
            }
            None => warn!(
                "Transaction {} refers to missing category {category_id}",
                transaction.id()
            ),
        }
    }

    let mut result: Vec<CategoryTotal> = categories
        .into_iter()
        .map(|category| {
            let (total, count) = totals
                .get(category.id())
                .copied()
                .unwrap_or((Amount::ZERO, 0));
            CategoryTotal {
                category,
                total,
                count,
            }
        })
        .collect();
    result.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.category.name().cmp(b.category.name()))
    });
    Ok(result)
}

/// Store-wide aggregates.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub count: u64,
    pub min_date: Option<DateTime<Utc>>,
    pub max_date: Option<DateTime<Utc>>,
}

/// Computes the count and the date range concurrently. Dropping the future cancels all three.
pub async fn summary<S>(store: &S) -> Result<Summary>
where
    S: TransactionStore + ?Sized,
{
    let (count, min_date, max_date) = tokio::try_join!(
        store.count_transactions(),
        store.min_date(),
        store.max_date()
    )?;
    Ok(Summary {
        count,
        min_date,
        max_date,
    })
}
