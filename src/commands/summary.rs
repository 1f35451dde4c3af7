use crate::args::SummaryArgs;
use crate::commands::{plural, Out};
use crate::error::{ErrorType, IntoResult};
use crate::spending::{
    spending_by_category, summary as store_summary, CategoryTotal, Filter, Summary,
};
use crate::{Config, Result};
use serde::{Deserialize, Serialize};

/// Output of `sms-ledger summary`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub summary: Summary,
    pub filter: Filter,
    pub spending: Vec<CategoryTotal>,
}

/// Reports the store-wide count and date range along with the totals per category for the
/// transactions selected by `args`.
pub async fn summary(config: Config, args: &SummaryArgs) -> Result<Out<SummaryReport>> {
    let db = config.db();
    let filter = Filter {
        year: args.year(),
        month: args.month(),
        flow: args.flow(),
    };
    let (summary, spending) = tokio::try_join!(
        store_summary(db),
        spending_by_category(db, &filter, config.other_category())
    )
    .pub_result(ErrorType::Database)?;

    let mut message = plural(summary.count as usize, "transaction", "transactions");
    if let (Some(min), Some(max)) = (summary.min_date, summary.max_date) {
        message.push_str(&format!(
            " from {} to {}",
            min.format("%Y-%m-%d"),
            max.format("%Y-%m-%d")
        ));
    }
    for total in spending.iter().filter(|t| t.count > 0) {
        message.push_str(&format!(
            "\n{:>16}  {} ({})",
            total.total.to_string(),
            total.category.name(),
            total.count
        ));
    }

    Ok(Out::new(
        message,
        SummaryReport {
            summary,
            filter,
            spending,
        },
    ))
}
