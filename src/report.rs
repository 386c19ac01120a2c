//! Category reports over a date range.
//!
//! A `Report` groups the expenses that fall inside a `DateRange` by category and then by
//! sub-category, and sums their amounts. Sums use `Decimal`, so the category totals, the
//! sub-category totals and the grand total always agree exactly, whatever the order of the input.

use crate::model::{parse_date, Amount, Expense};
use anyhow::{ensure, Context};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// An inclusive range of ISO dates. Either bound may be absent, which leaves that side unbounded.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    from: Option<String>,
    to: Option<String>,
}

impl DateRange {
    /// Creates a range from optional bounds. Empty strings are treated as absent bounds.
    pub fn new<S: Into<String>>(from: Option<S>, to: Option<S>) -> Self {
        let bound = |s: Option<S>| s.map(Into::into).filter(|s: &String| !s.is_empty());
        Self {
            from: bound(from),
            to: bound(to),
        }
    }

    /// A range with no bounds, covering every expense.
    pub fn all() -> Self {
        Self::default()
    }

    /// The financial year containing `today`, where the year starts on the first day of
    /// `start_month` (1-12). For example, with `start_month` 7, 2024-10-19 falls in the year
    /// 2024-07-01 to 2025-06-30.
    pub fn financial_year(today: NaiveDate, start_month: u32) -> anyhow::Result<Self> {
        ensure!(
            (1..=12).contains(&start_month),
            "A financial year must start in month 1-12, got {start_month}"
        );
        let start_year = if today.month() >= start_month {
            today.year()
        } else {
            today.year() - 1
        };
        let start = NaiveDate::from_ymd_opt(start_year, start_month, 1)
            .context("Unable to compute the start of the financial year")?;
        let next_start = start
            .with_year(start_year + 1)
            .context("Unable to compute the end of the financial year")?;
        let end = next_start
            .pred_opt()
            .context("Unable to compute the end of the financial year")?;
        Ok(Self {
            from: Some(start.format("%Y-%m-%d").to_string()),
            to: Some(end.format("%Y-%m-%d").to_string()),
        })
    }

    /// Checks that any present bound is a valid ISO date.
    pub fn validate(&self) -> anyhow::Result<()> {
        for bound in [&self.from, &self.to].into_iter().flatten() {
            parse_date(bound)?;
        }
        Ok(())
    }

    pub fn from(&self) -> Option<&str> {
        self.from.as_deref()
    }

    pub fn to(&self) -> Option<&str> {
        self.to.as_deref()
    }

    /// Whether `date` is within the range. Compares ISO date strings, whose lexicographic order is
    /// their chronological order.
    pub fn contains(&self, date: &str) -> bool {
        let after_from = self.from.as_deref().map_or(true, |from| date >= from);
        let before_to = self.to.as_deref().map_or(true, |to| date <= to);
        after_from && before_to
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.from(), self.to()) {
            (None, None) => write!(f, "all dates"),
            (Some(from), None) => write!(f, "from {from}"),
            (None, Some(to)) => write!(f, "up to {to}"),
            (Some(from), Some(to)) => write!(f, "{from} to {to}"),
        }
    }
}

/// The total for one sub-category within a category.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SubCategoryTotal {
    pub name: String,
    pub total: Amount,
}

/// The total for one category, with its sub-category breakdown in name order.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub name: String,
    pub total: Amount,
    pub sub_categories: Vec<SubCategoryTotal>,
}

/// The category → sub-category → total tree for a date range.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub range: DateRange,
    /// Categories in name order.
    pub categories: Vec<CategoryTotal>,
    pub total: Amount,
}

#[derive(Default)]
struct Bucket {
    total: Amount,
    sub_categories: BTreeMap<String, Amount>,
}

impl Report {
    /// Builds the report for the expenses whose date is within `range`.
    ///
    /// Category names are used exactly as stored. A blank sub-category is reported as
    /// "Uncategorised". An empty selection gives an empty report with a zero total. Fails if any
    /// total overflows the range of `Decimal`.
    pub fn build<'a>(
        expenses: impl IntoIterator<Item = &'a Expense>,
        range: &DateRange,
    ) -> anyhow::Result<Self> {
        let mut buckets: BTreeMap<&str, Bucket> = BTreeMap::new();
        for expense in expenses
            .into_iter()
            .filter(|e| range.contains(&e.date))
        {
            let bucket = buckets.entry(expense.category.as_str()).or_default();
            bucket.total = add(bucket.total, expense)?;
            let sub_total = bucket
                .sub_categories
                .entry(expense.sub_category_label().to_string())
                .or_default();
            *sub_total = add(*sub_total, expense)?;
        }

        let categories: Vec<CategoryTotal> = buckets
            .into_iter()
            .map(|(name, bucket)| CategoryTotal {
                name: name.to_string(),
                total: bucket.total,
                sub_categories: bucket
                    .sub_categories
                    .into_iter()
                    .map(|(name, total)| SubCategoryTotal { name, total })
                    .collect(),
            })
            .collect();
        let total = Amount::checked_sum(categories.iter().map(|c| c.total))
            .context("The report grand total is too large")?;

        Ok(Self {
            range: range.clone(),
            categories,
            total,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn category(&self, name: &str) -> Option<&CategoryTotal> {
        self.categories.iter().find(|c| c.name == name)
    }
}

fn add(total: Amount, expense: &Expense) -> anyhow::Result<Amount> {
    total
        .checked_add(expense.amount)
        .with_context(|| format!("The '{}' category total is too large", expense.category))
}

impl CategoryTotal {
    pub fn sub_category(&self, name: &str) -> Option<&SubCategoryTotal> {
        self.sub_categories.iter().find(|s| s.name == name)
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Report for {}", self.range)?;
        for category in &self.categories {
            writeln!(f, "{} ({})", category.name, category.total)?;
            for sub in &category.sub_categories {
                writeln!(f, "    {}: {}", sub.name, sub.total)?;
            }
        }
        write!(f, "Total: {}", self.total)
    }
}
