use crate::args::ReportArgs;
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::report::{DateRange, Report};
use crate::{Config, Result};
use chrono::{Local, NaiveDate};

/// Builds the category report.
///
/// - `--all` covers every expense.
/// - `--from` and/or `--to` give an inclusive custom range.
/// - Otherwise the range is the financial year containing today.
pub async fn report(config: Config, args: ReportArgs) -> Result<Out<Report>> {
    let range = report_range(&config, &args, Local::now().date_naive())?;
    let report = config.ledger().build_report(&range).await?;
    let message = if report.is_empty() {
        format!("No expenses for {range}")
    } else {
        report.to_string()
    };
    Ok(Out::new(message, report))
}

fn report_range(config: &Config, args: &ReportArgs, today: NaiveDate) -> Result<DateRange> {
    let range = if args.all {
        DateRange::all()
    } else if args.from.is_some() || args.to.is_some() {
        DateRange::new(args.from.clone(), args.to.clone())
    } else {
        DateRange::financial_year(today, config.financial_year_start_month())
            .pub_result(ErrorType::Config)?
    };
    range.validate().pub_result(ErrorType::Validation)?;
    Ok(range)
}
