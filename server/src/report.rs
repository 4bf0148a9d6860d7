//! Transaction reports.
//!
//! A report covers every transaction created between the first day of the
//! start month and the last day of the end month, inclusive, and is
//! rendered as CSV with a closing `TOTAL` row.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rentcar_core::money::Money;
use rentcar_core::types::{PaymentStatus, TransactionView};
use rentcar_core::validation::{ValidationErrors, Validator};
use rentcar_web::AppError;
use serde::Deserialize;
use thiserror::Error;

/// File name offered to the browser.
pub const REPORT_FILE_NAME: &str = "transaction_report.csv";

/// Column headers, in order.
pub const HEADERS: [&str; 12] = [
    "invoice",
    "customer",
    "car",
    "driver",
    "start_date",
    "end_date",
    "return_date",
    "rental_status",
    "payment_status",
    "total_cost",
    "late_fee",
    "created_at",
];

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Report failures.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A month or year is out of range.
    #[error("Invalid data!")]
    Invalid(#[from] ValidationErrors),

    /// The start month comes after the end month.
    #[error("Start period must not be after end period")]
    ReversedRange,

    /// The CSV writer failed.
    #[error("Failed to write report: {0}")]
    Csv(#[from] csv::Error),
}

impl From<ReportError> for AppError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::Invalid(errors) => errors.into(),
            ReportError::ReversedRange => Self::bad_request(err.to_string()),
            ReportError::Csv(_) => Self::internal("Failed to generate report").with_source(err),
        }
    }
}

/// A month given either as its number or its English name.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MonthInput {
    /// `1` to `12`
    Number(i64),
    /// `"January"` to `"December"`, any case
    Name(String),
}

impl MonthInput {
    fn number(&self) -> Option<u32> {
        match self {
            Self::Number(n) => u32::try_from(*n).ok().filter(|n| (1..=12).contains(n)),
            Self::Name(name) => {
                let name = name.trim();
                if let Ok(n) = name.parse::<u32>() {
                    return (1..=12).contains(&n).then_some(n);
                }
                MONTH_NAMES
                    .iter()
                    .position(|m| m.eq_ignore_ascii_case(name))
                    .and_then(|i| u32::try_from(i + 1).ok())
            },
        }
    }
}

/// A year given either as a number or as its decimal string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum YearInput {
    /// `2025`
    Number(i64),
    /// `"2025"`
    Text(String),
}

impl YearInput {
    fn number(&self) -> Option<i32> {
        let year = match self {
            Self::Number(n) => i32::try_from(*n).ok()?,
            Self::Text(text) => text.trim().parse::<i32>().ok()?,
        };
        (2000..=9999).contains(&year).then_some(year)
    }
}

/// `POST /transactions/generate_report` body.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportRequest {
    /// First month
    pub from_month: Option<MonthInput>,
    /// Year of the first month
    pub from_year: Option<YearInput>,
    /// Last month
    pub to_month: Option<MonthInput>,
    /// Year of the last month
    pub to_year: Option<YearInput>,
}

impl ReportRequest {
    /// Check the fields and build the time range.
    ///
    /// # Errors
    ///
    /// [`ReportError::Invalid`] for a missing or out-of-range field,
    /// [`ReportError::ReversedRange`] when the end comes first.
    pub fn range(&self) -> Result<ReportRange, ReportError> {
        let mut v = Validator::new();
        let from_month = month(&mut v, "from_month", self.from_month.as_ref());
        let to_month = month(&mut v, "to_month", self.to_month.as_ref());
        let from_year = year(&mut v, "from_year", self.from_year.as_ref());
        let to_year = year(&mut v, "to_year", self.to_year.as_ref());
        v.finish()?;

        match (from_month, from_year, to_month, to_year) {
            (Some(fm), Some(fy), Some(tm), Some(ty)) => ReportRange::new((fy, fm), (ty, tm)),
            _ => Err(ValidationErrors::single("from_month", "required field").into()),
        }
    }
}

fn month(v: &mut Validator, field: &str, value: Option<&MonthInput>) -> Option<u32> {
    let value = v.present(field, value)?;
    let number = value.number();
    if number.is_none() {
        v.fail(field, "must be a month between 1 and 12");
    }
    number
}

fn year(v: &mut Validator, field: &str, value: Option<&YearInput>) -> Option<i32> {
    let value = v.present(field, value)?;
    let number = value.number();
    if number.is_none() {
        v.fail(field, "must be between 2000 and 9999");
    }
    number
}

/// Half-open creation time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl ReportRange {
    /// Range from the first day of `from` to the first day after `to`.
    ///
    /// # Errors
    ///
    /// [`ReportError::ReversedRange`] if `from` is after `to`;
    /// [`ReportError::Invalid`] for an impossible month.
    pub fn new(from: (i32, u32), to: (i32, u32)) -> Result<Self, ReportError> {
        if from > to {
            return Err(ReportError::ReversedRange);
        }
        let (to_year, to_month) = to;
        let after = if to_month == 12 {
            (to_year + 1, 1)
        } else {
            (to_year, to_month + 1)
        };
        let start = first_day(from, "from_month")?;
        let end = first_day(after, "to_month")?;
        Ok(Self { start, end })
    }

    /// First instant included.
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    /// First instant excluded.
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end.and_time(NaiveTime::MIN).and_utc()
    }
}

fn first_day((year, month): (i32, u32), field: &str) -> Result<NaiveDate, ReportError> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| ReportError::Invalid(ValidationErrors::single(field, "must be a month between 1 and 12")))
}

/// Render transactions, oldest first, followed by the totals row.
///
/// The totals only count transactions whose payment succeeded.
///
/// # Errors
///
/// [`ReportError::Csv`] if a row cannot be written.
pub fn render_csv(transactions: &[TransactionView]) -> Result<Vec<u8>, ReportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;

    let mut total_cost = Money::ZERO;
    let mut total_late = Money::ZERO;
    for view in transactions {
        let t = &view.transaction;
        if t.payment_status == PaymentStatus::Success {
            total_cost = total_cost.saturating_add(t.total_cost);
            total_late = total_late.saturating_add(t.late_fee.unwrap_or(Money::ZERO));
        }
        writer.write_record([
            t.invoice.clone(),
            view.customer_name.clone(),
            view.car_data.car_name.clone(),
            view.driver_data
                .as_ref()
                .map(|d| d.driver_name.clone())
                .unwrap_or_default(),
            t.start_date.to_string(),
            t.end_date.to_string(),
            t.return_date.map(|d| d.to_string()).unwrap_or_default(),
            t.rental_status.as_str().to_string(),
            t.payment_status.as_str().to_string(),
            t.total_cost.to_string(),
            t.late_fee.map(|fee| fee.to_string()).unwrap_or_default(),
            t.created_at.to_rfc3339(),
        ])?;
    }

    let mut totals = vec![String::new(); HEADERS.len()];
    totals[0] = "TOTAL".to_string();
    totals[9] = total_cost.to_string();
    totals[10] = total_late.to_string();
    writer.write_record(&totals)?;

    writer
        .into_inner()
        .map_err(|err| ReportError::Csv(csv::Error::from(err.into_error())))
}
