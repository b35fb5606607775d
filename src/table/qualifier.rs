//! Qualifier Resolver
//!
//! Turns caller-supplied predicates into provider request parameters. Tables
//! declare which key columns a strategy needs; [`resolve`] checks them and
//! calls the strategy's parameter builder with a [`QueryContext`].

use super::schema::Table;
use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Months, NaiveTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a qualifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }
}

/// Typed qualifier value
#[derive(Debug, Clone, PartialEq)]
pub enum QualValue {
    String(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl QualValue {
    /// Infer a type from text: bool, integer, float, RFC 3339 timestamp, else string
    pub fn infer(text: &str) -> Self {
        if let Ok(b) = text.parse::<bool>() {
            return QualValue::Bool(b);
        }
        if let Ok(i) = text.parse::<i64>() {
            return QualValue::Int(i);
        }
        // f64 also accepts "inf" and "NaN"
        if text.chars().any(|c| c.is_ascii_digit()) {
            if let Ok(d) = text.parse::<f64>() {
                return QualValue::Double(d);
            }
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
            return QualValue::Timestamp(ts.with_timezone(&Utc));
        }
        QualValue::String(text.to_string())
    }
}

impl fmt::Display for QualValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualValue::String(s) => f.write_str(s),
            QualValue::Int(i) => write!(f, "{}", i),
            QualValue::Double(d) => write!(f, "{}", d),
            QualValue::Bool(b) => write!(f, "{}", b),
            QualValue::Timestamp(ts) => f.write_str(&ts.to_rfc3339()),
        }
    }
}

/// A predicate on one column
#[derive(Debug, Clone, PartialEq)]
pub struct Qualifier {
    pub column: String,
    pub operator: Operator,
    pub value: QualValue,
    /// Text as the caller wrote it; key columns are sent verbatim
    pub raw: String,
}

impl Qualifier {
    pub fn new(column: &str, operator: Operator, value: QualValue) -> Self {
        Self {
            column: column.to_string(),
            operator,
            raw: value.to_string(),
            value,
        }
    }

    /// Keep `text` untouched next to its inferred value
    pub fn parsed(column: &str, operator: Operator, text: &str) -> Self {
        Self {
            column: column.to_string(),
            operator,
            value: QualValue::infer(text),
            raw: text.to_string(),
        }
    }

    pub fn eq(column: &str, value: impl Into<String>) -> Self {
        Self::new(column, Operator::Eq, QualValue::String(value.into()))
    }
}

impl FromStr for Qualifier {
    type Err = Error;

    /// Parse `column<op>value`, e.g. `granularity=MONTHLY` or `vcpu>=4`
    fn from_str(s: &str) -> Result<Self> {
        const OPERATORS: [(&str, Operator); 5] = [
            (">=", Operator::Ge),
            ("<=", Operator::Le),
            ("=", Operator::Eq),
            (">", Operator::Gt),
            ("<", Operator::Lt),
        ];

        let found = OPERATORS
            .iter()
            .filter_map(|(sym, op)| s.find(sym).map(|idx| (idx, *sym, *op)))
            .min_by_key(|(idx, sym, _)| (*idx, std::cmp::Reverse(sym.len())));

        let Some((idx, sym, operator)) = found else {
            return Err(Error::Config(format!("qualifier '{}' has no operator", s)));
        };

        let column = s[..idx].trim();
        let value = s[idx + sym.len()..].trim();
        if column.is_empty() {
            return Err(Error::Config(format!("qualifier '{}' has no column", s)));
        }

        Ok(Qualifier::parsed(column, operator, value))
    }
}

/// All qualifiers of one query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Qualifiers {
    quals: Vec<Qualifier>,
}

impl Qualifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, qual: Qualifier) -> Self {
        self.quals.push(qual);
        self
    }

    pub fn push(&mut self, qual: Qualifier) {
        self.quals.push(qual);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Qualifier> {
        self.quals.iter()
    }

    fn equality(&self, column: &str) -> Option<&Qualifier> {
        self.quals
            .iter()
            .find(|q| q.column == column && q.operator == Operator::Eq)
    }

    /// Equality value for `column`, if one was supplied
    pub fn equal(&self, column: &str) -> Option<&QualValue> {
        self.equality(column).map(|q| &q.value)
    }

    /// Equality value for `column` exactly as supplied
    pub fn string_value(&self, column: &str) -> Option<String> {
        self.equality(column).map(|q| q.raw.clone())
    }

    /// Equality value that a key column must carry
    pub fn required(&self, table: &str, column: &str) -> Result<String> {
        self.string_value(column)
            .ok_or_else(|| Error::MissingRequiredFilter {
                table: table.to_string(),
                column: column.to_string(),
            })
    }

    pub fn has_all(&self, columns: &[&str]) -> bool {
        columns.iter().all(|c| self.equal(c).is_some())
    }
}

/// Check that every key column carries an equality qualifier
pub fn require(table: &str, key_columns: &[&str], quals: &Qualifiers) -> Result<()> {
    for column in key_columns {
        quals.required(table, column)?;
    }
    Ok(())
}

// =============================================================================
// Granularity and time windows
// =============================================================================

/// Cost Explorer time bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Granularity {
    Hourly,
    Daily,
    Monthly,
    /// Passed through uppercased; the provider rejects it
    Other(String),
}

impl Granularity {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "HOURLY" => Granularity::Hourly,
            "DAILY" => Granularity::Daily,
            "MONTHLY" => Granularity::Monthly,
            other => Granularity::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Granularity::Hourly => "HOURLY",
            Granularity::Daily => "DAILY",
            Granularity::Monthly => "MONTHLY",
            Granularity::Other(s) => s,
        }
    }

    /// `strftime` format of window boundaries
    pub fn time_format(&self) -> &'static str {
        match self {
            Granularity::Hourly => "%Y-%m-%dT%H:%M:%SZ",
            _ => "%Y-%m-%d",
        }
    }

    /// Drop precision the time format cannot carry
    fn truncate(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Granularity::Hourly => ts.trunc_subsecs(0),
            _ => ts.date_naive().and_time(NaiveTime::MIN).and_utc(),
        }
    }
}

/// How far back cost queries reach, per granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookbackPolicy {
    pub hourly_hours: u32,
    pub daily_days: u32,
    pub monthly_months: u32,
}

impl Default for LookbackPolicy {
    fn default() -> Self {
        Self {
            hourly_hours: 13 * 24,
            daily_days: 90,
            monthly_months: 12,
        }
    }
}

impl LookbackPolicy {
    /// Lookbacks must be positive and strictly longer for coarser buckets
    pub fn validate(&self) -> Result<()> {
        if self.hourly_hours == 0 || self.daily_days == 0 || self.monthly_months == 0 {
            return Err(Error::Config("lookback values must be positive".into()));
        }
        if u64::from(self.hourly_hours) >= u64::from(self.daily_days) * 24 {
            return Err(Error::Config(
                "lookback.hourly_hours must be shorter than lookback.daily_days".into(),
            ));
        }
        // 28 days is the shortest month
        if u64::from(self.daily_days) >= u64::from(self.monthly_months) * 28 {
            return Err(Error::Config(
                "lookback.daily_days must be shorter than lookback.monthly_months".into(),
            ));
        }
        Ok(())
    }
}

/// How far ahead forecasts reach, per granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastPolicy {
    pub daily_months: u32,
    pub monthly_months: u32,
}

impl Default for ForecastPolicy {
    fn default() -> Self {
        Self {
            daily_months: 3,
            monthly_months: 12,
        }
    }
}

impl ForecastPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.daily_months == 0 || self.monthly_months == 0 {
            return Err(Error::Config("forecast values must be positive".into()));
        }
        Ok(())
    }
}

/// Formatted request window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub format: &'static str,
}

impl TimeWindow {
    pub fn start_str(&self) -> String {
        self.start.format(self.format).to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format(self.format).to_string()
    }

    /// Cost Explorer `DateInterval`
    pub fn to_json(&self) -> Value {
        json!({ "Start": self.start_str(), "End": self.end_str() })
    }
}

fn out_of_range(what: &str) -> Error {
    Error::Config(format!("{} reaches outside the representable date range", what))
}

/// Window ending now and reaching back by the granularity's lookback
pub fn cost_window(granularity: &Granularity, now: DateTime<Utc>, policy: &LookbackPolicy) -> Result<TimeWindow> {
    let start = match granularity {
        Granularity::Hourly => now.checked_sub_signed(Duration::hours(i64::from(policy.hourly_hours))),
        Granularity::Monthly => now.checked_sub_months(Months::new(policy.monthly_months)),
        Granularity::Daily | Granularity::Other(_) => {
            now.checked_sub_signed(Duration::days(i64::from(policy.daily_days)))
        }
    }
    .ok_or_else(|| out_of_range("lookback"))?;

    Ok(TimeWindow {
        start: granularity.truncate(start),
        end: granularity.truncate(now),
        format: granularity.time_format(),
    })
}

/// Window starting today and reaching forward by the forecast horizon
pub fn forecast_window(granularity: &Granularity, now: DateTime<Utc>, policy: &ForecastPolicy) -> Result<TimeWindow> {
    let months = match granularity {
        Granularity::Monthly => policy.monthly_months,
        _ => policy.daily_months,
    };
    let start = Granularity::Daily.truncate(now);

    let end = start
        .checked_add_months(Months::new(months))
        .ok_or_else(|| out_of_range("forecast"))?;

    Ok(TimeWindow {
        start,
        end,
        format: Granularity::Daily.time_format(),
    })
}

// =============================================================================
// Resolution
// =============================================================================

/// Everything a parameter builder may read
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub table: String,
    pub qualifiers: Qualifiers,
    pub now: DateTime<Utc>,
    pub lookback: LookbackPolicy,
    pub forecast: ForecastPolicy,
    pub partition: String,
    pub region: String,
}

impl QueryContext {
    /// Equality value of a key column, or `MissingRequiredFilter`
    pub fn required(&self, column: &str) -> Result<String> {
        self.qualifiers.required(&self.table, column)
    }

    /// The `granularity` qualifier, parsed
    pub fn granularity(&self) -> Result<Granularity> {
        self.required("granularity").map(|g| Granularity::parse(&g))
    }
}

/// Chosen retrieval strategy with its request parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    Get(Value),
    List(Value),
}

/// Pick a strategy for the query and build its parameters.
///
/// Get wins when the table has one and every get key column is qualified by
/// equality; otherwise List, whose key columns must all be present.
pub fn resolve(table: &Table, ctx: &QueryContext) -> Result<Retrieval> {
    if let Some(get) = &table.get {
        if ctx.qualifiers.has_all(get.key_columns) {
            return (get.params)(ctx).map(Retrieval::Get);
        }
    }

    let Some(list) = &table.list else {
        let keys = table.get.as_ref().map(|g| g.key_columns).unwrap_or(&[]);
        require(table.name, keys, &ctx.qualifiers)?;
        return Err(Error::Schema(format!("table '{}' has no list strategy", table.name)));
    };

    require(table.name, list.key_columns, &ctx.qualifiers)?;
    (list.params)(ctx).map(Retrieval::List)
}
