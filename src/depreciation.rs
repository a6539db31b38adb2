// depreciation.rs
// Asset depreciation formulas on rust_decimal amounts. Time-based methods take
// fractional years and charge a partial final year pro rata.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DAYS_PER_YEAR: i64 = 365;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DepreciationMethod {
    StraightLine,
    WrittenDownValue,
    UnitsOfProduction,
    DoubleDeclining,
    SumOfYearsDigits,
}

impl DepreciationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepreciationMethod::StraightLine => "straight_line",
            DepreciationMethod::WrittenDownValue => "written_down_value",
            DepreciationMethod::UnitsOfProduction => "units_of_production",
            DepreciationMethod::DoubleDeclining => "double_declining",
            DepreciationMethod::SumOfYearsDigits => "sum_of_years_digits",
        }
    }

    pub fn is_time_based(&self) -> bool {
        !matches!(self, DepreciationMethod::UnitsOfProduction)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DepreciationError {
    #[error("useful life must be at least one year")]
    ZeroLife,

    #[error("cost must be non-negative, got {0}")]
    NegativeCost(Decimal),

    #[error("salvage value {salvage} must be between 0 and cost {cost}")]
    InvalidSalvage { cost: Decimal, salvage: Decimal },

    #[error("written-down value needs a rate above 0 and at most 100 percent")]
    MissingRate,

    #[error("units of production needs total units greater than zero")]
    MissingUnits,

    #[error("units of production has no year-by-year schedule")]
    NoTimeSchedule,

    #[error("depreciation figures are too large to compute")]
    Overflow,
}

/// Inputs shared by every method. Fields a method does not use are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct DepreciationInput {
    pub cost: Decimal,
    pub salvage_value: Decimal,
    pub useful_life_years: u32,
    /// Percent per year, for written-down value.
    pub rate_percent: Option<Decimal>,
    pub total_units: Option<Decimal>,
    pub units_used: Option<Decimal>,
}

impl DepreciationInput {
    pub fn new(cost: Decimal, salvage_value: Decimal, useful_life_years: u32) -> Self {
        Self {
            cost,
            salvage_value,
            useful_life_years,
            rate_percent: None,
            total_units: None,
            units_used: None,
        }
    }

    pub fn with_rate(mut self, rate_percent: Decimal) -> Self {
        self.rate_percent = Some(rate_percent);
        self
    }

    pub fn with_units(mut self, total_units: Decimal, units_used: Decimal) -> Self {
        self.total_units = Some(total_units);
        self.units_used = Some(units_used);
        self
    }

    fn depreciable_base(&self) -> Decimal {
        (self.cost - self.salvage_value).max(Decimal::ZERO)
    }

    fn check(&self) -> Result<(), DepreciationError> {
        if self.useful_life_years == 0 {
            return Err(DepreciationError::ZeroLife);
        }
        if self.cost < Decimal::ZERO {
            return Err(DepreciationError::NegativeCost(self.cost));
        }
        if self.salvage_value < Decimal::ZERO || self.salvage_value > self.cost {
            return Err(DepreciationError::InvalidSalvage {
                cost: self.cost,
                salvage: self.salvage_value,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleRow {
    pub year: u32,
    pub opening: Decimal,
    pub charge: Decimal,
    pub closing: Decimal,
}

/// Years between two dates counted as days / 365. Never negative.
pub fn elapsed_years(from: NaiveDate, to: NaiveDate) -> Decimal {
    let days = (to - from).num_days().max(0);
    Decimal::from(days) / Decimal::from(DAYS_PER_YEAR)
}

pub fn accumulated_depreciation(
    method: DepreciationMethod,
    input: &DepreciationInput,
    elapsed: Decimal,
) -> Result<Decimal, DepreciationError> {
    input.check()?;
    let elapsed = elapsed.max(Decimal::ZERO);

    let amount = match method {
        DepreciationMethod::UnitsOfProduction => {
            let total = input
                .total_units
                .filter(|units| *units > Decimal::ZERO)
                .ok_or(DepreciationError::MissingUnits)?;
            let used = input.units_used.unwrap_or_default().max(Decimal::ZERO);
            let base = input.depreciable_base();
            checked_div(checked_mul(base, used)?, total)?.min(base)
        }
        _ => {
            let book = walk_years(method, input, elapsed, |_, _, _| {})?;
            input.cost - book
        }
    };

    Ok(amount.round_dp(2))
}

pub fn book_value(
    method: DepreciationMethod,
    input: &DepreciationInput,
    elapsed: Decimal,
) -> Result<Decimal, DepreciationError> {
    let accumulated = accumulated_depreciation(method, input, elapsed)?;
    Ok((input.cost - accumulated).round_dp(2))
}

/// One row per year of useful life, built in a single pass.
pub fn annual_schedule(
    method: DepreciationMethod,
    input: &DepreciationInput,
) -> Result<Vec<ScheduleRow>, DepreciationError> {
    if !method.is_time_based() {
        return Err(DepreciationError::NoTimeSchedule);
    }
    input.check()?;

    let life = input.useful_life_years;
    let mut rows = Vec::with_capacity(life as usize);
    let book = walk_years(method, input, Decimal::from(life), |year, opening, closing| {
        let opening = opening.round_dp(2);
        let closing = closing.round_dp(2);
        rows.push(ScheduleRow {
            year,
            opening,
            charge: opening - closing,
            closing,
        });
    })?;

    // Years after the book reached salvage carry no charge.
    let book = book.round_dp(2);
    let done = rows.len() as u32;
    rows.extend((done + 1..=life).map(|year| ScheduleRow {
        year,
        opening: book,
        charge: Decimal::ZERO,
        closing: book,
    }));
    Ok(rows)
}

fn checked_mul(a: Decimal, b: Decimal) -> Result<Decimal, DepreciationError> {
    a.checked_mul(b).ok_or(DepreciationError::Overflow)
}

fn checked_div(a: Decimal, b: Decimal) -> Result<Decimal, DepreciationError> {
    a.checked_div(b).ok_or(DepreciationError::Overflow)
}

fn written_down_rate(input: &DepreciationInput) -> Result<Decimal, DepreciationError> {
    match input.rate_percent {
        Some(rate) if rate > Decimal::ZERO && rate <= Decimal::ONE_HUNDRED => {
            checked_div(rate, Decimal::ONE_HUNDRED)
        }
        _ => Err(DepreciationError::MissingRate),
    }
}

// Steps a time-based method forward year by year, calling `each_year` with
// (year, opening book, closing book) and returning the final unrounded book
// value. Book value never drops below salvage.
fn walk_years<F>(
    method: DepreciationMethod,
    input: &DepreciationInput,
    elapsed: Decimal,
    mut each_year: F,
) -> Result<Decimal, DepreciationError>
where
    F: FnMut(u32, Decimal, Decimal),
{
    let life = input.useful_life_years;
    let life_dec = Decimal::from(life);
    let base = input.depreciable_base();
    let rate = match method {
        DepreciationMethod::WrittenDownValue => written_down_rate(input)?,
        DepreciationMethod::DoubleDeclining => checked_div(Decimal::TWO, life_dec)?,
        _ => Decimal::ZERO,
    };
    let digits = Decimal::from(u64::from(life) * (u64::from(life) + 1) / 2);

    let mut book = input.cost;
    let mut remaining = elapsed;
    let mut year: u32 = 0;
    while remaining > Decimal::ZERO && book > input.salvage_value {
        year = year.checked_add(1).ok_or(DepreciationError::Overflow)?;
        let full_year = match method {
            DepreciationMethod::StraightLine => checked_div(base, life_dec)?,
            DepreciationMethod::WrittenDownValue | DepreciationMethod::DoubleDeclining => {
                checked_mul(book, rate)?
            }
            DepreciationMethod::SumOfYearsDigits if year <= life => {
                let remaining_life = Decimal::from(life - year + 1);
                checked_div(checked_mul(base, remaining_life)?, digits)?
            }
            DepreciationMethod::SumOfYearsDigits => break,
            DepreciationMethod::UnitsOfProduction => return Err(DepreciationError::NoTimeSchedule),
        };

        let fraction = remaining.min(Decimal::ONE);
        let charge = checked_mul(full_year, fraction)?.min(book - input.salvage_value);
        let opening = book;
        book -= charge;
        remaining -= fraction;
        each_year(year, opening, book);
    }
    Ok(book)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(text: &str) -> Decimal {
        Decimal::from_str(text).unwrap()
    }

    fn machine() -> DepreciationInput {
        DepreciationInput::new(d("10000"), d("1000"), 5)
    }

    #[test]
    fn straight_line_charges_evenly_and_caps_at_base() {
        let input = machine();
        let method = DepreciationMethod::StraightLine;
        assert_eq!(accumulated_depreciation(method, &input, d("2")).unwrap(), d("3600"));
        assert_eq!(accumulated_depreciation(method, &input, d("2.5")).unwrap(), d("4500"));
        assert_eq!(accumulated_depreciation(method, &input, d("10")).unwrap(), d("9000"));
        assert_eq!(book_value(method, &input, d("10")).unwrap(), d("1000"));
    }

    #[test]
    fn written_down_value_prorates_partial_year() {
        let input = DepreciationInput::new(d("10000"), d("0"), 10).with_rate(d("20"));
        let method = DepreciationMethod::WrittenDownValue;
        assert_eq!(accumulated_depreciation(method, &input, d("2")).unwrap(), d("3600"));
        assert_eq!(accumulated_depreciation(method, &input, d("1.5")).unwrap(), d("2800"));
    }

    #[test]
    fn written_down_value_requires_rate() {
        let err = accumulated_depreciation(DepreciationMethod::WrittenDownValue, &machine(), d("1"))
            .unwrap_err();
        assert_eq!(err, DepreciationError::MissingRate);

        let too_high = machine().with_rate(d("150"));
        assert!(
            accumulated_depreciation(DepreciationMethod::WrittenDownValue, &too_high, d("1"))
                .is_err()
        );
    }

    #[test]
    fn double_declining_stops_at_salvage() {
        let rows = annual_schedule(DepreciationMethod::DoubleDeclining, &machine()).unwrap();
        let charges: Vec<Decimal> = rows.iter().map(|row| row.charge).collect();
        assert_eq!(
            charges,
            vec![d("4000"), d("2400"), d("1440"), d("864"), d("296")]
        );
        assert_eq!(rows.last().unwrap().closing, d("1000"));
    }

    #[test]
    fn sum_of_years_digits_front_loads() {
        let input = machine();
        let method = DepreciationMethod::SumOfYearsDigits;
        assert_eq!(accumulated_depreciation(method, &input, d("1")).unwrap(), d("3000"));
        assert_eq!(accumulated_depreciation(method, &input, d("2")).unwrap(), d("5400"));
        assert_eq!(accumulated_depreciation(method, &input, d("5")).unwrap(), d("9000"));
        assert_eq!(accumulated_depreciation(method, &input, d("7")).unwrap(), d("9000"));
    }

    #[test]
    fn units_of_production_follows_usage() {
        let input = machine().with_units(d("100000"), d("25000"));
        let method = DepreciationMethod::UnitsOfProduction;
        assert_eq!(accumulated_depreciation(method, &input, d("0")).unwrap(), d("2250"));

        let overused = machine().with_units(d("100000"), d("250000"));
        assert_eq!(accumulated_depreciation(method, &overused, d("0")).unwrap(), d("9000"));
    }

    #[test]
    fn units_of_production_needs_units_and_has_no_schedule() {
        let method = DepreciationMethod::UnitsOfProduction;
        assert_eq!(
            accumulated_depreciation(method, &machine(), d("1")).unwrap_err(),
            DepreciationError::MissingUnits
        );
        assert_eq!(
            annual_schedule(method, &machine()).unwrap_err(),
            DepreciationError::NoTimeSchedule
        );
    }

    #[test]
    fn rejects_bad_inputs() {
        let method = DepreciationMethod::StraightLine;
        let no_life = DepreciationInput::new(d("100"), d("0"), 0);
        assert_eq!(
            accumulated_depreciation(method, &no_life, d("1")).unwrap_err(),
            DepreciationError::ZeroLife
        );
        let salvage_above_cost = DepreciationInput::new(d("100"), d("200"), 3);
        assert!(matches!(
            accumulated_depreciation(method, &salvage_above_cost, d("1")),
            Err(DepreciationError::InvalidSalvage { .. })
        ));
    }

    #[test]
    fn elapsed_years_counts_days() {
        let from = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(elapsed_years(from, to), Decimal::ONE);
        assert_eq!(elapsed_years(to, from), Decimal::ZERO);
    }

    #[test]
    fn straight_line_schedule_is_flat() {
        let rows = annual_schedule(DepreciationMethod::StraightLine, &machine()).unwrap();
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|row| row.charge == d("1800")));
        assert_eq!(rows[0].opening, d("10000"));
    }

    #[test]
    fn oversized_figures_report_overflow() {
        let units = DepreciationInput::new(d("100000000000000000000"), d("0"), 5)
            .with_units(d("100000000000"), d("10000000000"));
        assert_eq!(
            accumulated_depreciation(DepreciationMethod::UnitsOfProduction, &units, d("0")),
            Err(DepreciationError::Overflow)
        );

        let doubled = DepreciationInput::new(d("50000000000000000000000000000"), d("0"), 1);
        assert_eq!(
            accumulated_depreciation(DepreciationMethod::DoubleDeclining, &doubled, d("2")),
            Err(DepreciationError::Overflow)
        );
        assert_eq!(
            accumulated_depreciation(DepreciationMethod::StraightLine, &doubled, d("2")),
            Ok(d("50000000000000000000000000000"))
        );
    }

    #[test]
    fn long_schedule_is_built_in_one_pass() {
        let input = DepreciationInput::new(d("100000"), d("0"), 100);
        let rows = annual_schedule(DepreciationMethod::SumOfYearsDigits, &input).unwrap();
        assert_eq!(rows.len(), 100);
        assert_eq!(rows[0].charge, d("1980.20"));
        assert_eq!(rows.last().unwrap().closing, d("0"));
        assert_eq!(rows.last().unwrap().year, 100);
    }

    #[test]
    fn schedule_pads_years_after_salvage_is_reached() {
        let input = DepreciationInput::new(d("1000"), d("0"), 4).with_rate(d("100"));
        let rows = annual_schedule(DepreciationMethod::WrittenDownValue, &input).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].charge, d("1000"));
        assert!(rows[1..].iter().all(|row| row.charge.is_zero() && row.closing.is_zero()));
    }
}
