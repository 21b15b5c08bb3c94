//! Customer set arithmetic for the scoreboard and customer-count sheets
//!
//! Every result is de-duplicated and sorted ascending, so it depends only on
//! which customers appear, never on row order.

use crate::types::{CustomerNumber, EstimateRecord};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeSet;

/// Unique customers, ascending
pub fn unique<I>(customers: I) -> Vec<CustomerNumber>
where
    I: IntoIterator<Item = CustomerNumber>,
{
    customers.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

/// Customers in `a` that are not in `b`, unique and ascending
pub fn difference<A, B>(a: A, b: B) -> Vec<CustomerNumber>
where
    A: IntoIterator<Item = CustomerNumber>,
    B: IntoIterator<Item = CustomerNumber>,
{
    let excluded: BTreeSet<CustomerNumber> = b.into_iter().collect();
    a.into_iter()
        .filter(|c| !excluded.contains(c))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Last request date that counts as aged: `today - days`
pub fn age_cutoff(today: NaiveDate, days: i64) -> NaiveDate {
    today
        .checked_sub_signed(Duration::days(days))
        .unwrap_or(NaiveDate::MIN)
}

/// Residential estimates whose customer has no production in `production`.
///
/// With `cutoff`, only estimates requested on or before that date count;
/// estimates without a request date are then excluded.
pub fn unconverted_residential<'a, I, P>(
    estimates: I,
    production: P,
    cutoff: Option<NaiveDate>,
) -> Vec<CustomerNumber>
where
    I: IntoIterator<Item = &'a EstimateRecord>,
    P: IntoIterator<Item = CustomerNumber>,
{
    let candidates = estimates
        .into_iter()
        .filter(|e| e.is_residential())
        .filter(|e| match cutoff {
            Some(cutoff) => e.requested.is_some_and(|d| d <= cutoff),
            None => true,
        })
        .map(|e| e.customer);

    difference(candidates, production)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn customers(ids: &[i64]) -> Vec<CustomerNumber> {
        ids.iter().map(|&i| CustomerNumber(i)).collect()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_difference_residential_example() {
        let result = difference(customers(&[10, 20, 30]), customers(&[20]));
        assert_eq!(result, customers(&[10, 30]));
    }

    #[test]
    fn test_difference_is_order_independent() {
        let forward = difference(customers(&[30, 10, 20, 10]), customers(&[20, 40]));
        let reversed = difference(customers(&[10, 20, 10, 30]), customers(&[40, 20]));
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_difference_is_idempotent() {
        let once = difference(customers(&[1, 2, 3, 4]), customers(&[2]));
        let twice = difference(once.clone(), customers(&[2]));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_difference_with_empty_sides() {
        assert!(difference(customers(&[]), customers(&[1])).is_empty());
        assert_eq!(difference(customers(&[2, 1]), customers(&[])), customers(&[1, 2]));
    }

    #[test]
    fn test_unique_sorts_and_dedups() {
        assert_eq!(unique(customers(&[5, 1, 5, 3])), customers(&[1, 3, 5]));
    }

    #[test]
    fn test_age_cutoff() {
        assert_eq!(age_cutoff(date(2024, 3, 1), 367), date(2023, 2, 28));
    }

    #[test]
    fn test_unconverted_residential_filters_class_and_production() {
        let estimates = vec![
            EstimateRecord::new(CustomerNumber(10), "R"),
            EstimateRecord::new(CustomerNumber(20), "r "),
            EstimateRecord::new(CustomerNumber(30), "R"),
            EstimateRecord::new(CustomerNumber(40), "C"),
            EstimateRecord::new(CustomerNumber(10), "R"),
        ];
        let result = unconverted_residential(&estimates, customers(&[20]), None);
        assert_eq!(result, customers(&[10, 30]));
    }

    #[test]
    fn test_unconverted_residential_age_cutoff_boundary() {
        let today = date(2024, 6, 30);
        let cutoff = age_cutoff(today, 367);
        let estimates = vec![
            EstimateRecord::new(CustomerNumber(1), "R").with_requested(cutoff),
            EstimateRecord::new(CustomerNumber(2), "R").with_requested(cutoff + Duration::days(1)),
            EstimateRecord::new(CustomerNumber(3), "R"),
            EstimateRecord::new(CustomerNumber(4), "R").with_requested(date(2020, 1, 1)),
        ];
        let result = unconverted_residential(&estimates, customers(&[4]), Some(cutoff));
        assert_eq!(result, customers(&[1]));
    }
}
