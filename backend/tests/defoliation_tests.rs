//! Defoliation pipeline tests
//!
//! Property-based and example tests for:
//! - Threshold stability under row reordering
//! - Defoliated area bounded by boundary area
//! - Percentages within 0-100
//! - Exclusive recommendation buckets

use chrono::NaiveDate;
use geo::{polygon, MultiPolygon};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    aggregate_stands, assign_bucket, defoliated_area_ha, defoliation_percentage, measured_area,
    point_area_round, BoundaryIndex, CanopyStatus, ClassifiedObservation, DefoliationThreshold, MonthLocale,
    Observation, RecommendationBucket, StandBoundary,
};

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn observation(canopy_cover: f64, on: NaiveDate) -> Observation {
    Observation {
        company: "ACME".to_string(),
        farm: "F1".to_string(),
        stand: "F1_1".to_string(),
        date: on,
        x: 600_000.0,
        y: 7_200_000.0,
        canopy_cover,
    }
}

/// `defoliated` low-cover points out of `total` on one date
fn classified(on: NaiveDate, defoliated: usize, total: usize) -> Vec<ClassifiedObservation> {
    (0..total)
        .map(|i| {
            let status = if i < defoliated {
                CanopyStatus::Defoliated
            } else {
                CanopyStatus::Healthy
            };
            ClassifiedObservation {
                observation: observation(if i < defoliated { 5.0 } else { 80.0 }, on),
                status,
            }
        })
        .collect()
}

/// Square stand of `hectares` in UTM metres
fn stand(hectares: f64) -> StandBoundary {
    let side = (hectares * 10_000.0).sqrt();
    StandBoundary {
        company: "ACME".to_string(),
        farm: "F1".to_string(),
        stand: "F1_1".to_string(),
        geometry: MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: side, y: 0.0),
            (x: side, y: side),
            (x: 0.0, y: side),
            (x: 0.0, y: 0.0),
        ]]),
        area_ha: hectares,
    }
}

// ============================================================================
// Example scenarios
// ============================================================================

mod scenario_tests {
    use super::*;

    #[test]
    fn test_forty_points_on_hundred_hectares() {
        let index = BoundaryIndex::new(&[stand(100.0)]);
        let rows = aggregate_stands(&classified(date(2024, 3, 1), 40, 5_000), &index, MonthLocale::PtBr);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].metrics.percentage, Some(dec("0.4")));
        assert_eq!(rows[0].metrics.bucket, Some(RecommendationBucket::NoDefoliation));
    }

    #[test]
    fn test_six_hundred_points_on_hundred_hectares() {
        let index = BoundaryIndex::new(&[stand(100.0)]);
        let rows = aggregate_stands(&classified(date(2024, 3, 1), 600, 5_000), &index, MonthLocale::PtBr);

        assert_eq!(rows[0].metrics.percentage, Some(dec("6.0")));
        assert_eq!(rows[0].metrics.bucket, Some(RecommendationBucket::Control3Months));
    }

    #[test]
    fn test_jump_from_two_to_twelve_percent() {
        let index = BoundaryIndex::new(&[stand(100.0)]);
        let mut points = classified(date(2024, 2, 1), 200, 5_000);
        points.extend(classified(date(2024, 3, 1), 1_200, 5_000));
        let rows = aggregate_stands(&points, &index, MonthLocale::PtBr);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].metrics.percentage_delta, Some(dec("10.0")));
        assert_eq!(rows[1].metrics.bucket, Some(RecommendationBucket::OtherDefoliation));
    }

    #[test]
    fn test_threshold_uses_whole_dataset() {
        let observations: Vec<Observation> = (0..=100)
            .map(|i| observation(i as f64, date(2024, 3, 1)))
            .collect();
        let threshold = DefoliationThreshold::compute(&observations, 0.10).unwrap();

        assert_eq!(threshold.canopy_cover, 10.0);
        assert_eq!(threshold.status_of(9.9), CanopyStatus::Defoliated);
        // the threshold itself is healthy
        assert_eq!(threshold.status_of(10.0), CanopyStatus::Healthy);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

mod property_tests {
    use super::*;

    /// Canopy cover values with their shuffled copy
    fn shuffled_values_strategy() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
        prop::collection::vec(0.0f64..100.0, 1..200)
            .prop_flat_map(|values| (Just(values.clone()), Just(values).prop_shuffle()))
    }

    /// Percentages with one decimal, 0.0 to 100.0
    fn percentage_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=1_000).prop_map(|tenths| Decimal::new(tenths, 1))
    }

    /// Deltas with one decimal, -100.0 to 100.0
    fn delta_strategy() -> impl Strategy<Value = Option<Decimal>> {
        prop::option::of((-1_000i64..=1_000).prop_map(|tenths| Decimal::new(tenths, 1)))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Reordering rows never moves the threshold
        #[test]
        fn prop_threshold_invariant_under_reordering(
            (values, shuffled) in shuffled_values_strategy(),
            q in 0.0f64..=1.0,
        ) {
            let on = date(2024, 3, 1);
            let original: Vec<Observation> = values.iter().map(|v| observation(*v, on)).collect();
            let reordered: Vec<Observation> = shuffled.iter().map(|v| observation(*v, on)).collect();

            let a = DefoliationThreshold::compute(&original, q).unwrap();
            let b = DefoliationThreshold::compute(&reordered, q).unwrap();
            prop_assert_eq!(a.canopy_cover, b.canopy_cover);
        }

        /// Defoliated area never exceeds the boundary area
        #[test]
        fn prop_defoliated_area_bounded_by_total(
            points in 0u64..200_000,
            hectares in 0.0f64..500.0,
        ) {
            let total = measured_area(hectares);
            let defoliated = defoliated_area_ha(points, total);
            prop_assert!(defoliated <= total.unwrap());
            prop_assert!(defoliated >= Decimal::ZERO);
        }

        /// Percentages stay within 0-100
        #[test]
        fn prop_percentage_within_bounds(
            points in 0u64..200_000,
            hectares in 0.0f64..500.0,
        ) {
            let total = measured_area(hectares);
            let defoliated = defoliated_area_ha(points, total);
            if let Some(percentage) = defoliation_percentage(defoliated, total) {
                prop_assert!(percentage >= Decimal::ZERO);
                prop_assert!(percentage <= Decimal::ONE_HUNDRED);
            } else {
                prop_assert_eq!(total, Some(Decimal::ZERO));
            }
        }

        /// Each row lands in exactly one bucket, and a sharp increase wins
        #[test]
        fn prop_bucket_is_exclusive(
            average in percentage_strategy(),
            delta in delta_strategy(),
        ) {
            let bucket = assign_bucket(Some(average), delta).unwrap();

            let sharp = delta.is_some_and(|d| d > Decimal::from(8));
            prop_assert_eq!(bucket == RecommendationBucket::OtherDefoliation, sharp);
            if sharp {
                prop_assert_ne!(bucket, RecommendationBucket::Control3Months);
            }
            let expected = if sharp {
                RecommendationBucket::OtherDefoliation
            } else if average < dec("0.5") {
                RecommendationBucket::NoDefoliation
            } else if average <= Decimal::from(5) {
                RecommendationBucket::Control9Months
            } else {
                RecommendationBucket::Control3Months
            };
            prop_assert_eq!(bucket, expected);
        }

        /// Stand aggregates keep defoliated area within the stand and one bucket slot filled.
        /// Reported areas are rounded, so the bound is checked at the point-area precision.
        #[test]
        fn prop_stand_rows_are_consistent(
            defoliated in 0usize..2_000,
            healthy in 0usize..2_000,
            hectares in 1.0f64..50.0,
        ) {
            let index = BoundaryIndex::new(&[stand(hectares)]);
            let points = classified(date(2024, 3, 1), defoliated, defoliated + healthy);
            let rows = aggregate_stands(&points, &index, MonthLocale::PtBr);

            let stand_area = point_area_round(measured_area(hectares).unwrap());
            for row in &rows {
                prop_assert!(row.metrics.defoliated_area_ha <= stand_area);
                prop_assert!(row.metrics.percentage.unwrap() <= Decimal::ONE_HUNDRED);
                let filled = row.metrics.bucket_areas().iter().filter(|a| a.is_some()).count();
                prop_assert_eq!(filled, 1);
            }
        }
    }
}
