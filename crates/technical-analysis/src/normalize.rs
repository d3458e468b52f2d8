use analysis_core::{round_dp, NormalizedSeries, PriceSeries, SummaryStats};
use statrs::statistics::{Data, Median, Statistics};

/// Rescale a close series by the baseline's first close (3 decimals).
pub fn normalize(series: &PriceSeries, baseline0: f64) -> NormalizedSeries {
    NormalizedSeries {
        dates: series.dates(),
        values: series
            .points
            .iter()
            .map(|p| round_dp(p.close / baseline0, 3))
            .collect(),
    }
}

/// Mean, median and population standard deviation, each rounded to 2 decimals.
pub fn summary_stats(values: &[f64]) -> SummaryStats {
    let mean = values.iter().mean();
    let std = values.iter().population_std_dev();
    let median = Data::new(values.to_vec()).median();

    SummaryStats {
        mean: round_dp(mean, 2),
        median: round_dp(median, 2),
        std: round_dp(std, 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::PricePoint;
    use chrono::NaiveDate;

    fn series(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        PriceSeries::new(
            "AAPL",
            closes
                .iter()
                .enumerate()
                .map(|(i, &close)| PricePoint {
                    date: start + chrono::Duration::days(i as i64),
                    close,
                })
                .collect(),
        )
    }

    #[test]
    fn test_normalize_divides_by_baseline_and_rounds() {
        let s = series(&[125.07, 126.36, 130.0]);
        let n = normalize(&s, 384.37);

        assert_eq!(n.dates, s.dates());
        for (value, point) in n.values.iter().zip(s.points.iter()) {
            assert_eq!(*value, round_dp(point.close / 384.37, 3));
        }
        assert_eq!(n.values[0], 0.325);
    }

    #[test]
    fn test_summary_stats_population_std() {
        let stats = summary_stats(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);
        // population std of 1..4 = sqrt(1.25) = 1.118
        assert_eq!(stats.std, 1.12);
    }

    #[test]
    fn test_summary_stats_odd_length_median() {
        let stats = summary_stats(&[0.9, 0.3, 0.5]);
        assert_eq!(stats.median, 0.5);
        assert_eq!(stats.mean, round_dp(1.7 / 3.0, 2));
    }
}
