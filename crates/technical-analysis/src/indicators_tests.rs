#[cfg(test)]
mod tests {
    use super::super::engine::*;
    use super::super::indicators::*;
    use analysis_core::{AnalysisError, PricePoint, PriceSeries};
    use chrono::NaiveDate;

    // Helper function to create sample price data
    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ]
    }

    // Daily series with a mild trend and regular pullbacks
    fn wavy_series(len: usize) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let points = (0..len)
            .map(|i| PricePoint {
                date: start + chrono::Duration::days(i as i64),
                close: 100.0 + 0.3 * i as f64 + 3.0 * (i as f64 * 0.9).sin(),
            })
            .collect();
        PriceSeries::new("TEST", points)
    }

    #[test]
    fn test_sma_basic() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&data, 3);

        assert_eq!(result.len(), 3);
        assert!((result[0] - 2.0).abs() < 0.001); // (1+2+3)/3 = 2
        assert!((result[1] - 3.0).abs() < 0.001); // (2+3+4)/3 = 3
        assert!((result[2] - 4.0).abs() < 0.001); // (3+4+5)/3 = 4
    }

    #[test]
    fn test_sma_insufficient_data() {
        let data = vec![1.0, 2.0];
        let result = sma(&data, 5);

        assert_eq!(result.len(), 0);
    }

    #[test]
    fn test_rolling_sma_alignment() {
        let prices = sample_prices();
        let result = rolling_sma(&prices, 20);

        assert_eq!(result.len(), prices.len());
        assert!(result[..19].iter().all(|v| v.is_none()));
        let expected = prices.iter().sum::<f64>() / 20.0;
        assert!((result[19].unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_undefined_before_period() {
        let prices = sample_prices();
        let result = rsi(&prices, 14);

        assert_eq!(result.len(), prices.len());
        assert!(result[..14].iter().all(|v| v.is_none()));
        assert!(result[14].is_some());
        for value in result.iter().flatten() {
            assert!(*value >= 0.0 && *value <= 100.0);
        }
    }

    #[test]
    fn test_rsi_matches_rolling_mean_definition() {
        let prices = sample_prices();
        let result = rsi(&prices, 14);

        let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
        let window = &deltas[..14];
        let gain = window.iter().map(|d| d.max(0.0)).sum::<f64>() / 14.0;
        let loss = window.iter().map(|d| (-d).max(0.0)).sum::<f64>() / 14.0;
        let expected = 100.0 - 100.0 / (1.0 + gain / loss);

        assert!((result[14].unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_rsi_zero_loss_is_undefined() {
        // Strictly rising: average loss is exactly zero everywhere
        let data: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let result = rsi(&data, 14);

        assert!(result.iter().all(|v| v.is_none()));
    }

    #[test]
    fn test_rsi_zero_gain_is_zero() {
        let data: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        let result = rsi(&data, 14);

        assert_eq!(result[14], Some(0.0));
    }

    #[test]
    fn test_rolling_std_uses_sample_divisor() {
        let data = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let result = rolling_std(&data, 8);

        // sum of squared deviations = 32, sample variance = 32 / 7
        assert!((result[7].unwrap() - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert!(result[..7].iter().all(|v| v.is_none()));
    }

    #[test]
    fn test_bollinger_width_is_four_std() {
        let series = wavy_series(40);
        let closes = series.closes();
        let bb = bollinger_bands(&closes, 20, 2.0);
        let std = rolling_std(&closes, 20);

        for i in 0..closes.len() {
            match (bb.upper[i], bb.lower[i], std[i]) {
                (Some(u), Some(l), Some(s)) => assert!((u - l - 4.0 * s).abs() < 1e-9),
                (None, None, None) => assert!(i < 19),
                _ => panic!("bands and std disagree at {}", i),
            }
        }
    }

    #[test]
    fn test_engine_bands_cover_full_series() {
        let series = wavy_series(45);
        let bands = IndicatorEngine::new().bands(&series);

        assert_eq!(bands.dates.len(), 45);
        assert_eq!(bands.upper.len(), 45);
        assert_eq!(bands.lower.len(), 45);
        assert_eq!(bands.close.len(), 45);
        assert!(bands.upper[18].is_none());
        assert!(bands.upper[19].is_some());
    }

    #[test]
    fn test_frame_drops_incomplete_rows() {
        let series = wavy_series(45);
        let frame = IndicatorEngine::new().frame(&series).unwrap();

        // SMA-20 starts at index 19, RSI-14 at index 14
        assert_eq!(frame.len(), 45 - 19);
        assert_eq!(frame.rows[0].date, series.points[19].date);
        assert_eq!(frame.last().unwrap().close, series.points[44].close);
    }

    #[test]
    fn test_frame_insufficient_rows() {
        let series = wavy_series(38);
        let result = IndicatorEngine::new().frame(&series);

        assert!(matches!(result, Err(AnalysisError::InsufficientData(_))));
    }

    #[test]
    fn test_frame_excludes_zero_loss_rows() {
        // Rising series has no defined RSI, so nothing survives the join
        let start = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        let points = (0..60)
            .map(|i| PricePoint {
                date: start + chrono::Duration::days(i),
                close: 50.0 + i as f64,
            })
            .collect();
        let series = PriceSeries::new("UP", points);

        assert!(IndicatorEngine::new().frame(&series).is_err());
    }
}
