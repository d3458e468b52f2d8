use analysis_core::{Action, ActionSignal, ActionSignals};

/// Trading-day horizons reported for every symbol.
pub const SIGNAL_HORIZONS: [u32; 3] = [1, 7, 14];

pub const BUY_RATIO: f64 = 1.02;
pub const SELL_RATIO: f64 = 0.98;

/// Buy at or above +2%, Sell at or below -2%, otherwise no action.
pub fn action_for(predicted: f64, last_close: f64) -> Action {
    if predicted >= last_close * BUY_RATIO {
        Action::Buy
    } else if predicted <= last_close * SELL_RATIO {
        Action::Sell
    } else {
        Action::None
    }
}

/// One signal per horizon. Horizons past the end of the forecast reuse its
/// last value, so with a 7-step forecast the 14-day signal repeats the 7-day one.
pub fn derive_signals(forecast: &[f64], last_close: f64) -> ActionSignals {
    if forecast.is_empty() {
        return ActionSignals::default();
    }

    let signals = SIGNAL_HORIZONS
        .iter()
        .map(|&horizon| {
            let idx = (horizon as usize - 1).min(forecast.len() - 1);
            let price = forecast[idx];
            ActionSignal {
                horizon,
                price,
                action: action_for(price, last_close),
            }
        })
        .collect();

    ActionSignals(signals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_are_inclusive() {
        let last = 100.0;
        assert_eq!(action_for(last * BUY_RATIO, last), Action::Buy);
        assert_eq!(action_for(last * SELL_RATIO, last), Action::Sell);
        assert_eq!(action_for(101.99, last), Action::None);
        assert_eq!(action_for(98.01, last), Action::None);
        assert_eq!(action_for(110.0, last), Action::Buy);
        assert_eq!(action_for(90.0, last), Action::Sell);
    }

    #[test]
    fn test_actions_are_exclusive_across_a_sweep() {
        let last = 57.31;
        for step in 0..=400 {
            let predicted = last * (0.95 + step as f64 * 0.00025);
            let buy = predicted >= last * BUY_RATIO;
            let sell = predicted <= last * SELL_RATIO;
            assert!(!(buy && sell));
            let expected = if buy {
                Action::Buy
            } else if sell {
                Action::Sell
            } else {
                Action::None
            };
            assert_eq!(action_for(predicted, last), expected);
        }
    }

    #[test]
    fn test_fourteen_day_horizon_reuses_last_forecast() {
        let forecast = [100.5, 101.0, 101.5, 102.0, 102.5, 103.0, 103.5];
        let signals = derive_signals(&forecast, 100.0);

        assert_eq!(signals.len(), 3);
        assert_eq!(signals.get(1).unwrap().price, 100.5);
        assert_eq!(signals.get(1).unwrap().action, Action::None);
        assert_eq!(signals.get(7).unwrap().price, 103.5);
        assert_eq!(signals.get(14).unwrap().price, 103.5);
        assert_eq!(signals.get(14).unwrap().action, signals.get(7).unwrap().action);
    }

    #[test]
    fn test_horizon_order() {
        let signals = derive_signals(&[95.0; 7], 100.0);
        let horizons: Vec<u32> = signals.0.iter().map(|s| s.horizon).collect();

        assert_eq!(horizons, vec![1, 7, 14]);
        assert!(signals.0.iter().all(|s| s.action == Action::Sell));
    }

    #[test]
    fn test_empty_forecast_yields_no_signals() {
        assert!(derive_signals(&[], 100.0).is_empty());
    }
}
