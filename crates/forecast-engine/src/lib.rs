pub mod arima;
pub mod model;
pub mod signals;

pub use arima::{ArimaFit, ArimaOrder};
pub use model::{run_with_deadline, ForecastModel, FORECAST_STEPS};
pub use signals::{action_for, derive_signals, SIGNAL_HORIZONS};
