/// Simple Moving Average, one value per complete window.
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    for i in period - 1..data.len() {
        let sum: f64 = data[i + 1 - period..=i].iter().sum();
        result.push(sum / period as f64);
    }
    result
}

/// Simple Moving Average aligned with `data`; `None` until the window is full.
pub fn rolling_sma(data: &[f64], period: usize) -> Vec<Option<f64>> {
    align(data.len(), period, sma(data, period))
}

/// Rolling sample standard deviation (N-1 divisor) aligned with `data`.
pub fn rolling_std(data: &[f64], period: usize) -> Vec<Option<f64>> {
    if period < 2 || data.len() < period {
        return vec![None; data.len()];
    }

    let mut result = vec![None; period - 1];
    for i in period - 1..data.len() {
        let slice = &data[i + 1 - period..=i];
        let mean = slice.iter().sum::<f64>() / period as f64;
        let variance = slice.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (period - 1) as f64;
        result.push(Some(variance.sqrt()));
    }
    result
}

/// Relative Strength Index over rolling simple means of gains and losses,
/// aligned with `data`.
///
/// The first delta is undefined, so the first value appears at index `period`.
/// A window whose average loss is exactly zero has an infinite gain/loss ratio
/// and yields `None` rather than 100.
pub fn rsi(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut result = vec![None; data.len()];
    if period == 0 || data.len() < period + 1 {
        return result;
    }

    let mut gains = Vec::with_capacity(data.len() - 1);
    let mut losses = Vec::with_capacity(data.len() - 1);
    for w in data.windows(2) {
        let change = w[1] - w[0];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    // gains[j] is the delta ending at data[j + 1]
    for i in period..data.len() {
        let window = i - period..i;
        let avg_gain = gains[window.clone()].iter().sum::<f64>() / period as f64;
        let avg_loss = losses[window].iter().sum::<f64>() / period as f64;

        if avg_loss == 0.0 {
            continue;
        }

        let rs = avg_gain / avg_loss;
        result[i] = Some(100.0 - (100.0 / (1.0 + rs)));
    }

    result
}

/// Bollinger Bands aligned with the input; `None` where the window is incomplete.
pub struct BollingerBands {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

pub fn bollinger_bands(data: &[f64], period: usize, std_dev: f64) -> BollingerBands {
    let middle = rolling_sma(data, period);
    let spread = rolling_std(data, period);

    let mut upper = Vec::with_capacity(data.len());
    let mut lower = Vec::with_capacity(data.len());
    for (mean, std) in middle.iter().zip(spread.iter()) {
        match (mean, std) {
            (Some(mean), Some(std)) => {
                upper.push(Some(mean + std_dev * std));
                lower.push(Some(mean - std_dev * std));
            }
            _ => {
                upper.push(None);
                lower.push(None);
            }
        }
    }

    BollingerBands {
        upper,
        middle,
        lower,
    }
}

fn align(len: usize, period: usize, values: Vec<f64>) -> Vec<Option<f64>> {
    if values.is_empty() {
        return vec![None; len];
    }
    let mut aligned = vec![None; period - 1];
    aligned.extend(values.into_iter().map(Some));
    aligned
}
