use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Round half-to-even at `decimals` places, the way numpy rounds.
pub fn round_dp(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round_ties_even() / factor
}

/// One provider observation; the close may be missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
    pub date: NaiveDate,
    pub close: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily close series. Dates strictly ascending, no missing values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub symbol: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self {
            symbol: symbol.into(),
            points,
        }
    }

    pub fn empty(symbol: impl Into<String>) -> Self {
        Self::new(symbol, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn first_close(&self) -> Option<f64> {
        self.points.first().map(|p| p.close)
    }
}

/// A date on which close, SMA-20 and RSI-14 are all defined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub date: NaiveDate,
    pub close: f64,
    pub sma: f64,
    pub rsi: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorFrame {
    pub symbol: String,
    pub rows: Vec<IndicatorRow>,
}

impl IndicatorFrame {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.close).collect()
    }

    pub fn last(&self) -> Option<&IndicatorRow> {
        self.rows.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted: f64,
}

/// Information-criterion pair for a fitted model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvalScores {
    pub aic: f64,
    pub bic: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    pub predictions: Vec<ForecastPoint>,
    pub eval_scores: EvalScores,
}

impl ForecastResult {
    pub fn predicted_values(&self) -> Vec<f64> {
        self.predictions.iter().map(|p| p.predicted).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionSignal {
    #[serde(skip)]
    pub horizon: u32,
    pub price: f64,
    pub action: Action,
}

/// Signals in horizon order, serialized as `{"1": {...}, "7": {...}, "14": {...}}`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionSignals(pub Vec<ActionSignal>);

impl ActionSignals {
    pub fn get(&self, horizon: u32) -> Option<&ActionSignal> {
        self.0.iter().find(|s| s.horizon == horizon)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ActionSignals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for signal in &self.0 {
            map.serialize_entry(&signal.horizon.to_string(), signal)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedSeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BollingerSeries {
    pub dates: Vec<NaiveDate>,
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
    pub close: Vec<f64>,
}

/// Everything computed for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    #[serde(flatten)]
    pub forecast: ForecastResult,
    pub actions: ActionSignals,
    pub normalized: NormalizedSeries,
    pub summary_stats: SummaryStats,
    pub bollinger: BollingerSeries,
}

pub const SYMBOL_FAILURE_MESSAGE: &str = "Computation failed or timed out";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SymbolOutcome {
    Report(Box<AnalysisReport>),
    Failed { error: String },
}

impl SymbolOutcome {
    pub fn failed() -> Self {
        SymbolOutcome::Failed {
            error: SYMBOL_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            SymbolOutcome::Report(report) => Some(report),
            SymbolOutcome::Failed { .. } => None,
        }
    }
}

/// Per-symbol outcomes in response order (baseline first).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisBatch {
    pub entries: Vec<(String, SymbolOutcome)>,
}

impl AnalysisBatch {
    pub fn symbols(&self) -> Vec<&str> {
        self.entries.iter().map(|(s, _)| s.as_str()).collect()
    }

    pub fn get(&self, symbol: &str) -> Option<&SymbolOutcome> {
        self.entries
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, outcome)| outcome)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for AnalysisBatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (symbol, outcome) in &self.entries {
            map.serialize_entry(symbol, outcome)?;
        }
        map.end()
    }
}
