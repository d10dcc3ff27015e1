use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::market::{Asset, Timeframe};

/// One OHLCV bar, keyed by (asset, timeframe, timestamp)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketBar {
    pub timestamp: DateTime<Utc>,
    pub asset: Asset,
    pub timeframe: Timeframe,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl MarketBar {
    pub fn key(&self) -> (Asset, Timeframe, DateTime<Utc>) {
        (self.asset, self.timeframe, self.timestamp)
    }
}

/// Trade signal row produced outside this system.
///
/// Asset and timeframe are kept as stored strings: the dashboard displays
/// whatever the producer wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    pub id: i64,
    pub asset: String,
    pub timeframe: String,
    pub bias: Option<String>,
    pub liquidity_zones: Option<serde_json::Value>,
    pub direction: Option<String>,
    pub entry_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub invalidation_point: Option<f64>,
    pub system: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioMetric {
    pub timeframe: String,
    pub risk_reward_ratio: f64,
    pub win_rate: f64,
    pub drawdown: f64,
    pub total_trades: i32,
    pub updated_at: Option<DateTime<Utc>>,
}
