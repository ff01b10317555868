//! Drawdown extraction from an equity curve (component F).

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;

use crate::dealer::EquitySeries;
use crate::decimal::Decimal;

/// A peak-to-trough-to-recovery feature of the equity curve.
#[derive(Debug, Clone)]
pub struct Drawdown {
    pub high_at: DateTime<Utc>,
    pub low_at: DateTime<Utc>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,

    pub high: Decimal,
    pub low: Decimal,

    pub recovery: Duration,

    pub amount: Decimal,
    pub pct: f64,

    /// Set when the curve ends mid-drawdown, i.e. the peak was never
    /// recovered by the end of the sample.
    pub is_open: bool,
}

impl Default for Drawdown {
    fn default() -> Self {
        Self {
            high_at: DateTime::<Utc>::UNIX_EPOCH,
            low_at: DateTime::<Utc>::UNIX_EPOCH,
            start_at: None,
            end_at: None,
            high: Decimal::ZERO,
            low: Decimal::ZERO,
            recovery: Duration::zero(),
            amount: Decimal::ZERO,
            pct: 0.0,
            is_open: false,
        }
    }
}

impl Drawdown {
    fn open_at(t: DateTime<Utc>, v: Decimal) -> Self {
        Self {
            high_at: t,
            low_at: t,
            high: v,
            low: v,
            ..Default::default()
        }
    }

    fn close(&mut self, end_at: DateTime<Utc>) {
        self.end_at = Some(end_at);
        self.recovery = end_at - self.start_at.unwrap_or(end_at);
        self.amount = self.high - self.low;
        self.pct = if self.high.is_zero() {
            self.amount.to_f64().unwrap_or(0.0)
        } else {
            (self.amount / self.high).to_f64().unwrap_or(0.0)
        };
    }
}

/// Extracts every drawdown from `curve`, walking it in chronological
/// order. The final drawdown is flagged `is_open` rather than dropped
/// if the curve ends before recovering to a new high.
pub fn drawdowns(curve: &EquitySeries) -> Vec<Drawdown> {
    if curve.is_empty() {
        return Vec::new();
    }

    let mut dds: Vec<Drawdown> = Vec::new();
    let points: Vec<(DateTime<Utc>, Decimal)> = curve.iter().map(|(t, v)| (*t, *v)).collect();
    let last = points.len() - 1;

    for (i, &(t, v)) in points.iter().enumerate() {
        if i == 0 {
            dds.push(Drawdown::open_at(t, v));
        } else {
            let dd = dds.last_mut().expect("seeded on i == 0");

            if v <= dd.low {
                if dd.start_at.is_none() {
                    dd.start_at = Some(t);
                }
                dd.low_at = t;
                dd.low = v;
            } else if v >= dd.high {
                if dd.start_at.is_none() {
                    dd.high_at = t;
                    dd.high = v;
                    dd.low_at = t;
                    dd.low = v;
                } else {
                    dd.close(t);
                    dds.push(Drawdown::open_at(t, v));
                }
            }
        }

        // The last point closes whatever drawdown is still open as of
        // this point, even if this same point is what set its low —
        // recovery just never arrived before the series ended.
        if i == last {
            let dd = dds.last_mut().expect("seeded on i == 0");
            if dd.start_at.is_some() && dd.end_at.is_none() {
                dd.close(t);
                dd.is_open = true;
            }
        }
    }

    if dds.last().map(|dd| dd.start_at.is_none()).unwrap_or(false) {
        dds.pop();
    }

    dds
}

/// The drawdown with the largest percentage amount. Ties resolve to
/// the later drawdown (`>=`), matching the iteration order of
/// [`drawdowns`].
pub fn max_drawdown(dds: &[Drawdown]) -> Drawdown {
    let mut max = Drawdown::default();
    for dd in dds {
        if dd.pct >= max.pct {
            max = dd.clone();
        }
    }
    max
}
