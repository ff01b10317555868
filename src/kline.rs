//! Price bar (component C data type, shared by D and G).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Decimal;

/// A single OHLCV bar. Invariant: `L <= min(O, C) <= max(O, C) <= H`;
/// `Start` strictly increases across a sample. Volume stays `f64` — it
/// is a count, not money, so exact decimal arithmetic buys nothing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kline {
    pub start: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: f64,
}

impl Kline {
    pub fn new(
        start: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: f64,
    ) -> Self {
        Self {
            start,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// `true` iff the bar satisfies `L <= min(O,C) <= max(O,C) <= H`.
    pub fn is_valid(&self) -> bool {
        let lo = self.open.min(self.close);
        let hi = self.open.max(self.close);
        self.low <= lo && lo <= hi && hi <= self.high
    }
}

/// The close time of a bar given the previous bar's start. `Start_next
/// + (Start_next - Start_prev)`, or `Start_next` when `Start_prev` is
/// the zero instant (i.e. there is no previous bar).
pub fn close_time(prev_start: DateTime<Utc>, start: DateTime<Utc>) -> DateTime<Utc> {
    if prev_start == DateTime::<Utc>::UNIX_EPOCH {
        start
    } else {
        start + (start - prev_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    #[test]
    fn close_time_valid_start_times() {
        let start1 = DateTime::<Utc>::UNIX_EPOCH + Duration::hours(10);
        let interval = Duration::hours(4);
        let start2 = start1 + interval;
        let want = start2 + interval;
        assert_eq!(close_time(start1, start2), want);
    }

    #[test]
    fn close_time_start1_is_zero() {
        let start2 = DateTime::<Utc>::UNIX_EPOCH + Duration::hours(4);
        assert_eq!(close_time(DateTime::<Utc>::UNIX_EPOCH, start2), start2);
    }

    #[test]
    fn validity_check() {
        let k = Kline::new(
            DateTime::<Utc>::UNIX_EPOCH,
            dec!(8),
            dec!(15),
            dec!(5),
            dec!(10),
            100.0,
        );
        assert!(k.is_valid());

        let bad = Kline::new(
            DateTime::<Utc>::UNIX_EPOCH,
            dec!(8),
            dec!(9),
            dec!(5),
            dec!(10),
            100.0,
        );
        assert!(!bad.is_valid());
    }
}
