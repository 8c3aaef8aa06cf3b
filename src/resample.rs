//! Multi-timeframe OHLCV resampler
//!
//! Keeps one open bar per (timeframe, symbol). A tick whose interval
//! boundary differs from the open bar's completes that bar and opens a
//! new one.
//!
//! Only equality of boundaries is checked: a late tick from an earlier
//! interval also completes the open bar and starts an older one in its
//! place. There is no deduplication at this layer.

use crate::market::{Bar, Tick, Timeframe};
use std::collections::HashMap;

/// Resampler state for all timeframes
#[derive(Debug, Default)]
pub struct Resampler {
    /// Open bars by symbol, indexed by [`Timeframe::index`]
    current: [HashMap<String, Bar>; 3],
}

impl Resampler {
    /// Create a resampler with no open bars
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a tick into every timeframe.
    ///
    /// Returns the bars completed by this tick, shortest timeframe first.
    pub fn process_tick(&mut self, tick: &Tick) -> Vec<(Timeframe, Bar)> {
        let mut completed = Vec::new();

        for tf in Timeframe::ALL {
            let boundary = tf.align(tick.timestamp);
            let bars = &mut self.current[tf.index()];

            match bars.get_mut(&tick.symbol) {
                Some(bar) if bar.timestamp == boundary => bar.apply(tick),
                Some(bar) => {
                    let done = std::mem::replace(bar, Bar::open_with(tick, boundary));
                    completed.push((tf, done));
                }
                None => {
                    bars.insert(tick.symbol.clone(), Bar::open_with(tick, boundary));
                }
            }
        }

        completed
    }

    /// The in-progress bar for a timeframe and symbol
    pub fn current_bar(&self, timeframe: Timeframe, symbol: &str) -> Option<&Bar> {
        self.current[timeframe.index()].get(symbol)
    }

    /// Number of open bars across all timeframes
    pub fn open_bars(&self) -> usize {
        self.current.iter().map(HashMap::len).sum()
    }
}
