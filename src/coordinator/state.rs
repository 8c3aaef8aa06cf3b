//! In-memory pipeline state guarded by the coordinator's lock

use crate::buffer::RingBuffer;
use crate::market::{Bar, Tick, Timeframe};
use crate::resample::Resampler;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Tick buffers, bar buffers and the resampler.
///
/// Everything a single message touches lives here so one write lock covers
/// the whole update.
#[derive(Debug)]
pub(crate) struct PipelineState {
    tick_capacity: usize,
    bar_capacities: [usize; 3],
    ticks: HashMap<String, RingBuffer<Tick>>,
    bars: [HashMap<String, RingBuffer<Bar>>; 3],
    resampler: Resampler,
}

impl PipelineState {
    pub(crate) fn new(symbols: &[String], tick_capacity: usize, bar_capacities: [usize; 3]) -> Self {
        let mut state = Self {
            tick_capacity,
            bar_capacities,
            ticks: HashMap::new(),
            bars: Default::default(),
            resampler: Resampler::new(),
        };

        for symbol in symbols {
            state
                .ticks
                .insert(symbol.clone(), RingBuffer::new(tick_capacity));
            for tf in Timeframe::ALL {
                state.bars[tf.index()].insert(
                    symbol.clone(),
                    RingBuffer::new(bar_capacities[tf.index()]),
                );
            }
        }

        state
    }

    /// Buffer a tick, resample it and buffer any completed bars
    pub(crate) fn apply(&mut self, tick: &Tick) -> Vec<(Timeframe, Bar)> {
        let tick_capacity = self.tick_capacity;
        self.ticks
            .entry(tick.symbol.clone())
            .or_insert_with(|| RingBuffer::new(tick_capacity))
            .push(tick.clone());

        let completed = self.resampler.process_tick(tick);
        for (tf, bar) in &completed {
            let capacity = self.bar_capacities[tf.index()];
            self.bars[tf.index()]
                .entry(bar.symbol.clone())
                .or_insert_with(|| RingBuffer::new(capacity))
                .push(bar.clone());
        }

        completed
    }

    pub(crate) fn latest_price(&self, symbol: &str) -> Option<Decimal> {
        self.ticks
            .get(symbol)
            .and_then(RingBuffer::last)
            .map(|tick| tick.price)
    }

    pub(crate) fn ticks(&self, symbol: &str) -> Vec<Tick> {
        self.ticks
            .get(symbol)
            .map(RingBuffer::snapshot)
            .unwrap_or_default()
    }

    pub(crate) fn bars(&self, timeframe: Timeframe, symbol: &str) -> Vec<Bar> {
        self.bars[timeframe.index()]
            .get(symbol)
            .map(RingBuffer::snapshot)
            .unwrap_or_default()
    }

    pub(crate) fn buffered_bars(&self, timeframe: Timeframe, symbol: &str) -> usize {
        self.bars[timeframe.index()]
            .get(symbol)
            .map_or(0, RingBuffer::len)
    }

    pub(crate) fn current_bar(&self, timeframe: Timeframe, symbol: &str) -> Option<Bar> {
        self.resampler.current_bar(timeframe, symbol).cloned()
    }

    pub(crate) fn open_bars(&self) -> usize {
        self.resampler.open_bars()
    }
}
