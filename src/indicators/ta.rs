// Streaming building blocks shared by the indicator calculators.
// Each one consumes a single row at a time and keeps only the state it needs.

use crate::error::{IndicatorError, IndicatorResult};
use std::collections::VecDeque;

/// The `Next` trait is used for indicators that produce one value per input row
pub trait Next<T> {
    type Output;
    fn next(&mut self, input: T) -> Self::Output;
}

fn check_window(indicator: &'static str, window: usize) -> IndicatorResult<()> {
    if window == 0 {
        return Err(IndicatorError::InvalidParameter {
            indicator,
            reason: "window must be greater than 0".to_string(),
        });
    }
    Ok(())
}

/// Trailing window of the most recent `window` values
#[derive(Debug, Clone)]
struct Window {
    size: usize,
    values: VecDeque<f64>,
}

impl Window {
    // The buffer grows with the input, so a window longer than the series
    // costs nothing up front
    fn new(size: usize) -> Self {
        Self {
            size,
            values: VecDeque::new(),
        }
    }

    fn push(&mut self, value: f64) {
        if self.values.len() == self.size {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    fn is_full(&self) -> bool {
        self.values.len() == self.size
    }

    fn mean(&self) -> f64 {
        self.values.iter().sum::<f64>() / self.size as f64
    }
}

/// Simple Moving Average over a trailing window, undefined until the window fills
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    window: Window,
}

impl SimpleMovingAverage {
    pub fn new(window: usize) -> IndicatorResult<Self> {
        check_window("SMA", window)?;
        Ok(Self {
            window: Window::new(window),
        })
    }
}

impl Next<f64> for SimpleMovingAverage {
    type Output = Option<f64>;

    fn next(&mut self, input: f64) -> Self::Output {
        self.window.push(input);

        if self.window.is_full() {
            Some(self.window.mean())
        } else {
            None
        }
    }
}

/// Exponential Moving Average seeded with the first input.
///
/// `EMA[0] = x[0]`, then `EMA[t] = a * x[t] + (1 - a) * EMA[t-1]` with
/// `a = 2 / (span + 1)`.
#[derive(Debug, Clone)]
pub struct ExponentialMovingAverage {
    alpha: f64,
    value: Option<f64>,
}

impl ExponentialMovingAverage {
    pub fn new(span: usize) -> IndicatorResult<Self> {
        check_window("EMA", span)?;
        Ok(Self {
            alpha: 2.0 / (span as f64 + 1.0),
            value: None,
        })
    }
}

impl Next<f64> for ExponentialMovingAverage {
    type Output = f64;

    fn next(&mut self, input: f64) -> Self::Output {
        let value = match self.value {
            Some(prev) => self.alpha * input + (1.0 - self.alpha) * prev,
            None => input,
        };
        self.value = Some(value);
        value
    }
}

/// Rolling sample standard deviation (n - 1 denominator)
#[derive(Debug, Clone)]
pub struct StandardDeviation {
    window: Window,
}

impl StandardDeviation {
    pub fn new(window: usize) -> IndicatorResult<Self> {
        if window < 2 {
            return Err(IndicatorError::InvalidParameter {
                indicator: "STDDEV",
                reason: "sample standard deviation needs a window of at least 2".to_string(),
            });
        }
        Ok(Self {
            window: Window::new(window),
        })
    }
}

impl Next<f64> for StandardDeviation {
    type Output = Option<f64>;

    fn next(&mut self, input: f64) -> Self::Output {
        self.window.push(input);

        if !self.window.is_full() {
            return None;
        }

        let mean = self.window.mean();
        let variance = self
            .window
            .values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / (self.window.size - 1) as f64;

        Some(variance.sqrt())
    }
}

/// Lowest value of the trailing window
#[derive(Debug, Clone)]
pub struct Lowest {
    window: Window,
}

impl Lowest {
    pub fn new(window: usize) -> IndicatorResult<Self> {
        check_window("MIN", window)?;
        Ok(Self {
            window: Window::new(window),
        })
    }
}

impl Next<f64> for Lowest {
    type Output = Option<f64>;

    fn next(&mut self, input: f64) -> Self::Output {
        self.window.push(input);

        if !self.window.is_full() {
            return None;
        }
        self.window.values.iter().copied().reduce(f64::min)
    }
}

/// Highest value of the trailing window
#[derive(Debug, Clone)]
pub struct Highest {
    window: Window,
}

impl Highest {
    pub fn new(window: usize) -> IndicatorResult<Self> {
        check_window("MAX", window)?;
        Ok(Self {
            window: Window::new(window),
        })
    }
}

impl Next<f64> for Highest {
    type Output = Option<f64>;

    fn next(&mut self, input: f64) -> Self::Output {
        self.window.push(input);

        if !self.window.is_full() {
            return None;
        }
        self.window.values.iter().copied().reduce(f64::max)
    }
}

/// True Range of a (high, low, close) bar against the previous close.
/// The first bar has no previous close, so its range is high - low.
#[derive(Debug, Clone, Default)]
pub struct TrueRange {
    prev_close: Option<f64>,
}

impl TrueRange {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Next<(f64, f64, f64)> for TrueRange {
    type Output = f64;

    fn next(&mut self, (high, low, close): (f64, f64, f64)) -> Self::Output {
        let range = high - low;
        let tr = match self.prev_close {
            Some(prev_close) => range
                .max((high - prev_close).abs())
                .max((low - prev_close).abs()),
            None => range,
        };
        self.prev_close = Some(close);
        tr
    }
}
