/// Maps a continuous value onto a discrete range by quantiles of a sample domain.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileScale<R> {
    domain: Vec<f64>,
    thresholds: Vec<f64>,
    range: Vec<R>,
}

impl<R> QuantileScale<R> {
    /// NaN samples are dropped; `range` is ordered from the lowest bucket up.
    pub fn new(values: impl IntoIterator<Item = f64>, range: Vec<R>) -> Self {
        let mut domain: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
        domain.sort_by(f64::total_cmp);

        let n = range.len();
        let thresholds = if domain.is_empty() {
            Vec::new()
        } else {
            (1..n)
                .map(|i| quantile_sorted(&domain, i as f64 / n as f64))
                .collect()
        };

        Self {
            domain,
            thresholds,
            range,
        }
    }

    /// The bucket for `value`, or `None` for NaN and for an empty sample domain.
    pub fn bucket(&self, value: f64) -> Option<usize> {
        if value.is_nan() || self.domain.is_empty() || self.range.is_empty() {
            return None;
        }
        Some(self.thresholds.partition_point(|t| *t <= value))
    }

    pub fn apply(&self, value: f64) -> Option<&R> {
        self.bucket(value).map(|i| &self.range[i])
    }

    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    pub fn range(&self) -> &[R] {
        &self.range
    }

    /// The `[low, high]` extent of sample values falling in bucket `index`.
    pub fn invert_extent(&self, index: usize) -> Option<(f64, f64)> {
        if self.domain.is_empty() || index >= self.range.len() {
            return None;
        }
        let low = if index > 0 {
            self.thresholds[index - 1]
        } else {
            self.domain[0]
        };
        let high = if index < self.thresholds.len() {
            self.thresholds[index]
        } else {
            self.domain[self.domain.len() - 1]
        };
        Some((low, high))
    }
}

/// R-7 quantile of an ascending, NaN-free, non-empty slice.
fn quantile_sorted(values: &[f64], p: f64) -> f64 {
    let n = values.len();
    if p <= 0.0 || n < 2 {
        return values[0];
    }
    if p >= 1.0 {
        return values[n - 1];
    }
    let i = (n - 1) as f64 * p;
    let i0 = i.floor() as usize;
    let v0 = values[i0];
    let v1 = values[i0 + 1];
    v0 + (v1 - v0) * (i - i0 as f64)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn apply(&self, value: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let t = if d1 - d0 == 0.0 {
            0.5
        } else {
            (value - d0) / (d1 - d0)
        };
        r0 + t * (r1 - r0)
    }

    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let (lo, hi) = if self.domain.0 <= self.domain.1 {
            self.domain
        } else {
            (self.domain.1, self.domain.0)
        };
        ticks(lo, hi, count as f64)
    }

    pub fn tick_step(&self, count: usize) -> f64 {
        let ticks = self.ticks(count);
        match ticks.as_slice() {
            [a, b, ..] => b - a,
            _ => 1.0,
        }
    }
}

fn tick_spec(start: f64, stop: f64, count: f64) -> (f64, f64, f64) {
    let step = (stop - start) / count.max(0.0);
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };

    let (mut i1, mut i2, inc);
    if power < 0.0 {
        let inv = 10f64.powf(-power) / factor;
        i1 = (start * inv).round();
        i2 = (stop * inv).round();
        if i1 / inv < start {
            i1 += 1.0;
        }
        if i2 / inv > stop {
            i2 -= 1.0;
        }
        inc = -inv;
    } else {
        let step = 10f64.powf(power) * factor;
        i1 = (start / step).round();
        i2 = (stop / step).round();
        if i1 * step < start {
            i1 += 1.0;
        }
        if i2 * step > stop {
            i2 -= 1.0;
        }
        inc = step;
    }

    if i2 < i1 && (0.5..2.0).contains(&count) {
        return tick_spec(start, stop, count * 2.0);
    }
    (i1, i2, inc)
}

fn ticks(start: f64, stop: f64, count: f64) -> Vec<f64> {
    if !(count > 0.0) || !start.is_finite() || !stop.is_finite() {
        return Vec::new();
    }
    if start == stop {
        return vec![start];
    }
    let (i1, i2, inc) = tick_spec(start, stop, count);
    if !(i2 >= i1) {
        return Vec::new();
    }
    let n = (i2 - i1) as usize + 1;
    (0..n)
        .map(|i| {
            let k = i1 + i as f64;
            if inc < 0.0 {
                k / -inc
            } else {
                k * inc
            }
        })
        .collect()
}

/// Formats a tick with just enough decimals for `step`.
pub fn format_tick(value: f64, step: f64) -> String {
    let decimals = if step > 0.0 && step < 1.0 {
        (-step.log10().floor()) as usize
    } else {
        0
    };
    format!("{:.*}", decimals, value)
}

/// Evenly divides a range into padded bands, one per domain entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandScale {
    start: f64,
    step: f64,
    bandwidth: f64,
}

impl BandScale {
    pub fn new(count: usize, range: (f64, f64), padding_inner: f64, padding_outer: f64) -> Self {
        let (r0, r1) = range;
        let n = count as f64;
        let step = (r1 - r0) / (n - padding_inner + padding_outer * 2.0).max(1.0);
        let start = r0 + (r1 - r0 - step * (n - padding_inner)) * 0.5;
        Self {
            start,
            step,
            bandwidth: step * (1.0 - padding_inner),
        }
    }

    pub fn position(&self, index: usize) -> f64 {
        self.start + self.step * index as f64
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    pub fn step(&self) -> f64 {
        self.step
    }
}
