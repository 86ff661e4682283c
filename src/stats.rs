/// Running mean over the defined values of a column.
pub struct Accumulator {
    n_vals: usize,
    sum: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            sum: 0.0,
        }
    }

    /// Add a value; missing and non-finite values are skipped.
    pub fn add(&mut self, val: Option<f64>) {
        if let Some(val) = val.filter(|v| v.is_finite()) {
            self.n_vals += 1;
            self.sum += val;
        }
    }

    pub fn mean(&self) -> Option<f64> {
        if self.n_vals == 0 {
            return None;
        }
        Some(self.sum / self.n_vals as f64)
    }
}

/// Round to two decimal places, never producing negative zero.
pub fn round_2(val: f64) -> f64 {
    let rounded = (val * 100.0).round() / 100.0;
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Mean of the defined values at each index across all columns, rounded to two decimals.
pub fn column_means<'a, I>(n_rows: usize, columns: I) -> Vec<Option<f64>>
where
    I: IntoIterator<Item = &'a [Option<f64>]>,
{
    let mut acc_vec = Vec::new();
    acc_vec.resize_with(n_rows, Accumulator::new);
    for column in columns {
        for (acc, &val) in acc_vec.iter_mut().zip(column) {
            acc.add(val);
        }
    }
    acc_vec
        .iter()
        .map(|acc| acc.mean().map(round_2))
        .collect()
}
