//! Step and cumulative return series.

/// Simple returns with a leading zero: `r[0] = 0`,
/// `r[i] = (e[i] - e[i-1]) / e[i-1]`.
///
/// A step whose prior value is exactly zero is undefined and comes back as
/// `NaN`; the second element of the tuple is the first such tick.
pub fn step_returns(values: &[f64]) -> (Vec<f64>, Option<usize>) {
    let mut out = Vec::with_capacity(values.len());
    let mut exhausted_at = None;
    for i in 0..values.len() {
        if i == 0 {
            out.push(0.0);
            continue;
        }
        let prev = values[i - 1];
        if prev == 0.0 {
            exhausted_at.get_or_insert(i);
            out.push(f64::NAN);
        } else {
            out.push((values[i] - prev) / prev);
        }
    }
    (out, exhausted_at)
}

/// Compounded return to date: `c[i] = Π(1 + r[0..=i]) - 1`.
///
/// A `NaN` step poisons every later value.
pub fn cumulative_returns(step: &[f64]) -> Vec<f64> {
    let mut growth = 1.0;
    step.iter()
        .map(|r| {
            growth *= 1.0 + r;
            growth - 1.0
        })
        .collect()
}
