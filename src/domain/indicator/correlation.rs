//! Rolling cross-asset correlation.
//!
//! Pearson correlation of simple returns over a trailing window. The
//! engine feeds weekly closes here, so a 26-period window needs 27 weekly
//! observations before the first defined value.

/// Period-over-period simple returns. Row 0 is undefined, as is any row
/// where either endpoint close is missing.
pub fn simple_returns(closes: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut returns = Vec::with_capacity(closes.len());
    for i in 0..closes.len() {
        let value = if i == 0 {
            None
        } else {
            match (closes[i - 1], closes[i]) {
                (Some(prev), Some(curr)) if prev != 0.0 => Some(curr / prev - 1.0),
                _ => None,
            }
        };
        returns.push(value);
    }
    returns
}

/// Pearson correlation between two return series over the trailing
/// `window` rows at each index. Undefined during warmup, when any return
/// in the window is missing, or when either side has zero variance.
pub fn rolling_correlation(
    xs: &[Option<f64>],
    ys: &[Option<f64>],
    window: usize,
) -> Vec<Option<f64>> {
    let len = xs.len().min(ys.len());
    let mut values = Vec::with_capacity(len);
    let warmup = window.saturating_sub(1);

    for i in 0..len {
        if window < 2 || i < warmup {
            values.push(None);
            continue;
        }
        values.push(pearson(&xs[i + 1 - window..=i], &ys[i + 1 - window..=i]));
    }

    values
}

fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let n = xs.len() as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        sum_x += (*x)?;
        sum_y += (*y)?;
    }
    let mean_x = sum_x / n;
    let mean_y = sum_y / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x.unwrap() - mean_x;
        let dy = y.unwrap() - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x * var_y).sqrt())
}
