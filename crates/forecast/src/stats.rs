//! Small statistics helpers used by the models.

pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().sum::<f64>() / (xs.len() as f64)
}

/// Sample standard deviation (n-1).
pub fn stddev_sample(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let m = mean(xs);
    let var = xs
        .iter()
        .map(|x| {
            let d = x - m;
            d * d
        })
        .sum::<f64>()
        / ((xs.len() - 1) as f64);
    var.sqrt()
}

/// Inverse standard normal CDF (Abramowitz & Stegun 26.2.23, |error| < 4.5e-4).
pub fn quantile_normal(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let t = if p < 0.5 {
        (-2.0 * p.ln()).sqrt()
    } else {
        (-2.0 * (1.0 - p).ln()).sqrt()
    };

    let c0 = 2.515517;
    let c1 = 0.802853;
    let c2 = 0.010328;
    let d1 = 1.432788;
    let d2 = 0.189269;
    let d3 = 0.001308;

    let x = t - (c0 + c1 * t + c2 * t * t) / (1.0 + d1 * t + d2 * t * t + d3 * t * t * t);

    if p < 0.5 { -x } else { x }
}

/// Two-sided z multiplier for a central interval of the given width (e.g. 0.8).
pub fn interval_z(width: f64) -> f64 {
    quantile_normal(0.5 + width / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_normal_known_values() {
        assert!(quantile_normal(0.5).abs() < 1e-3);
        assert!((quantile_normal(0.975) - 1.96).abs() < 1e-2);
        assert!((quantile_normal(0.025) + 1.96).abs() < 1e-2);
        assert!((interval_z(0.8) - 1.2816).abs() < 1e-2);
    }

    #[test]
    fn quantile_normal_boundaries() {
        assert_eq!(quantile_normal(0.0), f64::NEG_INFINITY);
        assert_eq!(quantile_normal(1.0), f64::INFINITY);
    }

    #[test]
    fn sample_stddev() {
        assert_eq!(stddev_sample(&[1.0]), 0.0);
        let s = stddev_sample(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((s - 2.138).abs() < 1e-3);
    }
}
