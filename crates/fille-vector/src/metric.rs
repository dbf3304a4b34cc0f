use fille_core::Metric;

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Scale `v` to unit length in place. Zero vectors stay zero.
pub fn normalize(v: &mut [f32]) {
    let n = norm(v);
    if n > f32::EPSILON {
        for x in v.iter_mut() { *x /= n; }
    }
}

/// Prepare a vector for scoring: cosine stores unit vectors so scoring is a
/// plain dot product either way.
pub fn prepare(metric: Metric, mut v: Vec<f32>) -> Vec<f32> {
    if metric == Metric::Cosine { normalize(&mut v); }
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_unit_and_zero() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6 && (v[1] - 0.8).abs() < 1e-6);

        let mut z = vec![0.0, 0.0];
        normalize(&mut z);
        assert_eq!(z, vec![0.0, 0.0]);
    }

    #[test]
    fn dot_leaves_magnitude() {
        assert_eq!(prepare(Metric::Dot, vec![3.0, 4.0]), vec![3.0, 4.0]);
        assert!((norm(&prepare(Metric::Cosine, vec![3.0, 4.0])) - 1.0).abs() < 1e-6);
    }
}
