//! Activations and output selection

/// Zero every negative element
pub fn relu_in_place(values: &mut [i32]) {
    for v in values.iter_mut() {
        if *v < 0 {
            *v = 0;
        }
    }
}

/// Index of the largest element; ties go to the lowest index.
///
/// Used as a hard-max on the output logits in place of softmax: softmax is
/// strictly increasing in each logit, so both select the same class, and the
/// device never needs an exponential.
pub fn argmax<T: PartialOrd + Copy>(values: &[T]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

/// Numerically stable softmax (host-side only)
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_relu() {
        let mut v = vec![-5, 0, 3, i32::MIN, 7];
        relu_in_place(&mut v);
        assert_eq!(v, vec![0, 0, 3, 0, 7]);
    }

    #[test]
    fn test_argmax_first_of_ties() {
        assert_eq!(argmax(&[1, 9, 3, 9]), 1);
        assert_eq!(argmax(&[-4, -2, -3]), 1);
        assert_eq!(argmax(&[5]), 0);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let p = softmax(&[1.0, 2.0, 3.0]);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn test_softmax_large_logits_stable() {
        let p = softmax(&[1000.0, 1001.0]);
        assert!(p.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_hardmax_matches_softmax_argmax() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..1000 {
            let logits: Vec<i32> = (0..10).map(|_| rng.gen_range(-4000..4000)).collect();
            let as_real: Vec<f64> = logits.iter().map(|&l| l as f64 / 1024.0).collect();
            assert_eq!(argmax(&logits), argmax(&softmax(&as_real)));
        }
    }
}
