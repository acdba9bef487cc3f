use crate::models::automation::{AutomationCurve, Interpolation, Keyframe};

/// Evaluate a curve at normalized time `s` (clamped to 0..1).
///
/// Keyframes are sorted by time first (stable, so same-time keyframes keep
/// their authored order). No keyframes yields 0, a single keyframe yields its
/// value everywhere. Every mode passes exactly through each keyframe value.
pub fn evaluate_curve(curve: &AutomationCurve, s: f64) -> f64 {
    let keys = sorted_keyframes(&curve.keyframes);
    match keys.len() {
        0 => return 0.0,
        1 => return keys[0].value,
        _ => {}
    }

    let s = if s.is_nan() { 0.0 } else { s.clamp(0.0, 1.0) };
    let last = keys.len() - 1;
    if s >= keys[last].time {
        return keys[last].value;
    }

    // Last keyframe at or before `s`, kept inside the final segment.
    let i = keys
        .partition_point(|k| k.time <= s)
        .saturating_sub(1)
        .min(last - 1);
    let k0 = keys[i];
    let k1 = keys[i + 1];

    let span = k1.time - k0.time;
    let t = if span > 0.0 {
        ((s - k0.time) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };

    match curve.interpolation {
        Interpolation::Stepped => k0.value,
        Interpolation::Linear => lerp(k0.value, k1.value, t),
        Interpolation::Bezier => {
            let m0 = tangent(&keys, i);
            let m1 = tangent(&keys, i + 1);
            hermite(k0.value, k1.value, m0 * span, m1 * span, t)
        }
    }
}

fn sorted_keyframes(keyframes: &[Keyframe]) -> Vec<Keyframe> {
    let mut keys = keyframes.to_vec();
    keys.sort_by(|a, b| a.time.total_cmp(&b.time));
    keys
}

/// Exact at both ends: returns `a` at t=0 and `b` at t=1.
fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

/// Slope at keyframe `i`: central difference inside, one-sided at the edges.
fn tangent(keys: &[Keyframe], i: usize) -> f64 {
    let last = keys.len() - 1;
    let (a, b) = match i {
        0 => (0, 1),
        i if i == last => (last - 1, last),
        i => (i - 1, i + 1),
    };
    let dt = keys[b].time - keys[a].time;
    if dt > 0.0 {
        (keys[b].value - keys[a].value) / dt
    } else {
        0.0
    }
}

fn hermite(p0: f64, p1: f64, m0: f64, m1: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;
    h00 * p0 + h10 * m0 + h01 * p1 + h11 * m1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve(mode: Interpolation, points: &[(f64, f64)]) -> AutomationCurve {
        AutomationCurve::new(
            mode,
            points.iter().map(|&(t, v)| Keyframe::new(t, v)).collect(),
        )
    }

    const MODES: [Interpolation; 3] = [
        Interpolation::Stepped,
        Interpolation::Linear,
        Interpolation::Bezier,
    ];

    #[test]
    fn empty_curve_is_zero() {
        for mode in MODES {
            assert_eq!(evaluate_curve(&curve(mode, &[]), 0.3), 0.0);
        }
    }

    #[test]
    fn single_keyframe_is_constant() {
        for mode in MODES {
            let c = curve(mode, &[(0.7, 0.25)]);
            assert_eq!(evaluate_curve(&c, 0.0), 0.25);
            assert_eq!(evaluate_curve(&c, 1.0), 0.25);
        }
    }

    #[test]
    fn passes_through_every_keyframe_in_every_mode() {
        let points = [(0.0, 0.1), (0.2, 0.7), (0.45, -0.3), (0.8, 0.9), (1.0, 0.35)];
        for mode in MODES {
            let c = curve(mode, &points);
            for &(t, v) in &points {
                assert_eq!(evaluate_curve(&c, t), v, "mode={mode:?} t={t}");
            }
        }
    }

    #[test]
    fn linear_midpoint() {
        let c = curve(Interpolation::Linear, &[(0.0, 0.0), (1.0, 1.0)]);
        assert!((evaluate_curve(&c, 0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn stepped_holds_previous_value() {
        let c = curve(Interpolation::Stepped, &[(0.0, 0.0), (1.0, 1.0)]);
        assert_eq!(evaluate_curve(&c, 0.999), 0.0);
        assert_eq!(evaluate_curve(&c, 1.0), 1.0);
    }

    #[test]
    fn unsorted_input_is_sorted_before_evaluation() {
        let c = curve(Interpolation::Linear, &[(1.0, 1.0), (0.0, 0.0)]);
        assert!((evaluate_curve(&c, 0.25) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn time_is_clamped_to_unit_range() {
        let c = curve(Interpolation::Linear, &[(0.0, 2.0), (1.0, 4.0)]);
        assert_eq!(evaluate_curve(&c, -3.0), 2.0);
        assert_eq!(evaluate_curve(&c, 7.0), 4.0);
    }

    #[test]
    fn same_time_keyframes_do_not_divide_by_zero() {
        let c = curve(Interpolation::Linear, &[(0.0, 0.0), (0.5, 0.2), (0.5, 0.8), (1.0, 1.0)]);
        let before = evaluate_curve(&c, 0.4999);
        let after = evaluate_curve(&c, 0.5);
        assert!(before.is_finite() && after.is_finite());
        assert_eq!(after, 0.8);
    }

    #[test]
    fn bezier_is_smooth_through_interior_keyframe() {
        let c = curve(Interpolation::Bezier, &[(0.0, 0.0), (0.5, 1.0), (1.0, 0.0)]);
        let eps = 1e-6;
        let left = (evaluate_curve(&c, 0.5) - evaluate_curve(&c, 0.5 - eps)) / eps;
        let right = (evaluate_curve(&c, 0.5 + eps) - evaluate_curve(&c, 0.5)) / eps;
        assert!((left - right).abs() < 1e-3, "left={left} right={right}");
    }

    #[test]
    fn bezier_on_collinear_keys_matches_linear() {
        let c = curve(Interpolation::Bezier, &[(0.0, 0.0), (0.5, 0.5), (1.0, 1.0)]);
        assert!((evaluate_curve(&c, 0.3) - 0.3).abs() < 1e-9);
    }
}
