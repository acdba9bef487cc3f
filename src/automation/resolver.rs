use std::collections::HashMap;

use super::curve::evaluate_curve;
use crate::models::automation::{AutomationRegion, AutomationState};
use crate::models::node_graph::{NodeTypeDef, ParamDef};

/// The region driving a parameter at some transport time.
#[derive(Clone, Copy, Debug)]
pub struct ActiveRegion<'a> {
    pub region: &'a AutomationRegion,
    /// Seconds since the region (or the current loop pass) started.
    pub local_time: f64,
    /// `local_time / duration`, in 0..1.
    pub normalized_time: f64,
}

/// Find the region of the `(node_id, param_name)` lane that covers time `t`.
///
/// Regions are tried in start-time order; regions starting together keep their
/// declaration order. Zero-length regions are never active. A looping region
/// covers everything from its start onwards.
pub fn find_active_region<'a>(
    state: &'a AutomationState,
    node_id: &str,
    param_name: &str,
    t: f64,
) -> Option<ActiveRegion<'a>> {
    if !t.is_finite() {
        return None;
    }
    let lane = state.lane(node_id, param_name)?;

    let mut regions: Vec<&AutomationRegion> = lane.regions.iter().collect();
    regions.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    for region in regions {
        if !(region.duration > 0.0) {
            continue;
        }
        let elapsed = t - region.start_time;
        let local_time = if region.looped {
            if elapsed < 0.0 {
                continue;
            }
            let wrapped = elapsed.rem_euclid(region.duration);
            // rem_euclid can round up to the divisor for tiny negative inputs.
            if wrapped >= region.duration {
                0.0
            } else {
                wrapped
            }
        } else {
            if elapsed < 0.0 || elapsed >= region.duration {
                continue;
            }
            elapsed
        };

        return Some(ActiveRegion {
            region,
            local_time,
            normalized_time: local_time / region.duration,
        });
    }
    None
}

/// Automation value of one parameter at time `t`, scaled into the parameter's
/// declared range. `None` means the parameter is not automated at `t`, which is
/// distinct from automation producing zero.
pub fn evaluate_automation(
    state: &AutomationState,
    node_id: &str,
    param_name: &str,
    t: f64,
    param_def: &ParamDef,
) -> Option<f64> {
    let active = find_active_region(state, node_id, param_name, t)?;
    let raw = evaluate_curve(&active.region.curve, active.normalized_time);
    Some(scale_to_range(raw, param_def))
}

/// Map a curve output (authored in 0..1) into the parameter range and clamp.
pub fn scale_to_range(raw: f64, param_def: &ParamDef) -> f64 {
    let (min, max) = param_def.range();
    let scaled = min + raw * (max - min);
    scaled.clamp(min.min(max), min.max(max))
}

/// Every automated parameter of one node at time `t`.
pub fn evaluate_automation_for_node(
    state: &AutomationState,
    node_id: &str,
    node_type: &NodeTypeDef,
    t: f64,
) -> HashMap<String, f64> {
    let mut values = HashMap::new();
    for lane in state.lanes_for_node(node_id) {
        let Some(def) = node_type.param(&lane.param_name) else {
            log::trace!(
                "automation lane '{}' targets unknown parameter {}.{}",
                lane.id,
                node_id,
                lane.param_name
            );
            continue;
        };
        if values.contains_key(&lane.param_name) {
            continue;
        }
        if let Some(value) = evaluate_automation(state, node_id, &lane.param_name, t, def) {
            values.insert(lane.param_name.clone(), value);
        }
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::automation::{AutomationCurve, AutomationLane};

    fn state_with(regions: Vec<AutomationRegion>) -> AutomationState {
        AutomationState {
            lanes: vec![AutomationLane::new("lane", "osc", "freq", regions)],
        }
    }

    fn ramp() -> AutomationCurve {
        AutomationCurve::linear(&[(0.0, 0.0), (1.0, 1.0)])
    }

    #[test]
    fn non_looping_region_covers_half_open_interval() {
        let state = state_with(vec![AutomationRegion::new("r", 0.0, 10.0, ramp())]);

        let active = find_active_region(&state, "osc", "freq", 5.0).unwrap();
        assert_eq!(active.normalized_time, 0.5);
        assert_eq!(active.local_time, 5.0);

        assert!(find_active_region(&state, "osc", "freq", 15.0).is_none());
        assert!(find_active_region(&state, "osc", "freq", 10.0).is_none());
        assert!(find_active_region(&state, "osc", "freq", -1.0).is_none());
    }

    #[test]
    fn scales_into_param_range() {
        let state = state_with(vec![AutomationRegion::new("r", 0.0, 10.0, ramp())]);
        let def = ParamDef::number("freq", "Frequency", 12.0).with_range(10.0, 20.0);

        let value = evaluate_automation(&state, "osc", "freq", 5.0, &def).unwrap();
        assert!((value - 15.0).abs() < 1e-12);
        assert_eq!(evaluate_automation(&state, "osc", "freq", 15.0, &def), None);
    }

    #[test]
    fn out_of_range_curve_output_is_clamped() {
        let curve = AutomationCurve::linear(&[(0.0, -1.0), (1.0, 2.0)]);
        let state = state_with(vec![AutomationRegion::new("r", 0.0, 1.0, curve)]);
        let def = ParamDef::number("freq", "Frequency", 0.0).with_range(10.0, 20.0);

        assert_eq!(evaluate_automation(&state, "osc", "freq", 0.0, &def), Some(10.0));
        assert_eq!(evaluate_automation(&state, "osc", "freq", 0.99, &def), Some(20.0));
    }

    #[test]
    fn looping_region_wraps() {
        let state = state_with(vec![AutomationRegion::new("r", 0.0, 4.0, ramp()).looping()]);

        let first = find_active_region(&state, "osc", "freq", 0.5).unwrap();
        let wrapped = find_active_region(&state, "osc", "freq", 4.5).unwrap();
        assert_eq!(first.normalized_time, wrapped.normalized_time);
        assert!(find_active_region(&state, "osc", "freq", 400.25).is_some());
        assert!(find_active_region(&state, "osc", "freq", -0.5).is_none());
    }

    #[test]
    fn zero_duration_regions_are_skipped() {
        let state = state_with(vec![
            AutomationRegion::new("empty", 0.0, 0.0, ramp()),
            AutomationRegion::new("real", 0.0, 2.0, ramp()),
        ]);
        let active = find_active_region(&state, "osc", "freq", 1.0).unwrap();
        assert_eq!(active.region.id, "real");
    }

    #[test]
    fn earliest_start_wins_then_declaration_order() {
        let state = state_with(vec![
            AutomationRegion::new("late", 2.0, 10.0, ramp()),
            AutomationRegion::new("first", 0.0, 10.0, ramp()),
            AutomationRegion::new("second", 0.0, 10.0, ramp()),
        ]);
        let active = find_active_region(&state, "osc", "freq", 3.0).unwrap();
        assert_eq!(active.region.id, "first");
    }

    #[test]
    fn non_finite_time_is_never_active() {
        let state = state_with(vec![AutomationRegion::new("r", 0.0, 10.0, ramp())]);
        assert!(find_active_region(&state, "osc", "freq", f64::NAN).is_none());
        assert!(find_active_region(&state, "osc", "freq", f64::INFINITY).is_none());

        let looped = state_with(vec![AutomationRegion::new("r", 0.0, 4.0, ramp()).looping()]);
        assert!(find_active_region(&looped, "osc", "freq", f64::NAN).is_none());
        assert!(find_active_region(&looped, "osc", "freq", f64::INFINITY).is_none());
    }

    #[test]
    fn unknown_lane_yields_none() {
        let state = state_with(vec![AutomationRegion::new("r", 0.0, 10.0, ramp())]);
        assert!(find_active_region(&state, "osc", "gain", 1.0).is_none());
        assert!(find_active_region(&state, "lfo", "freq", 1.0).is_none());
    }
}
