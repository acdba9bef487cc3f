mod curve;
mod resolver;

pub use curve::evaluate_curve;
pub use resolver::{
    evaluate_automation, evaluate_automation_for_node, find_active_region, scale_to_range,
    ActiveRegion,
};
