use crate::domain::model::{ComponentValues, DesignRequest};
use std::f64::consts::PI;

/// 0.1 µF, used for both capacitors of the analytic design.
pub const FALLBACK_CAPACITANCE: f64 = 0.1e-6;

/// Analytic high-pass/low-pass design with equal capacitors.
///
/// `R = 1 / (2π·f0·√(C1·C2))`, `R1 = R`, `R2 = R·Q` with `Q = f0 / BW`.
/// Always returns `R1, R2, C1, C2` in that order.
pub fn closed_form_design(request: &DesignRequest) -> ComponentValues {
    let c1 = FALLBACK_CAPACITANCE;
    let c2 = FALLBACK_CAPACITANCE;

    let r = 1.0 / (2.0 * PI * request.center_freq * (c1 * c2).sqrt());
    let q = request.quality_factor();

    let mut components = ComponentValues::new();
    components.insert("R1", r);
    components.insert("R2", r * q);
    components.insert("C1", c1);
    components.insert("C2", c2);
    components
}
