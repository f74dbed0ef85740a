use crate::core::Storage;
use crate::domain::model::{AcSweep, ComponentValues};
use crate::utils::error::Result;

pub const DEFAULT_RESISTANCE: f64 = 1000.0;
pub const DEFAULT_CAPACITANCE: f64 = 1e-6;

/// Shortest round-trip rendering. Magnitudes below 1e-4 or from 1e16 up use
/// scientific notation with a signed two-digit exponent (`1e-07`).
pub fn format_value(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return format!("{}", value);
    }

    let scientific = format!("{:e}", value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return format!("{}", value);
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return format!("{}", value);
    };

    if (-4..16).contains(&exponent) {
        format!("{}", value)
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

/// Passive bandpass deck: C1/R1 high-pass into R2/C2 low-pass, 100k load,
/// log AC sweep and -3dB measurements. Missing resistors default to 1 kΩ,
/// missing capacitors to 1 µF.
pub fn render_bandpass(components: &ComponentValues, input_amplitude: f64, sweep: &AcSweep) -> String {
    let r1 = components.get_or("R1", DEFAULT_RESISTANCE);
    let r2 = components.get_or("R2", DEFAULT_RESISTANCE);
    let c1 = components.get_or("C1", DEFAULT_CAPACITANCE);
    let c2 = components.get_or("C2", DEFAULT_CAPACITANCE);

    let start = format_value(sweep.freq_start);
    let stop = format_value(sweep.freq_stop);

    let lines = vec![
        "* RC Bandpass Filter SPICE Netlist".to_string(),
        format!("* AC sweep: {}Hz to {}Hz", start, stop),
        String::new(),
        format!("Vin in 0 AC {}", format_value(input_amplitude)),
        // High-pass stage
        format!("C1 in mid {}", format_value(c1)),
        format!("R1 mid 0 {}", format_value(r1)),
        // Low-pass stage
        format!("R2 mid out {}", format_value(r2)),
        format!("C2 out 0 {}", format_value(c2)),
        "Rload out 0 100k".to_string(),
        String::new(),
        format!(".ac dec {} {} {}", sweep.points_per_decade, start, stop),
        ".print ac v(out)".to_string(),
        ".measure AC max_out max v(out)".to_string(),
        ".measure AC f_lower when v(out)=max_out/sqrt(2) rise=1".to_string(),
        ".measure AC f_upper when v(out)=max_out/sqrt(2) fall=1".to_string(),
        String::new(),
        ".end".to_string(),
    ];

    lines.join("\n")
}

/// Writes the deck verbatim and returns where it landed.
pub async fn persist<S: Storage>(storage: &S, file_name: &str, netlist: &str) -> Result<String> {
    let path = storage.write_file(file_name, netlist.as_bytes()).await?;
    tracing::debug!("Netlist ({} bytes) written to {}", netlist.len(), path);
    Ok(path)
}
