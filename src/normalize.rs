/// Normalize the overview `power` reading, which arrives either in kW or in W.
///
/// The API carries no unit, so this is a heuristic:
///
/// * `0` stays `0`
/// * `(0, 10)` is taken as kW and returned as is
/// * `[10, 1000)` with a fractional part is taken as kW and returned as is
/// * `[10, 1000)` integral is probably W, but is returned as is as well
/// * `>= 1000` is taken as W and converted to kW
///
/// Integral readings in `[10, 1000)` are ambiguous: 500 W and a hypothetical
/// 500 kW plant look the same. Unlike the `>= 1000` branch no conversion is
/// applied to them, so the returned unit differs between the two W branches.
pub fn normalize_power(raw_power: f64) -> f64 {
    if raw_power == 0.0 {
        return 0.0;
    }

    if raw_power > 0.0 && raw_power < 10.0 {
        log::debug!("power reading {} taken as kW", raw_power);
        return raw_power;
    } else if (10.0..1000.0).contains(&raw_power) && raw_power.fract() != 0.0 {
        log::debug!("decimal power reading {} taken as kW", raw_power);
        return raw_power;
    }

    if raw_power >= 1000.0 {
        let converted = raw_power / 1000.0;
        log::debug!("power reading {} W converted to {} kW", raw_power, converted);
        return converted;
    }

    /* integral reading in [10, 1000), probably W, left unconverted */
    raw_power
}
