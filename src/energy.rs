//! Annual energy yield estimate for a packed panel array.

/// Estimated annual yield in kWh.
///
/// `avg_daily_irradiance` is the average daily global irradiance on the
/// panel plane in kWh/m²/day; `panel_area_m2` is the area of one panel.
pub fn annual_energy_kwh(
    avg_daily_irradiance: f64,
    panel_area_m2: f64,
    efficiency: f64,
    performance_ratio: f64,
    panel_count: usize,
) -> f64 {
    avg_daily_irradiance * panel_area_m2 * efficiency * performance_ratio * panel_count as f64
        * 365.0
}
