use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use solsense::irradiance::{IrradianceSource, PowerClient};
use solsense::session::{AnalysisReport, DemSession};
use solsense::types::{EnergyParams, PanelSpec, PlotSpec};

/// DEM slope/aspect analysis and solar panel yield estimation.
#[derive(Debug, Parser)]
#[command(name = "solsense", version)]
struct Cli {
    /// Input DEM GeoTIFF
    #[arg(long, value_name = "FILE")]
    input: PathBuf,

    /// Marker pixel column (anchors the plot)
    #[arg(long)]
    col: usize,

    /// Marker pixel row
    #[arg(long)]
    row: usize,

    /// Plot width in meters
    #[arg(long, default_value_t = 100.0)]
    plot_width: f64,

    /// Plot length/depth in meters
    #[arg(long, default_value_t = 50.0)]
    plot_height: f64,

    /// Panel width in meters
    #[arg(long, default_value_t = 1.65)]
    panel_width: f64,

    /// Panel height in meters
    #[arg(long, default_value_t = 1.0)]
    panel_height: f64,

    /// Panel efficiency as a fraction in (0, 1]
    #[arg(long, default_value_t = 0.18)]
    efficiency: f64,

    /// System performance ratio in (0, 1]
    #[arg(long, default_value_t = 0.8)]
    performance_ratio: f64,

    /// Pack exactly this many panels instead of filling the plot
    #[arg(long)]
    count: Option<usize>,

    /// Fixed average daily irradiance (kWh/m²/day); skips the NASA POWER
    /// lookup
    #[arg(long)]
    irradiance: Option<f64>,

    /// Export the analysis row as CSV. Without FILE a timestamped file is
    /// created under the documents directory.
    #[arg(long, value_name = "FILE", num_args = 0..=1)]
    export: Option<Option<PathBuf>>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let plot = PlotSpec::new(cli.plot_width, cli.plot_height)?;
    let panel = PanelSpec::new(cli.panel_width, cli.panel_height)?;
    let energy = EnergyParams::new(cli.efficiency, cli.performance_ratio)?;

    let mut session = DemSession::new();
    session
        .load_dem(&cli.input)
        .with_context(|| format!("failed to load {}", cli.input.display()))?;

    let marker = *session
        .place_marker(cli.col, cli.row)
        .context("failed to place marker")?;
    println!(
        "Marker: lon {:.6}, lat {:.6} (pixel {}, {})",
        marker.location.x(),
        marker.location.y(),
        marker.col,
        marker.row
    );

    let mut source = match cli.irradiance {
        Some(value) => IrradianceSource::Fixed(value),
        None => IrradianceSource::NasaPower(PowerClient::new()?),
    };

    let report = session.analyze(&plot, &panel, cli.count, &energy, &mut source)?;
    print_report(&report);

    if let Some(export) = cli.export {
        let path = match export {
            Some(path) => path,
            None => default_export_path(),
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        DemSession::export_csv(&path, &report)
            .with_context(|| format!("failed to export {}", path.display()))?;
        println!("Exported to {}", path.display());
    }

    Ok(())
}

fn print_report(report: &AnalysisReport) {
    if report.sample.slope_deg.is_nan() {
        println!("Terrain: NoData at marker");
    } else {
        println!(
            "Terrain: slope {:.2}°, aspect {} ({})",
            report.sample.slope_deg,
            if report.sample.aspect_deg < 0.0 {
                "flat".to_string()
            } else {
                format!("{:.1}°", report.sample.aspect_deg)
            },
            report.sample.direction
        );
    }

    match report.requested_count {
        Some(requested) if report.panel_count() < requested => println!(
            "Packed {} panels (requested: {})",
            report.panel_count(),
            requested
        ),
        _ => println!("Packed {} panels", report.panel_count()),
    }
    if report.iteration_cap_hit {
        println!("Note: packing stopped at the iteration ceiling");
    }

    match report.annual_kwh {
        Some(kwh) => println!("Est. annual energy: {:.2} kWh", kwh),
        None => println!("Est. annual energy: unavailable (solar data fetch failed)"),
    }
}

fn default_export_path() -> PathBuf {
    let dir = match dirs::document_dir() {
        Some(dir) => dir.join("SolSense_Exports"),
        None => PathBuf::from("exports"),
    };
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("analysis_{}.csv", timestamp))
}
