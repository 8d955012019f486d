use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};

use river_section::{
    cross_section::{generate_cross_sections, write_report},
    crs::Crs,
    export::{join_slopes, rdp_export_file_name, write_joined_csv},
    io::{
        csv::{format_value, read_profile_csv, write_series_csv, write_table_csv},
        shp::{field_value_as_f64, read_field_names_dbf, read_polygon_records_shp},
    },
    slope::{baseline_slope, epsilon_grid, rdp_profile, ProfileBundle},
    transect::{drop_duplicate_pk, sort_by_pk, transects_from_records},
    CrossSectionParams, Result, RiverSectionError,
};

#[derive(Parser)]
#[command(name = "river_section_cli", version)]
struct Cli {
    /// EPSG code for the working coordinate system when the input has no .prj
    #[arg(long, default_value_t = 2948, global = true)]
    epsg: u32,
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate cross-section points from a transect polygon shapefile.
    CrossSections {
        transects: String,
        out_dir: String,
        /// Distance between interpolated points
        #[arg(long)]
        spacing: Option<f64>,
        /// Manning roughness coefficient
        #[arg(long)]
        manning: Option<f64>,
        /// PK distance to the neighboring transects
        #[arg(long)]
        neighbor_offset: Option<f64>,
        /// Attribute holding the flow rate
        #[arg(long)]
        flow_field: Option<String>,
        /// JSON parameter file; flags override its values
        #[arg(long)]
        params: Option<String>,
        /// Also write boundary_points.shp and boundary_lines.shp
        #[arg(long)]
        diagnostics: bool,
    },
    /// Compute the 7-sample regression slope of a pk,elevation profile.
    BaselineSlope { profile: String, output: String },
    /// Simplify a pk,elevation profile and compute segment slopes.
    Simplify {
        profile: String,
        output: String,
        #[arg(long)]
        epsilon: f64,
    },
    /// Join baseline and simplified slopes onto the transect attributes.
    RdpExport {
        transects: String,
        profile: String,
        out_dir: String,
        #[arg(long)]
        epsilon: f64,
    },
    /// Precompute simplified profiles over a grid of tolerances as JSON.
    Bundle {
        profile: String,
        output: String,
        #[arg(long, default_value_t = 0.01)]
        step: f64,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn read_profile(path: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let rows = read_profile_csv(path)?;
    log::info!("{}: {} profile samples", path, rows.len());
    Ok(rows.into_iter().unzip())
}

fn check_epsilon(epsilon: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&epsilon) {
        return Err(RiverSectionError::invalid_params(format!(
            "epsilon must lie in [0, 1], got {epsilon}"
        )));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cross_sections(
    working_crs: Crs,
    input: &str,
    out_dir: &str,
    spacing: Option<f64>,
    manning: Option<f64>,
    neighbor_offset: Option<f64>,
    flow_field: Option<String>,
    params_file: Option<String>,
    diagnostics: bool,
) -> Result<()> {
    let mut params = match params_file {
        Some(path) => CrossSectionParams::from_json_file(&path)?,
        None => CrossSectionParams::default(),
    };
    if let Some(v) = spacing {
        params.spacing = v;
    }
    if let Some(v) = manning {
        params.manning = v;
    }
    if let Some(v) = neighbor_offset {
        params.neighbor_offset = v;
    }
    if let Some(v) = flow_field {
        params.flow_field = v;
    }
    params.validate()?;

    let crs = Crs::from_shapefile(Path::new(input))?.unwrap_or(working_crs);
    log::info!("Using CRS: {}", crs.definition());

    let records = read_polygon_records_shp(input)?;
    // records sharing a PK are all kept; neighbors at that PK are merged
    let mut transects = transects_from_records(&records, &params)?;
    sort_by_pk(&mut transects);
    log::info!("{}: {} transects", input, transects.len());

    let report = generate_cross_sections(&transects, &params)?;
    for path in write_report(&report, Path::new(out_dir), &params, Some(&crs), diagnostics)? {
        println!("Wrote {}", path.display());
    }
    println!(
        "Processed {} transects, skipped {}",
        report.processed,
        report.skipped.len()
    );
    for s in &report.skipped {
        println!("Skipped transect {} (PK {}): {}", s.index, s.pk, s.reason);
    }
    Ok(())
}

fn simplify(profile: &str, output: &str, epsilon: f64) -> Result<()> {
    let (pk, elevation) = read_profile(profile)?;
    let rdp = rdp_profile(&pk, &elevation, epsilon)?;
    log::info!(
        "epsilon {}: kept {} of {} samples",
        epsilon,
        rdp.simplified.len(),
        pk.len()
    );
    let header: Vec<String> = ["pk", "elevation", "elev_rdp", "rdp_slope"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    let rows: Vec<Vec<String>> = pk
        .iter()
        .zip(&elevation)
        .zip(&rdp.interpolated_slope)
        .map(|((p, e), (_, slope))| {
            let retained = rdp
                .simplified
                .iter()
                .find(|(sp, _)| sp == p)
                .map(|(_, se)| format_value(*se))
                .unwrap_or_default();
            vec![format_value(*p), format_value(*e), retained, format_value(*slope)]
        })
        .collect();
    write_table_csv(output, &header, &rows)?;
    println!("Wrote {}", output);
    Ok(())
}

fn rdp_export(transects: &str, profile: &str, out_dir: &str, epsilon: f64) -> Result<()> {
    check_epsilon(epsilon)?;
    let params = CrossSectionParams::default();
    let (pk, elevation) = read_profile(profile)?;
    let baseline = baseline_slope(&pk, &elevation)?;
    let rdp = rdp_profile(&pk, &elevation, epsilon)?;

    let fields = read_field_names_dbf(transects)?;
    let records = read_polygon_records_shp(transects)?;
    // the viewer join needs one row per PK
    let records = drop_duplicate_pk(
        records,
        |r| {
            r.attrs
                .get(&params.pk_field)
                .and_then(field_value_as_f64)
                .unwrap_or(f64::NAN)
        },
        params.pk_tolerance,
    );
    let rows = join_slopes(
        &records,
        &params.pk_field,
        &rdp.simplified,
        &baseline,
        &rdp.interpolated_slope,
        params.pk_tolerance,
    )?;

    std::fs::create_dir_all(out_dir)?;
    let stem = Path::new(profile)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "profile".to_string());
    let path: PathBuf = Path::new(out_dir).join(rdp_export_file_name(&stem, epsilon));
    write_joined_csv(&path.to_string_lossy(), &fields, &rows)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn bundle(profile: &str, output: &str, step: f64) -> Result<()> {
    let (pk, elevation) = read_profile(profile)?;
    let epsilons = epsilon_grid(step)?;
    let bundle = ProfileBundle::build(&pk, &elevation, &epsilons)?;
    bundle.write_json(output)?;
    println!("Wrote {}", output);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let working_crs = Crs::from_epsg(cli.epsg);
    match cli.command {
        Commands::CrossSections {
            transects,
            out_dir,
            spacing,
            manning,
            neighbor_offset,
            flow_field,
            params,
            diagnostics,
        } => cross_sections(
            working_crs,
            &transects,
            &out_dir,
            spacing,
            manning,
            neighbor_offset,
            flow_field,
            params,
            diagnostics,
        ),
        Commands::BaselineSlope { profile, output } => {
            let (pk, elevation) = read_profile(&profile)?;
            let slopes = baseline_slope(&pk, &elevation)?;
            write_series_csv(&output, ["pk", "slope"], &slopes)?;
            println!("Wrote {}", output);
            Ok(())
        }
        Commands::Simplify {
            profile,
            output,
            epsilon,
        } => simplify(&profile, &output, epsilon),
        Commands::RdpExport {
            transects,
            profile,
            out_dir,
            epsilon,
        } => rdp_export(&transects, &profile, &out_dir, epsilon),
        Commands::Bundle {
            profile,
            output,
            step,
        } => bundle(&profile, &output, step),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
