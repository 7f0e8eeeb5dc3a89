//! `tally run` and `tally validate`: config-driven two-source reconciliation.

use std::path::{Path, PathBuf};

use tally_recon::table::{load_csv_file, write_aggregates_csv, write_records_csv};
use tally_recon::{ReconConfig, ReconResult, Side};

use crate::exit_codes::{EXIT_RECON_DIAGNOSTICS, EXIT_RECON_DIFFERENCES};
use crate::CliError;

pub struct RunArgs {
    pub config: PathBuf,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub records: Option<PathBuf>,
    pub aggregates_dir: Option<PathBuf>,
    pub fail_on_diagnostics: bool,
}

fn load_config(config_path: &Path) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        CliError::args(format!("cannot read config {}: {e}", config_path.display()))
    })?;
    ReconConfig::from_toml(&config_str).map_err(CliError::recon)
}

/// Paths inside the config are relative to the config file's directory.
fn resolve(base_dir: &Path, path: &str) -> PathBuf {
    base_dir.join(path)
}

pub fn cmd_run(args: RunArgs) -> Result<(), CliError> {
    let config = load_config(&args.config)?;
    let base_dir = args.config.parent().unwrap_or_else(|| Path::new("."));

    let left_path = resolve(base_dir, &config.left.file);
    let right_path = resolve(base_dir, &config.right.file);
    log::debug!("left: {}", left_path.display());
    log::debug!("right: {}", right_path.display());

    let left = load_csv_file(Side::Left, &left_path, &config.left).map_err(CliError::recon)?;
    let right = load_csv_file(Side::Right, &right_path, &config.right).map_err(CliError::recon)?;

    let result = tally_recon::run(&config, left, right).map_err(CliError::recon)?;

    // Output
    let json_path = args
        .output
        .or_else(|| config.output.json.as_deref().map(|p| resolve(base_dir, p)));
    if args.json || json_path.is_some() {
        let json_str = result.to_json().map_err(|e| CliError::io(e.to_string()))?;
        if let Some(ref path) = json_path {
            std::fs::write(path, &json_str)
                .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))?;
            eprintln!("wrote {}", path.display());
        }
        if args.json {
            println!("{json_str}");
        }
    }

    let records_path = args
        .records
        .or_else(|| config.output.records_csv.as_deref().map(|p| resolve(base_dir, p)));
    if let Some(ref path) = records_path {
        let file = create_file(path)?;
        write_records_csv(file, &result.meta.key_fields, &result.records, &config.compare)
            .map_err(|e| CliError::io(e.to_string()))?;
        eprintln!("wrote {}", path.display());
    }

    let aggregates_dir = args
        .aggregates_dir
        .or_else(|| config.output.aggregates_dir.as_deref().map(|p| resolve(base_dir, p)));
    if let Some(ref dir) = aggregates_dir {
        write_aggregations(dir, &result, &config)?;
    }

    print_summary(&result);

    // Exit code
    let s = &result.summary;
    if args.fail_on_diagnostics && s.diagnostics > 0 {
        return Err(CliError::new(
            EXIT_RECON_DIAGNOSTICS,
            format!("{} diagnostic(s) reported", s.diagnostics),
        )
        .with_hint("rerun with --json to list them"));
    }
    if s.status_counts.unreconciled() > 0 {
        return Err(CliError::new(
            EXIT_RECON_DIFFERENCES,
            format!("{} of {} key(s) not reconciled", s.status_counts.unreconciled(), s.total_records),
        ));
    }

    Ok(())
}

fn create_file(path: &Path) -> Result<std::fs::File, CliError> {
    std::fs::File::create(path)
        .map_err(|e| CliError::io(format!("cannot write {}: {e}", path.display())))
}

fn write_aggregations(dir: &Path, result: &ReconResult, config: &ReconConfig) -> Result<(), CliError> {
    std::fs::create_dir_all(dir)
        .map_err(|e| CliError::io(format!("cannot create {}: {e}", dir.display())))?;
    for agg in &result.aggregations {
        let path = dir.join(format!("{}.csv", agg.name));
        let file = create_file(&path)?;
        write_aggregates_csv(file, &agg.group_by, &agg.rows, &config.compare)
            .map_err(|e| CliError::io(e.to_string()))?;
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}

/// Human summary to stderr.
fn print_summary(result: &ReconResult) {
    let s = &result.summary;
    let c = &s.status_counts;
    eprintln!(
        "recon '{}': {} key(s): {} match, {} mismatch, {} left only, {} right only, {} indeterminate",
        result.meta.config_name,
        s.total_records,
        c.matched,
        c.mismatched,
        c.left_only,
        c.right_only,
        c.indeterminate,
    );
    eprintln!(
        "inputs: left {} record(s) / {} key(s), right {} record(s) / {} key(s)",
        s.left_input, s.left_keys, s.right_input, s.right_keys,
    );
    eprintln!(
        "diagnostics: {} ({} duplicate(s) discarded, {} type mismatch(es), {} unmatched field(s))",
        s.diagnostics, s.duplicates_discarded, s.type_mismatches, s.unmatched_fields,
    );

    for agg in &result.aggregations {
        if let Some(total) = agg.rows.iter().find(|r| r.is_grand_total()) {
            for field in &total.fields {
                eprintln!(
                    "aggregate '{}': {} gap {} over {} row(s)",
                    agg.name,
                    field.field,
                    field.absolute_gap,
                    agg.rows.len(),
                );
            }
        }
    }
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    eprintln!(
        "valid: recon '{}' with {} key component(s), {} compared field(s), {} aggregation(s)",
        config.name,
        config.key.len(),
        config.compare.len(),
        config.aggregate.len(),
    );
    Ok(())
}
