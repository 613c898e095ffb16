//! SurvivorCare CLI - Command-line interface for follow-up plan generation
//!
//! Architecture: Application Layer - CLI coordinates user interactions with domain services
//! - Translates commands into catalog, planner and report operations
//! - Handles external concerns like file I/O, process exit codes and terminal output
//! - Every failure surfaces as a single "Error: ..." line and exit code 1

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;
use survivor_care::{
    BatchOptions, CareError, CareResult, ExposureType, OutputFormat, PlanRequest, ReportFormatter,
    ReportOptions, RiskLevel, RuleCatalog, SurvivorCare,
};

/// Catalog files picked up from the working directory when --catalog is absent
const DEFAULT_CATALOG_FILES: &[&str] = &["survivor_care_rules.yaml", "survivor_care_rules.yml"];

/// SurvivorCare - Guideline-driven follow-up plans for childhood cancer survivors
#[derive(Parser)]
#[command(name = "survivor-care")]
#[command(version)]
#[command(about = "Generate long-term follow-up plans for childhood cancer survivors")]
#[command(long_about = "SurvivorCare matches a survivor's treatment exposures against COG v6.0 and PanCare guideline rules and produces a deduplicated, risk-ranked surveillance plan for clinicians and patients.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Rule catalog file (YAML)
    #[arg(short, long, global = true)]
    catalog: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a follow-up plan for one patient
    Generate {
        /// Plan request file (.json, .yaml or .yml)
        request: PathBuf,

        /// Name of the requesting clinician
        #[arg(long)]
        clinician: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "clinician")]
        format: OutputFormatArg,

        /// Minimum risk level to report
        #[arg(long, value_enum)]
        min_risk: Option<RiskArg>,

        /// Maximum number of recommendations to report
        #[arg(long)]
        max_recommendations: Option<usize>,
    },

    /// Generate plans for a list of patients (JSON output)
    Batch {
        /// File holding a list of plan requests
        requests: PathBuf,

        /// Name of the requesting clinician
        #[arg(long)]
        clinician: String,

        /// Disable parallel processing
        #[arg(long)]
        no_parallel: bool,

        /// Stop at the first invalid request
        #[arg(long)]
        fail_fast: bool,
    },

    /// List catalog rules
    Rules {
        /// Filter by exposure type
        #[arg(long, value_enum)]
        exposure_type: Option<ExposureTypeArg>,

        /// Print the whole catalog as JSON
        #[arg(long, conflicts_with = "exposure_type")]
        json: bool,
    },

    /// Explain what a specific rule does
    Explain {
        /// Rule ID to explain
        rule_id: String,
    },

    /// Validate a rule catalog file
    ValidateCatalog {
        /// Catalog file to validate
        catalog_file: Option<PathBuf>,
    },

    /// Show canonical exposure labels
    Vocabulary {
        /// Filter by exposure type
        #[arg(long, value_enum)]
        exposure_type: Option<ExposureTypeArg>,
    },
}

#[derive(Copy, Clone, ValueEnum, PartialEq)]
enum OutputFormatArg {
    Clinician,
    Patient,
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Clinician => OutputFormat::Clinician,
            OutputFormatArg::Patient => OutputFormat::Patient,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum RiskArg {
    Low,
    Moderate,
    High,
}

impl From<RiskArg> for RiskLevel {
    fn from(arg: RiskArg) -> Self {
        match arg {
            RiskArg::Low => RiskLevel::Low,
            RiskArg::Moderate => RiskLevel::Moderate,
            RiskArg::High => RiskLevel::High,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum ExposureTypeArg {
    Chemotherapy,
    Radiation,
    Surgery,
    Hsct,
}

impl From<ExposureTypeArg> for ExposureType {
    fn from(arg: ExposureTypeArg) -> Self {
        match arg {
            ExposureTypeArg::Chemotherapy => ExposureType::Chemotherapy,
            ExposureTypeArg::Radiation => ExposureType::Radiation,
            ExposureTypeArg::Surgery => ExposureType::Surgery,
            ExposureTypeArg::Hsct => ExposureType::Hsct,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run_command(cli) {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_command(cli: Cli) -> CareResult<i32> {
    let use_colors = !cli.no_color;

    match cli.command {
        Commands::Generate { request, clinician, format, min_risk, max_recommendations } => {
            let options = ReportOptions {
                use_colors,
                min_risk: min_risk.map(Into::into),
                max_recommendations,
                ..Default::default()
            };
            run_generate(cli.catalog.as_deref(), &request, &clinician, format, options)
        }
        Commands::Batch { requests, clinician, no_parallel, fail_fast } => {
            let options = BatchOptions { parallel: !no_parallel, fail_fast };
            run_batch(cli.catalog.as_deref(), &requests, &clinician, &options)
        }
        Commands::Rules { exposure_type, json } => {
            run_list_rules(cli.catalog.as_deref(), exposure_type.map(Into::into), json)
        }
        Commands::Explain { rule_id } => run_explain(cli.catalog.as_deref(), &rule_id),
        Commands::ValidateCatalog { catalog_file } => {
            run_validate_catalog(catalog_file.or(cli.catalog).as_deref())
        }
        Commands::Vocabulary { exposure_type } => {
            run_vocabulary(cli.catalog.as_deref(), exposure_type.map(Into::into))
        }
    }
}

/// Explicit path, then a catalog file in the working directory, then the built-in rules
fn load_catalog(path: Option<&Path>) -> CareResult<RuleCatalog> {
    if let Some(path) = path {
        return RuleCatalog::load_from_file(path);
    }

    for name in DEFAULT_CATALOG_FILES {
        if Path::new(name).exists() {
            tracing::debug!("Using rule catalog found in working directory: {}", name);
            return RuleCatalog::load_from_file(name);
        }
    }

    Ok(RuleCatalog::default())
}

fn run_generate(
    catalog_path: Option<&Path>,
    request_path: &Path,
    clinician: &str,
    format: OutputFormatArg,
    options: ReportOptions,
) -> CareResult<i32> {
    let engine = SurvivorCare::new_with_catalog(load_catalog(catalog_path)?)?
        .with_report_formatter(ReportFormatter::new(options));

    let request = PlanRequest::load_from_file(request_path)?;
    let plan = engine.generate_request(&request, clinician)?;

    println!("{}", engine.format_plan(&plan, format.into())?);
    Ok(0)
}

fn run_batch(
    catalog_path: Option<&Path>,
    requests_path: &Path,
    clinician: &str,
    options: &BatchOptions,
) -> CareResult<i32> {
    let engine = SurvivorCare::new_with_catalog(load_catalog(catalog_path)?)?;
    let requests = PlanRequest::load_many_from_file(requests_path)?;

    let report = engine.generate_batch(&requests, clinician, options)?;
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| CareError::report(format!("JSON serialization failed: {}", e)))?;
    println!("{}", json);

    for failure in &report.failures {
        eprintln!("Request {} ({}): {}", failure.index, failure.patient_id, failure.message);
    }

    Ok(if report.has_failures() { 1 } else { 0 })
}

fn run_list_rules(
    catalog_path: Option<&Path>,
    filter: Option<ExposureType>,
    json: bool,
) -> CareResult<i32> {
    let catalog = load_catalog(catalog_path)?;

    if json {
        println!("{}", catalog.to_json()?);
        return Ok(0);
    }

    println!("Rule catalog: {} (version {})\n", catalog.source(), catalog.version());

    for exposure_type in ExposureType::ALL {
        if filter.is_some_and(|f| f != exposure_type) {
            continue;
        }

        let rules: Vec<_> = catalog.rules_for(exposure_type).collect();
        if rules.is_empty() {
            continue;
        }

        println!("{}:", exposure_type);
        for rule in rules {
            println!(
                "  {} [{}] {} - {}",
                rule.id,
                rule.risk_level,
                rule.late_effect_category,
                rule.citation()
            );
        }
        println!();
    }

    Ok(0)
}

fn run_explain(catalog_path: Option<&Path>, rule_id: &str) -> CareResult<i32> {
    let catalog = load_catalog(catalog_path)?;

    let Some(rule) = catalog.rule(rule_id) else {
        eprintln!("Rule '{}' not found", rule_id);
        println!();
        println!("Available rules:");
        for rule in catalog.rules() {
            println!("  - {}", rule.id);
        }
        return Ok(1);
    };

    println!("Rule: {}", rule.id);
    println!("Source: {}", rule.citation());
    println!("Exposure type: {}", rule.exposure_type);
    println!("Late effect: {}", rule.late_effect_category);
    println!("Risk: {}", rule.risk_level);
    println!("Evidence: {}", rule.evidence_strength);
    println!();
    println!("Applies when:");
    println!("  {}", rule.criterion.describe());
    println!();
    println!("Surveillance:");
    println!("  Test: {}", rule.test_modality);
    println!("  Start: {}", rule.start_time_condition);
    println!("  Interval: {}", rule.interval);
    println!();
    println!("Clinician text:");
    println!("  {}", rule.recommendation_clinician);
    println!("Patient text:");
    println!("  {}", rule.recommendation_patient);

    if let Some(notes) = &rule.notes {
        println!();
        println!("Notes: {}", notes);
    }

    Ok(0)
}

fn run_validate_catalog(catalog_path: Option<&Path>) -> CareResult<i32> {
    let label = match catalog_path {
        Some(path) => path.display().to_string(),
        None => "default lookup".to_string(),
    };
    println!("Validating rule catalog: {}", label);

    let catalog = match load_catalog(catalog_path) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Catalog validation failed: {}", e);
            return Ok(1);
        }
    };

    let stats = catalog.statistics();
    println!("Catalog is valid");
    println!("  Source: {} (version {})", catalog.source(), catalog.version());
    println!(
        "  Rules: {} total ({} high, {} moderate, {} low)",
        stats.total_rules, stats.high_risk_rules, stats.moderate_risk_rules, stats.low_risk_rules
    );
    for (exposure_type, count) in &stats.rules_by_type {
        println!("    {}: {}", exposure_type, count);
    }
    println!("  Vocabulary terms: {}", stats.vocabulary_terms);
    println!("  Fingerprint: {}", catalog.fingerprint());

    Ok(0)
}

fn run_vocabulary(catalog_path: Option<&Path>, filter: Option<ExposureType>) -> CareResult<i32> {
    let catalog = load_catalog(catalog_path)?;
    let vocabulary = catalog.vocabulary();

    for exposure_type in ExposureType::ALL {
        if filter.is_some_and(|f| f != exposure_type) {
            continue;
        }

        let labels = vocabulary.labels(exposure_type);
        println!("{} ({}):", exposure_type, labels.len());
        for label in labels {
            println!("  - {}", label);
        }
    }

    Ok(0)
}

fn init_logging(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const REQUEST_JSON: &str = r#"{
        "patient": {
            "id": "SC-100", "age": 21, "birthYear": 2003, "diagnosisYear": 2009,
            "sex": "Female", "tumorType": "Linfoma de Hodgkin"
        },
        "exposures": [
            {"id": "e1", "type": "Chemotherapy", "name": "Doxorrubicina", "dose": 240, "unit": "mg/m2"},
            {"id": "e2", "type": "Radiation", "name": "Manto / Mediastino / Tórax", "dose": 24, "unit": "Gy"}
        ]
    }"#;

    fn plain() -> ReportOptions {
        ReportOptions { use_colors: false, ..Default::default() }
    }

    #[test]
    fn test_generate_command() {
        let temp_dir = TempDir::new().unwrap();
        let request = temp_dir.path().join("request.json");
        fs::write(&request, REQUEST_JSON).unwrap();

        for format in [OutputFormatArg::Clinician, OutputFormatArg::Patient, OutputFormatArg::Json] {
            let result = run_generate(None, &request, "Dra. Ruiz", format, plain());
            assert_eq!(result.unwrap(), 0);
        }
    }

    #[test]
    fn test_generate_rejects_malformed_request() {
        let temp_dir = TempDir::new().unwrap();
        let request = temp_dir.path().join("request.yaml");
        fs::write(&request, "patient: {id: p}\n").unwrap();

        let err = run_generate(None, &request, "Dr", OutputFormatArg::Json, plain()).unwrap_err();
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_batch_command() {
        let temp_dir = TempDir::new().unwrap();
        let requests = temp_dir.path().join("requests.json");
        fs::write(&requests, format!("[{}, {}]", REQUEST_JSON, REQUEST_JSON)).unwrap();

        let options = BatchOptions::default();
        assert_eq!(run_batch(None, &requests, "Dr", &options).unwrap(), 0);

        // Second request reuses an exposure id
        let mixed = temp_dir.path().join("mixed.json");
        let duplicate = REQUEST_JSON.replace("\"e2\"", "\"e1\"");
        fs::write(&mixed, format!("[{}, {}]", REQUEST_JSON, duplicate)).unwrap();
        assert_eq!(run_batch(None, &mixed, "Dr", &options).unwrap(), 1);

        let strict = BatchOptions { parallel: false, fail_fast: true };
        assert!(run_batch(None, &mixed, "Dr", &strict).is_err());
    }

    #[test]
    fn test_validate_catalog() {
        let temp_dir = TempDir::new().unwrap();
        let catalog_file = temp_dir.path().join("rules.yaml");
        fs::write(&catalog_file, RuleCatalog::default().to_yaml().unwrap()).unwrap();

        assert_eq!(run_validate_catalog(Some(&catalog_file)).unwrap(), 0);

        let broken = temp_dir.path().join("broken.yaml");
        fs::write(&broken, "version: \"9.9\"\nsource: x\nrules: []\n").unwrap();
        assert_eq!(run_validate_catalog(Some(&broken)).unwrap(), 1);
    }

    #[test]
    fn test_explain_rule() {
        assert_eq!(run_explain(None, "COG-73-BreastCa").unwrap(), 0);
        assert_eq!(run_explain(None, "nonexistent_rule").unwrap(), 1);
    }

    #[test]
    fn test_listing_commands() {
        assert_eq!(run_list_rules(None, None, false).unwrap(), 0);
        assert_eq!(run_list_rules(None, Some(ExposureType::Surgery), false).unwrap(), 0);
        assert_eq!(run_vocabulary(None, Some(ExposureType::Radiation)).unwrap(), 0);
    }

    #[test]
    fn test_rules_json_export() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rules.yaml");
        fs::write(&path, RuleCatalog::default().to_yaml().unwrap()).unwrap();

        assert_eq!(run_list_rules(Some(&path), None, true).unwrap(), 0);

        let cli = Cli::try_parse_from(["survivor-care", "rules", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::Rules { json: true, exposure_type: None }));
        assert!(Cli::try_parse_from(["survivor-care", "rules", "--json", "--exposure-type", "surgery"])
            .is_err());
    }

    #[test]
    fn test_missing_catalog_file_is_an_error() {
        let err = load_catalog(Some(Path::new("/nonexistent/rules.yaml"))).unwrap_err();
        assert!(matches!(err, CareError::Configuration { .. }));
    }
}
