// crates/ps_cli/src/main.rs
//
// Exit codes, typed error mapping, logging setup, and the two run paths:
// validate-only (load + checks, no selection) and the full run
// (load → pipeline → canonical artifacts → optional reports → console summary).

mod args;

mod exitcodes {
    pub const OK: i32 = 0;
    pub const VALIDATION: i32 = 2;
    pub const SELF_VERIFY: i32 = 3;
    pub const IO: i32 = 4;
    pub const DOMAIN: i32 = 5;
}

use std::fs;
use std::path::Path;
use std::process::ExitCode;

use args::{parse_and_validate as parse_cli, Args};
use ps_core::diagnostics::Severity;
use ps_core::variables::Params;
use ps_io::canonical_json;
use ps_io::manifest::parse_delimiter;
use ps_io::table::{ColumnMap, InputFormat, TableSource};
use ps_pipeline::{ctx_from_manifest_path, ctx_from_source, run_with_ctx, validate_only, PipelineCtx, PipelineError, PipelineOutputs};
use ps_report::{build_model, ReportError, ReportModel};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Delimiter for CSV reports; the same default as candidate input.
const REPORT_CSV_DELIMITER: u8 = b';';

/// Central error type for CLI → exit-code mapping.
#[derive(Debug)]
enum MainError {
    /// Schema / column / manifest / validation failures
    Validation(String),
    /// Declared input digest mismatch or artifact self-check failure
    SelfVerify(String),
    /// I/O errors (read/write/path/limits)
    Io(String),
    /// Parameter domain or size limits
    Domain(String),
    /// Rendering errors (report build or output)
    Render(String),
}

impl std::fmt::Display for MainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MainError::Validation(m) => write!(f, "validation: {m}"),
            MainError::SelfVerify(m) => write!(f, "self-verify: {m}"),
            MainError::Io(m) => write!(f, "io: {m}"),
            MainError::Domain(m) => write!(f, "domain: {m}"),
            MainError::Render(m) => write!(f, "render: {m}"),
        }
    }
}

fn main() -> ExitCode {
    let args = match parse_cli() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("psel: error: {e}");
            return ExitCode::from(exitcodes::VALIDATION as u8);
        }
    };
    init_logging(args.quiet, args.verbose);

    let outcome = if args.validate_only { run_validate_only(&args) } else { run_once(&args) };
    let rc = match outcome {
        Ok(()) => exitcodes::OK,
        Err(e) => {
            eprintln!("psel: error: {e}");
            map_error(&e)
        }
    };
    ExitCode::from(rc as u8)
}

/// stderr only; stdout is reserved for the console summary.
fn init_logging(quiet: bool, verbose: u8) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Map our typed errors to the exit-code table.
fn map_error(e: &MainError) -> i32 {
    use exitcodes::*;
    match e {
        MainError::Validation(_) => VALIDATION,
        MainError::SelfVerify(_) => SELF_VERIFY,
        MainError::Io(_) | MainError::Render(_) => IO,
        MainError::Domain(_) => DOMAIN,
    }
}

fn map_pipeline_err(e: PipelineError) -> MainError {
    use PipelineError::*;
    match e {
        Schema(m) | Validate(m) => MainError::Validation(m),
        Io(m) => MainError::Io(m),
        Verify(m) | Build(m) => MainError::SelfVerify(m),
        Domain(m) => MainError::Domain(m),
    }
}

fn map_report_err(e: ReportError) -> MainError {
    MainError::Render(e.to_string())
}

/* ----------------------------------- Loading ----------------------------------- */

fn load_ctx(args: &Args) -> Result<PipelineCtx, MainError> {
    let mut ctx = match &args.manifest {
        Some(m) => ctx_from_manifest_path(m).map_err(map_pipeline_err)?,
        None => {
            let candidates = args
                .candidates
                .as_deref()
                .ok_or_else(|| MainError::Validation("--candidates is required without --manifest".into()))?;
            let (source, columns) = explicit_source(args)?;
            let display = (!args.display_col.is_empty()).then(|| args.display_col.clone());
            ctx_from_source(candidates, &source, &columns, explicit_params(args)?, display)
                .map_err(map_pipeline_err)?
        }
    };
    if let Some(ts) = &args.timestamp {
        ctx.timestamp = ts.clone();
    }
    Ok(ctx)
}

fn explicit_source(args: &Args) -> Result<(TableSource, ColumnMap), MainError> {
    let mut source = TableSource::default();
    if args.format.as_deref() == Some("json") {
        source.format = InputFormat::Json;
    }
    if let Some(d) = &args.delimiter {
        source.delimiter =
            parse_delimiter(d).ok_or_else(|| MainError::Validation(format!("invalid delimiter: {d:?}")))?;
    }

    let mut columns = ColumnMap::default();
    if let Some(c) = &args.id_col {
        columns.id = c.clone();
    }
    if let Some(c) = &args.group_col {
        columns.group = c.clone();
    }
    if let Some(c) = &args.life_col {
        columns.life = c.clone();
    }
    if let Some(c) = &args.cost_col {
        columns.cost = c.clone();
    }
    Ok((source, columns))
}

fn explicit_params(args: &Args) -> Result<Params, MainError> {
    let need = |flag: &str| MainError::Validation(format!("missing required flag: {flag}"));
    Ok(Params {
        baseline_life: args.baseline.ok_or_else(|| need("--baseline"))?,
        budget: args.budget.ok_or_else(|| need("--budget"))?,
        scale: args.scale.ok_or_else(|| need("--scale"))?,
        top_n: args.top_n.ok_or_else(|| need("--top-n"))?,
        max_steps: args.max_steps,
    })
}

/* ----------------------------------- Run paths ----------------------------------- */

/// Load + checks only. Issues go to stdout, one per line.
fn run_validate_only(args: &Args) -> Result<(), MainError> {
    let ctx = load_ctx(args)?;
    let report = validate_only(&ctx);
    for i in &report.issues {
        println!("{:<7} {:<24} {}: {}", i.severity.as_str(), i.code, i.where_, i.message);
    }
    if report.pass {
        if !args.quiet {
            eprintln!("validate-only: inputs OK ({} rows)", ctx.loaded.rows_read);
        }
        Ok(())
    } else {
        let errors = report.issues.iter().filter(|i| i.severity == Severity::Error).count();
        Err(MainError::Validation(format!("{errors} error(s) in inputs")))
    }
}

fn run_once(args: &Args) -> Result<(), MainError> {
    let ctx = load_ctx(args)?;
    let outs = run_with_ctx(ctx).map_err(map_pipeline_err)?;

    write_artifacts(&args.out, &outs)?;

    let model = report_model(&outs)?;
    maybe_render_reports(args, &model)?;

    if !args.quiet {
        print!("{}", ps_report::render_text::render_text(&model));
    }
    info!(out = %args.out.display(), result_id = %outs.result.id, "artifacts written");
    Ok(())
}

fn write_artifacts(out_dir: &Path, outs: &PipelineOutputs) -> Result<(), MainError> {
    fs::create_dir_all(out_dir).map_err(|e| MainError::Io(format!("mkdir {}: {e}", out_dir.display())))?;

    canonical_json::write_canonical_file(&out_dir.join("result.json"), &outs.result)
        .map_err(|e| MainError::Io(format!("write result.json: {e}")))?;
    canonical_json::write_canonical_file(&out_dir.join("run_record.json"), &outs.run_record)
        .map_err(|e| MainError::Io(format!("write run_record.json: {e}")))?;
    Ok(())
}

/// Built from the same values written to disk, so reports never recompute.
fn report_model(outs: &PipelineOutputs) -> Result<ReportModel, MainError> {
    let result_val =
        serde_json::to_value(&outs.result).map_err(|e| MainError::Render(format!("result to JSON: {e}")))?;
    let run_val =
        serde_json::to_value(&outs.run_record).map_err(|e| MainError::Render(format!("run_record to JSON: {e}")))?;
    build_model(&result_val, &run_val).map_err(map_report_err)
}

fn maybe_render_reports(args: &Args, model: &ReportModel) -> Result<(), MainError> {
    for fmt in &args.render {
        debug!(renderer = %fmt, "rendering report");
        match fmt.as_str() {
            "json" => render_json_report(model, &args.out)?,
            "html" => render_html_report(model, &args.out, &args.lang)?,
            "csv" => render_csv_report(model, &args.out)?,
            other => return Err(MainError::Render(format!("unknown renderer: {other}"))),
        }
    }
    Ok(())
}

fn write_file(out_dir: &Path, name: &str, bytes: &[u8]) -> Result<(), MainError> {
    canonical_json::write_atomic(&out_dir.join(name), bytes).map_err(|e| MainError::Io(format!("write {name}: {e}")))
}

// Always accept the concrete model type; gate body by feature.
fn render_json_report(model: &ReportModel, out_dir: &Path) -> Result<(), MainError> {
    #[cfg(feature = "report-json")]
    {
        let s = ps_report::render_json::render_report_json_string(model);
        write_file(out_dir, "report.json", s.as_bytes())
    }
    #[cfg(not(feature = "report-json"))]
    {
        let _ = (model, out_dir);
        Err(MainError::Render("json renderer not enabled (build with feature `report-json`)".into()))
    }
}

fn render_html_report(model: &ReportModel, out_dir: &Path, lang: &str) -> Result<(), MainError> {
    #[cfg(feature = "report-html")]
    {
        let html = ps_report::render_html::render_html(model, lang);
        write_file(out_dir, "report.html", html.as_bytes())
    }
    #[cfg(not(feature = "report-html"))]
    {
        let _ = (model, out_dir, lang);
        Err(MainError::Render("html renderer not enabled (build with feature `report-html`)".into()))
    }
}

fn render_csv_report(model: &ReportModel, out_dir: &Path) -> Result<(), MainError> {
    #[cfg(feature = "report-csv")]
    {
        let files = ps_report::render_csv::render_csv(model, REPORT_CSV_DELIMITER).map_err(map_report_err)?;
        for (name, body) in files {
            write_file(out_dir, &name, body.as_bytes())?;
        }
        Ok(())
    }
    #[cfg(not(feature = "report-csv"))]
    {
        let _ = (model, out_dir, REPORT_CSV_DELIMITER);
        Err(MainError::Render("csv renderer not enabled (build with feature `report-csv`)".into()))
    }
}
