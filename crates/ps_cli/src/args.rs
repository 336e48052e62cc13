// crates/ps_cli/src/args.rs
//
// Deterministic, offline CLI argument parsing surface.
//
// Rules:
// - No networked paths (reject any scheme:// like http/https/file)
// - Exactly one of: --manifest  XOR  (--candidates + explicit parameters)
// - Explicit mode names every parameter; there are no hidden defaults
// - Output: --out dir, --render [json|html|csv]*
// - --validate-only loads and checks inputs without running the selection

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use clap::{ArgAction, Parser};
use ps_io::manifest::parse_delimiter;

/// Parsed CLI arguments (raw).
#[derive(Debug, Parser, Clone)]
#[command(
    name = "psel",
    disable_help_subcommand = true,
    about = "Offline, deterministic selection of project portfolios under a budget"
)]
pub struct Args {
    // --- Mode selection ---
    /// Run manifest JSON (mutually exclusive with the explicit input flags).
    #[arg(
        long,
        conflicts_with_all = [
            "candidates", "format", "delimiter", "id_col", "group_col", "life_col", "cost_col",
            "baseline", "budget", "scale", "top_n", "max_steps", "display_col"
        ]
    )]
    pub manifest: Option<PathBuf>,

    // --- Explicit mode: input table ---
    /// Candidate table (CSV or JSON records).
    #[arg(long)]
    pub candidates: Option<PathBuf>,
    /// Candidate table format.
    #[arg(long, value_parser = ["csv", "json"])]
    pub format: Option<String>,
    /// CSV delimiter: a single character, or `tab`.
    #[arg(long)]
    pub delimiter: Option<String>,
    /// Column holding the candidate id.
    #[arg(long)]
    pub id_col: Option<String>,
    /// Column holding the group key.
    #[arg(long)]
    pub group_col: Option<String>,
    /// Column holding the life value.
    #[arg(long)]
    pub life_col: Option<String>,
    /// Column holding the cost.
    #[arg(long)]
    pub cost_col: Option<String>,
    /// Pass-through column to echo in detail rows (repeatable, order kept).
    #[arg(long = "display-col", action = ArgAction::Append)]
    pub display_col: Vec<String>,

    // --- Explicit mode: parameters ---
    /// Reference life value subtracted from every candidate.
    #[arg(long, allow_hyphen_values = true)]
    pub baseline: Option<f64>,
    /// Total budget, same currency as the cost column.
    #[arg(long)]
    pub budget: Option<f64>,
    /// Integer cost scale for the budget axis.
    #[arg(long)]
    pub scale: Option<u32>,
    /// Number of ranked allocations to keep.
    #[arg(long)]
    pub top_n: Option<usize>,
    /// Cap on search steps for the ranking.
    #[arg(long)]
    pub max_steps: Option<u64>,

    // --- Output & rendering ---
    /// Output directory (default: current directory).
    #[arg(long, default_value = ".")]
    pub out: PathBuf,
    /// Report renderer(s) to emit. Omit to skip rendering.
    #[arg(long, value_parser = ["json", "html", "csv"], num_args = 0..=3)]
    pub render: Vec<String>,
    /// Language tag for HTML report labels (`en`, `es`).
    #[arg(long, default_value = "en")]
    pub lang: String,

    // --- Determinism & control ---
    /// RFC3339 UTC timestamp recorded in the run record.
    #[arg(long)]
    pub timestamp: Option<String>,
    /// Load and check inputs only; do not run the selection.
    #[arg(long)]
    pub validate_only: bool,
    /// Only warnings and errors on stderr; no console summary.
    #[arg(long, short = 'q')]
    pub quiet: bool,
    /// More logging (repeat for trace).
    #[arg(short = 'v', action = ArgAction::Count)]
    pub verbose: u8,
}

/// Errors surfaced by argument parsing/validation.
/// Keep messages short/stable (handy for scripts/tests).
#[derive(Debug)]
pub enum CliError {
    Missing(&'static str),
    NonLocalPath(String),
    NotFound(String),
    BadDelimiter(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CliError::*;
        match self {
            Missing(s) => write!(f, "missing required flag: {s}"),
            NonLocalPath(p) => write!(f, "path must be local file (no scheme): {p}"),
            NotFound(p) => write!(f, "file not found: {p}"),
            BadDelimiter(d) => write!(f, "invalid delimiter: {d:?}"),
        }
    }
}
impl std::error::Error for CliError {}

/// Entry point used by main.rs
pub fn parse_and_validate() -> Result<Args, CliError> {
    validate(Args::parse())
}

/// Mode checks, path checks and normalization over already-parsed flags.
pub fn validate(mut args: Args) -> Result<Args, CliError> {
    for p in iter_all_paths(&args) {
        ensure_local_path(p)?;
    }

    if let Some(m) = args.manifest.take() {
        ensure_local_exists(&m, "--manifest")?;
        args.manifest = Some(normalize_path(&m));
    } else {
        validate_explicit_mode(&args)?;
        args.candidates = args.candidates.take().map(|p| normalize_path(&p));
    }

    // Output directory may not exist yet.
    args.out = normalize_path(&args.out);
    Ok(args)
}

fn validate_explicit_mode(a: &Args) -> Result<(), CliError> {
    let cand = a.candidates.as_ref().ok_or(CliError::Missing("--manifest or --candidates"))?;
    if a.baseline.is_none() {
        return Err(CliError::Missing("--baseline"));
    }
    if a.budget.is_none() {
        return Err(CliError::Missing("--budget"));
    }
    if a.scale.is_none() {
        return Err(CliError::Missing("--scale"));
    }
    if a.top_n.is_none() {
        return Err(CliError::Missing("--top-n"));
    }
    if let Some(d) = &a.delimiter {
        parse_delimiter(d).ok_or_else(|| CliError::BadDelimiter(d.clone()))?;
    }
    ensure_local_exists(cand, "--candidates")
}

/// Reject any explicit URI scheme (e.g., http://, https://, file://).
#[inline]
fn has_scheme(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("file:")
}

#[inline]
fn ensure_local_path(p: &Path) -> Result<(), CliError> {
    if let Some(s) = p.to_str() {
        if has_scheme(s) {
            return Err(CliError::NonLocalPath(s.to_string()));
        }
    }
    Ok(())
}

fn iter_all_paths(args: &Args) -> impl Iterator<Item = &Path> {
    [args.manifest.as_deref(), args.candidates.as_deref(), Some(args.out.as_path())]
        .into_iter()
        .flatten()
}

/// Ensure a path is local (no scheme) and exists as a regular file.
fn ensure_local_exists(p: &Path, label: &'static str) -> Result<(), CliError> {
    ensure_local_path(p)?;
    let meta = fs::metadata(p).map_err(|_| CliError::NotFound(format!("{label} {}", p.display())))?;
    if !meta.is_file() {
        return Err(CliError::NotFound(format!("{label} {}", p.display())));
    }
    Ok(())
}

/// Best-effort normalization to an absolute path.
/// If canonicalize fails (e.g., path doesn't exist yet), produce an absolute path relative to CWD.
fn normalize_path(p: &Path) -> PathBuf {
    fs::canonicalize(p).unwrap_or_else(|_| {
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            env::current_dir().unwrap_or_else(|_| PathBuf::from(".")).join(p)
        }
    })
}
