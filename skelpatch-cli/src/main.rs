//! Command-line driver: diff two HTML captures into a common tree or a JSON
//! replay patch.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use skelpatch::diff::edits_from_mapping;
use skelpatch::patcher::insert_patchers;
use skelpatch::solver::{AptedSolver, write_solver_input};
use skelpatch::{Result, StripMode, Tree, parse_html};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum Goal {
    /// Write the common HTML tree to the output path.
    #[default]
    Html,
    /// Write the JSON patch to the output path and a patched copy of the
    /// first page next to it.
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "skelpatch", version, about)]
struct Args {
    /// The first (older) HTML capture - the page the patch reconstructs.
    first_html: PathBuf,

    /// The second (newer) HTML capture.
    second_html: PathBuf,

    /// Output path; also the stem for the solver's `.tree` input files.
    out_path: PathBuf,

    /// What to produce.
    #[arg(value_enum, default_value_t = Goal::Html)]
    goal: Goal,

    /// The APTED solver jar.
    #[arg(long, default_value = "apted.jar")]
    apted_jar: PathBuf,

    /// JavaScript source of the main patcher injected into the patched copy
    /// (json mode). An empty script element is injected when omitted.
    #[arg(long)]
    patcher_js: Option<PathBuf>,
}

fn load_tree(path: &Path) -> Result<Tree> {
    let html = fs::read_to_string(path)?;
    parse_html(&html, StripMode::None)
}

fn tree_file(out_path: &Path, index: u32) -> PathBuf {
    let mut name = out_path.as_os_str().to_os_string();
    name.push(format!("_{index}.tree"));
    PathBuf::from(name)
}

fn patched_path(first_html: &Path) -> PathBuf {
    let stem = first_html
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    first_html.with_file_name(format!("{stem}_patched.html"))
}

fn run(args: &Args) -> Result<()> {
    let first = load_tree(&args.first_html)?;
    let second = load_tree(&args.second_html)?;

    let first_tree_file = tree_file(&args.out_path, 1);
    let second_tree_file = tree_file(&args.out_path, 2);
    write_solver_input(&first, &first_tree_file)?;
    write_solver_input(&second, &second_tree_file)?;

    let solver = AptedSolver::new(&args.apted_jar);
    let mapping = solver.compute_mapping(&first_tree_file, &second_tree_file)?;
    tracing::info!(pairs = mapping.len(), "solver mapping received");

    let mut edits = edits_from_mapping(&first, &second, &mapping)?;
    tracing::info!(
        edits = edits.edits().len(),
        cost = edits.total_cost(),
        "edit sequence built"
    );

    match args.goal {
        Goal::Html => {
            let common = edits.generate_common_tree(&first, &second)?;
            fs::write(&args.out_path, common.to_html())?;
        }
        Goal::Json => {
            let update = edits.generate_json_update(&first, &second)?;
            fs::write(&args.out_path, update.to_string())?;

            let patcher_js = match &args.patcher_js {
                Some(path) => fs::read_to_string(path)?,
                None => String::new(),
            };
            let mut patched = first;
            insert_patchers(&mut patched, &patcher_js)?;
            fs::write(patched_path(&args.first_html), patched.to_html())?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("skelpatch: {err}");
            ExitCode::FAILURE
        }
    }
}
