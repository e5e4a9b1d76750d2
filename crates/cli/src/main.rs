use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use repertoire_audit::{audit_side, AuditOptions, BucketReport, SideOutcome};
use repertoire_book::{
    backup_file, detect_format, find_book_root, line_counts, parse_lines_js, parse_opening_names,
    patch_opening_book, split_opening_book, write_lines_js, BucketIndex, LineMaps, RecountOptions,
    Side, LINES_JS_REL, OPENING_NAMES_JS_REL,
};
use repertoire_engine::{EngineConfig, GoLimit, UciEngine};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

mod report;

use report::{render_html, ReportMeta};

#[derive(Parser)]
#[command(name = "repertoire")]
#[command(about = "Opening-book collision audit, pruning and recount", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect ambiguous continuations, write an HTML report, optionally
    /// prune the losing lines
    Audit(AuditArgs),

    /// Refresh per-bucket line totals in opening_names.js after pruning
    Recount(RecountArgs),
}

#[derive(Args)]
struct AuditArgs {
    /// Path to the book folder (or a repo containing it)
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Which repertoire to analyze
    #[arg(long, value_enum, default_value_t = SideArg::Both)]
    side: SideArg,

    /// Output HTML report path
    #[arg(long, default_value = "collisions.html")]
    out: PathBuf,

    /// Ignore collisions before this ply (0 = disabled)
    #[arg(long, default_value_t = 0)]
    min_plies: usize,

    /// Path to a UCI engine binary (default: stockfish from PATH)
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Skip engine evaluations (report only)
    #[arg(long)]
    no_engine: bool,

    /// Seconds per position (used when depth <= 0)
    #[arg(long, default_value_t = 0.08)]
    engine_time: f64,

    /// Fixed search depth (0 = use engine-time)
    #[arg(long, default_value_t = 0)]
    engine_depth: u32,

    /// Engine Threads option
    #[arg(long, default_value_t = 2)]
    threads: usize,

    /// Engine Hash option (MB)
    #[arg(long, default_value_t = 128)]
    hash: usize,

    /// Prune losing lines to eliminate collisions (requires an engine)
    #[arg(long)]
    apply_fix: bool,

    /// Overwrite js/lines.js (creates a timestamped .bak)
    #[arg(long)]
    in_place: bool,

    /// Write the pruned lines.js to this path (default: js/lines.fixed.js)
    #[arg(long, conflicts_with = "in_place")]
    write_lines: Option<PathBuf>,

    /// Reproduce the source lines.js formatting to keep diffs clean
    #[arg(long)]
    preserve_format: bool,
}

#[derive(Args)]
struct RecountArgs {
    /// Path to the book folder (or a repo containing it)
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Output file (default: js/opening_names.updated.js next to the source)
    #[arg(long, conflicts_with = "in_place")]
    out: Option<PathBuf>,

    /// Overwrite js/opening_names.js (creates a timestamped backup)
    #[arg(long)]
    in_place: bool,

    /// Also recompute leaf flags (bigger diff)
    #[arg(long)]
    update_leaf_flags: bool,

    /// Child line-count threshold for the leaf calculation
    #[arg(long, default_value_t = 10)]
    leaf_threshold: usize,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum SideArg {
    White,
    Black,
    Both,
}

impl SideArg {
    const fn includes(self, side: Side) -> bool {
        matches!(
            (self, side),
            (Self::Both, _) | (Self::White, Side::White) | (Self::Black, Side::Black)
        )
    }

    const fn label(self) -> &'static str {
        match self {
            Self::White => "white",
            Self::Black => "black",
            Self::Both => "both",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Audit(args) => run_audit(args).await,
        Commands::Recount(args) => run_recount(&args),
    }
}

async fn run_audit(args: AuditArgs) -> Result<()> {
    let root = find_book_root(&args.root)?;
    let lines_js_path = root.join(LINES_JS_REL);
    let names_path = root.join(OPENING_NAMES_JS_REL);

    let lines_text = fs::read_to_string(&lines_js_path)
        .with_context(|| format!("Failed to read {}", lines_js_path.display()))?;
    let names_text = fs::read_to_string(&names_path)
        .with_context(|| format!("Failed to read {}", names_path.display()))?;

    let LineMaps {
        mut white,
        mut black,
    } = parse_lines_js(&lines_text)?;
    let names = parse_opening_names(&names_text);

    let engine_path = if args.no_engine {
        None
    } else {
        args.engine.clone().or_else(|| find_in_path("stockfish"))
    };

    // Keep decisions must be evaluator-driven to be reproducible between a
    // report run and a fix run, so this aborts before any detection work.
    if args.apply_fix && engine_path.is_none() {
        bail!(
            "--apply-fix requires an engine to reproduce KEEP decisions; \
             pass --engine PATH or install stockfish in PATH"
        );
    }

    let move_eval = if args.engine_depth > 0 {
        format!("depth={}", args.engine_depth)
    } else {
        format!("time={}s", args.engine_time)
    };
    let meta = ReportMeta {
        generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        root: root.display().to_string(),
        side: args.side.label().to_string(),
        engine: match &engine_path {
            Some(path) => path.display().to_string(),
            None if args.no_engine => "disabled".to_string(),
            None => "not found".to_string(),
        },
        move_eval,
    };

    let mut engine: Option<UciEngine> = match &engine_path {
        Some(path) => {
            let config = EngineConfig {
                path: path.clone(),
                threads: args.threads,
                hash_mb: args.hash,
                limit: if args.engine_depth > 0 {
                    GoLimit::Depth(args.engine_depth)
                } else {
                    GoLimit::MoveTime(Duration::from_secs_f64(args.engine_time))
                },
            };
            let session = UciEngine::spawn(&config)
                .await
                .with_context(|| format!("Failed to start UCI engine {}", path.display()))?;
            Some(session)
        }
        None => None,
    };

    let options = AuditOptions {
        min_plies: args.min_plies,
        apply_fix: args.apply_fix,
    };

    let mut sides: Vec<(BucketIndex, SideOutcome)> = Vec::new();
    let mut audit_err: Option<anyhow::Error> = None;
    for side in [Side::White, Side::Black] {
        if !args.side.includes(side) {
            continue;
        }
        let map = match side {
            Side::White => std::mem::take(&mut white),
            Side::Black => std::mem::take(&mut black),
        };
        let index = BucketIndex::new(side, map);
        match audit_side(&index, &names, engine.as_mut(), options).await {
            Ok(outcome) => sides.push((index, outcome)),
            Err(e) => {
                audit_err = Some(e.into());
                break;
            }
        }
    }

    // The session is released whether or not the audit succeeded.
    if let Some(engine) = engine.take() {
        engine.close().await;
    }
    if let Some(err) = audit_err {
        return Err(err);
    }

    let buckets: Vec<BucketReport> = sides
        .iter()
        .flat_map(|(_, outcome)| outcome.buckets.iter().cloned())
        .collect();

    let html = render_html(&meta, &buckets)?;
    if let Some(parent) = args.out.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&args.out, html)
        .with_context(|| format!("Failed to write {}", args.out.display()))?;
    log::info!("Report written: {}", args.out.display());
    log::info!("Unique collision buckets: {}", buckets.len());

    if args.apply_fix {
        for (mut index, outcome) in sides {
            let side = index.side();
            if !outcome.plan.is_empty() {
                let (occurrences, touched) = outcome.plan.apply(&mut index);
                log::info!(
                    "{side}: removed unique lines={} occurrences={occurrences} buckets touched={touched}",
                    outcome.plan.removed_count()
                );
            }
            match side {
                Side::White => white = index.into_map(),
                Side::Black => black = index.into_map(),
            }
        }

        let target = if args.in_place {
            backup_file(&lines_js_path)?;
            lines_js_path.clone()
        } else {
            args.write_lines
                .clone()
                .unwrap_or_else(|| lines_js_path.with_file_name("lines.fixed.js"))
        };
        let format = args.preserve_format.then(|| detect_format(&lines_text));
        write_lines_js(&target, &white, &black, format.as_ref())?;
        log::info!("Updated lines written: {}", target.display());
        log::info!(
            "Rerun the audit to confirm the collisions are gone, then `repertoire recount` \
             to refresh the opening_names totals"
        );
    }

    Ok(())
}

fn run_recount(args: &RecountArgs) -> Result<()> {
    let root = find_book_root(&args.root)?;
    let lines_js_path = root.join(LINES_JS_REL);
    let names_path = root.join(OPENING_NAMES_JS_REL);

    let lines_text = fs::read_to_string(&lines_js_path)
        .with_context(|| format!("Failed to read {}", lines_js_path.display()))?;
    let names_text = fs::read_to_string(&names_path)
        .with_context(|| format!("Failed to read {}", names_path.display()))?;

    let maps = parse_lines_js(&lines_text)?;
    let white_counts = line_counts(&maps.white);
    let black_counts = line_counts(&maps.black);

    let (prefix, block, suffix) = split_opening_book(&names_text)?;
    let options = RecountOptions {
        update_leaf_flags: args.update_leaf_flags,
        leaf_threshold: args.leaf_threshold,
    };
    let (patched, stats) = patch_opening_book(&block, &white_counts, &black_counts, options);
    let out_text = format!("{prefix}var opening_book = {{\n{patched}\n}};\n{suffix}");

    let out_path = if args.in_place {
        backup_file(&names_path)?;
        names_path.clone()
    } else {
        args.out
            .clone()
            .unwrap_or_else(|| names_path.with_file_name("opening_names.updated.js"))
    };
    fs::write(&out_path, out_text)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;

    log::info!("Wrote: {}", out_path.display());
    log::info!(
        "keys in lines.js: white={} black={}",
        white_counts.len(),
        black_counts.len()
    );
    log::info!(
        "opening_book entries parsed: {} · counts changed: {}",
        stats.entries,
        stats.changed_counts
    );
    if args.update_leaf_flags {
        log::info!("leaf flags changed: {}", stats.changed_leaf);
    }
    log::info!(
        "entries absent from lines.js (left untouched): {}",
        stats.absent
    );

    Ok(())
}

/// Minimal PATH lookup for the default engine binary.
fn find_in_path(binary: &str) -> Option<PathBuf> {
    let path = env::var_os("PATH")?;
    env::split_paths(&path)
        .map(|dir| dir.join(binary))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LINES_JS: &str = concat!(
        "var whiteLines = {\n",
        "  \"e4\":[\"e4e5Nf3\",\"e4e5Nc3\"]\n",
        "};\n",
        "\n",
        "var blackLines = {\n",
        "  \"e4\":[\"e4c5\"]\n",
        "};\n",
    );

    const NAMES_JS: &str = concat!(
        "var opening_book_moves = {\n",
        "\"King's Pawn\":\"e4\"\n",
        "};\n",
        "var opening_book = {\n",
        "\t\"e4\":[\"King's Pawn\",10,4,0,0,\"\",0,0,1,1,\"x\"]\n",
        "};\n",
        "var book_version = 3;\n",
    );

    fn write_book(dir: &std::path::Path) {
        let js = dir.join("js");
        fs::create_dir_all(&js).unwrap();
        fs::write(js.join("lines.js"), LINES_JS).unwrap();
        fs::write(js.join("opening_names.js"), NAMES_JS).unwrap();
    }

    #[test]
    fn recount_writes_an_updated_copy_and_leaves_the_source_alone() {
        let temp = tempfile::TempDir::new().unwrap();
        write_book(temp.path());

        let args = RecountArgs {
            root: temp.path().to_path_buf(),
            out: None,
            in_place: false,
            update_leaf_flags: false,
            leaf_threshold: 10,
        };
        run_recount(&args).unwrap();

        let updated =
            fs::read_to_string(temp.path().join("js/opening_names.updated.js")).unwrap();
        assert!(updated.contains("\"e4\":[\"King's Pawn\",2,1,"));
        assert!(updated.ends_with("var book_version = 3;\n"));
        assert_eq!(
            fs::read_to_string(temp.path().join("js/opening_names.js")).unwrap(),
            NAMES_JS
        );
    }

    #[test]
    fn side_selection_gates_both_sides() {
        assert!(SideArg::Both.includes(Side::White));
        assert!(SideArg::Both.includes(Side::Black));
        assert!(SideArg::White.includes(Side::White));
        assert!(!SideArg::White.includes(Side::Black));
    }
}
