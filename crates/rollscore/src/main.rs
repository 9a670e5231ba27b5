#![forbid(unsafe_code)]

mod telemetry_file;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use rollscore_core::config::{self, ScorerConfig, WORKSPACE_CONFIG_PATH};
use rollscore_core::duration::{format_minutes, parse_timespan, to_minutes};
use rollscore_core::metrics::{start_of_day, ManualOverrides, RolloutWindow};
use rollscore_core::scorecard::Scorecard;
use rollscore_core::traits::{NoTelemetry, TelemetrySource};
use rollscore_core::types::{ConflictPolicy, HotfixMode};
use rollscore_core::{render, tabular};
use rollscore_engine::merge::{self, Dataset};
use rollscore_engine::scoring::ScoringEngine;
use rollscore_engine::state::{atomic, dataset_file, ledger};
use rollscore_engine::telemetry;

use telemetry_file::JsonTelemetry;

const DEFAULT_LEDGER_PATH: &str = ".rollscore/runs.ledger.jsonl";

#[derive(Parser)]
#[command(
    name = "rollscore",
    version,
    about = "Score software rollouts and merge the scorecards."
)]
struct Cli {
    /// Scorer configuration (default: .rollscore/config.json, else built-in).
    #[arg(long, global = true)]
    config: Option<String>,

    /// Run ledger to append to.
    #[arg(long, global = true, default_value = DEFAULT_LEDGER_PATH)]
    ledger: String,

    /// Extra diagnostics on stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Score one rollout and write its scorecard CSV.
    Score(ScoreArgs),

    /// Merge scorecard CSVs into one dataset.
    Merge {
        /// Scorecard CSV files, merged in the order given.
        #[arg(required = true)]
        files: Vec<String>,

        /// Existing dataset to merge into (created if missing).
        #[arg(long)]
        into: Option<String>,

        /// What to do when two scorecards share a repository and date.
        #[arg(long, default_value_t = ConflictPolicy::Abort)]
        on_conflict: ConflictPolicy,

        /// Output a JSON report.
        #[arg(long)]
        json: bool,
    },

    /// Render the scorecards in a CSV file.
    Show {
        /// Scorecard CSV file.
        file: String,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Validate a scorer configuration.
    Check {
        /// Output structured JSON report.
        #[arg(long)]
        json: bool,

        /// Fail on warnings (not just errors).
        #[arg(long)]
        strict: bool,
    },

    /// Write the default configuration to .rollscore/config.json.
    Init {
        /// Replace an existing configuration.
        #[arg(long)]
        force: bool,
    },

    /// Inspect or verify a run ledger.
    Ledger {
        /// Ledger file (default: the --ledger path).
        file: Option<String>,

        /// Verify the hash chain.
        #[arg(long)]
        verify: bool,
    },
}

#[derive(clap::Args)]
struct ScoreArgs {
    /// Repository the rollout belongs to.
    #[arg(long)]
    repo: String,

    /// Rollout start: YYYY-MM-DD or an RFC 3339 timestamp.
    #[arg(long)]
    rollout_start_date: String,

    /// Last day of the rollout (inclusive). Defaults to now.
    #[arg(long)]
    rollout_end_date: Option<NaiveDate>,

    /// Branch to score (default: the repository's configured branch, else production).
    #[arg(short, long)]
    branch: Option<String>,

    /// Deployment and issue events as JSON.
    #[arg(long)]
    telemetry: Option<String>,

    /// Rollbacks not visible in telemetry.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    manual_rollbacks: i64,

    /// Hotfixes not visible in telemetry.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    manual_hotfixes: i64,

    /// Deployments carry no tags: every deployment after the first
    /// successful one is a hotfix.
    #[arg(long)]
    assume_no_tags: bool,

    /// Service downtime, [d.]hh:mm[:ss].
    #[arg(long)]
    downtime: Option<String>,

    /// The rollout failed.
    #[arg(long)]
    failed: bool,

    /// Scorecard CSV path (default: ./{repo}-{date}-scorecard.csv).
    #[arg(short, long)]
    output: Option<String>,

    /// Do not write the scorecard CSV.
    #[arg(long, conflicts_with = "output")]
    skip_output: bool,

    /// Output JSON instead of Markdown.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let ctx = RunContext {
        config: cli.config,
        ledger: PathBuf::from(cli.ledger),
        verbose: cli.verbose,
    };

    match cli.cmd {
        Cmd::Score(args) => cmd_score(&ctx, &args),

        Cmd::Merge {
            files,
            into,
            on_conflict,
            json,
        } => cmd_merge(&ctx, &files, into.as_deref(), on_conflict, json),

        Cmd::Show { file, json } => cmd_show(&ctx, &file, json),

        Cmd::Check { json, strict } => cmd_check(&ctx, json, strict),

        Cmd::Init { force } => cmd_init(force),

        Cmd::Ledger { file, verify } => {
            let path = file.map(PathBuf::from).unwrap_or_else(|| ctx.ledger.clone());
            cmd_ledger(&path, verify)
        }
    }
}

struct RunContext {
    config: Option<String>,
    ledger: PathBuf,
    verbose: bool,
}

impl RunContext {
    fn load_config(&self) -> Result<ScorerConfig> {
        let cfg = ScorerConfig::load(self.config.as_deref())?;
        if self.verbose {
            match config::resolve_path(self.config.as_deref()) {
                Some(p) => eprintln!("  config: {p}"),
                None => eprintln!("  config: (built-in defaults)"),
            }
        }
        Ok(cfg)
    }

    /// Best effort: a ledger failure never changes the command's result.
    fn record(&self, entry: serde_json::Value) {
        match ledger::append_entry(&self.ledger, &entry) {
            Ok(hash) if self.verbose => eprintln!("  ledger: {} ({hash})", self.ledger.display()),
            Ok(_) => {}
            Err(e) => eprintln!("  warn: cannot append to ledger: {e:#}"),
        }
    }
}

// ── score ───────────────────────────────────────────────────────

fn parse_start(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(ts.and_utc());
    }
    if let Ok(date) = s.parse::<NaiveDate>() {
        return Ok(start_of_day(date));
    }
    bail!("invalid --rollout-start-date \"{s}\": expected YYYY-MM-DD or an RFC 3339 timestamp")
}

fn default_output_path(card: &Scorecard) -> String {
    format!(
        "{}-{}-scorecard.csv",
        card.repository.replace('/', "-"),
        card.rollout_date
    )
}

fn cmd_score(ctx: &RunContext, args: &ScoreArgs) -> Result<()> {
    let cfg = ctx.load_config()?;
    let weights = cfg.weights_for(&args.repo)?;

    let start = parse_start(&args.rollout_start_date)?;
    let window = RolloutWindow::resolve(start, args.rollout_end_date, Utc::now());

    let downtime = match &args.downtime {
        Some(s) => parse_timespan(s)
            .ok_or_else(|| anyhow::anyhow!("invalid --downtime \"{s}\": expected [d.]hh:mm[:ss]"))?,
        None => chrono::Duration::zero(),
    };
    let overrides = ManualOverrides {
        rollbacks: args.manual_rollbacks,
        hotfixes: args.manual_hotfixes,
        downtime,
        failed: args.failed,
    };
    let mode = HotfixMode::from_assume_no_tags(args.assume_no_tags);

    let source: Box<dyn TelemetrySource> = match &args.telemetry {
        Some(path) => Box::new(JsonTelemetry::load(path)?),
        None => Box::new(NoTelemetry),
    };
    let branch = args
        .branch
        .clone()
        .unwrap_or_else(|| cfg.branch_for(&args.repo).to_string());
    let inferred =
        telemetry::collect_counts(source.as_ref(), &args.repo, &window, &branch, &cfg, mode)?;
    let record = telemetry::assemble_record(&args.repo, window, &inferred, &overrides)?;

    if ctx.verbose {
        eprintln!("  window:  {} .. {}", window.start, window.end);
        eprintln!("  branch:  {branch}");
        eprintln!("  mode:    {mode}");
        eprintln!(
            "  events:  {} deployments, {} hotfixes, {} rollbacks, {} critical issues",
            inferred.deployments, inferred.hotfixes, inferred.rollbacks, inferred.critical_issues
        );
    }

    let engine = ScoringEngine::new(weights)?;
    let card = engine
        .score(&record)
        .with_context(|| format!("cannot score {}", args.repo))?;

    let output = if args.skip_output {
        None
    } else {
        let path = args
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&card));
        atomic::atomic_write(Path::new(&path), tabular::to_csv(std::slice::from_ref(&card)).as_bytes())?;
        eprintln!("  wrote {path}");
        Some(path)
    };

    let target = engine.weights().max_allowed_minutes;
    if args.json {
        let report = serde_json::json!({
            "scorecard": card,
            "inferred": inferred,
            "hotfix_mode": mode,
            "branch": branch,
            "window": { "start": window.start, "end": window.end },
            "max_allowed_minutes": target,
            "output": output,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render::to_markdown(&card, target));
    }

    ctx.record(serde_json::json!({
        "command": "score",
        "repository": card.repository,
        "rollout_date": card.rollout_date,
        "branch": branch,
        "total_score": card.total_score,
        "time_to_rollout": format_minutes(to_minutes(record.time_to_rollout())),
        "output": output,
    }));
    Ok(())
}

// ── merge ───────────────────────────────────────────────────────

fn read_scorecards(file: &str) -> Result<Vec<Scorecard>> {
    let text = std::fs::read_to_string(file).with_context(|| format!("cannot read {file}"))?;
    tabular::from_csv(&text).with_context(|| format!("invalid scorecards in {file}"))
}

fn cmd_merge(
    ctx: &RunContext,
    files: &[String],
    into: Option<&str>,
    policy: ConflictPolicy,
    json_out: bool,
) -> Result<()> {
    let mut incoming = Vec::new();
    for file in files {
        let cards = read_scorecards(file)?;
        if ctx.verbose {
            eprintln!("  read {} scorecard(s) from {file}", cards.len());
        }
        incoming.extend(cards);
    }

    let (target, base) = match into {
        Some(path) => {
            let (file, dataset) = dataset_file::DatasetFile::open(Path::new(path))?;
            (Some(file), dataset)
        }
        None => (None, Dataset::new()),
    };

    if policy == ConflictPolicy::Abort {
        let conflicts = merge::detect_conflicts(&base, incoming.iter().cloned());
        if !conflicts.is_empty() {
            if json_out {
                let report = serde_json::json!({
                    "pass": false,
                    "policy": policy,
                    "conflicts": conflicts,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for c in &conflicts {
                    eprintln!("  conflict {c}");
                }
            }
            ctx.record(serde_json::json!({
                "command": "merge",
                "inputs": files,
                "into": into,
                "policy": policy,
                "outcome": "aborted",
                "conflicts": conflicts.len(),
            }));
            bail!(
                "{} conflicting scorecard(s); rerun with --on-conflict skip or overwrite",
                conflicts.len()
            );
        }
    }

    let outcome = merge::merge(&base, incoming, policy)?;
    for c in &outcome.overwritten {
        eprintln!("  overwrote {c}");
    }
    for c in &outcome.skipped {
        eprintln!("  skipped {c}");
    }

    match &target {
        Some(file) => {
            file.commit(&outcome.dataset)?;
            eprintln!(
                "  wrote {} ({} scorecards, {} added)",
                file.path().display(),
                outcome.dataset.len(),
                outcome.added
            );
        }
        None if !json_out => print!("{}", tabular::to_csv(outcome.dataset.entries())),
        None => {}
    }

    if json_out {
        let mut report = serde_json::json!({
            "pass": true,
            "policy": policy,
            "into": into,
            "total": outcome.dataset.len(),
            "added": outcome.added,
            "overwritten": outcome.overwritten,
            "skipped": outcome.skipped,
        });
        if target.is_none() {
            report["scorecards"] = serde_json::to_value(outcome.dataset.entries())?;
        }
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    ctx.record(serde_json::json!({
        "command": "merge",
        "inputs": files,
        "into": into,
        "policy": policy,
        "outcome": "merged",
        "total": outcome.dataset.len(),
        "added": outcome.added,
        "overwritten": outcome.overwritten.len(),
        "skipped": outcome.skipped.len(),
    }));
    Ok(())
}

// ── show / check / init / ledger ────────────────────────────────

fn cmd_show(ctx: &RunContext, file: &str, json_out: bool) -> Result<()> {
    let cards = read_scorecards(file)?;
    if json_out {
        println!("{}", serde_json::to_string_pretty(&cards)?);
        return Ok(());
    }
    let cfg = ctx.load_config()?;
    for (i, card) in cards.iter().enumerate() {
        let target = cfg
            .weights_for(&card.repository)
            .map(|w| w.max_allowed_minutes)
            .unwrap_or(cfg.weights.max_allowed_minutes);
        if i > 0 {
            println!();
        }
        print!("{}", render::to_markdown(card, target));
    }
    Ok(())
}

fn cmd_check(ctx: &RunContext, json_out: bool, strict: bool) -> Result<()> {
    let (file, data) = match config::resolve_path(ctx.config.as_deref()) {
        Some(p) => {
            let content =
                std::fs::read_to_string(&p).with_context(|| format!("cannot read {p}"))?;
            let data: serde_json::Value =
                serde_json::from_str(&content).with_context(|| format!("{p}: invalid JSON"))?;
            (p, data)
        }
        None => (
            "(built-in)".to_string(),
            serde_json::to_value(ScorerConfig::default())?,
        ),
    };

    let report = config::check(&data, &file, strict);

    if json_out {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if report.pass {
            eprintln!("  ok  {file}");
        } else {
            eprintln!("  FAIL {file}");
        }
        for e in &report.errors {
            eprintln!(
                "  error {}: {} {}",
                e.code,
                e.message,
                e.path.as_deref().unwrap_or("")
            );
        }
        for w in &report.warnings {
            eprintln!(
                "  warn  {}: {} {}",
                w.code,
                w.message,
                w.path.as_deref().unwrap_or("")
            );
        }
    }

    if !report.pass {
        bail!("check failed for {file}");
    }
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let path = Path::new(WORKSPACE_CONFIG_PATH);
    if path.exists() && !force {
        bail!("{WORKSPACE_CONFIG_PATH} already exists (use --force to replace it)");
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(&ScorerConfig::default())?;
    atomic::atomic_write(path, format!("{json}\n").as_bytes())?;
    eprintln!("created {WORKSPACE_CONFIG_PATH}");
    Ok(())
}

fn cmd_ledger(path: &Path, verify: bool) -> Result<()> {
    if verify {
        let count = ledger::verify_chain(path)?;
        let head = ledger::chain_head(path)?;
        eprintln!("  ok  {} ({count} entries)", path.display());
        println!("{head}");
        return Ok(());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read ledger {}", path.display()))?;
    print!("{content}");
    Ok(())
}
