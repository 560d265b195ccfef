use clap::{Parser, Subcommand};
use pstbatch_core::report::{render_table, write_results_csv, write_run_summary};
use pstbatch_core::stamp::file_timestamp;
use pstbatch_core::tool::DEFAULT_UTILITY_PATH;
use pstbatch_core::{
    run_batch, BatchConfig, BatchOptions, BridgeTool, RepairTool, RunLog, ScriptedBehavior,
    ScriptedTool, ToolPreference,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(about = "Batch repair driver for archive mailbox files", version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Repair every .pst file in a folder and write the results report.
    Run(RunArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Folder holding the target files; also takes the run log and reports.
    #[arg(long)]
    folder: Option<PathBuf>,
    /// Optional TOML batch config; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Adapter selection: auto, bridge or mock.
    #[arg(long)]
    tool: Option<String>,
    /// UI-automation bridge executable.
    #[arg(long)]
    bridge: Option<PathBuf>,
    /// Installation path of the repair utility.
    #[arg(long)]
    utility: Option<PathBuf>,
    /// Behavior file for mock runs.
    #[arg(long)]
    script: Option<PathBuf>,
    /// Seconds to wait between files.
    #[arg(long)]
    settle_secs: Option<u64>,
}

fn main() {
    let args = Args::parse();

    match args.command {
        Command::Run(run) => {
            if let Err(err) = run_repair(run) {
                eprintln!("Batch error: {err}");
                std::process::exit(1);
            }
        }
    }
}

fn run_repair(args: RunArgs) -> Result<(), String> {
    let config = match &args.config {
        Some(path) => BatchConfig::load(path)?,
        None => BatchConfig::default(),
    };

    let folder = args
        .folder
        .or(config.batch.folder.clone())
        .ok_or("--folder or [batch].folder is required")?;
    let settle = Duration::from_secs(
        args.settle_secs
            .or(config.batch.settle_secs)
            .unwrap_or(5),
    );

    let preference = match args.tool.as_deref().or(config.tool.preference.as_deref()) {
        Some(value) => value.parse::<ToolPreference>()?,
        None => ToolPreference::Auto,
    };
    let bridge_path = args.bridge.or(config.tool.bridge_path.clone());
    let utility_path = args
        .utility
        .or(config.tool.utility_path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_UTILITY_PATH));

    let mut opts = BatchOptions::new(&folder);
    opts.settle = settle;

    match BridgeTool::detect(preference, bridge_path.as_deref(), &utility_path)? {
        Some(bridge) => execute(&bridge, opts),
        None => {
            let script = args.script.or(config.tool.script.clone());
            let behavior = match script {
                Some(path) => ScriptedBehavior::load(&path)?,
                None => ScriptedBehavior::default(),
            };
            let tool = ScriptedTool::new(behavior);
            execute(&tool, opts)
        }
    }
}

fn execute<T: RepairTool>(tool: &T, opts: BatchOptions) -> Result<(), String> {
    let folder = opts.folder.clone();
    let log = RunLog::create(&folder)?;

    let report = run_batch(&opts, tool, &log).map_err(|err| err.to_string())?;

    println!("\nRepair Results:");
    print!("{}", render_table(&report.records));

    let stamp = file_timestamp();
    let results_path = folder.join(format!("pst_repair_results_{stamp}.csv"));
    write_results_csv(&results_path, &report.records)?;
    println!("\nResults saved to: {}", results_path.display());

    let summary_path = folder.join(format!("pst_repair_summary_{stamp}.json"));
    write_run_summary(&summary_path, &report.summary)?;
    println!("Run summary saved to: {}", summary_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pstbatch_core::OrchestratorOptions;
    use std::fs;
    use tempfile::tempdir;

    fn names_in(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn execute_writes_reports_and_run_log() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("inbox.pst"), vec![0u8; 2048]).expect("write target");

        let mut opts = BatchOptions::new(dir.path());
        opts.settle = Duration::ZERO;
        opts.orchestrator = OrchestratorOptions {
            window_wait: Duration::from_millis(50),
            window_poll: Duration::from_millis(1),
            scan_poll: Duration::from_millis(1),
            repair_poll: Duration::from_millis(1),
            progress_every: Duration::from_secs(300),
            dismiss_settle: Duration::from_millis(1),
            deadline_override: Some(Duration::from_millis(250)),
        };
        opts.relocate.release_interval = Duration::from_millis(1);
        let tool = ScriptedTool::new(ScriptedBehavior::default());

        execute(&tool, opts).expect("execute");

        let names = names_in(dir.path());
        assert!(names
            .iter()
            .any(|name| name.starts_with("pst_repair_results_") && name.ends_with(".csv")));
        assert!(names
            .iter()
            .any(|name| name.starts_with("pst_repair_summary_") && name.ends_with(".json")));
        assert!(dir.path().join("inbox_1.bak").exists());

        let log_names = names_in(&dir.path().join("logs"));
        assert!(log_names
            .iter()
            .any(|name| name.starts_with("pst_repair_") && name.ends_with(".log")));
    }

    #[test]
    fn parses_run_flags() {
        let args = Args::try_parse_from([
            "pstbatch",
            "run",
            "--folder",
            "/srv/archives",
            "--tool",
            "mock",
            "--settle-secs",
            "0",
        ])
        .expect("parse args");
        let Command::Run(run) = args.command;
        assert_eq!(run.folder.as_deref(), Some(std::path::Path::new("/srv/archives")));
        assert_eq!(run.tool.as_deref(), Some("mock"));
        assert_eq!(run.settle_secs, Some(0));
    }

    #[test]
    fn rejects_unknown_tool_value() {
        let err = "gui".parse::<ToolPreference>().expect_err("preference gate");
        assert!(err.contains("tool preference"));
    }
}
