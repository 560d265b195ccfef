pub mod artifacts;
pub mod batch;
pub mod config;
pub mod orchestrator;
pub mod poll;
pub mod report;
pub mod runlog;
pub mod stamp;
pub mod timeout;
pub mod tool;

pub use batch::{run_batch, BatchError, BatchOptions, BatchReport};
pub use config::BatchConfig;
pub use orchestrator::{repair_file, OrchestratorOptions, RepairOutcome};
pub use report::{render_table, write_results_csv, write_run_summary, RepairRecord, RepairStatus, RunSummary};
pub use runlog::{LogSink, MemorySink, RunLog};
pub use timeout::repair_timeout;
pub use tool::{BridgeTool, RepairTool, ScriptedBehavior, ScriptedTool, ToolPreference, ToolSession};
