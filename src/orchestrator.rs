//! Drives a whole run: nation file, then each selected province with its
//! cities and counties, one download at a time.

use crate::area::{AdminLevel, AreaHierarchy};
use crate::config::GranularityConfig;
use crate::constants::*;
use crate::downloader::{DownloadOutcome, VariantDownloader};
use crate::errors::AppResult;
use crate::layout::OutputLayout;
use crate::logging::{log, LogLevel};
use crate::persist::write_json;
use crate::planner::{self, DownloadPlan, DownloadTask};
use crate::progress::{ProgressSink, ProgressTracker};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Idle,
    FetchingNation,
    FetchingProvince { code: String },
    FetchingCity { code: String },
    FetchingCounty { code: String },
    Done,
    Aborted,
}

#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub code: String,
    pub label: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub planned: usize,
    pub attempted: usize,
    pub succeeded: usize,
    pub fell_back: usize,
    pub failures: Vec<TaskFailure>,
    pub provinces: usize,
    pub aborted: bool,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn print(&self) {
        let sep = "=".repeat(60);
        println!("\n{}\n{:^60}\n{}", sep, "Run Summary", sep);
        println!("Provinces:         {}", self.provinces);
        println!("Total Run Time:    {:.3?}", self.elapsed);
        println!("{}", "-".repeat(60));
        println!(
            "{:<10} {:<10} {:<10} {:<10} {:<10}",
            "Planned", "Attempted", "OK", "Fallback", "Failed"
        );
        println!(
            "{:<10} {:<10} {:<10} {:<10} {:<10}",
            self.planned,
            self.attempted,
            self.succeeded,
            self.fell_back,
            self.failed()
        );
        if !self.failures.is_empty() {
            println!("{}", "-".repeat(60));
            for f in &self.failures {
                println!("{:<8} {:<20} {}", f.code, f.label, f.reason);
            }
        }
        println!("{}", sep);
    }
}

pub struct Orchestrator {
    downloader: VariantDownloader,
    layout: OutputLayout,
    config: GranularityConfig,
    sink: Box<dyn ProgressSink>,
    cancel: Arc<AtomicBool>,
    state: RunState,
}

impl Orchestrator {
    pub fn new(
        downloader: VariantDownloader,
        layout: OutputLayout,
        config: GranularityConfig,
        sink: Box<dyn ProgressSink>,
    ) -> Self {
        Self {
            downloader,
            layout,
            config,
            sink,
            cancel: Arc::new(AtomicBool::new(false)),
            state: RunState::Idle,
        }
    }

    /// Flag checked between tasks; setting it stops further task issuance.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "state");
        self.state = next;
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Fetches `infos.json`, caches it under the output root and builds the
    /// hierarchy. Nothing can be planned without it, so failure is fatal.
    pub async fn fetch_area_index(&self) -> AppResult<AreaHierarchy> {
        log(LogLevel::Info, "Fetching area index...");
        let raw = self.downloader.fetcher().fetch_resource(INFO_RESOURCE).await?;
        write_json(self.downloader.slot(), &self.layout.info_path(), &raw).await?;
        log(
            LogLevel::Success,
            &format!("Area index saved to {}", self.layout.info_path().display()),
        );

        let hierarchy = AreaHierarchy::from_value(raw)?;
        if !hierarchy.skipped().is_empty() {
            log(
                LogLevel::Warning,
                &format!(
                    "Skipped {} malformed area codes: {}",
                    hierarchy.skipped().len(),
                    hierarchy.skipped().join(", ")
                ),
            );
        }
        Ok(hierarchy)
    }

    /// Resolves the selection and builds the plan.
    pub fn plan(&self, hierarchy: &AreaHierarchy) -> AppResult<DownloadPlan> {
        let provinces = self.config.resolve_provinces(hierarchy)?;
        Ok(planner::plan(hierarchy, &provinces, &self.config, &self.layout))
    }

    /// Executes a plan. Individual task failures are recorded, never raised.
    pub async fn execute(&mut self, plan: &DownloadPlan) -> RunSummary {
        let started = Instant::now();
        let mut summary = RunSummary {
            planned: plan.total_task_count(),
            provinces: plan.provinces.len(),
            ..Default::default()
        };

        log(
            LogLevel::Info,
            &format!(
                "{} files to download across {} provinces",
                summary.planned, summary.provinces
            ),
        );

        self.transition(RunState::FetchingNation);
        let mut tracker = ProgressTracker::new(plan.nation.label.clone(), 1);
        self.sink.start(tracker.owner(), tracker.total());
        self.run_task(&plan.nation, &mut tracker, &mut summary).await;
        self.sink.finish(&tracker);

        for province in &plan.provinces {
            if self.cancelled() {
                break;
            }
            log(
                LogLevel::Step,
                &format!(
                    "Processing {} ({} files)",
                    province.name,
                    province.task_count()
                ),
            );
            let mut tracker = ProgressTracker::new(province.name.clone(), province.task_count());
            self.sink.start(tracker.owner(), tracker.total());

            for task in &province.tasks {
                if self.cancelled() {
                    break;
                }
                self.transition(state_for(task));
                self.run_task(task, &mut tracker, &mut summary).await;
            }

            self.sink.finish(&tracker);
            log(
                LogLevel::Success,
                &format!(
                    "{} {} {}% ({}/{})",
                    province.name,
                    tracker.bar(PROGRESS_BAR_WIDTH),
                    tracker.percentage(),
                    tracker.current(),
                    tracker.total()
                ),
            );
        }

        summary.aborted = self.cancelled();
        self.transition(if summary.aborted {
            RunState::Aborted
        } else {
            RunState::Done
        });
        summary.elapsed = started.elapsed();
        summary
    }

    /// Fetch index, plan, execute.
    pub async fn run(&mut self) -> AppResult<RunSummary> {
        self.config.validate()?;
        let hierarchy = self.fetch_area_index().await?;
        let plan = self.plan(&hierarchy)?;
        Ok(self.execute(&plan).await)
    }

    async fn run_task(
        &mut self,
        task: &DownloadTask,
        tracker: &mut ProgressTracker,
        summary: &mut RunSummary,
    ) {
        summary.attempted += 1;
        let outcome = self
            .downloader
            .download(&task.code, &task.local_path, task.wants_detailed)
            .await;

        let failed = match outcome {
            DownloadOutcome::Success { fell_back, .. } => {
                summary.succeeded += 1;
                if fell_back {
                    summary.fell_back += 1;
                }
                false
            }
            DownloadOutcome::Failed(err) => {
                log(
                    LogLevel::Error,
                    &format!("Download failed: {} ({}): {}", task.code, task.label, err),
                );
                summary.failures.push(TaskFailure {
                    code: task.code.clone(),
                    label: task.label.clone(),
                    reason: err.to_string(),
                });
                true
            }
        };

        let event = tracker.record(&task.label, failed);
        self.sink.on_event(&event);
    }
}

fn state_for(task: &DownloadTask) -> RunState {
    let code = task.code.clone();
    match task.level {
        AdminLevel::Nation => RunState::FetchingNation,
        AdminLevel::Province => RunState::FetchingProvince { code },
        AdminLevel::City => RunState::FetchingCity { code },
        AdminLevel::County => RunState::FetchingCounty { code },
    }
}
