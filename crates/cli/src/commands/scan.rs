//! Scan command - wires settings, history, plan, driver and log together

use anyhow::Result;
use colored::Colorize;
use indicatif::ProgressBar;
use sonar_history_core::{
    AnalysisDriver, AnalysisLog, DateSmoother, DriverState, FatalScanError, GitRepository, Outcome,
    RevisionRecord, RevisionSource, ScanObserver, ScanPlan, ScanTarget, SonarScanner,
};
use std::time::Instant;

use crate::output;
use crate::output::terminal::short_id;
use crate::progress::{create_progress_bar, Step};
use crate::{Cli, OutputFormat, ScanStatus};

pub fn run(cli: &Cli) -> Result<ScanStatus> {
    let start = Instant::now();

    // ── 1. Config ────────────────────────────────────────────────
    // Everything that can be wrong with the input is caught before any checkout.
    let settings = cli.effective_settings(cli.load_settings()?);
    let config = cli.scan_config(&settings)?;

    eprintln!(
        "{}",
        format!(
            "  sonar-history v{} — scanning {}",
            sonar_history_core::VERSION,
            config.repository_path.display()
        )
        .bold()
    );
    eprintln!();

    // ── 2. Repository ────────────────────────────────────────────
    let repo = match &cli.workdir {
        Some(dir) => {
            let step = Step::new(format!("Copying repository into {}", dir.display()));
            match GitRepository::clone_local(&config.repository_path, dir) {
                Ok(repo) => {
                    step.finish(&repo.work_tree().display().to_string());
                    repo
                }
                Err(e) => {
                    step.fail();
                    return Err(e);
                }
            }
        }
        None => GitRepository::open(&config.repository_path)?,
    };

    // ── 3. Plan ──────────────────────────────────────────────────
    let step = Step::new("Reading history");
    let history = repo.revisions()?;
    let plan = ScanPlan::build(&history, &config, &DateSmoother::default())?;
    warn_about_plan(&step, cli, &plan);
    step.finish(&format!(
        "{} of {} revisions selected, {} dates corrected",
        plan.targets.len(),
        plan.history_len,
        plan.corrected_count()
    ));

    if cli.dry_run {
        match cli.format {
            OutputFormat::Terminal => output::terminal::print_plan(&plan),
            OutputFormat::Json => output::json::print_plan(&plan),
        }
        return Ok(ScanStatus::Clean);
    }

    // ── 4. Scan ──────────────────────────────────────────────────
    let scanner = SonarScanner::new(&settings.scanner.binary)
        .with_args(settings.scanner.args.clone())
        .with_timeout(settings.scanner.timeout());
    let driver = AnalysisDriver::new(&repo, &scanner);

    let stop = driver.stop_flag();
    ctrlc::set_handler(move || {
        stop.store(true, std::sync::atomic::Ordering::SeqCst);
    })?;

    let mut observer = ConsoleObserver {
        log: AnalysisLog::open(&settings.log.file)?,
        pb: create_progress_bar(plan.targets.len() as u64),
    };
    eprintln!(
        "  Analysing with {} (log: {})",
        settings.scanner.binary.display(),
        observer.log.path().display()
    );

    let report = driver.run(&plan, &mut observer)?;
    observer.pb.finish_and_clear();

    // ── 5. Report ────────────────────────────────────────────────
    match cli.format {
        OutputFormat::Terminal => output::terminal::print_report(&report, start),
        OutputFormat::Json => output::json::print_report(&config.repository_path, &plan, &report),
    }

    Ok(if report.aborted.is_some() {
        ScanStatus::Aborted
    } else if report.failed() > 0 {
        ScanStatus::AnalysisFailures
    } else {
        ScanStatus::Clean
    })
}

fn warn_about_plan(step: &Step, cli: &Cli, plan: &ScanPlan) {
    if plan.since_missing {
        step.warn(format!(
            "--since revision {} not found, starting from the first revision",
            cli.since.as_deref().unwrap_or_default()
        ));
    }
    if plan.until_missing {
        step.warn(format!(
            "--until revision {} not found, scanning up to the last revision",
            cli.until.as_deref().unwrap_or_default()
        ));
    }
    for o in &plan.unapplied_overrides {
        step.warn(format!(
            "{} is never used: revision {} is not reached in order among the selected revisions",
            o.file.display(),
            o.revision
        ));
    }
    if !plan.end_preserved {
        step.warn("the newest commit date could not be kept as its analysis date");
    }
}

/// Drives the progress bar and appends every record to the log
struct ConsoleObserver {
    log: AnalysisLog,
    pb: ProgressBar,
}

impl ScanObserver for ConsoleObserver {
    fn on_state(&mut self, target: &ScanTarget, state: DriverState) -> Result<()> {
        let label = match state {
            DriverState::Checkout => "checking out",
            DriverState::Configure => "staging properties",
            DriverState::Invoke => "analysing",
            DriverState::Classify => "classifying",
            _ => return Ok(()),
        };
        self.pb
            .set_message(format!("{} {}", short_id(&target.id), label));
        Ok(())
    }

    fn on_record(&mut self, record: &RevisionRecord) -> Result<()> {
        self.log.on_record(record)?;
        if let Outcome::Failure(_) = record.outcome {
            self.pb.println(output::terminal::format_record(record));
        }
        self.pb.inc(1);
        Ok(())
    }

    fn on_abort(&mut self, error: &FatalScanError) -> Result<()> {
        self.log.on_abort(error)?;
        self.pb
            .println(format!("  {}: {}", "fatal".red().bold(), error));
        Ok(())
    }
}
