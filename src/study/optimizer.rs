//! The brute-force optimizer: Prepare → Train → Validate.
//!
//! Tests every parameter combination the grid yields (`Prepare`),
//! trains each against every training sample on a bounded worker pool
//! (`Start`, training half), summarizes and ranks the results, then
//! validates only the single highest-ranked param set against held-out
//! data (`Start`, validation half). This is the direct Rust analogue
//! of the original's `BruteOptimizer` / `workerpool.New(maxWorkers)` +
//! buffered job channel: a `rayon::ThreadPool` sized to `max_workers`
//! bounds in-flight trials, and results stream back to the caller over
//! a `std::sync::mpsc` channel.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::{mpsc, Arc};
use std::thread;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::dealer::Dealer;
use crate::error::CoreError;
use crate::kline::Kline;
use crate::paramset::{cartesian_product, ParamGrid, ParamSet, ParamSetId};
use crate::perf::{summarize, PerformanceReport, PhaseReport, PortfolioReport, TradeReport};
use crate::strategy::MakeBot;

/// Factory for a fresh `Dealer` instance, mirroring `MakeBot`: the
/// orchestrator calls this once per trial so trials never share dealer
/// state.
pub type MakeDealer = Arc<dyn Fn() -> Dealer + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Training,
    Validation,
}

/// Total order over `PhaseReport`s. Ranking sorts ascending and takes
/// the **last** element as the optimum — implementations must agree on
/// this convention so ties resolve identically (see spec's "ranker
/// selects the last element" note).
pub type ObjectiveRanker = fn(&PhaseReport, &PhaseReport) -> Ordering;

/// Default ranker: orders by mean Sharpe ratio.
pub fn sharpe_ranker(a: &PhaseReport, b: &PhaseReport) -> Ordering {
    a.sharpe.partial_cmp(&b.sharpe).unwrap_or(Ordering::Equal)
}

/// Cooperative cancellation signal threaded through `start`. Checked at
/// the two suspension points the resource model allows: before a phase
/// begins dispatching jobs, and before each individual job runs.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(AtomicOrdering::SeqCst)
    }
}

/// One unit of progress emitted by `start`: the result (or error) of
/// running a single `(ParamSet, Sample)` trial.
#[derive(Debug, Clone)]
pub struct OptimizerStep {
    pub phase: Phase,
    pub param_set: ParamSet,
    pub report: Option<PerformanceReport>,
    pub error: Option<CoreError>,
}

impl OptimizerStep {
    fn canceled(phase: Phase) -> Self {
        Self {
            phase,
            param_set: ParamSet::default(),
            report: None,
            error: Some(CoreError::Canceled),
        }
    }
}

/// The full record of a study: every parameter set considered in each
/// phase, the price samples each phase trained/validated against, and
/// the aggregated results keyed by `ParamSetId`. `training_results` and
/// `validation_results` share the invariant that every entry's
/// `subject.id` equals its own key.
#[derive(Debug, Default)]
pub struct Study {
    pub training: Vec<ParamSet>,
    pub validation: Vec<ParamSet>,
    pub training_samples: Vec<Vec<Kline>>,
    pub validation_samples: Vec<Vec<Kline>>,
    pub training_results: HashMap<ParamSetId, PhaseReport>,
    pub validation_results: HashMap<ParamSetId, PhaseReport>,
}

/// Splits `sample` at `split_pct` (rounded up): the prefix becomes the
/// training slice, the suffix the validation slice. `split_pct == 0`
/// means "no split" — both phases see the entire sample.
pub fn split_sample(sample: &[Kline], split_pct: f64) -> (Vec<Kline>, Vec<Kline>) {
    if split_pct == 0.0 {
        return (sample.to_vec(), sample.to_vec());
    }
    let split_index = ((sample.len() as f64) * split_pct).ceil() as usize;
    let split_index = split_index.min(sample.len());
    (sample[..split_index].to_vec(), sample[split_index..].to_vec())
}

/// Brute-force peak-objective optimizer: trains every param set in the
/// grid against every training sample, ranks the per-param-set
/// aggregate with `ranker`, then validates only the optimum against
/// held-out data.
pub struct BruteOptimizer {
    pub sample_split_pct: f64,
    pub warmup_bar_count: usize,
    pub max_workers: usize,
    pub ranker: ObjectiveRanker,
    make_bot: MakeBot,
    make_dealer: MakeDealer,
    study: Study,
}

impl BruteOptimizer {
    pub fn new(make_bot: MakeBot, make_dealer: MakeDealer) -> Self {
        let max_workers = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self {
            sample_split_pct: 0.0,
            warmup_bar_count: 0,
            max_workers,
            ranker: sharpe_ranker,
            make_bot,
            make_dealer,
            study: Study::default(),
        }
    }

    pub fn study(&self) -> &Study {
        &self.study
    }

    /// Builds the training parameter grid and the training/validation
    /// sample split, and returns the total trial-count estimate:
    /// `|Training| * |samples| + |samples|` (one validation trial per
    /// sample, run only for the eventual optimum).
    pub fn prepare(&mut self, grid: &ParamGrid, samples: &[Vec<Kline>]) -> usize {
        self.study.training = cartesian_product(grid);
        self.study.training_samples.clear();
        self.study.validation_samples.clear();

        for sample in samples {
            let (training, validation) = split_sample(sample, self.sample_split_pct);
            self.study.training_samples.push(training);
            self.study.validation_samples.push(validation);
        }

        info!(
            param_sets = self.study.training.len(),
            samples = samples.len(),
            "study prepared"
        );

        self.study.training.len() * samples.len() + samples.len()
    }

    /// Runs the training phase to completion, summarizes and ranks it,
    /// then runs the validation phase against the optimum. Returns a
    /// receiver that yields one `OptimizerStep` per trial; the channel
    /// closes when the study (or cancellation) completes.
    pub fn start(&mut self, cancel: CancellationToken) -> mpsc::Receiver<OptimizerStep> {
        let (tx, rx) = mpsc::channel();

        let study = std::mem::take(&mut self.study);
        let max_workers = self.max_workers.max(1);
        let warmup_bar_count = self.warmup_bar_count;
        let ranker = self.ranker;
        let make_bot = Arc::clone(&self.make_bot);
        let make_dealer = Arc::clone(&self.make_dealer);

        thread::spawn(move || {
            run_study(
                study,
                max_workers,
                warmup_bar_count,
                ranker,
                make_bot,
                make_dealer,
                cancel,
                tx,
            );
        });

        rx
    }
}

fn run_study(
    mut study: Study,
    max_workers: usize,
    warmup_bar_count: usize,
    ranker: ObjectiveRanker,
    make_bot: MakeBot,
    make_dealer: MakeDealer,
    cancel: CancellationToken,
    tx: mpsc::Sender<OptimizerStep>,
) {
    if cancel.is_canceled() {
        let _ = tx.send(OptimizerStep::canceled(Phase::Training));
        return;
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_workers)
        .build()
        .expect("failed to build study worker pool");

    // --- Training ---
    let jobs = build_jobs(&study.training, &study.training_samples);
    let results = run_jobs(&pool, Phase::Training, jobs, warmup_bar_count, &make_bot, &make_dealer, &cancel);

    for step in results {
        if tx.send(step.clone()).is_err() {
            return; // receiver dropped; caller stopped listening
        }
        match &step.error {
            None => append_result(&mut study.training_results, step),
            Some(CoreError::InvalidConfig(reason)) => {
                debug!(param_set = step.param_set.id, %reason, "skipping invalid config");
            }
            Some(err) => {
                warn!(%err, "training phase aborted");
                return;
            }
        }
    }

    if cancel.is_canceled() {
        let _ = tx.send(OptimizerStep::canceled(Phase::Validation));
        return;
    }

    for report in study.training_results.values_mut() {
        *report = summarize(std::mem::take(report));
    }

    let Some(optimum) = pick_optimum(&study.training_results, ranker) else {
        info!("no training trials completed; skipping validation");
        return;
    };
    study.validation.push(optimum.clone());

    // --- Validation ---
    let jobs = build_jobs(&study.validation, &study.validation_samples);
    let results = run_jobs(&pool, Phase::Validation, jobs, warmup_bar_count, &make_bot, &make_dealer, &cancel);

    for step in results {
        if tx.send(step.clone()).is_err() {
            return;
        }
        if let Some(err) = &step.error {
            warn!(%err, "validation phase aborted");
            return;
        }
        append_result(&mut study.validation_results, step);
    }

    if let Some(report) = study.validation_results.get_mut(&optimum.id) {
        *report = summarize(std::mem::take(report));
    }
}

/// The Cartesian product of param sets and samples for one phase: one
/// job per `(ParamSet, Sample)` pair. Each job owns private clones of
/// both — workers never share mutable state (§5).
fn build_jobs(param_sets: &[ParamSet], samples: &[Vec<Kline>]) -> Vec<(ParamSet, Vec<Kline>)> {
    let mut jobs = Vec::with_capacity(param_sets.len() * samples.len());
    for pset in param_sets {
        for sample in samples {
            jobs.push((pset.clone(), sample.clone()));
        }
    }
    jobs
}

fn run_jobs(
    pool: &rayon::ThreadPool,
    phase: Phase,
    jobs: Vec<(ParamSet, Vec<Kline>)>,
    warmup_bar_count: usize,
    make_bot: &MakeBot,
    make_dealer: &MakeDealer,
    cancel: &CancellationToken,
) -> Vec<OptimizerStep> {
    pool.install(|| {
        jobs.into_par_iter()
            .map(|(pset, sample)| run_job(phase, pset, sample, warmup_bar_count, make_bot, make_dealer, cancel))
            .collect()
    })
}

fn run_job(
    phase: Phase,
    param_set: ParamSet,
    sample: Vec<Kline>,
    warmup_bar_count: usize,
    make_bot: &MakeBot,
    make_dealer: &MakeDealer,
    cancel: &CancellationToken,
) -> OptimizerStep {
    if cancel.is_canceled() {
        return OptimizerStep {
            phase,
            param_set,
            report: None,
            error: Some(CoreError::Canceled),
        };
    }

    match run_trial(&param_set, &sample, warmup_bar_count, make_bot, make_dealer) {
        Ok(report) => OptimizerStep {
            phase,
            param_set,
            report: Some(report),
            error: None,
        },
        Err(err) => OptimizerStep {
            phase,
            param_set,
            report: None,
            error: Some(err),
        },
    }
}

/// Runs one trial end to end: configure, warm up on the first
/// `warmup_bar_count` bars with no dealer interaction, then feed the
/// rest pairwise to dealer and strategy, close the bot to liquidate,
/// and build a `PerformanceReport` from the dealer's trades and
/// equity (§4.F point 1).
fn run_trial(
    param_set: &ParamSet,
    sample: &[Kline],
    warmup_bar_count: usize,
    make_bot: &MakeBot,
    make_dealer: &MakeDealer,
) -> Result<PerformanceReport, CoreError> {
    let mut dealer = make_dealer();
    let mut bot = make_bot();

    bot.configure(&param_set.params)?;

    let warmup_end = warmup_bar_count.min(sample.len());
    bot.warmup(&sample[..warmup_end])?;

    for bar in &sample[warmup_end..] {
        dealer.receive_price(*bar);
        bot.receive_price(&mut dealer, *bar)?;
    }
    bot.close(&mut dealer)?;

    let stat_n = sample.len();
    let trade_report = TradeReport::new(dealer.list_trades(), stat_n);
    let portfolio_report = PortfolioReport::new(dealer.equity_history());

    Ok(PerformanceReport {
        trade_report,
        portfolio_report,
        equity_curve: dealer.equity_history().clone(),
        properties: param_set.params.clone(),
    })
}

fn append_result(results: &mut HashMap<ParamSetId, PhaseReport>, step: OptimizerStep) {
    let entry = results.entry(step.param_set.id).or_insert_with(|| PhaseReport {
        subject: step.param_set.clone(),
        ..PhaseReport::default()
    });
    if let Some(report) = step.report {
        entry.trials.push(report);
    }
}

/// The last `PhaseReport` after sorting ascending by `ranker` — the
/// convention the whole study must agree on so ties resolve
/// identically.
fn pick_optimum(results: &HashMap<ParamSetId, PhaseReport>, ranker: ObjectiveRanker) -> Option<ParamSet> {
    let mut reports: Vec<&PhaseReport> = results.values().collect();
    reports.sort_by(|a, b| ranker(a, b));
    reports.last().map(|r| r.subject.clone())
}
