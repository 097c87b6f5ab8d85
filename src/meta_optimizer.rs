//! Parallel search over independent training runs.
//!
//! The [`MetaOptimizer`] trains several copies of a reference net on scoped
//! worker threads. Every run gets its own deep copy of the net and of the
//! trainer, its own seed, and optionally a [`Variation`] applied before
//! training. Whenever a run beats the best metric seen so far the
//! better-solution callback is invoked; comparison and callback happen under
//! one lock so callbacks never overlap.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

use crate::activations::Activation;
use crate::error::{MetisError, Result};
use crate::network::Net;
use crate::train::{Metric, NetTrain, TrainResult};

/// Hook receiving every strictly better solution
pub type BetterSolutionCallback = Arc<dyn Fn(&NetTrain, &Net, &TrainResult) + Send + Sync>;

type ApplyFn = Arc<dyn Fn(&mut Net, &mut NetTrain) -> Result<()> + Send + Sync>;

/// A perturbation applied to a run's copy of the net (and trainer) before training
#[derive(Clone)]
pub struct Variation {
    name: String,
    apply: ApplyFn,
}

impl Variation {
    /// Variation acting on the net only
    pub fn new<S, F>(name: S, apply: F) -> Self
    where
        S: Into<String>,
        F: Fn(&mut Net) -> Result<()> + Send + Sync + 'static,
    {
        Variation {
            name: name.into(),
            apply: Arc::new(move |net: &mut Net, _: &mut NetTrain| apply(net)),
        }
    }

    /// Variation that may also change training hyperparameters
    pub fn with_train<S, F>(name: S, apply: F) -> Self
    where
        S: Into<String>,
        F: Fn(&mut Net, &mut NetTrain) -> Result<()> + Send + Sync + 'static,
    {
        Variation {
            name: name.into(),
            apply: Arc::new(apply),
        }
    }

    /// Use `activation` in every activation layer of the net
    pub fn activation(activation: Activation) -> Self {
        Variation::new(activation.name(), move |net| {
            if net.replace_activations(activation) == 0 {
                return Err(MetisError::invalid_parameter(
                    "activation",
                    "net has no activation layer",
                ));
            }
            Ok(())
        })
    }

    pub fn learning_rate(learning_rate: f32) -> Self {
        Variation::with_train(format!("learning_rate={}", learning_rate), move |_, train| {
            train.set_learning_rate(Some(learning_rate));
            Ok(())
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, net: &mut Net, train: &mut NetTrain) -> Result<()> {
        (self.apply)(net, train)
    }
}

impl fmt::Debug for Variation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variation").field("name", &self.name).finish()
    }
}

/// Outcome of one training run
#[derive(Clone, Debug)]
pub struct RunReport {
    pub job: usize,
    pub thread: usize,
    pub variation: Option<String>,
    pub seed: u64,
    pub result: std::result::Result<TrainResult, MetisError>,
}

impl RunReport {
    pub fn metric(&self) -> Option<Metric> {
        self.result.as_ref().ok().and_then(|result| result.metric())
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Every run of a [`MetaOptimizer::run`] call, ordered by job index
#[derive(Clone, Debug, Default)]
pub struct MetaReport {
    pub runs: Vec<RunReport>,
    /// Index into `runs` of the best run
    pub best_run: Option<usize>,
    /// Trained net of the best run
    pub best_net: Option<Net>,
}

impl MetaReport {
    pub fn best(&self) -> Option<&RunReport> {
        self.best_run.and_then(|index| self.runs.get(index))
    }

    pub fn failures(&self) -> usize {
        self.runs.iter().filter(|run| !run.is_ok()).count()
    }
}

#[derive(Default)]
struct Best {
    metric: Option<Metric>,
    job: Option<usize>,
    net: Option<Net>,
}

/// Read-only state shared by the workers
struct JobContext<'a> {
    net: &'a Net,
    train: &'a NetTrain,
    reinit_weights: bool,
    callback: Option<&'a BetterSolutionCallback>,
    best: Mutex<Best>,
}

impl JobContext<'_> {
    fn run(
        &self,
        job: usize,
        thread: usize,
        variation: Option<&Variation>,
        seed: u64,
    ) -> RunReport {
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| self.train_one(job, variation, seed)));
        let result = match outcome {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(err)) => {
                warn!("Run {} on thread {} failed: {}", job, thread, err);
                Err(err)
            }
            Err(payload) => {
                let message = panic_message(payload);
                warn!("Run {} on thread {} panicked: {}", job, thread, message);
                Err(MetisError::Training(message))
            }
        };
        RunReport {
            job,
            thread,
            variation: variation.map(|v| v.name().to_string()),
            seed,
            result,
        }
    }

    fn train_one(
        &self,
        job: usize,
        variation: Option<&Variation>,
        seed: u64,
    ) -> Result<TrainResult> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut net = self.net.clone();
        let mut train = self.train.clone();
        if self.reinit_weights {
            net.init(&mut rng);
        }
        // clones share the reference net's dropout and noise streams
        net.reseed(&mut rng);
        if let Some(variation) = variation {
            variation.apply(&mut net, &mut train)?;
        }
        train.set_seed(rng.gen());

        let result = train.train_on_data(&mut net)?;
        self.report(job, &train, &net, &result);
        Ok(result)
    }

    /// Critical section: compare against the best so far and notify
    fn report(&self, job: usize, train: &NetTrain, net: &Net, result: &TrainResult) {
        let metric = match result.metric() {
            Some(metric) => metric,
            None => return,
        };
        let mut best = self.best.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if best.metric.map_or(true, |current| metric.improves_on(&current)) {
            info!("Run {} found a better solution: {:?}", job, metric);
            best.metric = Some(metric);
            best.job = Some(job);
            best.net = Some(net.clone());
            if let Some(callback) = self.callback {
                callback(train, net, result);
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "worker panicked".to_string()
    }
}

/// Runs independent trainings of one net on several threads and keeps the best.
pub struct MetaOptimizer {
    net: Option<Net>,
    train: Option<NetTrain>,
    nb_threads: usize,
    seed: Option<u64>,
    reinit_weights: bool,
    variations: Vec<(usize, Variation)>,
    callback: Option<BetterSolutionCallback>,
}

impl Default for MetaOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MetaOptimizer {
    pub fn new() -> Self {
        MetaOptimizer {
            net: None,
            train: None,
            nb_threads: 0,
            seed: None,
            reinit_weights: true,
            variations: Vec::new(),
            callback: None,
        }
    }

    /// Reference net, copied for every run
    pub fn set_net(&mut self, net: &Net) {
        self.net = Some(net.clone());
    }

    /// Reference trainer, copied for every run. It must hold training data.
    pub fn set_train(&mut self, train: &NetTrain) {
        self.train = Some(train.clone());
    }

    /// Number of worker threads, 0 uses every hardware thread
    pub fn set_nb_threads(&mut self, nb_threads: usize) {
        self.nb_threads = nb_threads;
    }

    pub fn nb_threads(&self) -> usize {
        self.nb_threads
    }

    /// Seed of the generator drawing each run's seed
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = Some(seed);
    }

    /// Re-initialize the weights of each run from its own seed (default true)
    pub fn set_reinit_weights(&mut self, reinit_weights: bool) {
        self.reinit_weights = reinit_weights;
    }

    /// Schedule `repetitions` runs with `variation` applied
    pub fn add_variation(&mut self, repetitions: usize, variation: Variation) {
        self.variations.push((repetitions, variation));
    }

    pub fn clear_variations(&mut self) {
        self.variations.clear();
    }

    pub fn set_better_solution_callback<F>(&mut self, callback: F)
    where
        F: Fn(&NetTrain, &Net, &TrainResult) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
    }

    /// Run every job to completion and report them all.
    ///
    /// Without variations, one unvaried run per thread is scheduled. Jobs are
    /// assigned round-robin to the threads. A failing or panicking run is
    /// recorded in the report and does not stop the others.
    pub fn run(&self) -> Result<MetaReport> {
        let net = self.net.as_ref().ok_or_else(|| MetisError::Training("no net set".to_string()))?;
        let train = self
            .train
            .as_ref()
            .ok_or_else(|| MetisError::Training("no trainer set".to_string()))?;
        if !train.has_train_data() {
            return Err(MetisError::Training("trainer has no training data".to_string()));
        }

        let nb_threads = if self.nb_threads == 0 {
            num_cpus::get()
        } else {
            self.nb_threads
        }
        .max(1);
        let jobs: Vec<Option<&Variation>> = if self.variations.is_empty() {
            vec![None; nb_threads]
        } else {
            self.variations
                .iter()
                .flat_map(|(repetitions, variation)| {
                    std::iter::repeat(Some(variation)).take(*repetitions)
                })
                .collect()
        };
        if jobs.is_empty() {
            return Ok(MetaReport::default());
        }

        let mut master = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let seeds: Vec<u64> = jobs.iter().map(|_| master.gen()).collect();
        let nb_threads = nb_threads.min(jobs.len());
        info!("Meta optimizer: {} runs on {} threads", jobs.len(), nb_threads);

        let context = JobContext {
            net,
            train,
            reinit_weights: self.reinit_weights,
            callback: self.callback.as_ref(),
            best: Mutex::new(Best::default()),
        };

        let mut runs: Vec<RunReport> = thread::scope(|scope| {
            let handles: Vec<_> = (0..nb_threads)
                .map(|thread_index| {
                    let context = &context;
                    let jobs = &jobs;
                    let seeds = &seeds;
                    scope.spawn(move || {
                        (thread_index..jobs.len())
                            .step_by(nb_threads)
                            .map(|job| context.run(job, thread_index, jobs[job], seeds[job]))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| handle.join().unwrap_or_default())
                .collect()
        });
        runs.sort_by_key(|run| run.job);

        let best = context.best.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        let best_run = best.job.and_then(|job| runs.iter().position(|run| run.job == job));
        let failures = runs.iter().filter(|run| !run.is_ok()).count();
        info!(
            "Meta optimizer done: {} runs, {} failed, best {:?}",
            runs.len(), failures, best.metric
        );

        Ok(MetaReport {
            runs,
            best_run,
            best_net: best.net,
        })
    }
}
