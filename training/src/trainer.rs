use candle_nn::Optimizer;
use metrics::{ClassCounts, EpochMetrics, History};

use crate::checkpoint::CheckpointStore;
use crate::config::TrainConfig;
use crate::evaluation::{accumulate_batch, evaluate, finish_phase, Phase, RunningLoss};
use crate::loader::BatchSource;
use crate::loss::{scalar, Loss};
use crate::model::{Model, ModelSnapshot};
use crate::progress::PhaseProgressBar;
use crate::scheduler::Scheduler;
use crate::stopping::{Decision, EarlyStopping, StoppingState};
use crate::Result;

/// Outcome of [`Trainer::fit`].
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub train: History,
    pub validation: History,

    /// 1-based epochs that produced a new best model.
    pub improvement_epochs: Vec<usize>,

    pub epochs_run: usize,
    pub stopped_early: bool,
}

impl TrainingReport {
    pub fn best_epoch(&self) -> Option<usize> {
        self.improvement_epochs.last().copied()
    }

    /// Validation metrics of the best epoch.
    pub fn best_validation(&self) -> Option<EpochMetrics> {
        self.best_epoch()
            .and_then(|epoch| self.validation.epoch(epoch - 1))
    }
}

/// Epoch loop: train, validate, check early stopping, step the scheduler.
pub struct Trainer<M, L, O, C> {
    model: M,
    loss: L,
    optimizer: O,
    store: C,
    scheduler: Option<Box<dyn Scheduler<O>>>,
    policy: EarlyStopping,
    config: TrainConfig,
}

impl<M, L, O, C> Trainer<M, L, O, C>
where
    M: Model,
    L: Loss,
    O: Optimizer,
    C: CheckpointStore,
{
    pub fn new(model: M, loss: L, optimizer: O, store: C, config: TrainConfig) -> Result<Self> {
        config.validate()?;
        let policy = EarlyStopping::new(
            config.num_classes,
            config.patience,
            config.normal_classes.as_deref(),
        )?;

        Ok(Self {
            model,
            loss,
            optimizer,
            store,
            scheduler: None,
            policy,
            config,
        })
    }

    pub fn with_scheduler<S>(mut self, scheduler: S) -> Self
    where
        S: Scheduler<O> + 'static,
    {
        self.scheduler = Some(Box::new(scheduler));
        self
    }

    pub fn fit<T, V>(&mut self, train: &mut T, validation: &mut V) -> Result<TrainingReport>
    where
        T: BatchSource,
        V: BatchSource,
    {
        let num_classes = self.config.num_classes;
        let max_epochs = self.config.max_epochs;

        let mut train_history = History::new(num_classes);
        let mut validation_history = History::new(num_classes);
        let mut counts = ClassCounts::new(num_classes);

        let mut state = StoppingState::default();
        let mut best: Option<ModelSnapshot> = None;
        let mut epochs_run = 0;
        let mut stopped_early = false;

        log::info!(
            "Starting training: {} epochs max, patience {}, monitoring classes {:?}",
            max_epochs,
            self.policy.patience(),
            self.policy.target_classes()
        );

        for epoch in 1..=max_epochs {
            log::info!("Epoch {}/{}", epoch, max_epochs);
            if self.scheduler.is_some() {
                log::info!("  lr value {}", self.optimizer.learning_rate());
            }

            let train_metrics = self.train_epoch(train, &mut counts)?;
            log::info!("  Training:   {}", train_metrics);
            train_history.append(&train_metrics)?;

            let validation_metrics = evaluate(
                &self.model,
                &self.loss,
                validation,
                &mut counts,
                Phase::Validation,
                self.config.show_progress,
            )?;
            log::info!("  Validation: {}", validation_metrics);
            validation_history.append(&validation_metrics)?;
            epochs_run = epoch;

            let previous_best = state.best_epoch();
            let (next, decision) = self.policy.check(&state, &validation_history)?;
            state = next;

            match decision {
                Decision::Improved => self.save_best(&mut best, epoch, previous_best)?,
                Decision::Unchanged => log::info!(
                    "  No improvement for {}/{} epochs",
                    state.unchanged_epochs,
                    self.policy.patience()
                ),
                Decision::Stop => {
                    log::info!("Early stopping after {} epochs", epoch);
                    stopped_early = true;
                    break;
                }
            }

            if let Some(scheduler) = self.scheduler.as_mut() {
                scheduler.step(&mut self.optimizer);
            }
        }

        if self.config.restore_best {
            if let (Some(snapshot), Some(epoch)) = (&best, state.best_epoch()) {
                self.model.restore(snapshot)?;
                log::info!("Restored best model from epoch {}", epoch);
            }
        }

        log::info!("Training complete!");

        Ok(TrainingReport {
            train: train_history,
            validation: validation_history,
            improvement_epochs: state.improvement_epochs,
            epochs_run,
            stopped_early,
        })
    }

    fn train_epoch<T: BatchSource>(
        &mut self,
        source: &mut T,
        counts: &mut ClassCounts,
    ) -> Result<EpochMetrics> {
        let progress =
            PhaseProgressBar::new(source.num_batches(), Phase::Training, self.config.show_progress);
        let mut running = RunningLoss::default();
        counts.reset(self.config.num_classes);

        for batch in source.batches() {
            let (x, y) = batch?;

            // candle builds a fresh gradient store on every backward pass,
            // so backward_step covers zero, backward and step.
            let scores = self.model.forward_t(&x, true)?;
            let loss = self.loss.compute(&scores, &y)?;
            self.optimizer.backward_step(&loss)?;

            running.add(scalar(&loss)?);
            accumulate_batch(counts, &scores, &y)?;
            progress.update(running.mean());
        }

        finish_phase(counts, &running, Phase::Training, &progress)
    }

    fn save_best(
        &mut self,
        best: &mut Option<ModelSnapshot>,
        epoch: usize,
        previous: Option<usize>,
    ) -> Result<()> {
        // Release the old snapshot before taking the new one.
        best.take();
        let snapshot = self.model.snapshot()?;
        self.store.save(&snapshot, epoch)?;
        *best = Some(snapshot);

        if let Some(previous) = previous {
            if let Err(e) = self.store.delete(previous) {
                log::warn!("Failed to delete checkpoint of epoch {}: {}", previous, e);
            }
        }

        log::info!("  New best model saved (epoch {})", epoch);
        Ok(())
    }

    /// Runs a no-gradient pass over `source`, e.g. a held-out test split.
    pub fn evaluate<B: BatchSource>(&self, source: &mut B, phase: Phase) -> Result<EpochMetrics> {
        let mut counts = ClassCounts::new(self.config.num_classes);
        evaluate(
            &self.model,
            &self.loss,
            source,
            &mut counts,
            phase,
            self.config.show_progress,
        )
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    pub fn store(&self) -> &C {
        &self.store
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn into_model(self) -> M {
        self.model
    }
}
