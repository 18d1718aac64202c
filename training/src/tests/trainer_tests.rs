use std::fs;
use std::io;

use candle_core::{DType, Device, Module, Tensor};
use candle_nn::loss::cross_entropy;
use candle_nn::{Linear, Optimizer, VarBuilder, VarMap, SGD};

use crate::{
    CheckpointStore, Error, ExponentialDecay, Model, ModelSnapshot, Phase, Result,
    SafetensorsStore, TensorLoader, TrainConfig, Trainer,
};

const IDENTITY: [[f32; 2]; 2] = [[1.0, 0.0], [0.0, 1.0]];

/// Scores class 0 higher for every input until training moves it.
const BIASED: [[f32; 2]; 2] = [[1.0, 1.0], [0.0, 0.0]];

/// Single linear layer over two features and two classes.
struct Toy {
    linear: Linear,
    varmap: VarMap,
}

impl Toy {
    fn new(weight: [[f32; 2]; 2]) -> Result<Self> {
        let mut varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let linear = candle_nn::linear(2, 2, vb.pp("linear"))?;

        varmap.set_one("linear.weight", Tensor::new(&weight, &Device::Cpu)?)?;
        varmap.set_one("linear.bias", Tensor::zeros(2, DType::F32, &Device::Cpu)?)?;

        Ok(Self { linear, varmap })
    }

    fn sgd(&self, learning_rate: f64) -> Result<SGD> {
        Ok(SGD::new(self.varmap.all_vars(), learning_rate)?)
    }

    fn weight(&self) -> Vec<Vec<f32>> {
        self.linear.weight().to_vec2::<f32>().unwrap()
    }
}

impl Module for Toy {
    fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        self.linear.forward(xs)
    }
}

impl Model for Toy {
    fn snapshot(&self) -> Result<ModelSnapshot> {
        ModelSnapshot::from_varmap(&self.varmap)
    }

    fn restore(&self, snapshot: &ModelSnapshot) -> Result<()> {
        snapshot.restore_into(&self.varmap)
    }
}

/// Keeps track of checkpoint calls without touching the disk.
#[derive(Debug, Default)]
struct RecordingStore {
    saved: Vec<usize>,
    deleted: Vec<usize>,
    fail_save: bool,
    fail_delete: bool,
}

impl CheckpointStore for RecordingStore {
    fn save(&mut self, _snapshot: &ModelSnapshot, epoch: usize) -> Result<()> {
        if self.fail_save {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full").into());
        }
        self.saved.push(epoch);
        Ok(())
    }

    fn delete(&mut self, epoch: usize) -> Result<()> {
        self.deleted.push(epoch);
        if self.fail_delete {
            return Err(io::Error::new(io::ErrorKind::NotFound, "already gone").into());
        }
        Ok(())
    }
}

/// Two batches, each holding one sample of every class.
fn loader() -> TensorLoader {
    let inputs = Tensor::new(
        &[[1f32, 0.0], [0.0, 1.0], [1.0, 0.0], [0.0, 1.0]],
        &Device::Cpu,
    )
    .unwrap();
    let labels = Tensor::new(&[0u32, 1, 0, 1], &Device::Cpu).unwrap();
    TensorLoader::new(inputs, labels, 2).unwrap()
}

fn config() -> TrainConfig {
    TrainConfig::new(2).with_progress(false)
}

#[test]
fn test_frozen_model_stops_after_patience() -> Result<()> {
    let toy = Toy::new(IDENTITY)?;
    let optimizer = toy.sgd(0.0)?;
    let mut trainer = Trainer::new(
        toy,
        cross_entropy,
        optimizer,
        RecordingStore::default(),
        config().with_patience(3),
    )?;

    let report = trainer.fit(&mut loader(), &mut loader())?;

    assert_eq!(report.epochs_run, 4);
    assert!(report.stopped_early);
    assert_eq!(report.improvement_epochs, vec![1]);
    assert_eq!(report.best_epoch(), Some(1));
    assert_eq!(report.train.len(), 4);
    assert_eq!(report.validation.len(), 4);
    assert_eq!(report.validation.accuracy(), &[1.0; 4]);

    assert_eq!(trainer.store().saved, vec![1]);
    assert!(trainer.store().deleted.is_empty());
    Ok(())
}

#[test]
fn test_lower_loss_alone_is_not_an_improvement() -> Result<()> {
    let toy = Toy::new(IDENTITY)?;
    let optimizer = toy.sgd(0.5)?;
    let mut trainer = Trainer::new(
        toy,
        cross_entropy,
        optimizer,
        RecordingStore::default(),
        config().with_max_epochs(5).with_patience(10),
    )?;

    let report = trainer.fit(&mut loader(), &mut loader())?;

    // Recall is perfect from the first epoch, so later loss gains do not count.
    let losses = report.validation.loss();
    assert!(losses.windows(2).all(|w| w[1] < w[0]));
    assert_eq!(report.improvement_epochs, vec![1]);
    assert_eq!(report.epochs_run, 5);
    assert!(!report.stopped_early);
    assert_eq!(trainer.store().saved, vec![1]);
    Ok(())
}

#[test]
fn test_new_best_replaces_previous_checkpoint() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = SafetensorsStore::new(dir.path())?;

    let toy = Toy::new(BIASED)?;
    let optimizer = toy.sgd(0.2)?;
    let mut trainer = Trainer::new(
        toy,
        cross_entropy,
        optimizer,
        store,
        config().with_max_epochs(5).with_patience(10),
    )?;

    let report = trainer.fit(&mut loader(), &mut loader())?;

    assert_eq!(
        report.validation.recall_per_class()[1],
        vec![0.0, 0.0, 1.0, 1.0, 1.0]
    );
    assert_eq!(report.improvement_epochs, vec![1, 3]);

    let store = trainer.store();
    assert!(!store.path(1).exists());
    assert!(store.path(3).exists());
    assert_eq!(fs::read_dir(dir.path())?.count(), 1);

    let best = report.best_validation().unwrap();
    assert_eq!(best.recall_per_class, vec![1.0, 1.0]);
    assert_eq!(best.loss, report.validation.loss()[2]);
    Ok(())
}

#[test]
fn test_best_model_is_restored() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = SafetensorsStore::new(dir.path())?;

    let toy = Toy::new(BIASED)?;
    let optimizer = toy.sgd(0.2)?;
    let mut trainer = Trainer::new(
        toy,
        cross_entropy,
        optimizer,
        store,
        config().with_max_epochs(5).with_patience(10),
    )?;
    trainer.fit(&mut loader(), &mut loader())?;

    let checkpoint = trainer.store().load(3, &Device::Cpu)?;
    let saved = checkpoint.get("linear.weight").unwrap().to_vec2::<f32>()?;
    assert_eq!(trainer.model().weight(), saved);
    Ok(())
}

#[test]
fn test_last_epoch_weights_kept_without_restore() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = SafetensorsStore::new(dir.path())?;

    let toy = Toy::new(BIASED)?;
    let optimizer = toy.sgd(0.2)?;
    let mut trainer = Trainer::new(
        toy,
        cross_entropy,
        optimizer,
        store,
        config()
            .with_max_epochs(5)
            .with_patience(10)
            .with_restore_best(false),
    )?;
    trainer.fit(&mut loader(), &mut loader())?;

    let checkpoint = trainer.store().load(3, &Device::Cpu)?;
    let saved = checkpoint.get("linear.weight").unwrap().to_vec2::<f32>()?;
    assert_ne!(trainer.model().weight(), saved);
    Ok(())
}

#[test]
fn test_normal_class_recall_is_ignored() -> Result<()> {
    let toy = Toy::new(BIASED)?;
    let optimizer = toy.sgd(0.2)?;
    let mut trainer = Trainer::new(
        toy,
        cross_entropy,
        optimizer,
        RecordingStore::default(),
        config()
            .with_max_epochs(5)
            .with_patience(10)
            .with_normal_classes(vec![0]),
    )?;

    let report = trainer.fit(&mut loader(), &mut loader())?;

    // Class 1 is missed entirely until epoch 3.
    assert_eq!(report.improvement_epochs, vec![3]);
    assert_eq!(trainer.store().saved, vec![3]);
    Ok(())
}

#[test]
fn test_scheduler_steps_after_each_completed_epoch() -> Result<()> {
    let toy = Toy::new(IDENTITY)?;
    let optimizer = toy.sgd(1e-3)?;
    let mut trainer = Trainer::new(
        toy,
        cross_entropy,
        optimizer,
        RecordingStore::default(),
        config().with_patience(2),
    )?
    .with_scheduler(ExponentialDecay::new(0.5));

    let report = trainer.fit(&mut loader(), &mut loader())?;

    // Epoch 3 stops training before its scheduler step.
    assert_eq!(report.epochs_run, 3);
    assert!((trainer.optimizer().learning_rate() - 2.5e-4).abs() < 1e-12);
    Ok(())
}

#[test]
fn test_failed_delete_does_not_abort_training() -> Result<()> {
    let toy = Toy::new(BIASED)?;
    let optimizer = toy.sgd(0.2)?;
    let store = RecordingStore {
        fail_delete: true,
        ..Default::default()
    };
    let mut trainer = Trainer::new(
        toy,
        cross_entropy,
        optimizer,
        store,
        config().with_max_epochs(5).with_patience(10),
    )?;

    let report = trainer.fit(&mut loader(), &mut loader())?;

    assert_eq!(report.epochs_run, 5);
    assert_eq!(trainer.store().saved, vec![1, 3]);
    assert_eq!(trainer.store().deleted, vec![1]);
    Ok(())
}

#[test]
fn test_failed_save_aborts_training() -> Result<()> {
    let toy = Toy::new(IDENTITY)?;
    let optimizer = toy.sgd(0.0)?;
    let store = RecordingStore {
        fail_save: true,
        ..Default::default()
    };
    let mut trainer = Trainer::new(toy, cross_entropy, optimizer, store, config())?;

    let err = trainer.fit(&mut loader(), &mut loader()).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    Ok(())
}

#[test]
fn test_empty_validation_split_fails() -> Result<()> {
    let toy = Toy::new(IDENTITY)?;
    let optimizer = toy.sgd(0.1)?;
    let mut trainer = Trainer::new(
        toy,
        cross_entropy,
        optimizer,
        RecordingStore::default(),
        config(),
    )?;

    let mut empty = TensorLoader::new(
        Tensor::zeros((0, 2), DType::F32, &Device::Cpu)?,
        Tensor::zeros(0, DType::U32, &Device::Cpu)?,
        2,
    )?;

    let err = trainer.fit(&mut loader(), &mut empty).unwrap_err();
    assert!(matches!(err, Error::EmptyPhase(Phase::Validation)));
    assert!(trainer.store().saved.is_empty());
    Ok(())
}

#[test]
fn test_all_normal_classes_rejected_up_front() -> Result<()> {
    let toy = Toy::new(IDENTITY)?;
    let optimizer = toy.sgd(0.1)?;
    let result = Trainer::new(
        toy,
        cross_entropy,
        optimizer,
        RecordingStore::default(),
        config().with_normal_classes(vec![0, 1]),
    );

    assert!(matches!(result, Err(Error::NoTargetClasses { .. })));
    Ok(())
}

#[test]
fn test_evaluate_held_out_split() -> Result<()> {
    let toy = Toy::new(IDENTITY)?;
    let optimizer = toy.sgd(0.0)?;
    let trainer = Trainer::new(
        toy,
        cross_entropy,
        optimizer,
        RecordingStore::default(),
        config(),
    )?;

    let metrics = trainer.evaluate(&mut loader(), Phase::Test)?;
    assert_eq!(metrics.accuracy, 1.0);
    assert_eq!(metrics.recall_per_class, vec![1.0, 1.0]);
    Ok(())
}
