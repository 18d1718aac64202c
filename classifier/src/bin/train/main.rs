mod args;

use args::Args;
use candle_core::Device;
use candle_nn::{AdamW, Optimizer, ParamsAdamW};
use clap::Parser;
use classifier::loss::cross_entropy;
use classifier::{
    select_device, Dataset, Network, NetworkConfig, RunManager, RunRecord, Split,
    WeightedCrossEntropy,
};
use log::LevelFilter;
use simplelog::{Config, SimpleLogger};
use std::{error::Error, fs::File, io::BufReader};
use training::{
    ExponentialDecay, Loss, Phase, SafetensorsStore, StepDecay, TrainConfig, Trainer,
};

fn main() -> Result<(), Box<dyn Error>> {
    let args = init()?;
    let device = select_device()?;

    let dataset = load_dataset(&args)?;
    log::info!("Splitting samples into train, validation and test");
    let split = dataset.split(args.val_ratio, args.test_ratio, Some(args.seed))?;
    log::info!(
        "{} train, {} validation, {} test samples",
        split.train.len(),
        split.validation.len(),
        split.test.len()
    );

    let manager = RunManager::new(&args.runs_dir)?;
    let run = manager.create_next_run()?;
    log::info!("Writing run to {}", manager.run_path(run).display());

    if args.class_weights {
        let loss = WeightedCrossEntropy::inverse_frequency(
            &split.train.labels(),
            dataset.num_classes(),
            &device,
        )?;
        log::info!("Class weights: {:?}", loss.weights()?);
        train(&args, &split, &manager, run, &device, loss)
    } else {
        train(&args, &split, &manager, run, &device, cross_entropy)
    }
}

fn init() -> Result<Args, Box<dyn Error>> {
    let args = Args::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    SimpleLogger::init(level, Config::default())?;

    Ok(args)
}

fn load_dataset(args: &Args) -> Result<Dataset, Box<dyn Error>> {
    log::info!("Loading data from {:?}", args.data);
    let file = File::open(&args.data)?;
    let dataset = Dataset::read(BufReader::new(file), &args.label_column)?;

    if dataset.is_empty() {
        return Err(format!("{} contains no samples", args.data.display()).into());
    }

    log::info!(
        "Loaded {} samples with {} features and {} classes",
        dataset.len(),
        dataset.num_features(),
        dataset.num_classes()
    );
    log::info!("Class counts: {:?}", dataset.class_counts());
    Ok(dataset)
}

fn train<L: Loss>(
    args: &Args,
    split: &Split,
    manager: &RunManager,
    run: u32,
    device: &Device,
    loss: L,
) -> Result<(), Box<dyn Error>> {
    let num_classes = split.train.num_classes();

    log::info!("Creating network");
    let network = Network::new(
        &NetworkConfig {
            num_features: split.train.num_features(),
            num_classes,
            hidden_size: args.hidden_size,
            dropout: args.dropout,
        },
        device,
    )?;

    let optimizer = AdamW::new(
        network.varmap().all_vars(),
        ParamsAdamW {
            lr: args.learning_rate,
            ..ParamsAdamW::default()
        },
    )?;

    let mut config = TrainConfig::new(num_classes)
        .with_max_epochs(args.epochs)
        .with_patience(args.patience)
        .with_restore_best(!args.keep_last)
        .with_progress(!args.quiet);
    if !args.normal_classes.is_empty() {
        config = config.with_normal_classes(args.normal_classes.clone());
    }

    let store = SafetensorsStore::new(manager.checkpoint_dir(run))?;
    let mut trainer = Trainer::new(network, loss, optimizer, store, config)?;
    trainer = match (args.lr_decay, args.lr_step_size) {
        (Some(gamma), Some(step_size)) => trainer.with_scheduler(StepDecay::new(step_size, gamma)),
        (Some(gamma), None) => trainer.with_scheduler(ExponentialDecay::new(gamma)),
        _ => trainer,
    };

    let mut train_loader = split.train.loader(args.batch_size, device)?.shuffled(args.seed);
    let mut val_loader = split.validation.loader(args.batch_size, device)?;

    log::info!("Training network");
    let report = trainer.fit(&mut train_loader, &mut val_loader)?;

    let test = if split.test.is_empty() {
        log::warn!("Test split is empty, skipping evaluation");
        None
    } else {
        log::info!("Evaluating model on the test split");
        let mut test_loader = split.test.loader(args.batch_size, device)?;
        let metrics = trainer.evaluate(&mut test_loader, Phase::Test)?;

        log::info!("Test: {}", metrics);
        for class in 0..num_classes {
            log::info!(
                "  class {}: recall={:.2} precision={:.2} f1={:.2}",
                class,
                metrics.recall_per_class[class],
                metrics.precision_per_class[class],
                metrics.f1_per_class[class]
            );
        }
        Some(metrics)
    };

    let path = manager.write_json(run, "history.json", &RunRecord::new(&report, test))?;
    log::info!("History written to {}", path.display());

    log::info!("Saving model");
    trainer.model().save(manager.file_path(run, "model.safetensors"))?;

    log::info!("Done!");
    Ok(())
}
