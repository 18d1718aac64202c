use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "Classifier Trainer")]
#[command(author = "Jørgen Hanssen <jorgen@hanssen.io>")]
#[command(version = "1.0.0")]
pub struct Args {
    /// CSV file with a header row, numeric features and a label column.
    #[arg(long)]
    pub data: PathBuf,

    /// Name of the column holding the class index.
    #[arg(long, default_value = "label")]
    pub label_column: String,

    /// Directory holding the numbered run directories.
    #[arg(long, default_value = "runs")]
    pub runs_dir: PathBuf,

    /// Fraction of data for validation set.
    #[arg(long, default_value_t = 0.1)]
    pub val_ratio: f64,

    /// Fraction of data for test set.
    #[arg(long, default_value_t = 0.1)]
    pub test_ratio: f64,

    /// Seed for the split and the per-epoch shuffle.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of samples per training batch.
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Initial learning rate for optimizer.
    #[arg(long, default_value_t = 0.001)]
    pub learning_rate: f64,

    /// Learning rate decay factor, applied every epoch unless --lr-step-size is set.
    #[arg(long)]
    pub lr_decay: Option<f64>,

    /// Apply --lr-decay only every this many epochs.
    #[arg(long, requires = "lr_decay")]
    pub lr_step_size: Option<usize>,

    /// Width of both hidden layers.
    #[arg(long, default_value_t = 64)]
    pub hidden_size: usize,

    /// Dropout probability of the hidden layers.
    #[arg(long, default_value_t = 0.2)]
    pub dropout: f32,

    /// Maximum number of training epochs.
    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    /// Epochs without improvement before early stopping.
    #[arg(long, default_value_t = 20)]
    pub patience: usize,

    /// Classes left out of the recall that early stopping monitors (e.g. 0,3).
    #[arg(long, value_delimiter = ',')]
    pub normal_classes: Vec<usize>,

    /// Weight the loss by inverse class frequency of the training split.
    #[arg(long)]
    pub class_weights: bool,

    /// Keep the weights of the last epoch instead of the best one.
    #[arg(long)]
    pub keep_last: bool,

    /// Log debug output.
    #[arg(long, short)]
    pub verbose: bool,

    /// Only log warnings and hide progress bars.
    #[arg(long, short, conflicts_with = "verbose")]
    pub quiet: bool,
}
