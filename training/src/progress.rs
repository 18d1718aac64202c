use indicatif::{ProgressBar, ProgressStyle};

use crate::evaluation::Phase;

pub struct PhaseProgressBar {
    bar: ProgressBar,
}

impl PhaseProgressBar {
    pub fn new(num_batches: usize, phase: Phase, visible: bool) -> Self {
        if !visible {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = ProgressBar::new(num_batches as u64);
        let style = ProgressStyle::default_bar()
            .template(
                "{spinner:.cyan} {prefix} {pos}/{len} [{wide_bar:.cyan/blue}] {eta_precise} | {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_prefix(phase.to_string());

        Self { bar }
    }

    pub fn update(&self, loss: f64) {
        self.bar.set_message(format!("loss: {:.5}", loss));
        self.bar.inc(1);
    }

    pub fn finish(&self, loss: f64, accuracy: f64) {
        self.bar
            .set_message(format!("loss: {:.5}, accuracy: {:.2}", loss, accuracy));
        self.bar.finish();
    }

    pub fn abandon(&self) {
        self.bar.abandon();
    }
}
