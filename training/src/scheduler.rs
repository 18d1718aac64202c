use candle_nn::Optimizer;

/// Adjusts the learning rate once per completed epoch.
pub trait Scheduler<O> {
    fn step(&mut self, optimizer: &mut O);
}

/// Multiplies the learning rate by `gamma` every epoch.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialDecay {
    gamma: f64,
}

impl ExponentialDecay {
    pub fn new(gamma: f64) -> Self {
        Self { gamma }
    }
}

impl<O: Optimizer> Scheduler<O> for ExponentialDecay {
    fn step(&mut self, optimizer: &mut O) {
        let new_lr = optimizer.learning_rate() * self.gamma;
        optimizer.set_learning_rate(new_lr);
    }
}

/// Multiplies the learning rate by `gamma` every `step_size` epochs.
#[derive(Debug, Clone, Copy)]
pub struct StepDecay {
    step_size: usize,
    gamma: f64,
    epoch: usize,
}

impl StepDecay {
    pub fn new(step_size: usize, gamma: f64) -> Self {
        Self {
            step_size: step_size.max(1),
            gamma,
            epoch: 0,
        }
    }
}

impl<O: Optimizer> Scheduler<O> for StepDecay {
    fn step(&mut self, optimizer: &mut O) {
        self.epoch += 1;
        if self.epoch % self.step_size == 0 {
            let new_lr = optimizer.learning_rate() * self.gamma;
            optimizer.set_learning_rate(new_lr);
        }
    }
}
