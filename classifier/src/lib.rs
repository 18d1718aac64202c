pub mod dataset;
pub mod device;
pub mod loss;
pub mod network;
pub mod record;
pub mod version;


pub use dataset::{Dataset, Sample, Split};
pub use device::select_device;
pub use loss::WeightedCrossEntropy;
pub use network::{Network, NetworkConfig};
pub use record::RunRecord;
pub use version::RunManager;
