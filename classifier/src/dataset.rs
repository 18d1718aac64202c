use std::io::{self, BufRead};

use candle_core::{Device, Tensor};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use training::TensorLoader;

#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub features: Vec<f32>,
    pub label: u32,
}

/// Labelled feature rows read from a CSV file.
#[derive(Clone, Debug)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    samples: Vec<Sample>,
    num_classes: usize,
}

/// Disjoint train/validation/test partitions of one dataset.
#[derive(Clone, Debug)]
pub struct Split {
    pub train: Dataset,
    pub validation: Dataset,
    pub test: Dataset,
}

fn invalid_data(message: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message)
}

impl Dataset {
    /// Reads a CSV with a header row. Every column other than `label_column`
    /// must be numeric, the label column must hold class indices.
    pub fn read<R: BufRead>(reader: R, label_column: &str) -> io::Result<Self> {
        let mut lines = reader.lines();

        let header = match lines.next() {
            Some(line) => line?,
            None => return Err(invalid_data("missing header row".into())),
        };
        let columns: Vec<String> = header.split(',').map(|c| c.trim().to_string()).collect();
        let label_idx = columns
            .iter()
            .position(|c| c == label_column)
            .ok_or_else(|| invalid_data(format!("no column named '{}'", label_column)))?;

        let feature_names: Vec<String> = columns
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != label_idx)
            .map(|(_, name)| name.clone())
            .collect();

        let mut samples = Vec::new();
        for (row, line_res) in lines.enumerate() {
            let line = line_res?;
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != columns.len() {
                return Err(invalid_data(format!(
                    "row {} has {} fields, expected {}",
                    row + 1,
                    fields.len(),
                    columns.len()
                )));
            }

            let label: u32 = fields[label_idx].parse().map_err(|_| {
                invalid_data(format!(
                    "row {}: label '{}' is not a class index",
                    row + 1,
                    fields[label_idx]
                ))
            })?;

            let mut features = Vec::with_capacity(feature_names.len());
            for (i, field) in fields.iter().enumerate() {
                if i == label_idx {
                    continue;
                }
                let value: f32 = field.parse().map_err(|_| {
                    invalid_data(format!(
                        "row {}: '{}' in column '{}' is not a number",
                        row + 1,
                        field,
                        columns[i]
                    ))
                })?;
                features.push(value);
            }

            samples.push(Sample { features, label });
        }

        let num_classes = samples
            .iter()
            .map(|s| s.label as usize + 1)
            .max()
            .unwrap_or(0);

        Ok(Self {
            feature_names,
            samples,
            num_classes,
        })
    }

    /// Every label must be below `num_classes` and every sample must carry
    /// one value per feature name.
    pub fn from_samples(
        feature_names: Vec<String>,
        samples: Vec<Sample>,
        num_classes: usize,
    ) -> io::Result<Self> {
        for (i, sample) in samples.iter().enumerate() {
            if sample.label as usize >= num_classes {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "sample {}: label {} is out of range for {} classes",
                        i, sample.label, num_classes
                    ),
                ));
            }
            if sample.features.len() != feature_names.len() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!(
                        "sample {} has {} features, expected {}",
                        i,
                        sample.features.len(),
                        feature_names.len()
                    ),
                ));
            }
        }

        Ok(Self {
            feature_names,
            samples,
            num_classes,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn num_features(&self) -> usize {
        self.feature_names.len()
    }

    /// One more than the largest label of the dataset the split came from.
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn labels(&self) -> Vec<u32> {
        self.samples.iter().map(|s| s.label).collect()
    }

    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.num_classes];
        for sample in &self.samples {
            counts[sample.label as usize] += 1;
        }
        counts
    }

    /// Shuffles with `seed` (if any) and cuts off the test and validation
    /// fractions. The remainder is the training split.
    pub fn split(&self, val_ratio: f64, test_ratio: f64, seed: Option<u64>) -> io::Result<Split> {
        let valid = |r: f64| (0.0..1.0).contains(&r);
        if !valid(val_ratio) || !valid(test_ratio) || val_ratio + test_ratio >= 1.0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "invalid split ratios: validation {}, test {}",
                    val_ratio, test_ratio
                ),
            ));
        }

        let total_len = self.samples.len();
        let test_len = (total_len as f64 * test_ratio) as usize;
        let val_len = (total_len as f64 * val_ratio) as usize;

        let mut indices: Vec<usize> = (0..total_len).collect();
        if let Some(seed) = seed {
            let mut rng = StdRng::seed_from_u64(seed);
            indices.shuffle(&mut rng);
        }

        let (test_idx, rest) = indices.split_at(test_len);
        let (val_idx, train_idx) = rest.split_at(val_len);

        Ok(Split {
            train: self.subset(train_idx),
            validation: self.subset(val_idx),
            test: self.subset(test_idx),
        })
    }

    fn subset(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            samples: indices.iter().map(|&i| self.samples[i].clone()).collect(),
            num_classes: self.num_classes,
        }
    }

    /// Features as an `(N, F)` f32 tensor and labels as an `(N,)` u32 tensor.
    pub fn to_xy(&self, device: &Device) -> candle_core::Result<(Tensor, Tensor)> {
        let num_samples = self.samples.len();
        let num_features = self.num_features();

        let mut feature_data = Vec::with_capacity(num_samples * num_features);
        let mut label_data = Vec::with_capacity(num_samples);
        for sample in &self.samples {
            feature_data.extend_from_slice(&sample.features);
            label_data.push(sample.label);
        }

        let x = Tensor::from_vec(feature_data, (num_samples, num_features), device)?;
        let y = Tensor::from_vec(label_data, num_samples, device)?;
        Ok((x, y))
    }

    pub fn loader(&self, batch_size: usize, device: &Device) -> training::Result<TensorLoader> {
        let (x, y) = self.to_xy(device)?;
        TensorLoader::new(x, y, batch_size)
    }
}
