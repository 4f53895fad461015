use crate::opt::Category;

/// Samples of one sensor. A failed read is stored as `None`.
pub struct Series {
    pub category: Category,
    /// Adapter index for GPU sensors.
    pub index: usize,
    pub label: String,
    pub values: Vec<Option<f32>>,
}

impl Series {
    pub fn new(category: Category, index: usize, label: String) -> Self {
        Self {
            category,
            index,
            label,
            values: vec![],
        }
    }

    pub fn avg(&self) -> Option<f32> {
        let (sum, n) = self
            .values
            .iter()
            .flatten()
            .fold((0.0, 0), |(sum, n), v| (sum + v, n + 1));
        if n == 0 {
            None
        } else {
            Some(sum / n as f32)
        }
    }

    pub fn max(&self) -> Option<f32> {
        self.values.iter().flatten().copied().reduce(f32::max)
    }
}
