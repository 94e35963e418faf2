/// A named indicator column aligned row for row with its price series.
///
/// `None` marks a row that has no value yet (the warm-up prefix of a windowed
/// indicator). Undefined rows only ever form a prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl IndicatorSeries {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Series with a value on every row
    pub fn defined(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, values.into_iter().map(Some).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    /// Number of leading undefined rows
    pub fn warm_up(&self) -> usize {
        self.values.iter().take_while(|v| v.is_none()).count()
    }
}
