use serde::{Deserialize, Serialize};

pub const FILENAME_COLUMN: &str = "filename";
pub const LABEL_COLUMN: &str = "label";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Neutral,
    Stressed,
}

impl Label {
    pub const ALL: [Label; 2] = [Label::Neutral, Label::Stressed];

    pub fn as_i64(self) -> i64 {
        match self {
            Label::Neutral => 0,
            Label::Stressed => 1,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(Label::Neutral),
            1 => Some(Label::Stressed),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        self.as_i64() as usize
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Label::Neutral => "Neutral",
            Label::Stressed => "Stressed",
        }
    }
}

/// 單一音檔的特徵列 (CSV 中的一行)
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub filename: String,
    pub values: Vec<f64>,
}

/// `filename` + 數值特徵欄位
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    pub feature_names: Vec<String>,
    pub records: Vec<FeatureRecord>,
}

impl FeatureTable {
    pub fn new(feature_names: Vec<String>) -> Self {
        Self {
            feature_names,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|n| n == name)
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.records.iter().map(|r| r.values[idx]).collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledTable {
    pub table: FeatureTable,
    pub labels: Vec<Label>,
}

impl LabeledTable {
    /// (列數, 欄數)，欄數包含 filename 與 label
    pub fn shape(&self) -> (usize, usize) {
        (self.table.len(), self.table.feature_names.len() + 2)
    }

    pub fn label_counts(&self) -> Vec<(Label, usize)> {
        let mut counts: Vec<(Label, usize)> = Label::ALL
            .iter()
            .map(|&label| (label, self.labels.iter().filter(|&&l| l == label).count()))
            .filter(|(_, count)| *count > 0)
            .collect();
        // 與 value_counts 相同：依數量遞減
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        counts
    }
}

/// 純數值的特徵矩陣與對應標籤 (preprocess / train 使用)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    pub labels: Vec<Label>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            feature_names: self.feature_names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}
