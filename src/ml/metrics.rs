use crate::domain::model::Label;
use serde::{Deserialize, Serialize};

pub fn accuracy(actual: &[Label], predicted: &[Label]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let correct = actual.iter().zip(predicted).filter(|(a, p)| a == p).count();
    correct as f64 / actual.len() as f64
}

/// Rows are actual labels, columns are predicted labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub counts: [[usize; 2]; 2],
}

impl ConfusionMatrix {
    pub fn from_predictions(actual: &[Label], predicted: &[Label]) -> Self {
        let mut counts = [[0usize; 2]; 2];
        for (a, p) in actual.iter().zip(predicted) {
            counts[a.index()][p.index()] += 1;
        }
        Self { counts }
    }

    pub fn get(&self, actual: Label, predicted: Label) -> usize {
        self.counts[actual.index()][predicted.index()]
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: Label,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: AverageMetrics,
    pub weighted_avg: AverageMetrics,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    // 分母為 0 時回傳 0
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl ClassificationReport {
    pub fn from_predictions(actual: &[Label], predicted: &[Label]) -> Self {
        let cm = ConfusionMatrix::from_predictions(actual, predicted);

        let classes: Vec<ClassMetrics> = Label::ALL
            .iter()
            .map(|&label| {
                let tp = cm.get(label, label);
                let predicted_total: usize = Label::ALL.iter().map(|&a| cm.get(a, label)).sum();
                let support: usize = Label::ALL.iter().map(|&p| cm.get(label, p)).sum();

                let precision = ratio(tp, predicted_total);
                let recall = ratio(tp, support);
                let f1_score = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };

                ClassMetrics {
                    label,
                    precision,
                    recall,
                    f1_score,
                    support,
                }
            })
            .collect();

        let total: usize = classes.iter().map(|c| c.support).sum();
        let n = classes.len() as f64;
        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n,
            recall: classes.iter().map(|c| c.recall).sum::<f64>() / n,
            f1_score: classes.iter().map(|c| c.f1_score).sum::<f64>() / n,
            support: total,
        };

        let weighted = |f: fn(&ClassMetrics) -> f64| -> f64 {
            if total == 0 {
                return 0.0;
            }
            classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / total as f64
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|c| c.precision),
            recall: weighted(|c| c.recall),
            f1_score: weighted(|c| c.f1_score),
            support: total,
        };

        Self {
            classes,
            accuracy: accuracy(actual, predicted),
            macro_avg,
            weighted_avg,
        }
    }

    /// Plain-text table: one row per class, then accuracy, macro and weighted averages.
    pub fn render(&self, target_names: &[&str]) -> String {
        let width = target_names
            .iter()
            .map(|n| n.len())
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(0);

        let mut out = format!(
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}\n\n",
            "",
            "precision",
            "recall",
            "f1-score",
            "support",
            width = width
        );

        for (i, class) in self.classes.iter().enumerate() {
            let name = target_names
                .get(i)
                .map(|s| s.to_string())
                .unwrap_or_else(|| class.label.as_i64().to_string());
            out.push_str(&format!(
                "{:>width$}  {:>9.2} {:>9.2} {:>9.2} {:>9}\n",
                name,
                class.precision,
                class.recall,
                class.f1_score,
                class.support,
                width = width
            ));
        }

        out.push('\n');
        out.push_str(&format!(
            "{:>width$}  {:>9} {:>9} {:>9.2} {:>9}\n",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.macro_avg.support,
            width = width
        ));
        for (name, avg) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            out.push_str(&format!(
                "{:>width$}  {:>9.2} {:>9.2} {:>9.2} {:>9}\n",
                name,
                avg.precision,
                avg.recall,
                avg.f1_score,
                avg.support,
                width = width
            ));
        }

        out
    }
}
