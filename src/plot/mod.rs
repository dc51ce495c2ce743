//! PNG charts: per-label boxplots and the confusion-matrix heatmap.

pub mod boxplot;
pub mod canvas;
pub mod heatmap;

pub use boxplot::{render_boxplot, BoxStats};
pub use heatmap::render_confusion_matrix;
