pub mod logistic;
pub mod metrics;
pub mod scaler;
pub mod split;

pub use logistic::{LogisticRegression, LogisticRegressionParams};
pub use metrics::{accuracy, ClassificationReport, ConfusionMatrix};
pub use scaler::StandardScaler;
pub use split::{stratified_split, TrainTestSplit};
