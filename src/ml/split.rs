use crate::domain::model::Label;
use crate::utils::error::{PipelineError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Seeded stratified split.
///
/// `ceil(test_size * n)` rows go to the test set. Each class contributes in
/// proportion to its size; leftover slots go to the classes with the largest
/// fractional share. Every class then keeps at least one row in each set.
pub fn stratified_split(labels: &[Label], test_size: f64, seed: u64) -> Result<TrainTestSplit> {
    let n = labels.len();
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::validation(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let n_test = (test_size * n as f64).ceil() as usize;
    let n_train = n.saturating_sub(n_test);

    let mut by_class: BTreeMap<Label, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }
    let n_classes = by_class.len();

    if n_classes < 2 {
        return Err(PipelineError::validation(
            "stratified split needs at least two classes",
        ));
    }
    if let Some((label, members)) = by_class.iter().find(|(_, m)| m.len() < 2) {
        return Err(PipelineError::validation(format!(
            "class {} has only {} member(s); at least 2 are required",
            label.as_i64(),
            members.len()
        )));
    }
    if n_test < n_classes || n_train < n_classes {
        return Err(PipelineError::validation(format!(
            "{} rows cannot be split into train ({}) and test ({}) sets covering {} classes",
            n, n_train, n_test, n_classes
        )));
    }

    let allocation = allocate(&by_class, n_test, n);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for (label, members) in by_class.iter_mut() {
        members.shuffle(&mut rng);
        let k = allocation[label];
        test.extend_from_slice(&members[..k]);
        train.extend_from_slice(&members[k..]);
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok(TrainTestSplit { train, test })
}

/// Largest-remainder allocation of `n_test` slots across classes.
fn allocate(by_class: &BTreeMap<Label, Vec<usize>>, n_test: usize, n: usize) -> BTreeMap<Label, usize> {
    let mut allocation = BTreeMap::new();
    let mut remainders = Vec::new();
    let mut assigned = 0;

    for (&label, members) in by_class {
        let ideal = n_test as f64 * members.len() as f64 / n as f64;
        let base = ideal.floor() as usize;
        allocation.insert(label, base);
        assigned += base;
        remainders.push((label, ideal - base as f64, members.len()));
    }

    // 餘數大者優先，同分時大類別優先
    remainders.sort_by(|a, b| b.1.total_cmp(&a.1).then(b.2.cmp(&a.2)).then(a.0.cmp(&b.0)));
    for (label, _, size) in remainders.into_iter().cycle().take(n_test.saturating_sub(assigned)) {
        if let Some(slot) = allocation.get_mut(&label) {
            if *slot < size {
                *slot += 1;
            }
        }
    }

    ensure_coverage(&mut allocation, by_class);
    allocation
}

/// 每個類別在 test 與 train 各至少一列；由名額最多的類別讓出
///
/// Feasible whenever `n_test` and `n_train` are both at least the class count.
fn ensure_coverage(allocation: &mut BTreeMap<Label, usize>, by_class: &BTreeMap<Label, Vec<usize>>) {
    let size = |label: &Label| by_class.get(label).map_or(0, Vec::len);

    loop {
        let starved = allocation.iter().find(|(_, &k)| k == 0).map(|(&l, _)| l);
        let full = allocation.iter().find(|(l, &k)| k >= size(*l)).map(|(&l, _)| l);

        let (from, to) = match (starved, full) {
            (Some(to), _) => {
                let donor = allocation
                    .iter()
                    .filter(|(_, &k)| k > 1)
                    .max_by_key(|(_, &k)| k)
                    .map(|(&l, _)| l);
                match donor {
                    Some(from) => (from, to),
                    None => return,
                }
            }
            (None, Some(from)) => {
                let receiver = allocation
                    .iter()
                    .filter(|(l, &k)| k + 1 < size(*l))
                    .max_by_key(|(l, &k)| size(*l) - k)
                    .map(|(&l, _)| l);
                match receiver {
                    Some(to) => (from, to),
                    None => return,
                }
            }
            (None, None) => return,
        };

        if let Some(k) = allocation.get_mut(&from) {
            *k -= 1;
        }
        if let Some(k) = allocation.get_mut(&to) {
            *k += 1;
        }
    }
}
