use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::{
    classifier::{BanknoteModel, FEATURE_COUNT, argmax, check_row_width},
    error::{BanknoteError, Result},
};

/// Leaf marker in `children_left` / `children_right`.
pub const LEAF: i64 = -1;

/// Binary decision tree in flattened node-array form.
///
/// Node `i` is a leaf when `children_left[i] == LEAF`; otherwise a row goes
/// left when `row[feature[i]] <= threshold[i]`. `value[i]` holds per-class
/// weights that are normalized into a distribution at the leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    pub fn validate(&self, n_classes: usize) -> Result<()> {
        let n = self.children_left.len();

        if n == 0 {
            return Err(BanknoteError::ModelLoad("decision tree has no nodes".into()));
        }

        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return Err(BanknoteError::ModelLoad(
                "decision tree node arrays differ in length".into(),
            ));
        }

        for node in 0..n {
            if self.value[node].len() != n_classes {
                return Err(BanknoteError::ModelLoad(format!(
                    "node {} has {} class weights, expected {}",
                    node,
                    self.value[node].len(),
                    n_classes
                )));
            }

            let left = self.children_left[node];
            let right = self.children_right[node];

            if left == LEAF {
                if right != LEAF {
                    return Err(BanknoteError::ModelLoad(format!(
                        "node {} has only one child",
                        node
                    )));
                }
                let total = self.value[node].iter().sum::<f64>();
                if !(total.is_finite() && total > 0.0) {
                    return Err(BanknoteError::ModelLoad(format!(
                        "leaf {} has no class weight",
                        node
                    )));
                }
                continue;
            }

            // Children always follow their parent, which rules out cycles.
            for child in [left, right] {
                if child <= node as i64 || child as usize >= n {
                    return Err(BanknoteError::ModelLoad(format!(
                        "node {} points to invalid child {}",
                        node, child
                    )));
                }
            }

            let feature = self.feature[node];
            if feature < 0 || feature as usize >= FEATURE_COUNT {
                return Err(BanknoteError::ModelLoad(format!(
                    "node {} splits on unknown feature {}",
                    node, feature
                )));
            }
        }

        Ok(())
    }

    /// Normalized class distribution of the leaf `row` lands in.
    pub fn leaf_distribution(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        let mut node = 0usize;

        while self.children_left[node] != LEAF {
            let feature = self.feature[node] as usize;
            node = if row[feature] <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }

        let weights = &self.value[node];
        let total = weights.iter().sum::<f64>();
        weights.iter().map(|w| w / total).collect()
    }
}

/// Ensemble of decision trees averaging their leaf distributions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub classes: Vec<i64>,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn new(classes: Vec<i64>, trees: Vec<DecisionTree>) -> Result<Self> {
        let forest = Self { classes, trees };
        forest.validate()?;
        Ok(forest)
    }

    pub fn validate(&self) -> Result<()> {
        if self.classes.len() < 2 {
            return Err(BanknoteError::ModelLoad(
                "random forest needs at least two classes".into(),
            ));
        }

        if self.trees.is_empty() {
            return Err(BanknoteError::ModelLoad("random forest has no trees".into()));
        }

        for tree in &self.trees {
            tree.validate(self.classes.len())?;
        }

        Ok(())
    }

    fn row_distribution(&self, row: ArrayView1<'_, f64>) -> Vec<f64> {
        let mut mean = vec![0.0; self.classes.len()];

        for tree in &self.trees {
            for (acc, p) in mean.iter_mut().zip(tree.leaf_distribution(row)) {
                *acc += p;
            }
        }

        let n = self.trees.len() as f64;
        mean.iter_mut().for_each(|p| *p /= n);
        mean
    }
}

impl BanknoteModel for RandomForest {
    fn predict(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<i64>> {
        check_row_width(&rows)?;

        Ok(rows
            .rows()
            .into_iter()
            .map(|row| self.classes[argmax(&self.row_distribution(row))])
            .collect())
    }

    fn predict_proba(&self, rows: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        check_row_width(&rows)?;

        let mut proba = Array2::zeros((rows.nrows(), self.classes.len()));
        for (i, row) in rows.rows().into_iter().enumerate() {
            for (j, p) in self.row_distribution(row).into_iter().enumerate() {
                proba[[i, j]] = p;
            }
        }

        Ok(proba)
    }

    fn name(&self) -> &str {
        "random_forest"
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    /// Splits on entropy (feature 3) at 5.0: low entropy leans fake.
    fn stump(left: [f64; 2], right: [f64; 2]) -> DecisionTree {
        DecisionTree {
            children_left: vec![1, LEAF, LEAF],
            children_right: vec![2, LEAF, LEAF],
            feature: vec![3, -2, -2],
            threshold: vec![5.0, -2.0, -2.0],
            value: vec![vec![1.0, 1.0], left.to_vec(), right.to_vec()],
        }
    }

    #[test]
    fn test_single_tree_routes_rows() {
        let forest = RandomForest::new(vec![0, 1], vec![stump([1.0, 3.0], [4.0, 0.0])]).unwrap();
        let rows = array![[0.0, 0.0, 0.0, 2.0], [0.0, 0.0, 0.0, 7.5]];

        let labels = forest.predict(rows.view()).unwrap();
        let proba = forest.predict_proba(rows.view()).unwrap();

        assert_eq!(labels.to_vec(), vec![1, 0]);
        assert_eq!(proba.row(0).to_vec(), vec![0.25, 0.75]);
        assert_eq!(proba.row(1).to_vec(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_threshold_is_inclusive_on_left() {
        let forest = RandomForest::new(vec![0, 1], vec![stump([0.0, 1.0], [1.0, 0.0])]).unwrap();

        let labels = forest.predict(array![[0.0, 0.0, 0.0, 5.0]].view()).unwrap();

        assert_eq!(labels[0], 1);
    }

    #[test]
    fn test_forest_averages_trees() {
        let forest = RandomForest::new(
            vec![0, 1],
            vec![stump([0.0, 1.0], [1.0, 0.0]), stump([1.0, 1.0], [1.0, 0.0])],
        )
        .unwrap();

        let proba = forest.predict_proba(array![[0.0, 0.0, 0.0, 1.0]].view()).unwrap();

        assert_eq!(proba.row(0).to_vec(), vec![0.25, 0.75]);
    }

    #[test]
    fn test_cycle_rejected() {
        let mut tree = stump([1.0, 0.0], [0.0, 1.0]);
        tree.children_left[0] = 0;

        assert!(RandomForest::new(vec![0, 1], vec![tree]).is_err());
    }

    #[test]
    fn test_unknown_feature_rejected() {
        let mut tree = stump([1.0, 0.0], [0.0, 1.0]);
        tree.feature[0] = 7;

        assert!(RandomForest::new(vec![0, 1], vec![tree]).is_err());
    }

    #[test]
    fn test_mismatched_class_weights_rejected() {
        let mut tree = stump([1.0, 0.0], [0.0, 1.0]);
        tree.value[1] = vec![1.0];

        assert!(matches!(
            RandomForest::new(vec![0, 1], vec![tree]),
            Err(BanknoteError::ModelLoad(_))
        ));
    }
}
