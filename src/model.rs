//! ==============================================================================
//! model.rs - pre-fit failure classifier with hot reload
//! ==============================================================================
//!
//! purpose:
//!     loads the gradient-boosted tree ensemble exported by the offline training
//!     step and evaluates it as an opaque probability function. the monitor
//!     never trains; it only reads the artifact.
//!
//! relationships:
//!     - used by: scorer.rs (through the FailureModel trait)
//!     - used by: scheduler.rs (reload_if_changed once per tick)
//!     - reads: models/failure_model.json
//!
//! artifact format:
//!
//! ```text
//! {
//!   "features": ["fatigue", ..., "ultrasonic_energy"],
//!   "init_score": -3.0,          // log-odds before any tree
//!   "learning_rate": 1.0,
//!   "trees": [
//!     { "nodes": [
//!         { "feature": 4, "threshold": 0.6, "left": 1, "right": 2 },
//!         { "value": 2.0 },
//!         { "value": -0.8 }
//!     ] }
//!   ]
//! }
//! ```
//!
//! node 0 is the root. a sample goes left when x[feature] <= threshold.
//! p = sigmoid(init_score + learning_rate * sum(leaf values)).
//!
//! hot reload:
//!     remember the file's modification time, and when it moves forward load
//!     the new file. if the new file is broken the old model keeps serving.
//!
//! ==============================================================================

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::scorer::{FeatureVector, FEATURE_NAMES};

// ==============================================================================
// the injected dependency
// ==============================================================================

/// anything that maps a feature vector to P(failure)
pub trait FailureModel: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError>;

    /// swap in a newer artifact if one exists. returns true when it did.
    fn reload_if_changed(&self) -> Result<bool, ModelError> {
        Ok(false)
    }
}

// ==============================================================================
// tree ensemble
// ==============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    // only called on validated trees: every child index is in range and
    // greater than its parent, so the walk ends at a leaf
    fn evaluate(&self, x: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// deserializing always goes through `new`, so every instance is validated
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawModel")]
pub struct GradientBoostedModel {
    features: Vec<String>,
    init_score: f64,
    learning_rate: f64,
    trees: Vec<Tree>,
}

/// the artifact as written on disk, before validation
#[derive(Deserialize)]
struct RawModel {
    features: Vec<String>,
    init_score: f64,
    learning_rate: f64,
    trees: Vec<Tree>,
}

impl TryFrom<RawModel> for GradientBoostedModel {
    type Error = ModelError;

    fn try_from(raw: RawModel) -> Result<Self, Self::Error> {
        Self::new(raw.features, raw.init_score, raw.learning_rate, raw.trees)
    }
}

impl GradientBoostedModel {
    pub fn new(
        features: Vec<String>,
        init_score: f64,
        learning_rate: f64,
        trees: Vec<Tree>,
    ) -> Result<Self, ModelError> {
        let model = Self {
            features,
            init_score,
            learning_rate,
            trees,
        };
        model.validate()?;
        Ok(model)
    }

    /// read and validate an artifact from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        // parse the raw shape first so validation failures keep their own variant
        let raw: RawModel = serde_json::from_str(&content).map_err(|source| ModelError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::try_from(raw)
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// raw log-odds before the sigmoid
    pub fn decision_function(&self, features: &FeatureVector) -> f64 {
        let x = features.as_slice();
        let boost: f64 = self.trees.iter().map(|tree| tree.evaluate(x)).sum();
        self.init_score + self.learning_rate * boost
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.features.len() != FEATURE_NAMES.len()
            || self.features.iter().zip(FEATURE_NAMES).any(|(a, b)| a != b)
        {
            return Err(ModelError::FeatureMismatch {
                expected: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
                found: self.features.clone(),
            });
        }

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(ModelError::InvalidTree {
                    tree: t,
                    message: "tree has no nodes".to_string(),
                });
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                let Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } = node
                else {
                    continue;
                };
                if *feature >= FEATURE_NAMES.len() {
                    return Err(ModelError::InvalidTree {
                        tree: t,
                        message: format!("node {i} splits on unknown feature {feature}"),
                    });
                }
                if threshold.is_nan() {
                    return Err(ModelError::InvalidTree {
                        tree: t,
                        message: format!("node {i} has a NaN threshold"),
                    });
                }
                for child in [*left, *right] {
                    if child >= tree.nodes.len() {
                        return Err(ModelError::InvalidTree {
                            tree: t,
                            message: format!("node {i} points at missing node {child}"),
                        });
                    }
                    if child <= i {
                        return Err(ModelError::InvalidTree {
                            tree: t,
                            message: format!("node {i} points backwards at node {child}"),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

impl FailureModel for GradientBoostedModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let raw = self.decision_function(features);
        if !raw.is_finite() {
            return Err(ModelError::NonFiniteOutput(raw));
        }
        Ok(1.0 / (1.0 + (-raw).exp()))
    }
}

// ==============================================================================
// file-backed handle - for hot reload tracking
// ==============================================================================

struct Loaded {
    model: GradientBoostedModel,
    last_modified: Option<SystemTime>,
}

pub struct ModelHandle {
    path: PathBuf,
    loaded: RwLock<Loaded>,
}

impl ModelHandle {
    /// load the artifact once at startup. a missing file is an error, not a fallback.
    pub fn load<P: Into<PathBuf>>(path: P) -> Result<Self, ModelError> {
        let path = path.into();
        let model = GradientBoostedModel::load(&path)?;
        let last_modified = modified_time(&path);
        Ok(Self {
            path,
            loaded: RwLock::new(Loaded {
                model,
                last_modified,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tree_count(&self) -> usize {
        self.loaded.read().model.tree_count()
    }

    fn needs_reload(&self) -> Option<SystemTime> {
        let current = modified_time(&self.path)?;
        match self.loaded.read().last_modified {
            Some(seen) if current <= seen => None,
            _ => Some(current),
        }
    }
}

impl FailureModel for ModelHandle {
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        self.loaded.read().model.predict(features)
    }

    fn reload_if_changed(&self) -> Result<bool, ModelError> {
        let Some(modified) = self.needs_reload() else {
            return Ok(false);
        };

        let result = GradientBoostedModel::load(&self.path);
        let mut loaded = self.loaded.write();
        // remember this version either way so a broken file is reported once
        loaded.last_modified = Some(modified);
        loaded.model = result?;
        Ok(true)
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::time::Duration;

    fn feature_list() -> String {
        serde_json::to_string(&FEATURE_NAMES).unwrap()
    }

    /// one stump on health: healthy assets get `low`, worn ones `high`
    fn stump_json(low: f64, high: f64) -> String {
        format!(
            r#"{{
                "features": {},
                "init_score": 0.0,
                "learning_rate": 1.0,
                "trees": [
                    {{ "nodes": [
                        {{ "feature": 4, "threshold": 0.5, "left": 1, "right": 2 }},
                        {{ "value": {high} }},
                        {{ "value": {low} }}
                    ] }}
                ]
            }}"#,
            feature_list()
        )
    }

    fn vector_with_health(health: f64) -> FeatureVector {
        let mut x = [0.0; 9];
        x[4] = health;
        FeatureVector(x)
    }

    fn write_file(path: &Path, body: &str) {
        let mut file = File::create(path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
    }

    fn bump_mtime(path: &Path, seconds: u64) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(seconds))
            .unwrap();
    }

    #[test]
    fn stump_routes_on_threshold() {
        let model: GradientBoostedModel = serde_json::from_str(&stump_json(-2.0, 2.0)).unwrap();

        let healthy = model.predict(&vector_with_health(0.9)).unwrap();
        let worn = model.predict(&vector_with_health(0.2)).unwrap();
        let boundary = model.predict(&vector_with_health(0.5)).unwrap();

        assert!((healthy - 1.0 / (1.0 + 2f64.exp())).abs() < 1e-12);
        assert!(worn > 0.85);
        // x <= threshold goes left
        assert_eq!(boundary, worn);
    }

    #[test]
    fn learning_rate_scales_boost() {
        let model = GradientBoostedModel::new(
            FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            -1.0,
            0.5,
            vec![
                Tree { nodes: vec![Node::Leaf { value: 1.0 }] },
                Tree { nodes: vec![Node::Leaf { value: 3.0 }] },
            ],
        )
        .unwrap();
        assert!((model.decision_function(&vector_with_health(1.0)) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_feature_mismatch() {
        let body = stump_json(0.0, 1.0).replace("\"crack_growth\"", "\"crack\"");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        write_file(&path, &body);

        let result = GradientBoostedModel::load(&path);
        assert!(matches!(result, Err(ModelError::FeatureMismatch { .. })));
    }

    #[test]
    fn deserializing_validates_structure() {
        // left child 7 does not exist
        let body = stump_json(0.0, 1.0).replace("\"left\": 1", "\"left\": 7");
        let err = serde_json::from_str::<GradientBoostedModel>(&body).unwrap_err();
        assert!(err.to_string().contains("missing node 7"), "{err}");

        let body = stump_json(0.0, 1.0).replace("\"feature\": 4", "\"feature\": 12");
        assert!(serde_json::from_str::<GradientBoostedModel>(&body).is_err());
    }

    #[test]
    fn rejects_bad_structure() {
        let names: Vec<String> = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        let split = |feature, left, right| Node::Split {
            feature,
            threshold: 0.5,
            left,
            right,
        };

        let missing_child = vec![Tree { nodes: vec![split(0, 1, 5), Node::Leaf { value: 0.0 }] }];
        let cycle = vec![Tree { nodes: vec![split(0, 1, 2), split(0, 0, 2), Node::Leaf { value: 0.0 }] }];
        let unknown_feature = vec![Tree { nodes: vec![split(9, 1, 2), Node::Leaf { value: 0.0 }, Node::Leaf { value: 0.0 }] }];
        let empty = vec![Tree { nodes: vec![] }];

        for trees in [missing_child, cycle, unknown_feature, empty] {
            let result = GradientBoostedModel::new(names.clone(), 0.0, 1.0, trees);
            assert!(matches!(result, Err(ModelError::InvalidTree { tree: 0, .. })));
        }
    }

    #[test]
    fn missing_artifact_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ModelHandle::load(dir.path().join("nope.json"));
        assert!(matches!(result, Err(ModelError::Io { .. })));
    }

    #[test]
    fn handle_picks_up_rewritten_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        write_file(&path, &stump_json(-3.0, 3.0));

        let handle = ModelHandle::load(&path).unwrap();
        assert!(!handle.reload_if_changed().unwrap());
        let before = handle.predict(&vector_with_health(0.9)).unwrap();

        write_file(&path, &stump_json(3.0, -3.0));
        bump_mtime(&path, 5);

        assert!(handle.reload_if_changed().unwrap());
        let after = handle.predict(&vector_with_health(0.9)).unwrap();
        assert!(after > before);
        assert!(!handle.reload_if_changed().unwrap());
    }

    #[test]
    fn broken_rewrite_keeps_previous_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        write_file(&path, &stump_json(-3.0, 3.0));

        let handle = ModelHandle::load(&path).unwrap();
        let before = handle.predict(&vector_with_health(0.9)).unwrap();

        write_file(&path, "{ not json");
        bump_mtime(&path, 5);

        assert!(matches!(handle.reload_if_changed(), Err(ModelError::Parse { .. })));
        assert_eq!(handle.predict(&vector_with_health(0.9)).unwrap(), before);
        // reported once, not on every tick
        assert!(!handle.reload_if_changed().unwrap());
    }

    #[test]
    fn shipped_artifact_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("models/failure_model.json");
        let model = GradientBoostedModel::load(path).unwrap();
        assert!(model.tree_count() > 0);

        let pristine = model.predict(&vector_with_health(0.95)).unwrap();
        let failing = model.predict(&vector_with_health(0.2)).unwrap();
        assert!(pristine < 0.05);
        assert!(failing > 0.5);
    }
}
