//! Tree Ensemble - Gradient-boosted tree evaluator
//!
//! Loads the XGBoost JSON dump produced by the training pipeline and flattens
//! every tree into one contiguous node array. Evaluation walks that array and
//! never allocates.
//!
//! Accepted input:
//! - an envelope `{ objective, num_feature, base_margin, feature_version,
//!   layout_hash, trees: [...] }`
//! - a bare array of dump trees (width defaults to the current layout)

use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::logic::features::layout::{feature_index, validate_layout, LayoutMismatchError};
use crate::logic::features::{FEATURE_COUNT, FEATURE_VERSION};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("failed to read model {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("malformed model JSON: {0}")]
    Parse(String),

    #[error("unsupported objective '{0}'")]
    UnsupportedObjective(String),

    #[error("model expects {actual} features, engine provides {expected}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Layout(#[from] LayoutMismatchError),

    #[error("model contains no trees")]
    Empty,

    #[error("tree {tree}: {reason}")]
    InvalidTree { tree: usize, reason: String },

    #[error("model checksum mismatch: expected {expected}, got {actual}")]
    Checksum { expected: String, actual: String },
}

// ============================================================================
// OBJECTIVE
// ============================================================================

/// Output transformation the model was trained with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    BinaryLogistic,
    RegLogistic,
    /// Raw margin output; the engine still squashes it to a probability
    BinaryLogitRaw,
}

impl Objective {
    pub fn parse(name: &str) -> Result<Self, ModelError> {
        match name {
            "binary:logistic" => Ok(Objective::BinaryLogistic),
            "reg:logistic" => Ok(Objective::RegLogistic),
            "binary:logitraw" => Ok(Objective::BinaryLogitRaw),
            other => Err(ModelError::UnsupportedObjective(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Objective::BinaryLogistic => "binary:logistic",
            Objective::RegLogistic => "reg:logistic",
            Objective::BinaryLogitRaw => "binary:logitraw",
        }
    }
}

// ============================================================================
// RAW (DESERIALIZED) FORM
// ============================================================================

fn default_objective() -> String {
    "binary:logistic".to_string()
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default = "default_objective")]
    objective: String,
    #[serde(default)]
    num_feature: Option<usize>,
    #[serde(default)]
    base_margin: f64,
    #[serde(default)]
    feature_version: Option<u8>,
    #[serde(default)]
    layout_hash: Option<u32>,
    trees: Vec<RawNode>,
}

/// One node of an XGBoost `dump_model(..., dump_format="json")` tree
#[derive(Debug, Deserialize)]
struct RawNode {
    nodeid: usize,
    #[serde(default)]
    split: Option<String>,
    #[serde(default)]
    split_condition: Option<f64>,
    #[serde(default)]
    yes: Option<usize>,
    #[serde(default)]
    no: Option<usize>,
    #[serde(default)]
    missing: Option<usize>,
    #[serde(default)]
    leaf: Option<f64>,
    #[serde(default)]
    children: Vec<RawNode>,
}

// ============================================================================
// FLAT FORM
// ============================================================================

/// Child indices are absolute positions in `TreeEnsemble::nodes`
#[derive(Debug, Clone, Copy, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        yes: usize,
        no: usize,
        missing: usize,
    },
    Leaf(f64),
}

#[derive(Debug, Clone)]
pub struct TreeEnsemble {
    objective: Objective,
    base_margin: f64,
    num_feature: usize,
    feature_version: u8,
    layout_hash: Option<u32>,
    nodes: Vec<Node>,
    roots: Vec<usize>,
    sha256: String,
}

impl TreeEnsemble {
    /// Parse, validate and flatten a model resource.
    /// `expected_sha256` (hex, any case) is checked before parsing.
    pub fn from_slice(bytes: &[u8], expected_sha256: Option<&str>) -> Result<Self, ModelError> {
        let sha256 = hex::encode(Sha256::digest(bytes));

        if let Some(expected) = expected_sha256 {
            if !expected.trim().eq_ignore_ascii_case(&sha256) {
                return Err(ModelError::Checksum {
                    expected: expected.trim().to_lowercase(),
                    actual: sha256,
                });
            }
        }

        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| ModelError::Parse(e.to_string()))?;

        let envelope = match value {
            Value::Array(_) => RawEnvelope {
                objective: default_objective(),
                num_feature: None,
                base_margin: 0.0,
                feature_version: None,
                layout_hash: None,
                trees: serde_json::from_value(value).map_err(|e| ModelError::Parse(e.to_string()))?,
            },
            Value::Object(_) => {
                serde_json::from_value(value).map_err(|e| ModelError::Parse(e.to_string()))?
            }
            _ => return Err(ModelError::Parse("expected an object or an array of trees".to_string())),
        };

        Self::from_envelope(envelope, sha256)
    }

    fn from_envelope(envelope: RawEnvelope, sha256: String) -> Result<Self, ModelError> {
        let objective = Objective::parse(&envelope.objective)?;

        let num_feature = envelope.num_feature.unwrap_or(FEATURE_COUNT);
        if num_feature != FEATURE_COUNT {
            return Err(ModelError::WidthMismatch {
                expected: FEATURE_COUNT,
                actual: num_feature,
            });
        }

        let feature_version = envelope.feature_version.unwrap_or(FEATURE_VERSION);
        if let Some(hash) = envelope.layout_hash {
            validate_layout(feature_version, hash)?;
        }

        if !envelope.base_margin.is_finite() {
            return Err(ModelError::Parse("base_margin is not finite".to_string()));
        }

        if envelope.trees.is_empty() {
            return Err(ModelError::Empty);
        }

        let mut nodes = Vec::new();
        let mut roots = Vec::with_capacity(envelope.trees.len());
        for (tree_idx, tree) in envelope.trees.iter().enumerate() {
            roots.push(nodes.len());
            flatten_tree(tree_idx, tree, num_feature, &mut nodes)?;
        }

        Ok(Self {
            objective,
            base_margin: envelope.base_margin,
            num_feature,
            feature_version,
            layout_hash: envelope.layout_hash,
            nodes,
            roots,
            sha256,
        })
    }

    /// Sum of leaf values plus base margin.
    /// `x < threshold` goes to `yes`, NaN goes to `missing`.
    /// Caller guarantees `features.len() == self.num_feature()`.
    pub fn margin(&self, features: &[f64]) -> f64 {
        let mut sum = self.base_margin;

        for &root in &self.roots {
            let mut idx = root;
            loop {
                match self.nodes[idx] {
                    Node::Leaf(value) => {
                        sum += value;
                        break;
                    }
                    Node::Split { feature, threshold, yes, no, missing } => {
                        let x = features[feature];
                        idx = if x.is_nan() {
                            missing
                        } else if x < threshold {
                            yes
                        } else {
                            no
                        };
                    }
                }
            }
        }

        sum
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn num_feature(&self) -> usize {
        self.num_feature
    }

    pub fn num_trees(&self) -> usize {
        self.roots.len()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn feature_version(&self) -> u8 {
        self.feature_version
    }

    pub fn layout_hash(&self) -> Option<u32> {
        self.layout_hash
    }

    /// Hex SHA-256 of the resource this ensemble was loaded from
    pub fn sha256(&self) -> &str {
        &self.sha256
    }
}

// ============================================================================
// FLATTENING
// ============================================================================

fn invalid(tree: usize, reason: impl Into<String>) -> ModelError {
    ModelError::InvalidTree {
        tree,
        reason: reason.into(),
    }
}

/// `f12` or a layout feature name
fn resolve_feature(tree: usize, split: &str, width: usize) -> Result<usize, ModelError> {
    let index = split
        .strip_prefix('f')
        .and_then(|digits| digits.parse::<usize>().ok())
        .or_else(|| feature_index(split))
        .ok_or_else(|| invalid(tree, format!("unknown split feature '{split}'")))?;

    if index >= width {
        return Err(invalid(tree, format!("feature index {index} out of range")));
    }
    Ok(index)
}

fn flatten_tree(
    tree: usize,
    root: &RawNode,
    width: usize,
    out: &mut Vec<Node>,
) -> Result<(), ModelError> {
    let mut collected = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        collected.push(node);
        stack.extend(node.children.iter());
    }

    // Dense ids: every id is below the node count
    let mut by_id: Vec<Option<&RawNode>> = vec![None; collected.len()];
    for node in collected {
        let slot = by_id
            .get_mut(node.nodeid)
            .ok_or_else(|| invalid(tree, format!("node id {} out of range", node.nodeid)))?;
        if slot.is_some() {
            return Err(invalid(tree, format!("duplicate node id {}", node.nodeid)));
        }
        *slot = Some(node);
    }

    if root.nodeid != 0 {
        return Err(invalid(tree, "root node id must be 0"));
    }

    let size = by_id.len();
    let offset = out.len();

    for (id, slot) in by_id.iter().copied().enumerate() {
        let node = slot.ok_or_else(|| invalid(tree, format!("node ids not dense, missing {id}")))?;

        if let Some(value) = node.leaf {
            if !value.is_finite() {
                return Err(invalid(tree, format!("leaf {id} is not finite")));
            }
            out.push(Node::Leaf(value));
            continue;
        }

        let split = node
            .split
            .as_deref()
            .ok_or_else(|| invalid(tree, format!("node {id} is neither leaf nor split")))?;
        let feature = resolve_feature(tree, split, width)?;

        let threshold = node
            .split_condition
            .filter(|t| t.is_finite())
            .ok_or_else(|| invalid(tree, format!("node {id} has no finite split_condition")))?;

        let (yes, no) = match (node.yes, node.no) {
            (Some(yes), Some(no)) => (yes, no),
            _ => return Err(invalid(tree, format!("node {id} is missing a child"))),
        };
        let missing = node.missing.unwrap_or(yes);

        // Children after parent: guarantees every walk terminates
        for child in [yes, no, missing] {
            if child <= id || child >= size {
                return Err(invalid(tree, format!("node {id} has invalid child {child}")));
            }
        }

        out.push(Node::Split {
            feature,
            threshold,
            yes: offset + yes,
            no: offset + no,
            missing: offset + missing,
        });
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
