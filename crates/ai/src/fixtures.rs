//! Small artifacts shared by unit tests.

/// Rainfall (feature 3) > 150 → class 2; otherwise temperature (feature 4) > 28 → class 1,
/// else 0.
pub(crate) const SAMPLE_MODEL: &str = r#"{
    "n_features": 5,
    "n_classes": 3,
    "feature_names": ["N", "P", "K", "rainfall", "temperature"],
    "trees": [
        [
            {"kind": "split", "feature": 3, "threshold": 150.0, "left": 1, "right": 4},
            {"kind": "split", "feature": 4, "threshold": 28.0, "left": 2, "right": 3},
            {"kind": "leaf", "class": 0},
            {"kind": "leaf", "class": 1},
            {"kind": "leaf", "class": 2}
        ]
    ]
}"#;

pub(crate) const SAMPLE_LABELS: &str = r#"{ "classes": ["maize", "groundnuts", "rice"] }"#;
