use serde::{Deserialize, Serialize};

use crate::constants::{APP_NAME, APP_VERSION};
use crate::logic::features::LayoutInfo;
use crate::logic::model::ModelStatus;
use crate::logic::pipeline::ScoringPipeline;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub app: String,
    pub version: String,

    pub layout: LayoutInfo,

    pub model: ModelStatus,
    pub signing: SigningStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningStatus {
    pub algorithm: String,
    pub public_key: String,
}

impl EngineStatus {
    pub fn collect(pipeline: &ScoringPipeline) -> Self {
        Self {
            app: APP_NAME.to_string(),
            version: APP_VERSION.to_string(),
            layout: LayoutInfo::current(),
            model: pipeline.engine().status(),
            signing: SigningStatus {
                algorithm: "ed25519".to_string(),
                public_key: pipeline.security().public_key_base64().to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::config::EngineConfig;
    use crate::logic::features::{layout_hash, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_VERSION};

    #[test]
    fn test_collect_status() {
        let pipeline = ScoringPipeline::from_config(&EngineConfig::ephemeral()).unwrap();
        let status = EngineStatus::collect(&pipeline);

        assert_eq!(status.layout.version, FEATURE_VERSION);
        assert_eq!(status.layout.feature_count, FEATURE_COUNT);
        assert_eq!(status.layout.hash, layout_hash());
        assert_eq!(status.layout.feature_names[0], FEATURE_LAYOUT[0]);
        assert!(status.model.model_loaded);
        assert_eq!(status.model.layout_hash, Some(layout_hash()));
        assert!(!status.signing.public_key.is_empty());
    }
}
