use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of hosting services a playlist entry can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceTag {
    #[serde(rename = "youtube", alias = "streaming-video")]
    StreamingVideo,
    #[serde(rename = "soundcloud", alias = "crowd-audio")]
    CrowdAudio,
    #[serde(rename = "spotify", alias = "premium-audio")]
    PremiumAudio,
}

impl ServiceTag {
    pub const ALL: [ServiceTag; 3] = [
        ServiceTag::StreamingVideo,
        ServiceTag::CrowdAudio,
        ServiceTag::PremiumAudio,
    ];

    /// Placeholder id the host page reserves for this service's embed.
    pub fn insert_tag(&self) -> &'static str {
        match self {
            ServiceTag::StreamingVideo => "youtube",
            ServiceTag::CrowdAudio => "soundcloud",
            ServiceTag::PremiumAudio => "spotify",
        }
    }
}

impl fmt::Display for ServiceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.insert_tag())
    }
}
