use async_trait::async_trait;
use uuid::Uuid;

use super::{Analyzer, Evidence, MediaArtifact, MediaKind};
use crate::diagnosis::{DiagnosisResult, SourceType};
use crate::error::AnalyzerResult;
use crate::knowledge::KnowledgeDocument;

/// Fixed output band of one media kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaProfile {
    pub relevance: f64,
    pub confidence: f64,
    pub title_prefix: &'static str,
    pub content: &'static str,
    pub category: &'static str,
    pub tags: [&'static str; 2],
    pub keywords: [&'static str; 2],
    pub steps: [&'static str; 3],
}

const IMAGE_PROFILE: MediaProfile = MediaProfile {
    relevance: 0.85,
    confidence: 85.3,
    title_prefix: "图片分析结果",
    content: "基于图像识别技术检测到的设备状态和潜在问题",
    category: "图像诊断",
    tags: ["图像识别", "设备检测"],
    keywords: ["设备异常", "视觉检测"],
    steps: ["检查设备外观", "确认异常位置", "制定维修方案"],
};

const VIDEO_PROFILE: MediaProfile = MediaProfile {
    relevance: 0.78,
    confidence: 78.9,
    title_prefix: "视频分析结果",
    content: "通过视频序列分析检测到的动态异常和运行状态",
    category: "视频诊断",
    tags: ["视频分析", "动态检测"],
    keywords: ["运行异常", "动态分析"],
    steps: ["分析运行轨迹", "检测异常模式", "优化运行参数"],
};

const AUDIO_PROFILE: MediaProfile = MediaProfile {
    relevance: 0.72,
    confidence: 72.4,
    title_prefix: "音频分析结果",
    content: "通过声音特征分析检测到的设备运行状态和异常声音",
    category: "音频诊断",
    tags: ["声音识别", "异响检测"],
    keywords: ["异响", "声音分析"],
    steps: ["识别异响类型", "定位声源位置", "检查相关部件"],
};

impl MediaKind {
    /// The fixed output band for this kind.
    pub fn profile(&self) -> &'static MediaProfile {
        match self {
            MediaKind::Image => &IMAGE_PROFILE,
            MediaKind::Video => &VIDEO_PROFILE,
            MediaKind::Audio => &AUDIO_PROFILE,
        }
    }

    pub(crate) fn analyzer_name(&self) -> &'static str {
        match self {
            MediaKind::Image => "media:image",
            MediaKind::Video => "media:video",
            MediaKind::Audio => "media:audio",
        }
    }

    /// Descriptor document for a finding on one artifact.
    pub(crate) fn finding_document(&self, artifact: &MediaArtifact) -> KnowledgeDocument {
        let profile = self.profile();
        KnowledgeDocument::new(
            format!("{}-analysis-{}", self.as_str(), Uuid::new_v4()),
            format!("{}: {}", profile.title_prefix, artifact.name),
            profile.content,
            profile.category,
        )
        .with_tags(profile.tags)
    }
}

/// Stand-in for a media classification service.
///
/// Emits exactly one result per artifact of its kind with the kind's fixed
/// relevance and confidence band. Artifacts of other kinds are ignored.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedMediaAnalyzer {
    kind: MediaKind,
}

impl SimulatedMediaAnalyzer {
    pub fn new(kind: MediaKind) -> Self {
        Self { kind }
    }

    /// One analyzer per media kind, in image, video, audio order.
    pub fn all() -> [Self; 3] {
        [
            Self::new(MediaKind::Image),
            Self::new(MediaKind::Video),
            Self::new(MediaKind::Audio),
        ]
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }
}

#[async_trait]
impl Analyzer for SimulatedMediaAnalyzer {
    fn name(&self) -> &'static str {
        self.kind.analyzer_name()
    }

    async fn analyze(&self, evidence: &Evidence) -> AnalyzerResult<Vec<DiagnosisResult>> {
        let profile = self.kind.profile();
        Ok(evidence
            .artifacts_of(self.kind)
            .map(|artifact| {
                DiagnosisResult::new(
                    self.kind.finding_document(artifact),
                    SourceType::ExternalApi,
                    profile.confidence,
                )
                .with_relevance(profile.relevance)
                .with_keywords(profile.keywords)
                .with_steps(profile.steps)
            })
            .collect())
    }
}
