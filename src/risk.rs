use eframe::egui::Color32;

use crate::topology::RiskLevel;

pub const ANOMALOUS_EDGE_THRESHOLD: f64 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskTier {
    Healthy,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskTier {
    pub const ALL: [Self; 5] = [
        Self::Critical,
        Self::High,
        Self::Medium,
        Self::Low,
        Self::Healthy,
    ];

    pub fn from_score(r_final: f64) -> Self {
        if r_final >= 80.0 {
            Self::Critical
        } else if r_final >= 50.0 {
            Self::High
        } else if r_final >= 30.0 {
            Self::Medium
        } else if r_final >= 10.0 {
            Self::Low
        } else {
            Self::Healthy
        }
    }

    pub fn color(self) -> Color32 {
        match self {
            Self::Critical => Color32::from_rgb(229, 62, 62),
            Self::High => Color32::from_rgb(237, 137, 54),
            Self::Medium => Color32::from_rgb(236, 201, 75),
            Self::Low => Color32::from_rgb(66, 153, 225),
            Self::Healthy => Color32::from_rgb(72, 187, 120),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Healthy => "healthy",
        }
    }
}

impl From<RiskTier> for RiskLevel {
    fn from(tier: RiskTier) -> Self {
        match tier {
            RiskTier::Critical => Self::Critical,
            RiskTier::High => Self::High,
            RiskTier::Medium => Self::Medium,
            RiskTier::Low => Self::Low,
            RiskTier::Healthy => Self::None,
        }
    }
}

pub fn risk_color(r_final: f64) -> Color32 {
    RiskTier::from_score(r_final).color()
}

pub fn is_anomalous_source(r_final: f64) -> bool {
    r_final > ANOMALOUS_EDGE_THRESHOLD
}
