use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(UploadStatus {
    Uploaded => "uploaded",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
    ManualReview => "manual_review",
});

impl UploadStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::ManualReview)
    }

    /// Whether an explicit pipeline run may start from this status.
    /// Manual review is an operator-held state and is never picked up again.
    pub fn can_start_run(&self) -> bool {
        matches!(self, Self::Uploaded | Self::Completed | Self::Failed)
    }
}

str_enum!(ConfidenceLevel {
    High => "HIGH",
    Medium => "MEDIUM",
    Low => "LOW",
});

impl ConfidenceLevel {
    /// Map a free-text confidence label onto the canonical three levels.
    /// Anything unrecognized (including an empty label) is MEDIUM.
    pub fn normalize(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Self::High,
            "LOW" => Self::Low,
            _ => Self::Medium,
        }
    }
}

str_enum!(ResultCategory {
    HealthRisk => "HEALTH_RISK",
    Ancestry => "ANCESTRY",
    Fitness => "FITNESS",
    CarrierStatus => "CARRIER_STATUS",
    Pharmacogenomics => "PHARMACOGENOMICS",
    Traits => "TRAITS",
    General => "GENERAL",
});

impl ResultCategory {
    /// Lenient parse for staged rows: blank or unknown categories fall into GENERAL.
    pub fn from_label(label: &str) -> Self {
        label.trim().parse().unwrap_or(Self::General)
    }
}

str_enum!(ReportType {
    Comprehensive => "comprehensive",
    Health => "health",
    Ancestry => "ancestry",
    Traits => "traits",
});

str_enum!(ReportStatus {
    Generating => "generating",
    Ready => "ready",
    Delivered => "delivered",
    Archived => "archived",
});

str_enum!(OrderStatus {
    Pending => "pending",
    KitShipped => "kit_shipped",
    SampleReceived => "sample_received",
    Processing => "processing",
    ResultsGenerated => "results_generated",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl OrderStatus {
    /// Orders accept lab result uploads once the sample is at the lab.
    /// RESULTS_GENERATED stays open so a corrected report can be re-uploaded.
    pub fn permits_result_upload(&self) -> bool {
        matches!(
            self,
            Self::SampleReceived | Self::Processing | Self::ResultsGenerated
        )
    }
}
