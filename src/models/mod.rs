pub mod session;

pub use session::SessionContext;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Prefix that marks a location reference as living on the object stage.
pub const STAGE_PREFIX: &str = "@";
/// Location prefix for payloads persisted in `stage_file_chunks`.
pub const CHUNKED_PREFIX: &str = "chunked://";
/// Location prefix for payloads held only in process memory.
pub const MEMORY_PREFIX: &str = "memory://";

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.to_ascii_uppercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("unknown {} value '{}'", stringify!($name), other)),
                }
            }
        }
    };
}

string_enum!(
    /// Lifecycle of an upload row. Only the status column is ever mutated.
    UploadStatus {
        Uploaded => "UPLOADED",
        Active => "ACTIVE",
    }
);

string_enum!(
    /// Where the binary payload of a file actually lives.
    StorageType {
        Stage => "STAGE",
        ChunkedDb => "CHUNKED_DB",
        Memory => "MEMORY",
    }
);

string_enum!(
    FileStatus {
        Active => "ACTIVE",
        Superseded => "SUPERSEDED",
        Inactive => "INACTIVE",
    }
);

string_enum!(
    ConfidenceLevel {
        High => "HIGH",
        Medium => "MEDIUM",
        Low => "LOW",
    }
);

string_enum!(
    ReportStatus {
        Draft => "DRAFT",
        InProgress => "IN_PROGRESS",
        Completed => "COMPLETED",
        Archived => "ARCHIVED",
    }
);

string_enum!(
    ReportPriority {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Critical => "CRITICAL",
    }
);

impl ConfidenceLevel {
    pub const HIGH_THRESHOLD: f64 = 0.9;
    pub const MEDIUM_THRESHOLD: f64 = 0.7;

    /// Buckets a stored score. Boundaries belong to the upper bucket.
    pub fn from_score(score: f64) -> Self {
        if score >= Self::HIGH_THRESHOLD {
            ConfidenceLevel::High
        } else if score >= Self::MEDIUM_THRESHOLD {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

impl StorageType {
    /// Location reference convention for a stored filename.
    pub fn location_for(&self, stage_name: &str, filename: &str, file_id: Option<&str>) -> String {
        match self {
            StorageType::Stage => format!("{}{}/{}", STAGE_PREFIX, stage_name, filename),
            StorageType::ChunkedDb => {
                format!("{}{}", CHUNKED_PREFIX, file_id.unwrap_or(filename))
            }
            StorageType::Memory => format!("{}{}", MEMORY_PREFIX, filename),
        }
    }
}
