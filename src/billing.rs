use std::fmt;

/// Runner operating system family used for cost attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OsCategory {
    Linux,
    Windows,
    MacOs,
    Other,
}

impl OsCategory {
    pub const ALL: [Self; 4] = [Self::Linux, Self::Windows, Self::MacOs, Self::Other];

    /// Classifies a derived `runner_os` value by case-insensitive substring.
    pub fn from_runner_os(runner_os: &str) -> Self {
        let lower = runner_os.to_lowercase();
        if lower.contains("ubuntu") || lower.contains("linux") {
            Self::Linux
        } else if lower.contains("windows") {
            Self::Windows
        } else if lower.contains("macos") {
            Self::MacOs
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for OsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Linux => "Linux",
            Self::Windows => "Windows",
            Self::MacOs => "macOS",
            Self::Other => "Other",
        };
        f.write_str(label)
    }
}

/// Billed minutes for a job: rounded up to the minute, never below one.
pub fn billed_minutes(duration_sec: u64) -> u64 {
    duration_sec.div_ceil(60).max(1)
}
