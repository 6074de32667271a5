const OS_KEYWORDS: [&str; 4] = ["ubuntu", "linux", "windows", "macos"];
const UNKNOWN_OS: &str = "unknown";

/// Picks the label that identifies the runner OS.
///
/// Returns the first label (in the order given) whose lowercase form contains
/// any OS keyword, verbatim, or `"unknown"` when none does.
pub fn derive_runner_os(labels: &[String]) -> String {
    labels
        .iter()
        .find(|label| {
            let lower = label.to_lowercase();
            OS_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
        })
        .cloned()
        .unwrap_or_else(|| UNKNOWN_OS.to_string())
}
