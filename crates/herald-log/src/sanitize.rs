//! Message cleanup before writing to plain-text logs.

use regex::Regex;
use std::sync::OnceLock;

/// C0 controls except tab, LF and CR; C1 controls; the noncharacters
/// U+FDD0..U+FDEF; format (Cf) and unassigned (Cn) code points.
const STRIPPED: &str = r"[\x00-\x08\x0B\x0C\x0E-\x1F\x{80}-\x{9F}\x{FDD0}-\x{FDEF}\p{Cf}\p{Cn}]";

fn stripped() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(STRIPPED) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(error = %e, "log sanitizer pattern rejected, messages pass through");
            None
        }
    })
    .as_ref()
}

/// Removes characters that corrupt or disguise log text.
///
/// ```
/// use herald_log::sanitize;
///
/// assert_eq!(sanitize("ok\u{0}\u{202E}txt\tend\n"), "oktxt\tend\n");
/// ```
pub fn sanitize(message: &str) -> String {
    match stripped() {
        Some(re) => re.replace_all(message, "").into_owned(),
        None => message.to_string(),
    }
}
