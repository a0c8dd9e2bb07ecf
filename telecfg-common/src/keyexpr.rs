/// Default key expression prefix for provisioning reports.
pub const REPORT_PREFIX: &str = "telecfg/provision";

/// Builder for provisioning report key expressions.
///
/// Key expressions follow the pattern:
/// - `<prefix>/<device>/@/provision` for per-device outcomes
/// - `<prefix>/@/status` for the batch summary
#[derive(Debug, Clone)]
pub struct ReportKeys {
    prefix: String,
}

impl Default for ReportKeys {
    fn default() -> Self {
        Self::new(REPORT_PREFIX)
    }
}

impl ReportKeys {
    /// Create a builder with a custom prefix. Trailing slashes are dropped.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Key for one device outcome.
    ///
    /// # Example
    /// ```
    /// use telecfg_common::keyexpr::ReportKeys;
    ///
    /// let keys = ReportKeys::default();
    /// assert_eq!(
    ///     keys.device_key("10.0.0.1:57400"),
    ///     "telecfg/provision/10.0.0.1:57400/@/provision"
    /// );
    /// ```
    pub fn device_key(&self, device: &str) -> String {
        format!("{}/{}/@/provision", self.prefix, sanitize_chunk(device))
    }

    /// Key for the batch summary.
    pub fn status_key(&self) -> String {
        format!("{}/@/status", self.prefix)
    }

    /// Wildcard matching every device outcome under this prefix.
    pub fn all_devices_wildcard(&self) -> String {
        format!("{}/*/@/provision", self.prefix)
    }
}

/// Make an arbitrary device label usable as a single key expression chunk.
///
/// Zenoh reserves `*`, `$`, `?`, `#` and `/` inside chunks, and a chunk
/// starting with `@` is a verbatim chunk. All of them become `_`.
pub fn sanitize_chunk(raw: &str) -> String {
    let mut chunk: String = raw
        .chars()
        .map(|c| match c {
            '*' | '$' | '?' | '#' | '/' => '_',
            c => c,
        })
        .collect();

    if chunk.starts_with('@') {
        chunk.replace_range(..1, "_");
    }
    if chunk.is_empty() {
        chunk.push('_');
    }
    chunk
}
