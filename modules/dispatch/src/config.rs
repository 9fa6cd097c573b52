use compact_str::CompactString;

/// Shape of generated tracking ids: `{prefix}-{yyyymmdd}-{random suffix}`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TrackingConfig {
    #[serde(default = "default_tracking_prefix")]
    pub prefix: CompactString,
    /// Length of the random alphanumeric suffix.
    #[serde(default = "default_suffix_len")]
    pub suffix_len: usize,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            prefix: default_tracking_prefix(),
            suffix_len: default_suffix_len(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CheckoutConfig {
    /// ISO currency code passed to the payment provider, lowercase.
    #[serde(default = "default_currency")]
    pub currency: CompactString,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
        }
    }
}

fn default_tracking_prefix() -> CompactString {
    CompactString::new("PCL")
}

fn default_suffix_len() -> usize {
    10
}

fn default_currency() -> CompactString {
    CompactString::new("usd")
}
