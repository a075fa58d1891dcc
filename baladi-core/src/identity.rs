use baladi_shared::pii::Masked;
use serde::Serialize;

/// Caller-supplied context recorded alongside a redemption. The engine never
/// interprets it; it is serialized verbatim into the redemption metadata.
#[derive(Debug, Clone, Serialize, Default)]
pub struct RequestContext {
    pub ip_address: Option<Masked<String>>,
    pub user_agent: Option<String>,
    pub source: Option<String>,
}

impl RequestContext {
    pub fn to_metadata(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_carries_the_raw_ip() {
        let ctx = RequestContext {
            ip_address: Some(Masked("198.51.100.23".to_string())),
            user_agent: Some("baladi-app/2.4".to_string()),
            source: None,
        };
        let meta = ctx.to_metadata();
        assert_eq!(meta["ip_address"], "198.51.100.23");
        assert_eq!(meta["user_agent"], "baladi-app/2.4");
    }
}
