use super::{EndpointConfig, OverpassEndpoint};
use crate::transport::{HttpTransport, HttpTransportConfig, Transport};
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use url::Url;

/// Builder for [`OverpassEndpoint`].
///
/// Without an explicit config or transport, both are read from the environment
/// (`OVERPASS_*` variables) at build time.
pub struct OverpassEndpointBuilder {
    uri: String,
    config: Option<EndpointConfig>,
    http: Option<HttpTransportConfig>,
    transport: Option<Arc<dyn Transport>>,
}

impl OverpassEndpointBuilder {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            config: None,
            http: None,
            transport: None,
        }
    }

    pub fn config(mut self, config: EndpointConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// HTTP settings for the default transport. Ignored when [`Self::transport`] is set.
    pub fn http_config(mut self, http: HttpTransportConfig) -> Self {
        self.http = Some(http);
        self
    }

    /// Use a custom transport (shared clients, test doubles).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<OverpassEndpoint> {
        let uri = parse_endpoint_url(&self.uri)?;
        let config = self.config.unwrap_or_else(EndpointConfig::from_env);
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(
                self.http.unwrap_or_else(HttpTransportConfig::from_env),
            )?),
        };
        Ok(OverpassEndpoint::from_parts(uri, config, transport))
    }
}

/// Parse an interpreter URL. Scheme-relative input (`//host/api/interpreter`)
/// is read as https.
pub(crate) fn parse_endpoint_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    let candidate = if trimmed.starts_with("//") {
        format!("https:{}", trimmed)
    } else {
        trimmed.to_string()
    };
    let url = Url::parse(&candidate).map_err(|e| {
        Error::configuration_with_context(
            format!("invalid endpoint url '{}': {}", raw, e),
            ErrorContext::new().with_field_path("endpoint"),
        )
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::configuration_with_context(
            format!("unsupported scheme '{}' in endpoint url '{}'", other, raw),
            ErrorContext::new()
                .with_field_path("endpoint")
                .with_details("only http and https are supported"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_relative_urls_default_to_https() {
        let url = parse_endpoint_url("//overpass-api.de/api/interpreter").unwrap();
        assert_eq!(url.as_str(), "https://overpass-api.de/api/interpreter");
    }

    #[test]
    fn rejects_garbage_and_foreign_schemes() {
        assert!(matches!(
            parse_endpoint_url("not a url"),
            Err(Error::Configuration { .. })
        ));
        let err = parse_endpoint_url("ftp://overpass.example.org/api/interpreter").unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("endpoint")
        );
    }
}
