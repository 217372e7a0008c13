//! Client configuration.

use url::Url;

use crate::error::ClientError;

/// Where the API lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the API, always ending in `/`.
    pub base_url: Url,
}

impl ClientConfig {
    /// Parse `base_url`, adding a trailing slash so relative paths join below it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidUrl` if the URL does not parse.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { base_url })
    }

    /// Resolve an API path such as `api/products` against the base URL.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidUrl` if the result is not a valid URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_below_base_path() {
        let config = ClientConfig::new("http://localhost:5000/shop").unwrap();
        assert_eq!(
            config.endpoint("/api/products").unwrap().as_str(),
            "http://localhost:5000/shop/api/products"
        );

        let root = ClientConfig::new("http://localhost:5000").unwrap();
        assert_eq!(
            root.endpoint("api/auth/login").unwrap().as_str(),
            "http://localhost:5000/api/auth/login"
        );
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            ClientConfig::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
    }
}
