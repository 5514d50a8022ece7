//! Analytics API endpoints and wire constants
//!
//! The host part comes from the profile's connection defaults (or a client
//! record override); only the paths below are fixed.

/// Host used when the profile names no endpoint.
pub const DEFAULT_ENDPOINT: &str = "api.omniture.com";

/// Token endpoint path for the password grant.
pub const TOKEN_PATH: &str = "/token";

/// REST API path; the method name travels in the `method` query parameter.
pub const REST_PATH: &str = "/admin/1.3/rest/";

/// OAuth2 grant type for resource-owner password credentials.
pub const PASSWORD_GRANT: &str = "password";

/// Error code the token endpoint returns for a bad client id/secret.
pub const INVALID_CLIENT: &str = "invalid_client";

/// Header carrying the WSSE UsernameToken.
pub const WSSE_HEADER: &str = "x-wsse";

/// Reserved top-level profile key holding connection defaults, not a client.
pub const CONNECTION_DEFAULTS_KEY: &str = "default";

/// Turn a configured endpoint into a base URL. Bare hosts get `https://`;
/// values that already carry a scheme are kept (trailing slash trimmed).
pub fn base_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    }
}
