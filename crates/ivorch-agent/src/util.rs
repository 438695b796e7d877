use ivorch_domain::error::Error;

pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve an API key from the environment variable named by the
/// provider's `auth_env` config field.
pub fn resolve_api_key(auth_env: &str) -> Result<String, Error> {
    std::env::var(auth_env).map_err(|_| {
        Error::Config(format!("environment variable '{auth_env}' not set or not valid UTF-8"))
    })
}
