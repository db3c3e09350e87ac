use std::fmt;

use reqwest::RequestBuilder;

use crate::error::{DoraLensError, Result};

/// Secret token passed to an upstream API.
///
/// `Debug` never prints the secret so tokens can travel inside logged structs.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Credential used against the Azure DevOps REST API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AzureCredentials {
    /// OAuth bearer token, e.g. the pipeline's `System.AccessToken`.
    Bearer(Token),
    /// Personal access token sent as basic auth with an empty user name.
    PersonalAccessToken(Token),
}

impl AzureCredentials {
    /// Picks the first usable credential.
    ///
    /// Bearer tokens win over personal access tokens. Blank values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DoraLensError::Credentials`] when nothing usable was supplied.
    pub fn select(
        system_access_token: Option<&str>,
        bearer: Option<&str>,
        pat: Option<&str>,
    ) -> Result<Self> {
        fn non_blank(value: Option<&str>) -> Option<&str> {
            value.map(str::trim).filter(|v| !v.is_empty())
        }

        if let Some(token) = non_blank(system_access_token).or_else(|| non_blank(bearer)) {
            return Ok(Self::Bearer(Token::from(token)));
        }

        if let Some(token) = non_blank(pat) {
            return Ok(Self::PersonalAccessToken(Token::from(token)));
        }

        Err(DoraLensError::Credentials(
            "set SYSTEM_ACCESSTOKEN (in a pipeline), AZDO_BEARER, or provide --pat / AZDO_PAT"
                .to_string(),
        ))
    }

    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Bearer(token) => request.bearer_auth(token.as_str()),
            Self::PersonalAccessToken(token) => request.basic_auth("", Some(token.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_debug_is_redacted() {
        let token = Token::from("super-secret");
        assert_eq!(format!("{token:?}"), "Token(***)");
        assert_eq!(token.as_str(), "super-secret");
    }

    #[test]
    fn test_system_access_token_wins() {
        let creds = AzureCredentials::select(Some("sys"), Some("bearer"), Some("pat")).unwrap();
        assert_eq!(creds, AzureCredentials::Bearer(Token::from("sys")));
    }

    #[test]
    fn test_bearer_before_pat() {
        let creds = AzureCredentials::select(None, Some("bearer"), Some("pat")).unwrap();
        assert_eq!(creds, AzureCredentials::Bearer(Token::from("bearer")));
    }

    #[test]
    fn test_blank_values_fall_through_to_pat() {
        let creds = AzureCredentials::select(Some("  "), Some(""), Some("pat")).unwrap();
        assert_eq!(
            creds,
            AzureCredentials::PersonalAccessToken(Token::from("pat"))
        );
    }

    #[test]
    fn test_credentials_are_trimmed() {
        let creds = AzureCredentials::select(Some("  sys-token \n"), None, Some("pat")).unwrap();
        assert_eq!(creds, AzureCredentials::Bearer(Token::from("sys-token")));
    }

    #[test]
    fn test_missing_credentials_is_fatal() {
        let err = AzureCredentials::select(None, None, None).unwrap_err();
        assert!(matches!(err, DoraLensError::Credentials(_)));
        assert!(err.to_string().contains("AZDO_PAT"));
    }
}
