//! Cognito user-pool sign-in.
//!
//! Performed out of band, before the main request: the engine exchanges the
//! configured username/password for a JWT access token via the Cognito IDP
//! `InitiateAuth` API (`USER_PASSWORD_AUTH` flow) and injects it as a bearer
//! on the outgoing request. A failed sign-in fails the whole send before any
//! network call for the target resource is made.

use crate::cache::TokenCache;
use crate::errors::EngineError;
use serde_json::json;

/// Credentials parsed positionally from a `Cognito ...` authorization header:
/// `Cognito <username> <password> <region> <userPoolId> <clientId>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CognitoCredentials {
    pub username: String,
    pub password: String,
    pub region: String,
    pub user_pool_id: String,
    pub client_id: String,
}

impl CognitoCredentials {
    pub fn parse(authorization: &str) -> Self {
        let mut tokens = authorization.split_whitespace().skip(1);
        let mut next = || tokens.next().unwrap_or("").to_string();
        Self {
            username: next(),
            password: next(),
            region: next(),
            user_pool_id: next(),
            client_id: next(),
        }
    }

    /// Cache key identifying this credential set.
    pub fn cache_key(&self) -> String {
        format!("{}:{}:{}", self.user_pool_id, self.client_id, self.username)
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.username.is_empty()
            || self.password.is_empty()
            || self.region.is_empty()
            || self.user_pool_id.is_empty()
            || self.client_id.is_empty()
        {
            return Err(EngineError::AuthSetup(
                "Cognito authorization requires username, password, region, user pool id and client id"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Signs in against the user pool and returns the access token.
///
/// Tokens are cached per credential identity; concurrent sends reuse a
/// previously obtained token instead of signing in again.
pub async fn obtain_access_token(
    credentials: &CognitoCredentials,
    cache: &TokenCache,
) -> Result<String, EngineError> {
    credentials.validate()?;

    let key = credentials.cache_key();
    if let Some(token) = cache.get(&key) {
        return Ok(token);
    }

    let token = sign_in(credentials).await?;
    cache.set(key, token.clone());
    Ok(token)
}

async fn sign_in(credentials: &CognitoCredentials) -> Result<String, EngineError> {
    let endpoint = format!("https://cognito-idp.{}.amazonaws.com/", credentials.region);
    let payload = json!({
        "AuthFlow": "USER_PASSWORD_AUTH",
        "ClientId": credentials.client_id,
        "AuthParameters": {
            "USERNAME": credentials.username,
            "PASSWORD": credentials.password,
        },
    });

    let client = reqwest::Client::new();
    let response = client
        .post(&endpoint)
        .header("content-type", "application/x-amz-json-1.1")
        .header("x-amz-target", "AWSCognitoIdentityProviderService.InitiateAuth")
        .body(payload.to_string())
        .send()
        .await
        .map_err(|e| EngineError::AuthSetup(format!("Cognito sign-in request failed: {}", e)))?;

    let status = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| EngineError::AuthSetup(format!("Invalid Cognito sign-in response: {}", e)))?;

    if !status.is_success() {
        let message = body
            .get("message")
            .or_else(|| body.get("Message"))
            .and_then(|m| m.as_str())
            .unwrap_or("unknown error");
        let kind = body.get("__type").and_then(|t| t.as_str()).unwrap_or("error");
        return Err(EngineError::AuthSetup(format!(
            "Cognito sign-in rejected ({}): {}",
            kind, message
        )));
    }

    // A challenge instead of a token means the flow needs interaction the
    // engine cannot provide; that is a setup failure.
    if let Some(challenge) = body.get("ChallengeName").and_then(|c| c.as_str()) {
        return Err(EngineError::AuthSetup(format!(
            "Cognito sign-in requires additional step: {}",
            challenge
        )));
    }

    body.pointer("/AuthenticationResult/AccessToken")
        .and_then(|t| t.as_str())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            EngineError::AuthSetup("Cognito sign-in returned no access token".to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_positional_fields() {
        let creds = CognitoCredentials::parse("Cognito user pw eu-west-1 pool client");
        assert_eq!(creds.username, "user");
        assert_eq!(creds.password, "pw");
        assert_eq!(creds.region, "eu-west-1");
        assert_eq!(creds.user_pool_id, "pool");
        assert_eq!(creds.client_id, "client");
    }

    #[test]
    fn missing_fields_parse_empty_and_fail_validation() {
        let creds = CognitoCredentials::parse("Cognito user pw");
        assert_eq!(creds.region, "");
        assert!(creds.validate().is_err());
    }

    #[tokio::test]
    async fn incomplete_credentials_fail_before_any_network_call() {
        let cache = TokenCache::new();
        let creds = CognitoCredentials::parse("Cognito onlyuser");
        let err = obtain_access_token(&creds, &cache).await.unwrap_err();
        assert!(matches!(err, EngineError::AuthSetup(_)));
    }

    #[tokio::test]
    async fn cached_token_is_reused_without_sign_in() {
        let cache = TokenCache::new();
        let creds = CognitoCredentials::parse("Cognito user pw us-east-1 pool client");
        cache.set(creds.cache_key(), "cached-token");

        let token = obtain_access_token(&creds, &cache).await.unwrap();
        assert_eq!(token, "cached-token");
    }
}
