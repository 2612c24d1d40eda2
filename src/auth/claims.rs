use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::AuthError;

/// Value of the `token_use` claim carried by Cognito tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenUse {
    Id,
    Access,
    Other(String),
}

impl TokenUse {
    pub fn parse(value: &str) -> Self {
        match value {
            "id" => TokenUse::Id,
            "access" => TokenUse::Access,
            other => TokenUse::Other(other.to_string()),
        }
    }

    pub fn from_claims(claims: &Map<String, Value>) -> Option<Self> {
        claims
            .get("token_use")
            .and_then(Value::as_str)
            .map(TokenUse::parse)
    }
}

/// Claims we read from ID and access tokens. Everything is optional because
/// access tokens carry far less profile data than ID tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CognitoClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birthdate: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default, rename = "cognito:username")]
    pub cognito_username: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, rename = "cognito:groups")]
    pub groups: Vec<String>,
    #[serde(default)]
    pub token_use: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub auth_time: Option<i64>,
}

/// Authenticated caller, injected into request extensions by the auth middleware.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id_token: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub username: Option<String>,
    pub name: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub gender: Option<String>,
    pub birthdate: Option<String>,
    pub phone_number: Option<String>,
    pub groups: Vec<String>,
    pub token_use: Option<String>,
    pub client_id: Option<String>,
    pub auth_time: Option<i64>,
    pub exp: Option<i64>,
    pub iat: Option<i64>,
    pub cognito: Value,
}

impl AuthUser {
    /// Builds the caller from verified claims. A token without `sub` cannot be
    /// tied to a profile and is refused.
    pub fn from_claims(token: &str, raw: Map<String, Value>) -> Result<Self, AuthError> {
        let claims: CognitoClaims = serde_json::from_value(Value::Object(raw.clone()))
            .map_err(|e| AuthError::invalid(format!("Invalid token claims: {}", e)))?;

        let user_id = claims
            .sub
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AuthError::invalid("Token missing sub claim"))?;

        let email_verified = match &claims.email_verified {
            Some(Value::Bool(b)) => Some(*b),
            Some(Value::String(s)) => Some(s.eq_ignore_ascii_case("true")),
            _ => None,
        };

        let username = claims
            .preferred_username
            .clone()
            .or_else(|| claims.cognito_username.clone())
            .or_else(|| claims.username.clone());

        Ok(Self {
            id_token: token.to_string(),
            user_id,
            email: claims.email,
            email_verified,
            username,
            name: claims.name,
            given_name: claims.given_name,
            family_name: claims.family_name,
            gender: claims.gender,
            birthdate: claims.birthdate,
            phone_number: claims.phone_number,
            groups: claims.groups,
            token_use: claims.token_use,
            client_id: claims.client_id,
            auth_time: claims.auth_time,
            exp: claims.exp,
            iat: claims.iat,
            cognito: Value::Object(raw),
        })
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}
