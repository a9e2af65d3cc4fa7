//! The signed-in user and the login/registration exchange.

use serde::{Deserialize, Serialize};

use super::lenient_text;

/// Name shown when the profile has none.
const DEFAULT_DISPLAY_NAME: &str = "User";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Profile {
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_DISPLAY_NAME)
    }
}

/// Partial profile update; unset fields are left out of the request body.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Data URL or remote URL of the avatar image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.email.is_none() && self.avatar_url.is_none()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub phone: String,
    pub password: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Response to an MFA code request. Demo deployments echo the code back.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MfaChallenge {
    #[serde(default, deserialize_with = "lenient_text")]
    pub demo_code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_fallback() {
        let named: Profile = serde_json::from_str(r#"{"full_name": "Aruzhan S."}"#).expect("json");
        assert_eq!(named.display_name(), "Aruzhan S.");

        let blank: Profile = serde_json::from_str(r#"{"full_name": "  "}"#).expect("json");
        assert_eq!(blank.display_name(), "User");
        assert_eq!(Profile::default().display_name(), "User");
    }

    #[test]
    fn test_profile_update_skips_unset_fields() {
        let update = ProfileUpdate {
            avatar_url: Some("data:image/png;base64,AAA".into()),
            ..Default::default()
        };
        let body = serde_json::to_value(&update).expect("serialize");
        assert_eq!(body, serde_json::json!({"avatar_url": "data:image/png;base64,AAA"}));
        assert!(ProfileUpdate::default().is_empty());
    }

    #[test]
    fn test_login_response_debug_hides_token() {
        let resp: LoginResponse =
            serde_json::from_str(r#"{"access_token": "jwt-value", "token_type": "bearer"}"#).expect("json");
        assert_eq!(resp.access_token, "jwt-value");
        assert!(!format!("{:?}", resp).contains("jwt-value"));
    }

    #[test]
    fn test_demo_code_accepts_number_or_string() {
        let numeric: MfaChallenge = serde_json::from_str(r#"{"demo_code": 4821}"#).expect("json");
        assert_eq!(numeric.demo_code.as_deref(), Some("4821"));

        let text: MfaChallenge = serde_json::from_str(r#"{"demo_code": "0042"}"#).expect("json");
        assert_eq!(text.demo_code.as_deref(), Some("0042"));

        let absent: MfaChallenge = serde_json::from_str(r#"{"demo_code": null}"#).expect("json");
        assert_eq!(absent.demo_code, None);
    }
}
