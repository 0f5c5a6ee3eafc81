//! Service-account authentication.
//!
//! Reads the key file downloaded from the cloud console, signs an RS256 JWT
//! assertion with it and exchanges the assertion for a bearer token at the
//! key's `token_uri`.

use std::path::Path;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use ring::rand::SystemRandom;
use ring::signature::{self, RsaKeyPair};
use serde::Deserialize;

use crate::client::SheetsError;

/// Read/write access to spreadsheets.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Maximum lifetime the token endpoint accepts for an assertion.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Service-account key file. Unused fields of the download are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    pub client_email: String,
    /// PEM, PKCS#8 (`PRIVATE KEY`) or PKCS#1 (`RSA PRIVATE KEY`)
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Bearer token issued for a service account.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self, SheetsError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SheetsError::Credentials(format!(
                "cannot read credentials file {}: {}",
                path.display(),
                e,
            ))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(meta) = std::fs::metadata(path) {
                let mode = meta.permissions().mode();
                if mode & 0o077 != 0 {
                    tracing::warn!(
                        "credentials file {} is accessible by others (mode {:o}), consider chmod 600",
                        path.display(),
                        mode & 0o777,
                    );
                }
            }
        }

        Self::from_json(&content).map_err(|e| match e {
            SheetsError::Credentials(msg) => {
                SheetsError::Credentials(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, SheetsError> {
        let key: Self = serde_json::from_str(json).map_err(|e| {
            SheetsError::Credentials(format!("invalid service account JSON: {}", e))
        })?;

        if let Some(ref kind) = key.key_type {
            if kind != "service_account" {
                return Err(SheetsError::Credentials(format!(
                    "expected a service_account key, got {:?}",
                    kind,
                )));
            }
        }

        Ok(key)
    }

    /// Signed JWT assertion for `scope`, issued at `issued_at` (unix seconds).
    pub fn signed_assertion(&self, scope: &str, issued_at: i64) -> Result<String, SheetsError> {
        let mut header = serde_json::json!({ "alg": "RS256", "typ": "JWT" });
        if let Some(ref kid) = self.private_key_id {
            header["kid"] = serde_json::Value::String(kid.clone());
        }
        let claims = serde_json::json!({
            "iss": self.client_email,
            "scope": scope,
            "aud": self.token_uri,
            "iat": issued_at,
            "exp": issued_at + ASSERTION_LIFETIME_SECS,
        });

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string()),
        );

        let key_pair = self.key_pair()?;
        let mut sig = vec![0u8; key_pair.public().modulus_len()];
        key_pair
            .sign(
                &signature::RSA_PKCS1_SHA256,
                &SystemRandom::new(),
                signing_input.as_bytes(),
                &mut sig,
            )
            .map_err(|_| SheetsError::Credentials("failed to sign token assertion".into()))?;

        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(sig)))
    }

    fn key_pair(&self) -> Result<RsaKeyPair, SheetsError> {
        let (label, der) = decode_pem(&self.private_key)?;
        let parsed = match label.as_str() {
            "PRIVATE KEY" => RsaKeyPair::from_pkcs8(&der),
            "RSA PRIVATE KEY" => RsaKeyPair::from_der(&der),
            other => {
                return Err(SheetsError::Credentials(format!(
                    "unsupported private key type {:?}",
                    other,
                )))
            }
        };
        parsed.map_err(|e| SheetsError::Credentials(format!("private key rejected: {}", e)))
    }
}

/// Decode the first PEM block. Returns (label, DER bytes).
fn decode_pem(pem: &str) -> Result<(String, Vec<u8>), SheetsError> {
    let mut lines = pem.lines().map(str::trim).filter(|l| !l.is_empty());

    let label = lines
        .next()
        .and_then(|l| l.strip_prefix("-----BEGIN "))
        .and_then(|l| l.strip_suffix("-----"))
        .ok_or_else(|| SheetsError::Credentials("private_key is not PEM encoded".into()))?
        .to_string();

    let end_marker = format!("-----END {}-----", label);
    let mut body = String::new();
    let mut terminated = false;
    for line in lines {
        if line == end_marker {
            terminated = true;
            break;
        }
        body.push_str(line);
    }
    if !terminated {
        return Err(SheetsError::Credentials(format!("private_key missing {}", end_marker)));
    }

    let der = STANDARD
        .decode(body.as_bytes())
        .map_err(|e| SheetsError::Credentials(format!("private_key is not valid base64: {}", e)))?;

    Ok((label, der))
}

/// Exchange a signed assertion for a bearer token.
pub fn fetch_access_token(
    http: &reqwest::blocking::Client,
    key: &ServiceAccountKey,
    scope: &str,
) -> Result<AccessToken, SheetsError> {
    let assertion = key.signed_assertion(scope, chrono::Utc::now().timestamp())?;

    let resp = http
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .map_err(|e| SheetsError::Network(e.to_string()))?;

    let status = resp.status().as_u16();
    let body: serde_json::Value = resp.json().unwrap_or(serde_json::Value::Null);

    if status != 200 {
        let msg = body["error_description"]
            .as_str()
            .or_else(|| body["error"].as_str())
            .unwrap_or("unknown error");
        return Err(SheetsError::Auth(format!(
            "token exchange for {} failed ({}): {}",
            key.client_email, status, msg,
        )));
    }

    let token = body["access_token"]
        .as_str()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| SheetsError::Parse("token response missing access_token".into()))?;

    tracing::debug!("service account {} authorized", key.client_email);

    Ok(AccessToken {
        token: token.to_string(),
    })
}
