//! Claim normalization.
//!
//! Token issuers disagree on claim names: .NET Identity writes long URI keys,
//! most JWT libraries write short ones, and some write both. Each identity
//! field is resolved from an ordered list of `(claim key, normalizer)` rules
//! and the first rule that yields a non-empty value wins. The tables below
//! are the whole normalization policy; keep their order.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::AuthError;

/// Decoded token payload.
pub type Claims = Map<String, Value>;

/// Role that passes every role and permission check.
pub const SUPER_ROLE: &str = "SuperAdmin";

const NAME_IDENTIFIER_URI: &str =
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier";
const EMAIL_URI: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress";
const ROLE_URI: &str = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role";
const NAME_URI: &str = "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/name";

/// Expiry claim, seconds since the Unix epoch.
const EXPIRY_CLAIM: &str = "exp";

/// One step of an alias chain.
#[derive(Clone, Copy)]
pub struct ClaimRule<T> {
    pub key: &'static str,
    pub normalize: fn(&Value) -> Option<T>,
}

impl<T> ClaimRule<T> {
    const fn new(key: &'static str, normalize: fn(&Value) -> Option<T>) -> Self {
        Self { key, normalize }
    }
}

pub const SUBJECT_ID_RULES: &[ClaimRule<String>] = &[
    ClaimRule::new(NAME_IDENTIFIER_URI, text),
    ClaimRule::new("nameid", text),
    ClaimRule::new("sub", text),
    ClaimRule::new("id", text),
    ClaimRule::new("userId", text),
];

pub const EMAIL_RULES: &[ClaimRule<String>] = &[
    ClaimRule::new(EMAIL_URI, text),
    ClaimRule::new("email", text),
];

pub const ROLE_RULES: &[ClaimRule<BTreeSet<String>>] = &[
    ClaimRule::new(ROLE_URI, string_set),
    ClaimRule::new("role", string_set),
];

/// Username aliases. When none match, the resolved email is used, then "".
pub const USERNAME_RULES: &[ClaimRule<String>] = &[
    ClaimRule::new(NAME_URI, text),
    ClaimRule::new("unique_name", text),
    ClaimRule::new("sub", text),
];

pub const PERMISSION_RULES: &[ClaimRule<BTreeSet<String>>] = &[
    ClaimRule::new("permissions", string_set),
    ClaimRule::new("Permissions", string_set),
];

pub const AVATAR_RULES: &[ClaimRule<String>] = &[
    ClaimRule::new("ImageUrl", text),
    ClaimRule::new("image", text),
];

/// First non-empty match of `rules` in `claims`.
pub fn resolve<T>(claims: &Claims, rules: &[ClaimRule<T>]) -> Option<T> {
    rules
        .iter()
        .find_map(|rule| claims.get(rule.key).and_then(rule.normalize))
}

/// Non-empty string, or a number rendered in decimal.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A single string or an array of strings. Empty results count as no match.
fn string_set(value: &Value) -> Option<BTreeSet<String>> {
    let set: BTreeSet<String> = match value {
        Value::String(s) => std::iter::once(s.clone()).filter(|s| !s.is_empty()).collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => return None,
    };
    (!set.is_empty()).then_some(set)
}

fn expiry_seconds(claims: &Claims) -> Option<i64> {
    let exp = claims.get(EXPIRY_CLAIM)?;
    exp.as_i64().or_else(|| exp.as_f64().map(|secs| secs as i64))
}

/// The signed-in user, normalized from token claims.
///
/// Either fully built or not built at all: `from_claims` fails instead of
/// returning an identity with missing required fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub subject_id: String,
    pub email: Option<String>,
    pub username: String,
    pub roles: BTreeSet<String>,
    pub permissions: BTreeSet<String>,
    pub expires_at_epoch_millis: i64,
    pub avatar_url: Option<String>,
}

impl Identity {
    pub fn from_claims(claims: &Claims) -> Result<Self, AuthError> {
        let subject_id = resolve(claims, SUBJECT_ID_RULES)
            .ok_or_else(|| AuthError::decode("no subject identifier claim"))?;
        let expires_at_epoch_millis = expiry_seconds(claims)
            .ok_or_else(|| AuthError::decode("missing or non-numeric exp claim"))?
            .saturating_mul(1000);

        let email = resolve(claims, EMAIL_RULES);
        let username = resolve(claims, USERNAME_RULES)
            .or_else(|| email.clone())
            .unwrap_or_default();

        Ok(Self {
            subject_id,
            email,
            username,
            roles: resolve(claims, ROLE_RULES).unwrap_or_default(),
            permissions: resolve(claims, PERMISSION_RULES).unwrap_or_default(),
            expires_at_epoch_millis,
            avatar_url: resolve(claims, AVATAR_RULES),
        })
    }

    pub fn is_super_admin(&self) -> bool {
        self.roles.contains(SUPER_ROLE)
    }

    /// Role check; the super-role satisfies every role.
    pub fn has_role(&self, role: &str) -> bool {
        self.is_super_admin() || self.roles.contains(role)
    }

    /// Permission check; the super-role satisfies every permission.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_super_admin() || self.permissions.contains(permission)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.expires_at_epoch_millis)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at_epoch_millis < now.timestamp_millis()
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Minutes left before expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        let remaining_ms = self.expires_at_epoch_millis - Utc::now().timestamp_millis();
        (remaining_ms / 60_000).max(0)
    }
}

// ============================================================================
// Tests
// ============================================================================
