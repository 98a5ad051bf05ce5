use axum::http;
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use serde_json::Value;

use crate::auth::Identity;

// Get the auth token from a request
pub fn get_auth_token<B>(req: &http::Request<B>) -> Result<String, String> {
    // 1. Try to get token from Authorization header
    if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| "Invalid Authorization header".to_string())?;
        return Ok(auth_str.strip_prefix("Bearer ").unwrap_or(auth_str).to_string());
    }

    // 2. Try to get token from cookies
    let cookie_header = req
        .headers()
        .get(http::header::COOKIE)
        .ok_or_else(|| "Missing Authorization header or Cookie".to_string())?
        .to_str()
        .map_err(|_| "Invalid Cookie header".to_string())?;

    cookie::Cookie::split_parse(cookie_header)
        .flatten()
        .find(|c| c.name() == "auth_token")
        .map(|c| c.value().to_string())
        .ok_or_else(|| "auth_token cookie not found".to_string())
}

// Validate a JWT token and return the token data
pub fn validate_jwt(token: &str, secret: &str) -> Result<TokenData<Value>, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Value>(token, &decoding_key, &validation)
}

fn string_claim(claims: &Value, key: &str) -> Option<String> {
    claims
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

// Build the caller identity from the token claims
pub fn identity_from_claims(claims: &Value) -> Result<Identity, String> {
    let user_id = string_claim(claims, "sub").ok_or_else(|| "JWT token does not contain 'sub' claim".to_string())?;
    let roles = match claims.get("roles").and_then(|v| v.as_array()) {
        Some(roles_array) => roles_array
            .iter()
            .filter_map(|r| r.as_str().map(|s| s.to_string()))
            .collect(),
        None => Vec::new(),
    };
    Ok(Identity {
        user_id,
        group_id: string_claim(claims, "groupId"),
        name: string_claim(claims, "name"),
        roles,
    })
}
