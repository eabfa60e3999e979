use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::warn;

pub trait TokenProvider: Send + Sync {
    fn id_token(&self) -> BoxFuture<'static, Option<String>>;
}

#[derive(Clone, Debug, Default)]
pub struct Anonymous;

impl TokenProvider for Anonymous {
    fn id_token(&self) -> BoxFuture<'static, Option<String>> {
        Box::pin(async { None })
    }
}

#[derive(Clone, Debug)]
pub struct StaticToken(pub String);

impl StaticToken {
    pub fn from_env() -> Option<Self> {
        std::env::var("SHARP_ID_TOKEN")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(StaticToken)
    }
}

impl TokenProvider for StaticToken {
    fn id_token(&self) -> BoxFuture<'static, Option<String>> {
        let token = self.0.clone();
        Box::pin(async move { Some(token) })
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
}

/// Reads the `sub` claim without verifying the signature; the identity
/// service has already done that. Undecodable tokens yield `None`.
pub fn user_id_from_token(token: &str) -> Option<String> {
    let payload = match token.split('.').nth(1) {
        Some(p) if !p.is_empty() => p,
        _ => {
            warn!("token is not a JWT, treating user as anonymous");
            return None;
        }
    };
    let bytes = match URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')) {
        Ok(b) => b,
        Err(err) => {
            warn!("error decoding token payload: {}", err);
            return None;
        }
    };
    match serde_json::from_slice::<Claims>(&bytes) {
        Ok(claims) if !claims.sub.is_empty() => Some(claims.sub),
        Ok(_) => None,
        Err(err) => {
            warn!("error parsing token claims: {}", err);
            None
        }
    }
}

pub fn unsigned_token(user_id: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::json!({ "sub": user_id }).to_string());
    format!("{header}.{payload}.")
}
