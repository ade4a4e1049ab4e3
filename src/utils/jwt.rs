use base64::Engine as _;
use serde::Serialize;
use serde_json::Value;

/// Base64url (unpadded) JSON segment of a compact JWT.
pub(crate) fn encode_segment<T: Serialize>(value: &T) -> String {
    let json = serde_json::to_vec(value).unwrap_or_default();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json)
}

/// Decode the payload JSON ("claims") from a JWT without checking its signature.
pub(crate) fn decode_jwt_claims(jwt: &str) -> Option<Value> {
    let payload_b64 = jwt.split('.').nth(1)?;

    // Most JWTs are base64url without padding, but some toolchains may include padding.
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(payload_b64))
        .ok()?;

    serde_json::from_slice(&bytes).ok()
}

/// `email` claim of an OpenID `id_token`, if present.
pub(crate) fn email_from_id_token(id_token: &str) -> Option<String> {
    decode_jwt_claims(id_token)?
        .get("email")
        .and_then(Value::as_str)
        .map(str::to_owned)
}
