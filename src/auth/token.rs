use rand::Rng;

pub const TOKEN_LEN: usize = 40;

/// Generates a random 40-character lowercase hex token
pub fn generate_token() -> String {
    let bytes: [u8; 20] = rand::rng().random();
    hex::encode(bytes)
}

pub fn is_valid_token_format(token: &str) -> bool {
    token.len() == TOKEN_LEN && token.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Pulls the token out of an `Authorization: Bearer <token>` value
pub fn parse_bearer(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    is_valid_token_format(token).then_some(token)
}
