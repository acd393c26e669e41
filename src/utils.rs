use crate::WebhookConfig;
use crate::error::WebhookError;

// For signature verification
use hmac::{Hmac, Mac};
use sha2::Sha256;
type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_PREFIX: &str = "sha256=";
/// Hex length of a SHA-256 digest
const SIGNATURE_HEX_LEN: usize = 64;

fn new_mac(secret: &str, payload: &[u8]) -> Result<HmacSha256, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| WebhookError::HmacFailed(e.to_string()))?;
    mac.update(payload);
    Ok(mac)
}

/// Computes the `x-hub-signature-256` value GitHub sends for `payload`.
pub fn sign_payload(secret: &str, payload: &[u8]) -> Result<String, WebhookError> {
    let digest = new_mac(secret, payload)?.finalize().into_bytes();
    Ok(format!("{}{}", SIGNATURE_PREFIX, hex::encode(digest)))
}

/// Verifies a GitHub webhook signature header against the raw payload.
///
/// Returns `Ok(false)` on any mismatch and `Err` only when the HMAC itself
/// cannot be computed. The digest must be lowercase hex, exactly as GitHub
/// sends it; the byte comparison is constant-time.
pub fn verify_github_signature(
    secret: &str,
    payload: &[u8],
    signature_header: &str,
) -> Result<bool, WebhookError> {
    let mac = new_mac(secret, payload)?;

    let Some(digest_hex) = signature_header.strip_prefix(SIGNATURE_PREFIX) else {
        return Ok(false);
    };
    if digest_hex.len() != SIGNATURE_HEX_LEN
        || !digest_hex
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    {
        return Ok(false);
    }

    match hex::decode(digest_hex) {
        Ok(provided) => Ok(mac.verify_slice(&provided).is_ok()),
        Err(_) => Ok(false),
    }
}

/// Quotes a value for interpolation into a `sh -c` command line.
pub fn shell_quote(value: &str) -> String {
    let is_plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:@+=".contains(c));
    if is_plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// Builds the redeploy command chain run after a qualifying webhook.
pub fn build_deploy_command(config: &WebhookConfig) -> String {
    format!(
        "cd {} && rm -rf package-lock.json && git pull origin {} && npm install && pm2 restart {}",
        shell_quote(&config.repo_dir),
        shell_quote(&config.deploy_branch),
        shell_quote(&config.pm2_name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "s3cr3t";

    #[test]
    fn test_valid_signature_verifies() {
        let body = br#"{"ref":"refs/tags/v9.9.9"}"#;
        let signature = sign_payload(SECRET, body).unwrap();
        assert!(signature.starts_with("sha256="));
        assert_eq!(signature.len(), SIGNATURE_PREFIX.len() + SIGNATURE_HEX_LEN);
        assert!(verify_github_signature(SECRET, body, &signature).unwrap());
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            sign_payload("key", b"The quick brown fox jumps over the lazy dog").unwrap(),
            "sha256=f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_single_bit_flip_in_body_is_rejected() {
        let body = b"{\"action\":\"published\"}".to_vec();
        let signature = sign_payload(SECRET, &body).unwrap();
        for byte in 0..body.len() {
            for bit in 0..8 {
                let mut mutated = body.clone();
                mutated[byte] ^= 1 << bit;
                assert!(
                    !verify_github_signature(SECRET, &mutated, &signature).unwrap(),
                    "flip at byte {byte} bit {bit} was accepted"
                );
            }
        }
    }

    #[test]
    fn test_single_bit_flip_in_signature_is_rejected() {
        let body = b"payload";
        let signature = sign_payload(SECRET, body).unwrap().into_bytes();
        for byte in 0..signature.len() {
            for bit in 0..8 {
                let mut mutated = signature.clone();
                mutated[byte] ^= 1 << bit;
                let Ok(mutated) = String::from_utf8(mutated) else {
                    continue;
                };
                assert!(
                    !verify_github_signature(SECRET, body, &mutated).unwrap(),
                    "flip at byte {byte} bit {bit} was accepted"
                );
            }
        }
    }

    #[test]
    fn test_rejects_malformed_headers() {
        let body = b"payload";
        let signature = sign_payload(SECRET, body).unwrap();
        let digest = signature.trim_start_matches(SIGNATURE_PREFIX);

        assert!(!verify_github_signature(SECRET, body, digest).unwrap());
        assert!(!verify_github_signature(SECRET, body, &format!("sha1={digest}")).unwrap());
        assert!(!verify_github_signature(SECRET, body, &signature.to_uppercase()).unwrap());
        assert!(!verify_github_signature(SECRET, body, &signature[..signature.len() - 2]).unwrap());
        assert!(!verify_github_signature(SECRET, body, "sha256=").unwrap());
        assert!(!verify_github_signature("other", body, &signature).unwrap());
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("community-server"), "community-server");
        assert_eq!(shell_quote("/srv/app"), "/srv/app");
        assert_eq!(shell_quote("my app"), "'my app'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("a;rm -rf /"), "'a;rm -rf /'");
        assert_eq!(shell_quote(""), "''");
    }
}
