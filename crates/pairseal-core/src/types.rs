use std::fmt;

/// The kinds of key material persisted per communication identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// HKDF salt for nonce derivation
    Salt,
    /// Symmetric encryption key
    Secret,
    /// HKDF keying secret for nonce derivation
    Nonce,
    /// Asymmetric public key
    Public,
    /// Asymmetric private key
    Private,
}

impl KeyKind {
    pub const ALL: [KeyKind; 5] = [
        KeyKind::Salt,
        KeyKind::Secret,
        KeyKind::Nonce,
        KeyKind::Public,
        KeyKind::Private,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyKind::Salt => "salt",
            KeyKind::Secret => "secret",
            KeyKind::Nonce => "nonce",
            KeyKind::Public => "public",
            KeyKind::Private => "private",
        }
    }

    /// Blob name for this kind under `identifier`, e.g. `sec51_salt.key`.
    pub fn blob_name(&self, identifier: &str) -> String {
        format!("{identifier}_{}.key", self.as_str())
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a communication identifier.
///
/// The input is URL unescaped (`+` counts as a space), trimmed, lowercased,
/// and every whitespace character is replaced with `_`. Input with invalid
/// escapes is normalized as-is.
pub fn sanitize_identifier(id: &str) -> String {
    let plus_decoded = id.replace('+', " ");
    let unescaped = match urlencoding::decode(&plus_decoded) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => {
            tracing::debug!("identifier is not valid percent-encoded UTF-8, using it verbatim");
            plus_decoded
        }
    };

    unescaped
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_names() {
        assert_eq!(KeyKind::Salt.blob_name("sec51"), "sec51_salt.key");
        assert_eq!(KeyKind::Secret.blob_name("sec51"), "sec51_secret.key");
        assert_eq!(KeyKind::Nonce.blob_name("sec51"), "sec51_nonce.key");
        assert_eq!(KeyKind::Public.blob_name("sec51"), "sec51_public.key");
        assert_eq!(KeyKind::Private.blob_name("sec51"), "sec51_private.key");
    }

    #[test]
    fn test_sanitize_trims_and_lowercases() {
        assert_eq!(sanitize_identifier("  Sec51 "), "sec51");
    }

    #[test]
    fn test_sanitize_replaces_inner_whitespace() {
        assert_eq!(sanitize_identifier("Alice and\tBob"), "alice_and_bob");
    }

    #[test]
    fn test_sanitize_url_unescapes() {
        assert_eq!(sanitize_identifier("alice%40example.com"), "alice@example.com");
        assert_eq!(sanitize_identifier("Alice+Bob"), "alice_bob");
        assert_eq!(sanitize_identifier("Alice%20Bob"), "alice_bob");
    }

    #[test]
    fn test_sanitize_invalid_escape_kept() {
        // %FF alone is not valid UTF-8 once decoded
        assert_eq!(sanitize_identifier("Peer%FF"), "peer%ff");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let once = sanitize_identifier(" My Peer%21 ");
        assert_eq!(sanitize_identifier(&once), once);
    }
}
