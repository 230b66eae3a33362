use rand::Rng;

/// Characters a poll token may contain. Digits 0/1 and the letters O, I and l
/// are left out so tokens survive being read aloud or copied by hand.
pub const ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

pub const DEFAULT_TOKEN_LENGTH: usize = 12;

/// Returns a random token of `length` characters drawn uniformly from [`ALPHABET`].
pub fn generate_token(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

pub fn generate_edit_token() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphabet_has_no_ambiguous_characters() {
        for c in [b'0', b'O', b'1', b'l', b'I'] {
            assert!(!ALPHABET.contains(&c), "{} should not be in the alphabet", c as char);
        }
        assert_eq!(ALPHABET.len(), 57);
    }

    #[test]
    fn test_generate_token() {
        let token = generate_token(DEFAULT_TOKEN_LENGTH);
        assert_eq!(token.len(), 12);
        assert!(token.bytes().all(|b| ALPHABET.contains(&b)));

        assert_eq!(generate_token(32).len(), 32);
        assert_eq!(generate_token(0), "");
    }

    #[test]
    fn test_generate_token_varies() {
        let tokens: std::collections::HashSet<String> =
            (0..100).map(|_| generate_token(DEFAULT_TOKEN_LENGTH)).collect();
        assert_eq!(tokens.len(), 100);
    }

    #[test]
    fn test_generate_edit_token() {
        let token = generate_edit_token();
        assert!(uuid::Uuid::parse_str(&token).is_ok());
        assert_ne!(token, generate_edit_token());
    }
}
