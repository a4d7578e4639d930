//! Pair key codec: `{prefix}:{subject}:{object}`

use uuid::Uuid;

/// Build the key holding the predicates that link `subject` to `object`
pub fn encode(prefix: &str, subject: &Uuid, object: &Uuid) -> String {
    format!("{}:{}:{}", prefix, subject, object)
}

/// SCAN pattern matching every pair key under `prefix`
pub fn pattern(prefix: &str) -> String {
    format!("{}:*", prefix)
}

/// Split a pair key back into `(subject, object)`.
///
/// Returns `None` for anything under the prefix that is not exactly two
/// UUIDs, so foreign keys sharing the namespace are ignored instead of
/// failing the whole call.
pub fn decode(prefix: &str, key: &str) -> Option<(Uuid, Uuid)> {
    let rest = key.strip_prefix(prefix)?.strip_prefix(':')?;
    let (subject, object) = rest.split_once(':')?;
    Some((Uuid::parse_str(subject).ok()?, Uuid::parse_str(object).ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_key_layout() {
        let subject = Uuid::parse_str("6f1c3a4e-8a0f-4c55-9d1e-2b7e6c1a9f00").unwrap();
        let object = Uuid::parse_str("0b9d2e77-1f3c-4a8b-b5a1-7c2d4e6f8a11").unwrap();

        assert_eq!(
            encode("perms", &subject, &object),
            "perms:6f1c3a4e-8a0f-4c55-9d1e-2b7e6c1a9f00:0b9d2e77-1f3c-4a8b-b5a1-7c2d4e6f8a11"
        );
    }

    #[test]
    fn test_decode_inverts_encode() {
        let subject = Uuid::new_v4();
        let object = Uuid::new_v4();
        let key = encode("tenant:perms", &subject, &object);

        assert_eq!(decode("tenant:perms", &key), Some((subject, object)));
    }

    #[test]
    fn test_decode_rejects_foreign_keys() {
        let subject = Uuid::new_v4();

        assert_eq!(decode("perms", "perms:not-a-uuid:also-not"), None);
        assert_eq!(decode("perms", &format!("perms:{}", subject)), None);
        assert_eq!(decode("perms", &format!("perms:{}:{}:extra", subject, subject)), None);
        assert_eq!(decode("perms", &format!("other:{}:{}", subject, subject)), None);
        assert_eq!(decode("perms", &format!("permsx:{}:{}", subject, subject)), None);
    }

    #[test]
    fn test_pattern() {
        assert_eq!(pattern("perms"), "perms:*");
    }
}
