// File: ./src/token.rs
// Edit tokens: handed out once, only their hash is stored.
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub fn generate() -> String {
    Uuid::new_v4().to_string()
}

pub fn hash(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex(&digest)
}

pub fn verify(token: &str, stored_hash: &str) -> bool {
    let provided = hash(token);
    if provided.len() != stored_hash.len() {
        return false;
    }
    provided
        .bytes()
        .zip(stored_hash.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_hex_sha256() {
        assert_eq!(
            hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn verify_accepts_only_the_original_token() {
        let token = generate();
        let stored = hash(&token);
        assert!(verify(&token, &stored));
        assert!(!verify("not-the-token", &stored));
        assert!(!verify(&token, ""));
    }
}
