//! Challenge/salt authentication for the obs-websocket v5 handshake.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Build the `authentication` string for an `Identify` message.
///
/// The scheme is two rounds of base64-encoded SHA-256:
/// `secret = b64(sha256(password + salt))`, then
/// `b64(sha256(secret + challenge))`.
pub fn authentication_string(password: &str, salt: &str, challenge: &str) -> String {
    let secret = STANDARD.encode(Sha256::digest(format!("{password}{salt}")));
    STANDARD.encode(Sha256::digest(format!("{secret}{challenge}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        assert_eq!(
            authentication_string(
                "supersecretpassword",
                "PZVbYpvAnZut2SS6JNJytDm9",
                "ztTBnnuqrqaKDzRM3xcVdbYm"
            ),
            "zZgWipvwSGrw748kHN4gNpBC1IaeiiWX3Hjkrm849Sc="
        );
    }

    #[test]
    fn empty_password_still_hashes() {
        assert_eq!(
            authentication_string("", "salt", "challenge"),
            "5fmcrqR0I7snYOpUX/Ac22UdSA81TwCyHqCr6eFQyyI="
        );
    }
}
