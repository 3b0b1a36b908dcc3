use base64::{URL_SAFE_NO_PAD, decode_config, encode_config};

/// Decodes base64url, with or without trailing `=` padding.
pub fn base64url_decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    decode_config(input.trim().trim_end_matches('='), URL_SAFE_NO_PAD)
}

pub fn base64url_encode(bytes: impl AsRef<[u8]>) -> String {
    encode_config(bytes, URL_SAFE_NO_PAD)
}

pub fn concat(parts: &[&[u8]]) -> Vec<u8> {
    let total = parts.iter().map(|part| part.len()).sum();
    let mut out = Vec::with_capacity(total);
    for part in parts {
        out.extend_from_slice(part);
    }
    out
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn base64url_decode__should_accept_unpadded_input() {
        // When
        let decoded = base64url_decode("BTBZMqHH6r4Tts7J_aSIgg").expect("decode");

        // Then
        assert_eq!(decoded.len(), 16);
        assert_eq!(decoded[0], 0x05);
    }

    #[test]
    fn base64url_decode__should_accept_padded_input() {
        // When
        let unpadded = base64url_decode("_-8").expect("decode unpadded");
        let padded = base64url_decode("_-8=").expect("decode padded");

        // Then
        assert_eq!(unpadded, vec![0xff, 0xef]);
        assert_eq!(padded, unpadded);
    }

    #[test]
    fn base64url_decode__should_reject_invalid_alphabet() {
        assert!(base64url_decode("ab+/").is_err());
        assert!(base64url_decode("a*cd").is_err());
    }

    #[test]
    fn base64url_decode__should_reject_invalid_length() {
        assert!(base64url_decode("abcde").is_err());
    }

    #[test]
    fn base64url_encode__should_use_url_alphabet_without_padding() {
        // When
        let encoded = base64url_encode([0xfb, 0xff, 0xbf, 0x01]);

        // Then
        assert_eq!(encoded, "-_-_AQ");
    }

    #[test]
    fn concat__should_join_in_order() {
        // When
        let joined = concat(&[b"ab", b"", b"c", &[0x00, 0x02]]);

        // Then
        assert_eq!(joined, vec![b'a', b'b', b'c', 0x00, 0x02]);
    }
}
