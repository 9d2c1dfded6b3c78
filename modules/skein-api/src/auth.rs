use axum::http::{header, HeaderMap};

/// Check the shared-secret bearer token on a trigger request.
pub fn bearer_authorized(headers: &HeaderMap, secret: &str) -> bool {
    let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let Some(token) = value.strip_prefix("Bearer ") else {
        return false;
    };
    constant_time_eq(token.as_bytes(), secret.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(v) = value {
            headers.insert(header::AUTHORIZATION, HeaderValue::from_str(v).unwrap());
        }
        headers
    }

    #[test]
    fn correct_secret_is_authorized() {
        assert!(bearer_authorized(&headers(Some("Bearer s3cret")), "s3cret"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        assert!(!bearer_authorized(&headers(Some("Bearer nope")), "s3cret"));
        assert!(!bearer_authorized(&headers(Some("Bearer s3cret2")), "s3cret"));
    }

    #[test]
    fn missing_or_malformed_header_is_rejected() {
        assert!(!bearer_authorized(&headers(None), "s3cret"));
        assert!(!bearer_authorized(&headers(Some("s3cret")), "s3cret"));
        assert!(!bearer_authorized(&headers(Some("Basic s3cret")), "s3cret"));
    }
}
