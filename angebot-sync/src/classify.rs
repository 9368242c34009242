use angebot_core::SyncError;
use reqwest::StatusCode;

/// Normalize an HTTP status into the sync-layer failure taxonomy.
///
/// 200, 201 and 204 are success; a no-content 204 on update/delete is a
/// normal answer, not an error. 401 maps to `Auth` so the caller can tell
/// the user to renew the credential instead of retrying. 5xx is transient
/// and retryable; every other 4xx is a hard rejection.
pub fn classify_status(system: &str, status: StatusCode, body: &str) -> Result<(), SyncError> {
    if matches!(status.as_u16(), 200 | 201 | 204) {
        return Ok(());
    }

    let message = snippet(body);
    if status == StatusCode::UNAUTHORIZED {
        return Err(SyncError::Auth {
            system: system.to_string(),
            message,
        });
    }
    if status.is_server_error() {
        return Err(SyncError::Transient {
            system: system.to_string(),
            message: format!("HTTP {}: {message}", status.as_u16()),
        });
    }
    Err(SyncError::Rejected {
        system: system.to_string(),
        code: status.as_u16(),
        message,
    })
}

/// Map a transport-level reqwest failure. Timeouts and connect errors are
/// retryable; anything else (e.g. a body that stopped mid-stream) is not.
pub fn classify_transport(system: &str, err: &reqwest::Error) -> SyncError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        SyncError::Transient {
            system: system.to_string(),
            message: err.to_string(),
        }
    } else {
        SyncError::Malformed {
            system: system.to_string(),
            message: err.to_string(),
        }
    }
}

fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "(empty body)".to_string();
    }
    trimmed.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_codes() {
        for code in [200u16, 201, 204] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(classify_status("supabase", status, "").is_ok(), "HTTP {code}");
        }
    }

    #[test]
    fn test_204_is_not_an_error() {
        // No-content success on delete/update must never be classified
        // as transient or auth failure
        let result = classify_status("notion", StatusCode::NO_CONTENT, "");
        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_401_is_auth() {
        let err = classify_status("notion", StatusCode::UNAUTHORIZED, "token expired").unwrap_err();
        assert!(matches!(err, SyncError::Auth { .. }));
        assert_eq!(err.system(), "notion");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_5xx_is_transient() {
        let err = classify_status("supabase", StatusCode::SERVICE_UNAVAILABLE, "").unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_other_4xx_is_rejected() {
        let err = classify_status("supabase", StatusCode::UNPROCESSABLE_ENTITY, "bad row")
            .unwrap_err();
        assert!(matches!(err, SyncError::Rejected { code: 422, .. }));
        assert!(!err.is_transient());
    }
}
