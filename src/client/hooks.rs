//! Per-API customization of the client: how credentials are attached and how
//! failed responses become errors.

use crate::session::Token;
use crate::transport::{HttpRequest, HttpResponse};
use crate::Error;
use serde::Deserialize;

pub trait ClientHooks: Send + Sync {
    /// Attach the current credential. `token` is `None` while a lazily-started
    /// client has not logged in yet.
    fn attach_credential(&self, request: &mut HttpRequest, token: Option<&Token>);

    /// Turn a non-success response into the error handed to the completion handler.
    fn translate_error(&self, response: &HttpResponse) -> Error;
}

/// `Authorization: Bearer <token>` plus decoding of JSON error bodies.
///
/// Understands both the list form `[{"errorCode": "...", "message": "..."}]`
/// and the OAuth form `{"error": "...", "error_description": "..."}`; anything
/// else is reported verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct BearerHooks;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestErrorEntry {
    error_code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    error_description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    List(Vec<RestErrorEntry>),
    OAuth(OAuthErrorBody),
}

fn decode_error_body(body: &[u8]) -> Option<(Option<String>, String)> {
    match serde_json::from_slice::<ErrorBody>(body).ok()? {
        ErrorBody::List(entries) => {
            let first = entries.into_iter().next()?;
            Some((first.error_code, first.message.unwrap_or_default()))
        }
        ErrorBody::OAuth(e) => Some((
            Some(e.error.clone()),
            e.error_description.unwrap_or(e.error),
        )),
    }
}

impl ClientHooks for BearerHooks {
    fn attach_credential(&self, request: &mut HttpRequest, token: Option<&Token>) {
        if let Some(token) = token {
            request
                .headers
                .add("Authorization", format!("Bearer {}", token.as_str()));
        }
    }

    fn translate_error(&self, response: &HttpResponse) -> Error {
        let (error_code, message) = decode_error_body(&response.body).unwrap_or_else(|| {
            (None, String::from_utf8_lossy(&response.body).into_owned())
        });
        Error::Remote {
            status: response.status,
            message,
            error_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_bearer_token() {
        let mut req = HttpRequest::get("https://example.com/").unwrap();
        BearerHooks.attach_credential(&mut req, Some(&Token::new("t0k3n")));
        assert_eq!(req.headers.get("authorization"), Some("Bearer t0k3n"));
    }

    #[test]
    fn test_no_token_no_header() {
        let mut req = HttpRequest::get("https://example.com/").unwrap();
        BearerHooks.attach_credential(&mut req, None);
        assert!(req.headers.is_empty());
    }

    #[test]
    fn test_translate_error_list_body() {
        let resp = HttpResponse::new(400).body(
            r#"[{"message":"unexpected token: FORM","errorCode":"MALFORMED_QUERY"}]"#,
        );
        match BearerHooks.translate_error(&resp) {
            Error::Remote {
                status,
                message,
                error_code,
            } => {
                assert_eq!(status, 400);
                assert_eq!(message, "unexpected token: FORM");
                assert_eq!(error_code.as_deref(), Some("MALFORMED_QUERY"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_translate_error_oauth_body() {
        let resp = HttpResponse::new(401)
            .body(r#"{"error":"invalid_grant","error_description":"authentication failure"}"#);
        let err = BearerHooks.translate_error(&resp);
        assert_eq!(
            err.to_string(),
            "Remote error: HTTP 401 (invalid_grant): authentication failure"
        );
    }

    #[test]
    fn test_translate_error_plain_body() {
        let resp = HttpResponse::new(502).body("Bad Gateway");
        let err = BearerHooks.translate_error(&resp);
        assert_eq!(err.to_string(), "Remote error: HTTP 502: Bad Gateway");
    }
}
