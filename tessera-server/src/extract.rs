use axum::body::Body;
use axum::extract::{FromRequest, Multipart, Request};
use axum::response::Response;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::StatusCode;
use tessera_gateway::{FilePart, RequestContext};
use tracing::warn;

/// Build the engine's request context from an inbound axum request.
///
/// Body handling follows the inbound content type: JSON bodies stay raw,
/// urlencoded bodies are decoded into form fields, multipart bodies are split
/// into text fields and file parts. Anything the gateway cannot decode is a
/// 400 back to the caller, never a forwarded garbage request.
pub async fn request_context(
    service: String,
    model: String,
    pk: Option<String>,
    request: Request,
    max_body_bytes: usize,
) -> Result<RequestContext, Response> {
    let method = request.method().clone();
    let query = request
        .uri()
        .query()
        .map(parse_query)
        .unwrap_or_default();
    let authorization = header_string(&request, AUTHORIZATION.as_str());
    let content_type = header_string(&request, CONTENT_TYPE.as_str());

    let mut ctx = RequestContext::new(method, service, model, pk);
    ctx.query = query;
    ctx.authorization = authorization;
    ctx.content_type = content_type.clone();

    let is_multipart = content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));
    let is_form = content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

    if is_multipart {
        read_multipart(request, &mut ctx).await?;
    } else {
        let bytes = axum::body::to_bytes(request.into_body(), max_body_bytes)
            .await
            .map_err(|e| bad_request(format!("failed to read request body: {e}")))?;
        if is_form && !bytes.is_empty() {
            ctx.form = serde_urlencoded::from_bytes(&bytes)
                .map_err(|e| bad_request(format!("invalid form body: {e}")))?;
        }
        ctx.body = bytes;
    }

    Ok(ctx)
}

async fn read_multipart(request: Request, ctx: &mut RequestContext) -> Result<(), Response> {
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {e}")))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart field: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if let Some(filename) = field.file_name().map(str::to_string) {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| bad_request(format!("failed to read upload \"{name}\": {e}")))?;
            ctx.files.push(FilePart {
                name,
                filename,
                content_type,
                data,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| bad_request(format!("failed to read field \"{name}\": {e}")))?;
            ctx.form.push((name, value));
        }
    }
    Ok(())
}

fn parse_query(query: &str) -> Vec<(String, String)> {
    serde_urlencoded::from_str(query).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to parse query string, forwarding none");
        Vec::new()
    })
}

fn header_string(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn bad_request(message: String) -> Response {
    let body = serde_json::json!({ "error": message, "status": 400 });
    Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn req(uri: &str) -> Request {
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn bare_join_flag_parses_with_empty_value() {
        let ctx = request_context(
            "orders".into(),
            "orders".into(),
            None,
            req("/orders/orders/?join"),
            1024,
        )
        .await
        .unwrap();
        assert!(ctx.join_enabled());
        assert_eq!(ctx.query, vec![("join".to_string(), String::new())]);
    }

    #[tokio::test]
    async fn authorization_header_is_captured() {
        let request = Request::builder()
            .method(Method::GET)
            .uri("/orders/orders/")
            .header("authorization", "Token abc")
            .body(Body::empty())
            .unwrap();
        let ctx = request_context("orders".into(), "orders".into(), None, request, 1024)
            .await
            .unwrap();
        assert_eq!(ctx.authorization.as_deref(), Some("Token abc"));
    }

    #[tokio::test]
    async fn urlencoded_body_is_decoded_into_form_fields() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/orders/orders/")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from("name=widget&qty=3"))
            .unwrap();
        let ctx = request_context("orders".into(), "orders".into(), None, request, 1024)
            .await
            .unwrap();
        assert_eq!(
            ctx.form,
            vec![
                ("name".to_string(), "widget".to_string()),
                ("qty".to_string(), "3".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn json_body_stays_raw() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/orders/orders/")
            .header("content-type", "application/json")
            .body(Body::from("{\"name\":\"widget\"}"))
            .unwrap();
        let ctx = request_context("orders".into(), "orders".into(), None, request, 1024)
            .await
            .unwrap();
        assert!(ctx.form.is_empty());
        assert_eq!(&ctx.body[..], b"{\"name\":\"widget\"}");
    }
}
