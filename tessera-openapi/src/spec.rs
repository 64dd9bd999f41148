use crate::pk::is_canonical_uuid;
use http::Method;
use serde_json::Value;
use std::collections::HashMap;
use tessera_core::GatewayError;
use tracing::debug;

/// HTTP-method keys recognized inside an OpenAPI path item. Everything else
/// (`parameters`, `$ref`, vendor extensions) is skipped.
const PATH_ITEM_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// One operation from an upstream OpenAPI document.
#[derive(Debug, Clone)]
pub struct Operation {
    pub method: Method,
    /// Templated path as declared in the document, e.g. `/products/{id}/`.
    pub path_name: String,
}

/// A resolved outbound call: the spec's canonical method plus the full URL
/// with the pk placeholder substituted.
#[derive(Debug, Clone)]
pub struct ResolvedOperation {
    pub method: Method,
    pub url: String,
}

/// Parsed OpenAPI document, reduced to what request translation needs:
/// the API base URL and a `(method, templated path)` operation table.
#[derive(Debug, Clone)]
pub struct ApiSpec {
    pub api_url: String,
    operations: HashMap<(Method, String), Operation>,
}

impl ApiSpec {
    /// Build a spec from a fetched OpenAPI JSON document.
    ///
    /// The base URL is, in order of preference: the registry's override, an
    /// OpenAPI 3 `servers[0].url`, a Swagger 2 `schemes`/`host`/`basePath`
    /// composition, or the origin of `schema_url` itself.
    pub fn from_document(
        document: &Value,
        schema_url: &str,
        base_override: Option<&str>,
    ) -> Result<Self, GatewayError> {
        let paths = document
            .get("paths")
            .and_then(Value::as_object)
            .ok_or_else(|| GatewayError::SpecFetch {
                url: schema_url.to_string(),
                reason: "document has no \"paths\" object".to_string(),
            })?;

        let mut operations = HashMap::new();
        for (path_name, item) in paths {
            let Some(item) = item.as_object() else {
                continue;
            };
            for method_key in item.keys() {
                let lower = method_key.to_lowercase();
                if !PATH_ITEM_METHODS.contains(&lower.as_str()) {
                    continue;
                }
                let method = Method::from_bytes(lower.to_uppercase().as_bytes())
                    .expect("method key comes from the fixed whitelist");
                operations.insert(
                    (method.clone(), path_name.clone()),
                    Operation {
                        method,
                        path_name: path_name.clone(),
                    },
                );
            }
        }

        let api_url = match base_override {
            Some(base) => base.to_string(),
            None => derive_api_url(document, schema_url),
        };
        debug!(api_url = %api_url, operations = operations.len(), "Parsed OpenAPI document");

        Ok(Self { api_url, operations })
    }

    /// Validate an inbound `(method, model, pk)` against the spec and return
    /// the outbound call to make.
    ///
    /// The inbound template is `/{model}/` for list operations and
    /// `/{model}/{uuid}/` or `/{model}/{id}/` for detail operations,
    /// depending on whether the pk is a canonical UUID.
    pub fn resolve(
        &self,
        method: &Method,
        model: &str,
        pk: Option<&str>,
    ) -> Result<ResolvedOperation, GatewayError> {
        let model = model.to_lowercase();
        let (template, substitution) = match pk {
            None => (format!("/{model}/"), None),
            Some(pk) => {
                let pk_name = if is_canonical_uuid(pk) { "uuid" } else { "id" };
                (format!("/{model}/{{{pk_name}}}/"), Some((pk_name, pk)))
            }
        };

        let operation = self
            .operations
            .get(&(method.clone(), template.clone()))
            .ok_or_else(|| GatewayError::EndpointNotFound(format!("{method} {template}")))?;

        let mut url = format!(
            "{}{}",
            self.api_url.trim_end_matches('/'),
            operation.path_name
        );
        if let Some((pk_name, pk)) = substitution {
            url = url.replace(&format!("{{{pk_name}}}"), pk);
        }

        Ok(ResolvedOperation {
            method: operation.method.clone(),
            url,
        })
    }

    pub fn operation_count(&self) -> usize {
        self.operations.len()
    }
}

/// Base URL from the document itself: OpenAPI 3 `servers`, then Swagger 2
/// `schemes`/`host`/`basePath`, then the schema URL's origin.
fn derive_api_url(document: &Value, schema_url: &str) -> String {
    if let Some(server_url) = document
        .get("servers")
        .and_then(Value::as_array)
        .and_then(|servers| servers.first())
        .and_then(|server| server.get("url"))
        .and_then(Value::as_str)
    {
        return server_url.to_string();
    }

    let origin = url_origin(schema_url);
    let base_path = document
        .get("basePath")
        .and_then(Value::as_str)
        .unwrap_or("");

    if let Some(host) = document.get("host").and_then(Value::as_str) {
        let scheme = document
            .get("schemes")
            .and_then(Value::as_array)
            .and_then(|schemes| schemes.first())
            .and_then(Value::as_str)
            .unwrap_or("http");
        return format!("{scheme}://{host}{base_path}");
    }

    format!("{origin}{base_path}")
}

/// `scheme://host[:port]` of a URL, without the path.
fn url_origin(url: &str) -> String {
    match url.find("://") {
        Some(scheme_end) => {
            let rest = &url[scheme_end + 3..];
            match rest.find('/') {
                Some(path_start) => url[..scheme_end + 3 + path_start].to_string(),
                None => url.to_string(),
            }
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn swagger_doc() -> Value {
        json!({
            "swagger": "2.0",
            "host": "products.local:8001",
            "schemes": ["https"],
            "basePath": "/api",
            "paths": {
                "/products/": {
                    "get": {},
                    "post": {},
                    "parameters": []
                },
                "/products/{id}/": {
                    "get": {},
                    "put": {}
                },
                "/products/{uuid}/": {
                    "get": {}
                }
            }
        })
    }

    #[test]
    fn test_operation_table_skips_non_method_keys() {
        let spec = ApiSpec::from_document(&swagger_doc(), "http://products.local/schema/", None)
            .unwrap();
        assert_eq!(spec.operation_count(), 5);
    }

    #[test]
    fn test_swagger2_base_url() {
        let spec = ApiSpec::from_document(&swagger_doc(), "http://products.local/schema/", None)
            .unwrap();
        assert_eq!(spec.api_url, "https://products.local:8001/api");
    }

    #[test]
    fn test_openapi3_servers_base_url() {
        let doc = json!({
            "openapi": "3.0.0",
            "servers": [{ "url": "http://products.local/v2" }],
            "paths": { "/products/": { "get": {} } }
        });
        let spec = ApiSpec::from_document(&doc, "http://other.local/schema/", None).unwrap();
        assert_eq!(spec.api_url, "http://products.local/v2");
    }

    #[test]
    fn test_base_url_falls_back_to_schema_origin() {
        let doc = json!({ "paths": { "/products/": { "get": {} } } });
        let spec =
            ApiSpec::from_document(&doc, "http://products.local:8001/docs/swagger.json", None)
                .unwrap();
        assert_eq!(spec.api_url, "http://products.local:8001");
    }

    #[test]
    fn test_base_override_wins() {
        let spec = ApiSpec::from_document(
            &swagger_doc(),
            "http://products.local/schema/",
            Some("http://internal-products:9000"),
        )
        .unwrap();
        assert_eq!(spec.api_url, "http://internal-products:9000");
    }

    #[test]
    fn test_missing_paths_is_spec_fetch_error() {
        let doc = json!({ "info": {} });
        let err = ApiSpec::from_document(&doc, "http://s.local/schema/", None).unwrap_err();
        assert!(matches!(err, GatewayError::SpecFetch { url, .. } if url == "http://s.local/schema/"));
    }

    #[test]
    fn test_resolve_list_operation() {
        let spec = ApiSpec::from_document(&swagger_doc(), "http://products.local/schema/", None)
            .unwrap();
        let op = spec.resolve(&Method::GET, "products", None).unwrap();
        assert_eq!(op.method, Method::GET);
        assert_eq!(op.url, "https://products.local:8001/api/products/");
    }

    #[test]
    fn test_resolve_numeric_pk_routes_through_id() {
        let spec = ApiSpec::from_document(&swagger_doc(), "http://products.local/schema/", None)
            .unwrap();
        let op = spec.resolve(&Method::GET, "products", Some("42")).unwrap();
        assert_eq!(op.url, "https://products.local:8001/api/products/42/");
    }

    #[test]
    fn test_resolve_uuid_pk_routes_through_uuid() {
        let spec = ApiSpec::from_document(&swagger_doc(), "http://products.local/schema/", None)
            .unwrap();
        let pk = "123e4567-e89b-12d3-a456-426614174000";
        let op = spec.resolve(&Method::GET, "products", Some(pk)).unwrap();
        assert_eq!(
            op.url,
            format!("https://products.local:8001/api/products/{pk}/")
        );
    }

    #[test]
    fn test_resolve_uppercases_nothing_but_model() {
        let spec = ApiSpec::from_document(&swagger_doc(), "http://products.local/schema/", None)
            .unwrap();
        let op = spec.resolve(&Method::GET, "Products", Some("42")).unwrap();
        assert_eq!(op.url, "https://products.local:8001/api/products/42/");
    }

    #[test]
    fn test_resolve_unknown_operation_is_endpoint_not_found() {
        let spec = ApiSpec::from_document(&swagger_doc(), "http://products.local/schema/", None)
            .unwrap();
        let err = spec.resolve(&Method::DELETE, "products", Some("42")).unwrap_err();
        assert!(
            matches!(err, GatewayError::EndpointNotFound(ref detail) if detail == "DELETE /products/{id}/")
        );
    }

    #[test]
    fn test_base_url_trailing_slash_stripped_once() {
        let doc = json!({
            "servers": [{ "url": "http://products.local/" }],
            "paths": { "/products/": { "get": {} } }
        });
        let spec = ApiSpec::from_document(&doc, "http://x/schema", None).unwrap();
        let op = spec.resolve(&Method::GET, "products", None).unwrap();
        assert_eq!(op.url, "http://products.local/products/");
    }
}
