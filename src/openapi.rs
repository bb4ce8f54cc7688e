//! OpenAPI 3.0 document and Swagger UI page generated from the introspected model.

use crate::config::DocsConfig;
use crate::schema::{ApiModel, CollectionDescriptor, PropertyDescriptor};
use serde_json::{json, Map, Value};

pub const OPENAPI_JSON_PATH: &str = "/api-docs/v3/openapi.json";
pub const SWAGGER_UI_PATH: &str = "/swagger-ui";

/// OpenAPI schema of one property. Unmapped native types carry no `type`.
pub fn property_schema(p: &PropertyDescriptor) -> Value {
    let mut schema = Map::new();
    schema.insert("title".into(), Value::String(p.name.clone()));
    if let Some(t) = p.logical_type {
        schema.insert("type".into(), Value::String(t.openapi_type().into()));
    }
    if let Some(f) = p.format {
        schema.insert("format".into(), Value::String(f.into()));
    }
    schema.insert("default".into(), p.example_default.clone());
    schema.insert("nullable".into(), Value::Bool(p.nullable));
    schema.insert("readOnly".into(), Value::Bool(!p.writable));
    if let Some(n) = p.max_length {
        schema.insert("maxLength".into(), Value::from(n));
    }
    schema.insert("x-native-type".into(), Value::String(p.native_type.clone()));
    Value::Object(schema)
}

fn properties(c: &CollectionDescriptor) -> Value {
    Value::Object(
        c.properties
            .iter()
            .map(|p| (p.name.clone(), property_schema(p)))
            .collect(),
    )
}

fn list_parameters(c: &CollectionDescriptor) -> Vec<Value> {
    let mut params = vec![
        json!({
            "name": "page",
            "in": "query",
            "description": "zero-based page index, applied together with limit",
            "schema": { "type": "integer", "minimum": 0, "default": 0 }
        }),
        json!({
            "name": "limit",
            "in": "query",
            "description": "maximum number of items returned",
            "schema": { "type": "integer", "minimum": 0, "default": 10 }
        }),
        json!({
            "name": "sort",
            "in": "query",
            "description": "sort keys, field[:asc|desc] separated by ';'",
            "schema": { "type": "string", "example": "id:asc" }
        }),
    ];
    for p in &c.properties {
        params.push(json!({
            "name": p.name,
            "in": "query",
            "required": false,
            "description": format!("substring match on {}", p.name),
            "schema": { "type": "string" }
        }));
    }
    params
}

fn id_parameter(collection: &str, verb: &str) -> Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "description": format!("id of the {} item to {}", collection, verb),
        "schema": { "type": "string" }
    })
}

fn collection_paths(c: &CollectionDescriptor) -> (Value, Value) {
    let name = c.name.as_str();
    let item = json!({ "type": "object", "properties": properties(c) });
    let body = json!({
        "description": format!("{} item as JSON object, or an array of items", name),
        "required": true,
        "content": {
            "application/json": {
                "schema": {
                    "oneOf": [item.clone(), { "type": "array", "items": item.clone() }]
                }
            }
        }
    });
    let item_body = json!({
        "description": format!("{} item as JSON object", name),
        "required": true,
        "content": { "application/json": { "schema": item.clone() } }
    });
    let server_error = json!({ "description": "store failure" });

    let collection = json!({
        "get": {
            "tags": [name],
            "operationId": format!("find_{}", name),
            "description": format!("search {} items; every non-reserved query parameter is a substring filter", name),
            "parameters": list_parameters(c),
            "responses": {
                "200": {
                    "description": format!("matching {} items", name),
                    "content": { "application/json": { "schema": { "type": "array", "items": item.clone() } } }
                },
                "400": { "description": "invalid query parameter" },
                "500": server_error.clone()
            }
        },
        "post": {
            "tags": [name],
            "operationId": format!("create_{}", name),
            "description": format!("create one {0} item ({{}}) or several ([{{}}, ...])", name),
            "requestBody": body.clone(),
            "responses": {
                "201": {
                    "description": format!("created {} item(s)", name),
                    "content": { "application/json": { "schema": { "type": "object" } } }
                },
                "400": { "description": "body is neither an object nor an array" },
                "500": server_error.clone()
            }
        },
        "put": {
            "tags": [name],
            "operationId": format!("update_{}", name),
            "description": format!("update one {0} item or several; each item carries its id", name),
            "requestBody": body,
            "responses": {
                "200": {
                    "description": format!("updated {} item(s)", name),
                    "content": { "application/json": { "schema": { "type": "object" } } }
                },
                "304": { "description": "no item matched the id" },
                "400": { "description": "missing or malformed id" },
                "500": server_error.clone()
            }
        }
    });

    let by_id = json!({
        "get": {
            "tags": [name],
            "operationId": format!("find_{}_by_id", name),
            "description": format!("get {} item by id", name),
            "parameters": [id_parameter(name, "read")],
            "responses": {
                "200": {
                    "description": format!("{} item", name),
                    "content": { "application/json": { "schema": item.clone() } }
                },
                "204": { "description": format!("{} item not found", name) },
                "400": { "description": "malformed id" },
                "500": server_error.clone()
            }
        },
        "put": {
            "tags": [name],
            "operationId": format!("update_{}_by_id", name),
            "description": format!("update {} item by id; the path id overrides any id in the body", name),
            "parameters": [id_parameter(name, "update")],
            "requestBody": item_body,
            "responses": {
                "200": {
                    "description": format!("updated {} item", name),
                    "content": { "application/json": { "schema": item } }
                },
                "304": { "description": "no item matched the id" },
                "400": { "description": "malformed id" },
                "500": server_error.clone()
            }
        },
        "delete": {
            "tags": [name],
            "operationId": format!("remove_{}_by_id", name),
            "description": format!("remove {} item by id", name),
            "parameters": [id_parameter(name, "delete")],
            "responses": {
                "200": {
                    "description": "true when the item was deleted",
                    "content": { "application/json": { "schema": { "type": "boolean" } } }
                },
                "404": { "description": format!("{} item not found", name) },
                "400": { "description": "malformed id" },
                "500": server_error
            }
        }
    });
    (collection, by_id)
}

/// `paths` object: `/{c}` and `/{c}/{id}` for every collection, in model order.
pub fn build_paths(model: &ApiModel) -> Value {
    let mut paths = Map::new();
    for c in &model.collections {
        tracing::debug!(collection = %c.name, "documenting endpoints");
        let (collection, by_id) = collection_paths(c);
        paths.insert(format!("/{}", c.name), collection);
        paths.insert(format!("/{}/{{id}}", c.name), by_id);
    }
    Value::Object(paths)
}

/// Full document. `host` is the Host header of the request being served.
pub fn document(paths: &Value, database: &str, host: &str) -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": format!("project {}", database),
            "description": format!("REST API generated from the collections of database {}", database),
            "version": env!("CARGO_PKG_VERSION")
        },
        "servers": [{ "url": format!("http://{}", host) }],
        "paths": paths
    })
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Swagger UI page loading the generated document, with the configured CSS applied.
pub fn swagger_html(docs: &DocsConfig) -> String {
    let css_link = if docs.custom_css_url.is_empty() {
        String::new()
    } else {
        format!(
            r#"<link rel="stylesheet" type="text/css" href="{}" />"#,
            escape_attr(&docs.custom_css_url)
        )
    };
    let custom_css = docs.custom_css.replace("</", "<\\/");
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="UTF-8">
    <title>API documentation</title>
    <link rel="stylesheet" type="text/css" href="https://cdnjs.cloudflare.com/ajax/libs/swagger-ui/5.11.0/swagger-ui.css" />
    {css_link}
    <style>
      body {{ margin: 0; background: #fafafa; }}
      {custom_css}
    </style>
  </head>
  <body>
    <div id="swagger-ui"></div>
    <script src="https://cdnjs.cloudflare.com/ajax/libs/swagger-ui/5.11.0/swagger-ui-bundle.js" charset="UTF-8"></script>
    <script src="https://cdnjs.cloudflare.com/ajax/libs/swagger-ui/5.11.0/swagger-ui-standalone-preset.js" charset="UTF-8"></script>
    <script>
    window.onload = function() {{
      window.ui = SwaggerUIBundle({{
        url: "{spec_url}",
        dom_id: '#swagger-ui',
        deepLinking: true,
        presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
        layout: "StandaloneLayout"
      }});
    }};
    </script>
  </body>
</html>
"#,
        css_link = css_link,
        custom_css = custom_css,
        spec_url = OPENAPI_JSON_PATH,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::describe_property;

    fn users() -> ApiModel {
        ApiModel::new(vec![CollectionDescriptor {
            name: "users".into(),
            properties: vec![
                describe_property("id", "int4", false, false, None),
                describe_property("name", "varchar", true, true, Some(64)),
                describe_property("active", "bool", false, true, None),
                describe_property("tags", "jsonb", true, true, None),
            ],
        }])
        .unwrap()
    }

    #[test]
    fn property_types_follow_the_mapping() {
        let paths = build_paths(&users());
        let props = &paths["/users"]["get"]["responses"]["200"]["content"]["application/json"]["schema"]["items"]
            ["properties"];
        assert_eq!(props["name"]["type"], "string");
        assert_eq!(props["name"]["maxLength"], 64);
        assert_eq!(props["active"]["type"], "boolean");
        assert_eq!(props["id"]["type"], "integer");
        assert_eq!(props["id"]["format"], "int32");
        assert_eq!(props["id"]["readOnly"], true);
        assert_eq!(props["name"]["nullable"], true);
    }

    #[test]
    fn unknown_types_omit_type_keyword() {
        let paths = build_paths(&users());
        let tags = &paths["/users/{id}"]["get"]["responses"]["200"]["content"]["application/json"]["schema"]
            ["properties"]["tags"];
        assert!(tags.get("type").is_none());
        assert_eq!(tags["x-native-type"], "jsonb");
        assert_eq!(tags["default"], Value::Null);
    }

    #[test]
    fn both_paths_with_all_verbs() {
        let paths = build_paths(&users());
        let obj = paths.as_object().unwrap();
        assert_eq!(obj.keys().collect::<Vec<_>>(), ["/users", "/users/{id}"]);
        for verb in ["get", "post", "put"] {
            assert!(paths["/users"].get(verb).is_some(), "{verb}");
        }
        for verb in ["get", "put", "delete"] {
            assert!(paths["/users/{id}"].get(verb).is_some(), "{verb}");
        }
    }

    #[test]
    fn list_documents_pagination_and_filters() {
        let paths = build_paths(&users());
        let names: Vec<&str> = paths["/users"]["get"]["parameters"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|p| p["name"].as_str())
            .collect();
        assert_eq!(names, ["page", "limit", "sort", "id", "name", "active", "tags"]);
    }

    #[test]
    fn envelope_uses_request_host() {
        let doc = document(&build_paths(&users()), "shop", "localhost:8080");
        assert_eq!(doc["openapi"], "3.0.3");
        assert_eq!(doc["info"]["title"], "project shop");
        assert_eq!(doc["servers"][0]["url"], "http://localhost:8080");
        assert!(doc["paths"]["/users"].is_object());
    }

    #[test]
    fn swagger_page_applies_custom_css() {
        let html = swagger_html(&DocsConfig {
            custom_css: ".topbar { display: none }".into(),
            custom_css_url: "https://cdn.example.com/theme.css?a=1&b=2".into(),
        });
        assert!(html.contains(".topbar { display: none }"));
        assert!(html.contains(r#"href="https://cdn.example.com/theme.css?a=1&amp;b=2""#));
        assert!(html.contains(OPENAPI_JSON_PATH));

        let plain = swagger_html(&DocsConfig::default());
        assert!(!plain.contains("theme.css"));
    }
}
