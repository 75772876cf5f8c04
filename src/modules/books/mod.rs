pub mod clock;
pub mod models;
pub mod routes;
pub mod store;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Module};
use serde_json::json;

use store::{BookStore, SharedBookStore};

/// Books module: owns the in-memory store and serves `/books`
pub struct BooksModule {
    store: SharedBookStore,
}

impl BooksModule {
    pub fn new(store: SharedBookStore) -> Self {
        Self { store }
    }

    /// Handle to the store backing this module's routes
    pub fn store(&self) -> SharedBookStore {
        self.store.clone()
    }
}

impl Default for BooksModule {
    fn default() -> Self {
        Self::new(BookStore::default().into_shared())
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.store.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        let held = self.store.read().await.len();
        tracing::info!(
            module = self.name(),
            books = held,
            "books module stopped, in-memory books discarded"
        );
        Ok(())
    }
}

fn error_response(description: &str) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": {
                    "$ref": "#/components/schemas/ErrorResponse"
                }
            }
        }
    })
}

fn success_response(description: &str, data: Option<serde_json::Value>) -> serde_json::Value {
    let mut properties = json!({
        "status": {"type": "string", "enum": ["success"]},
        "message": {"type": "string"}
    });
    if let Some(data) = data {
        properties["data"] = data;
    }

    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": {
                    "type": "object",
                    "properties": properties,
                    "required": ["status"]
                }
            }
        }
    })
}

fn openapi_fragment() -> serde_json::Value {
    let id_param = json!([{
        "name": "id",
        "in": "path",
        "required": true,
        "schema": {"type": "string"}
    }]);
    let draft_body = json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": {"$ref": "#/components/schemas/BookDraft"}
            }
        }
    });

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "responses": {
                        "200": success_response("Books in insertion order", Some(json!({
                            "type": "object",
                            "properties": {
                                "books": {
                                    "type": "array",
                                    "items": {"$ref": "#/components/schemas/BookSummary"}
                                }
                            }
                        })))
                    }
                },
                "post": {
                    "summary": "Add a book",
                    "tags": ["Books"],
                    "requestBody": draft_body.clone(),
                    "responses": {
                        "201": success_response("Book added", Some(json!({
                            "type": "object",
                            "properties": {"bookId": {"type": "string"}}
                        }))),
                        "400": error_response("Missing name, readPage greater than pageCount, or malformed body")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "parameters": id_param.clone(),
                    "responses": {
                        "200": success_response("Full book record", Some(json!({
                            "type": "object",
                            "properties": {"book": {"$ref": "#/components/schemas/Book"}}
                        }))),
                        "404": error_response("Book not found")
                    }
                },
                "put": {
                    "summary": "Replace a book",
                    "tags": ["Books"],
                    "parameters": id_param.clone(),
                    "requestBody": draft_body,
                    "responses": {
                        "200": success_response("Book updated", None),
                        "400": error_response("Missing name, readPage greater than pageCount, or malformed body"),
                        "404": error_response("Book not found")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": id_param,
                    "responses": {
                        "200": success_response("Book deleted", None),
                        "404": error_response("Book not found")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string"},
                        "name": {"type": "string"},
                        "year": {"$ref": "#/components/schemas/LooseValue"},
                        "author": {"type": ["string", "null"]},
                        "summary": {"type": ["string", "null"]},
                        "publisher": {"type": ["string", "null"]},
                        "pageCount": {"$ref": "#/components/schemas/LooseValue"},
                        "readPage": {"$ref": "#/components/schemas/LooseValue"},
                        "finished": {"type": "boolean"},
                        "reading": {"$ref": "#/components/schemas/LooseValue"},
                        "insertedAt": {"type": "string", "format": "date-time"},
                        "updatedAt": {"type": "string", "format": "date-time"}
                    },
                    "required": ["id", "name", "finished", "insertedAt", "updatedAt"]
                },
                "BookDraft": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "year": {"$ref": "#/components/schemas/LooseValue"},
                        "author": {"type": "string"},
                        "summary": {"type": "string"},
                        "publisher": {"type": "string"},
                        "pageCount": {"$ref": "#/components/schemas/LooseValue"},
                        "readPage": {"$ref": "#/components/schemas/LooseValue"},
                        "reading": {"$ref": "#/components/schemas/LooseValue"}
                    },
                    "required": ["name"]
                },
                "LooseValue": {
                    "description": "Stored as sent. pageCount and readPage are compared loosely: null is 0, numeric strings are parsed.",
                    "type": ["integer", "number", "string", "boolean", "null"]
                },
                "BookSummary": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "string"},
                        "name": {"type": "string"},
                        "publisher": {"type": ["string", "null"]}
                    },
                    "required": ["id", "name", "publisher"]
                }
            }
        }
    })
}

/// Create a books module backed by a fresh store
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::default())
}
