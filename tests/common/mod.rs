//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine};
use tokio::net::TcpListener;

use purchases_listener::config::{ServiceConfig, StorageBackend};
use purchases_listener::storage::MemoryStore;
use purchases_listener::{HttpServer, Shutdown};

pub const ADMIN_KEY: &str = "test-admin-key";

/// Config backed by the in-memory store, admin enabled.
pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.storage.backend = StorageBackend::Memory;
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.to_string();
    config
}

/// Router over a fresh memory store, plus a handle on that store.
pub fn test_app(config: ServiceConfig) -> (Router, MemoryStore) {
    let store = MemoryStore::new();
    let server = HttpServer::new(config, Arc::new(store.clone()));
    (server.router(), store)
}

/// POST `body` to the SOAP endpoint.
pub fn soap_request(body: impl Into<Body>) -> Request<Body> {
    Request::post("/soap")
        .header("content-type", "text/xml; charset=utf-8")
        .body(body.into())
        .unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn b64(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// A SOAP 1.1 envelope around `method` with a prefixed namespace.
pub fn soap11_envelope(method: &str, namespace: &str, payload: &str, version: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">
  <soapenv:Body>
    <ns2:{method} xmlns:ns2="{namespace}">
      <purchases>{payload}</purchases>
      <version>{version}</version>
    </ns2:{method}>
  </soapenv:Body>
</soapenv:Envelope>"#
    )
}

/// A SOAP 1.2 envelope around `method` with a default namespace.
pub fn soap12_envelope(method: &str, namespace: &str, payload: &str) -> String {
    format!(
        r#"<env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope">
  <env:Body>
    <{method} xmlns="{namespace}"><purchases>{payload}</purchases></{method}>
  </env:Body>
</env:Envelope>"#
    )
}

/// Serve `config` over a real socket. Returns the bound address and the
/// shutdown handle.
pub async fn spawn_server(config: ServiceConfig) -> (SocketAddr, MemoryStore, Shutdown) {
    let store = MemoryStore::new();
    let server = HttpServer::new(config, Arc::new(store.clone()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, store, shutdown)
}
