//! Administrative endpoint handlers.
//!
//! The control server only routes to these; what each action means for the
//! supervisor lives behind the [`Endpoints`] trait. [`BusEndpoints`] is the
//! stock implementation that turns requests into bus events.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::StatusCode;

use crate::control::error::EndpointError;
use crate::events::{Event, EventBus, MetricSample};

/// Outcome of an endpoint handler.
pub type EndpointResult = Result<StatusCode, EndpointError>;

/// Handlers behind the five control routes.
///
/// Handlers only ever see POST requests; method enforcement happens in the
/// router before they are called.
#[async_trait]
pub trait Endpoints: Send + Sync + 'static {
    /// `/v3/environ`
    async fn put_environ(&self, body: Bytes) -> EndpointResult;
    /// `/v3/reload`
    async fn post_reload(&self, body: Bytes) -> EndpointResult;
    /// `/v3/metric`
    async fn post_metric(&self, body: Bytes) -> EndpointResult;
    /// `/v3/maintenance/enable`
    async fn post_enable_maintenance(&self, body: Bytes) -> EndpointResult;
    /// `/v3/maintenance/disable`
    async fn post_disable_maintenance(&self, body: Bytes) -> EndpointResult;
}

/// Environment overlay injected through the control API.
///
/// The supervisor merges it into the environment of every process it spawns.
/// Clones share the same underlying map, so it survives server reloads when
/// the supervisor hands the same overlay to each generation.
#[derive(Debug, Clone, Default)]
pub struct Environ {
    vars: Arc<RwLock<BTreeMap<String, String>>>,
}

impl Environ {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite variables.
    pub fn extend<I>(&self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.vars.write().expect("environ lock poisoned").extend(vars);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.vars.read().expect("environ lock poisoned").get(key).cloned()
    }

    /// Copy of every variable, ordered by name.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.vars.read().expect("environ lock poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.vars.read().expect("environ lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Endpoints that act by publishing onto the supervisor bus.
#[derive(Debug, Clone)]
pub struct BusEndpoints {
    bus: EventBus,
    environ: Environ,
}

impl BusEndpoints {
    pub fn new(bus: EventBus) -> Self {
        Self::with_environ(bus, Environ::new())
    }

    pub fn with_environ(bus: EventBus, environ: Environ) -> Self {
        Self { bus, environ }
    }

    pub fn environ(&self) -> &Environ {
        &self.environ
    }
}

#[async_trait]
impl Endpoints for BusEndpoints {
    async fn put_environ(&self, body: Bytes) -> EndpointResult {
        let vars: HashMap<String, String> = serde_json::from_slice(&body)?;
        tracing::debug!(count = vars.len(), "control: updating environment");
        self.environ.extend(vars);
        Ok(StatusCode::OK)
    }

    async fn post_reload(&self, _body: Bytes) -> EndpointResult {
        tracing::info!("control: reloading configuration");
        self.bus.set_reload_flag();
        self.bus.shutdown().await;
        Ok(StatusCode::OK)
    }

    async fn post_metric(&self, body: Bytes) -> EndpointResult {
        let metrics: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(&body)?;
        for (name, value) in metrics {
            let sample = MetricSample::new(name, render_value(value));
            tracing::debug!(metric = %sample, "control: metric received");
            self.bus.publish(Event::Metric(sample)).await;
        }
        Ok(StatusCode::OK)
    }

    async fn post_enable_maintenance(&self, _body: Bytes) -> EndpointResult {
        tracing::info!("control: entering maintenance mode");
        self.bus.publish(Event::EnterMaintenance).await;
        Ok(StatusCode::OK)
    }

    async fn post_disable_maintenance(&self, _body: Bytes) -> EndpointResult {
        tracing::info!("control: leaving maintenance mode");
        self.bus.publish(Event::ExitMaintenance).await;
        Ok(StatusCode::OK)
    }
}

// Strings go out bare; everything else keeps its JSON spelling.
fn render_value(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}
