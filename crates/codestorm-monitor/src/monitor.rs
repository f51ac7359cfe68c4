//! The monitor session.
//!
//! Reports the landing route for the configured identity, then follows the
//! contest's realtime events until interrupted or the channel gives up.

use crate::config::MonitorConfig;
use crate::metrics;
use anyhow::{bail, Context, Result};
use codestorm_client::{ConnectionState, RealtimeChannel};
use codestorm_core::{access, handler, RoleType, RouteManifest};
use codestorm_protocol::EventKind;
use std::path::Path;
use tokio::sync::watch;
use tracing::{info, warn};

/// Where the configured identity lands, and what it may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Landing {
    pub route: String,
    pub role: RoleType,
    pub accessible: Vec<String>,
}

impl Landing {
    /// Resolve the landing route for a manifest, after expanding the held
    /// permissions through the manifest's hierarchy.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest's permission hierarchy has a cycle.
    pub fn resolve(manifest: &RouteManifest) -> Result<Self> {
        let permissions = manifest
            .effective_permissions()
            .context("Invalid permission hierarchy in manifest")?;

        let accessible = access::accessible_routes(&permissions, &manifest.routes)
            .into_iter()
            .map(|route| route.path.clone())
            .collect();

        Ok(Self {
            route: access::default_route(&permissions, &manifest.routes),
            role: access::role_type(&permissions),
            accessible,
        })
    }
}

/// Load a route manifest from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a manifest.
pub fn load_manifest(path: &Path) -> Result<RouteManifest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    RouteManifest::from_json(&text)
        .with_context(|| format!("Failed to parse manifest: {}", path.display()))
}

/// Log every event kind, and join `contest_id` whenever authentication
/// succeeds.
pub fn register_handlers(channel: &RealtimeChannel, contest_id: Option<String>) {
    for kind in EventKind::ALL {
        channel.on(
            kind,
            handler(move |event| {
                info!(event = %event.kind, timestamp = %event.timestamp, payload = %event.payload, "Event");
            }),
        );
    }

    if let Some(contest_id) = contest_id {
        let joiner = channel.clone();
        channel.on(
            EventKind::Authenticated,
            handler(move |_| {
                info!(contest = %contest_id, "Joining contest");
                joiner.join_topic(contest_id.clone());
            }),
        );
    }
}

/// Log state transitions until the channel fails.
async fn follow_state(mut states: watch::Receiver<ConnectionState>) -> ConnectionState {
    loop {
        let state = *states.borrow_and_update();
        match state {
            ConnectionState::Failed => return state,
            ConnectionState::Reconnecting => warn!(%state, "Connection state"),
            _ => info!(%state, "Connection state"),
        }
        if states.changed().await.is_err() {
            return *states.borrow();
        }
    }
}

/// Run the monitor until ctrl-c or until reconnects are exhausted.
///
/// # Errors
///
/// Returns an error if the manifest or endpoint is invalid, the first
/// connect fails, or the channel gives up reconnecting.
pub async fn run(config: MonitorConfig) -> Result<()> {
    if let Some(path) = &config.session.manifest {
        let landing = Landing::resolve(&load_manifest(path)?)?;
        metrics::set_accessible_routes(landing.accessible.len());
        info!(
            route = %landing.route,
            role = %landing.role,
            accessible = ?landing.accessible,
            "Landing route resolved"
        );
    }

    let channel = RealtimeChannel::from_config(&config.channel)
        .context("Invalid channel configuration")?;
    register_handlers(&channel, config.session.contest_id.clone());

    let states = channel.watch_state();
    info!(endpoint = %channel.endpoint(), user = ?config.session.user_id, "Connecting");
    channel
        .connect(config.session.user_id.clone())
        .await
        .with_context(|| format!("Failed to connect to {}", channel.endpoint()))?;

    let outcome = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("Failed to listen for ctrl-c")?;
            info!("Shutting down");
            None
        }
        state = follow_state(states) => Some(state),
    };

    channel.disconnect();

    if let Some(state) = outcome {
        bail!("Channel stopped in state {state}");
    }
    Ok(())
}
