//! # metalhead-client
//!
//! Client core of MetalHead Underground: a typed data-access layer over the
//! social backend, gateway health tracking, error normalization and the
//! view models behind every screen. Rendering is left to the host, which
//! plugs in through a handful of traits ([`backend::Backend`],
//! [`pages::app::AuthSession`], [`gateway::Reload`], [`pages::Confirm`],
//! [`pages::settings::Clipboard`]).

pub mod backend;
pub mod cache;
pub mod config;
pub mod connection;
pub mod device;
pub mod error;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
pub mod gateway;
pub mod normalize;
pub mod notify;
pub mod pages;
pub mod queries;
pub mod session;
pub mod state;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::ClientConfig;
pub use error::{ClientError, NormalizedError, RemoteError, Result};
pub use gateway::{GatewayState, GatewayStatus, GatewayTracker};
pub use queries::DataClient;
pub use state::AppState;

/// Install the default log subscriber. `RUST_LOG` overrides the filter.
/// Does nothing if a subscriber is already installed.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("metalhead_client=debug,metalhead_shared=info,warn")
    });

    let installed = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Starting MetalHead Underground client");
    }
}
