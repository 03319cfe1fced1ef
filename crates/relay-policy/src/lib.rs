//! Write policies: the gate every submitted event passes before storage.
//!
//! A policy sees the parsed event, when it arrived and where it came from,
//! and returns a [`Verdict`]. The writer builds exactly one policy per
//! writer worker and passes it by `&mut` into each decision, so policies may
//! keep state (such as a running plugin process) without any locking.
//!
//! - [`AcceptAll`] stores everything. It is used when no plugin is configured.
//! - [`PluginPolicy`] delegates each decision to an external program over a
//!   line-oriented JSON protocol.

mod error;
mod plugin;

pub use error::PolicyError;
pub use plugin::PluginPolicy;

use relay_types::{SourceFamily, Verdict};
use serde_json::Value;

/// Decides whether a submitted event may be stored.
pub trait WritePolicy: Send {
    /// Returns the verdict for one event.
    ///
    /// `received_at` is the receipt time in seconds since the epoch;
    /// `source_addr` holds the raw address bytes classified as `source`.
    fn accept_event(
        &mut self,
        event: &Value,
        received_at: u64,
        source: SourceFamily,
        source_addr: &[u8],
    ) -> Verdict;
}

impl<P: WritePolicy + ?Sized> WritePolicy for Box<P> {
    fn accept_event(
        &mut self,
        event: &Value,
        received_at: u64,
        source: SourceFamily,
        source_addr: &[u8],
    ) -> Verdict {
        (**self).accept_event(event, received_at, source, source_addr)
    }
}

/// A policy that accepts every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl WritePolicy for AcceptAll {
    fn accept_event(&mut self, _: &Value, _: u64, _: SourceFamily, _: &[u8]) -> Verdict {
        Verdict::Accept(String::new())
    }
}

/// Builds the policy for a configured plugin command.
///
/// An empty or whitespace-only command disables the plugin.
pub fn from_plugin_command(command: Option<&str>) -> Box<dyn WritePolicy> {
    match command.map(str::trim).filter(|c| !c.is_empty()) {
        Some(command) => {
            tracing::info!(plugin = command, "using write policy plugin");
            Box::new(PluginPolicy::new(command))
        }
        None => {
            tracing::info!("no write policy plugin configured, accepting all events");
            Box::new(AcceptAll)
        }
    }
}
