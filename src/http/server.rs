//! The accept loop.
//!
//! # Responsibilities
//! - Pull negotiated connections off the listener forever
//! - Spawn one independent task per connection and resume accepting at once
//! - Absorb accept failures (log, optional backoff, continue)
//!
//! # Design Decisions
//! - The loop never waits on a connection's lifetime; only admission
//!   control, when configured, can hold it back
//! - A connection task owns its stream, its permit and its tracking guard;
//!   dropping them at task end is the only close the core performs
//! - Engine errors stay inside the task that produced them

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::Instrument;

use crate::config::AdmissionConfig;
use crate::http::engine::{Http1Engine, Http2Engine, ProtocolEngine};
use crate::http::injector::ProtocolInjector;
use crate::net::admission::{AdmissionControl, ConnectionPermit};
use crate::net::connection::{Connection, ConnectionTracker};
use crate::net::listener::Accept;
use crate::observability::metrics;
use crate::resilience::AcceptBackoff;

/// Accepts connections and hands each one to the injector in its own task.
pub struct ConnectionAcceptor<L, H2 = Http2Engine, H1 = Http1Engine> {
    listener: L,
    injector: Arc<ProtocolInjector<H2, H1>>,
    admission: AdmissionControl,
    backoff: AcceptBackoff,
    tracker: ConnectionTracker,
}

impl<L, H2, H1> ConnectionAcceptor<L, H2, H1>
where
    L: Accept,
    H2: ProtocolEngine,
    H1: ProtocolEngine,
{
    pub fn new(listener: L, injector: ProtocolInjector<H2, H1>, admission: &AdmissionConfig) -> Self {
        Self {
            listener,
            injector: Arc::new(injector),
            admission: AdmissionControl::new(admission),
            backoff: admission.accept_backoff,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Handle for observing live connection tasks.
    pub fn tracker(&self) -> ConnectionTracker {
        self.tracker.clone()
    }

    /// Run the accept loop. Never returns; stops only with the process
    /// (or when the task running it is aborted).
    pub async fn run(mut self) -> Infallible {
        let mut consecutive_failures: u32 = 0;

        loop {
            let permit = self.admission.admit().await;

            match self.listener.accept().await {
                Ok((conn, peer)) => {
                    consecutive_failures = 0;
                    self.spawn_connection(conn, peer, permit);
                }
                Err(err) => {
                    consecutive_failures = consecutive_failures.saturating_add(1);
                    metrics::record_accept_error();
                    tracing::error!(error = %err, consecutive_failures, "Accept error");

                    match self.backoff.delay(consecutive_failures) {
                        Some(delay) => tokio::time::sleep(delay).await,
                        // Keep the worker available to other tasks when
                        // accept fails without ever suspending.
                        None => tokio::task::yield_now().await,
                    }
                }
            }
        }
    }

    fn spawn_connection(&self, conn: L::Conn, peer: SocketAddr, permit: ConnectionPermit) {
        let protocol = conn.negotiated_protocol();
        let mut guard = self.tracker.track();
        let connection_id = guard.id();
        let injector = Arc::clone(&self.injector);

        metrics::record_connection_accepted(protocol);
        tracing::info!(
            connection_id = %connection_id,
            peer_addr = %peer,
            protocol = %protocol,
            "Connection"
        );

        let span = tracing::debug_span!("connection", id = %connection_id);
        tokio::spawn(
            async move {
                let _permit = permit;
                guard.serving();
                match injector.inject(conn).await {
                    Ok(()) => tracing::debug!("Connection finished"),
                    Err(err) if err.is_disconnect() => {
                        tracing::debug!(error = %err, "Peer disconnected")
                    }
                    Err(err) => tracing::debug!(error = %err, "Connection ended with error"),
                }
                guard.closed();
                drop(guard);
            }
            .instrument(span),
        );
    }
}
