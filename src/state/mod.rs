//! State management module.
//!
//! Contains the `Hub` (shared server state) and the components it wires
//! together: session registry, per-session queue actors, topic fan-out and
//! the ledger.

pub mod actor;
mod dashmap_ext;
mod queue;
mod registry;
mod rooms;
mod uid;

pub use queue::QueueManager;
pub use registry::SessionRegistry;
pub use rooms::{Outbound, RoomBroadcaster};
pub use uid::{ConnId, ConnIdGenerator};

use crate::config::LimitsConfig;
use crate::error::ServiceResult;
use crate::ledger::LedgerService;
use bidstage_proto::{SessionView, Topic, TransferReceipt, events};
use std::sync::Arc;

/// Shared server state.
///
/// Cross-component operations live here so that every mutation is followed
/// by the matching publish.
pub struct Hub {
    pub registry: Arc<SessionRegistry>,
    pub rooms: Arc<RoomBroadcaster>,
    pub queues: QueueManager,
    pub ledger: LedgerService,
    pub conn_ids: ConnIdGenerator,
    pub limits: LimitsConfig,
}

impl Hub {
    pub fn new(ledger: LedgerService, limits: LimitsConfig) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let rooms = Arc::new(RoomBroadcaster::new());
        let queues = QueueManager::new(
            Arc::clone(&registry),
            Arc::clone(&rooms),
            limits.session_mailbox_capacity,
        );
        Self {
            registry,
            rooms,
            queues,
            ledger,
            conn_ids: ConnIdGenerator::default(),
            limits,
        }
    }

    /// Open a session, start its queue and announce it on the venue topic.
    pub fn open_session(&self, host_id: &str, establishment_id: &str) -> ServiceResult<SessionView> {
        let session = self.registry.open(host_id, establishment_id)?;
        self.queues.start(&session);
        self.rooms.publish(
            &Topic::venue(&session.establishment_id),
            events::SESSION_STARTED,
            &session,
        );
        Ok(session)
    }

    /// Close the host's session, archive its queue and announce the end.
    pub async fn close_session(&self, host_id: &str) -> ServiceResult<SessionView> {
        let session = self.registry.close(host_id)?;
        self.queues.close(&session.id).await;
        self.rooms.publish(
            &Topic::venue(&session.establishment_id),
            events::SESSION_ENDED,
            &session,
        );
        Ok(session)
    }

    /// Run a recharge and push the new balances to the host's connections.
    pub async fn transfer(
        &self,
        host_id: &str,
        patron_id: &str,
        monto: &str,
        modo: &str,
    ) -> ServiceResult<TransferReceipt> {
        let receipt = self.ledger.transfer(host_id, patron_id, monto, modo).await?;
        self.rooms
            .publish(&Topic::host(host_id), events::WALLET_UPDATED, &receipt.wallet);
        Ok(receipt)
    }
}
