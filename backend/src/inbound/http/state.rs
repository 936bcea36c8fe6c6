//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{
    CardCommand, CardQuery, CatalogueCommand, CatalogueQuery, CheckpointCommand, LedgerCommand,
    LedgerQuery, RedemptionCommand,
};
use crate::domain::{
    CardService, CatalogueService, CheckpointService, LedgerService, RedemptionService,
    Repositories,
};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    /// Customer and card registration.
    pub cards: Arc<dyn CardCommand>,
    /// Side-effect free card checks.
    pub card_status: Arc<dyn CardQuery>,
    /// Ledger writes.
    pub ledger: Arc<dyn LedgerCommand>,
    /// Balances and history.
    pub ledger_query: Arc<dyn LedgerQuery>,
    /// Checkpoint cursor moves.
    pub checkpoints: Arc<dyn CheckpointCommand>,
    /// Points and milestone redemptions.
    pub redemptions: Arc<dyn RedemptionCommand>,
    /// Catalogue mutations.
    pub catalogue: Arc<dyn CatalogueCommand>,
    /// Catalogue reads.
    pub catalogue_query: Arc<dyn CatalogueQuery>,
}

impl HttpState {
    /// Wire every port to the domain services over one repository bundle.
    ///
    /// `history_limit` is the number of rows per section returned by
    /// `/merchant-history` when the caller does not ask for a limit.
    #[must_use]
    pub fn from_repositories(
        repos: &Repositories,
        clock: &Arc<dyn Clock>,
        history_limit: u32,
    ) -> Self {
        let cards = Arc::new(CardService::new(repos.clone(), clock.clone()));
        let ledger = Arc::new(
            LedgerService::new(repos.clone(), clock.clone())
                .with_default_history_limit(history_limit),
        );
        let catalogue = Arc::new(CatalogueService::new(repos.clone(), clock.clone()));
        Self {
            cards: cards.clone(),
            card_status: cards,
            ledger: ledger.clone(),
            ledger_query: ledger,
            checkpoints: Arc::new(CheckpointService::new(repos.clone(), clock.clone())),
            redemptions: Arc::new(RedemptionService::new(repos.clone(), clock.clone())),
            catalogue: catalogue.clone(),
            catalogue_query: catalogue,
        }
    }
}
