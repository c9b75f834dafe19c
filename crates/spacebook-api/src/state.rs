//! Shared application state handed to every handler

use std::sync::Arc;

use spacebook_auth::JwtService;
use spacebook_core::config::BookingConfig;
use spacebook_core::traits::{
    BookingStore, InstallmentRepository, ReservationRepository, SpaceRepository, UserRepository,
};
use spacebook_core::Clock;
use spacebook_rates::ExchangeRateCache;
use spacebook_services::{AccountService, InstallmentLedger, ReservationEngine};

/// Storage handles, one per concern
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub spaces: Arc<dyn SpaceRepository>,
    pub reservations: Arc<dyn ReservationRepository>,
    pub installments: Arc<dyn InstallmentRepository>,
    pub booking: Arc<dyn BookingStore>,
}

impl Repositories {
    /// Use one store for every concern
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + SpaceRepository
            + ReservationRepository
            + InstallmentRepository
            + BookingStore
            + 'static,
    {
        Self {
            users: store.clone(),
            spaces: store.clone(),
            reservations: store.clone(),
            installments: store.clone(),
            booking: store,
        }
    }
}

pub struct AppState {
    pub spaces: Arc<dyn SpaceRepository>,
    pub reservations: Arc<dyn ReservationRepository>,
    pub accounts: AccountService,
    pub engine: ReservationEngine,
    pub ledger: InstallmentLedger,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        rates: Arc<ExchangeRateCache>,
        jwt: Arc<JwtService>,
        booking: &BookingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts: AccountService::new(repos.users, jwt),
            engine: ReservationEngine::from_config(
                repos.booking,
                rates,
                repos.reservations.clone(),
                booking,
            ),
            ledger: InstallmentLedger::new(repos.installments, clock),
            spaces: repos.spaces,
            reservations: repos.reservations,
        }
    }
}
