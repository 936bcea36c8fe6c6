//! HTTP inbound adapter exposing REST endpoints.

pub mod cards;
pub mod catalogue;
pub mod catalogue_admin;
pub mod checkpoints;
pub mod dto;
pub mod error;
pub mod health;
pub mod idempotency;
pub mod ledger;
pub mod merchant;
pub mod redemptions;
pub mod schemas;
pub mod state;
pub mod validation;

use actix_web::web;

pub use error::ApiResult;

/// Register every loyalty endpoint and the JSON/query error handlers.
///
/// Health probes are registered separately so they can be mounted without
/// application state.
///
/// # Examples
/// ```
/// use actix_web::App;
/// use loyalty_backend::inbound::http::configure;
///
/// let _app = App::new().configure(configure);
/// ```
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default().error_handler(|err, req| error::payload_error(err, req)),
    )
    .app_data(web::QueryConfig::default().error_handler(|err, req| error::payload_error(err, req)))
    .service(cards::create_customer)
    .service(cards::card_status)
    .service(cards::lookup_card)
    .service(cards::create_card)
    .service(ledger::balance)
    .service(ledger::append_transaction)
    .service(ledger::list_merchants)
    .service(ledger::merchant_details)
    .service(ledger::merchant_history)
    .service(redemptions::redeem_reward)
    .service(checkpoints::advance)
    .service(checkpoints::rewind)
    .service(checkpoints::redeem_checkpoint_reward)
    .service(catalogue::rewards_and_checkpoints)
    .service(catalogue::merchant_rewards)
    .service(catalogue::merchant_checkpoints)
    .service(catalogue_admin::create_offer)
    .service(catalogue_admin::update_offer)
    .service(catalogue_admin::delete_offer)
    .service(catalogue_admin::set_step)
    .service(catalogue_admin::clear_step)
    .service(catalogue_admin::create_checkpoint_reward)
    .service(catalogue_admin::update_checkpoint_reward)
    .service(catalogue_admin::delete_checkpoint_reward)
    .service(catalogue_admin::create_reward)
    .service(catalogue_admin::update_reward)
    .service(catalogue_admin::delete_reward);
}
