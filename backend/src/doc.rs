//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] collects every loyalty endpoint and the response DTOs. Tenancy
//! is carried in the `x-merchant-id` header, declared here as an API key
//! scheme so Swagger UI can set it once for a session.
//!
//! The generated document is served by Swagger UI in debug builds and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use crate::inbound::http::cards::{
    CardLookupResponse, CardStatusResponse, CreateCardBody, CreateCustomerBody,
};
use crate::inbound::http::catalogue::{CustomerCatalogueResponse, MerchantCheckpointsResponse};
use crate::inbound::http::catalogue_admin::{
    CheckpointRewardBody, OfferBody, RewardBody, StepBody,
};
use crate::inbound::http::checkpoints::{
    AdvanceResponse, CheckpointMoveBody, RedeemCheckpointRewardBody, RewindResponse,
};
use crate::inbound::http::dto::{
    AdvancementResponse, CardResponse, CheckpointRedemptionResponse, CheckpointRewardResponse,
    CustomerResponse, MerchantResponse, OfferResponse, OfferWithStepsResponse, ProgressResponse,
    RedemptionResponse, RewardResponse, RewardSummaryResponse, StepResponse, TransactionResponse,
};
use crate::inbound::http::health::ProbeBody;
use crate::inbound::http::ledger::{
    AppendTransactionBody, AppendedTransactionResponse, MerchantBalanceResponse,
    MerchantCatalogueResponse, MerchantDetailsResponse, MerchantHistoryResponse,
};
use crate::inbound::http::merchant::MERCHANT_ID_HEADER;
use crate::inbound::http::redemptions::RedeemRewardBody;
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Register the merchant header as a security scheme.
struct MerchantHeaderAddon;

impl Modify for MerchantHeaderAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "MerchantHeader",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                MERCHANT_ID_HEADER,
                "Identifier of the merchant acting on the request.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&MerchantHeaderAddon),
    info(
        title = "Loyalty backend API",
        description = "Points ledger, checkpoint journeys and reward redemption for merchants.",
        license(name = "ISC", url = "https://opensource.org/license/isc-license-txt")
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::cards::create_customer,
        crate::inbound::http::cards::lookup_card,
        crate::inbound::http::cards::create_card,
        crate::inbound::http::cards::card_status,
        crate::inbound::http::ledger::balance,
        crate::inbound::http::ledger::append_transaction,
        crate::inbound::http::ledger::list_merchants,
        crate::inbound::http::ledger::merchant_details,
        crate::inbound::http::ledger::merchant_history,
        crate::inbound::http::redemptions::redeem_reward,
        crate::inbound::http::checkpoints::advance,
        crate::inbound::http::checkpoints::rewind,
        crate::inbound::http::checkpoints::redeem_checkpoint_reward,
        crate::inbound::http::catalogue::rewards_and_checkpoints,
        crate::inbound::http::catalogue::merchant_rewards,
        crate::inbound::http::catalogue::merchant_checkpoints,
        crate::inbound::http::catalogue_admin::create_offer,
        crate::inbound::http::catalogue_admin::update_offer,
        crate::inbound::http::catalogue_admin::delete_offer,
        crate::inbound::http::catalogue_admin::set_step,
        crate::inbound::http::catalogue_admin::clear_step,
        crate::inbound::http::catalogue_admin::create_checkpoint_reward,
        crate::inbound::http::catalogue_admin::update_checkpoint_reward,
        crate::inbound::http::catalogue_admin::delete_checkpoint_reward,
        crate::inbound::http::catalogue_admin::create_reward,
        crate::inbound::http::catalogue_admin::update_reward,
        crate::inbound::http::catalogue_admin::delete_reward,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        ProbeBody,
        CreateCustomerBody,
        CreateCardBody,
        CardLookupResponse,
        CardStatusResponse,
        AppendTransactionBody,
        AppendedTransactionResponse,
        MerchantBalanceResponse,
        MerchantCatalogueResponse,
        MerchantDetailsResponse,
        MerchantHistoryResponse,
        RedeemRewardBody,
        CheckpointMoveBody,
        RedeemCheckpointRewardBody,
        AdvanceResponse,
        RewindResponse,
        CustomerCatalogueResponse,
        MerchantCheckpointsResponse,
        OfferBody,
        StepBody,
        CheckpointRewardBody,
        RewardBody,
        MerchantResponse,
        CustomerResponse,
        CardResponse,
        TransactionResponse,
        ProgressResponse,
        RewardSummaryResponse,
        OfferResponse,
        StepResponse,
        OfferWithStepsResponse,
        CheckpointRewardResponse,
        RewardResponse,
        RedemptionResponse,
        CheckpointRedemptionResponse,
        AdvancementResponse,
    )),
    tags(
        (name = "cards", description = "Customers, cards and merchant associations"),
        (name = "ledger", description = "Points balances and history"),
        (name = "redemptions", description = "Points-priced reward redemption"),
        (name = "checkpoints", description = "Checkpoint journeys and milestone rewards"),
        (name = "catalogue", description = "Reward and offer catalogues"),
        (name = "catalogue-admin", description = "Merchant catalogue management"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
