//! Ledger and redemption properties exercised against the in-memory store.

#[expect(
    dead_code,
    reason = "Shared helpers include builders used only by other integration suites."
)]
mod support;

use loyalty_backend::domain::ErrorCode;
use loyalty_backend::domain::ports::{
    AppendTransactionRequest, LedgerCommand, LedgerQuery, LedgerRepository, RedeemRewardRequest,
    RedemptionCommand,
};
use loyalty_backend::domain::{MerchantId, RedemptionKey, RedemptionStatus, RewardId};
use support::{Holder, Loyalty};
use rstest::{fixture, rstest};

#[fixture]
fn loyalty() -> Loyalty {
    Loyalty::new()
}

async fn append(loyalty: &Loyalty, merchant_id: MerchantId, holder: Holder, points: i64) -> i64 {
    loyalty
        .ledger
        .append_transaction(AppendTransactionRequest {
            merchant_id,
            card_id: holder.card_id,
            points,
        })
        .await
        .expect("transaction appended")
        .balance
}

async fn balance_at(loyalty: &Loyalty, merchant_id: MerchantId, holder: Holder) -> i64 {
    loyalty
        .ledger
        .balances(holder.card_id)
        .await
        .expect("balances")
        .into_iter()
        .find(|entry| entry.merchant.id == merchant_id)
        .map_or(0, |entry| entry.balance)
}

#[rstest]
#[case(&[10, 25, -5])]
#[case(&[-5, 25, 10])]
#[case(&[25, -5, 10, 100, -30])]
#[tokio::test]
async fn balance_is_the_sum_of_appended_points(loyalty: Loyalty, #[case] points: &[i64]) {
    let merchant = loyalty.merchant("Corner Cafe").await;
    let holder = loyalty.holder(merchant, "04:A2:19").await;

    let mut last = 0;
    for delta in points {
        last = append(&loyalty, merchant, holder, *delta).await;
    }

    let expected: i64 = points.iter().sum();
    assert_eq!(last, expected);
    assert_eq!(balance_at(&loyalty, merchant, holder).await, expected);
}

#[rstest]
#[tokio::test]
async fn balances_are_kept_per_merchant(loyalty: Loyalty) {
    let cafe = loyalty.merchant("Corner Cafe").await;
    let bakery = loyalty.merchant("Bakery").await;
    let holder = loyalty.holder(cafe, "04A219").await;

    append(&loyalty, cafe, holder, 40).await;
    append(&loyalty, bakery, holder, 7).await;

    assert_eq!(balance_at(&loyalty, cafe, holder).await, 40);
    assert_eq!(balance_at(&loyalty, bakery, holder).await, 7);
}

#[rstest]
#[tokio::test]
async fn association_is_created_once(loyalty: Loyalty) {
    let issuer = loyalty.merchant("Corner Cafe").await;
    let other = loyalty.merchant("Bakery").await;
    let holder = loyalty.holder(issuer, "CARD-1").await;
    let before = loyalty.store.card_merchant_count().await;

    let first = loyalty
        .ledger
        .append_transaction(AppendTransactionRequest {
            merchant_id: other,
            card_id: holder.card_id,
            points: 5,
        })
        .await
        .expect("first visit");
    let second = loyalty
        .ledger
        .append_transaction(AppendTransactionRequest {
            merchant_id: other,
            card_id: holder.card_id,
            points: 5,
        })
        .await
        .expect("second visit");

    assert!(first.association_created);
    assert!(!second.association_created);
    assert_eq!(loyalty.store.card_merchant_count().await, before + 1);
}

#[rstest]
#[tokio::test]
async fn redemption_debits_exactly_the_price(loyalty: Loyalty) {
    let merchant = loyalty.merchant("Corner Cafe").await;
    let holder = loyalty.holder(merchant, "CARD-2").await;
    let reward = loyalty.reward(merchant, "Free flat white", 150).await;
    append(&loyalty, merchant, holder, 200).await;
    let transactions = loyalty.store.transaction_count().await;

    let response = loyalty
        .redemptions
        .redeem_reward(RedeemRewardRequest {
            merchant_id: merchant,
            customer_id: holder.customer_id,
            reward_id: reward,
            points_spent: None,
            status: None,
            idempotency_key: None,
        })
        .await
        .expect("redeemed");

    assert!(!response.replayed);
    assert_eq!(response.redemption.points_spent, 150);
    assert_eq!(response.redemption.status, RedemptionStatus::Pending);
    assert_eq!(balance_at(&loyalty, merchant, holder).await, 50);
    assert_eq!(loyalty.store.transaction_count().await, transactions + 1);
    assert_eq!(loyalty.store.redemption_count().await, 1);
}

fn redeem_request(merchant_id: MerchantId, holder: Holder, reward_id: RewardId) -> RedeemRewardRequest {
    RedeemRewardRequest {
        merchant_id,
        customer_id: holder.customer_id,
        reward_id,
        points_spent: None,
        status: None,
        idempotency_key: None,
    }
}

#[rstest]
#[tokio::test]
async fn redemption_beyond_the_balance_goes_negative(loyalty: Loyalty) {
    let merchant = loyalty.merchant("Corner Cafe").await;
    let holder = loyalty.holder(merchant, "CARD-3").await;
    let reward = loyalty.reward(merchant, "Cake", 80).await;
    append(&loyalty, merchant, holder, 79).await;

    let response = loyalty
        .redemptions
        .redeem_reward(redeem_request(merchant, holder, reward))
        .await
        .expect("redeemed");

    assert_eq!(response.redemption.points_spent, 80);
    assert_eq!(balance_at(&loyalty, merchant, holder).await, -1);
    assert_eq!(loyalty.store.redemption_count().await, 1);
}

#[rstest]
#[tokio::test]
async fn redemption_at_an_unvisited_merchant_links_the_card_once(loyalty: Loyalty) {
    let cafe = loyalty.merchant("Corner Cafe").await;
    let bakery = loyalty.merchant("Bakery").await;
    let holder = loyalty.holder(cafe, "CARD-6").await;
    let croissant = loyalty.reward(bakery, "Croissant", 30).await;
    let unlinked = loyalty
        .repos
        .ledger
        .find_card_merchant(&holder.card_id, &bakery)
        .await
        .expect("lookup");
    assert!(unlinked.is_none());
    let before = loyalty.store.card_merchant_count().await;

    for _ in 0..2 {
        loyalty
            .redemptions
            .redeem_reward(redeem_request(bakery, holder, croissant))
            .await
            .expect("redeemed");
    }

    assert_eq!(loyalty.store.card_merchant_count().await, before + 1);
    assert_eq!(balance_at(&loyalty, bakery, holder).await, -60);
    assert_eq!(loyalty.store.redemption_count().await, 2);
}

#[rstest]
#[tokio::test]
async fn fresh_card_has_no_balances(loyalty: Loyalty) {
    let merchant = loyalty.merchant("Corner Cafe").await;
    let holder = loyalty.holder(merchant, "CARD-7").await;

    let balances = loyalty
        .ledger
        .balances(holder.card_id)
        .await
        .expect("balances");

    assert!(balances.is_empty());
}

#[rstest]
#[tokio::test]
async fn issued_card_is_linked_to_its_issuer(loyalty: Loyalty) {
    let issuer = loyalty.merchant("Corner Cafe").await;
    let holder = loyalty.holder(issuer, "CARD-8").await;

    let link = loyalty
        .repos
        .ledger
        .find_card_merchant(&holder.card_id, &issuer)
        .await
        .expect("lookup");

    assert!(link.is_some());
    assert_eq!(loyalty.store.card_merchant_count().await, 1);
}

#[rstest]
#[tokio::test]
async fn cross_merchant_redemption_is_not_found_and_writes_nothing(loyalty: Loyalty) {
    let cafe = loyalty.merchant("Corner Cafe").await;
    let bakery = loyalty.merchant("Bakery").await;
    let holder = loyalty.holder(cafe, "CARD-4").await;
    let bakery_reward = loyalty.reward(bakery, "Croissant", 10).await;
    append(&loyalty, cafe, holder, 100).await;
    let transactions = loyalty.store.transaction_count().await;

    let err = loyalty
        .redemptions
        .redeem_reward(RedeemRewardRequest {
            merchant_id: cafe,
            customer_id: holder.customer_id,
            reward_id: bakery_reward,
            points_spent: None,
            status: None,
            idempotency_key: None,
        })
        .await
        .expect_err("foreign reward");

    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(loyalty.store.transaction_count().await, transactions);
    assert_eq!(loyalty.store.redemption_count().await, 0);
    assert_eq!(balance_at(&loyalty, cafe, holder).await, 100);
}

#[rstest]
#[tokio::test]
async fn retried_redemption_with_the_same_key_debits_once(loyalty: Loyalty) {
    let merchant = loyalty.merchant("Corner Cafe").await;
    let holder = loyalty.holder(merchant, "CARD-5").await;
    let reward = loyalty.reward(merchant, "Muffin", 30).await;
    append(&loyalty, merchant, holder, 100).await;
    let request = || RedeemRewardRequest {
        merchant_id: merchant,
        customer_id: holder.customer_id,
        reward_id: reward,
        points_spent: Some(30),
        status: None,
        idempotency_key: Some(RedemptionKey::new("till-7-receipt-19").expect("valid key")),
    };

    let first = loyalty
        .redemptions
        .redeem_reward(request())
        .await
        .expect("first attempt");
    let retry = loyalty
        .redemptions
        .redeem_reward(request())
        .await
        .expect("retry");

    assert!(!first.replayed);
    assert!(retry.replayed);
    assert_eq!(first.redemption.id, retry.redemption.id);
    assert_eq!(balance_at(&loyalty, merchant, holder).await, 70);
    assert_eq!(loyalty.store.redemption_count().await, 1);
}
