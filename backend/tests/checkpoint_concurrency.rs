//! Concurrent advances on one customer cursor must not lose updates.

#[expect(
    dead_code,
    reason = "Shared helpers include builders used only by other integration suites."
)]
mod support;

use loyalty_backend::domain::ports::{
    CheckpointCommand, CheckpointMoveRequest, CheckpointRepository, CustomerSubject,
};
use rstest::{fixture, rstest};
use support::Loyalty;

#[fixture]
fn loyalty() -> Loyalty {
    Loyalty::new()
}

/// Step reached after `advances` moves from the start of a `total`-step offer.
fn wrapped_step(advances: u32, total: u32) -> u32 {
    (advances - 1) % total + 1
}

#[rstest]
#[case(20, 100)]
#[case(25, 7)]
#[case(3, 1)]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_advances_are_serialised(
    loyalty: Loyalty,
    #[case] advances: u32,
    #[case] total_steps: u32,
) {
    let merchant_id = loyalty.merchant("Corner Cafe").await;
    let holder = loyalty.holder(merchant_id, "04:C0:FF:EE").await;
    let offer_id = loyalty
        .offer(merchant_id, i64::from(total_steps), &[])
        .await;

    let tasks: Vec<_> = (0..advances)
        .map(|_| {
            let checkpoints = loyalty.checkpoints.clone();
            tokio::spawn(async move {
                checkpoints
                    .advance(CheckpointMoveRequest {
                        merchant_id,
                        subject: CustomerSubject::Customer(holder.customer_id),
                        offer_id: Some(offer_id),
                    })
                    .await
                    .expect("advance")
                    .current_step
            })
        })
        .collect();
    let mut reached = Vec::with_capacity(tasks.len());
    for task in tasks {
        reached.push(task.await.expect("advance task"));
    }

    if advances <= total_steps {
        reached.sort_unstable();
        assert_eq!(reached, (1..=advances).collect::<Vec<_>>());
    }

    let cursors = loyalty
        .repos
        .checkpoints
        .cursors_for(&holder.customer_id, &merchant_id)
        .await
        .expect("cursors");
    let cursor = cursors
        .iter()
        .find(|cursor| cursor.offer_id == offer_id)
        .expect("cursor exists");
    assert_eq!(cursor.current_step, wrapped_step(advances, total_steps));

    let audit = loyalty
        .repos
        .checkpoints
        .advancements_for(&holder.customer_id, &merchant_id, 200)
        .await
        .expect("advancements");
    assert_eq!(audit.len(), usize::try_from(advances).expect("fits"));
}
