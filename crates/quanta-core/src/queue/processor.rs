//! Processing loop - the queue's only consumer.
//!
//! # フロー
//! 1. 先頭タスクを lock 下で clone（lock は配送中に保持しない）
//! 2. 連続失敗があれば backoff 分だけ待つ
//! 3. 配送を試行し、BackoffPolicy で Remove / Retry を判定
//! 4. Remove なら先頭を外して永続化、失敗カウンタを 0 に戻す
//! 5. 結果に関係なく短い pause を挟む
//!
//! The loop never looks past the head, so a stuck head blocks everything
//! behind it until it is delivered, exhausts its retries, or expires.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::retry::{RemovalReason, Verdict};
use super::state::LoopState;
use super::Shared;

pub(crate) async fn drain(shared: Arc<Shared>) {
    // Failures of the current head only; never persisted.
    let mut failures: u32 = 0;

    loop {
        let head = {
            let mut state = shared.state.lock().await;
            match state.tasks.front() {
                Some(task) => task.clone(),
                None => {
                    state.loop_state = LoopState::Idle;
                    shared.loop_tx.send_replace(LoopState::Idle);
                    debug!("delivery queue drained");
                    return;
                }
            }
        };

        if let Some(delay) = shared.options.policy.next_delay(failures) {
            debug!(failures, delay_ms = delay.as_millis() as u64, "backing off before retry");
            shared.clock.sleep(delay).await;
        }

        let delivered = head.attempt_delivery(&shared.context).await;
        let verdict = shared.options.policy.evaluate(
            delivered,
            failures,
            head.created_at(),
            shared.clock.now(),
        );

        match verdict {
            Verdict::Remove(reason) => {
                {
                    let mut state = shared.state.lock().await;
                    state.tasks.pop_front();
                    shared.persist_locked(&state).await;
                }
                match reason {
                    RemovalReason::Delivered => {
                        debug!(kind = %head.kind(), "task delivered");
                    }
                    RemovalReason::RetryBudgetExhausted | RemovalReason::Expired => {
                        warn!(
                            kind = %head.kind(),
                            reason = reason.as_str(),
                            failures,
                            created_at = %head.created_at(),
                            "dropping undeliverable task"
                        );
                    }
                }
                failures = 0;
            }
            Verdict::Retry { failures: next } => {
                info!(kind = %head.kind(), failures = next, "delivery attempt failed");
                failures = next;
            }
        }

        shared.clock.sleep(shared.options.pause).await;
    }
}
