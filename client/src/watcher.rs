use crate::wallet::Ledger;
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, trace};

/// Periodically refreshes a balance for display.
///
/// Failed refreshes are retried on the next tick and never clear the last
/// known value. The values published here are not used to settle plays.
pub struct BalanceWatcher {
    receiver: watch::Receiver<Option<u64>>,
    handle: JoinHandle<()>,
}

impl BalanceWatcher {
    pub fn spawn<L: Ledger>(ledger: L, address: Pubkey, period: Duration) -> Self {
        let (sender, receiver) = watch::channel(None);
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if sender.is_closed() {
                    break;
                }
                match ledger.balance(&address).await {
                    Ok(balance) => {
                        let changed = sender.send_if_modified(|current| {
                            if *current == Some(balance) {
                                return false;
                            }
                            *current = Some(balance);
                            true
                        });
                        if changed {
                            trace!(%address, balance, "balance updated");
                        }
                    }
                    Err(err) => debug!(%address, ?err, "balance refresh failed"),
                }
            }
        });
        Self { receiver, handle }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<u64>> {
        self.receiver.clone()
    }

    /// Last observed balance.
    pub fn latest(&self) -> Option<u64> {
        *self.receiver.borrow()
    }
}

impl Drop for BalanceWatcher {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
