use analysis::AnalysisSnapshot;
use std::future::Future;
use tokio::sync::watch;

/// How [`follow`] ended.
#[derive(Debug)]
pub enum Followed {
    Settled(AnalysisSnapshot),
    Interrupted,
}

/// Calls `on_update` for every snapshot seen until the analysis reaches a
/// terminal state or `interrupt` resolves.
///
/// `interrupt` is created once by the caller and polled across iterations,
/// e.g. a single `tokio::signal::ctrl_c()`.
pub async fn follow<F: Future>(
    updates: &mut watch::Receiver<AnalysisSnapshot>,
    interrupt: F,
    mut on_update: impl FnMut(&AnalysisSnapshot),
) -> Followed {
    tokio::pin!(interrupt);

    loop {
        let snap = updates.borrow_and_update().clone();
        on_update(&snap);
        if snap.state.is_terminal() {
            return Followed::Settled(snap);
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    // machine dropped; whatever it published last is final
                    return Followed::Settled(updates.borrow().clone());
                }
            }
            _ = &mut interrupt => return Followed::Interrupted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis::AnalysisState;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio::time::sleep;

    fn at(progress: u8, state: AnalysisState) -> AnalysisSnapshot {
        AnalysisSnapshot {
            state,
            progress,
            ..AnalysisSnapshot::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_settles_on_terminal_state() {
        let (tx, mut rx) = watch::channel(at(5, AnalysisState::Analyzing));
        let (_stop, interrupt) = oneshot::channel::<()>();

        tokio::spawn(async move {
            for progress in [20, 60] {
                sleep(Duration::from_secs(3)).await;
                tx.send_replace(at(progress, AnalysisState::Analyzing));
            }
            sleep(Duration::from_secs(3)).await;
            tx.send_replace(at(100, AnalysisState::Complete));
        });

        let mut seen = Vec::new();
        let outcome = follow(&mut rx, interrupt, |snap| seen.push(snap.progress)).await;

        match outcome {
            Followed::Settled(snap) => assert_eq!(snap.state, AnalysisState::Complete),
            Followed::Interrupted => panic!("expected the analysis to settle"),
        }
        assert_eq!(seen, vec![5, 20, 60, 100]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_interrupt_survives_many_updates() {
        let (tx, mut rx) = watch::channel(at(5, AnalysisState::Analyzing));
        let (stop, interrupt) = oneshot::channel::<()>();

        tokio::spawn(async move {
            for progress in 10..20 {
                sleep(Duration::from_secs(3)).await;
                tx.send_replace(at(progress, AnalysisState::Analyzing));
            }
            sleep(Duration::from_secs(3)).await;
            let _ = stop.send(());
            // keep the channel open so only the interrupt can end the loop
            sleep(Duration::from_secs(3600)).await;
            drop(tx);
        });

        let mut updates = 0;
        let outcome = follow(&mut rx, interrupt, |_| updates += 1).await;

        assert!(matches!(outcome, Followed::Interrupted));
        assert_eq!(updates, 11);
    }

    #[tokio::test]
    async fn test_closed_channel_returns_last_snapshot() {
        let (tx, mut rx) = watch::channel(at(40, AnalysisState::Analyzing));
        drop(tx);

        let outcome = follow(&mut rx, std::future::pending::<()>(), |_| {}).await;

        match outcome {
            Followed::Settled(snap) => assert_eq!(snap.progress, 40),
            Followed::Interrupted => panic!("a closed channel is not an interrupt"),
        }
    }
}
