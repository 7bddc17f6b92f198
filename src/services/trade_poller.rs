use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use serde::Serialize;
use tokio::time::sleep;

use crate::engine::{feed, orchestrator};
use crate::AppState;

/// Outcome of one polling pass. The latest report is kept in shared state
/// for `GET /api/poll/status`; the manual trigger returns it directly.
#[derive(Debug, Clone, Serialize)]
pub struct PollReport {
    pub completed_at: DateTime<Utc>,
    pub accounts_attempted: usize,
    pub accounts_succeeded: usize,
    pub new_trades: usize,
    pub copy_trades_created: usize,
}

/// One pass over every master account that currently holds a session
/// token: fetch the trade book, ingest through the dedup filter, fan new
/// trades out to followers. A failing account costs this cycle only; the
/// pass always visits every account.
pub async fn run_poll_cycle(state: &AppState) -> PollReport {
    let started = std::time::Instant::now();

    let accounts = match state.store.accounts_with_tokens().await {
        Ok(accounts) => accounts,
        Err(e) => {
            tracing::error!(error = %e, "Poll cycle: could not list pollable accounts");
            Vec::new()
        }
    };

    // One follower snapshot per cycle; consent stays per-trade fresh
    // inside the orchestrator.
    let followers = match state.store.list_followers().await {
        Ok(followers) => followers,
        Err(e) => {
            tracing::error!(error = %e, "Poll cycle: could not list followers");
            Vec::new()
        }
    };

    let mut report = PollReport {
        completed_at: Utc::now(),
        accounts_attempted: 0,
        accounts_succeeded: 0,
        new_trades: 0,
        copy_trades_created: 0,
    };

    for account in &accounts {
        report.accounts_attempted += 1;

        let token = match state.store.get_access_token(account).await {
            Ok(Some(token)) => token,
            Ok(None) => {
                tracing::debug!(account = %account, "Token removed mid-cycle — skipping");
                continue;
            }
            Err(e) => {
                tracing::error!(error = %e, account = %account, "Token lookup failed");
                continue;
            }
        };

        let raw_trades = match state.upstream.fetch_trades(account, &token).await {
            Ok(trades) => trades,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    account = %account,
                    "Trade book fetch failed — skipping account this cycle"
                );
                counter!("upstream_failures_total").increment(1);
                continue;
            }
        };

        let fresh = match feed::ingest(state.store.as_ref(), account, raw_trades).await {
            Ok(fresh) => fresh,
            Err(e) => {
                tracing::error!(error = %e, account = %account, "Trade ingest failed");
                continue;
            }
        };

        report.accounts_succeeded += 1;
        report.new_trades += fresh.len();
        counter!("master_trades_ingested_total").increment(fresh.len() as u64);

        for trade in &fresh {
            let created = orchestrator::replicate(state.store.as_ref(), trade, &followers).await;
            report.copy_trades_created += created.len();
        }
    }

    report.completed_at = Utc::now();
    counter!("poll_cycles_total").increment(1);
    gauge!("followers_registered").set(followers.len() as f64);
    histogram!("poll_cycle_seconds").record(started.elapsed().as_secs_f64());

    if report.new_trades > 0 {
        tracing::info!(
            accounts = report.accounts_attempted,
            new_trades = report.new_trades,
            copy_trades = report.copy_trades_created,
            "Poll cycle: replicated {} new master trades",
            report.new_trades
        );
    } else {
        tracing::debug!(
            accounts = report.accounts_attempted,
            "Poll cycle: no new trades"
        );
    }

    *state.last_cycle.write().await = Some(report.clone());
    report
}

/// Background polling loop. `POST /api/poll` runs the same
/// `run_poll_cycle`, so a manual trigger and the schedule can never
/// disagree about dedup or fan-out behavior.
pub async fn run_trade_poller(state: AppState, interval_secs: u64) {
    tracing::info!(interval_secs = interval_secs, "Trade poller started");

    loop {
        sleep(Duration::from_secs(interval_secs)).await;
        run_poll_cycle(&state).await;
    }
}
