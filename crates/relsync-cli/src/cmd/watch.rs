use crate::cmd::{load_config, runtime, Session};
use crate::output::print_sync_report;
use relsync_core::config::Config;
use relsync_core::sync::sync;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Sync every `interval` seconds until Ctrl-C. The config is re-read before
/// each round; a config that fails to load keeps the previous one. When the
/// store, paths, worker count or shrink settings change, the session is
/// reopened with the new values.
pub fn run(config_path: &Path, interval: u64, json: bool) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    let interval = Duration::from_secs(interval.max(1));

    runtime()?.block_on(async move {
        let cancel = CancellationToken::new();
        let mut session = open_session(&config, &cancel)?;
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("interrupted, stopping after in-flight work");
                    cancel.cancel();
                }
            }
        });

        loop {
            match load_config(config_path) {
                Ok(fresh) if !fresh.same_session(&config) => {
                    info!("session settings changed, reopening");
                    session.close().await;
                    session = match open_session(&fresh, &cancel) {
                        Ok(s) => {
                            config = fresh;
                            s
                        }
                        Err(e) => {
                            warn!(error = %format!("{e:#}"), "keeping previous config");
                            open_session(&config, &cancel)?
                        }
                    };
                }
                Ok(fresh) => config = fresh,
                Err(e) => warn!(error = %format!("{e:#}"), "keeping previous config"),
            }
            match config.releases() {
                Ok(releases) => {
                    let report = sync(releases, &session.ctx).await;
                    if let Err(e) = print_sync_report(&report, json) {
                        warn!(error = %e, "failed to print report");
                    }
                }
                Err(e) => warn!(error = %e, "invalid repo list"),
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = cancel.cancelled() => break,
            }
        }

        session.close().await;
        Ok(())
    })
}

fn open_session(config: &Config, cancel: &CancellationToken) -> anyhow::Result<Session> {
    let mut session = Session::open(config)?;
    session.ctx = session.ctx.with_cancel(cancel.clone());
    Ok(session)
}
