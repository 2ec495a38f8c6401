//! `sdl watch`: follow one subscription in the terminal.
//!
//! The stream core never reconnects on its own, so a closed stream ends the
//! command. Replay completion and Ctrl-C end it too.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use sdl_config::PublicEnv;
use sdl_reconcile::{GameDeltaState, StreamPhase, StreamStatus};
use sdl_schemas::{GameDelta, RuntimeConfig};
use sdl_stream::{SubscriptionController, SubscriptionKey, WsTransportFactory};
use tracing::info;

pub async fn run(env: PublicEnv, runtime: RuntimeConfig, key: SubscriptionKey, json: bool) -> Result<()> {
    let controller = SubscriptionController::new(WsTransportFactory::default(), env, runtime);
    let (handle, task) = controller.spawn();

    let applied = handle.subscribe(key.clone()).await?;
    if applied.mode != key.mode {
        eprintln!("replay disabled by runtime config; watching live");
    }

    let mut rx = handle.watch();
    let mut printer = Printer::new(json);
    loop {
        let snap = rx.borrow_and_update().clone();
        printer.print(&snap)?;
        if is_finished(&snap) {
            break;
        }

        tokio::select! {
            changed = rx.changed() => changed.context("subscription controller stopped")?,
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c received");
                break;
            }
        }
    }

    handle.shutdown().await?;
    task.await.context("controller task panicked")?;
    Ok(())
}

fn is_finished(state: &GameDeltaState) -> bool {
    state.replay_complete || state.phase == StreamPhase::Closed
}

/// Prints only what changed since the previous snapshot.
struct Printer {
    json: bool,
    status: Option<StreamStatus>,
    seen: BTreeMap<i64, GameDelta>,
}

impl Printer {
    fn new(json: bool) -> Self {
        Self {
            json,
            status: None,
            seen: BTreeMap::new(),
        }
    }

    fn print(&mut self, state: &GameDeltaState) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(state)?);
            return Ok(());
        }

        let status = state.status();
        if self.status != Some(status) {
            match &state.error {
                Some(err) => println!(
                    "[{}] error={} {}",
                    status.as_str(),
                    err.code,
                    err.message.as_deref().unwrap_or("")
                ),
                None => println!("[{}]", status.as_str()),
            }
            self.status = Some(status);
        }

        for delta in &state.deltas {
            if self.seen.get(&delta.sequence) == Some(delta) {
                continue;
            }
            println!("{}", format_delta(delta));
            self.seen.insert(delta.sequence, delta.clone());
        }
        Ok(())
    }
}

fn format_delta(delta: &GameDelta) -> String {
    let mut line = format!("#{:<5} {:<12}", delta.sequence, delta.kind);
    if let (Some(q), Some(clock)) = (delta.quarter, delta.clock.as_deref()) {
        line.push_str(&format!(" Q{q} {clock}"));
    }
    if let Some(desc) = &delta.description {
        line.push(' ');
        line.push_str(desc);
    }
    if !delta.flags.is_empty() {
        let flags: Vec<&str> = delta.flags.iter().map(String::as_str).collect();
        line.push_str(&format!(" [{}]", flags.join(",")));
    }
    line
}
