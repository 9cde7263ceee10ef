/// FaceitWatch — FACEIT match notifier
///
/// Co dělá:
///   1. Každých N minut stáhne historii všech sledovaných hráčů (per community)
///   2. Seskupí zápasy podle match_id → group match (3+ hráči) nebo individual
///   3. Pošle výsledek (embed) do notifikačních kanálů, zapíše seen-list
///   4. Drží ELO ledger (current + history), refresh každých 6h
///
/// Konzole (stdin): `<community> !<command> [args]`, např. `G1 !track s1mple`
///
/// Spuštění:
///   cargo run --bin faceit-watch

use anyhow::Result;
use dotenv::dotenv;
use faceit_client::FaceitClient;
use match_tracker::{
    execute, parse_line, AnyNotifier, AppState, DiscordNotifier, EngineSettings, LogNotifier,
    Reconciler, WatchConfig,
};
use std::env;
use std::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cfg = match WatchConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Configuration error: {e:#}");
            error!("Set FACEIT_API_KEY (and optionally DISCORD_TOKEN) in the environment or .env");
            return Err(e);
        }
    };

    // Single instance lock: two watchers would overwrite each other's documents
    let lock_file_path = env::temp_dir().join("faceit_watch.lock");
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance of faceit-watch is already running! Exiting.");
            return Ok(());
        }
    };

    let notifier = match &cfg.discord_token {
        Some(token) => AnyNotifier::Discord(DiscordNotifier::new(token.clone(), cfg.http_timeout)),
        None => AnyNotifier::Log(LogNotifier::new(&cfg.log_dir)),
    };

    info!("=== FaceitWatch — match notifications ===");
    info!("Delivery: {}", notifier.mode());
    info!("Game: {} (ELO fallback: {})", cfg.game, cfg.legacy_game);
    info!("Match check interval: {}s, ELO refresh: {}s", cfg.check_interval.as_secs(), cfg.elo_refresh_interval.as_secs());
    info!("State: {} + {}", cfg.tracked_players_file.display(), cfg.elo_history_file.display());

    let mut state = AppState::from_config(&cfg);
    let source = FaceitClient::new(
        cfg.api_url.clone(),
        cfg.api_key.clone(),
        cfg.http_timeout,
        cfg.min_request_gap,
        &cfg.log_dir,
    );
    let settings = EngineSettings {
        game:          cfg.game.clone(),
        legacy_game:   cfg.legacy_game.clone(),
        history_limit: cfg.history_limit,
    };
    let reconciler = Reconciler::new(source, notifier, settings, &cfg.log_dir);

    let mut match_tick = interval(cfg.check_interval);
    match_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut elo_tick = interval(cfg.elo_refresh_interval);
    elo_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut console = BufReader::new(tokio::io::stdin()).lines();
    let mut console_open = true;

    // Jeden task: pass, ELO refresh i příkazy se nikdy nepřekrývají
    loop {
        tokio::select! {
            _ = match_tick.tick() => {
                info!("--- Match check ---");
                reconciler.run_pass(&mut state).await;
            }
            _ = elo_tick.tick() => {
                info!("--- Scheduled ELO refresh ---");
                reconciler.refresh_all_elo(&mut state).await;
            }
            line = console.next_line(), if console_open => {
                match line {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => match parse_line(&line) {
                        Ok((community, command)) => {
                            let reply = execute(&reconciler, &mut state, &community, command).await;
                            println!("{}", reply.text);
                            for n in &reply.notifications {
                                println!("{}\n", n.render_text());
                            }
                        }
                        Err(e) => println!("{e}"),
                    },
                    Ok(None) => {
                        info!("Console closed, running headless");
                        console_open = false;
                    }
                    Err(e) => {
                        warn!("Console read failed: {}", e);
                        console_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                break;
            }
        }
    }

    Ok(())
}
