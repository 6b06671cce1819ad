use std::time::Duration;

use bingo_host::card_gen::CardGenerator;
use bingo_host::env::Settings;
use bingo_host::exception::{GameResult, Notice};
use bingo_host::game::{winner::share_count, DrawOutcome};
use bingo_host::pattern::Pattern;
use bingo_host::storage::LocalStore;
use bingo_host::unit::NewParticipant;
use bingo_host::{BingoHost, LogExt, LoggerManager};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

// main
#[derive(Parser)]
#[command(
    name = "bingo host",                      // 프로그램 이름
    author = env!("CARGO_PKG_AUTHORS"),       // 작성자
    version = env!("CARGO_PKG_VERSION"),      // 버전
    about = env!("CARGO_PKG_DESCRIPTION"),    // 짧은 설명
    long_about = None,
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print freshly generated cards
    Card {
        #[arg(long, default_value_t = 1)]
        count: usize,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run an offline game with generated participants
    Play {
        #[arg(long, default_value_t = 10)]
        participants: usize,
        #[arg(long, default_value_t = 1)]
        cards: usize,
        #[arg(long, value_enum, default_value_t = Pattern::FullCard)]
        pattern: Pattern,
        #[arg(long, default_value_t = 1)]
        rounds: u32,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Keep the local roster in sync with the remote store until Ctrl-C
    Sync,
}

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn print_cards(count: usize, seed: Option<u64>) {
    let mut rng = rng_from(seed);
    for card in CardGenerator::new().generate_cards(&mut rng, count) {
        println!("{}\n{}", card.get_id(), card);
    }
}

fn play(
    settings: &Settings,
    participants: usize,
    cards: usize,
    pattern: Pattern,
    rounds: u32,
    seed: Option<u64>,
) -> Result<(), Notice> {
    let mut rng = rng_from(seed);
    let mut host = BingoHost::new(settings.game.title.clone(), settings.game.subtitle.clone());

    for n in 1..=rounds {
        host.add_prize(format!("Prize {}", n), "");
    }
    for i in 1..=participants {
        host.register_participant(
            NewParticipant {
                name: format!("Player {}", i),
                external_id: format!("{:08}", i),
                ..Default::default()
            },
            cards,
            &mut rng,
        )?;
    }

    for _ in 0..rounds {
        host.select_pattern(pattern)?;
        let winners = loop {
            match host.draw_ball(&mut rng)? {
                DrawOutcome::NoWinner { .. } => continue,
                DrawOutcome::Winners { winners, .. } => break winners,
            }
        };

        let drawn = host.game().state().drawn_balls.len();
        for winner in &winners {
            println!(
                "Round {}: {} wins {} after {} balls ({}, 1/{})",
                winner.round,
                winner.participant_name(),
                winner.prize_name.as_deref().unwrap_or("-"),
                drawn,
                winner.winning_pattern,
                share_count(&winners, winner)
            );
        }
        host.confirm_round()?;
    }

    println!("\n{} - history", host.title());
    for line in &host.game().state().history {
        println!("  {}", line);
    }
    Ok(())
}

async fn run_sync(settings: &Settings) -> GameResult<()> {
    let store = LocalStore::open(&settings.game.data_dir)?;
    let mut host = BingoHost::load(&store, settings);

    if !host.connect(settings)? {
        warn!("no remote endpoint configured (APP__REMOTE__ENDPOINT)");
        return Ok(());
    }

    let _ = host
        .pull()
        .await
        .log_ok(|outcome| info!("initial pull: {:?}", outcome))
        .log_err(|e| warn!("initial pull failed: {}", e));
    host.drain_sync_log();

    let shutdown = CancellationToken::new();
    let Some(polling) = host.spawn_polling(shutdown.clone()) else {
        info!("auto sync is off, single pull done");
        return host.save(&store);
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                if host.drain_sync_log() > 0 {
                    let _ = host
                        .save(&store)
                        .log_err(|e| error!("saving state failed: {}", e));
                }
            }
        }
    }

    shutdown.cancel();
    let _ = polling.await;
    host.flush().await;
    host.drain_sync_log();
    host.save(&store)
}

#[tokio::main]
async fn main() -> GameResult<()> {
    // 1. 환경변수 로드
    dotenv::dotenv().ok();
    let args = Args::parse();

    // 2. 설정 파일 로드
    let settings = Settings::new()?;

    // 3. 로거 초기화
    let _logger_manager = LoggerManager::setup(&settings);

    match args.command {
        Command::Card { count, seed } => print_cards(count, seed),
        Command::Play {
            participants,
            cards,
            pattern,
            rounds,
            seed,
        } => {
            if let Err(notice) = play(&settings, participants, cards, pattern, rounds, seed) {
                warn!("game stopped: {}", notice);
            }
        }
        Command::Sync => run_sync(&settings).await?,
    }
    Ok(())
}
