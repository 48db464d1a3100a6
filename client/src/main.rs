use clap::Parser;
use client::session::ClientSession;
use log::{info, warn};
use rand::Rng;
use shared::{MoveIntent, PLAYER_SPEED};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host to join
    #[arg(short = 's', long, default_value = "127.0.0.1")]
    server: String,

    /// Server port
    #[arg(short, long, default_value_t = shared::DEFAULT_PORT)]
    port: u16,

    /// Frames per second for the tick loop
    #[arg(short, long, default_value_t = 60)]
    tick_rate: u32,
}

fn main() {
    env_logger::init();
    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    match ClientSession::connect(&args.server, args.port) {
        Ok(mut session) => run(&mut session, args.tick_rate),
        Err(e) => {
            // Local-only mode: the game goes on, nobody else appears.
            warn!("{e}; continuing in local-only mode");
            run_offline(args.tick_rate);
        }
    }
}

/// Headless stand-in for the game loop: wanders the map and logs what
/// the registry knows about the other players.
fn run(session: &mut ClientSession, tick_rate: u32) {
    let frame = frame_duration(tick_rate);
    let mut rng = rand::thread_rng();
    let mut heading = MoveIntent::new(PLAYER_SPEED, 0);
    let mut tick: u64 = 0;

    loop {
        let start = Instant::now();

        if rng.gen_ratio(1, 30) {
            heading = random_heading(&mut rng);
        }
        session.tick(heading);

        tick += 1;
        if tick % 120 == 0 {
            for player in session.registry().active_players() {
                let tag = if player.id == session.local_id() {
                    " (you)"
                } else {
                    ""
                };
                info!(
                    "tick {}: player {}{} at ({}, {})",
                    tick, player.id, tag, player.x, player.y
                );
            }
        }

        pace(start, frame);
    }
}

fn run_offline(tick_rate: u32) {
    let frame = frame_duration(tick_rate);
    let mut registry = shared::PlayerRegistry::new(0);
    let mut rng = rand::thread_rng();
    let mut heading = MoveIntent::new(PLAYER_SPEED, 0);

    loop {
        let start = Instant::now();
        if rng.gen_ratio(1, 30) {
            heading = random_heading(&mut rng);
        }
        if let Err(e) = registry.apply_movement(0, heading.dx, heading.dy) {
            warn!("movement dropped: {e}");
        }
        pace(start, frame);
    }
}

fn frame_duration(tick_rate: u32) -> Duration {
    Duration::from_millis(1000 / u64::from(tick_rate.max(1)))
}

fn random_heading(rng: &mut impl Rng) -> MoveIntent {
    let steps = [-PLAYER_SPEED, 0, PLAYER_SPEED];
    MoveIntent::new(steps[rng.gen_range(0..3)], steps[rng.gen_range(0..3)])
}

fn pace(start: Instant, frame: Duration) {
    let elapsed = start.elapsed();
    if elapsed < frame {
        thread::sleep(frame - elapsed);
    }
}
