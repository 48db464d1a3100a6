use clap::Parser;
use log::{info, warn};
use rand::Rng;
use server::session::ServerSession;
use shared::{MoveIntent, PLAYER_SPEED};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to host the session on
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = shared::DEFAULT_PORT)]
    port: u16,

    /// Frames per second for the tick loop
    #[arg(short, long, default_value_t = 60)]
    tick_rate: u32,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    match ServerSession::start(&args.host, args.port) {
        Ok(mut session) => run(&mut session, args.tick_rate),
        Err(e) => {
            // Degraded mode: no hosting, the local player still exists.
            warn!("{e}; continuing without a network session");
            run_offline(args.tick_rate);
        }
    }
}

/// Headless stand-in for the game loop: the host player wanders the map
/// so joined clients have something to watch.
fn run(session: &mut ServerSession, tick_rate: u32) {
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
                info!(
                    "tick {}: player {} at ({}, {})",
                    tick, player.id, player.x, player.y
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
