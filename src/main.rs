use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;

use roomhunt::{
    load_mesh_file, replay, GameState, PendingAsset, ReplayOptions, Script, SharedHud,
    SoftCapture, TriangleMesh, WorldConfig,
};

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

fn run() -> Result<()> {
    let options = CliOptions::parse(env::args().skip(1))?;
    let config = match &options.world {
        Some(path) => {
            let xml = fs::read_to_string(path)
                .with_context(|| format!("failed to read world {}", path.display()))?;
            WorldConfig::from_xml(&xml)
                .with_context(|| format!("failed to parse world {}", path.display()))?
        }
        None => WorldConfig::default(),
    };

    let hud = SharedHud::new();
    let mut game = GameState::new(config, Box::new(SoftCapture::new()), Box::new(hud.clone()))
        .context("invalid room layout")?;
    print_layout(&game);

    if options.summary_only {
        return Ok(());
    }

    let script = match &options.script {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read script {}", path.display()))?;
            Script::parse(&text)
                .with_context(|| format!("failed to parse script {}", path.display()))?
        }
        None => Script::default(),
    };

    // Both models load in the background; the world is handed over first so
    // the player is standing before the target appears.
    let room = options.room.clone().map(|path| pending_mesh("room", path));
    let target = options.target.clone().map(|path| pending_mesh("target", path));
    game.on_world_loaded(match room {
        Some(room) => room.wait(),
        None => Ok(TriangleMesh::unit_cube()),
    });
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    game.on_target_loaded(target.map_or(Ok(None), |t| t.wait().map(Some)), &mut rng);

    if let Some(target) = game.target() {
        println!(
            "Target hidden at ({:.2}, {:.2}, {:.2})",
            target.position.x, target.position.y, target.position.z
        );
    }

    let report = replay::run(&mut game, &script, &ReplayOptions::default());
    println!("{report}");

    let text = hud.snapshot();
    if let Some(banner) = text.banner {
        println!("{banner}");
    }
    if let Some(status) = text.status {
        println!("Status: {status}");
    }
    Ok(())
}

/// Loads `path` on a worker thread.
fn pending_mesh(name: &str, path: PathBuf) -> PendingAsset<TriangleMesh> {
    PendingAsset::spawn(name, move || load_mesh_file(&path))
}

fn print_layout(game: &GameState) {
    let layout = game.layout();
    println!(
        "Loaded world with {} rooms (wall margin {:.2})",
        layout.rooms().len(),
        layout.wall_margin()
    );
    for room in layout.rooms() {
        match room.doorway() {
            Some(door) => println!(
                " - {} {} doorway {} [{:.2}, {:.2}]",
                room.name(),
                room.bounds(),
                door.wall,
                door.min,
                door.max
            ),
            None => println!(" - {} {}", room.name(), room.bounds()),
        }
    }
    println!(
        "Session length {}s, {} target spots",
        game.session().duration().as_secs(),
        game.config().target_candidates.len()
    );
}

#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    world: Option<PathBuf>,
    room: Option<PathBuf>,
    target: Option<PathBuf>,
    script: Option<PathBuf>,
    seed: Option<u64>,
    summary_only: bool,
}

const USAGE: &str = "Usage: roomhunt [--world <world.xml>] [--room <room.obj>] \
[--target <target.obj>] [--script <script.txt>] [--seed <n>] [--summary-only]";

impl CliOptions {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| anyhow!("{flag} expects a value. {USAGE}"))
            };
            match arg.as_str() {
                "--world" => options.world = Some(value("--world")?.into()),
                "--room" => options.room = Some(value("--room")?.into()),
                "--target" => options.target = Some(value("--target")?.into()),
                "--script" => options.script = Some(value("--script")?.into()),
                "--seed" => {
                    let raw = value("--seed")?;
                    let seed = raw
                        .parse()
                        .with_context(|| format!("invalid --seed value `{raw}`"))?;
                    options.seed = Some(seed);
                }
                "--summary-only" => options.summary_only = true,
                other => return Err(anyhow!("Unknown argument: {other}. {USAGE}")),
            }
        }
        Ok(options)
    }
}
