use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use nebula_sim::ScenePreset;
use std::io;

/// Ambient particle-sphere animation
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
  /// Scene preset to display
  #[arg(short, long, value_enum, default_value_t = Scene::Welcome)]
  scene: Scene,
  /// Override the particle count
  #[arg(short, long)]
  count: Option<u32>,
  /// Run without a window for the given number of ticks (0 = until Ctrl-C)
  #[arg(long, value_name = "TICKS")]
  headless: Option<u64>,
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(ValueEnum, Copy, Clone, Debug)]
enum Scene {
  Welcome,
  Portfolio,
  Contact,
}

impl From<Scene> for ScenePreset {
  fn from(scene: Scene) -> Self {
    match scene {
      Scene::Welcome => ScenePreset::Welcome,
      Scene::Portfolio => ScenePreset::Portfolio,
      Scene::Contact => ScenePreset::Contact,
    }
  }
}

#[derive(Subcommand, Debug)]
enum Commands {
  /// Generate shell completion scripts
  Completions {
    /// The shell to generate the script for
    #[arg(value_enum)]
    shell: Shell,
  },
}

fn main() {
  let args = Args::parse();

  if let Some(Commands::Completions { shell }) = args.command {
    let mut cmd = Args::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
    return;
  }

  if let Err(e) = nebula_sim::state::run(args.scene.into(), args.count, args.headless) {
    eprintln!("error: {e}");
    std::process::exit(1);
  }
}
