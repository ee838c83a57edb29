//! Polyomino Placement Game
//!
//! Plays the two-tier packing game in the terminal, and builds or checks
//! static puzzle libraries with the same shape canonicalizer the game uses.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use polyfit::library::{generate_library, Library};
use polyfit::persistence::{load_session, save_session, FileStore, SAVE_KEY};
use polyfit::render::{format_session, format_shape};
use polyfit::session::{PlaceOutcome, TurnReport};
use polyfit::{Cell, GameConfig, GameSession, Orientation, PieceType, PuzzleRef, RuleSet, Tier};

/// Fill procedurally generated polyomino boards from a hand of pieces.
#[derive(Parser)]
#[command(name = "polyfit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file overriding the reference configuration.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Play in the terminal, resuming the saved game if there is one.
    Play {
        #[arg(long, default_value = ".polyfit")]
        save_dir: PathBuf,
        #[arg(long)]
        seed: Option<u64>,
        /// Use the advanced rule set.
        #[arg(long)]
        advanced: bool,
        /// Ignore any saved game.
        #[arg(long)]
        new: bool,
    },
    /// Generate a deduplicated puzzle library as JSON.
    Generate {
        #[arg(long, default_value_t = 15)]
        tier1: usize,
        #[arg(long, default_value_t = 25)]
        tier2: usize,
        #[arg(long)]
        seed: Option<u64>,
        /// Output file; stdout if omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check a puzzle library for equivalent shapes.
    Validate { path: PathBuf },
    /// Print the saved game.
    ShowSave {
        #[arg(long, default_value = ".polyfit")]
        save_dir: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Play {
            save_dir,
            seed,
            advanced,
            new,
        }) => {
            let config = load_config(cli.config.as_deref(), advanced)?;
            run_play(config, &save_dir, seed, new)?;
        }
        None => {
            let config = load_config(cli.config.as_deref(), false)?;
            run_play(config, Path::new(".polyfit"), None, false)?;
        }
        Some(Command::Generate {
            tier1,
            tier2,
            seed,
            out,
        }) => {
            let config = load_config(cli.config.as_deref(), false)?;
            run_generate(&config, tier1, tier2, seed, out.as_deref())?;
        }
        Some(Command::Validate { path }) => return run_validate(&path),
        Some(Command::ShowSave { save_dir }) => {
            let config = load_config(cli.config.as_deref(), false)?;
            run_show_save(config, &save_dir);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Reference configuration, a config file, and optionally the advanced rules.
fn load_config(path: Option<&Path>, advanced: bool) -> Result<GameConfig> {
    let mut config = match path {
        Some(path) => GameConfig::from_json_file(path)?,
        None => GameConfig::default(),
    };
    if advanced {
        config.rules = RuleSet::advanced();
    }
    config.validate()?;
    Ok(config)
}

/// Writes a fresh library to `out` or stdout.
fn run_generate(
    config: &GameConfig,
    tier1: usize,
    tier2: usize,
    seed: Option<u64>,
    out: Option<&Path>,
) -> Result<()> {
    let seed = seed.unwrap_or_else(rand::random);
    let library = generate_library(config, tier1, tier2, seed);
    let json = library.to_json()?;
    match out {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("cannot write {}", path.display()))?;
            eprintln!(
                "Wrote {} tier 1 and {} tier 2 puzzles to {}",
                library.tier1.len(),
                library.tier2.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Prints duplicates per tier; fails if any were found.
fn run_validate(path: &Path) -> Result<ExitCode> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let library = Library::from_json(&contents)
        .with_context(|| format!("{} is not a puzzle library", path.display()))?;

    let mut clean = true;
    for (tier, duplicates) in library.validate() {
        println!("Tier {}: {} puzzles", tier.number(), library.entries(tier).len());
        if duplicates.is_empty() {
            println!("  no duplicates");
        }
        for duplicate in duplicates {
            clean = false;
            println!(
                "  puzzle {} duplicates puzzle {}",
                duplicate.index, duplicate.duplicate_of
            );
        }
    }
    Ok(if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_show_save(config: GameConfig, save_dir: &Path) {
    let store = FileStore::new(save_dir);
    match load_session(&store, config, 0) {
        Some(session) => print!("{}", format_session(&session)),
        None => eprintln!("No saved game in {}.", save_dir.display()),
    }
}

const HELP: &str = "\
commands:
  place <hand> <tier> <puzzle> <row> <col> [rotation] [m]
  move <tier> <puzzle> <piece> <to-tier> <to-puzzle> <row> <col> [rotation] [m]
  sacrifice <hand> <hand> <hand>
  shape <piece> [rotation] [m]
  undo | show | save | help | quit";

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Place {
        hand: usize,
        target: PuzzleRef,
        orientation: Orientation,
        drop: Cell,
    },
    Move {
        from: PuzzleRef,
        placed: usize,
        to: PuzzleRef,
        orientation: Orientation,
        drop: Cell,
    },
    Sacrifice([usize; 3]),
    Shape(PieceType, Orientation),
    Undo,
    Show,
    Save,
    Help,
    Quit,
}

fn parse_number<T: std::str::FromStr>(word: Option<&str>, what: &str) -> Result<T> {
    let Some(word) = word else {
        bail!("missing {what}");
    };
    word.parse()
        .map_err(|_| anyhow::anyhow!("{what} must be a number, got {word:?}"))
}

fn parse_tier(word: Option<&str>) -> Result<Tier> {
    let number: u8 = parse_number(word, "tier")?;
    Tier::try_from(number).map_err(anyhow::Error::msg)
}

fn parse_orientation<'a>(mut rest: impl Iterator<Item = &'a str>) -> Result<Orientation> {
    let rotation = match rest.next() {
        None => return Ok(Orientation::IDENTITY),
        Some("m") => return Ok(Orientation::new(0, true)),
        Some(word) => parse_number(Some(word), "rotation")?,
    };
    let mirror = match rest.next() {
        None => false,
        Some("m") => true,
        Some(word) => bail!("expected `m` for mirror, got {word:?}"),
    };
    Ok(Orientation::new(rotation, mirror))
}

/// Parses one input line. Blank lines yield `None`.
fn parse_action(line: &str) -> Result<Option<Action>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let action = match verb {
        "place" | "p" => {
            let hand = parse_number(words.next(), "hand index")?;
            let tier = parse_tier(words.next())?;
            let index = parse_number(words.next(), "puzzle index")?;
            let row = parse_number(words.next(), "row")?;
            let col = parse_number(words.next(), "column")?;
            Action::Place {
                hand,
                target: PuzzleRef::new(tier, index),
                orientation: parse_orientation(words)?,
                drop: Cell::new(row, col),
            }
        }
        "move" | "mv" => {
            let from_tier = parse_tier(words.next())?;
            let from_index = parse_number(words.next(), "puzzle index")?;
            let placed = parse_number(words.next(), "piece index")?;
            let to_tier = parse_tier(words.next())?;
            let to_index = parse_number(words.next(), "puzzle index")?;
            let row = parse_number(words.next(), "row")?;
            let col = parse_number(words.next(), "column")?;
            Action::Move {
                from: PuzzleRef::new(from_tier, from_index),
                placed,
                to: PuzzleRef::new(to_tier, to_index),
                orientation: parse_orientation(words)?,
                drop: Cell::new(row, col),
            }
        }
        "sacrifice" | "s" => {
            let mut picks = [0; 3];
            for pick in &mut picks {
                *pick = parse_number(words.next(), "hand index")?;
            }
            Action::Sacrifice(picks)
        }
        "shape" => {
            let Some(name) = words.next() else {
                bail!("missing piece name");
            };
            let piece = name.parse().map_err(anyhow::Error::msg)?;
            Action::Shape(piece, parse_orientation(words)?)
        }
        "undo" | "u" => Action::Undo,
        "show" => Action::Show,
        "save" => Action::Save,
        "help" | "?" => Action::Help,
        "quit" | "q" | "exit" => Action::Quit,
        other => bail!("unknown command {other:?}, try `help`"),
    };
    Ok(Some(action))
}

fn report_turn(turn: &TurnReport) {
    for id in &turn.expired {
        println!("{id} expired");
    }
    if turn.hand_expired > 0 {
        println!("{} hand piece(s) expired", turn.hand_expired);
    }
    for piece in &turn.dropped {
        println!("hand full, lost {piece}");
    }
}

fn report_placement(outcome: &PlaceOutcome) {
    println!(
        "placed on {} at ({}, {})",
        outcome.puzzle_id, outcome.anchor.row, outcome.anchor.col
    );
    if let Some(completed) = &outcome.completed {
        match completed.reward {
            Some(reward) => println!("solved {}, reward {reward}", completed.puzzle_id),
            None => println!("solved {}, +{} points", completed.puzzle_id, completed.points),
        }
    }
    if let Some(turn) = &outcome.turn {
        report_turn(turn);
    }
}

/// Applies one action. Returns whether the session changed.
fn apply(session: &mut GameSession, action: Action) -> bool {
    match action {
        Action::Place {
            hand,
            target,
            orientation,
            drop,
        } => match session.place_from_hand(hand, target, orientation, drop) {
            Some(outcome) => {
                report_placement(&outcome);
                true
            }
            None => {
                println!("that piece does not fit there");
                false
            }
        },
        Action::Move {
            from,
            placed,
            to,
            orientation,
            drop,
        } => match session.move_placed(from, placed, to, orientation, drop) {
            Some(outcome) => {
                report_placement(&outcome);
                true
            }
            None => {
                println!("that piece does not fit there");
                false
            }
        },
        Action::Sacrifice(picks) => match session.sacrifice(picks) {
            Some(outcome) => {
                println!(
                    "sacrificed three level-{} pieces for {}",
                    outcome.consumed_level, outcome.granted
                );
                report_turn(&outcome.turn);
                true
            }
            None => {
                println!("pick three different hand pieces of the same level below 5");
                false
            }
        },
        Action::Undo => {
            let undone = session.undo();
            if !undone {
                println!("nothing to undo");
            }
            undone
        }
        Action::Shape(piece, orientation) => {
            print!("{}", format_shape(&piece.resolve(orientation)));
            false
        }
        Action::Show => {
            print!("{}", format_session(session));
            false
        }
        Action::Help => {
            println!("{HELP}");
            false
        }
        Action::Save | Action::Quit => false,
    }
}

fn run_play(config: GameConfig, save_dir: &Path, seed: Option<u64>, fresh: bool) -> Result<()> {
    let mut store = FileStore::new(save_dir);
    let restored = if fresh {
        None
    } else {
        load_session(&store, config.clone(), seed.unwrap_or_else(rand::random))
    };
    let mut session = match restored {
        Some(session) => {
            println!("Resumed saved game.");
            session
        }
        None => match seed {
            Some(seed) => GameSession::new(config, seed),
            None => GameSession::with_entropy(config),
        },
    };
    print!("{}", format_session(&session));
    println!("{HELP}");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let action = match parse_action(&line?) {
            Ok(Some(action)) => action,
            Ok(None) => continue,
            Err(err) => {
                println!("{err}");
                continue;
            }
        };
        match action {
            Action::Quit => break,
            Action::Save => {
                save_session(&mut store, &session)?;
                println!("saved to {}", store.path_for(SAVE_KEY).display());
            }
            action => {
                if apply(&mut session, action) {
                    save_session(&mut store, &session)?;
                    if !session.has_legal_move() {
                        println!("no piece in hand fits any board; sacrifice or let a puzzle expire");
                    }
                }
            }
        }
    }
    save_session(&mut store, &session)?;
    Ok(())
}
