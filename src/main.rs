//! Binary entrypoint for the Hugoland CLI.
//!
//! Commands:
//! - `init` - write a starter `hugoland.toml` and create the data directory
//! - `play` - interactive session on stdin; type `help` once it starts
//! - `status` - print a summary of the saved game
//! - `reset` - delete the saved game
//!
//! See the library crate docs for module-level details: `hugoland::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use hugoland::config::Config;
use hugoland::game::{
    AnswerOutcome, ActionResult, GameState, ItemKind, ModeKind, ResearchTrack, Skill,
};
use hugoland::runtime::{GameHandle, GameRuntime, SystemClock};
use hugoland::storage::Persistence;
use hugoland::trivia::{Answer, BuiltinBank, Question, TriviaProvider};

#[derive(Parser)]
#[command(name = "hugoland")]
#[command(about = "An incremental trivia RPG")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "hugoland.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a default configuration file
    Init,
    /// Play interactively
    Play,
    /// Show a summary of the saved game
    Status,
    /// Delete the saved game
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(&None, cli.verbose);
        Config::create_default(&cli.config).await?;
        let config = Config::default();
        tokio::fs::create_dir_all(&config.storage.data_dir).await?;
        info!("Configuration file created at {}", cli.config);
        return Ok(());
    }

    let config = match Config::load(&cli.config).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} (run `hugoland init` to create one); using defaults", e);
            Config::default()
        }
    };
    init_logging(&Some(config.clone()), cli.verbose);
    let persistence = Persistence::from_config(&config.storage)?;

    match cli.command {
        Commands::Init => {}
        Commands::Play => {
            info!("Starting Hugoland v{}", env!("CARGO_PKG_VERSION"));
            let game = GameRuntime::start(&config, persistence, Arc::new(SystemClock)).await?;
            let result = play(&game).await;
            game.shutdown().await?;
            result?;
        }
        Commands::Status => match persistence.load_state().await {
            Ok(Some(loaded)) => print_status(&loaded.state),
            Ok(None) => println!("No saved game."),
            Err(e) => {
                warn!("Save could not be read: {}", e);
                println!("The saved game is unreadable; `play` will start a new one.");
            }
        },
        Commands::Reset => {
            persistence.remove().await?;
            info!("Saved game removed");
            println!("Saved game deleted.");
        }
    }

    Ok(())
}

const HELP: &str = "\
fight                      start a fight and answer questions until it ends
status | inv               player summary / inventory
equip|upgrade|sell|discard <weapon|armor> <id-prefix>
chest <cost>               open a chest
mythical                   buy a mythical item
research <atk|def|hp>      buy one research level
mine <x> <y>               dig for gems
exchange <n>               trade shiny gems for gems
market                     list relic offers
relic buy|upgrade|equip|unequip|sell <id-prefix>
plant | water <hours>      garden of growth
daily | offline            claim daily / offline rewards
mode <name>                switch game mode
skill <name>               unlock a skill
prestige                   reset progression for prestige points
quit";

async fn play(game: &GameHandle) -> Result<()> {
    let bank = BuiltinBank::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Welcome to Hugoland. Type `help` for commands.");

    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&cmd, args)) = words.split_first() else {
            continue;
        };
        match cmd {
            "help" => println!("{}", HELP),
            "quit" | "exit" => break,
            "status" => print_status(&game.snapshot().await?),
            "inv" => print_inventory(&game.snapshot().await?),
            "fight" => fight(game, &bank, &mut lines).await?,
            "equip" | "upgrade" | "sell" | "discard" => item_command(game, cmd, args).await?,
            "chest" => {
                let cost = args.first().and_then(|a| a.parse().ok()).unwrap_or(100);
                let r = game
                    .apply(move |s, ctx| s.open_chest(cost, &mut ctx.rng, ctx.now))
                    .await?;
                report(r, |c| {
                    let names: Vec<String> = c.items.iter().map(|i| i.name.clone()).collect();
                    format!("Found {} and {} gems", names.join(", "), c.bonus_gems)
                });
            }
            "mythical" => {
                let r = game
                    .apply(|s, ctx| s.purchase_mythical(&mut ctx.rng, ctx.now))
                    .await?;
                report(r, |i| format!("Bought {}", i.name));
            }
            "research" => {
                let Some(track) = args.first().and_then(|a| ResearchTrack::parse(a)) else {
                    println!("research <atk|def|hp>");
                    continue;
                };
                let r = game.apply(move |s, ctx| s.upgrade_research(track, ctx.now)).await?;
                report(r, |lvl| format!("Research now level {}", lvl));
            }
            "mine" => {
                let x = args.first().and_then(|a| a.parse().ok()).unwrap_or(0);
                let y = args.get(1).and_then(|a| a.parse().ok()).unwrap_or(0);
                let found = game.apply(move |s, ctx| s.mine_gem(x, y, &mut ctx.rng)).await?;
                println!("+{} gems, +{} shiny", found.gems, found.shiny_gems);
            }
            "exchange" => {
                let n = args.first().and_then(|a| a.parse().ok()).unwrap_or(0);
                let r = game.apply(move |s, _| s.exchange_shiny_gems(n)).await?;
                report(r, |g| format!("Received {} gems", g));
            }
            "market" => {
                let state = game.snapshot().await?;
                for relic in &state.yojef_market.items {
                    println!(
                        "{:8} {} ({} {}, +{}) {} gems",
                        short(&relic.id),
                        relic.name,
                        relic.rarity.as_str(),
                        relic.kind.as_str(),
                        relic.base_stat,
                        relic.cost
                    );
                }
            }
            "relic" => relic_command(game, args).await?,
            "plant" => {
                let r = game.apply(|s, ctx| s.plant_seed(ctx.now)).await?;
                report(r, |_| "Seed planted".to_string());
            }
            "water" => {
                let hours = args.first().and_then(|a| a.parse().ok()).unwrap_or(24);
                let r = game.apply(move |s, ctx| s.buy_water(hours, ctx.now)).await?;
                report(r, |_| format!("Watered for {} hours", hours));
            }
            "daily" => {
                let r = game
                    .apply(|s, ctx| s.claim_daily_reward(&mut ctx.rng, ctx.now))
                    .await?;
                report(r, |c| {
                    format!(
                        "Day {}: {} coins, {} gems{}",
                        c.reward.day,
                        c.reward.coins,
                        c.reward.gems,
                        c.item.map(|i| format!(", {}", i.name)).unwrap_or_default()
                    )
                });
            }
            "offline" => {
                let r = game.apply(|s, _| s.claim_offline_rewards()).await?;
                report(r, |(c, g)| format!("Collected {} coins and {} gems", c, g));
            }
            "mode" => {
                let Some(mode) = args.first().and_then(|a| ModeKind::parse(a)) else {
                    println!("modes: normal blitz bloodlust crazy survival timeattack boss");
                    continue;
                };
                let r = game.apply(move |s, _| s.set_game_mode(mode)).await?;
                report(r, |_| format!("Mode set to {:?}", mode));
            }
            "skill" => {
                let Some(skill) = args.first().and_then(|a| Skill::parse(a)) else {
                    println!("unknown skill");
                    continue;
                };
                let r = game.apply(move |s, _| s.upgrade_skill(skill)).await?;
                report(r, |_| format!("Unlocked {:?}", skill));
            }
            "prestige" => {
                let r = game.apply(|s, ctx| s.prestige(ctx.now)).await?;
                report(r, |p| format!("Prestiged for {} points", p));
            }
            other => println!("Unknown command `{}`. Type `help`.", other),
        }
    }
    Ok(())
}

async fn fight<R>(game: &GameHandle, bank: &BuiltinBank, lines: &mut tokio::io::Lines<R>) -> Result<()>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    let started = game.apply(|s, ctx| s.start_combat(&mut ctx.rng)).await?;
    let enemy = match started {
        Ok(enemy) => enemy,
        Err(e) => {
            println!("{}", e);
            return Ok(());
        }
    };
    println!("A {} (hp {}) blocks the way!", enemy.name, enemy.hp);

    loop {
        let zone = game.snapshot().await?.zone;
        let question = bank.question_for_zone(zone, &mut rand::thread_rng());
        ask(&question);
        let Some(response) = lines.next_line().await? else {
            return Ok(());
        };
        let correct = bank.check_answer(&question, &response);
        let category = question.category.clone();
        let outcome = game
            .apply(move |s, ctx| s.resolve_answer(correct, Some(category.as_str()), &mut ctx.rng, ctx.now))
            .await?;
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                println!("{}", e);
                return Ok(());
            }
        };
        println!("{}", if correct { "Correct!" } else { "Wrong!" });
        match outcome {
            AnswerOutcome::Hit { damage } => println!("You hit for {}.", damage),
            AnswerOutcome::Missed { damage } => println!("You take {} damage.", damage),
            AnswerOutcome::Revived { hp } => println!("You fall... and get back up with {} hp!", hp),
            AnswerOutcome::Victory { coins, gems, drop } => {
                println!("Victory! +{} coins, +{} gems", coins, gems);
                if let Some(item) = drop {
                    println!("Dropped: {}", item.name);
                }
                return Ok(());
            }
            AnswerOutcome::Defeat { lives_remaining } => {
                match lives_remaining {
                    Some(lives) => println!("Defeated. {} lives left.", lives),
                    None => println!("Defeated."),
                }
                return Ok(());
            }
        }
    }
}

fn ask(question: &Question) {
    println!("[{}] {}", question.category, question.prompt);
    if let Answer::Choice { options, .. } = &question.answer {
        for (i, option) in options.iter().enumerate() {
            println!("  {}) {}", i + 1, option);
        }
    }
}

/// Resolve an id prefix against the item list of `kind`.
async fn resolve_item(game: &GameHandle, kind: ItemKind, prefix: &str) -> Result<Option<String>> {
    let state = game.snapshot().await?;
    Ok(state
        .inventory
        .items(kind)
        .iter()
        .find(|i| i.id.starts_with(prefix))
        .map(|i| i.id.clone()))
}

async fn item_command(game: &GameHandle, cmd: &str, args: &[&str]) -> Result<()> {
    let (Some(kind), Some(prefix)) = (args.first().and_then(|a| ItemKind::parse(a)), args.get(1))
    else {
        println!("{} <weapon|armor> <id>", cmd);
        return Ok(());
    };
    let Some(id) = resolve_item(game, kind, prefix).await? else {
        println!("No {} matches `{}`", kind.as_str(), prefix);
        return Ok(());
    };
    match cmd {
        "equip" => {
            let r = game.apply(move |s, _| s.equip_item(kind, &id)).await?;
            report(r, |_| "Equipped".to_string());
        }
        "upgrade" => {
            let r = game.apply(move |s, _| s.upgrade_item(kind, &id)).await?;
            report(r, |lvl| format!("Upgraded to level {}", lvl));
        }
        "sell" => {
            let r = game.apply(move |s, _| s.sell_item(kind, &id)).await?;
            report(r, |coins| format!("Sold for {} coins", coins));
        }
        _ => {
            let r = game.apply(move |s, _| s.discard_item(kind, &id)).await?;
            report(r, |_| "Discarded".to_string());
        }
    }
    Ok(())
}

async fn relic_command(game: &GameHandle, args: &[&str]) -> Result<()> {
    let (Some(&action), Some(&prefix)) = (args.first(), args.get(1)) else {
        println!("relic buy|upgrade|equip|unequip|sell <id>");
        return Ok(());
    };
    let state = game.snapshot().await?;
    let pool = if action == "buy" {
        &state.yojef_market.items
    } else {
        &state.inventory.relics
    };
    let Some(id) = pool.iter().find(|r| r.id.starts_with(prefix)).map(|r| r.id.clone()) else {
        println!("No relic matches `{}`", prefix);
        return Ok(());
    };
    match action {
        "buy" => {
            let r = game.apply(move |s, ctx| s.purchase_relic(&id, ctx.now)).await?;
            report(r, |_| "Relic purchased".to_string());
        }
        "upgrade" => {
            let r = game.apply(move |s, _| s.upgrade_relic(&id)).await?;
            report(r, |lvl| format!("Relic now level {}", lvl));
        }
        "equip" => {
            let r = game.apply(move |s, _| s.equip_relic(&id)).await?;
            report(r, |_| "Relic equipped".to_string());
        }
        "unequip" => {
            let r = game.apply(move |s, _| s.unequip_relic(&id)).await?;
            report(r, |_| "Relic unequipped".to_string());
        }
        "sell" => {
            let r = game.apply(move |s, _| s.sell_relic(&id)).await?;
            report(r, |gems| format!("Sold for {} gems", gems));
        }
        other => println!("Unknown relic action `{}`", other),
    }
    Ok(())
}

fn report<T>(result: ActionResult<T>, ok: impl FnOnce(T) -> String) {
    match result {
        Ok(value) => println!("{}", ok(value)),
        Err(e) => println!("Can't do that: {}", e),
    }
}

fn short(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn print_status(state: &GameState) {
    let p = &state.player_stats;
    println!(
        "Zone {} | Level {} ({}/{} xp) | Mode {:?}",
        state.zone,
        state.progression.level,
        state.progression.experience,
        state.progression.experience_to_next,
        state.game_mode.current
    );
    println!("HP {}/{} | ATK {} | DEF {}", p.hp, p.max_hp, p.atk, p.def);
    println!(
        "Coins {} | Gems {} | Shiny {} | Streak {} (x{:.1})",
        state.coins,
        state.gems,
        state.shiny_gems,
        state.knowledge_streak.current,
        state.knowledge_streak.multiplier
    );
    let unlocked = state.achievements.iter().filter(|a| a.unlocked).count();
    println!(
        "Achievements {}/{} | Victories {} | Deaths {}",
        unlocked,
        state.achievements.len(),
        state.statistics.total_victories,
        state.statistics.total_deaths
    );
    if state.daily_rewards.available_reward.is_some() {
        println!("A daily reward is waiting (`daily`).");
    }
    let off = &state.offline_progress;
    if off.offline_coins > 0 || off.offline_gems > 0 {
        println!(
            "Offline earnings: {} coins, {} gems (`offline`).",
            off.offline_coins, off.offline_gems
        );
    }
}

fn print_inventory(state: &GameState) {
    for kind in [ItemKind::Weapon, ItemKind::Armor] {
        println!("{}s:", kind.as_str());
        let equipped = state.inventory.equipped_id(kind);
        for item in state.inventory.items(kind) {
            let mark = if equipped == Some(item.id.as_str()) { "*" } else { " " };
            println!(
                " {}{:8} {} ({}, lvl {}, +{}, {}/{})",
                mark,
                short(&item.id),
                item.name,
                item.rarity.as_str(),
                item.level,
                item.stat_bonus(),
                item.durability,
                item.max_durability
            );
        }
    }
    println!("relics:");
    for relic in &state.inventory.relics {
        let mark = if state.inventory.is_relic_equipped(&relic.id) { "*" } else { " " };
        println!(
            " {}{:8} {} ({}, lvl {}, +{})",
            mark,
            short(&relic.id),
            relic.name,
            relic.rarity.as_str(),
            relic.level,
            relic.stat_bonus()
        );
    }
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|c| c.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Warn),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    if let Some(f) = file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Mirror to the console only when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stderr);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
