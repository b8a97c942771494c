//! Pokerdice simulator
//!
//! Plays concurrent rounds in several groups against in-memory storage, with
//! the expiry sweeper running alongside, and prints each group's standings.

use clap::Parser;
use pokerdice::config::generate_sample_config;
use pokerdice::{
    Dice, DiceRoller, ExpirySweeper, FinalizedRound, GroupId, PlayerProfile, PokerDiceResult,
    PokerDiceService, ServiceBuilder,
};
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "pokerdice")]
#[command(about = "Poker dice round engine simulator", long_about = None)]
struct Args {
    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<String>,

    /// Write a sample configuration to this path and exit
    #[arg(long)]
    generate_config: Option<String>,

    /// Number of chat groups playing at once
    #[arg(long, default_value = "4")]
    groups: usize,

    /// Players per group
    #[arg(long, default_value = "3")]
    players: usize,

    /// Seed for the dice, for repeatable runs
    #[arg(long)]
    seed: Option<u64>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct StandingRow {
    player_id: i64,
    name: String,
    dice: Dice,
    combination: String,
    score: u32,
}

#[derive(Debug, Serialize)]
struct GroupSummary {
    group_id: GroupId,
    winner: Option<String>,
    standings: Vec<StandingRow>,
}

impl From<&FinalizedRound> for GroupSummary {
    fn from(round: &FinalizedRound) -> Self {
        let standings = round
            .standings()
            .into_iter()
            .map(|(player_id, name, result)| StandingRow {
                player_id,
                dice: round
                    .players
                    .get(&player_id)
                    .map(|turn| turn.dice)
                    .unwrap_or_default(),
                name,
                combination: result.combination.to_string(),
                score: result.score,
            })
            .collect();
        Self {
            group_id: round.group_id,
            winner: round.winner_name().map(str::to_string),
            standings,
        }
    }
}

fn format_dice(dice: &Dice) -> String {
    let faces: Vec<String> = dice.iter().map(|d| d.to_string()).collect();
    format!("[{}]", faces.join("] ["))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Some(path) = args.generate_config {
        generate_sample_config(&path)?;
        println!("📝 Sample configuration written to {}", path);
        return Ok(());
    }

    let mut builder = ServiceBuilder::new();
    if let Some(path) = args.config.clone() {
        builder = builder.with_config_path(path);
    }
    if let Some(seed) = args.seed {
        builder = builder.with_roller(Arc::new(DiceRoller::seeded(seed)));
    }
    let service = Arc::new(builder.build()?);

    let default_filter = format!("pokerdice={}", service.config().monitoring.log_level.as_filter());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    let sweeper = if service.config().sweeper.enabled {
        Some(ExpirySweeper::spawn(Arc::clone(&service)))
    } else {
        None
    };

    info!("🎲 Simulating {} groups with {} players each", args.groups, args.players);

    let mut games = Vec::with_capacity(args.groups);
    for g in 0..args.groups {
        let group_id = -(1_000 + g as GroupId);
        let service = Arc::clone(&service);
        let players = args.players;
        games.push(tokio::spawn(async move {
            play_group(service, group_id, players).await
        }));
    }

    let mut summaries = Vec::new();
    for game in games {
        match game.await? {
            Ok(Some(round)) => summaries.push(GroupSummary::from(&round)),
            Ok(None) => {}
            Err(e) => warn!("Group simulation failed: {}", e),
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            println!(
                "Group {}: winner {}",
                summary.group_id,
                summary.winner.as_deref().unwrap_or("-")
            );
            for (place, row) in summary.standings.iter().enumerate() {
                println!(
                    "  {}. {:<10} {}  {} ({})",
                    place + 1,
                    row.name,
                    format_dice(&row.dice),
                    row.combination,
                    row.score
                );
            }
        }
        if let Some(first) = summaries.first() {
            let board = service.leaderboard(first.group_id, chrono::Utc::now()).await?;
            println!("Rounds in group {}: {}", first.group_id, board.total_rounds);
        }
    }

    if let Some(sweeper) = sweeper {
        sweeper.shutdown().await;
    }
    Ok(())
}

/// Run one round: everyone rolls, then everyone rerolls or passes
async fn play_group(
    service: Arc<PokerDiceService>,
    group_id: GroupId,
    players: usize,
) -> PokerDiceResult<Option<FinalizedRound>> {
    let profiles: Vec<PlayerProfile> = (1..=players)
        .map(|p| {
            let id = (group_id.abs() * 100) + p as i64;
            let name = format!("P{}", p);
            PlayerProfile::new(id, &name.to_lowercase(), &name)
        })
        .collect();
    let Some(initiator) = profiles.first() else {
        return Ok(None);
    };
    service.start_round(group_id, initiator.id)?;

    let mut rolls = Vec::with_capacity(profiles.len());
    for profile in profiles.clone() {
        let service = Arc::clone(&service);
        rolls.push(tokio::spawn(async move {
            let dice = service.roll_dice(group_id, &profile).await?;
            Ok::<_, pokerdice::PokerDiceError>((profile.id, dice))
        }));
    }

    let mut hands = Vec::with_capacity(rolls.len());
    for roll in rolls {
        if let Ok(Ok((player_id, Some(dice)))) = roll.await {
            hands.push((player_id, dice));
        }
    }

    let mut actions = Vec::with_capacity(hands.len());
    for (player_id, dice) in hands {
        let reroll = rand::thread_rng().gen_bool(0.5);
        let service = Arc::clone(&service);
        actions.push(tokio::spawn(async move {
            if reroll {
                let text = format!("/reroll {}", dice[0]);
                service.reroll_dice(group_id, player_id, &text);
            } else {
                service.pass_turn(group_id, player_id);
            }
            service.complete_if_ready(group_id).await
        }));
    }

    let mut finalized = None;
    for action in actions {
        if let Ok(Some(round)) = action.await {
            finalized = Some(round);
        }
    }

    match finalized {
        Some(round) => Ok(Some(round)),
        // A lone player never completes the round on their own.
        None => match service.finalize(group_id).await {
            Ok(round) => Ok(Some(round)),
            Err(e) => {
                warn!("Group {} already closed: {}", group_id, e);
                Ok(None)
            }
        },
    }
}
