use clap::{Parser, Subcommand};

mod commands;

use commands::{
    CleanArgs, HeartbeatArgs, RiderCommand, StatsArgs, VoiceArgs, run_call, run_clean_memories,
    run_heartbeat, run_rider, run_stats, run_tasks, run_tools, run_voice,
};

#[derive(Parser, Debug)]
#[command(name = "ash", version = "0.3.0")]
#[command(about = "Ash CLI - Rider Pi bridge, heartbeat, voice and maintenance tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive the Rider Pi robot through the command channel
    Rider {
        #[command(subcommand)]
        rider_command: RiderCommand,
    },
    /// Send a heartbeat pulse
    Heartbeat(HeartbeatArgs),
    /// Send an ElevenLabs voice message
    Voice(VoiceArgs),
    /// List self tasks from the tasks channel
    Tasks {
        /// Channel to scan instead of TASKS_CHANNEL_ID
        #[arg(long)]
        channel: Option<String>,
    },
    /// Show usage totals from the run log
    Stats(StatsArgs),
    /// Replace selected archival memories with a summary
    CleanMemories(CleanArgs),
    /// List the tools available with the current environment
    Tools,
    /// Invoke a registered tool with a JSON argument object
    Call {
        /// Tool name
        tool: String,
        /// JSON arguments (default: {})
        #[arg(default_value = "{}")]
        input: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize JSON logging once.
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .json()
        .try_init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Rider { rider_command } => run_rider(rider_command).await,
        Commands::Heartbeat(args) => run_heartbeat(args).await,
        Commands::Voice(args) => run_voice(args).await,
        Commands::Tasks { channel } => run_tasks(channel).await,
        Commands::Stats(args) => run_stats(args).await,
        Commands::CleanMemories(args) => run_clean_memories(args),
        Commands::Tools => Ok(run_tools()),
        Commands::Call { tool, input } => run_call(&tool, &input).await,
    };

    match outcome {
        Ok(response) => {
            println!("{}", commands::render(&response));
            if response.is_error() {
                std::process::exit(1);
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn rider_action_accepts_negative_roll() {
        let cli = Cli::try_parse_from(["ash", "rider", "action", "adjust_roll", "--roll", "-10"]).unwrap();
        match cli.command {
            Commands::Rider {
                rider_command: RiderCommand::Action { name, roll, .. },
            } => {
                assert_eq!(name, "adjust_roll");
                assert_eq!(roll, Some(-10.0));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn clean_memories_collects_repeated_ids() {
        let cli = Cli::try_parse_from([
            "ash", "clean-memories", "mem.json", "--id", "a", "--id", "b",
        ])
        .unwrap();
        match cli.command {
            Commands::CleanMemories(args) => assert_eq!(args.ids, vec!["a", "b"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn call_defaults_to_empty_object() {
        let cli = Cli::try_parse_from(["ash", "call", "usage_stats"]).unwrap();
        match cli.command {
            Commands::Call { tool, input } => {
                assert_eq!(tool, "usage_stats");
                assert_eq!(input, "{}");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
