//! Command-line interface.

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "homesteward", version, about = "LLM-driven household manager")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Plan and execute a grocery run for a list of recipe links.
    Run {
        /// Recipe URLs to review.
        #[arg(required = true)]
        recipes: Vec<String>,
        /// Generate and print the plan without executing it.
        #[arg(long)]
        plan_only: bool,
    },
    /// List the registered tools and their descriptions.
    Tools,
    /// Write the default config file and exit.
    InitConfig,
}

/// Formats recipe links as the bracketed list the planner prompt expects.
pub fn format_goal(recipes: &[String]) -> String {
    format!("[{}]", recipes.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_arguments() {
        let cli = Cli::parse_from([
            "homesteward",
            "run",
            "https://example.com/a",
            "https://example.com/b",
            "--plan-only",
        ]);
        match cli.command {
            Command::Run { recipes, plan_only } => {
                assert_eq!(recipes.len(), 2);
                assert!(plan_only);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_goal_formatting() {
        let goal = format_goal(&[
            "https://example.com/a".to_string(),
            "https://example.com/b".to_string(),
        ]);
        assert_eq!(goal, "[https://example.com/a, https://example.com/b]");
    }
}
