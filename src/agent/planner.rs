//! Plan generation.
//!
//! The planner is a single reasoning-model completion: it gets the goal
//! text plus a catalog of the tools the executor will have, and returns a
//! numbered step-by-step plan in markdown.

use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::llm::ChatClient;

pub const PLANNER_PROMPT: &str = "\
You are a household manager. You will receive a list of website
links to recipes. Your task is to create a detailed plan to review the recipes,
determine if any of them cannot be made due to lack of ingredients available
at the grocery store, and create a shopping list aggregating all the
ingredients needed for the recipes that can be made, including quantities.

You will have access to an LLM agent that is responsible for executing the plan that you create and will return results.

The LLM agent has access to the following functions:
{functions}

When creating a plan for the LLM to execute, break your instructions into a logical, step-by-step order, using the specified format:
    - **Main actions are numbered** (e.g., 1, 2, 3).
    - **Sub-actions are lettered** under their relevant main actions (e.g., 1a, 1b).
        - **Sub-actions should start on new lines**
    - **Specify conditions using clear 'if...then...else' statements** (e.g., 'If the product was purchased within 30 days, then...').
    - **For actions that require using one of the above functions defined**, write a step to call a function using backticks for the function name (e.g., `call the get_inventory_status function`).
        - Ensure that the proper input arguments are given to the model for instruction. There should not be any ambiguity in the inputs.
    - **The last step** in the instructions should always be calling the `instructions_complete` function. This is necessary so we know the LLM has completed all of the instructions you have given it.
    - **Detailed steps** The plan generated must be extremely detailed and thorough with explanations at every step.
Use markdown format when generating the plan with each step and sub-step.

Please find the list of recipe links below.
{text}
";

/// Renders the tool catalog as the bullet list the planner prompt expects.
pub fn render_function_catalog(descriptions: &HashMap<String, String>) -> String {
    let mut entries: Vec<(&String, &String)> = descriptions.iter().collect();
    entries.sort_by_key(|(name, _)| name.as_str());
    entries
        .iter()
        .map(|(name, desc)| format!("- {}: {}", name, desc))
        .collect::<Vec<_>>()
        .join("\n    ")
}

/// Asks the planner model for a plan covering `goal`.
pub async fn call_planner(
    client: &dyn ChatClient,
    model: &str,
    descriptions: &HashMap<String, String>,
    goal: &str,
    max_tokens: u32,
) -> Result<String> {
    let prompt = PLANNER_PROMPT
        .replace("{functions}", &render_function_catalog(descriptions))
        .replace("{text}", goal)
        + "\n\nPlease provide the next steps in your plan.";

    let plan = client
        .complete_text(model, &prompt, max_tokens)
        .await
        .context("planner completion failed")?;
    Ok(plan)
}
