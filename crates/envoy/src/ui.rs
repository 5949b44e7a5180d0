use std::io::{self, Write};

use anyhow::Result;
use serde_json::Value;
use uuid::Uuid;

use crate::client::ApiClient;

pub async fn ask(client: ApiClient, prompt: &str, session_id: Option<&str>) -> Result<()> {
    let answer = client.invoke(prompt, session_id).await?;
    println!("{}", answer);
    Ok(())
}

pub async fn plan(client: ApiClient, prompt: &str) -> Result<()> {
    println!("Planning... this runs six specialist steps.\n");
    let outcome = client.plan(prompt).await?;

    println!(
        "✈ {} → {} ({} to {})\n",
        outcome["origin"].as_str().unwrap_or("?"),
        outcome["destination"].as_str().unwrap_or("?"),
        outcome["departure"].as_str().unwrap_or("?"),
        outcome["return_date"].as_str().unwrap_or("?"),
    );
    println!("{}", outcome["result"].as_str().unwrap_or_default());
    Ok(())
}

pub async fn schedule(client: ApiClient, prompt: &str) -> Result<()> {
    let outcome = client.schedule(prompt).await?;

    if let Some(delegations) = outcome["delegations"].as_array() {
        for tool in delegations.iter().filter_map(Value::as_str) {
            println!("🔧 {}", tool);
        }
        println!();
    }
    println!("{}", outcome["result"].as_str().unwrap_or_default());
    Ok(())
}

pub async fn card(client: ApiClient) -> Result<()> {
    let card = client.agent_card().await?;

    println!("{} v{} (A2A {})", card.name, card.version, card.protocol_version);
    println!("  {}", card.description);
    println!("  Endpoint: {}", card.url);
    for skill in &card.skills {
        println!("\n  Skill: {} ({})", skill.name, skill.id);
        for example in &skill.examples {
            println!("    e.g. {}", example);
        }
    }
    Ok(())
}

/// Interactive A2A chat; every turn shares one context id.
pub async fn interactive_chat(client: ApiClient) -> Result<()> {
    let card = client.agent_card().await?;
    let context_id = Uuid::new_v4().to_string();
    println!("Envoy chat with {} started. Type 'quit' to exit.\n", card.name);

    loop {
        print!("You: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.eq_ignore_ascii_case("quit") {
            println!("Goodbye!");
            break;
        }

        if input.is_empty() {
            continue;
        }

        println!();
        match client
            .stream_message(&card.url, input, &context_id, handle_event)
            .await
        {
            Ok(Some(answer)) => println!("\n{}\n", answer),
            Ok(None) => println!("\n(no answer)\n"),
            Err(e) => eprintln!("Error: {}\n", e),
        }
    }

    Ok(())
}

/// Progress line for a working status update.
pub fn progress_text(result: &Value) -> Option<&str> {
    if result["kind"] != "status-update" || result["status"]["state"] != "working" {
        return None;
    }
    result["status"]["message"]["parts"][0]["text"].as_str()
}

fn handle_event(result: &Value) {
    if let Some(text) = progress_text(result) {
        println!("🔧 {}", text);
    }
}
