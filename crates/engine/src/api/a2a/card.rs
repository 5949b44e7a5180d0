use cambist_shared::a2a::{AgentCapabilities, AgentCard, AgentSkill, PROTOCOL_VERSION};

use crate::config::A2aConfig;

pub const CARD_DESCRIPTION: &str = "Currency exchange agent that answers conversion and \
     exchange-rate questions with live Frankfurter data.";

fn text_modes() -> Vec<String> {
    vec!["text".to_string(), "text/plain".to_string()]
}

fn currency_skill() -> AgentSkill {
    AgentSkill {
        id: "currency_exchange".to_string(),
        name: "Currency exchange rates".to_string(),
        description: "Looks up current and historical exchange rates and converts amounts \
                      between currencies."
            .to_string(),
        tags: vec![
            "currency".to_string(),
            "exchange rate".to_string(),
            "finance".to_string(),
        ],
        examples: vec![
            "Convert 100 USD to EUR".to_string(),
            "What is today's USD to JPY exchange rate?".to_string(),
            "How has GBP trended against CAD this week?".to_string(),
        ],
        input_modes: text_modes(),
        output_modes: text_modes(),
    }
}

pub fn build_card(config: &A2aConfig) -> AgentCard {
    AgentCard {
        name: config.agent_name.clone(),
        description: CARD_DESCRIPTION.to_string(),
        url: config.public_url.clone(),
        version: config.version.clone(),
        protocol_version: PROTOCOL_VERSION.to_string(),
        preferred_transport: "JSONRPC".to_string(),
        default_input_modes: text_modes(),
        default_output_modes: text_modes(),
        capabilities: AgentCapabilities {
            streaming: true,
            push_notifications: false,
            state_transition_history: false,
        },
        skills: vec![currency_skill()],
        documentation_url: config.documentation_url.clone(),
    }
}
