use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::schemas::Toolbelt;
use crate::toolbelts::{exchange_rate, scheduling, travel};

static TOOLBELTS: Lazy<Vec<Arc<dyn Toolbelt>>> = Lazy::new(|| {
    vec![
        exchange_rate::INSTANCE.clone() as Arc<dyn Toolbelt>,
        travel::INSTANCE.clone() as Arc<dyn Toolbelt>,
        scheduling::INSTANCE.clone() as Arc<dyn Toolbelt>,
    ]
});

pub fn toolbelts() -> &'static [Arc<dyn Toolbelt>] {
    &TOOLBELTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_registered_tool() {
        let names: Vec<String> = toolbelts()
            .iter()
            .flat_map(|b| b.tools())
            .map(|t| t.function.name)
            .collect();
        for expected in [
            "get_exchange_rate",
            "search_flights",
            "search_hotels",
            "search_activities",
            "search_dining",
            "create_calendar_event",
            "get_available_time_slots",
            "send_email",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
    }

    #[test]
    fn belt_names_are_unique() {
        let mut names: Vec<&str> = toolbelts().iter().map(|b| b.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names, vec!["ExchangeRate", "Scheduling", "Travel"]);
    }
}
