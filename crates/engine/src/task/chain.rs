// ============================================================================
// MACRO DEFINITION
// ============================================================================

macro_rules! define_steps {
    (
        $step:ident {
            $(
                $variant:ident {
                    name: $name:literal,
                    $(agent: $agent:literal,)?
                    description: $desc:literal,
                    temperature: $temperature:literal,
                    tools: [$($tool:literal),*],
                    $(captures: $captures:literal,)?
                    instructions: $instructions:expr,
                    next: [$($next:ident),*],
                }
            ),* $(,)?
        }
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $step {
            $($variant),*
        }

        impl $step {
            /// Every step, in chain order
            pub fn all() -> &'static [$step] {
                &[$($step::$variant),*]
            }

            /// Parse step from its name
            pub fn from_name(s: &str) -> Option<Self> {
                match s {
                    $($name => Some($step::$variant),)*
                    _ => None,
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $($step::$variant => $name),*
                }
            }

            /// Name of the agent running this step; the step name unless set
            pub fn agent(&self) -> &'static str {
                match self {
                    $($step::$variant => None$(.or(Some($agent)))?.unwrap_or($name)),*
                }
            }

            pub fn description(&self) -> &'static str {
                match self {
                    $($step::$variant => $desc),*
                }
            }

            pub fn temperature(&self) -> f32 {
                match self {
                    $($step::$variant => $temperature),*
                }
            }

            /// The tools this step may call
            pub fn tools(&self) -> &'static [&'static str] {
                match self {
                    $($step::$variant => &[$($tool),*]),*
                }
            }

            /// State field the step's answer is stored under
            pub fn captures(&self) -> Option<&'static str> {
                match self {
                    $($step::$variant => None$(.or(Some($captures)))?),*
                }
            }

            /// Role prompt for this step
            pub fn instructions(&self) -> &'static str {
                match self {
                    $($step::$variant => $instructions),*
                }
            }

            pub fn successors(&self) -> &'static [$step] {
                match self {
                    $($step::$variant => &[$($step::$next),*]),*
                }
            }

            pub fn next(&self) -> Option<$step> {
                self.successors().first().copied()
            }

            /// Step to run for `current`; `None` ends the chain.
            pub fn route(current: &str) -> Option<$step> {
                match current {
                    $crate::task::chain::START => Self::all().first().copied(),
                    other => Self::from_name(other),
                }
            }

            /// Name stored as the current step once this one has finished.
            pub fn successor_name(&self) -> &'static str {
                self.next().map(|s| s.name()).unwrap_or($crate::task::chain::COMPLETED)
            }
        }
    };
}

pub(crate) use define_steps;

// ============================================================================
// STEP DEFINITIONS
// ============================================================================

pub const START: &str = "start";
pub const COMPLETED: &str = "completed";

define_steps! {
    Step {
        Coordinator {
            name: "coordinator",
            description: "Extract the trip details and brief the specialists",
            temperature: 0.2,
            tools: [],
            instructions: "You are the lead travel coordinator. Extract the key details from the \
                           traveller's request and describe the plan for the specialist agents.",
            next: [FlightSpecialist],
        },
        FlightSpecialist {
            name: "flight_specialist",
            description: "Flight specialist agent",
            temperature: 0.4,
            tools: ["search_flights"],
            captures: "flight_summary",
            instructions: "You are a flight specialist. Use the search_flights tool to find an \
                           appealing option and summarise it in two or three sentences.",
            next: [HotelSpecialist],
        },
        HotelSpecialist {
            name: "hotel_specialist",
            description: "Hotel specialist agent",
            temperature: 0.5,
            tools: ["search_hotels"],
            captures: "hotel_summary",
            instructions: "You are a hotel specialist. Use the search_hotels tool and recommend one \
                           stay with a short justification.",
            next: [ActivitySpecialist],
        },
        ActivitySpecialist {
            name: "activity_specialist",
            description: "Activity specialist agent",
            temperature: 0.6,
            tools: ["search_activities"],
            captures: "activities_summary",
            instructions: "You are an activity specialist. Use the search_activities tool and curate \
                           the experiences worth the traveller's time.",
            next: [DiningSpecialist],
        },
        DiningSpecialist {
            name: "dining_specialist",
            description: "Dining specialist agent",
            temperature: 0.4,
            tools: ["search_dining"],
            captures: "dining_summary",
            instructions: "You are a dining specialist. Use the search_dining tool and recommend \
                           memorable places to eat.",
            next: [PlanSynthesizer],
        },
        PlanSynthesizer {
            name: "plan_synthesizer",
            description: "Plan synthesiser agent",
            temperature: 0.3,
            tools: ["polish_itinerary"],
            captures: "final_itinerary",
            instructions: "You combine specialist outputs into a polished travel itinerary.",
            next: [],
        },
    }
}
