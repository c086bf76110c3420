use super::state::PhaseName;

pub struct PhaseDefinition {
    pub name: PhaseName,
    pub display_name: &'static str,
    pub description: &'static str,
}

pub static PHASES: &[PhaseDefinition] = &[
    PhaseDefinition {
        name: PhaseName::Login,
        display_name: "Login",
        description: "Agent-driven authentication against the target",
    },
    PhaseDefinition {
        name: PhaseName::Crawl,
        display_name: "Engine Crawl",
        description: "Traditional spider followed by the AJAX spider",
    },
    PhaseDefinition {
        name: PhaseName::DynamicCrawl,
        display_name: "Agent Exploration",
        description: "Agent-driven navigation and form interaction",
    },
    PhaseDefinition {
        name: PhaseName::ActiveScan,
        display_name: "Active Scan",
        description: "Engine vulnerability detection against the crawled site tree",
    },
    PhaseDefinition {
        name: PhaseName::Report,
        display_name: "Report",
        description: "Fetch and persist the engine findings report",
    },
];

pub fn display_name(name: PhaseName) -> &'static str {
    PHASES
        .iter()
        .find(|p| p.name == name)
        .map(|p| p.display_name)
        .unwrap_or("Unknown")
}
