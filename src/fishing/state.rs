//! Automation loop states

/// Where the automation loop is within one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FishingState {
    /// Looking for the cast prompt
    #[default]
    FindingPrompt,
    /// Line is out, watching the bait counter
    WaitingForBite,
    /// Fish hooked, pull/release until landed or lost
    ReelingIn,
}

impl FishingState {
    pub fn name(&self) -> &'static str {
        match self {
            FishingState::FindingPrompt => "finding_prompt",
            FishingState::WaitingForBite => "waiting_for_bite",
            FishingState::ReelingIn => "reeling_in",
        }
    }
}

impl std::fmt::Display for FishingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
