use clipstat_common::OutcomeRecord;

/// Counts from one collection run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub links_attempted: u32,
    pub links_succeeded: u32,
    pub links_failed: u32,
    pub raw_rows: u32,
    pub files_written: u32,
    pub sheet_uploaded: bool,
}

impl RunStats {
    pub fn from_outcomes(outcomes: &[OutcomeRecord]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count() as u32;
        Self {
            links_attempted: outcomes.len() as u32,
            links_succeeded: succeeded,
            links_failed: outcomes.len() as u32 - succeeded,
            ..Default::default()
        }
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Collection Run Complete ===")?;
        writeln!(
            f,
            "Successfully processed {} out of {} links.",
            self.links_succeeded, self.links_attempted
        )?;
        writeln!(f, "Links failed:   {}", self.links_failed)?;
        writeln!(f, "Raw rows:       {}", self.raw_rows)?;
        writeln!(f, "Files written:  {}", self.files_written)?;
        write!(
            f,
            "Sheet uploaded: {}",
            if self.sheet_uploaded { "yes" } else { "no" }
        )
    }
}
