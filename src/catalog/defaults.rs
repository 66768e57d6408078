//! Built-in catalog for the assessment platform, used when no catalog file is
//! configured.

use super::{Catalog, FlagDefinition};
use crate::environment::Environment::{Development, Production, Staging, Test};
use crate::error::FlagResult;

pub fn definitions() -> Vec<FlagDefinition> {
    vec![
        FlagDefinition::new("betaTesting", "Beta testing")
            .describe("Opens beta features to the early-access cohort")
            .enabled_in(Development, true)
            .enabled_in(Test, true)
            .enabled_in(Staging, true)
            .enabled_in(Production, false)
            .rollout(Staging, 100),
        FlagDefinition::new("experimentalUI", "Experimental UI")
            .describe("Redesigned assessment-taking interface")
            .enabled_in(Development, true)
            .enabled_in(Staging, true)
            .enabled_in(Production, false)
            .rollout(Staging, 50)
            .depends_on("betaTesting"),
        FlagDefinition::new("advancedAnalytics", "Advanced analytics")
            .describe("Cohort and item-level analytics on the results dashboard")
            .enabled_in(Development, true)
            .enabled_in(Staging, true)
            .enabled_in(Production, true)
            .rollout(Production, 25),
        FlagDefinition::new("aiProctoring", "AI proctoring")
            .describe("Automated integrity review of recorded sessions")
            .enabled_in(Development, true)
            .enabled_in(Staging, true)
            .enabled_in(Production, true)
            .rollout(Staging, 50)
            .rollout(Production, 10)
            .depends_on("advancedAnalytics"),
        FlagDefinition::new("realtimeCollaboration", "Realtime collaboration")
            .describe("Shared editing of assessment drafts")
            .enabled_in(Development, true)
            .enabled_in(Staging, true)
            .rollout(Staging, 20),
        FlagDefinition::new("bulkGrading", "Bulk grading")
            .describe("Grade many submissions at once")
            .enabled_in(Development, true)
            .enabled_in(Test, true)
            .enabled_in(Staging, true)
            .enabled_in(Production, true),
        FlagDefinition::new("debugPanel", "Debug panel")
            .describe("In-app diagnostics overlay")
            .enabled_in(Development, true)
            .enabled_in(Test, true),
        FlagDefinition::new("privateApiExplorer", "Private API explorer")
            .describe("Internal API console; never exported to clients")
            .enabled_in(Development, true)
            .enabled_in(Staging, true),
    ]
}

pub fn catalog() -> FlagResult<Catalog> {
    Catalog::load(definitions())
}
