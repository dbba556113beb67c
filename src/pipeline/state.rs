// file: src/pipeline/state.rs
// description: pipeline stage machine with a pure transition function
// reference: internal pipeline sequencing

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Extracting,
    PersistingPages,
    Indexing,
    EvaluatingChecklist,
    Synthesizing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    FullIngestion,
    Regeneration,
}

/// Whether the run created the company or found it already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompanyOrigin {
    Created,
    Existing,
}

/// Progress notification emitted on entering a stage, before its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// `None` for the terminal completion update.
    pub stage_key: Option<&'static str>,
    pub progress: u8,
    pub message: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: Stage,
    pub update: Option<ProgressUpdate>,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Completed | Stage::Failed)
    }

    pub fn key(self) -> Option<&'static str> {
        match self {
            Stage::Extracting => Some("details"),
            Stage::PersistingPages => Some("pages"),
            Stage::Indexing => Some("index"),
            Stage::EvaluatingChecklist => Some("checklist"),
            Stage::Synthesizing => Some("markdown"),
            Stage::Idle | Stage::Completed | Stage::Failed => None,
        }
    }

    pub fn fail(self) -> Stage {
        if self.is_terminal() { self } else { Stage::Failed }
    }

    fn entry_update(self, flow: Flow) -> Option<ProgressUpdate> {
        let (progress, message) = match self {
            Stage::Extracting => (5, "Extracting company details..."),
            Stage::PersistingPages => (25, "Saving PDF pages to database..."),
            Stage::Indexing => (50, "Creating vector embeddings..."),
            Stage::EvaluatingChecklist => (75, "Running AI checklist processor..."),
            Stage::Synthesizing => (90, "Generating final markdown report..."),
            Stage::Completed => match flow {
                Flow::FullIngestion => (100, "IPO Notes generated successfully!"),
                Flow::Regeneration => (100, "IPO Note regenerated successfully!"),
            },
            Stage::Idle | Stage::Failed => return None,
        };

        Some(ProgressUpdate {
            stage_key: self.key(),
            progress,
            message,
        })
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Extracting => "extracting",
            Stage::PersistingPages => "persisting pages",
            Stage::Indexing => "indexing",
            Stage::EvaluatingChecklist => "evaluating checklist",
            Stage::Synthesizing => "synthesizing",
            Stage::Completed => "completed",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Next stage after `stage` finished, with the update to emit on entering it.
/// `origin` only matters when leaving `Extracting`.
pub fn advance(flow: Flow, stage: Stage, origin: CompanyOrigin) -> Transition {
    let next = match (flow, stage) {
        (_, Stage::Completed) | (_, Stage::Failed) => {
            return Transition {
                next: stage,
                update: None,
            };
        }
        (Flow::FullIngestion, Stage::Idle) => Stage::Extracting,
        (Flow::FullIngestion, Stage::Extracting) => match origin {
            CompanyOrigin::Created => Stage::PersistingPages,
            CompanyOrigin::Existing => Stage::Synthesizing,
        },
        (Flow::FullIngestion, Stage::PersistingPages) => Stage::Indexing,
        (Flow::FullIngestion, Stage::Indexing) => Stage::EvaluatingChecklist,
        (Flow::Regeneration, Stage::Idle) => Stage::EvaluatingChecklist,
        // Regeneration never enters the ingestion stages; treat them as finished work.
        (Flow::Regeneration, Stage::Extracting)
        | (Flow::Regeneration, Stage::PersistingPages)
        | (Flow::Regeneration, Stage::Indexing) => Stage::EvaluatingChecklist,
        (_, Stage::EvaluatingChecklist) => Stage::Synthesizing,
        (_, Stage::Synthesizing) => Stage::Completed,
    };

    Transition {
        next,
        update: next.entry_update(flow),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn walk(flow: Flow, origin: CompanyOrigin) -> Vec<(Stage, u8)> {
        let mut stage = Stage::Idle;
        let mut visited = Vec::new();
        while !stage.is_terminal() {
            let transition = advance(flow, stage, origin);
            let update = transition.update.expect("non-terminal transitions emit");
            visited.push((transition.next, update.progress));
            stage = transition.next;
        }
        visited
    }

    #[test]
    fn test_full_ingestion_of_new_company() {
        assert_eq!(
            walk(Flow::FullIngestion, CompanyOrigin::Created),
            vec![
                (Stage::Extracting, 5),
                (Stage::PersistingPages, 25),
                (Stage::Indexing, 50),
                (Stage::EvaluatingChecklist, 75),
                (Stage::Synthesizing, 90),
                (Stage::Completed, 100),
            ]
        );
    }

    #[test]
    fn test_full_ingestion_of_existing_company_skips_to_synthesis() {
        assert_eq!(
            walk(Flow::FullIngestion, CompanyOrigin::Existing),
            vec![
                (Stage::Extracting, 5),
                (Stage::Synthesizing, 90),
                (Stage::Completed, 100),
            ]
        );
    }

    #[test]
    fn test_regeneration_path() {
        assert_eq!(
            walk(Flow::Regeneration, CompanyOrigin::Existing),
            vec![
                (Stage::EvaluatingChecklist, 75),
                (Stage::Synthesizing, 90),
                (Stage::Completed, 100),
            ]
        );
    }

    #[test]
    fn test_stage_keys_and_messages() {
        let t = advance(Flow::FullIngestion, Stage::PersistingPages, CompanyOrigin::Created);
        let update = t.update.unwrap();
        assert_eq!(update.stage_key, Some("index"));
        assert_eq!(update.message, "Creating vector embeddings...");

        let done = advance(Flow::Regeneration, Stage::Synthesizing, CompanyOrigin::Existing);
        let update = done.update.unwrap();
        assert_eq!(update.stage_key, None);
        assert_eq!(update.message, "IPO Note regenerated successfully!");
    }

    #[test]
    fn test_terminal_stages_are_absorbing() {
        for stage in [Stage::Completed, Stage::Failed] {
            let t = advance(Flow::FullIngestion, stage, CompanyOrigin::Created);
            assert_eq!(t.next, stage);
            assert!(t.update.is_none());
        }
    }

    #[test]
    fn test_fail_moves_non_terminal_stages() {
        assert_eq!(Stage::Indexing.fail(), Stage::Failed);
        assert_eq!(Stage::Idle.fail(), Stage::Failed);
        assert_eq!(Stage::Completed.fail(), Stage::Completed);
    }
}
