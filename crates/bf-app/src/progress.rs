#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisStage {
    OpeningSimulation,
    LoadingStore,
    CheckingCache,
    Analyzing,
    SavingResults,
    Completed,
}

impl AnalysisStage {
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisStage::OpeningSimulation => "opening simulation",
            AnalysisStage::LoadingStore => "loading store",
            AnalysisStage::CheckingCache => "cached",
            AnalysisStage::Analyzing => "analyzing",
            AnalysisStage::SavingResults => "saving",
            AnalysisStage::Completed => "done",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisProgressEvent {
    pub simulation_id: String,
    pub stage: AnalysisStage,
    pub elapsed_wall_s: f64,
    /// Iterate being handled, during `CheckingCache` and `Analyzing`.
    pub iterate: Option<u64>,
    /// Iterates handled so far and in total.
    pub done: usize,
    pub total: usize,
    pub message: Option<String>,
}

impl AnalysisProgressEvent {
    pub fn stage(
        simulation_id: &str,
        stage: AnalysisStage,
        elapsed_wall_s: f64,
        message: Option<String>,
    ) -> Self {
        Self {
            simulation_id: simulation_id.to_string(),
            stage,
            elapsed_wall_s,
            iterate: None,
            done: 0,
            total: 0,
            message,
        }
    }

    pub fn fraction_complete(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.done as f64 / self.total as f64
    }
}
