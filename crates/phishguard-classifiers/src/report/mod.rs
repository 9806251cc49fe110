//! Self-contained HTML training report.
pub mod plots;

use std::path::Path;

use maud::{html, Markup, PreEscaped, DOCTYPE};
use plotly::Plot;

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result, Stage};
use crate::pipeline::TrainingOutcome;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.12.1.min.js";

pub struct ReportSection {
    title: String,
    content: Vec<Markup>,
}

impl ReportSection {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            content: Vec::new(),
        }
    }

    pub fn add_content(&mut self, markup: Markup) {
        self.content.push(markup);
    }

    pub fn add_plot(&mut self, plot: Plot) {
        let div_id = format!(
            "plot-{}-{}",
            self.title.to_lowercase().replace(' ', "-"),
            self.content.len()
        );
        self.content
            .push(PreEscaped(plot.to_inline_html(Some(div_id.as_str()))));
    }
}

pub struct Report {
    title: String,
    subtitle: String,
    sections: Vec<ReportSection>,
}

impl Report {
    pub fn new(title: &str, subtitle: &str) -> Self {
        Self {
            title: title.to_string(),
            subtitle: subtitle.to_string(),
            sections: Vec::new(),
        }
    }

    pub fn add_section(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    pub fn render(&self) -> String {
        html! {
            (DOCTYPE)
            html {
                head {
                    meta charset="utf-8";
                    title { (self.title) }
                    script src=(PLOTLY_CDN) {}
                    style {
                        "body { font-family: sans-serif; margin: 2em; }
                        table { border-collapse: collapse; }
                        td, th { border: 1px solid #ccc; padding: 4px 8px; text-align: left; }
                        pre { background-color: #f5f5f5; padding: 10px; border-radius: 5px; }"
                    }
                }
                body {
                    h1 { (self.title) }
                    p { (self.subtitle) }
                    @for s in &self.sections {
                        section {
                            h2 { (s.title) }
                            @for block in &s.content {
                                (block)
                            }
                        }
                    }
                }
            }
        }
        .into_string()
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render()).map_err(|e| PipelineError::io(path, e))
    }
}

/// Summary of one successful run: winner, candidate scores, class balance
/// and the configuration used.
pub fn training_report(outcome: &TrainingOutcome, config: &PipelineConfig) -> Result<Report> {
    let mut report = Report::new(
        "PhishGuard Training Report",
        &format!(
            "{} pipeline, finished {}",
            outcome.variant,
            outcome.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
    );

    /* Section 1: Overview */
    {
        let mut overview = ReportSection::new("Overview");
        overview.add_content(html! {
            table {
                tr { th { "Selected model" } td { (outcome.winner.name()) } }
                tr { th { "Selected by" } td { (format!("{:?}", outcome.metric)) } }
                tr { th { "Held-out accuracy" } td { (format!("{:.4}", outcome.held_out.accuracy)) } }
                tr { th { "Held-out precision" } td { (format!("{:.4}", outcome.held_out.precision)) } }
                tr { th { "Held-out recall" } td { (format!("{:.4}", outcome.held_out.recall)) } }
                tr { th { "Quality threshold" } td { (config.expected_accuracy.to_string()) } }
                @for (name, value) in &outcome.params {
                    tr { th { "param " (name) } td { (value.to_string()) } }
                }
            }
        });
        if let Some(tuning) = &outcome.tuning {
            overview.add_content(html! {
                p {
                    "Grid search over " (tuning.combinations.to_string()) " combinations, "
                    (config.cv_folds.to_string()) "-fold mean accuracy "
                    (format!("{:.4}", tuning.mean_accuracy)) "."
                }
            });
        }
        report.add_section(overview);
    }

    /* Section 2: Candidates */
    {
        let mut candidates = ReportSection::new("Candidates");
        candidates.add_plot(plots::plot_candidate_scores(
            &outcome.candidates,
            "Held-out scores with default parameters",
        ));
        report.add_section(candidates);
    }

    /* Section 3: Data */
    {
        let mut data = ReportSection::new("Data");
        data.add_plot(plots::plot_class_balance(
            &outcome.balance,
            &outcome.label_mapping,
            "Training classes before and after oversampling",
        ));
        let v = &outcome.validation;
        data.add_content(html! {
            table {
                tr { th { "Train shape" } td { (v.x_train_shape) } }
                tr { th { "Test shape" } td { (v.x_test_shape) } }
                tr { th { "Missing cells (train / test)" } td { (v.missing_x_train.to_string()) " / " (v.missing_x_test.to_string()) } }
                tr { th { "Test classes" } td { (v.class_distribution_test) } }
            }
        });
        report.add_section(data);
    }

    /* Section 4: Configuration */
    {
        let mut section = ReportSection::new("Configuration");
        let json = serde_json::to_string_pretty(config).map_err(|e| {
            PipelineError::schema(Stage::Persistence, format!("cannot render configuration: {}", e))
        })?;
        section.add_content(html! {
            pre { code { (json) } }
        });
        report.add_section(section);
    }

    Ok(report)
}
