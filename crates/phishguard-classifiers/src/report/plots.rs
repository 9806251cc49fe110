use plotly::layout::{Axis, BarMode, Layout};
use plotly::{Bar, Plot};

use crate::balancer::BalanceReport;
use crate::data_handling::LabelMapping;
use crate::selection::CandidateScore;

/// Grouped bar chart of held-out accuracy and precision per candidate
pub fn plot_candidate_scores(candidates: &[CandidateScore], title: &str) -> Plot {
    let names: Vec<String> = candidates.iter().map(|c| c.kind.to_string()).collect();
    let accuracy: Vec<f64> = candidates.iter().map(|c| c.scores.accuracy).collect();
    let precision: Vec<f64> = candidates.iter().map(|c| c.scores.precision).collect();

    let mut plot = Plot::new();
    plot.add_trace(Bar::new(names.clone(), accuracy).name("Accuracy"));
    plot.add_trace(Bar::new(names, precision).name("Precision"));
    plot.set_layout(
        Layout::new()
            .title(title)
            .bar_mode(BarMode::Group)
            .x_axis(Axis::new().title("Model"))
            .y_axis(Axis::new().title("Score").range(vec![0.0, 1.0])),
    );
    plot
}

/// Training class counts before and after oversampling
pub fn plot_class_balance(balance: &BalanceReport, labels: &LabelMapping, title: &str) -> Plot {
    let class_name = |class: &usize| {
        format!("{} ({})", class, labels.name(*class).unwrap_or("?"))
    };
    let before_x: Vec<String> = balance.before.keys().map(class_name).collect();
    let before_y: Vec<usize> = balance.before.values().copied().collect();
    let after_x: Vec<String> = balance.after.keys().map(class_name).collect();
    let after_y: Vec<usize> = balance.after.values().copied().collect();

    let mut plot = Plot::new();
    plot.add_trace(Bar::new(before_x, before_y).name("Before"));
    plot.add_trace(Bar::new(after_x, after_y).name("After"));
    plot.set_layout(
        Layout::new()
            .title(title)
            .bar_mode(BarMode::Group)
            .x_axis(Axis::new().title("Class"))
            .y_axis(Axis::new().title("Rows")),
    );
    plot
}
