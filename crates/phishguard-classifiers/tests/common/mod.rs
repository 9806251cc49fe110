#![allow(dead_code)]

use phishguard_classifiers::data_handling::RecordFrame;
use phishguard_classifiers::features::url::{FetchError, PageFetcher, URL_FEATURE_NAMES};

/// Fetcher that always fails, as an unreachable host would.
pub struct Unreachable;

impl PageFetcher for Unreachable {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        Err(FetchError::Transport(format!("{}: connection refused", url)))
    }
}

fn indicator_row(index: usize, overrides: &[(&str, String)], result: Option<&str>) -> Vec<String> {
    let mut row = vec![index.to_string()];
    for name in URL_FEATURE_NAMES {
        let value = overrides
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| match name {
                "URL_Length" => "54".to_string(),
                _ => "0".to_string(),
            });
        row.push(value);
    }
    if let Some(result) = result {
        row.push(result.to_string());
    }
    row
}

fn indicator_columns(with_target: bool) -> Vec<String> {
    let mut columns = vec!["index".to_string()];
    columns.extend(URL_FEATURE_NAMES.iter().map(|s| s.to_string()));
    if with_target {
        columns.push("Result".to_string());
    }
    columns
}

/// 120 indicator rows, 48 phishing (`Result = -1`). `Shortining_Service`
/// separates the classes; `having_IP_Address` and `SSLfinal_State` mostly
/// agree with it and `Page_Rank` is noise with one missing cell.
pub fn phishing_table() -> RecordFrame {
    let rows = (0..120)
        .map(|i| {
            let phishing = i % 5 < 2;
            let ip = match (phishing, i % 7 == 0, i % 11 == 0) {
                (true, true, _) => "-1",
                (true, false, _) => "1",
                (false, _, true) => "1",
                (false, _, false) => "-1",
            };
            let ssl = if phishing || i % 13 == 0 { "0" } else { "1" };
            let page_rank = if i == 7 {
                "?".to_string()
            } else {
                ((i % 3) as i64 - 1).to_string()
            };
            indicator_row(
                i,
                &[
                    ("having_IP_Address", ip.to_string()),
                    ("SSLfinal_State", ssl.to_string()),
                    ("Shortining_Service", if phishing { "1" } else { "-1" }.to_string()),
                    ("Page_Rank", page_rank),
                ],
                Some(if phishing { "-1" } else { "1" }),
            )
        })
        .collect();
    RecordFrame::new(indicator_columns(true), rows).unwrap()
}

/// Two unlabeled rows: an obvious phishing row and an obvious safe row.
pub fn unlabeled_indicators() -> RecordFrame {
    let suspicious = indicator_row(
        0,
        &[
            ("having_IP_Address", "1".to_string()),
            ("SSLfinal_State", "0".to_string()),
            ("Shortining_Service", "1".to_string()),
        ],
        None,
    );
    let benign = indicator_row(
        1,
        &[
            ("having_IP_Address", "-1".to_string()),
            ("SSLfinal_State", "1".to_string()),
            ("Shortining_Service", "-1".to_string()),
        ],
        None,
    );
    RecordFrame::new(indicator_columns(false), vec![suspicious, benign]).unwrap()
}

/// Labels with no relation to the two features.
pub fn noise_table() -> RecordFrame {
    let rows = (0..100usize)
        .map(|i| {
            vec![
                i.to_string(),
                ((i * 31) % 7).to_string(),
                ((i * 17) % 5).to_string(),
                if (i * 7919) % 13 < 6 { "-1" } else { "1" }.to_string(),
            ]
        })
        .collect();
    RecordFrame::new(
        vec!["index".into(), "f1".into(), "f2".into(), "Result".into()],
        rows,
    )
    .unwrap()
}

const SPAM: [&str; 4] = [
    "WIN a FREE prize now, claim your cash reward",
    "Congratulations! You have won a free holiday, claim now",
    "URGENT: claim your free cash prize today",
    "Free entry to win cash, text WIN now",
];

const HAM: [&str; 5] = [
    "see you at lunch tomorrow",
    "are we still meeting at the office later",
    "can you call me when you get home",
    "thanks for dinner last night",
    "running late, be there in ten minutes",
];

/// SMS-style corpus with `v1` labels and `v2` messages.
pub fn sms_corpus() -> RecordFrame {
    let mut rows = Vec::new();
    for round in 0..6 {
        for message in HAM {
            rows.push(vec!["ham".to_string(), message.to_string()]);
        }
        if round % 2 == 0 {
            for message in SPAM {
                rows.push(vec!["spam".to_string(), message.to_string()]);
            }
        }
    }
    RecordFrame::new(vec!["v1".into(), "v2".into()], rows).unwrap()
}
