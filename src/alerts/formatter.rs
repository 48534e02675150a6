//! Alert message rendering (Telegram MarkdownV2)

use chrono::{DateTime, Utc};

use crate::data::{GatewayReport, LinkReport, NO_DATA};

/// Characters with markup meaning in MarkdownV2
pub const RESERVED: &[char] = &[
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Placeholder shown instead of an unknown terminal count
const UNKNOWN_COUNT: &str = "\\-";

const DETECTION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S %Z";

/// Prefix every reserved character with a backslash
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 4);
    for c in text.chars() {
        if RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Renders gateway reports into alert messages
#[derive(Debug, Clone, Default)]
pub struct ReportFormatter {
    mentions: Vec<String>,
}

impl ReportFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles to CC at the bottom of every alert
    pub fn with_mentions(mut self, mentions: Vec<String>) -> Self {
        self.mentions = mentions;
        self
    }

    /// Render with the current time as detection fallback
    pub fn format(&self, report: &GatewayReport) -> Option<String> {
        self.render(report, Utc::now())
    }

    /// Render a report; healthy reports produce no message.
    ///
    /// `now` is only used when the first link carries no observation time.
    pub fn render(&self, report: &GatewayReport, now: DateTime<Utc>) -> Option<String> {
        if report.is_healthy() {
            return None;
        }

        let mut message = String::new();
        message.push_str(&format!(
            "🚨 *CRITICAL ALERT: {} SATNETS DOWN* 🚨\n",
            report.links.len()
        ));
        message.push_str(&format!(
            "🔰 *GATEWAY: {}*\n",
            escape_markdown(&report.gateway_display_name)
        ));
        message.push_str(&escape_markdown("────────────────────────────────"));
        message.push_str("\n\n");

        for link in &report.links {
            render_link(&mut message, link);
        }

        let detected_at = report
            .links
            .first()
            .and_then(|l| l.observed_at)
            .unwrap_or(now);
        message.push_str(&format!(
            "🕒 *Time of Detection:* {}\n\n",
            escape_markdown(&detected_at.format(DETECTION_TIME_FORMAT).to_string())
        ));

        if !self.mentions.is_empty() {
            let mentions: Vec<String> = self.mentions.iter().map(|m| escape_markdown(m)).collect();
            message.push_str(&format!(
                "👥 *CC:* {} \\(please take a look\\)\n\n",
                mentions.join(" ")
            ));
        }

        message.push_str("*ACTION:* Immediate investigation required\\.");
        Some(message)
    }
}

fn render_link(out: &mut String, link: &LinkReport) {
    let forward = escape_markdown(&format!("{:.2}", link.forward_throughput));
    let ret = escape_markdown(&format!("{:.2}", link.return_throughput));

    out.push_str(&format!("🔻 *SATNET:* {}\n", escape_markdown(&link.link_id)));
    out.push_str(&format!("   ├─ *Fwd:* {} kbps `(LOW)`\n", forward));
    out.push_str(&format!("   ├─ *Rtn:* {} kbps\n", ret));
    out.push_str(&format!("   ├─ *Online:* {}\n", render_count(link.online_count)));
    out.push_str(&format!("   └─ *Offline:* {}\n\n", render_count(link.offline_count)));
}

fn render_count(count: Option<i64>) -> String {
    match count {
        Some(n) if n != NO_DATA => escape_markdown(&n.to_string()),
        _ => UNKNOWN_COUNT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn link(id: &str, fwd: f64, online: Option<i64>, offline: Option<i64>) -> LinkReport {
        LinkReport {
            link_id: id.to_string(),
            forward_throughput: fwd,
            return_throughput: 120.5,
            observed_at: Some(Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap()),
            online_count: online,
            offline_count: offline,
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("500.00"), "500\\.00");
        assert_eq!(escape_markdown("JYPN1-B001_SN01"), "JYPN1\\-B001\\_SN01");
        assert_eq!(escape_markdown("a\\b"), "a\\\\b");
        assert_eq!(escape_markdown("plain"), "plain");
    }

    #[test]
    fn test_every_reserved_char_is_escaped() {
        let input: String = RESERVED.iter().collect();
        let escaped = escape_markdown(&input);

        let mut chars = escaped.chars();
        for &c in RESERVED {
            assert_eq!(chars.next(), Some('\\'));
            assert_eq!(chars.next(), Some(c));
        }
        assert_eq!(chars.next(), None);
    }

    #[test]
    fn test_healthy_report_is_suppressed() {
        let report = GatewayReport::new("DB_ONE_MNK", "MANOKWARI");
        assert_eq!(ReportFormatter::new().render(&report, fixed_now()), None);
    }

    #[test]
    fn test_single_link_alert() {
        let report = GatewayReport::new("DB_ONE_JYP", "JAYAPURA")
            .with_link(link("L1", 500.0, Some(7), Some(3)));

        let message = ReportFormatter::new().render(&report, fixed_now()).unwrap();

        assert!(message.starts_with("🚨 *CRITICAL ALERT: 1 SATNETS DOWN* 🚨\n"));
        assert!(message.contains("🔰 *GATEWAY: JAYAPURA*\n"));
        assert!(message.contains("🔻 *SATNET:* L1\n"));
        assert!(message.contains("*Fwd:* 500\\.00 kbps `(LOW)`"));
        assert!(message.contains("*Rtn:* 120\\.50 kbps"));
        assert!(message.contains("*Online:* 7\n"));
        assert!(message.contains("*Offline:* 3\n"));
        assert!(message.contains("*Time of Detection:* 2025\\-03\\-01 08:30:00 UTC"));
        assert!(message.ends_with("*ACTION:* Immediate investigation required\\."));
        assert!(!message.contains("*CC:*"));
    }

    #[test]
    fn test_unknown_counts_use_placeholder() {
        let report = GatewayReport::new("A", "A")
            .with_link(link("NODATA", 1.0, Some(-1), Some(-1)))
            .with_link(link("FAILED", 1.0, None, None))
            .with_link(link("DARK", 1.0, Some(0), Some(12)));

        let message = ReportFormatter::new().render(&report, fixed_now()).unwrap();

        assert!(message.contains("3 SATNETS DOWN"));
        assert!(!message.contains("-1"));
        assert_eq!(message.matches("*Online:* \\-\n").count(), 2);
        assert_eq!(message.matches("*Offline:* \\-\n").count(), 2);
        assert!(message.contains("*Online:* 0\n"));
        assert!(message.contains("*Offline:* 12\n"));
    }

    #[test]
    fn test_link_names_are_escaped() {
        let hostile = "SN_01*[x](http://evil).!";
        let report = GatewayReport::new("A", "GW-(A)").with_link(link(hostile, 1.0, None, None));

        let message = ReportFormatter::new().render(&report, fixed_now()).unwrap();

        assert!(message.contains("*GATEWAY: GW\\-\\(A\\)*"));
        assert!(message.contains(&format!("*SATNET:* {}\n", escape_markdown(hostile))));
        assert!(!message.contains(hostile));
    }

    #[test]
    fn test_detection_time_falls_back_to_now() {
        let mut first = link("L1", 1.0, None, None);
        first.observed_at = None;
        let report = GatewayReport::new("A", "A").with_link(first);

        let message = ReportFormatter::new().render(&report, fixed_now()).unwrap();
        assert!(message.contains("*Time of Detection:* 2030\\-01\\-02 03:04:05 UTC"));
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let report = GatewayReport::new("DB_ONE_TMK", "TIMIKA")
            .with_link(link("L1", 10.0, Some(1), Some(2)))
            .with_link(link("L2", 20.0, None, None));

        let formatter = ReportFormatter::new().with_mentions(vec!["@noc".to_string()]);
        assert_eq!(formatter.format(&report), formatter.format(&report));
    }

    #[test]
    fn test_mentions_line() {
        let report = GatewayReport::new("A", "A").with_link(link("L1", 1.0, None, None));
        let formatter = ReportFormatter::new()
            .with_mentions(vec!["@noc_oncall".to_string(), "@field".to_string()]);

        let message = formatter.render(&report, fixed_now()).unwrap();
        assert!(message.contains("👥 *CC:* @noc\\_oncall @field \\(please take a look\\)\n\n*ACTION:*"));
    }
}
