//! Presentation view of an analysis result

use serde::Serialize;
use std::fmt;

use crate::config::BackendOrigin;
use crate::models::AnalysisResult;

/// Colour band of a 0-100 score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    High,
    Medium,
    Low,
}

impl ScoreBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreBand::High => "high",
            ScoreBand::Medium => "medium",
            ScoreBand::Low => "low",
        }
    }
}

/// Styling class of a correction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityClass {
    Critical,
    Warning,
    Info,
    Default,
}

impl SeverityClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeverityClass::Critical => "critical",
            SeverityClass::Warning => "warning",
            SeverityClass::Info => "info",
            SeverityClass::Default => "default",
        }
    }
}

/// high at 80 and above, medium from 60, low below
pub fn score_band(score: u8) -> ScoreBand {
    match score {
        80.. => ScoreBand::High,
        60..=79 => ScoreBand::Medium,
        _ => ScoreBand::Low,
    }
}

pub fn severity_class(severity: &str) -> SeverityClass {
    match severity {
        "critical" => SeverityClass::Critical,
        "warning" => SeverityClass::Warning,
        "info" => SeverityClass::Info,
        _ => SeverityClass::Default,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrectionView {
    pub issue: String,
    pub class: SeverityClass,
    pub feedback: String,
    pub correction_instruction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AspectView {
    pub name: String,
    pub score: u8,
    pub band: ScoreBand,
    pub feedback: String,
}

/// Read-only view model of a report.
///
/// Each section is `None` when the result omits it or it is empty, so a
/// missing section never suppresses the rest of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
    pub overall_score: u8,
    pub overall_band: ScoreBand,
    pub summary: Option<String>,
    pub strengths: Option<Vec<String>>,
    pub corrections: Option<Vec<CorrectionView>>,
    pub breakdown: Option<Vec<AspectView>>,
    pub tips: Option<Vec<String>>,
    /// Absolute URL of the annotated video
    pub overlay_video: Option<String>,
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

impl ReportView {
    pub fn from_result(result: &AnalysisResult, origin: &BackendOrigin) -> Self {
        let corrections = result
            .corrections_needed
            .iter()
            .map(|c| CorrectionView {
                issue: c.issue.clone(),
                class: severity_class(c.severity.as_str()),
                feedback: c.feedback.clone(),
                correction_instruction: c.correction_instruction.clone(),
            })
            .collect();

        let breakdown = result
            .detailed_breakdown
            .iter()
            .map(|(name, aspect)| AspectView {
                name: name.clone(),
                score: aspect.score,
                band: score_band(aspect.score),
                feedback: aspect.feedback.clone(),
            })
            .collect();

        Self {
            overall_score: result.overall_score,
            overall_band: score_band(result.overall_score),
            summary: result.summary.clone().filter(|s| !s.trim().is_empty()),
            strengths: non_empty(result.whats_right.clone()),
            corrections: non_empty(corrections),
            breakdown: non_empty(breakdown),
            tips: non_empty(result.improvement_tips.clone()),
            overlay_video: result
                .overlay_url
                .as_deref()
                .filter(|u| !u.trim().is_empty())
                .map(|u| origin.join(u)),
        }
    }

    /// Plain-text rendering for terminals
    pub fn render_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ReportView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Overall score: {}/100 [{}]", self.overall_score, self.overall_band.as_str())?;
        if let Some(summary) = &self.summary {
            writeln!(f, "{}", summary)?;
        }

        if let Some(strengths) = &self.strengths {
            writeln!(f, "\nWhat you're doing right:")?;
            for item in strengths {
                writeln!(f, "  + {}", item)?;
            }
        }

        if let Some(corrections) = &self.corrections {
            writeln!(f, "\nCorrections needed:")?;
            for c in corrections {
                writeln!(f, "  [{}] {}", c.class.as_str(), c.issue)?;
                if !c.feedback.is_empty() {
                    writeln!(f, "      {}", c.feedback)?;
                }
                if !c.correction_instruction.is_empty() {
                    writeln!(f, "      Fix: {}", c.correction_instruction)?;
                }
            }
        }

        if let Some(breakdown) = &self.breakdown {
            writeln!(f, "\nDetailed breakdown:")?;
            for aspect in breakdown {
                writeln!(
                    f,
                    "  {:<20} {:>3} [{}] {}",
                    display_aspect(&aspect.name),
                    aspect.score,
                    aspect.band.as_str(),
                    aspect.feedback
                )?;
            }
        }

        if let Some(tips) = &self.tips {
            writeln!(f, "\nImprovement tips:")?;
            for tip in tips {
                writeln!(f, "  - {}", tip)?;
            }
        }

        if let Some(url) = &self.overlay_video {
            writeln!(f, "\nAnnotated video: {}", url)?;
        }

        Ok(())
    }
}

/// `neck_alignment` -> `Neck Alignment`
fn display_aspect(name: &str) -> String {
    name.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_analysis_body;

    fn origin() -> BackendOrigin {
        BackendOrigin::parse("http://localhost:5000").unwrap()
    }

    #[test]
    fn test_score_band_boundaries() {
        assert_eq!(score_band(85), ScoreBand::High);
        assert_eq!(score_band(80), ScoreBand::High);
        assert_eq!(score_band(100), ScoreBand::High);
        assert_eq!(score_band(79), ScoreBand::Medium);
        assert_eq!(score_band(60), ScoreBand::Medium);
        assert_eq!(score_band(59), ScoreBand::Low);
        assert_eq!(score_band(0), ScoreBand::Low);
    }

    #[test]
    fn test_severity_class_mapping() {
        assert_eq!(severity_class("critical"), SeverityClass::Critical);
        assert_eq!(severity_class("warning"), SeverityClass::Warning);
        assert_eq!(severity_class("info"), SeverityClass::Info);
        assert_eq!(severity_class("banana"), SeverityClass::Default);
        assert_eq!(severity_class(""), SeverityClass::Default);
        assert_eq!(severity_class("Critical"), SeverityClass::Default);
    }

    #[test]
    fn test_sections_are_suppressed_independently() {
        let result = parse_analysis_body(br#"{
            "overall_score": 64,
            "whats_right": [],
            "corrections_needed": [{"issue": "Neck not neutral", "severity": "info",
                "feedback": "Head dropping", "correction_instruction": "Gaze ahead"}],
            "improvement_tips": ["Film from the side"]
        }"#)
        .unwrap();

        let view = ReportView::from_result(&result, &origin());
        assert_eq!(view.overall_band, ScoreBand::Medium);
        assert!(view.strengths.is_none());
        assert!(view.breakdown.is_none());
        assert!(view.overlay_video.is_none());
        assert_eq!(view.corrections.as_ref().unwrap()[0].class, SeverityClass::Info);
        assert_eq!(view.tips.as_ref().unwrap().len(), 1);

        let text = view.render_text();
        assert!(text.contains("Overall score: 64/100 [medium]"));
        assert!(text.contains("[info] Neck not neutral"));
        assert!(!text.contains("What you're doing right"));
        assert!(!text.contains("Detailed breakdown"));
    }

    #[test]
    fn test_breakdown_and_overlay_render() {
        let result = parse_analysis_body(br#"{
            "overall_score": 88,
            "summary": "Good form with some areas for improvement.",
            "detailed_breakdown": {
                "elbow_depth": {"score": 95, "feedback": "Bottom elbow angle 68."},
                "body_line": {"score": 50, "feedback": "Hip deviation 0.14."}
            },
            "overlay_url": "/outputs/overlay_123.mp4"
        }"#)
        .unwrap();

        let view = ReportView::from_result(&result, &origin());
        let breakdown = view.breakdown.as_ref().unwrap();
        assert_eq!(breakdown.len(), 2);
        let body_line = breakdown.iter().find(|a| a.name == "body_line").unwrap();
        assert_eq!(body_line.band, ScoreBand::Low);
        assert_eq!(view.overlay_video.as_deref(), Some("http://localhost:5000/outputs/overlay_123.mp4"));

        let text = view.render_text();
        assert!(text.contains("Elbow Depth"));
        assert!(text.contains("Good form with some areas"));
        assert!(text.contains("Annotated video: http://localhost:5000/outputs/overlay_123.mp4"));
    }

    #[test]
    fn test_full_report_layout() {
        let result = parse_analysis_body(br#"{
            "overall_score": 82,
            "whats_right": ["Solid push-up depth."],
            "corrections_needed": [{"issue": "Hip sag", "severity": "critical",
                "feedback": "Hips drop mid-rep", "correction_instruction": "Brace your core"}],
            "detailed_breakdown": {"body_line": {"score": 61, "feedback": "Slight sag"}},
            "improvement_tips": ["Slow the descent"],
            "overlay_url": "/outputs/o.mp4"
        }"#)
        .unwrap();

        let view = ReportView::from_result(&result, &origin());
        let expected = "Overall score: 82/100 [high]\n\
            \nWhat you're doing right:\n  + Solid push-up depth.\n\
            \nCorrections needed:\n  [critical] Hip sag\n      Hips drop mid-rep\n      Fix: Brace your core\n\
            \nDetailed breakdown:\n  Body Line             61 [medium] Slight sag\n\
            \nImprovement tips:\n  - Slow the descent\n\
            \nAnnotated video: http://localhost:5000/outputs/o.mp4\n";
        assert_eq!(view.render_text(), expected);
        assert_eq!(format!("{}", view), expected);
    }

    #[test]
    fn test_blank_overlay_is_ignored() {
        let result = parse_analysis_body(br#"{"overall_score": 70, "overlay_url": ""}"#).unwrap();
        assert!(ReportView::from_result(&result, &origin()).overlay_video.is_none());
    }

    #[test]
    fn test_display_aspect() {
        assert_eq!(display_aspect("neck_alignment"), "Neck Alignment");
        assert_eq!(display_aspect("depth"), "Depth");
    }
}
