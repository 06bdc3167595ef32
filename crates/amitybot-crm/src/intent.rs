//! Lead intent detection for the chat lead tool.

use lazy_static::lazy_static;
use regex::Regex;

use crate::leads::Lead;

lazy_static! {
    /// Tried in order; the first match wins.
    static ref LEAD_ID_PATTERNS: Vec<Regex> = [
        r"lead\s*#?(\d+)",
        r"#(\d+)",
        r"id\s*#?(\d+)",
        r"(\d{3,})",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();

    static ref HAS_DIGIT: Regex = Regex::new(r"\d+").unwrap();
}

const LEAD_KEYWORDS: &[&str] = &[
    "lead", "leads", "status", "customer", "prospect",
    "enquiry", "inquiry", "application", "student id",
    "registration", "admission",
];

/// Pull a lead id such as `123` out of "what is the status of lead #123?".
pub fn extract_lead_id(question: &str) -> Option<String> {
    let lower = question.to_lowercase();
    LEAD_ID_PATTERNS
        .iter()
        .find_map(|re| re.captures(&lower))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// A lead keyword and a number both have to be present.
pub fn is_lead_related_query(question: &str) -> bool {
    let lower = question.to_lowercase();
    LEAD_KEYWORDS.iter().any(|k| lower.contains(k)) && HAS_DIGIT.is_match(question)
}

/// Markdown summary of a lead; optional fields are omitted when absent.
pub fn format_lead(lead: &Lead) -> String {
    let mut out = format!("📋 **Lead Information for #{}**\n\n", lead.id);
    out.push_str(&format!("👤 **Name:** {}\n", lead.name));
    out.push_str(&format!("📊 **Status:** {}\n", lead.status));

    let optional = [
        ("📧 **Email:**", lead.email.clone()),
        ("📱 **Phone:**", lead.phone.clone()),
        ("🎓 **Course Interest:**", lead.course_interest.clone()),
        ("👨‍💼 **Assigned Counselor:**", lead.assigned_counselor.clone()),
        ("📅 **Last Contact:**", lead.last_contact.map(|d| d.to_string())),
        ("📝 **Notes:**", lead.notes.clone()),
    ];
    for (label, value) in optional {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            out.push_str(&format!("{label} {v}\n"));
        }
    }
    out
}
