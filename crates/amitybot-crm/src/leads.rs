//! Lead records and the CAM (counselling and admissions) client.
//!
//! `CamClient` keeps leads in memory, seeded with fixture data. Anything
//! that talks to a real CRM implements `LeadRepository` instead.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{CrmError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub name: String,
    pub status: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub course_interest: Option<String>,
    pub last_contact: Option<NaiveDate>,
    pub assigned_counselor: Option<String>,
    pub created_at: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadStatusUpdate {
    pub id: String,
    pub old_status: String,
    pub new_status: String,
    pub last_contact: NaiveDate,
}

/// Optional filters for listing leads; all present filters must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadFilter {
    /// Case-insensitive substring of the lead name.
    pub name: Option<String>,
    /// Case-insensitive exact status.
    pub status: Option<String>,
    /// Case-insensitive substring of the assigned counselor.
    pub counselor: Option<String>,
}

impl LeadFilter {
    pub fn matches(&self, lead: &Lead) -> bool {
        let name_ok = self
            .name
            .as_deref()
            .map_or(true, |n| contains_ignore_case(&lead.name, n));
        let status_ok = self
            .status
            .as_deref()
            .map_or(true, |s| lead.status.eq_ignore_ascii_case(s.trim()));
        let counselor_ok = self.counselor.as_deref().map_or(true, |c| {
            lead.assigned_counselor
                .as_deref()
                .is_some_and(|assigned| contains_ignore_case(assigned, c))
        });
        name_ok && status_ok && counselor_ok
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn get(&self, id: &str) -> Result<Lead>;
    async fn list(&self) -> Result<Vec<Lead>>;

    async fn filter(&self, filter: &LeadFilter) -> Result<Vec<Lead>> {
        Ok(self.list().await?.into_iter().filter(|l| filter.matches(l)).collect())
    }

    async fn search_by_name(&self, name: &str) -> Result<Vec<Lead>> {
        self.filter(&LeadFilter { name: Some(name.to_string()), ..Default::default() }).await
    }

    async fn by_status(&self, status: &str) -> Result<Vec<Lead>> {
        self.filter(&LeadFilter { status: Some(status.to_string()), ..Default::default() }).await
    }

    async fn by_counselor(&self, counselor: &str) -> Result<Vec<Lead>> {
        self.filter(&LeadFilter { counselor: Some(counselor.to_string()), ..Default::default() })
            .await
    }

    /// Set a new status, stamp `last_contact` with today and append `notes`.
    async fn update_status(
        &self,
        id: &str,
        new_status: &str,
        notes: Option<&str>,
    ) -> Result<LeadStatusUpdate>;

    async fn health_check(&self) -> bool;
}

pub struct CamClient {
    leads: RwLock<Vec<Lead>>,
}

impl CamClient {
    pub fn new(leads: Vec<Lead>) -> Self {
        Self { leads: RwLock::new(leads) }
    }

    /// Client seeded with the fixture leads.
    pub fn with_fixtures() -> Self {
        let client = Self::new(fixture_leads());
        info!("CAM client initialised with fixture leads");
        client
    }
}

impl Default for CamClient {
    fn default() -> Self {
        Self::with_fixtures()
    }
}

#[async_trait]
impl LeadRepository for CamClient {
    async fn get(&self, id: &str) -> Result<Lead> {
        let id = id.trim();
        let leads = self.leads.read().await;
        match leads.iter().find(|l| l.id == id) {
            Some(lead) => {
                info!(lead_id = id, "Retrieved lead");
                Ok(lead.clone())
            }
            None => {
                warn!(lead_id = id, "Lead not found");
                Err(CrmError::LeadNotFound(id.to_string()))
            }
        }
    }

    async fn list(&self) -> Result<Vec<Lead>> {
        Ok(self.leads.read().await.clone())
    }

    async fn update_status(
        &self,
        id: &str,
        new_status: &str,
        notes: Option<&str>,
    ) -> Result<LeadStatusUpdate> {
        let new_status = new_status.trim();
        if new_status.is_empty() {
            return Err(CrmError::InvalidStatus(new_status.to_string()));
        }

        let mut leads = self.leads.write().await;
        let lead = leads
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| CrmError::LeadNotFound(id.to_string()))?;

        let old_status = std::mem::replace(&mut lead.status, new_status.to_string());
        let today = Local::now().date_naive();
        lead.last_contact = Some(today);
        if let Some(extra) = notes.map(str::trim).filter(|n| !n.is_empty()) {
            lead.notes = Some(match lead.notes.take() {
                Some(existing) if !existing.is_empty() => format!("{existing}; {extra}"),
                _ => extra.to_string(),
            });
        }

        info!(lead_id = id, old_status = %old_status, new_status, "Updated lead status");
        Ok(LeadStatusUpdate {
            id: id.to_string(),
            old_status,
            new_status: new_status.to_string(),
            last_contact: today,
        })
    }

    async fn health_check(&self) -> bool {
        !self.leads.read().await.is_empty()
    }
}

fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y, m, d)
}

#[allow(clippy::too_many_arguments)]
fn lead(
    id: &str,
    name: &str,
    status: &str,
    email: &str,
    phone: &str,
    course: &str,
    last_contact: Option<NaiveDate>,
    counselor: &str,
    created_at: Option<NaiveDate>,
    notes: &str,
) -> Lead {
    Lead {
        id: id.to_string(),
        name: name.to_string(),
        status: status.to_string(),
        email: Some(email.to_string()),
        phone: Some(phone.to_string()),
        course_interest: Some(course.to_string()),
        last_contact,
        assigned_counselor: Some(counselor.to_string()),
        created_at,
        notes: Some(notes.to_string()),
    }
}

pub fn fixture_leads() -> Vec<Lead> {
    vec![
        lead(
            "123", "John Doe", "Interested",
            "john.doe@email.com", "+91-9876543210", "B.Tech Computer Science",
            date(2024, 1, 15), "Ms. Priya Sharma", date(2024, 1, 10),
            "Interested in AI/ML specialization",
        ),
        lead(
            "456", "Jane Smith", "Not Responding",
            "jane.smith@email.com", "+91-9876543211", "MBA",
            date(2024, 1, 12), "Mr. Raj Kumar", date(2024, 1, 8),
            "Called multiple times, no response",
        ),
        lead(
            "789", "Rahul Gupta", "Application Submitted",
            "rahul.gupta@email.com", "+91-9876543212", "B.Com",
            date(2024, 1, 20), "Ms. Priya Sharma", date(2024, 1, 5),
            "Documents verified, awaiting admission decision",
        ),
        lead(
            "101", "Priya Patel", "Enrolled",
            "priya.patel@email.com", "+91-9876543213", "BCA",
            date(2024, 1, 22), "Mr. Raj Kumar", date(2024, 1, 1),
            "Successfully enrolled for 2024 batch",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixture_leads_are_seeded() {
        let cam = CamClient::with_fixtures();
        let ids: Vec<String> = cam.list().await.unwrap().into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["123", "456", "789", "101"]);
        assert_eq!(cam.get("123").await.unwrap().name, "John Doe");
        assert!(cam.health_check().await);
    }

    #[tokio::test]
    async fn test_unknown_lead() {
        let cam = CamClient::with_fixtures();
        let err = cam.get("999").await.unwrap_err();
        assert_eq!(err.to_string(), "No lead found with ID: 999");
    }

    #[tokio::test]
    async fn test_filters() {
        let cam = CamClient::with_fixtures();
        assert_eq!(cam.search_by_name("pat").await.unwrap()[0].id, "101");
        assert_eq!(cam.by_status("not responding").await.unwrap()[0].id, "456");

        let sharma: Vec<String> =
            cam.by_counselor("sharma").await.unwrap().into_iter().map(|l| l.id).collect();
        assert_eq!(sharma, vec!["123", "789"]);

        let both = cam
            .filter(&LeadFilter {
                counselor: Some("Raj".to_string()),
                status: Some("Enrolled".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].name, "Priya Patel");
    }

    #[tokio::test]
    async fn test_update_status_appends_notes() {
        let cam = CamClient::with_fixtures();
        let update = cam
            .update_status("456", "Interested", Some("Answered on third call"))
            .await
            .unwrap();
        assert_eq!(update.old_status, "Not Responding");
        assert_eq!(update.new_status, "Interested");

        let lead = cam.get("456").await.unwrap();
        assert_eq!(lead.status, "Interested");
        assert_eq!(lead.last_contact, Some(Local::now().date_naive()));
        assert_eq!(
            lead.notes.as_deref(),
            Some("Called multiple times, no response; Answered on third call")
        );
    }

    #[tokio::test]
    async fn test_update_without_notes_keeps_notes() {
        let cam = CamClient::with_fixtures();
        cam.update_status("101", "Alumni", None).await.unwrap();
        let lead = cam.get("101").await.unwrap();
        assert_eq!(lead.notes.as_deref(), Some("Successfully enrolled for 2024 batch"));
    }

    #[tokio::test]
    async fn test_update_unknown_lead() {
        let cam = CamClient::with_fixtures();
        assert!(matches!(
            cam.update_status("1", "Enrolled", None).await,
            Err(CrmError::LeadNotFound(_))
        ));
    }

    #[test]
    fn test_lead_dates_serialise_as_iso() {
        let json = serde_json::to_value(&fixture_leads()[0]).unwrap();
        assert_eq!(json["last_contact"], "2024-01-15");
    }
}
