//! Appointment snapshots as returned by the ModMed FHIR API.
//!
//! Only the fields the scheduling checks read are modelled; everything else in
//! the upstream resource is ignored.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Search result bundle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    /// Total number of matches reported by the server, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Appointment>,
}

/// A FHIR Appointment, reduced to the fields needed for conflict checks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    /// Resource type; bundles can carry `OperationOutcome` entries alongside appointments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Booking status (e.g., "booked", "cancelled").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Start instant, ISO 8601.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    /// End instant, ISO 8601.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minutes_duration: Option<i64>,

    #[serde(default)]
    pub participant: Vec<Participant>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<Reference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reference {
    /// Relative (`Practitioner/12`) or absolute reference string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Resource types an appointment participant can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Patient,
    Practitioner,
    Location,
}

impl ResourceKind {
    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "Patient" => Some(Self::Patient),
            "Practitioner" => Some(Self::Practitioner),
            "Location" => Some(Self::Location),
            _ => None,
        }
    }
}

/// Split a reference into its resource type and id.
///
/// Accepts relative references (`Practitioner/12`) and absolute ones
/// (`https://host/fhir/v2/Practitioner/12`). Returns `None` for any other
/// resource type or a missing id.
pub fn parse_reference(reference: &str) -> Option<(ResourceKind, &str)> {
    let segments: Vec<&str> = reference.split('/').collect();

    segments.windows(2).rev().find_map(|pair| {
        let kind = ResourceKind::from_segment(pair[0])?;
        let id = pair[1].trim();
        (!id.is_empty()).then_some((kind, id))
    })
}

impl Appointment {
    /// Ids of all participants of the given kind, in participant order.
    pub fn participant_ids(&self, kind: ResourceKind) -> impl Iterator<Item = &str> {
        self.participant
            .iter()
            .filter_map(|p| p.actor.as_ref()?.reference.as_deref())
            .filter_map(parse_reference)
            .filter(move |(k, _)| *k == kind)
            .map(|(_, id)| id)
    }

    /// Id of the first participant of the given kind.
    pub fn participant_id(&self, kind: ResourceKind) -> Option<&str> {
        self.participant_ids(kind).next()
    }

    /// Every practitioner this appointment books, without duplicates.
    pub fn provider_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for id in self.participant_ids(ResourceKind::Practitioner) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// The first practitioner this appointment books.
    pub fn provider_id(&self) -> Option<&str> {
        self.participant_id(ResourceKind::Practitioner)
    }

    pub fn patient_id(&self) -> Option<&str> {
        self.participant_id(ResourceKind::Patient)
    }

    pub fn location_id(&self) -> Option<&str> {
        self.participant_id(ResourceKind::Location)
    }

    fn is_appointment(&self) -> bool {
        self.resource_type.as_deref().unwrap_or("Appointment") == "Appointment"
    }
}

impl Bundle {
    /// Appointment resources that carry an id.
    pub fn appointments(&self) -> impl Iterator<Item = &Appointment> {
        self.entry
            .iter()
            .filter_map(|e| e.resource.as_ref())
            .filter(|a| a.is_appointment() && a.id.is_some())
    }
}

/// Parse an appointment timestamp.
///
/// RFC 3339 with an offset is preferred. A zone-less local form
/// (`2024-05-01T10:30` or `2024-05-01T10:30:00`), as produced by the booking
/// form, is read as UTC.
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.with_timezone(&Utc));
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}
