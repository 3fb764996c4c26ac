// DVSPortal wire types
//
// Response shapes of the `login` and `login/getbase` endpoints, plus the
// flattened `PermitRecord` the client hands out after an update. The
// portal uses PascalCase keys and nests one or more permit media under
// each permit; a record is produced per permit media.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

// ── Login ───────────────────────────────────────────────────────────

/// Body of `POST login`.
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub identifier: &'a str,
    #[serde(rename = "loginMethod")]
    pub login_method: &'static str,
    pub password: &'a str,
    #[serde(rename = "permitMediaTypeID")]
    pub permit_media_type_id: u32,
}

/// Response of `POST login`. A failed login still answers HTTP 200 but
/// fills `ErrorMessage` instead of `Token`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

// ── getbase ─────────────────────────────────────────────────────────

/// Response of `POST login/getbase`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BaseResponse {
    #[serde(default)]
    pub permits: Vec<PermitResponse>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PermitResponse {
    #[serde(deserialize_with = "string_or_number")]
    pub zone_code: String,
    #[serde(default)]
    pub permit_medias: Vec<PermitMediaResponse>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PermitMediaResponse {
    #[serde(rename = "TypeID")]
    pub type_id: i64,
    #[serde(deserialize_with = "string_or_number")]
    pub code: String,
    #[serde(default)]
    pub license_plates: Vec<LicensePlateResponse>,
    #[serde(default)]
    pub active_reservations: Vec<ReservationResponse>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LicensePlateResponse {
    pub value: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReservationResponse {
    #[serde(rename = "ReservationID", deserialize_with = "string_or_number")]
    pub reservation_id: String,
    pub valid_from: String,
    pub valid_until: String,
    pub license_plate: LicensePlateResponse,
}

impl BaseResponse {
    /// Flatten permits and their media into one record per permit media.
    pub fn into_permit_records(self) -> Vec<PermitRecord> {
        self.permits
            .into_iter()
            .flat_map(|permit| {
                let zone_code = permit.zone_code;
                permit
                    .permit_medias
                    .into_iter()
                    .map(move |media| PermitRecord::from_media(zone_code.clone(), media))
            })
            .collect()
    }
}

// ── Flattened records ───────────────────────────────────────────────

/// One parking permit as seen by consumers of the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitRecord {
    pub code: String,
    pub zone_code: String,
    pub type_id: i64,
    /// Plate → human label. Plates the portal reports without a name are
    /// not present.
    pub license_plates: IndexMap<String, String>,
    /// Active reservations in portal order.
    pub reservations: Vec<ReservationRecord>,
}

/// A reservation with its timestamps exactly as the portal sent them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRecord {
    pub id: String,
    pub license_plate: String,
    pub valid_from: String,
    pub valid_until: String,
}

impl PermitRecord {
    fn from_media(zone_code: String, media: PermitMediaResponse) -> Self {
        let license_plates = media
            .license_plates
            .into_iter()
            .filter_map(|lp| lp.name.map(|name| (lp.value, name)))
            .collect();

        let reservations = media
            .active_reservations
            .into_iter()
            .map(|r| ReservationRecord {
                id: r.reservation_id,
                license_plate: r.license_plate.value,
                valid_from: r.valid_from,
                valid_until: r.valid_until,
            })
            .collect();

        Self {
            code: media.code,
            zone_code,
            type_id: media.type_id,
            license_plates,
            reservations,
        }
    }
}

/// The portal is inconsistent about numeric vs. string identifiers.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}
