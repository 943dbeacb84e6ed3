//! Promotional notices: administratively authored messages shown to students.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

use crate::document::Document;

/// `grupoObjetivo` value that targets every student.
pub const ALL_STUDENTS: &str = "Todos los estudiantes";

/// A stored promotional notice.
///
/// Fields outside the known set are carried in `extra` and written back
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionalNotice {
  pub id:                   String,
  pub departamento:         String,
  pub enlace:               String,
  pub descripcion:          String,
  pub grupo_objetivo:       String,
  #[serde(default)]
  pub matricula_especifica: Option<String>,
  /// Free-form; clients send either a label or a number.
  pub prioridad:            Value,
  pub activa:               bool,
  #[serde(serialize_with = "millis")]
  pub fecha_creacion:       DateTime<Utc>,
  #[serde(flatten)]
  pub extra:                Document,
}

impl PromotionalNotice {
  pub const ACTIVE_FIELD: &'static str = "activa";
  pub const GROUP_FIELD: &'static str = "grupoObjetivo";
  pub const MATRICULA_FIELD: &'static str = "matriculaEspecifica";
  pub const CREATED_FIELD: &'static str = "fechaCreacion";

  /// Serialise into the document shape written to the store.
  pub fn to_document(&self) -> serde_json::Result<Document> {
    match serde_json::to_value(self)? {
      Value::Object(map) => Ok(map),
      _ => Ok(Document::new()),
    }
  }
}

/// `fechaCreacion` is always written with millisecond precision and a `Z`
/// suffix, so string order in the store is chronological order.
fn millis<S: Serializer>(at: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
  s.serialize_str(&at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Input for creating a notice. Validation of required fields happens at the
/// HTTP boundary.
#[derive(Debug, Clone)]
pub struct NewPromotion {
  pub departamento:         String,
  pub enlace:               String,
  pub descripcion:          String,
  pub grupo_objetivo:       String,
  pub matricula_especifica: Option<String>,
  pub prioridad:            Value,
}

impl NewPromotion {
  /// Stamp id, creation time and the active flag.
  pub fn into_notice(self, now: DateTime<Utc>) -> PromotionalNotice {
    PromotionalNotice {
      id:                   new_promotion_id(now),
      departamento:         self.departamento,
      enlace:               self.enlace,
      descripcion:          self.descripcion,
      grupo_objetivo:       self.grupo_objetivo,
      matricula_especifica: self.matricula_especifica,
      prioridad:            self.prioridad,
      activa:               true,
      fecha_creacion:       now,
      extra:                Document::new(),
    }
  }
}

/// `promo_<unix millis>_<9 random hex chars>`
fn new_promotion_id(now: DateTime<Utc>) -> String {
  let random = Uuid::new_v4().simple().to_string();
  format!("promo_{}_{}", now.timestamp_millis(), &random[..9])
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use serde_json::json;

  use super::*;

  fn sample(group: &str, specific: Option<&str>) -> PromotionalNotice {
    NewPromotion {
      departamento:         "Salud".into(),
      enlace:               "https://example.mx/vacunas".into(),
      descripcion:          "Jornada de vacunación".into(),
      grupo_objetivo:       group.into(),
      matricula_especifica: specific.map(str::to_owned),
      prioridad:            json!("alta"),
    }
    .into_notice(Utc.with_ymd_and_hms(2025, 10, 6, 14, 3, 6).unwrap())
  }

  #[test]
  fn id_has_expected_shape() {
    let n = sample(ALL_STUDENTS, None);
    let parts: Vec<&str> = n.id.split('_').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "promo");
    assert_eq!(parts[1], "1759759386000");
    assert_eq!(parts[2].len(), 9);
    assert!(n.activa);
  }

  #[test]
  fn stored_notice_serialises_as_read() {
    let stored = json!({
      "id": "promo_1", "departamento": "d", "enlace": "e", "descripcion": "x",
      "grupoObjetivo": ALL_STUDENTS, "matriculaEspecifica": null, "prioridad": 2,
      "activa": true, "fechaCreacion": "2025-10-06T14:03:06.000Z",
      "imagen": "https://example.mx/banner.png"
    });
    let notice: PromotionalNotice = serde_json::from_value(stored.clone()).unwrap();
    assert_eq!(notice.extra["imagen"], json!("https://example.mx/banner.png"));
    assert_eq!(serde_json::to_value(&notice).unwrap(), stored);
  }

  #[test]
  fn document_uses_wire_names() {
    let doc = sample("Posgrado", None).to_document().unwrap();
    assert_eq!(doc["grupoObjetivo"], json!("Posgrado"));
    assert_eq!(doc["matriculaEspecifica"], Value::Null);
    assert_eq!(doc["fechaCreacion"], json!("2025-10-06T14:03:06.000Z"));
    assert_eq!(doc["activa"], json!(true));
  }
}
