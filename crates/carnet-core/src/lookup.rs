//! [`LookupService`] resolves a matricula into the documents served to the
//! student.
//!
//! The service never decides between failing open and failing closed. Store
//! failures come back as [`LookupError`]; unknown identifiers come back as
//! `Ok(None)` or an empty vector. Each HTTP endpoint picks its own policy.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::{
  LookupError,
  document::{Document, Event, Profile, strip_internal},
  promotion::{ALL_STUDENTS, NewPromotion, PromotionalNotice},
  query::{Direction, Filter, Query},
  store::{Container, DocumentStore},
};

/// Read-side façade over a [`DocumentStore`].
///
/// Cloning only bumps the store reference count.
pub struct LookupService<S> {
  store: Arc<S>,
}

impl<S> Clone for LookupService<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: DocumentStore> LookupService<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Resolve the profile for `matricula`.
  ///
  /// Tries a point read on `carnet:{matricula}` first. Only a "not found"
  /// result falls back to a query on the `matricula` field; any other read
  /// failure is returned as is. When the query yields several documents the
  /// first one wins.
  pub async fn resolve_profile(
    &self,
    matricula: &str,
  ) -> Result<Option<Profile>, LookupError> {
    let key = Profile::key_for(matricula);

    if let Some(doc) = self
      .store
      .read(Container::Carnets, &key)
      .await
      .map_err(LookupError::store)?
    {
      return Ok(Some(Profile::from_document(doc)));
    }

    debug!(%matricula, "no carnet under direct key, querying by field");
    let query = Query::filter(Filter::eq(Profile::MATRICULA_FIELD, matricula));
    let docs = self
      .store
      .query(Container::Carnets, &query)
      .await
      .map_err(LookupError::store)?;

    if docs.len() > 1 {
      warn!(
        %matricula,
        matches = docs.len(),
        "several carnets share one matricula; using the first"
      );
    }

    Ok(docs.into_iter().next().map(Profile::from_document))
  }

  /// All events for `matricula`, most recent start time first.
  pub async fn resolve_events(
    &self,
    matricula: &str,
  ) -> Result<Vec<Event>, LookupError> {
    let query = Query::filter(Filter::eq(Event::MATRICULA_FIELD, matricula))
      .order_by(Event::START_FIELD, Direction::Desc);

    let docs = self
      .store
      .query(Container::Citas, &query)
      .await
      .map_err(LookupError::store)?;

    Ok(docs.into_iter().map(Event::from_document).collect())
  }

  /// Active notices addressed to every student or to `matricula`
  /// specifically, newest first.
  ///
  /// Documents that do not decode as a notice are skipped with a warning.
  pub async fn resolve_promotions(
    &self,
    matricula: &str,
  ) -> Result<Vec<PromotionalNotice>, LookupError> {
    let query = Query::filter(Filter::And(vec![
      Filter::eq(PromotionalNotice::ACTIVE_FIELD, true),
      Filter::Or(vec![
        Filter::eq(PromotionalNotice::GROUP_FIELD, ALL_STUDENTS),
        Filter::eq(PromotionalNotice::MATRICULA_FIELD, matricula),
      ]),
    ]))
    .order_by(PromotionalNotice::CREATED_FIELD, Direction::Desc);

    let docs = self
      .store
      .query(Container::Promociones, &query)
      .await
      .map_err(LookupError::store)?;

    Ok(
      docs
        .into_iter()
        .filter_map(|doc| match decode_notice(doc) {
          Ok(notice) => Some(notice),
          Err(e) => {
            warn!(error = %e, "skipping malformed promotional notice");
            None
          }
        })
        .collect(),
    )
  }

  /// Persist a new notice and return it as stored.
  pub async fn create_promotion(
    &self,
    input: NewPromotion,
  ) -> Result<PromotionalNotice, LookupError> {
    let notice = input.into_notice(Utc::now());
    let doc = notice.to_document().map_err(|source| LookupError::Decode {
      container: Container::Promociones,
      source,
    })?;

    let stored = self
      .store
      .create(Container::Promociones, doc)
      .await
      .map_err(LookupError::store)?;

    decode_notice(stored)
  }
}

fn decode_notice(doc: Document) -> Result<PromotionalNotice, LookupError> {
  serde_json::from_value(serde_json::Value::Object(strip_internal(doc)))
    .map_err(|source| LookupError::Decode {
      container: Container::Promociones,
      source,
    })
}
