use crate::config::{AgreementConfig, DraftConfig};
use crate::core::signature::{Point, SignatureEncoder, SignaturePad, Stroke};
use crate::domain::model::Customer;
use crate::domain::ports::DraftStore;
use crate::domain::work_order::Agreement;
use crate::utils::error::{IntakeError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Unread,
    Scrolled,
    Signing,
    ReadyToSubmit,
}

/// One of the conditions that must all hold before the agreement is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateCondition {
    Scrolled,
    Signed,
    NameMatches,
    Acknowledged,
}

impl GateCondition {
    pub fn label(&self) -> &'static str {
        match self {
            GateCondition::Scrolled => "read to the end",
            GateCondition::Signed => "signature",
            GateCondition::NameMatches => "typed name",
            GateCondition::Acknowledged => "acknowledgement",
        }
    }
}

impl fmt::Display for GateCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Scroll geometry of the agreement text, in the host's units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    pub fn fits_without_scrolling(&self) -> bool {
        self.scroll_height <= self.client_height
    }

    pub fn at_end(&self, tolerance: f64) -> bool {
        self.fits_without_scrolling()
            || self.scroll_height - self.scroll_top <= self.client_height + tolerance
    }
}

/// Cached agreement inputs. Never consulted for gating.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgreementDraft {
    pub customer_name: String,
    pub scroll_top: f64,
    pub typed_name: String,
    pub acknowledged: bool,
    pub strokes: Vec<Stroke>,
}

/// Gate in front of the mounting agreement signature.
///
/// Nothing can be entered until the text has been scrolled to the end, and that
/// transition never reverts. The gate opens only when the signature, the typed
/// name and the acknowledgement are all present.
#[derive(Debug, Clone)]
pub struct AgreementGate {
    expected_name: String,
    version: String,
    tolerance: f64,
    scrolled: bool,
    scroll_top: f64,
    pad: SignaturePad,
    typed_name: String,
    name_error: Option<String>,
    acknowledged: bool,
    pending: Option<AgreementDraft>,
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

impl AgreementGate {
    pub fn new(customer: &Customer, config: &AgreementConfig) -> Self {
        Self::with_pad(customer, config, SignaturePad::default())
    }

    pub fn with_pad(customer: &Customer, config: &AgreementConfig, pad: SignaturePad) -> Self {
        Self {
            expected_name: customer.full_name(),
            version: config.version.clone(),
            tolerance: config.scroll_tolerance,
            scrolled: false,
            scroll_top: 0.0,
            pad,
            typed_name: String::new(),
            name_error: None,
            acknowledged: false,
            pending: None,
        }
    }

    pub fn expected_name(&self) -> &str {
        &self.expected_name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn typed_name(&self) -> &str {
        &self.typed_name
    }

    pub fn name_error(&self) -> Option<&str> {
        self.name_error.as_deref()
    }

    pub fn is_acknowledged(&self) -> bool {
        self.acknowledged
    }

    pub fn pad(&self) -> &SignaturePad {
        &self.pad
    }

    pub fn is_scrolled(&self) -> bool {
        self.scrolled
    }

    pub fn state(&self) -> GateState {
        if !self.scrolled {
            GateState::Unread
        } else if self.can_continue() {
            GateState::ReadyToSubmit
        } else if self.pad.is_signed() || !self.typed_name.is_empty() || self.acknowledged {
            GateState::Signing
        } else {
            GateState::Scrolled
        }
    }

    /// First render; text that fits without scrolling counts as read.
    pub fn on_layout(&mut self, metrics: ScrollMetrics) -> GateState {
        self.on_scroll(metrics)
    }

    pub fn on_scroll(&mut self, metrics: ScrollMetrics) -> GateState {
        self.scroll_top = metrics.scroll_top;
        if !self.scrolled && metrics.at_end(self.tolerance) {
            self.scrolled = true;
            tracing::info!("Agreement read to the end");
            if let Some(draft) = self.pending.take() {
                self.apply_draft(draft);
            }
        }
        self.state()
    }

    fn unlocked(&self) -> Result<()> {
        if self.scrolled {
            Ok(())
        } else {
            Err(IntakeError::AgreementLocked)
        }
    }

    pub fn begin_stroke(&mut self, at: Point) -> Result<()> {
        self.unlocked()?;
        self.pad.begin_stroke(at);
        Ok(())
    }

    pub fn extend_stroke(&mut self, to: Point) -> Result<()> {
        self.unlocked()?;
        self.pad.extend_stroke(to);
        Ok(())
    }

    pub fn end_stroke(&mut self) -> Result<()> {
        self.unlocked()?;
        if self.pad.end_stroke() {
            tracing::debug!("Signature captured");
        }
        Ok(())
    }

    pub fn clear_signature(&mut self) -> Result<()> {
        self.unlocked()?;
        self.pad.clear();
        Ok(())
    }

    /// Records typed text. A mismatch sets [`Self::name_error`] but is never rejected.
    pub fn type_name(&mut self, text: &str) -> Result<()> {
        self.unlocked()?;
        self.record_name(text);
        Ok(())
    }

    fn record_name(&mut self, text: &str) {
        self.typed_name = text.to_string();
        self.name_error = if text.trim().is_empty() || self.name_matches() {
            None
        } else {
            Some(format!("Name must match: {}", self.expected_name))
        };
    }

    pub fn set_acknowledged(&mut self, acknowledged: bool) -> Result<()> {
        self.unlocked()?;
        self.acknowledged = acknowledged;
        Ok(())
    }

    fn name_matches(&self) -> bool {
        normalize_name(&self.typed_name) == normalize_name(&self.expected_name)
    }

    pub fn unmet(&self) -> Vec<GateCondition> {
        [
            (GateCondition::Scrolled, self.scrolled),
            (GateCondition::Signed, self.pad.is_signed()),
            (GateCondition::NameMatches, self.name_matches()),
            (GateCondition::Acknowledged, self.acknowledged),
        ]
        .into_iter()
        .filter(|(_, met)| !met)
        .map(|(condition, _)| condition)
        .collect()
    }

    pub fn can_continue(&self) -> bool {
        self.unmet().is_empty()
    }

    /// Exports the signature and produces the accepted agreement.
    pub fn accept(&self, encoder: &dyn SignatureEncoder, now: DateTime<Utc>) -> Result<Agreement> {
        let unmet = self.unmet();
        if !unmet.is_empty() {
            return Err(IntakeError::AgreementIncomplete {
                unmet: unmet.iter().map(ToString::to_string).collect(),
            });
        }

        let image = encoder.data_url(&self.pad)?;
        tracing::info!("Agreement {} accepted", self.version);
        Ok(Agreement::signed(
            self.version.clone(),
            self.typed_name.trim().to_string(),
            image,
            now,
        ))
    }

    pub fn snapshot(&self) -> AgreementDraft {
        AgreementDraft {
            customer_name: self.expected_name.clone(),
            scroll_top: self.scroll_top,
            typed_name: self.typed_name.clone(),
            acknowledged: self.acknowledged,
            strokes: self.pad.strokes().to_vec(),
        }
    }

    /// Restores cached inputs and returns the scroll position to jump back to.
    ///
    /// Inputs are held until the text has been read, and a draft for a
    /// different customer is ignored.
    pub fn restore(&mut self, draft: AgreementDraft) -> Option<f64> {
        if normalize_name(&draft.customer_name) != normalize_name(&self.expected_name) {
            tracing::debug!("Ignoring agreement draft for another customer");
            return None;
        }
        let scroll_top = draft.scroll_top;
        if self.scrolled {
            self.apply_draft(draft);
        } else {
            self.pending = Some(draft);
        }
        Some(scroll_top)
    }

    fn apply_draft(&mut self, draft: AgreementDraft) {
        self.pad.restore(draft.strokes);
        self.acknowledged = draft.acknowledged;
        self.record_name(&draft.typed_name);
    }
}

/// Best-effort persistence of [`AgreementDraft`] in a [`DraftStore`].
pub struct AgreementDraftCache<S: DraftStore> {
    store: S,
    key: String,
}

impl<S: DraftStore> AgreementDraftCache<S> {
    pub fn new(store: S, config: &DraftConfig) -> Self {
        Self {
            store,
            key: config.key.clone(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Unreadable or corrupt entries are dropped and reported as absent.
    pub async fn load(&self) -> Option<AgreementDraft> {
        let raw = match self.store.load(&self.key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("Failed to read agreement draft: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(draft) => Some(draft),
            Err(e) => {
                tracing::warn!("Discarding corrupt agreement draft: {}", e);
                self.clear().await;
                None
            }
        }
    }

    pub async fn save(&self, draft: &AgreementDraft) {
        let result = match serde_json::to_string(draft) {
            Ok(json) => self.store.save(&self.key, &json).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            tracing::warn!("Failed to save agreement draft: {}", e);
        }
    }

    pub async fn clear(&self) {
        if let Err(e) = self.store.remove(&self.key).await {
            tracing::warn!("Failed to clear agreement draft: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryDraftStore;
    use crate::core::signature::BitmapEncoder;
    use crate::core::testing::MockApi;

    const LONG_TEXT: ScrollMetrics = ScrollMetrics {
        scroll_top: 0.0,
        scroll_height: 2000.0,
        client_height: 400.0,
    };

    fn gate() -> AgreementGate {
        AgreementGate::new(&MockApi::jane(), &AgreementConfig::default())
    }

    fn scroll_to(gate: &mut AgreementGate, scroll_top: f64) -> GateState {
        gate.on_scroll(ScrollMetrics {
            scroll_top,
            ..LONG_TEXT
        })
    }

    fn sign(gate: &mut AgreementGate) {
        gate.begin_stroke(Point::new(10.0, 10.0)).unwrap();
        gate.extend_stroke(Point::new(80.0, 40.0)).unwrap();
        gate.end_stroke().unwrap();
    }

    fn ready_gate() -> AgreementGate {
        let mut gate = gate();
        scroll_to(&mut gate, 1600.0);
        sign(&mut gate);
        gate.type_name("Jane Doe").unwrap();
        gate.set_acknowledged(true).unwrap();
        gate
    }

    #[test]
    fn test_inputs_locked_until_read() {
        let mut gate = gate();
        assert_eq!(gate.on_layout(LONG_TEXT), GateState::Unread);

        assert!(matches!(
            gate.begin_stroke(Point::new(1.0, 1.0)),
            Err(IntakeError::AgreementLocked)
        ));
        assert!(gate.type_name("Jane Doe").is_err());
        assert!(gate.set_acknowledged(true).is_err());
        assert!(!gate.pad().is_signed());
    }

    #[test]
    fn test_scroll_tolerance_and_one_way_transition() {
        let mut gate = gate();
        assert_eq!(scroll_to(&mut gate, 1589.0), GateState::Unread);
        assert_eq!(scroll_to(&mut gate, 1590.0), GateState::Scrolled);
        assert_eq!(scroll_to(&mut gate, 0.0), GateState::Scrolled);
        assert!(gate.is_scrolled());
    }

    #[test]
    fn test_short_text_counts_as_read() {
        let mut gate = gate();
        let state = gate.on_layout(ScrollMetrics {
            scroll_top: 0.0,
            scroll_height: 300.0,
            client_height: 400.0,
        });
        assert_eq!(state, GateState::Scrolled);
    }

    #[test]
    fn test_name_matching_ignores_case_and_padding() {
        let mut gate = gate();
        scroll_to(&mut gate, 2000.0);

        for typed in [" jane doe ", "JANE DOE", "Jane Doe"] {
            gate.type_name(typed).unwrap();
            assert!(!gate.unmet().contains(&GateCondition::NameMatches), "{typed}");
            assert_eq!(gate.name_error(), None);
        }

        gate.type_name("Jane D.").unwrap();
        assert!(gate.unmet().contains(&GateCondition::NameMatches));
        assert_eq!(gate.name_error(), Some("Name must match: Jane Doe"));
        assert_eq!(gate.typed_name(), "Jane D.");
    }

    #[test]
    fn test_ready_only_when_all_conditions_hold() {
        let mut gate = ready_gate();
        assert!(gate.can_continue());
        assert_eq!(gate.state(), GateState::ReadyToSubmit);

        gate.set_acknowledged(false).unwrap();
        assert_eq!(gate.unmet(), vec![GateCondition::Acknowledged]);
        assert_eq!(gate.state(), GateState::Signing);
        gate.set_acknowledged(true).unwrap();

        gate.clear_signature().unwrap();
        assert_eq!(gate.unmet(), vec![GateCondition::Signed]);
        sign(&mut gate);

        gate.type_name("Jane").unwrap();
        assert_eq!(gate.unmet(), vec![GateCondition::NameMatches]);
        gate.type_name("jane doe").unwrap();
        assert!(gate.can_continue());
    }

    #[test]
    fn test_accept_reports_unmet_conditions() {
        let mut gate = gate();
        scroll_to(&mut gate, 2000.0);
        gate.set_acknowledged(true).unwrap();

        let err = gate.accept(&BitmapEncoder::default(), Utc::now()).unwrap_err();
        match err {
            IntakeError::AgreementIncomplete { unmet } => {
                assert_eq!(unmet, vec!["signature".to_string(), "typed name".to_string()])
            }
            other => panic!("expected incomplete agreement, got {:?}", other),
        }
    }

    #[test]
    fn test_accept_exports_signature() {
        let gate = ready_gate();
        let now = Utc::now();
        let agreement = gate.accept(&BitmapEncoder::default(), now).unwrap();

        assert!(agreement.required && agreement.accepted);
        assert_eq!(agreement.version, "v1");
        assert_eq!(agreement.signature_name.as_deref(), Some("Jane Doe"));
        assert_eq!(agreement.accepted_at, Some(now));
        assert!(agreement
            .signature_image
            .unwrap()
            .starts_with("data:image/x-portable-bitmap;base64,"));
    }

    #[test]
    fn test_restore_waits_for_scroll() {
        let draft = ready_gate().snapshot();

        let mut gate = gate();
        assert_eq!(gate.restore(draft), Some(1600.0));
        assert!(!gate.pad().is_signed());
        assert_eq!(gate.state(), GateState::Unread);

        scroll_to(&mut gate, 1600.0);
        assert!(gate.can_continue());
    }

    #[test]
    fn test_restore_ignores_other_customer() {
        let mut draft = ready_gate().snapshot();
        draft.customer_name = "John Smith".to_string();

        let mut gate = gate();
        scroll_to(&mut gate, 2000.0);
        assert_eq!(gate.restore(draft), None);
        assert!(!gate.pad().is_signed());
    }

    #[tokio::test]
    async fn test_draft_cache_round_trip_and_corruption() {
        let store = MemoryDraftStore::new();
        let cache = AgreementDraftCache::new(store.clone(), &DraftConfig::default());
        assert_eq!(cache.load().await, None);

        let draft = ready_gate().snapshot();
        cache.save(&draft).await;
        assert_eq!(cache.load().await, Some(draft));

        store.save("agreementData", "{not json").await.unwrap();
        assert_eq!(cache.load().await, None);
        assert_eq!(store.load("agreementData").await.unwrap(), None);

        cache.save(&AgreementDraft::default()).await;
        cache.clear().await;
        assert_eq!(cache.load().await, None);
    }
}
