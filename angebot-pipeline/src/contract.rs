use std::path::Path;

use angebot_core::{CollabError, ContractRenderer, Offer};

/// Placeholder-fill renderer over a plain-text contract template.
/// Placeholders use `{{feld}}` syntax; absent offer fields render as "-"
/// (dates as "offen") instead of failing.
#[derive(Debug)]
pub struct TemplateRenderer {
    template: String,
}

impl TemplateRenderer {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, CollabError> {
        let template = std::fs::read_to_string(path)
            .map_err(|_| CollabError::TemplateMissing(path.display().to_string()))?;
        Ok(Self { template })
    }
}

impl ContractRenderer for TemplateRenderer {
    fn render(&self, offer: &Offer) -> Result<Vec<u8>, CollabError> {
        let betrag = offer
            .betrag
            .map(|b| format!("{b:.2} €"))
            .unwrap_or_else(|| "-".to_string());
        let schulung_datum = offer
            .schulung_datum
            .map(|d| d.format("%d.%m.%Y").to_string())
            .unwrap_or_else(|| "offen".to_string());

        let fields = [
            ("kunde", offer.kunde.clone().unwrap_or_else(|| "-".to_string())),
            (
                "leistung",
                offer.leistung.clone().unwrap_or_else(|| "-".to_string()),
            ),
            (
                "trainer",
                offer
                    .trainer_name
                    .clone()
                    .unwrap_or_else(|| "-".to_string()),
            ),
            ("betrag", betrag),
            ("schulung_datum", schulung_datum),
        ];

        let mut out = self.template.clone();
        for (key, value) in fields {
            out = out.replace(&format!("{{{{{key}}}}}"), &value);
        }
        Ok(out.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use angebot_core::model::{IntakeRecord, OfferSource};
    use chrono::Utc;

    #[test]
    fn test_template_fill() {
        let record = IntakeRecord {
            kunde: Some("Acme GmbH".to_string()),
            leistung: Some("KI Schulung".to_string()),
            betrag: Some(4800.0),
            schulung_datum: Some("2026-04-20".to_string()),
            ..Default::default()
        };
        let (offer, _) = Offer::from_intake(record, OfferSource::Manual, Utc::now()).unwrap();

        let renderer =
            TemplateRenderer::new("Vertrag: {{leistung}} für {{kunde}} am {{schulung_datum}}, {{betrag}}");
        let bytes = renderer.render(&offer).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "Vertrag: KI Schulung für Acme GmbH am 20.04.2026, 4800.00 €");
    }

    #[test]
    fn test_absent_fields_render_placeholders() {
        let (offer, _) =
            Offer::from_intake(IntakeRecord::default(), OfferSource::Manual, Utc::now()).unwrap();

        let renderer = TemplateRenderer::new("{{kunde}} / {{trainer}} / {{schulung_datum}}");
        let text = String::from_utf8(renderer.render(&offer).unwrap()).unwrap();
        assert_eq!(text, "- / - / offen");
    }

    #[test]
    fn test_missing_template_file() {
        let err = TemplateRenderer::from_file(Path::new("/nonexistent/vorlage.txt")).unwrap_err();
        assert!(matches!(err, CollabError::TemplateMissing(_)));
    }
}
