//! Privacy policy and terms of service documents.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegalKind {
    PrivacyPolicy,
    TermsOfService,
}

impl LegalKind {
    pub const ALL: [LegalKind; 2] = [LegalKind::PrivacyPolicy, LegalKind::TermsOfService];

    pub fn as_str(self) -> &'static str {
        match self {
            LegalKind::PrivacyPolicy => "privacy-policy",
            LegalKind::TermsOfService => "terms-of-service",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            LegalKind::PrivacyPolicy => "Privacy Policy",
            LegalKind::TermsOfService => "Terms of Service",
        }
    }
}

impl fmt::Display for LegalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LegalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LegalKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown document `{s}`, expected privacy-policy or terms-of-service"))
    }
}

#[derive(Debug, Deserialize)]
struct DocumentEnvelope {
    data: Option<DocumentBody>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DocumentBody {
    #[serde(default)]
    content: String,
}

/// Pull `data.content` out of a document response; missing content is empty.
pub fn parse_document(body: &[u8]) -> Result<String, ApiError> {
    let envelope: DocumentEnvelope = serde_json::from_slice(body)?;
    Ok(envelope.data.map(|d| d.content).unwrap_or_default())
}

impl ApiClient {
    /// Fetch the published HTML of a legal document.
    pub async fn legal_document(&self, kind: LegalKind) -> Result<String, ApiError> {
        let body = self
            .send(self.client.get(self.url(&format!("legal-documents/{kind}"))))
            .await?
            .error_for_status()?;
        parse_document(&body)
    }

    /// Replace a legal document. Needs an admin credential.
    pub async fn save_legal_document(&self, kind: LegalKind, content: &str) -> Result<(), ApiError> {
        self.post_json(
            &format!("admin/legal-documents/{kind}"),
            &DocumentBody {
                content: content.to_owned(),
            },
        )
        .await?;
        tracing::info!(%kind, "{} saved", kind.title());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_path_segment() {
        for kind in LegalKind::ALL {
            assert_eq!(kind.as_str().parse::<LegalKind>(), Ok(kind));
        }
        assert!("cookies".parse::<LegalKind>().is_err());
    }

    #[test]
    fn test_parse_document() {
        assert_eq!(
            parse_document(br#"{"data":{"content":"<p>terms</p>"}}"#).expect("valid"),
            "<p>terms</p>"
        );
        assert_eq!(parse_document(br#"{"data":null}"#).expect("valid"), "");
        assert!(parse_document(b"[]").is_err());
    }
}
