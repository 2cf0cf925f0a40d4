//! Rule-based multilingual intent classification.
//!
//! Languages are scanned in a fixed priority order and the first keyword
//! found anywhere in the normalised input wins. Confidence is a static trust
//! tier per language, not a match-quality score.

use crate::api::RemoteClassification;
use crate::error::{Error, Result};
use crate::model::{Intent, Language};

/// Confidence reported when no keyword matched.
pub const UNKNOWN_CONFIDENCE: f64 = 0.3;

/// Confidence assumed for remote replies that carry none.
pub const REMOTE_DEFAULT_CONFIDENCE: f64 = 0.85;

/// Language reported when no keyword matched.
pub const DEFAULT_LANGUAGE: Language = Language::En;

/// Keyword dictionary for one language.
#[derive(Debug, Clone, Copy)]
pub struct KeywordTable {
    /// Language reported on a match.
    pub language: Language,
    /// Static trust tier for this language.
    pub confidence: f64,
    /// Intents in evaluation order, each with its keywords in evaluation order.
    pub intents: &'static [(Intent, &'static [&'static str])],
}

/// French keywords are phrases or inflections that never occur inside
/// English words, since this table is scanned first.
const FRENCH: KeywordTable = KeywordTable {
    language: Language::Fr,
    confidence: 0.88,
    intents: &[
        (Intent::CheckBalance, &["solde", "consulter", "combien"]),
        (
            Intent::SendMoney,
            &["envoyer", "transférer", "transfert", "virement", "je paie", "paiement"],
        ),
        (Intent::AccountInfo, &["compte", "mes informations", "mon profil"]),
        (Intent::Help, &["aidez", "aide-moi", "de l'aide", "d'aide", "problème"]),
        (Intent::Greeting, &["bonjour", "bonsoir", "coucou"]),
    ],
};

const SWAHILI: KeywordTable = KeywordTable {
    language: Language::Sw,
    confidence: 0.85,
    intents: &[
        (Intent::CheckBalance, &["angalia", "salio", "balance", "pesa yangu"]),
        (Intent::SendMoney, &["tuma", "pesa", "kutuma", "peleka"]),
        (Intent::AccountInfo, &["akaunti", "taarifa", "habari ya akaunti"]),
        (Intent::Help, &["nisaidie", "msaada", "help"]),
        (Intent::Greeting, &["habari", "mambo", "vipi", "sasa"]),
    ],
};

const ENGLISH: KeywordTable = KeywordTable {
    language: Language::En,
    confidence: 0.9,
    intents: &[
        (Intent::CheckBalance, &["balance", "check", "how much", "remaining"]),
        (Intent::SendMoney, &["send", "transfer", "pay", "money to"]),
        (Intent::AccountInfo, &["account", "info", "details", "profile"]),
        (Intent::Help, &["help", "support", "assist", "problem"]),
        (
            Intent::Greeting,
            &["hello", "hi", "hey", "good morning", "good afternoon"],
        ),
    ],
};

/// Language tables in evaluation order.
pub const LANGUAGE_PRIORITY: [KeywordTable; 3] = [FRENCH, SWAHILI, ENGLISH];

/// Output of the local matcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalMatch {
    /// Matched language, or English when nothing matched.
    pub language: Language,
    /// Matched intent.
    pub intent: Intent,
    /// Trust tier of the matched table.
    pub confidence: f64,
}

impl LocalMatch {
    /// Canned reply for this match.
    pub fn response(&self) -> &'static str {
        response_for(self.language, self.intent)
    }
}

/// Reject missing or blank text.
pub fn validate_text(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_input("text must not be empty"));
    }
    Ok(trimmed)
}

/// Classify with the local keyword tables.
pub fn classify_local(text: &str) -> LocalMatch {
    let lower = text.trim().to_lowercase();

    for table in &LANGUAGE_PRIORITY {
        for (intent, keywords) in table.intents {
            if keywords.iter().any(|kw| lower.contains(kw)) {
                return LocalMatch {
                    language: table.language,
                    intent: *intent,
                    confidence: table.confidence,
                };
            }
        }
    }

    LocalMatch {
        language: DEFAULT_LANGUAGE,
        intent: Intent::Unknown,
        confidence: UNKNOWN_CONFIDENCE,
    }
}

/// Resolve a remote reply into typed values, filling in what the backend
/// left out. Unrecognised languages fall back to English, unrecognised
/// intents to `Unknown`.
pub fn resolve_remote(reply: &RemoteClassification) -> (Language, Intent, f64, String) {
    let language = Language::from_label(&reply.language).unwrap_or(DEFAULT_LANGUAGE);
    let intent = reply
        .intent
        .as_deref()
        .map(Intent::from_label)
        .unwrap_or(Intent::Unknown);
    let confidence = reply
        .confidence
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(REMOTE_DEFAULT_CONFIDENCE);
    let response = match reply.response.as_deref() {
        Some(r) if !r.trim().is_empty() => r.to_string(),
        _ => response_for(language, intent).to_string(),
    };
    (language, intent, confidence, response)
}

/// Canned reply keyed by `(language, intent)`.
pub fn response_for(language: Language, intent: Intent) -> &'static str {
    match (language, intent) {
        (Language::En, Intent::CheckBalance) => {
            "Your current balance is KES 24,500. Last transaction: -KES 3,200 (transfer to John)."
        }
        (Language::En, Intent::SendMoney) => {
            "Ready to send money. Please specify the recipient and amount."
        }
        (Language::En, Intent::AccountInfo) => {
            "Account: Mobile Money. Status: Active. KYC: Verified. Tier: Standard."
        }
        (Language::En, Intent::Help) => {
            "I can help you check your balance, send money, or view account info."
        }
        (Language::En, Intent::Greeting) => "Welcome! How can I help you today?",
        (Language::En, Intent::Unknown) => {
            "I did not understand that. Try: \"check balance\", \"send money\", or \"account info\"."
        }

        (Language::Sw, Intent::CheckBalance) => {
            "Salio lako ni KES 24,500. Muamala wa mwisho: -KES 3,200 (kutuma kwa John)."
        }
        (Language::Sw, Intent::SendMoney) => {
            "Tayari kutuma pesa. Tafadhali taja mpokeaji na kiasi."
        }
        (Language::Sw, Intent::AccountInfo) => {
            "Akaunti: Mobile Money. Hali: Hai. KYC: Imethibitishwa."
        }
        (Language::Sw, Intent::Help) => {
            "Naweza kukusaidia kuangalia salio, kutuma pesa, au kuona taarifa za akaunti."
        }
        (Language::Sw, Intent::Greeting) => "Karibu! Naweza kukusaidia vipi leo?",
        (Language::Sw, Intent::Unknown) => {
            "Sikuelewa. Jaribu: \"angalia salio\", \"tuma pesa\", au \"taarifa ya akaunti\"."
        }

        (Language::Fr, Intent::CheckBalance) => {
            "Votre solde actuel est de KES 24 500. Dernière opération : -KES 3 200 (transfert à John)."
        }
        (Language::Fr, Intent::SendMoney) => {
            "Prêt à envoyer de l'argent. Veuillez indiquer le destinataire et le montant."
        }
        (Language::Fr, Intent::AccountInfo) => {
            "Compte : Mobile Money. Statut : Actif. KYC : Vérifié. Niveau : Standard."
        }
        (Language::Fr, Intent::Help) => {
            "Je peux vous aider à consulter votre solde, envoyer de l'argent ou voir votre compte."
        }
        (Language::Fr, Intent::Greeting) => "Bienvenue ! Comment puis-je vous aider aujourd'hui ?",
        (Language::Fr, Intent::Unknown) => {
            "Je n'ai pas compris. Essayez : « consulter mon solde », « envoyer de l'argent » ou « mon compte »."
        }
    }
}
