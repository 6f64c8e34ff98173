//! Keeps the chat on executive-MBA topics.
//!
//! Messages are classified by keyword lists. Single words match whole
//! words of the message; multi-word phrases match as substrings.

use serde::{Deserialize, Serialize};

use execadvisor_shared::Language;

/// Scope classification of a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    OnTopic,
    OffTopic,
    FinancialPlanning,
    Aggressive,
}

/// Reason for handing the conversation to the admissions team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    Aggressive,
    OffTopic,
    Financial,
}

/// Keyword lists used by [`ScopeGuardian`].
#[derive(Debug, Clone)]
pub struct ScopeKeywords {
    pub off_topic: Vec<String>,
    pub financial: Vec<String>,
    pub aggressive: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for ScopeKeywords {
    fn default() -> Self {
        Self {
            off_topic: strings(&[
                "weather", "sports", "politics", "vacation", "travel", "restaurant", "movie",
                "entertainment", "news", "dating", "health", "medical", "recipe", "cooking",
                "wetter", "sport", "politik", "urlaub", "reise", "film", "unterhaltung",
                "nachrichten", "gesundheit", "medizin", "rezept", "kochen",
            ]),
            financial: strings(&[
                "loan",
                "payment plan",
                "installment",
                "financing options",
                "budget",
                "savings plan",
                "personal finance",
                "credit",
                "bank loan",
                "mortgage",
                "scholarship application",
                "detailed funding",
                "kredit",
                "ratenzahlung",
                "finanzierung",
                "zahlungsplan",
                "sparplan",
                "persönliche finanzen",
                "darlehen",
                "bankkredit",
                "stipendium antrag",
                "detaillierte finanzierung",
            ]),
            aggressive: strings(&[
                "stupid",
                "idiot",
                "useless",
                "terrible",
                "worst",
                "hate",
                "dumb",
                "incompetent",
                "pathetic",
                "worthless",
                "dumm",
                "nutzlos",
                "schrecklich",
                "hasse",
            ]),
        }
    }
}

/// Classifies messages and picks redirect or escalation replies.
#[derive(Debug, Clone, Default)]
pub struct ScopeGuardian {
    keywords: ScopeKeywords,
}

impl ScopeGuardian {
    pub fn new(keywords: ScopeKeywords) -> Self {
        Self { keywords }
    }

    /// Classify a message. Aggressive wins over off-topic, which wins over
    /// financial planning.
    pub fn check_scope(&self, message: &str) -> ScopeKind {
        let lower = message.to_lowercase();
        let words: Vec<&str> = lower
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|w| !w.is_empty())
            .collect();

        let hits = |list: &[String]| {
            list.iter().any(|kw| {
                if kw.contains(' ') {
                    lower.contains(kw.as_str())
                } else {
                    words.contains(&kw.as_str())
                }
            })
        };

        let kind = if hits(&self.keywords.aggressive) {
            ScopeKind::Aggressive
        } else if hits(&self.keywords.off_topic) {
            ScopeKind::OffTopic
        } else if hits(&self.keywords.financial) {
            ScopeKind::FinancialPlanning
        } else {
            ScopeKind::OnTopic
        };

        if kind != ScopeKind::OnTopic {
            tracing::info!(scope = ?kind, "message outside advisor scope");
        }
        kind
    }

    /// Whether the violation should be handed to the admissions team.
    ///
    /// `attempt` counts violations of this kind in the session, starting at 1.
    pub fn should_escalate(&self, kind: ScopeKind, attempt: u32) -> Option<Escalation> {
        match kind {
            ScopeKind::Aggressive if attempt >= 2 => Some(Escalation::Aggressive),
            ScopeKind::OffTopic if attempt >= 2 => Some(Escalation::OffTopic),
            ScopeKind::FinancialPlanning => Some(Escalation::Financial),
            _ => None,
        }
    }

    /// Reply steering the user back on topic.
    pub fn redirect_message(&self, kind: ScopeKind, language: Language) -> &'static str {
        match (kind, language) {
            (ScopeKind::FinancialPlanning, Language::En) => {
                "For detailed financial planning, payment options or scholarship applications, \
                 please reach out to our admissions team directly. They can advise you personally \
                 on financing and the support available.\n\n\
                 Would you like general information about program costs and what they include?"
            }
            (ScopeKind::FinancialPlanning, Language::De) => {
                "Für eine detaillierte Finanzplanung, Zahlungsoptionen oder Stipendienanträge \
                 wenden Sie sich bitte direkt an unser Zulassungsteam. Es berät Sie persönlich zu \
                 Finanzierung und verfügbarer Unterstützung.\n\n\
                 Möchten Sie allgemeine Informationen zu den Programmkosten und den enthaltenen \
                 Leistungen?"
            }
            (ScopeKind::Aggressive, Language::En) => {
                "I'm happy to help with the HSG Executive MBA programs, but please keep the \
                 conversation respectful. If the language stays aggressive I will have to end the \
                 chat and refer you to our admissions team. What would you like to know about \
                 the programs?"
            }
            (ScopeKind::Aggressive, Language::De) => {
                "Ich helfe Ihnen gerne bei Fragen zu den HSG Executive MBA-Programmen, bitte \
                 bleiben Sie jedoch respektvoll. Wenn die Sprache aggressiv bleibt, muss ich das \
                 Gespräch beenden und Sie an unser Zulassungsteam verweisen. Was möchten Sie über \
                 die Programme wissen?"
            }
            (_, Language::De) => {
                "Ich beantworte Fragen zu den HSG Executive MBA-Programmen (EMBA, IEMBA und \
                 emba X). Gerne helfe ich bei Programmdetails, Zulassungsvoraussetzungen oder der \
                 Wahl des passenden Programms. Was möchten Sie über unsere Programme wissen?"
            }
            (_, Language::En) => {
                "I can help with questions about the HSG Executive MBA programs (EMBA, IEMBA and \
                 emba X): program details, admission requirements, or finding the right program \
                 for your goals. What would you like to know about our programs?"
            }
        }
    }

    /// Reply handing the user over to the admissions team.
    pub fn escalation_message(&self, escalation: Escalation, language: Language) -> &'static str {
        match (escalation, language) {
            (Escalation::Aggressive, Language::En) => {
                "I can't continue this chat while the language is aggressive. If you still need \
                 help, please book an appointment with our admissions team using the links below."
            }
            (Escalation::Aggressive, Language::De) => {
                "Solange die Sprache aggressiv ist, kann ich dieses Gespräch nicht fortsetzen. \
                 Wenn Sie weiterhin Unterstützung brauchen, buchen Sie bitte über die Links unten \
                 einen Termin mit unserem Zulassungsteam."
            }
            (Escalation::OffTopic, Language::En) => {
                "For questions beyond program information our admissions team is the best \
                 contact; you can book a conversation with them using the links below.\n\n\
                 Is there anything about the EMBA, IEMBA or emba X programs I can help with?"
            }
            (Escalation::OffTopic, Language::De) => {
                "Für Fragen ausserhalb der Programminformationen ist unser Zulassungsteam die \
                 beste Anlaufstelle; über die Links unten können Sie ein Gespräch buchen.\n\n\
                 Kann ich Ihnen bei etwas zu den Programmen EMBA, IEMBA oder emba X helfen?"
            }
            (Escalation::Financial, Language::En) => {
                "Our admissions team can advise you in detail on financing options, payment plans \
                 and scholarships. Please contact them directly for personal support with your \
                 financial planning."
            }
            (Escalation::Financial, Language::De) => {
                "Unser Zulassungsteam berät Sie ausführlich zu Finanzierungsmöglichkeiten, \
                 Zahlungsplänen und Stipendien. Bitte kontaktieren Sie es direkt für eine \
                 persönliche Unterstützung bei der Finanzplanung."
            }
        }
    }
}
