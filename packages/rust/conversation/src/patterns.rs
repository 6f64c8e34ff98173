//! Reference data driving profile extraction and recommendation.
//!
//! Everything here is plain data: callers can build their own
//! [`ExtractionPatterns`] for another language or swap the
//! [`RecommendationRules`] thresholds without touching the extractors.

use regex::Regex;

use execadvisor_shared::{Language, ProgramTier};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// A named group of keywords that marks a conversation topic.
#[derive(Debug, Clone)]
pub struct TopicKeywords {
    pub topic: String,
    pub keywords: Vec<String>,
}

/// Pattern and vocabulary table for one language.
///
/// Regexes capture the number (or name) in group 1. Vocabularies are
/// matched case-insensitively as substrings of the lowercased text.
#[derive(Debug, Clone)]
pub struct ExtractionPatterns {
    pub language: Language,
    pub experience: Vec<Regex>,
    pub leadership: Vec<Regex>,
    pub fields: Vec<String>,
    pub interests: Vec<String>,
    pub user_name: Vec<Regex>,
    /// Ordered from highest to lowest degree; the first match wins.
    pub qualification: Vec<(Regex, String)>,
    pub handover: Vec<String>,
    pub topics: Vec<TopicKeywords>,
}

impl ExtractionPatterns {
    /// Default table for the given language.
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::En => Self::english(),
            Language::De => Self::german(),
        }
    }

    pub fn english() -> Self {
        Self {
            language: Language::En,
            experience: vec![
                re(
                    r"(?i)(\d+)\s*\+?\s*years?\s+(?:of\s+)?(?:professional\s+|work\s+|working\s+|industry\s+|relevant\s+)?experience",
                ),
                re(r"(?i)experience\s+(?:of\s+)?(?:about\s+|around\s+)?(\d+)\s*\+?\s*years?"),
                re(r"(?i)(?:worked|working)\s+(?:for\s+)?(?:about\s+|around\s+)?(\d+)\s*\+?\s*years?"),
                re(r"(?i)(\d+)\s*\+?\s*years?\s+(?:in\s+the\s+industry|in\s+my\s+career|of\s+work)"),
            ],
            leadership: vec![
                re(
                    r"(?i)(\d+)\s*\+?\s*years?\s+(?:of\s+)?(?:leadership|management|managerial|people\s+management)",
                ),
                re(
                    r"(?i)(\d+)\s*\+?\s*years?\s+(?:as\s+(?:a\s+|an\s+)?)(?:manager|team\s+lead(?:er)?|head|director|leader|executive)",
                ),
                re(
                    r"(?i)(?:leading|managing|led|managed)\s+(?:a\s+)?(?:team|teams|people|departments?)\s+(?:for\s+)?(\d+)\s*\+?\s*years?",
                ),
                re(r"(?i)(?:leadership|management)\s+experience\s+(?:of\s+)?(\d+)\s*\+?\s*years?"),
            ],
            fields: strings(&[
                "technology",
                "software",
                "finance",
                "banking",
                "consulting",
                "healthcare",
                "pharma",
                "manufacturing",
                "engineering",
                "marketing",
                "sales",
                "education",
                "government",
                "public sector",
                "energy",
                "insurance",
                "retail",
                "legal",
                "logistics",
                "telecommunications",
                "real estate",
                "automotive",
            ]),
            interests: strings(&[
                "strategy",
                "leadership",
                "innovation",
                "digital transformation",
                "digitalization",
                "technology",
                "entrepreneurship",
                "sustainability",
                "finance",
                "marketing",
                "general management",
                "international business",
                "artificial intelligence",
                "data analytics",
            ]),
            user_name: vec![
                re(r"(?i:my\s+name\s+is)\s+(\p{Lu}[\p{L}'-]+(?:\s+\p{Lu}[\p{L}'-]+)?)"),
                re(r"(?m)\bI(?:'m|\s+am)\s+(\p{Lu}\p{Ll}+(?:\s+\p{Lu}\p{Ll}+)?)\s*(?:[,.!]|$)"),
                re(r"(?i:call\s+me)\s+(\p{Lu}\p{Ll}+)"),
            ],
            qualification: vec![
                (
                    re(
                        r"(?i)\bi\s+(?:have|hold|completed|earned|got)\s+(?:a\s+|an\s+|my\s+)?(?:\w+\s+)?(?:phd|ph\.d|doctorate)",
                    ),
                    "PhD".into(),
                ),
                (
                    re(r"(?i)\bi\s+(?:have|hold|completed|earned|got)\s+(?:a\s+|an\s+|my\s+)?(?:\w+\s+)?mba\b"),
                    "MBA".into(),
                ),
                (
                    re(r"(?i)\bi\s+(?:have|hold|completed|earned|got)\s+(?:a\s+|an\s+|my\s+)?(?:\w+\s+)?master"),
                    "Master".into(),
                ),
                (
                    re(r"(?i)\bi\s+(?:have|hold|completed|earned|got)\s+(?:a\s+|an\s+|my\s+)?(?:\w+\s+)?bachelor"),
                    "Bachelor".into(),
                ),
            ],
            handover: strings(&[
                "appointment",
                "book a call",
                "schedule a call",
                "schedule a meeting",
                "consultation",
                "speak to someone",
                "talk to someone",
                "speak to a person",
                "talk to a human",
                "human advisor",
                "speak with an advisor",
                "talk to an advisor",
                "contact admissions",
                "call me",
            ]),
            topics: vec![
                topic("costs", &["cost", "price", "fee", "tuition"]),
                topic(
                    "admission",
                    &["admission", "requirement", "apply", "application"],
                ),
                topic("curriculum", &["curriculum", "module", "course"]),
                topic("schedule", &["schedule", "start date", "timetable", "format"]),
                topic("faculty", &["faculty", "professor", "lecturer"]),
            ],
        }
    }

    pub fn german() -> Self {
        Self {
            language: Language::De,
            experience: vec![
                re(r"(?i)(\d+)\s*\+?\s*Jahr(?:en|e)?\s+(?:an\s+)?(?:Berufs|Arbeits)erfahrung"),
                re(r"(?i)(\d+)\s*\+?\s*Jahr(?:en|e)?\s+(?:an\s+)?(?:berufliche[rn]?\s+)?Erfahrung"),
                re(r"(?i)(?:Berufs|Arbeits)erfahrung\s+(?:von\s+)?(?:etwa\s+|ca\.\s+)?(\d+)\s*\+?\s*Jahr(?:en|e)?"),
                re(r"(?i)seit\s+(\d+)\s*\+?\s*Jahr(?:en|e)?\s+(?:berufstätig|tätig|im\s+Beruf)"),
            ],
            leadership: vec![
                re(r"(?i)(\d+)\s*\+?\s*Jahr(?:en|e)?\s+(?:an\s+)?(?:Führungs|Management|Leitungs)erfahrung"),
                re(
                    r"(?i)(\d+)\s*\+?\s*Jahr(?:en|e)?\s+(?:als\s+)?(?:Führungskraft|Teamleiter(?:in)?|Manager(?:in)?|Leiter(?:in)?|Geschäftsführer(?:in)?)",
                ),
                re(r"(?i)(?:Führungs|Management)erfahrung\s+(?:von\s+)?(\d+)\s*\+?\s*Jahr(?:en|e)?"),
                re(r"(?i)seit\s+(\d+)\s*\+?\s*Jahr(?:en|e)?\s+(?:in\s+einer\s+)?Führungs"),
            ],
            fields: strings(&[
                "technologie",
                "software",
                "finanz",
                "bank",
                "beratung",
                "gesundheitswesen",
                "pharma",
                "industrie",
                "ingenieurwesen",
                "marketing",
                "vertrieb",
                "bildung",
                "verwaltung",
                "öffentlicher sektor",
                "energie",
                "versicherung",
                "detailhandel",
                "einzelhandel",
                "grosshandel",
                "großhandel",
                "rechtsberatung",
                "rechtsabteilung",
                "anwaltskanzlei",
                "logistik",
                "telekommunikation",
                "immobilien",
                "automobil",
            ]),
            interests: strings(&[
                "strategie",
                "führung",
                "innovation",
                "digitale transformation",
                "digitalisierung",
                "technologie",
                "unternehmertum",
                "nachhaltigkeit",
                "finanzen",
                "marketing",
                "general management",
                "internationales management",
                "künstliche intelligenz",
            ]),
            user_name: vec![
                re(r"(?i:ich\s+hei(?:ß|ss)e)\s+(\p{Lu}[\p{L}'-]+(?:\s+\p{Lu}[\p{L}'-]+)?)"),
                re(r"(?i:mein\s+name\s+ist)\s+(\p{Lu}[\p{L}'-]+(?:\s+\p{Lu}[\p{L}'-]+)?)"),
            ],
            qualification: vec![
                (
                    re(r"(?i)\b(?:ich\s+bin\s+promoviert|ich\s+habe\s+(?:einen\s+|eine\s+)?(?:doktor|promotion|phd))"),
                    "PhD".into(),
                ),
                (
                    re(r"(?i)\bich\s+(?:habe|besitze)\s+(?:einen\s+|ein\s+)?(?:\w+\s+)?mba\b"),
                    "MBA".into(),
                ),
                (
                    re(r"(?i)\bich\s+(?:habe|besitze)\s+(?:einen\s+|ein\s+)?(?:\w+\s+)?master"),
                    "Master".into(),
                ),
                (
                    re(r"(?i)\bich\s+(?:habe|besitze)\s+(?:einen\s+|ein\s+)?(?:\w+\s+)?bachelor"),
                    "Bachelor".into(),
                ),
            ],
            handover: strings(&[
                "termin vereinbaren",
                "termin buchen",
                "einen termin",
                "beratungsgespräch",
                "berater sprechen",
                "beraterin sprechen",
                "mit jemandem sprechen",
                "persönliches gespräch",
                "rückruf",
                "zulassung kontaktieren",
                "rufen sie mich an",
            ]),
            topics: vec![
                topic("costs", &["kosten", "preis", "gebühr"]),
                topic(
                    "admission",
                    &["zulassung", "voraussetzung", "bewerbung", "bewerben"],
                ),
                topic("curriculum", &["curriculum", "modul", "kurs", "lehrplan"]),
                topic("schedule", &["zeitplan", "startdatum", "beginn", "format"]),
                topic("faculty", &["dozent", "professor", "fakultät"]),
            ],
        }
    }
}

fn topic(name: &str, keywords: &[&str]) -> TopicKeywords {
    TopicKeywords {
        topic: name.to_string(),
        keywords: strings(keywords),
    }
}

/// Mentions of a specific program in free text.
///
/// Checked in order; each matched span is blanked before the next pattern
/// runs, so "IEMBA" and "EMBA X" never also count as "EMBA".
#[derive(Debug, Clone)]
pub struct ProgramMentions {
    pub patterns: Vec<(ProgramTier, Regex)>,
}

impl Default for ProgramMentions {
    fn default() -> Self {
        Self {
            patterns: vec![
                (ProgramTier::EmbaX, re(r"(?i)\bemba\s*x\b")),
                (
                    ProgramTier::Iemba,
                    re(r"(?i)\biemba\b|\binternational\s+(?:executive\s+mba|emba)\b"),
                ),
                (ProgramTier::Emba, re(r"(?i)\bemba\b|\bexecutive\s+mba\b")),
            ],
        }
    }
}

/// Thresholds for the program recommendation rule.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationRules {
    pub min_experience_years: u32,
    pub min_leadership_years: u32,
    /// Interest stems that point to EMBA X, matched as substrings of the
    /// extracted interest in either language.
    pub emba_x_interests: Vec<String>,
}

impl Default for RecommendationRules {
    fn default() -> Self {
        Self {
            min_experience_years: 5,
            min_leadership_years: 2,
            emba_x_interests: strings(&["digital", "innovation", "technolog"]),
        }
    }
}

/// All swappable reference data used by the conversation engine.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub tables: Vec<ExtractionPatterns>,
    pub programs: ProgramMentions,
    pub rules: RecommendationRules,
}

impl Default for ReferenceData {
    fn default() -> Self {
        Self {
            tables: Language::ALL
                .iter()
                .map(|lang| ExtractionPatterns::for_language(*lang))
                .collect(),
            programs: ProgramMentions::default(),
            rules: RecommendationRules::default(),
        }
    }
}

impl ReferenceData {
    /// Tables ordered with the given language first.
    pub fn ordered_for(&self, language: Language) -> Vec<&ExtractionPatterns> {
        let mut tables: Vec<_> = self.tables.iter().collect();
        tables.sort_by_key(|t| t.language != language);
        tables
    }

    /// The table for one language, if configured.
    pub fn table(&self, language: Language) -> Option<&ExtractionPatterns> {
        self.tables.iter().find(|t| t.language == language)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tables_cover_all_languages() {
        let data = ReferenceData::default();
        assert!(data.table(Language::En).is_some());
        assert!(data.table(Language::De).is_some());
        assert_eq!(data.ordered_for(Language::De)[0].language, Language::De);
        assert_eq!(data.ordered_for(Language::En)[0].language, Language::En);
    }

    #[test]
    fn default_rules() {
        let rules = RecommendationRules::default();
        assert_eq!(rules.min_experience_years, 5);
        assert_eq!(rules.min_leadership_years, 2);
        assert_eq!(rules.emba_x_interests.len(), 3);
    }
}
