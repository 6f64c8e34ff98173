//! Fixed bilingual replies and appointment links.

use execadvisor_shared::Language;

pub fn greeting(language: Language) -> &'static str {
    match language {
        Language::En => {
            "Hello and welcome! I'm your Executive Education Advisor for the HSG Executive MBA \
             programs (**EMBA**, **IEMBA** and **emba X**). How can I support your MBA planning \
             today?"
        }
        Language::De => {
            "Guten Tag! Ich bin Ihr Executive-Education-Berater für die HSG Executive MBA \
             Programme und unterstütze Sie gerne bei Fragen zu **EMBA**, **IEMBA** und **emba X**."
        }
    }
}

pub fn query_exception(language: Language) -> &'static str {
    match language {
        Language::En => {
            "I'm sorry, I cannot provide a helpful response right now. Please contact tech \
             support or try again later."
        }
        Language::De => {
            "Es tut mir leid, ich kann im Moment keine hilfreiche Antwort geben. Bitte wenden Sie \
             sich an den technischen Support oder versuchen Sie es später erneut."
        }
    }
}

pub fn not_valid_query(language: Language) -> &'static str {
    match language {
        Language::En => "I didn't quite understand that. Could you please rephrase your question?",
        Language::De => {
            "Das habe ich nicht ganz verstanden. Könnten Sie Ihre Frage bitte anders formulieren?"
        }
    }
}

/// Reply when retrieval found nothing to ground an answer on.
pub fn confidence_fallback(language: Language) -> &'static str {
    match language {
        Language::En => {
            "I'm sorry, but I couldn't find any information in my records that matches your \
             request, so I can't answer it with confidence. Could you please rephrase your \
             question?\n\nAlternatively, you can book an appointment with a student services \
             advisor using the links below."
        }
        Language::De => {
            "Es tut mir leid, aber ich konnte in meinen Unterlagen keine Informationen finden, die \
             zu Ihrer Anfrage passen, sodass ich sie nicht mit ausreichender Sicherheit \
             beantworten kann. Könnten Sie Ihre Frage bitte umformulieren?\n\nAlternativ können \
             Sie über die untenstehenden Links einen Termin bei der Studienberatung buchen."
        }
    }
}

pub fn language_fallback(language: Language) -> &'static str {
    match language {
        Language::En => {
            "I am sorry, I can only reply in English or German. Would you like to continue our \
             conversation in English?"
        }
        Language::De => {
            "Es tut mir leid, ich kann nur auf Englisch oder Deutsch antworten. Möchten Sie unser \
             Gespräch auf Deutsch fortführen?"
        }
    }
}

pub fn conversation_end(language: Language) -> &'static str {
    match language {
        Language::En => {
            "This conversation has reached its maximum length. To make sure you receive the best \
             possible support, please continue with a personal consultation.\n\nYou can book an \
             appointment with a student services advisor using the links below. Thank you for \
             your understanding."
        }
        Language::De => {
            "Dieses Gespräch hat die maximale Länge erreicht. Damit Sie bestmöglich unterstützt \
             werden, bitten wir Sie, das Anliegen in einem persönlichen Beratungsgespräch \
             fortzusetzen.\n\nÜber die untenstehenden Links können Sie einen Termin mit der \
             Studienberatung buchen. Vielen Dank für Ihr Verständnis."
        }
    }
}

pub fn continuation_prompt(language: Language) -> &'static str {
    match language {
        Language::En => "*Would you like me to continue with more details?*",
        Language::De => "*Möchten Sie, dass ich mit weiteren Details fortfahre?*",
    }
}

/// An admissions advisor's booking page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appointment {
    pub advisor: &'static str,
    pub url: &'static str,
}

pub const APPOINTMENTS: [Appointment; 3] = [
    Appointment {
        advisor: "Cyra von Müller (EMBA HSG)",
        url: "https://calendly.com/cyra-vonmueller/beratungsgespraech-emba-hsg",
    },
    Appointment {
        advisor: "Kristin Fuchs (IEMBA)",
        url: "https://calendly.com/kristin-fuchs-unisg/iemba-online-personal-consultation",
    },
    Appointment {
        advisor: "Teyuna Giger (emba X)",
        url: "https://calendly.com/teyuna-giger-unisg",
    },
];

/// Markdown list of booking links.
pub fn appointment_links(language: Language) -> String {
    let label = match language {
        Language::En => "Book Appointment",
        Language::De => "Termin buchen",
    };
    APPOINTMENTS
        .iter()
        .map(|a| format!("- [{label}: {}]({})", a.advisor, a.url))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_are_localized() {
        let en = appointment_links(Language::En);
        assert_eq!(en.lines().count(), 3);
        assert!(en.starts_with("- [Book Appointment: Cyra von Müller (EMBA HSG)](https://"));

        let de = appointment_links(Language::De);
        assert!(de.contains("[Termin buchen: Teyuna Giger (emba X)]"));
    }

    #[test]
    fn every_message_exists_in_both_languages() {
        for lang in Language::ALL {
            for message in [
                greeting(lang),
                query_exception(lang),
                not_valid_query(lang),
                confidence_fallback(lang),
                language_fallback(lang),
                conversation_end(lang),
                continuation_prompt(lang),
            ] {
                assert!(!message.is_empty());
            }
        }
        assert_ne!(greeting(Language::En), greeting(Language::De));
    }
}
