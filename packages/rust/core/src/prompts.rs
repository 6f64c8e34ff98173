//! System prompt construction.

use execadvisor_conversation::ConversationState;
use execadvisor_shared::Language;

const ROLE: &str = "You are an Executive Education Advisor for the University of St.Gallen \
Executive School, specializing in three Executive MBA HSG programs: Executive MBA (EMBA), \
International Executive MBA (IEMBA), and EMBA X. Your role is to help potential students \
understand these programs and determine which best matches their needs, interests, and career \
goals.

Use only the provided context to answer questions about the Executive MBA HSG programs. The \
context includes information such as duration, curriculum, costs, admission requirements, \
schedules, faculty, deadlines, and other relevant details.";

const FORMATTING_GUIDELINES: &str = "\
- Use Markdown formatting.
- Do not add titles at the beginning of an answer.
- Highlight key facts (e.g., program names, costs, durations) in bold.
- Keep lists short and consistent.";

fn language_name(language: Language) -> &'static str {
    match language {
        Language::En => "English",
        Language::De => "German",
    }
}

/// Programs the advisor leans towards for a given audience.
pub fn preferred_programs(language: Language) -> &'static str {
    match language {
        Language::De => "EMBA",
        Language::En => "IEMBA and EMBA X",
    }
}

fn general_guidelines(language: Language) -> String {
    let lang = language_name(language);
    format!(
        "- Respond only in {lang}. If another language is used, politely inform the user you can \
         only respond in {lang}.\n\
         - Be helpful, professional, and keep answers short and concise.\n\
         - List all available programs, including EMBA, IEMBA, and EMBA X, if the user has a \
         general interest in studying.\n\
         - Give preference to the {preferred} program(s) when deciding suitable programs.\n\
         - Do not mention or discuss programs offered by competitor universities.\n\
         - Only provide program prices in 5k ranges.\n\
         - If the user attempts to discuss anything unrelated to the MBA programs, politely \
         switch back to the main topic.\n\
         - If the context lacks specific information, say so clearly and recommend contacting \
         the University of St.Gallen Executive School directly.",
        preferred = preferred_programs(language),
    )
}

/// The advisor system prompt for a session language.
pub fn system_prompt(language: Language) -> String {
    format!(
        "{ROLE}\n\nGeneral Guidelines:\n{}\n\nFormatting Guidelines:\n{FORMATTING_GUIDELINES}",
        general_guidelines(language)
    )
}

/// What is known about the user, or `None` before anything was extracted.
pub fn profile_summary(state: &ConversationState) -> Option<String> {
    let profile = &state.profile;
    let mut lines = Vec::new();
    if let Some(name) = &profile.user_name {
        lines.push(format!("- Name: {name}"));
    }
    if let Some(years) = profile.experience_years {
        lines.push(format!("- Work experience: {years} years"));
    }
    if let Some(years) = profile.leadership_years {
        lines.push(format!("- Leadership experience: {years} years"));
    }
    if let Some(field) = &profile.field {
        lines.push(format!("- Field: {field}"));
    }
    if let Some(interest) = &profile.interest {
        lines.push(format!("- Interest: {interest}"));
    }
    if let Some(level) = &profile.qualification_level {
        lines.push(format!("- Qualification: {level}"));
    }
    if !profile.program_interest.is_empty() {
        let programs: Vec<&str> = profile.program_interest.iter().map(|p| p.label()).collect();
        lines.push(format!("- Asked about: {}", programs.join(", ")));
    }
    if let Some(program) = state.suggested_program {
        lines.push(format!("- Best matching program so far: {}", program.label()));
    }

    if lines.is_empty() {
        None
    } else {
        Some(format!("User Profile:\n{}", lines.join("\n")))
    }
}

/// System prompt followed by the profile summary when one exists.
pub fn session_prompt(state: &ConversationState) -> String {
    let base = system_prompt(state.language());
    match profile_summary(state) {
        Some(summary) => format!("{base}\n\n{summary}"),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use execadvisor_shared::ProgramTier;

    #[test]
    fn language_and_preference() {
        let de = system_prompt(Language::De);
        assert!(de.contains("Respond only in German"));
        assert!(de.contains("preference to the EMBA program"));

        let en = system_prompt(Language::En);
        assert!(en.contains("Respond only in English"));
        assert!(en.contains("IEMBA and EMBA X"));
        assert!(en.contains("5k ranges"));
    }

    #[test]
    fn empty_profile_has_no_summary() {
        let state = ConversationState::new("u1");
        assert!(profile_summary(&state).is_none());
        assert_eq!(session_prompt(&state), system_prompt(Language::En));
    }

    #[test]
    fn summary_lists_known_fields() {
        let mut state = ConversationState::with_language("u1", Language::De);
        state.profile.experience_years = Some(12);
        state.profile.program_interest = vec![ProgramTier::EmbaX];
        state.suggested_program = Some(ProgramTier::Emba);

        let prompt = session_prompt(&state);
        assert!(prompt.contains("Respond only in German"));
        assert!(prompt.contains("- Work experience: 12 years"));
        assert!(prompt.contains("- Asked about: EMBA X"));
        assert!(prompt.ends_with("- Best matching program so far: EMBA"));
        assert!(!prompt.contains("Leadership"));
    }
}
