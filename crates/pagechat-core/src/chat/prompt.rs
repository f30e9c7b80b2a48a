//! Prompt assembly for one chat turn.
//!
//! The prompt is plain text in five blocks: the analyst instructions, a
//! context header plus the page text, the prior conversation, the user's
//! request, and a closing reminder about the output language.

use std::fmt::Write as _;

use pagechat_types::chat::ChatMessage;
use pagechat_types::content::PageContent;
use pagechat_types::llm::OutputLanguage;

/// Request used when the user asks for an analysis without typing anything.
pub const DEFAULT_REQUEST: &str =
    "Please analyze this Terms of Service document and provide the pros and cons.";

const ROLE: &str = "You are a helpful assistant specializing in analyzing Terms of Service, \
Privacy Policies, and other legal agreements for users.
Your goal is to help users understand the pros and cons of what they're agreeing to in a clear, \
structured way.";

const SECTIONS: &str = "When analyzing terms, always organize your response into two clear sections:

PROS:
- List benefits to the user
- User rights that are clearly protected
- Fair or standard terms that are user-friendly
- Transparency in data handling or business practices
- Any particularly favorable terms compared to industry standards

CONS:
- Potential risks or downsides for users
- Limitations on user rights or restrictive clauses
- How user data may be collected, used, or shared in ways users might not expect
- Any unusual, one-sided, or potentially concerning clauses
- Terms that limit liability or user recourse

Be honest and transparent - present a balanced view without being alarmist. Focus on helping \
users make an informed decision.
Format both pros and cons as bullet lists for clarity.";

const LOCALIZED_TITLES: &str = "If responding in a non-English language, use the appropriate section titles:
- Spanish: \"VENTAJAS\" and \"DESVENTAJAS\"
- French: \"AVANTAGES\" and \"INCONVÉNIENTS\"
- German: \"VORTEILE\" and \"NACHTEILE\"
- Italian: \"VANTAGGI\" and \"SVANTAGGI\"
- Portuguese: \"VANTAGENS\" and \"DESVANTAGENS\"
- Chinese: \"优点\" and \"缺点\"
- Japanese: \"メリット\" and \"デメリット\"
- Korean: \"장점\" and \"단점\"
- Russian: \"ПРЕИМУЩЕСТВА\" and \"НЕДОСТАТКИ\"
- Arabic: \"الإيجابيات\" and \"السلبيات\"";

const FIXED_TITLES: &str = "Always use the English section titles \"PROS\" and \"CONS\" regardless \
of the document language when responding in English, or the appropriate titles for the selected \
language.";

/// Builds the text sent to the generation client.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    language: OutputLanguage,
}

impl PromptBuilder {
    pub fn new(language: OutputLanguage) -> Self {
        Self { language }
    }

    pub fn language(&self) -> &OutputLanguage {
        &self.language
    }

    /// The instruction block, including the language rules.
    pub fn instructions(&self) -> String {
        let lang = self.language.describe();
        let mut out = String::from(ROLE);

        let _ = write!(
            out,
            "\n\nIMPORTANT LANGUAGE INSTRUCTION: First detect the language of the document. \
             The user has requested that you respond in {lang}."
        );
        if self.language.is_auto() {
            out.push_str(" This means you should respond in the same language as the document.");
        } else {
            let _ = write!(
                out,
                " REGARDLESS of the document's original language, you MUST provide your entire \
                 response in {lang} only."
            );
        }

        out.push_str("\n\n");
        out.push_str(SECTIONS);
        out.push_str("\n\n");
        out.push_str(if self.language.is_auto() {
            LOCALIZED_TITLES
        } else {
            FIXED_TITLES
        });
        let _ = write!(
            out,
            "\n\nIf there is nothing about the page that appears to be a Terms of Service or \
             related legal document, respond in {lang}, stating that you don't see any Terms of \
             Service to analyze."
        );
        out
    }

    /// Full prompt for one turn.
    ///
    /// `history` is the conversation before this turn, oldest first. A blank
    /// `request` falls back to [`DEFAULT_REQUEST`].
    pub fn build(&self, page: &PageContent, history: &[ChatMessage], request: &str) -> String {
        let label = page.kind.label();
        let lang = self.language.describe();
        let request = match request.trim() {
            "" => DEFAULT_REQUEST,
            trimmed => trimmed,
        };

        let mut out = self.instructions();
        let _ = write!(
            out,
            "\n\nContext: The following is the content of the {label} that the user is viewing:"
        );
        if page.is_truncated() {
            let _ = write!(
                out,
                " (note: only the first {}% could be processed due to length)",
                page.percentage_kept
            );
        }
        let _ = write!(out, "\n\n{}\n\n", page.text);

        out.push_str("Previous conversation:\n");
        out.push_str(&format_history(history));

        let _ = write!(
            out,
            "\n\nUser's request: {request}\n\n\
             Analyze the {label} content carefully. If this is a Terms of Service, Privacy \
             Policy, or similar legal document, provide a balanced analysis of the pros and cons \
             as specified in your instructions. Take into account any previous conversation \
             context if relevant. You MUST respond in {lang}"
        );
        if !self.language.is_auto() {
            out.push_str(" even if the document is in a different language");
        }
        out.push('.');
        out
    }
}

/// `User: ...` / `Assistant: ...` lines, oldest first.
pub fn format_history(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|m| format!("{}: {}", m.speaker(), m.text))
        .collect::<Vec<_>>()
        .join("\n")
}
