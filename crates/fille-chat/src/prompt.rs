use fille_core::config::PromptSettings;

/// Builds the single-turn instruction sent upstream.
///
/// The retrieved snippet is background only; the model is asked to answer the
/// user's question in its own words.
#[derive(Debug, Clone)]
pub struct PromptComposer {
    assistant_name: String,
    domain: String,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::from_settings(&PromptSettings::default())
    }
}

impl PromptComposer {
    pub fn new(assistant_name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self { assistant_name: assistant_name.into(), domain: domain.into() }
    }

    pub fn from_settings(settings: &PromptSettings) -> Self {
        Self::new(settings.assistant_name.clone(), settings.domain.clone())
    }

    pub fn compose(&self, user_question: &str, retrieved_context: &str) -> String {
        format!(
            "You are a chatbot named {name} specialized in {domain}. Provide clear, factual, and supportive responses.\n\
             If the user's question calls for personal medical advice, remind them to consult a qualified healthcare professional.\n\
             \n\
             User Question: {question}\n\
             \n\
             Below is a similar question/response from the knowledge base that may contain helpful information. \
             It is reference material, not part of this conversation:\n\
             {context}\n\
             \n\
             Please provide your own professional, friendly, and informative response that addresses the user's specific question.",
            name = self.assistant_name,
            domain = self.domain,
            question = user_question,
            context = retrieved_context,
        )
    }
}
