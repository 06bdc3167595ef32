//! Prompt templates for the chat pipeline.

use minijinja::{context, Environment};

use crate::error::Result;

const RAG_TEMPLATE_NAME: &str = "rag";

pub const RAG_TEMPLATE: &str = "\
You are AmityBot, a helpful and knowledgeable assistant for Amity University.
Your role is to provide accurate, helpful, and friendly responses to questions about the university.

Guidelines:
- Use the provided context to answer questions accurately
- If the context doesn't contain enough information, say so politely
- Be conversational and helpful
- Provide specific details when available
- If asked about something not related to Amity University, gently redirect to university-related topics

Context Information:
{{ context }}

Question: {{ question }}

Answer:";

/// Renders the RAG user prompt.
pub struct PromptBuilder {
    env: Environment<'static>,
}

impl PromptBuilder {
    pub fn new() -> Result<Self> {
        Self::with_template(RAG_TEMPLATE)
    }

    pub fn with_template(template: &'static str) -> Result<Self> {
        let mut env = Environment::new();
        env.add_template(RAG_TEMPLATE_NAME, template)?;
        Ok(Self { env })
    }

    pub fn render(&self, context: &str, question: &str) -> Result<String> {
        let tmpl = self.env.get_template(RAG_TEMPLATE_NAME)?;
        Ok(tmpl.render(context! { context => context, question => question })?)
    }
}
