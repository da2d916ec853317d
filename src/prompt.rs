//! Prompt assembly for the assistant.

/// Reply the model is told to give when the context has no answer.
pub const FALLBACK_ANSWER: &str = "Hierzu habe ich keine verlässlichen Informationen.";

/// Build the German assistant prompt from the two retrieved contexts and
/// the customer's question.
pub fn build_prompt(knowledge_context: &str, customer_context: &str, question: &str) -> String {
    format!(
        "[INSTRUKTION]\n\
         Du bist ein hilfreicher und höflicher Bank-Assistent der Atruvia AG.\n\
         Nutze die Wissensdatenbank und die Kundendaten, um Kundenfragen zu beantworten.\n\
         Beachte die Informationen aus der Wissensdatenbank (insbesondere die AGBs) strikt.\n\
         Wenn die Antwort nicht in der Wissensdatenbank oder den Kundendaten zu finden ist, \
         antworte mit \"{fallback}\"\n\
         Antworte ausschließlich in Deutsch.\n\
         \n\
         [WISSENSDATENBANK]\n\
         {knowledge}\n\
         \n\
         [KUNDENDATEN]\n\
         {customer}\n\
         \n\
         [FRAGE]\n\
         {question}\n",
        fallback = FALLBACK_ANSWER,
        knowledge = knowledge_context,
        customer = customer_context,
        question = question,
    )
}
